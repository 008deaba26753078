//! Flat row records for the policy sheet and their output ordering.

use crate::directory::Directory;
use crate::policy::fetch::Policy;
use crate::policy::resolve::NameResolver;
use crate::sheets::Cell;

/// Header row of the policy sheet. `PolicyRow::to_cells` must produce cells in
/// exactly this order.
pub const POLICY_HEADERS: [&str; 9] = [
    "name",
    "policyQuery.orgUnit",
    "policyQuery.orgUnitPath",
    "policyQuery.sortOrder",
    "setting.type",
    "setting.value.serviceState",
    "type",
    "policyQuery.group",
    "policyQuery.groupEmail",
];

/// Placeholder row written when the filter matches nothing.
pub const NO_POLICIES_SENTINEL: &str = "No matching policies found";

#[derive(Debug, Clone, PartialEq)]
pub struct PolicyRow {
    pub name: String,
    pub org_unit: String,
    pub org_unit_path: String,
    pub sort_order: Option<f64>,
    pub setting_type: String,
    pub service_state: String,
    pub policy_type: String,
    pub group: String,
    pub group_email: String,
}

impl PolicyRow {
    pub fn from_policy(policy: &Policy, resolver: &mut NameResolver<'_, impl Directory>) -> Self {
        let org_unit = policy.policy_query.org_unit.clone().unwrap_or_default();
        let group = policy.policy_query.group.clone().unwrap_or_default();
        let org_unit_path = if org_unit.is_empty() {
            String::new()
        } else {
            resolver.resolve_org_unit(&org_unit)
        };
        let group_email = if group.is_empty() {
            String::new()
        } else {
            resolver.resolve_group(&group)
        };
        Self {
            name: policy.name.clone(),
            org_unit,
            org_unit_path,
            sort_order: policy.policy_query.sort_order,
            setting_type: policy.setting.setting_type.clone().unwrap_or_default(),
            service_state: policy
                .setting
                .value
                .service_state
                .clone()
                .unwrap_or_default(),
            policy_type: policy
                .policy_type
                .clone()
                .unwrap_or_else(|| "ADMIN".to_string()),
            group,
            group_email,
        }
    }

    pub fn to_cells(&self) -> Vec<Cell> {
        vec![
            Cell::from(self.name.as_str()),
            Cell::from(self.org_unit.as_str()),
            Cell::from(self.org_unit_path.as_str()),
            match self.sort_order {
                Some(order) => Cell::Number(order),
                None => Cell::from(""),
            },
            Cell::from(self.setting_type.as_str()),
            Cell::from(self.service_state.as_str()),
            Cell::from(self.policy_type.as_str()),
            Cell::from(self.group.as_str()),
            Cell::from(self.group_email.as_str()),
        ]
    }
}

/// Stable three-key ordering: org-unit path, then setting type, then group
/// email, each byte-lexicographic ascending. Purely for sheet readability.
pub fn sort_rows(rows: &mut [PolicyRow]) {
    rows.sort_by(|a, b| {
        a.org_unit_path
            .cmp(&b.org_unit_path)
            .then_with(|| a.setting_type.cmp(&b.setting_type))
            .then_with(|| a.group_email.cmp(&b.group_email))
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(path: &str, setting: &str, email: &str, name: &str) -> PolicyRow {
        PolicyRow {
            name: name.to_string(),
            org_unit: String::new(),
            org_unit_path: path.to_string(),
            sort_order: None,
            setting_type: setting.to_string(),
            service_state: String::new(),
            policy_type: "ADMIN".to_string(),
            group: String::new(),
            group_email: email.to_string(),
        }
    }

    #[test]
    fn cells_match_header_arity_and_order() {
        let mut sample = row("/Eng", "settings/gemini_app", "g@example.com", "policies/1");
        sample.org_unit = "orgUnits/ou-1".to_string();
        sample.sort_order = Some(3.0);
        sample.service_state = "ENABLED".to_string();
        sample.group = "groups/g-1".to_string();
        let cells = sample.to_cells();
        assert_eq!(cells.len(), POLICY_HEADERS.len());
        assert_eq!(cells[0], Cell::from("policies/1"));
        assert_eq!(cells[1], Cell::from("orgUnits/ou-1"));
        assert_eq!(cells[2], Cell::from("/Eng"));
        assert_eq!(cells[3], Cell::Number(3.0));
        assert_eq!(cells[4], Cell::from("settings/gemini_app"));
        assert_eq!(cells[5], Cell::from("ENABLED"));
        assert_eq!(cells[6], Cell::from("ADMIN"));
        assert_eq!(cells[7], Cell::from("groups/g-1"));
        assert_eq!(cells[8], Cell::from("g@example.com"));
    }

    #[test]
    fn missing_sort_order_renders_empty_text() {
        let cells = row("/", "s", "", "p").to_cells();
        assert_eq!(cells[3], Cell::from(""));
    }

    #[test]
    fn sorts_by_path_then_setting_then_email() {
        let mut rows = vec![
            row("/Sales", "b", "", "r1"),
            row("/Eng", "b", "z@example.com", "r2"),
            row("/Eng", "a", "", "r3"),
            row("/Eng", "b", "a@example.com", "r4"),
        ];
        sort_rows(&mut rows);
        let names: Vec<&str> = rows.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, ["r3", "r4", "r2", "r1"]);
    }

    #[test]
    fn sort_is_stable_for_equal_keys() {
        let mut rows = vec![
            row("/Eng", "a", "same@example.com", "first"),
            row("/Eng", "a", "same@example.com", "second"),
            row("/Eng", "a", "same@example.com", "third"),
        ];
        sort_rows(&mut rows);
        let names: Vec<&str> = rows.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, ["first", "second", "third"]);
    }

    #[test]
    fn ordering_is_case_sensitive_byte_order() {
        let mut rows = vec![row("/a", "s", "", "lower"), row("/Z", "s", "", "upper")];
        sort_rows(&mut rows);
        // 'Z' < 'a' in byte order; no locale-aware folding.
        let names: Vec<&str> = rows.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, ["upper", "lower"]);
    }
}
