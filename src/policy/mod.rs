//! Policy export pipeline: fetch Cloud Identity policies, resolve org-unit and
//! group names, and overwrite the configured spreadsheet with sorted rows.

mod fetch;
mod resolve;
mod rows;

pub use fetch::{CloudIdentityPolicies, Policy, PolicyPage, PolicyPages, fetch_all};
pub use resolve::NameResolver;
pub use rows::{NO_POLICIES_SENTINEL, POLICY_HEADERS, PolicyRow, sort_rows};

use anyhow::{Result, bail};
use serde::Serialize;

use crate::config::Config;
use crate::directory::Directory;
use crate::sheets::{Cell, SheetSink};

#[derive(Debug, Serialize)]
pub struct PolicyRunSummary {
    pub status: String,
    pub spreadsheet_id: String,
    pub policy_count: usize,
    pub row_count: usize,
}

/// Run the policy export end to end. Fatal errors (any non-200 page, a failed
/// customer lookup, a sink failure) abort the run; single name resolutions
/// degrade inside the resolver.
pub fn run(
    config: &Config,
    directory: &impl Directory,
    pages: &impl PolicyPages,
    sink: &impl SheetSink,
) -> Result<PolicyRunSummary> {
    if config.spreadsheet_id.is_empty() {
        bail!("spreadsheet_id not configured; run `gwexport config set spreadsheet_id <id>`");
    }

    let customer_id = directory.customer_id()?;
    let policies = fetch_all(pages, &config.policy_filter)?;
    tracing::info!(count = policies.len(), "fetched policies");

    if policies.is_empty() {
        tracing::info!("no matching policies found");
        sink.clear_and_write(
            &config.spreadsheet_id,
            &[vec![Cell::from(NO_POLICIES_SENTINEL)]],
        )?;
        return Ok(PolicyRunSummary {
            status: "empty".to_string(),
            spreadsheet_id: config.spreadsheet_id.clone(),
            policy_count: 0,
            row_count: 1,
        });
    }

    let mut resolver = NameResolver::new(directory, customer_id);
    let mut policy_rows: Vec<PolicyRow> = policies
        .iter()
        .map(|policy| PolicyRow::from_policy(policy, &mut resolver))
        .collect();
    sort_rows(&mut policy_rows);

    let mut values: Vec<Vec<Cell>> = Vec::with_capacity(policy_rows.len() + 1);
    values.push(POLICY_HEADERS.iter().map(|h| Cell::from(*h)).collect());
    values.extend(policy_rows.iter().map(PolicyRow::to_cells));
    sink.clear_and_write(&config.spreadsheet_id, &values)?;

    tracing::info!(rows = policy_rows.len(), "wrote policy sheet");
    Ok(PolicyRunSummary {
        status: "exported".to_string(),
        spreadsheet_id: config.spreadsheet_id.clone(),
        policy_count: policies.len(),
        row_count: policy_rows.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::fetch::{PolicyQuery, Setting, SettingValue};
    use crate::test_utils::{MapDirectory, MemorySink, StaticPages};

    fn test_config() -> Config {
        Config {
            spreadsheet_id: "sheet-1".to_string(),
            ..Config::default()
        }
    }

    fn policy(name: &str, org_unit: Option<&str>, setting_type: &str) -> Policy {
        Policy {
            name: name.to_string(),
            policy_type: Some("ADMIN".to_string()),
            policy_query: PolicyQuery {
                org_unit: org_unit.map(|s| s.to_string()),
                group: None,
                sort_order: None,
            },
            setting: Setting {
                setting_type: Some(setting_type.to_string()),
                value: SettingValue {
                    service_state: Some("ENABLED".to_string()),
                },
            },
        }
    }

    #[test]
    fn row_count_matches_policy_count() {
        let directory = MapDirectory::new().with_org_unit("ou-1", "/Eng");
        let pages = StaticPages::new(vec![
            policy("policies/1", Some("orgUnits/ou-1"), "settings/a"),
            policy("policies/2", None, "settings/b"),
            policy("policies/3", Some("orgUnits/ou-1"), "settings/c"),
        ]);
        let sink = MemorySink::new();
        let summary = run(&test_config(), &directory, &pages, &sink).unwrap();
        assert_eq!(summary.status, "exported");
        assert_eq!(summary.policy_count, 3);
        assert_eq!(summary.row_count, 3);

        let written = sink.written_blocks();
        assert_eq!(written.len(), 1);
        // header plus one row per policy
        assert_eq!(written[0].rows.len(), 4);
        assert_eq!(
            written[0].rows[0],
            POLICY_HEADERS
                .iter()
                .map(|h| Cell::from(*h))
                .collect::<Vec<_>>()
        );
    }

    #[test]
    fn empty_fetch_writes_single_sentinel_row() {
        let directory = MapDirectory::new();
        let pages = StaticPages::new(vec![]);
        let sink = MemorySink::new();
        let summary = run(&test_config(), &directory, &pages, &sink).unwrap();
        assert_eq!(summary.status, "empty");
        assert_eq!(summary.row_count, 1);
        let written = sink.written_blocks();
        assert_eq!(written[0].rows, vec![vec![Cell::from(NO_POLICIES_SENTINEL)]]);
    }

    #[test]
    fn shared_org_unit_is_resolved_once() {
        let directory = MapDirectory::new().with_org_unit("ou-1", "/Eng");
        let pages = StaticPages::new(vec![
            policy("policies/1", Some("orgUnits/ou-1"), "settings/a"),
            policy("policies/2", Some("orgUnits/ou-1"), "settings/b"),
        ]);
        let sink = MemorySink::new();
        run(&test_config(), &directory, &pages, &sink).unwrap();
        assert_eq!(directory.org_unit_lookups(), 1);
    }

    #[test]
    fn missing_spreadsheet_id_is_fatal() {
        let directory = MapDirectory::new();
        let pages = StaticPages::new(vec![]);
        let sink = MemorySink::new();
        let err = run(&Config::default(), &directory, &pages, &sink).unwrap_err();
        assert!(err.to_string().contains("spreadsheet_id"));
    }

    #[test]
    fn rows_are_sorted_by_resolved_path() {
        let directory = MapDirectory::new()
            .with_org_unit("ou-a", "/Zed")
            .with_org_unit("ou-b", "/Alpha");
        let pages = StaticPages::new(vec![
            policy("policies/z", Some("orgUnits/ou-a"), "settings/a"),
            policy("policies/a", Some("orgUnits/ou-b"), "settings/a"),
        ]);
        let sink = MemorySink::new();
        run(&test_config(), &directory, &pages, &sink).unwrap();
        let written = sink.written_blocks();
        assert_eq!(written[0].rows[1][0], Cell::from("policies/a"));
        assert_eq!(written[0].rows[2][0], Cell::from("policies/z"));
    }
}
