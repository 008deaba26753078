//! Paginated Cloud Identity policy listing.

use anyhow::Result;
use serde::Deserialize;

use crate::net;

const BASE_URL: &str = "https://cloudidentity.googleapis.com/v1/policies";
const PAGE_SIZE: &str = "100";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PolicyQuery {
    pub org_unit: Option<String>,
    pub group: Option<String>,
    pub sort_order: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SettingValue {
    #[serde(rename = "serviceState")]
    pub service_state: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Setting {
    #[serde(rename = "type")]
    pub setting_type: Option<String>,
    pub value: SettingValue,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Policy {
    pub name: String,
    #[serde(rename = "type", default)]
    pub policy_type: Option<String>,
    #[serde(default)]
    pub policy_query: PolicyQuery,
    #[serde(default)]
    pub setting: Setting,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PolicyPage {
    pub policies: Vec<Policy>,
    pub next_page_token: Option<String>,
}

/// One page of the policy listing endpoint.
pub trait PolicyPages {
    fn list_page(&self, filter: &str, page_token: Option<&str>) -> Result<PolicyPage>;
}

/// Cloud Identity client backed by ureq.
pub struct CloudIdentityPolicies {
    token: String,
}

impl CloudIdentityPolicies {
    pub fn new(token: String) -> Self {
        Self { token }
    }
}

impl PolicyPages for CloudIdentityPolicies {
    fn list_page(&self, filter: &str, page_token: Option<&str>) -> Result<PolicyPage> {
        let mut query = vec![("filter", filter), ("pageSize", PAGE_SIZE)];
        if let Some(token) = page_token {
            query.push(("pageToken", token));
        }
        net::get_json(BASE_URL, &query, &self.token)
    }
}

/// Fetch every page of policies matching the filter. Any page failure aborts
/// the whole fetch; there are no partial results and no retries.
pub fn fetch_all(pages: &impl PolicyPages, filter: &str) -> Result<Vec<Policy>> {
    let mut policies = Vec::new();
    let mut page_token: Option<String> = None;
    loop {
        let page = pages.list_page(filter, page_token.as_deref())?;
        policies.extend(page.policies);
        match page.next_page_token {
            Some(token) if !token.is_empty() => page_token = Some(token),
            _ => break,
        }
    }
    Ok(policies)
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::bail;
    use std::cell::RefCell;

    struct ScriptedPages {
        pages: RefCell<Vec<Result<PolicyPage>>>,
        seen_tokens: RefCell<Vec<Option<String>>>,
    }

    impl ScriptedPages {
        fn new(pages: Vec<Result<PolicyPage>>) -> Self {
            Self {
                pages: RefCell::new(pages),
                seen_tokens: RefCell::new(Vec::new()),
            }
        }
    }

    impl PolicyPages for ScriptedPages {
        fn list_page(&self, _filter: &str, page_token: Option<&str>) -> Result<PolicyPage> {
            self.seen_tokens
                .borrow_mut()
                .push(page_token.map(|t| t.to_string()));
            self.pages.borrow_mut().remove(0)
        }
    }

    fn policy(name: &str) -> Policy {
        Policy {
            name: name.to_string(),
            policy_type: None,
            policy_query: PolicyQuery::default(),
            setting: Setting::default(),
        }
    }

    #[test]
    fn accumulates_pages_until_no_token() {
        let pages = ScriptedPages::new(vec![
            Ok(PolicyPage {
                policies: vec![policy("policies/a"), policy("policies/b")],
                next_page_token: Some("tok-1".to_string()),
            }),
            Ok(PolicyPage {
                policies: vec![policy("policies/c")],
                next_page_token: None,
            }),
        ]);
        let all = fetch_all(&pages, "setting.type.matches('x')").unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(
            *pages.seen_tokens.borrow(),
            vec![None, Some("tok-1".to_string())]
        );
    }

    #[test]
    fn page_failure_aborts_whole_fetch() {
        struct FailingSecond {
            calls: RefCell<u32>,
        }
        impl PolicyPages for FailingSecond {
            fn list_page(&self, _filter: &str, _token: Option<&str>) -> Result<PolicyPage> {
                let mut calls = self.calls.borrow_mut();
                *calls += 1;
                if *calls == 1 {
                    Ok(PolicyPage {
                        policies: vec![policy("policies/a")],
                        next_page_token: Some("tok".to_string()),
                    })
                } else {
                    bail!("HTTP 500: backend error")
                }
            }
        }
        let pages = FailingSecond {
            calls: RefCell::new(0),
        };
        let err = fetch_all(&pages, "f").unwrap_err();
        assert!(err.to_string().contains("500"));
    }

    #[test]
    fn policy_deserializes_from_api_shape() {
        let raw = r#"{
            "name": "policies/abc",
            "type": "ADMIN",
            "policyQuery": {
                "orgUnit": "orgUnits/03ph8a2z1x",
                "sortOrder": 2.0
            },
            "setting": {
                "type": "settings/gemini_app.service_status",
                "value": { "serviceState": "ENABLED" }
            }
        }"#;
        let policy: Policy = serde_json::from_str(raw).unwrap();
        assert_eq!(policy.name, "policies/abc");
        assert_eq!(policy.policy_type.as_deref(), Some("ADMIN"));
        assert_eq!(
            policy.policy_query.org_unit.as_deref(),
            Some("orgUnits/03ph8a2z1x")
        );
        assert_eq!(policy.policy_query.sort_order, Some(2.0));
        assert_eq!(
            policy.setting.setting_type.as_deref(),
            Some("settings/gemini_app.service_status")
        );
        assert_eq!(policy.setting.value.service_state.as_deref(), Some("ENABLED"));
    }

    #[test]
    fn missing_optional_fields_default() {
        let policy: Policy = serde_json::from_str(r#"{"name":"policies/min"}"#).unwrap();
        assert!(policy.policy_type.is_none());
        assert!(policy.policy_query.org_unit.is_none());
        assert!(policy.setting.value.service_state.is_none());
    }
}
