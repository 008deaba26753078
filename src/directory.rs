//! Admin SDK directory lookups: customer id, org-unit paths, group emails.

use anyhow::Result;
use serde::Deserialize;

use crate::net;

const BASE_URL: &str = "https://admin.googleapis.com/admin/directory/v1";

/// Directory lookup service consumed by the policy pipeline.
pub trait Directory {
    /// Resolve the customer id that scopes org-unit lookups.
    fn customer_id(&self) -> Result<String>;

    /// Look up an org unit by id, returning its path if the service reports one.
    fn org_unit_path(&self, customer_id: &str, org_unit_id: &str) -> Result<Option<String>>;

    /// Look up a group by id, returning its primary email.
    fn group_email(&self, group_id: &str) -> Result<String>;
}

#[derive(Debug, Deserialize)]
struct Customer {
    id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OrgUnit {
    #[serde(default)]
    org_unit_path: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Group {
    email: String,
}

/// Admin SDK client backed by ureq.
pub struct AdminDirectory {
    token: String,
}

impl AdminDirectory {
    pub fn new(token: String) -> Self {
        Self { token }
    }
}

impl Directory for AdminDirectory {
    fn customer_id(&self) -> Result<String> {
        let url = format!("{BASE_URL}/customers/my_customer");
        let customer: Customer = net::get_json(&url, &[], &self.token)?;
        Ok(customer.id)
    }

    fn org_unit_path(&self, customer_id: &str, org_unit_id: &str) -> Result<Option<String>> {
        let url = format!(
            "{BASE_URL}/customer/{}/orgunits/{}",
            net::encode_path_segment(customer_id),
            net::encode_path_segment(&format!("id:{org_unit_id}")),
        );
        let unit: OrgUnit = net::get_json(&url, &[], &self.token)?;
        Ok(unit.org_unit_path)
    }

    fn group_email(&self, group_id: &str) -> Result<String> {
        let url = format!("{BASE_URL}/groups/{}", net::encode_path_segment(group_id));
        let group: Group = net::get_json(&url, &[], &self.token)?;
        Ok(group.email)
    }
}
