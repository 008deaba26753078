//! Memoized resolution of org-unit and group resource ids to display strings.

use std::collections::HashMap;

use crate::directory::Directory;

/// Resolves `orgUnits/<id>` and `groups/<id>` resources to a human-readable
/// path or email, caching results for the lifetime of one run. A failed lookup
/// degrades to the raw resource identifier instead of failing the export.
pub struct NameResolver<'a, D: Directory> {
    directory: &'a D,
    customer_id: String,
    org_units: HashMap<String, String>,
    groups: HashMap<String, String>,
}

/// The id segment after the resource kind, e.g. `orgUnits/abc` -> `abc`.
fn resource_id(resource: &str) -> Option<&str> {
    match resource.split('/').nth(1) {
        Some(id) if !id.is_empty() => Some(id),
        _ => None,
    }
}

impl<'a, D: Directory> NameResolver<'a, D> {
    pub fn new(directory: &'a D, customer_id: String) -> Self {
        Self {
            directory,
            customer_id,
            org_units: HashMap::new(),
            groups: HashMap::new(),
        }
    }

    /// Resolve an org-unit resource to its path. Empty input means the root
    /// org unit and resolves to "/" without a lookup.
    pub fn resolve_org_unit(&mut self, resource: &str) -> String {
        if resource.is_empty() {
            return "/".to_string();
        }
        if let Some(path) = self.org_units.get(resource) {
            return path.clone();
        }
        let Some(id) = resource_id(resource) else {
            return resource.to_string();
        };
        let path = match self.directory.org_unit_path(&self.customer_id, id) {
            Ok(path) => path.unwrap_or_else(|| "/".to_string()),
            Err(err) => {
                tracing::warn!(org_unit = id, "could not resolve org unit: {err:#}");
                resource.to_string()
            }
        };
        self.org_units.insert(resource.to_string(), path.clone());
        path
    }

    /// Resolve a group resource to its email. Empty input resolves to "".
    pub fn resolve_group(&mut self, resource: &str) -> String {
        if resource.is_empty() {
            return String::new();
        }
        if let Some(email) = self.groups.get(resource) {
            return email.clone();
        }
        let Some(id) = resource_id(resource) else {
            return resource.to_string();
        };
        let email = match self.directory.group_email(id) {
            Ok(email) => email,
            Err(err) => {
                tracing::warn!(group = id, "could not resolve group: {err:#}");
                resource.to_string()
            }
        };
        self.groups.insert(resource.to_string(), email.clone());
        email
    }
}
