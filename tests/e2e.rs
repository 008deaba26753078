//! Live smoke tests against the Google APIs.
//!
//! These require a valid OAuth token in GWEXPORT_OAUTH_TOKEN with the Admin
//! SDK, Cloud Identity, Vault, and Drive scopes.
//! Run with: cargo test --test e2e -- --ignored

use gwexport::directory::{AdminDirectory, Directory};
use gwexport::policy::{CloudIdentityPolicies, fetch_all};

fn token() -> String {
    std::env::var("GWEXPORT_OAUTH_TOKEN").expect("GWEXPORT_OAUTH_TOKEN must be set")
}

#[test]
#[ignore] // Requires live credentials
fn customer_lookup_returns_an_id() {
    let directory = AdminDirectory::new(token());
    let customer_id = directory.customer_id().expect("customer lookup failed");
    println!("customer id: {customer_id}");
    assert!(!customer_id.is_empty());
}

#[test]
#[ignore] // Requires live credentials
fn policy_listing_paginates_to_completion() {
    let filter =
        std::env::var("GWEXPORT_E2E_FILTER").unwrap_or_else(|_| {
            "setting.type.matches('gemini_app|notebooklm|ai_studio')".to_string()
        });
    let pages = CloudIdentityPolicies::new(token());
    let policies = fetch_all(&pages, &filter).expect("policy fetch failed");
    println!("fetched {} policies", policies.len());
    for policy in policies.iter().take(5) {
        println!("  {}", policy.name);
    }
}
