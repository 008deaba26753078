//! Vault export job creation and the blocking poll loop.

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use crate::net;

const BASE_URL: &str = "https://vault.googleapis.com/v1";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExportStatus {
    InProgress,
    Completed,
    Failed,
    #[serde(other)]
    Unknown,
}

impl Default for ExportStatus {
    fn default() -> Self {
        ExportStatus::Unknown
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportFile {
    pub bucket_name: String,
    pub object_name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CloudStorageSink {
    pub files: Vec<ExportFile>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportJob {
    pub id: String,
    #[serde(default)]
    pub status: ExportStatus,
    #[serde(default)]
    pub cloud_storage_sink: Option<CloudStorageSink>,
}

impl ExportJob {
    pub fn files(&self) -> &[ExportFile] {
        self.cloud_storage_sink
            .as_ref()
            .map(|sink| sink.files.as_slice())
            .unwrap_or_default()
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountInfo {
    pub emails: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportQuery {
    pub corpus: String,
    pub data_scope: String,
    pub search_method: String,
    pub account_info: AccountInfo,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiOptions {
    pub export_format: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportOptions {
    pub gemini_options: GeminiOptions,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateExportRequest {
    pub name: String,
    pub query: ExportQuery,
    pub export_options: ExportOptions,
}

/// Build the export request for one account's Gemini conversations.
pub fn gemini_export_request(target_user: &str, now: OffsetDateTime) -> CreateExportRequest {
    let stamp = now
        .format(&Rfc3339)
        .unwrap_or_else(|_| now.unix_timestamp().to_string());
    CreateExportRequest {
        name: format!("Gemini Export - {stamp}"),
        query: ExportQuery {
            corpus: "GEMINI".to_string(),
            data_scope: "ALL_DATA".to_string(),
            search_method: "ACCOUNT".to_string(),
            account_info: AccountInfo {
                emails: vec![target_user.to_string()],
            },
        },
        export_options: ExportOptions {
            gemini_options: GeminiOptions {
                export_format: "XML".to_string(),
            },
        },
    }
}

/// Vault export endpoints consumed by the conversation pipeline.
pub trait VaultExports {
    fn create_export(&self, matter_id: &str, request: &CreateExportRequest) -> Result<ExportJob>;
    fn get_export(&self, matter_id: &str, export_id: &str) -> Result<ExportJob>;
}

/// Vault client backed by ureq.
pub struct VaultClient {
    token: String,
}

impl VaultClient {
    pub fn new(token: String) -> Self {
        Self { token }
    }
}

impl VaultExports for VaultClient {
    fn create_export(&self, matter_id: &str, request: &CreateExportRequest) -> Result<ExportJob> {
        let url = format!(
            "{BASE_URL}/matters/{}/exports",
            net::encode_path_segment(matter_id)
        );
        net::post_json(&url, request, &self.token).context("failed to create export")
    }

    fn get_export(&self, matter_id: &str, export_id: &str) -> Result<ExportJob> {
        let url = format!(
            "{BASE_URL}/matters/{}/exports/{}",
            net::encode_path_segment(matter_id),
            net::encode_path_segment(export_id),
        );
        net::get_json(&url, &[], &self.token)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct PollSchedule {
    pub interval: Duration,
    pub max_checks: u32,
}

#[derive(Debug)]
pub enum PollOutcome {
    Completed { job: ExportJob, checks: u32 },
    TimedOut { checks: u32 },
}

/// Poll an export until it completes or the check budget runs out. Sleeps the
/// full interval before every check, blocking the calling thread.
///
/// A `FAILED` status is fatal immediately. A failed status *check* is not: it
/// counts against the budget and polling continues, the same as any
/// non-terminal status.
pub fn poll_export(
    vault: &impl VaultExports,
    matter_id: &str,
    export_id: &str,
    schedule: PollSchedule,
    mut sleep: impl FnMut(Duration),
) -> Result<PollOutcome> {
    for check in 1..=schedule.max_checks {
        tracing::debug!(check, "waiting before status check");
        sleep(schedule.interval);

        let job = match vault.get_export(matter_id, export_id) {
            Ok(job) => job,
            Err(err) => {
                tracing::warn!(check, "status check failed: {err:#}");
                continue;
            }
        };
        tracing::info!(check, status = ?job.status, "export status");
        match job.status {
            ExportStatus::Completed => return Ok(PollOutcome::Completed { job, checks: check }),
            ExportStatus::Failed => bail!("export {export_id} failed upstream"),
            ExportStatus::InProgress | ExportStatus::Unknown => {}
        }
    }
    Ok(PollOutcome::TimedOut {
        checks: schedule.max_checks,
    })
}
