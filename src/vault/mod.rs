//! Conversation export pipeline: create a Vault export for the target user,
//! poll it to completion, pull the archives, and turn each XML transcript into
//! a per-user spreadsheet (plus a raw XML copy in Drive).

mod archive;
mod export;

pub use archive::{ArchiveMember, BlobStore, FetchedArchive, GcsClient, fetch_archives, unzip};
pub use export::{
    CloudStorageSink, CreateExportRequest, ExportFile, ExportJob, ExportStatus, PollOutcome,
    PollSchedule, VaultClient, VaultExports, gemini_export_request, poll_export,
};

use anyhow::{Context, Result, bail};
use serde::Serialize;
use std::time::Duration;
use time::OffsetDateTime;

use crate::config::Config;
use crate::sheets::{Cell, SheetSink};
use crate::transcript::{TRANSCRIPT_HEADERS, parse};

#[derive(Debug, Serialize)]
pub struct ConversationRunSummary {
    pub status: String,
    pub export_id: String,
    pub status_checks: u32,
    pub archives: usize,
    pub sheets: Vec<String>,
    pub rows_written: usize,
}

fn is_xml(name: &str) -> bool {
    name.to_lowercase().ends_with(".xml")
}

/// Run the conversation export end to end. A creation failure or a FAILED job
/// is fatal; a timed-out poll is reported as its own outcome; everything past
/// the poll degrades per file.
pub fn run(
    config: &Config,
    vault: &impl VaultExports,
    blobs: &impl BlobStore,
    sink: &impl SheetSink,
    sleep: impl FnMut(Duration),
) -> Result<ConversationRunSummary> {
    for (value, key) in [
        (&config.matter_id, "matter_id"),
        (&config.target_user, "target_user"),
        (&config.xml_folder_id, "xml_folder_id"),
        (&config.sheets_folder_id, "sheets_folder_id"),
    ] {
        if value.is_empty() {
            bail!("{key} not configured; run `gwexport config set {key} <value>`");
        }
    }

    tracing::info!(
        user = %config.target_user,
        matter = %config.matter_id,
        "starting conversation export"
    );
    let request = gemini_export_request(&config.target_user, OffsetDateTime::now_utc());
    let job = vault.create_export(&config.matter_id, &request)?;
    tracing::info!(export_id = %job.id, "export created");

    let schedule = PollSchedule {
        interval: Duration::from_secs(config.poll_interval_secs),
        max_checks: config.poll_max_checks,
    };
    let (completed, checks) = match poll_export(vault, &config.matter_id, &job.id, schedule, sleep)?
    {
        PollOutcome::Completed { job, checks } => (job, checks),
        PollOutcome::TimedOut { checks } => {
            tracing::warn!(checks, "timed out waiting for export");
            return Ok(ConversationRunSummary {
                status: "timed_out".to_string(),
                export_id: job.id,
                status_checks: checks,
                archives: 0,
                sheets: Vec::new(),
                rows_written: 0,
            });
        }
    };

    let files = completed.files();
    if files.is_empty() {
        tracing::info!("export completed but contained no files");
    } else {
        tracing::info!(files = files.len(), "export complete, fetching archives");
    }

    let archives = fetch_archives(blobs, files);
    let mut sheets = Vec::new();
    let mut rows_written = 0;
    for archive in &archives {
        let mut saw_xml = false;
        for member in &archive.members {
            if !is_xml(&member.name) {
                continue;
            }
            saw_xml = true;
            match convert_xml_member(config, sink, member) {
                Ok(Some((spreadsheet_id, rows))) => {
                    sheets.push(spreadsheet_id);
                    rows_written += rows;
                }
                Ok(None) => {}
                Err(err) => {
                    tracing::warn!(
                        archive = %archive.name,
                        member = %member.name,
                        "failed to convert transcript: {err:#}"
                    );
                }
            }
        }
        if !saw_xml {
            tracing::warn!(archive = %archive.name, "archive contains no XML transcript");
        }
    }

    let status = if rows_written > 0 { "exported" } else { "empty" };
    Ok(ConversationRunSummary {
        status: status.to_string(),
        export_id: completed.id,
        status_checks: checks,
        archives: archives.len(),
        sheets,
        rows_written,
    })
}

/// Persist one XML transcript and convert it to a spreadsheet. Returns the new
/// spreadsheet id and row count, or None when the transcript held no turns.
fn convert_xml_member(
    config: &Config,
    sink: &impl SheetSink,
    member: &ArchiveMember,
) -> Result<Option<(String, usize)>> {
    let xml_name = format!("{}.xml", config.target_user);
    sink.save_file(
        &config.xml_folder_id,
        &xml_name,
        &member.data,
        "application/xml",
    )
    .context("failed to save XML copy")?;
    tracing::info!(name = %xml_name, "saved raw transcript");

    let xml = String::from_utf8_lossy(&member.data);
    let transcript = parse(&xml);
    let rows = transcript.rows();
    if rows.is_empty() {
        tracing::info!(member = %member.name, "parsed XML but found no conversation rows");
        return Ok(None);
    }

    let mut values: Vec<Vec<Cell>> = Vec::with_capacity(rows.len() + 1);
    values.push(TRANSCRIPT_HEADERS.iter().map(|h| Cell::from(*h)).collect());
    values.extend(rows.iter().map(|row| row.to_cells()));
    let spreadsheet_id =
        sink.create_overwrite(&config.target_user, &config.sheets_folder_id, &values)?;
    tracing::info!(
        spreadsheet = %spreadsheet_id,
        rows = rows.len(),
        "created transcript sheet"
    );
    Ok(Some((spreadsheet_id, rows.len())))
}
