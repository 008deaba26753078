//! Tabular output sink over the Sheets v4 and Drive v3 REST surfaces.
//!
//! The sink owns the overwrite-by-name policy: same-named predecessors in the
//! destination folder are trashed before a replacement is created. Two
//! simultaneous runs against one name race with last-writer-wins semantics.

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::net;

const SHEETS_BASE: &str = "https://sheets.googleapis.com/v4";
const DRIVE_BASE: &str = "https://www.googleapis.com/drive/v3";
const DRIVE_UPLOAD: &str = "https://www.googleapis.com/upload/drive/v3/files";

/// A single output cell. Text cells are subject to per-cell truncation by the
/// row builders; numeric cells pass through untouched.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Cell {
    Text(String),
    Number(f64),
    Int(u64),
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        Cell::Text(value.to_string())
    }
}

impl From<String> for Cell {
    fn from(value: String) -> Self {
        Cell::Text(value)
    }
}

impl From<u64> for Cell {
    fn from(value: u64) -> Self {
        Cell::Int(value)
    }
}

/// Tabular output sink consumed by both pipelines.
pub trait SheetSink {
    /// Clear the first sheet of an existing spreadsheet and write one
    /// rectangular block starting at A1.
    fn clear_and_write(&self, spreadsheet_id: &str, rows: &[Vec<Cell>]) -> Result<()>;

    /// Create a spreadsheet with the given title inside a folder, overwriting
    /// by name: same-named files in the folder are trashed first. Writes the
    /// block, freezes and bolds the header row, and moves the file into the
    /// folder. Returns the new spreadsheet id.
    fn create_overwrite(&self, title: &str, folder_id: &str, rows: &[Vec<Cell>]) -> Result<String>;

    /// Save a plain file into a folder, overwriting by name. Returns the file id.
    fn save_file(&self, folder_id: &str, name: &str, content: &[u8], mime_type: &str)
    -> Result<String>;
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SheetProperties {
    sheet_id: i64,
    title: String,
}

#[derive(Debug, Deserialize)]
struct SheetEntry {
    properties: SheetProperties,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Spreadsheet {
    spreadsheet_id: String,
    #[serde(default)]
    sheets: Vec<SheetEntry>,
}

#[derive(Debug, Deserialize)]
struct DriveFile {
    id: String,
    #[serde(default)]
    parents: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct DriveFileList {
    #[serde(default)]
    files: Vec<DriveFile>,
}

/// Escape a value for interpolation into a Drive `q` query string.
fn drive_escape(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}

/// Sheets/Drive client backed by ureq.
pub struct GoogleSheets {
    token: String,
}

impl GoogleSheets {
    pub fn new(token: String) -> Self {
        Self { token }
    }

    fn first_sheet(&self, spreadsheet_id: &str) -> Result<SheetProperties> {
        let url = format!(
            "{SHEETS_BASE}/spreadsheets/{}",
            net::encode_path_segment(spreadsheet_id)
        );
        let spreadsheet: Spreadsheet =
            net::get_json(&url, &[("fields", "spreadsheetId,sheets.properties")], &self.token)?;
        let entry = spreadsheet
            .sheets
            .into_iter()
            .next()
            .with_context(|| format!("spreadsheet {spreadsheet_id} has no sheets"))?;
        Ok(entry.properties)
    }

    fn write_block(&self, spreadsheet_id: &str, range: &str, rows: &[Vec<Cell>]) -> Result<()> {
        #[derive(Serialize)]
        #[serde(rename_all = "camelCase")]
        struct ValueRange<'a> {
            range: &'a str,
            major_dimension: &'a str,
            values: &'a [Vec<Cell>],
        }

        let url = format!(
            "{SHEETS_BASE}/spreadsheets/{}/values/{}",
            net::encode_path_segment(spreadsheet_id),
            net::encode_path_segment(range),
        );
        let body = ValueRange {
            range,
            major_dimension: "ROWS",
            values: rows,
        };
        let _: serde_json::Value =
            net::put_json(&url, &[("valueInputOption", "RAW")], &body, &self.token)?;
        Ok(())
    }

    fn freeze_header(&self, spreadsheet_id: &str, sheet_id: i64) -> Result<()> {
        let url = format!(
            "{SHEETS_BASE}/spreadsheets/{}:batchUpdate",
            net::encode_path_segment(spreadsheet_id)
        );
        let body = json!({
            "requests": [
                {
                    "updateSheetProperties": {
                        "properties": {
                            "sheetId": sheet_id,
                            "gridProperties": { "frozenRowCount": 1 }
                        },
                        "fields": "gridProperties.frozenRowCount"
                    }
                },
                {
                    "repeatCell": {
                        "range": { "sheetId": sheet_id, "startRowIndex": 0, "endRowIndex": 1 },
                        "cell": { "userEnteredFormat": { "textFormat": { "bold": true } } },
                        "fields": "userEnteredFormat.textFormat.bold"
                    }
                }
            ]
        });
        let _: serde_json::Value = net::post_json(&url, &body, &self.token)?;
        Ok(())
    }

    fn trash_by_name(&self, folder_id: &str, name: &str) -> Result<()> {
        let url = format!("{DRIVE_BASE}/files");
        let query = format!(
            "name = '{}' and '{}' in parents and trashed = false",
            drive_escape(name),
            drive_escape(folder_id),
        );
        let list: DriveFileList = net::get_json(
            &url,
            &[("q", query.as_str()), ("fields", "files(id,name)")],
            &self.token,
        )?;
        for file in list.files {
            let url = format!("{DRIVE_BASE}/files/{}", net::encode_path_segment(&file.id));
            let _: serde_json::Value =
                net::patch_json(&url, &[], &json!({ "trashed": true }), &self.token)?;
            tracing::info!(name, id = %file.id, "trashed existing file");
        }
        Ok(())
    }

    fn move_to_folder(&self, file_id: &str, folder_id: &str, new_name: Option<&str>) -> Result<()> {
        let url = format!("{DRIVE_BASE}/files/{}", net::encode_path_segment(file_id));
        let current: DriveFile = net::get_json(&url, &[("fields", "id,parents")], &self.token)?;
        let previous = current.parents.join(",");
        let body = match new_name {
            Some(name) => json!({ "name": name }),
            None => json!({}),
        };
        let mut query: Vec<(&str, &str)> = vec![("addParents", folder_id)];
        if !previous.is_empty() {
            query.push(("removeParents", previous.as_str()));
        }
        let _: serde_json::Value = net::patch_json(&url, &query, &body, &self.token)?;
        Ok(())
    }
}

impl SheetSink for GoogleSheets {
    fn clear_and_write(&self, spreadsheet_id: &str, rows: &[Vec<Cell>]) -> Result<()> {
        let sheet = self.first_sheet(spreadsheet_id)?;
        let clear_url = format!(
            "{SHEETS_BASE}/spreadsheets/{}/values/{}:clear",
            net::encode_path_segment(spreadsheet_id),
            net::encode_path_segment(&sheet.title),
        );
        let _: serde_json::Value = net::post_json(&clear_url, &json!({}), &self.token)?;
        let range = format!("{}!A1", sheet.title);
        self.write_block(spreadsheet_id, &range, rows)
    }

    fn create_overwrite(&self, title: &str, folder_id: &str, rows: &[Vec<Cell>]) -> Result<String> {
        if rows.is_empty() {
            bail!("refusing to create an empty spreadsheet: {title}");
        }
        self.trash_by_name(folder_id, title)?;

        let url = format!("{SHEETS_BASE}/spreadsheets");
        let body = json!({ "properties": { "title": title } });
        let created: Spreadsheet = net::post_json(&url, &body, &self.token)?;
        let sheet_id = created
            .sheets
            .first()
            .map(|entry| entry.properties.sheet_id)
            .with_context(|| format!("created spreadsheet {title} has no sheets"))?;

        self.write_block(&created.spreadsheet_id, "A1", rows)?;
        self.freeze_header(&created.spreadsheet_id, sheet_id)?;
        self.move_to_folder(&created.spreadsheet_id, folder_id, None)?;
        Ok(created.spreadsheet_id)
    }

    fn save_file(
        &self,
        folder_id: &str,
        name: &str,
        content: &[u8],
        mime_type: &str,
    ) -> Result<String> {
        self.trash_by_name(folder_id, name)?;
        let uploaded: DriveFile = net::post_bytes(
            DRIVE_UPLOAD,
            &[("uploadType", "media")],
            mime_type,
            content,
            &self.token,
        )?;
        self.move_to_folder(&uploaded.id, folder_id, Some(name))?;
        Ok(uploaded.id)
    }
}
