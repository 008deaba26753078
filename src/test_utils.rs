//! Shared in-memory collaborators for unit tests.

use anyhow::{Result, bail};
use std::cell::{Cell as StdCell, RefCell};
use std::collections::{HashMap, VecDeque};
use std::io::{Cursor, Write};

use crate::directory::Directory;
use crate::policy::{Policy, PolicyPage, PolicyPages};
use crate::sheets::{Cell, SheetSink};
use crate::vault::{
    BlobStore, CloudStorageSink, CreateExportRequest, ExportFile, ExportJob, ExportStatus,
    VaultExports,
};

/// Build a ZIP archive in memory from (name, content) pairs.
pub fn zip_bytes(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    for (name, data) in entries {
        writer
            .start_file(*name, zip::write::SimpleFileOptions::default())
            .unwrap();
        writer.write_all(data).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

// ---- directory ----

#[derive(Default)]
pub struct MapDirectory {
    org_units: HashMap<String, Option<String>>,
    groups: HashMap<String, String>,
    org_unit_calls: StdCell<usize>,
    group_calls: StdCell<usize>,
}

impl MapDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_org_unit(mut self, id: &str, path: &str) -> Self {
        self.org_units.insert(id.to_string(), Some(path.to_string()));
        self
    }

    /// An org unit the service knows but reports no path for.
    pub fn with_pathless_org_unit(mut self, id: &str) -> Self {
        self.org_units.insert(id.to_string(), None);
        self
    }

    pub fn with_group(mut self, id: &str, email: &str) -> Self {
        self.groups.insert(id.to_string(), email.to_string());
        self
    }

    pub fn org_unit_lookups(&self) -> usize {
        self.org_unit_calls.get()
    }

    pub fn group_lookups(&self) -> usize {
        self.group_calls.get()
    }
}

impl Directory for MapDirectory {
    fn customer_id(&self) -> Result<String> {
        Ok("C000test".to_string())
    }

    fn org_unit_path(&self, _customer_id: &str, org_unit_id: &str) -> Result<Option<String>> {
        self.org_unit_calls.set(self.org_unit_calls.get() + 1);
        match self.org_units.get(org_unit_id) {
            Some(path) => Ok(path.clone()),
            None => bail!("HTTP 404: org unit {org_unit_id} not found"),
        }
    }

    fn group_email(&self, group_id: &str) -> Result<String> {
        self.group_calls.set(self.group_calls.get() + 1);
        match self.groups.get(group_id) {
            Some(email) => Ok(email.clone()),
            None => bail!("HTTP 404: group {group_id} not found"),
        }
    }
}

// ---- policies ----

pub struct StaticPages {
    policies: Vec<Policy>,
}

impl StaticPages {
    pub fn new(policies: Vec<Policy>) -> Self {
        Self { policies }
    }
}

impl PolicyPages for StaticPages {
    fn list_page(&self, _filter: &str, _page_token: Option<&str>) -> Result<PolicyPage> {
        Ok(PolicyPage {
            policies: self.policies.clone(),
            next_page_token: None,
        })
    }
}

// ---- vault ----

pub struct ScriptedVault {
    statuses: RefCell<VecDeque<ExportStatus>>,
    manifest: Vec<ExportFile>,
    checks: StdCell<u32>,
    fail_first_check: bool,
    created_names: RefCell<Vec<String>>,
}

impl ScriptedVault {
    pub fn with_statuses(statuses: Vec<ExportStatus>) -> Self {
        Self {
            statuses: RefCell::new(statuses.into()),
            manifest: Vec::new(),
            checks: StdCell::new(0),
            fail_first_check: false,
            created_names: RefCell::new(Vec::new()),
        }
    }

    /// Make the first status check fail at the transport level.
    pub fn failing_first(mut self) -> Self {
        self.fail_first_check = true;
        self
    }

    /// Manifest attached to the job once it reports COMPLETED.
    pub fn with_manifest(mut self, files: Vec<ExportFile>) -> Self {
        self.manifest = files;
        self
    }

    pub fn status_checks(&self) -> u32 {
        self.checks.get()
    }

    pub fn created_names(&self) -> Vec<String> {
        self.created_names.borrow().clone()
    }
}

impl VaultExports for ScriptedVault {
    fn create_export(&self, _matter_id: &str, request: &CreateExportRequest) -> Result<ExportJob> {
        self.created_names.borrow_mut().push(request.name.clone());
        Ok(ExportJob {
            id: "e".to_string(),
            status: ExportStatus::InProgress,
            cloud_storage_sink: None,
        })
    }

    fn get_export(&self, _matter_id: &str, export_id: &str) -> Result<ExportJob> {
        self.checks.set(self.checks.get() + 1);
        if self.fail_first_check && self.checks.get() == 1 {
            bail!("HTTP 503: status backend unavailable");
        }
        let status = self
            .statuses
            .borrow_mut()
            .pop_front()
            .unwrap_or(ExportStatus::InProgress);
        let sink = if status == ExportStatus::Completed {
            Some(CloudStorageSink {
                files: self.manifest.clone(),
            })
        } else {
            None
        };
        Ok(ExportJob {
            id: export_id.to_string(),
            status,
            cloud_storage_sink: sink,
        })
    }
}

// ---- blobs ----

#[derive(Default)]
pub struct MemoryBlobs {
    objects: HashMap<String, Vec<u8>>,
}

impl MemoryBlobs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_object(mut self, object: &str, data: Vec<u8>) -> Self {
        self.objects.insert(object.to_string(), data);
        self
    }
}

impl BlobStore for MemoryBlobs {
    fn fetch(&self, _bucket: &str, object: &str) -> Result<Vec<u8>> {
        match self.objects.get(object) {
            Some(data) => Ok(data.clone()),
            None => bail!("HTTP 404: no such object: {object}"),
        }
    }
}

// ---- sheets ----

#[derive(Debug, Clone)]
pub struct WrittenBlock {
    pub spreadsheet_id: String,
    pub rows: Vec<Vec<Cell>>,
}

#[derive(Debug, Clone)]
pub struct CreatedSheet {
    pub title: String,
    pub folder_id: String,
    pub rows: Vec<Vec<Cell>>,
}

#[derive(Debug, Clone)]
pub struct SavedFile {
    pub folder_id: String,
    pub name: String,
    pub content: Vec<u8>,
    pub mime_type: String,
}

#[derive(Default)]
pub struct MemorySink {
    blocks: RefCell<Vec<WrittenBlock>>,
    sheets: RefCell<Vec<CreatedSheet>>,
    files: RefCell<Vec<SavedFile>>,
    fail_file_saves: bool,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every save_file call fail, to exercise degraded paths.
    pub fn failing_file_saves(mut self) -> Self {
        self.fail_file_saves = true;
        self
    }

    pub fn written_blocks(&self) -> Vec<WrittenBlock> {
        self.blocks.borrow().clone()
    }

    pub fn created_sheets(&self) -> Vec<CreatedSheet> {
        self.sheets.borrow().clone()
    }

    pub fn saved_files(&self) -> Vec<SavedFile> {
        self.files.borrow().clone()
    }
}

impl SheetSink for MemorySink {
    fn clear_and_write(&self, spreadsheet_id: &str, rows: &[Vec<Cell>]) -> Result<()> {
        self.blocks.borrow_mut().push(WrittenBlock {
            spreadsheet_id: spreadsheet_id.to_string(),
            rows: rows.to_vec(),
        });
        Ok(())
    }

    fn create_overwrite(&self, title: &str, folder_id: &str, rows: &[Vec<Cell>]) -> Result<String> {
        let mut sheets = self.sheets.borrow_mut();
        sheets.push(CreatedSheet {
            title: title.to_string(),
            folder_id: folder_id.to_string(),
            rows: rows.to_vec(),
        });
        Ok(format!("mem-sheet-{}", sheets.len()))
    }

    fn save_file(
        &self,
        folder_id: &str,
        name: &str,
        content: &[u8],
        mime_type: &str,
    ) -> Result<String> {
        if self.fail_file_saves {
            bail!("HTTP 500: upload rejected");
        }
        let mut files = self.files.borrow_mut();
        files.push(SavedFile {
            folder_id: folder_id.to_string(),
            name: name.to_string(),
            content: content.to_vec(),
            mime_type: mime_type.to_string(),
        });
        Ok(format!("mem-file-{}", files.len()))
    }
}
