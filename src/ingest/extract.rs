// Stage 1 - group extractor
//
// Reads every CSV under grouped/<group_id>/ and consolidates the rows
// into one JSON snapshot keyed by group, with the units annotation the
// prompt builder embeds verbatim.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{Local, SecondsFormat};
use serde::{Deserialize, Serialize};

use crate::groups::{self, BLUEPRINT_GROUPS};

/// Consolidated rows for one group. Column order and row order match
/// the source CSVs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl GroupTable {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// The stage-1 output envelope written to `extracted_groups.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Extraction {
    pub timestamp: String,
    pub group_count: usize,
    pub data_points: usize,
    pub groups: BTreeMap<String, GroupTable>,
    pub meta: BTreeMap<String, serde_json::Value>,
}

impl Extraction {
    pub fn new(tables: BTreeMap<String, GroupTable>) -> Self {
        let data_points = tables.values().map(|t| t.rows.len()).sum();
        let meta = tables
            .keys()
            .filter_map(|gid| {
                groups::units_for(gid).map(|u| {
                    // UnitSpec serialization cannot fail
                    (gid.clone(), serde_json::to_value(u).unwrap_or_default())
                })
            })
            .collect();

        Self {
            timestamp: Local::now().to_rfc3339_opts(SecondsFormat::Secs, false),
            group_count: tables.len(),
            data_points,
            groups: tables,
            meta,
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read extraction {}", path.display()))?;
        serde_json::from_str(&contents)
            .with_context(|| format!("failed to parse extraction {}", path.display()))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)
            .with_context(|| format!("failed to write {}", path.display()))?;
        tracing::info!("wrote {}", path.display());
        Ok(())
    }

    /// Units annotation for a group as a JSON string, `None` when absent.
    pub fn units_json(&self, group_id: &str) -> Option<String> {
        self.meta
            .get(group_id)
            .and_then(|v| serde_json::to_string(v).ok())
    }
}

/// Walk `grouped_root` and consolidate every group's CSVs. All 30
/// blueprint groups appear in the result, empty when no data exists;
/// directories that are not blueprint groups are skipped with a warning.
pub fn extract(grouped_root: &Path) -> Result<BTreeMap<String, GroupTable>> {
    let mut tables: BTreeMap<String, GroupTable> = BLUEPRINT_GROUPS
        .into_iter()
        .map(|gid| (gid.to_string(), GroupTable::default()))
        .collect();

    let entries = fs::read_dir(grouped_root)
        .with_context(|| format!("failed to read {}", grouped_root.display()))?;

    for entry in entries {
        let dir = entry?.path();
        if !dir.is_dir() {
            continue;
        }

        let gid = dir
            .file_name()
            .map(|n| n.to_string_lossy().to_ascii_lowercase())
            .unwrap_or_default();
        if !groups::is_blueprint_group(&gid) {
            tracing::warn!("unknown group folder {} - skipping", dir.display());
            continue;
        }

        let table = tables.get_mut(&gid).expect("blueprint group pre-seeded");
        for file in fs::read_dir(&dir)? {
            let path = file?.path();
            let is_csv = path.is_file()
                && path
                    .extension()
                    .map(|e| e.eq_ignore_ascii_case("csv"))
                    .unwrap_or(false);
            if is_csv {
                read_csv_into(&path, table)?;
            }
        }
        tracing::info!("{:25} : {} rows", gid, table.rows.len());
    }

    Ok(tables)
}

fn read_csv_into(path: &Path, table: &mut GroupTable) -> Result<()> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("failed to open {}", path.display()))?;

    let headers: Vec<String> = reader
        .headers()
        .with_context(|| format!("failed to read headers of {}", path.display()))?
        .iter()
        .map(|h| h.to_string())
        .collect();

    if table.headers.is_empty() {
        table.headers = headers;
    } else if table.headers != headers {
        tracing::warn!(
            "{}: header mismatch with earlier files in this group",
            path.display()
        );
    }

    let width = table.headers.len();
    for record in reader.records() {
        let record = record.with_context(|| format!("bad record in {}", path.display()))?;
        let mut row: Vec<String> = record.iter().map(|v| v.trim().to_string()).collect();
        if row.iter().all(|v| v.is_empty()) {
            continue;
        }
        row.resize(width, String::new());
        table.rows.push(row);
    }

    Ok(())
}
