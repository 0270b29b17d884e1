// Stage 0 - raw CSV organiser
//
// Decides which blueprint group each raw CSV belongs to and copies (or
// moves) it into grouped/<group_id>/. Resolution order: exact filename
// stem, family prefix, then a header-content guess. Anything still
// unresolved is reported back so no drop is silently lost.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

/// Exact filename stem (lowercase, no extension) to group id.
fn stem_group(stem: &str) -> Option<&'static str> {
    let gid = match stem {
        // Finance
        "revenuegrowthdata" => "revenue_growth",
        "opincomedatatable" => "operating_income",
        "cfodatatable" => "cash_flow",
        "gmdatatable" => "gross_margin",
        "finmetricdatatable" => "finance_metrics",
        // HR
        "hrtimedatatable" => "time_to_hire",
        "empturndatatable" => "employee_turnover",
        "empengagedatatable" => "employee_engagement",
        "managementdatatable" => "management_team_quality",
        "hrmetricdatatable" => "hr_metrics",
        // Ops
        "invturndatatable" => "inventory_turnover",
        "otddatatable" => "on_time_delivery",
        "yielddatatable" => "first_pass_yield",
        "cycletimedatatable" => "total_cycle_time",
        "opsmetricdatatable" => "operations_metrics",
        // Sales & marketing
        "arrdatatable" => "annual_recurring_revenue",
        "cacdatatable" => "customer_acquisition_cost",
        "dwdatatable" => "design_win",
        "oppdatatable" => "opportunities_assessment",
        "swotopddatatable" => "opportunities_assessment", // legacy duplicate
        "sandmmetricdatatable" => "sales_marketing_metrics",
        // Vision / SWOT
        "swotoppdatatable" => "opportunities_assessment",
        "mybusinessspecdatatable" => "vision",
        "riskdatatable" => "risk_assessment",
        "strengthsdatatable" => "strengths_assessment",
        "weakdatatable" => "weaknesses_assessment",
        "threatdatatable" => "threats_assessment",
        _ => return None,
    };
    Some(gid)
}

/// Family-pattern stems (market1-5, stratpos1-5, ...).
const FAMILY_MAP: [(&str, &str); 2] = [
    ("market", "market_assessment"),
    ("stratpos", "strategic_assessment"),
];

/// Fallback hints matched against the joined header row.
const HEADER_HINTS: [(&str, &[&str]); 3] = [
    ("design_win", &["design win"]),
    ("management_team_quality", &["management", "team quality"]),
    ("opportunities_assessment", &["opportunity"]),
];

fn header_guess(csv_path: &Path) -> Option<&'static str> {
    let mut reader = csv::Reader::from_path(csv_path).ok()?;
    let joined = reader
        .headers()
        .ok()?
        .iter()
        .map(|h| h.to_ascii_lowercase())
        .collect::<Vec<_>>()
        .join(" ");

    HEADER_HINTS
        .iter()
        .find(|(_, hints)| hints.iter().any(|h| joined.contains(h)))
        .map(|(gid, _)| *gid)
}

fn resolve_group(csv_path: &Path) -> Option<&'static str> {
    let stem = csv_path.file_stem()?.to_string_lossy().to_ascii_lowercase();

    stem_group(&stem)
        .or_else(|| {
            FAMILY_MAP
                .iter()
                .find(|(prefix, _)| stem.starts_with(prefix))
                .map(|(_, gid)| *gid)
        })
        .or_else(|| header_guess(csv_path))
}

fn route(src: &Path, group_id: &str, dest_root: &Path, move_files: bool) -> Result<()> {
    let dest_dir = dest_root.join(group_id);
    fs::create_dir_all(&dest_dir)
        .with_context(|| format!("failed to create {}", dest_dir.display()))?;

    let file_name = src
        .file_name()
        .with_context(|| format!("no file name in {}", src.display()))?;
    let dest = dest_dir.join(file_name);

    if move_files {
        // rename fails across filesystems; fall back to copy + remove
        if fs::rename(src, &dest).is_err() {
            fs::copy(src, &dest)
                .with_context(|| format!("failed to copy {}", src.display()))?;
            fs::remove_file(src)
                .with_context(|| format!("failed to remove {}", src.display()))?;
        }
    } else {
        fs::copy(src, &dest).with_context(|| format!("failed to copy {}", src.display()))?;
    }

    Ok(())
}

/// Per-group file counts plus the files that matched nothing.
#[derive(Debug, Default)]
pub struct OrganiseSummary {
    pub routed: BTreeMap<String, usize>,
    pub unmapped: Vec<PathBuf>,
}

impl OrganiseSummary {
    pub fn total_routed(&self) -> usize {
        self.routed.values().sum()
    }
}

/// Route every `*.csv` under `raw_dir` into `grouped_dir/<group_id>/`.
pub fn organise(raw_dir: &Path, grouped_dir: &Path, move_files: bool) -> Result<OrganiseSummary> {
    let mut summary = OrganiseSummary::default();

    let entries = fs::read_dir(raw_dir)
        .with_context(|| format!("failed to read raw directory {}", raw_dir.display()))?;

    for entry in entries {
        let path = entry?.path();
        let is_csv = path.is_file()
            && path
                .extension()
                .map(|e| e.eq_ignore_ascii_case("csv"))
                .unwrap_or(false);
        if !is_csv {
            continue;
        }

        match resolve_group(&path) {
            Some(gid) => {
                route(&path, gid, grouped_dir, move_files)?;
                *summary.routed.entry(gid.to_string()).or_insert(0) += 1;
                tracing::debug!("{} -> {}", path.display(), gid);
            }
            None => {
                tracing::warn!("no group match for {}", path.display());
                summary.unmapped.push(path);
            }
        }
    }

    for (gid, n) in &summary.routed {
        tracing::info!("{:25} : {} file(s)", gid, n);
    }

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write_csv(dir: &Path, name: &str, contents: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_exact_stem_routing() {
        let raw = TempDir::new().unwrap();
        let grouped = TempDir::new().unwrap();
        write_csv(raw.path(), "RiskDataTable.csv", "Risk,Prob\nChurn,3\n");

        let summary = organise(raw.path(), grouped.path(), false).unwrap();

        assert_eq!(summary.routed.get("risk_assessment"), Some(&1));
        assert!(grouped
            .path()
            .join("risk_assessment/RiskDataTable.csv")
            .exists());
        // copy mode leaves the original behind
        assert!(raw.path().join("RiskDataTable.csv").exists());
    }

    #[test]
    fn test_family_prefix_routing() {
        let raw = TempDir::new().unwrap();
        let grouped = TempDir::new().unwrap();
        write_csv(raw.path(), "market3.csv", "Segment,Share\nA,10\n");
        write_csv(raw.path(), "stratpos1.csv", "Position,Score\nB,55\n");

        let summary = organise(raw.path(), grouped.path(), false).unwrap();

        assert_eq!(summary.routed.get("market_assessment"), Some(&1));
        assert_eq!(summary.routed.get("strategic_assessment"), Some(&1));
    }

    #[test]
    fn test_header_hint_fallback() {
        let raw = TempDir::new().unwrap();
        let grouped = TempDir::new().unwrap();
        write_csv(
            raw.path(),
            "q3_export.csv",
            "Opportunity,Value\nNew market,12\n",
        );

        let summary = organise(raw.path(), grouped.path(), false).unwrap();

        assert_eq!(summary.routed.get("opportunities_assessment"), Some(&1));
        assert!(summary.unmapped.is_empty());
    }

    #[test]
    fn test_unmapped_file_reported() {
        let raw = TempDir::new().unwrap();
        let grouped = TempDir::new().unwrap();
        write_csv(raw.path(), "mystery.csv", "Foo,Bar\n1,2\n");

        let summary = organise(raw.path(), grouped.path(), false).unwrap();

        assert_eq!(summary.total_routed(), 0);
        assert_eq!(summary.unmapped.len(), 1);
    }

    #[test]
    fn test_move_mode_removes_source() {
        let raw = TempDir::new().unwrap();
        let grouped = TempDir::new().unwrap();
        write_csv(raw.path(), "gmdatatable.csv", "Year,GM\n2024,41\n");

        organise(raw.path(), grouped.path(), true).unwrap();

        assert!(!raw.path().join("gmdatatable.csv").exists());
        assert!(grouped.path().join("gross_margin/gmdatatable.csv").exists());
    }

    #[test]
    fn test_non_csv_ignored() {
        let raw = TempDir::new().unwrap();
        let grouped = TempDir::new().unwrap();
        fs::write(raw.path().join("notes.txt"), "hello").unwrap();

        let summary = organise(raw.path(), grouped.path(), false).unwrap();

        assert_eq!(summary.total_routed(), 0);
        assert!(summary.unmapped.is_empty());
    }
}
