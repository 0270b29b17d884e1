// Stage 4 - strategy report generation
//
// Renders three Markdown reports from the collected completions: an
// executive strategy summary, a data-focused strategic assessment, and
// an execution plan. Narrative content comes from the LLM; the metrics
// appendix and the timeline table are computed locally.

mod metrics;

pub use metrics::{extract_metrics, extract_percentage, render_appendix, Metrics};

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Local;
use clap::ValueEnum;

use crate::config::OllamaConfig;
use crate::ollama::TextGenerator;
use crate::prompts::MODEL_HARD;
use crate::runner::CompletionRecord;

/// Risk appetite the whole report suite is tailored to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RiskLevel {
    High,
    Medium,
    Low,
}

impl RiskLevel {
    fn slug(&self) -> &'static str {
        match self {
            RiskLevel::High => "high",
            RiskLevel::Medium => "medium",
            RiskLevel::Low => "low",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RiskLevel::High => write!(f, "HIGH"),
            RiskLevel::Medium => write!(f, "MEDIUM"),
            RiskLevel::Low => write!(f, "LOW"),
        }
    }
}

/// Paths of the three generated reports.
#[derive(Debug)]
pub struct ReportPaths {
    pub summary: PathBuf,
    pub assessment: PathBuf,
    pub execution: PathBuf,
}

/// Load every completion file, keyed by group. Malformed files are
/// skipped with a warning; an empty result is the caller's error.
pub fn load_completions(dir: &Path) -> Result<BTreeMap<String, String>> {
    let mut answers = BTreeMap::new();

    let entries = fs::read_dir(dir)
        .with_context(|| format!("failed to read completions dir {}", dir.display()))?;
    for entry in entries {
        let path = entry?.path();
        let is_jsonl = path.is_file()
            && path
                .extension()
                .map(|e| e.eq_ignore_ascii_case("jsonl"))
                .unwrap_or(false);
        if !is_jsonl {
            continue;
        }

        let parsed = fs::read_to_string(&path)
            .map_err(anyhow::Error::from)
            .and_then(|text| {
                serde_json::from_str::<CompletionRecord>(text.trim()).map_err(Into::into)
            });
        match parsed {
            Ok(record) => {
                answers.insert(record.group_id, record.answer.trim().to_string());
            }
            Err(e) => tracing::warn!("skipped {}: {:#}", path.display(), e),
        }
    }

    Ok(answers)
}

fn joined_findings(completions: &BTreeMap<String, String>) -> String {
    completions
        .iter()
        .map(|(gid, answer)| format!("### {gid}\n{answer}"))
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn bullet_block(label: &str, items: &[String]) -> String {
    if items.is_empty() {
        return String::new();
    }
    let lines = items
        .iter()
        .map(|i| format!("- {i}"))
        .collect::<Vec<_>>()
        .join("\n");
    format!("{label}:\n{lines}\n\n")
}

fn summary_prompt(
    findings: &str,
    risk: RiskLevel,
    priorities: &[String],
    constraints: &[String],
) -> String {
    format!(
        "You are Qmirac's expert strategy consultant.\n\n\
         TASK: Based on the data analysis findings below, create a comprehensive strategy summary (~500 words)\n\
         tailored to a {risk} RISK appetite. This will be an executive summary that provides\n\
         a complete overview of the strategic situation and recommendations.\n\n\
         {}{}\
         Consider the risk level, priorities, and constraints when developing your strategy summary.\n\n\
         FORMAT YOUR RESPONSE AS A WELL-STRUCTURED EXECUTIVE SUMMARY WITH:\n\
         - Introduction outlining the current situation\n\
         - Key findings from the data\n\
         - Strategic recommendations\n\
         - Key success factors\n\
         - Conclusion\n\n\
         DATA ANALYSIS FINDINGS:\n{findings}",
        bullet_block("USER PRIORITIES", priorities),
        bullet_block("USER CONSTRAINTS", constraints),
    )
}

fn assessment_prompt(findings: &str, risk: RiskLevel) -> String {
    format!(
        "You are Qmirac's data analyst and strategic assessment expert.\n\n\
         TASK: Based on the data analysis findings below, create a strategic assessment that focuses on:\n\
         1. Current performance analysis\n\
         2. Key trends identification\n\
         3. Future projections\n\
         4. Risk assessment (for {risk} risk level)\n\
         5. Competitive position evaluation\n\n\
         FORMAT YOUR RESPONSE AS A DATA-FOCUSED ASSESSMENT WITH:\n\
         - Current State: Quantitative analysis of current metrics and KPIs\n\
         - Trends Analysis: Identification of key trends and patterns\n\
         - Future Projections: Data-based forecasts for key metrics\n\
         - Competitive Assessment: Position relative to competitors\n\
         - Risk Factors: Key risks given the {risk} risk appetite\n\n\
         IMPORTANT: Include specific numbers, percentages, and metrics wherever possible.\n\n\
         DATA ANALYSIS FINDINGS:\n{findings}"
    )
}

fn execution_prompt(
    findings: &str,
    risk: RiskLevel,
    priorities: &[String],
    constraints: &[String],
) -> String {
    format!(
        "You are Qmirac's execution planning expert.\n\n\
         TASK: Based on the data analysis findings below, create a detailed execution plan that includes:\n\
         1. Key strategic initiatives to implement\n\
         2. Timeline for implementation (short-term: 0-6 months, medium-term: 6-18 months, long-term: 18+ months)\n\
         3. Resource requirements and considerations\n\
         4. Key metrics to track for success\n\
         5. Risk mitigation actions specific to a {risk} risk appetite\n\n\
         {}{}\
         Consider the risk level, priorities, and constraints when developing your execution plan.\n\n\
         FORMAT YOUR RESPONSE WITH THESE SECTIONS:\n\n\
         STRATEGIC INITIATIVES:\n\
         - Initiative 1: [brief description]\n\n\
         IMPLEMENTATION TIMELINE:\n\
         - Short-term (0-6 months): [specific actions]\n\
         - Medium-term (6-18 months): [specific actions]\n\
         - Long-term (18+ months): [specific actions]\n\n\
         RESOURCE REQUIREMENTS:\n\
         - Financial resources\n\
         - Human resources\n\
         - Technical resources\n\
         - External partnerships\n\n\
         SUCCESS METRICS:\n\
         - Metric 1: [description and target]\n\n\
         RISK MITIGATION:\n\
         - Risk 1: [description and mitigation strategy]\n\n\
         DATA ANALYSIS FINDINGS:\n{findings}",
        bullet_block("USER PRIORITIES", priorities),
        bullet_block("USER CONSTRAINTS", constraints),
    )
}

/// Timeline bullets recovered from the execution plan text, bucketed by
/// implementation phase.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Timeline {
    pub short_term: Vec<String>,
    pub medium_term: Vec<String>,
    pub long_term: Vec<String>,
}

impl Timeline {
    pub fn is_empty(&self) -> bool {
        self.short_term.is_empty() && self.medium_term.is_empty() && self.long_term.is_empty()
    }
}

/// Parse the IMPLEMENTATION TIMELINE section back out of the plan.
fn parse_timeline(plan: &str) -> Timeline {
    let mut timeline = Timeline::default();
    let mut in_timeline = false;
    let mut current: Option<&mut Vec<String>> = None;

    for line in plan.lines() {
        if line.contains("IMPLEMENTATION TIMELINE:") {
            in_timeline = true;
            continue;
        }
        if in_timeline && line.contains("RESOURCE REQUIREMENTS:") {
            break;
        }
        if !in_timeline {
            continue;
        }

        if line.contains("Short-term") {
            current = Some(&mut timeline.short_term);
        } else if line.contains("Medium-term") {
            current = Some(&mut timeline.medium_term);
        } else if line.contains("Long-term") {
            current = Some(&mut timeline.long_term);
        } else if let Some(bucket) = current.as_deref_mut() {
            let trimmed = line.trim();
            if let Some(item) = trimmed.strip_prefix("- ") {
                if !item.trim().is_empty() {
                    bucket.push(item.trim().to_string());
                }
            }
        }
    }

    // The phase headers themselves usually carry the first action.
    for (marker, bucket) in [
        ("Short-term", &mut timeline.short_term),
        ("Medium-term", &mut timeline.medium_term),
        ("Long-term", &mut timeline.long_term),
    ] {
        if let Some(action) = phase_header_action(plan, marker) {
            if !action.is_empty() && !bucket.contains(&action) {
                bucket.insert(0, action);
            }
        }
    }

    timeline
}

fn phase_header_action(plan: &str, marker: &str) -> Option<String> {
    let mut in_timeline = false;
    for line in plan.lines() {
        if line.contains("IMPLEMENTATION TIMELINE:") {
            in_timeline = true;
            continue;
        }
        if in_timeline && line.contains("RESOURCE REQUIREMENTS:") {
            break;
        }
        if in_timeline && line.contains(marker) {
            let after = line.split(':').nth(1).unwrap_or("").trim();
            // skip the template placeholder if the model echoed it
            if after.is_empty() || after.starts_with('[') {
                return None;
            }
            return Some(after.to_string());
        }
    }
    None
}

fn render_timeline_table(timeline: &Timeline) -> String {
    let mut out = String::from("| Phase | Window | Actions |\n|---|---|---|\n");
    let mut row = |phase: &str, window: &str, actions: &[String]| {
        if !actions.is_empty() {
            out.push_str(&format!("| {} | {} | {} |\n", phase, window, actions.join("; ")));
        }
    };
    row("Short-term", "0-6 months", &timeline.short_term);
    row("Medium-term", "6-18 months", &timeline.medium_term);
    row("Long-term", "18+ months", &timeline.long_term);
    out
}

struct ReportContext<'a> {
    generator: &'a dyn TextGenerator,
    model: &'a str,
    out_dir: &'a Path,
    timestamp: String,
    risk: RiskLevel,
}

impl ReportContext<'_> {
    fn write(&self, kind: &str, body: &str) -> Result<PathBuf> {
        let path = self.out_dir.join(format!(
            "{}_{}_{}.md",
            self.risk.slug(),
            kind,
            self.timestamp
        ));
        fs::write(&path, body)
            .with_context(|| format!("failed to write {}", path.display()))?;
        tracing::info!("report written: {}", path.display());
        Ok(path)
    }
}

fn front_matter(title: &str, risk: RiskLevel, priorities: &[String], constraints: &[String]) -> String {
    let mut out = format!(
        "# {title} - Risk Level: {risk}\n\n_Generated on {}_\n\n",
        Local::now().format("%B %d, %Y")
    );
    out.push_str(&bullet_block("**Business Priorities**", priorities));
    out.push_str(&bullet_block("**Business Constraints**", constraints));
    out
}

/// Generate all three reports. `completions` must not be empty.
pub async fn generate_reports(
    generator: &dyn TextGenerator,
    ollama: &OllamaConfig,
    completions: &BTreeMap<String, String>,
    risk: RiskLevel,
    priorities: &[String],
    constraints: &[String],
    out_dir: &Path,
) -> Result<ReportPaths> {
    anyhow::ensure!(!completions.is_empty(), "no completion files found");

    fs::create_dir_all(out_dir)
        .with_context(|| format!("failed to create {}", out_dir.display()))?;

    let ctx = ReportContext {
        generator,
        model: ollama.resolve_model(MODEL_HARD),
        out_dir,
        timestamp: Local::now().format("%Y%m%d%H%M%S").to_string(),
        risk,
    };
    let findings = joined_findings(completions);

    tracing::info!("generating strategy summary");
    let summary = {
        let prompt = summary_prompt(&findings, risk, priorities, constraints);
        let content = ctx.generator.generate(ctx.model, &prompt).await?;
        let mut body = front_matter("Strategy Summary", risk, priorities, constraints);
        body.push_str("## Executive Strategy Summary\n\n");
        body.push_str(&content);
        body.push('\n');
        ctx.write("strategy_summary", &body)?
    };

    tracing::info!("generating strategic assessment");
    let assessment = {
        let prompt = assessment_prompt(&findings, risk);
        let content = ctx.generator.generate(ctx.model, &prompt).await?;
        let mut body = front_matter("Strategic Assessment", risk, &[], &[]);
        body.push_str("## Strategic Assessment Analysis\n\n");
        body.push_str(&content);
        body.push_str("\n\n## Metrics Appendix\n\n");
        body.push_str(&render_appendix(&extract_metrics(completions)));
        ctx.write("strategic_assessment", &body)?
    };

    tracing::info!("generating execution plan");
    let execution = {
        let prompt = execution_prompt(&findings, risk, priorities, constraints);
        let content = ctx.generator.generate(ctx.model, &prompt).await?;
        let mut body = front_matter("Execution Plan", risk, priorities, constraints);
        body.push_str(&content);

        let timeline = parse_timeline(&content);
        if !timeline.is_empty() {
            body.push_str("\n\n## Implementation Timeline\n\n");
            body.push_str(&render_timeline_table(&timeline));
        }
        ctx.write("execution_plan", &body)?
    };

    Ok(ReportPaths {
        summary,
        assessment,
        execution,
    })
}
