// Stage 2 - prompt packager
//
// Pairs each group's extracted data with its assessment questions and
// writes one prompt record per group. Model routing is difficulty
// driven: a group whose questions are mostly tagged hard goes to the
// larger model.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::ingest::{Extraction, GroupTable};
use crate::questions::{Question, QuestionBank};

pub const MODEL_EASY: &str = "microsoft/phi-3-mini-4k-instruct";
pub const MODEL_HARD: &str = "deepseek-llm";

/// At most this many data rows are embedded in a prompt.
const SAMPLE_ROWS: usize = 5;

const SYSTEM_PROMPT: &str = "You are Qmirac's strategy-analysis engine. Answer each question ONLY\n\
with clear, numbered sentences grounded in the data table provided.\n\
If an answer is not inferable, reply \"insufficient data\".";

/// One packaged prompt, written as a single JSONL record per group.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptRecord {
    pub group_id: String,
    pub model: String,
    pub prompt: String,
}

impl PromptRecord {
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read prompt {}", path.display()))?;
        let line = contents
            .lines()
            .next()
            .with_context(|| format!("empty prompt file {}", path.display()))?;
        serde_json::from_str(line)
            .with_context(|| format!("failed to parse prompt {}", path.display()))
    }
}

/// Flatten a group's questions into texts plus the hard-tagged count,
/// in one pass.
pub fn parse_questions(questions: &[Question]) -> (Vec<&str>, usize) {
    let mut texts = Vec::with_capacity(questions.len());
    let mut hard = 0;
    for q in questions {
        texts.push(q.text.as_str());
        if q.difficulty.is_hard() {
            hard += 1;
        }
    }
    (texts, hard)
}

/// The hard model takes over once more than half the questions are hard.
pub fn choose_model(hard_count: usize, total: usize) -> &'static str {
    if total > 0 && hard_count * 2 > total {
        MODEL_HARD
    } else {
        MODEL_EASY
    }
}

fn build_user_block(
    group_id: &str,
    table: &GroupTable,
    units_json: Option<&str>,
    questions: &[&str],
) -> String {
    let header = table.headers.join(", ");
    let body = table
        .rows
        .iter()
        .take(SAMPLE_ROWS)
        .map(|row| row.join(", "))
        .collect::<Vec<_>>()
        .join("\n");

    let unit_str = units_json.unwrap_or("unknown");
    let question_lines = questions
        .iter()
        .enumerate()
        .map(|(i, q)| format!("{}. {}", i + 1, q))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "**Group:** {group_id}\n\
         **Units/Scales:** {unit_str}\n\n\
         **Data (CSV sample):**\n\
         ```\n\
         {header}\n\
         {body}\n\
         ```\n\n\
         **Questions:**\n\
         {question_lines}\n"
    )
}

/// Assemble the full prompt for one group.
pub fn build_prompt(
    group_id: &str,
    table: &GroupTable,
    units_json: Option<&str>,
    questions: &[Question],
) -> PromptRecord {
    let (texts, hard_count) = parse_questions(questions);
    let model = choose_model(hard_count, texts.len());
    let prompt = format!(
        "{SYSTEM_PROMPT}\n\n{}",
        build_user_block(group_id, table, units_json, &texts)
    );

    PromptRecord {
        group_id: group_id.to_string(),
        model: model.to_string(),
        prompt,
    }
}

/// Build prompt files for every group that has both data and questions.
/// Returns the paths written. Groups missing either side are skipped
/// with a log line; that is expected, not an error.
pub fn build_prompts(
    extraction: &Extraction,
    bank: &QuestionBank,
    out_dir: &Path,
) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(out_dir)
        .with_context(|| format!("failed to create {}", out_dir.display()))?;

    let mut written = Vec::new();
    for (gid, table) in &extraction.groups {
        if table.is_empty() {
            tracing::info!("{} - skipped (no data)", gid);
            continue;
        }
        let questions = match bank.get(gid) {
            Some(qs) if !qs.is_empty() => qs,
            _ => {
                tracing::info!("{} - skipped (no questions)", gid);
                continue;
            }
        };

        let record = build_prompt(gid, table, extraction.units_json(gid).as_deref(), questions);

        let out_path = out_dir.join(format!("{gid}.jsonl"));
        let mut line = serde_json::to_string(&record)?;
        line.push('\n');
        fs::write(&out_path, line)
            .with_context(|| format!("failed to write {}", out_path.display()))?;

        tracing::info!("{} - prompt ready -> {} [{}]", gid, out_path.display(), record.model);
        written.push(out_path);
    }

    tracing::info!("built {} prompt files", written.len());
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::questions::Difficulty;

    fn q(text: &str, difficulty: Difficulty) -> Question {
        Question {
            text: text.to_string(),
            difficulty,
        }
    }

    #[test]
    fn test_parse_questions_counts_hard() {
        let questions = vec![
            q("A", Difficulty::Default),
            q("B", Difficulty::Hard),
            q("C", Difficulty::Hard),
        ];
        let (texts, hard) = parse_questions(&questions);
        assert_eq!(texts, vec!["A", "B", "C"]);
        assert_eq!(hard, 2);
    }

    #[test]
    fn test_model_routing_threshold() {
        // strictly more than half must be hard
        assert_eq!(choose_model(0, 4), MODEL_EASY);
        assert_eq!(choose_model(2, 4), MODEL_EASY);
        assert_eq!(choose_model(3, 4), MODEL_HARD);
        assert_eq!(choose_model(1, 1), MODEL_HARD);
    }

    #[test]
    fn test_user_block_layout() {
        let table = GroupTable {
            headers: vec!["Year".to_string(), "Revenue".to_string()],
            rows: vec![
                vec!["2023".to_string(), "110".to_string()],
                vec!["2024".to_string(), "130".to_string()],
            ],
        };
        let block = build_user_block(
            "revenue_growth",
            &table,
            Some("\"USD_M\""),
            &["Has revenue grown?", "Is growth durable?"],
        );

        assert!(block.contains("**Group:** revenue_growth"));
        assert!(block.contains("**Units/Scales:** \"USD_M\""));
        assert!(block.contains("Year, Revenue\n2023, 110\n2024, 130"));
        assert!(block.contains("1. Has revenue grown?"));
        assert!(block.contains("2. Is growth durable?"));
    }

    #[test]
    fn test_sample_capped_at_five_rows() {
        let table = GroupTable {
            headers: vec!["N".to_string()],
            rows: (0..9).map(|i| vec![i.to_string()]).collect(),
        };
        let block = build_user_block("vision", &table, None, &["Q"]);
        assert!(block.contains("4\n"));
        assert!(!block.contains("5\n"));
        assert!(block.contains("**Units/Scales:** unknown"));
    }

    #[test]
    fn test_build_prompt_record() {
        let table = GroupTable {
            headers: vec!["Risk".to_string()],
            rows: vec![vec!["Churn".to_string()]],
        };
        let questions = vec![q("Can you reduce risk?", Difficulty::Hard)];

        let record = build_prompt("risk_assessment", &table, None, &questions);

        assert_eq!(record.group_id, "risk_assessment");
        assert_eq!(record.model, MODEL_HARD);
        assert!(record.prompt.starts_with("You are Qmirac's strategy-analysis engine."));
        assert!(record.prompt.contains("1. Can you reduce risk?"));
    }
}
