// Stage 3 - prompt runner
//
// Feeds every packaged prompt to the local model with bounded
// parallelism. One group failing never aborts the batch; the group
// simply stays un-done and the next run retries it.

mod state;

pub use state::RunState;

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

use anyhow::{Context, Result};
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};

use crate::config::OllamaConfig;
use crate::ollama::TextGenerator;
use crate::prompts::PromptRecord;

/// One group's answer, written to `completions/<group>.jsonl`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionRecord {
    pub group_id: String,
    pub model: String,
    pub answer: String,
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct RunReport {
    pub completed: usize,
    pub skipped: usize,
    pub failed: usize,
}

enum TaskOutcome {
    Completed,
    Skipped,
    Failed,
}

/// Run every prompt file in `prompts_dir` that is not already marked
/// done, with at most `max_workers` requests in flight.
pub async fn run_prompts(
    prompts_dir: &Path,
    out_dir: &Path,
    state: &RunState,
    generator: &dyn TextGenerator,
    ollama: &OllamaConfig,
    max_workers: usize,
) -> Result<RunReport> {
    fs::create_dir_all(out_dir)
        .with_context(|| format!("failed to create {}", out_dir.display()))?;

    let mut prompt_files: Vec<PathBuf> = fs::read_dir(prompts_dir)
        .with_context(|| format!("failed to read {}", prompts_dir.display()))?
        .filter_map(|e| e.ok().map(|e| e.path()))
        .filter(|p| {
            p.is_file()
                && p.extension()
                    .map(|e| e.eq_ignore_ascii_case("jsonl"))
                    .unwrap_or(false)
        })
        .collect();
    prompt_files.sort();

    let total = prompt_files.len();
    let max_workers = max_workers.max(1);
    tracing::info!("processing {} prompt files with {} workers", total, max_workers);

    let started = Instant::now();
    let finished = AtomicUsize::new(0);

    let outcomes: Vec<TaskOutcome> = stream::iter(prompt_files)
        .map(|path| {
            let finished = &finished;
            async move {
                let outcome = process_prompt(&path, out_dir, state, generator, ollama).await;
                let n = finished.fetch_add(1, Ordering::Relaxed) + 1;
                let rate = n as f64 / started.elapsed().as_secs_f64().max(f64::EPSILON);
                tracing::info!("[{}/{}] {} ({:.2} prompts/sec)", n, total, path.display(), rate);
                outcome
            }
        })
        .buffer_unordered(max_workers)
        .collect()
        .await;

    let mut report = RunReport::default();
    for outcome in outcomes {
        match outcome {
            TaskOutcome::Completed => report.completed += 1,
            TaskOutcome::Skipped => report.skipped += 1,
            TaskOutcome::Failed => report.failed += 1,
        }
    }

    tracing::info!(
        "run finished in {:.2}s: {} completed, {} skipped, {} failed",
        started.elapsed().as_secs_f64(),
        report.completed,
        report.skipped,
        report.failed
    );

    Ok(report)
}

async fn process_prompt(
    path: &Path,
    out_dir: &Path,
    state: &RunState,
    generator: &dyn TextGenerator,
    ollama: &OllamaConfig,
) -> TaskOutcome {
    match try_process(path, out_dir, state, generator, ollama).await {
        Ok(outcome) => outcome,
        Err(e) => {
            tracing::error!("{}: {:#}", path.display(), e);
            TaskOutcome::Failed
        }
    }
}

async fn try_process(
    path: &Path,
    out_dir: &Path,
    state: &RunState,
    generator: &dyn TextGenerator,
    ollama: &OllamaConfig,
) -> Result<TaskOutcome> {
    let record = PromptRecord::load(path)?;

    if state.is_done(&record.group_id).await? {
        tracing::info!("{:25} -> already processed", record.group_id);
        return Ok(TaskOutcome::Skipped);
    }

    let model = ollama.resolve_model(&record.model);
    let answer = generator.generate(model, &record.prompt).await?;

    let completion = CompletionRecord {
        group_id: record.group_id.clone(),
        model: record.model.clone(),
        answer,
    };

    let out_path = out_dir.join(format!("{}.jsonl", record.group_id));
    let mut line = serde_json::to_string(&completion)?;
    line.push('\n');
    fs::write(&out_path, line)
        .with_context(|| format!("failed to write {}", out_path.display()))?;

    state.mark_done(&record.group_id).await?;
    tracing::info!("{:25} -> {}", record.group_id, out_path.display());

    Ok(TaskOutcome::Completed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OllamaConfig;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use tempfile::TempDir;

    struct StubGenerator {
        calls: Mutex<Vec<String>>,
        fail_for: Option<String>,
    }

    impl StubGenerator {
        fn new() -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                fail_for: None,
            }
        }
    }

    #[async_trait]
    impl TextGenerator for StubGenerator {
        async fn generate(&self, model: &str, _prompt: &str) -> Result<String> {
            self.calls.lock().unwrap().push(model.to_string());
            if let Some(bad) = &self.fail_for {
                if model == bad {
                    anyhow::bail!("model not found");
                }
            }
            Ok("1. Revenues have grown 12%.".to_string())
        }
    }

    fn write_prompt(dir: &Path, gid: &str, model: &str) {
        let record = PromptRecord {
            group_id: gid.to_string(),
            model: model.to_string(),
            prompt: format!("answer for {gid}"),
        };
        let line = serde_json::to_string(&record).unwrap();
        fs::write(dir.join(format!("{gid}.jsonl")), format!("{line}\n")).unwrap();
    }

    #[tokio::test]
    async fn test_completions_written_and_marked_done() -> Result<()> {
        let prompts = TempDir::new()?;
        let out = TempDir::new()?;
        let db = TempDir::new()?;
        write_prompt(prompts.path(), "revenue_growth", crate::prompts::MODEL_EASY);

        let state = RunState::open(&db.path().join("state.db"))?;
        let generator = StubGenerator::new();
        let config = OllamaConfig::default();

        let report =
            run_prompts(prompts.path(), out.path(), &state, &generator, &config, 3).await?;

        assert_eq!(report.completed, 1);
        assert!(state.is_done("revenue_growth").await?);

        let written = fs::read_to_string(out.path().join("revenue_growth.jsonl"))?;
        let completion: CompletionRecord = serde_json::from_str(written.trim())?;
        assert_eq!(completion.group_id, "revenue_growth");
        // the completion keeps the prompt-side model name
        assert_eq!(completion.model, crate::prompts::MODEL_EASY);

        // but the generator was called with the mapped Ollama tag
        assert_eq!(
            *generator.calls.lock().unwrap(),
            vec!["phi:latest".to_string()]
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_done_groups_skipped() -> Result<()> {
        let prompts = TempDir::new()?;
        let out = TempDir::new()?;
        let db = TempDir::new()?;
        write_prompt(prompts.path(), "vision", crate::prompts::MODEL_EASY);

        let state = RunState::open(&db.path().join("state.db"))?;
        state.mark_done("vision").await?;
        let generator = StubGenerator::new();
        let config = OllamaConfig::default();

        let report =
            run_prompts(prompts.path(), out.path(), &state, &generator, &config, 3).await?;

        assert_eq!(report.skipped, 1);
        assert!(generator.calls.lock().unwrap().is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_one_failure_does_not_abort_batch() -> Result<()> {
        let prompts = TempDir::new()?;
        let out = TempDir::new()?;
        let db = TempDir::new()?;
        write_prompt(prompts.path(), "cash_flow", crate::prompts::MODEL_EASY);
        write_prompt(prompts.path(), "risk_assessment", crate::prompts::MODEL_HARD);

        let state = RunState::open(&db.path().join("state.db"))?;
        let mut generator = StubGenerator::new();
        generator.fail_for = Some("deepseek-llm:latest".to_string());
        let config = OllamaConfig::default();

        let report =
            run_prompts(prompts.path(), out.path(), &state, &generator, &config, 1).await?;

        assert_eq!(report.completed, 1);
        assert_eq!(report.failed, 1);
        // the failed group stays un-done so the next run retries it
        assert!(!state.is_done("risk_assessment").await?);
        assert!(state.is_done("cash_flow").await?);
        Ok(())
    }
}
