// Command-line interface
//
// One subcommand per pipeline stage, so a run can be resumed or
// re-entered anywhere. Flags override qmirac.toml, which overrides the
// built-in defaults.

use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::{Parser, Subcommand, ValueEnum};

use crate::config::{load_config, Config};
use crate::ingest::{self, Extraction};
use crate::ollama::OllamaClient;
use crate::prompts;
use crate::questions::QuestionBank;
use crate::report::{self, RiskLevel};
use crate::runner::{self, RunState};

#[derive(Parser)]
#[command(name = "qmirac", version, about = "Local-first business analysis pipeline")]
pub struct Cli {
    /// Config file (defaults to ./qmirac.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OrganiseMode {
    Copy,
    Move,
}

#[derive(Subcommand)]
enum Command {
    /// Sort raw CSV drops into per-group folders
    Organise {
        /// Source folder with raw CSVs
        #[arg(short, long)]
        raw_dir: Option<PathBuf>,
        /// Destination root
        #[arg(short, long)]
        grouped_dir: Option<PathBuf>,
        /// Copy (default) or move files
        #[arg(long, value_enum, default_value = "copy")]
        mode: OrganiseMode,
    },
    /// Consolidate grouped CSVs into one JSON snapshot
    Extract {
        #[arg(short, long)]
        grouped_dir: Option<PathBuf>,
        /// JSON output path
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Package per-group prompts from the extraction and the question bank
    BuildPrompts {
        /// Extraction JSON from the extract stage
        #[arg(short, long)]
        data: Option<PathBuf>,
        /// Question bank YAML
        #[arg(short, long)]
        questions: Option<PathBuf>,
        #[arg(short, long)]
        out_dir: Option<PathBuf>,
    },
    /// Execute every pending prompt against the local Ollama server
    Run {
        #[arg(long)]
        prompts_dir: Option<PathBuf>,
        #[arg(long)]
        out_dir: Option<PathBuf>,
        #[arg(long)]
        state_db: Option<PathBuf>,
        /// Parallel requests in flight
        #[arg(long)]
        workers: Option<usize>,
    },
    /// Render the three strategy reports from the completions
    Report {
        #[arg(long)]
        completions_dir: Option<PathBuf>,
        /// Risk appetite the reports are tailored to
        #[arg(long, value_enum)]
        risk_level: RiskLevel,
        /// Business priorities, comma-separated (e.g. 'growth,innovation')
        #[arg(long, value_delimiter = ',')]
        priorities: Vec<String>,
        /// Business constraints, comma-separated (e.g. 'budget,talent')
        #[arg(long, value_delimiter = ',')]
        constraints: Vec<String>,
        #[arg(long)]
        out_dir: Option<PathBuf>,
    },
    /// Load a question bank and report its shape
    Questions {
        /// Bank file; defaults to the configured questions path
        file: Option<PathBuf>,
    },
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        let config = load_config(self.config.as_deref())?;

        match self.command {
            Command::Organise {
                raw_dir,
                grouped_dir,
                mode,
            } => organise(&config, raw_dir, grouped_dir, mode),
            Command::Extract {
                grouped_dir,
                output,
            } => extract(&config, grouped_dir, output),
            Command::BuildPrompts {
                data,
                questions,
                out_dir,
            } => build_prompts(&config, data, questions, out_dir),
            Command::Run {
                prompts_dir,
                out_dir,
                state_db,
                workers,
            } => run(&config, prompts_dir, out_dir, state_db, workers).await,
            Command::Report {
                completions_dir,
                risk_level,
                priorities,
                constraints,
                out_dir,
            } => {
                report(
                    &config,
                    completions_dir,
                    risk_level,
                    priorities,
                    constraints,
                    out_dir,
                )
                .await
            }
            Command::Questions { file } => questions(&config, file),
        }
    }
}

fn organise(
    config: &Config,
    raw_dir: Option<PathBuf>,
    grouped_dir: Option<PathBuf>,
    mode: OrganiseMode,
) -> Result<()> {
    let raw_dir = raw_dir.unwrap_or_else(|| config.paths.raw_dir.clone());
    let grouped_dir = grouped_dir.unwrap_or_else(|| config.paths.grouped_dir.clone());
    let move_files = matches!(mode, OrganiseMode::Move);

    let summary = ingest::organise(&raw_dir, &grouped_dir, move_files)?;

    println!("CSV grouping summary");
    for (gid, n) in &summary.routed {
        println!("  {:25} : {} file(s)", gid, n);
    }

    if !summary.unmapped.is_empty() {
        println!("Unmapped files:");
        for path in &summary.unmapped {
            println!("  - {}", path.display());
        }
        bail!("{} file(s) could not be mapped to a group", summary.unmapped.len());
    }

    Ok(())
}

fn extract(config: &Config, grouped_dir: Option<PathBuf>, output: Option<PathBuf>) -> Result<()> {
    let grouped_dir = grouped_dir.unwrap_or_else(|| config.paths.grouped_dir.clone());
    let output = output.unwrap_or_else(|| config.paths.extracted.clone());

    let extraction = Extraction::new(ingest::extract(&grouped_dir)?);
    extraction.save(&output)?;

    println!(
        "Extraction complete: {} groups, {} data points -> {}",
        extraction.group_count,
        extraction.data_points,
        output.display()
    );
    Ok(())
}

fn build_prompts(
    config: &Config,
    data: Option<PathBuf>,
    questions: Option<PathBuf>,
    out_dir: Option<PathBuf>,
) -> Result<()> {
    let data = data.unwrap_or_else(|| config.paths.extracted.clone());
    let questions = questions.unwrap_or_else(|| config.paths.questions.clone());
    let out_dir = out_dir.unwrap_or_else(|| config.paths.prompts_dir.clone());

    let extraction = Extraction::load(&data)?;
    let bank = QuestionBank::load(&questions)?;
    let written = prompts::build_prompts(&extraction, &bank, &out_dir)?;

    println!("Built {} prompt files in {}", written.len(), out_dir.display());
    Ok(())
}

async fn run(
    config: &Config,
    prompts_dir: Option<PathBuf>,
    out_dir: Option<PathBuf>,
    state_db: Option<PathBuf>,
    workers: Option<usize>,
) -> Result<()> {
    let prompts_dir = prompts_dir.unwrap_or_else(|| config.paths.prompts_dir.clone());
    let out_dir = out_dir.unwrap_or_else(|| config.paths.completions_dir.clone());
    let state_db = state_db.unwrap_or_else(|| config.paths.state_db.clone());
    let workers = workers.unwrap_or(config.run.max_workers);

    let state = RunState::open(&state_db)?;
    let client = OllamaClient::new(
        config.ollama.endpoint.clone(),
        config.ollama.timeout_secs,
        config.ollama.temperature,
    )?;

    let report =
        runner::run_prompts(&prompts_dir, &out_dir, &state, &client, &config.ollama, workers)
            .await?;

    println!(
        "Run complete: {} completed, {} skipped, {} failed",
        report.completed, report.skipped, report.failed
    );
    if report.failed > 0 {
        bail!("{} prompt(s) failed; re-run to retry them", report.failed);
    }
    Ok(())
}

async fn report(
    config: &Config,
    completions_dir: Option<PathBuf>,
    risk_level: RiskLevel,
    priorities: Vec<String>,
    constraints: Vec<String>,
    out_dir: Option<PathBuf>,
) -> Result<()> {
    let completions_dir = completions_dir.unwrap_or_else(|| config.paths.completions_dir.clone());
    let out_dir = out_dir.unwrap_or_else(|| config.paths.reports_dir.clone());

    let completions = report::load_completions(&completions_dir)?;
    println!(
        "Loaded {} completion files; generating {} risk reports...",
        completions.len(),
        risk_level
    );

    let client = OllamaClient::new(
        config.ollama.endpoint.clone(),
        config.ollama.timeout_secs,
        config.ollama.temperature,
    )?;

    let paths = report::generate_reports(
        &client,
        &config.ollama,
        &completions,
        risk_level,
        &priorities,
        &constraints,
        &out_dir,
    )
    .await?;

    println!("Strategy summary:      {}", paths.summary.display());
    println!("Strategic assessment:  {}", paths.assessment.display());
    println!("Execution plan:        {}", paths.execution.display());
    Ok(())
}

fn questions(config: &Config, file: Option<PathBuf>) -> Result<()> {
    let file = file.unwrap_or_else(|| config.paths.questions.clone());
    let bank = QuestionBank::load(&file)?;

    println!(
        "{}: {} groups, {} questions",
        file.display(),
        bank.len(),
        bank.total_questions()
    );
    for group in bank.iter() {
        let hard = group.questions.iter().filter(|q| q.difficulty.is_hard()).count();
        println!("  {:25} : {} question(s), {} hard", group.id, group.questions.len(), hard);
    }

    let unknown = bank.unknown_groups();
    if !unknown.is_empty() {
        println!("Not blueprint groups: {}", unknown.join(", "));
    }
    let missing = bank.missing_blueprint_groups();
    if !missing.is_empty() {
        println!("Blueprint groups without questions: {}", missing.join(", "));
    }

    Ok(())
}
