//! Command-line front end. Each command reads a JSON request (file path or `-` for stdin)
//! and writes its result to stdout as a single JSON line; logs go to stderr.

use adaptive_engine::{
    analytics::ActivityData,
    config::EngineConfig,
    curriculum::Domain,
    error::{EngineError, Result},
    features::LearningHistory,
    logging::{ErrorLine, StructuredLogger},
    model::{DifficultySample, StyleSample},
    personalization::{CurrentPerformance, LearnerPreferences, PersonalizationOrchestrator},
    storage::{SqliteStudentStore, StudentRecord},
    HttpContentGenerator,
};
use clap::{Parser, Subcommand};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tokio::io::AsyncReadExt;
use tracing::{info, warn};

const CONFIG_ENV: &str = "ADAPTIVE_ENGINE_CONFIG";

#[derive(Parser, Debug)]
#[command(name = "adaptive-engine", version, about = "Adaptive learning analytics and personalization")]
struct Cli {
    /// Engine config (JSON). Falls back to $ADAPTIVE_ENGINE_CONFIG, then ./config.json
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate a personalized path from {"history": ..., "preferences": ...}
    Personalize {
        #[arg(long)]
        student: String,
        #[arg(long, default_value = "-")]
        input: String,
    },
    /// Recommend content after a topic, using the stored student profile
    Recommend {
        #[arg(long)]
        student: String,
        #[arg(long)]
        topic: String,
        #[arg(long, default_value = "beginner")]
        difficulty: String,
        /// Curriculum to sequence within: bitcoin or stacks
        #[arg(long, default_value = "bitcoin")]
        domain: String,
    },
    /// Progress report from an activity snapshot, or from the store when --input is omitted
    Analyze {
        #[arg(long)]
        student: String,
        #[arg(long)]
        course: String,
        #[arg(long)]
        input: Option<String>,
    },
    /// Difficulty adaptation from {"accuracy": ..., "completionTime": ..., "difficulty": ...}
    Adapt {
        #[arg(long)]
        student: String,
        #[arg(long, default_value = "-")]
        input: String,
    },
    /// Train the learning-style classifier on [{"history": ..., "label": ...}] and save it
    TrainStyle {
        #[arg(long, default_value = "-")]
        input: String,
    },
    /// Train the difficulty regressor on [{"metrics": ..., "optimalDifficulty": ...}] and save it
    TrainDifficulty {
        #[arg(long, default_value = "-")]
        input: String,
    },
    /// Evaluate the stored difficulty regressor on a labelled dataset
    EvaluateDifficulty {
        #[arg(long, default_value = "-")]
        input: String,
    },
    /// Write [{"id": ..., "profile": ..., "activity": {"<course>": ...}}] to the student store
    Seed {
        #[arg(long, default_value = "-")]
        input: String,
    },
}

impl Command {
    fn name(&self) -> &'static str {
        match self {
            Command::Personalize { .. } => "personalize",
            Command::Recommend { .. } => "recommend",
            Command::Analyze { .. } => "analyze",
            Command::Adapt { .. } => "adapt",
            Command::TrainStyle { .. } => "train-style",
            Command::TrainDifficulty { .. } => "train-difficulty",
            Command::EvaluateDifficulty { .. } => "evaluate-difficulty",
            Command::Seed { .. } => "seed",
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PersonalizeRequest {
    #[serde(default, alias = "learningHistory")]
    history: LearningHistory,
    #[serde(default)]
    preferences: LearnerPreferences,
}

async fn read_input<T: DeserializeOwned>(source: &str) -> Result<T> {
    let text = if source == "-" {
        let mut buf = String::new();
        tokio::io::stdin()
            .read_to_string(&mut buf)
            .await
            .map_err(|e| EngineError::invalid(format!("stdin: {e}")))?;
        buf
    } else {
        tokio::fs::read_to_string(source)
            .await
            .map_err(|e| EngineError::invalid(format!("{source}: {e}")))?
    };
    serde_json::from_str(&text).map_err(|e| EngineError::invalid(format!("{source}: {e}")))
}

fn emit(value: &impl Serialize) -> Result<()> {
    StructuredLogger::emit_json(value, &mut std::io::stdout().lock())
        .map_err(|e| EngineError::Storage(format!("stdout: {e}")))
}

fn config_path(cli: &Cli) -> PathBuf {
    cli.config
        .clone()
        .or_else(|| std::env::var_os(CONFIG_ENV).map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("config.json"))
}

fn orchestrator(
    config: &EngineConfig,
    store: Arc<SqliteStudentStore>,
) -> Result<PersonalizationOrchestrator> {
    let generator = Arc::new(HttpContentGenerator::new(&config.content)?);
    Ok(PersonalizationOrchestrator::new(config, generator, store))
}

async fn run(command: &Command, config: &EngineConfig) -> Result<()> {
    let store = Arc::new(SqliteStudentStore::open(&config.store_path())?);
    let engine = orchestrator(config, Arc::clone(&store))?;
    match command {
        Command::Personalize { student, input } => {
            let req: PersonalizeRequest = read_input(input).await?;
            emit(
                &engine
                    .generate_personalized_path(student, &req.history, &req.preferences)
                    .await?,
            )
        }
        Command::Recommend {
            student,
            topic,
            difficulty,
            domain,
        } => {
            let domain = Domain::parse(domain)
                .ok_or_else(|| EngineError::invalid(format!("unknown domain {domain}")))?;
            emit(
                &engine
                    .with_domain(domain)
                    .recommend_next_content(student, topic, difficulty)
                    .await?,
            )
        }
        Command::Analyze {
            student,
            course,
            input,
        } => {
            let report = match input {
                Some(src) => {
                    let data: ActivityData = read_input(src).await?;
                    engine.analyze_progress(student, course, &data)?
                }
                None => engine.analyze_stored_progress(student, course).await?,
            };
            emit(&report)
        }
        Command::Adapt { student, input } => {
            let perf: CurrentPerformance = read_input(input).await?;
            emit(&engine.adapt_difficulty(student, &perf)?)
        }
        Command::TrainStyle { input } => {
            let dataset: Vec<StyleSample> = read_input(input).await?;
            let model = engine.style_model();
            let summary = model.train(&dataset).await?;
            saved(model.save().await?);
            emit(&summary)
        }
        Command::TrainDifficulty { input } => {
            let dataset: Vec<DifficultySample> = read_input(input).await?;
            let model = engine.difficulty_model();
            let summary = model.train(&dataset).await?;
            saved(model.save().await?);
            emit(&summary)
        }
        Command::EvaluateDifficulty { input } => {
            let dataset: Vec<DifficultySample> = read_input(input).await?;
            emit(&engine.difficulty_model().evaluate(&dataset).await?)
        }
        Command::Seed { input } => {
            let records: Vec<StudentRecord> = read_input(input).await?;
            emit(&store.seed(records).await?)
        }
    }
}

fn saved(path: PathBuf) {
    info!(path = %path.display(), "model saved");
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let path = config_path(&cli);
    let (config, problem) = EngineConfig::load_reporting(&path);
    StructuredLogger::init(config.log.json, &config.log.level);
    if let Some(problem) = problem {
        warn!(path = %path.display(), error = %problem, "config not usable; using defaults");
    }
    info!(data_dir = ?config.data_dir, command = cli.command.name(), "adaptive engine starting");

    match run(&cli.command, &config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, kind = e.kind(), "command failed");
            let _ = StructuredLogger::emit_json(
                &ErrorLine::new(&e, Some(cli.command.name())),
                &mut std::io::stdout().lock(),
            );
            ExitCode::FAILURE
        }
    }
}
