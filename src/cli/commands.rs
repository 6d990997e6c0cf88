//! Command implementations for the Sapa CLI.

use std::collections::BTreeMap;
use std::fs;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result, bail};
use chrono::Utc;
use log::{info, warn};

use crate::analysis::normalizer::TextNormalizer;
use crate::analysis::slang::SlangDictionary;
use crate::cli::args::*;
use crate::cli::output::*;
use crate::config::EngineConfig;
use crate::dataset::Dataset;
use crate::engine::InferenceEngine;
use crate::ml::artifact::{ArtifactPaths, ContextCell};
use crate::ml::trainer::Trainer;
use crate::session::{SessionPolicy, SessionStore};

/// Commands that end a chat session.
const QUIT_COMMANDS: &[&str] = &["/quit", "/exit"];

/// Execute a CLI command.
pub fn execute_command(args: SapaArgs) -> Result<()> {
    let config = load_config(&args)?;
    match &args.command {
        Command::Chat(chat_args) => chat(chat_args, config, &args),
        Command::Classify(classify_args) => classify(classify_args, config, &args),
        Command::Normalize(normalize_args) => normalize(normalize_args, config, &args),
        Command::Train(train_args) => train(train_args, config, &args),
        Command::Evaluate(evaluate_args) => evaluate(evaluate_args, config, &args),
    }
}

/// Read the configuration file, or start from defaults.
fn load_config(args: &SapaArgs) -> Result<EngineConfig> {
    match &args.config {
        Some(path) => EngineConfig::from_file(path)
            .with_context(|| format!("failed to load configuration {}", path.display())),
        None => Ok(EngineConfig::default()),
    }
}

fn apply_normalizer_args(config: &mut EngineConfig, args: &NormalizerArgs) {
    if let Some(slang) = &args.slang {
        config.slang_path = Some(slang.clone());
    }
    if args.remove_stopwords {
        config.normalizer.remove_stopwords = true;
    }
    if args.lemmatize {
        config.normalizer.lemmatize = true;
    }
}

fn apply_engine_args(config: &mut EngineConfig, args: &EngineArgs) -> Result<()> {
    if let Some(dir) = &args.artifact_dir {
        config.artifact_dir = dir.clone();
    }
    if let Some(responses) = &args.responses {
        config.dataset_path = Some(responses.clone());
    }
    if let Some(min_confidence) = args.min_confidence {
        config.min_confidence = min_confidence;
    }
    apply_normalizer_args(config, &args.normalizer);
    config.validate().context("invalid engine settings")?;
    Ok(())
}

fn build_normalizer(config: &EngineConfig) -> Result<TextNormalizer> {
    let slang = Arc::new(SlangDictionary::load(config.slang_path.as_deref()));
    TextNormalizer::new(config.normalizer.clone(), slang).context("failed to build normalizer")
}

fn build_engine(config: &EngineConfig) -> Result<InferenceEngine> {
    let cell = ContextCell::new();
    InferenceEngine::from_config(config, &cell).with_context(|| {
        format!(
            "failed to start inference engine from {}",
            config.artifact_dir.display()
        )
    })
}

/// Interactive chat over stdin.
fn chat(args: &ChatArgs, mut config: EngineConfig, cli_args: &SapaArgs) -> Result<()> {
    apply_engine_args(&mut config, &args.engine)?;
    let engine = build_engine(&config)?;
    let store = SessionStore::new(SessionPolicy::from(&config.session));
    let mut session = store.create();

    let human = cli_args.output_format == OutputFormat::Human;
    if human && cli_args.verbosity() > 0 {
        println!("Type a message, or /quit to leave.");
    }

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    loop {
        if human {
            write!(stdout, "> ")?;
            stdout.flush()?;
        }

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let input = line.trim_end_matches(['\r', '\n']);
        if QUIT_COMMANDS.contains(&input.trim()) {
            break;
        }

        if store.evict_expired(Utc::now()) > 0 && store.get(session).is_err() {
            info!("session {session} expired, starting a new one");
            session = store.create();
        }

        let reply = store.exchange(session, &engine, input)?;
        match cli_args.output_format {
            OutputFormat::Human => println!("{}", format_reply(&reply, cli_args.verbosity())),
            OutputFormat::Json => println!("{}", serde_json::to_string(&reply)?),
        }
    }

    let finished = store.end(session)?;
    if args.transcript {
        output_result("Transcript", &finished.history(), cli_args)?;
    }
    Ok(())
}

/// Classify messages given on the command line.
fn classify(args: &ClassifyArgs, mut config: EngineConfig, cli_args: &SapaArgs) -> Result<()> {
    apply_engine_args(&mut config, &args.engine)?;
    let engine = build_engine(&config)?;

    let results: Vec<ClassifyResult> = args
        .texts
        .iter()
        .map(|text| ClassifyResult {
            input: text.clone(),
            normalized: engine.normalize(text),
            reply: engine.handle(text),
        })
        .collect();

    output_result("Classification", &results, cli_args)?;
    Ok(())
}

/// Normalize messages given on the command line.
fn normalize(args: &NormalizeArgs, mut config: EngineConfig, cli_args: &SapaArgs) -> Result<()> {
    apply_normalizer_args(&mut config, &args.normalizer);
    let normalizer = build_normalizer(&config)?;

    let results: Vec<NormalizeResult> = args
        .texts
        .iter()
        .map(|text| NormalizeResult {
            input: text.clone(),
            normalized: normalizer.normalize(text),
        })
        .collect();

    output_result("Normalization", &results, cli_args)?;
    Ok(())
}

fn with_extension(path: &Path, binary: bool) -> PathBuf {
    if binary {
        path.with_extension("bin")
    } else {
        path.to_path_buf()
    }
}

/// Fit and write artifacts.
fn train(args: &TrainArgs, mut config: EngineConfig, cli_args: &SapaArgs) -> Result<()> {
    apply_normalizer_args(&mut config, &args.normalizer);
    if let Some(out) = &args.out {
        config.artifact_dir = out.clone();
    }

    let start_time = Instant::now();
    let dataset = Dataset::read(&args.dataset, args.text_column.as_deref())
        .with_context(|| format!("failed to read dataset {}", args.dataset.display()))?;
    let samples = dataset.samples()?;
    if samples.is_empty() {
        bail!("dataset {} has no labelled text", args.dataset.display());
    }

    let normalizer = Arc::new(build_normalizer(&config)?);
    let model = Trainer::new(normalizer)
        .fit(&samples)
        .context("training failed")?;

    fs::create_dir_all(&config.artifact_dir).with_context(|| {
        format!("failed to create {}", config.artifact_dir.display())
    })?;
    let defaults = config.artifact_paths();
    let paths = ArtifactPaths {
        classifier: with_extension(&defaults.classifier, args.binary),
        adapter: with_extension(&defaults.adapter, args.binary),
        label_codec: with_extension(&defaults.label_codec, args.binary),
    };
    model.save(&paths).context("failed to write artifacts")?;

    let result = TrainResult {
        samples: samples.len(),
        intents: model.codec.classes().to_vec(),
        classifier: paths.classifier.display().to_string(),
        adapter: paths.adapter.display().to_string(),
        label_encoder: paths.label_codec.display().to_string(),
        duration_ms: start_time.elapsed().as_millis() as u64,
    };
    output_result("Training complete", &result, cli_args)?;
    Ok(())
}

/// Evaluate the engine against labelled samples.
fn evaluate(args: &EvaluateArgs, mut config: EngineConfig, cli_args: &SapaArgs) -> Result<()> {
    apply_engine_args(&mut config, &args.engine)?;
    let engine = build_engine(&config)?;

    let dataset = Dataset::read(&args.dataset, args.text_column.as_deref())
        .with_context(|| format!("failed to read dataset {}", args.dataset.display()))?;
    let samples = dataset.samples()?;
    if samples.is_empty() {
        bail!("dataset {} has no labelled text", args.dataset.display());
    }

    let start_time = Instant::now();
    let texts: Vec<&str> = samples.iter().map(|s| s.text.as_str()).collect();
    let replies = engine.handle_batch(&texts);

    let mut correct = 0;
    let mut outcomes = BTreeMap::new();
    let mut errors = Vec::new();
    for (sample, reply) in samples.iter().zip(&replies) {
        *outcomes.entry(reply.outcome).or_insert(0) += 1;
        if reply.intent == sample.intent {
            correct += 1;
        } else if errors.len() < args.show_errors {
            errors.push(Misclassification {
                text: sample.text.clone(),
                expected: sample.intent.clone(),
                predicted: reply.intent.clone(),
            });
        }
    }

    let accuracy = correct as f64 / samples.len() as f64;
    if accuracy < 0.5 {
        warn!("accuracy {accuracy:.3} is below 0.5, check preprocessing settings and artifacts");
    }

    let result = EvaluationResult {
        samples: samples.len(),
        correct,
        accuracy,
        outcomes,
        errors,
        duration_ms: start_time.elapsed().as_millis() as u64,
    };
    output_result("Evaluation", &result, cli_args)?;
    Ok(())
}
