use crate::config::settings::JudgeConfig;
use crate::config::validator::validate_config;
use crate::core::orchestrator::JudgeOrchestrator;
use crate::core::types::{Problem, Submission, TestCase};
use crate::judge::registry::LanguageRegistry;
use crate::observability::metrics::get_metrics;
use crate::store::{MemoryStore, SubmissionStore};
use crate::strategy::ai::GeminiClient;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use nix::sys::signal::{SigSet, Signal};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// JSON configuration file (environment variables are applied on top)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Append structured judge events to this file as JSON lines
    #[arg(long, global = true)]
    audit_log: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Judge one source file against a problem definition
    Run {
        /// Problem JSON: problem fields plus a `test_cases` array
        #[arg(long)]
        problem: PathBuf,
        /// Programming language (python, javascript, cpp, c, java or an alias)
        #[arg(long)]
        language: String,
        /// Source file to judge
        #[arg(long, conflicts_with = "code")]
        source: Option<PathBuf>,
        /// Source code as string
        #[arg(long)]
        code: Option<String>,
        /// Submission id (generated when omitted)
        #[arg(long)]
        submission_id: Option<String>,
        /// Submitting user
        #[arg(long, default_value = "cli")]
        user_id: String,
        /// Ask the reasoning service to explain compile/runtime errors
        #[arg(long)]
        explain: bool,
        /// Print Prometheus metrics to stderr when done
        #[arg(long)]
        metrics: bool,
    },
    /// Ask the reasoning service for hints on an attempt
    Hints {
        #[arg(long)]
        problem: PathBuf,
        #[arg(long)]
        language: String,
        #[arg(long)]
        source: PathBuf,
    },
    /// List supported languages
    Languages,
    /// Check that every language toolchain is installed
    CheckDeps {
        /// Verbose output showing detailed version information
        #[arg(long, short)]
        verbose: bool,
    },
    /// Validate configuration and print the effective values
    CheckConfig,
}

/// Problem file layout accepted by `run` and `hints`
#[derive(Debug, Deserialize)]
struct ProblemFile {
    #[serde(flatten)]
    problem: Problem,
    #[serde(default)]
    test_cases: Vec<TestCase>,
}

fn read_problem(path: &Path) -> Result<ProblemFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read problem file {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse problem file {}", path.display()))
}

fn load_config(path: Option<&Path>) -> Result<JudgeConfig> {
    let config = JudgeConfig::load(path)?;
    validate_config(&config)?;
    Ok(config)
}

/// Block SIGINT, SIGTERM and SIGHUP in every thread and take them on a
/// dedicated one.
/// Must run before any other thread exists so the mask is inherited.
fn setup_signal_handlers() -> Result<()> {
    let mut signals = SigSet::empty();
    signals.add(Signal::SIGINT);
    signals.add(Signal::SIGTERM);
    signals.add(Signal::SIGHUP);
    signals
        .thread_block()
        .context("Failed to block termination signals")?;

    std::thread::Builder::new()
        .name("judge-signals".to_string())
        .spawn(move || match signals.wait() {
            Ok(signal) => shutdown(signal),
            Err(e) => log::error!("sigwait failed: {}", e),
        })
        .context("Failed to spawn signal thread")?;
    Ok(())
}

/// Judged programs run in their own process groups and never see the
/// terminal's signals; kill them and drop their workspaces before exiting.
fn shutdown(signal: Signal) -> ! {
    eprintln!("judgebox: received {}, stopping judged programs", signal);
    let groups = crate::exec::reap::kill_tracked_groups();
    let workspaces = crate::safety::workspace::remove_live_workspaces();
    log::info!(
        "Shutdown: killed {} process groups, removed {} workspaces",
        groups,
        workspaces
    );
    std::process::exit(128 + signal as i32);
}

/// A judgement cut short by a signal is not reported; the signal thread
/// owns the exit status.
fn hold_if_shutting_down() {
    if crate::exec::reap::shutting_down() {
        loop {
            std::thread::park();
        }
    }
}

pub fn run() -> Result<()> {
    setup_signal_handlers()?;
    env_logger::init();

    if !cfg!(unix) {
        eprintln!("Error: judgebox requires a Unix-like system (process groups, wait4)");
        std::process::exit(1);
    }

    let cli = Cli::parse();
    crate::observability::audit::init_audit_log(cli.audit_log.clone());

    match cli.command {
        Commands::Run {
            problem,
            language,
            source,
            code,
            submission_id,
            user_id,
            explain,
            metrics,
        } => {
            let config = load_config(cli.config.as_deref())?;
            let code = match (source, code) {
                (Some(path), _) => std::fs::read_to_string(&path)
                    .with_context(|| format!("Failed to read source file {}", path.display()))?,
                (None, Some(code)) => code,
                (None, None) => anyhow::bail!("one of --source or --code is required"),
            };
            let ProblemFile {
                problem,
                test_cases,
            } = read_problem(&problem)?;

            let accepted = judge_once(
                config,
                problem,
                test_cases,
                Submission::new(user_id, String::new(), language, code),
                submission_id,
                explain,
            )?;
            if metrics {
                eprint!("{}", get_metrics().export_prometheus());
            }
            if !accepted {
                std::process::exit(1);
            }
            Ok(())
        }
        Commands::Hints {
            problem,
            language,
            source,
        } => {
            let config = load_config(cli.config.as_deref())?;
            let code = std::fs::read_to_string(&source)
                .with_context(|| format!("Failed to read source file {}", source.display()))?;
            let problem = read_problem(&problem)?.problem;
            let client = GeminiClient::from_config(&config.ai).ok_or_else(|| {
                anyhow::anyhow!("hints need ai.enabled and an API key (GEMINI_API_KEY)")
            })?;
            let ai = crate::strategy::ai::AiJudge::new(
                Arc::new(client),
                Arc::new(MemoryStore::new()),
            );
            let hints = ai
                .hints(&problem, &code, &language)
                .ok_or_else(|| anyhow::anyhow!("reasoning service returned no usable hints"))?;
            println!("{}", serde_json::to_string_pretty(&hints)?);
            Ok(())
        }
        Commands::Languages => {
            for profile in LanguageRegistry::global().profiles() {
                let aliases = profile.aliases();
                if aliases.is_empty() {
                    println!("{:<12} .{}", profile.language(), profile.extension());
                } else {
                    println!(
                        "{:<12} .{:<5} (aliases: {})",
                        profile.language(),
                        profile.extension(),
                        aliases.join(", ")
                    );
                }
            }
            Ok(())
        }
        Commands::CheckDeps { verbose } => check_language_dependencies(verbose),
        Commands::CheckConfig => {
            let config = load_config(cli.config.as_deref())?;
            let mut shown = config.clone();
            if shown.ai.api_key.is_some() {
                shown.ai.api_key = Some("<redacted>".to_string());
            }
            println!("{}", serde_json::to_string_pretty(&shown)?);
            Ok(())
        }
    }
}

/// Judge a single submission in-process and print the final record.
/// Returns whether it was accepted.
fn judge_once(
    config: JudgeConfig,
    problem: Problem,
    test_cases: Vec<TestCase>,
    mut submission: Submission,
    submission_id: Option<String>,
    explain: bool,
) -> Result<bool> {
    submission.problem_id = problem.id.clone();
    if let Some(id) = submission_id {
        submission = submission.with_id(id);
    }

    let store = Arc::new(MemoryStore::new());
    let mut orchestrator = JudgeOrchestrator::new(config.clone(), store.clone(), store.clone());
    if let Some(client) = GeminiClient::from_config(&config.ai) {
        log::info!("AI judging enabled ({:?})", client);
        orchestrator = orchestrator.with_ai_client(Arc::new(client));
    }

    let swept = orchestrator.sweep_stale_workspaces();
    if swept > 0 {
        log::info!("Removed {} stale workspaces", swept);
    }

    let id = orchestrator.submit(submission)?;
    let report = orchestrator.judge(&id, &problem, &test_cases);
    hold_if_shutting_down();
    let report = report?;
    let record = store.get(&id)?;
    println!("{}", serde_json::to_string_pretty(&record)?);

    if explain && !report.is_accepted() {
        if let (Some(ai), Some(error)) = (orchestrator.ai(), report.error_message.as_deref()) {
            match ai.explain_error(&record.code, &record.language, error) {
                Some(explanation) => {
                    eprintln!("{}", serde_json::to_string_pretty(&explanation)?)
                }
                None => log::warn!("No error explanation available"),
            }
        }
    }

    Ok(report.is_accepted())
}

/// Check that each language profile's toolchain is on PATH
fn check_language_dependencies(verbose: bool) -> Result<()> {
    use std::process::{Command, Stdio};

    println!("Checking language toolchains...");
    println!();

    let mut missing_languages = Vec::new();

    for profile in LanguageRegistry::global().profiles() {
        let mut lang_ok = true;
        let mut versions = Vec::new();

        for binary in profile.toolchain() {
            match Command::new(binary)
                .arg("--version")
                .stdin(Stdio::null())
                .output()
            {
                Ok(output) if output.status.success() => {
                    let version_info = if !output.stdout.is_empty() {
                        String::from_utf8_lossy(&output.stdout)
                    } else {
                        String::from_utf8_lossy(&output.stderr)
                    }
                    .lines()
                    .next()
                    .unwrap_or("")
                    .to_string();
                    versions.push(format!("  {} -> {}", binary, version_info.trim()));
                }
                Ok(_) => {
                    lang_ok = false;
                    versions.push(format!("  {} -> FAILED", binary));
                }
                Err(_) => {
                    lang_ok = false;
                    versions.push(format!("  {} -> NOT FOUND", binary));
                }
            }
        }

        if lang_ok {
            println!("OK      {}", profile.language());
        } else {
            println!("MISSING {}", profile.language());
            missing_languages.push(profile.language());
        }
        if verbose || !lang_ok {
            for version in versions {
                println!("{}", version);
            }
        }
    }

    println!();
    if missing_languages.is_empty() {
        println!("All language toolchains are installed");
        Ok(())
    } else {
        println!(
            "Missing toolchains for: {} (submissions in these languages will get compile_error)",
            missing_languages.join(", ")
        );
        std::process::exit(1);
    }
}
