//! Tutor Loop CLI
//!
//! Interactive terminal front end: pick a topic, read lessons, answer
//! questions.

use std::io::Write;
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tracing_subscriber::EnvFilter;
use tutor_engine::{
    Config, ContentProvider, GeminiProvider, ProviderKind, ScriptedProvider, SessionEngine,
    SessionSnapshot, SessionStatus,
};
use tutor_progress::{MarkdownGenerator, ProgressSummary};

type Input = Lines<BufReader<Stdin>>;

/// Tutor Loop - Interactive Tutoring Sessions
///
/// Builds a learning path for a topic, teaches each subtopic and evaluates
/// your answers before moving on.
#[derive(Parser, Debug)]
#[command(name = "tutor")]
#[command(version, about, long_about = None)]
struct Args {
    /// Topic to study (prompted for when omitted)
    #[arg(value_name = "TOPIC")]
    topic: Option<String>,

    /// Path to configuration file (default: tutor.json in current directory)
    #[arg(short, long, value_name = "FILE")]
    config: Option<String>,

    /// Subject area the topic belongs to
    #[arg(short, long, default_value = "General")]
    subject: String,

    /// Learner level
    #[arg(short, long, default_value = "Beginner")]
    level: String,

    /// What you already know about the topic
    #[arg(short, long, default_value = "")]
    prerequisites: String,

    /// Learner name recorded in the progress log
    #[arg(short, long)]
    user: Option<String>,

    /// Run without a content provider, using built-in lessons only
    #[arg(long)]
    offline: bool,

    /// Print the progress history and exit
    #[arg(long)]
    history: bool,

    /// Enable verbose output (sets log level to debug)
    #[arg(short, long)]
    verbose: bool,
}

/// A line typed at the answer prompt.
#[derive(Debug, PartialEq, Eq)]
enum Command {
    Answer(String),
    NewQuestion,
    Lesson,
    State,
    Reset,
    Help,
    Quit,
}

impl Command {
    fn parse(line: &str) -> Self {
        match line.trim() {
            "/new" | "/question" => Self::NewQuestion,
            "/lesson" => Self::Lesson,
            "/state" => Self::State,
            "/reset" => Self::Reset,
            "/help" | "/?" => Self::Help,
            "/quit" | "/exit" => Self::Quit,
            text => Self::Answer(text.to_string()),
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if args.verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    tracing::debug!(config = ?args.config, "Config file");

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::from(1)
        }
    }
}

/// Loads configuration, builds the engine and runs sessions until the
/// learner quits.
async fn run(args: Args) -> anyhow::Result<()> {
    let mut config = load_config(args.config.as_deref())?;

    if let Some(ref user) = args.user {
        config.user.clone_from(user);
    }
    if args.offline {
        config.provider.kind = ProviderKind::Offline;
    }
    if config.provider.kind == ProviderKind::Offline {
        // Nothing to retry against.
        config.retry.max_attempts = 1;
    }

    config.validate()?;

    if args.history {
        // Reading the history needs no content provider.
        let engine = SessionEngine::from_config(&config, Arc::new(ScriptedProvider::new()));
        return print_history(&engine);
    }

    print_config(&config);

    let provider = build_provider(&config)?;
    let mut engine = SessionEngine::from_config(&config, provider);
    let mut input = BufReader::new(tokio::io::stdin()).lines();
    let mut next_topic = args.topic.clone();

    loop {
        let topic = match next_topic.take() {
            Some(topic) => topic,
            None => match prompt(&mut input, "Topic to study (empty to quit): ").await? {
                Some(topic) if !topic.trim().is_empty() => topic,
                _ => break,
            },
        };

        match engine
            .start(&args.subject, &args.level, &topic, &args.prerequisites)
            .await
        {
            Ok(turn) => print_message(&turn.message),
            Err(e) if e.is_input_error() => {
                println!("{e}");
                continue;
            }
            Err(e) => return Err(e.into()),
        }

        if !teach(&mut engine, &mut input).await? {
            break;
        }
    }

    print_farewell(&engine);
    Ok(())
}

/// Runs one session. Returns `false` when the learner wants to quit.
async fn teach(engine: &mut SessionEngine, input: &mut Input) -> anyhow::Result<bool> {
    loop {
        match engine.status() {
            SessionStatus::Teaching => {
                let lesson = engine.get_current_lesson().await?;
                print_message(&lesson.message);
            }
            SessionStatus::AwaitingAnswer => {
                let Some(line) = prompt(input, "Your answer (/help for commands): ").await? else {
                    return Ok(false);
                };
                match Command::parse(&line) {
                    Command::Answer(answer) => match engine.submit_answer(&answer).await {
                        Ok(outcome) => {
                            print_message(&outcome.message);
                            tracing::debug!(
                                verdict = %outcome.evaluation.verdict,
                                score = outcome.evaluation.score(),
                                "Answer scored"
                            );
                        }
                        Err(e) if e.is_input_error() => println!("{e}"),
                        Err(e) => return Err(e.into()),
                    },
                    Command::NewQuestion => {
                        let turn = engine.request_new_question().await?;
                        print_message(&turn.message);
                    }
                    Command::Lesson => {
                        let lesson = engine.get_current_lesson().await?;
                        print_message(&lesson.message);
                    }
                    Command::State => print_state(&engine.get_state()),
                    Command::Reset => {
                        engine.reset();
                        println!("Session reset.");
                        return Ok(true);
                    }
                    Command::Help => print_help(),
                    Command::Quit => return Ok(false),
                }
            }
            SessionStatus::Finished => {
                engine.choose_new_topic()?;
                return Ok(true);
            }
            SessionStatus::Uninitialized | SessionStatus::AwaitingTopicSelection => {
                return Ok(true);
            }
        }
    }
}

/// Prints `label` and reads one line. Returns `None` at end of input.
async fn prompt(input: &mut Input, label: &str) -> anyhow::Result<Option<String>> {
    print!("\n{label}");
    std::io::stdout().flush()?;
    Ok(input.next_line().await?)
}

/// Loads configuration from the specified path or default location.
fn load_config(config_path: Option<&str>) -> anyhow::Result<Config> {
    match config_path {
        Some(path_str) => {
            let path = Path::new(path_str);
            if !path.exists() {
                anyhow::bail!(
                    "Config file not found: '{}'\n\nSuggestion: Check the path or remove the --config flag to use defaults",
                    path.display()
                );
            }
            Config::load_from_file(path).map_err(|e| anyhow::anyhow!("{e}"))
        }
        None => Config::load().map_err(|e| anyhow::anyhow!("{e}")),
    }
}

/// Creates the content provider selected by the configuration.
fn build_provider(config: &Config) -> anyhow::Result<Arc<dyn ContentProvider>> {
    match config.provider.kind {
        ProviderKind::Gemini => {
            let provider = GeminiProvider::from_config(&config.provider)?;
            tracing::info!(endpoint = provider.endpoint(), "Using Gemini provider");
            Ok(Arc::new(provider))
        }
        ProviderKind::Offline => {
            tracing::info!("Offline mode: using built-in content");
            Ok(Arc::new(ScriptedProvider::new()))
        }
    }
}

/// Prints the loaded configuration.
fn print_config(config: &Config) {
    println!("Configuration loaded:");
    println!("  User: {}", config.user);
    println!("  Provider: {:?}", config.provider.kind);
    if config.provider.kind == ProviderKind::Gemini {
        println!("  Model: {}", config.provider.model);
    }
    println!("  Curriculum size: {}", config.curriculum_size);
    let policy = config.retry_policy();
    println!("  Attempts per request: {}", policy.max_attempts);
    if let Some(worst_case) = policy.worst_case() {
        println!("  Longest wait per request: {}s", worst_case.as_secs());
    }
    println!("  Progress file: {}", config.progress_file);
}

/// Prints a tutor message surrounded by blank lines.
fn print_message(message: &str) {
    println!();
    println!("{}", message.trim_end());
}

fn print_help() {
    println!("Type your answer and press Enter, or use one of:");
    println!("  /new     ask for a different question");
    println!("  /lesson  show the current lesson again");
    println!("  /state   show session progress");
    println!("  /reset   abandon this session and pick another topic");
    println!("  /quit    leave the tutor");
}

/// Prints where the session stands.
fn print_state(state: &SessionSnapshot) {
    println!("Status: {}", state.status);
    if let Some(ref topic) = state.topic {
        println!("Topic: {topic}");
    }
    for (i, name) in state.curriculum.iter().enumerate() {
        let marker = match i.cmp(&state.current_index) {
            std::cmp::Ordering::Less => "x",
            std::cmp::Ordering::Equal => ">",
            std::cmp::Ordering::Greater => " ",
        };
        println!("  [{marker}] {}. {name}", i + 1);
    }
    println!("Progress: {:.0}%", state.progress * 100.0);
}

/// Prints the progress history as Markdown.
fn print_history(engine: &SessionEngine) -> anyhow::Result<()> {
    let entries = engine.history()?;
    println!("{}", MarkdownGenerator::new(&entries).generate());
    Ok(())
}

/// Prints a short summary of recorded sessions on exit.
fn print_farewell(engine: &SessionEngine) {
    match engine.history() {
        Ok(entries) if !entries.is_empty() => {
            let summary = ProgressSummary::from_entries(&entries);
            println!();
            println!("=== Progress ===");
            println!("Sessions completed: {}", summary.sessions);
            if let Some(average) = summary.average_score {
                println!("Average score: {average:.0}/100");
            }
            if let Some(best) = summary.best_score {
                println!("Best score: {best}/100");
            }
        }
        Ok(_) => {}
        Err(e) => tracing::warn!(error = %e, "Could not read progress log"),
    }
    println!("Goodbye!");
}
