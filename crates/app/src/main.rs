use std::fmt;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use quiz_core::model::Difficulty;
use services::{
    Clock, GenerationApplied, HttpQuestionSource, QuizLoopService, QuizSession, RetryPolicy,
    RoundState, StaticSource, config,
};
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidCount { raw: String },
    MissingCategory,
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidCount { raw } => write!(f, "invalid --count value: {raw}"),
            ArgsError::MissingCategory => write!(f, "play requires --category or --topic"),
        }
    }
}

impl std::error::Error for ArgsError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p app -- categories [--catalog <path>]");
    eprintln!("  cargo run -p app -- play   --category <name> [--difficulty <level>] [--catalog <path>]");
    eprintln!("  cargo run -p app -- play   --topic <topic> [--count <1-20>]");
    eprintln!("  cargo run -p app -- export --out <path> [--catalog <path>]");
    eprintln!();
    eprintln!("During play: answer 1-4 before the timer runs out; an empty line skips.");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  QUIZ_CATALOG_PATH, QUIZ_AI_API_KEY, QUIZ_AI_BASE_URL, QUIZ_AI_MODEL,");
    eprintln!("  QUIZ_GENERATE_TIMEOUT_SECS, QUIZ_GENERATE_ATTEMPTS, QUIZ_TIME_LIMIT_SECS,");
    eprintln!("  RUST_LOG");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Categories,
    Play,
    Export,
}

impl Command {
    fn from_arg(arg: &str) -> Option<Self> {
        match arg {
            "categories" => Some(Self::Categories),
            "play" => Some(Self::Play),
            "export" => Some(Self::Export),
            _ => None,
        }
    }
}

#[derive(Debug, Default)]
struct Args {
    catalog: Option<PathBuf>,
    category: Option<String>,
    difficulty: Option<Difficulty>,
    topic: Option<String>,
    count: usize,
    out: Option<PathBuf>,
}

impl Args {
    fn parse(args: &mut impl Iterator<Item = String>) -> Result<Self, ArgsError> {
        let mut parsed = Self {
            count: 5,
            ..Self::default()
        };

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--catalog" => parsed.catalog = Some(require_value(args, "--catalog")?.into()),
                "--category" => parsed.category = Some(require_value(args, "--category")?),
                "--difficulty" => {
                    let value = require_value(args, "--difficulty")?;
                    parsed.difficulty = Some(Difficulty::from_label(&value));
                }
                "--topic" => parsed.topic = Some(require_value(args, "--topic")?),
                "--count" => {
                    let value = require_value(args, "--count")?;
                    parsed.count = value
                        .parse()
                        .map_err(|_| ArgsError::InvalidCount { raw: value.clone() })?;
                }
                "--out" => parsed.out = Some(require_value(args, "--out")?.into()),
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(parsed)
    }

    fn catalog_source(&self) -> StaticSource {
        self.catalog
            .as_ref()
            .map_or_else(StaticSource::from_env, StaticSource::from_path)
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

/// Stdin lines, read on their own thread so an unanswered prompt never blocks shutdown.
fn spawn_stdin_reader() -> mpsc::UnboundedReceiver<String> {
    let (tx, rx) = mpsc::unbounded_channel();
    std::thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            if tx.send(line).is_err() {
                break;
            }
        }
    });
    rx
}

enum Reply {
    Line(String),
    TimedOut,
    Closed,
}

async fn read_answer(
    input: &mut mpsc::UnboundedReceiver<String>,
    window: Option<Duration>,
) -> io::Result<Reply> {
    // Lines typed after the previous question closed are not answers to this one.
    while input.try_recv().is_ok() {}

    print!("> ");
    io::stdout().flush()?;
    let line = match window {
        Some(window) => match tokio::time::timeout(window, input.recv()).await {
            Ok(line) => line,
            Err(_) => return Ok(Reply::TimedOut),
        },
        None => input.recv().await,
    };
    Ok(line.map_or(Reply::Closed, |l| Reply::Line(l.trim().to_owned())))
}

/// Drive one round on stdin/stdout. Returns early on end of input.
async fn play_round(
    session: &mut QuizSession,
    input: &mut mpsc::UnboundedReceiver<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    while session.state() == RoundState::InRound {
        let Some(question) = session.current_question().cloned() else {
            break;
        };
        let progress = session.progress();
        println!();
        print!(
            "[{}/{}] score {}  ({}, {})",
            progress.answered + 1,
            progress.total,
            progress.score,
            question.category(),
            question.difficulty()
        );
        match progress.time_remaining {
            Some(left) => println!("  {}s to answer", left.num_seconds()),
            None => println!(),
        }
        println!("{}", question.text());
        for (i, option) in question.options().iter().enumerate() {
            println!("  {}. {option}", i + 1);
        }

        let window = session.time_remaining().and_then(|left| left.to_std().ok());
        let line = match read_answer(input, window).await? {
            Reply::Line(line) if !line.is_empty() => line,
            Reply::Line(_) | Reply::TimedOut => {
                println!();
                println!("Time's up! The answer was: {}", question.correct_option());
                session.timeout_current()?;
                continue;
            }
            Reply::Closed => {
                warn!("input closed mid-round");
                return Ok(());
            }
        };

        // Non-numeric input counts as a wrong answer, like any other miss.
        let choice = line
            .parse::<usize>()
            .ok()
            .and_then(|n| n.checked_sub(1))
            .unwrap_or(usize::MAX);
        let outcome = session.submit_answer(choice)?;
        if outcome.timed_out() {
            println!("Time's up! The answer was: {}", question.correct_option());
        } else if outcome.correct {
            println!("Correct! Well done!");
        } else {
            println!("Incorrect! The correct answer was: {}", question.correct_option());
        }
        if let Some(explanation) = outcome.explanation {
            println!("{explanation}");
        }
        session.advance()?;
    }

    let results = session.results()?;
    println!();
    println!("Quiz completed!");
    println!("Category: {}", results.category);
    println!("Final score: {}/{}", results.score, results.total);
    println!("Percentage: {}%", results.percentage_display());
    for row in &results.per_difficulty {
        println!(
            "  {:<7} {}/{} correct",
            row.difficulty.as_str(),
            row.correct,
            row.total
        );
    }
    Ok(())
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let argv: Vec<String> = std::env::args().skip(1).collect();

    let cmd = match argv.first().map(String::as_str) {
        None | Some("--help" | "-h") => {
            print_usage();
            return Ok(());
        }
        Some(first) => Command::from_arg(first).ok_or_else(|| {
            eprintln!("unknown subcommand: {first}");
            print_usage();
            io::Error::new(io::ErrorKind::InvalidInput, "unknown subcommand")
        })?,
    };

    let mut iter = argv.into_iter().skip(1);
    let args = Args::parse(&mut iter).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    let source = Arc::new(HttpQuestionSource::new(
        config::GeneratorConfig::from_env(),
        args.catalog_source(),
    ));
    let loop_svc = QuizLoopService::new(Clock::default(), source)
        .with_retry(RetryPolicy::from_env())
        .with_time_limit(config::time_limit_from_env());
    let mut session = loop_svc.new_session();

    match cmd {
        Command::Categories => {
            for entry in session.categories() {
                println!("{:<24} {}", entry.category, entry.count);
            }
            Ok(())
        }
        Command::Export => {
            let out = args.out.ok_or(ArgsError::MissingValue { flag: "--out" })?;
            StaticSource::save_catalog(&out, session.catalog())?;
            println!("wrote {} questions to {}", session.catalog().len(), out.display());
            Ok(())
        }
        Command::Play => {
            if let Some(topic) = args.topic.as_deref() {
                println!("Generating {} questions about {topic}...", args.count);
                match loop_svc.generate_into(&mut session, topic, args.count).await {
                    Ok(GenerationApplied::Accepted(batch)) => {
                        session.start_round_with(topic.trim(), None, &batch)?;
                    }
                    Ok(GenerationApplied::Ignored) => return Ok(()),
                    Err(err) => {
                        eprintln!("Failed to generate questions ({err}). Using default questions.");
                        info!(error = %err, "falling back to static catalog");
                        let category = match args.category.clone() {
                            Some(category) => category,
                            None => session
                                .categories()
                                .into_iter()
                                .next()
                                .map(|c| c.category)
                                .unwrap_or_default(),
                        };
                        session.start_round(&category, args.difficulty)?;
                    }
                }
            } else {
                let category = args.category.as_deref().ok_or(ArgsError::MissingCategory)?;
                session.start_round(category, args.difficulty)?;
            }
            let mut input = spawn_stdin_reader();
            play_round(&mut session, &mut input).await
        }
    }
}

#[tokio::main]
async fn main() {
    // A missing .env file is fine; real environment variables still apply.
    let _ = dotenvy::dotenv();
    init_tracing();

    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
