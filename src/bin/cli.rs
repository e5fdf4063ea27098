//! hrbot CLI
//!
//! Terminal front end for the HR FAQ assistant.

use std::io::{self, BufRead, Write};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use chrono::Local;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use hrbot::analytics::UsageRecorder;
use hrbot::catalog::Catalog;
use hrbot::chatbot::{Chatbot, Response};
use hrbot::config::{ChatbotConfig, MAX_WINDOW_DAYS};
use hrbot::error::{HrBotError, Result};
use hrbot::session::ChatSession;

#[derive(Parser)]
#[command(name = "hrbot")]
#[command(about = "HR FAQ assistant CLI")]
#[command(version)]
struct Cli {
    /// Config file (TOML)
    #[arg(long, env = "HRBOT_CONFIG")]
    config: Option<String>,

    /// Catalog JSON file; the built-in catalog is used when unset
    #[arg(long, env = "HRBOT_CATALOG")]
    catalog: Option<String>,

    /// Analytics log file
    #[arg(long, env = "HRBOT_ANALYTICS_FILE")]
    analytics_file: Option<String>,

    /// Override the acceptance threshold (0-100)
    #[arg(long)]
    threshold: Option<f64>,

    /// Do not record queries
    #[arg(long)]
    no_log: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ask a single question
    Ask {
        /// The question
        question: String,
        /// Show the per-metric scores of the closest phrases
        #[arg(short, long)]
        explain: bool,
        /// Print the response as JSON
        #[arg(long)]
        json: bool,
        /// Session id to log under (random when unset)
        #[arg(short, long)]
        session: Option<String>,
    },
    /// Interactive chat
    Chat,
    /// Browse the FAQ catalog
    Faq {
        /// Only this category
        #[arg(short, long)]
        category: Option<String>,
        /// Case-insensitive search in questions and answers
        #[arg(short, long)]
        search: Option<String>,
    },
    /// List categories with entry counts
    Categories,
    /// Show usage statistics
    Stats {
        /// Window in days
        #[arg(
            short,
            long,
            value_parser = clap::value_parser!(u32).range(1..=i64::from(MAX_WINDOW_DAYS))
        )]
        days: Option<u32>,
        /// Number of top queries to show
        #[arg(short, long, default_value = "10")]
        top: usize,
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Rate a session
    Feedback {
        /// Session id
        session: String,
        /// Rating (1-5)
        rating: u8,
        /// Optional comment
        comment: Option<String>,
    },
    /// Print the effective configuration
    Config,
}

fn expand(path: &str) -> String {
    shellexpand::tilde(path).to_string()
}

fn load_config(cli: &Cli) -> Result<ChatbotConfig> {
    let mut config = match &cli.config {
        Some(path) => ChatbotConfig::load(expand(path))?,
        None => ChatbotConfig::default(),
    };

    if let Some(threshold) = cli.threshold {
        config.matching.threshold = threshold;
    }
    if let Some(path) = &cli.catalog {
        config.catalog_path = Some(path.clone());
    }
    if let Some(path) = &cli.analytics_file {
        config.analytics.data_file = path.clone();
    }

    config.validate()?;
    Ok(config)
}

fn load_catalog(config: &ChatbotConfig) -> Result<Catalog> {
    match &config.catalog_path {
        Some(path) => Catalog::load(expand(path)),
        None => Catalog::builtin(),
    }
}

/// Analytics failures never stop the assistant from answering
fn open_recorder(cli: &Cli, config: &ChatbotConfig) -> Option<UsageRecorder> {
    if cli.no_log {
        return None;
    }
    let path = expand(&config.analytics.data_file);
    match UsageRecorder::open_or_default(&path, config.analytics.clone()) {
        Ok(recorder) => Some(recorder),
        Err(e) => {
            tracing::warn!("Analytics disabled: {}", e);
            None
        }
    }
}

fn record(recorder: Option<&UsageRecorder>, session_id: &str, input: &str, response: &Response) {
    if let Some(recorder) = recorder {
        if let Err(e) = recorder.log_query(session_id, input, response) {
            tracing::warn!("Failed to record query: {}", e);
        }
    }
}

fn print_response(response: &Response) {
    println!("{}", response.answer());
    match response.category() {
        Some(category) => println!(
            "  [confidence {:.1}% | category {}]",
            response.confidence(),
            category
        ),
        None => println!("  [confidence {:.1}% | no match]", response.confidence()),
    }
    if !response.suggestions().is_empty() {
        println!("  Did you mean:");
        for (i, suggestion) in response.suggestions().iter().enumerate() {
            println!("    {}. {} ({:.0}%)", i + 1, suggestion.question, suggestion.score);
        }
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(false),
        )
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli).context("failed to load configuration")?;

    match &cli.command {
        Commands::Ask {
            question,
            explain,
            json,
            session,
        } => {
            let catalog = load_catalog(&config).context("failed to load catalog")?;
            let bot = Chatbot::new(&catalog, &config)?;
            let response = bot.classify(question);

            if *json {
                println!("{}", serde_json::to_string_pretty(&response)?);
            } else {
                print_response(&response);
            }

            if *explain {
                println!();
                println!("Closest phrases:");
                for m in bot.engine().find_top_matches(question, 5) {
                    println!(
                        "  {:5.1}  {} [{}]  exact={} substring={} reordered={} overlap={}",
                        m.score,
                        m.question,
                        m.category,
                        m.scores.exact,
                        m.scores.substring,
                        m.scores.reordered,
                        m.scores.token_overlap
                    );
                }
            }

            let recorder = open_recorder(&cli, &config);
            let session_id = session
                .clone()
                .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
            record(recorder.as_ref(), &session_id, question, &response);
        }

        Commands::Chat => {
            let catalog = load_catalog(&config).context("failed to load catalog")?;
            let bot = Arc::new(Chatbot::new(&catalog, &config)?);
            let recorder = open_recorder(&cli, &config);
            run_chat(bot, recorder.as_ref(), &config)?;
        }

        Commands::Faq { category, search } => {
            let catalog = load_catalog(&config).context("failed to load catalog")?;
            let entries = catalog.browse(category.as_deref(), search.as_deref());
            if entries.is_empty() {
                println!("No FAQ entries found.");
            }
            for entry in entries {
                println!("Q: {}", entry.canonical_question);
                println!("A: {}", entry.answer);
                println!("   category: {}", entry.category);
                if !entry.variants.is_empty() {
                    let shown: Vec<&str> =
                        entry.variants.iter().take(5).map(String::as_str).collect();
                    let more = if entry.variants.len() > 5 { ", ..." } else { "" };
                    println!("   also understood: {}{}", shown.join(", "), more);
                }
                println!();
            }
        }

        Commands::Categories => {
            let catalog = load_catalog(&config).context("failed to load catalog")?;
            for (category, count) in catalog.category_counts() {
                println!("{:<16} {}", category, count);
            }
            println!(
                "{} entries, {} phrasings",
                catalog.len(),
                catalog.phrase_count()
            );
        }

        Commands::Stats { days, top, json } => {
            let path = expand(&config.analytics.data_file);
            let recorder = UsageRecorder::open(&path, config.analytics.clone())
                .with_context(|| format!("failed to open analytics log {}", path))?;
            let days = days.unwrap_or(config.analytics.default_days);
            let log = recorder.snapshot();
            let now = Local::now();
            let summary = log.summary(now, days);
            let top_queries = log.top_queries(now, *top, days);

            if *json {
                let value = serde_json::json!({
                    "days": days,
                    "summary": summary,
                    "top_queries": top_queries,
                    "daily_trends": log.daily_trends(now, days),
                    "hourly_distribution": log.hourly_distribution(now, days),
                    "confidence": log.confidence_stats(now, days),
                });
                println!("{}", serde_json::to_string_pretty(&value)?);
            } else {
                println!("Last {} days", days);
                println!("  Queries:        {}", summary.total_queries);
                println!("  Sessions:       {}", summary.total_sessions);
                println!("  Fallback rate:  {:.2}%", summary.fallback_rate);
                println!("  Avg confidence: {:.2}", summary.avg_confidence);
                println!(
                    "  Feedback:       {} (avg {:.2})",
                    summary.feedback_stats.total_feedback,
                    summary.feedback_stats.average_rating
                );
                println!("Categories:");
                for (category, count) in &summary.top_categories {
                    println!("  {:<16} {}", category, count);
                }
                println!("Top queries:");
                for q in &top_queries {
                    println!("  {:>4}  {}", q.count, q.query);
                }
            }
        }

        Commands::Feedback {
            session,
            rating,
            comment,
        } => {
            let path = expand(&config.analytics.data_file);
            let recorder = UsageRecorder::open(&path, config.analytics.clone())
                .with_context(|| format!("failed to open analytics log {}", path))?;
            recorder.log_feedback(session, *rating, comment.as_deref())?;
            println!("Thanks for the feedback!");
        }

        Commands::Config => {
            print!("{}", config.to_toml_string()?);
        }
    }

    Ok(())
}

fn run_chat(
    bot: Arc<Chatbot>,
    recorder: Option<&UsageRecorder>,
    config: &ChatbotConfig,
) -> Result<()> {
    let rt = tokio::runtime::Runtime::new()?;
    let timeout = Duration::from_millis(config.session.query_timeout_ms);
    let mut session = ChatSession::new(&config.session);

    println!("HR Assistant (session {})", session.id());
    println!("Type a question, '/help' for commands, '/quit' to exit.");
    println!("Try:");
    for (i, q) in config.session.quick_questions.iter().enumerate() {
        println!("  /q{}  {}", i + 1, q);
    }
    println!();

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut lines = stdin.lock().lines();

    loop {
        print!("you> ");
        stdout.flush()?;

        let line = match lines.next() {
            Some(line) => line?,
            None => break,
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        if session.needs_rating_prompt(Local::now()) {
            println!("(You were away for a while. Rate this session with '/rate <1-5> [comment]'.)");
        }

        let picked = line
            .parse::<usize>()
            .ok()
            .and_then(|n| session.last_suggestions().get(n.wrapping_sub(1)).cloned());

        let (question, response) = match line {
            "/quit" | "/exit" => break,
            "/help" => {
                println!("Commands:");
                println!("  <question>             - Ask the assistant");
                println!("  <n>                    - Pick suggestion n from the last answer");
                println!("  /q<n>                  - Ask quick question n");
                println!("  /rate <1-5> [comment]  - Rate this session");
                println!("  /quit                  - Exit");
                continue;
            }
            _ if line.starts_with("/rate") => {
                rate_session(&mut session, recorder, line);
                continue;
            }
            _ if picked.is_some() => match picked {
                Some(suggestion) => {
                    let response = bot.resolve_suggestion(&suggestion);
                    (suggestion.question, response)
                }
                None => continue,
            },
            _ => {
                let question = if let Some(n) = line.strip_prefix("/q") {
                    match n
                        .parse::<usize>()
                        .ok()
                        .and_then(|n| config.session.quick_questions.get(n.wrapping_sub(1)))
                    {
                        Some(q) => q.clone(),
                        None => {
                            println!("Unknown quick question.");
                            continue;
                        }
                    }
                } else {
                    line.to_string()
                };
                let response = ask(&rt, &bot, &question, timeout)?;
                (question, response)
            }
        };

        print_response(&response);
        println!();

        session.record_exchange(&question, &response, Local::now());
        record(recorder, session.id(), &question, &response);
    }

    if let Some(recorder) = recorder {
        if let Err(e) = recorder.flush() {
            tracing::warn!("Failed to save analytics: {}", e);
        }
    }
    session.end();
    println!("Bye!");
    Ok(())
}

fn ask(
    rt: &tokio::runtime::Runtime,
    bot: &Arc<Chatbot>,
    question: &str,
    timeout: Duration,
) -> Result<Response> {
    match rt.block_on(Arc::clone(bot).classify_with_timeout(question.to_string(), timeout)) {
        Ok(response) => Ok(response),
        Err(HrBotError::Timeout(ms)) => {
            tracing::warn!("Classification exceeded {} ms", ms);
            Ok(Response::Fallback {
                answer: bot.fallback_message().to_string(),
                confidence: 0.0,
                suggestions: vec![],
            })
        }
        Err(e) => Err(e),
    }
}

fn rate_session(session: &mut ChatSession, recorder: Option<&UsageRecorder>, line: &str) {
    let mut parts = line.splitn(3, ' ');
    parts.next();
    let rating = parts.next().and_then(|r| r.parse::<u8>().ok());
    let comment = parts.next();

    let Some(rating) = rating else {
        println!("Usage: /rate <1-5> [comment]");
        return;
    };

    match recorder {
        Some(recorder) => match recorder.log_feedback(session.id(), rating, comment) {
            Ok(()) => {
                session.mark_rated();
                println!("Thanks for the feedback!");
            }
            Err(e) => println!("Could not save rating: {}", e),
        },
        None => {
            session.mark_rated();
            println!("Thanks! (analytics disabled, rating not stored)");
        }
    }
}
