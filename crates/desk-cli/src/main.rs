//! tradedesk command-line interface
//!
//! # Usage
//!
//! ```bash
//! # Point at the backend (defaults to http://127.0.0.1:8000)
//! export DESK_API_BASE_URL="http://127.0.0.1:8000"
//!
//! tradedesk resolve SOL --name Solana
//! tradedesk chart ETH --range 1W
//! tradedesk plan --goal "Should I trim my BTC position?" --token BTC
//! tradedesk chat --token BTC
//! ```

use anyhow::Context;
use clap::{Parser, Subcommand};
use desk_chat::{ChatContext, ChatError, ChatSession, HttpChatTransport, NewsClient, SessionMode};
use desk_market::{CoinGeckoClient, PriceChartPanel, RangeKey, RangeSeriesFetcher, SymbolResolver};
use desk_planner::{HttpPlanTransport, PlanRequest, PlanRun, PlanStatus, PlanStep, PlanStreamConsumer, StreamFraming};
use desk_utils::DeskConfig;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "tradedesk")]
#[command(about = "Market charts, planner runs and news chat from the terminal", long_about = None)]
struct Args {
    /// JSON configuration file; environment variables override it
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Resolve a trading symbol to its CoinGecko id
    Resolve {
        symbol: String,
        /// Display name used for the catalog search
        #[arg(long)]
        name: Option<String>,
    },
    /// Print the price series of a symbol
    Chart {
        symbol: String,
        #[arg(long)]
        name: Option<String>,
        /// One of 1H, 1D, 1W, 1M, 1Y, ALL
        #[arg(short, long, default_value = "1Y")]
        range: RangeKey,
    },
    /// Run the multi-step planner, printing steps as they arrive
    Plan {
        #[arg(short, long)]
        goal: String,
        #[arg(short, long)]
        token: Option<String>,
        #[arg(long)]
        user_id: Option<String>,
        #[arg(long)]
        max_steps: Option<u32>,
        #[arg(long)]
        stop_score: Option<f64>,
        /// Use the JSON-lines stream instead of server-sent events
        #[arg(long)]
        jsonl: bool,
        /// Wait for the whole plan instead of streaming it
        #[arg(long, conflicts_with = "jsonl")]
        blocking: bool,
    },
    /// Chat about a token, grounded on its latest news
    Chat {
        #[arg(short, long)]
        token: String,
    },
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<DeskConfig> {
    let config = match path {
        Some(path) => DeskConfig::from_file(path).with_context(|| format!("loading {}", path.display()))?,
        None => DeskConfig::default(),
    }
    .with_env();
    config.validate()?;
    Ok(config)
}

async fn resolve(config: &DeskConfig, symbol: &str, name: Option<&str>) -> anyhow::Result<()> {
    let resolver = SymbolResolver::new(Arc::new(CoinGeckoClient::from_config(config)?));
    let id = resolver
        .resolve(symbol, name)
        .await
        .ok_or_else(|| desk_core::Error::Unresolvable(symbol.to_string()))?;
    println!("{symbol} -> {id}");
    Ok(())
}

async fn chart(config: &DeskConfig, symbol: &str, name: Option<&str>, range: RangeKey) -> anyhow::Result<()> {
    let api = Arc::new(CoinGeckoClient::from_config(config)?);
    let panel = PriceChartPanel::new(
        Arc::new(SymbolResolver::new(api.clone())),
        Arc::new(RangeSeriesFetcher::new(api)),
    );

    panel.select_range(range).await;
    panel.select_symbol(symbol, name).await;

    let snapshot = panel.snapshot();
    if let Some(error) = &snapshot.error {
        println!("{error}");
        return Ok(());
    }

    println!(
        "{} ({}) {} - {} points",
        snapshot.symbol,
        snapshot.catalog_id.as_deref().unwrap_or("?"),
        snapshot.range,
        snapshot.points.len()
    );
    for (label, point) in snapshot.labels().iter().zip(&snapshot.points) {
        println!("  {label:>10}  {:.4}", point.price);
    }
    Ok(())
}

fn print_step(step: &PlanStep) {
    match step.score {
        Some(score) => println!("Step {}: {} (score {score:.2})", step.index, step.action),
        None => println!("Step {}: {}", step.index, step.action),
    }
    if !step.thought.is_empty() {
        println!("  {}", step.thought);
    }
    if !step.candidate_tools.is_empty() {
        let tools: Vec<String> = step
            .candidate_tools
            .iter()
            .map(|c| format!("{}: {:.2}", c.name, c.score))
            .collect();
        println!("  candidates: {}", tools.join(", "));
    }
    if !step.result.is_empty() {
        println!("  -> {}", step.result);
    }
}

fn print_final(answer: Option<&str>, context: Option<&serde_json::Value>) -> anyhow::Result<()> {
    println!("\nFinal answer: {}", answer.unwrap_or("(none)"));
    if let Some(context) = context.filter(|c| !c.is_null()) {
        println!("Context:\n{}", serde_json::to_string_pretty(context)?);
    }
    Ok(())
}

async fn plan(config: &DeskConfig, request: PlanRequest, framing: StreamFraming, blocking: bool) -> anyhow::Result<()> {
    let transport = HttpPlanTransport::from_config(config)?.with_framing(framing);

    if blocking {
        let outcome = transport.run_plan(&request).await?;
        for step in &outcome.steps {
            print_step(step);
        }
        return print_final(outcome.final_answer.as_deref(), outcome.context.as_ref());
    }

    let consumer = PlanStreamConsumer::new(Arc::new(transport));
    let handle = consumer.start_plan(request).await.map_err(desk_core::Error::from)?;
    let generation = handle.generation();
    let mut updates = consumer.subscribe();
    let mut printed = 0;

    let run: PlanRun = loop {
        let run = updates.borrow_and_update().clone();
        if run.generation == generation {
            for step in run.steps.iter().skip(printed) {
                print_step(step);
            }
            printed = run.steps.len();
            if run.status.is_terminal() {
                break run;
            }
        }
        if updates.changed().await.is_err() {
            break handle.finished().await;
        }
    };

    match run.status {
        PlanStatus::Completed => print_final(run.final_answer.as_deref(), run.context.as_ref()),
        _ => anyhow::bail!(run.error.unwrap_or_else(|| format!("plan run {:?}", run.status))),
    }
}

/// User-facing line for a failed chat turn
fn describe_chat_error(err: ChatError) -> String {
    let err = desk_core::Error::from(err);
    if err.is_retryable() {
        format!("{err} (send again to retry)")
    } else {
        err.to_string()
    }
}

async fn chat(config: &DeskConfig, token: &str) -> anyhow::Result<()> {
    let news = NewsClient::from_config(config)?;
    let ctx = match ChatContext::from_news(&news, token).await {
        Ok(ctx) => ctx,
        Err(e) => {
            warn!(error = %e, "could not load news documents");
            ChatContext::new(token)
        },
    };
    println!("Loaded {} news documents for {token}. Type /exit to quit.", ctx.available_docs.len());

    let session = ChatSession::new(Arc::new(HttpChatTransport::from_config(config)?));
    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        print!("{token}> ");
        stdout.flush()?;

        let mut input = String::new();
        match stdin.lock().read_line(&mut input) {
            Ok(0) => break,
            Ok(_) => {},
            Err(e) => {
                eprintln!("Error reading input: {e}");
                continue;
            },
        }

        let input = input.trim();
        if input.is_empty() {
            continue;
        }
        if input == "/exit" {
            break;
        }

        let was_bootstrap = session.mode() == SessionMode::NoSession;
        session.set_draft(input);
        match session.submit(&ctx).await {
            Ok(reply) => {
                if was_bootstrap {
                    info!(session = %reply.session_id, "chat session started");
                    if let Some(short) = session.short_session_id() {
                        println!("[session {short}]");
                    }
                }
                println!("{}\n", reply.answer.as_deref().unwrap_or("(no answer)"));
            },
            Err(e) => eprintln!("{}\n", describe_chat_error(e)),
        }
    }

    println!("Goodbye!");
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    desk_utils::init_tracing_with("warn");

    let args = Args::parse();
    let config = load_config(args.config.as_ref())?;
    info!(api = %config.api_base(), catalog = %config.catalog_base(), "configuration loaded");

    match args.command {
        Command::Resolve { symbol, name } => resolve(&config, &symbol, name.as_deref()).await,
        Command::Chart { symbol, name, range } => chart(&config, &symbol, name.as_deref(), range).await,
        Command::Plan {
            goal,
            token,
            user_id,
            max_steps,
            stop_score,
            jsonl,
            blocking,
        } => {
            let mut request = PlanRequest::new(goal).with_config(&config);
            if let Some(token) = token {
                request = request.token(token);
            }
            if let Some(user_id) = user_id {
                request = request.user_id(user_id);
            }
            if let Some(max_steps) = max_steps {
                request = request.max_steps(max_steps);
            }
            if let Some(stop_score) = stop_score {
                request = request.stop_score(stop_score);
            }
            let framing = if jsonl { StreamFraming::JsonLines } else { StreamFraming::Sse };
            plan(&config, request, framing, blocking).await
        },
        Command::Chat { token } => chat(&config, &token).await,
    }
}
