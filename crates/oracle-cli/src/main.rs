// oracle — operator CLI for Dungeon Oracle.
//
//   oracle chat --user 42 --name vex     local REPL standing in for a chat transport
//   oracle report [--day 2024-02-29]     compose a daily report and print it
//   oracle stats --user 42               one user's interaction and token totals
//   oracle leaderboard [--limit 10]      all-time top users
//   oracle scheduler                     run the daily report timer until Ctrl-C

use chrono::Utc;
use clap::{Parser, Subcommand};
use dungeon_oracle::atoms::types::{Rating, TimeRange, Vote};
use dungeon_oracle::engine::chaos::ChaosSettings;
use dungeon_oracle::engine::report::{compose_report, LogSink, ReportScheduler};
use dungeon_oracle::{EngineConfig, EngineError, EngineResult, EngineState, Intent, Outcome, Request, UserId};
use log::{error, info};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};

#[derive(Parser)]
#[command(name = "oracle", version, about = "Dungeon Oracle operator CLI")]
struct Cli {
    /// TOML config file; missing files fall back to defaults.
    #[arg(long, env = "ORACLE_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Print JSON instead of text where supported.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Interactive chat as one user.
    Chat {
        #[arg(long)]
        user: i64,
        #[arg(long)]
        name: Option<String>,
    },
    /// Compose the daily report for a local day (default: today).
    Report {
        #[arg(long)]
        day: Option<String>,
    },
    /// Totals for one user.
    Stats {
        #[arg(long)]
        user: i64,
    },
    /// All-time leaderboard.
    Leaderboard {
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
    /// Run the daily report scheduler until interrupted.
    Scheduler,
}

/// One REPL line, after the command word is split off.
#[derive(Debug, PartialEq)]
enum ChatLine {
    Ask(Intent, String),
    Rate(i64, Rating),
    SetChaos(ChaosSettings),
    Report,
    Help,
    Quit,
    Invalid(&'static str),
}

const CHAT_HELP: &str = "/advice <dilemma>  /quest  /continue <text>  /stop  /roll 2d6  /stats  /leaderboard\n\
                         /rate <id> up|down  /set_chaos <base> <slope> <max>  /report  /quit\n\
                         Plain text is treated as advice.";

fn parse_chat_line(line: &str) -> ChatLine {
    let line = line.trim();
    if !line.starts_with('/') {
        return ChatLine::Ask(Intent::Advice, line.to_string());
    }
    let (word, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
    let rest = rest.trim().to_string();
    match word {
        "/advice" => ChatLine::Ask(Intent::Advice, rest),
        "/quest" => ChatLine::Ask(Intent::Quest, rest),
        "/continue" => ChatLine::Ask(Intent::Continue, rest),
        "/stop" => ChatLine::Ask(Intent::Stop, rest),
        "/roll" => ChatLine::Ask(Intent::Roll, rest),
        "/stats" => ChatLine::Ask(Intent::Stats, rest),
        "/leaderboard" => ChatLine::Ask(Intent::Leaderboard, rest),
        "/rate" => {
            let parts: Vec<&str> = rest.split_whitespace().collect();
            match parts.as_slice() {
                [id, vote] => match (id.parse::<i64>(), *vote) {
                    (Ok(id), "up") => ChatLine::Rate(id, Rating::Up),
                    (Ok(id), "down") => ChatLine::Rate(id, Rating::Down),
                    _ => ChatLine::Invalid("Usage: /rate <id> up|down"),
                },
                _ => ChatLine::Invalid("Usage: /rate <id> up|down"),
            }
        }
        "/set_chaos" => {
            let nums: Result<Vec<f64>, _> = rest.split_whitespace().map(str::parse::<f64>).collect();
            match nums.as_deref() {
                Ok([base, slope, ceiling]) => {
                    ChatLine::SetChaos(ChaosSettings { base: *base, slope: *slope, ceiling: *ceiling })
                }
                _ => ChatLine::Invalid("Usage: /set_chaos <base> <slope> <max>"),
            }
        }
        "/report" => ChatLine::Report,
        "/help" | "/start" => ChatLine::Help,
        "/quit" | "/exit" => ChatLine::Quit,
        _ => ChatLine::Invalid("Unknown command. Try /help."),
    }
}

async fn chat(state: &EngineState, user: i64, name: Option<String>, json: bool) -> EngineResult<()> {
    let uid = UserId(user);
    println!("{}\n{}", state.config.bot_name, CHAT_HELP);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let now = Utc::now().timestamp();
        let printed = match parse_chat_line(&line) {
            ChatLine::Quit => break,
            ChatLine::Help => Ok(CHAT_HELP.to_string()),
            ChatLine::Invalid(usage) => Ok(usage.to_string()),
            ChatLine::Rate(id, rating) => state.rate(id, uid, rating, now).map(|vote| match vote {
                Vote::Counted(_) => "Noted, adventurer.".to_string(),
                Vote::Rejected(r) => r.user_message().to_string(),
            }),
            ChatLine::SetChaos(settings) => state.set_chaos(uid, settings).map(|_| {
                format!("Chaos tuned. base={}, slope={}, max={}", settings.base, settings.slope, settings.ceiling)
            }),
            ChatLine::Report => state.report_now(uid, now).map(|r| r.render(&state.config.bot_name)),
            ChatLine::Ask(intent, text) => {
                let request = Request {
                    user_id: uid,
                    display_name: name.clone(),
                    text,
                    channel_id: None,
                    timestamp: now,
                    intent,
                };
                state.handle(&request).await.map(|outcome| render_outcome(&outcome, json))
            }
        };
        match printed {
            Ok(text) => println!("{}\n", text),
            Err(e) => println!("{}\n", e.user_message()),
        }
    }
    Ok(())
}

fn render_outcome(outcome: &Outcome, json: bool) -> String {
    if json {
        return serde_json::to_string_pretty(outcome).unwrap_or_default();
    }
    match outcome {
        Outcome::Reply(r) => match r.interaction_row_id {
            Some(id) => format!("{}\n[#{} · /rate {} up|down]", r.text, id, id),
            None => r.text.clone(),
        },
        Outcome::Rejected(reason) => reason.user_message().to_string(),
    }
}

async fn run(cli: Cli) -> EngineResult<()> {
    let config = EngineConfig::load(cli.config.as_deref())?;
    let state = Arc::new(EngineState::open(config)?);

    match cli.command {
        Command::Chat { user, name } => chat(&state, user, name, cli.json).await,
        Command::Report { day } => {
            let day = day.unwrap_or_else(|| state.analytics.day_key(Utc::now().timestamp()));
            let report = compose_report(&state.analytics, &day)?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&report.snapshot)?);
            } else {
                println!("{}", report.render(&state.config.bot_name));
            }
            Ok(())
        }
        Command::Stats { user } => {
            let stats = state.store.user_stats(UserId(user))?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&stats)?);
            } else {
                println!("User {}: {} interactions, {} tokens", user, stats.interactions, stats.tokens);
            }
            Ok(())
        }
        Command::Leaderboard { limit } => {
            let rows = state.analytics.leaderboard(TimeRange::all(), limit)?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&rows)?);
            } else if rows.is_empty() {
                println!("No heroes yet.");
            } else {
                println!("{}", dungeon_oracle::engine::oracle::render_leaders(&rows, " rites"));
            }
            Ok(())
        }
        Command::Scheduler => {
            let scheduler = ReportScheduler::spawn(state.clone(), Arc::new(LogSink));
            info!("[report] Scheduler running; Ctrl-C to stop");
            tokio::signal::ctrl_c().await?;
            scheduler.shutdown().await;
            Ok(())
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            if let EngineError::Config(_) | EngineError::Toml(_) = e {
                eprintln!("config error: {}", e);
            }
            ExitCode::FAILURE
        }
    }
}
