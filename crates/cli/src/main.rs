// crates/cli/src/main.rs
//! `ailab` — terminal dashboard for an AI Lab instance.
//!
//! One-shot subcommands issue a single request; `--watch` (and `board`)
//! keep a live subscription open and re-render on every state change until
//! interrupted.

mod render;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

use ailab_client::{
    ApiClient, AwardProcessor, CancelOutcome, EnvTokens, FeedConfig, JobWatch, JobsWatch,
    JsonStatsStore, LeaderboardFeed, TransportPreference,
};

const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000/api/v1";

/// Resolve the API root: flag, then AILAB_BASE_URL, then the local default.
fn base_url(flag: Option<String>) -> String {
    flag.or_else(|| std::env::var("AILAB_BASE_URL").ok())
        .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("AILAB_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[derive(Parser)]
#[command(name = "ailab", version, about = "Terminal dashboard for an AI Lab instance")]
struct Cli {
    /// API root, e.g. http://127.0.0.1:8000/api/v1 (env: AILAB_BASE_URL).
    #[arg(long, global = true)]
    base_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List your jobs.
    Jobs {
        /// Keep the listing live until interrupted.
        #[arg(long)]
        watch: bool,
    },
    /// Show one job in detail.
    Job {
        id: u64,
        /// Keep the detail view live until interrupted.
        #[arg(long)]
        watch: bool,
    },
    /// Submit a command as a new job.
    Submit {
        command: String,
        #[arg(long, default_value = "python")]
        language: String,
    },
    /// Cancel a job (no-op if it already finished or failed).
    Cancel { id: u64 },
    /// Live leaderboard.
    Board {
        /// Force the polling transport instead of the event stream.
        #[arg(long)]
        poll: bool,
    },
    /// Award XP (env: AILAB_TOKEN).
    Award {
        xp: u64,
        #[arg(long, default_value = "lab")]
        source: String,
        #[arg(long)]
        source_id: Option<String>,
        /// Acting user id when no bearer token is configured.
        #[arg(long, default_value_t = 1)]
        user: u64,
    },
    /// Administrative catalog (env: AILAB_ADMIN_TOKEN).
    Admin {
        #[command(subcommand)]
        command: AdminCommand,
    },
}

#[derive(Subcommand)]
enum AdminCommand {
    /// List badge definitions.
    Badges,
    /// Create a badge definition.
    CreateBadge {
        code: String,
        name: String,
        #[arg(long)]
        description: Option<String>,
    },
    /// List award rules.
    Rules,
    /// Create an award rule. Params are raw JSON.
    CreateRule {
        code: String,
        rule_type: String,
        #[arg(long)]
        params: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let base = base_url(cli.base_url);
    tracing::debug!(%base, "using API root");
    let api = ApiClient::new(base, Arc::new(EnvTokens));

    match cli.command {
        Command::Jobs { watch: false } => {
            let jobs = api.list_jobs().await?;
            render::jobs_table(&jobs);
        }
        Command::Jobs { watch: true } => {
            let jobs = JobsWatch::start(api);
            watch_loop(jobs.subscribe(), render::jobs).await;
            jobs.stop();
        }
        Command::Job { id, watch: false } => {
            let job = api.get_job(id).await?;
            render::job_detail(&job);
        }
        Command::Job { id, watch: true } => {
            let job = JobWatch::start(api, id);
            watch_loop(job.subscribe(), render::job).await;
            job.stop();
        }
        Command::Submit { command, language } => {
            let ack = api
                .submit_job(&language, serde_json::json!({"command": command}))
                .await?;
            match ack.job_id {
                Some(id) => println!(
                    "Submitted job #{id} ({})",
                    ack.status.map(|s| s.to_string()).unwrap_or_else(|| "queued".into())
                ),
                None => println!("Submitted (no id returned)"),
            }
        }
        Command::Cancel { id } => cancel_job(api, id).await?,
        Command::Board { poll } => {
            let config = FeedConfig {
                transport: if poll { TransportPreference::Poll } else { TransportPreference::Auto },
                ..FeedConfig::default()
            };
            let feed = LeaderboardFeed::with_config(api, config);
            watch_loop(feed.subscribe(), render::board).await;
            feed.stop();
        }
        Command::Award { xp, source, source_id, user } => {
            let store = Arc::new(
                JsonStatsStore::default_location().context("locating local stats file")?,
            );
            let awards = AwardProcessor::new(api, user, store);
            let outcome = awards.award(xp, &source, source_id.as_deref()).await?;
            if outcome.is_deferred() {
                println!("Server unreachable — credited {xp} XP locally.");
            } else {
                println!("Awarded {xp} XP.");
            }
            if let Some(level_up) = outcome.level_up() {
                println!("Level up! Now level {} with {} XP.", level_up.level, level_up.xp);
            }
        }
        Command::Admin { command } => run_admin(api, command).await?,
    }

    Ok(())
}

/// Re-render on every state change until ctrl-c (or the publisher stops).
async fn watch_loop<T, F>(mut rx: watch::Receiver<T>, render: F)
where
    F: Fn(&T),
{
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            changed = rx.changed() => {
                if changed.is_err() {
                    break;
                }
                render(&rx.borrow());
                println!();
            }
        }
    }
}

/// Cancel with the terminal-status suppression applied at the affordance
/// level: a finished/failed job gets no cancel request at all.
async fn cancel_job(api: ApiClient, id: u64) -> Result<()> {
    let job = JobWatch::start(api, id);
    let mut rx = job.subscribe();
    let first = tokio::time::timeout(Duration::from_secs(10), rx.wait_for(|v| v.seq > 0))
        .await
        .context("timed out fetching job")?;
    let view = match first {
        Ok(view) => view.clone(),
        Err(_) => anyhow::bail!("job watch closed unexpectedly"),
    };
    if let Some(error) = view.error {
        anyhow::bail!("could not fetch job #{id}: {error}");
    }
    match job.cancel().await? {
        CancelOutcome::AlreadyTerminal => {
            let status = view.data.map(|j| j.status.to_string()).unwrap_or_default();
            println!("Job #{id} is already {status}; nothing to cancel.");
        }
        CancelOutcome::Requested => println!("Cancel requested for job #{id}."),
    }
    job.stop();
    Ok(())
}

async fn run_admin(api: ApiClient, command: AdminCommand) -> Result<()> {
    match command {
        AdminCommand::Badges => render::badges(&api.list_badges().await?),
        AdminCommand::CreateBadge { code, name, description } => {
            let badge = api.create_badge(&code, &name, description.as_deref()).await?;
            println!("Created badge #{} ({})", badge.id, badge.code);
        }
        AdminCommand::Rules => render::rules(&api.list_rules().await?),
        AdminCommand::CreateRule { code, rule_type, params } => {
            let params: Option<serde_json::Value> = params
                .map(|raw| serde_json::from_str(&raw).context("params must be valid JSON"))
                .transpose()?;
            let rule = api.create_rule(&code, &rule_type, params.as_ref()).await?;
            println!("Created rule #{} ({})", rule.id, rule.code);
        }
    }
    Ok(())
}
