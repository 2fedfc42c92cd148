mod browser;
mod cache;
mod config;
mod fetch;
mod models;
mod replicate;
mod session;
mod shutdown;

use anyhow::Result;
use clap::Parser;
use std::io::Write as _;
use tracing::warn;

use crate::browser::BrowserSession;
use crate::cache::PageCache;
use crate::config::Config;
use crate::fetch::WishlistClient;
use crate::models::{AppId, ReplicationReport};
use crate::replicate::Replicator;
use crate::shutdown::Shutdown;

#[derive(Parser)]
#[command(
    name = "wishcopy",
    version,
    about = "Copy a Steam account's public wishlist to another account"
)]
struct Args {
    /// Source Steam user id to copy the wishlist from (prompted when absent).
    #[arg(long)]
    user: Option<String>,

    /// Only replicate the first N games (useful for testing).
    #[arg(long)]
    limit: Option<usize>,

    /// Download and preview the wishlist without logging in or adding games.
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "wishcopy=info".into()),
        )
        .init();

    let args = Args::parse();
    let config = Config::load()?;

    // The interrupt listener must exist before the cache directory
    // does, so a Ctrl-C at any later point still reaches the cleanup
    // below instead of terminating the process.
    let shutdown = Shutdown::listen();

    let cache = PageCache::create(&config.cache_dir)?;
    let result = run(&args, &config, &cache, &shutdown).await;

    // The page cache is transient. Remove it on every exit path,
    // including fatal errors and interrupts.
    if let Err(err) = cache.remove() {
        warn!(error = %err, "failed to remove page cache");
    }

    result
}

async fn run(args: &Args, config: &Config, cache: &PageCache, shutdown: &Shutdown) -> Result<()> {
    let source_user = match &args.user {
        Some(user) => user.clone(),
        None => {
            let prompted = cancellable(shutdown, || {
                prompt("Input user ID that you want to copy from: ")
            })
            .await?;
            match prompted {
                Some(user) => user,
                None => return interrupted(),
            }
        }
    };

    let client = WishlistClient::new(config.clone())?;
    let mut app_ids = tokio::select! {
        ids = client.fetch(&source_user, cache) => ids?,
        () = shutdown.cancelled() => return interrupted(),
    };

    if app_ids.is_empty() {
        println!("No games found in wishlist. Exiting.");
        return Ok(());
    }

    if let Some(limit) = args.limit {
        println!("Limiting to the first {limit} games (--limit flag)");
        apply_limit(&mut app_ids, limit);
        if app_ids.is_empty() {
            println!("Nothing to replicate with that limit. Exiting.");
            return Ok(());
        }
    }

    print_preview(config, &app_ids);

    if args.dry_run {
        println!("Dry run: no games were added.");
        return Ok(());
    }

    let Some(username) =
        cancellable(shutdown, || prompt("Input your Steam username: ")).await?
    else {
        return interrupted();
    };
    let Some(password) = cancellable(shutdown, || -> Result<String> {
        Ok(rpassword::prompt_password("Input your Steam password: ")?)
    })
    .await?
    else {
        return interrupted();
    };

    let session = BrowserSession::launch().await?;
    let result = replicate_phase(&session, config, &app_ids, &username, &password, shutdown).await;

    // Release the browser whether replication succeeded or not.
    if let Err(err) = session.close().await {
        warn!(error = %err, "failed to close browser session");
    }

    result
}

async fn replicate_phase(
    session: &BrowserSession,
    config: &Config,
    app_ids: &[AppId],
    username: &str,
    password: &str,
    shutdown: &Shutdown,
) -> Result<()> {
    session.login(config, username, password).await?;

    let confirmed = cancellable(shutdown, || {
        prompt("Press Enter after completing login (including Steam Guard if needed)...")
    })
    .await?;
    if confirmed.is_none() {
        return interrupted();
    }

    println!(
        "\nAdding {} games to the wishlist, with a {}s pause after each add to avoid rate limiting.\n",
        app_ids.len(),
        config.add_delay.as_secs()
    );

    let replicator = Replicator::new(config.clone());
    let mut report = ReplicationReport::default();

    tokio::select! {
        () = replicator.run(session, app_ids, &mut report) => {}
        () = shutdown.cancelled() => {
            println!("\nInterrupted; reporting partial totals.");
        }
    }

    print_summary(app_ids.len(), &report);
    Ok(())
}

/// Runs a blocking prompt on its own thread so an interrupt is honored
/// even while stdin is waiting. `None` means the run was interrupted.
async fn cancellable<T, F>(shutdown: &Shutdown, task: F) -> Result<Option<T>>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    let (tx, rx) = tokio::sync::oneshot::channel();
    // Plain detached thread: an abandoned stdin read must not keep the
    // runtime from shutting down the way a blocking-pool task would.
    std::thread::spawn(move || {
        let _ = tx.send(task());
    });

    tokio::select! {
        result = rx => match result {
            Ok(value) => Ok(Some(value?)),
            Err(_) => anyhow::bail!("Prompt thread exited unexpectedly"),
        },
        () = shutdown.cancelled() => Ok(None),
    }
}

fn interrupted() -> Result<()> {
    println!("\nInterrupted.");
    Ok(())
}

fn apply_limit(app_ids: &mut Vec<AppId>, limit: usize) {
    app_ids.truncate(limit);
}

fn prompt(label: &str) -> Result<String> {
    print!("{label}");
    std::io::stdout().flush()?;
    let mut line = String::new();
    std::io::stdin().read_line(&mut line)?;
    Ok(line.trim().to_string())
}

/// Prints the games that are about to be replicated, plus a duration
/// estimate based on the per-add rate-limit pause.
fn print_preview(config: &Config, app_ids: &[AppId]) {
    println!("\nTotal games to be added: {}", app_ids.len());
    println!("First {} game IDs:", app_ids.len().min(10));
    for (idx, app_id) in app_ids.iter().take(10).enumerate() {
        println!("  {}. App ID: {}", idx + 1, app_id);
        println!("     URL: {}", config.app_url(app_id));
    }
    if app_ids.len() > 10 {
        println!("  ... and {} more games", app_ids.len() - 10);
    }

    let estimate = app_ids.len() as f64 * config.add_delay.as_secs_f64() / 60.0;
    println!("Estimated time: ~{estimate:.1} minutes");
}

fn print_summary(total: usize, report: &ReplicationReport) {
    println!("\nSummary");
    println!("  Total games: {total}");
    println!("  Added: {}", report.added);
    println!("  Skipped (already in wishlist): {}", report.skipped);
    println!("  Errors: {}", report.errors);
    println!("Finished!");
}
