//! `las-cli` – Oslo LAS adapter
//!
//! This binary wires the adapter together and runs it against stdio:
//!
//! 1. Loads `~/.oslo-las/config.toml` (or `$LAS_CONFIG`), writing a default
//!    file on first run.
//! 2. Probes the lock controller and reports how many doors it sees.
//! 3. Reads provider events as JSON lines from stdin and writes every
//!    response as a JSON line to stdout.
//! 4. Intercepts **Ctrl-C**, stops reading and drains queued events before
//!    exiting.
//!
//! Everything human-facing goes to stderr; stdout carries responses only.

mod config;
mod serve;

use colored::Colorize;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{error, warn};

use las_hal::{BackendClient, LockBackend};
use las_kernel::ActionGate;
use las_middleware::{BusResponsePoster, EventBus};
use las_runtime::EventHandler;

fn main() -> ExitCode {
    // Hold the guard until exit so pending spans are flushed.
    let _telemetry = las_runtime::init_tracing("oslo-las");

    print_banner();

    let cfg = load_config();

    // The blocking HTTP client owns its own runtime, so it must be built
    // before (and outside) the Tokio runtime below.
    let client = match BackendClient::new(
        &cfg.base_url,
        cfg.username.clone(),
        cfg.password.clone(),
        Duration::from_secs(cfg.request_timeout_secs),
    ) {
        Ok(client) => client,
        Err(e) => {
            eprintln!("{}: {}", "Backend error".red(), e);
            return ExitCode::FAILURE;
        }
    };
    probe_backend(&client);

    // ── Shutdown flag ─────────────────────────────────────────────────────
    let (interrupt_tx, interrupt) = watch::channel(false);
    if let Err(e) = ctrlc::set_handler(move || {
        eprintln!();
        eprintln!("{}", "⚠  Ctrl-C received – draining queued events …".yellow().bold());
        interrupt_tx.send_replace(true);
    }) {
        warn!(error = %e, "Failed to install Ctrl-C handler; graceful shutdown on Ctrl-C will not be available");
    }

    // ── Pipeline ──────────────────────────────────────────────────────────
    let bus = Arc::new(EventBus::new(cfg.bus_capacity));
    let gate = ActionGate::new().with_org_ids(cfg.org_ids.iter().cloned());
    let handler = Arc::new(EventHandler::new(
        Arc::new(client),
        Arc::new(gate),
        Arc::new(BusResponsePoster::new(bus.clone())),
    ));

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(e) => {
            error!(error = %e, "Failed to start Tokio runtime");
            return ExitCode::FAILURE;
        }
    };

    eprintln!("  Reading events from {}.\n", "stdin".bold());
    // `handler` outlives `runtime` so the blocking client is dropped outside
    // of any async context.
    let served = runtime.block_on(serve::serve(
        tokio::io::BufReader::new(tokio::io::stdin()),
        tokio::io::stdout(),
        handler.clone(),
        bus,
        interrupt,
    ));
    // A pending stdin read would otherwise hold shutdown after Ctrl-C.
    runtime.shutdown_background();

    match served {
        Ok((stats, _)) => {
            eprintln!(
                "  {} {} event(s) received, {} answered, {} malformed.",
                "✓".green().bold(),
                stats.received,
                stats.answered,
                stats.malformed
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "Event pump failed");
            ExitCode::FAILURE
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Startup
// ─────────────────────────────────────────────────────────────────────────────

fn load_config() -> config::Config {
    let path = config::config_path();
    match config::load() {
        Ok(Some(cfg)) => {
            eprintln!("  Config loaded from {}", path.display().to_string().bold());
            cfg
        }
        Ok(None) => {
            let mut cfg = config::Config::default();
            match config::save(&cfg) {
                Ok(()) => eprintln!(
                    "  {} No config found, wrote defaults to {}",
                    "✓".green().bold(),
                    path.display().to_string().bold()
                ),
                Err(e) => eprintln!("{}: {}", "Error saving config".red(), e),
            }
            config::apply_env_overrides(&mut cfg);
            cfg
        }
        Err(e) => {
            eprintln!("{}: {}", "Config error".red(), e);
            eprintln!("  Using default configuration.");
            let mut cfg = config::Config::default();
            config::apply_env_overrides(&mut cfg);
            cfg
        }
    }
}

fn probe_backend(client: &BackendClient) {
    eprint!("\n  Probing lock controller at {} … ", client.base_url().as_str().dimmed());
    match client.status() {
        Ok(snapshot) => match snapshot.doors() {
            Some(doors) => eprintln!("{} ({} door(s))", "online".green(), doors.len()),
            None => eprintln!("{} (no doors reported)", "online".yellow()),
        },
        Err(e) => {
            eprintln!("{}", "offline".yellow());
            eprintln!("  {}  {}", "Health checks will report unhealthy.".dimmed(), e);
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Banner
// ─────────────────────────────────────────────────────────────────────────────

fn print_banner() {
    eprintln!();
    eprintln!("{}", r#"   ____       __         __   ___   ____"#.bold().cyan());
    eprintln!("{}", r#"  / __ \___ / /__      / /  / _ | / __/"#.bold().cyan());
    eprintln!("{}", r#" / /_/ (_-</ / _ \    / /__/ __ |_\ \  "#.bold().cyan());
    eprintln!("{}", r#" \____/___/_/\___/   /____/_/ |_/___/  "#.bold().cyan());
    eprintln!();
    eprintln!("  {} {}",
        "Oslo LAS adapter".bold(),
        format!("v{}", env!("CARGO_PKG_VERSION")).dimmed()
    );
    eprintln!("  Door-lock events in, responses out");
    eprintln!();
}
