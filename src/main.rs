mod calc;
mod config;
mod db;
mod ipc;
mod marking;
mod model;
mod query;
mod remote;
mod store;

use clap::Parser;
use std::io::{self, BufRead, Write};
use tracing_subscriber::EnvFilter;

fn init_tracing(filter: &str) {
    let filter = EnvFilter::try_new(filter)
        .unwrap_or_else(|_| EnvFilter::new(config::DEFAULT_LOG_FILTER));
    // stdout carries the protocol; logs go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    let args = config::Args::parse();
    let cfg = match config::Config::load(&args) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("rollbookd: {e:#}");
            std::process::exit(2);
        }
    };
    init_tracing(&cfg.log_filter);

    let mut state = ipc::AppState::new(cfg.remote_timeout);
    if let Err(e) = state.open(&cfg.backend) {
        tracing::error!(error = %format!("{e:#}"), "failed to open store");
        std::process::exit(1);
    }
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "rollbookd ready");

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(v) => v,
            Err(e) => {
                tracing::error!(error = %e, "stdin read failed");
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        let req: ipc::Request = match serde_json::from_str(&line) {
            Ok(v) => v,
            Err(e) => {
                // No id to answer with.
                tracing::warn!(error = %e, "unparseable request line");
                let resp = serde_json::json!({
                    "ok": false,
                    "error": { "code": "bad_json", "message": e.to_string() }
                });
                let _ = writeln!(stdout, "{}", resp);
                let _ = stdout.flush();
                continue;
            }
        };

        let resp = ipc::handle_request(&mut state, req);
        let _ = writeln!(
            stdout,
            "{}",
            serde_json::to_string(&resp).unwrap_or_else(|_| "{\"ok\":false}".to_string())
        );
        let _ = stdout.flush();
    }

    state.close();
}
