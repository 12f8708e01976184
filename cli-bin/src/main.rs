//! Vigil CLI entry-point
//!
//! All watching logic lives in the `libvigil` crate; this file handles
//! argument parsing, logging, the event loop, and the optional command
//! runner.

#![deny(warnings)]

use anyhow::{Context, Result};
use clap::Parser;
use crossbeam_channel::select;
use libvigil::{logging, Watcher};
use regex::Regex;
use std::env;
use std::time::Duration;
use tracing::{error, info};

use vigil_cli::cli::Cli;
use vigil_cli::runner::Runner;

fn main() -> Result<()> {
    /* ── CLI parsing & logging ────────────────────────────────── */

    let args = Cli::parse();
    if args.verbose {
        env::set_var("RUST_LOG", "debug");
    }
    logging::init();

    /* ── ignore rules & watcher bootstrap ─────────────────────── */

    let rules = args
        .ignore
        .iter()
        .map(|pattern| {
            Regex::new(pattern).with_context(|| format!("invalid ignore pattern `{}`", pattern))
        })
        .collect::<Result<Vec<_>>>()?;

    let watcher = Watcher::new(&args.path, rules)
        .with_context(|| format!("watching {}", args.path.display()))?;

    /* ── optional command runner ──────────────────────────────── */

    let mut runner = (!args.command.is_empty())
        .then(|| Runner::new(args.command.clone(), Duration::from_millis(args.kill_delay_ms)));
    if let Some(runner) = runner.as_mut() {
        runner.restart()?;
    }

    /* ── event loop ───────────────────────────────────────────── */

    loop {
        select! {
            recv(watcher.events()) -> msg => match msg {
                Ok(event) => {
                    info!("EVT: {}", event);
                    if let Some(runner) = runner.as_mut() {
                        runner.restart()?;
                    }
                }
                Err(_) => break,
            },
            recv(watcher.errs()) -> msg => {
                if let Ok(err) = msg {
                    error!("ERR: {}", err);
                }
                break;
            }
        }
    }

    if let Some(runner) = runner.as_mut() {
        runner.shutdown()?;
    }
    watcher.close()?;

    Ok(())
}
