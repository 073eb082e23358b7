mod actors;
mod bot;
mod cli;
mod database;
mod engine;
mod handlers;
mod io;
mod logging;
mod outside;
mod result;
mod types;
mod utils;

use std::thread;

use actors::{Actor, FetchActor, Job};
use clap::Parser;
use crossbeam_channel::bounded;
use database::Sqlite;
use engine::Engine;
use handlers::Handlers;
use miette::{Context, IntoDiagnostic};
use outside::{Telegram, Ytdl};
use tracing::info;

use crate::cli::Args;

fn main() -> miette::Result<()> {
    let args = Args::parse();

    let level = if args.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    logging::init_logging(level)?;

    let (source, telegram) = load_external_components(&args)?;
    let store = Sqlite::read_or_create(&args.database)?;

    let policy = args.policy();
    info!(
        "Policy: max duration {}s, max file size {} bytes",
        policy.max_duration_secs, policy.max_file_size
    );

    let handlers = Handlers::new(Engine::new(&source, &policy), &store, &telegram);

    // One bounded lane into the worker pool; the poll loop blocks on a
    // full queue instead of buffering unboundedly.
    let (input, receive) = bounded::<Job>(args.workers * 2);

    thread::scope(|scope| -> miette::Result<()> {
        for id in 0..args.workers {
            let mut actor = FetchActor::new(id, &handlers);
            actor.set_receive_channel(receive.clone());

            thread::Builder::new()
                .name(format!("fetch-{id}"))
                .spawn_scoped(scope, move || {
                    if let Err(err) = actor.run() {
                        tracing::error!("Worker stopped with an error: {err}");
                    }
                })
                .into_diagnostic()
                .wrap_err("Could not spawn worker thread")?;
        }
        drop(receive);

        info!("🚀 Bot started, waiting for messages");
        info!("📺 Only YouTube links are handled");

        let res = bot::run_dispatch_loop(&telegram, &input);

        // Closing the lane lets the workers drain and stop, unblocking
        // the join below
        drop(input);
        res.map_err(miette::Report::from)
    })?;

    Ok(())
}

/// Load the external capabilities.
///
/// Probing the downloader binary and the Bot API both take a moment, so
/// run them concurrently.
fn load_external_components(args: &Args) -> miette::Result<(Ytdl, Telegram)> {
    let ytdl_thread = std::thread::spawn(Ytdl::new);

    let telegram = Telegram::new(&args.bot_token)?;
    let ytdl = ytdl_thread.join().expect("Could not join thread")?;

    Ok((ytdl, telegram))
}
