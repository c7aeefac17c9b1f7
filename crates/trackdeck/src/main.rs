//! `trackdeck` — a TUI client for a track metadata library served over HTTP.
//!
//! Features:
//! - browse the library in fixed pages with debounced search and
//!   genre/artist/sort filters
//! - play/pause audio for a track (single active track at a time)
//! - create, edit, delete tracks; bulk delete in selection mode
//! - upload, replace, or remove a track's audio file (MP3/WAV)

mod forms;
mod logs;
mod playback;
mod player;
mod query;
mod selection;
mod server_api;
mod ui;
mod worker;

use anyhow::Result;
use clap::Parser;
use crossbeam_channel::unbounded;
use tracing_subscriber::EnvFilter;

const VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("GIT_SHA"),
    ", ",
    env!("BUILD_DATE"),
    ")"
);

#[derive(Parser, Debug)]
#[command(name = "trackdeck", version = VERSION)]
struct Args {
    /// Base URL of the track API server, e.g. http://localhost:8000
    #[arg(long)]
    server: String,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let (log_tx, log_rx) = unbounded::<String>();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_ansi(false)
        .without_time()
        .with_writer(logs::LogChannel::new(log_tx))
        .init();

    ui::run_tui(args.server, log_rx)
}
