//! ledseq - Animation Sequencer for Small Pixel Grids
//!
//! Plays a TOML run file on the terminal simulator, or headless for testing.

use anyhow::{Context, Result};
use clap::{Arg, ArgAction, Command};
use ledseq::config::default_run_file_path;
use ledseq::display::TerminalSink;
use ledseq::input::keyboard::spawn_keyboard_thread;
use ledseq::{
    AnimationRegistry, AnimationSpec, DisplaySink, MemorySink, RunFile, SequenceOptions,
    StatusEvent, StatusSender,
};
use log::{debug, info, warn};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

const KEY_POLL_INTERVAL: Duration = Duration::from_millis(50);

fn cli() -> Command {
    Command::new("ledseq")
        .version(ledseq::VERSION)
        .about("Animation sequencer for small RGB pixel grids")
        .long_about(
            "ledseq plays a run list of text animations with transitions between them. \
             Text can come from files, stdin, HTTP endpoints or shell commands and is \
             refreshed while the animation plays.",
        )
        .arg(
            Arg::new("run-file")
                .help("Path to the TOML run file (defaults to the user config directory)")
                .index(1),
        )
        .arg(
            Arg::new("headless")
                .long("headless")
                .help("Render into memory instead of the terminal")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("frame-interval")
                .long("frame-interval")
                .value_name("MS")
                .help("Target interval between frames in milliseconds")
                .value_parser(clap::value_parser!(u64).range(1..)),
        )
        .arg(
            Arg::new("loop")
                .long("loop")
                .help("Restart the run list after the last entry")
                .action(ArgAction::SetTrue)
                .conflicts_with("no-loop"),
        )
        .arg(
            Arg::new("no-loop")
                .long("no-loop")
                .help("Stop after the last entry")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("shuffle")
                .long("shuffle")
                .help("Shuffle the run list once before playback")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("width")
                .long("width")
                .value_parser(clap::value_parser!(u16).range(1..))
                .default_value("17"),
        )
        .arg(
            Arg::new("height")
                .long("height")
                .value_parser(clap::value_parser!(u16).range(1..))
                .default_value("7"),
        )
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let matches = cli().get_matches();

    let mut run_file = match matches.get_one::<String>("run-file") {
        Some(path) => {
            let path = PathBuf::from(path);
            if !path.is_file() {
                anyhow::bail!("Run file does not exist: {}", path.display());
            }
            RunFile::load(&path)
                .with_context(|| format!("Failed to load run file {}", path.display()))?
        }
        None => match default_run_file_path().filter(|path| path.is_file()) {
            Some(path) => {
                info!("using run file {}", path.display());
                RunFile::load(&path)
                    .with_context(|| format!("Failed to load run file {}", path.display()))?
            }
            None => {
                info!("no run file found; playing the demo sequence");
                demo_run_file()
            }
        },
    };

    if let Some(ms) = matches.get_one::<u64>("frame-interval") {
        run_file.options.frame_interval = Duration::from_millis(*ms);
    }
    if matches.get_flag("loop") {
        run_file.options.looping = true;
    }
    if matches.get_flag("no-loop") {
        run_file.options.looping = false;
    }
    if matches.get_flag("shuffle") {
        run_file.options.shuffle = true;
    }

    let width = usize::from(*matches.get_one::<u16>("width").unwrap_or(&17));
    let height = usize::from(*matches.get_one::<u16>("height").unwrap_or(&7));

    let (events, status_rx) = StatusSender::channel();
    let status_task = tokio::spawn(log_status(status_rx));
    let (input_tx, input_rx) = mpsc::unbounded_channel();
    let stop = CancellationToken::new();

    let summary = if matches.get_flag("headless") {
        let ctrl_c = stop.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                ctrl_c.cancel();
            }
        });
        drop(input_tx);
        let sink: Box<dyn DisplaySink> = Box::new(MemorySink::new(width, height).retain_last(1));
        ledseq::start(
            AnimationRegistry::with_builtin(),
            run_file,
            sink,
            input_rx,
            stop,
            events,
        )
        .await?
    } else {
        let sink: Box<dyn DisplaySink> = Box::new(TerminalSink::new(width, height)?);
        let shutdown = Arc::new(AtomicBool::new(false));
        let keyboard = spawn_keyboard_thread(
            input_tx,
            stop.clone(),
            Arc::clone(&shutdown),
            KEY_POLL_INTERVAL,
        );
        let outcome = ledseq::start(
            AnimationRegistry::with_builtin(),
            run_file,
            sink,
            input_rx,
            stop,
            events,
        )
        .await;
        shutdown.store(true, Ordering::SeqCst);
        if keyboard.join().is_err() {
            warn!("keyboard thread panicked");
        }
        outcome?
    };

    // Detached source tasks may still hold a sender briefly
    let _ = tokio::time::timeout(Duration::from_millis(200), status_task).await;
    info!(
        "played {} frames across {} entries",
        summary.frames_rendered, summary.entries_started
    );
    Ok(())
}

async fn log_status(mut rx: mpsc::UnboundedReceiver<StatusEvent>) {
    while let Some(event) = rx.recv().await {
        match &event {
            StatusEvent::SourceRefreshFailed { .. }
            | StatusEvent::TeardownTimedOut { .. }
            | StatusEvent::DisplaySinkFailed { .. } => warn!("status: {event:?}"),
            _ => debug!("status: {event:?}"),
        }
    }
}

fn demo_run_file() -> RunFile {
    RunFile {
        options: SequenceOptions::default(),
        entries: vec![
            AnimationSpec::new("static")
                .with_option("text", "HI")
                .with_duration(Duration::from_secs(3)),
            AnimationSpec::new("scrolling")
                .with_option("text", "Hello World")
                .with_option("color_mode", "rainbow")
                .with_duration(Duration::from_secs(8)),
            AnimationSpec::new("typewriter")
                .with_option("text", "ledseq")
                .with_duration(Duration::from_secs(4)),
            AnimationSpec::new("pulsing")
                .with_option("text", "OK")
                .with_option("color", "#ff3366")
                .with_duration(Duration::from_secs(4)),
        ],
    }
}
