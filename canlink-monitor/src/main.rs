//! canlink-monitor
//!
//! Reads the frame stream of a serial CAN bridge and shows, per identifier,
//! the latest payload with recently changed bytes highlighted.
//!
//! Two flows share one bounded channel:
//! - the ingest thread decodes frames and dispatches every change
//! - the main thread drains the channel and redraws

mod channels;
mod config;
mod error;
mod source;
mod tasks;
mod terminal;

use std::fmt::Display;
use std::io;
use std::path::PathBuf;
use std::process;
use std::thread;

use anyhow::{Context, Result};
use canlink_core::config::{MonitorConfig, MonitorSettings, Radix, SourceMode, View};
use canlink_core::FrameUpdate;
use canlink_display::FieldFormat;
use canlink_hal::UartConfig;
use clap::{Parser, ValueEnum};
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::channels::{Dispatcher, DISPATCH_CHANNEL_SIZE};
use crate::error::MonitorError;
use crate::source::StreamRx;
use crate::tasks::{IngestStats, LoopExit, MonotonicClock, Presenter, Renderer};
use crate::terminal::{Input, NoInput, TerminalInput};

#[derive(Parser, Debug)]
#[command(name = "canlink-monitor", version, about = "Serial CAN bridge monitor")]
struct Args {
    /// Configuration file (TOML); built-in defaults when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Serial device of the bridge
    #[arg(short, long)]
    device: Option<String>,

    /// Read a captured byte stream instead of the device
    #[arg(long, conflicts_with = "device")]
    replay: Option<PathBuf>,

    /// Wire format
    #[arg(short, long, value_enum)]
    mode: Option<ModeArg>,

    /// Presentation
    #[arg(long, value_enum)]
    view: Option<ViewArg>,

    /// Payload number base
    #[arg(long, value_enum)]
    format: Option<FormatArg>,

    /// Log filter used when RUST_LOG is not set
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ModeArg {
    Binary,
    Text,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ViewArg {
    Table,
    Log,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum FormatArg {
    Hex,
    Decimal,
}

impl Args {
    /// Command-line flags take precedence over the file
    fn apply(&self, config: &mut MonitorConfig) {
        if let Some(device) = &self.device {
            config.serial.device = device.clone();
        }
        if let Some(mode) = self.mode {
            config.monitor.mode = match mode {
                ModeArg::Binary => SourceMode::Binary,
                ModeArg::Text => SourceMode::Text,
            };
        }
        if let Some(view) = self.view {
            config.monitor.view = match view {
                ViewArg::Table => View::Table,
                ViewArg::Log => View::Log,
            };
        }
        if let Some(format) = self.format {
            config.monitor.format = match format {
                FormatArg::Hex => Radix::Hex,
                FormatArg::Decimal => Radix::Decimal,
            };
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args.log_level)?;

    let mut config =
        config::load_config(args.config.as_deref()).context("failed to load configuration")?;
    args.apply(&mut config);
    config.validate().map_err(MonitorError::from)?;

    let path = args
        .replay
        .clone()
        .unwrap_or_else(|| PathBuf::from(&config.serial.device));
    let uart = UartConfig::with_baudrate(config.serial.baudrate);
    info!(
        path = %path.display(),
        baudrate = uart.baudrate,
        mode = ?config.monitor.mode,
        "Opening bridge"
    );
    let mut rx =
        StreamRx::open(&path).with_context(|| format!("failed to open {}", path.display()))?;

    let clock = MonotonicClock::start();
    let settings = config.monitor;

    let burst = channels::frames_per_poll(config.serial.baudrate, settings.poll_interval_ms);
    if burst > DISPATCH_CHANNEL_SIZE as u64 {
        warn!(
            "Up to {} frames per {} ms poll, dispatch channel holds {}; changes may be dropped",
            burst, settings.poll_interval_ms, DISPATCH_CHANNEL_SIZE
        );
    }

    let result = match settings.mode {
        SourceMode::Binary => run(&settings, &clock, |dispatcher| {
            tasks::binary_ingest(&mut rx, dispatcher, &clock)
        }),
        SourceMode::Text => run(&settings, &clock, |dispatcher| {
            tasks::text_ingest(&mut rx, dispatcher, &clock)
        }),
    };

    match result {
        Err(e) if args.replay.is_some() && e.is_clean_close() => {
            info!("Replay finished");
            Ok(())
        }
        Err(e) => Err(e.into()),
        Ok(()) => Ok(()),
    }
}

/// Run ingest on its own thread and render on this one
///
/// Returns the error that ended the ingest flow. Quitting while ingest is
/// still blocked on the transport exits the process from here.
fn run<K, F, I>(
    settings: &MonitorSettings,
    clock: &MonotonicClock,
    ingest: I,
) -> Result<(), MonitorError>
where
    K: Ord + Display + Send,
    F: FieldFormat + Send,
    I: FnOnce(&Dispatcher<FrameUpdate<K, F>>) -> (MonitorError, IngestStats) + Send,
{
    let dispatcher = Dispatcher::new();
    let presenter = Presenter::new(settings.view, io::stdout(), terminal::terminal_size());
    let mut renderer = Renderer::new(settings, presenter);
    let mut input = open_input(settings.view);

    thread::scope(|s| {
        let shared = &dispatcher;
        let handle = thread::Builder::new()
            .name("ingest".into())
            .spawn_scoped(s, move || ingest(shared))?;

        let exit = tasks::render_loop(
            &dispatcher,
            &mut renderer,
            settings,
            clock,
            input.as_mut(),
            || handle.is_finished(),
        );

        // Ingest blocks on the transport without a timeout, so it can only
        // be joined once it has finished on its own
        match exit {
            Ok(LoopExit::IngestDone) => {}
            Ok(LoopExit::Quit) => {
                renderer.shutdown();
                input.release();
                info!("Quit");
                process::exit(0);
            }
            Err(e) => {
                renderer.shutdown();
                input.release();
                error!("Display failed: {}", e);
                process::exit(1);
            }
        }

        match handle.join() {
            Ok((err, _stats)) => Err(err),
            Err(panic) => std::panic::resume_unwind(panic),
        }
    })
}

/// Keyboard input for the table view, when stdin is a terminal
fn open_input(view: View) -> Box<dyn Input> {
    if view == View::Log {
        return Box::new(NoInput);
    }
    match TerminalInput::enable() {
        Ok(input) => Box::new(input),
        Err(e) => {
            warn!("No keyboard input ({}), stop with a signal", e);
            Box::new(NoInput)
        }
    }
}

fn init_logging(level: &str) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .map_err(|e| anyhow::anyhow!("invalid log level: {}", e))?;

    // Logs go to stderr so the table on stdout stays intact
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_writer(io::stderr))
        .with(filter)
        .init();

    Ok(())
}
