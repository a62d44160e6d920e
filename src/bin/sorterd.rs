//! sorterd - conveyor-belt sorter daemon
//!
//! This daemon:
//! 1. Loads configuration (SORTER_CONFIG file, SORTER_* env, CLI flags)
//! 2. Opens the frame source and the actuator link (serial, or stdout with --dry-run)
//! 3. Runs mask -> detect -> classify -> debounce per frame, writing commands
//! 4. Stops on Ctrl-C, end-of-stream, or --max-frames, closing the link

use anyhow::{Context, Result};
use clap::Parser;
use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use belt_sorter::{
    open_source, ActuatorLink, JsonlObserver, LogObserver, ObserverChain, RunOptions, SerialLink,
    Sorter, SorterConfig, WriterLink,
};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Config file (JSON, or TOML with a .toml extension).
    #[arg(long, env = "SORTER_CONFIG")]
    config: Option<PathBuf>,
    /// Frame source URI (stub://belt, dir://<path>, /dev/video0, video file).
    #[arg(long, env = "SORTER_SOURCE")]
    source: Option<String>,
    /// Serial port of the actuator controller.
    #[arg(long, env = "SORTER_SERIAL_PORT")]
    serial_port: Option<String>,
    /// Serial baud rate.
    #[arg(long, env = "SORTER_SERIAL_BAUD")]
    baud: Option<u32>,
    /// Write commands to stdout instead of the serial port.
    #[arg(long)]
    dry_run: bool,
    /// Write one JSON line per frame to this file.
    #[arg(long)]
    diagnostics: Option<PathBuf>,
    /// Stop after this many processed frames.
    #[arg(long)]
    max_frames: Option<u64>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let mut config = SorterConfig::load_from(args.config.as_deref())?;
    if let Some(source) = args.source {
        config.source.uri = source;
    }
    if let Some(port) = args.serial_port {
        config.serial.port = port;
    }
    if let Some(baud) = args.baud {
        config.serial.baud_rate = baud;
    }
    config.validate()?;

    let stop = Arc::new(AtomicBool::new(false));
    let handler_stop = Arc::clone(&stop);
    ctrlc::set_handler(move || {
        handler_stop.store(true, Ordering::SeqCst);
    })
    .context("error setting Ctrl-C handler")?;

    let mut source = open_source(&config.source)?;
    let mut link: Box<dyn ActuatorLink> = if args.dry_run {
        log::info!("dry run: commands go to stdout");
        Box::new(WriterLink::new("stdout", std::io::stdout()))
    } else {
        Box::new(SerialLink::open(config.serial.clone())?)
    };

    let mut log_observer = LogObserver;
    let mut jsonl_observer = match &args.diagnostics {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("create diagnostics file {}", path.display()))?;
            log::info!("writing frame diagnostics to {}", path.display());
            Some(JsonlObserver::new(BufWriter::new(file)))
        }
        None => None,
    };
    let mut observer = ObserverChain::new().with(&mut log_observer);
    if let Some(jsonl) = jsonl_observer.as_mut() {
        observer = observer.with(jsonl);
    }

    let sorter = Sorter::new(
        config.pipeline.clone(),
        RunOptions {
            max_frames: args.max_frames,
        },
    );
    let summary = sorter.run(source.as_mut(), link.as_mut(), &mut observer, &stop)?;

    log::info!(
        "sorterd finished: {:?}, {} frames, commands {:?}",
        summary.stop_reason,
        summary.frames_processed,
        summary.commands
    );
    Ok(())
}
