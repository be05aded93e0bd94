//! Command-line harness for the listen-along engine.
//!
//! Loads a reference text and a timing file, then plays them back against a
//! simulated audio clock, applying highlight commands to an in-memory
//! surface. Prints the final snapshot as JSON.

use anyhow::{Context, Result, anyhow};
use listen_along::config::load_config;
use listen_along::surface::ApplyReport;
use listen_along::timing::load_timings;
use listen_along::{
    AudioEngine, AudioEvent, Document, MemorySurface, ReadAlongSession, SessionCommand,
    SimulatedAudio, StopSignal, apply_commands,
};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*, reload};

type ReloadHandle = reload::Handle<EnvFilter, tracing_subscriber::Registry>;

/// Silence appended after the last timed word.
const TAIL_SECS: f64 = 0.5;

struct Args {
    text_path: PathBuf,
    timings_path: PathBuf,
    seek: Option<f64>,
    locate: Option<String>,
    realtime: bool,
}

fn main() {
    let reload_handle = init_tracing();
    if let Err(err) = run(&reload_handle) {
        error!("{err:?}");
        std::process::exit(1);
    }
}

fn run(reload_handle: &ReloadHandle) -> Result<()> {
    let args = parse_args()?;
    let config = load_config(Path::new("conf/config.toml"));
    set_log_level(reload_handle, config.log_level.as_filter_str());
    info!(
        text = %args.text_path.display(),
        timings = %args.timings_path.display(),
        level = %config.log_level,
        offset_ms = config.offset_ms,
        tick_hz = config.tick_hz,
        "Starting listen-along"
    );

    let stop = StopSignal::new();
    let handler_stop = stop.clone();
    if let Err(err) = ctrlc::set_handler(move || {
        info!("Received Ctrl+C; stopping playback");
        handler_stop.stop();
    }) {
        warn!("Failed to install Ctrl+C signal handler: {err}");
    }

    let text = fs::read_to_string(&args.text_path)
        .with_context(|| format!("Failed to read text from {}", args.text_path.display()))?;
    let document = Document::from_text(&text);
    let timings = load_timings(&args.timings_path, config.offset_ms)?;
    stop.ensure_running("playback")?;

    let duration = if timings.is_empty() {
        document.len() as f64 / config.fallback_words_per_sec
    } else {
        timings.iter().map(|event| event.end_secs).fold(0.0, f64::max) + TAIL_SECS
    };
    let label = args
        .text_path
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or("section")
        .to_string();
    let tick_secs = config.tick_interval_secs();
    let progress_every = config.tick_hz.round().max(1.0) as u64;

    let mut surface = MemorySurface::new(&document);
    let session = ReadAlongSession::new(label, document, timings, config);
    let mut session = session.with_stop_signal(stop);
    session.set_duration(duration);
    if !session.is_rendered_by(&surface) {
        warn!("Surface does not render this section's text; highlights may land on other words");
    }
    let mut audio = SimulatedAudio::new(duration);
    let subscription = audio.bus_mut().subscribe();
    let mut totals = ApplyReport::default();

    if let Some(query) = args.locate {
        let event = session.apply_command(SessionCommand::Locate { text: query });
        match event.seek_to {
            Some(time) => audio.seek_to(time),
            None => warn!("Locate query did not match; starting from the requested position"),
        }
    }
    if let Some(time) = args.seek {
        audio.seek_to(time);
    }
    audio.play();

    let mut ticks: u64 = 0;
    loop {
        if session.is_stopped() {
            warn!(time = audio.current_time(), "Playback stopped");
            break;
        }
        for event in subscription.drain() {
            let applied = session.apply_command(SessionCommand::Audio(event));
            accumulate(&mut totals, apply_commands(&mut surface, &applied.commands));
            if event == AudioEvent::Ended {
                info!(highlighted = surface.highlighted_count(), "Audio ended");
            }
        }
        if audio.has_ended() {
            break;
        }

        let tick = session.apply_command(SessionCommand::Tick {
            time: audio.current_time(),
            duration: audio.duration(),
        });
        accumulate(&mut totals, apply_commands(&mut surface, &tick.commands));
        ticks += 1;
        if ticks % progress_every == 0 {
            info!(
                time = audio.current_time(),
                highlighted = tick.snapshot.highlighted_through,
                progress_pct = tick.snapshot.progress_pct,
                phase = ?tick.snapshot.phase,
                "Playback progress"
            );
        }

        if args.realtime {
            thread::sleep(Duration::from_secs_f64(tick_secs));
        }
        audio.advance(tick_secs);
    }
    audio.bus_mut().unsubscribe(subscription.id());

    info!(
        applied = totals.applied,
        skipped = totals.skipped,
        ticks,
        "Read-along finished"
    );
    let snapshot = session.snapshot();
    println!(
        "{}",
        serde_json::to_string_pretty(&snapshot).context("Serializing final snapshot")?
    );
    Ok(())
}

fn accumulate(totals: &mut ApplyReport, report: ApplyReport) {
    totals.applied += report.applied;
    totals.skipped += report.skipped;
}

fn parse_args() -> Result<Args> {
    let usage =
        "Usage: listen-along <text-file> <timings.json> [--seek SECS] [--locate TEXT] [--realtime]";
    let mut positional = Vec::new();
    let mut seek = None;
    let mut locate = None;
    let mut realtime = false;

    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--seek" => {
                let value = args.next().ok_or_else(|| anyhow!("--seek needs a value\n{usage}"))?;
                let secs: f64 = value
                    .parse()
                    .with_context(|| format!("Invalid --seek value: {value}"))?;
                seek = Some(secs);
            }
            "--locate" => {
                locate = Some(
                    args.next()
                        .ok_or_else(|| anyhow!("--locate needs a value\n{usage}"))?,
                );
            }
            "--realtime" => realtime = true,
            _ => positional.push(PathBuf::from(arg)),
        }
    }

    let mut positional = positional.into_iter();
    let (Some(text_path), Some(timings_path), None) =
        (positional.next(), positional.next(), positional.next())
    else {
        return Err(anyhow!(usage));
    };
    for path in [&text_path, &timings_path] {
        if !path.exists() {
            return Err(anyhow!("File not found: {}", path.display()));
        }
    }
    Ok(Args {
        text_path,
        timings_path,
        seek,
        locate,
        realtime,
    })
}

fn init_tracing() -> ReloadHandle {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"));
    let (filter_layer, handle) = reload::Layer::new(env_filter);
    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(true)
                .with_file(true)
                .with_line_number(true)
                .with_filter(filter_layer),
        )
        .init();
    warn!("Logging initialized; override level with config.log_level or RUST_LOG");
    handle
}

fn set_log_level(handle: &ReloadHandle, level: &str) {
    let parsed = EnvFilter::builder()
        .parse(level)
        .unwrap_or_else(|_| EnvFilter::new("debug"));
    if let Err(err) = handle.modify(|filter| *filter = parsed.clone()) {
        warn!(%level, "Failed to update log level from config: {err}");
    } else {
        info!(%level, "Applied log level from config");
    }
}
