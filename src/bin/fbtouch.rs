//! Visualise touch contacts live on the framebuffer

use std::{path::PathBuf, process::ExitCode};

use clap::{Parser, ValueEnum};
use fbtools::{
    backend::{
        evdev::EvdevDevice,
        fbdev::{FbDevice, PixelSurface, ReadWrite},
        input::Axis,
        renderer::{
            marker::{MarkerRenderer, MarkerStyle},
            Canvas, Color,
        },
    },
    input::touch::TouchTracker,
    utils::error_chain,
};
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Input device node, e.g. /dev/input/event0
    device: PathBuf,
    /// Keep the trail of every contact instead of following it
    style: Option<Style>,
    /// Framebuffer device node
    #[arg(long, default_value = "/dev/fb0")]
    fb: PathBuf,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
enum Style {
    /// Hollow squares that are never erased
    Ghost,
    /// Small dots tracing the path of every contact
    Dots,
}

impl Style {
    fn marker(style: Option<Style>) -> MarkerStyle {
        match style {
            None => MarkerStyle::outline(),
            Some(Style::Ghost) => MarkerStyle::ghost(),
            Some(Style::Dots) => MarkerStyle::dots(),
        }
    }
}

fn main() -> ExitCode {
    let args = Cli::parse();

    if let Ok(env_filter) = tracing_subscriber::EnvFilter::try_from_default_env() {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    } else {
        tracing_subscriber::fmt().init();
    }

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{}", error_chain(&*err));
            ExitCode::FAILURE
        }
    }
}

fn run(args: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let input = EvdevDevice::open(&args.device)?;
    if let Err(err) = input.grab() {
        warn!("{}, other listeners will see the same events", error_chain(&err));
    }
    let x = input.abs_info(Axis::X)?;
    let y = input.abs_info(Axis::Y)?;

    let fb = FbDevice::<ReadWrite>::open(&args.fb)?;
    let layout = fb.pixel_layout()?;
    let mut surface = PixelSurface::new(fb.map(&layout)?, layout);
    surface.fill(Color::BLACK);

    let slot = input
        .has_axis(Axis::Slot)
        .and_then(|advertised| advertised.then(|| input.abs_info(Axis::Slot)).transpose());
    let mut tracker = match slot {
        Ok(Some(slot)) => TouchTracker::multi(x, y, slot, surface.bounds()),
        Ok(None) => {
            info!("device has no slots, falling back to single-touch");
            TouchTracker::single(x, y, surface.bounds())
        }
        Err(err) => {
            info!("{}, falling back to single-touch", error_chain(&err));
            TouchTracker::single(x, y, surface.bounds())
        }
    };
    info!(
        multi_touch = tracker.is_multi_touch(),
        slots = tracker.slot_count(),
        "Tracking touch input"
    );
    let mut renderer = MarkerRenderer::new(Style::marker(args.style));

    for batch in input.batches() {
        for event in batch? {
            if let Some(frame) = tracker.process(&event) {
                renderer.render(&frame, &mut surface);
            }
        }
        profiling::finish_frame!();
    }
    Ok(())
}
