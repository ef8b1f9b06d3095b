//! Grab the visible framebuffer contents into a PNG file

use std::{path::PathBuf, process::ExitCode};

use clap::Parser;
use fbtools::{
    backend::fbdev::{FbDevice, PixelSurface, ReadOnly},
    utils::{error_chain, Point},
};
use image::{ImageFormat, Rgba, RgbaImage};
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Where to write the PNG
    #[arg(default_value = "fbgrab.png")]
    output: PathBuf,
    /// Framebuffer device node
    #[arg(long, default_value = "/dev/fb0")]
    fb: PathBuf,
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
    let fb = FbDevice::<ReadOnly>::open(&args.fb)?;
    let layout = fb.pixel_layout()?;
    let surface = PixelSurface::new(fb.map(&layout)?, layout);

    let visible = layout.visible();
    let image = RgbaImage::from_fn(visible.size.w as u32, visible.size.h as u32, |x, y| {
        let point = visible.loc + Point::new(x as i32, y as i32);
        // the transparency channel is not captured
        Rgba(surface.pixel(point).unwrap_or_default().opaque().components())
    });
    image.save_with_format(&args.output, ImageFormat::Png)?;
    info!(path = %args.output.display(), width = image.width(), height = image.height(), "Saved screen grab");
    Ok(())
}
