//! Show a still or animated image on the framebuffer

use std::{fs::File, io::BufReader, path::PathBuf, process::ExitCode, thread, time::Duration};

use clap::Parser;
use fbtools::{
    backend::{
        fbdev::{FbDevice, PixelSurface, ReadWrite},
        renderer::{Canvas, Color},
    },
    utils::{error_chain, Rectangle},
};
use image::{codecs::gif::GifDecoder, io::Reader, AnimationDecoder, ImageFormat, RgbaImage};
use tracing::{debug, error, info};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// PNG, JPEG or GIF image to show
    image: PathBuf,
    /// Play animations over and over instead of once
    #[arg(long = "loop")]
    repeat: bool,
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
    let fb = FbDevice::<ReadWrite>::open(&args.fb)?;
    let layout = fb.pixel_layout()?;
    let mut surface = PixelSurface::new(fb.map(&layout)?, layout);

    let reader = Reader::open(&args.image)?.with_guessed_format()?;
    if reader.format() != Some(ImageFormat::Gif) {
        let image = reader.decode()?.to_rgba8();
        info!(width = image.width(), height = image.height(), "Showing image");
        draw_image(&mut surface, &image);
        return Ok(());
    }

    let decoder = GifDecoder::new(BufReader::new(File::open(&args.image)?))?;
    let frames = decoder.into_frames().collect_frames()?;
    if frames.is_empty() {
        return Ok(());
    }
    info!(frames = frames.len(), "Playing animation");
    loop {
        for frame in &frames {
            draw_image(&mut surface, frame.buffer());
            let (numer, denom) = frame.delay().numer_denom_ms();
            let delay = Duration::from_millis(u64::from(numer) / u64::from(denom.max(1)));
            debug!(?delay, "Drew animation frame");
            thread::sleep(delay);
        }
        if !args.repeat {
            return Ok(());
        }
    }
}

/// Copy an image to the top left corner of the visible window
///
/// Alpha is dropped, pixels on either side of the overlap are left alone.
fn draw_image(canvas: &mut impl Canvas, image: &RgbaImage) {
    let bounds = canvas.bounds();
    let size = (
        i32::try_from(image.width()).unwrap_or(i32::MAX),
        i32::try_from(image.height()).unwrap_or(i32::MAX),
    );
    let Some(area) = Rectangle::from_loc_and_size(bounds.loc, size).intersection(bounds) else {
        return;
    };
    for point in area.points() {
        let offset = point - bounds.loc;
        let pixel = image.get_pixel(offset.x as u32, offset.y as u32);
        canvas.set(point, Color::from(pixel.0).opaque());
    }
}
