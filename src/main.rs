// src/main.rs

//! Renders one launcher frame into an in-memory framebuffer with the
//! headless font driver and dumps it as a raw `.argb` file.
//!
//! Usage: `overlay-blit [config.json] [cover image] [output.argb]`

use std::path::PathBuf;

use anyhow::Context;
use log::{info, warn};

use overlay_blit::image::encode_argb;
use overlay_blit::{
    Config, DrawContext, FileDecoder, HeadlessFontDriver, Layer, Surface, TextAnchor,
};

const COVER_SLOT: usize = 1;
const DEFAULT_OUTPUT: &str = "overlay-frame.argb";
const MISSING_COVER: &str = "/nonexistent/cover.jpg";

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_micros()
        .init();

    let mut args = std::env::args_os().skip(1).map(PathBuf::from);
    let config = match args.next() {
        Some(path) => Config::load(&path)?,
        None => {
            info!("No config file given, using defaults.");
            Config::default()
        }
    };
    let cover = args.next();
    let output = args.next().unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT));

    let mut ctx = DrawContext::init(config, HeadlessFontDriver::new(), FileDecoder)
        .context("Failed to initialize draw context")?;
    if !ctx.has_text() {
        warn!("Font unavailable, text will not be drawn.");
    }

    let (canvas_w, canvas_h) = {
        let canvas = ctx.config().canvas.clone();
        (canvas.width, canvas.height)
    };
    let line_height = ctx.line_height().max(0) as u32;

    // Background and title.
    ctx.clear_layer(Layer::Canvas);
    ctx.draw_text(Layer::Canvas, TextAnchor::Center, line_height, "overlay-blit^demo frame");
    ctx.publish_frame().context("Failed to publish canvas")?;

    // Cover with its selection frame and drop shadow.
    // A missing cover exercises the placeholder path.
    let cover_path = cover.unwrap_or_else(|| PathBuf::from(MISSING_COVER));
    let image = ctx
        .load_image(COVER_SLOT, &cover_path, None)
        .with_context(|| format!("Failed to load '{}'", cover_path.display()))?;
    let x = (canvas_w.saturating_sub(image.width) / 2) & !1;
    let y = canvas_h.saturating_sub(image.height) / 2;
    ctx.blit_image(COVER_SLOT, x, y)?;
    let frame_color = ctx.config().colors.selection_frame;
    ctx.draw_selection_frame(COVER_SLOT, frame_color)?;
    ctx.draw_backdrop(COVER_SLOT, false)?;

    // Info strip along the bottom edge.
    let strip_h = ctx.layer(Layer::Strip).height();
    ctx.clear_layer(Layer::Strip);
    let end = ctx.draw_text(Layer::Strip, TextAnchor::Left(32), 8, "Cover: ");
    ctx.draw_text(
        Layer::Strip,
        TextAnchor::Left(end),
        8,
        &cover_path.display().to_string(),
    );
    ctx.publish_layer(Layer::Strip, 0, canvas_h.saturating_sub(strip_h))
        .context("Failed to publish info strip")?;

    let frame = ctx
        .capture_background(0, 0, canvas_w, canvas_h)
        .context("Failed to capture frame")?;
    std::fs::write(&output, encode_argb(frame.width(), frame.height(), frame.pixels()))
        .with_context(|| format!("Failed to write '{}'", output.display()))?;
    info!("Wrote {}x{} frame to '{}'", canvas_w, canvas_h, output.display());

    ctx.fade_out(0, canvas_h);
    ctx.shutdown();
    info!("overlay-blit exited successfully.");
    Ok(())
}
