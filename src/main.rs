// rsview - A lightweight desktop image viewer for Wayland
// Shows a single image or a folder of images with a minimal File menu

use anyhow::{Context, Result};
use log::{error, info};
use rsview::app::ViewerController;
use rsview::cli::{self, ParsedArgs};
use rsview::image_loader::Decoder;
use rsview::picker::DialogPicker;
use rsview::text::CosmicText;
use rsview::wayland;
use std::process::ExitCode;
use std::sync::Arc;

fn main() -> ExitCode {
    // Parse command line arguments
    let args = cli::parse_args();

    // Initialize logger
    let default_level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    match run(args) {
        Ok(()) => {
            info!("Exiting rsview");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: ParsedArgs) -> Result<()> {
    info!(
        "Starting rsview at {}x{} (GPU: {}, picker: {:?})",
        args.width, args.height, args.use_gpu, args.pick_mode
    );

    let text =
        CosmicText::init(args.font.as_deref()).context("Failed to initialize text rendering")?;

    let viewer = ViewerController::new(
        Decoder,
        Arc::new(DialogPicker),
        args.pick_mode,
        args.width,
        args.height,
    );

    wayland::run(viewer, text, args.width, args.height, args.use_gpu)
}
