use std::path::PathBuf;

use log::{info, warn};
use mask_painter::{BrushRadius, Editor, FileStore, threaded_loader};

use super::{EraserApp, files};
use crate::{Config, HttpGateway};

pub fn run_native() -> Result<(), eframe::Error> {
    env_logger::init();

    let config = Config::load("config.json").map_err(|e| eframe::Error::AppCreation(Box::new(e)))?;

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size(config.egui.viewport)
            .with_title("Text Eraser"),
        ..Default::default()
    };

    let image_dir = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .or_else(|| config.image_dir.clone());
    let initial = match &image_dir {
        Some(dir) => files::read_dir(dir).unwrap_or_else(|e| {
            warn!("Cannot read images from {}: {e}", dir.display());
            Vec::new()
        }),
        None => Vec::new(),
    };

    info!("Run with config: {config:?}");
    eframe::run_native(
        "Text Eraser",
        options,
        Box::new(move |cc| {
            let editor = Editor::new(
                Box::new(FileStore::new(config.store_dir())),
                Box::new(HttpGateway::new(&config.endpoint)),
                threaded_loader(),
            )
            .with_brush(BrushRadius::new(config.brush_radius));
            Ok(Box::new(EraserApp::new(cc, editor, initial)))
        }),
    )
}
