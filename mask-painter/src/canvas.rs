use std::sync::Arc;

use image::{Rgba, RgbaImage};
use log::{debug, warn};

use crate::{
    ImageLoadError, MaskError, MaskRef, PendingTask, SourceFile, SourceLoader,
    stroke::{StrokeOverlay, Tool},
};

/// Maps a position relative to the displayed (possibly scaled) canvas element to native image
/// pixels. Each axis is scaled independently by `native / displayed`.
pub fn map_to_image(
    pointer: [f32; 2],
    displayed: [f32; 2],
    native: (u32, u32),
) -> Option<[f32; 2]> {
    if displayed[0] <= 0.0 || displayed[1] <= 0.0 {
        return None;
    }
    Some([
        pointer[0] * (native.0 as f32 / displayed[0]),
        pointer[1] * (native.1 as f32 / displayed[1]),
    ])
}

#[allow(clippy::large_enum_variant)]
pub enum CanvasState {
    Blank,
    Loading {
        index: usize,
        file: Arc<SourceFile>,
        task: PendingTask<Result<Arc<RgbaImage>, ImageLoadError>>,
    },
    Ready(Surface),
    Failed {
        index: usize,
        message: String,
    },
}

/// Source pixels at native resolution plus the stroke overlay of the same size.
pub struct Surface {
    index: usize,
    file: Arc<SourceFile>,
    source: Arc<RgbaImage>,
    overlay: StrokeOverlay,
    shown_mask: Option<MaskRef>,
}

impl Surface {
    fn new(index: usize, file: Arc<SourceFile>, source: Arc<RgbaImage>) -> Self {
        let (width, height) = source.dimensions();
        Self {
            index,
            file,
            source,
            overlay: StrokeOverlay::new(width, height),
            shown_mask: None,
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.source.dimensions()
    }

    pub fn overlay(&self) -> &StrokeOverlay {
        &self.overlay
    }

    pub fn shown_mask(&self) -> Option<&MaskRef> {
        self.shown_mask.as_ref()
    }

    /// Clears the overlay and redraws it from `mask`. An undecodable mask leaves the bare image.
    fn redraw(&mut self, mask: Option<&MaskRef>) -> Result<(), MaskError> {
        let (width, height) = self.dimensions();
        self.shown_mask = mask.cloned();
        self.overlay = StrokeOverlay::new(width, height);
        if let Some(mask) = mask {
            let decoded = mask.decode_sized(width, height)?;
            self.overlay = StrokeOverlay::from_mask(&decoded);
        }
        Ok(())
    }

    /// Source with the overlay blended on top, ready for display.
    pub fn composite(&self) -> RgbaImage {
        let layer = self.overlay.layer();
        let mut out = (*self.source).clone();
        for (dst, src) in out.pixels_mut().zip(layer.pixels()) {
            *dst = blend(*dst, *src);
        }
        out
    }
}

fn blend(Rgba([r, g, b, _]): Rgba<u8>, Rgba([or, og, ob, oa]): Rgba<u8>) -> Rgba<u8> {
    let a = oa as u16;
    let mix = |base: u8, over: u8| ((base as u16 * (255 - a) + over as u16 * a) / 255) as u8;
    Rgba([mix(r, or), mix(g, og), mix(b, ob), 255])
}

pub enum CanvasEvent {
    Loaded { index: usize },
    Failed { index: usize, error: ImageLoadError },
}

/// Renders the selected image and its mask and owns the stroke overlay painted on top.
pub struct MaskCanvas {
    state: CanvasState,
    loader: SourceLoader,
    revision: u64,
}

impl MaskCanvas {
    pub fn new(loader: SourceLoader) -> Self {
        Self {
            state: CanvasState::Blank,
            loader,
            revision: 0,
        }
    }

    pub fn state(&self) -> &CanvasState {
        &self.state
    }

    /// Bumped on every visible change, so a UI can cache its texture.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn surface(&self) -> Option<&Surface> {
        match &self.state {
            CanvasState::Ready(s) => Some(s),
            _ => None,
        }
    }

    pub fn reset(&mut self) {
        self.state = CanvasState::Blank;
        self.touch();
    }

    /// Starts loading the image of entry `index` unless it is already shown or loading.
    pub fn show(&mut self, index: usize, file: Arc<SourceFile>) {
        let current = match &self.state {
            CanvasState::Loading { index, file, .. } => Some((*index, file)),
            CanvasState::Ready(s) => Some((s.index, &s.file)),
            _ => None,
        };
        if let Some((i, f)) = current {
            if i == index && Arc::ptr_eq(f, &file) {
                return;
            }
        }
        debug!("Loading {} for entry {index}", file.name);
        let task = PendingTask::new((self.loader)(file.clone()));
        self.state = CanvasState::Loading { index, file, task };
        self.touch();
    }

    /// Drives a pending load. Once the pixels arrive the surface is drawn from scratch with
    /// `mask` on top.
    pub fn poll(&mut self, mask: Option<&MaskRef>) -> Option<CanvasEvent> {
        let CanvasState::Loading { index, file, task } = &mut self.state else {
            return None;
        };
        let index = *index;
        let result = task.poll_ready()?;
        let event = match result {
            Ok(source) => {
                let mut surface = Surface::new(index, file.clone(), source);
                if let Err(e) = surface.redraw(mask) {
                    warn!("Mask of entry {index} cannot be drawn: {e}");
                }
                self.state = CanvasState::Ready(surface);
                CanvasEvent::Loaded { index }
            }
            Err(error) => {
                warn!("Image of entry {index} failed to load: {error}");
                self.state = CanvasState::Failed {
                    index,
                    message: error.to_string(),
                };
                CanvasEvent::Failed { index, error }
            }
        };
        self.touch();
        Some(event)
    }

    /// Redraws the overlay if `mask` differs from the one currently shown for `index`.
    pub fn sync_mask(&mut self, index: usize, mask: Option<&MaskRef>) -> Result<(), MaskError> {
        let CanvasState::Ready(surface) = &mut self.state else {
            return Ok(());
        };
        if surface.index != index
            || surface.overlay.is_drawing()
            || surface.shown_mask.as_ref() == mask
        {
            return Ok(());
        }
        let r = surface.redraw(mask);
        self.touch();
        r
    }

    pub fn begin_stroke(&mut self, tool: Tool, radius: f32, at: [f32; 2]) -> bool {
        let CanvasState::Ready(surface) = &mut self.state else {
            return false;
        };
        surface.overlay.begin(tool, radius, at);
        self.touch();
        true
    }

    pub fn continue_stroke(&mut self, to: [f32; 2]) -> bool {
        let CanvasState::Ready(surface) = &mut self.state else {
            return false;
        };
        let changed = surface.overlay.extend(to);
        if changed {
            self.touch();
        }
        changed
    }

    /// Thresholds the overlay into a new mask for the shown entry. Returns `None` when no stroke
    /// was in progress.
    pub fn end_stroke(&mut self) -> Option<(usize, Result<MaskRef, MaskError>)> {
        let CanvasState::Ready(surface) = &mut self.state else {
            return None;
        };
        let binary = surface.overlay.finish()?;
        let encoded = MaskRef::encode(&binary);
        if let Ok(mask) = &encoded {
            debug!(
                "Stroke finished on entry {}: {}x{} mask",
                surface.index,
                binary.width(),
                binary.height()
            );
            surface.shown_mask = Some(mask.clone());
        }
        Some((surface.index, encoded))
    }

    /// Drops the stroke in progress and redraws the overlay from the mask shown before it began.
    pub fn cancel_stroke(&mut self) -> bool {
        let CanvasState::Ready(surface) = &mut self.state else {
            return false;
        };
        if !surface.overlay.is_drawing() {
            return false;
        }
        let shown = surface.shown_mask.clone();
        if let Err(e) = surface.redraw(shown.as_ref()) {
            warn!("Mask of entry {} cannot be drawn: {e}", surface.index);
        }
        self.touch();
        true
    }

    pub fn is_drawing(&self) -> bool {
        self.surface().is_some_and(|s| s.overlay.is_drawing())
    }

    fn touch(&mut self) {
        self.revision = self.revision.wrapping_add(1);
    }
}
