//! Stroke overlay: a transparent layer which accumulates circular brush stamps in a sentinel
//! colour and is thresholded into a strict binary mask when a stroke ends.

use image::{GrayImage, Rgba, RgbaImage};

use crate::mask::{BACKGROUND, FOREGROUND};

/// Paint colour used to mark selected pixels.
pub const SENTINEL: Rgba<u8> = Rgba([255, 0, 0, 128]);
const CLEAR: Rgba<u8> = Rgba([0, 0, 0, 0]);

/// Classification thresholds for the sentinel signature.
const RED_MIN: u8 = 200;
const GREEN_BLUE_MAX: u8 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tool {
    #[default]
    Brush,
    Eraser,
}

impl Tool {
    pub fn label(self) -> &'static str {
        match self {
            Tool::Brush => "Brush",
            Tool::Eraser => "Eraser",
        }
    }

    /// Short instruction shown on top of the canvas.
    pub fn hint(self) -> &'static str {
        match self {
            Tool::Brush => "Paint over the areas to remove",
            Tool::Eraser => "Correct the selection",
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct ActiveStroke {
    tool: Tool,
    radius: f32,
    last: [f32; 2],
}

pub struct StrokeOverlay {
    layer: RgbaImage,
    active: Option<ActiveStroke>,
}

impl StrokeOverlay {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            layer: RgbaImage::from_pixel(width, height, CLEAR),
            active: None,
        }
    }

    /// Seeds the overlay with an existing mask so later strokes refine it.
    /// `mask` has to match the overlay size.
    pub fn from_mask(mask: &GrayImage) -> Self {
        let layer = RgbaImage::from_fn(mask.width(), mask.height(), |x, y| {
            if *mask.get_pixel(x, y) == BACKGROUND {
                CLEAR
            } else {
                SENTINEL
            }
        });
        Self {
            layer,
            active: None,
        }
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.layer.dimensions()
    }

    pub fn layer(&self) -> &RgbaImage {
        &self.layer
    }

    pub fn is_drawing(&self) -> bool {
        self.active.is_some()
    }

    pub fn clear(&mut self) {
        self.layer.pixels_mut().for_each(|p| *p = CLEAR);
        self.active = None;
    }

    pub fn begin(&mut self, tool: Tool, radius: f32, at: [f32; 2]) {
        self.active = Some(ActiveStroke {
            tool,
            radius,
            last: at,
        });
        self.stamp(tool, radius, at);
    }

    /// Continues the active stroke; without one this is a no-op and returns false.
    pub fn extend(&mut self, to: [f32; 2]) -> bool {
        let Some(stroke) = self.active.as_mut() else {
            return false;
        };
        let ActiveStroke { tool, radius, last } = *stroke;
        stroke.last = to;

        let [dx, dy] = [to[0] - last[0], to[1] - last[1]];
        let distance = (dx * dx + dy * dy).sqrt();
        let spacing = (radius / 4.0).max(1.0);
        let steps = (distance / spacing).ceil().max(1.0) as usize;
        for step in 1..=steps {
            let t = step as f32 / steps as f32;
            self.stamp(tool, radius, [last[0] + dx * t, last[1] + dy * t]);
        }
        true
    }

    /// Ends the stroke and returns the thresholded mask, or `None` if no stroke was active.
    pub fn finish(&mut self) -> Option<GrayImage> {
        self.active.take()?;
        Some(self.binarize())
    }

    /// Every sentinel-looking pixel becomes white, everything else black.
    pub fn binarize(&self) -> GrayImage {
        GrayImage::from_fn(self.layer.width(), self.layer.height(), |x, y| {
            if is_sentinel(self.layer.get_pixel(x, y)) {
                FOREGROUND
            } else {
                BACKGROUND
            }
        })
    }

    fn stamp(&mut self, tool: Tool, radius: f32, [cx, cy]: [f32; 2]) {
        let (width, height) = self.layer.dimensions();
        let reach = radius + 0.5;
        let x_min = (cx - reach).floor().max(0.0) as u32;
        let y_min = (cy - reach).floor().max(0.0) as u32;
        let x_max = ((cx + reach).ceil().max(0.0) as u32).min(width);
        let y_max = ((cy + reach).ceil().max(0.0) as u32).min(height);

        for y in y_min..y_max {
            for x in x_min..x_max {
                let (px, py) = (x as f32 + 0.5 - cx, y as f32 + 0.5 - cy);
                // Coverage falls off over one pixel at the rim
                let coverage = (reach - (px * px + py * py).sqrt()).clamp(0.0, 1.0);
                if coverage <= 0.0 {
                    continue;
                }
                let pixel = self.layer.get_pixel_mut(x, y);
                *pixel = match tool {
                    Tool::Brush => source_over(*pixel, coverage),
                    Tool::Eraser => destination_out(*pixel, coverage),
                };
            }
        }
    }
}

fn source_over(dst: Rgba<u8>, coverage: f32) -> Rgba<u8> {
    let src_a = SENTINEL.0[3] as f32 / 255.0 * coverage;
    let dst_a = dst.0[3] as f32 / 255.0;
    let out_a = src_a + dst_a * (1.0 - src_a);
    // The layer only ever holds the sentinel colour, so only alpha accumulates
    let [r, g, b, _] = SENTINEL.0;
    Rgba([r, g, b, (out_a * 255.0).round() as u8])
}

fn destination_out(dst: Rgba<u8>, coverage: f32) -> Rgba<u8> {
    let alpha = (dst.0[3] as f32 * (1.0 - coverage)).round() as u8;
    if alpha == 0 {
        CLEAR
    } else {
        Rgba([dst.0[0], dst.0[1], dst.0[2], alpha])
    }
}

/// Strong, mostly pure red, independent of how opaque it was painted.
pub fn is_sentinel(&Rgba([r, g, b, a]): &Rgba<u8>) -> bool {
    a > 0 && r > RED_MIN && g < GREEN_BLUE_MAX && b < GREEN_BLUE_MAX
}
