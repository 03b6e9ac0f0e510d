use egui::{
    self, Color32, ColorImage, Pos2, Rect, Sense, Stroke, TextureHandle, TextureOptions, Vec2,
};
use mask_painter::{CanvasState, Editor, Tool, map_to_image};

const TEXTURE_OPTIONS: TextureOptions = TextureOptions::NEAREST;

/// Shows the canvas of the editor scaled to the available space and turns pointer drags into
/// strokes in native image coordinates.
#[derive(Default)]
pub(super) struct CanvasView {
    // Canvas revision the texture was built from
    texture: Option<(u64, TextureHandle)>,
}

impl CanvasView {
    pub fn ui(&mut self, editor: &mut Editor, ui: &mut egui::Ui) {
        let native = match editor.canvas().state() {
            CanvasState::Blank => {
                self.texture = None;
                ui.centered_and_justified(|ui| ui.label("Upload images to start painting"));
                return;
            }
            CanvasState::Loading { file, .. } => {
                let name = file.name.clone();
                ui.centered_and_justified(|ui| {
                    ui.horizontal(|ui| {
                        ui.spinner();
                        ui.label(format!("Loading {name}"));
                    });
                });
                return;
            }
            CanvasState::Failed { message, .. } => {
                self.texture = None;
                let message = message.clone();
                ui.centered_and_justified(|ui| ui.colored_label(Color32::LIGHT_RED, message));
                return;
            }
            CanvasState::Ready(surface) => surface.dimensions(),
        };
        let Some(texture) = self.refresh_texture(editor, ui.ctx()) else {
            return;
        };

        let available = ui.available_size();
        let scale = (available.x / native.0 as f32).min(available.y / native.1 as f32);
        let size = Vec2::new(native.0 as f32, native.1 as f32) * scale.max(f32::EPSILON);

        let inner = ui.vertical_centered(|ui| ui.allocate_painter(size, Sense::drag()));
        let (response, painter) = inner.inner;
        let rect = response.rect;
        painter.image(
            texture,
            rect,
            Rect::from_min_max(Pos2::ZERO, Pos2::new(1.0, 1.0)),
            Color32::WHITE,
        );

        let to_image = |pos: Pos2| {
            map_to_image(
                [pos.x - rect.min.x, pos.y - rect.min.y],
                [rect.width(), rect.height()],
                native,
            )
        };

        if response.drag_started() {
            if let Some(at) = response.interact_pointer_pos().and_then(to_image) {
                editor.begin_stroke(at);
            }
        } else if response.dragged() && editor.is_drawing() {
            if let Some(to) = response.interact_pointer_pos().and_then(to_image) {
                editor.continue_stroke(to);
            }
        }
        // Leaving the canvas ends the stroke as well
        if editor.is_drawing() && (response.drag_stopped() || !response.contains_pointer()) {
            editor.end_stroke();
        }

        if let Some(hover) = response.hover_pos() {
            let radius = editor.session().brush().get() as f32 * scale;
            let color = match editor.session().tool() {
                Tool::Brush => Color32::from_rgb(255, 80, 80),
                Tool::Eraser => Color32::WHITE,
            };
            painter.circle_stroke(hover, radius, Stroke::new(1.5, color));
        }
    }

    fn refresh_texture(&mut self, editor: &Editor, ctx: &egui::Context) -> Option<egui::TextureId> {
        let canvas = editor.canvas();
        let surface = canvas.surface()?;
        let revision = canvas.revision();
        let stale = !matches!(&self.texture, Some((built, _)) if *built == revision);
        if stale {
            let composite = surface.composite();
            let image = ColorImage::from_rgba_unmultiplied(
                [composite.width() as _, composite.height() as _],
                composite.as_raw(),
            );
            match &mut self.texture {
                Some((built, handle)) => {
                    handle.set(image, TEXTURE_OPTIONS);
                    *built = revision;
                }
                None => {
                    let handle = ctx.load_texture("canvas", image, TEXTURE_OPTIONS);
                    self.texture = Some((revision, handle));
                }
            }
        }
        self.texture.as_ref().map(|(_, handle)| handle.id())
    }
}
