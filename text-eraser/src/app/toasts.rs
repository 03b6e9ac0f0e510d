use egui::{self, Align2, Color32};
use mask_painter::{Level, Notification};

/// Seconds a toast stays on screen.
const TTL: f64 = 4.0;
const MAX_VISIBLE: usize = 5;

#[derive(Default)]
pub(super) struct Toasts {
    shown: Vec<(f64, Notification)>,
}

impl Toasts {
    pub fn extend(&mut self, now: f64, notifications: impl IntoIterator<Item = Notification>) {
        self.shown.extend(notifications.into_iter().map(|n| (now, n)));
        let overflow = self.shown.len().saturating_sub(MAX_VISIBLE);
        self.shown.drain(..overflow);
    }

    /// Draws the live toasts. Returns whether any are left.
    pub fn ui(&mut self, ctx: &egui::Context, now: f64) -> bool {
        self.shown.retain(|(since, _)| now - since < TTL);
        if self.shown.is_empty() {
            return false;
        }
        egui::Area::new(egui::Id::new("toasts"))
            .anchor(Align2::RIGHT_BOTTOM, [-12.0, -48.0])
            .show(ctx, |ui| {
                for (_, n) in &self.shown {
                    egui::Frame::popup(ui.style()).show(ui, |ui| {
                        ui.set_max_width(320.0);
                        let color = match n.level {
                            Level::Info => ui.visuals().text_color(),
                            Level::Warning => Color32::from_rgb(230, 180, 60),
                            Level::Error => Color32::LIGHT_RED,
                        };
                        ui.colored_label(color, egui::RichText::new(n.title.as_str()).strong());
                        if !n.body.is_empty() {
                            ui.label(n.body.as_str());
                        }
                    });
                }
            });
        true
    }
}
