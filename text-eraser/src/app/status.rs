use chrono::{DateTime, Local};
use mask_painter::Editor;

/// `HH:MM:SS` in local time, for an epoch-ms timestamp.
fn clock_time(epoch_ms: i64) -> Option<String> {
    let time = DateTime::from_timestamp_millis(epoch_ms)?.with_timezone(&Local);
    Some(time.format("%H:%M:%S").to_string())
}

pub(super) fn ui(editor: &Editor, ui: &mut egui::Ui) {
    let session = editor.session();
    ui.horizontal(|ui| {
        if let Some(i) = session.selected_index() {
            ui.label(format!("Image {} / {}", i + 1, session.len()));
            ui.separator();
        }
        ui.label(session.tool().hint());
        ui.separator();
        ui.label(format!("Brush {}px", session.brush().get()));
        ui.separator();
        ui.label(format!("{} of {} masked", session.masked_count(), session.len()));
        if let Some((_, remaining)) = editor.processing() {
            ui.separator();
            ui.spinner();
            ui.label(format!("Processing, {remaining} left"));
        }
        if let Some(saved) = editor.last_saved().and_then(clock_time) {
            ui.separator();
            ui.label(format!("Autosaved {saved}"));
        }
    });
}
