use egui::{self, Slider};
use log::info;
use mask_painter::{BrushRadius, Tool};

use super::{EraserApp, files};

const ICON_UPLOAD: &str = "\u{1F4C2}";
const ICON_UNDO: &str = "\u{21B6}";
const ICON_REDO: &str = "\u{21B7}";
const ICON_SAVE: &str = "\u{1F4BE}";

impl EraserApp {
    pub(super) fn toolbar_ui(&mut self, ui: &mut egui::Ui) {
        ui.horizontal_wrapped(|ui| {
            if ui.button(format!("{ICON_UPLOAD} Upload")).clicked() {
                self.upload();
            }
            ui.separator();

            let session = self.editor.session();
            let (tool, has_images, has_mask, can_submit) = (
                session.tool(),
                !session.is_empty(),
                session.selected().is_some_and(|e| e.mask.is_some()),
                session.can_submit() && self.editor.processing().is_none(),
            );
            for candidate in [Tool::Brush, Tool::Eraser] {
                let shortcut = match candidate {
                    Tool::Brush => "B",
                    Tool::Eraser => "E",
                };
                if ui
                    .selectable_label(tool == candidate, candidate.label())
                    .on_hover_text(format!("{} ({shortcut})", candidate.hint()))
                    .clicked()
                    && tool != candidate
                {
                    self.editor.set_tool(candidate);
                }
            }

            let mut radius = self.editor.session().brush().get();
            if ui
                .add(
                    Slider::new(&mut radius, BrushRadius::MIN..=BrushRadius::MAX)
                        .step_by(BrushRadius::STEP as f64)
                        .text("px"),
                )
                .on_hover_text("Brush size ([ / ])")
                .changed()
            {
                self.editor.set_brush(radius);
            }
            ui.separator();

            let history = self.editor.history();
            let (can_undo, can_redo) = (history.can_undo(), history.can_redo());
            if ui
                .add_enabled(can_undo, egui::Button::new(ICON_UNDO))
                .on_hover_text("Undo (cmd + Z)")
                .clicked()
            {
                self.editor.undo();
            }
            if ui
                .add_enabled(can_redo, egui::Button::new(ICON_REDO))
                .on_hover_text("Redo (cmd + shift + Z)")
                .clicked()
            {
                self.editor.redo();
            }
            ui.separator();

            ui.add_enabled_ui(has_images, |ui| {
                if ui
                    .add_enabled(has_mask, egui::Button::new("Reset mask"))
                    .on_hover_text("R")
                    .clicked()
                {
                    self.editor.clear_mask();
                }
                if ui.button("Apply to all").on_hover_text("C").clicked() {
                    self.editor.apply_mask_to_all();
                }
                if ui.button("Clear all masks").clicked() {
                    self.editor.clear_all_masks();
                }
                if ui.button("Remove images").clicked() {
                    self.editor.clear_all();
                }
            });
            ui.separator();

            if ui
                .button(format!("{ICON_SAVE} Export"))
                .on_hover_text("Save masks as project file")
                .clicked()
            {
                self.export();
            }
            if ui.button("Import").on_hover_text("Load masks from project file").clicked() {
                self.import();
            }
            ui.separator();

            if ui
                .add_enabled(can_submit, egui::Button::new("Process all"))
                .on_hover_text("Space")
                .clicked()
            {
                self.editor.submit_all();
            }
        });
    }

    fn upload(&mut self) {
        let Some(paths) = rfd::FileDialog::new()
            .add_filter("Images", files::EXTENSIONS)
            .set_title("Add images")
            .pick_files()
        else {
            return;
        };
        let mut loaded = Vec::with_capacity(paths.len());
        for path in paths {
            match files::read_file(&path) {
                Ok(file) => loaded.push(file),
                Err(e) => self
                    .editor
                    .notifications()
                    .error("Cannot read file", format!("{}: {e}", path.display())),
            }
        }
        info!("Adding {} images", loaded.len());
        self.editor.add_images(loaded);
    }

    fn export(&mut self) {
        let Some(export) = self.editor.export_project() else {
            return;
        };
        let Some(path) = rfd::FileDialog::new()
            .add_filter("Project", &["json"])
            .set_file_name(&export.file_name)
            .save_file()
        else {
            return;
        };
        match std::fs::write(&path, export.json) {
            Ok(()) => self
                .editor
                .notifications()
                .info("Project exported", format!("{} masks saved", export.masks)),
            Err(e) => self
                .editor
                .notifications()
                .error("Export failed", format!("{}: {e}", path.display())),
        }
    }

    fn import(&mut self) {
        let Some(path) = rfd::FileDialog::new()
            .add_filter("Project", &["json"])
            .set_title("Import project")
            .pick_file()
        else {
            return;
        };
        match std::fs::read_to_string(&path) {
            Ok(json) => {
                self.editor.import_project(&json);
            }
            Err(e) => self
                .editor
                .notifications()
                .error("Import failed", format!("{}: {e}", path.display())),
        }
    }
}
