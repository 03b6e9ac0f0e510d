use egui::{self, Color32, RichText};
use mask_painter::{Editor, ProcessingState};

const ICON_PREV: &str = "\u{23F4}";
const ICON_NEXT: &str = "\u{23F5}";
const ICON_MASKED: &str = "\u{25CF}";
const ICON_PROCESSED: &str = "\u{2714}";
const ICON_FAILED: &str = "\u{2716}";

pub(super) fn ui(editor: &mut Editor, ui: &mut egui::Ui) {
    let total = editor.session().len();
    ui.horizontal(|ui| {
        if ui
            .button(ICON_PREV)
            .on_hover_text("Previous (ArrowLeft)")
            .clicked()
        {
            editor.previous_image();
        }
        match editor.session().selected_index() {
            Some(i) => ui.label(format!("{} / {total}", i + 1)),
            None => ui.label("0 / 0"),
        };
        if ui.button(ICON_NEXT).on_hover_text("Next (ArrowRight)").clicked() {
            editor.next_image();
        }
    });
    ui.separator();

    let mut select = None;
    let mut submit = None;
    egui::ScrollArea::vertical().show(ui, |ui| {
        let selected = editor.session().selected_index();
        let can_submit_one = editor.processing().is_none();
        for (i, entry) in editor.session().entries().iter().enumerate() {
            ui.horizontal(|ui| {
                let badge = if entry.mask.is_some() {
                    RichText::new(ICON_MASKED).color(Color32::from_rgb(255, 80, 80))
                } else {
                    RichText::new(ICON_MASKED).color(Color32::DARK_GRAY)
                };
                let hover = if entry.mask.is_some() { "Masked" } else { "No mask" };
                ui.label(badge).on_hover_text(hover);

                if ui
                    .selectable_label(selected == Some(i), entry.source.name.as_str())
                    .clicked()
                {
                    select = Some(i);
                }

                match &entry.state {
                    ProcessingState::Idle => {
                        if entry.mask.is_some()
                            && ui
                                .add_enabled(can_submit_one, egui::Button::new("Process").small())
                                .clicked()
                        {
                            submit = Some(i);
                        }
                    }
                    ProcessingState::Processing => {
                        ui.spinner();
                    }
                    ProcessingState::Processed { result } => {
                        ui.hyperlink_to(ICON_PROCESSED, result).on_hover_text("Open result");
                    }
                    ProcessingState::Failed { message } => {
                        ui.colored_label(Color32::LIGHT_RED, ICON_FAILED)
                            .on_hover_text(message.as_str());
                        if entry.mask.is_some()
                            && ui
                                .add_enabled(can_submit_one, egui::Button::new("Retry").small())
                                .clicked()
                        {
                            submit = Some(i);
                        }
                    }
                }
            });
        }
    });

    if let Some(i) = select {
        editor.select_image(i);
    }
    if let Some(i) = submit {
        editor.submit_one(i);
    }
}
