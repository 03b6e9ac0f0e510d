use mask_painter::{
    Editor, SourceFile,
    keyboard::{self, Key, KeyPress, Modifiers},
};

use canvas_view::CanvasView;
use toasts::Toasts;

mod canvas_view;
mod config;
mod files;
mod image_list;
mod native;
mod status;
mod toasts;
mod toolbar;

pub use config::Config;
pub use native::run_native;

pub(crate) struct EraserApp {
    editor: Editor,
    canvas: CanvasView,
    toasts: Toasts,
}

impl EraserApp {
    pub fn new(
        _cc: &eframe::CreationContext<'_>,
        mut editor: Editor,
        initial: Vec<SourceFile>,
    ) -> Self {
        if !initial.is_empty() {
            editor.add_images(initial);
        }
        Self {
            editor,
            canvas: CanvasView::default(),
            toasts: Toasts::default(),
        }
    }

    /// Runs the bound command for every key press of this frame and swallows the handled ones.
    fn handle_keys(&mut self, ctx: &egui::Context) {
        let in_text_input = ctx.wants_keyboard_input();
        let presses: Vec<_> = ctx.input(|i| {
            i.events
                .iter()
                .filter_map(|e| match e {
                    egui::Event::Key {
                        key,
                        pressed: true,
                        modifiers,
                        ..
                    } => Some((*key, *modifiers)),
                    _ => None,
                })
                .collect()
        });
        for (key, modifiers) in presses {
            let press = KeyPress {
                key: translate_key(key),
                modifiers: Modifiers {
                    command: modifiers.command,
                    shift: modifiers.shift,
                },
                in_text_input,
            };
            if self.editor.handle_key(press) {
                ctx.input_mut(|i| i.consume_key(modifiers, key));
            }
        }
    }
}

fn translate_key(key: egui::Key) -> Key {
    match key {
        egui::Key::ArrowLeft => Key::ArrowLeft,
        egui::Key::ArrowRight => Key::ArrowRight,
        egui::Key::Space => Key::Space,
        egui::Key::B => Key::B,
        egui::Key::C => Key::C,
        egui::Key::E => Key::E,
        egui::Key::R => Key::R,
        egui::Key::Z => Key::Z,
        egui::Key::OpenBracket => Key::OpenBracket,
        egui::Key::CloseBracket => Key::CloseBracket,
        _ => Key::Other,
    }
}

impl eframe::App for EraserApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.editor.poll();
        self.handle_keys(ctx);

        egui::TopBottomPanel::top("toolbar").show(ctx, |ui| {
            self.toolbar_ui(ui);
        });
        egui::TopBottomPanel::bottom("status").show(ctx, |ui| {
            status::ui(&self.editor, ui);
            ui.horizontal_wrapped(|ui| {
                for (key, action) in keyboard::LEGEND {
                    ui.label(egui::RichText::new(*key).monospace().strong());
                    ui.label(*action);
                    ui.add_space(6.0);
                }
            });
        });
        egui::SidePanel::left("images")
            .resizable(true)
            .default_width(220.0)
            .show(ctx, |ui| {
                image_list::ui(&mut self.editor, ui);
            });
        egui::CentralPanel::default().show(ctx, |ui| {
            self.canvas.ui(&mut self.editor, ui);
        });

        let now = ctx.input(|i| i.time);
        self.toasts.extend(now, self.editor.notifications().drain());
        let toasts_visible = self.toasts.ui(ctx, now);

        if self.editor.is_busy() || toasts_visible {
            ctx.request_repaint_after(std::time::Duration::from_millis(50));
        }
    }
}
