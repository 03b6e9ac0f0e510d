//! The batch editor: session, canvas, history, autosave and processing wired together.
//!
//! Front ends forward input to the [`Editor`] and call [`Editor::poll`] once per frame. Every
//! outcome the user should hear about ends up in [`Editor::notifications`].

use log::{debug, info, warn};

use crate::{
    BatchSession, SessionError, SourceFile, SourceLoader,
    autosave,
    batch::{BatchEvent, BatchRun},
    canvas::{CanvasEvent, MaskCanvas},
    gateway::ProcessingGateway,
    history::History,
    keyboard::{self, Command, KeyPress},
    notify::Notifications,
    project::{ImportReport, ProjectFile},
    session::BrushRadius,
    storage::MaskStore,
    stroke::Tool,
};

/// Current time in epoch-ms.
pub type Clock = Box<dyn Fn() -> i64>;

pub fn system_clock() -> Clock {
    Box::new(|| chrono::Utc::now().timestamp_millis())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectExport {
    pub file_name: String,
    pub json: String,
    /// Number of masks in the file.
    pub masks: usize,
}

pub struct Editor {
    session: BatchSession,
    history: History,
    canvas: MaskCanvas,
    store: Box<dyn MaskStore>,
    gateway: Box<dyn ProcessingGateway>,
    notifications: Notifications,
    batch: Option<BatchRun>,
    clock: Clock,
}

impl Editor {
    pub fn new(
        store: Box<dyn MaskStore>,
        gateway: Box<dyn ProcessingGateway>,
        loader: SourceLoader,
    ) -> Self {
        Self {
            session: BatchSession::default(),
            history: History::default(),
            canvas: MaskCanvas::new(loader),
            store,
            gateway,
            notifications: Notifications::default(),
            batch: None,
            clock: system_clock(),
        }
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_brush(mut self, brush: BrushRadius) -> Self {
        self.session.set_brush(brush);
        self
    }

    pub fn session(&self) -> &BatchSession {
        &self.session
    }

    pub fn canvas(&self) -> &MaskCanvas {
        &self.canvas
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn notifications(&mut self) -> &mut Notifications {
        &mut self.notifications
    }

    /// Entry currently waiting for the gateway and the number of entries left in the run.
    pub fn processing(&self) -> Option<(Option<usize>, usize)> {
        self.batch.as_ref().map(|b| (b.current(), b.remaining()))
    }

    /// Something is still in flight and [`Editor::poll`] should be called again soon.
    pub fn is_busy(&self) -> bool {
        self.batch.is_some()
            || matches!(self.canvas.state(), crate::canvas::CanvasState::Loading { .. })
    }

    /// Epoch-ms of the last autosave.
    pub fn last_saved(&self) -> Option<i64> {
        self.store
            .last_saved()
            .inspect_err(|e| warn!("Cannot read autosave time: {e}"))
            .ok()
            .flatten()
    }

    /// Appends images in upload order. The first upload into an empty session restores the
    /// autosaved masks of matching files.
    pub fn add_images(&mut self, files: impl IntoIterator<Item = SourceFile>) -> usize {
        let was_empty = self.session.is_empty();
        let added = self.session.add_images(files);
        if added == 0 {
            return 0;
        }
        self.notifications.info("Images added", format!("{added} files added"));

        if was_empty {
            self.restore_autosave();
        }
        self.history.reset(self.session.masks());
        self.show_selected();
        added
    }

    fn restore_autosave(&mut self) {
        let records = match autosave::load_valid(self.store.as_ref(), self.now()) {
            Ok(records) => records,
            Err(e) => {
                warn!("Ignoring unreadable autosave: {e}");
                return;
            }
        };
        let restored = autosave::apply(&mut self.session, &records);
        if restored > 0 {
            info!("Restored {restored} of {} autosaved masks", records.len());
            self.notifications
                .info("Progress restored", format!("{restored} masks restored"));
        }
    }

    /// Drops every image, the history and any running batch. The autosave is kept.
    pub fn clear_all(&mut self) {
        if self.batch.take().is_some() {
            warn!("Abandoning running batch");
        }
        self.session.clear();
        self.history.reset(Vec::new());
        self.canvas.reset();
    }

    /// Out of bounds indices are ignored.
    pub fn select_image(&mut self, index: usize) -> bool {
        self.end_stroke();
        if !self.session.select(index) {
            return false;
        }
        self.show_selected();
        true
    }

    pub fn next_image(&mut self) -> bool {
        self.end_stroke();
        if !self.session.select_next() {
            return false;
        }
        self.show_selected();
        true
    }

    pub fn previous_image(&mut self) -> bool {
        self.end_stroke();
        if !self.session.select_previous() {
            return false;
        }
        self.show_selected();
        true
    }

    fn show_selected(&mut self) {
        let Some(index) = self.session.selected_index() else {
            self.canvas.reset();
            return;
        };
        let source = self.session.entries()[index].source.clone();
        self.canvas.show(index, source);
        self.sync_canvas();
    }

    fn sync_canvas(&mut self) {
        let Some(index) = self.session.selected_index() else {
            return;
        };
        let mask = self.session.entries()[index].mask.clone();
        if let Err(e) = self.canvas.sync_mask(index, mask.as_ref()) {
            warn!("Cannot draw mask of entry {index}: {e}");
        }
    }

    /// Drives image loading and the processing queue. Returns whether anything visible changed.
    pub fn poll(&mut self) -> bool {
        let mask = self.session.selected().and_then(|e| e.mask.clone());
        let mut changed = match self.canvas.poll(mask.as_ref()) {
            Some(CanvasEvent::Loaded { index }) => {
                debug!("Entry {index} ready for painting");
                true
            }
            Some(CanvasEvent::Failed { index, error }) => {
                let name = self.entry_name(index);
                self.notifications
                    .error("Image failed to load", format!("{name}: {error}"));
                true
            }
            None => false,
        };
        changed |= self.poll_batch();
        changed
    }

    fn poll_batch(&mut self) -> bool {
        let Some(run) = self.batch.as_mut() else {
            return false;
        };
        let events = run.poll(&mut self.session, self.gateway.as_ref());
        let changed = !events.is_empty();
        for event in events {
            match event {
                BatchEvent::Processed { index, .. } => {
                    let name = self.entry_name(index);
                    self.notifications.info("Done!", format!("{name} processed"));
                }
                BatchEvent::Failed { index, message } => {
                    let name = self.entry_name(index);
                    self.notifications.error("Processing failed", format!("{name}: {message}"));
                }
                BatchEvent::Finished { succeeded, failed } => {
                    info!("Batch finished: {succeeded} processed, {failed} failed");
                    self.notifications.info(
                        "Processing finished",
                        format!("{succeeded} processed, {failed} failed"),
                    );
                    self.batch = None;
                }
            }
        }
        changed
    }

    fn entry_name(&self, index: usize) -> String {
        self.session
            .entries()
            .get(index)
            .map(|e| e.source.name.clone())
            .unwrap_or_else(|| format!("#{}", index + 1))
    }

    pub fn begin_stroke(&mut self, at: [f32; 2]) -> bool {
        let radius = self.session.brush().get() as f32;
        self.canvas.begin_stroke(self.session.tool(), radius, at)
    }

    pub fn continue_stroke(&mut self, to: [f32; 2]) -> bool {
        self.canvas.continue_stroke(to)
    }

    /// Thresholds the painted overlay into the selected entry's new mask.
    pub fn end_stroke(&mut self) -> bool {
        let Some((index, encoded)) = self.canvas.end_stroke() else {
            return false;
        };
        match encoded {
            Ok(mask) => {
                self.session.set_mask(index, Some(mask));
                self.masks_changed();
                true
            }
            Err(e) => {
                self.notifications.error("Mask not saved", e.to_string());
                false
            }
        }
    }

    pub fn is_drawing(&self) -> bool {
        self.canvas.is_drawing()
    }

    fn masks_changed(&mut self) {
        self.history.push(self.session.masks());
        self.autosave();
        self.sync_canvas();
    }

    fn autosave(&self) {
        if let Err(e) = autosave::save(self.store.as_ref(), &self.session, self.now()) {
            warn!("Autosave failed: {e}");
        }
    }

    fn now(&self) -> i64 {
        (self.clock)()
    }

    pub fn clear_mask(&mut self) {
        self.canvas.cancel_stroke();
        match self.session.clear_selected_mask() {
            Ok(()) => self.masks_changed(),
            Err(e) => self.notifications.warn("Nothing to clear", e.to_string()),
        }
    }

    pub fn apply_mask_to_all(&mut self) {
        match self.session.apply_mask_to_all() {
            Ok(count) => {
                self.masks_changed();
                self.notifications
                    .info("Mask applied", format!("Mask copied to {count} images"));
            }
            Err(e) => self.notifications.warn("No mask", e.to_string()),
        }
    }

    /// Removes every mask and purges the autosave.
    pub fn clear_all_masks(&mut self) {
        self.canvas.cancel_stroke();
        self.session.clear_all_masks();
        self.history.push(self.session.masks());
        if let Err(e) = self.store.clear() {
            warn!("Cannot purge autosave: {e}");
        }
        self.sync_canvas();
        self.notifications.info("Masks cleared", "All masks were removed");
    }

    pub fn set_tool(&mut self, tool: Tool) {
        self.session.set_tool(tool);
        self.notifications.info(tool.label(), tool.hint());
    }

    pub fn set_brush(&mut self, radius: u32) {
        self.session.set_brush(BrushRadius::new(radius));
    }

    pub fn grow_brush(&mut self) {
        self.session.set_brush(self.session.brush().grow());
    }

    pub fn shrink_brush(&mut self) {
        self.session.set_brush(self.session.brush().shrink());
    }

    pub fn undo(&mut self) -> bool {
        if self.canvas.is_drawing() {
            return false;
        }
        let Some(snapshot) = self.history.undo().cloned() else {
            return false;
        };
        debug!("Undo");
        self.session.restore_masks(&snapshot);
        self.autosave();
        self.sync_canvas();
        true
    }

    pub fn redo(&mut self) -> bool {
        if self.canvas.is_drawing() {
            return false;
        }
        let Some(snapshot) = self.history.redo().cloned() else {
            return false;
        };
        debug!("Redo");
        self.session.restore_masks(&snapshot);
        self.autosave();
        self.sync_canvas();
        true
    }

    /// Project file of every masked entry. Only failures are notified here.
    pub fn export_project(&mut self) -> Option<ProjectExport> {
        let project = ProjectFile::from_session(&self.session, self.now());
        match project.to_json() {
            Ok(json) => {
                info!("Exporting {} masks", project.masks.len());
                Some(ProjectExport {
                    file_name: project.file_name(),
                    json,
                    masks: project.masks.len(),
                })
            }
            Err(e) => {
                self.notifications.error("Export failed", e.to_string());
                None
            }
        }
    }

    /// Assigns the masks of a project file to matching entries. A malformed file changes nothing.
    pub fn import_project(&mut self, json: &str) -> Option<ImportReport> {
        let result = ProjectFile::parse(json).and_then(|p| p.apply(&mut self.session));
        match result {
            Ok(report) => {
                if report.matched > 0 {
                    self.masks_changed();
                }
                self.notifications.info(
                    "Project imported",
                    format!("{} of {} masks loaded", report.matched, report.total),
                );
                Some(report)
            }
            Err(e) => {
                warn!("Import failed: {e}");
                self.notifications.error("Import failed", e.to_string());
                None
            }
        }
    }

    /// Processes every masked entry which was not processed yet, one after another.
    pub fn submit_all(&mut self) -> bool {
        let run = self.check_idle().and_then(|()| BatchRun::all(&self.session));
        self.start(run)
    }

    pub fn submit_one(&mut self, index: usize) -> bool {
        let run = self.check_idle().and_then(|()| BatchRun::single(&self.session, index));
        self.start(run)
    }

    fn check_idle(&self) -> Result<(), SessionError> {
        match self.batch {
            Some(_) => Err(SessionError::AlreadyProcessing),
            None => Ok(()),
        }
    }

    fn start(&mut self, run: Result<BatchRun, SessionError>) -> bool {
        match run {
            Ok(run) => {
                self.batch = Some(run);
                self.poll_batch();
                true
            }
            Err(e) => {
                self.notifications.warn("Cannot process", e.to_string());
                false
            }
        }
    }

    /// Runs the command bound to `press`. Returns whether the key event was consumed.
    pub fn handle_key(&mut self, press: KeyPress) -> bool {
        let Some(binding) = keyboard::dispatch(press) else {
            return false;
        };
        self.execute(binding.command);
        binding.prevent_default
    }

    pub fn execute(&mut self, command: Command) {
        debug!("Execute {command:?}");
        match command {
            Command::NextImage => {
                self.next_image();
            }
            Command::PreviousImage => {
                self.previous_image();
            }
            Command::SubmitAll => match self.session.selected() {
                Some(entry) if entry.mask.is_some() => {
                    self.submit_all();
                }
                Some(_) => self.notifications.warn("No mask", SessionError::NoMask.to_string()),
                None => self.notifications.warn("No images", SessionError::NoImages.to_string()),
            },
            Command::SelectTool(tool) => self.set_tool(tool),
            Command::ClearMask => self.clear_mask(),
            Command::ApplyMaskToAll => self.apply_mask_to_all(),
            Command::ShrinkBrush => self.shrink_brush(),
            Command::GrowBrush => self.grow_brush(),
            Command::Undo => {
                self.undo();
            }
            Command::Redo => {
                self.redo();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{cell::Cell, rc::Rc};

    use futures::FutureExt;
    use image::{Rgba, RgbaImage};

    use super::*;
    use crate::{
        BoxFuture, MaskRef,
        gateway::{GatewayError, ProcessRequest},
        image_utils::inline_loader,
        keyboard::Key,
        notify::Level,
        storage::{MASKS_KEY, in_memory::InMemoryStore},
    };

    struct Echo;

    impl ProcessingGateway for Echo {
        fn process(
            &self,
            request: ProcessRequest,
        ) -> BoxFuture<'static, Result<String, GatewayError>> {
            futures::future::ready(Ok(format!("processed:{}", request.image_url.len()))).boxed()
        }
    }

    fn png(width: u32, height: u32) -> Vec<u8> {
        let mut bytes = Vec::new();
        RgbaImage::from_pixel(width, height, Rgba([10, 20, 30, 255]))
            .write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();
        bytes
    }

    fn editor(store: &InMemoryStore) -> Editor {
        Editor::new(Box::new(store.clone()), Box::new(Echo), inline_loader())
            .with_clock(Box::new(|| 1_000))
    }

    fn loaded(store: &InMemoryStore, n: usize) -> Editor {
        let mut editor = editor(store);
        editor.add_images((0..n).map(|i| {
            SourceFile::new(format!("{i}.png"), "image/png", png(16 + i as u32, 16))
        }));
        editor.poll();
        editor
    }

    fn paint(editor: &mut Editor, at: [f32; 2]) {
        assert!(editor.begin_stroke(at));
        editor.continue_stroke([at[0] + 2.0, at[1]]);
        assert!(editor.end_stroke());
    }

    #[test]
    fn stroke_sets_mask_and_autosaves() {
        let store = InMemoryStore::new();
        let mut editor = loaded(&store, 2);
        editor.set_brush(5);
        paint(&mut editor, [8.0, 8.0]);

        let mask = editor.session().entries()[0].mask.clone().unwrap();
        assert_eq!(mask.decode().unwrap().dimensions(), (16, 16));
        let stored = store.load().unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].file_name, "0.png");
        assert_eq!(stored[0].timestamp, 1_000);
        assert_eq!(editor.last_saved(), Some(1_000));
    }

    #[test]
    fn undo_and_redo_restore_masks() {
        let store = InMemoryStore::new();
        let mut editor = loaded(&store, 1);
        paint(&mut editor, [4.0, 4.0]);
        assert_eq!(editor.session().masked_count(), 1);

        assert!(editor.handle_key(KeyPress {
            modifiers: keyboard::Modifiers {
                command: true,
                shift: false
            },
            ..KeyPress::new(Key::Z)
        }));
        assert_eq!(editor.session().masked_count(), 0);
        assert!(store.load().unwrap().is_empty());
        assert!(editor.redo());
        assert_eq!(editor.session().masked_count(), 1);
        assert!(!editor.redo());
    }

    #[test]
    fn first_upload_restores_autosave() {
        let store = InMemoryStore::new();
        let mut first = loaded(&store, 2);
        paint(&mut first, [4.0, 4.0]);
        drop(first);

        let mut second = editor(&store);
        second.add_images([SourceFile::new("0.png", "image/png", png(16, 16))]);
        assert_eq!(second.session().masked_count(), 1);
        let titles: Vec<_> = second.notifications().drain().map(|n| n.title).collect();
        assert_eq!(titles, ["Images added", "Progress restored"]);
        assert!(!second.history().can_undo());
    }

    #[test]
    fn broken_autosave_is_ignored() {
        let store = InMemoryStore::new();
        store.set_raw(MASKS_KEY, "{{ nope");
        let editor = loaded(&store, 1);
        assert_eq!(editor.session().masked_count(), 0);
    }

    #[test]
    fn clear_all_masks_purges_store() {
        let store = InMemoryStore::new();
        let mut editor = loaded(&store, 2);
        paint(&mut editor, [4.0, 4.0]);
        editor.apply_mask_to_all();
        assert_eq!(store.load().unwrap().len(), 2);
        editor.clear_all_masks();
        assert_eq!(editor.session().masked_count(), 0);
        assert_eq!(store.raw(MASKS_KEY), None);
        let overlay = editor.canvas().surface().unwrap().overlay().binarize();
        assert_eq!(crate::mask::foreground_count(&overlay), 0);
    }

    #[test]
    fn broken_image_is_reported() {
        let store = InMemoryStore::new();
        let mut editor = editor(&store);
        editor.add_images([SourceFile::new("broken.png", "image/png", vec![1, 2, 3])]);
        editor.notifications().drain().for_each(drop);
        assert!(editor.poll());
        let last = editor.notifications().last().cloned().unwrap();
        assert_eq!(last.level, Level::Error);
        assert!(last.body.starts_with("broken.png"));
        assert!(!editor.begin_stroke([0.0, 0.0]));
    }

    #[test]
    fn switching_images_shows_their_mask() {
        let store = InMemoryStore::new();
        let mut editor = loaded(&store, 2);
        paint(&mut editor, [4.0, 4.0]);
        let mask: MaskRef = editor.session().entries()[0].mask.clone().unwrap();

        assert!(editor.handle_key(KeyPress::new(Key::ArrowRight)));
        editor.poll();
        assert_eq!(editor.canvas().surface().unwrap().index(), 1);
        assert_eq!(editor.canvas().surface().unwrap().shown_mask(), None);

        editor.previous_image();
        editor.poll();
        assert_eq!(editor.canvas().surface().unwrap().shown_mask(), Some(&mask));
        assert!(!editor.previous_image());
    }

    #[test]
    fn reset_during_stroke_keeps_mask_cleared() {
        let store = InMemoryStore::new();
        let mut editor = loaded(&store, 1);
        editor.set_brush(5);
        paint(&mut editor, [5.0, 5.0]);
        assert!(editor.begin_stroke([12.0, 10.0]));

        assert!(editor.handle_key(KeyPress::new(Key::R)));
        assert!(!editor.is_drawing());
        assert!(!editor.end_stroke());
        assert_eq!(editor.session().masked_count(), 0);
        let overlay = editor.canvas().surface().unwrap().overlay().binarize();
        assert_eq!(crate::mask::foreground_count(&overlay), 0);
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn clearing_all_masks_during_stroke_drops_the_stroke() {
        let store = InMemoryStore::new();
        let mut editor = loaded(&store, 2);
        paint(&mut editor, [5.0, 5.0]);
        assert!(editor.begin_stroke([12.0, 10.0]));

        editor.clear_all_masks();
        assert!(!editor.end_stroke());
        assert_eq!(editor.session().masked_count(), 0);
        let overlay = editor.canvas().surface().unwrap().overlay().binarize();
        assert_eq!(crate::mask::foreground_count(&overlay), 0);
    }

    #[test]
    fn space_without_mask_warns() {
        let store = InMemoryStore::new();
        let mut editor = loaded(&store, 1);
        editor.notifications().drain().for_each(drop);
        assert!(editor.handle_key(KeyPress::new(Key::Space)));
        assert_eq!(editor.notifications().last().map(|n| n.level), Some(Level::Warning));
        assert!(editor.processing().is_none());
    }

    #[test]
    fn submit_one_processes_only_that_entry() {
        let store = InMemoryStore::new();
        let mut editor = loaded(&store, 2);
        paint(&mut editor, [4.0, 4.0]);
        editor.apply_mask_to_all();
        assert!(editor.submit_one(1));
        let states: Vec<_> = editor
            .session()
            .entries()
            .iter()
            .map(|e| e.state.result().is_some())
            .collect();
        assert_eq!(states, [false, true]);
        assert!(editor.processing().is_none());
    }

    #[test]
    fn clock_is_used_for_exports() {
        let store = InMemoryStore::new();
        let now = Rc::new(Cell::new(5));
        let clock = now.clone();
        let mut editor = editor(&store).with_clock(Box::new(move || clock.get()));
        now.set(1_700_000_000_000);
        let export = editor.export_project().unwrap();
        assert_eq!(export.file_name, "image-eraser-project-1700000000000.json");
    }
}
