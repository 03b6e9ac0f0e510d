use std::{cell::RefCell, collections::VecDeque, rc::Rc};

use futures::FutureExt;
use image::{Rgba, RgbaImage};
use mask_painter::{
    BoxFuture, Editor, GatewayError, InMemoryStore, Level, ProcessRequest, ProcessingGateway,
    ProcessingState, SourceFile, inline_loader,
    keyboard::{Key, KeyPress},
    map_to_image,
    storage::MaskStore,
};

const HOUR: i64 = 3_600_000;

#[derive(Clone, Default)]
struct ScriptedGateway {
    answers: Rc<RefCell<VecDeque<Result<String, GatewayError>>>>,
    requests: Rc<RefCell<Vec<ProcessRequest>>>,
}

impl ScriptedGateway {
    fn answering(answers: impl IntoIterator<Item = Result<String, GatewayError>>) -> Self {
        let gateway = Self::default();
        gateway.answers.borrow_mut().extend(answers);
        gateway
    }
}

impl ProcessingGateway for ScriptedGateway {
    fn process(&self, request: ProcessRequest) -> BoxFuture<'static, Result<String, GatewayError>> {
        self.requests.borrow_mut().push(request);
        let answer = self
            .answers
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| Err(GatewayError::Transport("no answer scripted".into())));
        futures::future::ready(answer).boxed()
    }
}

fn png(width: u32, height: u32, shade: u8) -> Vec<u8> {
    let mut bytes = Vec::new();
    RgbaImage::from_pixel(width, height, Rgba([shade, 250, 250, 255]))
        .write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Png)
        .unwrap();
    bytes
}

fn files(n: usize) -> Vec<SourceFile> {
    (0..n)
        .map(|i| SourceFile::new(format!("photo-{i}.png"), "image/png", png(40, 30, i as u8)))
        .collect()
}

fn editor_at(store: &InMemoryStore, gateway: &ScriptedGateway, now: i64) -> Editor {
    Editor::new(Box::new(store.clone()), Box::new(gateway.clone()), inline_loader())
        .with_clock(Box::new(move || now))
}

fn with_images(n: usize) -> (Editor, InMemoryStore, ScriptedGateway) {
    let store = InMemoryStore::new();
    let gateway = ScriptedGateway::default();
    let mut editor = editor_at(&store, &gateway, 0);
    editor.add_images(files(n));
    editor.poll();
    (editor, store, gateway)
}

fn paint_selected(editor: &mut Editor) {
    assert!(editor.begin_stroke([10.0, 10.0]));
    editor.continue_stroke([20.0, 12.0]);
    assert!(editor.end_stroke());
}

#[test]
fn apply_to_all_shortcut_copies_first_mask() {
    let (mut editor, _, _) = with_images(3);
    paint_selected(&mut editor);
    assert!(editor.handle_key(KeyPress::new(Key::C)));

    let session = editor.session();
    assert_eq!(session.masked_count(), 3);
    let first = session.entries()[0].mask.clone().unwrap();
    assert!(
        session
            .entries()
            .iter()
            .all(|e| e.mask.as_ref().is_some_and(|m| m.shares_bytes_with(&first)))
    );
}

#[test]
fn apply_to_all_without_mask_warns_and_keeps_state() {
    let (mut editor, _, _) = with_images(3);
    editor.select_image(1);
    editor.poll();
    paint_selected(&mut editor);
    editor.select_image(0);
    let before = editor.session().masks();
    editor.notifications().drain().for_each(drop);

    editor.handle_key(KeyPress::new(Key::C));
    assert_eq!(editor.session().masks(), before);
    assert_eq!(editor.notifications().last().map(|n| n.level), Some(Level::Warning));
}

#[test]
fn import_without_masks_field_changes_nothing() {
    let (mut editor, _, _) = with_images(2);
    paint_selected(&mut editor);
    let before = editor.session().masks();
    editor.notifications().drain().for_each(drop);

    assert!(editor.import_project(r#"{"version": "1.0", "timestamp": 5}"#).is_none());
    assert_eq!(editor.session().masks(), before);
    let notification = editor.notifications().last().cloned().unwrap();
    assert_eq!(notification.level, Level::Error);
    assert!(notification.body.contains("invalid project file"));
}

#[test]
fn failed_request_does_not_stop_the_batch() {
    let store = InMemoryStore::new();
    let gateway = ScriptedGateway::answering([
        Err(GatewayError::Rejected("FAL_KEY not configured".into())),
        Ok("https://cdn.example/out-1.png".into()),
    ]);
    let mut editor = editor_at(&store, &gateway, 0);
    editor.add_images(files(2));
    editor.poll();
    paint_selected(&mut editor);
    editor.apply_mask_to_all();

    assert!(editor.submit_all());
    while editor.processing().is_some() {
        editor.poll();
    }

    let entries = editor.session().entries();
    assert_eq!(
        entries[0].state,
        ProcessingState::Failed {
            message: "FAL_KEY not configured".into()
        }
    );
    assert_eq!(entries[1].state.result(), Some("https://cdn.example/out-1.png"));
    let requests = gateway.requests.borrow();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].image_url, entries[0].preview.as_str());
    assert!(requests[1].mask_url.is_some());
    let summary = editor.notifications().last().cloned().unwrap();
    assert_eq!(summary.body, "1 processed, 1 failed");
}

#[test]
fn processed_entries_are_not_sent_again() {
    let store = InMemoryStore::new();
    let gateway = ScriptedGateway::answering([Ok("a".into()), Ok("b".into())]);
    let mut editor = editor_at(&store, &gateway, 0);
    editor.add_images(files(1));
    editor.poll();
    paint_selected(&mut editor);

    assert!(editor.handle_key(KeyPress::new(Key::Space)));
    assert!(!editor.submit_all());
    assert_eq!(gateway.requests.borrow().len(), 1);
}

#[test]
fn brush_radius_stays_clamped() {
    let (mut editor, _, _) = with_images(1);
    editor.set_brush(5);
    for _ in 0..5 {
        assert!(editor.handle_key(KeyPress::new(Key::OpenBracket)));
    }
    assert_eq!(editor.session().brush().get(), 5);
    for _ in 0..30 {
        editor.handle_key(KeyPress::new(Key::CloseBracket));
    }
    assert_eq!(editor.session().brush().get(), 100);
}

#[test]
fn keys_are_ignored_while_typing() {
    let (mut editor, _, _) = with_images(2);
    let press = KeyPress {
        in_text_input: true,
        ..KeyPress::new(Key::ArrowRight)
    };
    assert!(!editor.handle_key(press));
    assert_eq!(editor.session().selected_index(), Some(0));
}

#[test]
fn autosave_roundtrip_respects_expiry() {
    let store = InMemoryStore::new();
    let gateway = ScriptedGateway::default();
    {
        let mut editor = editor_at(&store, &gateway, 0);
        editor.add_images(files(3));
        editor.poll();
        paint_selected(&mut editor);
        editor.select_image(2);
        editor.poll();
        paint_selected(&mut editor);
        assert_eq!(store.load().unwrap().len(), 2);
    }

    let mut reloaded = editor_at(&store, &gateway, 23 * HOUR);
    reloaded.add_images(files(3));
    let masked: Vec<_> = reloaded.session().entries().iter().map(|e| e.mask.is_some()).collect();
    assert_eq!(masked, [true, false, true]);

    let mut stale = editor_at(&store, &gateway, 25 * HOUR);
    stale.add_images(files(3));
    assert_eq!(stale.session().masked_count(), 0);
    assert!(store.load().unwrap().is_empty());
}

#[test]
fn renamed_or_resized_files_do_not_restore() {
    let (mut editor, store, gateway) = with_images(1);
    paint_selected(&mut editor);

    let mut grown = png(40, 30, 0);
    grown.push(0);
    let mut other = editor_at(&store, &gateway, 0);
    other.add_images([SourceFile::new("photo-0.png", "image/png", grown)]);
    assert_eq!(other.session().masked_count(), 0);
}

#[test]
fn export_then_import_restores_masked_count() {
    let (mut editor, _, _) = with_images(3);
    paint_selected(&mut editor);
    editor.next_image();
    editor.poll();
    paint_selected(&mut editor);
    let export = editor.export_project().unwrap();

    let mut fresh = editor_at(&InMemoryStore::new(), &ScriptedGateway::default(), 0);
    fresh.add_images(files(3));
    let report = fresh.import_project(&export.json).unwrap();
    assert_eq!((report.matched, report.total), (2, 2));
    assert_eq!(fresh.session().masked_count(), editor.session().masked_count());
    assert!(fresh.history().can_undo());
}

#[test]
fn scaled_display_still_paints_native_mask() {
    let (mut editor, _, _) = with_images(1);
    editor.set_brush(5);
    // Canvas shown at half size
    let at = map_to_image([10.0, 7.5], [20.0, 15.0], (40, 30)).unwrap();
    assert!(editor.begin_stroke(at));
    assert!(editor.end_stroke());

    let mask = editor.session().entries()[0].mask.as_ref().unwrap().decode().unwrap();
    assert_eq!(mask.dimensions(), (40, 30));
    assert!(mask.pixels().all(|p| p.0[0] == 0 || p.0[0] == 255));
    assert_eq!(mask.get_pixel(20, 15).0[0], 255);
    assert_eq!(mask.get_pixel(0, 0).0[0], 0);
}

#[test]
fn eraser_stroke_removes_painted_area() {
    let (mut editor, _, _) = with_images(1);
    editor.set_brush(10);
    paint_selected(&mut editor);
    assert!(editor.handle_key(KeyPress::new(Key::E)));
    paint_selected(&mut editor);

    let mask = editor.session().entries()[0].mask.as_ref().unwrap().decode().unwrap();
    assert_eq!(mask.get_pixel(15, 11).0[0], 0);
    assert_eq!(editor.session().entries()[0].state, ProcessingState::Idle);
}
