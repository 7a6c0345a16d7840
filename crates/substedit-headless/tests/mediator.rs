use std::cell::RefCell;
use std::rc::Rc;

use insta::assert_snapshot;
use substedit_core::{
    ClipboardService, DescriptorProvider, Dispatch, EditConfig, EditEvent, EditListener, FieldMap,
    Key, LogicalData, Modifiers, MouseButtons, Selection, SubstEdit, SubstError, TextSurface,
};
use substedit_headless::{HeadlessEdit, HeadlessSurface, MemoryClipboard, headless_edit, telemetry};

fn map() -> FieldMap<u16> {
    FieldMap::from_terminated(&[(1, "<Year>"), (2, "<Month>")]).unwrap()
}

#[derive(Debug, Default)]
struct Log {
    content: usize,
    selection: usize,
    modified: Vec<bool>,
}

struct Recorder(Rc<RefCell<Log>>);

impl EditListener for Recorder {
    fn content_changed(&mut self) {
        self.0.borrow_mut().content += 1;
    }

    fn selection_changed(&mut self, _selection: Selection) {
        self.0.borrow_mut().selection += 1;
    }

    fn modified_changed(&mut self, modified: bool) {
        self.0.borrow_mut().modified.push(modified);
    }
}

fn listen(edit: &mut HeadlessEdit<u16>) -> Rc<RefCell<Log>> {
    let log = Rc::new(RefCell::new(Log::default()));
    edit.set_listener(Box::new(Recorder(log.clone())));
    log
}

/// Editor holding `text` (parsed as plain text), caret at `caret`.
fn editor(text: &str, caret: usize) -> (HeadlessEdit<u16>, Rc<RefCell<Log>>) {
    telemetry::init();
    let mut edit = headless_edit(map());
    edit.assign_plain_text(text).unwrap();
    edit.set_selection(Selection::caret(caret));
    edit.set_modified(false);
    let log = listen(&mut edit);
    (edit, log)
}

fn key(key: Key) -> EditEvent {
    EditEvent::KeyDown {
        key,
        modifiers: Modifiers::NONE,
    }
}

fn state(edit: &HeadlessEdit<u16>) -> String {
    assert_eq!(edit.surface().raw_text(), edit.data().text());
    edit.data().check_consistency().unwrap();
    let fields: Vec<String> = edit
        .data()
        .fields()
        .iter()
        .map(|f| format!("{}@{}..{}", f.id(), f.start(), f.end()))
        .collect();
    let sel = edit.selection();
    format!(
        "{:?} [{}] sel={}..{}",
        edit.data().text(),
        fields.join(", "),
        sel.start,
        sel.end
    )
}

#[test]
fn test_paste_field_at_document_end() {
    let (mut edit, log) = editor("Born in ", 8);
    edit.clipboard_mut().set_text("<Year>");

    assert_eq!(edit.handle(EditEvent::Paste).unwrap(), Dispatch::Handled);
    assert_snapshot!(state(&edit), @r#""Born in <Year>" [1@8..14] sel=14..14"#);
    assert_eq!(edit.data().logical().markers()[0].pos(), 8);
    assert_eq!(log.borrow().content, 1);
    assert!(edit.is_modified());
}

#[test]
fn test_replayed_delete_notifies_once() {
    let (mut edit, log) = editor("<Year>!", 0);

    edit.handle(key(Key::Delete)).unwrap();
    assert_snapshot!(state(&edit), @r#""!" [] sel=0..0"#);
    assert_eq!(log.borrow().content, 1);
    assert_eq!(log.borrow().modified, vec![true]);
    assert_eq!(edit.surface().undo_depth(), 0);
}

#[test]
fn test_backspace_removes_whole_field() {
    let (mut edit, log) = editor("a<Year>b", 7);

    edit.handle(EditEvent::Char('\u{8}')).unwrap();
    assert_snapshot!(state(&edit), @r#""ab" [] sel=1..1"#);
    assert_eq!(log.borrow().content, 1);
}

#[test]
fn test_delete_selection_ending_in_field_removes_whole_field() {
    let (mut edit, log) = editor("ab<Year>cd", 0);
    edit.surface_mut().set_selection(Selection::new(4, 9));

    edit.handle(key(Key::Delete)).unwrap();
    assert_snapshot!(state(&edit), @r#""abd" [] sel=2..2"#);
    assert_eq!(log.borrow().content, 1);
    assert_eq!(edit.surface().undo_depth(), 0);
}

#[test]
fn test_backspace_at_start_changes_nothing() {
    let (mut edit, log) = editor("ab", 0);

    edit.handle(EditEvent::Char('\u{8}')).unwrap();
    assert_snapshot!(state(&edit), @r#""ab" [] sel=0..0"#);
    assert_eq!(log.borrow().content, 0);
    assert!(!edit.is_modified());
}

#[test]
fn test_line_break_deleted_as_unit() {
    let (mut edit, _) = editor("ab\r\ncd", 2);
    edit.handle(key(Key::Delete)).unwrap();
    assert_snapshot!(state(&edit), @r#""abcd" [] sel=2..2"#);

    let (mut edit, _) = editor("ab\r\ncd", 4);
    edit.handle(EditEvent::Char('\u{8}')).unwrap();
    assert_snapshot!(state(&edit), @r#""abcd" [] sel=2..2"#);
}

#[test]
fn test_delete_at_end_is_forwarded() {
    let (mut edit, log) = editor("a<Year>", 7);
    edit.handle(key(Key::Delete)).unwrap();
    assert_snapshot!(state(&edit), @r#""a<Year>" [1@1..7] sel=7..7"#);
    assert_eq!(log.borrow().content, 0);
}

#[test]
fn test_arrows_step_over_fields() {
    let (mut edit, log) = editor("a<Year>b", 1);

    edit.handle(key(Key::ArrowRight)).unwrap();
    assert_eq!(edit.selection(), Selection::caret(7));
    edit.handle(key(Key::ArrowLeft)).unwrap();
    assert_eq!(edit.selection(), Selection::caret(1));

    edit.handle(EditEvent::KeyDown {
        key: Key::ArrowRight,
        modifiers: Modifiers::SHIFT,
    })
    .unwrap();
    assert_eq!(edit.selection(), Selection::new(1, 7));

    assert_eq!(log.borrow().content, 0);
    assert_eq!(log.borrow().selection, 3);
}

#[test]
fn test_replayed_arrows_move_one_unit() {
    let (mut edit, _) = editor("a<Year>b", 0);
    edit.handle(EditEvent::KeyDown {
        key: Key::ArrowRight,
        modifiers: Modifiers::CTRL,
    })
    .unwrap();
    assert_eq!(edit.selection(), Selection::caret(1));
}

#[test]
fn test_vertical_move_out_of_field() {
    let (mut edit, _) = editor("abcdefgh\r\nx<Year>y", 4);
    edit.handle(key(Key::ArrowDown)).unwrap();
    assert_eq!(edit.selection(), Selection::caret(17));

    let (mut edit, _) = editor("x<Year>y\r\nabcdefgh", 14);
    edit.handle(key(Key::ArrowUp)).unwrap();
    assert_eq!(edit.selection(), Selection::caret(1));
}

#[test]
fn test_page_keys_move_out_of_field() {
    let (mut edit, log) = editor("abc\r\n<Year>", 3);
    assert_eq!(edit.handle(key(Key::PageDown)).unwrap(), Dispatch::Handled);
    assert_eq!(edit.selection(), Selection::caret(11));

    edit.handle(EditEvent::Char('x')).unwrap();
    assert_snapshot!(state(&edit), @r#""abc\r\n<Year>x" [1@5..11] sel=12..12"#);
    assert_eq!(log.borrow().content, 1);

    let (mut edit, _) = editor("<Year>\r\nabcdef", 11);
    assert_eq!(edit.handle(key(Key::PageUp)).unwrap(), Dispatch::Handled);
    assert_eq!(edit.selection(), Selection::caret(0));
}

#[test]
fn test_typing_between_fields() {
    let (mut edit, log) = editor("<Year><Month>", 6);

    edit.handle(EditEvent::Char('x')).unwrap();
    assert_snapshot!(state(&edit), @r#""<Year>x<Month>" [1@0..6, 2@7..14] sel=7..7"#);
    assert_eq!(edit.plain_text().unwrap(), "<Year>x<Month>");
    assert_eq!(edit.data().logical().text(), "x");
    assert_eq!(log.borrow().content, 1);
}

#[test]
fn test_enter_and_tab() {
    let (mut edit, _) = editor("ab", 1);
    edit.handle(EditEvent::Char('\r')).unwrap();
    assert_snapshot!(state(&edit), @r#""a\r\nb" [] sel=3..3"#);
    edit.handle(EditEvent::Char('\t')).unwrap();
    assert_snapshot!(state(&edit), @r#""a\r\n\tb" [] sel=4..4"#);
}

#[test]
fn test_typing_replaces_selection() {
    let (mut edit, log) = editor("a<Year>b", 0);
    edit.set_selection(Selection::new(0, 7));

    edit.handle(EditEvent::Char('z')).unwrap();
    assert_snapshot!(state(&edit), @r#""zb" [] sel=1..1"#);
    assert_eq!(log.borrow().content, 1);
}

#[test]
fn test_control_char_over_selection() {
    let (mut edit, _) = editor("a<Year>b", 0);
    edit.set_selection(Selection::new(1, 7));

    edit.handle(EditEvent::Char('\u{1b}')).unwrap();
    assert_snapshot!(state(&edit), @r#""a<Year>b" [1@1..7] sel=1..7"#);

    edit.handle(EditEvent::Char('\t')).unwrap();
    assert_snapshot!(state(&edit), @r#""a\tb" [] sel=2..2"#);
}

#[test]
fn test_select_all_then_type() {
    let (mut edit, _) = editor("a<Year>", 0);

    edit.handle(EditEvent::Char('\u{1}')).unwrap();
    assert_eq!(edit.selection(), Selection::new(0, 7));
    edit.handle(EditEvent::Char('q')).unwrap();
    assert_snapshot!(state(&edit), @r#""q" [] sel=1..1"#);
}

#[test]
fn test_click_snaps_to_closer_edge() {
    let (mut edit, _) = editor("a<Year>b", 0);
    let click = |column| EditEvent::MouseDown {
        point: HeadlessSurface::point_at(0, column),
        buttons: MouseButtons::LEFT,
    };

    edit.handle(click(5)).unwrap();
    assert_eq!(edit.selection(), Selection::caret(7));
    // Ties go to the start.
    edit.handle(click(4)).unwrap();
    assert_eq!(edit.selection(), Selection::caret(1));
    edit.handle(click(8)).unwrap();
    assert_eq!(edit.selection(), Selection::caret(8));
}

#[test]
fn test_click_outside_text_is_swallowed() {
    let (mut edit, _) = editor("a<Year>b", 8);
    let result = edit.handle(EditEvent::MouseDown {
        point: HeadlessSurface::point_at(6, 0),
        buttons: MouseButtons::LEFT,
    });
    assert_eq!(result.unwrap(), Dispatch::Handled);
    assert_eq!(edit.selection(), Selection::caret(8));
}

#[test]
fn test_drag_snaps_selection_end() {
    let (mut edit, _) = editor("a<Year>b", 0);

    edit.handle(EditEvent::MouseDown {
        point: HeadlessSurface::point_at(0, 0),
        buttons: MouseButtons::LEFT,
    })
    .unwrap();
    edit.handle(EditEvent::MouseMove {
        point: HeadlessSurface::point_at(0, 5),
        buttons: MouseButtons::LEFT,
    })
    .unwrap();
    assert_eq!(edit.selection(), Selection::new(0, 7));

    let hover = edit.handle(EditEvent::MouseMove {
        point: HeadlessSurface::point_at(0, 3),
        buttons: MouseButtons::NONE,
    });
    assert_eq!(hover.unwrap(), Dispatch::Forwarded);
    assert_eq!(edit.selection(), Selection::new(0, 7));
}

#[test]
fn test_double_click_is_swallowed() {
    let (mut edit, _) = editor("a<Year>b", 1);
    let result = edit.handle(EditEvent::DoubleClick {
        point: HeadlessSurface::point_at(0, 3),
    });
    assert_eq!(result.unwrap(), Dispatch::Handled);
    assert_eq!(edit.selection(), Selection::caret(1));
}

#[test]
fn test_cut_then_paste_restores_content() {
    let (mut edit, log) = editor("x <Year> & y", 0);
    assert!(!edit.can_copy());
    edit.set_selection(Selection::new(2, 10));
    assert!(edit.can_cut());

    edit.copy().unwrap();
    assert_eq!(edit.clipboard().text().as_deref(), Some("<Year> &amp;"));
    assert_eq!(edit.clipboard().locale_text(), None);
    assert_eq!(log.borrow().content, 0);

    edit.cut().unwrap();
    assert_snapshot!(state(&edit), @r#""x  y" [] sel=2..2"#);
    assert_eq!(log.borrow().content, 1);
    assert!(edit.can_paste());

    edit.paste().unwrap();
    assert_snapshot!(state(&edit), @r#""x <Year> & y" [1@2..8] sel=10..10"#);
    assert_eq!(edit.plain_text().unwrap(), "x <Year> &amp; y");
    assert_eq!(log.borrow().content, 2);
}

#[test]
fn test_copy_without_selection_leaves_clipboard() {
    let (mut edit, _) = editor("a<Year>b", 1);
    edit.handle(EditEvent::Char('\u{3}')).unwrap();
    assert!(!edit.can_paste());
}

#[test]
fn test_copy_with_locale_text() {
    let config = EditConfig {
        copy_locale_text: true,
        locale: 1033,
        ..EditConfig::default()
    };
    let mut edit = SubstEdit::new(HeadlessSurface::new(), MemoryClipboard::new(), map(), config);
    edit.assign_plain_text("<Month>!").unwrap();
    edit.set_selection(Selection::new(0, 8));

    edit.handle(EditEvent::Char('\u{3}')).unwrap();
    assert_eq!(edit.clipboard().locale_text(), Some(("<Month>!", 1033)));
}

#[test]
fn test_rejected_clipboard_keeps_selection_on_cut() {
    struct Rejecting;

    impl ClipboardService for Rejecting {
        fn set_text(&mut self, _text: &str) -> bool {
            false
        }

        fn text(&self) -> Option<String> {
            None
        }

        fn unicode_text(&self) -> Option<String> {
            None
        }

        fn set_locale_text(&mut self, _text: &str, _locale: u32) -> bool {
            false
        }

        fn text_len(&self) -> Option<usize> {
            None
        }
    }

    telemetry::init();
    let mut edit = SubstEdit::new(HeadlessSurface::new(), Rejecting, map(), EditConfig::default());
    edit.assign_plain_text("x <Year> y").unwrap();
    edit.set_selection(Selection::new(2, 8));
    edit.set_modified(false);

    assert_eq!(edit.handle(EditEvent::Cut).unwrap(), Dispatch::Handled);
    assert_eq!(edit.data().text(), "x <Year> y");
    assert_eq!(edit.surface().raw_text(), "x <Year> y");
    assert_eq!(edit.selection(), Selection::new(2, 8));
    assert!(!edit.is_modified());
    assert!(!edit.can_paste());
}

#[test]
fn test_paste_wide_text_over_selection() {
    let (mut edit, log) = editor("abc", 0);
    edit.set_selection(Selection::new(1, 2));
    edit.clipboard_mut().set_unicode_only("<Month>");

    edit.handle(EditEvent::Char('\u{16}')).unwrap();
    assert_snapshot!(state(&edit), @r#""a<Month>c" [2@1..8] sel=8..8"#);
    assert_eq!(log.borrow().content, 1);
}

#[test]
fn test_paste_empty_clipboard() {
    let (mut edit, log) = editor("abc", 1);
    edit.paste().unwrap();
    assert_snapshot!(state(&edit), @r#""abc" [] sel=1..1"#);
    assert_eq!(log.borrow().content, 0);
}

#[test]
fn test_insert_field_at_caret() {
    let (mut edit, log) = editor("ab", 1);

    let field = edit.insert_field(2).unwrap();
    assert_eq!((field.start(), field.end()), (1, 8));
    assert_snapshot!(state(&edit), @r#""a<Month>b" [2@1..8] sel=8..8"#);
    assert_eq!(log.borrow().content, 1);
    assert_eq!(log.borrow().modified, vec![true]);

    edit.set_modified(false);
    assert_eq!(log.borrow().modified, vec![true, false]);
}

#[test]
fn test_insert_unknown_field() {
    let (mut edit, log) = editor("ab", 1);
    assert!(matches!(
        edit.insert_field(9),
        Err(SubstError::UnknownField { id: 9 })
    ));
    assert_snapshot!(state(&edit), @r#""ab" [] sel=1..1"#);
    assert_eq!(log.borrow().content, 0);
}

#[test]
fn test_set_selection_snaps_out_of_fields() {
    let (mut edit, log) = editor("a<Year>b", 0);
    edit.set_selection(Selection::new(2, 6));
    assert_eq!(edit.selection(), Selection::new(1, 7));
    assert_eq!(log.borrow().selection, 1);

    edit.set_selection(Selection::new(1, 7));
    assert_eq!(log.borrow().selection, 1);
    assert_eq!(log.borrow().content, 0);
}

#[test]
fn test_hook_lock_forwards_unchanged() {
    let (mut edit, _) = editor("a<Year>b", 1);

    edit.lock_hook();
    assert!(edit.is_hook_locked());
    let result = edit.handle(key(Key::ArrowRight));
    assert_eq!(result.unwrap(), Dispatch::Forwarded);
    assert_eq!(edit.selection(), Selection::caret(2));

    edit.unlock_hook();
    assert!(!edit.is_hook_locked());
}

#[test]
fn test_other_keys_are_forwarded() {
    let (mut edit, _) = editor("ab", 1);
    assert_eq!(edit.handle(key(Key::Escape)).unwrap(), Dispatch::Forwarded);
    assert_eq!(edit.selection(), Selection::caret(1));
}

#[test]
fn test_replay_limit() {
    let config = EditConfig {
        replay_limit: 2,
        ..EditConfig::default()
    };
    let mut edit = SubstEdit::new(HeadlessSurface::new(), MemoryClipboard::new(), map(), config);
    edit.assign_plain_text("<Year>").unwrap();

    let result = edit.handle(key(Key::Delete));
    assert!(matches!(
        result,
        Err(SubstError::ReplayDiverged { limit: 2, .. })
    ));
    assert_eq!(edit.data().text(), "<Year>");
    assert_eq!(edit.surface().raw_text(), "<Year>");
}

#[test]
fn test_attach_through_provider() {
    struct Host;
    impl DescriptorProvider<u16> for Host {
        fn field_map(&self) -> FieldMap<u16> {
            map()
        }
    }

    let mut edit = SubstEdit::attach(
        HeadlessSurface::with_text("stale"),
        MemoryClipboard::new(),
        &Host,
        EditConfig::default(),
    );
    assert_eq!(edit.surface().raw_text(), "");
    assert!(!edit.is_modified());

    edit.assign_plain_text("<Year>-<Month>").unwrap();
    assert_eq!(edit.data().fields().len(), 2);
    assert!(edit.is_modified());

    edit.delete_contents();
    assert_eq!(edit.surface().raw_text(), "");
    assert_eq!(edit.line_col_to_char(0, 0), Some(0));
}

#[test]
fn test_editing_session_stays_consistent() {
    let (mut edit, log) = editor("Dear <Month>,\r\n<Year>", 5);

    edit.handle(EditEvent::Char('X')).unwrap();
    edit.handle(key(Key::End)).unwrap();
    edit.handle(key(Key::ArrowDown)).unwrap();
    edit.handle(key(Key::Delete)).unwrap();
    edit.insert_field(1).unwrap();
    edit.handle(EditEvent::Char('!')).unwrap();
    edit.handle(key(Key::Home)).unwrap();
    edit.handle(EditEvent::Char('\u{8}')).unwrap();

    assert_snapshot!(state(&edit), @r#""Dear X<Month>,<Year><Year>!" [2@6..13, 1@14..20, 1@20..26] sel=14..14"#);
    assert_eq!(log.borrow().content, 4);
}

#[test]
fn test_open_saved_document() {
    let mut saved = headless_edit(map());
    saved.assign_plain_text("Due <Month> <Year>").unwrap();
    let bytes = saved.data().logical().to_bytes().unwrap();

    let logical = LogicalData::from_bytes(&bytes, map()).unwrap();
    let edit = SubstEdit::with_logical(
        HeadlessSurface::new(),
        MemoryClipboard::new(),
        &logical,
        EditConfig::default(),
    )
    .unwrap();
    assert_snapshot!(state(&edit), @r#""Due <Month> <Year>" [2@4..11, 1@12..18] sel=0..0"#);
    assert!(!edit.is_modified());
}
