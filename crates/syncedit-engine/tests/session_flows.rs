//! End-to-end sync-edit flows driven through `SyncEditor` with an in-memory
//! document, a scripted role provider and a recording sink.

use pretty_assertions::assert_eq;
use std::sync::Arc;
use syncedit_config::{keys, SettingsSection, SyncEditConfig};
use syncedit_engine::{EventOutcome, HostContext, InputEvent, Key, SessionState, SyncEditor};
use syncedit_foundation::{
    Document, EditOperation, GroupId, Notice, RecordingSink, Span, StyleRuns, TextBuffer,
};

struct Host {
    editor: SyncEditor,
    doc: Document,
    roles: StyleRuns,
    sink: RecordingSink,
}

impl Host {
    fn new(text: &str, language: Option<&str>, config: SyncEditConfig) -> Self {
        Self {
            editor: SyncEditor::new(Arc::new(config), language.map(str::to_string)),
            doc: Document::new(text),
            roles: StyleRuns::new(),
            sink: RecordingSink::new(),
        }
    }

    fn plain(text: &str) -> Self {
        Self::new(text, None, SyncEditConfig::default())
    }

    fn send(&mut self, event: InputEvent) -> EventOutcome {
        let mut host = HostContext::new(&mut self.doc, &self.roles, &mut self.sink);
        self.editor.handle(event, &mut host).unwrap()
    }

    fn key(&mut self, key: Key) -> EventOutcome {
        self.send(InputEvent::Key { key })
    }

    fn type_text(&mut self, text: &str) -> EventOutcome {
        self.key(Key::Text(text.to_string()))
    }

    fn select(&mut self, start: usize, end: usize) {
        self.send(InputEvent::SelectionMade { start, end });
    }

    fn activate_all(&mut self) {
        self.select(0, self.doc.text().len());
        self.send(InputEvent::Activate);
    }

    /// The host applying an edit on its own and reporting it.
    fn external(&mut self, edit: EditOperation) {
        self.doc.apply(&edit).unwrap();
        self.send(InputEvent::TextChanged { edit });
    }

    fn text(&self) -> &str {
        self.doc.text()
    }

    /// (text, member count) for every group in first-occurrence order.
    fn groups(&self) -> Vec<(String, usize)> {
        self.editor
            .session()
            .map(|session| {
                session
                    .groups()
                    .iter()
                    .map(|g| (g.text().to_string(), g.len()))
                    .collect()
            })
            .unwrap_or_default()
    }
}

fn group(text: &str, members: usize) -> (String, usize) {
    (text.to_string(), members)
}

#[test]
fn pattern_scan_groups_repeated_words() {
    let mut host = Host::plain("foo bar foo baz foo");
    host.activate_all();

    assert_eq!(
        host.groups(),
        vec![group("foo", 3), group("bar", 1), group("baz", 1)]
    );
    let editable: Vec<bool> = host.sink.groups.iter().map(|m| m.editable).collect();
    assert_eq!(editable, vec![true, false, false]);
}

#[test]
fn case_insensitive_grouping() {
    let config = SyncEditConfig::default().with_language(
        "Pascal",
        SettingsSection::new()
            .with(keys::CASE_SENSITIVE, "off")
            .with(keys::USE_SIMPLE_NAIVE_MODE, "on"),
    );
    let mut host = Host::new("Count := count + COUNT", Some("Pascal"), config);
    host.activate_all();
    assert_eq!(host.groups(), vec![group("count", 3)]);

    let mut exact = Host::plain("Count := count + COUNT");
    exact.activate_all();
    assert_eq!(exact.editor.state(), SessionState::Idle);
    assert_eq!(exact.sink.last_notice(), Some(&Notice::NoEditableIdentifiers));
}

#[test]
fn structural_exclude_beats_include() {
    let text = "self.len = self.len + len";
    let mut host = Host::new(text, Some("Rust"), SyncEditConfig::default());
    host.roles = StyleRuns::new()
        .with_run(0, 4, "Id keyword")
        .with_run(5, 8, "Id")
        .with_run(11, 15, "Id keyword")
        .with_run(16, 19, "Id")
        .with_run(22, 25, "Id");
    host.activate_all();

    assert_eq!(host.groups(), vec![group("len", 3)]);
}

#[test]
fn structural_scan_respects_block_bounds() {
    let text = "a = b; a = b;";
    let mut host = Host::new(text, Some("C"), SyncEditConfig::default());
    host.roles = StyleRuns::new()
        .with_run(0, 1, "Id")
        .with_run(4, 5, "Id")
        .with_run(7, 8, "Id")
        .with_run(11, 12, "Id");
    host.select(4, 13);
    host.send(InputEvent::Activate);

    assert_eq!(host.groups(), vec![group("b", 2), group("a", 1)]);
}

#[test]
fn rename_then_switch_groups() {
    let mut host = Host::plain("aa bb aa bb");
    host.activate_all();

    // caret at the end of the first "aa"
    assert_eq!(host.send(InputEvent::Click { offset: 2 }), EventOutcome::Handled);
    host.key(Key::Backspace);
    host.key(Key::Backspace);
    assert_eq!(host.text(), " bb  bb");
    host.type_text("xx");
    assert_eq!(host.text(), "xx bb xx bb");

    assert_eq!(host.send(InputEvent::Click { offset: 4 }), EventOutcome::Handled);
    assert_eq!(host.text(), "xx bb xx bb");
    assert_eq!(
        host.editor.state(),
        SessionState::Editing { group: GroupId(1) }
    );
    assert_eq!(host.groups(), vec![group("xx", 2), group("bb", 2)]);
    assert_eq!(
        host.sink.active.as_ref().map(|a| a.spans.clone()),
        Some(vec![Span::new(3, 5), Span::new(9, 11)])
    );
}

#[test]
fn colliding_rename_merges_groups() {
    let mut host = Host::plain("aa bb aa bb");
    host.activate_all();

    host.send(InputEvent::Click { offset: 0 });
    host.key(Key::Delete);
    host.key(Key::Delete);
    host.type_text("bb");
    assert_eq!(host.text(), "bb bb bb bb");

    host.send(InputEvent::Click { offset: 4 });
    assert_eq!(host.groups(), vec![group("bb", 4)]);
    assert_eq!(host.sink.active.as_ref().map(|a| a.carets.len()), Some(4));

    host.type_text("!");
    assert_eq!(host.text(), "b!b b!b b!b b!b");
}

#[test]
fn rejected_keys_change_nothing() {
    let mut host = Host::plain("ab ab cd cd");
    host.activate_all();
    host.send(InputEvent::Click { offset: 1 });
    let active = host.editor.state();

    for key in [Key::Up, Key::Down, Key::PageUp, Key::PageDown, Key::Enter] {
        assert_eq!(host.key(key), EventOutcome::Rejected);
        assert_eq!(host.text(), "ab ab cd cd");
        assert_eq!(host.editor.state(), active);
    }
}

#[test]
fn outside_text_is_ignored_until_reactivation() {
    let mut host = Host::plain("ab ab");
    host.activate_all();

    // typed by the user while Selected, applied by the host
    host.external(EditOperation::insert(5, " ab"));
    assert_eq!(host.text(), "ab ab ab");
    assert_eq!(host.groups(), vec![group("ab", 2)]);

    // and again while Editing
    host.send(InputEvent::Click { offset: 0 });
    host.external(EditOperation::insert(0, "ab "));
    host.type_text("c");
    assert_eq!(host.text(), "ab cab cab ab");
    assert_eq!(host.groups(), vec![group("ab", 2)]);

    host.key(Key::Escape);
    host.activate_all();
    assert_eq!(host.groups(), vec![group("ab", 2), group("cab", 2)]);
}

#[test]
fn block_bounds_follow_edits() {
    let mut host = Host::plain("zz x x zz");
    host.select(3, 6);
    host.send(InputEvent::Activate);
    host.external(EditOperation::insert(0, "##"));

    let block = host.editor.session().map(|s| s.block().span());
    assert_eq!(block, Some(Span::new(5, 8)));

    host.send(InputEvent::Click { offset: 5 });
    host.type_text("yy");
    let block = host.editor.session().map(|s| s.block().span());
    assert_eq!(block, Some(Span::new(5, 12)));
    assert_eq!(host.text(), "##zz yyx yyx zz");
}

#[test]
fn exit_from_any_state_keeps_text() {
    // Selected
    let mut host = Host::plain("v v");
    host.activate_all();
    host.key(Key::Escape);
    assert_eq!(host.editor.state(), SessionState::Idle);
    assert!(host.sink.groups.is_empty());

    // Editing, via toggle
    host.activate_all();
    host.send(InputEvent::Click { offset: 1 });
    host.type_text("al");
    assert_eq!(host.send(InputEvent::Activate), EventOutcome::Handled);
    assert_eq!(host.editor.state(), SessionState::Idle);
    assert_eq!(host.text(), "val val");
    assert_eq!(host.sink.active, None);
    assert!(host.editor.session().is_none());

    // Editing, via invalidated selection
    host.activate_all();
    host.send(InputEvent::Click { offset: 0 });
    host.send(InputEvent::SelectionInvalidated);
    assert_eq!(host.editor.state(), SessionState::Idle);
    assert_eq!(host.sink.last_notice(), Some(&Notice::Deactivated));
}

#[test]
fn click_tie_break_prefers_span_starting_at_offset() {
    let text = "abcd abcd";
    let mut host = Host::new(text, Some("C"), SyncEditConfig::default());
    // two differently labelled runs touching inside each word
    host.roles = StyleRuns::new()
        .with_run(0, 2, "Id")
        .with_run(2, 4, "Id var")
        .with_run(5, 7, "Id")
        .with_run(7, 9, "Id var");
    host.activate_all();
    assert_eq!(host.groups(), vec![group("ab", 2), group("cd", 2)]);

    // offset 2 ends "ab" and starts "cd"
    host.send(InputEvent::Click { offset: 2 });
    assert_eq!(
        host.editor.state(),
        SessionState::Editing { group: GroupId(1) }
    );
    host.send(InputEvent::Click { offset: 1 });
    assert_eq!(
        host.editor.state(),
        SessionState::Editing { group: GroupId(0) }
    );
    host.send(InputEvent::Click { offset: 9 });
    assert_eq!(
        host.editor.state(),
        SessionState::Editing { group: GroupId(1) }
    );
}

#[test]
fn caret_moved_onto_another_group_leaves_editing() {
    let mut host = Host::plain("ab ab cd cd");
    host.activate_all();
    host.send(InputEvent::Click { offset: 0 });

    // Home/End or a drag lands inside "cd" without a click
    assert_eq!(
        host.send(InputEvent::CaretMoved { offset: 7 }),
        EventOutcome::Forwarded
    );
    assert_eq!(host.editor.state(), SessionState::Selected);
    assert_eq!(host.sink.active, None);

    assert_eq!(host.type_text("x"), EventOutcome::Forwarded);
    assert_eq!(host.text(), "ab ab cd cd");

    host.send(InputEvent::Click { offset: 7 });
    assert_eq!(
        host.editor.state(),
        SessionState::Editing { group: GroupId(1) }
    );
}

#[test]
fn click_outside_every_occurrence_returns_to_selected() {
    let mut host = Host::plain("ab + ab");
    host.activate_all();
    host.send(InputEvent::Click { offset: 0 });
    host.type_text("c");
    assert_eq!(host.text(), "cab + cab");

    assert_eq!(
        host.send(InputEvent::Click { offset: 4 }),
        EventOutcome::Forwarded
    );
    assert_eq!(host.editor.state(), SessionState::Selected);
    assert_eq!(host.sink.last_notice(), Some(&Notice::NotAWord));
    assert_eq!(host.sink.active, None);
    assert_eq!(host.groups(), vec![group("cab", 2)]);
    assert_eq!(host.text(), "cab + cab");
}

#[test]
fn structural_mode_without_labels_reports_no_tokens() {
    let mut host = Host::new("a = a", Some("Rust"), SyncEditConfig::default());
    host.activate_all();

    assert_eq!(host.editor.state(), SessionState::Idle);
    assert_eq!(host.sink.last_notice(), Some(&Notice::NoSyntaxTokens));

    // labels present but none accepted
    host.roles = StyleRuns::new().with_run(0, 1, "Keyword").with_run(4, 5, "Keyword");
    host.activate_all();
    assert_eq!(host.sink.last_notice(), Some(&Notice::NoEditableIdentifiers));
}
