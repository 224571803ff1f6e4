use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use hellforge_core::{
    Editor, HeadlessPrompter, SaveOutcome, TextEditor, TextViewState, ToolWindow, Workbench,
};
use hellforge_project::{
    AppState, EditorState, ErrorKind, MemoryArchiveLoader, PathEntry, ToolWindowKind, WindowState,
};
use hellforge_settings::{Config, ConfigStore};
use tempfile::tempdir;

fn workbench(config_path: &Path) -> Workbench {
    let store = ConfigStore::new(config_path);
    let config = store.load();
    Workbench::new(
        store,
        config,
        Arc::new(MemoryArchiveLoader::default()),
        Box::new(HeadlessPrompter::answering(false)),
    )
}

fn project_file(content: &Path, name: &str, data: &[u8]) -> PathEntry {
    let path = content.join(name);
    fs::write(&path, data).expect("write file");
    PathEntry::project(name, path.to_string_lossy(), false)
}

#[test]
fn new_project_shows_project_explorer() {
    let temp = tempdir().expect("tempdir");
    let mut bench = workbench(&temp.path().join("environment.json"));

    bench
        .new_project(&temp.path().join("mod.hsp"))
        .expect("new project");

    assert!(bench.project_explorer().window().is_visible());
    let manifest = temp.path().join("mod.hsp");
    assert_eq!(
        bench.config().recent_projects.most_recent(),
        Some(&*manifest.to_string_lossy())
    );
    let tree = bench.project_tree().expect("tree");
    assert!(tree.children.is_empty());
}

#[test]
fn opening_twice_focuses_existing_editor() {
    let temp = tempdir().expect("tempdir");
    let mut bench = workbench(&temp.path().join("environment.json"));
    bench.new_project(&temp.path().join("mod.hsp")).expect("new project");
    let content = bench.project().expect("project").content_path();
    let entry = project_file(&content, "a.txt", b"hello");

    let first = bench.open_editor(entry.clone()).expect("open");
    let second = bench.open_editor(entry).expect("open again");

    assert_eq!(first, second);
    assert_eq!(bench.editors().count(), 1);
    assert_eq!(bench.focused_editor_id(), Some(first));
}

#[test]
fn failed_open_is_reported_and_leaves_editors_alone() {
    let temp = tempdir().expect("tempdir");
    let mut bench = workbench(&temp.path().join("environment.json"));
    bench.new_project(&temp.path().join("mod.hsp")).expect("new project");
    let content = bench.project().expect("project").content_path();

    let missing = PathEntry::project("gone.txt", content.join("gone.txt").to_string_lossy(), false);
    let err = bench.open_editor(missing).expect_err("missing file");
    assert_eq!(err.kind(), ErrorKind::NotFound);

    let sprite = project_file(&content, "hero.dc6", &[0u8; 8]);
    let err = bench.open_editor(sprite).expect_err("no dc6 editor");
    assert_eq!(err.kind(), ErrorKind::Unsupported);

    assert_eq!(bench.editors().count(), 0);
    assert_eq!(bench.console().len(), 2);
}

#[test]
fn unchanged_editor_does_not_rewrite_file() {
    let temp = tempdir().expect("tempdir");
    let mut bench = workbench(&temp.path().join("environment.json"));
    bench.new_project(&temp.path().join("mod.hsp")).expect("new project");
    let content = bench.project().expect("project").content_path();
    let entry = project_file(&content, "a.txt", b"hello");
    let before = fs::metadata(content.join("a.txt"))
        .and_then(|meta| meta.modified())
        .expect("mtime");

    let id = bench.open_editor(entry).expect("open");
    thread::sleep(Duration::from_millis(20));
    let outcome = bench.save_editor(&id).expect("save");

    assert_eq!(outcome, SaveOutcome::Unchanged);
    assert_eq!(fs::read(content.join("a.txt")).expect("read"), b"hello");
    let after = fs::metadata(content.join("a.txt"))
        .and_then(|meta| meta.modified())
        .expect("mtime");
    assert_eq!(before, after);
}

#[test]
fn closed_editors_are_pruned_and_their_view_state_evicted() {
    let temp = tempdir().expect("tempdir");
    let mut bench = workbench(&temp.path().join("environment.json"));
    bench.new_project(&temp.path().join("mod.hsp")).expect("new project");
    let content = bench.project().expect("project").content_path();
    let id = bench
        .open_editor(project_file(&content, "a.txt", b"hello"))
        .expect("open");
    assert!(bench.views().contains(&id));

    bench.close_active_editor();
    assert_eq!(bench.prune_closed_editors(), 1);
    assert_eq!(bench.editors().count(), 0);
    assert!(!bench.views().contains(&id));
}

#[test]
fn cleanup_offers_to_save_changes() {
    let temp = tempdir().expect("tempdir");
    let entry = project_file(temp.path(), "notes.txt", b"old");
    let loader = MemoryArchiveLoader::default();
    let mut editor = TextEditor::new(entry, (0.0, 0.0), b"old".to_vec());
    editor.show();
    editor.set_text("new");

    let mut prompter = HeadlessPrompter::answering(true);
    editor.cleanup(&loader, &mut prompter);

    assert_eq!(prompter.questions.len(), 1);
    assert!(prompter.questions[0].contains("notes.txt"));
    assert!(!editor.is_visible());
    assert_eq!(fs::read(temp.path().join("notes.txt")).expect("read"), b"new");
}

#[test]
fn session_round_trips_into_a_fresh_workbench() {
    let temp = tempdir().expect("tempdir");
    let config_path = temp.path().join("environment.json");
    let manifest = temp.path().join("mod.hsp");

    let id = {
        let mut bench = workbench(&config_path);
        bench.new_project(&manifest).expect("new project");
        let content = bench.project().expect("project").content_path();
        let id = bench
            .open_editor(project_file(&content, "a.txt", b"hello"))
            .expect("open");

        let editor = bench.editor_mut(&id).expect("editor");
        editor.base_mut().window.set_position(50.0, 60.0);
        editor.set_size(640.0, 480.0);
        bench
            .views_mut()
            .get_mut::<TextViewState>(&id)
            .expect("view state")
            .cursor = 3;
        bench.console_mut().window_mut().show();

        bench.save();
        id
    };

    let mut bench = workbench(&config_path);
    assert!(bench.config().project_state(&manifest).is_some());
    bench.load_project(&manifest).expect("load project");
    bench.wait_pending();

    let editor = bench.editor(&id).expect("restored editor");
    assert_eq!(editor.base().window.position(), (50.0, 60.0));
    assert_eq!(editor.base().window.size(), (640.0, 480.0));
    assert!(editor.is_visible());
    let view = bench.views().get::<TextViewState>(&id).expect("view state");
    assert_eq!(view.cursor, 3);
    assert!(bench.console().window().is_visible());

    let state = bench.state();
    let kinds: Vec<_> = state.tool_windows.iter().map(|tool| tool.kind).collect();
    assert_eq!(
        kinds,
        vec![
            ToolWindowKind::MpqExplorer,
            ToolWindowKind::ProjectExplorer,
            ToolWindowKind::Console,
        ]
    );
}

#[test]
fn restore_skips_bad_records_and_stale_loads() {
    let temp = tempdir().expect("tempdir");
    let mut bench = workbench(&temp.path().join("environment.json"));
    bench.new_project(&temp.path().join("mod.hsp")).expect("new project");
    let content = bench.project().expect("project").content_path();
    let entry = project_file(&content, "a.txt", b"hello");

    let window = WindowState::new(true, (10.0, 10.0), (100.0, 100.0));
    let state = AppState {
        project_path: String::new(),
        editor_windows: vec![
            EditorState {
                path: b"not an identifier".to_vec(),
                encoded: Vec::new(),
                window,
            },
            EditorState {
                path: entry.to_identifier().expect("identifier"),
                encoded: b"{broken".to_vec(),
                window,
            },
        ],
        tool_windows: Vec::new(),
    };

    bench.restore_app_state(&state);
    assert_eq!(bench.pending_count(), 1);
    bench.close_all_open_windows();
    assert_eq!(bench.wait_pending(), 0);
    assert_eq!(bench.editors().count(), 0);

    bench.restore_app_state(&state);
    assert_eq!(bench.wait_pending(), 1);
    let view = bench
        .views()
        .get::<TextViewState>(&entry.unique_id())
        .expect("default view state");
    assert_eq!(view, &TextViewState::default());
}

#[test]
fn autosave_persists_session() {
    let temp = tempdir().expect("tempdir");
    let config_path = temp.path().join("environment.json");
    let manifest = temp.path().join("mod.hsp");
    let mut bench = workbench(&config_path);
    bench.new_project(&manifest).expect("new project");

    assert!(!bench.poll_autosave());
    bench.start_autosave(Duration::from_millis(50));
    thread::sleep(Duration::from_millis(300));
    assert!(bench.poll_autosave());

    let saved: Config =
        serde_json::from_slice(&fs::read(&config_path).expect("config")).expect("parse");
    assert!(saved.project_state(&manifest).is_some());
}

#[test]
fn legacy_encoded_file_saves_unchanged() {
    let temp = tempdir().expect("tempdir");
    let mut bench = workbench(&temp.path().join("environment.json"));
    bench.new_project(&temp.path().join("mod.hsp")).expect("new project");
    let content = bench.project().expect("project").content_path();
    let data = b"Name\tLevel\nGol\xe9m\t1\n";
    let entry = project_file(&content, "monsters.txt", data);

    let id = bench.open_editor(entry).expect("open");
    assert!(!bench
        .editor(&id)
        .expect("editor")
        .has_changes(bench.loader()));
    let outcome = bench.save_editor(&id).expect("save");

    assert_eq!(outcome, SaveOutcome::Unchanged);
    assert_eq!(fs::read(content.join("monsters.txt")).expect("read"), data);
}

#[test]
fn failed_project_switch_keeps_current_project() {
    let temp = tempdir().expect("tempdir");
    let archive_dir = temp.path().join("archives");
    fs::create_dir_all(&archive_dir).expect("archive dir");
    fs::write(archive_dir.join("bad.mpq"), b"not an archive").expect("write archive");

    let config_path = temp.path().join("environment.json");
    let store = ConfigStore::new(&config_path);
    let mut config = store.load();
    config.auxiliary_archive_path = archive_dir.to_string_lossy().into_owned();
    let mut bench = Workbench::new(
        store,
        config,
        Arc::new(MemoryArchiveLoader::default()),
        Box::new(HeadlessPrompter::answering(false)),
    );

    let first = temp.path().join("a").join("a.hsp");
    fs::create_dir_all(first.parent().expect("parent")).expect("project dir");
    bench.new_project(&first).expect("first project");
    let content = bench.project().expect("project").content_path();
    let id = bench
        .open_editor(project_file(&content, "a.txt", b"hello"))
        .expect("open");

    let second = temp.path().join("b").join("b.hsp");
    fs::create_dir_all(second.parent().expect("parent")).expect("project dir");
    fs::write(&second, r#"{"ProjectName":"b","AuxiliaryMPQs":["bad.mpq"]}"#)
        .expect("write manifest");

    bench.load_project(&second).expect_err("archive cannot be opened");

    assert_eq!(bench.project().expect("project").file_path(), first.as_path());
    assert!(bench.editor(&id).is_some());
    assert_eq!(
        bench.config().recent_projects.most_recent(),
        Some(&*first.to_string_lossy())
    );

    bench.save();
    assert!(bench.config().project_state(&second).is_none());
    let stored = bench.config().project_state(&first).expect("first session");
    assert_eq!(stored.editor_windows.len(), 1);
}
