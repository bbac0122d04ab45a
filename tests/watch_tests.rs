//! Watch engine integration tests
//!
//! Feeds change events through a channel instead of a live file watcher.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::mpsc::channel;
use std::time::Duration;
use tempfile::TempDir;

use zbundle::build::{BuildContext, BuildPipeline, BuildStatus, Format, Target};
use zbundle::watch::{ChangeEvent, ChangeOutcome, WatchEngine, WatchOptions};

fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, content).unwrap();
    path
}

fn engine(base: &Path, targets: Vec<Target>, debounce: Duration) -> WatchEngine {
    let ctx = BuildContext::new(base.to_path_buf())
        .with_watch(true)
        .with_suppression_window(Duration::ZERO);
    let options = WatchOptions { debounce, settle: Duration::ZERO };
    WatchEngine::new(BuildPipeline::new(ctx), targets, options)
}

fn site_targets() -> Vec<Target> {
    vec![
        Target::new(Format::Css, vec!["css".into()], vec!["dist/site.css".into()]),
        Target::new(Format::Js, vec!["js".into()], vec!["dist/app.js".into()]),
    ]
}

#[test]
fn test_burst_of_saves_rebuilds_once() {
    let temp = TempDir::new().unwrap();
    let css = write(temp.path(), "css/a.css", "a { color: red; }");
    write(temp.path(), "js/app.js", "var a = 1");

    let mut engine = engine(temp.path(), site_targets(), Duration::from_secs(60));
    engine.initial_build().unwrap();

    let (tx, rx) = channel();
    for _ in 0..3 {
        tx.send(ChangeEvent::Modified(css.clone())).unwrap();
    }
    drop(tx);

    let stats = engine.process_events(&rx).unwrap();
    assert_eq!(stats.events, 3);
    assert_eq!(stats.rebuilds, 1);
    assert_eq!(stats.debounced, 2);
}

#[test]
fn test_style_change_skips_script_target() {
    let temp = TempDir::new().unwrap();
    let css = write(temp.path(), "css/a.css", "a { color: red; }");
    write(temp.path(), "js/app.js", "var a = 1");

    let mut engine = engine(temp.path(), site_targets(), Duration::ZERO);
    engine.initial_build().unwrap();
    fs::remove_file(temp.path().join("dist/app.js")).unwrap();

    write(temp.path(), "css/a.css", "a { color: blue; }");
    match engine.handle_change(&css).unwrap() {
        ChangeOutcome::Built(result) => {
            assert_eq!(result.targets.len(), 1);
            assert_eq!(result.targets[0].status, BuildStatus::Success);
        }
        _ => panic!("expected a rebuild"),
    }

    assert_eq!(fs::read_to_string(temp.path().join("dist/site.css")).unwrap(), "a{color:#00f}");
    assert!(!temp.path().join("dist/app.js").exists());
}

#[test]
fn test_new_file_in_included_directory_is_picked_up() {
    let temp = TempDir::new().unwrap();
    write(temp.path(), "css/a.css", "a { top: 0px; }");
    write(temp.path(), "js/app.js", "var a = 1");

    let mut engine = engine(temp.path(), site_targets(), Duration::ZERO);
    engine.initial_build().unwrap();

    let added = write(temp.path(), "css/b.css", "b { top: 1px; }");
    let (tx, rx) = channel();
    tx.send(ChangeEvent::Created(added)).unwrap();
    drop(tx);

    let stats = engine.process_events(&rx).unwrap();
    assert_eq!(stats.rebuilds, 1);
    assert_eq!(
        fs::read_to_string(temp.path().join("dist/site.css")).unwrap(),
        "a{top:0}b{top:1px}"
    );
}

#[test]
fn test_broken_save_keeps_previous_output() {
    let temp = TempDir::new().unwrap();
    let js = write(temp.path(), "js/app.js", "var a = 1");
    write(temp.path(), "css/a.css", "a { top: 0px; }");

    let mut engine = engine(temp.path(), site_targets(), Duration::ZERO);
    engine.initial_build().unwrap();
    let before = fs::read_to_string(temp.path().join("dist/app.js")).unwrap();

    write(temp.path(), "js/app.js", "function (");
    match engine.handle_change(&js).unwrap() {
        ChangeOutcome::Built(result) => assert_eq!(result.failed_count(), 1),
        _ => panic!("expected a build attempt"),
    }
    assert_eq!(fs::read_to_string(temp.path().join("dist/app.js")).unwrap(), before);

    // Fixing the file recovers without restarting
    write(temp.path(), "js/app.js", "var b = 2");
    match engine.handle_change(&js).unwrap() {
        ChangeOutcome::Built(result) => assert_eq!(result.success_count(), 1),
        _ => panic!("expected a rebuild"),
    }
    assert!(fs::read_to_string(temp.path().join("dist/app.js")).unwrap().contains("b=2"));
}

#[test]
fn test_unrelated_path_builds_nothing() {
    let temp = TempDir::new().unwrap();
    write(temp.path(), "css/a.css", "a { top: 0px; }");
    write(temp.path(), "js/app.js", "var a = 1");
    let notes = write(temp.path(), "notes.txt", "todo");

    let mut engine = engine(temp.path(), site_targets(), Duration::ZERO);
    assert!(matches!(engine.handle_change(&notes).unwrap(), ChangeOutcome::NoMatch));
}

#[test]
fn test_every_path_in_a_burst_is_refreshed_later() {
    let temp = TempDir::new().unwrap();
    let a = write(temp.path(), "css/a.css", "a { top: 0px; }");
    let b = write(temp.path(), "css/b.css", "b { top: 0px; }");
    write(temp.path(), "js/app.js", "var a = 1");

    let mut engine = engine(temp.path(), site_targets(), Duration::from_millis(200));
    engine.initial_build().unwrap();

    write(temp.path(), "css/a.css", "a { top: 1px; }");
    write(temp.path(), "css/b.css", "b { top: 1px; }");
    assert!(matches!(engine.handle_change(&a).unwrap(), ChangeOutcome::Built(_)));
    assert!(matches!(engine.handle_change(&b).unwrap(), ChangeOutcome::Debounced));

    std::thread::sleep(Duration::from_millis(300));
    write(temp.path(), "css/a.css", "a { top: 2px; }");
    assert!(matches!(engine.handle_change(&a).unwrap(), ChangeOutcome::Built(_)));

    assert_eq!(
        fs::read_to_string(temp.path().join("dist/site.css")).unwrap(),
        "a{top:2px}b{top:1px}"
    );
}

#[test]
fn test_unrelated_event_does_not_swallow_following_save() {
    let temp = TempDir::new().unwrap();
    let css = write(temp.path(), "css/a.css", "a { top: 0px; }");
    write(temp.path(), "js/app.js", "var a = 1");

    let mut engine = engine(temp.path(), site_targets(), Duration::from_secs(60));
    engine.initial_build().unwrap();

    let (tx, rx) = channel();
    tx.send(ChangeEvent::Created(temp.path().join("css/4913"))).unwrap();
    tx.send(ChangeEvent::Modified(temp.path().join("css"))).unwrap();
    tx.send(ChangeEvent::Modified(css)).unwrap();
    drop(tx);

    let stats = engine.process_events(&rx).unwrap();
    assert_eq!(stats.unmatched, 2);
    assert_eq!(stats.rebuilds, 1);
}
