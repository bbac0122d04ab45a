//! Build pipeline integration tests
//!
//! Drives configuration loading, resolution, transforms and output routing
//! together against temporary project directories.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

use zbundle::build::{
    resolve, BuildContext, BuildError, BuildPipeline, BuildStatus, Format, ItemKind, Target,
};
use zbundle::config::{load_targets, parse_config, DEFAULT_CONFIG_FILE};
use zbundle::content::{FetchError, RemoteFetcher};

// ============================================================================
// Test Utilities
// ============================================================================

/// Create a test file with content.
fn create_test_file(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    let mut file = File::create(&path).unwrap();
    file.write_all(content.as_bytes()).unwrap();
    path
}

fn read(dir: &Path, name: &str) -> String {
    fs::read_to_string(dir.join(name)).unwrap()
}

/// Fetcher serving fixed text and counting requests.
struct CountingFetcher {
    requests: Arc<AtomicUsize>,
}

impl RemoteFetcher for CountingFetcher {
    fn fetch(&self, _url: &str) -> Result<String, FetchError> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        Ok("html { margin: 0px; }".to_string())
    }
}

fn targets_from(dir: &Path, config: &str) -> Vec<Target> {
    let path = create_test_file(dir, DEFAULT_CONFIG_FILE, config);
    load_targets(&path).unwrap()
}

// ============================================================================
// End-to-end builds
// ============================================================================

#[test]
fn test_config_driven_build() {
    let temp = TempDir::new().unwrap();
    create_test_file(temp.path(), "src/css/base.css", "body { color: red; }");
    create_test_file(temp.path(), "src/css/vendor/lib.css", "i { color: blue; }");
    create_test_file(temp.path(), "src/js/app.js", "function hello() { return 1 }");
    create_test_file(temp.path(), "docs/intro.md", "# Intro");

    let targets = targets_from(
        temp.path(),
        r#"[
            // styles without vendor code
            { mode: "css", label: "styles", include: ["src/css"], exclude: ["/VENDOR/"], output: ["dist/site.css"] },
            { mode: "js", include: ["src/js"], output: ["dist/app.js"] },
            { mode: "markdown", include: ["docs"], output: ["dist/docs/%x.html"] },
        ]"#,
    );

    let pipeline = BuildPipeline::new(BuildContext::new(temp.path().to_path_buf()));
    let result = pipeline.build_all(&targets, None).unwrap();

    assert_eq!(result.success_count(), 3);
    assert_eq!(read(temp.path(), "dist/site.css"), "body{color:red}");
    assert!(read(temp.path(), "dist/app.js").contains("hello"));
    assert!(read(temp.path(), "dist/docs/intro.html").contains("<h1>Intro</h1>"));
}

#[test]
fn test_file_listed_directly_and_via_directory() {
    let temp = TempDir::new().unwrap();
    create_test_file(temp.path(), "css/a.css", "a { top: 0px; }");
    create_test_file(temp.path(), "css/z.css", "z { top: 1px; }");

    let target = Target::new(
        Format::Css,
        vec!["css/z.css".into(), "css".into()],
        vec!["out.css".into()],
    );

    let items = resolve(&target, temp.path(), true).unwrap();
    assert_eq!(items.len(), 2);
    assert!(items[0].value.ends_with("z.css"));
    assert!(items.iter().all(|i| i.kind == ItemKind::File));

    let pipeline = BuildPipeline::new(BuildContext::new(temp.path().to_path_buf()));
    pipeline.build_all(&[target], None).unwrap();
    assert_eq!(read(temp.path(), "out.css"), "z{top:1px}a{top:0}");
}

#[test]
fn test_remote_fetched_once_across_targets() {
    let temp = TempDir::new().unwrap();
    let requests = Arc::new(AtomicUsize::new(0));
    let ctx = BuildContext::new(temp.path().to_path_buf())
        .with_fetcher(CountingFetcher { requests: Arc::clone(&requests) })
        .with_suppression_window(Duration::ZERO);
    let pipeline = BuildPipeline::new(ctx);

    let url = "https://cdn.example.com/reset.css";
    let targets = vec![
        Target::new(Format::Css, vec![url.into()], vec!["one.css".into()]),
        Target::new(Format::Css, vec![url.into()], vec!["two.css".into()]),
    ];

    pipeline.build_all(&targets, None).unwrap();
    assert_eq!(requests.load(Ordering::SeqCst), 1);
    assert_eq!(read(temp.path(), "one.css"), "html{margin:0}");
    assert_eq!(read(temp.path(), "two.css"), "html{margin:0}");

    pipeline.context().content().invalidate(url);
    pipeline.build_all(&targets, None).unwrap();
    assert_eq!(requests.load(Ordering::SeqCst), 2);
}

#[test]
fn test_one_shot_failure_writes_nothing_for_target() {
    let temp = TempDir::new().unwrap();
    create_test_file(temp.path(), "ok.js", "var ok = true");
    create_test_file(temp.path(), "broken.js", "function (");

    let targets = targets_from(
        temp.path(),
        r#"[
            { mode: "js", include: ["ok.js"], output: ["first.js"] },
            { mode: "js", include: ["ok.js", "broken.js"], output: ["second.js"] },
            { mode: "js", include: ["ok.js"], output: ["third.js"] },
        ]"#,
    );

    let pipeline = BuildPipeline::new(BuildContext::new(temp.path().to_path_buf()));
    let err = pipeline.build_all(&targets, None).unwrap_err();

    assert!(matches!(err, BuildError::Transform { .. }));
    assert!(!err.is_fatal());
    assert!(temp.path().join("first.js").exists());
    assert!(!temp.path().join("second.js").exists());
    assert!(!temp.path().join("third.js").exists());
}

#[test]
fn test_watch_mode_failure_leaves_other_outputs_untouched() {
    let temp = TempDir::new().unwrap();
    create_test_file(temp.path(), "ok.css", "a { color: red; }");
    create_test_file(temp.path(), "broken.css", "..nope {}");
    create_test_file(temp.path(), "keep.css", "previous output");

    let targets = vec![
        Target::new(Format::Css, vec!["broken.css".into()], vec!["keep.css".into()]),
        Target::new(Format::Css, vec!["ok.css".into()], vec!["ok.min.css".into()]),
    ];

    let ctx = BuildContext::new(temp.path().to_path_buf()).with_watch(true);
    let result = BuildPipeline::new(ctx).build_all(&targets, None).unwrap();

    assert!(matches!(result.targets[0].status, BuildStatus::Failed(_)));
    assert_eq!(result.targets[1].status, BuildStatus::Success);
    assert_eq!(read(temp.path(), "keep.css"), "previous output");
    assert_eq!(read(temp.path(), "ok.min.css"), "a{color:red}");
}

#[test]
fn test_missing_include_is_contained_in_watch_mode() {
    let temp = TempDir::new().unwrap();
    create_test_file(temp.path(), "a.css", "a { color: red; }");
    let targets = vec![
        Target::new(Format::Css, vec!["gone.css".into()], vec!["gone.min.css".into()]),
        Target::new(Format::Css, vec!["a.css".into()], vec!["a.min.css".into()]),
    ];

    let one_shot = BuildPipeline::new(BuildContext::new(temp.path().to_path_buf()));
    assert!(matches!(one_shot.build_all(&targets, None), Err(BuildError::Resolve(_))));

    let watch = BuildPipeline::new(BuildContext::new(temp.path().to_path_buf()).with_watch(true));
    let result = watch.build_all(&targets, None).unwrap();
    assert_eq!(result.failed_count(), 1);
    assert!(temp.path().join("a.min.css").exists());
}

#[test]
fn test_extended_css_option() {
    let temp = TempDir::new().unwrap();
    create_test_file(
        temp.path(),
        "nested.css",
        "@custom-media --small (max-width: 30em);\n.nav { & a { color: red; } }\n@media (--small) { .nav { display: none; } }",
    );

    let targets = targets_from(
        temp.path(),
        r#"[{ mode: "css", include: ["nested.css"], output: ["out.css"], options: { extended: true } }]"#,
    );
    BuildPipeline::new(BuildContext::new(temp.path().to_path_buf()))
        .build_all(&targets, None)
        .unwrap();

    let out = read(temp.path(), "out.css");
    assert!(out.contains(".nav a"), "got {}", out);
    assert!(!out.contains("--small"), "got {}", out);
}

#[test]
fn test_markdown_writes_each_item_to_every_template() {
    let temp = TempDir::new().unwrap();
    create_test_file(temp.path(), "docs/one.md", "one");
    create_test_file(temp.path(), "docs/two.md", "two");

    let target = Target::new(
        Format::Md,
        vec!["docs".into()],
        vec!["site/%x.html".into(), "raw/%n.html".into()],
    );
    let result = BuildPipeline::new(BuildContext::new(temp.path().to_path_buf()))
        .build_all(&[target], None)
        .unwrap();

    assert_eq!(result.all_outputs().len(), 4);
    assert_eq!(read(temp.path(), "site/one.html").trim(), "<p>one</p>");
    assert!(temp.path().join("raw/two.md.html").exists());
}

#[test]
fn test_invalid_config_reports_all_problems() {
    let err = parse_config(
        r#"[
            { mode: "css", include: [], output: ["a.css"] },
            { mode: "js", include: ["a.js"], output: [] },
        ]"#,
    )
    .unwrap_err();

    let message = err.to_string();
    assert!(message.contains("[0].include"));
    assert!(message.contains("[1].output"));
}
