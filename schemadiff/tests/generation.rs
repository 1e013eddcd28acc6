mod support;

use std::sync::Arc;

use schemadiff::errors::{RunError, SinkError};
use schemadiff::model::{Field, FieldType, RecordType, Widget, WidgetAssignment};
use schemadiff::{Flavor, Framing, MigrationScriptRenderer, RecordStatus, SingleSinkRunner, generate};
use support::{RefusingRenderer, ScriptedSink, chunks, index, record};

fn js_framing() -> Framing {
    Framing::for_flavor(Flavor::Js, "before.json", "after.json")
}

#[tokio::test]
async fn test_added_field_produces_single_create_statement() {
    let before = index(vec![record("post", &["title"])], vec![]);
    let after = index(
        vec![record("post", &["title"]).with_field(Field::new("body", FieldType::Text).named("Body"))],
        vec![],
    );

    let (sink, log) = ScriptedSink::new();
    let mut runner = SingleSinkRunner::new(sink, Framing::default(), Arc::new(MigrationScriptRenderer));
    let summary = generate(&mut runner, &before, &after).await.unwrap();

    assert_eq!(summary.get("post").unwrap().status, RecordStatus::Written);
    assert_eq!(summary.get("post").unwrap().operations, 1);
    let written = chunks(&log);
    assert_eq!(written.len(), 1);
    assert!(written[0].contains("migration.editContentType(\"post\").createField(\"body\")"));
    assert!(written[0].contains(".type(\"Text\")"));
    assert!(written[0].contains(".name(\"Body\")"));
}

#[tokio::test]
async fn test_deletions_follow_every_creation() {
    let before = index(vec![record("author", &["name"]), record("post", &["title"])], vec![]);
    let after = index(vec![record("post", &["title", "slug"]), record("tag", &["label"])], vec![]);

    let (sink, log) = ScriptedSink::new();
    let mut runner = SingleSinkRunner::new(sink, js_framing(), Arc::new(MigrationScriptRenderer));
    let summary = generate(&mut runner, &before, &after).await.unwrap();
    assert!(summary.succeeded());

    let order: Vec<&str> = summary.records.iter().map(|r| r.record.as_str()).collect();
    assert_eq!(order, vec!["post", "tag", "author"]);

    let script = chunks(&log).concat();
    let create_tag = script.find("createContentType(\"tag\"").unwrap();
    let delete_author = script.find("deleteContentType(\"author\")").unwrap();
    let create_slug = script.find("createField(\"slug\")").unwrap();
    assert!(create_slug < create_tag);
    assert!(create_tag < delete_author);
    assert!(script.starts_with("// Generated by schemadiff"));
    assert!(script.ends_with("}\n"));
}

#[tokio::test]
async fn test_identical_snapshots_write_only_framing() {
    let snapshot = vec![record("post", &["title", "body"])];
    let before = index(snapshot.clone(), vec![]);
    let after = index(snapshot, vec![]);

    let (sink, log) = ScriptedSink::new();
    let framing = js_framing();
    let mut runner = SingleSinkRunner::new(sink, framing.clone(), Arc::new(MigrationScriptRenderer));
    let summary = generate(&mut runner, &before, &after).await.unwrap();

    assert_eq!(summary.count(RecordStatus::Unchanged), 1);
    assert_eq!(chunks(&log), vec![framing.header, framing.footer]);
}

#[tokio::test]
async fn test_widget_changes_follow_their_field() {
    let before = index(
        vec![record("post", &["title"])],
        vec![WidgetAssignment::new("post").with_control("title", Widget::builtin("singleLine"))],
    );
    let after = index(
        vec![record("post", &["title", "slug"])],
        vec![
            WidgetAssignment::new("post")
                .with_control("title", Widget::builtin("singleLine"))
                .with_control("slug", Widget::builtin("slugEditor")),
        ],
    );

    let (sink, log) = ScriptedSink::new();
    let mut runner = SingleSinkRunner::new(sink, Framing::default(), Arc::new(MigrationScriptRenderer));
    generate(&mut runner, &before, &after).await.unwrap();

    let written = chunks(&log);
    assert_eq!(written.len(), 2);
    assert!(written[0].contains("createField(\"slug\")"));
    assert!(written[1].contains("changeFieldControl(\"slug\", \"builtin\", \"slugEditor\", {})"));
}

#[tokio::test]
async fn test_malformed_record_fails_alone() {
    let broken = RecordType::new("gallery", "Gallery").with_field(Field::new("images", FieldType::Array));
    let before = index(vec![], vec![]);
    let after = index(vec![broken, record("post", &["title"])], vec![]);

    let (sink, log) = ScriptedSink::new();
    let mut runner = SingleSinkRunner::new(sink, Framing::default(), Arc::new(MigrationScriptRenderer));
    let summary = generate(&mut runner, &before, &after).await.unwrap();

    assert_eq!(summary.get("gallery").unwrap().status, RecordStatus::Failed);
    assert_eq!(summary.get("post").unwrap().status, RecordStatus::Written);
    assert!(chunks(&log).iter().all(|c| !c.contains("gallery")));
    assert!(summary.into_result().is_ok());
}

#[tokio::test]
async fn test_render_failure_aborts_the_run() {
    let before = index(vec![], vec![]);
    let after = index(
        vec![record("author", &["name"]), record("post", &["title"]), record("tag", &["label"])],
        vec![],
    );

    let (sink, log) = ScriptedSink::new();
    let mut runner = SingleSinkRunner::new(sink, Framing::default(), Arc::new(RefusingRenderer("post")));
    let summary = generate(&mut runner, &before, &after).await.unwrap();

    assert_eq!(summary.get("author").unwrap().status, RecordStatus::Written);
    assert_eq!(summary.get("post").unwrap().status, RecordStatus::Failed);
    assert_eq!(summary.get("tag").unwrap().status, RecordStatus::Failed);
    assert!(matches!(summary.fatal(), Some(RunError::Render(_))));
    assert!(chunks(&log).iter().all(|c| !c.contains("\"post\"") && !c.contains("\"tag\"")));
    assert!(matches!(summary.into_result(), Err(RunError::Render(_))));
}

#[tokio::test]
async fn test_sink_failure_still_returns_the_summary() {
    let before = index(vec![], vec![]);
    let after = index(vec![record("author", &["name"]), record("post", &["title"])], vec![]);

    // The header is write 0; the first block chunk fails.
    let (sink, log) = ScriptedSink::new();
    let sink = sink.fail_on(1);
    let framing = js_framing();
    let mut runner = SingleSinkRunner::new(sink, framing.clone(), Arc::new(MigrationScriptRenderer));
    let summary = generate(&mut runner, &before, &after).await.unwrap();

    assert_eq!(summary.count(RecordStatus::Failed), 2);
    assert!(summary.get("author").unwrap().error.as_deref().unwrap().contains("disk full"));
    assert!(summary.get("post").unwrap().error.as_deref().unwrap().contains("unusable"));
    assert!(summary.close_error().is_none());
    assert!(!summary.succeeded());

    assert_eq!(chunks(&log), vec![framing.header]);
    assert!(log.lock().unwrap().closed);
}

#[tokio::test]
async fn test_close_failure_is_kept_in_the_summary() {
    let before = index(vec![], vec![]);
    let after = index(vec![record("post", &["title"])], vec![]);

    let (sink, _log) = ScriptedSink::new();
    let mut runner = SingleSinkRunner::new(sink.fail_close(), js_framing(), Arc::new(MigrationScriptRenderer));
    let summary = generate(&mut runner, &before, &after).await.unwrap();

    assert_eq!(summary.get("post").unwrap().status, RecordStatus::Written);
    assert!(matches!(summary.close_error(), Some(SinkError::Io(_))));
    assert!(!summary.succeeded());
}
