#![cfg(feature = "render")]

use orgchart::render::{ChartOptions, ChartRenderer, HeadlessError, LiveView, ViewportTransform};
use orgchart::{ChartConfig, DiffLabel, Document};
use std::path::PathBuf;

fn fixture(name: &str) -> Document {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("..")
        .join("fixtures")
        .join("org")
        .join(name);
    Document::from_json_str(&std::fs::read_to_string(path).expect("fixture")).expect("document")
}

#[test]
fn async_render_matches_sync_render() {
    let renderer = ChartRenderer::new();
    let doc = fixture("basic.json");
    let sync = renderer
        .render_svg_sync(&doc, ChartOptions::default())
        .unwrap()
        .unwrap();
    let async_svg = futures::executor::block_on(renderer.render_svg(&doc, ChartOptions::default()))
        .unwrap()
        .unwrap();
    assert_eq!(sync, async_svg);
    roxmltree::Document::parse(&sync).expect("svg parses");
}

#[test]
fn compare_stage_labels_target_only() {
    let renderer = ChartRenderer::new();
    let base = fixture("basic.json");
    let target = fixture("reorg.json");
    let chart = renderer
        .layout_sync(
            &target,
            ChartOptions {
                compare: Some(&base),
                ..Default::default()
            },
        )
        .unwrap()
        .unwrap();

    assert!(chart.scene.diff_mode);
    let label = |name: &str| chart.scene.node(name).unwrap().diff_label;
    assert_eq!(label("Data Lead"), Some(DiffLabel::New));
    assert_eq!(label("Platform Lead"), Some(DiffLabel::Promoted));
    assert_eq!(label("QA Lead"), Some(DiffLabel::Demoted));
    assert_eq!(label("Support Lead"), Some(DiffLabel::Moved));
    assert_eq!(label("CEO"), None);
    assert!(chart.scene.node("Office Manager").is_none());
    assert_eq!(
        chart.diff.as_ref().unwrap().removed_names(&base),
        ["Office Manager"]
    );
}

#[test]
fn realigned_vocabulary_changes_class_only() {
    let mut config = ChartConfig::default();
    config.set_value("diff.vocabulary", serde_json::json!("realigned"));
    let renderer = ChartRenderer::with_config(config);
    let base = fixture("basic.json");
    let target = fixture("reorg.json");
    let svg = renderer
        .render_svg_sync(
            &target,
            ChartOptions {
                compare: Some(&base),
                ..Default::default()
            },
        )
        .unwrap()
        .unwrap();
    assert!(svg.contains("node-group diff-realigned"));
    assert!(!svg.contains("node-group diff-demoted"));
}

#[test]
fn rootless_document_renders_nothing() {
    let renderer = ChartRenderer::new();
    let doc = Document::from_json_str(r#"{"A":{"level":2,"under":"B"}}"#).unwrap();
    assert!(
        renderer
            .render_svg_sync(&doc, ChartOptions::default())
            .unwrap()
            .is_none()
    );
}

#[test]
fn strict_root_policy_surfaces_multiple_roots() {
    let mut config = ChartConfig::default();
    config.set_value("tree.rootPolicy", serde_json::json!("strict"));
    let renderer = ChartRenderer::with_config(config);
    let doc = Document::from_json_str(r#"{"A":{"level":1},"B":{"level":1}}"#).unwrap();
    let err = renderer
        .layout_sync(&doc, ChartOptions::default())
        .unwrap_err();
    assert!(matches!(
        err,
        HeadlessError::Core(orgchart::Error::MultipleRoots { .. })
    ));
}

#[test]
fn search_and_live_view_stages() {
    let renderer = ChartRenderer::new();
    let doc = fixture("basic.json");
    let chart = renderer
        .layout_sync(
            &doc,
            ChartOptions {
                search: Some("chief"),
                ..Default::default()
            },
        )
        .unwrap()
        .unwrap();
    let search = chart.search.as_ref().unwrap();
    assert_eq!(search.highlighted, ["CEO", "CTO", "CFO", "COO"]);

    let mut view = ViewportTransform::default();
    view.fit(&chart.scene.bounds.unwrap(), 1024.0, 768.0);
    let svg = renderer.chart_svg(
        &chart,
        Some(LiveView {
            transform: view.transform(),
            width: 1024.0,
            height: 768.0,
        }),
    );
    assert!(svg.contains(r#"viewBox="0 0 1024 768""#));
    assert!(svg.contains("search-highlight"));
}

#[test]
fn diagram_id_is_sanitized() {
    let renderer = ChartRenderer::new();
    let svg = renderer
        .render_svg_sync_with_diagram_id(&fixture("basic.json"), ChartOptions::default(), "Q3 plan")
        .unwrap()
        .unwrap();
    assert!(svg.contains(r#"id="Q3-plan""#));
}
