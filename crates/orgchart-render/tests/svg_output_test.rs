use orgchart_core::{Document, LayoutConfig, OrgTree, diff};
use orgchart_render::{
    DeterministicTextMeasurer, SceneOptions, SvgRenderOptions, ViewportTransform, layout_tree,
    render_scene, render_scene_svg,
};
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

fn scene(tree: &mut OrgTree, options: SceneOptions) -> orgchart_render::SceneGraph {
    let cfg = LayoutConfig::default();
    layout_tree(tree, &cfg).expect("layout ok");
    render_scene(tree, &cfg, &options, &DeterministicTextMeasurer::default()).expect("scene ok")
}

#[test]
fn svg_is_well_formed_xml() {
    let mut tree = OrgTree::build(&fixture("basic.json"));
    let scene = scene(&mut tree, SceneOptions::default());
    let svg = render_scene_svg(&scene, &SvgRenderOptions::default(), None);

    let doc = roxmltree::Document::parse(&svg).expect("svg parses");
    let root = doc.root_element();
    assert_eq!(root.tag_name().name(), "svg");
    let circles = doc
        .descendants()
        .filter(|n| n.has_tag_name("circle"))
        .count();
    assert_eq!(circles, 9);
    let paths = doc.descendants().filter(|n| n.has_tag_name("path")).count();
    assert_eq!(paths, 8);
    let dashed = doc
        .descendants()
        .filter(|n| n.attribute("class").is_some_and(|c| c.contains("connector-dashed")))
        .count();
    assert_eq!(dashed, 1);
}

#[test]
fn viewbox_is_bounds_plus_padding() {
    let mut tree = OrgTree::build(&fixture("basic.json"));
    let scene = scene(&mut tree, SceneOptions::default());
    let b = scene.bounds.unwrap().padded(50.0);
    let svg = render_scene_svg(&scene, &SvgRenderOptions::default(), None);
    let doc = roxmltree::Document::parse(&svg).unwrap();
    let vb: Vec<f64> = doc
        .root_element()
        .attribute("viewBox")
        .unwrap()
        .split_whitespace()
        .map(|v| v.parse().unwrap())
        .collect();
    assert!((vb[0] - b.min_x).abs() < 1e-6);
    assert!((vb[1] - b.min_y).abs() < 1e-6);
    assert!((vb[2] - b.width()).abs() < 1e-6);
    assert!((vb[3] - b.height()).abs() < 1e-6);
}

#[test]
fn names_are_escaped() {
    let doc = Document::from_json_str(
        r#"{"R&D <Lab>":{"level":1,"position":"\"Head\""},"O'Neil":{"level":2,"under":"R&D <Lab>"}}"#,
    )
    .unwrap();
    let mut tree = OrgTree::build(&doc);
    let scene = scene(&mut tree, SceneOptions::default());
    let svg = render_scene_svg(&scene, &SvgRenderOptions::default(), None);
    assert!(svg.contains("R&amp;D &lt;Lab&gt;"));

    let parsed = roxmltree::Document::parse(&svg).expect("svg parses");
    let names: Vec<_> = parsed
        .descendants()
        .filter(|n| n.attribute("class") == Some("node-text"))
        .filter_map(|n| n.text())
        .collect();
    assert_eq!(names, ["R&D <Lab>", "O'Neil"]);
}

#[test]
fn diff_and_search_classes_reach_the_markup() {
    let base = fixture("basic.json");
    let target = fixture("reorg.json");
    let mut tree = OrgTree::build(&target);
    tree.apply_diff(&diff(&base, &target));
    let scene = scene(
        &mut tree,
        SceneOptions {
            diff_mode: true,
            ..Default::default()
        },
    );
    let search = scene.search("lead");
    let svg = render_scene_svg(&scene, &SvgRenderOptions::default(), Some(&search));
    let doc = roxmltree::Document::parse(&svg).unwrap();

    let class_of = |name: &str| {
        doc.descendants()
            .find(|n| n.attribute("data-name") == Some(name))
            .and_then(|n| n.attribute("class"))
            .unwrap()
            .to_string()
    };
    assert!(class_of("Data Lead").contains("diff-new"));
    assert!(class_of("Data Lead").contains("search-highlight"));
    assert!(class_of("QA Lead").contains("diff-demoted"));
    assert!(class_of("CFO").contains("search-faded"));
    assert!(!class_of("CFO").contains("diff-"));
}

#[test]
fn live_transform_is_applied_to_viewport_group() {
    let mut tree = OrgTree::build(&fixture("basic.json"));
    let scene = scene(&mut tree, SceneOptions::default());
    let mut view = ViewportTransform::default();
    view.fit(&scene.bounds.unwrap(), 800.0, 600.0);
    let options = SvgRenderOptions {
        transform: Some(view.transform()),
        viewport_size: Some((800.0, 600.0)),
        ..Default::default()
    };
    let svg = render_scene_svg(&scene, &options, None);
    let doc = roxmltree::Document::parse(&svg).unwrap();
    assert_eq!(doc.root_element().attribute("viewBox"), Some("0 0 800 600"));
    let group = doc
        .descendants()
        .find(|n| n.attribute("class") == Some("viewport"))
        .unwrap();
    assert_eq!(
        group.attribute("transform"),
        Some(view.transform().to_svg_transform().as_str())
    );
}
