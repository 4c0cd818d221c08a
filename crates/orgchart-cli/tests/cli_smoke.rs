use assert_cmd::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

fn repo_root() -> PathBuf {
    let manifest_dir = Path::new(env!("CARGO_MANIFEST_DIR"));
    manifest_dir
        .parent()
        .and_then(|p| p.parent())
        .expect("expected crates/<name> layout")
        .to_path_buf()
}

fn org_fixture(name: &str) -> PathBuf {
    let path = repo_root().join("fixtures").join("org").join(name);
    assert!(path.exists(), "fixture missing: {}", path.display());
    path
}

fn cli() -> Command {
    let mut cmd = Command::new(assert_cmd::cargo_bin!("orgchart-cli"));
    cmd.current_dir(repo_root());
    cmd
}

fn stdout_json(cmd: &mut Command) -> serde_json::Value {
    let out = cmd.assert().success().get_output().stdout.clone();
    serde_json::from_slice(&out).expect("stdout is JSON")
}

#[test]
fn cli_tree_reports_root_and_orphans() {
    let v = stdout_json(cli().args(["tree", org_fixture("orphans.json").to_str().unwrap()]));
    assert_eq!(v["root"], "CEO");
    let orphans: Vec<_> = v["orphans"]
        .as_array()
        .unwrap()
        .iter()
        .map(|o| o.as_str().unwrap())
        .collect();
    assert_eq!(orphans, ["Contractor", "Contractor Assistant"]);
}

#[test]
fn cli_exits_3_without_root() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let doc = tmp.path().join("rootless.json");
    fs::write(&doc, r#"{"A":{"level":2,"under":"B"}}"#).unwrap();
    cli()
        .args(["render", doc.to_str().unwrap()])
        .assert()
        .code(3);
}

#[test]
fn cli_usage_errors_exit_2() {
    cli().args(["diff", "only-one.json"]).assert().code(2);
    cli().args(["render", "--format", "gif"]).assert().code(2);
}

#[test]
fn cli_renders_svg_to_file() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let out = tmp.path().join("chart.svg");
    cli()
        .args([
            "render",
            "--search",
            "lead",
            "--out",
            out.to_str().unwrap(),
            org_fixture("basic.json").to_str().unwrap(),
        ])
        .assert()
        .success();
    let svg = fs::read_to_string(&out).expect("read svg");
    assert!(svg.starts_with("<svg"));
    assert!(svg.contains("search-highlight"));
}

#[test]
fn cli_renders_png_smoke() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let out = tmp.path().join("out.png");
    cli()
        .args([
            "render",
            "--format",
            "png",
            "--compare",
            org_fixture("basic.json").to_str().unwrap(),
            "--out",
            out.to_str().unwrap(),
            org_fixture("reorg.json").to_str().unwrap(),
        ])
        .assert()
        .success();

    let bytes = fs::read(&out).expect("read png");
    let decoder = png::Decoder::new(bytes.as_slice());
    let reader = decoder.read_info().expect("valid png");
    let info = reader.info();
    assert!(info.width > 100 && info.height > 100);
}

#[test]
fn cli_png_default_name_is_timestamped() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let doc = tmp.path().join("basic.json");
    fs::copy(org_fixture("basic.json"), &doc).expect("copy fixture");

    Command::new(assert_cmd::cargo_bin!("orgchart-cli"))
        .current_dir(tmp.path())
        .args(["render", "--format", "png", "basic.json"])
        .assert()
        .success();

    let names: Vec<String> = fs::read_dir(tmp.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .filter(|n| n.ends_with(".png"))
        .collect();
    assert_eq!(names.len(), 1, "{names:?}");
    assert!(names[0].starts_with("org-chart-"), "{}", names[0]);
}

#[test]
fn cli_diff_labels_target() {
    let v = stdout_json(cli().args([
        "diff",
        "--realigned",
        org_fixture("basic.json").to_str().unwrap(),
        org_fixture("reorg.json").to_str().unwrap(),
    ]));
    assert_eq!(v["labels"]["Data Lead"], "new");
    assert_eq!(v["labels"]["QA Lead"], "realigned");
    assert_eq!(v["labels"]["CEO"], serde_json::Value::Null);
    assert_eq!(v["summary"]["promoted"], 1);
    assert_eq!(v["removed"][0], "Office Manager");
}

#[test]
fn cli_search_partitions() {
    let v = stdout_json(cli().args([
        "search",
        "officer",
        org_fixture("basic.json").to_str().unwrap(),
    ]));
    assert_eq!(v["highlighted"].as_array().unwrap().len(), 4);
    assert_eq!(v["faded"].as_array().unwrap().len(), 5);
}

#[test]
fn cli_index_resolves_relative_files() {
    let v = stdout_json(cli().args(["index", org_fixture("index.json").to_str().unwrap()]));
    let first = &v[0];
    assert!(first["location"].as_str().unwrap().starts_with("file://"));
    assert!(first["location"].as_str().unwrap().ends_with("/fixtures/org/basic.json"));
}

#[test]
fn cli_projects_filter_by_department() {
    let projects = repo_root().join("fixtures").join("portal").join("projects.json");
    let v = stdout_json(cli().args([
        "projects",
        "--department",
        "HR",
        projects.to_str().unwrap(),
    ]));
    let list = v["projects"].as_array().unwrap();
    assert_eq!(list.len(), 1);
    assert_eq!(list[0]["name"], "HR Onboarding");
    assert_eq!(list[0]["icon"], "fa-solid fa-people-group");
}

#[test]
fn cli_config_changes_layout() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let cfg = tmp.path().join("chart.yaml");
    fs::write(&cfg, "layout:\n  nodeRadius: 30\n").unwrap();
    let v = stdout_json(cli().args([
        "--config",
        cfg.to_str().unwrap(),
        "layout",
        org_fixture("basic.json").to_str().unwrap(),
    ]));
    assert_eq!(v["nodes"][0]["radius"], 30.0);
}
