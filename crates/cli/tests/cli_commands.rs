use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use std::fs;
use tempfile::tempdir;

#[allow(deprecated)]
fn nexus() -> Command {
    let mut cmd = Command::cargo_bin("nexus").expect("binary");
    for var in [
        "NEXUS_API_KEY",
        "GEMINI_API_KEY",
        "API_KEY",
        "NEXUS_SEMANTIC_MODE",
        "NEXUS_MERGE_POLICY",
        "NEXUS_DEBOUNCE_MS",
    ] {
        cmd.env_remove(var);
    }
    cmd
}

fn run_json(args: &[&str]) -> Value {
    let output = nexus().args(args).output().expect("command run");
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).expect("valid json")
}

fn ids(tools: &Value) -> Vec<String> {
    tools
        .as_array()
        .expect("tool array")
        .iter()
        .map(|tool| tool["id"].as_str().unwrap().to_string())
        .collect()
}

#[test]
fn lexical_search_filters_by_query_and_category() {
    let body = run_json(&["search", "design", "--semantic", "off", "--json"]);
    assert_eq!(ids(&body["tools"]), vec!["2", "8"]);
    assert_eq!(body["source"], "lexical");
    assert_eq!(body["semantic"], "skipped");

    let body = run_json(&[
        "search", "ai", "--category", "ai", "--semantic", "off", "--json",
    ]);
    assert_eq!(ids(&body["tools"]), vec!["1", "5", "14"]);
    assert_eq!(body["category"], "Artificial Intelligence");
}

#[test]
fn blank_search_lists_the_whole_catalog() {
    let body = run_json(&["search", "--semantic", "off", "--json"]);
    assert_eq!(body["tools"].as_array().unwrap().len(), 15);
}

#[test]
fn stub_matcher_finds_tools_the_substring_filter_misses() {
    let body = run_json(&["search", "make a poster", "--semantic", "stub", "--json"]);
    assert_eq!(ids(&body["tools"]), vec!["8"]);
    assert_eq!(body["source"], "semantic");
    assert_eq!(body["matcher"], "stub");
}

#[test]
fn keyless_default_search_stays_lexical() {
    let body = run_json(&["search", "design tools", "--json"]);
    assert!(body["tools"].as_array().unwrap().is_empty());
    assert_eq!(body["source"], "lexical");
    assert_eq!(body["semantic"], "skipped");
    assert!(body.get("matcher").is_none());
}

#[test]
fn configured_lexical_policy_is_respected() {
    let temp = tempdir().unwrap();
    let path = temp.path().join("nexus.toml");
    fs::write(&path, "[pipeline]\nmerge_policy = \"lexical_only\"\n").unwrap();

    let output = nexus()
        .env("NEXUS_SEMANTIC_MODE", "stub")
        .args(["--config", path.to_str().unwrap(), "search", "make a poster", "--json"])
        .output()
        .expect("command run");
    assert!(output.status.success());
    let body: Value = serde_json::from_slice(&output.stdout).expect("valid json");
    assert!(body["tools"].as_array().unwrap().is_empty());
    assert_eq!(body["source"], "lexical");
    assert_eq!(body["semantic"], "skipped");
}

#[test]
fn unknown_category_is_rejected() {
    nexus()
        .args(["search", "x", "--category", "Gaming"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Gaming"));
}

#[test]
fn gemini_without_key_is_a_config_error() {
    nexus()
        .args(["search", "notes", "--semantic", "gemini"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("API key"));
}

#[test]
fn categories_are_grouped_alphabetically() {
    let body = run_json(&["categories", "--json"]);
    let labels: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|group| group["category"].as_str().unwrap())
        .collect();
    assert_eq!(
        labels,
        vec![
            "Artificial Intelligence",
            "Design",
            "Development",
            "Marketing",
            "Productivity",
            "Utilities"
        ]
    );
    let total: u64 = body
        .as_array()
        .unwrap()
        .iter()
        .map(|group| group["count"].as_u64().unwrap())
        .sum();
    assert_eq!(total, 15);
}

#[test]
fn featured_lists_flagged_tools() {
    let body = run_json(&["featured", "--json"]);
    assert_eq!(ids(&body), vec!["1", "2", "5"]);

    nexus()
        .arg("featured")
        .assert()
        .success()
        .stdout(predicate::str::contains("Midjourney"));
}

#[test]
fn custom_catalog_file_is_used() {
    let temp = tempdir().unwrap();
    let path = temp.path().join("tools.json");
    fs::write(
        &path,
        r#"[
            {"id": "a", "name": "Alpha Notes", "description": "Notes", "url": "https://a.example", "category": "Productivity"},
            {"id": "b", "name": "Beta Paint", "description": "Paint", "url": "https://b.example", "category": "Design", "featured": true}
        ]"#,
    )
    .unwrap();

    let body = run_json(&[
        "--catalog",
        path.to_str().unwrap(),
        "search",
        "notes",
        "--semantic",
        "off",
        "--json",
    ]);
    assert_eq!(ids(&body["tools"]), vec!["a"]);
}

#[test]
fn config_file_errors_are_reported() {
    let temp = tempdir().unwrap();
    let path = temp.path().join("nexus.toml");
    fs::write(&path, "[pipeline]\ndebounce = 10\n").unwrap();

    nexus()
        .args(["--config", path.to_str().unwrap(), "search", "x"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to load config"));
}

#[test]
fn replay_collapses_bursts_and_reports_the_final_state() {
    let temp = tempdir().unwrap();
    let script = temp.path().join("script.json");
    fs::write(
        &script,
        r#"[
            {"query": "f"},
            {"after_ms": 20, "query": "fi"},
            {"after_ms": 20, "query": "fig"},
            {"after_ms": 20, "category": "Design", "select": "8"}
        ]"#,
    )
    .unwrap();

    let output = nexus()
        .env("NEXUS_DEBOUNCE_MS", "1000")
        .args(["replay", script.to_str().unwrap(), "--semantic", "off", "--json"])
        .output()
        .expect("command run");
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let lines: Vec<Value> = String::from_utf8_lossy(&output.stdout)
        .lines()
        .map(|line| serde_json::from_str(line).expect("json line"))
        .collect();
    let last = lines.last().unwrap();
    assert_eq!(last["event"], "final");
    assert_eq!(last["state"]["query"], "fig");
    assert_eq!(last["state"]["category"], "Design");
    assert_eq!(ids(&last["tools"]), vec!["2"]);
    assert_eq!(last["selected"], "8");
    assert_eq!(last["health"]["epoch"], 4);
    assert_eq!(last["health"]["passes"], 1);

    let updates: Vec<&Value> = lines.iter().filter(|line| line["event"] == "update").collect();
    assert_eq!(updates.len(), 1);
    assert_eq!(updates[0]["update"]["epoch"], 4);
}
