use std::path::{Path, PathBuf};
use std::process::Command;

use assert_cmd::prelude::*;
use predicates::prelude::*;
use tempfile::TempDir;

const TRANSACTIONS: &str = "\
code,description,origin,weight_kg,value
02011000,Beef carcass,Australia,1000,5000
02023000,Frozen boneless beef,New Zealand,500,3000
03024100,Atlantic salmon,Norway,50,700
16023200,Chicken nuggets,Australia,20,200
87032100,Motor car,Japan,1200,9000
";

const LOOKUP: &str = "\
code_group,category_label
0201,\"Meat of bovine animals, fresh or chilled\"
0302,\"Fish, fresh or chilled\"
";

/// Fixture files in a scratch directory, plus an empty settings file so
/// runs never read the user's own configuration.
struct Env {
    _tmp: TempDir,
    root: PathBuf,
}

impl Env {
    fn new() -> Self {
        Self::with_transactions(TRANSACTIONS)
    }

    fn with_transactions(transactions: &str) -> Self {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().to_path_buf();
        std::fs::write(root.join("tx.csv"), transactions).unwrap();
        std::fs::write(root.join("lookup.csv"), LOOKUP).unwrap();
        std::fs::write(root.join("settings.json"), "{}").unwrap();
        Self { _tmp: tmp, root }
    }

    fn path(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    fn lading(&self) -> Command {
        let mut cmd = Command::cargo_bin("lading").unwrap();
        cmd.env("NO_COLOR", "1")
            .env_remove("RUST_LOG")
            .arg("--config")
            .arg(self.path("settings.json"));
        cmd
    }

    fn with_inputs(&self, args: &[&str]) -> Command {
        let mut cmd = self.lading();
        cmd.args(args)
            .arg("--transactions")
            .arg(self.path("tx.csv"))
            .arg("--lookup")
            .arg(self.path("lookup.csv"));
        cmd
    }
}

fn read(path: &Path) -> String {
    std::fs::read_to_string(path).unwrap()
}

#[test]
fn test_report_text_lists_origins_and_classes() {
    let env = Env::new();
    env.with_inputs(&["report"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Import Report"))
        .stdout(predicate::str::contains("Australia"))
        .stdout(predicate::str::contains("Cattle"))
        .stdout(predicate::str::contains("Unclassified"));
}

#[test]
fn test_report_json_totals() {
    let env = Env::new();
    let output = env.with_inputs(&["report", "--format", "json"]).output().unwrap();
    assert!(output.status.success());

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let origin = &report["by_origin"];
    assert_eq!(origin["total_value"].as_f64(), Some(17900.0));
    assert_eq!(origin["total_count"].as_u64(), Some(5));
    assert_eq!(origin["groups"][0]["name"]["name"], "Japan");

    let class = &report["by_classification"];
    let cattle = class["groups"]
        .as_array()
        .unwrap()
        .iter()
        .find(|g| g["name"]["name"] == "Cattle")
        .unwrap();
    assert_eq!(cattle["value"].as_f64(), Some(8000.0));
    assert_eq!(cattle["count"].as_u64(), Some(2));
    assert_eq!(report["quality"]["unclassified"].as_u64(), Some(1));
}

#[test]
fn test_report_writes_text_file() {
    let env = Env::new();
    let out = env.path("out/report.txt");
    env.with_inputs(&["report", "-o", out.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("Wrote"));
    assert!(read(&out).contains("Imports by Origin"));
}

#[test]
fn test_summary_by_classification_within() {
    let env = Env::new();
    env.with_inputs(&["summary", "--by", "origin", "--within", "Cattle", "--chart"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Cattle by Origin"))
        .stdout(predicate::str::contains("New Zealand"))
        .stdout(predicate::str::contains("Norway").not());
}

#[test]
fn test_summary_rejects_unknown_grouping() {
    let env = Env::new();
    env.with_inputs(&["summary", "--by", "colour"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error:"));
}

#[test]
fn test_classify_writes_enriched_csv() {
    let env = Env::new();
    let out = env.path("enriched.csv");
    env.with_inputs(&["classify", "-o", out.to_str().unwrap()])
        .assert()
        .success();

    let text = read(&out);
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 6);
    assert!(lines[0].ends_with("category_label,classification"));
    assert!(lines[1].ends_with("\"Meat of bovine animals, fresh or chilled\",Cattle"));
    assert!(lines[2].ends_with(",Cattle"));
    assert!(lines[4].ends_with(",Poultry"));
    assert!(lines[5].ends_with(",,"));
}

#[test]
fn test_unmatched_lists_gap_groups() {
    let env = Env::new();
    env.with_inputs(&["unmatched"])
        .assert()
        .success()
        .stdout(predicate::str::contains("0202"))
        .stdout(predicate::str::contains("8703"))
        .stdout(predicate::str::contains("Motor car"));
}

#[test]
fn test_rules_list_with_hits() {
    let env = Env::new();
    env.with_inputs(&["rules", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("first match wins"))
        .stdout(predicate::str::contains("Hits"))
        .stdout(predicate::str::contains("Processed Meat"));
}

#[test]
fn test_rules_export_then_reload() {
    let env = Env::new();
    let rules = env.path("rules.json");
    env.lading()
        .args(["rules", "export", rules.to_str().unwrap()])
        .assert()
        .success();
    assert!(read(&rules).contains("\"kind\": \"code_in\""));

    env.with_inputs(&["summary", "--by", "classification", "--rules", rules.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("Fish"));
}

#[test]
fn test_missing_column_is_an_error() {
    let env = Env::with_transactions("code,description,origin,weight_kg\n02011000,Beef,USA,1\n");
    env.with_inputs(&["report"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("missing required column 'value'"));
}

#[test]
fn test_negative_value_is_an_error() {
    let env = Env::with_transactions("code,description,origin,weight_kg,value\n02011000,Beef,USA,1,-5\n");
    env.with_inputs(&["summary"]).assert().failure();
}

#[test]
fn test_unreadable_transactions_file_is_named() {
    let env = Env::new();
    env.lading()
        .arg("report")
        .arg("--transactions")
        .arg(env.path("imports_2023.csv"))
        .arg("--lookup")
        .arg(env.path("lookup.csv"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("imports_2023.csv"));
}

#[test]
fn test_missing_inputs_explains_how_to_fix() {
    let env = Env::new();
    env.lading()
        .arg("report")
        .assert()
        .failure()
        .stderr(predicate::str::contains("--transactions"));
}

#[test]
fn test_init_writes_settings() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("lading/settings.json");
    Command::cargo_bin("lading")
        .unwrap()
        .args(["--config", path.to_str().unwrap(), "init"])
        .assert()
        .success();
    let settings: serde_json::Value = serde_json::from_str(&read(&path)).unwrap();
    assert_eq!(settings["currency_symbol"], "$");

    Command::cargo_bin("lading")
        .unwrap()
        .args(["--config", path.to_str().unwrap(), "init"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--force"));
}

#[test]
fn test_completions() {
    Command::cargo_bin("lading")
        .unwrap()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("lading"));
}
