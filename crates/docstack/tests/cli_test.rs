#![allow(deprecated)] // TODO: move from cargo_bin to cargo_bin_cmd!

mod common;

use assert_cmd::Command;
use common::{STACK, TestProject};
use predicates::prelude::*;

fn project() -> TestProject {
    let project = TestProject::new();
    project.write_stack(STACK);
    project.write_context(2);
    project
}

#[test]
fn test_cli_help() {
    let mut cmd = Command::cargo_bin("docstack").unwrap();
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("BookStack"))
        .stdout(predicate::str::contains("synth"))
        .stdout(predicate::str::contains("plan"))
        .stdout(predicate::str::contains("names"))
        .stdout(predicate::str::contains("context"));
}

#[test]
fn test_cli_version() {
    let mut cmd = Command::cargo_bin("docstack").unwrap();
    cmd.arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains("docstack"));
}

#[test]
fn test_synth_help() {
    let mut cmd = Command::cargo_bin("docstack").unwrap();
    cmd.args(["synth", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[ENV]"))
        .stdout(predicate::str::contains("--format"))
        .stdout(predicate::str::contains("--all"));
}

#[test]
fn test_invalid_command() {
    let mut cmd = Command::cargo_bin("docstack").unwrap();
    cmd.arg("invalid-command").assert().failure();
}

#[test]
fn test_without_stack_definition() {
    let project = TestProject::new();
    project
        .command()
        .args(["names", "devA"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Stack definition not found"));
}

#[test]
fn test_names_dev() {
    let project = project();
    project
        .command()
        .args(["names", "devA"])
        .assert()
        .success()
        .stdout(predicate::str::contains("devA-docs.wmaug.org"))
        .stdout(predicate::str::contains("https://devA-docs.wmaug.org"))
        .stdout(predicate::str::contains("/devA/BookStack/DB_PASS"))
        .stdout(predicate::str::contains("devABookStackRds"));
}

#[test]
fn test_names_from_env_variable() {
    let project = project();
    project
        .command()
        .args(["names", "--json"])
        .env("DOCSTACK_ENV", "productionA")
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""hostname": "docs.wmaug.org""#));
}

#[test]
fn test_environment_required_when_several_declared() {
    let project = project();
    project
        .command()
        .arg("names")
        .assert()
        .failure()
        .stderr(predicate::str::contains("devA, productionA"));
}

#[test]
fn test_unknown_environment() {
    let project = project();
    project
        .command()
        .args(["synth", "devB"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("devB"));
}

#[test]
fn test_synth_json_to_stdout() {
    let project = project();
    let output = project.command().args(["synth", "devA"]).output().unwrap();
    assert!(output.status.success());

    let template: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(template["AWSTemplateFormatVersion"], "2010-09-09");
    assert_eq!(
        template["Resources"]["ARecord"]["Properties"]["Name"],
        "devA-docs.wmaug.org."
    );
    assert_eq!(
        template["Resources"]["BookStackRds"]["DeletionPolicy"],
        "Delete"
    );
    for output in ["RdsEndpoint", "LoadBalancerDNS", "EcsClusterId"] {
        assert!(template["Outputs"].get(output).is_some(), "missing {output}");
    }
}

#[test]
fn test_synth_yaml() {
    let project = project();
    project
        .command()
        .args(["synth", "devA", "--format", "yaml"])
        .assert()
        .success()
        .stdout(predicate::str::contains("AWSTemplateFormatVersion:"));
}

#[test]
fn test_synth_all_writes_one_template_per_environment() {
    let project = project();
    let out = project.path().join("cdk.out");
    project
        .command()
        .args(["synth", "--all", "--out"])
        .arg(&out)
        .assert()
        .success()
        .stdout(predicate::str::contains("devABookStack"))
        .stdout(predicate::str::contains("productionABookStack"));

    assert!(out.join("devABookStack.template.json").exists());
    assert!(out.join("productionABookStack.template.json").exists());
}

#[test]
fn test_synth_all_needs_out_dir() {
    let project = project();
    project
        .command()
        .args(["synth", "--all"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--out"));
}

#[test]
fn test_synth_aborts_on_missing_secret_version() {
    let project = TestProject::new();
    project.write_stack(STACK);
    project.write_context(1);

    project
        .command()
        .args(["synth", "devA"])
        .assert()
        .failure()
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("/devA/BookStack/DB_PASS"));
}

#[test]
fn test_plan_lists_waves() {
    let project = project();
    project
        .command()
        .args(["plan", "devA"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Plan for devABookStack"))
        .stdout(predicate::str::contains("Wave 0"))
        .stdout(predicate::str::contains("BookStackService"))
        .stdout(predicate::str::contains("waits for:"));
}

#[test]
fn test_context_reports_missing_lookup() {
    let project = TestProject::new();
    project.write_stack(STACK);
    project.write_context(1);

    project
        .command()
        .args(["context", "devA"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("✓ /all/awsAccountNumber"))
        .stdout(predicate::str::contains("✗ /devA/BookStack/DB_PASS"));
}

#[test]
fn test_context_override_flag() {
    let project = project();
    let moved = project.path().join("elsewhere.json");
    std::fs::rename(project.path().join("docstack.context.json"), &moved).unwrap();

    project
        .command()
        .args(["context", "devA", "--context"])
        .arg(&moved)
        .assert()
        .success()
        .stdout(predicate::str::contains("All lookups satisfied"));
}

#[test]
fn test_validate() {
    let project = project();
    project
        .command()
        .arg("validate")
        .assert()
        .success()
        .stdout(predicate::str::contains("Stack definition is valid"))
        .stdout(predicate::str::contains("devABookStack"))
        .stdout(predicate::str::contains("productionABookStack"));
}

#[test]
fn test_validate_without_context_skips_topologies() {
    let project = TestProject::new();
    project.write_stack(STACK);

    project
        .command()
        .arg("validate")
        .assert()
        .success()
        .stdout(predicate::str::contains("Skipping topology checks"));
}

#[test]
fn test_validate_fails_on_corrupt_context() {
    let project = TestProject::new();
    project.write_stack(STACK);
    std::fs::write(project.path().join("docstack.context.json"), "{ not json").unwrap();

    project
        .command()
        .arg("validate")
        .assert()
        .failure()
        .stdout(predicate::str::contains("Skipping topology checks").not())
        .stderr(predicate::str::contains("failed to load lookup context"));
}

#[test]
fn test_validate_fails_on_missing_context_override() {
    let project = TestProject::new();
    project.write_stack(STACK);

    project
        .command()
        .args(["validate", "--context", "missing.json"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("Skipping topology checks").not());
}

#[test]
fn test_validate_rejects_environment_without_health_check() {
    let project = TestProject::new();
    project.write_stack(
        r#"
domain "docs.wmaug.org"
zone "wmaug.org"
image "lscr.io/linuxserver/bookstack:latest"
environment "devA" {
    exposure "public"
    container-port 80
}
"#,
    );

    project
        .command()
        .arg("validate")
        .assert()
        .failure()
        .stderr(predicate::str::contains("health-check"));
}
