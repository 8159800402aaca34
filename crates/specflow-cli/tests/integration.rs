use assert_cmd::Command;
use predicates::prelude::*;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn specflow(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("specflow").unwrap();
    cmd.current_dir(dir.path())
        .env("SPECFLOW_ROOT", dir.path())
        .env_remove("SPECIFY_FEATURE")
        .env_remove("RUST_LOG");
    cmd
}

fn init_project(dir: &TempDir) {
    specflow(dir).arg("init").assert().success();
}

fn feature_dir(dir: &TempDir, name: &str) -> PathBuf {
    dir.path().join("specs").join(name)
}

fn write(path: &Path, text: &str) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, text).unwrap();
}

fn git_available() -> bool {
    which::which("git").is_ok()
}

fn git(dir: &Path, args: &[&str]) {
    let status = std::process::Command::new("git")
        .args(["-c", "user.email=test@example.com", "-c", "user.name=Test"])
        .args(args)
        .current_dir(dir)
        .output()
        .unwrap();
    assert!(status.status.success(), "git {args:?} failed: {status:?}");
}

fn git_project() -> TempDir {
    let dir = TempDir::new().unwrap();
    git(dir.path(), &["init", "-q"]);
    git(dir.path(), &["symbolic-ref", "HEAD", "refs/heads/main"]);
    std::fs::write(dir.path().join("README.md"), "# demo\n").unwrap();
    git(dir.path(), &["add", "README.md"]);
    git(dir.path(), &["commit", "-q", "-m", "init"]);
    dir
}

const PLAN: &str = "\
# Implementation Plan: Add OAuth login

## Technical Context

**Language/Version**: Rust 1.80
**Primary Dependencies**: axum
**Storage**: PostgreSQL
**Testing**: cargo test
**Project Type**: web application

More planning prose so this file is comfortably above the stub threshold.
More planning prose so this file is comfortably above the stub threshold.
More planning prose so this file is comfortably above the stub threshold.
";

const TASKS: &str = "\
# Tasks

## Phase 1: Setup

- [ ] T001 Create project skeleton
- [ ] T002 [P] Add CI workflow

## Phase 2: User Story 1

- [ ] T003 [P] [US1] Login handler (depends on T001)
";

/// Author edits to the generated spec so it no longer reads as a stub.
fn fill_spec(dir: &TempDir) {
    let path = feature_dir(dir, "001-add-oauth-login").join("spec.md");
    let spec = std::fs::read_to_string(&path).unwrap();
    std::fs::write(&path, spec.replace("[Brief Title]", "Sign in with Google")).unwrap();
}

/// Non-git project with one feature whose spec exists.
fn project_with_feature() -> TempDir {
    let dir = TempDir::new().unwrap();
    init_project(&dir);
    specflow(&dir)
        .args(["feature", "create", "Add", "OAuth", "login"])
        .assert()
        .success();
    dir
}

// ---------------------------------------------------------------------------
// specflow init
// ---------------------------------------------------------------------------

#[test]
fn init_creates_layout() {
    let dir = TempDir::new().unwrap();
    specflow(&dir).arg("init").assert().success();

    assert!(dir.path().join(".specify/config.yaml").is_file());
    assert!(dir.path().join("specs").is_dir());
    for name in [
        "spec-template.md",
        "plan-template.md",
        "tasks-template.md",
        "agent-file-template.md",
    ] {
        assert!(
            dir.path().join(".specify/templates").join(name).is_file(),
            "{name} missing"
        );
    }
}

#[test]
fn init_is_idempotent_and_keeps_edited_templates() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);
    let template = dir.path().join(".specify/templates/spec-template.md");
    std::fs::write(&template, "# Custom [FEATURE NAME]\n").unwrap();

    specflow(&dir)
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("exists:"));

    assert_eq!(
        std::fs::read_to_string(&template).unwrap(),
        "# Custom [FEATURE NAME]\n"
    );
}

#[test]
fn commands_outside_a_repository_fail() {
    let dir = TempDir::new().unwrap();
    specflow(&dir)
        .arg("paths")
        .assert()
        .failure()
        .stderr(predicate::str::contains("error:"));
}

// ---------------------------------------------------------------------------
// specflow feature
// ---------------------------------------------------------------------------

#[test]
fn feature_create_without_git_writes_spec() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);

    specflow(&dir)
        .args(["feature", "create", "Add", "OAuth", "login", "flow"])
        .assert()
        .success()
        .stdout(predicate::str::contains("BRANCH_NAME: 001-add-oauth-login"))
        .stdout(predicate::str::contains("FEATURE_NUM: 001"))
        .stdout(predicate::str::contains("no branch created"));

    let spec = std::fs::read_to_string(feature_dir(&dir, "001-add-oauth-login").join("spec.md")).unwrap();
    assert!(spec.contains("001-add-oauth-login"));
    assert!(spec.contains("Add OAuth login flow"));
    assert!(!spec.contains("[FEATURE NAME]"));
}

#[test]
fn feature_numbers_continue_after_highest_directory() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);
    std::fs::create_dir_all(feature_dir(&dir, "007-legacy")).unwrap();

    specflow(&dir)
        .args(["feature", "next-number"])
        .assert()
        .success()
        .stdout("008\n");

    specflow(&dir)
        .args(["--json", "feature", "create", "search", "index"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"BRANCH_NAME\": \"008-search-index\""));
}

#[test]
fn feature_create_rejects_empty_slug() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);
    specflow(&dir)
        .args(["feature", "create", "!!!"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("empty slug"));
    let dirs = std::fs::read_dir(dir.path().join("specs"))
        .unwrap()
        .filter(|e| e.as_ref().unwrap().path().is_dir())
        .count();
    assert_eq!(dirs, 0);
}

#[test]
fn feature_list_shows_artifact_presence() {
    let dir = project_with_feature();
    specflow(&dir)
        .args(["feature", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("yes").not());

    fill_spec(&dir);
    specflow(&dir)
        .args(["feature", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("001-add-oauth-login"))
        .stdout(predicate::str::contains("yes"));
}

#[test]
fn feature_list_on_empty_specs_root() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);
    specflow(&dir)
        .args(["feature", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No features"));
}

// ---------------------------------------------------------------------------
// specflow paths / check
// ---------------------------------------------------------------------------

#[test]
fn paths_without_git_needs_an_override() {
    let dir = project_with_feature();

    specflow(&dir)
        .arg("paths")
        .assert()
        .failure()
        .stderr(predicate::str::contains("no active feature"));

    specflow(&dir)
        .args(["--feature", "001", "paths"])
        .assert()
        .success()
        .stdout(predicate::str::contains("FEATURE: 001-add-oauth-login"))
        .stdout(predicate::str::contains("HAS_GIT: false"));
}

#[test]
fn feature_env_var_selects_feature() {
    let dir = project_with_feature();
    specflow(&dir)
        .env("SPECIFY_FEATURE", "001-add-oauth-login")
        .args(["--json", "paths"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"source\": \"override\""));
}

#[test]
fn check_blocks_tasks_phase_without_plan() {
    let dir = project_with_feature();

    specflow(&dir)
        .args(["--feature", "001", "check", "plan"])
        .assert()
        .code(1)
        .stdout(predicate::str::contains("plan: blocked (missing: spec)"));

    fill_spec(&dir);
    specflow(&dir)
        .args(["--feature", "001", "check", "plan"])
        .assert()
        .success()
        .stdout(predicate::str::contains("plan: allowed"));

    specflow(&dir)
        .args(["--feature", "001", "check", "tasks"])
        .assert()
        .code(1)
        .stdout(predicate::str::contains("tasks: blocked (missing: plan)"))
        .stderr(predicate::str::contains("is blocked"));
}

#[test]
fn check_rejects_unknown_phase() {
    let dir = project_with_feature();
    specflow(&dir)
        .args(["--feature", "001", "check", "deploy"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid phase"));
}

#[test]
fn check_treats_tiny_spec_as_missing() {
    let dir = project_with_feature();
    std::fs::write(feature_dir(&dir, "001-add-oauth-login").join("spec.md"), "# TBD\n").unwrap();

    specflow(&dir)
        .args(["--feature", "001", "check", "plan"])
        .assert()
        .code(1)
        .stdout(predicate::str::contains("missing: spec"));
}

// ---------------------------------------------------------------------------
// specflow artifact
// ---------------------------------------------------------------------------

#[test]
fn artifact_init_respects_the_gate() {
    let dir = project_with_feature();
    let tasks = feature_dir(&dir, "001-add-oauth-login").join("tasks.md");

    specflow(&dir)
        .args(["--feature", "001", "artifact", "init", "tasks"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("use --force"));
    assert!(!tasks.exists());

    fill_spec(&dir);
    specflow(&dir)
        .args(["--feature", "001", "artifact", "init", "plan"])
        .assert()
        .success()
        .stdout(predicate::str::contains("created:"));

    // The plan is still the bare template.
    specflow(&dir)
        .args(["--feature", "001", "artifact", "init", "tasks"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("missing: plan"));

    write(&feature_dir(&dir, "001-add-oauth-login").join("plan.md"), PLAN);
    specflow(&dir)
        .args(["--feature", "001", "artifact", "init", "tasks"])
        .assert()
        .success();
    assert!(tasks.is_file());
}

#[test]
fn artifact_init_never_overwrites() {
    let dir = project_with_feature();
    let spec = feature_dir(&dir, "001-add-oauth-login").join("spec.md");
    let before = std::fs::read_to_string(&spec).unwrap();

    specflow(&dir)
        .args(["--feature", "001", "artifact", "init", "spec"])
        .assert()
        .success()
        .stdout(predicate::str::contains("exists:"));
    assert_eq!(std::fs::read_to_string(&spec).unwrap(), before);
}

#[test]
fn artifact_list_reports_contracts_dir() {
    let dir = project_with_feature();
    std::fs::create_dir_all(feature_dir(&dir, "001-add-oauth-login").join("contracts")).unwrap();

    specflow(&dir)
        .args(["--feature", "001", "artifact", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("contracts-dir"));
}

// ---------------------------------------------------------------------------
// specflow task
// ---------------------------------------------------------------------------

fn project_with_tasks() -> TempDir {
    let dir = project_with_feature();
    write(&feature_dir(&dir, "001-add-oauth-login").join("tasks.md"), TASKS);
    dir
}

#[test]
fn task_list_and_next() {
    let dir = project_with_tasks();

    specflow(&dir)
        .args(["--feature", "001", "task", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("T003"))
        .stdout(predicate::str::contains("US1"))
        .stdout(predicate::str::contains("0/3 done"));

    specflow(&dir)
        .args(["--feature", "001", "task", "next"])
        .assert()
        .success()
        .stdout(predicate::str::contains("T001"));
}

#[test]
fn task_list_filters_by_tag() {
    let dir = project_with_tasks();
    specflow(&dir)
        .args(["--feature", "001", "task", "list", "--tag", "P"])
        .assert()
        .success()
        .stdout(predicate::str::contains("T002"))
        .stdout(predicate::str::contains("T003"))
        .stdout(predicate::str::contains("Create project skeleton").not());
}

#[test]
fn task_done_rewrites_only_the_checkbox() {
    let dir = project_with_tasks();
    let path = feature_dir(&dir, "001-add-oauth-login").join("tasks.md");

    specflow(&dir)
        .args(["--feature", "001", "task", "done", "T002"])
        .assert()
        .success();

    let after = std::fs::read_to_string(&path).unwrap();
    assert_eq!(
        after,
        TASKS.replace("- [ ] T002 [P] Add CI workflow", "- [x] T002 [P] Add CI workflow")
    );

    specflow(&dir)
        .args(["--feature", "001", "task", "undo", "T002"])
        .assert()
        .success();
    assert_eq!(std::fs::read_to_string(&path).unwrap(), TASKS);
}

#[test]
fn task_done_unknown_id_fails() {
    let dir = project_with_tasks();
    specflow(&dir)
        .args(["--feature", "001", "task", "done", "T999"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("task not found: T999"));
}

#[test]
fn task_validate_reports_duplicates() {
    let dir = project_with_feature();
    write(
        &feature_dir(&dir, "001-add-oauth-login").join("tasks.md"),
        "- [ ] T001 First\n- [ ] T001 Again\n",
    );

    specflow(&dir)
        .args(["--feature", "001", "task", "validate"])
        .assert()
        .code(1)
        .stdout(predicate::str::contains("T001"));
}

#[test]
fn task_commands_without_tasks_file_explain() {
    let dir = project_with_feature();
    specflow(&dir)
        .args(["--feature", "001", "task", "list"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no tasks.md"));
}

// ---------------------------------------------------------------------------
// specflow agent
// ---------------------------------------------------------------------------

#[test]
fn agent_sync_creates_default_files() {
    let dir = project_with_feature();
    write(&feature_dir(&dir, "001-add-oauth-login").join("plan.md"), PLAN);

    specflow(&dir)
        .args(["--feature", "001", "agent", "sync"])
        .assert()
        .success()
        .stdout(predicate::str::contains("created"));

    let agents = std::fs::read_to_string(dir.path().join("AGENTS.md")).unwrap();
    assert!(agents.contains("Rust 1.80 + axum (001-add-oauth-login)"));
    assert!(agents.contains("PostgreSQL (001-add-oauth-login)"));
    assert!(dir.path().join("CLAUDE.md").is_file());
}

#[test]
fn agent_sync_twice_is_unchanged_and_keeps_manual_notes() {
    let dir = project_with_feature();
    write(&feature_dir(&dir, "001-add-oauth-login").join("plan.md"), PLAN);
    specflow(&dir)
        .args(["--feature", "001", "agent", "sync", "agents"])
        .assert()
        .success();

    let path = dir.path().join("AGENTS.md");
    let first = std::fs::read_to_string(&path).unwrap();
    let marker = "<!-- MANUAL ADDITIONS START -->";
    let edited = first.replacen(marker, &format!("{marker}\nKeep me."), 1);
    assert_ne!(edited, first, "manual region marker missing from generated file");
    std::fs::write(&path, &edited).unwrap();

    specflow(&dir)
        .args(["--feature", "001", "agent", "sync", "agents"])
        .assert()
        .success()
        .stdout(predicate::str::contains("unchanged"));
    assert_eq!(std::fs::read_to_string(&path).unwrap(), edited);
}

#[test]
fn agent_sync_rejects_unknown_agent() {
    let dir = project_with_feature();
    write(&feature_dir(&dir, "001-add-oauth-login").join("plan.md"), PLAN);
    specflow(&dir)
        .args(["--feature", "001", "agent", "sync", "nope"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown agent: nope"));
}

#[test]
fn agent_sync_without_plan_fails() {
    let dir = project_with_feature();
    specflow(&dir)
        .args(["--feature", "001", "agent", "sync"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no plan.md"));
    assert!(!dir.path().join("AGENTS.md").exists());
}

#[test]
fn agent_list_marks_canonical() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);
    specflow(&dir)
        .args(["agent", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("agents *"))
        .stdout(predicate::str::contains("CLAUDE.md"));
}

// ---------------------------------------------------------------------------
// specflow config
// ---------------------------------------------------------------------------

#[test]
fn config_show_and_validate_defaults() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);

    specflow(&dir)
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("specs_dir: specs"));

    specflow(&dir)
        .args(["config", "validate"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Config is valid"));
}

#[test]
fn config_validate_flags_unknown_canonical_agent() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);
    std::fs::write(
        dir.path().join(".specify/config.yaml"),
        "canonical_agent: nobody\n",
    )
    .unwrap();

    specflow(&dir)
        .args(["config", "validate"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("[error]"));
}

#[test]
fn custom_specs_dir_is_honoured() {
    let dir = TempDir::new().unwrap();
    write(&dir.path().join(".specify/config.yaml"), "specs_dir: docs/features\n");
    init_project(&dir);

    specflow(&dir)
        .args(["feature", "create", "tidy", "up"])
        .assert()
        .success();
    assert!(dir.path().join("docs/features/001-tidy-up/spec.md").is_file());
}

// ---------------------------------------------------------------------------
// git-backed flows
// ---------------------------------------------------------------------------

#[test]
fn feature_create_in_git_checks_out_branch() {
    if !git_available() {
        return;
    }
    let dir = git_project();
    init_project(&dir);

    specflow(&dir)
        .args(["feature", "create", "Add", "OAuth", "login"])
        .assert()
        .success()
        .stdout(predicate::str::contains("BRANCH_NAME: 001-add-oauth-login"));

    specflow(&dir)
        .arg("paths")
        .assert()
        .success()
        .stdout(predicate::str::contains("CURRENT_BRANCH: 001-add-oauth-login"))
        .stdout(predicate::str::contains("HAS_GIT: true"));

    specflow(&dir)
        .args(["check", "plan"])
        .assert()
        .code(1)
        .stdout(predicate::str::contains("missing: spec"));
}

#[test]
fn feature_numbers_account_for_branches() {
    if !git_available() {
        return;
    }
    let dir = git_project();
    init_project(&dir);
    git(dir.path(), &["branch", "012-elsewhere"]);

    specflow(&dir)
        .args(["feature", "next-number"])
        .assert()
        .success()
        .stdout("013\n");
}

#[test]
fn non_feature_branch_is_reported() {
    if !git_available() {
        return;
    }
    let dir = git_project();
    init_project(&dir);

    specflow(&dir)
        .arg("paths")
        .assert()
        .failure()
        .stderr(predicate::str::contains("main"));
}
