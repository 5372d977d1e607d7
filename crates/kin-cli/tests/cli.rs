//! CLI command integration tests.
//! Each test uses a temp directory via KIN_DATA_DIR for full isolation.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn kin_cmd(data_dir: &TempDir) -> Command {
    #[allow(deprecated)]
    let mut cmd = Command::cargo_bin("kin").unwrap();
    cmd.env("KIN_DATA_DIR", data_dir.path());
    cmd.env_remove("KIN_LLM_ENDPOINT");
    cmd.env_remove("KIN_LLM_MODEL");
    cmd
}

fn show_json(dir: &TempDir, user: &str) -> serde_json::Value {
    let output = kin_cmd(dir).args(["show", "--user", user]).output().unwrap();
    assert!(output.status.success());
    serde_json::from_slice(&output.stdout).expect("show should print JSON")
}

#[test]
fn init_then_mood() {
    let dir = TempDir::new().unwrap();
    kin_cmd(&dir)
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("created emotional state for 'default'"));

    kin_cmd(&dir)
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("already exists"));

    kin_cmd(&dir)
        .arg("mood")
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "Feeling neutral and balanced, still getting to know you, and interested",
        ));
}

#[test]
fn mood_without_init_fails() {
    let dir = TempDir::new().unwrap();
    kin_cmd(&dir)
        .args(["mood", "--user", "nobody"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("kin init"));
}

#[test]
fn feel_moves_mood_and_records_history() {
    let dir = TempDir::new().unwrap();
    kin_cmd(&dir)
        .args(["feel", "joy", "1.0", "--trigger", "good news"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Feeling positive"));

    let state = show_json(&dir, "default");
    assert!((state["valence"].as_f64().unwrap() - 0.35).abs() < 1e-9);
    assert!((state["arousal"].as_f64().unwrap() - 0.4).abs() < 1e-9);
    let recent = state["recentEmotions"].as_array().unwrap();
    assert_eq!(recent.len(), 2);
    assert_eq!(recent[0]["label"], "joy");
    assert_eq!(recent[0]["trigger"], "good news");
}

#[test]
fn feel_unknown_label_notes_it() {
    let dir = TempDir::new().unwrap();
    kin_cmd(&dir)
        .args(["feel", "zorp", "0.5"])
        .assert()
        .success()
        .stderr(predicate::str::contains("no effect entry"));

    let state = show_json(&dir, "default");
    assert_eq!(state["recentEmotions"][0]["label"], "zorp");
    assert!((state["valence"].as_f64().unwrap() - 0.2).abs() < 1e-9);
}

#[test]
fn feel_records_label_verbatim() {
    let dir = TempDir::new().unwrap();
    kin_cmd(&dir).args(["feel", "Joy", "1.0"]).assert().success();

    let state = show_json(&dir, "default");
    assert_eq!(state["recentEmotions"][0]["label"], "Joy");
    assert!((state["valence"].as_f64().unwrap() - 0.35).abs() < 1e-9);
}

#[test]
fn config_effect_override_applies() {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("config.toml"),
        "[effects.zorp]\nvalence = 0.5\n",
    )
    .unwrap();

    kin_cmd(&dir).args(["feel", "zorp", "1.0"]).assert().success();
    let state = show_json(&dir, "default");
    assert!((state["valence"].as_f64().unwrap() - 0.7).abs() < 1e-9);
}

#[test]
fn decay_user_and_all() {
    let dir = TempDir::new().unwrap();
    for user in ["ada", "bob"] {
        kin_cmd(&dir)
            .args(["feel", "joy", "1.0", "--user", user])
            .assert()
            .success();
    }

    kin_cmd(&dir)
        .args(["decay", "--user", "ada"])
        .assert()
        .success();
    let ada = show_json(&dir, "ada");
    assert!((ada["valence"].as_f64().unwrap() - 0.325).abs() < 1e-9);

    kin_cmd(&dir)
        .args(["decay", "--all"])
        .assert()
        .success()
        .stdout(predicate::str::contains("decayed 2 user(s)"));

    kin_cmd(&dir)
        .args(["decay", "--user", "ghost"])
        .assert()
        .failure();
}

#[test]
fn mood_context_block() {
    let dir = TempDir::new().unwrap();
    kin_cmd(&dir)
        .args(["feel", "gratitude", "0.8", "--trigger", "a kind word"])
        .assert()
        .success();

    kin_cmd(&dir)
        .args(["mood", "--context", "--recent", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("CURRENT MOOD:"))
        .stdout(predicate::str::contains("RECENT FEELINGS:"))
        .stdout(predicate::str::contains("- gratitude (0.8) after a kind word"));
}

#[test]
fn users_and_forget() {
    let dir = TempDir::new().unwrap();
    for user in ["bob", "ada"] {
        kin_cmd(&dir).args(["init", "--user", user]).assert().success();
    }
    kin_cmd(&dir)
        .arg("users")
        .assert()
        .success()
        .stdout("ada\nbob\n");

    kin_cmd(&dir)
        .args(["forget", "--user", "ada"])
        .assert()
        .success()
        .stdout(predicate::str::contains("forgot 'ada'"));
    kin_cmd(&dir)
        .args(["forget", "--user", "ada"])
        .assert()
        .success()
        .stdout(predicate::str::contains("no state stored"));
    kin_cmd(&dir).arg("users").assert().success().stdout("bob\n");
}

#[test]
fn export_import_roundtrip() {
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("ada.json");

    kin_cmd(&dir)
        .args(["feel", "wonder", "0.6", "--user", "ada"])
        .assert()
        .success();
    kin_cmd(&dir)
        .args(["export", "--user", "ada"])
        .arg(&file)
        .assert()
        .success()
        .stdout(predicate::str::contains("exported to"));

    kin_cmd(&dir)
        .args(["import", "--user", "copy"])
        .arg(&file)
        .assert()
        .success()
        .stdout(predicate::str::contains("2 recent emotion(s)"));

    assert_eq!(show_json(&dir, "ada"), show_json(&dir, "copy"));
}

#[test]
fn import_garbage_fails() {
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("bad.json");
    std::fs::write(&file, "{ not json").unwrap();
    kin_cmd(&dir)
        .arg("import")
        .arg(&file)
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to import"));
}

#[test]
fn prompt_is_grounded_on_today() {
    let dir = TempDir::new().unwrap();
    kin_cmd(&dir)
        .args(["prompt", "call mom tomorrow", "--today", "2024-06-01"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Today is Saturday, June 1, 2024"))
        .stdout(predicate::str::contains("Input: \"call mom tomorrow\""));

    kin_cmd(&dir)
        .args(["prompt", "x", "--today", "someday"])
        .assert()
        .failure();
}

#[test]
fn parse_empty_input_fails() {
    let dir = TempDir::new().unwrap();
    kin_cmd(&dir)
        .args(["parse", "   "])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid input"));
}

#[test]
fn parse_unreachable_llm_reports_upstream() {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("config.toml"),
        "[llm]\nendpoint = \"http://127.0.0.1:9/v1\"\ntimeout_secs = 2\n",
    )
    .unwrap();
    kin_cmd(&dir)
        .args(["parse", "call mom tomorrow"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("upstream unavailable"));
}

#[test]
fn invalid_config_is_reported() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("config.toml"), "[parser]\nconfirm_below = 7\n").unwrap();
    kin_cmd(&dir)
        .args(["feel", "joy", "0.5"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("config"));
}
