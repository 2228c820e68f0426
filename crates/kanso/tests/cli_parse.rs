use std::fs;
use std::path::Path;
use std::process::{Command, Output};

use tempfile::TempDir;

fn write_file(path: &Path, contents: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create parent dirs");
    }
    fs::write(path, contents).expect("write file");
}

fn kanso(args: &[&str], dir: &Path) -> Output {
    Command::new(env!("CARGO_BIN_EXE_kanso"))
        .args(args)
        .current_dir(dir)
        .env_remove("RUST_LOG")
        .output()
        .expect("run kanso")
}

#[test]
fn parse_prints_a_json_bundle() {
    let temp = TempDir::new().expect("tempdir");
    write_file(
        &temp.path().join("src/Id.kanso"),
        "module Id where\n\nid : {A : Set} -> A -> A\nid x = x\n",
    );
    write_file(
        &temp.path().join("src/nested/Const.agda"),
        "const : {A B : Set} -> A -> B -> A\nconst a _ = a\n",
    );

    let output = kanso(&["parse", "src/..."], temp.path());
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let bundle: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("stdout is json");
    let files = bundle["files"].as_array().expect("files array");
    assert_eq!(files.len(), 2);
    let exports: Vec<&str> = files
        .iter()
        .flat_map(|file| file["exports"].as_array().into_iter().flatten())
        .filter_map(|name| name.as_str())
        .collect();
    assert_eq!(exports, vec!["id", "const"]);
    assert_eq!(files[0]["decls"][0]["kind"], "module");
}

#[test]
fn parse_errors_fail_the_command() {
    let temp = TempDir::new().expect("tempdir");
    write_file(&temp.path().join("Bad.kanso"), "data Nat : Set where\nzero : Nat\n");

    let output = kanso(&["parse", "Bad.kanso"], temp.path());
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("error[E1101]"), "stderr: {stderr}");
    assert!(stderr.contains("Bad.kanso:2:1"), "stderr: {stderr}");
}

#[test]
fn missing_target_is_reported() {
    let temp = TempDir::new().expect("tempdir");
    let output = kanso(&["parse", "nowhere.kanso"], temp.path());
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Invalid path"));
}

#[test]
fn fmt_uses_the_discovered_config() {
    let temp = TempDir::new().expect("tempdir");
    write_file(&temp.path().join("kanso.toml"), "[format]\nindent_size = 4\n");
    write_file(&temp.path().join("P.kanso"), "postulate\n  A : Set\n  B   :   Set\n");

    let output = kanso(&["fmt", "P.kanso"], temp.path());
    assert!(output.status.success());
    assert_eq!(
        String::from_utf8_lossy(&output.stdout),
        "postulate\n    A : Set\n    B : Set\n"
    );
}

#[test]
fn explicit_config_must_parse() {
    let temp = TempDir::new().expect("tempdir");
    write_file(&temp.path().join("broken.toml"), "[format\n");
    write_file(&temp.path().join("P.kanso"), "x = y\n");

    let output = kanso(&["--config", "broken.toml", "fmt", "P.kanso"], temp.path());
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Config error"));
}

#[test]
fn lex_shows_layout_tokens() {
    let temp = TempDir::new().expect("tempdir");
    write_file(&temp.path().join("W.kanso"), "f = g\n  where\n    g = h\n");

    let output = kanso(&["lex", "W.kanso"], temp.path());
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("2:3 keyword where"), "stdout: {stdout}");
    assert!(stdout.contains("3:5 indent"), "stdout: {stdout}");
    assert!(stdout.contains(" dedent "), "stdout: {stdout}");
}
