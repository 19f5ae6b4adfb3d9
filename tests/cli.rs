use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn srcup_binary() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_srcup"))
}

fn setup_test_env() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();

    let files_dir = root.join("files");
    fs::create_dir_all(&files_dir).unwrap();
    fs::write(
        files_dir.join("book.json"),
        r#"{"bookSourceName":"Alpha: Library","bookSourceUrl":"https://alpha.test","enabled":true}"#,
    )
    .unwrap();
    fs::write(
        files_dir.join("feeds.json"),
        r#"[{"sourceName":"Feed1","sourceUrl":"https://feed.test/1"},{"sourceName":"Feed2"}]"#,
    )
    .unwrap();
    fs::write(files_dir.join("broken.json"), "{ definitely not json").unwrap();
    fs::write(files_dir.join("unknown.json"), r#"{"title":"neither"}"#).unwrap();

    let config_content = r#"[server]
bind = "127.0.0.1:0"

[github]
api_base = "http://127.0.0.1:1"
"#;
    let config_path = config_dir.join("srcup.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn run_srcup(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = srcup_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("Failed to run srcup binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let success = output.status.success();
    (stdout, stderr, success)
}

fn file_arg(config_path: &Path, name: &str) -> String {
    let root = config_path.parent().unwrap().parent().unwrap();
    root.join("files").join(name).to_str().unwrap().to_string()
}

#[test]
fn test_normalize_book_source() {
    let (_tmp, config_path) = setup_test_env();
    let file = file_arg(&config_path, "book.json");

    let (stdout, stderr, success) = run_srcup(&config_path, &["normalize", &file]);
    assert!(success, "normalize failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("kind: book_source"));
    assert!(stdout.contains("path: book-sources/Alpha Library.json"));
    assert!(stdout.contains("[\n  {\n    \"bookSourceName\": \"Alpha: Library\""));
}

#[test]
fn test_normalize_subscription_array() {
    let (_tmp, config_path) = setup_test_env();
    let file = file_arg(&config_path, "feeds.json");

    let (stdout, stderr, success) = run_srcup(&config_path, &["normalize", &file]);
    assert!(success, "normalize failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("kind: subscription_source"));
    assert!(stdout.contains("path: subscription-sources/Feed1.json"));
    assert!(stdout.contains("\"sourceName\": \"Feed2\""));
}

#[test]
fn test_normalize_rejects_invalid_json() {
    let (_tmp, config_path) = setup_test_env();
    let file = file_arg(&config_path, "broken.json");

    let (_, stderr, success) = run_srcup(&config_path, &["normalize", &file]);
    assert!(!success);
    assert!(stderr.contains("not valid JSON"), "stderr={}", stderr);
}

#[test]
fn test_normalize_rejects_unknown_document() {
    let (_tmp, config_path) = setup_test_env();
    let file = file_arg(&config_path, "unknown.json");

    let (_, stderr, success) = run_srcup(&config_path, &["normalize", &file]);
    assert!(!success);
    assert!(stderr.contains("bookSourceName or sourceName"), "stderr={}", stderr);
}

#[test]
fn test_missing_config_uses_defaults() {
    let (tmp, config_path) = setup_test_env();
    let file = file_arg(&config_path, "book.json");
    let absent = tmp.path().join("nope.toml");

    let (stdout, stderr, success) = run_srcup(&absent, &["normalize", &file]);
    assert!(success, "normalize failed: stdout={}, stderr={}", stdout, stderr);
}

#[test]
fn test_invalid_config_is_rejected() {
    let (tmp, config_path) = setup_test_env();
    let file = file_arg(&config_path, "book.json");
    let bad = tmp.path().join("bad.toml");
    fs::write(&bad, "[defaults]\nrepo_name = \"no-owner\"\n").unwrap();

    let (_, stderr, success) = run_srcup(&bad, &["normalize", &file]);
    assert!(!success);
    assert!(stderr.contains("owner/name"), "stderr={}", stderr);
}

#[test]
fn test_upload_unreachable_remote_fails() {
    let (_tmp, config_path) = setup_test_env();
    let file = file_arg(&config_path, "book.json");

    let (_, stderr, success) = run_srcup(
        &config_path,
        &["upload", &file, "--token", "tok", "--repo", "org/repo"],
    );
    assert!(!success);
    assert!(stderr.contains("internal server error"), "stderr={}", stderr);
}
