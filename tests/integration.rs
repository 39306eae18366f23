use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn kb_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("kb");
    path
}

fn setup_test_env() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();

    // Create test corpus
    let knowledge_dir = root.join("knowledge");
    fs::create_dir_all(&knowledge_dir).unwrap();
    fs::write(
        knowledge_dir.join("gameplay-faq.md"),
        "# Gameplay FAQ\n\nTo save: sleep in a bed.\n\nFast travel unlocks after the first town.",
    )
    .unwrap();
    fs::write(
        knowledge_dir.join("installation.md"),
        "# Installation\n\nDownload the installer and run setup. Requires 2 GB of disk space.",
    )
    .unwrap();
    fs::write(
        knowledge_dir.join("combat.txt"),
        "Combat basics.\n\nAttack rolls use twenty sided dice. Armor reduces incoming damage.",
    )
    .unwrap();
    fs::write(knowledge_dir.join("ignored.bin"), "binary blob").unwrap();

    let config_content = format!(
        r#"[knowledge]
dir = "{}/knowledge"
include_globs = ["*.md", "*.txt", "*.json"]

[retrieval]
preview_chars = 200

[server]
bind = "127.0.0.1:7341"
"#,
        root.display()
    );

    let config_path = config_dir.join("kb.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn run_kb(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = kb_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args)
        // Keep the pipeline on its deterministic no-credentials paths.
        .env_remove("OPENAI_API_KEY")
        .output()
        .unwrap_or_else(|e| panic!("Failed to run kb binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let success = output.status.success();
    (stdout, stderr, success)
}

#[test]
fn test_index_reports_corpus_stats() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_kb(&config_path, &["index"]);
    assert!(success, "index failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("Documents:      3"), "stdout={}", stdout);
    assert!(stdout.contains("Ready"));
}

#[test]
fn test_index_creates_missing_directory() {
    let (_tmp, config_path) = setup_test_env();
    let knowledge_dir = config_path
        .parent()
        .unwrap()
        .parent()
        .unwrap()
        .join("knowledge");
    fs::remove_dir_all(&knowledge_dir).unwrap();

    let (stdout, _, success) = run_kb(&config_path, &["index"]);
    assert!(success);
    assert!(stdout.contains("Documents:      0"), "stdout={}", stdout);
    assert!(knowledge_dir.is_dir(), "index should create the directory");
}

#[test]
fn test_search_ranks_filename_match_first() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_kb(&config_path, &["search", "gameplay faq"]);
    assert!(success, "search failed: stderr={}", stderr);
    let first_line = stdout.lines().next().unwrap_or_default();
    assert!(
        first_line.contains("gameplay-faq.md"),
        "stdout={}",
        stdout
    );
    assert!(first_line.contains("markdown"));
}

#[test]
fn test_search_no_match_prints_no_results() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, _, success) = run_kb(&config_path, &["search", "weather system"]);
    assert!(success);
    assert!(stdout.contains("No results."));
}

#[test]
fn test_search_all_stop_words_prints_no_results() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, _, success) = run_kb(&config_path, &["search", "the a of"]);
    assert!(success);
    assert!(stdout.contains("No results."));
}

#[test]
fn test_ask_without_credentials_lists_sources() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_kb(&config_path, &["ask", "How do I save my game?"]);
    assert!(success, "ask failed: stderr={}", stderr);
    assert!(
        stdout.contains("Answer generation is not configured"),
        "stdout={}",
        stdout
    );
    assert!(stdout.contains("gameplay-faq.md"));
    assert!(stdout.contains("Sources:"));
}

#[test]
fn test_ask_no_match_prints_fixed_message() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, _, success) = run_kb(&config_path, &["ask", "weather system"]);
    assert!(success);
    assert!(stdout.contains("No relevant documentation found"));
}

#[test]
fn test_missing_config_fails() {
    let tmp = TempDir::new().unwrap();
    let config_path = tmp.path().join("missing.toml");

    let (_, stderr, success) = run_kb(&config_path, &["index"]);
    assert!(!success);
    assert!(stderr.contains("Failed to read config file"), "stderr={}", stderr);
}

#[test]
fn test_invalid_provider_rejected() {
    let (_tmp, config_path) = setup_test_env();
    let mut content = fs::read_to_string(&config_path).unwrap();
    content.push_str("\n[completion]\nprovider = \"acme\"\n");
    fs::write(&config_path, content).unwrap();

    let (_, stderr, success) = run_kb(&config_path, &["index"]);
    assert!(!success);
    assert!(stderr.contains("Unknown completion provider"), "stderr={}", stderr);
}
