use std::path::Path;
use std::process::Command;

/// Launches the extractor binary in an isolated directory with a clean
/// environment, so `.env` files and `logs/` from the workspace never leak in.
fn extractor_cmd(dir: &Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_userdir_extractor"));
    cmd.current_dir(dir).env_clear();
    cmd
}

#[test]
fn missing_required_configuration_logs_an_error_event() {
    let dir = tempfile::tempdir().unwrap();
    let output = extractor_cmd(dir.path()).arg("run").output().unwrap();

    assert!(!output.status.success());

    // The failure reaches the log stream as an ERROR event, not only as the
    // process exit message.
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("ERROR"), "no error event on stderr: {stderr}");
    assert!(stderr.contains("BUCKET env var required"), "{stderr}");

    // No run report on stdout.
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(!stdout.contains("\"status\""), "unexpected report: {stdout}");
}

#[test]
fn unknown_format_override_logs_an_error_event() {
    let dir = tempfile::tempdir().unwrap();
    let output = extractor_cmd(dir.path())
        .env("BUCKET", "landing-bucket")
        .env("API_URL", "http://127.0.0.1:9/api")
        .args(["run", "--format", "csv", "--local-root", "out"])
        .output()
        .unwrap();

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("ERROR"), "no error event on stderr: {stderr}");
    assert!(stderr.contains("unknown output format: csv"), "{stderr}");
}

#[test]
fn schema_subcommand_prints_the_embedded_contract() {
    let dir = tempfile::tempdir().unwrap();
    let output = extractor_cmd(dir.path()).arg("schema").output().unwrap();

    assert!(output.status.success());
    let document: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(document["title"], "User v1");
}
