// CLI integration tests: one-shot transcoding, diagnostics, and error reporting.
use std::io::Write;
use std::process::{Command, Output, Stdio};

use serde_json::{Value, json};

fn cmd() -> Command {
    let exe = env!("CARGO_BIN_EXE_forkgate");
    let mut command = Command::new(exe);
    command.env_remove("RUST_LOG");
    command
}

fn parse_json(value: &str) -> Value {
    serde_json::from_str(value).expect("valid json")
}

fn stdout_json(output: &Output) -> Value {
    parse_json(std::str::from_utf8(&output.stdout).expect("utf8").trim())
}

/// Warnings may precede the error line; the error envelope is always last.
fn stderr_error(output: &Output) -> Value {
    let text = String::from_utf8_lossy(&output.stderr);
    let line = text.lines().last().expect("stderr line");
    parse_json(line)
}

fn write_input(dir: &tempfile::TempDir, name: &str, body: &Value) -> String {
    let path = dir.path().join(name);
    std::fs::write(&path, body.to_string()).expect("write input");
    path.to_str().expect("utf8 path").to_string()
}

fn run_with_stdin(args: &[&str], stdin: &str) -> Output {
    let mut child = cmd()
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("spawn");
    child
        .stdin
        .take()
        .expect("stdin")
        .write_all(stdin.as_bytes())
        .expect("write stdin");
    child.wait_with_output().expect("wait")
}

#[test]
fn request_wraps_arrays_read_from_stdin() {
    let output = run_with_stdin(
        &["request", "--route", "/eth/v1/validator/duties/sync/12"],
        r#"["4","8","15"]"#,
    );
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    assert_eq!(stdout_json(&output), json!({"index": ["4", "8", "15"]}));
}

#[test]
fn request_reads_body_from_file() {
    let temp = tempfile::tempdir().expect("tempdir");
    let path = write_input(
        &temp,
        "subscriptions.json",
        &json!([{
            "validator_index": "1",
            "sync_committee_indices": ["0", "2"],
            "until_epoch": "10"
        }]),
    );
    let output = cmd()
        .args([
            "request",
            "--route",
            "/eth/v1/validator/sync_committee_subscriptions",
            "-f",
            &path,
        ])
        .output()
        .expect("request");
    assert!(output.status.success());
    assert_eq!(
        stdout_json(&output),
        json!({"data": [{
            "validator_index": "1",
            "sync_committee_indices": ["0", "2"],
            "until_epoch": "10"
        }]})
    );
}

#[test]
fn published_block_follows_the_configured_schedule() {
    let temp = tempfile::tempdir().expect("tempdir");
    let block = json!({"message": {"slot": "87", "body": {"graffiti": "0x00"}}, "signature": "0x11"});
    let path = write_input(&temp, "block.json", &block);

    let output = cmd()
        .args([
            "--slots-per-epoch",
            "8",
            "--altair-fork-epoch",
            "5",
            "--bellatrix-fork-epoch",
            "11",
            "request",
            "--route",
            "/eth/v1/beacon/blocks",
            "-f",
            &path,
        ])
        .output()
        .expect("request");
    assert!(output.status.success());
    assert_eq!(
        stdout_json(&output),
        json!({"altair_block": {"slot": "87", "body": {"graffiti": "0x00"}}, "signature": "0x11"})
    );

    let output = cmd()
        .args([
            "--slots-per-epoch",
            "8",
            "--altair-fork-epoch",
            "5",
            "--bellatrix-fork-epoch",
            "11",
            "request",
            "--route",
            "/eth/v1/beacon/blinded_blocks",
            "-f",
            &path,
        ])
        .output()
        .expect("request");
    assert!(output.status.success());
    assert_eq!(
        stdout_json(&output)["altair_block"]["slot"],
        json!("87")
    );
}

#[test]
fn config_file_is_layered_under_flags() {
    let temp = tempfile::tempdir().expect("tempdir");
    let config = write_input(
        &temp,
        "chain.json",
        &json!({"slots_per_epoch": 4, "altair_fork_epoch": 1, "bellatrix_fork_epoch": 2}),
    );

    let output = cmd()
        .args(["--config", &config, "fork", "--slot", "9"])
        .output()
        .expect("fork");
    assert!(output.status.success());
    assert_eq!(
        stdout_json(&output),
        json!({"slot": 9, "epoch": 2, "version": "bellatrix"})
    );

    let output = cmd()
        .args(["--config", &config, "--bellatrix-fork-epoch", "3", "fork", "--slot", "9"])
        .output()
        .expect("fork");
    assert!(output.status.success());
    assert_eq!(stdout_json(&output)["version"], "altair");
}

#[test]
fn response_flattens_sync_committee_aggregates() {
    let temp = tempfile::tempdir().expect("tempdir");
    let path = write_input(
        &temp,
        "committees.json",
        &json!({"data": {
            "validators": ["1", "2", "3"],
            "validator_aggregates": [{"validators": ["1", "2"]}, {"validators": ["3"]}]
        }}),
    );
    let output = cmd()
        .args([
            "response",
            "--route",
            "/eth/v1/beacon/states/finalized/sync_committees",
            "-f",
            &path,
        ])
        .output()
        .expect("response");
    assert!(output.status.success());
    assert_eq!(
        stdout_json(&output),
        json!({"data": {"validators": ["1", "2", "3"], "validator_aggregates": [["1", "2"], ["3"]]}})
    );
}

#[test]
fn routes_lists_registered_hooks() {
    let output = cmd().arg("routes").output().expect("routes");
    assert!(output.status.success());
    let value = stdout_json(&output);
    let routes = value["routes"].as_array().expect("routes array");
    let blocks = routes
        .iter()
        .find(|route| route["route"] == "/eth/v1/beacon/blocks")
        .expect("publish route");
    assert_eq!(blocks["pre_parse"], "resolve_published_block");
    assert_eq!(blocks["pre_forward"], "prepare_published_block");
    assert!(blocks.get("post_process").is_none());
}

#[test]
fn decode_failures_exit_with_decode_code() {
    let output = run_with_stdin(
        &["request", "--route", "/eth/v1/beacon/pool/sync_committees"],
        "[{\"slot\": 5}]",
    );
    assert_eq!(output.status.code(), Some(4));
    assert!(output.stdout.is_empty());
    let err = stderr_error(&output);
    assert_eq!(err["error"]["kind"], "Decode");
    assert_eq!(err["error"]["route"], "/eth/v1/beacon/pool/sync_committees");
}

#[test]
fn unsupported_response_version_exits_with_version_code() {
    let output = run_with_stdin(
        &["response", "--route", "/eth/v2/validator/blocks/100"],
        r#"{"version":"deneb","data":{}}"#,
    );
    assert_eq!(output.status.code(), Some(7));
    let err = stderr_error(&output);
    assert_eq!(err["error"]["kind"], "UnsupportedVersion");
    assert_eq!(err["error"]["message"], "unsupported block version 'deneb'");
}

#[test]
fn unknown_route_is_not_found() {
    let output = run_with_stdin(&["request", "--route", "/eth/v1/node/peers"], "{}");
    assert_eq!(output.status.code(), Some(3));
    let err = stderr_error(&output);
    assert_eq!(err["error"]["kind"], "NotFound");
    assert!(err["error"]["hint"].as_str().expect("hint").contains("forkgate routes"));
}

#[test]
fn invalid_schedule_is_a_usage_error() {
    let output = cmd()
        .args(["--altair-fork-epoch", "10", "--bellatrix-fork-epoch", "10", "fork", "--slot", "1"])
        .output()
        .expect("fork");
    assert_eq!(output.status.code(), Some(2));
    assert_eq!(stderr_error(&output)["error"]["kind"], "Usage");
}

#[test]
fn bad_arguments_are_usage_errors() {
    let output = cmd()
        .args(["fork", "--slot", "not-a-number"])
        .output()
        .expect("fork");
    assert_eq!(output.status.code(), Some(2));
    assert_eq!(stderr_error(&output)["error"]["kind"], "Usage");
}

#[test]
fn missing_input_file_is_io() {
    let temp = tempfile::tempdir().expect("tempdir");
    let missing = temp.path().join("missing.json");
    let output = cmd()
        .args([
            "request",
            "--route",
            "/eth/v1/beacon/blocks",
            "-f",
            missing.to_str().expect("utf8 path"),
        ])
        .output()
        .expect("request");
    assert_eq!(output.status.code(), Some(8));
    assert_eq!(stderr_error(&output)["error"]["kind"], "Io");
}
