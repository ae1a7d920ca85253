//! Purpose: End-to-end tests for the HTTP transcoding sidecar.
//! Exports: None (integration test module).
//! Role: Validate transcoding, diagnostics, and error envelopes across TCP.
//! Invariants: Uses loopback-only servers on free ports; bounded waits.
//! Invariants: Server processes are cleaned up on drop.

use serde_json::{Value, json};
use std::io::Read;
use std::net::{SocketAddr, TcpListener};
use std::process::{Child, Command, Stdio};
use std::sync::{Mutex, MutexGuard};
use std::thread::sleep;
use std::time::{Duration, Instant};

type TestResult<T> = Result<T, Box<dyn std::error::Error>>;

static SERVER_LOCK: Mutex<()> = Mutex::new(());

struct TestServer {
    child: Child,
    base_url: String,
    _server_guard: MutexGuard<'static, ()>,
}

impl TestServer {
    fn start(extra_args: &[&str]) -> TestResult<Self> {
        let guard = SERVER_LOCK
            .lock()
            .unwrap_or_else(|poison| poison.into_inner());
        let mut last_err: Option<Box<dyn std::error::Error>> = None;
        for _attempt in 0..3 {
            let port = pick_port()?;
            let bind = format!("127.0.0.1:{port}");
            let base_url = format!("http://{bind}");

            let mut child = Command::new(env!("CARGO_BIN_EXE_forkgate"))
                .args(extra_args)
                .arg("serve")
                .arg("--bind")
                .arg(&bind)
                .env("RUST_LOG", "warn")
                .stdout(Stdio::null())
                .stderr(Stdio::piped())
                .spawn()?;

            match wait_for_server(&mut child, bind.parse()?) {
                Ok(()) => {
                    return Ok(Self {
                        child,
                        base_url,
                        _server_guard: guard,
                    });
                }
                Err(err) => {
                    let _ = child.kill();
                    let _ = child.wait();
                    last_err = Some(err);
                    sleep(Duration::from_millis(30));
                }
            }
        }

        Err(last_err.unwrap_or_else(|| "server failed to start".into()))
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Returns the status and JSON body, including for 4xx/5xx responses.
    fn post(&self, path: &str, body: &str) -> TestResult<(u16, Value)> {
        let response = match ureq::post(&self.url(path))
            .set("Content-Type", "application/json")
            .send_string(body)
        {
            Ok(response) => response,
            Err(ureq::Error::Status(_, response)) => response,
            Err(err) => return Err(err.into()),
        };
        let status = response.status();
        let value: Value = serde_json::from_str(&response.into_string()?)?;
        Ok((status, value))
    }

    fn get(&self, path: &str) -> TestResult<(u16, Value)> {
        let response = match ureq::get(&self.url(path)).call() {
            Ok(response) => response,
            Err(ureq::Error::Status(_, response)) => response,
            Err(err) => return Err(err.into()),
        };
        let status = response.status();
        let value: Value = serde_json::from_str(&response.into_string()?)?;
        Ok((status, value))
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

#[test]
fn healthz_and_routes() -> TestResult<()> {
    let server = TestServer::start(&[])?;
    let (status, body) = server.get("/healthz")?;
    assert_eq!(status, 200);
    assert_eq!(body, json!({"ok": true}));

    let (status, body) = server.get("/v0/routes")?;
    assert_eq!(status, 200);
    let routes = body["routes"].as_array().ok_or("routes array")?;
    assert!(
        routes
            .iter()
            .any(|route| route["route"] == "/eth/v1/beacon/blinded_blocks")
    );
    Ok(())
}

#[test]
fn fork_lookup_uses_the_configured_network() -> TestResult<()> {
    let server = TestServer::start(&["--network", "sepolia"])?;
    let (status, body) = server.get("/v0/fork?slot=3200")?;
    assert_eq!(status, 200);
    assert_eq!(body, json!({"slot": 3200, "epoch": 100, "version": "bellatrix"}));

    let (status, body) = server.get("/v0/fork?slot=abc")?;
    assert_eq!(status, 400);
    assert_eq!(body["code"], 400);
    Ok(())
}

#[test]
fn request_transcoding_over_http() -> TestResult<()> {
    let server = TestServer::start(&["--altair-fork-epoch", "1", "--bellatrix-fork-epoch", "2"])?;

    let (status, body) = server.post(
        "/v0/transcode/request?route=/eth/v1/validator/prepare_beacon_proposer",
        r#"[{"validator_index":"1","fee_recipient":"0xabc"}]"#,
    )?;
    assert_eq!(status, 200);
    assert_eq!(
        body,
        json!({"recipients": [{"validator_index": "1", "fee_recipient": "0xabc"}]})
    );

    let (status, body) = server.post(
        "/v0/transcode/request?route=/eth/v1/beacon/blocks",
        r#"{"message":{"slot":"40","proposer_index":"3"},"signature":"0x99"}"#,
    )?;
    assert_eq!(status, 200);
    assert_eq!(
        body,
        json!({"altair_block": {"slot": "40", "proposer_index": "3"}, "signature": "0x99"})
    );
    Ok(())
}

#[test]
fn response_transcoding_over_http() -> TestResult<()> {
    let server = TestServer::start(&[])?;
    let raw = json!({
        "version": "BELLATRIX",
        "data": {"bellatrix_state": {"slot": "9"}},
        "execution_optimistic": true
    });
    let (status, body) = server.post(
        "/v0/transcode/response?route=/eth/v2/debug/beacon/states/head",
        &raw.to_string(),
    )?;
    assert_eq!(status, 200);
    assert_eq!(
        body,
        json!({"version": "BELLATRIX", "data": {"slot": "9"}, "execution_optimistic": true})
    );
    Ok(())
}

#[test]
fn errors_use_the_standard_envelope() -> TestResult<()> {
    let server = TestServer::start(&[])?;

    let (status, body) = server.post(
        "/v0/transcode/request?route=/eth/v1/beacon/pool/attestations",
        r#"{"not":"an array"}"#,
    )?;
    assert_eq!(status, 500);
    assert_eq!(body["code"], 500);
    assert_eq!(body["message"], "could not decode body");

    let (status, body) = server.post(
        "/v0/transcode/response?route=/eth/v2/beacon/blocks/head",
        r#"{"version":"CAPELLA","data":{}}"#,
    )?;
    assert_eq!(status, 500);
    assert_eq!(body["message"], "unsupported block version 'CAPELLA'");

    let (status, body) = server.post("/v0/transcode/request?route=/eth/v1/node/version", "{}")?;
    assert_eq!(status, 404);
    assert_eq!(body["code"], 404);

    let (status, _) = server.post("/v0/transcode/request", "{}")?;
    assert_eq!(status, 400);
    Ok(())
}

#[test]
fn non_loopback_bind_without_opt_in_exits_with_usage() -> TestResult<()> {
    let output = Command::new(env!("CARGO_BIN_EXE_forkgate"))
        .args(["serve", "--bind", "0.0.0.0:0"])
        .stderr(Stdio::piped())
        .output()?;
    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&output.stderr);
    let value: Value = serde_json::from_str(stderr.lines().last().ok_or("stderr line")?)?;
    assert_eq!(value["error"]["kind"], "Usage");
    Ok(())
}

fn pick_port() -> TestResult<u16> {
    let listener = TcpListener::bind("127.0.0.1:0")?;
    let port = listener.local_addr()?.port();
    drop(listener);
    Ok(port)
}

fn wait_for_server(child: &mut Child, addr: SocketAddr) -> TestResult<()> {
    let url = format!("http://{addr}/healthz");
    let start = Instant::now();
    loop {
        if let Ok(resp) = ureq::get(&url).call() {
            if resp.status() == 200 {
                return Ok(());
            }
        }
        if let Some(status) = child.try_wait()? {
            let mut stderr = String::new();
            if let Some(mut pipe) = child.stderr.take() {
                let _ = pipe.read_to_string(&mut stderr);
            }
            let detail = stderr.trim();
            return Err(format!(
                "server exited before ready (status: {status}, stderr: {})",
                if detail.is_empty() { "<empty>" } else { detail }
            )
            .into());
        }
        if start.elapsed() > Duration::from_secs(8) {
            return Err("server did not start in time".into());
        }
        sleep(Duration::from_millis(20));
    }
}
