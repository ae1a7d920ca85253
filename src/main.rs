//! Purpose: `forkgate` CLI entry point.
//! Role: Binary crate root; parses args, runs commands, emits JSON on stdout.
//! Invariants: Transcoded bodies are written to stdout exactly as the pipeline produced them.
//! Invariants: Errors are emitted as JSON on stderr.
//! Invariants: Process exit code is derived from `api::to_exit_code`.
#![allow(clippy::result_large_err)]
use std::io::{self, IsTerminal, Read, Write};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand, ValueEnum, ValueHint, error::ErrorKind as ClapErrorKind};
use serde_json::{Map, Value, json};
use std::error::Error as StdError;
use tracing_subscriber::EnvFilter;

mod command_dispatch;
mod route_info_json;
mod serve;

use forkgate::api::{ChainConfigOverrides, Error, ErrorKind, Network, to_exit_code};

const DEFAULT_BIND: &str = "127.0.0.1:9800";
const DEFAULT_MAX_BODY_BYTES: u64 = 8 * 1024 * 1024;

#[derive(Copy, Clone, Debug)]
struct RunOutcome {
    exit_code: i32,
}

impl RunOutcome {
    fn ok() -> Self {
        Self { exit_code: 0 }
    }

    fn with_code(exit_code: i32) -> Self {
        Self { exit_code }
    }
}

fn main() {
    let exit_code = match run() {
        Ok(outcome) => outcome.exit_code,
        Err(err) => {
            emit_error(&err);
            to_exit_code(err.kind())
        }
    };
    std::process::exit(exit_code);
}

fn run() -> Result<RunOutcome, Error> {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => match err.kind() {
            ClapErrorKind::DisplayHelp
            | ClapErrorKind::DisplayVersion
            | ClapErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => {
                err.print().map_err(|io_err| {
                    Error::new(ErrorKind::Io)
                        .with_message("failed to write help")
                        .with_source(io_err)
                })?;
                let exit_code = if matches!(
                    err.kind(),
                    ClapErrorKind::DisplayHelpOnMissingArgumentOrSubcommand
                ) {
                    2
                } else {
                    0
                };
                return Ok(RunOutcome::with_code(exit_code));
            }
            _ => {
                return Err(Error::new(ErrorKind::Usage)
                    .with_message(clap_error_summary(&err))
                    .with_hint("Try `forkgate --help`."));
            }
        },
    };

    let default_filter = match cli.command {
        Command::Serve { .. } => "info",
        _ => "warn",
    };
    init_tracing(default_filter);

    command_dispatch::dispatch_command(cli.command, cli.chain)
}

#[derive(Parser)]
#[command(
    name = "forkgate",
    version,
    about = "Fork-aware JSON shape translation between the Beacon REST API and its backend",
    long_about = r#"Rewrites Beacon API request and response bodies between the REST shape
and the version-tagged shape the backend speaks.

Requests: bare arrays are wrapped in the object the backend expects, and
published blocks are re-keyed by the fork their slot falls in.
Responses: multi-version containers are flattened back to {message, signature},
and nested sync-committee aggregates become a plain 2D array."#,
    after_help = r#"EXAMPLES
  $ forkgate routes
  $ forkgate fork --slot 4700013
  $ forkgate request --route /eth/v1/beacon/blocks -f block.json
  $ echo '["1","2"]' | forkgate request --route /eth/v1/validator/duties/attester/10
  $ forkgate response --route /eth/v2/beacon/blocks/head -f response.json
  $ forkgate serve --bind 127.0.0.1:9800"#
)]
struct Cli {
    #[command(flatten)]
    chain: ChainArgs,
    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug, Clone)]
struct ChainArgs {
    #[arg(
        long,
        global = true,
        value_enum,
        default_value = "mainnet",
        help = "Fork schedule preset",
        help_heading = "Chain"
    )]
    network: NetworkCli,
    #[arg(
        long,
        global = true,
        value_name = "PATH",
        value_hint = ValueHint::FilePath,
        help = "JSON file overriding preset fields",
        help_heading = "Chain"
    )]
    config: Option<PathBuf>,
    #[arg(long, global = true, help = "Override slots per epoch", help_heading = "Chain")]
    slots_per_epoch: Option<u64>,
    #[arg(long, global = true, help = "Override the altair fork epoch", help_heading = "Chain")]
    altair_fork_epoch: Option<u64>,
    #[arg(
        long,
        global = true,
        help = "Override the bellatrix fork epoch",
        help_heading = "Chain"
    )]
    bellatrix_fork_epoch: Option<u64>,
}

impl ChainArgs {
    fn network(&self) -> Network {
        match self.network {
            NetworkCli::Mainnet => Network::Mainnet,
            NetworkCli::Prater => Network::Prater,
            NetworkCli::Sepolia => Network::Sepolia,
        }
    }

    /// Config file first, then explicit flags on top.
    fn overrides(&self) -> Result<ChainConfigOverrides, Error> {
        let file = match &self.config {
            Some(path) => ChainConfigOverrides::from_file(path)?,
            None => ChainConfigOverrides::default(),
        };
        Ok(file.merge(ChainConfigOverrides {
            slots_per_epoch: self.slots_per_epoch,
            altair_fork_epoch: self.altair_fork_epoch,
            bellatrix_fork_epoch: self.bellatrix_fork_epoch,
        }))
    }
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum NetworkCli {
    Mainnet,
    Prater,
    Sepolia,
}

#[derive(Subcommand)]
enum Command {
    #[command(
        arg_required_else_help = true,
        about = "Rewrite a REST request body into the backend shape",
        after_help = r#"EXAMPLES
  $ forkgate request --route /eth/v1/beacon/pool/attestations -f attestations.json
  $ cat block.json | forkgate request --route /eth/v1/beacon/blocks"#
    )]
    Request {
        #[arg(long, help = "Request path, e.g. /eth/v1/beacon/blocks")]
        route: String,
        #[arg(
            short = 'f',
            long,
            value_name = "FILE",
            value_hint = ValueHint::FilePath,
            help = "Read the body from FILE (default: stdin, or `-`)"
        )]
        file: Option<PathBuf>,
    },
    #[command(
        arg_required_else_help = true,
        about = "Rewrite a backend response body into the REST shape",
        after_help = r#"EXAMPLES
  $ forkgate response --route /eth/v2/beacon/blocks/head -f response.json
  $ cat committees.json | forkgate response --route /eth/v1/beacon/states/head/sync_committees"#
    )]
    Response {
        #[arg(long, help = "Request path the response belongs to")]
        route: String,
        #[arg(
            short = 'f',
            long,
            value_name = "FILE",
            value_hint = ValueHint::FilePath,
            help = "Read the body from FILE (default: stdin, or `-`)"
        )]
        file: Option<PathBuf>,
    },
    #[command(
        arg_required_else_help = true,
        about = "Show the epoch and fork version for a slot"
    )]
    Fork {
        #[arg(long, help = "Slot number")]
        slot: u64,
    },
    #[command(about = "List routes with registered hooks")]
    Routes,
    #[command(
        about = "Serve the transcoding pipeline over HTTP (loopback by default)",
        after_help = r#"EXAMPLES
  $ forkgate serve
  $ forkgate serve --bind 127.0.0.1:9801 --network sepolia
  $ curl -s --data-binary @block.json 'http://127.0.0.1:9800/v0/transcode/request?route=/eth/v1/beacon/blocks'

NOTES
  - Loopback is the default; non-loopback binds require --allow-non-loopback
  - Log verbosity follows RUST_LOG (default: info)"#
    )]
    Serve {
        #[command(flatten)]
        run: ServeRunArgs,
    },
}

#[derive(Args)]
struct ServeRunArgs {
    #[arg(long, default_value = DEFAULT_BIND, help = "Bind address", help_heading = "Connection")]
    bind: SocketAddr,
    #[arg(
        long,
        help = "Allow non-loopback binds (unauthenticated)",
        help_heading = "Safety"
    )]
    allow_non_loopback: bool,
    #[arg(
        long,
        default_value_t = DEFAULT_MAX_BODY_BYTES,
        help = "Max request body size in bytes",
        help_heading = "Safety"
    )]
    max_body_bytes: u64,
}

fn init_tracing(default_filter: &str) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(io::stderr)
        .try_init();
}

fn read_input(file: Option<&Path>) -> Result<Vec<u8>, Error> {
    match file {
        Some(path) if path != Path::new("-") => std::fs::read(path).map_err(|err| {
            Error::new(ErrorKind::Io)
                .with_message(format!("failed to read {}", path.display()))
                .with_source(err)
        }),
        _ => {
            if io::stdin().is_terminal() {
                return Err(Error::new(ErrorKind::Usage)
                    .with_message("no input body")
                    .with_hint("Pass -f FILE or pipe the body on stdin."));
            }
            let mut buf = Vec::new();
            io::stdin().read_to_end(&mut buf).map_err(|err| {
                Error::new(ErrorKind::Io)
                    .with_message("failed to read stdin")
                    .with_source(err)
            })?;
            Ok(buf)
        }
    }
}

fn emit_body(body: &[u8]) -> Result<(), Error> {
    let mut stdout = io::stdout().lock();
    stdout
        .write_all(body)
        .and_then(|()| stdout.write_all(b"\n"))
        .map_err(|err| {
            Error::new(ErrorKind::Io)
                .with_message("failed to write output")
                .with_source(err)
        })
}

fn emit_json(value: Value) {
    let json = if io::stdout().is_terminal() {
        serde_json::to_string_pretty(&value)
    } else {
        serde_json::to_string(&value)
    }
    .unwrap_or_else(|_| "{\"error\":\"json encode failed\"}".to_string());
    println!("{json}");
}

fn emit_error(err: &Error) {
    if io::stderr().is_terminal() {
        eprintln!("{}", error_text(err));
        return;
    }

    let json = serde_json::to_string(&error_json(err)).unwrap_or_else(|_| {
        "{\"error\":{\"kind\":\"Internal\",\"message\":\"json encode failed\"}}".to_string()
    });
    eprintln!("{json}");
}

fn error_message(err: &Error) -> String {
    if let Some(message) = err.message() {
        return message.to_string();
    }
    match err.kind() {
        ErrorKind::Internal => "internal error".to_string(),
        ErrorKind::Usage => "usage error".to_string(),
        ErrorKind::NotFound => "not found".to_string(),
        ErrorKind::Decode => "could not decode input".to_string(),
        ErrorKind::Encode => "could not encode output".to_string(),
        ErrorKind::TypeMismatch => "container is not of the correct type".to_string(),
        ErrorKind::UnsupportedVersion => "unsupported version".to_string(),
        ErrorKind::Io => "i/o error".to_string(),
    }
}

fn error_causes(err: &Error) -> Vec<String> {
    let mut causes = Vec::new();
    let mut cur = err.source();
    while let Some(source) = cur {
        causes.push(source.to_string());
        cur = source.source();
    }
    causes
}

fn error_json(err: &Error) -> Value {
    let mut inner = Map::new();
    inner.insert("kind".to_string(), json!(format!("{:?}", err.kind())));
    inner.insert("message".to_string(), json!(error_message(err)));
    if let Some(hint) = err.hint() {
        inner.insert("hint".to_string(), json!(hint));
    }
    if let Some(route) = err.route() {
        inner.insert("route".to_string(), json!(route));
    }
    let causes = error_causes(err);
    if !causes.is_empty() {
        inner.insert("causes".to_string(), json!(causes));
    }

    let mut outer = Map::new();
    outer.insert("error".to_string(), Value::Object(inner));
    Value::Object(outer)
}

fn error_text(err: &Error) -> String {
    let mut lines = vec![format!("error: {}", error_message(err))];
    if let Some(route) = err.route() {
        lines.push(format!("route: {route}"));
    }
    if let Some(hint) = err.hint() {
        lines.push(format!("hint: {hint}"));
    }
    for cause in error_causes(err) {
        lines.push(format!("caused by: {cause}"));
    }
    lines.join("\n")
}

fn clap_error_summary(err: &clap::Error) -> String {
    for line in err.to_string().lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if let Some(rest) = trimmed.strip_prefix("error:") {
            return rest.trim().to_string();
        }
        return trimmed.to_string();
    }
    "invalid arguments".to_string()
}
