//! Purpose: `graphery` CLI entry point and command dispatch.
//! Role: Binary crate root; parses args, runs commands, emits JSON on stdout.
//! Invariants: Successful commands emit a single JSON document on stdout.
//! Invariants: Non-interactive errors are emitted as JSON on stderr.
//! Invariants: Process exit code is derived from `api::to_exit_code`.
//! Invariants: Logs go to stderr via `tracing`, filtered by `RUST_LOG` (default `warn`).
#![allow(clippy::result_large_err)]
use std::io::{self, IsTerminal};
use std::path::{Path, PathBuf};

use clap::{
    CommandFactory, Parser, Subcommand, ValueEnum, ValueHint, error::ErrorKind as ClapErrorKind,
};
use clap_complete::aot::Shell;
use serde_json::{Map, Value, json};
use std::error::Error as StdError;
use tracing_subscriber::EnvFilter;

mod command_dispatch;

use graphery_client::api::{Error, ErrorKind, to_exit_code};

#[derive(Copy, Clone, Debug)]
struct RunOutcome {
    exit_code: i32,
}

impl RunOutcome {
    fn ok() -> Self {
        Self { exit_code: 0 }
    }
}

fn main() {
    init_tracing();
    let exit_code = match run() {
        Ok(outcome) => outcome.exit_code,
        Err((err, color_mode)) => {
            emit_error(&err, color_mode);
            to_exit_code(err.kind())
        }
    };
    std::process::exit(exit_code);
}

fn run() -> Result<RunOutcome, (Error, ColorMode)> {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => match err.kind() {
            ClapErrorKind::DisplayHelp
            | ClapErrorKind::DisplayVersion
            | ClapErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => {
                err.print().map_err(|io_err| {
                    (
                        Error::new(ErrorKind::Io)
                            .with_message("failed to write help")
                            .with_source(io_err),
                        ColorMode::Auto,
                    )
                })?;
                let exit_code = if matches!(
                    err.kind(),
                    ClapErrorKind::DisplayHelpOnMissingArgumentOrSubcommand
                ) {
                    2
                } else {
                    0
                };
                return Ok(RunOutcome { exit_code });
            }
            _ => {
                return Err((
                    Error::new(ErrorKind::Usage)
                        .with_message(clap_error_summary(&err))
                        .with_hint("Run `graphery --help` for usage."),
                    ColorMode::Auto,
                ));
            }
        },
    };

    let color_mode = cli.color;
    command_dispatch::dispatch_command(cli.command, cli.api_url, color_mode)
        .map_err(add_io_hint)
        .map_err(|err| (err, color_mode))
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(io::stderr)
        .with_target(false)
        .try_init();
}

fn clap_error_summary(err: &clap::Error) -> String {
    let rendered = err.to_string();
    rendered
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map(|line| line.trim_start_matches("error:").trim().to_string())
        .unwrap_or_else(|| "invalid arguments".to_string())
}

#[derive(Parser)]
#[command(
    name = "graphery",
    version,
    about = "Query the Graphery API and inspect result JSON",
    long_about = r#"Query the Graphery GraphQL API, run code on the local execution server,
and inspect result JSON sets offline.

Each invocation is one session: a CSRF token is fetched on the first API call
and reused for the rest of the command."#,
    after_help = r#"ENVIRONMENT
  GRAPHERY_API_URL      API base URL (default: http://localhost:8000/)
  GRAPHERY_LOCAL_PORT   Local execution server port (default: 7590)
  RUST_LOG              Log filter for stderr diagnostics (default: warn)"#
)]
struct Cli {
    #[arg(
        long,
        help = "API base URL (overrides GRAPHERY_API_URL)",
        value_hint = ValueHint::Url
    )]
    api_url: Option<String>,
    #[arg(
        long,
        default_value = "auto",
        value_enum,
        help = "Colorize stderr diagnostics and pretty JSON output: auto|always|never"
    )]
    color: ColorMode,

    #[command(subcommand)]
    command: Command,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum ColorMode {
    Auto,
    Always,
    Never,
}

impl ColorMode {
    fn use_color(self, is_tty: bool) -> bool {
        match self {
            ColorMode::Auto => is_tty,
            ColorMode::Always => true,
            ColorMode::Never => false,
        }
    }
}

#[derive(Subcommand)]
enum Command {
    #[command(
        about = "Run a GraphQL query or mutation",
        long_about = r#"Send one GraphQL operation to the API and print {"data", "errors"}.

A CSRF token is fetched from /csrf first and sent as X-CSRFToken."#,
        after_help = r#"EXAMPLES
  $ graphery query --query '{ allCategories { id category } }'
  $ graphery query --query-file tutorial.graphql --variables '{"url": "intro"}'
  $ graphery query --query-file results.graphql --results-field resultJsonSet

NOTES
  - --results-field loads data.<FIELD> into the session's result store
    and adds a {"results": {"records", "placeholders"}} summary."#
    )]
    Query {
        #[arg(
            long,
            help = "GraphQL document",
            conflicts_with = "query_file",
            required_unless_present = "query_file"
        )]
        query: Option<String>,
        #[arg(long, help = "Read the GraphQL document from a file", value_hint = ValueHint::FilePath)]
        query_file: Option<PathBuf>,
        #[arg(long, help = "Variables as a JSON object")]
        variables: Option<String>,
        #[arg(long, help = "Load data.<FIELD> as a result JSON set")]
        results_field: Option<String>,
    },
    #[command(
        about = "Run code on the local execution server",
        long_about = r#"POST {code, graph} to http://<host>:<port>/run and print the response as-is."#,
        after_help = r#"EXAMPLES
  $ graphery run --code-file bfs.py --graph-file graph.json
  $ graphery run --code 'print(1)' --graph-json '{"elements": []}' --port 7600"#
    )]
    Run {
        #[arg(
            long,
            help = "Code to execute",
            conflicts_with = "code_file",
            required_unless_present = "code_file"
        )]
        code: Option<String>,
        #[arg(long, help = "Read the code from a file", value_hint = ValueHint::FilePath)]
        code_file: Option<PathBuf>,
        #[arg(
            long,
            help = "Graph as JSON (object or string)",
            conflicts_with = "graph_file",
            required_unless_present = "graph_file"
        )]
        graph_json: Option<String>,
        #[arg(long, help = "Read the graph JSON from a file", value_hint = ValueHint::FilePath)]
        graph_file: Option<PathBuf>,
        #[arg(long, help = "Local server port (overrides GRAPHERY_LOCAL_PORT)")]
        port: Option<u16>,
        #[arg(long, help = "Local server host", default_value = "localhost")]
        host: String,
    },
    #[command(
        about = "Inspect a result JSON set offline",
        long_about = r#"Load a JSON array of result JSON entries ({json, graph: {id}, code: {id}})
into a fresh store and print the string and object lists.

Malformed entries are replaced by empty placeholders with a fresh id."#,
        after_help = r#"EXAMPLES
  $ graphery results --query-data results.json
  $ graphery results --query-data results.json --graph-id g1 --code-id c1"#
    )]
    Results {
        #[arg(long, help = "File holding the result JSON set", value_hint = ValueHint::FilePath)]
        query_data: PathBuf,
        #[arg(long, help = "Graph id to look up", requires = "code_id")]
        graph_id: Option<String>,
        #[arg(long, help = "Code id to look up", requires = "graph_id")]
        code_id: Option<String>,
    },
    #[command(
        about = "Print version info as JSON",
        after_help = r#"EXAMPLES
  $ graphery version"#
    )]
    Version,
    #[command(
        arg_required_else_help = true,
        about = "Generate shell completions",
        after_help = r#"EXAMPLES
  $ graphery completion bash > ~/.local/share/bash-completion/completions/graphery
  $ graphery completion zsh > ~/.zfunc/_graphery"#
    )]
    Completion {
        #[arg(help = "Shell to generate completions for")]
        shell: Shell,
    },
}

fn read_text_file(path: &Path, what: &str) -> Result<String, Error> {
    std::fs::read_to_string(path).map_err(|err| {
        let kind = match err.kind() {
            io::ErrorKind::NotFound => ErrorKind::NotFound,
            io::ErrorKind::PermissionDenied => ErrorKind::Permission,
            _ => ErrorKind::Io,
        };
        Error::new(kind)
            .with_message(format!("failed to read {what} file {}", path.display()))
            .with_source(err)
    })
}

fn parse_json_arg(raw: &str, flag: &str) -> Result<Value, Error> {
    serde_json::from_str(raw).map_err(|err| {
        Error::new(ErrorKind::Usage)
            .with_message(format!("{flag} is not valid JSON"))
            .with_source(err)
    })
}

fn emit_json(value: Value, color_mode: ColorMode) {
    let is_tty = io::stdout().is_terminal();
    let pretty = is_tty || color_mode.use_color(is_tty);
    let encoded = if pretty {
        serde_json::to_string_pretty(&value)
    } else {
        serde_json::to_string(&value)
    };
    let json = encoded.unwrap_or_else(|_| "{\"error\":\"json encode failed\"}".to_string());
    println!("{json}");
}

#[derive(Copy, Clone, Debug)]
enum AnsiColor {
    Red,
    Yellow,
}

fn colorize_label(label: &str, enabled: bool, color: AnsiColor) -> String {
    if !enabled {
        return label.to_string();
    }
    let code = match color {
        AnsiColor::Red => "31",
        AnsiColor::Yellow => "33",
    };
    format!("\x1b[1;{code}m{label}\x1b[0m")
}

fn emit_error(err: &Error, color_mode: ColorMode) {
    let is_tty = io::stderr().is_terminal();
    if is_tty {
        eprintln!("{}", error_text(err, color_mode.use_color(is_tty)));
        return;
    }

    let value = error_json(err);
    let json = serde_json::to_string(&value).unwrap_or_else(|_| {
        "{\"error\":{\"kind\":\"Internal\",\"message\":\"json encode failed\"}}".to_string()
    });
    eprintln!("{json}");
}

fn error_message(err: &Error) -> String {
    err.message()
        .map(str::to_string)
        .unwrap_or_else(|| format!("{:?}", err.kind()))
}

fn error_causes(err: &Error) -> Vec<String> {
    let mut causes = Vec::new();
    let mut current = err.source();
    while let Some(source) = current {
        causes.push(source.to_string());
        current = source.source();
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
    if let Some(url) = err.url() {
        inner.insert("url".to_string(), json!(url));
    }
    if let Some(status) = err.status() {
        inner.insert("status".to_string(), json!(status));
    }
    let causes = error_causes(err);
    if !causes.is_empty() {
        inner.insert("causes".to_string(), json!(causes));
    }

    let mut outer = Map::new();
    outer.insert("error".to_string(), Value::Object(inner));
    Value::Object(outer)
}

fn error_text(err: &Error, use_color: bool) -> String {
    let mut lines = Vec::new();
    lines.push(format!(
        "{} {}",
        colorize_label("error:", use_color, AnsiColor::Red),
        error_message(err)
    ));
    if let Some(hint) = err.hint() {
        lines.push(format!(
            "{} {hint}",
            colorize_label("hint:", use_color, AnsiColor::Yellow)
        ));
    }
    if let Some(url) = err.url() {
        lines.push(format!(
            "{} {url}",
            colorize_label("url:", use_color, AnsiColor::Yellow)
        ));
    }
    if let Some(status) = err.status() {
        lines.push(format!(
            "{} {status}",
            colorize_label("status:", use_color, AnsiColor::Yellow)
        ));
    }
    for cause in error_causes(err) {
        lines.push(format!(
            "{} {cause}",
            colorize_label("caused by:", use_color, AnsiColor::Yellow)
        ));
    }
    lines.join("\n")
}

fn add_io_hint(err: Error) -> Error {
    if err.kind() != ErrorKind::Io || err.hint().is_some() {
        return err;
    }
    err.with_hint("Check that the server is running and reachable (see --api-url / --port).")
}

#[cfg(test)]
mod tests {
    use super::{Cli, add_io_hint, error_json, error_text};
    use clap::CommandFactory;
    use graphery_client::api::{Error, ErrorKind};

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn error_json_includes_status_and_url() {
        let err = Error::new(ErrorKind::Permission)
            .with_message("CSRF verification failed")
            .with_status(403)
            .with_url("http://localhost:8000/graphql");
        let value = error_json(&err);
        assert_eq!(value["error"]["kind"], "Permission");
        assert_eq!(value["error"]["status"], 403);
        assert_eq!(value["error"]["url"], "http://localhost:8000/graphql");
    }

    #[test]
    fn io_errors_get_reachability_hint() {
        let err = add_io_hint(Error::new(ErrorKind::Io).with_message("request failed"));
        assert!(err.hint().unwrap_or_default().contains("reachable"));
        let text = error_text(&err, false);
        assert!(text.starts_with("error: request failed"));
        assert!(text.contains("hint:"));
    }
}
