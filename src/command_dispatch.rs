//! Purpose: Hold top-level CLI command dispatch for `graphery`.
//! Exports: `dispatch_command`.
//! Role: Keep `main.rs` focused on parse/bootstrap and delegate command execution.
//! Invariants: One `Session` per invocation; the store lives only as long as the command.
//! Invariants: Output envelopes are JSON objects keyed by what they carry.

use super::*;

use tracing::debug;

use graphery_client::api::{
    ApiClient, ApiConfig, Keys, LoadSummary, LocalServerClient, QueryDataEntry, Session,
};

pub(super) fn dispatch_command(
    command: Command,
    api_url: Option<String>,
    color_mode: ColorMode,
) -> Result<RunOutcome, Error> {
    match command {
        Command::Completion { shell } => {
            let mut cmd = Cli::command();
            clap_complete::aot::generate(shell, &mut cmd, "graphery", &mut io::stdout());
            Ok(RunOutcome::ok())
        }
        Command::Version => {
            emit_json(
                json!({
                    "name": env!("CARGO_PKG_NAME"),
                    "version": env!("CARGO_PKG_VERSION"),
                }),
                color_mode,
            );
            Ok(RunOutcome::ok())
        }
        Command::Query {
            query,
            query_file,
            variables,
            results_field,
        } => {
            let config = load_config(api_url)?;
            let query = match (query, query_file) {
                (Some(query), _) => query,
                (None, Some(path)) => read_text_file(&path, "query")?,
                (None, None) => {
                    return Err(Error::new(ErrorKind::Usage)
                        .with_message("query requires --query or --query-file"));
                }
            };
            let variables = variables
                .map(|raw| parse_json_arg(&raw, "--variables"))
                .transpose()?;

            let client = ApiClient::from_config(&config)?;
            let session = Session::new();
            let (data, errors) = client.api_caller(&session, &query, variables.as_ref())?;

            let mut out = Map::new();
            if let Some(field) = results_field {
                if let Some(summary) = load_results_field(&session, data.as_ref(), &field)? {
                    out.insert("results".to_string(), summary_json(summary));
                }
            }
            out.insert("data".to_string(), data.unwrap_or(Value::Null));
            out.insert(
                "errors".to_string(),
                serde_json::to_value(errors).unwrap_or(Value::Null),
            );
            emit_json(Value::Object(out), color_mode);
            Ok(RunOutcome::ok())
        }
        Command::Run {
            code,
            code_file,
            graph_json,
            graph_file,
            port,
            host,
        } => {
            let mut config = load_config(api_url)?.with_local_host(host);
            if let Some(port) = port {
                config = config.with_local_port(port);
            }
            let code = match (code, code_file) {
                (Some(code), _) => code,
                (None, Some(path)) => read_text_file(&path, "code")?,
                (None, None) => {
                    return Err(Error::new(ErrorKind::Usage)
                        .with_message("run requires --code or --code-file"));
                }
            };
            let graph = match (graph_json, graph_file) {
                (Some(raw), _) => parse_json_arg(&raw, "--graph-json")?,
                (None, Some(path)) => {
                    parse_json_arg(&read_text_file(&path, "graph")?, "--graph-file")?
                }
                (None, None) => {
                    return Err(Error::new(ErrorKind::Usage)
                        .with_message("run requires --graph-json or --graph-file"));
                }
            };

            let client = LocalServerClient::from_config(&config);
            let body = client.local_server_caller(&code, &graph, None)?;
            emit_json(body, color_mode);
            Ok(RunOutcome::ok())
        }
        Command::Results {
            query_data,
            graph_id,
            code_id,
        } => {
            let raw = read_text_file(&query_data, "query data")?;
            let entries: Vec<QueryDataEntry> = serde_json::from_str(&raw).map_err(|err| {
                Error::new(ErrorKind::Usage)
                    .with_message("query data must be a JSON array of result json entries")
                    .with_source(err)
            })?;
            let session = Session::new();
            let mut store = session.results();
            let summary = store.load_from_query_data(entries)?;

            let value = match (graph_id, code_id) {
                (Some(graph_id), Some(code_id)) => {
                    let keys = Keys::new(graph_id, code_id);
                    let (Some(string), Some(object)) =
                        (store.current_json_string(&keys), store.current_json_object(&keys))
                    else {
                        return Err(Error::new(ErrorKind::NotFound).with_message(format!(
                            "no result json for graph {} / code {}",
                            keys.graph_id, keys.code_id
                        )));
                    };
                    json!({ "string": string, "object": object })
                }
                _ => json!({
                    "results": summary_json(summary),
                    "strings": store.string_list().unwrap_or_default(),
                    "objects": store.object_list().unwrap_or_default(),
                }),
            };
            emit_json(value, color_mode);
            Ok(RunOutcome::ok())
        }
    }
}

fn load_config(api_url: Option<String>) -> Result<ApiConfig, Error> {
    ApiConfig::from_env_with_url(api_url.as_deref())
}

/// Loads `data.<field>` into the session store. An absent or null field
/// (e.g. `data: null` next to GraphQL errors) skips the load.
fn load_results_field(
    session: &Session,
    data: Option<&Value>,
    field: &str,
) -> Result<Option<LoadSummary>, Error> {
    let Some(set) = data
        .and_then(|data| data.get(field))
        .filter(|set| !set.is_null())
    else {
        debug!(field, "no result json set in response data");
        return Ok(None);
    };
    let entries: Vec<QueryDataEntry> = serde_json::from_value(set.clone()).map_err(|err| {
        Error::new(ErrorKind::Usage)
            .with_message(format!("data.{field} is not a result json set"))
            .with_source(err)
    })?;
    session.results().load_from_query_data(entries).map(Some)
}

fn summary_json(summary: LoadSummary) -> Value {
    json!({
        "records": summary.records,
        "placeholders": summary.placeholders,
    })
}
