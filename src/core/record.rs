//! Purpose: Define result JSON records in their string and parsed forms.
//! Exports: `Keys`, `ResultJsonRecord`, `ResultJsonObjectRecord`, `QueryDataEntry`,
//! `ValidatedEntry`, `PlaceholderReason`.
//! Role: Shared data model between the GraphQL response shape and the result store.
//! Invariants: A record is identified by the (graph_id, code_id) pair.
//! Invariants: The object form is always derived from the string form, never edited alone.
//! Invariants: Wire field names are camelCase (`graphId`, `codeId`, `jsonObject`).

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::error::{Error, ErrorKind};
use super::ids::new_model_id;

/// Serialized form of an empty result.
pub const EMPTY_JSON: &str = "[]";

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Keys {
    pub graph_id: String,
    pub code_id: String,
}

impl Keys {
    pub fn new(graph_id: impl Into<String>, code_id: impl Into<String>) -> Self {
        Self {
            graph_id: graph_id.into(),
            code_id: code_id.into(),
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultJsonRecord {
    pub json: String,
    pub graph_id: String,
    pub code_id: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultJsonObjectRecord {
    pub json_object: Value,
    pub graph_id: String,
    pub code_id: String,
}

/// Anything addressable by a (graph, code) pair.
pub trait Keyed {
    fn graph_id(&self) -> &str;
    fn code_id(&self) -> &str;

    fn matches(&self, keys: &Keys) -> bool {
        self.graph_id() == keys.graph_id && self.code_id() == keys.code_id
    }
}

impl Keyed for ResultJsonRecord {
    fn graph_id(&self) -> &str {
        &self.graph_id
    }

    fn code_id(&self) -> &str {
        &self.code_id
    }
}

impl Keyed for ResultJsonObjectRecord {
    fn graph_id(&self) -> &str {
        &self.graph_id
    }

    fn code_id(&self) -> &str {
        &self.code_id
    }
}

impl ResultJsonRecord {
    pub fn new(
        json: impl Into<String>,
        graph_id: impl Into<String>,
        code_id: impl Into<String>,
    ) -> Self {
        Self {
            json: json.into(),
            graph_id: graph_id.into(),
            code_id: code_id.into(),
        }
    }

    /// Empty record under a freshly generated key.
    pub fn placeholder() -> Self {
        let id = new_model_id();
        Self {
            json: EMPTY_JSON.to_string(),
            graph_id: id.clone(),
            code_id: id,
        }
    }

    pub fn keys(&self) -> Keys {
        Keys::new(self.graph_id.clone(), self.code_id.clone())
    }

    /// Parses `json` into the object form; an empty string yields `[]`.
    pub fn to_object(&self) -> Result<ResultJsonObjectRecord, Error> {
        Ok(ResultJsonObjectRecord {
            json_object: parse_result_json(&self.json).map_err(|err| {
                err.with_message(format!(
                    "invalid result json for graph {} / code {}",
                    self.graph_id, self.code_id
                ))
            })?,
            graph_id: self.graph_id.clone(),
            code_id: self.code_id.clone(),
        })
    }
}

pub fn parse_result_json(json: &str) -> Result<Value, Error> {
    if json.is_empty() {
        return Ok(Value::Array(Vec::new()));
    }
    serde_json::from_str(json).map_err(|err| Error::new(ErrorKind::Parse).with_source(err))
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct IdRef {
    pub id: Option<String>,
}

/// One entry of a result JSON set as returned by the GraphQL API.
///
/// Deserialization never fails on the entry's shape: a field that is absent,
/// null, or of the wrong type reads as `None`, so `validate` can turn the
/// entry into a placeholder instead of rejecting the whole set.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(from = "Value")]
pub struct QueryDataEntry {
    pub json: Option<String>,
    pub graph: Option<IdRef>,
    pub code: Option<IdRef>,
}

impl From<Value> for QueryDataEntry {
    fn from(value: Value) -> Self {
        Self {
            json: string_field(&value, "json"),
            graph: id_ref_field(&value, "graph"),
            code: id_ref_field(&value, "code"),
        }
    }
}

fn string_field(value: &Value, field: &str) -> Option<String> {
    value.get(field).and_then(Value::as_str).map(str::to_string)
}

fn id_ref_field(value: &Value, field: &str) -> Option<IdRef> {
    value
        .get(field)
        .filter(|inner| inner.is_object())
        .map(|inner| IdRef {
            id: string_field(inner, "id"),
        })
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PlaceholderReason {
    MissingJson,
    MissingGraphId,
    MissingCodeId,
}

impl PlaceholderReason {
    pub fn as_str(self) -> &'static str {
        match self {
            PlaceholderReason::MissingJson => "missing json",
            PlaceholderReason::MissingGraphId => "missing graph id",
            PlaceholderReason::MissingCodeId => "missing code id",
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ValidatedEntry {
    Valid(ResultJsonRecord),
    Placeholder(PlaceholderReason),
}

impl QueryDataEntry {
    pub fn new(json: &str, graph_id: &str, code_id: &str) -> Self {
        Self {
            json: Some(json.to_string()),
            graph: Some(IdRef {
                id: Some(graph_id.to_string()),
            }),
            code: Some(IdRef {
                id: Some(code_id.to_string()),
            }),
        }
    }

    pub fn validate(self) -> ValidatedEntry {
        let Some(json) = non_empty(self.json) else {
            return ValidatedEntry::Placeholder(PlaceholderReason::MissingJson);
        };
        let Some(graph_id) = non_empty(self.graph.and_then(|graph| graph.id)) else {
            return ValidatedEntry::Placeholder(PlaceholderReason::MissingGraphId);
        };
        let Some(code_id) = non_empty(self.code.and_then(|code| code.id)) else {
            return ValidatedEntry::Placeholder(PlaceholderReason::MissingCodeId);
        };
        ValidatedEntry::Valid(ResultJsonRecord {
            json,
            graph_id,
            code_id,
        })
    }
}

impl ValidatedEntry {
    pub fn is_placeholder(&self) -> bool {
        matches!(self, ValidatedEntry::Placeholder(_))
    }

    pub fn into_record(self) -> ResultJsonRecord {
        match self {
            ValidatedEntry::Valid(record) => record,
            ValidatedEntry::Placeholder(_) => ResultJsonRecord::placeholder(),
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.is_empty())
}
