use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ErrorInfo, NoiseError, Result};
use crate::histogram::HistogramGrid;
use crate::models::{NoiseEvent, NoiseField, PagedResult};
use crate::search::{parse_date, EventFilter, SearchCriteria};

/// Requests accepted by the worker, discriminated by their `type` field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum IncomingMessage {
    /// Log a new event. Answered by an echo of the stored event.
    SubmitEvent(NoiseEvent),
    GetPage {
        page: i64,
        #[serde(rename = "pageSize", alias = "count")]
        page_size: i64,
    },
    GetDistinctValues {
        field: NoiseField,
    },
    Search(SearchRequest),
}

impl IncomingMessage {
    pub const TAGS: [&'static str; 4] = ["submit-event", "get-page", "get-distinct-values", "search"];

    pub fn is_known_tag(tag: &str) -> bool {
        Self::TAGS.contains(&tag)
    }

    pub fn tag(&self) -> &'static str {
        match self {
            IncomingMessage::SubmitEvent(_) => "submit-event",
            IncomingMessage::GetPage { .. } => "get-page",
            IncomingMessage::GetDistinctValues { .. } => "get-distinct-values",
            IncomingMessage::Search(_) => "search",
        }
    }

    /// Decode a message whose tag is already known to be one of [`Self::TAGS`].
    pub fn decode(raw: &Value) -> Result<Self> {
        serde_json::from_value(raw.clone()).map_err(|e| NoiseError::validation(e.to_string()))
    }

    pub fn to_value(&self) -> Value {
        // Plain data records with string keys always serialize
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// The `type` string of a raw message, if it has one.
pub fn sniff_tag(raw: &Value) -> Option<&str> {
    raw.as_object()?.get("type")?.as_str()
}

/// Search request as it arrives on the wire. Empty strings count as absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchRequest {
    pub from: Option<String>,
    pub to: Option<String>,
    #[serde(alias = "location")]
    pub listener: Option<String>,
    pub source: Option<String>,
    pub noise: Option<String>,
    pub severity: Option<String>,
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

impl SearchRequest {
    pub fn criteria(&self) -> Result<SearchCriteria> {
        let from = non_empty(&self.from).map(parse_date).transpose()?;
        let to = non_empty(&self.to).map(parse_date).transpose()?;

        // Filter needles are matched verbatim, only emptiness is checked
        let filter = EventFilter::new()
            .with(NoiseField::Listener, self.listener.as_deref())
            .with(NoiseField::Source, self.source.as_deref())
            .with(NoiseField::Noise, self.noise.as_deref())
            .with(NoiseField::Severity, self.severity.as_deref());

        SearchCriteria::new(from, to, filter)
    }
}

/// Responses emitted by the worker. Each one names enough of its request
/// (e.g. the `field` of a distinct-value listing) to be matched by content.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum OutgoingMessage {
    SubmitEvent(NoiseEvent),
    PageResult(PagedResult<NoiseEvent>),
    DistinctValues {
        field: NoiseField,
        values: Vec<String>,
    },
    SearchResult {
        logs: Vec<NoiseEvent>,
        histogram: HistogramGrid,
    },
    Error {
        #[serde(rename = "originalRequest")]
        original_request: Value,
        #[serde(rename = "errorInfo")]
        error_info: ErrorInfo,
    },
}

impl OutgoingMessage {
    pub fn error(original_request: Value, err: &NoiseError) -> Self {
        OutgoingMessage::Error {
            original_request,
            error_info: ErrorInfo::from(err),
        }
    }

    pub fn tag(&self) -> &'static str {
        match self {
            OutgoingMessage::SubmitEvent(_) => "submit-event",
            OutgoingMessage::PageResult(_) => "page-result",
            OutgoingMessage::DistinctValues { .. } => "distinct-values",
            OutgoingMessage::SearchResult { .. } => "search-result",
            OutgoingMessage::Error { .. } => "error",
        }
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}
