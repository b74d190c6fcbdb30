//! Trace set and processing-time table shapes.
//!
//! The JSON layout mirrors the tracing-backend export the original tables
//! were generated from: a `data` array of traces, each with flattened spans
//! that already carry their service and parent-service names. Timestamps
//! and durations are microseconds.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// `service → operation → microseconds` lookup table.
pub type ProcessingTimes = HashMap<String, HashMap<String, u64>>;

/// One span of a recorded trace.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Span {
    #[serde(rename = "spanID", default)]
    pub span_id: String,
    pub operation_name: String,
    pub service_name: String,
    /// Service of the parent span, absent for roots.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_service: Option<String>,
    /// Microseconds since epoch.
    #[serde(default)]
    pub start_time: i64,
    /// Microseconds.
    #[serde(default)]
    pub duration: i64,
}

/// One recorded end-to-end request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Trace {
    #[serde(rename = "traceID", default)]
    pub trace_id: String,
    /// Recorded end-to-end duration in microseconds.
    #[serde(default)]
    pub duration: i64,
    pub spans: Vec<Span>,
}

impl Trace {
    /// The service the request entered through — the earliest-starting span.
    pub fn entry_service(&self) -> Option<&str> {
        self.spans
            .iter()
            .min_by_key(|s| s.start_time)
            .map(|s| s.service_name.as_str())
    }
}

/// A set of recorded traces.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TraceSet {
    pub data: Vec<Trace>,
}

impl TraceSet {
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn span(service: &str, start: i64) -> Span {
        Span {
            span_id: String::new(),
            operation_name: "op".to_string(),
            service_name: service.to_string(),
            parent_service: None,
            start_time: start,
            duration: 10,
        }
    }

    #[test]
    fn entry_service_is_earliest_span() {
        let trace = Trace {
            trace_id: "t1".to_string(),
            duration: 100,
            spans: vec![span("cart", 20), span("frontend", 5), span("payment", 30)],
        };
        assert_eq!(trace.entry_service(), Some("frontend"));
    }

    #[test]
    fn entry_service_of_empty_trace_is_none() {
        let trace = Trace {
            trace_id: "t1".to_string(),
            duration: 0,
            spans: Vec::new(),
        };
        assert_eq!(trace.entry_service(), None);
    }

    #[test]
    fn parses_backend_export_shape() {
        let json = r#"{
            "data": [{
                "traceID": "abc",
                "duration": 1200,
                "spans": [{
                    "spanID": "s1",
                    "operationName": "GET /cart",
                    "serviceName": "frontend",
                    "startTime": 100,
                    "duration": 900
                }, {
                    "spanID": "s2",
                    "operationName": "GetCart",
                    "serviceName": "cartservice",
                    "parentService": "frontend",
                    "startTime": 150,
                    "duration": 300
                }]
            }]
        }"#;

        let traces: TraceSet = serde_json::from_str(json).unwrap();
        assert_eq!(traces.len(), 1);
        assert_eq!(traces.data[0].spans.len(), 2);
        assert_eq!(
            traces.data[0].spans[1].parent_service.as_deref(),
            Some("frontend")
        );
        assert_eq!(traces.data[0].entry_service(), Some("frontend"));
    }
}
