//! Directed service-call counting.

use std::collections::HashMap;

use crate::types::TraceSet;

/// A directed caller → callee pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CallKey {
    pub from: String,
    pub to: String,
}

/// Count every recorded cross-service call in the trace set.
///
/// Spans without a parent service, and spans whose parent is the same
/// service, are not calls.
pub fn count_service_calls(traces: &TraceSet) -> HashMap<CallKey, u64> {
    let mut counts = HashMap::new();
    for trace in &traces.data {
        for span in &trace.spans {
            let Some(parent) = span.parent_service.as_deref() else {
                continue;
            };
            if parent.is_empty() || parent == span.service_name {
                continue;
            }
            let key = CallKey {
                from: parent.to_string(),
                to: span.service_name.clone(),
            };
            *counts.entry(key).or_insert(0) += 1;
        }
    }
    counts
}
