//! The fitness function: feasibility, predicted latency, dependency bonus.

use std::sync::Arc;

use tracing::debug;

use edgeplan_model::{ClusterModel, Solution};
use edgeplan_trace::{Heatmap, ProcessingTimes, TraceSet};

/// Sentinel score for plans that violate a hard constraint.
///
/// Large enough that any feasible plan beats it; the search treats it as
/// "very slow", not as an error.
pub const INFEASIBLE_PENALTY: f64 = 999_999_999.0;

/// Fixed one-hop network delay in microseconds, charged once per span
/// whose service is not the trace's entry service.
pub const DEFAULT_NETWORK_DELAY_US: f64 = 50_000.0;

/// One span with its lookups already resolved against the model and the
/// processing-time tables.
#[derive(Debug, Clone)]
struct ResolvedSpan {
    service: usize,
    edge_us: f64,
    cloud_us: f64,
    /// Entry spans don't pay the network delay.
    entry: bool,
}

#[derive(Debug, Clone)]
struct ResolvedTrace {
    spans: Vec<ResolvedSpan>,
}

/// Scores candidate plans against the recorded workload.
///
/// Construction resolves every span once (service index, edge/cloud
/// processing times); spans referencing unknown services or missing table
/// entries are reported and contribute zero, per the noisy-trace policy.
#[derive(Debug)]
pub struct Evaluator {
    model: Arc<ClusterModel>,
    traces: Vec<ResolvedTrace>,
    /// Resolved heatmap entries: (service a, service b, weight).
    heatmap: Vec<(usize, usize, f64)>,
    network_delay_us: f64,
}

impl Evaluator {
    pub fn new(
        model: Arc<ClusterModel>,
        traces: &TraceSet,
        edge_times: &ProcessingTimes,
        cloud_times: &ProcessingTimes,
    ) -> Self {
        let resolved = traces
            .data
            .iter()
            .map(|trace| {
                let entry = trace.entry_service().map(str::to_string);
                let spans = trace
                    .spans
                    .iter()
                    .filter_map(|span| {
                        let Some(service) = model.service_index(&span.service_name) else {
                            debug!(
                                service = %span.service_name,
                                trace = %trace.trace_id,
                                "span service not in the cluster model, skipping"
                            );
                            return None;
                        };
                        let lookup = |times: &ProcessingTimes, table: &str| -> f64 {
                            match times
                                .get(&span.service_name)
                                .and_then(|ops| ops.get(&span.operation_name))
                            {
                                Some(us) => *us as f64,
                                None => {
                                    debug!(
                                        service = %span.service_name,
                                        operation = %span.operation_name,
                                        table,
                                        "no processing time recorded, counting zero"
                                    );
                                    0.0
                                }
                            }
                        };
                        Some(ResolvedSpan {
                            service,
                            edge_us: lookup(edge_times, "edge"),
                            cloud_us: lookup(cloud_times, "cloud"),
                            entry: entry.as_deref() == Some(span.service_name.as_str()),
                        })
                    })
                    .collect();
                ResolvedTrace { spans }
            })
            .collect();

        Self {
            model,
            traces: resolved,
            heatmap: Vec::new(),
            network_delay_us: DEFAULT_NETWORK_DELAY_US,
        }
    }

    /// Attach a dependency heatmap; its aggregate co-location term is
    /// subtracted from the predicted latency as a bonus.
    pub fn with_heatmap(mut self, heatmap: &Heatmap) -> Self {
        self.heatmap = heatmap
            .iter()
            .filter_map(|(from, to, weight)| {
                let a = self.model.service_index(from);
                let b = self.model.service_index(to);
                match (a, b) {
                    (Some(a), Some(b)) => Some((a, b, weight)),
                    _ => {
                        debug!(from, to, "heatmap pair not in the cluster model, skipping");
                        None
                    }
                }
            })
            .collect();
        self
    }

    /// Override the per-hop network delay (µs).
    pub fn with_network_delay(mut self, delay_us: f64) -> Self {
        self.network_delay_us = delay_us;
        self
    }

    pub fn model(&self) -> &Arc<ClusterModel> {
        &self.model
    }

    /// Whether the plan fits every node and respects edge pinning.
    pub fn is_feasible(&self, solution: &Solution) -> bool {
        let cloud = self.model.cloud_node_index();
        for (s, _) in self.model.services().iter().enumerate() {
            if self.model.is_edge_pinned(s) && solution.get(cloud, s) > 0 {
                return false;
            }
        }

        for (n, node) in self.model.nodes().iter().enumerate() {
            let mut cpu = 0u64;
            let mut memory = 0u64;
            for (s, service) in self.model.services().iter().enumerate() {
                let replicas = u64::from(solution.get(n, s));
                cpu += replicas * u64::from(service.cpu);
                memory += replicas * u64::from(service.memory);
            }
            if cpu > u64::from(node.cpu) || memory > u64::from(node.memory) {
                return false;
            }
        }
        true
    }

    /// Score a plan. Lower is better; a negative score (bonus exceeding
    /// the predicted latency) is valid.
    pub fn evaluate(&self, solution: &Solution) -> f64 {
        if !self.is_feasible(solution) {
            return INFEASIBLE_PENALTY;
        }

        let cloud = self.model.cloud_node_index();
        let services = self.model.service_count();

        // Per-service probability that a request hits the cloud replica set.
        let mut totals = vec![0u32; services];
        let mut cloud_probability = vec![0.0f64; services];
        for (s, probability) in cloud_probability.iter_mut().enumerate() {
            let total = solution.service_total(s);
            totals[s] = total;
            if total > 0 {
                *probability = f64::from(solution.get(cloud, s)) / f64::from(total);
            }
        }

        let mut predicted_sum = 0.0;
        for trace in &self.traces {
            let mut duration = 0.0;
            for span in &trace.spans {
                let p = cloud_probability[span.service];
                duration += p * span.cloud_us + (1.0 - p) * span.edge_us;
                if !span.entry {
                    duration += self.network_delay_us;
                }
            }
            predicted_sum += duration;
        }
        let average = if self.traces.is_empty() {
            0.0
        } else {
            predicted_sum / self.traces.len() as f64
        };

        // Co-location bonus: probability both services share a node,
        // weighted by dependency strength.
        let mut bonus = 0.0;
        for &(a, b, weight) in &self.heatmap {
            if totals[a] == 0 || totals[b] == 0 {
                continue;
            }
            let mut co_location = 0.0;
            for n in 0..self.model.node_count() {
                let pa = f64::from(solution.get(n, a)) / f64::from(totals[a]);
                let pb = f64::from(solution.get(n, b)) / f64::from(totals[b]);
                co_location += pa * pb;
            }
            bonus += co_location * weight;
        }

        average - bonus
    }
}
