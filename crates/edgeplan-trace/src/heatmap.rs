//! Pairwise service-dependency weights.
//!
//! A heatmap maps directed service pairs to a strength the fitness
//! evaluator uses to reward co-location. Two sources:
//!
//! - raw call counts ([`Heatmap::from_call_counts`])
//! - invocation-chain dependency strength (DepIC, [`dep_ic_heatmap`]):
//!   services that ride the same call chains depend on each other more
//!   than their direct call count shows.

use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::path::Path;

use tracing::debug;

use crate::calls::{CallKey, count_service_calls};
use crate::error::{TraceError, TraceResult};
use crate::types::TraceSet;

const CSV_HEADER: &str = "from,to,value";

/// Read-only `(service, service) → weight` table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Heatmap {
    weights: HashMap<(String, String), f64>,
}

impl Heatmap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, from: &str, to: &str, weight: f64) {
        self.weights
            .insert((from.to_string(), to.to_string()), weight);
    }

    pub fn get(&self, from: &str, to: &str) -> Option<f64> {
        self.weights
            .get(&(from.to_string(), to.to_string()))
            .copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str, f64)> {
        self.weights
            .iter()
            .map(|((from, to), weight)| (from.as_str(), to.as_str(), *weight))
    }

    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    /// Build a heatmap directly from recorded call counts.
    pub fn from_call_counts(counts: &HashMap<CallKey, u64>) -> Self {
        let mut heatmap = Self::new();
        for (key, count) in counts {
            heatmap.insert(&key.from, &key.to, *count as f64);
        }
        heatmap
    }

    /// Load a `from,to,value` CSV heatmap.
    pub fn from_csv(path: &Path) -> TraceResult<Self> {
        let raw = fs::read_to_string(path).map_err(|source| TraceError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let mut heatmap = Self::new();
        for (idx, line) in raw.lines().enumerate() {
            if idx == 0 {
                // Header row.
                continue;
            }
            if line.trim().is_empty() {
                continue;
            }
            let mut parts = line.splitn(3, ',');
            let (Some(from), Some(to), Some(value)) = (parts.next(), parts.next(), parts.next())
            else {
                return Err(TraceError::HeatmapRow {
                    path: path.to_path_buf(),
                    line: idx + 1,
                    reason: "expected three comma-separated fields".to_string(),
                });
            };
            let weight: f64 = value.trim().parse().map_err(|_| TraceError::HeatmapRow {
                path: path.to_path_buf(),
                line: idx + 1,
                reason: format!("bad weight {value:?}"),
            })?;
            heatmap.insert(from.trim(), to.trim(), weight);
        }

        debug!(path = %path.display(), pairs = heatmap.len(), "loaded heatmap");
        Ok(heatmap)
    }

    /// Write the heatmap as a `from,to,value` CSV, sorted for stable diffs.
    pub fn to_csv(&self, path: &Path) -> TraceResult<()> {
        let mut rows: Vec<(&str, &str, f64)> = self.iter().collect();
        rows.sort_by(|a, b| (a.0, a.1).cmp(&(b.0, b.1)));

        let mut out = String::from(CSV_HEADER);
        out.push('\n');
        for (from, to, weight) in rows {
            out.push_str(&format!("{from},{to},{weight}\n"));
        }

        fs::write(path, out).map_err(|source| TraceError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Extract root-to-leaf service chains per trace, with occurrence counts.
///
/// Each trace contributes its service call graph; every root-to-leaf path
/// through that graph counts once. Cycles (possible with noisy parent
/// attribution) are cut at the repeated service.
pub fn invocation_chains(traces: &TraceSet) -> HashMap<Vec<String>, u64> {
    let mut chains: HashMap<Vec<String>, u64> = HashMap::new();

    for trace in &traces.data {
        let mut children: HashMap<&str, BTreeSet<&str>> = HashMap::new();
        let mut callees: BTreeSet<&str> = BTreeSet::new();
        let mut services: BTreeSet<&str> = BTreeSet::new();

        for span in &trace.spans {
            services.insert(span.service_name.as_str());
            if let Some(parent) = span.parent_service.as_deref() {
                if !parent.is_empty() && parent != span.service_name {
                    children
                        .entry(parent)
                        .or_default()
                        .insert(span.service_name.as_str());
                    callees.insert(span.service_name.as_str());
                    services.insert(parent);
                }
            }
        }

        let roots: Vec<&str> = services
            .iter()
            .copied()
            .filter(|s| !callees.contains(s))
            .collect();

        for root in roots {
            let mut path = vec![root];
            walk_chains(root, &children, &mut path, &mut chains);
        }
    }

    chains
}

fn walk_chains<'a>(
    current: &'a str,
    children: &HashMap<&'a str, BTreeSet<&'a str>>,
    path: &mut Vec<&'a str>,
    chains: &mut HashMap<Vec<String>, u64>,
) {
    let next: Vec<&'a str> = children
        .get(current)
        .map(|set| {
            set.iter()
                .copied()
                .filter(|child| !path.contains(child))
                .collect()
        })
        .unwrap_or_default();

    if next.is_empty() {
        let chain: Vec<String> = path.iter().map(|s| s.to_string()).collect();
        *chains.entry(chain).or_insert(0) += 1;
        return;
    }

    for child in next {
        path.push(child);
        walk_chains(child, children, path, chains);
        path.pop();
    }
}

/// Dependency strength of a service pair from invocation chains.
///
/// With `Cd(m)` the share of all direct calls issued by `m`, and `Num(..)`
/// the occurrence counts of chains containing the given service(s):
///
/// `DepIC(a,b) = (1/(Cd(a)+1))·Num(a,b)/Num(a) + (1/(Cd(b)+1))·Num(a,b)/Num(b)`
pub fn dep_ic(
    a: &str,
    b: &str,
    chains: &HashMap<Vec<String>, u64>,
    calls: &HashMap<CallKey, u64>,
) -> f64 {
    let mut num_a = 0u64;
    let mut num_b = 0u64;
    let mut num_ab = 0u64;
    for (chain, count) in chains {
        let has_a = chain.iter().any(|s| s == a);
        let has_b = chain.iter().any(|s| s == b);
        if has_a {
            num_a += count;
        }
        if has_b {
            num_b += count;
        }
        if has_a && has_b {
            num_ab += count;
        }
    }

    let total_calls: u64 = calls.values().sum();
    let calls_from = |service: &str| -> u64 {
        calls
            .iter()
            .filter(|(key, _)| key.from == service)
            .map(|(_, count)| count)
            .sum()
    };
    let cd = |service: &str| -> f64 {
        if total_calls == 0 {
            0.0
        } else {
            calls_from(service) as f64 / total_calls as f64
        }
    };

    const EPSILON: f64 = 1.0;
    let mut strength = 0.0;
    if num_a > 0 {
        strength += (1.0 / (cd(a) + EPSILON)) * (num_ab as f64 / num_a as f64);
    }
    if num_b > 0 {
        strength += (1.0 / (cd(b) + EPSILON)) * (num_ab as f64 / num_b as f64);
    }
    strength
}

/// Compute the full DepIC heatmap over every service pair seen in the
/// trace set. Zero-strength pairs are omitted.
pub fn dep_ic_heatmap(traces: &TraceSet) -> Heatmap {
    let chains = invocation_chains(traces);
    let calls = count_service_calls(traces);

    let mut services: BTreeSet<&str> = BTreeSet::new();
    for trace in &traces.data {
        for span in &trace.spans {
            services.insert(span.service_name.as_str());
        }
    }

    let mut heatmap = Heatmap::new();
    for a in &services {
        for b in &services {
            if a == b {
                continue;
            }
            let strength = dep_ic(a, b, &chains, &calls);
            if strength > 0.0 {
                heatmap.insert(a, b, strength);
            }
        }
    }
    heatmap
}
