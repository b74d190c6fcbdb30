//! A candidate deployment plan — how many replicas of each service run on
//! each node.
//!
//! Stored as a dense node-major matrix; every (node, service) cell exists
//! and counts are non-negative by construction. The external artifact shape
//! is the nested `node → service → count` map the cluster applier consumes.

use std::collections::BTreeMap;

use crate::cluster::ClusterModel;
use crate::error::{ModelError, ModelResult};

/// Replica counts for every (node, service) pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Solution {
    nodes: usize,
    services: usize,
    counts: Vec<u32>,
}

impl Solution {
    /// An all-zero plan shaped for the given model.
    pub fn zeroed(model: &ClusterModel) -> Self {
        Self {
            nodes: model.node_count(),
            services: model.service_count(),
            counts: vec![0; model.node_count() * model.service_count()],
        }
    }

    pub fn node_count(&self) -> usize {
        self.nodes
    }

    pub fn service_count(&self) -> usize {
        self.services
    }

    pub fn get(&self, node: usize, service: usize) -> u32 {
        self.counts[node * self.services + service]
    }

    pub fn set(&mut self, node: usize, service: usize, count: u32) {
        self.counts[node * self.services + service] = count;
    }

    pub fn add(&mut self, node: usize, service: usize, delta: u32) {
        self.counts[node * self.services + service] += delta;
    }

    /// Total replicas of one service across all nodes.
    pub fn service_total(&self, service: usize) -> u32 {
        (0..self.nodes).map(|n| self.get(n, service)).sum()
    }

    /// Total replicas in the whole plan.
    pub fn total(&self) -> u32 {
        self.counts.iter().sum()
    }

    /// Serialize as the nested `node → service → count` artifact map.
    ///
    /// BTreeMaps keep the artifact stable across runs.
    pub fn to_node_map(&self, model: &ClusterModel) -> BTreeMap<String, BTreeMap<String, u32>> {
        let mut map = BTreeMap::new();
        for (n, node) in model.nodes().iter().enumerate() {
            let mut row = BTreeMap::new();
            for (s, service) in model.services().iter().enumerate() {
                row.insert(service.id.clone(), self.get(n, s));
            }
            map.insert(node.id.clone(), row);
        }
        map
    }

    /// Rebuild a solution from the nested artifact map.
    ///
    /// Missing cells default to zero; unknown node or service names are
    /// rejected.
    pub fn from_node_map(
        model: &ClusterModel,
        map: &BTreeMap<String, BTreeMap<String, u32>>,
    ) -> ModelResult<Self> {
        let mut solution = Self::zeroed(model);
        for (node_id, row) in map {
            let n = model
                .node_index(node_id)
                .ok_or_else(|| ModelError::UnknownNode(node_id.clone()))?;
            for (service_id, count) in row {
                let s = model
                    .service_index(service_id)
                    .ok_or_else(|| ModelError::UnknownService(service_id.clone()))?;
                solution.set(n, s, *count);
            }
        }
        Ok(solution)
    }
}
