//! Cluster topology — node capacities, per-replica service requirements,
//! and the designated cloud node.
//!
//! The model is built once from the externally loaded resource tables and
//! stays read-only for the whole run. Nodes and services carry stable
//! indexes so solutions can use a dense matrix instead of nested maps.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{ModelError, ModelResult};

/// Unique identifier for a node in the cluster.
pub type NodeId = String;

/// Unique identifier for a microservice.
pub type ServiceId = String;

/// Resource capacity of a single node.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NodeSpec {
    pub id: NodeId,
    pub cpu: u32,
    pub memory: u32,
}

/// Per-replica resource requirements of a service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServiceSpec {
    pub id: ServiceId,
    pub cpu: u32,
    pub memory: u32,
}

/// One entry of an externally supplied resource table (`name → {cpu, memory}`).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ResourceSpec {
    pub cpu: u32,
    pub memory: u32,
}

/// The read-only cluster description every optimizer works against.
#[derive(Debug, Clone)]
pub struct ClusterModel {
    nodes: Vec<NodeSpec>,
    services: Vec<ServiceSpec>,
    /// Index of the designated cloud node in `nodes`.
    cloud_node: usize,
    /// Service indexes that must never be placed on the cloud node.
    edge_pinned: Vec<usize>,
}

impl ClusterModel {
    /// Build a model from explicit node/service lists.
    ///
    /// `cloud_node` names the single cloud node; `edge_pinned` lists services
    /// that are constrained to edge nodes.
    pub fn new(
        nodes: Vec<NodeSpec>,
        services: Vec<ServiceSpec>,
        cloud_node: &str,
        edge_pinned: &[ServiceId],
    ) -> ModelResult<Self> {
        if nodes.is_empty() || services.is_empty() {
            return Err(ModelError::EmptyModel);
        }

        let cloud_node = nodes
            .iter()
            .position(|n| n.id == cloud_node)
            .ok_or_else(|| ModelError::UnknownNode(cloud_node.to_string()))?;

        let mut pinned = Vec::with_capacity(edge_pinned.len());
        for id in edge_pinned {
            let idx = services
                .iter()
                .position(|s| &s.id == id)
                .ok_or_else(|| ModelError::UnknownService(id.clone()))?;
            if !pinned.contains(&idx) {
                pinned.push(idx);
            }
        }

        Ok(Self {
            nodes,
            services,
            cloud_node,
            edge_pinned: pinned,
        })
    }

    /// Build a model from the JSON resource tables.
    ///
    /// Table keys are sorted so node/service indexes are deterministic
    /// regardless of map iteration order.
    pub fn from_tables(
        node_table: &HashMap<NodeId, ResourceSpec>,
        service_table: &HashMap<ServiceId, ResourceSpec>,
        cloud_node: &str,
        edge_pinned: &[ServiceId],
    ) -> ModelResult<Self> {
        let mut node_ids: Vec<&NodeId> = node_table.keys().collect();
        node_ids.sort();
        let nodes = node_ids
            .into_iter()
            .map(|id| {
                let spec = node_table[id];
                NodeSpec {
                    id: id.clone(),
                    cpu: spec.cpu,
                    memory: spec.memory,
                }
            })
            .collect();

        let mut service_ids: Vec<&ServiceId> = service_table.keys().collect();
        service_ids.sort();
        let services = service_ids
            .into_iter()
            .map(|id| {
                let spec = service_table[id];
                ServiceSpec {
                    id: id.clone(),
                    cpu: spec.cpu,
                    memory: spec.memory,
                }
            })
            .collect();

        Self::new(nodes, services, cloud_node, edge_pinned)
    }

    pub fn nodes(&self) -> &[NodeSpec] {
        &self.nodes
    }

    pub fn services(&self) -> &[ServiceSpec] {
        &self.services
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn service_count(&self) -> usize {
        self.services.len()
    }

    pub fn cloud_node_index(&self) -> usize {
        self.cloud_node
    }

    pub fn node_index(&self, id: &str) -> Option<usize> {
        self.nodes.iter().position(|n| n.id == id)
    }

    pub fn service_index(&self, id: &str) -> Option<usize> {
        self.services.iter().position(|s| s.id == id)
    }

    /// Whether the service may not run on the cloud node.
    pub fn is_edge_pinned(&self, service: usize) -> bool {
        self.edge_pinned.contains(&service)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(entries: &[(&str, u32, u32)]) -> HashMap<String, ResourceSpec> {
        entries
            .iter()
            .map(|(id, cpu, memory)| {
                (
                    id.to_string(),
                    ResourceSpec {
                        cpu: *cpu,
                        memory: *memory,
                    },
                )
            })
            .collect()
    }

    #[test]
    fn from_tables_sorts_ids() {
        let nodes = table(&[("vm2", 4, 8), ("vm1", 4, 8), ("asus", 16, 32)]);
        let services = table(&[("frontend", 1, 2), ("cart", 1, 1)]);

        let model = ClusterModel::from_tables(&nodes, &services, "asus", &[]).unwrap();

        let ids: Vec<&str> = model.nodes().iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["asus", "vm1", "vm2"]);
        assert_eq!(model.cloud_node_index(), 0);
        assert_eq!(model.service_index("frontend"), Some(1));
    }

    #[test]
    fn unknown_cloud_node_is_rejected() {
        let nodes = table(&[("vm1", 4, 8)]);
        let services = table(&[("cart", 1, 1)]);

        let result = ClusterModel::from_tables(&nodes, &services, "missing", &[]);
        assert!(matches!(result, Err(ModelError::UnknownNode(_))));
    }

    #[test]
    fn unknown_pinned_service_is_rejected() {
        let nodes = table(&[("vm1", 4, 8)]);
        let services = table(&[("cart", 1, 1)]);

        let result =
            ClusterModel::from_tables(&nodes, &services, "vm1", &["frontend".to_string()]);
        assert!(matches!(result, Err(ModelError::UnknownService(_))));
    }

    #[test]
    fn edge_pinned_lookup() {
        let nodes = table(&[("vm1", 4, 8), ("asus", 16, 32)]);
        let services = table(&[("cart", 1, 1), ("frontend", 1, 2)]);

        let model =
            ClusterModel::from_tables(&nodes, &services, "asus", &["frontend".to_string()])
                .unwrap();

        let frontend = model.service_index("frontend").unwrap();
        let cart = model.service_index("cart").unwrap();
        assert!(model.is_edge_pinned(frontend));
        assert!(!model.is_edge_pinned(cart));
    }

    #[test]
    fn empty_model_is_rejected() {
        let result = ClusterModel::new(Vec::new(), Vec::new(), "asus", &[]);
        assert!(matches!(result, Err(ModelError::EmptyModel)));
    }
}
