// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Structural workflow validation.

use crate::node_types;
use crate::port::{DataType, PortDef, PortDirection};
use crate::workflow::Workflow;
use armada_core::NodeId;
use std::collections::HashMap;

/// Maximum nesting depth for embedded subflow graphs.
const MAX_SUBFLOW_DEPTH: usize = 8;

/// Declared port set for one node type.
#[derive(Debug, Clone, Default)]
pub struct NodePorts {
    pub ports: Vec<PortDef>,
}

impl NodePorts {
    pub fn new(ports: Vec<PortDef>) -> Self {
        Self { ports }
    }

    pub fn find(&self, name: &str, direction: PortDirection) -> Option<&PortDef> {
        self.ports.iter().find(|p| p.name == name && p.direction == direction)
    }

    pub fn inputs(&self) -> impl Iterator<Item = &PortDef> {
        self.ports.iter().filter(|p| p.direction == PortDirection::Input)
    }

    pub fn outputs(&self) -> impl Iterator<Item = &PortDef> {
        self.ports.iter().filter(|p| p.direction == PortDirection::Output)
    }
}

/// Source of port declarations per node.
///
/// Implemented by the engine's node registry; the model crate stays free of
/// node implementations. The full spec is passed (not just the type name)
/// because some nodes derive ports from their config — a Subflow's output
/// ports mirror its embedded workflow's declared outputs. `None` means the
/// type is unknown and the workflow is rejected.
pub trait PortCatalog {
    fn ports(&self, node: &crate::node::NodeSpec) -> Option<NodePorts>;
}

/// One validation finding. All issues are collected in a single pass so a
/// caller can show the complete list rather than the first failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Issue {
    UnknownNodeType { node: NodeId, node_type: String },
    MissingEndpoint { node: NodeId },
    UnknownPort { node: NodeId, port: String, direction: PortDirection },
    DirectionMismatch { connection: String },
    TypeMismatch { connection: String, source: DataType, target: DataType },
    DuplicateDataInput { node: NodeId, port: String },
    MultipleStartNodes { nodes: Vec<NodeId> },
    UnpairedLoopEnd { node: NodeId, start_id: String },
    MismatchedLoopPair { end: NodeId, start: NodeId },
    InvalidLoopReference { node: NodeId, start_id: String },
    InvalidSubflow { node: NodeId, reason: String },
}

impl std::fmt::Display for Issue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Issue::UnknownNodeType { node, node_type } => {
                write!(f, "node '{node}' has unknown type '{node_type}'")
            }
            Issue::MissingEndpoint { node } => {
                write!(f, "connection references missing node '{node}'")
            }
            Issue::UnknownPort { node, port, direction } => {
                write!(f, "node '{node}' has no {direction} port '{port}'")
            }
            Issue::DirectionMismatch { connection } => {
                write!(f, "connection '{connection}' does not run output -> input")
            }
            Issue::TypeMismatch { connection, source, target } => {
                write!(f, "connection '{connection}' is type-incompatible ({source} -> {target})")
            }
            Issue::DuplicateDataInput { node, port } => {
                write!(f, "input port '{node}:{port}' has more than one incoming data edge")
            }
            Issue::MultipleStartNodes { nodes } => {
                write!(f, "workflow has {} Start nodes (at most one allowed)", nodes.len())
            }
            Issue::UnpairedLoopEnd { node, start_id } => {
                write!(f, "loop end '{node}' names missing start '{start_id}'")
            }
            Issue::MismatchedLoopPair { end, start } => {
                write!(f, "loop end '{end}' pairs with incompatible start '{start}'")
            }
            Issue::InvalidLoopReference { node, start_id } => {
                write!(f, "'{node}' references invalid loop start '{start_id}'")
            }
            Issue::InvalidSubflow { node, reason } => {
                write!(f, "subflow node '{node}': {reason}")
            }
        }
    }
}

impl Workflow {
    /// Validate graph structure against the catalog's declared ports.
    ///
    /// Returns every issue found; an empty list means the workflow is safe
    /// to execute.
    pub fn validate(&self, catalog: &dyn PortCatalog) -> Vec<Issue> {
        self.validate_at_depth(catalog, 0)
    }

    fn validate_at_depth(&self, catalog: &dyn PortCatalog, depth: usize) -> Vec<Issue> {
        let mut issues = Vec::new();

        // Resolve each node's port set once.
        let mut ports_by_node: HashMap<&NodeId, NodePorts> = HashMap::new();
        for (id, node) in &self.nodes {
            match catalog.ports(node) {
                Some(ports) => {
                    ports_by_node.insert(id, ports);
                }
                None => issues.push(Issue::UnknownNodeType {
                    node: id.clone(),
                    node_type: node.node_type.clone(),
                }),
            }
        }

        self.check_connections(&ports_by_node, &mut issues);
        self.check_start_nodes(&mut issues);
        self.check_loop_pairs(&mut issues);
        self.check_subflows(catalog, depth, &mut issues);

        issues
    }

    fn check_connections(
        &self,
        ports_by_node: &HashMap<&NodeId, NodePorts>,
        issues: &mut Vec<Issue>,
    ) {
        // (target node, port) -> number of incoming data edges
        let mut data_in_counts: HashMap<(&NodeId, &str), u32> = HashMap::new();

        for conn in &self.connections {
            let label = conn.to_string();

            let (src_ports, dst_ports) = match (
                ports_by_node.get(&conn.source_node),
                ports_by_node.get(&conn.target_node),
            ) {
                (Some(s), Some(d)) => (s, d),
                (s, d) => {
                    if s.is_none() && self.nodes.get(&conn.source_node).is_none() {
                        issues.push(Issue::MissingEndpoint { node: conn.source_node.clone() });
                    }
                    if d.is_none() && self.nodes.get(&conn.target_node).is_none() {
                        issues.push(Issue::MissingEndpoint { node: conn.target_node.clone() });
                    }
                    continue;
                }
            };

            let source = match src_ports.find(&conn.source_port, PortDirection::Output) {
                Some(p) => p,
                None => {
                    // Wrong direction if the name exists as an input.
                    if src_ports.find(&conn.source_port, PortDirection::Input).is_some() {
                        issues.push(Issue::DirectionMismatch { connection: label });
                    } else {
                        issues.push(Issue::UnknownPort {
                            node: conn.source_node.clone(),
                            port: conn.source_port.clone(),
                            direction: PortDirection::Output,
                        });
                    }
                    continue;
                }
            };
            let target = match dst_ports.find(&conn.target_port, PortDirection::Input) {
                Some(p) => p,
                None => {
                    if dst_ports.find(&conn.target_port, PortDirection::Output).is_some() {
                        issues.push(Issue::DirectionMismatch { connection: label });
                    } else {
                        issues.push(Issue::UnknownPort {
                            node: conn.target_node.clone(),
                            port: conn.target_port.clone(),
                            direction: PortDirection::Input,
                        });
                    }
                    continue;
                }
            };

            if !DataType::accepts(source.data_type, target.data_type) {
                issues.push(Issue::TypeMismatch {
                    connection: label,
                    source: source.data_type,
                    target: target.data_type,
                });
                continue;
            }

            // Execution fan-in is allowed; data fan-in is not.
            if !target.is_execution() {
                let count = data_in_counts
                    .entry((&conn.target_node, conn.target_port.as_str()))
                    .or_insert(0);
                *count += 1;
                if *count == 2 {
                    issues.push(Issue::DuplicateDataInput {
                        node: conn.target_node.clone(),
                        port: conn.target_port.clone(),
                    });
                }
            }
        }
    }

    fn check_start_nodes(&self, issues: &mut Vec<Issue>) {
        let starts: Vec<NodeId> = self
            .nodes
            .values()
            .filter(|n| n.node_type == node_types::START)
            .map(|n| n.id.clone())
            .collect();
        if starts.len() > 1 {
            issues.push(Issue::MultipleStartNodes { nodes: starts });
        }
    }

    fn check_loop_pairs(&self, issues: &mut Vec<Issue>) {
        for node in self.nodes.values() {
            if node_types::is_loop_end(&node.node_type) {
                let start_id = node.config_str("paired_start_id").unwrap_or_default();
                match self.nodes.get(start_id) {
                    None => issues.push(Issue::UnpairedLoopEnd {
                        node: node.id.clone(),
                        start_id: start_id.to_string(),
                    }),
                    Some(start) => {
                        let expected = node_types::paired_start_type(&node.node_type);
                        if expected != Some(start.node_type.as_str()) {
                            issues.push(Issue::MismatchedLoopPair {
                                end: node.id.clone(),
                                start: start.id.clone(),
                            });
                        }
                    }
                }
            }

            if node.node_type == node_types::BREAK || node.node_type == node_types::CONTINUE {
                let start_id = node.config_str("paired_loop_start_id").unwrap_or_default();
                let valid = self
                    .nodes
                    .get(start_id)
                    .map(|n| node_types::is_loop_start(&n.node_type))
                    .unwrap_or(false);
                if !valid {
                    issues.push(Issue::InvalidLoopReference {
                        node: node.id.clone(),
                        start_id: start_id.to_string(),
                    });
                }
            }
        }
    }

    fn check_subflows(&self, catalog: &dyn PortCatalog, depth: usize, issues: &mut Vec<Issue>) {
        for node in self.nodes.values() {
            if node.node_type != node_types::SUBFLOW {
                continue;
            }
            if depth >= MAX_SUBFLOW_DEPTH {
                issues.push(Issue::InvalidSubflow {
                    node: node.id.clone(),
                    reason: format!("nesting exceeds {MAX_SUBFLOW_DEPTH} levels"),
                });
                continue;
            }
            let Some(embedded) = node.config_value("workflow") else {
                issues.push(Issue::InvalidSubflow {
                    node: node.id.clone(),
                    reason: "missing embedded workflow".to_string(),
                });
                continue;
            };
            match serde_json::from_value::<Workflow>(embedded.clone()) {
                Ok(subflow) => {
                    for issue in subflow.validate_at_depth(catalog, depth + 1) {
                        issues.push(Issue::InvalidSubflow {
                            node: node.id.clone(),
                            reason: issue.to_string(),
                        });
                    }
                }
                Err(e) => issues.push(Issue::InvalidSubflow {
                    node: node.id.clone(),
                    reason: format!("embedded workflow does not parse: {e}"),
                }),
            }
        }
    }
}

#[cfg(test)]
#[path = "validate_tests.rs"]
mod tests;
