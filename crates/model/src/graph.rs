// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Graph traversal over a workflow.

use crate::connection::Connection;
use crate::node_types;
use crate::workflow::Workflow;
use armada_core::NodeId;
use std::collections::{HashMap, HashSet, VecDeque};

/// Filter applied when walking edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeFilter {
    /// Only execution edges (control flow).
    Execution,
    /// Only data edges.
    Data,
    /// All edges.
    All,
}

impl Workflow {
    fn edge_is_execution(&self, conn: &Connection) -> bool {
        // A connection is a control edge when its target port is one of
        // the conventional execution inputs. Validation has already pinned
        // port types; here a name check keeps traversal free of the
        // catalog.
        conn.target_port == "exec_in" || conn.target_port.starts_with("exec_")
    }

    fn edge_matches(&self, conn: &Connection, filter: EdgeFilter) -> bool {
        match filter {
            EdgeFilter::All => true,
            EdgeFilter::Execution => self.edge_is_execution(conn),
            EdgeFilter::Data => !self.edge_is_execution(conn),
        }
    }

    /// Nodes reachable from `node` over one outgoing edge, with the source
    /// port each edge leaves through.
    pub fn successors(&self, node: &NodeId, filter: EdgeFilter) -> Vec<(NodeId, String)> {
        self.connections
            .iter()
            .filter(|c| &c.source_node == node && self.edge_matches(c, filter))
            .map(|c| (c.target_node.clone(), c.source_port.clone()))
            .collect()
    }

    /// Nodes feeding `node` over one incoming edge, with the target port
    /// each edge arrives on.
    pub fn predecessors(&self, node: &NodeId, filter: EdgeFilter) -> Vec<(NodeId, String)> {
        self.connections
            .iter()
            .filter(|c| &c.target_node == node && self.edge_matches(c, filter))
            .map(|c| (c.source_node.clone(), c.target_port.clone()))
            .collect()
    }

    /// Control-flow successors reached from a specific execution output
    /// port of `node`.
    pub fn execution_successors(&self, node: &NodeId, port: &str) -> Vec<NodeId> {
        let mut out: Vec<NodeId> = self
            .connections
            .iter()
            .filter(|c| {
                &c.source_node == node && c.source_port == port && self.edge_is_execution(c)
            })
            .map(|c| c.target_node.clone())
            .collect();
        out.sort();
        out
    }

    /// Incoming data connections for `node`, keyed by target port.
    pub fn data_sources(&self, node: &NodeId) -> HashMap<String, &Connection> {
        self.connections
            .iter()
            .filter(|c| &c.target_node == node && !self.edge_is_execution(c))
            .map(|c| (c.target_port.clone(), c))
            .collect()
    }

    /// The workflow's `Start` node, if declared.
    pub fn find_start_node(&self) -> Option<NodeId> {
        self.nodes
            .values()
            .find(|n| n.node_type == node_types::START)
            .map(|n| n.id.clone())
    }

    /// Nodes with no incoming execution edge, in stable NodeId order.
    pub fn find_entry_nodes(&self) -> Vec<NodeId> {
        let mut with_exec_in: HashSet<&NodeId> = HashSet::new();
        for conn in &self.connections {
            if self.edge_is_execution(conn) {
                with_exec_in.insert(&conn.target_node);
            }
        }
        let mut entries: Vec<NodeId> = self
            .nodes
            .keys()
            .filter(|id| !with_exec_in.contains(id))
            .cloned()
            .collect();
        entries.sort();
        entries
    }

    /// Whether an edge closes a loop: its target is a loop start and its
    /// source sits inside that loop's body (the edge a canvas draws from
    /// the loop end back up). Such edges are skipped during topological
    /// ordering; at runtime the loop re-entry travels through
    /// `loop_back_to` instead.
    fn is_loop_back_edge(&self, conn: &Connection) -> bool {
        let Some(target) = self.nodes.get(&conn.target_node) else {
            return false;
        };
        if !node_types::is_loop_start(&target.node_type) {
            return false;
        }
        let Some(source) = self.nodes.get(&conn.source_node) else {
            return false;
        };
        let paired = source
            .config_str("paired_start_id")
            .or_else(|| source.config_str("paired_loop_start_id"));
        paired == Some(conn.target_node.as_str())
    }

    /// Kahn topological order over execution edges, excluding loop-back
    /// edges. Remaining cyclic nodes (invalid graphs) are appended in
    /// stable order so the result always covers every node.
    pub fn topological_order(&self) -> Vec<NodeId> {
        let mut in_degree: HashMap<&NodeId, usize> =
            self.nodes.keys().map(|id| (id, 0)).collect();
        let mut edges: Vec<&Connection> = Vec::new();

        for conn in &self.connections {
            if !self.edge_is_execution(conn) || self.is_loop_back_edge(conn) {
                continue;
            }
            if self.nodes.contains_key(&conn.source_node)
                && self.nodes.contains_key(&conn.target_node)
            {
                *in_degree.entry(&conn.target_node).or_insert(0) += 1;
                edges.push(conn);
            }
        }

        let mut ready: VecDeque<&NodeId> = {
            let mut roots: Vec<&NodeId> = in_degree
                .iter()
                .filter(|(_, d)| **d == 0)
                .map(|(id, _)| *id)
                .collect();
            roots.sort();
            roots.into()
        };

        let mut order: Vec<NodeId> = Vec::with_capacity(self.nodes.len());
        let mut seen: HashSet<&NodeId> = HashSet::new();

        while let Some(node) = ready.pop_front() {
            if !seen.insert(node) {
                continue;
            }
            order.push(node.clone());
            let mut unlocked: Vec<&NodeId> = Vec::new();
            for conn in &edges {
                if &conn.source_node == node {
                    let d = in_degree.entry(&conn.target_node).or_insert(0);
                    *d = d.saturating_sub(1);
                    if *d == 0 {
                        unlocked.push(&conn.target_node);
                    }
                }
            }
            unlocked.sort();
            ready.extend(unlocked);
        }

        // Cycles not excused by loop pairing: append leftovers rather than
        // dropping them, so callers can still report over the full set.
        let mut leftover: Vec<NodeId> = self
            .nodes
            .keys()
            .filter(|id| !seen.contains(id))
            .cloned()
            .collect();
        leftover.sort();
        order.extend(leftover);
        order
    }
}

#[cfg(test)]
#[path = "graph_tests.rs"]
mod tests;
