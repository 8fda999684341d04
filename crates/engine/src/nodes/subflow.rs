// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Subflow node: a nested workflow appearing as a single node.
//!
//! Execution is interpreted by the engine (it needs the registry and a
//! recursive run); this type contributes the port surface, derived from
//! the embedded workflow's declared inputs and outputs.

use crate::node::{NodeCtx, NodeInstance, NodeResult};
use armada_core::FailureKind;
use armada_model::{NodePorts, PortDef, Workflow};
use async_trait::async_trait;
use serde_json::{Map, Value};

pub struct SubflowNode {
    embedded: Option<Workflow>,
}

impl SubflowNode {
    pub fn new(config: &Map<String, Value>) -> Self {
        let embedded = config
            .get("workflow")
            .and_then(|v| serde_json::from_value(v.clone()).ok());
        Self { embedded }
    }

    /// The embedded workflow, when the config parses.
    pub fn workflow(&self) -> Option<&Workflow> {
        self.embedded.as_ref()
    }
}

#[async_trait]
impl NodeInstance for SubflowNode {
    fn ports(&self) -> NodePorts {
        let mut ports = vec![PortDef::exec_in("exec_in"), PortDef::exec_out("exec_out")];
        if let Some(wf) = &self.embedded {
            for input in &wf.inputs {
                let mut port = PortDef::input(&input.name, input.data_type);
                port.required = input.required;
                port.default = input.default.clone();
                ports.push(port);
            }
            for output in &wf.outputs {
                ports.push(PortDef::output(&output.name, output.data_type));
            }
        }
        NodePorts::new(ports)
    }

    async fn execute(&self, ctx: &mut NodeCtx<'_>) -> NodeResult {
        // The engine intercepts Subflow nodes before instance dispatch;
        // reaching this path means it was invoked outside an engine run.
        NodeResult::fail(
            ctx.node_id.clone(),
            FailureKind::Runtime,
            "subflow nodes execute only inside an engine run",
        )
    }
}

#[cfg(test)]
#[path = "subflow_tests.rs"]
mod tests;
