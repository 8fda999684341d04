// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use armada_model::{DataType, InputDef, NodeSpec as ModelNodeSpec, OutputDef, PortDirection};
use serde_json::json;

fn embedded() -> Workflow {
    let mut wf = Workflow::named("inner")
        .with_node(ModelNodeSpec::new("start", "Start"));
    wf.inputs.push(InputDef {
        name: "count".to_string(),
        data_type: DataType::Integer,
        required: true,
        default: None,
        description: String::new(),
    });
    wf.inputs.push(InputDef {
        name: "label".to_string(),
        data_type: DataType::String,
        required: false,
        default: Some(json!("x")),
        description: String::new(),
    });
    wf.outputs.push(OutputDef {
        name: "result".to_string(),
        data_type: DataType::Any,
        node_id: None,
        port: None,
        description: String::new(),
    });
    wf
}

fn config_with_workflow() -> Map<String, Value> {
    let mut config = Map::new();
    config.insert("workflow".to_string(), serde_json::to_value(embedded()).unwrap());
    config
}

#[test]
fn ports_mirror_embedded_io() {
    let node = SubflowNode::new(&config_with_workflow());
    let ports = node.ports();

    let count = ports.find("count", PortDirection::Input).unwrap();
    assert!(count.required);
    assert_eq!(count.data_type, DataType::Integer);

    let label = ports.find("label", PortDirection::Input).unwrap();
    assert_eq!(label.default, Some(json!("x")));

    assert!(ports.find("result", PortDirection::Output).is_some());
    assert!(ports.find("exec_in", PortDirection::Input).is_some());
    assert!(ports.find("exec_out", PortDirection::Output).is_some());
}

#[test]
fn missing_workflow_config_gives_bare_ports() {
    let node = SubflowNode::new(&Map::new());
    assert!(node.workflow().is_none());
    assert_eq!(node.ports().ports.len(), 2);
}

#[test]
fn malformed_workflow_config_gives_bare_ports() {
    let mut config = Map::new();
    config.insert("workflow".to_string(), json!("not a workflow"));
    let node = SubflowNode::new(&config);
    assert!(node.workflow().is_none());
}

#[tokio::test]
async fn direct_execution_is_refused() {
    use crate::context::ExecutionContext;
    use crate::node::LoopStates;

    let config = config_with_workflow();
    let node = SubflowNode::new(&config);
    let node_id = armada_core::NodeId::new("sub");
    let mut ctx = ExecutionContext::new();
    let mut loops = LoopStates::new();
    let mut node_ctx = NodeCtx {
        node_id: &node_id,
        node_type: "Subflow",
        config: &config,
        inputs: Default::default(),
        context: &mut ctx,
        loops: &mut loops,
    };
    assert!(matches!(
        node.execute(&mut node_ctx).await,
        NodeResult::Failure { kind: FailureKind::Runtime, .. }
    ));
}
