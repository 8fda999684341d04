// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serde_json::json;

fn sample() -> Workflow {
    Workflow::named("sample")
        .with_node(NodeSpec::new("start", "Start"))
        .with_node(
            NodeSpec::new("set_x", "SetVariable")
                .with_config("name", json!("x"))
                .with_config("value", json!(10)),
        )
        .with_connection(Connection::new("start", "exec_out", "set_x", "exec_in"))
}

#[test]
fn builder_preserves_node_order() {
    let wf = sample();
    let ids: Vec<&str> = wf.nodes.keys().map(|id| id.as_str()).collect();
    assert_eq!(ids, ["start", "set_x"]);
    assert_eq!(wf.node_count(), 2);
}

#[test]
fn node_lookup_by_id() {
    let wf = sample();
    let node = wf.node(&"set_x".into()).unwrap();
    assert_eq!(node.node_type, "SetVariable");
    assert_eq!(node.config_str("name"), Some("x"));
    assert_eq!(node.config_value("value"), Some(&json!(10)));
}

#[test]
fn workflow_round_trips_through_json() {
    let wf = sample();
    let blob = wf.to_json().unwrap();
    let parsed = Workflow::from_json(&blob).unwrap();
    assert_eq!(parsed, wf);
}

#[test]
fn round_trip_preserves_io_definitions() {
    let mut wf = sample();
    wf.inputs.push(InputDef {
        name: "count".to_string(),
        data_type: DataType::Integer,
        required: true,
        default: None,
        description: String::new(),
    });
    wf.outputs.push(OutputDef {
        name: "result".to_string(),
        data_type: DataType::Any,
        node_id: Some("set_x".into()),
        port: Some("value".to_string()),
        description: String::new(),
    });

    let parsed = Workflow::from_json(&wf.to_json().unwrap()).unwrap();
    assert_eq!(parsed.inputs, wf.inputs);
    assert_eq!(parsed.outputs, wf.outputs);
}
