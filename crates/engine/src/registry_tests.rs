// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use armada_model::{Connection, Workflow};
use serde_json::json;

#[test]
fn builtins_are_registered() {
    let registry = NodeRegistry::with_builtins();
    for ty in [
        "Start",
        "End",
        "SetVariable",
        "Log",
        "Wait",
        "Comment",
        "If",
        "TryCatch",
        "ForLoopStart",
        "ForLoopEnd",
        "WhileLoopStart",
        "WhileLoopEnd",
        "Break",
        "Continue",
        "Subflow",
    ] {
        assert!(registry.contains(ty), "missing builtin {ty}");
    }
}

#[test]
fn unknown_type_does_not_instantiate() {
    let registry = NodeRegistry::with_builtins();
    let spec = NodeSpec::new("x", "ClickButton");
    assert!(registry.instantiate(&spec).is_none());
}

#[test]
fn registry_serves_as_port_catalog() {
    let registry = NodeRegistry::with_builtins();
    let spec = NodeSpec::new("if", "If");
    let ports = registry.ports(&spec).unwrap();
    assert!(ports.find("true", armada_model::PortDirection::Output).is_some());
    assert!(ports.find("condition", armada_model::PortDirection::Input).is_some());

    assert!(registry.ports(&NodeSpec::new("x", "Nope")).is_none());
}

#[test]
fn workflow_validation_against_builtins() {
    let registry = NodeRegistry::with_builtins();
    let wf = Workflow::default()
        .with_node(NodeSpec::new("start", "Start"))
        .with_node(
            NodeSpec::new("set", "SetVariable")
                .with_config("name", json!("x"))
                .with_config("value", json!(1)),
        )
        .with_connection(Connection::new("start", "exec_out", "set", "exec_in"));
    assert_eq!(wf.validate(&registry), vec![]);
}

#[test]
fn type_names_are_sorted() {
    let registry = NodeRegistry::with_builtins();
    let names = registry.type_names();
    let mut sorted = names.clone();
    sorted.sort();
    assert_eq!(names, sorted);
}
