// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Built-in control-flow nodes.
//!
//! These are the node types the engine itself depends on — flow entry and
//! exit, variable writes, branching, loops, and subflow embedding.
//! Domain nodes (browser automation, HTTP, files) live outside the core
//! and register through the same [`NodeRegistry`] interface.

mod basic;
mod branch;
mod loops;
mod subflow;

pub use basic::{CommentNode, EndNode, LogNode, SetVariableNode, StartNode, WaitNode};
pub use branch::{IfNode, TryCatchNode};
pub use loops::{
    BreakNode, ContinueNode, ForLoopEndNode, ForLoopStartNode, WhileLoopEndNode,
    WhileLoopStartNode,
};
pub use subflow::SubflowNode;

use crate::registry::NodeRegistry;
use armada_model::node_types;

/// Register every built-in node type.
pub fn register_builtins(registry: &mut NodeRegistry) {
    registry.register(node_types::START, |_, _| Box::new(StartNode));
    registry.register(node_types::END, |_, _| Box::new(EndNode));
    registry.register("SetVariable", |_, _| Box::new(SetVariableNode));
    registry.register("Log", |_, _| Box::new(LogNode));
    registry.register("Wait", |_, _| Box::new(WaitNode));
    registry.register("Comment", |_, _| Box::new(CommentNode));
    registry.register("If", |_, _| Box::new(IfNode));
    registry.register(node_types::TRY_CATCH, |_, _| Box::new(TryCatchNode));
    registry.register(node_types::FOR_LOOP_START, |_, _| Box::new(ForLoopStartNode));
    registry.register(node_types::FOR_LOOP_END, |_, _| Box::new(ForLoopEndNode));
    registry.register(node_types::WHILE_LOOP_START, |_, _| Box::new(WhileLoopStartNode));
    registry.register(node_types::WHILE_LOOP_END, |_, _| Box::new(WhileLoopEndNode));
    registry.register(node_types::BREAK, |_, _| Box::new(BreakNode));
    registry.register(node_types::CONTINUE, |_, _| Box::new(ContinueNode));
    registry.register(node_types::SUBFLOW, |_, config| Box::new(SubflowNode::new(config)));
}
