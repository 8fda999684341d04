// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Port definitions and the data type lattice.

use serde::{Deserialize, Serialize};

/// Data type carried by a port.
///
/// `Execution` ports carry control flow; everything else carries values.
/// `Page`, `Element`, and `Browser` are opaque resource handles owned by
/// node implementations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataType {
    String,
    Integer,
    Float,
    Boolean,
    List,
    Dict,
    Object,
    Any,
    Execution,
    Page,
    Element,
    Browser,
}

armada_core::simple_display! {
    DataType {
        String => "string",
        Integer => "integer",
        Float => "float",
        Boolean => "boolean",
        List => "list",
        Dict => "dict",
        Object => "object",
        Any => "any",
        Execution => "execution",
        Page => "page",
        Element => "element",
        Browser => "browser",
    }
}

impl DataType {
    pub fn is_execution(&self) -> bool {
        matches!(self, DataType::Execution)
    }

    /// Whether a value from a `source`-typed output may flow into a
    /// `target`-typed input.
    ///
    /// `Any` matches everything on either side; identical types match;
    /// integers widen into floats. Execution never mixes with data.
    pub fn accepts(source: DataType, target: DataType) -> bool {
        if source.is_execution() || target.is_execution() {
            return source == target;
        }
        if source == DataType::Any || target == DataType::Any {
            return true;
        }
        if source == DataType::Integer && target == DataType::Float {
            return true;
        }
        source == target
    }
}

/// Direction of a port on its node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PortDirection {
    Input,
    Output,
}

armada_core::simple_display! {
    PortDirection {
        Input => "input",
        Output => "output",
    }
}

/// Declared port on a node type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortDef {
    pub name: String,
    pub data_type: DataType,
    pub direction: PortDirection,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<serde_json::Value>,
}

impl PortDef {
    pub fn input(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
            direction: PortDirection::Input,
            required: false,
            default: None,
        }
    }

    pub fn output(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
            direction: PortDirection::Output,
            required: false,
            default: None,
        }
    }

    /// Execution input port (conventionally named `exec_in`).
    pub fn exec_in(name: impl Into<String>) -> Self {
        Self::input(name, DataType::Execution)
    }

    /// Execution output port (e.g. `exec_out`, `body`, `completed`).
    pub fn exec_out(name: impl Into<String>) -> Self {
        Self::output(name, DataType::Execution)
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn with_default(mut self, v: serde_json::Value) -> Self {
        self.default = Some(v);
        self
    }

    pub fn is_execution(&self) -> bool {
        self.data_type.is_execution()
    }
}

#[cfg(test)]
#[path = "port_tests.rs"]
mod tests;
