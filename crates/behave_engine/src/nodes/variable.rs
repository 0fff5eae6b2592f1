// SPDX-License-Identifier: MIT OR Apache-2.0
//! Graph variable access.

use crate::context::NodeContext;
use crate::error::{LoadError, Result, RuntimeError};
use crate::node::{single_output, BehaviorNode, NodeBase, NodeInit, NodeKind, Outputs};

fn variable_id(base: &NodeBase, init: &NodeInit<'_>) -> std::result::Result<(usize, String), LoadError> {
    let index = base.configuration_index("variable")?;
    let variable = init
        .graph
        .variables
        .get(index)
        .ok_or_else(|| base.invalid_configuration("variable", format!("no variable {index}")))?;
    Ok((index, variable.id.clone()))
}

/// Outputs a variable's current value under the variable's id
pub struct VariableGet {
    base: NodeBase,
    variable: usize,
    id: String,
}

impl BehaviorNode for VariableGet {
    fn base(&self) -> &NodeBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut NodeBase {
        &mut self.base
    }

    fn process(&mut self, _socket: Option<&str>, cx: &mut NodeContext<'_>) -> Result<Outputs> {
        let value = cx
            .variable(self.variable)
            .map(|v| v.value.clone())
            .ok_or(RuntimeError::UnknownVariable(self.variable))?;
        Ok(single_output(&self.id, value))
    }
}

impl NodeKind for VariableGet {
    const KIND: &'static str = "variable/get";

    fn create(init: &mut NodeInit<'_>) -> std::result::Result<Self, LoadError> {
        let base = init.base("VariableGetNode");
        let (variable, id) = variable_id(&base, init)?;
        Ok(Self { base, variable, id })
    }
}

/// Writes the value socket named after the variable, then continues `out`
pub struct VariableSet {
    base: NodeBase,
    variable: usize,
    id: String,
}

impl BehaviorNode for VariableSet {
    fn base(&self) -> &NodeBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut NodeBase {
        &mut self.base
    }

    fn process(&mut self, _socket: Option<&str>, cx: &mut NodeContext<'_>) -> Result<Outputs> {
        cx.clear_evaluation_cache();
        let value = self.base.evaluate(&self.id, cx)?;
        if !cx.set_variable(self.variable, value) {
            return Err(RuntimeError::UnknownVariable(self.variable));
        }
        self.base.continue_flow("out", cx);
        Ok(Outputs::new())
    }
}

impl NodeKind for VariableSet {
    const KIND: &'static str = "variable/set";

    fn create(init: &mut NodeInit<'_>) -> std::result::Result<Self, LoadError> {
        let base = init.base("VariableSet");
        let (variable, id) = variable_id(&base, init)?;
        base.require_values(&[id.as_str()])?;
        Ok(Self { base, variable, id })
    }
}
