// Copyright (c) 2017-2020 Fabian Schuiki

//! Representation of functions.

use crate::ir::{DataFlowGraph, FunctionLayout, Inst, Signature, Value};

/// A function.
///
/// Owns its data flow graph and the layout of blocks and instructions. A
/// function without blocks is a declaration.
pub struct Function {
    pub name: String,
    pub sig: Signature,
    pub dfg: DataFlowGraph,
    pub layout: FunctionLayout,
}

impl Function {
    /// Create a new function.
    pub fn new(name: impl Into<String>, sig: Signature) -> Self {
        let mut func = Self {
            name: name.into(),
            sig,
            dfg: DataFlowGraph::new(),
            layout: FunctionLayout::new(),
        };
        func.dfg.make_args_for_signature(&func.sig);
        func
    }

    /// Check whether the function is a declaration without body.
    pub fn is_declaration(&self) -> bool {
        self.layout.first_block().is_none()
    }

    /// Iterate over the argument values of the function.
    pub fn arg_values<'a>(&'a self) -> impl Iterator<Item = Value> + 'a {
        self.sig.args().map(move |arg| self.dfg.arg_value(arg))
    }

    /// Erase an instruction.
    ///
    /// Unlinks the instruction from the layout and removes it from the data
    /// flow graph. The instruction's result must be unused.
    pub fn erase_inst(&mut self, inst: Inst) {
        self.layout.remove_inst(inst);
        self.dfg.remove_inst(inst);
    }
}
