// Copyright (c) 2017-2020 Fabian Schuiki

//! Verification of IR integrity.
//!
//! This module implements verification of the intermediate representation. It
//! checks that functions are well-formed: blocks have terminators, types line
//! up, use-lists are reciprocal to the operand lists, and every use of an
//! instruction is dominated by its definition.

use crate::{
    analysis::{DominatorTree, PredecessorTable},
    ir::{Block, Function, Inst, InstData, Module, Opcode, ValueData},
    ty::int_ty,
};
use std::collections::HashMap;
use std::fmt;

/// An IR verifier.
///
/// The `Verifier` acts as a context to call the various IR checking functions
/// on. It keeps track of errors.
#[derive(Default)]
pub struct Verifier {
    errors: VerifierErrors,
    unit: Option<String>,
}

impl Verifier {
    /// Create a new verifier.
    pub fn new() -> Self {
        Default::default()
    }

    /// Verify the integrity of a `Module`.
    pub fn verify_module(&mut self, module: &Module) {
        for func in module.functions() {
            self.verify_function(func);
        }
    }

    /// Verify the integrity of a `Function`.
    pub fn verify_function(&mut self, func: &Function) {
        if func.is_declaration() {
            return;
        }
        self.unit = Some(format!("func @{}", func.name));
        self.verify_layout(func);
        self.verify_uses(func);
        self.verify_types(func);
        self.verify_dominance(func);
        self.unit = None;
    }

    /// Consume the verifier and yield the errors found.
    pub fn finish(self) -> Result<(), VerifierErrors> {
        if self.errors.0.is_empty() {
            Ok(())
        } else {
            Err(self.errors)
        }
    }

    fn push(&mut self, object: Option<String>, message: String) {
        self.errors.0.push(VerifierError {
            unit: self.unit.clone(),
            object,
            message,
        });
    }

    /// Verify the basic block and terminator discipline.
    fn verify_layout(&mut self, func: &Function) {
        for bb in func.layout.blocks() {
            let last = func.layout.last_inst(bb);
            match last {
                None => self.push(Some(bb.to_string()), format!("block is empty")),
                Some(last) => {
                    if !func.dfg[last].opcode().is_terminator() {
                        self.push(
                            Some(bb.to_string()),
                            format!("block must end with a terminator"),
                        );
                    }
                }
            }
            for inst in func.layout.insts(bb) {
                if func.dfg[inst].opcode().is_terminator() && Some(inst) != last {
                    self.push(
                        Some(inst.to_string()),
                        format!("terminator must be at the end of {}", bb),
                    );
                }
                for &target in func.dfg[inst].blocks() {
                    if !func.layout.is_block_inserted(target) {
                        self.push(
                            Some(inst.to_string()),
                            format!("reference to block {} which is not in the layout", target),
                        );
                    }
                }
            }
        }
    }

    /// Verify that operand lists and use-lists mirror each other.
    fn verify_uses(&mut self, func: &Function) {
        for bb in func.layout.blocks() {
            for inst in func.layout.insts(bb) {
                for (idx, &arg) in func.dfg[inst].args().iter().enumerate() {
                    if func.dfg[arg].is_placeholder() {
                        self.push(
                            Some(inst.to_string()),
                            format!("operand {} is an unresolved placeholder", idx),
                        );
                    }
                    if !func.dfg.has_use(arg, inst, idx) {
                        self.push(
                            Some(inst.to_string()),
                            format!("use of {} lacks the reciprocal use-list entry", arg),
                        );
                    }
                }
            }
        }
        for value in func.dfg.values() {
            for (user, idx) in func.dfg.uses(value) {
                match func.layout.inst_block(user) {
                    None => self.push(
                        Some(value.to_string()),
                        format!("use-list entry refers to {} which is not in the layout", user),
                    ),
                    Some(_) => {
                        if func.dfg[user].args().get(idx) != Some(&value) {
                            self.push(
                                Some(value.to_string()),
                                format!("use-list entry ({}, {}) has no matching operand", user, idx),
                            );
                        }
                    }
                }
            }
        }
    }

    /// Verify that operand and result types line up.
    fn verify_types(&mut self, func: &Function) {
        for bb in func.layout.blocks() {
            for inst in func.layout.insts(bb) {
                let data = &func.dfg[inst];
                let ty = func.dfg.inst_type(inst);
                let arg_ty = |i: usize| func.dfg.value_type(data.args()[i]);
                match data {
                    InstData::Binary { opcode, .. } if *opcode != Opcode::ExtractElement => {
                        if arg_ty(0) != ty || arg_ty(1) != ty {
                            self.push(
                                Some(inst.to_string()),
                                format!("operands of binary {} must be of type {}", data.opcode(), ty),
                            );
                        }
                    }
                    InstData::IntCompare { .. } | InstData::FloatCompare { .. } => {
                        if arg_ty(0) != arg_ty(1) {
                            self.push(
                                Some(inst.to_string()),
                                format!("compared operands must be of equal type"),
                            );
                        }
                        if ty != int_ty(1) {
                            self.push(
                                Some(inst.to_string()),
                                format!("comparison must yield i1"),
                            );
                        }
                    }
                    InstData::Ternary {
                        opcode: Opcode::Select,
                        ..
                    } => {
                        if arg_ty(0) != int_ty(1) {
                            self.push(
                                Some(inst.to_string()),
                                format!("select condition must be i1"),
                            );
                        }
                        if arg_ty(1) != ty || arg_ty(2) != ty {
                            self.push(
                                Some(inst.to_string()),
                                format!("select arms must be of type {}", ty),
                            );
                        }
                    }
                    InstData::Load { .. } => {
                        if !arg_ty(0).is_pointer() {
                            self.push(
                                Some(inst.to_string()),
                                format!("load address must be a pointer"),
                            );
                        }
                    }
                    InstData::Store { .. } => {
                        if !arg_ty(1).is_pointer() {
                            self.push(
                                Some(inst.to_string()),
                                format!("store address must be a pointer"),
                            );
                        }
                    }
                    InstData::Phi { args, bbs, .. } => {
                        if args.len() != bbs.len() {
                            self.push(
                                Some(inst.to_string()),
                                format!("phi must have one block per operand"),
                            );
                        }
                        for (i, &arg) in args.iter().enumerate() {
                            if func.dfg.value_type(arg) != ty {
                                self.push(
                                    Some(inst.to_string()),
                                    format!("phi operand {} must be of type {}", i, ty),
                                );
                            }
                        }
                    }
                    InstData::Branch { .. } => {
                        if arg_ty(0) != int_ty(1) {
                            self.push(
                                Some(inst.to_string()),
                                format!("branch condition must be i1"),
                            );
                        }
                    }
                    InstData::Return { args, .. } => {
                        let expected = func.sig.return_type();
                        match args.first() {
                            None if expected.is_void() => (),
                            Some(&v) if func.dfg.value_type(v) == expected => (),
                            _ => self.push(
                                Some(inst.to_string()),
                                format!("return value must be of type {}", expected),
                            ),
                        }
                    }
                    _ => (),
                }
            }
        }
    }

    /// Verify that every use is dominated by its definition.
    fn verify_dominance(&mut self, func: &Function) {
        let pred = PredecessorTable::new(func);
        let domtree = DominatorTree::new(func, &pred);

        // Number the instructions within each block.
        let mut position = HashMap::<Inst, usize>::new();
        for bb in func.layout.blocks() {
            for (i, inst) in func.layout.insts(bb).enumerate() {
                position.insert(inst, i);
            }
        }

        let dominated = |def: Inst, user: Inst, use_bb: Block| -> bool {
            let def_bb = match func.layout.inst_block(def) {
                Some(bb) => bb,
                None => return false,
            };
            if def_bb == use_bb {
                position[&def] < position[&user]
            } else {
                domtree.dominates(def_bb, use_bb)
            }
        };

        for bb in func.layout.blocks() {
            for inst in func.layout.insts(bb) {
                let data = &func.dfg[inst];
                let is_phi = data.opcode().is_phi();
                for (idx, &arg) in data.args().iter().enumerate() {
                    let def = match func.dfg[arg] {
                        ValueData::Inst { inst, .. } => inst,
                        _ => continue,
                    };
                    let ok = if is_phi {
                        // Phi operands must be available at the end of the
                        // respective incoming block.
                        let incoming = data.blocks()[idx];
                        match func.layout.inst_block(def) {
                            Some(def_bb) => domtree.dominates(def_bb, incoming),
                            None => false,
                        }
                    } else {
                        dominated(def, inst, bb)
                    };
                    if !ok {
                        self.push(
                            Some(inst.to_string()),
                            format!("use of {} is not dominated by its definition", arg),
                        );
                    }
                }
            }
        }
    }
}

/// A verification error.
#[derive(Debug)]
pub struct VerifierError {
    /// The unit within which the error occurred.
    pub unit: Option<String>,
    /// The object which caused the error.
    pub object: Option<String>,
    /// The error message.
    pub message: String,
}

impl fmt::Display for VerifierError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if let Some(ref unit) = self.unit {
            write!(f, "{}: ", unit)?;
        }
        if let Some(ref object) = self.object {
            write!(f, "{}: ", object)?;
        }
        write!(f, "{}", self.message)
    }
}

/// A list of verification errors.
#[derive(Debug, Default)]
pub struct VerifierErrors(pub Vec<VerifierError>);

impl fmt::Display for VerifierErrors {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for err in &self.0 {
            writeln!(f, "- {}", err)?;
        }
        Ok(())
    }
}
