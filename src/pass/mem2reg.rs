// Copyright (c) 2017-2021 Fabian Schuiki

//! Stack Slot Promotion
//!
//! This pass replaces `alloca` slots and their `load`/`store` instructions
//! with SSA values as far as possible. It runs ahead of redundancy
//! elimination when requested on the command line.
//!
//! A slot is promotable when it holds a first-class scalar and every use is a
//! non-volatile load or store of the slot's type, with the slot address never
//! escaping into a call, a store operand, or address arithmetic.

use crate::{
    analysis::PredecessorTable,
    ir::{Block, DataFlowGraph, Function, FunctionBuilder, Inst, Opcode, Value},
    pass::{Pass, PassContext},
    stats::Statistics,
    ty::Type,
};
use num::BigInt;
use std::collections::{BTreeSet, HashMap, HashSet};

/// Stack Slot Promotion
pub struct Mem2Reg;

impl Pass for Mem2Reg {
    fn run_on_function(_ctx: &PassContext, func: &mut Function) -> Statistics {
        info!("Mem2Reg [{}]", func.name);
        let pt = PredecessorTable::new(func);

        // Find the promotable slots.
        let mut slots = HashSet::new();
        for bb in func.layout.blocks() {
            for inst in func.layout.insts(bb) {
                if func.dfg[inst].opcode() == Opcode::Alloca {
                    if let Some(slot) = promotable_slot(func, inst) {
                        slots.insert(slot);
                    }
                }
            }
        }
        if slots.is_empty() {
            return Statistics::default();
        }

        // Trace slot values within each basic block, and assign potential
        // values to each of the loads.
        let mut block_outs = HashMap::new();
        let mut loads = vec![];
        let mut stores = vec![];
        let mut allocas = vec![];
        for block in func.layout.blocks() {
            let mut store_table = HashMap::<Value, Value>::new();
            for inst in func.layout.insts(block) {
                let data = &func.dfg[inst];
                match data.opcode() {
                    Opcode::Alloca if slots.contains(&func.dfg.inst_result(inst)) => {
                        allocas.push(inst);
                    }
                    Opcode::Store if slots.contains(&data.args()[1]) => {
                        store_table.insert(data.args()[1], data.args()[0]);
                        stores.push(inst);
                    }
                    Opcode::Load if slots.contains(&data.args()[0]) => {
                        let slot = data.args()[0];
                        let v = match store_table.get(&slot) {
                            Some(&v) => Slot::Value(v),
                            None => Slot::Incoming(slot, block),
                        };
                        loads.push((inst, v));
                    }
                    _ => continue,
                }
            }
            block_outs.insert(block, store_table);
        }

        // Materialize the value each load observes, inserting phi nodes
        // where control flow paths disagree.
        let mut resolutions = vec![];
        for &(inst, slot) in &loads {
            let ty = func.dfg.inst_type(inst);
            let value = match slot {
                Slot::Value(v) => Some(v),
                Slot::Incoming(var, bb) => {
                    materialize_value(func, &pt, var, ty, bb, &block_outs, &mut HashSet::new())
                }
            };
            resolutions.push((inst, value));
        }

        // Replace the loads with the materialized values. Loads that resolve
        // to another promoted load chase the resolution chain; loads of a
        // slot that is never stored on the path read an undefined value and
        // become a typed zero.
        let resolved: HashMap<Value, Option<Value>> = resolutions
            .iter()
            .map(|&(inst, value)| (func.dfg.inst_result(inst), value))
            .collect();
        for (inst, value) in resolutions {
            let result = func.dfg.inst_result(inst);
            let ty = func.dfg.inst_type(inst);
            let value = chase(&resolved, result, value)
                .unwrap_or_else(|| zero_value(&mut func.dfg, &ty));
            debug!("Replace {} with {}", inst, value);
            func.dfg.replace_use(result, value);
        }

        // Strip away the promoted loads, stores, and slots.
        for (inst, _) in loads {
            func.erase_inst(inst);
        }
        for inst in stores {
            debug!("Removing {}", inst);
            func.erase_inst(inst);
        }
        for inst in allocas {
            debug!("Removing {}", inst);
            func.erase_inst(inst);
        }

        Statistics::default()
    }
}

#[derive(Debug, Clone, Copy)]
enum Slot {
    /// The slot's value is determined by a block's predecessors.
    Incoming(Value, Block),
    /// The slot's value is determined by an earlier store.
    Value(Value),
}

/// Check whether an alloca can be promoted, and return its slot address.
fn promotable_slot(func: &Function, inst: Inst) -> Option<Value> {
    let ty = match func.dfg[inst] {
        crate::ir::InstData::Alloca { ref ty, .. } => ty.clone(),
        _ => return None,
    };
    if !ty.is_int() && !ty.is_float() && !ty.is_pointer() {
        return None;
    }
    let slot = func.dfg.inst_result(inst);
    for (user, idx) in func.dfg.uses(slot) {
        let data = &func.dfg[user];
        let ok = match data.opcode() {
            Opcode::Load => !data.is_volatile() && func.dfg.inst_type(user) == ty,
            Opcode::Store => {
                idx == 1 && !data.is_volatile() && func.dfg.value_type(data.args()[0]) == ty
            }
            _ => false,
        };
        if !ok {
            return None;
        }
    }
    Some(slot)
}

/// Ensure that the value of a slot is available in a specified block.
fn materialize_value(
    func: &mut Function,
    pt: &PredecessorTable,
    var: Value,
    ty: Type,
    block: Block,
    block_outs: &HashMap<Block, HashMap<Value, Value>>,
    stack: &mut HashSet<Block>,
) -> Option<Value> {
    // Break recursion. If we arrive here there was a recursion in the CFG but
    // no store for the slot which would provide a new value. In this case we
    // simply return `None` to indicate that there is no value to be gotten
    // from this control flow path.
    if stack.contains(&block) {
        trace!("Breaking recursion at {}", block);
        return None;
    }
    trace!("Materialize {} in {}", var, block);
    stack.insert(block);

    // Determine the value of the slot at the end of each predecessor.
    let preds: Vec<Block> = pt.pred(block).collect();
    let mut incoming_values = vec![];
    for bb in preds {
        let value = match block_outs.get(&bb).and_then(|vars| vars.get(&var)).cloned() {
            Some(v) => Some(v),
            None => materialize_value(func, pt, var, ty.clone(), bb, block_outs, stack),
        };
        if let Some(v) = value {
            incoming_values.push((bb, v));
        }
    }

    // Check if a phi node is needed by evaluating whether we need to
    // differentiate between distinct values.
    let distinct_values: BTreeSet<Value> = incoming_values.iter().map(|&(_, v)| v).collect();
    let value = if distinct_values.is_empty() {
        None
    } else if distinct_values.len() == 1 {
        distinct_values.into_iter().next()
    } else {
        let mut builder = FunctionBuilder::new(func);
        builder.prepend_to(block);
        let phi = builder.ins().phi(
            ty,
            incoming_values.iter().map(|&(_, v)| v).collect(),
            incoming_values.iter().map(|&(bb, _)| bb).collect(),
        );
        debug!("Insert {} in {}", phi, block);
        Some(phi)
    };

    stack.remove(&block);
    value
}

/// Chase a load's resolution through other promoted loads.
fn chase(
    resolved: &HashMap<Value, Option<Value>>,
    result: Value,
    mut value: Option<Value>,
) -> Option<Value> {
    let mut seen = HashSet::new();
    seen.insert(result);
    while let Some(v) = value {
        if !seen.insert(v) {
            // The chain feeds on itself without ever seeing a store; the
            // value is undefined.
            return None;
        }
        match resolved.get(&v) {
            Some(&next) => value = next,
            None => return Some(v),
        }
    }
    None
}

/// The zero constant of a first-class scalar type.
fn zero_value(dfg: &mut DataFlowGraph, ty: &Type) -> Value {
    if ty.is_int() {
        dfg.const_int(ty.clone(), BigInt::from(0))
    } else if ty.is_float() {
        dfg.const_float(ty.clone(), 0.0)
    } else {
        assert!(ty.is_pointer());
        dfg.const_null()
    }
}
