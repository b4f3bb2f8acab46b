// Copyright (c) 2017-2021 Fabian Schuiki

//! Common Subexpression Elimination
//!
//! This pass implements local redundancy elimination. In one top-to-bottom
//! sweep per function it erases dead instructions, applies the algebraic
//! simplifier, eliminates redundant memory accesses within blocks, and
//! replaces recomputed expressions in dominated blocks with the earlier
//! occurrence.

use crate::{
    analysis::{DominatorTree, PredecessorTable},
    ir::{Block, DataFlowGraph, Function, Inst, Opcode},
    pass::{memred, simplify::simplify_inst, Pass, PassContext},
    stats::Statistics,
};

/// Common Subexpression Elimination
///
/// The pass makes a single pass over each function. For every instruction it
/// attempts, in this order of precedence: dead code elimination, algebraic
/// simplification, memory redundancy elimination (for loads and stores), and
/// dominator-scoped common subexpression elimination. At most one of the four
/// fires per visit.
pub struct CommonSubexprElim;

impl Pass for CommonSubexprElim {
    fn run_on_function(ctx: &PassContext, func: &mut Function) -> Statistics {
        info!("CSE [{}]", func.name);
        let mut stats = Statistics::default();

        // Build the dominator tree. The pass does not alter control flow, so
        // the tree stays valid throughout.
        let pred = PredecessorTable::new(func);
        let domtree = DominatorTree::new(func, &pred);
        let blocks: Vec<Block> = func.layout.blocks().collect();

        for &bb in &blocks {
            let mut cursor = func.layout.first_inst(bb);
            while let Some(inst) = cursor {
                // Snapshot the predecessor before any mutation. Erasures
                // only ever remove the current instruction or instructions
                // after it, which keeps the predecessor valid.
                let prev = func.layout.prev_inst(inst);

                if is_dead(&func.dfg, inst) {
                    trace!("Erase dead {}", inst);
                    cursor = func.layout.next_inst(inst);
                    func.erase_inst(inst);
                    stats.dead += 1;
                    continue;
                }

                if let Some(value) = simplify_inst(&mut func.dfg, &ctx.data_layout, inst) {
                    debug!("Simplify {} to {}", inst, value);
                    let result = func.dfg.inst_result(inst);
                    cursor = func.layout.next_inst(inst);
                    func.dfg.replace_use(result, value);
                    func.erase_inst(inst);
                    stats.simplified += 1;
                    continue;
                }

                match func.dfg[inst].opcode() {
                    Opcode::Load => memred::scan_load(func, bb, inst, &mut stats),
                    Opcode::Store => memred::scan_store(func, bb, inst, &mut stats),
                    op if op.is_cse_eligible() => {
                        cse_inst(func, &domtree, &blocks, bb, inst, &mut stats)
                    }
                    _ => (),
                }

                // The scans may have erased the current instruction or the
                // one following it; resume from the saved predecessor.
                cursor = match prev {
                    Some(p) => func.layout.next_inst(p),
                    None => func.layout.first_inst(bb),
                };
                if cursor == Some(inst) {
                    cursor = func.layout.next_inst(inst);
                }
            }
        }
        stats
    }
}

/// Check whether an instruction can be erased because nothing observes it.
///
/// True iff the instruction's result is unused and the opcode is free of side
/// effects; volatile loads are kept alive even when unused.
fn is_dead(dfg: &DataFlowGraph, inst: Inst) -> bool {
    if !dfg[inst].is_side_effect_free() {
        return false;
    }
    !dfg.has_uses(dfg.inst_result(inst))
}

/// Replace all equivalent instructions in blocks dominated by `bb` with the
/// occurrence `inst`.
///
/// Two instructions are equivalent iff they agree on opcode, result type,
/// auxiliary data, and every operand by identity. Operand commutativity is
/// not exploited. Because `bb` dominates the candidate's block and the
/// candidate comes after `inst` in dominator order, every use of the
/// candidate is dominated by `inst` and the replacement is legal.
fn cse_inst(
    func: &mut Function,
    domtree: &DominatorTree,
    blocks: &[Block],
    bb: Block,
    inst: Inst,
    stats: &mut Statistics,
) {
    let data = func.dfg[inst].clone();
    let ty = func.dfg.inst_type(inst);
    let result = func.dfg.inst_result(inst);

    for &dominated in blocks {
        if !domtree.dominates(bb, dominated) {
            continue;
        }

        // Materialize the scan range before mutating the block. Within the
        // defining block only the instructions after `inst` are candidates.
        let start = if dominated == bb {
            func.layout.next_inst(inst)
        } else {
            func.layout.first_inst(dominated)
        };
        let mut candidates = vec![];
        let mut cursor = start;
        while let Some(cur) = cursor {
            cursor = func.layout.next_inst(cur);
            if cur != inst {
                candidates.push(cur);
            }
        }

        for candidate in candidates {
            if func.dfg[candidate] == data && func.dfg.inst_type(candidate) == ty {
                debug!("Replace {} with {}", candidate, inst);
                let redundant = func.dfg.inst_result(candidate);
                func.dfg.replace_use(redundant, result);
                func.erase_inst(candidate);
                stats.cse += 1;
            }
        }
    }
}
