// Copyright (c) 2017-2021 Fabian Schuiki

//! In-block memory redundancy scans.
//!
//! This module implements the load/store handling of the redundancy
//! elimination pass: forwarding of earlier loads and stores into later loads,
//! and erasure of stores that are overwritten before anything can observe
//! them. All scans stay within one basic block; stores to other addresses,
//! calls, invokes, and volatile accesses act as barriers.
//!
//! Addresses are compared by value identity; there is no alias reasoning
//! beyond that.

use crate::{
    ir::{Block, Function, Inst, Opcode, Value},
    stats::Statistics,
    ty::Type,
};

/// The source a redundant load can be replaced with.
enum LoadSource {
    /// An earlier load of the same address and type.
    Load(Value),
    /// The value of an earlier store to the same address (store-to-load
    /// forwarding).
    Store(Value),
}

/// Eliminate redundancy around a load.
///
/// Scans forward to fold later loads of the same address into this one, then
/// scans backward for an earlier load or store that already produced the
/// loaded value. In the latter case the load itself is erased.
pub(crate) fn scan_load(func: &mut Function, bb: Block, inst: Inst, stats: &mut Statistics) {
    if func.dfg[inst].is_volatile() {
        return;
    }
    let ptr = func.dfg[inst].args()[0];
    let ty = func.dfg.inst_type(inst);
    let result = func.dfg.inst_result(inst);

    // Fold later loads of the same address into this one.
    let mut cursor = func.layout.next_inst(inst);
    while let Some(cur) = cursor {
        let next = func.layout.next_inst(cur);
        let data = &func.dfg[cur];
        match data.opcode() {
            Opcode::Store | Opcode::Call | Opcode::Invoke => break,
            Opcode::Load => {
                // Loads of other addresses do not stop the scan, volatile or
                // not; only a volatile access of the same location does.
                if data.args()[0] == ptr && func.dfg.inst_type(cur) == ty {
                    if data.is_volatile() {
                        break;
                    }
                    let redundant = func.dfg.inst_result(cur);
                    debug!("Fold {} into {}", cur, inst);
                    func.dfg.replace_use(redundant, result);
                    func.erase_inst(cur);
                    stats.redundant_loads += 1;
                }
            }
            _ => (),
        }
        cursor = next;
    }

    // Search backwards for a source that already carries the loaded value.
    if let Some(source) = find_load_source(func, bb, inst, ptr, &ty) {
        let (value, counter) = match source {
            LoadSource::Load(value) => (value, &mut stats.redundant_loads),
            LoadSource::Store(value) => (value, &mut stats.store_to_load),
        };
        debug!("Replace {} with {}", inst, value);
        func.dfg.replace_use(result, value);
        func.erase_inst(inst);
        *counter += 1;
    }
}

/// Walk the block from the top to `inst`, tracking the most recent value of
/// the loaded address.
fn find_load_source(
    func: &Function,
    bb: Block,
    inst: Inst,
    ptr: Value,
    ty: &Type,
) -> Option<LoadSource> {
    let mut source = None;
    let mut cursor = func.layout.first_inst(bb);
    while let Some(cur) = cursor {
        if cur == inst {
            break;
        }
        let data = &func.dfg[cur];
        match data.opcode() {
            Opcode::Store => {
                let value = data.args()[0];
                if !data.is_volatile()
                    && data.args()[1] == ptr
                    && func.dfg.value_type(value) == *ty
                {
                    source = Some(LoadSource::Store(value));
                } else {
                    source = None;
                }
            }
            Opcode::Load => {
                // Unrelated loads leave the candidate alone. A volatile load
                // of the same location clears it and never becomes a source.
                if data.args()[0] == ptr && func.dfg.inst_type(cur) == *ty {
                    if data.is_volatile() {
                        source = None;
                    } else {
                        source = Some(LoadSource::Load(func.dfg.inst_result(cur)));
                    }
                }
            }
            Opcode::Call | Opcode::Invoke => source = None,
            _ => (),
        }
        cursor = func.layout.next_inst(cur);
    }
    source
}

/// Eliminate redundancy around a store.
///
/// Scans forward within the block. A later store of the same address and
/// type makes this store's write dead; later loads of the same address are
/// replaced with the stored value. Everything else that touches memory stops
/// the scan.
pub(crate) fn scan_store(func: &mut Function, _bb: Block, inst: Inst, stats: &mut Statistics) {
    if func.dfg[inst].is_volatile() {
        return;
    }
    let value = func.dfg[inst].args()[0];
    let ptr = func.dfg[inst].args()[1];
    let ty = func.dfg.value_type(value);

    let mut cursor = func.layout.next_inst(inst);
    while let Some(cur) = cursor {
        let next = func.layout.next_inst(cur);
        let data = &func.dfg[cur];
        match data.opcode() {
            Opcode::Store => {
                if !data.is_volatile()
                    && data.args()[1] == ptr
                    && func.dfg.value_type(data.args()[0]) == ty
                {
                    // The write is overwritten before anything can read it.
                    debug!("Erase dead {}", inst);
                    func.erase_inst(inst);
                    stats.redundant_stores += 1;
                }
                return;
            }
            Opcode::Load => {
                if !data.is_volatile() && data.args()[0] == ptr && func.dfg.inst_type(cur) == ty {
                    let result = func.dfg.inst_result(cur);
                    debug!("Forward {} into {}", inst, cur);
                    func.dfg.replace_use(result, value);
                    func.erase_inst(cur);
                    stats.store_to_load += 1;
                    cursor = next;
                    continue;
                }
                return;
            }
            Opcode::Call | Opcode::Invoke => return,
            _ => cursor = next,
        }
    }
}
