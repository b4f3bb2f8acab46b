// Copyright (c) 2017-2021 Fabian Schuiki

//! Statistics collected by the optimizer.

use crate::ir::{Module, Opcode};
use std::io::Write;
use std::ops::{Add, AddAssign};

/// The counters collected over one optimizer run.
///
/// Counters are accumulated per function and summed once all functions have
/// been processed, such that they never become a synchronization point when
/// functions are optimized in parallel.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Statistics {
    /// Non-empty functions encountered.
    pub functions: u64,
    /// Instructions in the final module.
    pub instructions: u64,
    /// Loads in the final module.
    pub loads: u64,
    /// Stores in the final module.
    pub stores: u64,
    /// Dead instructions erased.
    pub dead: u64,
    /// Simplifier rewrites applied.
    pub simplified: u64,
    /// Common subexpressions eliminated.
    pub cse: u64,
    /// Redundant loads erased.
    pub redundant_loads: u64,
    /// Stores forwarded to subsequent loads.
    pub store_to_load: u64,
    /// Dead stores erased.
    pub redundant_stores: u64,
}

impl Statistics {
    /// Check whether any rewrite fired.
    pub fn modified(&self) -> bool {
        self.dead
            + self.simplified
            + self.cse
            + self.redundant_loads
            + self.store_to_load
            + self.redundant_stores
            > 0
    }

    /// Count the functions, instructions, loads, and stores of a module.
    pub fn summarize(&mut self, module: &Module) {
        for func in module.functions() {
            if func.is_declaration() {
                continue;
            }
            self.functions += 1;
            for bb in func.layout.blocks() {
                for inst in func.layout.insts(bb) {
                    self.instructions += 1;
                    match func.dfg[inst].opcode() {
                        Opcode::Load => self.loads += 1,
                        Opcode::Store => self.stores += 1,
                        _ => (),
                    }
                }
            }
        }
    }

    /// The counters as `(name, value)` rows, in output order.
    pub fn rows(&self) -> [(&'static str, u64); 10] {
        [
            ("Functions", self.functions),
            ("Instructions", self.instructions),
            ("Loads", self.loads),
            ("Stores", self.stores),
            ("CSEDead", self.dead),
            ("CSESimplify", self.simplified),
            ("CSEElim", self.cse),
            ("CSELdElim", self.redundant_loads),
            ("CSEStore2Load", self.store_to_load),
            ("CSEStElim", self.redundant_stores),
        ]
    }

    /// Write the counters as `name,value` CSV rows.
    pub fn write_csv<W: Write>(&self, mut sink: W) -> std::io::Result<()> {
        for (name, value) in &self.rows() {
            writeln!(sink, "{},{}", name, value)?;
        }
        Ok(())
    }
}

impl Add for Statistics {
    type Output = Statistics;

    fn add(mut self, other: Statistics) -> Statistics {
        self += other;
        self
    }
}

impl AddAssign for Statistics {
    fn add_assign(&mut self, other: Statistics) {
        self.functions += other.functions;
        self.instructions += other.instructions;
        self.loads += other.loads;
        self.stores += other.stores;
        self.dead += other.dead;
        self.simplified += other.simplified;
        self.cse += other.cse;
        self.redundant_loads += other.redundant_loads;
        self.store_to_load += other.store_to_load;
        self.redundant_stores += other.redundant_stores;
    }
}
