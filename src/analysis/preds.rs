// Copyright (c) 2017-2021 Fabian Schuiki

use crate::ir::{Block, Function};
use std::collections::{BTreeSet, HashMap};

/// A table of basic block predecessors.
///
/// Predecessor and successor sets are kept ordered such that everything
/// derived from them, phi operand order included, is reproducible.
#[derive(Debug, Clone)]
pub struct PredecessorTable {
    pred: HashMap<Block, BTreeSet<Block>>,
    succ: HashMap<Block, BTreeSet<Block>>,
}

impl PredecessorTable {
    /// Compute the predecessor table for a function.
    pub fn new(func: &Function) -> Self {
        let mut pred = HashMap::new();
        let mut succ = HashMap::new();
        for bb in func.layout.blocks() {
            pred.insert(bb, BTreeSet::new());
        }
        for bb in func.layout.blocks() {
            if let Some(term) = func.layout.last_inst(bb) {
                for &to_bb in func.dfg[term].blocks() {
                    pred.get_mut(&to_bb).unwrap().insert(bb);
                }
                succ.insert(bb, func.dfg[term].blocks().iter().cloned().collect());
            } else {
                succ.insert(bb, Default::default());
            }
        }
        Self { pred, succ }
    }

    /// Get a map of blocks to predecessor sets in this table.
    pub fn all_pred_sets(&self) -> &HashMap<Block, BTreeSet<Block>> {
        &self.pred
    }

    /// Get the predecessors of a block.
    pub fn pred_set(&self, bb: Block) -> &BTreeSet<Block> {
        &self.pred[&bb]
    }

    /// Get the successors of a block.
    pub fn succ_set(&self, bb: Block) -> &BTreeSet<Block> {
        &self.succ[&bb]
    }

    /// Get the predecessors of a block.
    pub fn pred(&self, bb: Block) -> impl Iterator<Item = Block> + Clone + '_ {
        self.pred[&bb].iter().cloned()
    }

    /// Get the successors of a block.
    pub fn succ(&self, bb: Block) -> impl Iterator<Item = Block> + Clone + '_ {
        self.succ[&bb].iter().cloned()
    }
}
