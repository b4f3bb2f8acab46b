// Copyright (c) 2017-2020 Fabian Schuiki

//! Instruction and BB ordering.

use crate::{
    ir::{Block, Inst},
    table::{PrimaryTable, SecondaryTable},
};
use std::collections::HashMap;

/// Determines the order of instructions and BBs in a `Function`.
///
/// Blocks and instructions are kept in doubly-linked lists. Iterators handed
/// out by this layout are live lookups into these lists; erasing an
/// instruction invalidates iterators positioned on it, but not iterators
/// positioned strictly before it. The passes snapshot the next or previous
/// handle before any mutation.
#[derive(Default)]
pub struct FunctionLayout {
    /// A linked list of BBs in layout order.
    bbs: PrimaryTable<Block, BlockNode>,
    /// The first BB in the layout.
    first_bb: Option<Block>,
    /// The last BB in the layout.
    last_bb: Option<Block>,
    /// Lookup table to find the BB that contains an instruction.
    inst_map: HashMap<Inst, Block>,
}

/// A node in the layout's double-linked list of BBs.
#[derive(Default)]
struct BlockNode {
    name: Option<String>,
    prev: Option<Block>,
    next: Option<Block>,
    inserted: bool,
    layout: InstLayout,
}

impl FunctionLayout {
    /// Create a new function layout.
    pub fn new() -> Self {
        Default::default()
    }

    /// Create a new BB without inserting it into the layout.
    ///
    /// Useful to materialize forward references; the block is linked in once
    /// `append_block` is called.
    pub fn create_block(&mut self) -> Block {
        self.bbs.add(BlockNode::default())
    }

    /// Append a BB to the end of the function.
    pub fn append_block(&mut self, bb: Block) {
        assert!(!self.bbs[bb].inserted, "{} already inserted", bb);
        self.bbs[bb].prev = self.last_bb;
        self.bbs[bb].next = None;
        self.bbs[bb].inserted = true;
        if let Some(prev) = self.last_bb {
            self.bbs[prev].next = Some(bb);
        }
        if self.first_bb.is_none() {
            self.first_bb = Some(bb);
        }
        self.last_bb = Some(bb);
    }

    /// Check if a block has been inserted into the layout.
    pub fn is_block_inserted(&self, bb: Block) -> bool {
        self.bbs[bb].inserted
    }

    /// Get the name of a block.
    pub fn block_name(&self, bb: Block) -> Option<&str> {
        self.bbs[bb].name.as_deref()
    }

    /// Set the name of a block.
    pub fn set_block_name(&mut self, bb: Block, name: String) {
        self.bbs[bb].name = Some(name);
    }

    /// Return an iterator over all BBs in layout order.
    pub fn blocks<'a>(&'a self) -> impl Iterator<Item = Block> + 'a {
        std::iter::successors(self.first_bb, move |&bb| self.next_block(bb))
    }

    /// Get the first BB in the layout. This is the entry block.
    pub fn first_block(&self) -> Option<Block> {
        self.first_bb
    }

    /// Get the BB following `bb` in the layout.
    pub fn next_block(&self, bb: Block) -> Option<Block> {
        self.bbs[bb].next
    }

    /// Get the BB preceding `bb` in the layout.
    pub fn prev_block(&self, bb: Block) -> Option<Block> {
        self.bbs[bb].prev
    }

    /// Get the entry block in the layout.
    ///
    /// The fallible alternative is `first_block()`.
    pub fn entry(&self) -> Block {
        self.first_block().expect("entry block is required")
    }

    /// The upper bound on block ids handed out so far.
    pub fn block_id_bound(&self) -> usize {
        self.bbs.id_bound()
    }
}

/// Determines the order of instructions within a block.
#[derive(Default)]
struct InstLayout {
    /// A linked list of instructions in layout order.
    insts: SecondaryTable<Inst, InstNode>,
    /// The first instruction in the layout.
    first_inst: Option<Inst>,
    /// The last instruction in the layout.
    last_inst: Option<Inst>,
}

/// A node in the layout's double-linked list of instructions.
#[derive(Default)]
struct InstNode {
    prev: Option<Inst>,
    next: Option<Inst>,
}

impl InstLayout {
    fn append_inst(&mut self, inst: Inst) {
        self.insts.add(
            inst,
            InstNode {
                prev: self.last_inst,
                next: None,
            },
        );
        if let Some(prev) = self.last_inst {
            self.insts[prev].next = Some(inst);
        }
        if self.first_inst.is_none() {
            self.first_inst = Some(inst);
        }
        self.last_inst = Some(inst);
    }

    fn prepend_inst(&mut self, inst: Inst) {
        self.insts.add(
            inst,
            InstNode {
                prev: None,
                next: self.first_inst,
            },
        );
        if let Some(next) = self.first_inst {
            self.insts[next].prev = Some(inst);
        }
        if self.last_inst.is_none() {
            self.last_inst = Some(inst);
        }
        self.first_inst = Some(inst);
    }

    fn remove_inst(&mut self, inst: Inst) {
        let node = self.insts.remove(inst).unwrap();
        if let Some(next) = node.next {
            self.insts[next].prev = node.prev;
        }
        if let Some(prev) = node.prev {
            self.insts[prev].next = node.next;
        }
        if self.first_inst == Some(inst) {
            self.first_inst = node.next;
        }
        if self.last_inst == Some(inst) {
            self.last_inst = node.prev;
        }
    }
}

/// Instruction arrangement.
///
/// The following functions are used for laying out the instructions within a
/// `Function`.
impl FunctionLayout {
    /// Get the BB which contains `inst`, or `None` if `inst` is not inserted.
    pub fn inst_block(&self, inst: Inst) -> Option<Block> {
        self.inst_map.get(&inst).cloned()
    }

    /// Append an instruction to the end of a BB.
    pub fn append_inst(&mut self, inst: Inst, bb: Block) {
        self.bbs[bb].layout.append_inst(inst);
        self.inst_map.insert(inst, bb);
    }

    /// Prepend an instruction to the beginning of a BB.
    pub fn prepend_inst(&mut self, inst: Inst, bb: Block) {
        self.bbs[bb].layout.prepend_inst(inst);
        self.inst_map.insert(inst, bb);
    }

    /// Remove an instruction from the function.
    pub fn remove_inst(&mut self, inst: Inst) {
        let bb = self.inst_block(inst).expect("`inst` not inserted");
        self.bbs[bb].layout.remove_inst(inst);
        self.inst_map.remove(&inst);
    }

    /// Return an iterator over all instructions in a block in layout order.
    pub fn insts<'a>(&'a self, bb: Block) -> impl Iterator<Item = Inst> + 'a {
        std::iter::successors(self.first_inst(bb), move |&inst| self.next_inst(inst))
    }

    /// Get the first instruction in a block.
    pub fn first_inst(&self, bb: Block) -> Option<Inst> {
        self.bbs[bb].layout.first_inst
    }

    /// Get the last instruction in a block.
    pub fn last_inst(&self, bb: Block) -> Option<Inst> {
        self.bbs[bb].layout.last_inst
    }

    /// Get the instruction preceding `inst` in the layout.
    pub fn prev_inst(&self, inst: Inst) -> Option<Inst> {
        let bb = self.inst_map[&inst];
        self.bbs[bb].layout.insts[inst].prev
    }

    /// Get the instruction following `inst` in the layout.
    pub fn next_inst(&self, inst: Inst) -> Option<Inst> {
        let bb = self.inst_map[&inst];
        self.bbs[bb].layout.insts[inst].next
    }

    /// Get the terminator instruction of a block.
    ///
    /// The fallible alternative is `last_inst(bb)`.
    pub fn terminator(&self, bb: Block) -> Inst {
        self.last_inst(bb).expect("block must have terminator")
    }
}
