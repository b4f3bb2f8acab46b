// Copyright (c) 2017-2020 Fabian Schuiki

use crate::{analysis::PredecessorTable, ir::{Block, Function}, table::TableKey};
use hibitset::BitSet;

const UNDEF: u32 = std::u32::MAX;

/// A block dominator tree.
///
/// Records for every block which other blocks in the CFG *have* to be
/// traversed to reach it. Valid as long as the control flow edges of the
/// function do not change; the optimizer never changes them.
#[derive(Debug, Clone)]
pub struct DominatorTree {
    /// The immediate dominator of each block, indexed by block id.
    doms: Vec<Option<Block>>,
    /// Blocks in post-order.
    post_order: Vec<Block>,
    /// DFS entry number of each block in the dominator tree.
    dfs_in: Vec<u32>,
    /// DFS exit number of each block in the dominator tree.
    dfs_out: Vec<u32>,
}

impl DominatorTree {
    /// Compute the dominator tree of a function.
    ///
    /// This implementation is based on [1]. The resulting tree is DFS
    /// numbered such that `dominates` queries are answered in constant time.
    ///
    /// [1]: https://www.cs.rice.edu/~keith/Embed/dom.pdf "Cooper, Keith D., Timothy J. Harvey, and Ken Kennedy. 'A simple, fast dominance algorithm.' Software Practice & Experience 4.1-10 (2001): 1-8."
    pub fn new(func: &Function, pred: &PredecessorTable) -> Self {
        let post_order = Self::compute_blocks_post_order(func, pred);
        let length = post_order.len();
        let bound = func.layout.block_id_bound();

        let mut doms = vec![UNDEF; length];
        let mut inv_post_order = vec![UNDEF; bound];
        for (i, &bb) in post_order.iter().enumerate() {
            inv_post_order[bb.index()] = i as u32;
        }

        for root in Some(func.layout.entry())
            .into_iter()
            .chain(func.layout.blocks().filter(|&id| pred.pred_set(id).is_empty()))
        {
            let poidx = inv_post_order[root.index()];
            if poidx != UNDEF {
                doms[poidx as usize] = poidx; // root nodes
            }
        }

        let mut changed = true;
        while changed {
            changed = false;

            for idx in (0..length).rev() {
                if doms[idx] == idx as u32 {
                    continue; // skip root nodes
                }
                let bb = post_order[idx];

                let mut preds = pred
                    .pred_set(bb)
                    .iter()
                    .map(|id| inv_post_order[id.index()])
                    .filter(|&p| p != UNDEF && doms[p as usize] != UNDEF);
                let new_idom = match preds.next() {
                    Some(idom) => idom,
                    None => continue,
                };
                let new_idom = preds.fold(new_idom, |i1, i2| intersect(&doms, i1, i2));
                debug_assert!(new_idom < length as u32);
                if doms[idx] != new_idom {
                    doms[idx] = new_idom;
                    changed = true;
                }
            }
        }

        let mut doms_final = vec![None; bound];
        for &bb in &post_order {
            let idom = doms[inv_post_order[bb.index()] as usize];
            if idom != UNDEF {
                doms_final[bb.index()] = Some(post_order[idom as usize]);
            }
        }

        // Assemble the dominator tree and assign DFS in/out numbers.
        let mut children: Vec<Vec<Block>> = vec![vec![]; bound];
        let mut roots = vec![];
        for &bb in post_order.iter().rev() {
            match doms_final[bb.index()] {
                Some(idom) if idom != bb => children[idom.index()].push(bb),
                Some(_) => roots.push(bb),
                None => (),
            }
        }
        let mut dfs_in = vec![UNDEF; bound];
        let mut dfs_out = vec![UNDEF; bound];
        let mut counter = 0;
        for &root in &roots {
            let mut stack = vec![(root, 0)];
            dfs_in[root.index()] = counter;
            counter += 1;
            while let Some(&mut (bb, ref mut child)) = stack.last_mut() {
                if let Some(&next) = children[bb.index()].get(*child) {
                    *child += 1;
                    dfs_in[next.index()] = counter;
                    counter += 1;
                    stack.push((next, 0));
                } else {
                    dfs_out[bb.index()] = counter;
                    counter += 1;
                    stack.pop();
                }
            }
        }

        Self {
            doms: doms_final,
            post_order,
            dfs_in,
            dfs_out,
        }
    }

    fn compute_blocks_post_order(func: &Function, pred: &PredecessorTable) -> Vec<Block> {
        let mut order = Vec::with_capacity(pred.all_pred_sets().len());

        let mut stack = Vec::with_capacity(8);
        let mut discovered = BitSet::with_capacity(func.layout.block_id_bound() as u32);
        let mut finished = BitSet::with_capacity(func.layout.block_id_bound() as u32);

        stack.push(func.layout.entry());
        stack.extend(func.layout.blocks().filter(|&id| pred.pred_set(id).is_empty()));

        while let Some(&next) = stack.last() {
            if !discovered.add(next.index() as u32) {
                for succ in pred.succ(next) {
                    if !discovered.contains(succ.index() as u32) {
                        stack.push(succ);
                    }
                }
            } else {
                stack.pop();
                if !finished.add(next.index() as u32) {
                    order.push(next);
                }
            }
        }

        order
    }

    /// Get the blocks in the original CFG in post-order.
    pub fn blocks_post_order(&self) -> &[Block] {
        &self.post_order
    }

    /// Get the immediate dominator of a block.
    ///
    /// Roots of the dominator forest are their own immediate dominator.
    pub fn dominator(&self, block: Block) -> Option<Block> {
        self.doms[block.index()]
    }

    /// Check if a block dominates another.
    ///
    /// Every block dominates itself. Blocks that are not reachable from the
    /// entry dominate nothing but themselves.
    pub fn dominates(&self, dominator: Block, follower: Block) -> bool {
        let ia = self.dfs_in[dominator.index()];
        let ib = self.dfs_in[follower.index()];
        if ia == UNDEF || ib == UNDEF {
            return dominator == follower;
        }
        ia <= ib && self.dfs_out[follower.index()] <= self.dfs_out[dominator.index()]
    }
}

/// Find the common ancestor of two nodes in the partially constructed
/// dominator tree, by post-order index.
fn intersect(doms: &[u32], mut i1: u32, mut i2: u32) -> u32 {
    let i1_init = i1;
    while i1 != i2 {
        if i1 < i2 {
            if i1 == doms[i1 as usize] {
                return i1;
            }
            i1 = doms[i1 as usize];
        } else {
            if i2 == doms[i2 as usize] {
                return i1_init;
            }
            i2 = doms[i2 as usize];
        }
    }
    i1
}
