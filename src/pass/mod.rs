// Copyright (c) 2017-2021 Fabian Schuiki

//! Optimization passes on the IR.
//!
//! This module implements the passes that rewrite the intermediate
//! representation: redundancy elimination and stack slot promotion.

use crate::{ir::{DataLayout, Function, Module}, stats::Statistics};
use rayon::prelude::*;

pub mod cse;
pub mod mem2reg;
pub(crate) mod memred;
pub mod simplify;

pub use cse::CommonSubexprElim;
pub use mem2reg::Mem2Reg;

/// An optimization pass.
///
/// The optimization infrastructure will always call `run_on_module()`, which
/// by default distributes the work across functions. Functions share no
/// mutable state, so they are processed in parallel; the per-function
/// statistics are reduced into one sum at the end.
pub trait Pass {
    /// Run this pass on an entire module.
    fn run_on_module(ctx: &PassContext, module: &mut Module) -> Statistics {
        module
            .functions
            .par_iter_mut()
            .map(|func| {
                if func.is_declaration() {
                    Statistics::default()
                } else {
                    Self::run_on_function(ctx, func)
                }
            })
            .reduce(Statistics::default, |a, b| a + b)
    }

    /// Run this pass on a function.
    fn run_on_function(ctx: &PassContext, func: &mut Function) -> Statistics;
}

/// Additional context and configuration for optimizations.
#[derive(Default)]
pub struct PassContext {
    /// The data layout of the module being optimized.
    pub data_layout: DataLayout,
}

impl PassContext {
    /// Create a pass context for a module.
    pub fn for_module(module: &Module) -> Self {
        Self {
            data_layout: module.data_layout,
        }
    }
}
