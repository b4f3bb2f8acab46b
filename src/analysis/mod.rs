// Copyright (c) 2017-2020 Fabian Schuiki

//! Analysis passes on the IR
//!
//! This module implements various analysis passes on the IR.

mod domtree;
mod preds;

pub use self::domtree::*;
pub use self::preds::*;
