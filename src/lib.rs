// Copyright (c) 2017-2021 Fabian Schuiki

//! A static single assignment intermediate representation together with a
//! local redundancy elimination optimizer. This library provides tools to
//! create, modify, store, and load SSA modules, and to rewrite them in place
//! to remove redundant computations while preserving observable behavior.

#[macro_use]
extern crate log;

pub mod table;

pub mod analysis;
pub mod assembly;
pub mod ir;
pub mod pass;
pub mod stats;
pub mod ty;
pub mod verifier;

pub use crate::ty::{Type, TypeKind};
