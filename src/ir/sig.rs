// Copyright (c) 2017-2020 Fabian Schuiki

//! Representation of function signatures.

use crate::{
    ir::Arg,
    table::TableKey,
    ty::{void_ty, Type},
};
use itertools::Itertools;

/// A function signature.
#[derive(Debug, Clone, PartialEq)]
pub struct Signature {
    args: Vec<Type>,
    ret: Type,
}

impl Default for Signature {
    fn default() -> Self {
        Self {
            args: Vec::new(),
            ret: void_ty(),
        }
    }
}

impl Signature {
    /// Create a new signature with no arguments and a void return type.
    pub fn new() -> Self {
        Default::default()
    }

    /// Add an input argument of the given type.
    pub fn add_input(&mut self, ty: Type) -> Arg {
        self.args.push(ty);
        Arg::new(self.args.len() - 1)
    }

    /// Set the return type of the signature.
    pub fn set_return_type(&mut self, ty: Type) {
        self.ret = ty;
    }

    /// Get the return type of the signature.
    pub fn return_type(&self) -> Type {
        self.ret.clone()
    }

    /// Iterate over the arguments of the signature.
    pub fn args<'a>(&'a self) -> impl Iterator<Item = Arg> + 'a {
        (0..self.args.len()).map(Arg::new)
    }

    /// The number of arguments.
    pub fn num_args(&self) -> usize {
        self.args.len()
    }

    /// Get the type of argument `arg`.
    pub fn arg_type(&self, arg: Arg) -> Type {
        self.args[arg.index()].clone()
    }
}

impl std::fmt::Display for Signature {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "({}) {}", self.args.iter().format(", "), self.ret)
    }
}
