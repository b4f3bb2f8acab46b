// Copyright (c) 2017-2020 Fabian Schuiki

//! Representation of linked functions.
//!
//! This module implements the `Module`, the root node of an intermediate
//! representation and the unit of information ingested by the reader and
//! emitted by the writer.

use crate::{
    ir::{Function, Signature},
    ty::{Type, TypeKind},
};

/// A module.
///
/// Contains function definitions and declarations in source order, the
/// module-level globals, and the data layout.
#[derive(Default)]
pub struct Module {
    /// The functions in this module, in source order.
    pub functions: Vec<Function>,
    /// The global variables declared in this module.
    pub globals: Vec<GlobalData>,
    /// The external function declarations in this module.
    pub declares: Vec<(String, Signature)>,
    /// The data layout of the module.
    pub data_layout: DataLayout,
}

impl Module {
    /// Create a new empty module.
    pub fn new() -> Self {
        Default::default()
    }

    /// Add a function to the module.
    pub fn add_function(&mut self, func: Function) {
        self.functions.push(func);
    }

    /// Iterate over the functions in the module.
    pub fn functions(&self) -> impl Iterator<Item = &Function> {
        self.functions.iter()
    }

    /// Iterate mutably over the functions in the module.
    pub fn functions_mut(&mut self) -> impl Iterator<Item = &mut Function> {
        self.functions.iter_mut()
    }
}

impl std::fmt::Display for Module {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", crate::assembly::write_module_string(self))
    }
}

/// A module-level global variable.
#[derive(Debug, Clone, PartialEq)]
pub struct GlobalData {
    /// The name of the global.
    pub name: String,
    /// The type of the value stored in the global.
    pub ty: Type,
}

/// The data layout of a module.
///
/// Answers the width queries the simplifier needs; the default layout has
/// 64 bit pointers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataLayout {
    /// The width of a pointer in bits.
    pub pointer_width: usize,
}

impl Default for DataLayout {
    fn default() -> Self {
        Self { pointer_width: 64 }
    }
}

impl DataLayout {
    /// The width in bits of a first-class scalar type.
    pub fn bit_width(&self, ty: &TypeKind) -> Option<usize> {
        match *ty {
            TypeKind::IntType(w) => Some(w),
            TypeKind::FloatType(w) => Some(w),
            TypeKind::PointerType => Some(self.pointer_width),
            _ => None,
        }
    }
}
