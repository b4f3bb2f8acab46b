// Copyright (c) 2017-2020 Fabian Schuiki

//! Representation of SSA functions.
//!
//! This module implements the intermediate representation around which the
//! rest of the crate is built: modules of functions, functions of basic
//! blocks, and blocks of instructions in static single assignment form.

use crate::{impl_table_key, ty::Type};
use num::{bigint::Sign, BigInt, BigUint, One};

mod builder;
mod dfg;
mod function;
mod inst;
mod layout;
mod module;
pub mod prelude;
mod sig;

pub use self::builder::*;
pub use self::dfg::*;
pub use self::function::*;
pub use self::inst::*;
pub use self::layout::*;
pub use self::module::*;
pub use self::sig::*;

impl_table_key! {
    /// An instruction.
    struct Inst(u32) as "i";

    /// A value.
    struct Value(u32) as "v";

    /// A basic block.
    struct Block(u32) as "bb";

    /// An argument of a `Function`.
    struct Arg(u32) as "arg";

    /// An external function referenced from within a `Function`.
    struct ExtFunc(u32) as "ext";
}

/// Internal table storage for values.
#[derive(Debug, Clone)]
pub enum ValueData {
    /// The value is the result of an instruction.
    Inst { ty: Type, inst: Inst },
    /// The value is an argument of the `Function`.
    Arg { ty: Type, arg: Arg },
    /// The value is a constant.
    Const { ty: Type, konst: ConstData },
    /// The value is the address of a module-level global.
    Global { ty: Type, name: String },
    /// The value is a placeholder. Used during construction to patch forward
    /// references.
    Placeholder { ty: Type },
}

impl ValueData {
    /// Check whether this value is a placeholder.
    pub fn is_placeholder(&self) -> bool {
        match self {
            ValueData::Placeholder { .. } => true,
            _ => false,
        }
    }
}

/// A constant value.
///
/// Integer constants are kept in canonical unsigned form in the range
/// `[0, 2^w)` for a width-`w` type. Float constants are kept as the bits of
/// their `f64` representation such that constants can be interned.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ConstData {
    /// An integer constant.
    Int(BigInt),
    /// A floating-point constant, as `f64` bits.
    Float(u64),
    /// The null pointer constant.
    Null,
}

impl ConstData {
    /// The float value of this constant, or panic.
    pub fn unwrap_float(&self) -> f64 {
        match *self {
            ConstData::Float(bits) => f64::from_bits(bits),
            _ => panic!("unwrap_float called on {:?}", self),
        }
    }

    /// The integer value of this constant, if it is one.
    pub fn get_int(&self) -> Option<&BigInt> {
        match self {
            ConstData::Int(v) => Some(v),
            _ => None,
        }
    }
}

impl std::fmt::Display for ConstData {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            ConstData::Int(v) => write!(f, "{}", v),
            ConstData::Float(bits) => write!(f, "{:?}", f64::from_bits(*bits)),
            ConstData::Null => write!(f, "null"),
        }
    }
}

/// An external function referenced within a `Function`.
///
/// Calls and invokes refer to their callee through one of these; the module
/// carries the corresponding declarations.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtFuncData {
    /// The name of the referenced function.
    pub name: String,
    /// The signature of the referenced function.
    pub sig: Signature,
}

/// Wrap an integer into the canonical unsigned range `[0, 2^w)` of a
/// width-`w` integer type.
pub(crate) fn wrap_to_width(value: BigInt, width: usize) -> BigInt {
    let modulus = BigInt::one() << width;
    let v = value % &modulus;
    if v.sign() == Sign::Minus {
        v + modulus
    } else {
        v
    }
}

/// Interpret a canonical unsigned integer as a signed two's complement value
/// of the given width.
pub(crate) fn to_signed(value: &BigInt, width: usize) -> BigInt {
    let half = BigInt::one() << (width - 1);
    if *value >= half {
        value - (BigInt::one() << width)
    } else {
        value.clone()
    }
}

/// The canonical all-ones value of a width-`w` integer type.
pub(crate) fn all_ones(width: usize) -> BigInt {
    (BigInt::one() << width) - 1
}

/// View a canonical unsigned integer as a `BigUint` for bitwise operations.
pub(crate) fn to_unsigned(value: &BigInt) -> BigUint {
    value
        .to_biguint()
        .expect("constant not in canonical unsigned form")
}
