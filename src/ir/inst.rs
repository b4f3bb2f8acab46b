// Copyright (c) 2017-2020 Fabian Schuiki

//! Representation of instructions.
//!
//! This module implements the various instructions of the intermediate
//! representation: the opcode enumeration, the per-format instruction data,
//! and the opcode classification the optimizer builds on.

use crate::{
    ir::{Block, ExtFunc, Value},
    ty::Type,
};
use bitflags::bitflags;

/// An instruction opcode.
///
/// This enum represents the actual instruction, whereas `InstData` covers the
/// format and arguments of the instruction.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Opcode {
    Add,
    FAdd,
    Sub,
    FSub,
    Mul,
    FMul,
    UDiv,
    SDiv,
    FDiv,
    URem,
    SRem,
    FRem,
    FNeg,
    Shl,
    LShr,
    AShr,
    And,
    Or,
    Xor,
    ICmp,
    FCmp,
    Trunc,
    ZExt,
    SExt,
    FPToUI,
    FPToSI,
    UIToFP,
    SIToFP,
    FPTrunc,
    FPExt,
    PtrToInt,
    IntToPtr,
    Bitcast,
    AddrSpaceCast,
    Alloca,
    Load,
    Store,
    Gep,
    ExtractValue,
    InsertValue,
    ExtractElement,
    InsertElement,
    ShuffleVector,
    Phi,
    Select,
    Call,
    Invoke,
    VaArg,
    Ret,
    Br,
    BrCond,
    Unreachable,
}

impl std::fmt::Display for Opcode {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.mnemonic())
    }
}

impl Opcode {
    /// The assembly mnemonic of this opcode.
    pub fn mnemonic(self) -> &'static str {
        match self {
            Opcode::Add => "add",
            Opcode::FAdd => "fadd",
            Opcode::Sub => "sub",
            Opcode::FSub => "fsub",
            Opcode::Mul => "mul",
            Opcode::FMul => "fmul",
            Opcode::UDiv => "udiv",
            Opcode::SDiv => "sdiv",
            Opcode::FDiv => "fdiv",
            Opcode::URem => "urem",
            Opcode::SRem => "srem",
            Opcode::FRem => "frem",
            Opcode::FNeg => "fneg",
            Opcode::Shl => "shl",
            Opcode::LShr => "lshr",
            Opcode::AShr => "ashr",
            Opcode::And => "and",
            Opcode::Or => "or",
            Opcode::Xor => "xor",
            Opcode::ICmp => "icmp",
            Opcode::FCmp => "fcmp",
            Opcode::Trunc => "trunc",
            Opcode::ZExt => "zext",
            Opcode::SExt => "sext",
            Opcode::FPToUI => "fptoui",
            Opcode::FPToSI => "fptosi",
            Opcode::UIToFP => "uitofp",
            Opcode::SIToFP => "sitofp",
            Opcode::FPTrunc => "fptrunc",
            Opcode::FPExt => "fpext",
            Opcode::PtrToInt => "ptrtoint",
            Opcode::IntToPtr => "inttoptr",
            Opcode::Bitcast => "bitcast",
            Opcode::AddrSpaceCast => "addrspacecast",
            Opcode::Alloca => "alloca",
            Opcode::Load => "load",
            Opcode::Store => "store",
            Opcode::Gep => "gep",
            Opcode::ExtractValue => "extractvalue",
            Opcode::InsertValue => "insertvalue",
            Opcode::ExtractElement => "extractelement",
            Opcode::InsertElement => "insertelement",
            Opcode::ShuffleVector => "shufflevector",
            Opcode::Phi => "phi",
            Opcode::Select => "select",
            Opcode::Call => "call",
            Opcode::Invoke => "invoke",
            Opcode::VaArg => "vaarg",
            Opcode::Ret => "ret",
            Opcode::Br | Opcode::BrCond => "br",
            Opcode::Unreachable => "unreachable",
        }
    }

    /// Check if this opcode terminates a basic block.
    ///
    /// Terminators are only ever the last instruction of a block and are
    /// never rewritten by the optimizer.
    pub fn is_terminator(self) -> bool {
        match self {
            Opcode::Ret | Opcode::Br | Opcode::BrCond | Opcode::Unreachable | Opcode::Invoke => {
                true
            }
            _ => false,
        }
    }

    /// Check if this opcode is a phi node.
    pub fn is_phi(self) -> bool {
        self == Opcode::Phi
    }

    /// Check if this opcode is free of side effects.
    ///
    /// Instructions with such opcodes may be erased when their result is
    /// unused. Loads qualify as well, but only when non-volatile; that part
    /// of the decision lives in `InstData::is_side_effect_free` where the
    /// volatility bit is at hand.
    pub fn is_side_effect_free(self) -> bool {
        match self {
            Opcode::Add
            | Opcode::FAdd
            | Opcode::Sub
            | Opcode::FSub
            | Opcode::Mul
            | Opcode::FMul
            | Opcode::UDiv
            | Opcode::SDiv
            | Opcode::FDiv
            | Opcode::URem
            | Opcode::SRem
            | Opcode::FRem
            | Opcode::FNeg
            | Opcode::Shl
            | Opcode::LShr
            | Opcode::AShr
            | Opcode::And
            | Opcode::Or
            | Opcode::Xor
            | Opcode::ICmp
            | Opcode::FCmp
            | Opcode::Trunc
            | Opcode::ZExt
            | Opcode::SExt
            | Opcode::FPToUI
            | Opcode::FPToSI
            | Opcode::UIToFP
            | Opcode::SIToFP
            | Opcode::FPTrunc
            | Opcode::FPExt
            | Opcode::PtrToInt
            | Opcode::IntToPtr
            | Opcode::Bitcast
            | Opcode::AddrSpaceCast
            | Opcode::Alloca
            | Opcode::Gep
            | Opcode::ExtractValue
            | Opcode::InsertValue
            | Opcode::ExtractElement
            | Opcode::InsertElement
            | Opcode::ShuffleVector
            | Opcode::Phi
            | Opcode::Select => true,
            _ => false,
        }
    }

    /// Check if instructions with this opcode are candidates for common
    /// subexpression elimination.
    ///
    /// Memory accesses are handled by the in-block redundancy scans instead.
    /// `alloca` is excluded because its result has address identity, `fcmp`
    /// because of NaN, and `extractvalue` because aggregate identity is
    /// fragile.
    pub fn is_cse_eligible(self) -> bool {
        match self {
            Opcode::Alloca | Opcode::FCmp | Opcode::ExtractValue => false,
            op => op.is_side_effect_free(),
        }
    }

    /// Check if this opcode is commutative in its two operands.
    ///
    /// The CSE equivalence check deliberately does *not* exploit this; the
    /// simplifier uses it to match identities on either side.
    pub fn is_commutative(self) -> bool {
        match self {
            Opcode::Add | Opcode::Mul | Opcode::And | Opcode::Or | Opcode::Xor | Opcode::FAdd
            | Opcode::FMul => true,
            _ => false,
        }
    }
}

/// The condition of an `icmp` instruction.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum IntCond {
    Eq,
    Ne,
    Ugt,
    Uge,
    Ult,
    Ule,
    Sgt,
    Sge,
    Slt,
    Sle,
}

impl IntCond {
    /// The assembly mnemonic of this condition.
    pub fn mnemonic(self) -> &'static str {
        match self {
            IntCond::Eq => "eq",
            IntCond::Ne => "ne",
            IntCond::Ugt => "ugt",
            IntCond::Uge => "uge",
            IntCond::Ult => "ult",
            IntCond::Ule => "ule",
            IntCond::Sgt => "sgt",
            IntCond::Sge => "sge",
            IntCond::Slt => "slt",
            IntCond::Sle => "sle",
        }
    }

    /// The outcome of comparing a value against itself.
    pub fn on_equal_operands(self) -> bool {
        match self {
            IntCond::Eq | IntCond::Uge | IntCond::Ule | IntCond::Sge | IntCond::Sle => true,
            IntCond::Ne | IntCond::Ugt | IntCond::Ult | IntCond::Sgt | IntCond::Slt => false,
        }
    }

    /// Whether this condition compares its operands as signed values.
    pub fn is_signed(self) -> bool {
        match self {
            IntCond::Sgt | IntCond::Sge | IntCond::Slt | IntCond::Sle => true,
            _ => false,
        }
    }
}

impl std::fmt::Display for IntCond {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.mnemonic())
    }
}

/// The condition of an `fcmp` instruction.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum FloatCond {
    False,
    Oeq,
    Ogt,
    Oge,
    Olt,
    Ole,
    One,
    Ord,
    Ueq,
    Ugt,
    Uge,
    Ult,
    Ule,
    Une,
    Uno,
    True,
}

impl FloatCond {
    /// The assembly mnemonic of this condition.
    pub fn mnemonic(self) -> &'static str {
        match self {
            FloatCond::False => "false",
            FloatCond::Oeq => "oeq",
            FloatCond::Ogt => "ogt",
            FloatCond::Oge => "oge",
            FloatCond::Olt => "olt",
            FloatCond::Ole => "ole",
            FloatCond::One => "one",
            FloatCond::Ord => "ord",
            FloatCond::Ueq => "ueq",
            FloatCond::Ugt => "ugt",
            FloatCond::Uge => "uge",
            FloatCond::Ult => "ult",
            FloatCond::Ule => "ule",
            FloatCond::Une => "une",
            FloatCond::Uno => "uno",
            FloatCond::True => "true",
        }
    }

    /// Evaluate the condition on two concrete floats.
    pub fn evaluate(self, a: f64, b: f64) -> bool {
        let unordered = a.is_nan() || b.is_nan();
        match self {
            FloatCond::False => false,
            FloatCond::True => true,
            FloatCond::Ord => !unordered,
            FloatCond::Uno => unordered,
            FloatCond::Oeq => !unordered && a == b,
            FloatCond::Ogt => !unordered && a > b,
            FloatCond::Oge => !unordered && a >= b,
            FloatCond::Olt => !unordered && a < b,
            FloatCond::Ole => !unordered && a <= b,
            FloatCond::One => !unordered && a != b,
            FloatCond::Ueq => unordered || a == b,
            FloatCond::Ugt => unordered || a > b,
            FloatCond::Uge => unordered || a >= b,
            FloatCond::Ult => unordered || a < b,
            FloatCond::Ule => unordered || a <= b,
            FloatCond::Une => unordered || a != b,
        }
    }
}

impl std::fmt::Display for FloatCond {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.mnemonic())
    }
}

bitflags! {
    /// Attribute bits of a memory access.
    pub struct MemFlags: u8 {
        /// The access is volatile. Volatile accesses are never eliminated,
        /// forwarded, or reordered past.
        const VOLATILE = 0b1;
    }
}

/// An instruction format.
///
/// Equality of two `InstData` covers the opcode, the operands by identity,
/// and all auxiliary fields of the format, which is exactly the equivalence
/// the CSE driver needs (together with result-type equality).
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq)]
pub enum InstData {
    /// `unreachable`
    Nullary { opcode: Opcode },
    /// `a = <op> type b`; unary arithmetic, casts, and `vaarg`
    Unary { opcode: Opcode, args: [Value; 1] },
    /// `a = <op> type b, c`
    Binary { opcode: Opcode, args: [Value; 2] },
    /// `a = select cond, b, c` and the vector insert/shuffle forms
    Ternary { opcode: Opcode, args: [Value; 3] },
    /// `a = icmp cond type b, c`
    IntCompare {
        opcode: Opcode,
        cond: IntCond,
        args: [Value; 2],
    },
    /// `a = fcmp cond type b, c`
    FloatCompare {
        opcode: Opcode,
        cond: FloatCond,
        args: [Value; 2],
    },
    /// `a = alloca type`
    Alloca { opcode: Opcode, ty: Type },
    /// `a = load type, ptr p`
    Load {
        opcode: Opcode,
        flags: MemFlags,
        args: [Value; 1],
    },
    /// `store type v, ptr p`; operands are [value, pointer]
    Store {
        opcode: Opcode,
        flags: MemFlags,
        args: [Value; 2],
    },
    /// `a = gep type, ptr p, indices...`; operands are [pointer, indices...]
    Gep {
        opcode: Opcode,
        ty: Type,
        args: Vec<Value>,
    },
    /// `a = extractvalue agg, imms...` and `a = insertvalue agg, elt, imms...`
    Aggregate {
        opcode: Opcode,
        args: Vec<Value>,
        imms: Vec<usize>,
    },
    /// `a = phi type [v, bb], ...`
    Phi {
        opcode: Opcode,
        args: Vec<Value>,
        bbs: Vec<Block>,
    },
    /// `a = call type ext (args...)`
    Call {
        opcode: Opcode,
        ext: ExtFunc,
        args: Vec<Value>,
    },
    /// `a = invoke type ext (args...) to bb unwind bb`
    Invoke {
        opcode: Opcode,
        ext: ExtFunc,
        args: Vec<Value>,
        bbs: [Block; 2],
    },
    /// `br bb`
    Jump { opcode: Opcode, bbs: [Block; 1] },
    /// `br cond, bb, bb`
    Branch {
        opcode: Opcode,
        args: [Value; 1],
        bbs: [Block; 2],
    },
    /// `ret` or `ret type v`
    Return { opcode: Opcode, args: Vec<Value> },
}

impl InstData {
    /// Get the opcode of the instruction.
    pub fn opcode(&self) -> Opcode {
        match *self {
            InstData::Nullary { opcode }
            | InstData::Unary { opcode, .. }
            | InstData::Binary { opcode, .. }
            | InstData::Ternary { opcode, .. }
            | InstData::IntCompare { opcode, .. }
            | InstData::FloatCompare { opcode, .. }
            | InstData::Alloca { opcode, .. }
            | InstData::Load { opcode, .. }
            | InstData::Store { opcode, .. }
            | InstData::Gep { opcode, .. }
            | InstData::Aggregate { opcode, .. }
            | InstData::Phi { opcode, .. }
            | InstData::Call { opcode, .. }
            | InstData::Invoke { opcode, .. }
            | InstData::Jump { opcode, .. }
            | InstData::Branch { opcode, .. }
            | InstData::Return { opcode, .. } => opcode,
        }
    }

    /// Get the arguments of an instruction.
    pub fn args(&self) -> &[Value] {
        match self {
            InstData::Nullary { .. }
            | InstData::Alloca { .. }
            | InstData::Jump { .. } => &[],
            InstData::Unary { args, .. } => args,
            InstData::Binary { args, .. } => args,
            InstData::Ternary { args, .. } => args,
            InstData::IntCompare { args, .. } => args,
            InstData::FloatCompare { args, .. } => args,
            InstData::Load { args, .. } => args,
            InstData::Store { args, .. } => args,
            InstData::Gep { args, .. } => args,
            InstData::Aggregate { args, .. } => args,
            InstData::Phi { args, .. } => args,
            InstData::Call { args, .. } => args,
            InstData::Invoke { args, .. } => args,
            InstData::Branch { args, .. } => args,
            InstData::Return { args, .. } => args,
        }
    }

    /// Mutable access to the arguments of an instruction.
    pub fn args_mut(&mut self) -> &mut [Value] {
        match self {
            InstData::Nullary { .. }
            | InstData::Alloca { .. }
            | InstData::Jump { .. } => &mut [],
            InstData::Unary { args, .. } => args,
            InstData::Binary { args, .. } => args,
            InstData::Ternary { args, .. } => args,
            InstData::IntCompare { args, .. } => args,
            InstData::FloatCompare { args, .. } => args,
            InstData::Load { args, .. } => args,
            InstData::Store { args, .. } => args,
            InstData::Gep { args, .. } => args,
            InstData::Aggregate { args, .. } => args,
            InstData::Phi { args, .. } => args,
            InstData::Call { args, .. } => args,
            InstData::Invoke { args, .. } => args,
            InstData::Branch { args, .. } => args,
            InstData::Return { args, .. } => args,
        }
    }

    /// Get the blocks an instruction references.
    pub fn blocks(&self) -> &[Block] {
        match self {
            InstData::Phi { bbs, .. } => bbs,
            InstData::Invoke { bbs, .. } => bbs,
            InstData::Jump { bbs, .. } => bbs,
            InstData::Branch { bbs, .. } => bbs,
            _ => &[],
        }
    }

    /// Get the memory access flags of an instruction.
    ///
    /// Instructions that are not memory accesses report no flags.
    pub fn flags(&self) -> MemFlags {
        match self {
            InstData::Load { flags, .. } | InstData::Store { flags, .. } => *flags,
            _ => MemFlags::empty(),
        }
    }

    /// Check if this is a volatile memory access.
    pub fn is_volatile(&self) -> bool {
        self.flags().contains(MemFlags::VOLATILE)
    }

    /// Get the external function called by this instruction, if any.
    pub fn get_ext(&self) -> Option<ExtFunc> {
        match self {
            InstData::Call { ext, .. } | InstData::Invoke { ext, .. } => Some(*ext),
            _ => None,
        }
    }

    /// Get the condition of an `icmp` instruction, if any.
    pub fn get_int_cond(&self) -> Option<IntCond> {
        match self {
            InstData::IntCompare { cond, .. } => Some(*cond),
            _ => None,
        }
    }

    /// Check if this instruction is free of side effects.
    ///
    /// This is the opcode-level classification, refined with the volatility
    /// bit for loads.
    pub fn is_side_effect_free(&self) -> bool {
        match self.opcode() {
            Opcode::Load => !self.is_volatile(),
            op => op.is_side_effect_free(),
        }
    }
}
