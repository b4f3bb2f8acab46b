// Copyright (c) 2017-2021 Fabian Schuiki

//! Instruction Simplification
//!
//! This module implements the algebraic simplifier. Given an instruction it
//! either produces an equivalent but simpler value that already exists (or is
//! a constant), or nothing. The caller reroutes the uses and erases the
//! original instruction.
//!
//! Floating-point rules are restricted to rewrites that are exact under
//! IEEE-754; reductions that change NaN or signed-zero behavior are not
//! applied.

use crate::ir::{
    all_ones, to_signed, to_unsigned, wrap_to_width, ConstData, DataFlowGraph, DataLayout,
    InstData, Inst, Opcode, Value,
};
use crate::ty::{int_ty, Type};
use num::{BigInt, FromPrimitive, One, ToPrimitive, Zero};

/// Try to find a simpler equivalent for an instruction.
///
/// This is a pure function of the instruction and the module's data layout;
/// the data flow graph is only mutated to intern result constants.
pub fn simplify_inst(dfg: &mut DataFlowGraph, dl: &DataLayout, inst: Inst) -> Option<Value> {
    if !dfg.has_result(inst) {
        return None;
    }
    let result = dfg.inst_result(inst);
    let ty = dfg.value_type(result);
    match dfg[inst].clone() {
        InstData::Unary { opcode, args: [a] } => simplify_unary(dfg, dl, opcode, ty, a),
        InstData::Binary {
            opcode,
            args: [a, b],
        } => simplify_binary(dfg, dl, opcode, ty, a, b),
        InstData::IntCompare {
            cond, args: [a, b], ..
        } => {
            if a == b {
                return Some(bool_const(dfg, cond.on_equal_operands()));
            }
            let (ca, cb) = (dfg.get_const_int(a)?.clone(), dfg.get_const_int(b)?.clone());
            let width = dl.bit_width(&dfg.value_type(a))?;
            let holds = if cond.is_signed() {
                eval_int_cond(cond, &to_signed(&ca, width), &to_signed(&cb, width))
            } else {
                eval_int_cond(cond, &ca, &cb)
            };
            Some(bool_const(dfg, holds))
        }
        InstData::FloatCompare {
            cond, args: [a, b], ..
        } => {
            use crate::ir::FloatCond;
            match cond {
                FloatCond::False => return Some(bool_const(dfg, false)),
                FloatCond::True => return Some(bool_const(dfg, true)),
                _ => (),
            }
            let ca = float_const(dfg, a)?;
            let cb = float_const(dfg, b)?;
            Some(bool_const(dfg, cond.evaluate(ca, cb)))
        }
        InstData::Ternary {
            opcode: Opcode::Select,
            args: [c, x, y],
        } => {
            if x == y {
                return Some(x);
            }
            match dfg.get_const_int(c)?.is_zero() {
                true => Some(y),
                false => Some(x),
            }
        }
        InstData::Phi { args, .. } => simplify_phi(result, &args),
        InstData::Gep { args, .. } => {
            let all_zero = args[1..]
                .iter()
                .all(|&idx| dfg.get_const_int(idx).map(|v| v.is_zero()).unwrap_or(false));
            if !args[1..].is_empty() && all_zero {
                Some(args[0])
            } else {
                None
            }
        }
        _ => None,
    }
}

/// Simplify a phi whose operands all agree.
///
/// References of the phi to its own result are ignored; they carry the same
/// value around a loop.
fn simplify_phi(result: Value, args: &[Value]) -> Option<Value> {
    let mut first = None;
    for &arg in args {
        if arg == result {
            continue;
        }
        match first {
            None => first = Some(arg),
            Some(f) if f != arg => return None,
            Some(_) => (),
        }
    }
    first
}

fn simplify_unary(
    dfg: &mut DataFlowGraph,
    dl: &DataLayout,
    opcode: Opcode,
    ty: Type,
    a: Value,
) -> Option<Value> {
    match opcode {
        Opcode::FNeg => {
            let v = float_const(dfg, a)?;
            Some(dfg.const_float(ty, -v))
        }
        Opcode::Trunc => {
            let v = dfg.get_const_int(a)?.clone();
            Some(dfg.const_int(ty, v))
        }
        Opcode::ZExt => {
            let v = dfg.get_const_int(a)?.clone();
            Some(dfg.const_int(ty, v))
        }
        Opcode::SExt => {
            let src_width = dl.bit_width(&dfg.value_type(a))?;
            let v = to_signed(dfg.get_const_int(a)?, src_width);
            Some(dfg.const_int(ty, v))
        }
        Opcode::FPToUI => {
            let width = dl.bit_width(&ty)?;
            let v = float_const(dfg, a)?.trunc();
            let big = BigInt::from_f64(v)?;
            if big.sign() == num::bigint::Sign::Minus || big >= (BigInt::one() << width) {
                return None;
            }
            Some(dfg.const_int(ty, big))
        }
        Opcode::FPToSI => {
            let width = dl.bit_width(&ty)?;
            let v = float_const(dfg, a)?.trunc();
            let big = BigInt::from_f64(v)?;
            let half = BigInt::one() << (width - 1);
            if big < -&half || big >= half {
                return None;
            }
            Some(dfg.const_int(ty, big))
        }
        Opcode::UIToFP => {
            let v = dfg.get_const_int(a)?.to_f64()?;
            Some(dfg.const_float(ty, v))
        }
        Opcode::SIToFP => {
            let src_width = dl.bit_width(&dfg.value_type(a))?;
            let v = to_signed(dfg.get_const_int(a)?, src_width).to_f64()?;
            Some(dfg.const_float(ty, v))
        }
        Opcode::FPTrunc | Opcode::FPExt => {
            let v = float_const(dfg, a)?;
            if opcode == Opcode::FPTrunc && !(v as f32).is_finite() {
                return None;
            }
            Some(dfg.const_float(ty, v))
        }
        Opcode::PtrToInt => match dfg.get_const(a)? {
            ConstData::Null => Some(dfg.const_int(ty, BigInt::zero())),
            _ => None,
        },
        Opcode::IntToPtr => {
            if dfg.get_const_int(a)?.is_zero() {
                Some(dfg.const_null())
            } else {
                None
            }
        }
        Opcode::Bitcast => {
            if dfg.value_type(a) == ty {
                return Some(a);
            }
            match (dfg.get_const(a)?.clone(), &*ty) {
                (ConstData::Int(v), crate::ty::TypeKind::FloatType(64)) => {
                    Some(dfg.const_float(ty.clone(), f64::from_bits(v.to_u64()?)))
                }
                (ConstData::Int(v), crate::ty::TypeKind::FloatType(32)) => Some(
                    dfg.const_float(ty.clone(), f32::from_bits(v.to_u32()?) as f64),
                ),
                (ConstData::Float(bits), crate::ty::TypeKind::IntType(64)) => {
                    Some(dfg.const_int(ty.clone(), BigInt::from(bits)))
                }
                (ConstData::Float(bits), crate::ty::TypeKind::IntType(32)) => Some(
                    dfg.const_int(ty.clone(), BigInt::from((f64::from_bits(bits) as f32).to_bits())),
                ),
                _ => None,
            }
        }
        _ => None,
    }
}

fn simplify_binary(
    dfg: &mut DataFlowGraph,
    dl: &DataLayout,
    opcode: Opcode,
    ty: Type,
    a: Value,
    b: Value,
) -> Option<Value> {
    if ty.is_int() {
        simplify_int_binary(dfg, dl, opcode, ty, a, b)
    } else if ty.is_float() {
        simplify_float_binary(dfg, opcode, ty, a, b)
    } else {
        None
    }
}

fn simplify_int_binary(
    dfg: &mut DataFlowGraph,
    dl: &DataLayout,
    opcode: Opcode,
    ty: Type,
    a: Value,
    b: Value,
) -> Option<Value> {
    let width = dl.bit_width(&ty)?;
    let ca = dfg.get_const_int(a).cloned();
    let cb = dfg.get_const_int(b).cloned();

    // Fold instructions whose operands are all constants.
    if let (Some(ca), Some(cb)) = (&ca, &cb) {
        if let Some(v) = fold_int_binary(opcode, width, ca, cb) {
            return Some(dfg.const_int(ty, v));
        }
    }

    let zero = |c: &Option<BigInt>| c.as_ref().map(|v| v.is_zero()).unwrap_or(false);
    let one = |c: &Option<BigInt>| c.as_ref().map(|v| v.is_one()).unwrap_or(false);
    let ones = |c: &Option<BigInt>| c.as_ref().map(|v| *v == all_ones(width)).unwrap_or(false);

    match opcode {
        Opcode::Add => {
            if zero(&cb) {
                return Some(a);
            }
            if zero(&ca) {
                return Some(b);
            }
        }
        Opcode::Sub => {
            if zero(&cb) {
                return Some(a);
            }
            if a == b {
                return Some(dfg.const_int(ty, BigInt::zero()));
            }
        }
        Opcode::Mul => {
            if one(&cb) {
                return Some(a);
            }
            if one(&ca) {
                return Some(b);
            }
            if zero(&ca) || zero(&cb) {
                return Some(dfg.const_int(ty, BigInt::zero()));
            }
        }
        Opcode::UDiv | Opcode::SDiv => {
            if one(&cb) {
                return Some(a);
            }
        }
        Opcode::URem | Opcode::SRem => {
            if a == b {
                return Some(dfg.const_int(ty, BigInt::zero()));
            }
        }
        Opcode::Shl | Opcode::LShr | Opcode::AShr => {
            if zero(&cb) {
                return Some(a);
            }
        }
        Opcode::And => {
            if a == b {
                return Some(a);
            }
            if zero(&ca) || zero(&cb) {
                return Some(dfg.const_int(ty, BigInt::zero()));
            }
            if ones(&cb) {
                return Some(a);
            }
            if ones(&ca) {
                return Some(b);
            }
        }
        Opcode::Or => {
            if a == b {
                return Some(a);
            }
            if zero(&cb) {
                return Some(a);
            }
            if zero(&ca) {
                return Some(b);
            }
            if ones(&ca) || ones(&cb) {
                return Some(dfg.const_int(ty, all_ones(width)));
            }
        }
        Opcode::Xor => {
            if a == b {
                return Some(dfg.const_int(ty, BigInt::zero()));
            }
            if zero(&cb) {
                return Some(a);
            }
            if zero(&ca) {
                return Some(b);
            }
        }
        _ => (),
    }
    None
}

fn simplify_float_binary(
    dfg: &mut DataFlowGraph,
    opcode: Opcode,
    ty: Type,
    a: Value,
    b: Value,
) -> Option<Value> {
    let ca = float_const(dfg, a);
    let cb = float_const(dfg, b);

    if let (Some(ca), Some(cb)) = (ca, cb) {
        let v = match opcode {
            Opcode::FAdd => ca + cb,
            Opcode::FSub => ca - cb,
            Opcode::FMul => ca * cb,
            Opcode::FDiv => ca / cb,
            Opcode::FRem => ca % cb,
            _ => return None,
        };
        // NaN and infinity have no spelling in the assembly format; leave
        // such instructions in place.
        if v.is_finite() {
            return Some(dfg.const_float(ty, v));
        }
        return None;
    }

    // The only identities that hold for every operand, NaN and signed zero
    // included: x + -0.0, x - 0.0, x * 1.0, x / 1.0.
    let is = |c: Option<f64>, bits: u64| c.map(|v| v.to_bits() == bits).unwrap_or(false);
    match opcode {
        Opcode::FAdd if is(cb, (-0.0f64).to_bits()) => Some(a),
        Opcode::FAdd if is(ca, (-0.0f64).to_bits()) => Some(b),
        Opcode::FSub if is(cb, 0.0f64.to_bits()) => Some(a),
        Opcode::FMul if is(cb, 1.0f64.to_bits()) => Some(a),
        Opcode::FMul if is(ca, 1.0f64.to_bits()) => Some(b),
        Opcode::FDiv if is(cb, 1.0f64.to_bits()) => Some(a),
        _ => None,
    }
}

/// Fold an integer instruction with constant operands.
///
/// Inputs and output are in canonical unsigned form. Returns `None` for the
/// cases the IR leaves undefined, such as division by zero or over-wide
/// shift amounts.
fn fold_int_binary(opcode: Opcode, width: usize, a: &BigInt, b: &BigInt) -> Option<BigInt> {
    let v = match opcode {
        Opcode::Add => a + b,
        Opcode::Sub => a - b,
        Opcode::Mul => a * b,
        Opcode::UDiv => {
            if b.is_zero() {
                return None;
            }
            a / b
        }
        Opcode::URem => {
            if b.is_zero() {
                return None;
            }
            a % b
        }
        Opcode::SDiv | Opcode::SRem => {
            let (sa, sb) = (to_signed(a, width), to_signed(b, width));
            if sb.is_zero() {
                return None;
            }
            // The overflowing MIN/-1 case stays untouched.
            if sa == -(BigInt::one() << (width - 1)) && sb == -BigInt::one() {
                return None;
            }
            match opcode {
                Opcode::SDiv => sa / sb,
                _ => sa % sb,
            }
        }
        Opcode::Shl | Opcode::LShr | Opcode::AShr => {
            let amount = b.to_usize()?;
            if amount >= width {
                return None;
            }
            match opcode {
                Opcode::Shl => a << amount,
                Opcode::LShr => a >> amount,
                _ => to_signed(a, width) >> amount,
            }
        }
        Opcode::And => BigInt::from(to_unsigned(a) & to_unsigned(b)),
        Opcode::Or => BigInt::from(to_unsigned(a) | to_unsigned(b)),
        Opcode::Xor => BigInt::from(to_unsigned(a) ^ to_unsigned(b)),
        _ => return None,
    };
    Some(wrap_to_width(v, width))
}

fn eval_int_cond(cond: crate::ir::IntCond, a: &BigInt, b: &BigInt) -> bool {
    use crate::ir::IntCond::*;
    match cond {
        Eq => a == b,
        Ne => a != b,
        Ugt | Sgt => a > b,
        Uge | Sge => a >= b,
        Ult | Slt => a < b,
        Ule | Sle => a <= b,
    }
}

fn bool_const(dfg: &mut DataFlowGraph, value: bool) -> Value {
    dfg.const_int(int_ty(1), BigInt::from(value as u8))
}

fn float_const(dfg: &DataFlowGraph, value: Value) -> Option<f64> {
    match dfg.get_const(value)? {
        ConstData::Float(bits) => Some(f64::from_bits(*bits)),
        _ => None,
    }
}
