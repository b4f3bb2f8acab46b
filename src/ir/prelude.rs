// Copyright (c) 2017-2020 Fabian Schuiki

//! Re-exports of commonly used IR items.

pub use crate::ir::{
    Arg, Block, ConstData, DataFlowGraph, DataLayout, ExtFunc, ExtFuncData, FloatCond, Function,
    FunctionBuilder, Inst, InstBuilder, InstData, IntCond, MemFlags, Module, Opcode, Signature,
    Value, ValueData,
};
