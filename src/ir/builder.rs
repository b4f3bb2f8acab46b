// Copyright (c) 2017-2020 Fabian Schuiki

//! Convenient construction of functions.

use crate::{
    ir::{
        Block, ExtFunc, FloatCond, Function, Inst, InstData, IntCond, MemFlags, Opcode, Value,
    },
    ty::{int_ty, pointer_ty, void_ty, Type},
};

/// The position where new instructions will be inserted into a `Function`.
#[derive(Clone, Copy)]
enum InsertPos {
    None,
    Append(Block),
    Prepend(Block),
}

/// A builder that adds instructions to a `Function`.
pub struct FunctionBuilder<'u> {
    /// The function currently being built.
    pub func: &'u mut Function,
    /// The position where new instructions will be inserted.
    pos: InsertPos,
}

impl<'u> FunctionBuilder<'u> {
    /// Create a new function builder.
    pub fn new(func: &'u mut Function) -> Self {
        Self {
            func,
            pos: InsertPos::None,
        }
    }

    /// Create a new block and append it to the function.
    pub fn block(&mut self) -> Block {
        let bb = self.func.layout.create_block();
        self.func.layout.append_block(bb);
        bb
    }

    /// Create a new named block and append it to the function.
    pub fn named_block(&mut self, name: impl Into<String>) -> Block {
        let bb = self.block();
        self.func.layout.set_block_name(bb, name.into());
        bb
    }

    /// Append all following instructions to the end of a block.
    pub fn append_to(&mut self, bb: Block) {
        self.pos = InsertPos::Append(bb);
    }

    /// Prepend all following instructions at the beginning of a block.
    pub fn prepend_to(&mut self, bb: Block) {
        self.pos = InsertPos::Prepend(bb);
    }

    /// Add an instruction at the current position.
    pub fn build(&mut self, data: InstData, ty: Type) -> Inst {
        let inst = self.func.dfg.add_inst(data, ty);
        match self.pos {
            InsertPos::None => panic!("no insertion point set"),
            InsertPos::Append(bb) => self.func.layout.append_inst(inst, bb),
            InsertPos::Prepend(bb) => self.func.layout.prepend_inst(inst, bb),
        }
        inst
    }

    /// Get the instruction builder.
    pub fn ins(&mut self) -> InstBuilder<'_, 'u> {
        InstBuilder { builder: self }
    }
}

/// A builder for individual instructions.
pub struct InstBuilder<'a, 'u> {
    builder: &'a mut FunctionBuilder<'u>,
}

impl<'a, 'u> InstBuilder<'a, 'u> {
    fn build_result(&mut self, data: InstData, ty: Type) -> Value {
        let inst = self.builder.build(data, ty);
        self.builder.func.dfg.inst_result(inst)
    }

    /// `a = <op> type x`
    pub fn unary(&mut self, opcode: Opcode, ty: Type, x: Value) -> Value {
        self.build_result(InstData::Unary { opcode, args: [x] }, ty)
    }

    /// `a = <op> type x, y`
    pub fn binary(&mut self, opcode: Opcode, ty: Type, x: Value, y: Value) -> Value {
        self.build_result(InstData::Binary { opcode, args: [x, y] }, ty)
    }

    /// `a = icmp cond x, y`
    pub fn icmp(&mut self, cond: IntCond, x: Value, y: Value) -> Value {
        self.build_result(
            InstData::IntCompare {
                opcode: Opcode::ICmp,
                cond,
                args: [x, y],
            },
            int_ty(1),
        )
    }

    /// `a = fcmp cond x, y`
    pub fn fcmp(&mut self, cond: FloatCond, x: Value, y: Value) -> Value {
        self.build_result(
            InstData::FloatCompare {
                opcode: Opcode::FCmp,
                cond,
                args: [x, y],
            },
            int_ty(1),
        )
    }

    /// `a = alloca type`
    pub fn alloca(&mut self, ty: Type) -> Value {
        self.build_result(
            InstData::Alloca {
                opcode: Opcode::Alloca,
                ty,
            },
            pointer_ty(),
        )
    }

    /// `a = load type, ptr p`
    pub fn load(&mut self, ty: Type, flags: MemFlags, ptr: Value) -> Value {
        self.build_result(
            InstData::Load {
                opcode: Opcode::Load,
                flags,
                args: [ptr],
            },
            ty,
        )
    }

    /// `store type v, ptr p`
    pub fn store(&mut self, flags: MemFlags, value: Value, ptr: Value) -> Inst {
        self.builder.build(
            InstData::Store {
                opcode: Opcode::Store,
                flags,
                args: [value, ptr],
            },
            void_ty(),
        )
    }

    /// `a = gep type, ptr p, indices...`
    pub fn gep(&mut self, ty: Type, ptr: Value, indices: Vec<Value>) -> Value {
        let mut args = vec![ptr];
        args.extend(indices);
        self.build_result(
            InstData::Gep {
                opcode: Opcode::Gep,
                ty,
                args,
            },
            pointer_ty(),
        )
    }

    /// `a = extractvalue agg, imms...`
    pub fn extract_value(&mut self, ty: Type, agg: Value, imms: Vec<usize>) -> Value {
        self.build_result(
            InstData::Aggregate {
                opcode: Opcode::ExtractValue,
                args: vec![agg],
                imms,
            },
            ty,
        )
    }

    /// `a = insertvalue agg, elt, imms...`
    pub fn insert_value(&mut self, ty: Type, agg: Value, elt: Value, imms: Vec<usize>) -> Value {
        self.build_result(
            InstData::Aggregate {
                opcode: Opcode::InsertValue,
                args: vec![agg, elt],
                imms,
            },
            ty,
        )
    }

    /// `a = select cond, x, y`
    pub fn select(&mut self, ty: Type, cond: Value, x: Value, y: Value) -> Value {
        self.build_result(
            InstData::Ternary {
                opcode: Opcode::Select,
                args: [cond, x, y],
            },
            ty,
        )
    }

    /// `a = phi type [v, bb], ...`
    pub fn phi(&mut self, ty: Type, args: Vec<Value>, bbs: Vec<Block>) -> Value {
        assert_eq!(args.len(), bbs.len());
        self.build_result(
            InstData::Phi {
                opcode: Opcode::Phi,
                args,
                bbs,
            },
            ty,
        )
    }

    /// `a = call type ext (args...)`
    pub fn call(&mut self, ty: Type, ext: ExtFunc, args: Vec<Value>) -> Inst {
        self.builder.build(
            InstData::Call {
                opcode: Opcode::Call,
                ext,
                args,
            },
            ty,
        )
    }

    /// `a = invoke type ext (args...) to bb unwind bb`
    pub fn invoke(
        &mut self,
        ty: Type,
        ext: ExtFunc,
        args: Vec<Value>,
        normal: Block,
        unwind: Block,
    ) -> Inst {
        self.builder.build(
            InstData::Invoke {
                opcode: Opcode::Invoke,
                ext,
                args,
                bbs: [normal, unwind],
            },
            ty,
        )
    }

    /// `a = vaarg ptr list, type`
    pub fn vaarg(&mut self, ty: Type, list: Value) -> Value {
        self.build_result(
            InstData::Unary {
                opcode: Opcode::VaArg,
                args: [list],
            },
            ty,
        )
    }

    /// `ret`
    pub fn ret(&mut self) -> Inst {
        self.builder.build(
            InstData::Return {
                opcode: Opcode::Ret,
                args: vec![],
            },
            void_ty(),
        )
    }

    /// `ret type v`
    pub fn ret_value(&mut self, value: Value) -> Inst {
        self.builder.build(
            InstData::Return {
                opcode: Opcode::Ret,
                args: vec![value],
            },
            void_ty(),
        )
    }

    /// `br bb`
    pub fn br(&mut self, bb: Block) -> Inst {
        self.builder.build(
            InstData::Jump {
                opcode: Opcode::Br,
                bbs: [bb],
            },
            void_ty(),
        )
    }

    /// `br cond, bb0, bb1`
    pub fn br_cond(&mut self, cond: Value, bb0: Block, bb1: Block) -> Inst {
        self.builder.build(
            InstData::Branch {
                opcode: Opcode::BrCond,
                args: [cond],
                bbs: [bb0, bb1],
            },
            void_ty(),
        )
    }

    /// `unreachable`
    pub fn unreachable(&mut self) -> Inst {
        self.builder.build(
            InstData::Nullary {
                opcode: Opcode::Unreachable,
            },
            void_ty(),
        )
    }
}
