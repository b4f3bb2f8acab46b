// Copyright (c) 2017-2020 Fabian Schuiki

//! Representation of the data flow in a `Function`.
//!
//! Each function has an associated `DataFlowGraph` which contains all the
//! values, instructions, arguments, constants, and the links between them.

use crate::{
    impl_table_indexing,
    ir::{
        wrap_to_width, Arg, ConstData, ExtFunc, ExtFuncData, Inst, InstData, Signature, Value,
        ValueData,
    },
    table::{PrimaryTable, SecondaryTable},
    ty::{pointer_ty, void_ty, Type},
};
use num::BigInt;
use std::collections::{BTreeSet, HashMap};

/// A data flow graph.
///
/// This is the main container for instructions, values, and the relationship
/// between them. Use-lists are kept explicitly and are maintained through
/// `add_inst`, `remove_inst`, `set_operand`, and `replace_use`; for every
/// operand reference there is a reciprocal `(user, operand index)` entry in
/// the used value's use-list.
#[derive(Default)]
pub struct DataFlowGraph {
    /// The instructions in the graph.
    pub(crate) insts: PrimaryTable<Inst, InstData>,
    /// The result values produced by instructions.
    pub(crate) results: SecondaryTable<Inst, Value>,
    /// The values in the graph.
    pub(crate) values: PrimaryTable<Value, ValueData>,
    /// The argument values.
    pub(crate) args: SecondaryTable<Arg, Value>,
    /// The external functions referenced in the graph.
    pub(crate) ext_funcs: PrimaryTable<ExtFunc, ExtFuncData>,
    /// The names assigned to values.
    names: HashMap<Value, String>,
    /// The use-list of each value.
    uses: HashMap<Value, BTreeSet<(Inst, usize)>>,
    /// Interned constants.
    interned_consts: HashMap<(Type, ConstData), Value>,
    /// Interned global references.
    interned_globals: HashMap<String, Value>,
    /// Interned external functions.
    interned_exts: HashMap<String, ExtFunc>,
}

impl_table_indexing!(DataFlowGraph, insts, Inst, InstData);
impl_table_indexing!(DataFlowGraph, values, Value, ValueData);
impl_table_indexing!(DataFlowGraph, ext_funcs, ExtFunc, ExtFuncData);

impl DataFlowGraph {
    /// Create a new data flow graph.
    pub fn new() -> Self {
        Default::default()
    }

    /// Add an instruction.
    pub fn add_inst(&mut self, data: InstData, ty: Type) -> Inst {
        let inst = self.insts.add(data);
        if !ty.is_void() {
            let result = self.values.add(ValueData::Inst { ty, inst });
            self.results.add(inst, result);
        }
        self.register_uses(inst);
        inst
    }

    /// Remove an instruction.
    ///
    /// The instruction's result must be unused; the caller reroutes uses
    /// before erasure.
    pub fn remove_inst(&mut self, inst: Inst) {
        if self.has_result(inst) {
            let value = self.inst_result(inst);
            assert!(!self.has_uses(value), "erased {} still has uses", inst);
            self.names.remove(&value);
            self.uses.remove(&value);
            self.values.remove(value);
        }
        self.unregister_uses(inst);
        self.insts.remove(inst);
        self.results.remove(inst);
    }

    /// Returns whether an instruction produces a result.
    pub fn has_result(&self, inst: Inst) -> bool {
        self.results.contains(inst)
    }

    /// Returns the result of an instruction.
    pub fn inst_result(&self, inst: Inst) -> Value {
        self.results[inst]
    }

    /// Returns the value of an argument.
    pub fn arg_value(&self, arg: Arg) -> Value {
        self.args[arg]
    }

    /// Create values for the arguments in a signature.
    pub(crate) fn make_args_for_signature(&mut self, sig: &Signature) {
        for arg in sig.args() {
            let value = self.values.add(ValueData::Arg {
                ty: sig.arg_type(arg),
                arg,
            });
            self.args.add(arg, value);
        }
    }

    /// Returns the type of a value.
    pub fn value_type(&self, value: Value) -> Type {
        match &self[value] {
            ValueData::Inst { ty, .. } => ty.clone(),
            ValueData::Arg { ty, .. } => ty.clone(),
            ValueData::Const { ty, .. } => ty.clone(),
            ValueData::Global { ty, .. } => ty.clone(),
            ValueData::Placeholder { ty, .. } => ty.clone(),
        }
    }

    /// Returns the type of an instruction.
    pub fn inst_type(&self, inst: Inst) -> Type {
        if self.has_result(inst) {
            self.value_type(self.inst_result(inst))
        } else {
            void_ty()
        }
    }

    /// Return the instruction that produces `value`.
    pub fn get_value_inst(&self, value: Value) -> Option<Inst> {
        match self[value] {
            ValueData::Inst { inst, .. } => Some(inst),
            _ => None,
        }
    }

    /// Return the instruction that produces `value`, or panic.
    pub fn value_inst(&self, value: Value) -> Inst {
        match self.get_value_inst(value) {
            Some(inst) => inst,
            None => panic!("value {} not the result of an instruction", value),
        }
    }

    /// Add a placeholder value.
    ///
    /// This function is intended to be used when patching forward references
    /// during IR construction.
    pub fn add_placeholder(&mut self, ty: Type) -> Value {
        self.values.add(ValueData::Placeholder { ty })
    }

    /// Remove a placeholder value.
    pub fn remove_placeholder(&mut self, value: Value) {
        assert!(!self.has_uses(value));
        assert!(self[value].is_placeholder());
        self.uses.remove(&value);
        self.values.remove(value);
    }

    /// Check if a value is a placeholder.
    pub fn is_placeholder(&self, value: Value) -> bool {
        self[value].is_placeholder()
    }

    /// Get the interned constant for the given data, creating it if needed.
    pub fn make_const(&mut self, ty: Type, konst: ConstData) -> Value {
        let values = &mut self.values;
        *self
            .interned_consts
            .entry((ty.clone(), konst.clone()))
            .or_insert_with(|| values.add(ValueData::Const { ty, konst }))
    }

    /// Get an integer constant of the given type.
    ///
    /// The value is wrapped into the canonical unsigned range of the type.
    pub fn const_int(&mut self, ty: Type, value: BigInt) -> Value {
        let width = ty.unwrap_int();
        let konst = ConstData::Int(wrap_to_width(value, width));
        self.make_const(ty, konst)
    }

    /// Get a float constant of the given type.
    ///
    /// `f32` constants are rounded through `f32` so that equal constants
    /// intern to the same value.
    pub fn const_float(&mut self, ty: Type, value: f64) -> Value {
        let value = match ty.unwrap_float() {
            32 => value as f32 as f64,
            _ => value,
        };
        self.make_const(ty, ConstData::Float(value.to_bits()))
    }

    /// Get the null pointer constant.
    pub fn const_null(&mut self) -> Value {
        self.make_const(pointer_ty(), ConstData::Null)
    }

    /// Resolve a value to its constant data, if it is a constant.
    pub fn get_const(&self, value: Value) -> Option<&ConstData> {
        match &self[value] {
            ValueData::Const { konst, .. } => Some(konst),
            _ => None,
        }
    }

    /// Resolve a value to a constant integer, if it is one.
    pub fn get_const_int(&self, value: Value) -> Option<&BigInt> {
        self.get_const(value).and_then(ConstData::get_int)
    }

    /// Get the interned value referencing a module-level global.
    pub fn global(&mut self, name: impl Into<String>) -> Value {
        let name = name.into();
        let values = &mut self.values;
        *self.interned_globals.entry(name.clone()).or_insert_with(|| {
            values.add(ValueData::Global {
                ty: pointer_ty(),
                name,
            })
        })
    }

    /// Get the interned external function of the given name.
    pub fn ext_func(&mut self, name: impl Into<String>, sig: Signature) -> ExtFunc {
        let name = name.into();
        let ext_funcs = &mut self.ext_funcs;
        *self
            .interned_exts
            .entry(name.clone())
            .or_insert_with(|| ext_funcs.add(ExtFuncData { name, sig }))
    }

    /// Return the name of a value.
    pub fn get_name(&self, value: Value) -> Option<&str> {
        self.names.get(&value).map(AsRef::as_ref)
    }

    /// Set the name of a value.
    pub fn set_name(&mut self, value: Value, name: String) {
        self.names.insert(value, name);
    }

    /// Iterate over all uses of a value.
    pub fn uses(&self, value: Value) -> impl Iterator<Item = (Inst, usize)> {
        let uses: Vec<_> = self
            .uses
            .get(&value)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default();
        uses.into_iter()
    }

    /// Check if a value is used.
    pub fn has_uses(&self, value: Value) -> bool {
        self.uses.get(&value).map(|s| !s.is_empty()).unwrap_or(false)
    }

    /// Check whether the use-list of `value` contains the given use.
    pub fn has_use(&self, value: Value, inst: Inst, idx: usize) -> bool {
        self.uses
            .get(&value)
            .map(|s| s.contains(&(inst, idx)))
            .unwrap_or(false)
    }

    /// Set operand `idx` of an instruction to a given value.
    pub fn set_operand(&mut self, inst: Inst, idx: usize, value: Value) {
        let old = self[inst].args()[idx];
        if old == value {
            return;
        }
        if let Some(set) = self.uses.get_mut(&old) {
            set.remove(&(inst, idx));
        }
        self[inst].args_mut()[idx] = value;
        self.uses.entry(value).or_default().insert((inst, idx));
    }

    /// Replace all uses of a value with another.
    ///
    /// Returns how many uses were replaced.
    pub fn replace_use(&mut self, from: Value, to: Value) -> usize {
        if from == to {
            return 0;
        }
        let uses = self.uses.remove(&from).unwrap_or_default();
        let count = uses.len();
        for &(inst, idx) in &uses {
            self[inst].args_mut()[idx] = to;
        }
        self.uses.entry(to).or_default().extend(uses);
        count
    }

    /// Iterate over all values in the graph.
    pub fn values<'a>(&'a self) -> impl Iterator<Item = Value> + 'a {
        self.values.keys()
    }

    fn register_uses(&mut self, inst: Inst) {
        let args: Vec<_> = self[inst].args().to_vec();
        for (idx, arg) in args.into_iter().enumerate() {
            self.uses.entry(arg).or_default().insert((inst, idx));
        }
    }

    fn unregister_uses(&mut self, inst: Inst) {
        let args: Vec<_> = self[inst].args().to_vec();
        for (idx, arg) in args.into_iter().enumerate() {
            if let Some(set) = self.uses.get_mut(&arg) {
                set.remove(&(inst, idx));
            }
        }
    }
}
