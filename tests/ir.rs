use ssir::{
    ir::{Function, FunctionBuilder, IntCond, MemFlags, Module, Signature},
    ty::{int_ty, pointer_ty, void_ty},
};

/// Create a function populated by a callback. Useful to act as a simple
/// container to collect instructions.
fn within_func(
    sig: Signature,
    f: impl FnOnce(&mut FunctionBuilder),
) -> Function {
    let mut func = Function::new("test", sig);
    let mut builder = FunctionBuilder::new(&mut func);
    let bb = builder.named_block("entry");
    builder.append_to(bb);
    f(&mut builder);
    func
}

#[test]
fn build_arithmetic() {
    let mut sig = Signature::new();
    sig.add_input(int_ty(32));
    sig.set_return_type(int_ty(32));
    let func = within_func(sig, |builder| {
        let x = builder.func.dfg.arg_value(builder.func.sig.args().next().unwrap());
        let a = builder.ins().binary(ssir::ir::Opcode::Add, int_ty(32), x, x);
        builder.ins().ret_value(a);
    });
    assert_eq!(func.layout.blocks().count(), 1);
    let bb = func.layout.entry();
    assert_eq!(func.layout.insts(bb).count(), 2);
}

#[test]
fn use_lists_track_operands() {
    let mut sig = Signature::new();
    sig.add_input(int_ty(32));
    sig.set_return_type(int_ty(32));
    let mut func = Function::new("test", sig);
    let x = func.dfg.arg_value(func.sig.args().next().unwrap());
    let mut builder = FunctionBuilder::new(&mut func);
    let bb = builder.named_block("entry");
    builder.append_to(bb);
    let a = builder.ins().binary(ssir::ir::Opcode::Add, int_ty(32), x, x);
    builder.ins().ret_value(a);

    // %x is used twice by the add, %a once by the return.
    let add = func.dfg.value_inst(a);
    assert_eq!(func.dfg.uses(x).count(), 2);
    assert_eq!(func.dfg.uses(a).count(), 1);
    assert!(func.dfg.has_use(x, add, 0));
    assert!(func.dfg.has_use(x, add, 1));
}

#[test]
fn replace_use_reroutes_all_uses() {
    let mut sig = Signature::new();
    sig.add_input(int_ty(32));
    sig.add_input(int_ty(32));
    sig.set_return_type(int_ty(32));
    let mut func = Function::new("test", sig);
    let mut args = func.sig.args();
    let x = func.dfg.arg_value(args.next().unwrap());
    let y = func.dfg.arg_value(args.next().unwrap());
    drop(args);
    let mut builder = FunctionBuilder::new(&mut func);
    let bb = builder.named_block("entry");
    builder.append_to(bb);
    let a = builder.ins().binary(ssir::ir::Opcode::Mul, int_ty(32), x, y);
    builder.ins().ret_value(a);

    assert_eq!(func.dfg.replace_use(y, x), 1);
    assert!(!func.dfg.has_uses(y));
    let mul = func.dfg.value_inst(a);
    assert!(func.dfg.has_use(x, mul, 0));
    assert!(func.dfg.has_use(x, mul, 1));
}

#[test]
fn erase_unlinks_instruction() {
    let mut sig = Signature::new();
    sig.add_input(pointer_ty());
    sig.set_return_type(void_ty());
    let mut func = Function::new("test", sig);
    let p = func.dfg.arg_value(func.sig.args().next().unwrap());
    let mut builder = FunctionBuilder::new(&mut func);
    let bb = builder.named_block("entry");
    builder.append_to(bb);
    let v = builder.ins().load(int_ty(32), MemFlags::empty(), p);
    builder.ins().ret();

    let load = func.dfg.value_inst(v);
    func.erase_inst(load);
    assert_eq!(func.layout.insts(bb).count(), 1);
    assert!(!func.dfg.has_uses(p));
}

#[test]
fn icmp_yields_bool() {
    let mut sig = Signature::new();
    sig.add_input(int_ty(32));
    sig.set_return_type(int_ty(1));
    let func = within_func(sig, |builder| {
        let x = builder.func.dfg.arg_value(builder.func.sig.args().next().unwrap());
        let c = builder.ins().icmp(IntCond::Ult, x, x);
        builder.ins().ret_value(c);
    });
    let bb = func.layout.entry();
    let cmp = func.layout.first_inst(bb).unwrap();
    assert_eq!(func.dfg.inst_type(cmp), int_ty(1));
}

#[test]
fn module_displays_as_assembly() {
    let mut sig = Signature::new();
    sig.set_return_type(void_ty());
    let func = within_func(sig, |builder| {
        builder.ins().ret();
    });
    let mut module = Module::new();
    module.add_function(func);
    let asm = format!("{}", module);
    assert!(asm.contains("func @test () void {"));
    assert!(asm.contains("ret"));
}
