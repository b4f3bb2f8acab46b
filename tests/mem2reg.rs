#[macro_use]
extern crate indoc;

use ssir::{
    assembly::{parse_module, write_module_string},
    ir::Module,
    pass::{Mem2Reg, Pass, PassContext},
    verifier::Verifier,
};

fn promote(input: &str) -> Module {
    let mut module = parse_module(input).expect("input must parse");
    Mem2Reg::run_on_module(&PassContext::default(), &mut module);
    let mut verifier = Verifier::new();
    verifier.verify_module(&module);
    if let Err(errs) = verifier.finish() {
        panic!("verification failed:\n{}", errs);
    }
    module
}

#[test]
fn straight_line_promotion() {
    let module = promote(indoc! {"
        func @f (i32 %x) i32 {
        %entry:
            %slot = alloca i32
            store i32 %x, ptr %slot
            %v = load i32, ptr %slot
            ret i32 %v
        }
    "});
    let asm = write_module_string(&module);
    assert!(asm.contains("ret i32 %x"));
    assert!(!asm.contains("alloca"));
    assert!(!asm.contains("store"));
    assert!(!asm.contains("load"));
}

#[test]
fn cross_block_promotion_inserts_phi() {
    let module = promote(indoc! {"
        func @f (i1 %c, i32 %x, i32 %y) i32 {
        %entry:
            %slot = alloca i32
            store i32 %x, ptr %slot
            br %c, %then, %join
        %then:
            store i32 %y, ptr %slot
            br %join
        %join:
            %v = load i32, ptr %slot
            ret i32 %v
        }
    "});
    let asm = write_module_string(&module);
    assert!(asm.contains("phi i32"));
    assert!(asm.contains("%x"));
    assert!(asm.contains("%y"));
    assert!(!asm.contains("alloca"));
    assert!(!asm.contains("store"));
    assert!(!asm.contains("load"));
}

#[test]
fn loop_carried_value() {
    let module = promote(indoc! {"
        func @f (i32 %n) i32 {
        %entry:
            %slot = alloca i32
            store i32 0, ptr %slot
            br %head
        %head:
            %i = load i32, ptr %slot
            %c = icmp ult i32 %i, %n
            br %c, %body, %exit
        %body:
            %next = add i32 %i, 1
            store i32 %next, ptr %slot
            br %head
        %exit:
            %r = load i32, ptr %slot
            ret i32 %r
        }
    "});
    let asm = write_module_string(&module);
    assert!(asm.contains("phi i32"));
    assert!(!asm.contains("alloca"));
    assert!(!asm.contains("store"));
    assert!(!asm.contains("load"));
}

#[test]
fn escaping_slot_is_kept() {
    let module = promote(indoc! {"
        declare @use (ptr) void

        func @f () void {
        %entry:
            %slot = alloca i32
            call void @use (%slot)
            ret
        }
    "});
    let asm = write_module_string(&module);
    assert!(asm.contains("alloca i32"));
    assert!(asm.contains("call void @use"));
}

#[test]
fn mismatched_access_type_is_kept() {
    let module = promote(indoc! {"
        func @f (i32 %x) i64 {
        %entry:
            %slot = alloca i32
            store i32 %x, ptr %slot
            %v = load i64, ptr %slot
            ret i64 %v
        }
    "});
    let asm = write_module_string(&module);
    assert!(asm.contains("alloca i32"));
    assert!(asm.contains("load i64"));
}

#[test]
fn volatile_slot_is_kept() {
    let module = promote(indoc! {"
        func @f (i32 %x) i32 {
        %entry:
            %slot = alloca i32
            store volatile i32 %x, ptr %slot
            %v = load volatile i32, ptr %slot
            ret i32 %v
        }
    "});
    let asm = write_module_string(&module);
    assert!(asm.contains("alloca i32"));
    assert!(asm.contains("volatile"));
}

#[test]
fn uninitialized_read_becomes_zero() {
    let module = promote(indoc! {"
        func @f () i32 {
        %entry:
            %slot = alloca i32
            %v = load i32, ptr %slot
            ret i32 %v
        }
    "});
    let asm = write_module_string(&module);
    assert!(asm.contains("ret i32 0"));
    assert!(!asm.contains("alloca"));
}
