#[macro_use]
extern crate indoc;

use ssir::assembly::{parse_module, write_module_string};

/// Parse a snippet, write it, and check that another round of parsing and
/// writing reproduces the same text.
fn stable(input: &str) -> String {
    let first = write_module_string(&parse_module(input).expect("input must parse"));
    let second = write_module_string(&parse_module(&first).expect("output must parse"));
    assert_eq!(first, second);
    first
}

#[test]
fn functions_and_globals() {
    let asm = stable(indoc! {"
        global @counter i32
        declare @callee (i32, ptr) i32

        func @main (i32 %x, ptr %p) i32 {
        %entry:
            %a = add i32 %x, 1
            %b = call i32 @callee (%a, @counter)
            ret i32 %b
        }
    "});
    assert!(asm.contains("global @counter i32"));
    assert!(asm.contains("declare @callee (i32, ptr) i32"));
    assert!(asm.contains("call i32 @callee (%a, @counter)"));
}

#[test]
fn control_flow_and_phis() {
    let asm = stable(indoc! {"
        func @f (i1 %c, i32 %x) i32 {
        %entry:
            br %c, %then, %else
        %then:
            %a = add i32 %x, 1
            br %join
        %else:
            br %join
        %join:
            %p = phi i32 [%a, %then], [%x, %else]
            ret i32 %p
        }
    "});
    assert!(asm.contains("br %c, %then, %else"));
    assert!(asm.contains("phi i32 [%a, %then], [%x, %else]"));
}

#[test]
fn memory_and_casts() {
    let asm = stable(indoc! {"
        func @f (ptr %p, i64 %i) i32 {
        %entry:
            %slot = alloca i32
            %addr = gep i32, ptr %p, i64 %i
            %v = load volatile i32, ptr %addr
            store i32 %v, ptr %slot
            %w = zext i32 %v to i64
            %t = trunc i64 %w to i32
            ret i32 %t
        }
    "});
    assert!(asm.contains("load volatile i32, ptr %addr"));
    assert!(asm.contains("gep i32, ptr %p, i64 %i"));
    assert!(asm.contains("zext i32 %v to i64"));
}

#[test]
fn aggregates_and_vectors() {
    let asm = stable(indoc! {"
        func @f ({i32, f64} %s, <4 x i32> %v, i64 %i) i32 {
        %entry:
            %a = extractvalue {i32, f64} %s, 0
            %b = insertvalue {i32, f64} %s, i32 %a, 0
            %c = extractelement <4 x i32> %v, i64 %i
            %d = insertelement <4 x i32> %v, i32 %c, i64 %i
            %e = extractelement <4 x i32> %d, i64 %i
            %r = add i32 %a, %e
            ret i32 %r
        }
    "});
    assert!(asm.contains("extractvalue {i32, f64} %s, 0"));
    assert!(asm.contains("insertelement <4 x i32> %v, i32 %c, i64 %i"));
}

#[test]
fn invoke_and_unreachable() {
    let asm = stable(indoc! {"
        declare @may_throw () void

        func @f () void {
        %entry:
            invoke void @may_throw () to %ok unwind %bad
        %ok:
            ret
        %bad:
            unreachable
        }
    "});
    assert!(asm.contains("invoke void @may_throw () to %ok unwind %bad"));
    assert!(asm.contains("unreachable"));
}

#[test]
fn negative_constants_canonicalize() {
    let asm = stable(indoc! {"
        func @f (i8 %x) i8 {
        %entry:
            %a = and i8 %x, -1
            %b = add i8 %a, -2
            ret i8 %b
        }
    "});
    assert!(asm.contains("and i8 %x, 255"));
    assert!(asm.contains("add i8 %a, 254"));
}

#[test]
fn forward_references_resolve() {
    let asm = stable(indoc! {"
        func @f (i32 %n) i32 {
        %entry:
            br %head
        %head:
            %i = phi i32 [0, %entry], [%next, %head]
            %next = add i32 %i, 1
            %c = icmp ult i32 %next, %n
            br %c, %head, %exit
        %exit:
            ret i32 %i
        }
    "});
    assert!(asm.contains("phi i32 [0, %entry], [%next, %head]"));
}

#[test]
fn undefined_value_is_rejected() {
    let err = parse_module(indoc! {"
        func @f () i32 {
        %entry:
            ret i32 %nope
        }
    "});
    assert!(err.is_err());
}

#[test]
fn undefined_block_is_rejected() {
    let err = parse_module(indoc! {"
        func @f () void {
        %entry:
            br %nowhere
        }
    "});
    assert!(err.is_err());
}

#[test]
fn undeclared_callee_is_rejected() {
    let err = parse_module(indoc! {"
        func @f () void {
        %entry:
            call void @ghost ()
            ret
        }
    "});
    assert!(err.is_err());
}

#[test]
fn float_constants() {
    let asm = stable(indoc! {"
        func @f (f64 %x) f64 {
        %entry:
            %a = fadd f64 %x, 1.5
            %b = fmul f64 %a, -2.0
            ret f64 %b
        }
    "});
    assert!(asm.contains("fadd f64 %x, 1.5"));
    assert!(asm.contains("fmul f64 %a, -2.0"));
}
