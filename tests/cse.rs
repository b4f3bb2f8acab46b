#[macro_use]
extern crate indoc;

use ssir::{
    assembly::{parse_module, write_module_string},
    ir::Module,
    pass::{CommonSubexprElim, Pass, PassContext},
    stats::Statistics,
    verifier::Verifier,
};

fn optimize(input: &str) -> (Module, Statistics) {
    let mut module = parse_module(input).expect("input must parse");
    let stats = CommonSubexprElim::run_on_module(&PassContext::default(), &mut module);
    verify(&module);
    (module, stats)
}

fn verify(module: &Module) {
    let mut verifier = Verifier::new();
    verifier.verify_module(module);
    if let Err(errs) = verifier.finish() {
        panic!("verification failed:\n{}", errs);
    }
}

#[test]
fn dead_arithmetic() {
    let (module, stats) = optimize(indoc! {"
        func @f (i32 %x, i32 %y) i32 {
        %entry:
            %a = add i32 %x, %y
            %b = add i32 %x, %y
            ret i32 %b
        }
    "});
    assert_eq!(stats.dead, 1);
    assert_eq!(stats.cse, 0);
    let asm = write_module_string(&module);
    assert!(asm.contains("%b = add i32 %x, %y"));
    assert!(!asm.contains("%a ="));
    assert!(asm.contains("ret i32 %b"));
}

#[test]
fn dead_before_simplify() {
    // An unused `add %x, 0` is counted as dead, not as simplified.
    let (_, stats) = optimize(indoc! {"
        func @f (i32 %x) i32 {
        %entry:
            %a = add i32 %x, 0
            ret i32 %x
        }
    "});
    assert_eq!(stats.dead, 1);
    assert_eq!(stats.simplified, 0);
}

#[test]
fn algebraic_identity() {
    let (module, stats) = optimize(indoc! {"
        func @f (i32 %x) i32 {
        %entry:
            %a = add i32 %x, 0
            ret i32 %a
        }
    "});
    assert_eq!(stats.simplified, 1);
    let asm = write_module_string(&module);
    assert!(asm.contains("ret i32 %x"));
    assert!(!asm.contains("add"));
}

#[test]
fn constant_folding() {
    let (module, stats) = optimize(indoc! {"
        func @f () i32 {
        %entry:
            %a = add i32 40, 2
            ret i32 %a
        }
    "});
    assert_eq!(stats.simplified, 1);
    assert!(write_module_string(&module).contains("ret i32 42"));
}

#[test]
fn compare_value_to_itself() {
    let (module, stats) = optimize(indoc! {"
        func @f (i32 %x) i1 {
        %entry:
            %c = icmp ule i32 %x, %x
            ret i1 %c
        }
    "});
    assert_eq!(stats.simplified, 1);
    assert!(write_module_string(&module).contains("ret i1 1"));
}

#[test]
fn select_constant_condition() {
    let (module, stats) = optimize(indoc! {"
        func @f (i32 %x, i32 %y) i32 {
        %entry:
            %r = select i1 1, i32 %x, i32 %y
            ret i32 %r
        }
    "});
    assert_eq!(stats.simplified, 1);
    assert!(write_module_string(&module).contains("ret i32 %x"));
}

#[test]
fn phi_with_equal_operands() {
    let (module, stats) = optimize(indoc! {"
        func @f (i1 %c, i32 %x) i32 {
        %entry:
            br %c, %a, %b
        %a:
            br %join
        %b:
            br %join
        %join:
            %p = phi i32 [%x, %a], [%x, %b]
            ret i32 %p
        }
    "});
    assert_eq!(stats.simplified, 1);
    assert!(write_module_string(&module).contains("ret i32 %x"));
}

#[test]
fn local_cse() {
    let (module, stats) = optimize(indoc! {"
        func @f (i32 %x, i32 %y) i32 {
        %entry:
            %a = mul i32 %x, %y
            %b = mul i32 %x, %y
            %c = add i32 %a, %b
            ret i32 %c
        }
    "});
    assert_eq!(stats.cse, 1);
    let asm = write_module_string(&module);
    assert!(asm.contains("%c = add i32 %a, %a"));
    assert!(!asm.contains("%b ="));
}

#[test]
fn dominator_cse() {
    let (module, stats) = optimize(indoc! {"
        func @f (i32 %p) i32 {
        %entry:
            %a = and i32 %p, 15
            br %next
        %next:
            %b = and i32 %p, 15
            %c = add i32 %a, %b
            ret i32 %c
        }
    "});
    assert_eq!(stats.cse, 1);
    let asm = write_module_string(&module);
    assert!(asm.contains("%c = add i32 %a, %a"));
}

#[test]
fn no_cse_across_unrelated_blocks() {
    // The two arms of the branch do not dominate each other; the recomputed
    // expression stays.
    let (module, stats) = optimize(indoc! {"
        func @f (i1 %c, i32 %x) i32 {
        %entry:
            br %c, %a, %b
        %a:
            %u = and i32 %x, 15
            ret i32 %u
        %b:
            %v = and i32 %x, 15
            ret i32 %v
        }
    "});
    assert_eq!(stats.cse, 0);
    let asm = write_module_string(&module);
    assert!(asm.contains("%u ="));
    assert!(asm.contains("%v ="));
}

#[test]
fn commutativity_not_exploited() {
    let (module, stats) = optimize(indoc! {"
        func @f (i32 %x, i32 %y) i32 {
        %entry:
            %a = add i32 %x, %y
            %b = add i32 %y, %x
            %c = add i32 %a, %b
            ret i32 %c
        }
    "});
    assert_eq!(stats.cse, 0);
    let asm = write_module_string(&module);
    assert!(asm.contains("%a ="));
    assert!(asm.contains("%b ="));
}

#[test]
fn differing_predicates_not_equivalent() {
    let (_, stats) = optimize(indoc! {"
        func @f (i32 %x, i32 %y) i1 {
        %entry:
            %a = icmp eq i32 %x, %y
            %b = icmp ne i32 %x, %y
            %c = and i1 %a, %b
            ret i1 %c
        }
    "});
    assert_eq!(stats.cse, 0);
}

#[test]
fn equal_compares_are_equivalent() {
    let (_, stats) = optimize(indoc! {"
        func @f (i32 %x, i32 %y) i1 {
        %entry:
            %a = icmp eq i32 %x, %y
            %b = icmp eq i32 %x, %y
            %c = and i1 %a, %b
            ret i1 %c
        }
    "});
    assert_eq!(stats.cse, 1);
}

#[test]
fn fcmp_not_cse_candidate() {
    let (_, stats) = optimize(indoc! {"
        func @f (f64 %x, f64 %y) i1 {
        %entry:
            %a = fcmp oeq f64 %x, %y
            %b = fcmp oeq f64 %x, %y
            %c = and i1 %a, %b
            ret i1 %c
        }
    "});
    assert_eq!(stats.cse, 0);
}

#[test]
fn cse_chain_converges_in_one_pass() {
    let input = indoc! {"
        func @f (i32 %x, i32 %y) i32 {
        %entry:
            %a = add i32 %x, %y
            %b = add i32 %x, %y
            %c = mul i32 %a, %a
            %d = mul i32 %b, %b
            %e = add i32 %c, %d
            ret i32 %e
        }
    "};
    let mut module = parse_module(input).unwrap();
    let ctx = PassContext::default();
    let first = CommonSubexprElim::run_on_module(&ctx, &mut module);
    verify(&module);
    assert_eq!(first.cse, 2);

    // Idempotence: the second run performs zero rewrites.
    let before = write_module_string(&module);
    let second = CommonSubexprElim::run_on_module(&ctx, &mut module);
    verify(&module);
    assert!(!second.modified());
    assert_eq!(write_module_string(&module), before);
}

#[test]
fn summarize_counts_final_module() {
    let (module, mut stats) = optimize(indoc! {"
        func @f (i32 %x, ptr %p) i32 {
        %entry:
            %a = add i32 %x, %x
            store i32 %a, ptr %p
            %b = load i32, ptr %p
            ret i32 %b
        }
    "});
    stats.summarize(&module);
    assert_eq!(stats.functions, 1);
    // The load is forwarded from the store, leaving three instructions.
    assert_eq!(stats.store_to_load, 1);
    assert_eq!(stats.instructions, 3);
    assert_eq!(stats.loads, 0);
    assert_eq!(stats.stores, 1);
}

#[test]
fn declarations_are_skipped() {
    let mut module = parse_module("declare @g (i32) i32").unwrap();
    let mut stats = CommonSubexprElim::run_on_module(&PassContext::default(), &mut module);
    assert!(!stats.modified());
    stats.summarize(&module);
    assert_eq!(stats.functions, 0);
    assert_eq!(stats.instructions, 0);
}
