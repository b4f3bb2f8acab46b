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
    let mut verifier = Verifier::new();
    verifier.verify_module(&module);
    if let Err(errs) = verifier.finish() {
        panic!("verification failed:\n{}", errs);
    }
    (module, stats)
}

#[test]
fn redundant_load() {
    let (module, stats) = optimize(indoc! {"
        func @f (ptr %p) i32 {
        %entry:
            %1 = load i32, ptr %p
            %2 = load i32, ptr %p
            %s = add i32 %1, %2
            ret i32 %s
        }
    "});
    assert_eq!(stats.redundant_loads, 1);
    let asm = write_module_string(&module);
    assert!(asm.contains("%s = add i32 %1, %1"));
    assert_eq!(asm.matches("load").count(), 1);
}

#[test]
fn store_forwarding() {
    let (module, stats) = optimize(indoc! {"
        func @f (i32 %v, ptr %p) i32 {
        %entry:
            store i32 %v, ptr %p
            %1 = load i32, ptr %p
            ret i32 %1
        }
    "});
    assert_eq!(stats.store_to_load, 1);
    let asm = write_module_string(&module);
    assert!(asm.contains("store i32 %v, ptr %p"));
    assert!(asm.contains("ret i32 %v"));
    assert!(!asm.contains("load"));
}

#[test]
fn dead_store_elimination() {
    let (module, stats) = optimize(indoc! {"
        func @f (i32 %v1, i32 %v2, ptr %p) void {
        %entry:
            store i32 %v1, ptr %p
            store i32 %v2, ptr %p
            ret
        }
    "});
    assert_eq!(stats.redundant_stores, 1);
    let asm = write_module_string(&module);
    assert!(!asm.contains("store i32 %v1"));
    assert!(asm.contains("store i32 %v2, ptr %p"));
}

#[test]
fn volatile_blocks_everything() {
    let (module, stats) = optimize(indoc! {"
        func @f (ptr %p) void {
        %entry:
            %1 = load volatile i32, ptr %p
            %2 = load volatile i32, ptr %p
            ret
        }
    "});
    assert!(!stats.modified());
    let asm = write_module_string(&module);
    assert_eq!(asm.matches("load volatile i32, ptr %p").count(), 2);
}

#[test]
fn volatile_load_of_other_address_no_forward_barrier() {
    // The forward scan stops at stores, calls, and invokes; a volatile load
    // of an unrelated address is none of these.
    let (module, stats) = optimize(indoc! {"
        func @f (ptr %p, ptr %q) i32 {
        %entry:
            %1 = load i32, ptr %p
            %v = load volatile i32, ptr %q
            %2 = load i32, ptr %p
            %s = add i32 %1, %2
            ret i32 %s
        }
    "});
    assert_eq!(stats.redundant_loads, 1);
    let asm = write_module_string(&module);
    assert!(asm.contains("%s = add i32 %1, %1"));
    assert!(asm.contains("load volatile i32, ptr %q"));
    assert_eq!(asm.matches("load").count(), 2);
}

#[test]
fn volatile_load_of_other_address_keeps_backward_candidate() {
    // Only stores to a different address and calls/invokes invalidate the
    // backward scan's candidate; the volatile load of %q does not.
    let (module, stats) = optimize(indoc! {"
        func @f (i32 %v, ptr %p, ptr %q) i32 {
        %entry:
            store i32 %v, ptr %p
            %u = load volatile i32, ptr %q
            %1 = load i32, ptr %p
            ret i32 %1
        }
    "});
    assert_eq!(stats.store_to_load, 1);
    let asm = write_module_string(&module);
    assert!(asm.contains("ret i32 %v"));
    assert!(asm.contains("load volatile i32, ptr %q"));
}

#[test]
fn volatile_load_of_same_address_blocks_both_scans() {
    let (module, stats) = optimize(indoc! {"
        func @f (ptr %p) i32 {
        %entry:
            %1 = load i32, ptr %p
            %v = load volatile i32, ptr %p
            %2 = load i32, ptr %p
            %s = add i32 %1, %2
            ret i32 %s
        }
    "});
    assert!(!stats.modified());
    assert_eq!(write_module_string(&module).matches("load").count(), 3);
}

#[test]
fn call_is_a_barrier() {
    let (module, stats) = optimize(indoc! {"
        declare @opaque () void

        func @f (ptr %p) i32 {
        %entry:
            %1 = load i32, ptr %p
            call void @opaque ()
            %2 = load i32, ptr %p
            %s = add i32 %1, %2
            ret i32 %s
        }
    "});
    assert_eq!(stats.redundant_loads, 0);
    let asm = write_module_string(&module);
    assert_eq!(asm.matches("load").count(), 2);
}

#[test]
fn store_to_other_address_is_a_barrier() {
    let (_, stats) = optimize(indoc! {"
        func @f (i32 %v, ptr %p, ptr %q) i32 {
        %entry:
            %1 = load i32, ptr %p
            store i32 %v, ptr %q
            %2 = load i32, ptr %p
            %s = add i32 %1, %2
            ret i32 %s
        }
    "});
    assert_eq!(stats.redundant_loads, 0);
    assert_eq!(stats.store_to_load, 0);
}

#[test]
fn store_forwarding_skips_mismatched_type() {
    // The loaded type differs from the stored one; nothing is forwarded.
    let (_, stats) = optimize(indoc! {"
        func @f (i32 %v, ptr %p) i64 {
        %entry:
            store i32 %v, ptr %p
            %1 = load i64, ptr %p
            ret i64 %1
        }
    "});
    assert_eq!(stats.store_to_load, 0);
}

#[test]
fn dead_store_requires_matching_type() {
    let (module, stats) = optimize(indoc! {"
        func @f (i32 %v1, i64 %v2, ptr %p) void {
        %entry:
            store i32 %v1, ptr %p
            store i64 %v2, ptr %p
            ret
        }
    "});
    assert_eq!(stats.redundant_stores, 0);
    let asm = write_module_string(&module);
    assert_eq!(asm.matches("store").count(), 2);
}

#[test]
fn volatile_store_not_erased() {
    let (module, stats) = optimize(indoc! {"
        func @f (i32 %v1, i32 %v2, ptr %p) void {
        %entry:
            store volatile i32 %v1, ptr %p
            store i32 %v2, ptr %p
            ret
        }
    "});
    assert_eq!(stats.redundant_stores, 0);
    assert_eq!(write_module_string(&module).matches("store").count(), 2);
}

#[test]
fn forwarding_continues_across_multiple_loads() {
    let (module, stats) = optimize(indoc! {"
        func @f (i32 %v, ptr %p) i32 {
        %entry:
            store i32 %v, ptr %p
            %1 = load i32, ptr %p
            %2 = load i32, ptr %p
            %s = add i32 %1, %2
            ret i32 %s
        }
    "});
    assert_eq!(stats.store_to_load, 2);
    let asm = write_module_string(&module);
    assert!(asm.contains("%s = add i32 %v, %v"));
    assert!(!asm.contains("load"));
}

#[test]
fn backward_scan_forwards_store_past_unrelated_load() {
    // The store's own forward scan stops at the unrelated load of %q, but
    // the backward scan of %1 still sees the stored value.
    let (module, stats) = optimize(indoc! {"
        func @f (i32 %v, ptr %p, ptr %q) i32 {
        %entry:
            store i32 %v, ptr %p
            %u = load i64, ptr %q
            %1 = load i32, ptr %p
            %t = trunc i64 %u to i32
            %s = add i32 %1, %t
            ret i32 %s
        }
    "});
    assert_eq!(stats.store_to_load, 1);
    assert_eq!(stats.redundant_loads, 0);
    let asm = write_module_string(&module);
    assert!(asm.contains("%s = add i32 %v, %t"));
    assert_eq!(asm.matches("load").count(), 1);
}

#[test]
fn forward_scan_passes_unrelated_arithmetic() {
    let (module, stats) = optimize(indoc! {"
        func @f (ptr %p, i32 %x) i32 {
        %entry:
            %1 = load i32, ptr %p
            %a = add i32 %x, %x
            %2 = load i32, ptr %p
            %s = add i32 %1, %2
            %t = add i32 %s, %a
            ret i32 %t
        }
    "});
    assert_eq!(stats.redundant_loads, 1);
    let asm = write_module_string(&module);
    assert_eq!(asm.matches("load").count(), 1);
    assert!(asm.contains("%s = add i32 %1, %1"));
}
