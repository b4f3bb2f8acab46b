// Copyright (c) 2017-2020 Fabian Schuiki

//! Emitting of assembly code.

use crate::{
    ir::{Function, InstData, Module, Opcode, Value, ValueData},
    ty::Type,
};
use itertools::Itertools;
use std::{
    collections::{HashMap, HashSet},
    io::{Result, Write},
    rc::Rc,
};

/// Emit a module as human-readable assembly code that can be parsed again
/// later.
pub fn write_module<W: Write>(mut sink: W, module: &Module) -> Result<()> {
    let mut separate = false;
    for global in &module.globals {
        writeln!(sink, "global @{} {}", global.name, global.ty)?;
        separate = true;
    }
    for (name, sig) in &module.declares {
        writeln!(sink, "declare @{} {}", name, sig)?;
        separate = true;
    }
    for func in module.functions() {
        if separate {
            writeln!(sink)?;
        }
        write_function(&mut sink, func)?;
        separate = true;
    }
    Ok(())
}

/// Emit a module as a string of assembly code.
pub fn write_module_string(module: &Module) -> String {
    let mut asm = vec![];
    write_module(&mut asm, module).expect("writing to a vector cannot fail");
    String::from_utf8(asm).expect("assembly is valid utf-8")
}

/// A name uniquification table.
///
/// Keeps the names assigned in the input, extending clashes and anonymous
/// values with a monotonically increasing counter.
#[derive(Default)]
struct Names {
    assigned: HashMap<Value, Rc<String>>,
    taken: HashSet<Rc<String>>,
    counter: usize,
}

impl Names {
    fn assign(&mut self, value: Value, name: Option<&str>) -> Rc<String> {
        if let Some(name) = self.assigned.get(&value) {
            return name.clone();
        }
        let mut unique = match name {
            Some(name) => Rc::new(name.to_string()),
            None => self.next_anonymous(),
        };
        while self.taken.contains(&unique) {
            unique = self.next_anonymous();
        }
        self.taken.insert(unique.clone());
        self.assigned.insert(value, unique.clone());
        unique
    }

    fn next_anonymous(&mut self) -> Rc<String> {
        let name = Rc::new(format!("{}", self.counter));
        self.counter += 1;
        name
    }

    fn get(&self, value: Value) -> Rc<String> {
        self.assigned
            .get(&value)
            .cloned()
            .expect("value has no name assigned")
    }
}

fn write_function<W: Write>(sink: &mut W, func: &Function) -> Result<()> {
    let mut names = Names::default();
    let mut block_names = HashMap::new();

    // Assign names to arguments, results, and blocks up front; uses may
    // precede definitions in the presence of loops.
    for value in func.arg_values() {
        names.assign(value, func.dfg.get_name(value));
    }
    for bb in func.layout.blocks() {
        for inst in func.layout.insts(bb) {
            if func.dfg.has_result(inst) {
                let value = func.dfg.inst_result(inst);
                names.assign(value, func.dfg.get_name(value));
            }
        }
    }
    for (i, bb) in func.layout.blocks().enumerate() {
        let name = match func.layout.block_name(bb) {
            Some(name) => name.to_string(),
            None => format!("bb{}", i),
        };
        block_names.insert(bb, name);
    }

    if func.is_declaration() {
        return writeln!(sink, "declare @{} {}", func.name, func.sig);
    }

    let args = func
        .arg_values()
        .map(|v| format!("{} %{}", func.dfg.value_type(v), names.get(v)))
        .format(", ");
    writeln!(
        sink,
        "func @{} ({}) {} {{",
        func.name,
        args,
        func.sig.return_type()
    )?;
    for bb in func.layout.blocks() {
        writeln!(sink, "%{}:", block_names[&bb])?;
        for inst in func.layout.insts(bb) {
            write!(sink, "    ")?;
            write_inst(sink, func, inst, &names, &block_names)?;
            writeln!(sink)?;
        }
    }
    writeln!(sink, "}}")
}

fn write_inst<W: Write>(
    sink: &mut W,
    func: &Function,
    inst: crate::ir::Inst,
    names: &Names,
    block_names: &HashMap<crate::ir::Block, String>,
) -> Result<()> {
    let dfg = &func.dfg;
    let data = &dfg[inst];
    let value = |v: Value| -> String {
        match &dfg[v] {
            ValueData::Const { konst, .. } => format!("{}", konst),
            ValueData::Global { name, .. } => format!("@{}", name),
            _ => format!("%{}", names.get(v)),
        }
    };
    let block = |bb: crate::ir::Block| format!("%{}", block_names[&bb]);
    let vty = |v: Value| -> Type { dfg.value_type(v) };

    if dfg.has_result(inst) {
        write!(sink, "{} = ", value(dfg.inst_result(inst)))?;
    }
    let ty = dfg.inst_type(inst);
    let volatile = if data.is_volatile() { "volatile " } else { "" };
    match data {
        InstData::Nullary { opcode } => write!(sink, "{}", opcode),
        InstData::Unary { opcode, args } => match opcode {
            Opcode::FNeg => write!(sink, "fneg {} {}", ty, value(args[0])),
            Opcode::VaArg => write!(sink, "vaarg ptr {}, {}", value(args[0]), ty),
            _ => write!(
                sink,
                "{} {} {} to {}",
                opcode,
                vty(args[0]),
                value(args[0]),
                ty
            ),
        },
        InstData::Binary { opcode, args } => match opcode {
            Opcode::ExtractElement => write!(
                sink,
                "extractelement {} {}, {} {}",
                vty(args[0]),
                value(args[0]),
                vty(args[1]),
                value(args[1])
            ),
            _ => write!(
                sink,
                "{} {} {}, {}",
                opcode,
                ty,
                value(args[0]),
                value(args[1])
            ),
        },
        InstData::Ternary { opcode, args } => match opcode {
            Opcode::Select => write!(
                sink,
                "select {} {}, {} {}, {}",
                vty(args[0]),
                value(args[0]),
                ty,
                value(args[1]),
                value(args[2])
            ),
            Opcode::InsertElement => write!(
                sink,
                "insertelement {} {}, {} {}, {} {}",
                vty(args[0]),
                value(args[0]),
                vty(args[1]),
                value(args[1]),
                vty(args[2]),
                value(args[2])
            ),
            _ => write!(
                sink,
                "shufflevector {} {}, {} {}, {} {}",
                vty(args[0]),
                value(args[0]),
                vty(args[1]),
                value(args[1]),
                vty(args[2]),
                value(args[2])
            ),
        },
        InstData::IntCompare { cond, args, .. } => write!(
            sink,
            "icmp {} {} {}, {}",
            cond,
            vty(args[0]),
            value(args[0]),
            value(args[1])
        ),
        InstData::FloatCompare { cond, args, .. } => write!(
            sink,
            "fcmp {} {} {}, {}",
            cond,
            vty(args[0]),
            value(args[0]),
            value(args[1])
        ),
        InstData::Alloca { ty, .. } => write!(sink, "alloca {}", ty),
        InstData::Load { args, .. } => {
            write!(sink, "load {}{}, ptr {}", volatile, ty, value(args[0]))
        }
        InstData::Store { args, .. } => write!(
            sink,
            "store {}{} {}, ptr {}",
            volatile,
            vty(args[0]),
            value(args[0]),
            value(args[1])
        ),
        InstData::Gep { ty, args, .. } => {
            write!(sink, "gep {}, ptr {}", ty, value(args[0]))?;
            for &idx in &args[1..] {
                write!(sink, ", {} {}", vty(idx), value(idx))?;
            }
            Ok(())
        }
        InstData::Aggregate { opcode, args, imms } => match opcode {
            Opcode::ExtractValue => write!(
                sink,
                "extractvalue {} {}, {}",
                vty(args[0]),
                value(args[0]),
                imms.iter().format(", ")
            ),
            _ => write!(
                sink,
                "insertvalue {} {}, {} {}, {}",
                vty(args[0]),
                value(args[0]),
                vty(args[1]),
                value(args[1]),
                imms.iter().format(", ")
            ),
        },
        InstData::Phi { args, bbs, .. } => {
            let edges = args
                .iter()
                .zip(bbs.iter())
                .map(|(&v, &bb)| format!("[{}, {}]", value(v), block(bb)))
                .format(", ");
            write!(sink, "phi {} {}", ty, edges)
        }
        InstData::Call { ext, args, .. } => write!(
            sink,
            "call {} @{} ({})",
            ty,
            dfg[*ext].name,
            args.iter().map(|&v| value(v)).format(", ")
        ),
        InstData::Invoke { ext, args, bbs, .. } => write!(
            sink,
            "invoke {} @{} ({}) to {} unwind {}",
            ty,
            dfg[*ext].name,
            args.iter().map(|&v| value(v)).format(", "),
            block(bbs[0]),
            block(bbs[1])
        ),
        InstData::Jump { bbs, .. } => write!(sink, "br {}", block(bbs[0])),
        InstData::Branch { args, bbs, .. } => write!(
            sink,
            "br {}, {}, {}",
            value(args[0]),
            block(bbs[0]),
            block(bbs[1])
        ),
        InstData::Return { args, .. } => match args.first() {
            None => write!(sink, "ret"),
            Some(&v) => write!(sink, "ret {} {}", vty(v), value(v)),
        },
    }
}
