// Copyright (c) 2017-2020 Fabian Schuiki

//! Parsing of assembly code.
//!
//! A hand-written lexer and recursive-descent parser for the textual IR.
//! Forward references to values and blocks are materialized as placeholders
//! and patched once the definition is seen.

use crate::{
    ir::{
        Block, FloatCond, Function, Inst, InstData, IntCond, MemFlags, Module, Opcode, Signature,
        Value,
    },
    ty::{float_ty, int_ty, pointer_ty, vector_ty, void_ty, Type, TypeKind},
};
use anyhow::{anyhow, bail, Result};
use num::{BigInt, ToPrimitive};
use std::collections::{HashMap, HashSet};

/// Parse a module from assembly text.
pub fn parse_module(input: &str) -> Result<Module> {
    let tokens = lex(input)?;
    let mut parser = Parser { tokens, pos: 0 };
    parser.parse_module()
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    /// An identifier, keyword, opcode, or type name.
    Ident(String),
    /// A `%name` local reference.
    Local(String),
    /// An `@name` global reference.
    Global(String),
    /// An integer literal.
    Int(BigInt),
    /// A float literal.
    Float(f64),
    /// A punctuation character.
    Punct(char),
    Eof,
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Token::Ident(s) => write!(f, "`{}`", s),
            Token::Local(s) => write!(f, "`%{}`", s),
            Token::Global(s) => write!(f, "`@{}`", s),
            Token::Int(v) => write!(f, "`{}`", v),
            Token::Float(v) => write!(f, "`{}`", v),
            Token::Punct(c) => write!(f, "`{}`", c),
            Token::Eof => write!(f, "end of input"),
        }
    }
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '.'
}

fn lex(input: &str) -> Result<Vec<(Token, usize)>> {
    let mut tokens = vec![];
    let mut chars = input.chars().peekable();
    let mut line = 1;
    while let Some(&c) = chars.peek() {
        match c {
            '\n' => {
                line += 1;
                chars.next();
            }
            c if c.is_whitespace() => {
                chars.next();
            }
            ';' => {
                while let Some(&c) = chars.peek() {
                    if c == '\n' {
                        break;
                    }
                    chars.next();
                }
            }
            '%' | '@' => {
                chars.next();
                let mut name = String::new();
                while let Some(&c) = chars.peek() {
                    if !is_name_char(c) {
                        break;
                    }
                    name.push(c);
                    chars.next();
                }
                if name.is_empty() {
                    bail!("line {}: name expected after `{}`", line, c);
                }
                tokens.push((
                    match c {
                        '%' => Token::Local(name),
                        _ => Token::Global(name),
                    },
                    line,
                ));
            }
            c if c.is_ascii_digit() || c == '-' => {
                let mut text = String::new();
                text.push(c);
                chars.next();
                let mut float = false;
                while let Some(&c) = chars.peek() {
                    match c {
                        '0'..='9' => text.push(c),
                        '.' | 'e' | 'E' => {
                            float = true;
                            text.push(c);
                        }
                        '+' | '-' if text.ends_with('e') || text.ends_with('E') => text.push(c),
                        _ => break,
                    }
                    chars.next();
                }
                let token = if float {
                    Token::Float(
                        text.parse()
                            .map_err(|e| anyhow!("line {}: invalid float `{}`: {}", line, text, e))?,
                    )
                } else {
                    Token::Int(
                        text.parse()
                            .map_err(|e| anyhow!("line {}: invalid integer `{}`: {}", line, text, e))?,
                    )
                };
                tokens.push((token, line));
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let mut name = String::new();
                while let Some(&c) = chars.peek() {
                    if !is_name_char(c) {
                        break;
                    }
                    name.push(c);
                    chars.next();
                }
                tokens.push((Token::Ident(name), line));
            }
            '(' | ')' | '{' | '}' | '[' | ']' | '<' | '>' | ',' | '=' | ':' => {
                chars.next();
                tokens.push((Token::Punct(c), line));
            }
            c => bail!("line {}: unexpected character `{}`", line, c),
        }
    }
    tokens.push((Token::Eof, line));
    Ok(tokens)
}

struct Parser {
    tokens: Vec<(Token, usize)>,
    pos: usize,
}

/// Module-level context a function body is parsed against.
#[derive(Default)]
struct ModuleEnv {
    globals: HashSet<String>,
    sigs: HashMap<String, Signature>,
}

/// Per-function parsing state.
struct FuncCtx {
    func: Function,
    current: Option<Block>,
    values: HashMap<String, Value>,
    placeholders: HashMap<String, Value>,
    blocks: HashMap<String, Block>,
    defined_blocks: HashSet<String>,
}

impl FuncCtx {
    fn new(func: Function) -> Self {
        Self {
            func,
            current: None,
            values: HashMap::new(),
            placeholders: HashMap::new(),
            blocks: HashMap::new(),
            defined_blocks: HashSet::new(),
        }
    }

    /// Resolve a value by name, creating a placeholder for forward
    /// references.
    fn value(&mut self, name: &str, ty: &Type) -> Value {
        if let Some(&v) = self.values.get(name) {
            v
        } else {
            let v = self.func.dfg.add_placeholder(ty.clone());
            self.values.insert(name.to_string(), v);
            self.placeholders.insert(name.to_string(), v);
            v
        }
    }

    /// Resolve a block by name, creating it for forward references.
    fn block(&mut self, name: &str) -> Block {
        if let Some(&bb) = self.blocks.get(name) {
            bb
        } else {
            let bb = self.func.layout.create_block();
            self.func.layout.set_block_name(bb, name.to_string());
            self.blocks.insert(name.to_string(), bb);
            bb
        }
    }

    fn define_block(&mut self, name: &str) -> Result<()> {
        let bb = self.block(name);
        if !self.defined_blocks.insert(name.to_string()) {
            bail!("redefinition of block %{}", name);
        }
        self.func.layout.append_block(bb);
        self.current = Some(bb);
        Ok(())
    }

    fn build(&mut self, data: InstData, ty: Type) -> Result<Inst> {
        let bb = match self.current {
            Some(bb) => bb,
            None => bail!("instruction outside of a block"),
        };
        let inst = self.func.dfg.add_inst(data, ty);
        self.func.layout.append_inst(inst, bb);
        Ok(inst)
    }

    fn define_value(&mut self, name: String, inst: Inst) -> Result<()> {
        if !self.func.dfg.has_result(inst) {
            bail!("%{} = requires an instruction that produces a result", name);
        }
        let result = self.func.dfg.inst_result(inst);
        if let Some(ph) = self.placeholders.remove(&name) {
            self.func.dfg.replace_use(ph, result);
            self.func.dfg.remove_placeholder(ph);
        } else if self.values.contains_key(&name) {
            bail!("redefinition of value %{}", name);
        }
        self.values.insert(name.clone(), result);
        self.func.dfg.set_name(result, name);
        Ok(())
    }

    fn finish(self) -> Result<Function> {
        if let Some(name) = self.placeholders.keys().next() {
            bail!("use of undefined value %{}", name);
        }
        for name in self.blocks.keys() {
            if !self.defined_blocks.contains(name) {
                bail!("use of undefined block %{}", name);
            }
        }
        Ok(self.func)
    }
}

impl Parser {
    fn peek(&self) -> &Token {
        &self.tokens[self.pos].0
    }

    fn peek2(&self) -> &Token {
        &self.tokens[(self.pos + 1).min(self.tokens.len() - 1)].0
    }

    fn line(&self) -> usize {
        self.tokens[self.pos].1
    }

    fn bump(&mut self) -> Token {
        let token = self.tokens[self.pos].0.clone();
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        token
    }

    fn unexpected<T>(&self, expected: &str) -> Result<T> {
        bail!(
            "line {}: expected {}, found {}",
            self.line(),
            expected,
            self.peek()
        )
    }

    fn eat_punct(&mut self, c: char) -> bool {
        if *self.peek() == Token::Punct(c) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn expect_punct(&mut self, c: char) -> Result<()> {
        if self.eat_punct(c) {
            Ok(())
        } else {
            self.unexpected(&format!("`{}`", c))
        }
    }

    fn eat_keyword(&mut self, kw: &str) -> bool {
        let hit = match self.peek() {
            Token::Ident(s) => s == kw,
            _ => false,
        };
        if hit {
            self.bump();
        }
        hit
    }

    fn expect_keyword(&mut self, kw: &str) -> Result<()> {
        if self.eat_keyword(kw) {
            Ok(())
        } else {
            self.unexpected(&format!("`{}`", kw))
        }
    }

    fn expect_ident(&mut self) -> Result<String> {
        match self.peek().clone() {
            Token::Ident(s) => {
                self.bump();
                Ok(s)
            }
            _ => self.unexpected("identifier"),
        }
    }

    fn expect_local(&mut self) -> Result<String> {
        match self.peek().clone() {
            Token::Local(s) => {
                self.bump();
                Ok(s)
            }
            _ => self.unexpected("%name"),
        }
    }

    fn expect_global(&mut self) -> Result<String> {
        match self.peek().clone() {
            Token::Global(s) => {
                self.bump();
                Ok(s)
            }
            _ => self.unexpected("@name"),
        }
    }

    fn expect_usize(&mut self) -> Result<usize> {
        match self.peek().clone() {
            Token::Int(v) => {
                self.bump();
                v.to_usize()
                    .ok_or_else(|| anyhow!("line {}: `{}` out of range", self.line(), v))
            }
            _ => self.unexpected("integer"),
        }
    }

    fn parse_module(&mut self) -> Result<Module> {
        let mut module = Module::new();
        let mut env = ModuleEnv::default();
        loop {
            match self.peek().clone() {
                Token::Eof => break,
                Token::Ident(s) => match s.as_str() {
                    "global" => {
                        self.bump();
                        let name = self.expect_global()?;
                        let ty = self.parse_ty()?;
                        env.globals.insert(name.clone());
                        module.globals.push(crate::ir::GlobalData { name, ty });
                    }
                    "declare" => {
                        self.bump();
                        let name = self.expect_global()?;
                        let sig = self.parse_sig()?;
                        env.sigs.insert(name.clone(), sig.clone());
                        module.declares.push((name, sig));
                    }
                    "func" => {
                        let func = self.parse_function(&env)?;
                        env.sigs.insert(func.name.clone(), func.sig.clone());
                        module.add_function(func);
                    }
                    _ => return self.unexpected("`global`, `declare`, or `func`"),
                },
                _ => return self.unexpected("`global`, `declare`, or `func`"),
            }
        }
        Ok(module)
    }

    fn parse_sig(&mut self) -> Result<Signature> {
        let mut sig = Signature::new();
        self.expect_punct('(')?;
        if !self.eat_punct(')') {
            loop {
                sig.add_input(self.parse_ty()?);
                if !self.eat_punct(',') {
                    break;
                }
            }
            self.expect_punct(')')?;
        }
        sig.set_return_type(self.parse_ty()?);
        Ok(sig)
    }

    fn parse_ty(&mut self) -> Result<Type> {
        match self.peek().clone() {
            Token::Ident(s) => {
                self.bump();
                match s.as_str() {
                    "void" => Ok(void_ty()),
                    "ptr" => Ok(pointer_ty()),
                    "f32" => Ok(float_ty(32)),
                    "f64" => Ok(float_ty(64)),
                    _ => {
                        if let Some(width) = s.strip_prefix('i').and_then(|w| w.parse().ok()) {
                            Ok(int_ty(width))
                        } else {
                            bail!("line {}: unknown type `{}`", self.line(), s)
                        }
                    }
                }
            }
            Token::Punct('[') => {
                self.bump();
                let length = self.expect_usize()?;
                self.expect_keyword("x")?;
                let element = self.parse_ty()?;
                self.expect_punct(']')?;
                Ok(crate::ty::array_ty(length, element))
            }
            Token::Punct('<') => {
                self.bump();
                let length = self.expect_usize()?;
                self.expect_keyword("x")?;
                let element = self.parse_ty()?;
                self.expect_punct('>')?;
                Ok(vector_ty(length, element))
            }
            Token::Punct('{') => {
                self.bump();
                let mut fields = vec![];
                if !self.eat_punct('}') {
                    loop {
                        fields.push(self.parse_ty()?);
                        if !self.eat_punct(',') {
                            break;
                        }
                    }
                    self.expect_punct('}')?;
                }
                Ok(crate::ty::struct_ty(fields))
            }
            _ => self.unexpected("type"),
        }
    }

    fn parse_function(&mut self, env: &ModuleEnv) -> Result<Function> {
        self.expect_keyword("func")?;
        let name = self.expect_global()?;

        let mut sig = Signature::new();
        let mut arg_names = vec![];
        self.expect_punct('(')?;
        if !self.eat_punct(')') {
            loop {
                sig.add_input(self.parse_ty()?);
                arg_names.push(self.expect_local()?);
                if !self.eat_punct(',') {
                    break;
                }
            }
            self.expect_punct(')')?;
        }
        sig.set_return_type(self.parse_ty()?);

        let func = Function::new(name, sig);
        let mut ctx = FuncCtx::new(func);
        for (arg, name) in ctx.func.sig.args().zip(arg_names) {
            let value = ctx.func.dfg.arg_value(arg);
            if ctx.values.insert(name.clone(), value).is_some() {
                bail!("duplicate argument %{}", name);
            }
            ctx.func.dfg.set_name(value, name);
        }

        self.expect_punct('{')?;
        loop {
            match self.peek().clone() {
                Token::Punct('}') => {
                    self.bump();
                    break;
                }
                Token::Local(label) if *self.peek2() == Token::Punct(':') => {
                    self.bump();
                    self.bump();
                    ctx.define_block(&label)?;
                }
                Token::Eof => return self.unexpected("`}`"),
                _ => self.parse_inst(&mut ctx, env)?,
            }
        }
        ctx.finish()
    }

    /// Parse an operand of known type.
    fn parse_operand(&mut self, ctx: &mut FuncCtx, env: &ModuleEnv, ty: &Type) -> Result<Value> {
        match self.peek().clone() {
            Token::Local(name) => {
                self.bump();
                Ok(ctx.value(&name, ty))
            }
            Token::Int(v) => {
                self.bump();
                if ty.is_int() {
                    Ok(ctx.func.dfg.const_int(ty.clone(), v))
                } else if ty.is_float() {
                    let v = v
                        .to_f64()
                        .ok_or_else(|| anyhow!("line {}: `{}` out of range", self.line(), v))?;
                    Ok(ctx.func.dfg.const_float(ty.clone(), v))
                } else {
                    bail!("line {}: integer literal needs an integer type", self.line())
                }
            }
            Token::Float(v) => {
                self.bump();
                if !ty.is_float() {
                    bail!("line {}: float literal needs a float type", self.line());
                }
                Ok(ctx.func.dfg.const_float(ty.clone(), v))
            }
            Token::Ident(s) if s == "null" => {
                self.bump();
                Ok(ctx.func.dfg.const_null())
            }
            Token::Global(name) => {
                self.bump();
                if !env.globals.contains(&name) {
                    bail!("line {}: use of undeclared global @{}", self.line(), name);
                }
                Ok(ctx.func.dfg.global(name))
            }
            _ => self.unexpected("operand"),
        }
    }

    fn parse_inst(&mut self, ctx: &mut FuncCtx, env: &ModuleEnv) -> Result<()> {
        // The `%name = <rhs>` form.
        if let Token::Local(name) = self.peek().clone() {
            self.bump();
            self.expect_punct('=')?;
            let opcode = self.expect_ident()?;
            let inst = self.parse_rhs(ctx, env, &opcode)?;
            return ctx.define_value(name, inst);
        }

        // The void instruction forms.
        let opcode = self.expect_ident()?;
        match opcode.as_str() {
            "store" => {
                let flags = self.parse_mem_flags();
                let ty = self.parse_ty()?;
                let value = self.parse_operand(ctx, env, &ty)?;
                self.expect_punct(',')?;
                self.expect_keyword("ptr")?;
                let ptr = self.parse_operand(ctx, env, &pointer_ty())?;
                ctx.build(
                    InstData::Store {
                        opcode: Opcode::Store,
                        flags,
                        args: [value, ptr],
                    },
                    void_ty(),
                )?;
            }
            "br" => {
                let cond_form = match self.peek() {
                    Token::Local(_) => *self.peek2() == Token::Punct(','),
                    _ => true,
                };
                if cond_form {
                    let cond = self.parse_operand(ctx, env, &int_ty(1))?;
                    self.expect_punct(',')?;
                    let bb0 = ctx.block(&self.expect_local()?);
                    self.expect_punct(',')?;
                    let bb1 = ctx.block(&self.expect_local()?);
                    ctx.build(
                        InstData::Branch {
                            opcode: Opcode::BrCond,
                            args: [cond],
                            bbs: [bb0, bb1],
                        },
                        void_ty(),
                    )?;
                } else {
                    let bb = ctx.block(&self.expect_local()?);
                    ctx.build(
                        InstData::Jump {
                            opcode: Opcode::Br,
                            bbs: [bb],
                        },
                        void_ty(),
                    )?;
                }
            }
            "ret" => {
                let args = match self.peek().clone() {
                    // A type token opens the value-carrying form.
                    Token::Ident(s) if is_type_start(&s) => {
                        let ty = self.parse_ty()?;
                        vec![self.parse_operand(ctx, env, &ty)?]
                    }
                    Token::Punct('[') | Token::Punct('<') | Token::Punct('{') => {
                        let ty = self.parse_ty()?;
                        vec![self.parse_operand(ctx, env, &ty)?]
                    }
                    _ => vec![],
                };
                ctx.build(
                    InstData::Return {
                        opcode: Opcode::Ret,
                        args,
                    },
                    void_ty(),
                )?;
            }
            "unreachable" => {
                ctx.build(
                    InstData::Nullary {
                        opcode: Opcode::Unreachable,
                    },
                    void_ty(),
                )?;
            }
            "call" | "invoke" => {
                let inst = self.parse_rhs(ctx, env, &opcode)?;
                if ctx.func.dfg.has_result(inst) {
                    bail!(
                        "line {}: result of `{}` must be assigned to a value",
                        self.line(),
                        opcode
                    );
                }
            }
            _ => return self.unexpected("instruction"),
        }
        Ok(())
    }

    fn parse_mem_flags(&mut self) -> MemFlags {
        if self.eat_keyword("volatile") {
            MemFlags::VOLATILE
        } else {
            MemFlags::empty()
        }
    }

    /// Parse the right-hand side of an instruction, given its mnemonic.
    fn parse_rhs(&mut self, ctx: &mut FuncCtx, env: &ModuleEnv, opcode: &str) -> Result<Inst> {
        if let Some(op) = binary_opcode(opcode) {
            let ty = self.parse_ty()?;
            let a = self.parse_operand(ctx, env, &ty)?;
            self.expect_punct(',')?;
            let b = self.parse_operand(ctx, env, &ty)?;
            return ctx.build(InstData::Binary { opcode: op, args: [a, b] }, ty);
        }
        if let Some(op) = cast_opcode(opcode) {
            let src = self.parse_ty()?;
            let a = self.parse_operand(ctx, env, &src)?;
            self.expect_keyword("to")?;
            let ty = self.parse_ty()?;
            return ctx.build(InstData::Unary { opcode: op, args: [a] }, ty);
        }
        match opcode {
            "fneg" => {
                let ty = self.parse_ty()?;
                let a = self.parse_operand(ctx, env, &ty)?;
                ctx.build(
                    InstData::Unary {
                        opcode: Opcode::FNeg,
                        args: [a],
                    },
                    ty,
                )
            }
            "icmp" => {
                let cond = int_cond(&self.expect_ident()?)
                    .ok_or_else(|| anyhow!("line {}: unknown icmp condition", self.line()))?;
                let ty = self.parse_ty()?;
                let a = self.parse_operand(ctx, env, &ty)?;
                self.expect_punct(',')?;
                let b = self.parse_operand(ctx, env, &ty)?;
                ctx.build(
                    InstData::IntCompare {
                        opcode: Opcode::ICmp,
                        cond,
                        args: [a, b],
                    },
                    int_ty(1),
                )
            }
            "fcmp" => {
                let cond = float_cond(&self.expect_ident()?)
                    .ok_or_else(|| anyhow!("line {}: unknown fcmp condition", self.line()))?;
                let ty = self.parse_ty()?;
                let a = self.parse_operand(ctx, env, &ty)?;
                self.expect_punct(',')?;
                let b = self.parse_operand(ctx, env, &ty)?;
                ctx.build(
                    InstData::FloatCompare {
                        opcode: Opcode::FCmp,
                        cond,
                        args: [a, b],
                    },
                    int_ty(1),
                )
            }
            "alloca" => {
                let ty = self.parse_ty()?;
                ctx.build(
                    InstData::Alloca {
                        opcode: Opcode::Alloca,
                        ty,
                    },
                    pointer_ty(),
                )
            }
            "load" => {
                let flags = self.parse_mem_flags();
                let ty = self.parse_ty()?;
                self.expect_punct(',')?;
                self.expect_keyword("ptr")?;
                let ptr = self.parse_operand(ctx, env, &pointer_ty())?;
                ctx.build(
                    InstData::Load {
                        opcode: Opcode::Load,
                        flags,
                        args: [ptr],
                    },
                    ty,
                )
            }
            "gep" => {
                let ty = self.parse_ty()?;
                self.expect_punct(',')?;
                self.expect_keyword("ptr")?;
                let mut args = vec![self.parse_operand(ctx, env, &pointer_ty())?];
                while self.eat_punct(',') {
                    let ity = self.parse_ty()?;
                    args.push(self.parse_operand(ctx, env, &ity)?);
                }
                ctx.build(
                    InstData::Gep {
                        opcode: Opcode::Gep,
                        ty,
                        args,
                    },
                    pointer_ty(),
                )
            }
            "extractvalue" => {
                let agg_ty = self.parse_ty()?;
                let agg = self.parse_operand(ctx, env, &agg_ty)?;
                let mut imms = vec![];
                while self.eat_punct(',') {
                    imms.push(self.expect_usize()?);
                }
                let ty = field_type(&agg_ty, &imms)
                    .ok_or_else(|| anyhow!("line {}: invalid extractvalue indices", self.line()))?;
                ctx.build(
                    InstData::Aggregate {
                        opcode: Opcode::ExtractValue,
                        args: vec![agg],
                        imms,
                    },
                    ty,
                )
            }
            "insertvalue" => {
                let agg_ty = self.parse_ty()?;
                let agg = self.parse_operand(ctx, env, &agg_ty)?;
                self.expect_punct(',')?;
                let elt_ty = self.parse_ty()?;
                let elt = self.parse_operand(ctx, env, &elt_ty)?;
                let mut imms = vec![];
                while self.eat_punct(',') {
                    imms.push(self.expect_usize()?);
                }
                ctx.build(
                    InstData::Aggregate {
                        opcode: Opcode::InsertValue,
                        args: vec![agg, elt],
                        imms,
                    },
                    agg_ty,
                )
            }
            "extractelement" => {
                let vec_ty = self.parse_ty()?;
                let v = self.parse_operand(ctx, env, &vec_ty)?;
                self.expect_punct(',')?;
                let idx_ty = self.parse_ty()?;
                let idx = self.parse_operand(ctx, env, &idx_ty)?;
                let ty = field_type(&vec_ty, &[0])
                    .ok_or_else(|| anyhow!("line {}: extractelement needs a vector", self.line()))?;
                ctx.build(
                    InstData::Binary {
                        opcode: Opcode::ExtractElement,
                        args: [v, idx],
                    },
                    ty,
                )
            }
            "insertelement" => {
                let vec_ty = self.parse_ty()?;
                let v = self.parse_operand(ctx, env, &vec_ty)?;
                self.expect_punct(',')?;
                let elt_ty = self.parse_ty()?;
                let elt = self.parse_operand(ctx, env, &elt_ty)?;
                self.expect_punct(',')?;
                let idx_ty = self.parse_ty()?;
                let idx = self.parse_operand(ctx, env, &idx_ty)?;
                ctx.build(
                    InstData::Ternary {
                        opcode: Opcode::InsertElement,
                        args: [v, elt, idx],
                    },
                    vec_ty,
                )
            }
            "shufflevector" => {
                let a_ty = self.parse_ty()?;
                let a = self.parse_operand(ctx, env, &a_ty)?;
                self.expect_punct(',')?;
                let b_ty = self.parse_ty()?;
                let b = self.parse_operand(ctx, env, &b_ty)?;
                self.expect_punct(',')?;
                let mask_ty = self.parse_ty()?;
                let mask = self.parse_operand(ctx, env, &mask_ty)?;
                let ty = match (&*a_ty, &*mask_ty) {
                    (TypeKind::VectorType(_, elem), TypeKind::VectorType(n, _)) => {
                        vector_ty(*n, elem.clone())
                    }
                    _ => bail!("line {}: shufflevector needs vector operands", self.line()),
                };
                ctx.build(
                    InstData::Ternary {
                        opcode: Opcode::ShuffleVector,
                        args: [a, b, mask],
                    },
                    ty,
                )
            }
            "select" => {
                let cond_ty = self.parse_ty()?;
                let cond = self.parse_operand(ctx, env, &cond_ty)?;
                self.expect_punct(',')?;
                let ty = self.parse_ty()?;
                let a = self.parse_operand(ctx, env, &ty)?;
                self.expect_punct(',')?;
                let b = self.parse_operand(ctx, env, &ty)?;
                ctx.build(
                    InstData::Ternary {
                        opcode: Opcode::Select,
                        args: [cond, a, b],
                    },
                    ty,
                )
            }
            "phi" => {
                let ty = self.parse_ty()?;
                let mut args = vec![];
                let mut bbs = vec![];
                loop {
                    self.expect_punct('[')?;
                    args.push(self.parse_operand(ctx, env, &ty)?);
                    self.expect_punct(',')?;
                    bbs.push(ctx.block(&self.expect_local()?));
                    self.expect_punct(']')?;
                    if !self.eat_punct(',') {
                        break;
                    }
                }
                ctx.build(
                    InstData::Phi {
                        opcode: Opcode::Phi,
                        args,
                        bbs,
                    },
                    ty,
                )
            }
            "vaarg" => {
                self.expect_keyword("ptr")?;
                let list = self.parse_operand(ctx, env, &pointer_ty())?;
                self.expect_punct(',')?;
                let ty = self.parse_ty()?;
                ctx.build(
                    InstData::Unary {
                        opcode: Opcode::VaArg,
                        args: [list],
                    },
                    ty,
                )
            }
            "call" | "invoke" => {
                let ty = self.parse_ty()?;
                let name = self.expect_global()?;
                let sig = env
                    .sigs
                    .get(&name)
                    .ok_or_else(|| {
                        anyhow!("line {}: call to undeclared function @{}", self.line(), name)
                    })?
                    .clone();
                if sig.return_type() != ty {
                    bail!("line {}: @{} returns {}", self.line(), name, sig.return_type());
                }
                self.expect_punct('(')?;
                let mut args = vec![];
                if !self.eat_punct(')') {
                    let mut arg_tys = sig.args().map(|a| sig.arg_type(a));
                    loop {
                        let arg_ty = arg_tys
                            .next()
                            .ok_or_else(|| anyhow!("line {}: too many arguments", self.line()))?;
                        args.push(self.parse_operand(ctx, env, &arg_ty)?);
                        if !self.eat_punct(',') {
                            break;
                        }
                    }
                    self.expect_punct(')')?;
                }
                if args.len() != sig.num_args() {
                    bail!("line {}: @{} takes {} arguments", self.line(), name, sig.num_args());
                }
                let ext = ctx.func.dfg.ext_func(name, sig);
                if opcode == "call" {
                    ctx.build(InstData::Call { opcode: Opcode::Call, ext, args }, ty)
                } else {
                    self.expect_keyword("to")?;
                    let normal = ctx.block(&self.expect_local()?);
                    self.expect_keyword("unwind")?;
                    let unwind = ctx.block(&self.expect_local()?);
                    ctx.build(
                        InstData::Invoke {
                            opcode: Opcode::Invoke,
                            ext,
                            args,
                            bbs: [normal, unwind],
                        },
                        ty,
                    )
                }
            }
            _ => self.unexpected("instruction"),
        }
    }
}

/// Check whether an identifier opens a type.
fn is_type_start(s: &str) -> bool {
    match s {
        "void" | "ptr" | "f32" | "f64" => true,
        _ => s.starts_with('i') && s[1..].parse::<usize>().is_ok(),
    }
}

/// Walk an aggregate type along a path of field indices.
fn field_type(ty: &Type, imms: &[usize]) -> Option<Type> {
    let mut ty = ty.clone();
    for &idx in imms {
        ty = ty.field(idx)?;
    }
    Some(ty)
}

fn binary_opcode(s: &str) -> Option<Opcode> {
    Some(match s {
        "add" => Opcode::Add,
        "fadd" => Opcode::FAdd,
        "sub" => Opcode::Sub,
        "fsub" => Opcode::FSub,
        "mul" => Opcode::Mul,
        "fmul" => Opcode::FMul,
        "udiv" => Opcode::UDiv,
        "sdiv" => Opcode::SDiv,
        "fdiv" => Opcode::FDiv,
        "urem" => Opcode::URem,
        "srem" => Opcode::SRem,
        "frem" => Opcode::FRem,
        "shl" => Opcode::Shl,
        "lshr" => Opcode::LShr,
        "ashr" => Opcode::AShr,
        "and" => Opcode::And,
        "or" => Opcode::Or,
        "xor" => Opcode::Xor,
        _ => return None,
    })
}

fn cast_opcode(s: &str) -> Option<Opcode> {
    Some(match s {
        "trunc" => Opcode::Trunc,
        "zext" => Opcode::ZExt,
        "sext" => Opcode::SExt,
        "fptoui" => Opcode::FPToUI,
        "fptosi" => Opcode::FPToSI,
        "uitofp" => Opcode::UIToFP,
        "sitofp" => Opcode::SIToFP,
        "fptrunc" => Opcode::FPTrunc,
        "fpext" => Opcode::FPExt,
        "ptrtoint" => Opcode::PtrToInt,
        "inttoptr" => Opcode::IntToPtr,
        "bitcast" => Opcode::Bitcast,
        "addrspacecast" => Opcode::AddrSpaceCast,
        _ => return None,
    })
}

fn int_cond(s: &str) -> Option<IntCond> {
    Some(match s {
        "eq" => IntCond::Eq,
        "ne" => IntCond::Ne,
        "ugt" => IntCond::Ugt,
        "uge" => IntCond::Uge,
        "ult" => IntCond::Ult,
        "ule" => IntCond::Ule,
        "sgt" => IntCond::Sgt,
        "sge" => IntCond::Sge,
        "slt" => IntCond::Slt,
        "sle" => IntCond::Sle,
        _ => return None,
    })
}

fn float_cond(s: &str) -> Option<FloatCond> {
    Some(match s {
        "false" => FloatCond::False,
        "oeq" => FloatCond::Oeq,
        "ogt" => FloatCond::Ogt,
        "oge" => FloatCond::Oge,
        "olt" => FloatCond::Olt,
        "ole" => FloatCond::Ole,
        "one" => FloatCond::One,
        "ord" => FloatCond::Ord,
        "ueq" => FloatCond::Ueq,
        "ugt" => FloatCond::Ugt,
        "uge" => FloatCond::Uge,
        "ult" => FloatCond::Ult,
        "ule" => FloatCond::Ule,
        "une" => FloatCond::Une,
        "uno" => FloatCond::Uno,
        "true" => FloatCond::True,
        _ => return None,
    })
}
