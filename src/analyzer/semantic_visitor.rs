use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use log::{debug, trace};

use crate::error::CodegenError;
use crate::parser::{Block, Expr, FuncDef, Program, Stmt, ENTRY_FUNCTION};

use super::{FuncSig, LocalVar, Param, SymbolTable, Ty};

/// Bound on inference rounds; the lattice is shallow so this is never reached
/// by well-formed input.
const MAX_ROUNDS: usize = 32;

/// Where a variable was first bound: the block path of its declaration.
#[derive(Debug)]
struct Binding {
    path: Vec<usize>,
    by_loop: bool,
}

/// Per-routine state of one inference round.
#[derive(Debug, Default)]
struct Scope {
    env: BTreeMap<String, Ty>,
    params: HashSet<String>,
    bindings: HashMap<String, Binding>,
    hoisted: BTreeSet<String>,
    /// Names read before any store to them, such as a value carried over
    /// from the previous loop iteration.
    unbound_reads: HashSet<String>,
    path: Vec<usize>,
    blocks: usize,
}

impl Scope {
    fn new(params: &[Param]) -> Self {
        let mut scope = Scope::default();
        for p in params {
            scope.params.insert(p.name.clone());
            scope.env.insert(p.name.clone(), p.ty);
        }
        scope
    }

    fn lookup(&self, name: &str) -> Ty {
        self.env.get(name).copied().unwrap_or(Ty::Unknown)
    }

    fn enter_block(&mut self) {
        self.blocks += 1;
        self.path.push(self.blocks);
    }

    fn exit_block(&mut self) {
        self.path.pop();
    }

    /// A use of `name` outside the block that declared it forces hoisting.
    fn touch(&mut self, name: &str) {
        match self.bindings.get(name) {
            Some(b) if !self.path.starts_with(&b.path) => {
                self.hoisted.insert(name.to_string());
            }
            Some(_) => (),
            None if !self.params.contains(name) => {
                self.unbound_reads.insert(name.to_string());
            }
            None => (),
        }
    }

    fn bind(&mut self, name: &str, ty: Ty, by_loop: bool) {
        if !self.params.contains(name) {
            match self.bindings.get(name) {
                None => {
                    if self.unbound_reads.contains(name) {
                        self.hoisted.insert(name.to_string());
                    }
                    self.rebind(name, by_loop)
                }
                // Sibling loops over the same variable each declare their own.
                Some(b)
                    if by_loop
                        && b.by_loop
                        && !self.hoisted.contains(name)
                        && !self.path.starts_with(&b.path) =>
                {
                    self.rebind(name, by_loop)
                }
                Some(_) => self.touch(name),
            }
        }
        let joined = self.lookup(name).join(ty);
        self.env.insert(name.to_string(), joined);
    }

    fn rebind(&mut self, name: &str, by_loop: bool) {
        self.bindings.insert(
            name.to_string(),
            Binding {
                path: self.path.clone(),
                by_loop,
            },
        );
    }

    fn into_locals(self) -> BTreeMap<String, LocalVar> {
        let Scope {
            env,
            params,
            hoisted,
            ..
        } = self;
        env.into_iter()
            .filter(|(name, _)| !params.contains(name))
            .map(|(name, ty)| {
                let hoisted = hoisted.contains(&name);
                (name, LocalVar { ty, hoisted })
            })
            .collect()
    }
}

/// Builds the signature table and per-routine locals consumed by `Codegen`.
pub struct SemanticVisitor {
    symbol_table: SymbolTable,
    changed: bool,
}

impl SemanticVisitor {
    pub fn new() -> Self {
        Self {
            symbol_table: SymbolTable::new(),
            changed: false,
        }
    }

    pub fn visit_program(mut self, program: &Program) -> Result<SymbolTable, CodegenError> {
        let functions: Vec<&FuncDef> = program
            .functions()
            .filter(|f| f.name != ENTRY_FUNCTION)
            .collect();

        if let Some(main) = program.entry_function() {
            if !main.params.is_empty() {
                return Err(CodegenError::EntryParameters);
            }
        }
        for f in &functions {
            self.declare_func(f)?;
        }

        self.infer_param_usage(&functions);

        let entry = program.entry_statements();
        for round in 1..=MAX_ROUNDS {
            self.changed = false;
            for f in &functions {
                self.visit_routine(&f.name, f.body.0.iter())?;
            }
            self.visit_routine(ENTRY_FUNCTION, entry.iter().copied())?;
            trace!("inference round {round}, changed: {}", self.changed);
            if !self.changed {
                break;
            }
        }

        self.symbol_table.finalize_signatures();
        for sig in self.symbol_table.functions() {
            debug!("signature: {}", sig.declaration());
        }
        Ok(self.symbol_table)
    }

    fn declare_func(&mut self, f: &FuncDef) -> Result<(), CodegenError> {
        let ret = if returns_value(&f.body) {
            Ty::Unknown
        } else {
            Ty::Void
        };
        self.symbol_table.declare_func(FuncSig {
            name: f.name.clone(),
            params: f.params.iter().cloned().map(Param::new).collect(),
            ret,
        })
    }

    /// Marks parameters that are used as sequences, have their elements
    /// stored, or are rebound. Forwarding a parameter to a callee propagates
    /// the callee's usage, so this repeats until stable.
    fn infer_param_usage(&mut self, functions: &[&FuncDef]) {
        loop {
            let mut changed = false;
            for f in functions {
                for (index, name) in f.params.iter().enumerate() {
                    let usage = param_usage(name, &f.body, &self.symbol_table);
                    let Some(param) = self
                        .symbol_table
                        .get_func_mut(&f.name)
                        .and_then(|sig| sig.params.get_mut(index))
                    else {
                        continue;
                    };
                    if usage.sequence && param.ty != Ty::IntList {
                        param.ty = Ty::IntList;
                        changed = true;
                    }
                    if usage.mutated && !param.mutated {
                        param.mutated = true;
                        changed = true;
                    }
                    param.reassigned |= usage.reassigned;
                }
            }
            if !changed {
                break;
            }
        }
    }

    fn visit_routine<'a>(
        &mut self,
        routine: &str,
        stmts: impl Iterator<Item = &'a Stmt>,
    ) -> Result<(), CodegenError> {
        let params = self
            .symbol_table
            .get_func(routine)
            .map(|f| f.params.clone())
            .unwrap_or_default();
        let mut scope = Scope::new(&params);
        for stmt in stmts {
            self.visit_stmt(routine, stmt, &mut scope)?;
        }

        let locals = scope.into_locals();
        if self.symbol_table.locals(routine) != Some(&locals) {
            self.changed = true;
        }
        self.symbol_table.set_locals(routine, locals);
        Ok(())
    }

    fn visit_block(
        &mut self,
        routine: &str,
        block: &Block,
        scope: &mut Scope,
    ) -> Result<(), CodegenError> {
        scope.enter_block();
        for stmt in &block.0 {
            self.visit_stmt(routine, stmt, scope)?;
        }
        scope.exit_block();
        Ok(())
    }

    fn visit_stmt(
        &mut self,
        routine: &str,
        stmt: &Stmt,
        scope: &mut Scope,
    ) -> Result<(), CodegenError> {
        match stmt {
            Stmt::Assign(name, value) => {
                let ty = self.visit_expr(value, scope);
                scope.bind(name, ty, false);
            }
            Stmt::IndexAssign(target, index, value) => {
                self.visit_expr(target, scope);
                self.visit_expr(index, scope);
                self.visit_expr(value, scope);
            }
            Stmt::Print(args) => {
                for arg in args {
                    self.visit_expr(arg, scope);
                }
            }
            Stmt::If(cond, then_block, else_block) => {
                self.visit_expr(cond, scope);
                self.visit_block(routine, then_block, scope)?;
                if let Some(else_block) = else_block {
                    self.visit_block(routine, else_block, scope)?;
                }
            }
            Stmt::While(cond, body) => {
                self.visit_expr(cond, scope);
                self.visit_block(routine, body, scope)?;
            }
            Stmt::For(name, iterable, body) => {
                let element = match self.visit_expr(iterable, scope) {
                    Ty::Str => Ty::Str,
                    _ => Ty::Int,
                };
                scope.enter_block();
                scope.bind(name, element, true);
                for stmt in &body.0 {
                    self.visit_stmt(routine, stmt, scope)?;
                }
                scope.exit_block();
            }
            Stmt::FuncDef(f) => return Err(CodegenError::NestedFunction(f.name.clone())),
            Stmt::Return(value) => {
                if let Some(value) = value {
                    let ty = self.visit_expr(value, scope);
                    if routine != ENTRY_FUNCTION && self.symbol_table.refine_return(routine, ty) {
                        self.changed = true;
                    }
                }
            }
            Stmt::Expr(e) => {
                self.visit_expr(e, scope);
            }
            Stmt::Pass | Stmt::Break | Stmt::Continue => (),
        }
        Ok(())
    }

    /// Records variable uses and call-site argument types; returns the type
    /// of `expr`.
    fn visit_expr(&mut self, expr: &Expr, scope: &mut Scope) -> Ty {
        match expr {
            Expr::Var(name) => scope.touch(name),
            Expr::Binary(_, l, r) => {
                self.visit_expr(l, scope);
                self.visit_expr(r, scope);
            }
            Expr::Unary(_, e) | Expr::Len(e) => {
                self.visit_expr(e, scope);
            }
            Expr::List(elements) => {
                for e in elements {
                    self.visit_expr(e, scope);
                }
            }
            Expr::Index(target, index) => {
                self.visit_expr(target, scope);
                self.visit_expr(index, scope);
            }
            Expr::Call(name, args) => {
                for (index, arg) in args.iter().enumerate() {
                    let ty = self.visit_expr(arg, scope);
                    if self.symbol_table.refine_param(name, index, ty) {
                        self.changed = true;
                    }
                }
            }
            Expr::Range(start, end, step) => {
                self.visit_expr(start, scope);
                for e in [end, step].into_iter().flatten() {
                    self.visit_expr(e, scope);
                }
            }
            Expr::Int(_) | Expr::Float(_) | Expr::Str(_) | Expr::Bool(_) => (),
        }
        self.symbol_table.expr_ty(expr, &|name: &str| scope.lookup(name))
    }
}

impl Default for SemanticVisitor {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Default)]
struct ParamUsage {
    sequence: bool,
    mutated: bool,
    reassigned: bool,
}

fn param_usage(name: &str, body: &Block, table: &SymbolTable) -> ParamUsage {
    let mut usage = ParamUsage::default();
    for stmt in &body.0 {
        stmt_usage(name, stmt, table, &mut usage);
    }
    usage
}

fn is_var(expr: &Expr, name: &str) -> bool {
    matches!(expr, Expr::Var(n) if n == name)
}

fn stmt_usage(name: &str, stmt: &Stmt, table: &SymbolTable, usage: &mut ParamUsage) {
    let mut exprs: Vec<&Expr> = vec![];
    let mut blocks: Vec<&Block> = vec![];
    match stmt {
        Stmt::Assign(target, value) => {
            usage.reassigned |= target == name;
            exprs.push(value);
        }
        Stmt::IndexAssign(target, index, value) => {
            if is_var(target, name) {
                usage.sequence = true;
                usage.mutated = true;
            }
            exprs.extend([target, index, value]);
        }
        Stmt::Print(args) => exprs.extend(args),
        Stmt::If(cond, then_block, else_block) => {
            exprs.push(cond);
            blocks.push(then_block);
            blocks.extend(else_block);
        }
        Stmt::While(cond, body) => {
            exprs.push(cond);
            blocks.push(body);
        }
        Stmt::For(var, iterable, body) => {
            usage.reassigned |= var == name;
            usage.sequence |= is_var(iterable, name);
            exprs.push(iterable);
            blocks.push(body);
        }
        Stmt::Return(value) => exprs.extend(value),
        Stmt::Expr(e) => exprs.push(e),
        Stmt::FuncDef(_) | Stmt::Pass | Stmt::Break | Stmt::Continue => (),
    }

    for e in exprs {
        expr_usage(name, e, table, usage);
    }
    for block in blocks {
        for stmt in &block.0 {
            stmt_usage(name, stmt, table, usage);
        }
    }
}

fn expr_usage(name: &str, expr: &Expr, table: &SymbolTable, usage: &mut ParamUsage) {
    match expr {
        Expr::Index(target, index) => {
            usage.sequence |= is_var(target, name);
            expr_usage(name, target, table, usage);
            expr_usage(name, index, table, usage);
        }
        Expr::Len(e) => {
            usage.sequence |= is_var(e, name);
            expr_usage(name, e, table, usage);
        }
        Expr::Call(callee, args) => {
            let params = table.get_func(callee).map(|f| f.params.as_slice());
            for (index, arg) in args.iter().enumerate() {
                if let Some(param) = params.and_then(|p| p.get(index)) {
                    if is_var(arg, name) && param.ty == Ty::IntList {
                        usage.sequence = true;
                        usage.mutated |= param.mutated;
                    }
                }
                expr_usage(name, arg, table, usage);
            }
        }
        Expr::Binary(_, l, r) => {
            expr_usage(name, l, table, usage);
            expr_usage(name, r, table, usage);
        }
        Expr::Unary(_, e) => expr_usage(name, e, table, usage),
        Expr::List(elements) => {
            for e in elements {
                expr_usage(name, e, table, usage);
            }
        }
        Expr::Range(start, end, step) => {
            expr_usage(name, start, table, usage);
            for e in [end, step].into_iter().flatten() {
                expr_usage(name, e, table, usage);
            }
        }
        Expr::Int(_) | Expr::Float(_) | Expr::Str(_) | Expr::Bool(_) | Expr::Var(_) => (),
    }
}

fn returns_value(block: &Block) -> bool {
    block.0.iter().any(|stmt| match stmt {
        Stmt::Return(value) => value.is_some(),
        Stmt::If(_, then_block, else_block) => {
            returns_value(then_block) || else_block.as_ref().is_some_and(returns_value)
        }
        Stmt::While(_, body) | Stmt::For(_, _, body) => returns_value(body),
        _ => false,
    })
}
