use std::collections::HashSet;

use log::{debug, trace};

use crate::{
    analyzer::{ParamMode, SymbolTable, Ty},
    error::CodegenError,
    parser::{
        BinOpKind, Block, Expr, FuncDef, Program, Stmt, UnaryOpKind, ENTRY_FUNCTION, STR_BUILTIN,
    },
};

use super::{cpp_ident, PRELUDE};

const INDENT: &str = "    ";
/// Prefix of the variables the generator introduces itself.
const HIDDEN_PREFIX: &str = "py2cpp_";

type GenResult<T> = Result<T, CodegenError>;

/// Emits C++ source from a program and the tables built by `SemanticVisitor`.
pub struct Codegen {
    symbol_table: SymbolTable,
    lines: Vec<String>,
    indent: usize,
    /// Names declared so far in the current routine.
    declared: HashSet<String>,
    loop_depth: usize,
    routine: String,
    hidden_count: usize,
}

impl Codegen {
    pub fn new(symbol_table: SymbolTable) -> Self {
        Self {
            symbol_table,
            lines: vec![],
            indent: 0,
            declared: HashSet::new(),
            loop_depth: 0,
            routine: String::new(),
            hidden_count: 0,
        }
    }

    pub fn generate(mut self, program: &Program) -> GenResult<String> {
        self.lines.push(PRELUDE.trim_end().to_string());
        self.lines.push(String::new());

        let declarations: Vec<String> = self
            .symbol_table
            .functions()
            .map(|sig| format!("{};", sig.declaration()))
            .collect();
        if !declarations.is_empty() {
            self.lines.extend(declarations);
            self.lines.push(String::new());
        }

        for f in program.functions().filter(|f| f.name != ENTRY_FUNCTION) {
            self.gen_func_def(f)?;
            self.lines.push(String::new());
        }
        self.gen_entry(program)?;

        debug!("emitted {} lines", self.lines.len());
        Ok(self.lines.join("\n") + "\n")
    }

    fn emit(&mut self, line: impl AsRef<str>) {
        self.lines
            .push(format!("{}{}", INDENT.repeat(self.indent), line.as_ref()));
    }

    fn begin_routine(&mut self, name: &str, params: impl IntoIterator<Item = String>) {
        trace!("emitting routine {name}");
        self.routine = name.to_string();
        self.declared = params.into_iter().collect();
        self.loop_depth = 0;
        self.hidden_count = 0;

        let hoisted: Vec<(String, String)> = self
            .symbol_table
            .hoisted(name)
            .map(|(var, local)| {
                let line = format!("{} {}{{}};", local.ty.declared_name(), cpp_ident(var));
                (var.clone(), line)
            })
            .collect();
        for (var, line) in hoisted {
            self.declared.insert(var);
            self.emit(line);
        }
    }

    fn gen_func_def(&mut self, f: &FuncDef) -> GenResult<()> {
        let sig = self
            .symbol_table
            .get_func(&f.name)
            .cloned()
            .ok_or_else(|| CodegenError::MissingSignature(f.name.clone()))?;

        self.emit(format!("{} {{", sig.declaration()));
        self.indent += 1;
        self.begin_routine(&f.name, sig.params.into_iter().map(|p| p.name));
        self.gen_stmts(&f.body.0)?;
        self.indent -= 1;
        self.emit("}");
        Ok(())
    }

    fn gen_entry(&mut self, program: &Program) -> GenResult<()> {
        self.emit("int main() {");
        self.indent += 1;
        self.begin_routine(ENTRY_FUNCTION, Vec::new());
        for stmt in program.entry_statements() {
            self.gen_stmt(stmt)?;
        }
        self.emit("return 0;");
        self.indent -= 1;
        self.emit("}");
        Ok(())
    }

    fn gen_stmts(&mut self, stmts: &[Stmt]) -> GenResult<()> {
        for stmt in stmts {
            self.gen_stmt(stmt)?;
        }
        Ok(())
    }

    fn gen_nested(&mut self, block: &Block) -> GenResult<()> {
        self.indent += 1;
        let result = self.gen_stmts(&block.0);
        self.indent -= 1;
        result
    }

    fn gen_loop_body(&mut self, block: &Block) -> GenResult<()> {
        self.loop_depth += 1;
        let result = self.gen_nested(block);
        self.loop_depth -= 1;
        result
    }

    fn gen_stmt(&mut self, stmt: &Stmt) -> GenResult<()> {
        match stmt {
            Stmt::Assign(name, value) => self.gen_assign(name, value)?,
            Stmt::IndexAssign(target, index, value) => {
                match self.expr_ty(target) {
                    Ty::IntList | Ty::Unknown => (),
                    ty => return Err(CodegenError::ItemAssignment(ty)),
                }
                check_element(self.expr_ty(value))?;
                let target = self.gen_element(target, index)?;
                let value = self.gen_expr(value)?;
                self.emit(format!("{target} = {value};"));
            }
            Stmt::Print(args) => self.gen_print(args)?,
            Stmt::If(cond, then_block, else_block) => {
                self.gen_if(cond, then_block, else_block.as_ref())?
            }
            Stmt::While(cond, body) => {
                let cond = self.gen_truth(cond)?;
                self.emit(format!("while ({cond}) {{"));
                self.gen_loop_body(body)?;
                self.emit("}");
            }
            Stmt::For(name, Expr::Range(start, end, step), body) => {
                let zero = Expr::Int(0);
                let (start, end) = match end {
                    Some(end) => (&**start, &**end),
                    None => (&zero, &**start),
                };
                self.gen_range_for(name, start, end, step.as_deref(), body)?
            }
            Stmt::For(name, iterable, body) => self.gen_collection_for(name, iterable, body)?,
            Stmt::FuncDef(f) => return Err(CodegenError::NestedFunction(f.name.clone())),
            Stmt::Return(value) => self.gen_return(value.as_ref())?,
            Stmt::Expr(e) => {
                let e = self.gen_expr(e)?;
                self.emit(format!("{e};"));
            }
            Stmt::Pass => (),
            Stmt::Break => self.gen_jump("break")?,
            Stmt::Continue => self.gen_jump("continue")?,
        }
        Ok(())
    }

    /// The first store to a name declares it.
    fn gen_assign(&mut self, name: &str, value: &Expr) -> GenResult<()> {
        let (expected, found) = (self.var_ty(name), self.expr_ty(value));
        if !compatible(expected, found) {
            return Err(CodegenError::Incompatible {
                context: format!("variable '{name}'"),
                expected,
                found,
            });
        }

        let var = cpp_ident(name).into_owned();
        if self.declared.contains(name) {
            let value = self.gen_expr(value)?;
            self.emit(format!("{var} = {value};"));
            return Ok(());
        }

        let ty = self.declaration_type(name, value);
        let value = match value {
            Expr::List(elements) if ty == Ty::IntList.cpp_name() => {
                format!("{{{}}}", self.gen_elements(elements)?)
            }
            _ => self.gen_expr(value)?,
        };
        self.declared.insert(name.to_string());
        self.emit(format!("{ty} {var} = {value};"));
        Ok(())
    }

    /// Literal initializers name their type; other initializers use `auto`
    /// unless later stores widen the variable.
    fn declaration_type(&self, name: &str, value: &Expr) -> &'static str {
        let own = self.expr_ty(value);
        let inferred = self.var_ty(name);
        let literal = matches!(
            value,
            Expr::Int(_) | Expr::Float(_) | Expr::Str(_) | Expr::Bool(_) | Expr::List(_)
        );

        if literal && !inferred.is_known() {
            own.declared_name()
        } else if literal || (inferred.is_known() && inferred != own) {
            inferred.declared_name()
        } else {
            "auto"
        }
    }

    fn gen_print(&mut self, args: &[Expr]) -> GenResult<()> {
        if args.is_empty() {
            self.emit("cout << endl;");
            return Ok(());
        }
        let parts = args
            .iter()
            .map(|arg| {
                let text = self.gen_expr(arg)?;
                Ok(if arg.is_string_producing() {
                    text
                } else {
                    format!("py_str({text})")
                })
            })
            .collect::<GenResult<Vec<_>>>()?;
        self.emit(format!("cout << {} << endl;", parts.join(" << \" \" << ")));
        Ok(())
    }

    fn gen_if(
        &mut self,
        cond: &Expr,
        then_block: &Block,
        else_block: Option<&Block>,
    ) -> GenResult<()> {
        let cond = self.gen_truth(cond)?;
        self.emit(format!("if ({cond}) {{"));
        self.gen_nested(then_block)?;

        let mut else_block = else_block;
        while let Some(block) = else_block {
            if let [Stmt::If(cond, then_block, next)] = block.0.as_slice() {
                let cond = self.gen_truth(cond)?;
                self.emit(format!("}} else if ({cond}) {{"));
                self.gen_nested(then_block)?;
                else_block = next.as_ref();
            } else {
                self.emit("} else {");
                self.gen_nested(block)?;
                break;
            }
        }
        self.emit("}");
        Ok(())
    }

    /// Bounds and step are evaluated once. A loop variable that is stored to
    /// in the body, or outlives the loop, is assigned from a hidden counter
    /// so that it keeps the last item afterwards.
    fn gen_range_for(
        &mut self,
        name: &str,
        start: &Expr,
        end: &Expr,
        step: Option<&Expr>,
        body: &Block,
    ) -> GenResult<()> {
        for bound in [Some(start), Some(end), step].into_iter().flatten() {
            let found = self.expr_ty(bound);
            if !matches!(found, Ty::Int | Ty::Bool | Ty::Unknown) {
                return Err(CodegenError::Incompatible {
                    context: "range() argument".to_string(),
                    expected: Ty::Int,
                    found,
                });
            }
        }

        let var = cpp_ident(name).into_owned();
        let fresh = !self.declared.contains(name);
        let sign = step.map_or(Some(1), Expr::literal_sign).filter(|s| *s != 0);
        let assigned = assigned_names(body);
        let direct = fresh
            && sign.is_some()
            && !assigned.contains(name)
            && is_stable(end, &assigned);

        let start_text = self.gen_expr(start)?;
        let mut end_text = self.gen_expr(end)?;
        let mut step_text = step.map(|s| self.gen_expr(s)).transpose()?;

        let mut init = vec![];
        let counter = if direct {
            var.clone()
        } else {
            let n = self.fresh_suffix(&["i", "end", "step"]);
            if end.literal_sign().is_none() {
                let bound = format!("{HIDDEN_PREFIX}end_{n}");
                init.push(format!("{bound} = {end_text}"));
                end_text = bound;
            }
            if sign.is_none() {
                if let Some(text) = step_text.take() {
                    let stride = format!("{HIDDEN_PREFIX}step_{n}");
                    init.push(format!("{stride} = py_step({text})"));
                    step_text = Some(stride);
                }
            }
            format!("{HIDDEN_PREFIX}i_{n}")
        };
        init.insert(0, format!("{counter} = {start_text}"));

        let (cond, incr) = match (sign, step_text) {
            (_, None) => (format!("{counter} < {end_text}"), format!("{counter}++")),
            (Some(s), Some(step)) if s > 0 => {
                (format!("{counter} < {end_text}"), format!("{counter} += {step}"))
            }
            (Some(_), Some(step)) => {
                (format!("{counter} > {end_text}"), format!("{counter} += {step}"))
            }
            (None, Some(step)) => (
                format!("({step} > 0 ? {counter} < {end_text} : {counter} > {end_text})"),
                format!("{counter} += {step}"),
            ),
        };

        self.emit(format!("for (long long {}; {cond}; {incr}) {{", init.join(", ")));
        if !direct {
            let store = if fresh {
                format!("{} {var} = {counter};", self.var_ty(name).declared_name())
            } else {
                format!("{var} = {counter};")
            };
            self.indent += 1;
            self.emit(store);
            self.indent -= 1;
        }
        if fresh {
            self.declared.insert(name.to_string());
        }
        let result = self.gen_loop_body(body);
        if fresh {
            self.declared.remove(name);
        }
        result?;
        self.emit("}");
        Ok(())
    }

    fn gen_collection_for(&mut self, name: &str, iterable: &Expr, body: &Block) -> GenResult<()> {
        let ty = self.expr_ty(iterable);
        if !matches!(ty, Ty::IntList | Ty::Str | Ty::Unknown) {
            return Err(CodegenError::NotIterable(ty));
        }
        let text = ty == Ty::Str;
        let var = cpp_ident(name).into_owned();
        let fresh = !self.declared.contains(name);

        let mut sequence = self.gen_sequence(iterable)?;
        // Rebinding the iterated name in the body must not disturb the loop.
        if let Expr::Var(source) = iterable {
            if assigned_names(body).contains(source.as_str()) {
                let copy = if text { Ty::Str } else { Ty::IntList };
                sequence = format!("{}({sequence})", copy.cpp_name());
            }
        }

        if fresh && !text {
            let decl = self.var_ty(name).declared_name();
            self.emit(format!("for ({decl} {var} : {sequence}) {{"));
        } else {
            let item = format!("{HIDDEN_PREFIX}item_{}", self.fresh_suffix(&["item"]));
            self.emit(format!("for (auto {item} : {sequence}) {{"));
            let value = if text {
                format!("string(1, {item})")
            } else {
                item
            };
            let store = if fresh {
                format!("{} {var} = {value};", self.var_ty(name).declared_name())
            } else {
                format!("{var} = {value};")
            };
            self.indent += 1;
            self.emit(store);
            self.indent -= 1;
        }

        if fresh {
            self.declared.insert(name.to_string());
        }
        let result = self.gen_loop_body(body);
        if fresh {
            self.declared.remove(name);
        }
        result?;
        self.emit("}");
        Ok(())
    }

    fn gen_return(&mut self, value: Option<&Expr>) -> GenResult<()> {
        if self.routine == ENTRY_FUNCTION {
            self.emit("return 0;");
            return Ok(());
        }
        let ret = self
            .symbol_table
            .get_func(&self.routine)
            .map_or(Ty::Void, |f| f.ret);
        match value {
            Some(e) => {
                let found = self.expr_ty(e);
                if !compatible(ret, found) {
                    return Err(CodegenError::Incompatible {
                        context: format!("return value of '{}'", self.routine),
                        expected: ret,
                        found,
                    });
                }
                let e = self.gen_expr(e)?;
                self.emit(format!("return {e};"));
            }
            None if ret == Ty::Void => self.emit("return;"),
            None => self.emit("return {};"),
        }
        Ok(())
    }

    fn gen_jump(&mut self, keyword: &'static str) -> GenResult<()> {
        if self.loop_depth == 0 {
            return Err(CodegenError::OutsideLoop(keyword));
        }
        self.emit(format!("{keyword};"));
        Ok(())
    }

    fn is_param(&self, name: &str) -> bool {
        self.symbol_table
            .get_func(&self.routine)
            .is_some_and(|f| f.params.iter().any(|p| p.name == name))
    }

    fn is_variable(&self, name: &str) -> bool {
        self.symbol_table.local(&self.routine, name).is_some() || self.is_param(name)
    }

    /// Next suffix under which none of `stems` names a variable of the routine.
    fn fresh_suffix(&mut self, stems: &[&str]) -> usize {
        loop {
            let n = self.hidden_count;
            self.hidden_count += 1;
            if !stems
                .iter()
                .any(|stem| self.is_variable(&format!("{HIDDEN_PREFIX}{stem}_{n}")))
            {
                return n;
            }
        }
    }

    fn var_ty(&self, name: &str) -> Ty {
        if let Some(local) = self.symbol_table.local(&self.routine, name) {
            return local.ty;
        }
        self.symbol_table
            .get_func(&self.routine)
            .and_then(|f| f.params.iter().find(|p| p.name == name))
            .map_or(Ty::Unknown, |p| p.ty)
    }

    fn expr_ty(&self, expr: &Expr) -> Ty {
        self.symbol_table
            .expr_ty(expr, &|name: &str| self.var_ty(name))
    }

    fn gen_args(&self, args: &[Expr]) -> GenResult<String> {
        let args = args
            .iter()
            .map(|a| self.gen_expr(a))
            .collect::<GenResult<Vec<_>>>()?;
        Ok(args.join(", "))
    }

    fn gen_elements(&self, elements: &[Expr]) -> GenResult<String> {
        for e in elements {
            check_element(self.expr_ty(e))?;
        }
        self.gen_args(elements)
    }

    /// `expr` as a condition; text and lists are true when non-empty.
    fn gen_truth(&self, expr: &Expr) -> GenResult<String> {
        let text = self.gen_expr(expr)?;
        Ok(if self.expr_ty(expr).is_sequence() {
            format!("py_truthy({text})")
        } else {
            text
        })
    }

    /// Operand of a prefix or postfix operator.
    fn gen_atom(&self, expr: &Expr) -> GenResult<String> {
        let text = self.gen_expr(expr)?;
        Ok(match expr {
            Expr::Binary(_, _, _) | Expr::Unary(_, _) => format!("({text})"),
            _ => text,
        })
    }

    /// A list or string value with members, e.g. `.size()`.
    fn gen_sequence(&self, expr: &Expr) -> GenResult<String> {
        match expr {
            Expr::Str(_) => Ok(format!("string({})", self.gen_expr(expr)?)),
            _ => self.gen_atom(expr),
        }
    }

    /// Binary nodes emitted as a helper call, which need no grouping.
    fn emits_call(&self, expr: &Expr) -> bool {
        let Expr::Binary(kind, l, r) = expr else {
            return false;
        };
        match kind {
            BinOpKind::FloorDiv | BinOpKind::Mod => true,
            BinOpKind::Add => self.expr_ty(l) == Ty::IntList,
            BinOpKind::Mul => self.expr_ty(l).is_sequence() || self.expr_ty(r).is_sequence(),
            _ => false,
        }
    }

    /// Operand of a binary operator of strength `parent`. Comparisons never
    /// chain in C++ the way the tree means them, so they are always grouped.
    fn gen_operand(&self, expr: &Expr, parent: u8, right: bool) -> GenResult<String> {
        let grouped = match expr {
            Expr::Binary(kind, _, _) if !self.emits_call(expr) => {
                let p = kind.precedence();
                p < parent || (p == parent && (right || kind.is_comparison()))
            }
            _ => false,
        };
        let text = self.gen_expr(expr)?;
        Ok(if grouped { format!("({text})") } else { text })
    }

    /// Element access, bounds-checked and counting from the end when the
    /// index is negative.
    fn gen_element(&self, target: &Expr, index: &Expr) -> GenResult<String> {
        match self.expr_ty(target) {
            Ty::IntList | Ty::Str | Ty::Unknown => (),
            ty => return Err(CodegenError::NotSubscriptable(ty)),
        }
        let found = self.expr_ty(index);
        if !matches!(found, Ty::Int | Ty::Bool | Ty::Unknown) {
            return Err(CodegenError::Incompatible {
                context: "index".to_string(),
                expected: Ty::Int,
                found,
            });
        }
        Ok(format!(
            "py_index({}, {})",
            self.gen_sequence(target)?,
            self.gen_expr(index)?
        ))
    }

    fn gen_call(&self, name: &str, args: &[Expr]) -> GenResult<String> {
        if name == STR_BUILTIN {
            return match args {
                [] => Ok("string()".to_string()),
                [arg] => Ok(format!("py_str({})", self.gen_expr(arg)?)),
                _ => Err(CodegenError::WrongArgumentCount {
                    name: name.to_string(),
                    expected: 1,
                    given: args.len(),
                }),
            };
        }

        let sig = self
            .symbol_table
            .get_func(name)
            .ok_or_else(|| CodegenError::Undefined(name.to_string()))?;
        if sig.params.len() != args.len() {
            return Err(CodegenError::WrongArgumentCount {
                name: name.to_string(),
                expected: sig.params.len(),
                given: args.len(),
            });
        }

        let mut parts = vec![];
        for (param, arg) in sig.params.iter().zip(args) {
            let found = self.expr_ty(arg);
            if !compatible(param.ty, found) {
                return Err(CodegenError::Incompatible {
                    context: format!("argument '{}' of '{name}'", param.name),
                    expected: param.ty,
                    found,
                });
            }
            let text = self.gen_expr(arg)?;
            // A mutable reference parameter also accepts a list built in place.
            if param.mode == ParamMode::MutRef && !matches!(arg, Expr::Var(_)) {
                parts.push(format!("py_lvalue({text})"));
            } else {
                parts.push(text);
            }
        }
        Ok(format!("{}({})", cpp_ident(name), parts.join(", ")))
    }

    fn gen_expr(&self, expr: &Expr) -> GenResult<String> {
        Ok(match expr {
            Expr::Int(n) if i32::try_from(*n).is_ok() => n.to_string(),
            Expr::Int(n) => format!("{n}LL"),
            Expr::Float(x) => format!("{x:?}"),
            Expr::Str(s) => cpp_string_literal(s),
            Expr::Bool(b) => b.to_string(),
            Expr::Var(name) if self.is_variable(name) => cpp_ident(name).into_owned(),
            Expr::Var(name) => return Err(CodegenError::Undefined(name.clone())),
            Expr::Binary(kind, l, r) => self.gen_binary(*kind, l, r)?,
            Expr::Unary(kind, e) => self.gen_unary(*kind, e)?,
            Expr::List(elements) => {
                format!("vector<long long>{{{}}}", self.gen_elements(elements)?)
            }
            Expr::Index(target, index) => {
                let element = self.gen_element(target, index)?;
                if self.expr_ty(target) == Ty::Str {
                    format!("string(1, {element})")
                } else {
                    element
                }
            }
            Expr::Call(name, args) => self.gen_call(name, args)?,
            Expr::Len(e) => match self.expr_ty(e) {
                Ty::IntList | Ty::Str | Ty::Unknown => {
                    format!("static_cast<long long>({}.size())", self.gen_sequence(e)?)
                }
                ty => return Err(CodegenError::NoLen(ty)),
            },
            Expr::Range(start, end, step) => {
                let step = match step {
                    Some(s) => self.gen_expr(s)?,
                    None => "1".to_string(),
                };
                match end {
                    Some(end) => format!(
                        "py_range({}, {}, {})",
                        self.gen_expr(start)?,
                        self.gen_expr(end)?,
                        step
                    ),
                    None => format!("py_range(0, {}, {})", self.gen_expr(start)?, step),
                }
            }
        })
    }

    fn gen_unary(&self, kind: UnaryOpKind, e: &Expr) -> GenResult<String> {
        let ty = self.expr_ty(e);
        match kind {
            UnaryOpKind::Not if ty.is_sequence() => {
                Ok(format!("!py_truthy({})", self.gen_expr(e)?))
            }
            UnaryOpKind::Not => Ok(format!("!{}", self.gen_atom(e)?)),
            _ if ty.is_numeric() => Ok(format!("{}{}", kind.cpp_symbol(), self.gen_atom(e)?)),
            _ => Err(CodegenError::UnsupportedOperand {
                op: kind.python_symbol(),
                operand: ty,
            }),
        }
    }

    fn gen_binary(&self, kind: BinOpKind, l: &Expr, r: &Expr) -> GenResult<String> {
        let (lt, rt) = (self.expr_ty(l), self.expr_ty(r));
        let unsupported = || CodegenError::UnsupportedOperands {
            op: kind.python_symbol(),
            left: lt,
            right: rt,
        };
        let numeric = lt.is_numeric() && rt.is_numeric();
        let float = lt == Ty::Float || rt == Ty::Float;
        let p = kind.precedence();

        match kind {
            BinOpKind::And | BinOpKind::Or => {
                let ls = self.gen_condition_operand(l, p, false)?;
                let rs = self.gen_condition_operand(r, p, true)?;
                Ok(format!("{ls} {} {rs}", kind.cpp_symbol()))
            }
            _ if kind.is_comparison() => {
                if numeric || lt == rt {
                    self.gen_infix(kind, l, r)
                } else {
                    Err(unsupported())
                }
            }
            BinOpKind::Add => match (lt, rt) {
                (Ty::IntList, Ty::IntList) => Ok(format!(
                    "py_concat({}, {})",
                    self.gen_expr(l)?,
                    self.gen_expr(r)?
                )),
                (Ty::Str, Ty::Str) => self.gen_infix(kind, l, r),
                _ if numeric => self.gen_infix(kind, l, r),
                _ => Err(unsupported()),
            },
            BinOpKind::Mul => match (lt, rt) {
                (Ty::IntList | Ty::Str, n) if is_count(n) => Ok(format!(
                    "py_repeat({}, {})",
                    self.gen_expr(l)?,
                    self.gen_expr(r)?
                )),
                (n, Ty::IntList | Ty::Str) if is_count(n) => Ok(format!(
                    "py_repeat({}, {})",
                    self.gen_expr(r)?,
                    self.gen_expr(l)?
                )),
                _ if numeric => self.gen_infix(kind, l, r),
                _ => Err(unsupported()),
            },
            _ if !numeric => Err(unsupported()),
            BinOpKind::Div => Ok(format!(
                "static_cast<double>({}) / {}",
                self.gen_expr(l)?,
                self.gen_operand(r, p, true)?
            )),
            BinOpKind::FloorDiv if float => Ok(format!(
                "floor({} / {})",
                self.gen_operand(l, p, false)?,
                self.gen_operand(r, p, true)?
            )),
            BinOpKind::FloorDiv => Ok(format!(
                "py_floordiv({}, {})",
                self.gen_expr(l)?,
                self.gen_expr(r)?
            )),
            BinOpKind::Mod if float => Ok(format!(
                "py_fmod({}, {})",
                self.gen_expr(l)?,
                self.gen_expr(r)?
            )),
            BinOpKind::Mod => Ok(format!(
                "py_mod({}, {})",
                self.gen_expr(l)?,
                self.gen_expr(r)?
            )),
            _ => self.gen_infix(kind, l, r),
        }
    }

    /// `l op r` with C++'s own operator. A string literal on the left becomes
    /// a `string` so that `+` and comparisons act on text, not pointers.
    fn gen_infix(&self, kind: BinOpKind, l: &Expr, r: &Expr) -> GenResult<String> {
        let p = kind.precedence();
        let mut ls = self.gen_operand(l, p, false)?;
        if matches!(l, Expr::Str(_)) {
            ls = format!("string({ls})");
        }
        let rs = self.gen_operand(r, p, true)?;
        Ok(format!("{ls} {} {rs}", kind.cpp_symbol()))
    }

    fn gen_condition_operand(&self, expr: &Expr, parent: u8, right: bool) -> GenResult<String> {
        if self.expr_ty(expr).is_sequence() {
            Ok(format!("py_truthy({})", self.gen_expr(expr)?))
        } else {
            self.gen_operand(expr, parent, right)
        }
    }
}

/// Whether a value of type `found` may be stored where `expected` is held.
fn compatible(expected: Ty, found: Ty) -> bool {
    expected == found
        || !expected.is_known()
        || !found.is_known()
        || (expected.is_numeric() && found.is_numeric())
}

/// Right operand of a sequence repetition.
fn is_count(ty: Ty) -> bool {
    matches!(ty, Ty::Int | Ty::Bool | Ty::Unknown)
}

fn check_element(ty: Ty) -> GenResult<()> {
    if is_count(ty) {
        Ok(())
    } else {
        Err(CodegenError::UnsupportedElement(ty))
    }
}

/// Names stored to anywhere in `block`, nested blocks included.
fn assigned_names(block: &Block) -> HashSet<&str> {
    fn collect<'a>(block: &'a Block, names: &mut HashSet<&'a str>) {
        for stmt in &block.0 {
            match stmt {
                Stmt::Assign(name, _) => {
                    names.insert(name.as_str());
                }
                Stmt::For(name, _, body) => {
                    names.insert(name.as_str());
                    collect(body, names);
                }
                Stmt::If(_, then_block, else_block) => {
                    collect(then_block, names);
                    if let Some(block) = else_block {
                        collect(block, names);
                    }
                }
                Stmt::While(_, body) => collect(body, names),
                _ => (),
            }
        }
    }

    let mut names = HashSet::new();
    collect(block, &mut names);
    names
}

/// Has the same value on every pass through a loop whose body stores only
/// to `assigned`.
fn is_stable(expr: &Expr, assigned: &HashSet<&str>) -> bool {
    match expr {
        Expr::Int(_) | Expr::Float(_) | Expr::Bool(_) => true,
        Expr::Var(name) => !assigned.contains(name.as_str()),
        Expr::Unary(_, e) | Expr::Len(e) => is_stable(e, assigned),
        Expr::Binary(_, l, r) => is_stable(l, assigned) && is_stable(r, assigned),
        _ => false,
    }
}

/// Escapes are passed through as written; bare double quotes are escaped.
fn cpp_string_literal(s: &str) -> String {
    let mut out = String::from("\"");
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                out.push('\\');
                out.extend(chars.next());
            }
            '"' => out.push_str("\\\""),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}
