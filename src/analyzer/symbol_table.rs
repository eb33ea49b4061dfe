use std::collections::{BTreeMap, HashMap};

use crate::codegen::cpp_ident;
use crate::error::CodegenError;
use crate::parser::{BinOpKind, Expr, UnaryOpKind, STR_BUILTIN};

use super::Ty;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParamMode {
    Value,
    ConstRef,
    MutRef,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Param {
    pub name: String,
    pub ty: Ty,
    pub mode: ParamMode,
    /// Elements are stored through this parameter, directly or by a callee.
    pub mutated: bool,
    /// The parameter itself is rebound in the body.
    pub reassigned: bool,
}

impl Param {
    pub fn new(name: String) -> Self {
        Self {
            name,
            ty: Ty::Unknown,
            mode: ParamMode::Value,
            mutated: false,
            reassigned: false,
        }
    }

    pub fn declaration(&self) -> String {
        let (ty, name) = (self.ty.declared_name(), cpp_ident(&self.name));
        match self.mode {
            ParamMode::Value => format!("{ty} {name}"),
            ParamMode::ConstRef => format!("const {ty}& {name}"),
            ParamMode::MutRef => format!("{ty}& {name}"),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct FuncSig {
    pub name: String,
    pub params: Vec<Param>,
    pub ret: Ty,
}

impl FuncSig {
    /// `long long partition(vector<long long>& arr, long long low, long long high)`
    pub fn declaration(&self) -> String {
        let params: Vec<_> = self.params.iter().map(Param::declaration).collect();
        let ret = match self.ret {
            Ty::Void => "void",
            t => t.declared_name(),
        };
        format!("{} {}({})", ret, cpp_ident(&self.name), params.join(", "))
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LocalVar {
    pub ty: Ty,
    /// Declared at the top of its routine instead of at the first store.
    pub hoisted: bool,
}

#[derive(Clone, Debug, Default)]
pub struct SymbolTable {
    functions: HashMap<String, FuncSig>,
    order: Vec<String>,
    locals: HashMap<String, BTreeMap<String, LocalVar>>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn declare_func(&mut self, sig: FuncSig) -> Result<(), CodegenError> {
        if self.functions.contains_key(&sig.name) {
            return Err(CodegenError::DuplicateFunction(sig.name));
        }
        self.order.push(sig.name.clone());
        self.functions.insert(sig.name.clone(), sig);
        Ok(())
    }

    pub fn get_func(&self, name: &str) -> Option<&FuncSig> {
        self.functions.get(name)
    }

    pub(super) fn get_func_mut(&mut self, name: &str) -> Option<&mut FuncSig> {
        self.functions.get_mut(name)
    }

    /// Signatures in definition order.
    pub fn functions(&self) -> impl Iterator<Item = &FuncSig> {
        self.order.iter().filter_map(|name| self.functions.get(name))
    }

    /// Joins `ty` into the type of parameter `index`. Returns whether it changed.
    pub fn refine_param(&mut self, func: &str, index: usize, ty: Ty) -> bool {
        let Some(param) = self
            .functions
            .get_mut(func)
            .and_then(|f| f.params.get_mut(index))
        else {
            return false;
        };
        let joined = param.ty.join(ty);
        let changed = joined != param.ty;
        param.ty = joined;
        changed
    }

    pub fn refine_return(&mut self, func: &str, ty: Ty) -> bool {
        let Some(sig) = self.functions.get_mut(func) else {
            return false;
        };
        if sig.ret == Ty::Void {
            return false;
        }
        let joined = sig.ret.join(ty);
        let changed = joined != sig.ret;
        sig.ret = joined;
        changed
    }

    pub fn set_locals(&mut self, routine: &str, locals: BTreeMap<String, LocalVar>) {
        self.locals.insert(routine.to_string(), locals);
    }

    pub fn locals(&self, routine: &str) -> Option<&BTreeMap<String, LocalVar>> {
        self.locals.get(routine)
    }

    pub fn local(&self, routine: &str, name: &str) -> Option<&LocalVar> {
        self.locals.get(routine).and_then(|l| l.get(name))
    }

    /// Variables of `routine` declared up front, sorted by name.
    pub fn hoisted(&self, routine: &str) -> impl Iterator<Item = (&String, &LocalVar)> {
        self.locals
            .get(routine)
            .into_iter()
            .flat_map(|l| l.iter())
            .filter(|(_, v)| v.hoisted)
    }

    /// Resolves what inference left open: untyped parameters and results
    /// become `long long`, sequences are passed by reference unless rebound.
    pub fn finalize_signatures(&mut self) {
        for sig in self.functions.values_mut() {
            for param in sig.params.iter_mut() {
                if !param.ty.is_known() {
                    param.ty = Ty::Int;
                }
                param.mode = match param.ty {
                    Ty::IntList | Ty::Str if param.reassigned => ParamMode::Value,
                    Ty::IntList if param.mutated => ParamMode::MutRef,
                    Ty::IntList | Ty::Str => ParamMode::ConstRef,
                    _ => ParamMode::Value,
                };
            }
            if !sig.ret.is_known() {
                sig.ret = Ty::Int;
            }
        }
    }

    /// Type of `expr`, looking variables up through `lookup`.
    pub fn expr_ty(&self, expr: &Expr, lookup: &dyn Fn(&str) -> Ty) -> Ty {
        match expr {
            Expr::Int(_) | Expr::Len(_) => Ty::Int,
            Expr::Index(target, _) => match self.expr_ty(target, lookup) {
                Ty::Str => Ty::Str,
                _ => Ty::Int,
            },
            Expr::Float(_) => Ty::Float,
            Expr::Str(_) => Ty::Str,
            Expr::Bool(_) => Ty::Bool,
            Expr::Var(name) => lookup(name),
            Expr::Binary(kind, l, r) => {
                if kind.is_comparison() || kind.is_logical() {
                    return Ty::Bool;
                }
                if *kind == BinOpKind::Div {
                    return Ty::Float;
                }
                Ty::arithmetic(self.expr_ty(l, lookup), self.expr_ty(r, lookup))
            }
            Expr::Unary(UnaryOpKind::Not, _) => Ty::Bool,
            Expr::Unary(_, e) => match self.expr_ty(e, lookup) {
                Ty::Bool => Ty::Int,
                t => t,
            },
            Expr::List(_) | Expr::Range(_, _, _) => Ty::IntList,
            Expr::Call(name, _) if name == STR_BUILTIN => Ty::Str,
            Expr::Call(name, _) => self.get_func(name).map_or(Ty::Unknown, |f| f.ret),
        }
    }
}
