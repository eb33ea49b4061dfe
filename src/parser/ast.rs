use super::{BinOpKind, Expr};

/// Name of the function whose body becomes the C++ entry point.
pub const ENTRY_FUNCTION: &str = "main";

#[derive(Clone, Debug, PartialEq)]
pub struct Program(pub Vec<Stmt>);

#[derive(Clone, Debug, PartialEq)]
pub struct Block(pub Vec<Stmt>);

#[derive(Clone, Debug, PartialEq)]
pub struct FuncDef {
    pub name: String,
    pub params: Vec<String>,
    pub body: Block,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Stmt {
    Assign(String, Expr),
    IndexAssign(Expr, Expr, Expr),
    Print(Vec<Expr>),
    If(Expr, Block, Option<Block>),
    While(Expr, Block),
    For(String, Expr, Block),
    FuncDef(FuncDef),
    Return(Option<Expr>),
    Expr(Expr),
    Pass,
    Break,
    Continue,
}

impl Program {
    /// Top-level function definitions in source order.
    pub fn functions(&self) -> impl Iterator<Item = &FuncDef> {
        self.0.iter().filter_map(|s| match s {
            Stmt::FuncDef(f) => Some(f),
            _ => None,
        })
    }

    pub fn entry_function(&self) -> Option<&FuncDef> {
        self.functions().find(|f| f.name == ENTRY_FUNCTION)
    }

    /// Statements of the program entry point.
    ///
    /// Free top-level statements run in order. The `if __name__ == "__main__"`
    /// guard is replaced by its body and the first `main()` call by the body
    /// of `def main()`, which is appended at the end when never called.
    pub fn entry_statements(&self) -> Vec<&Stmt> {
        let main_body = self.entry_function().map(|f| &f.body);
        let mut out = vec![];
        let mut spliced = false;
        splice_entry(&self.0, main_body, &mut spliced, &mut out);
        if let (false, Some(body)) = (spliced, main_body) {
            out.extend(body.0.iter());
        }
        out
    }
}

fn splice_entry<'a>(
    stmts: &'a [Stmt],
    main_body: Option<&'a Block>,
    spliced: &mut bool,
    out: &mut Vec<&'a Stmt>,
) {
    for stmt in stmts {
        match stmt {
            Stmt::FuncDef(_) => (),
            Stmt::If(cond, then_block, _) if is_entry_guard(cond) => {
                splice_entry(&then_block.0, main_body, spliced, out)
            }
            Stmt::Expr(Expr::Call(name, args))
                if name == ENTRY_FUNCTION && args.is_empty() && main_body.is_some() =>
            {
                if let (false, Some(body)) = (*spliced, main_body) {
                    out.extend(body.0.iter());
                    *spliced = true;
                }
            }
            s => out.push(s),
        }
    }
}

fn is_entry_guard(cond: &Expr) -> bool {
    let Expr::Binary(BinOpKind::Equal, l, r) = cond else {
        return false;
    };
    matches!((&**l, &**r), (Expr::Var(n), _) | (_, Expr::Var(n)) if n == "__name__")
}
