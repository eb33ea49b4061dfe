#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinOpKind {
    Or,
    And,
    Equal,
    NotEqual,
    LessThan,
    LessEqual,
    GreaterThan,
    GreaterEqual,
    Add,
    Sub,
    Mul,
    Div,
    FloorDiv,
    Mod,
}

impl BinOpKind {
    /// Operator spelling in the emitted C++.
    pub fn cpp_symbol(&self) -> &'static str {
        match self {
            BinOpKind::Or => "||",
            BinOpKind::And => "&&",
            BinOpKind::Equal => "==",
            BinOpKind::NotEqual => "!=",
            BinOpKind::LessThan => "<",
            BinOpKind::LessEqual => "<=",
            BinOpKind::GreaterThan => ">",
            BinOpKind::GreaterEqual => ">=",
            BinOpKind::Add => "+",
            BinOpKind::Sub => "-",
            BinOpKind::Mul => "*",
            BinOpKind::Div | BinOpKind::FloorDiv => "/",
            BinOpKind::Mod => "%",
        }
    }

    pub fn python_symbol(&self) -> &'static str {
        match self {
            BinOpKind::Or => "or",
            BinOpKind::And => "and",
            BinOpKind::FloorDiv => "//",
            _ => self.cpp_symbol(),
        }
    }

    /// Binding strength, higher binds tighter. Matches both languages for
    /// the operators in this enum.
    pub fn precedence(&self) -> u8 {
        match self {
            BinOpKind::Or => 1,
            BinOpKind::And => 2,
            BinOpKind::Equal
            | BinOpKind::NotEqual
            | BinOpKind::LessThan
            | BinOpKind::LessEqual
            | BinOpKind::GreaterThan
            | BinOpKind::GreaterEqual => 3,
            BinOpKind::Add | BinOpKind::Sub => 4,
            BinOpKind::Mul | BinOpKind::Div | BinOpKind::FloorDiv | BinOpKind::Mod => 5,
        }
    }

    pub fn is_comparison(&self) -> bool {
        matches!(
            self,
            BinOpKind::Equal
                | BinOpKind::NotEqual
                | BinOpKind::LessThan
                | BinOpKind::LessEqual
                | BinOpKind::GreaterThan
                | BinOpKind::GreaterEqual
        )
    }

    pub fn is_logical(&self) -> bool {
        matches!(self, BinOpKind::Or | BinOpKind::And)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnaryOpKind {
    Plus,
    Neg,
    Not,
}

impl UnaryOpKind {
    pub fn cpp_symbol(&self) -> &'static str {
        match self {
            UnaryOpKind::Plus => "+",
            UnaryOpKind::Neg => "-",
            UnaryOpKind::Not => "!",
        }
    }

    pub fn python_symbol(&self) -> &'static str {
        match self {
            UnaryOpKind::Not => "not",
            _ => self.cpp_symbol(),
        }
    }
}

/// Name of the to-string coercion inserted around `+` operands.
pub const STR_BUILTIN: &str = "str";

#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    Int(i64),
    Float(f64),
    Str(String),
    Bool(bool),
    Var(String),

    Binary(BinOpKind, Box<Expr>, Box<Expr>),
    Unary(UnaryOpKind, Box<Expr>),

    List(Vec<Expr>),
    Index(Box<Expr>, Box<Expr>),
    Call(String, Vec<Expr>),
    Len(Box<Expr>),
    /// `range(start, end, step)`; the parser always fills `end`.
    Range(Box<Expr>, Option<Box<Expr>>, Option<Box<Expr>>),
}

impl Expr {
    pub fn var(name: impl Into<String>) -> Self {
        Expr::Var(name.into())
    }

    pub fn binary(kind: BinOpKind, left: Expr, right: Expr) -> Self {
        Expr::Binary(kind, Box::new(left), Box::new(right))
    }

    /// Statically known to evaluate to text.
    pub fn is_string_producing(&self) -> bool {
        match self {
            Expr::Str(_) => true,
            Expr::Call(name, _) => name == STR_BUILTIN,
            Expr::Binary(BinOpKind::Add, l, r) => {
                l.is_string_producing() || r.is_string_producing()
            }
            _ => false,
        }
    }

    /// Wraps the expression in a `str()` call unless it already yields text.
    pub fn into_string(self) -> Expr {
        if self.is_string_producing() {
            self
        } else {
            Expr::Call(STR_BUILTIN.to_string(), vec![self])
        }
    }

    /// Sign of an integer literal, looking through unary `+`/`-`.
    pub fn literal_sign(&self) -> Option<i64> {
        match self {
            Expr::Int(n) => Some(n.signum()),
            Expr::Unary(UnaryOpKind::Plus, e) => e.literal_sign(),
            Expr::Unary(UnaryOpKind::Neg, e) => e.literal_sign().map(|s| -s),
            _ => None,
        }
    }
}
