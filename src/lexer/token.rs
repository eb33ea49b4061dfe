use std::fmt;

use phf::phf_map;

pub static KEYWORDS: phf::Map<&'static str, TokenKind> = phf_map! {
    "def" => TokenKind::Def,
    "if" => TokenKind::If,
    "elif" => TokenKind::Elif,
    "else" => TokenKind::Else,
    "while" => TokenKind::While,
    "for" => TokenKind::For,
    "in" => TokenKind::In,
    "return" => TokenKind::Return,
    "print" => TokenKind::Print,
    "and" => TokenKind::And,
    "or" => TokenKind::Or,
    "not" => TokenKind::Not,
    "pass" => TokenKind::Pass,
    "break" => TokenKind::Break,
    "continue" => TokenKind::Continue,
    "True" => TokenKind::Bool(true),
    "False" => TokenKind::Bool(false),
};

pub static THREE_SYMBOLS_TOKENS: phf::Map<&'static str, TokenKind> = phf_map! {
    "//=" => TokenKind::DoubleSlashEqual,
};

pub static TWO_SYMBOLS_TOKENS: phf::Map<&'static str, TokenKind> = phf_map! {
    "+=" => TokenKind::PlusEqual,
    "-=" => TokenKind::MinusEqual,
    "*=" => TokenKind::StarEqual,
    "/=" => TokenKind::SlashEqual,
    "%=" => TokenKind::PercentEqual,
    "//" => TokenKind::DoubleSlash,
    "==" => TokenKind::DoubleEqual,
    "!=" => TokenKind::NotEqual,
    "<=" => TokenKind::LessEqual,
    ">=" => TokenKind::GreaterEqual,
};

pub static ONE_SYMBOL_TOKENS: phf::Map<char, TokenKind> = phf_map! {
    '+' => TokenKind::Plus,
    '-' => TokenKind::Minus,
    '*' => TokenKind::Star,
    '/' => TokenKind::Slash,
    '%' => TokenKind::Percent,
    '=' => TokenKind::Equal,
    '<' => TokenKind::LessThan,
    '>' => TokenKind::GreaterThan,
    '(' => TokenKind::OpenParen,
    ')' => TokenKind::CloseParen,
    '[' => TokenKind::OpenSquareBrace,
    ']' => TokenKind::CloseSquareBrace,
    ',' => TokenKind::Comma,
    ':' => TokenKind::Colon,
    ';' => TokenKind::SemiColon,
};

#[derive(Clone, Debug, PartialEq)]
pub enum TokenKind {
    Int(i64),
    Float(f64),
    Str(String),
    Bool(bool),
    Ident(String),

    Def,
    If,
    Elif,
    Else,
    While,
    For,
    In,
    Return,
    Print,
    And,
    Or,
    Not,
    Pass,
    Break,
    Continue,

    Plus,
    Minus,
    Star,
    Slash,
    DoubleSlash,
    Percent,

    Equal,
    PlusEqual,
    MinusEqual,
    StarEqual,
    SlashEqual,
    DoubleSlashEqual,
    PercentEqual,

    DoubleEqual,
    NotEqual,
    LessThan,
    LessEqual,
    GreaterThan,
    GreaterEqual,

    OpenParen,
    CloseParen,
    OpenSquareBrace,
    CloseSquareBrace,
    Comma,
    Colon,
    SemiColon,

    Newline,
    Indent,
    Dedent,
    Eof,
}

impl TokenKind {
    /// Source text of keywords, operators and delimiters.
    pub fn lexeme(&self) -> Option<&'static str> {
        let s = match self {
            TokenKind::Int(_)
            | TokenKind::Float(_)
            | TokenKind::Str(_)
            | TokenKind::Bool(_)
            | TokenKind::Ident(_)
            | TokenKind::Newline
            | TokenKind::Indent
            | TokenKind::Dedent
            | TokenKind::Eof => return None,

            TokenKind::Def => "def",
            TokenKind::If => "if",
            TokenKind::Elif => "elif",
            TokenKind::Else => "else",
            TokenKind::While => "while",
            TokenKind::For => "for",
            TokenKind::In => "in",
            TokenKind::Return => "return",
            TokenKind::Print => "print",
            TokenKind::And => "and",
            TokenKind::Or => "or",
            TokenKind::Not => "not",
            TokenKind::Pass => "pass",
            TokenKind::Break => "break",
            TokenKind::Continue => "continue",

            TokenKind::Plus => "+",
            TokenKind::Minus => "-",
            TokenKind::Star => "*",
            TokenKind::Slash => "/",
            TokenKind::DoubleSlash => "//",
            TokenKind::Percent => "%",

            TokenKind::Equal => "=",
            TokenKind::PlusEqual => "+=",
            TokenKind::MinusEqual => "-=",
            TokenKind::StarEqual => "*=",
            TokenKind::SlashEqual => "/=",
            TokenKind::DoubleSlashEqual => "//=",
            TokenKind::PercentEqual => "%=",

            TokenKind::DoubleEqual => "==",
            TokenKind::NotEqual => "!=",
            TokenKind::LessThan => "<",
            TokenKind::LessEqual => "<=",
            TokenKind::GreaterThan => ">",
            TokenKind::GreaterEqual => ">=",

            TokenKind::OpenParen => "(",
            TokenKind::CloseParen => ")",
            TokenKind::OpenSquareBrace => "[",
            TokenKind::CloseSquareBrace => "]",
            TokenKind::Comma => ",",
            TokenKind::Colon => ":",
            TokenKind::SemiColon => ";",
        };
        Some(s)
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Int(n) => write!(f, "integer {n}"),
            TokenKind::Float(x) => write!(f, "float {x:?}"),
            TokenKind::Str(s) => write!(f, "string '{s}'"),
            TokenKind::Bool(true) => write!(f, "'True'"),
            TokenKind::Bool(false) => write!(f, "'False'"),
            TokenKind::Ident(name) => write!(f, "identifier '{name}'"),
            TokenKind::Newline => write!(f, "newline"),
            TokenKind::Indent => write!(f, "indent"),
            TokenKind::Dedent => write!(f, "dedent"),
            TokenKind::Eof => write!(f, "end of input"),
            other => write!(f, "'{}'", other.lexeme().unwrap_or("?")),
        }
    }
}
