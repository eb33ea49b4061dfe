//! Typed failures for each stage of the pipeline.
//!
//! Every stage fails fast: nothing is recovered locally, and the first error
//! aborts the whole compilation unit.

use thiserror::Error;

use crate::analyzer::Ty;
use crate::lexer::Token;

#[derive(Clone, Debug, Error, PartialEq)]
pub enum LexError {
    #[error("unexpected character '{character}' at line {line}, column {column}")]
    UnexpectedCharacter {
        character: char,
        line: usize,
        column: usize,
    },
    #[error("unterminated string literal at line {line}, column {column}")]
    UnterminatedString { line: usize, column: usize },
    #[error("unindent does not match any outer indentation level at line {line}, column {column}")]
    InconsistentDedent { line: usize, column: usize },
    #[error("invalid numeric literal '{literal}' at line {line}, column {column}")]
    InvalidNumber {
        literal: String,
        line: usize,
        column: usize,
    },
}

impl LexError {
    /// Line and column where scanning stopped.
    pub fn position(&self) -> (usize, usize) {
        match self {
            LexError::UnexpectedCharacter { line, column, .. }
            | LexError::UnterminatedString { line, column }
            | LexError::InconsistentDedent { line, column }
            | LexError::InvalidNumber { line, column, .. } => (*line, *column),
        }
    }
}

#[derive(Clone, Debug, Error, PartialEq)]
pub enum SyntaxError {
    #[error("expected {expected}, found {found}")]
    Unexpected { expected: String, found: Token },
    #[error("nested function definitions are not supported, found {found}")]
    NestedFunction { found: Token },
    #[error("cannot assign to expression starting with {found}")]
    InvalidTarget { found: Token },
    #[error("'return' outside function, found {found}")]
    ReturnOutsideFunction { found: Token },
    #[error("{name}() takes {expected} argument(s) but {given} were given, at {found}")]
    WrongArity {
        name: String,
        expected: &'static str,
        given: usize,
        found: Token,
    },
    #[error("cannot unpack {values} value(s) into {targets} target(s), at {found}")]
    UnbalancedAssignment {
        targets: usize,
        values: usize,
        found: Token,
    },
}

impl SyntaxError {
    /// The token the parser stopped at.
    pub fn token(&self) -> &Token {
        match self {
            SyntaxError::Unexpected { found, .. }
            | SyntaxError::NestedFunction { found }
            | SyntaxError::InvalidTarget { found }
            | SyntaxError::ReturnOutsideFunction { found }
            | SyntaxError::WrongArity { found, .. }
            | SyntaxError::UnbalancedAssignment { found, .. } => found,
        }
    }
}

#[derive(Clone, Debug, Error, PartialEq)]
pub enum CodegenError {
    #[error("function '{0}' is defined more than once")]
    DuplicateFunction(String),
    #[error("entry function 'main' must not take parameters")]
    EntryParameters,
    #[error("function '{0}' must be defined at the top level")]
    NestedFunction(String),
    #[error("'{0}' outside loop")]
    OutsideLoop(&'static str),
    #[error("no signature recorded for function '{0}'")]
    MissingSignature(String),
    #[error("unsupported operand type(s) for {op}: '{left}' and '{right}'")]
    UnsupportedOperands {
        op: &'static str,
        left: Ty,
        right: Ty,
    },
    #[error("bad operand type for unary {op}: '{operand}'")]
    UnsupportedOperand { op: &'static str, operand: Ty },
    #[error("'{0}' object does not support item assignment")]
    ItemAssignment(Ty),
    #[error("'{0}' object is not subscriptable")]
    NotSubscriptable(Ty),
    #[error("'{0}' object is not iterable")]
    NotIterable(Ty),
    #[error("object of type '{0}' has no len()")]
    NoLen(Ty),
    #[error("lists of '{0}' are not supported")]
    UnsupportedElement(Ty),
    #[error("name '{0}' is not defined")]
    Undefined(String),
    #[error("{name}() takes {expected} argument(s) but {given} were given")]
    WrongArgumentCount {
        name: String,
        expected: usize,
        given: usize,
    },
    #[error("{context} has type '{expected}' but is given '{found}'")]
    Incompatible {
        context: String,
        expected: Ty,
        found: Ty,
    },
}

#[derive(Debug, Error)]
pub enum CompileError {
    #[error("lex error: {0}")]
    Lex(#[from] LexError),
    #[error("syntax error: {0}")]
    Syntax(#[from] SyntaxError),
    #[error("codegen error: {0}")]
    Codegen(#[from] CodegenError),
}
