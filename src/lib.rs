pub mod analyzer;
pub mod codegen;
pub mod error;
pub mod lexer;
pub mod parser;

use log::debug;

use analyzer::{SemanticVisitor, SymbolTable};
use codegen::Codegen;
use error::{CodegenError, CompileError, LexError, SyntaxError};
use lexer::{Lexer, Token};
use parser::{Parser, Program};

pub fn tokenize(source: &str) -> Result<Vec<Token>, LexError> {
    let tokens = Lexer::tokenize(source)?;
    debug!("tokenized {} tokens", tokens.len());
    Ok(tokens)
}

pub fn parse(tokens: Vec<Token>) -> Result<Program, SyntaxError> {
    let program = Parser::new(tokens).parse()?;
    debug!("parsed {} top-level statements", program.0.len());
    Ok(program)
}

pub fn analyze(program: &Program) -> Result<SymbolTable, CodegenError> {
    SemanticVisitor::new().visit_program(program)
}

/// Translates one Python source file into a C++ translation unit.
pub fn compile(source: &str) -> Result<String, CompileError> {
    let tokens = tokenize(source)?;
    let program = parse(tokens)?;
    let symbol_table = analyze(&program)?;

    Ok(Codegen::new(symbol_table).generate(&program)?)
}
