use std::collections::HashSet;

use log::trace;

use crate::error::SyntaxError;
use crate::lexer::{Token, TokenKind};

use super::{BinOpKind, Block, Expr, FuncDef, Program, Stmt, UnaryOpKind};

/// Prefix of the temporaries holding right-hand values of tuple assignments.
pub const TEMP_PREFIX: &str = "py2cpp_tmp_";

type ParseResult<T> = Result<T, SyntaxError>;

#[derive(Debug)]
pub struct Parser {
    tokens: Vec<Token>,
    index: usize,
    temp_count: usize,
    /// Source identifiers that look like temporaries.
    taken: HashSet<String>,
    function_depth: usize,
}

impl Parser {
    pub fn new(mut tokens: Vec<Token>) -> Self {
        if tokens.last().map(|t| &t.kind) != Some(&TokenKind::Eof) {
            let (line, column) = tokens.last().map_or((1, 1), |t| (t.line, t.column));
            tokens.push(Token::new(TokenKind::Eof, line, column));
        }
        let taken = tokens
            .iter()
            .filter_map(|t| match &t.kind {
                TokenKind::Ident(name) if name.starts_with(TEMP_PREFIX) => Some(name.clone()),
                _ => None,
            })
            .collect();
        Self {
            tokens,
            index: 0,
            temp_count: 0,
            taken,
            function_depth: 0,
        }
    }

    pub fn parse(&mut self) -> ParseResult<Program> {
        self.parse_program()
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.index.min(self.tokens.len() - 1)]
    }

    fn check(&self, kind: &TokenKind) -> bool {
        &self.peek().kind == kind
    }

    fn advance(&mut self) -> Token {
        let t = self.peek().clone();
        if self.index < self.tokens.len() - 1 {
            self.index += 1;
        }
        t
    }

    fn consume(&mut self, kind: &TokenKind) -> bool {
        if !self.check(kind) {
            return false;
        }
        self.advance();
        true
    }

    fn unexpected(&self, expected: impl Into<String>) -> SyntaxError {
        SyntaxError::Unexpected {
            expected: expected.into(),
            found: self.peek().clone(),
        }
    }

    fn expect(&mut self, kind: &TokenKind) -> ParseResult<()> {
        if self.consume(kind) {
            Ok(())
        } else {
            Err(self.unexpected(kind.to_string()))
        }
    }

    fn expect_ident(&mut self) -> ParseResult<String> {
        if let TokenKind::Ident(name) = &self.peek().kind {
            let name = name.clone();
            self.advance();
            return Ok(name);
        }
        Err(self.unexpected("identifier"))
    }

    fn at_simple_stmt_end(&self) -> bool {
        matches!(
            self.peek().kind,
            TokenKind::Newline | TokenKind::SemiColon | TokenKind::Dedent | TokenKind::Eof
        )
    }

    /// program = (func | stmt | NEWLINE)* EOF
    fn parse_program(&mut self) -> ParseResult<Program> {
        let mut stmts = vec![];

        loop {
            match self.peek().kind {
                TokenKind::Eof => break,
                TokenKind::Newline => {
                    self.advance();
                }
                TokenKind::Def => stmts.push(Stmt::FuncDef(self.parse_func_def()?)),
                _ => stmts.extend(self.parse_stmt()?),
            }
        }

        Ok(Program(stmts))
    }

    /// func = "def" ident "(" (ident ("," ident)* ","?)? ")" block
    fn parse_func_def(&mut self) -> ParseResult<FuncDef> {
        self.expect(&TokenKind::Def)?;
        let name = self.expect_ident()?;
        trace!("parsing function {name}");

        self.expect(&TokenKind::OpenParen)?;
        let mut params = vec![];
        while !self.consume(&TokenKind::CloseParen) {
            params.push(self.expect_ident()?);
            if !self.consume(&TokenKind::Comma) {
                self.expect(&TokenKind::CloseParen)?;
                break;
            }
        }

        self.function_depth += 1;
        let body = self.parse_block();
        self.function_depth -= 1;

        Ok(FuncDef {
            name,
            params,
            body: body?,
        })
    }

    /// block = ":" NEWLINE INDENT stmt+ DEDENT
    ///       | ":" simple_stmts
    fn parse_block(&mut self) -> ParseResult<Block> {
        self.expect(&TokenKind::Colon)?;
        if !self.consume(&TokenKind::Newline) {
            return Ok(Block(self.parse_simple_stmts()?));
        }

        self.expect(&TokenKind::Indent)?;
        let mut stmts = vec![];
        while !self.consume(&TokenKind::Dedent) {
            if self.check(&TokenKind::Eof) {
                return Err(self.unexpected("dedent"));
            }
            stmts.extend(self.parse_stmt()?);
        }
        Ok(Block(stmts))
    }

    /// stmt = if | while | for | simple_stmts
    ///
    /// Returns several statements when the source desugars into a sequence.
    fn parse_stmt(&mut self) -> ParseResult<Vec<Stmt>> {
        let stmt = match self.peek().kind {
            TokenKind::If => {
                self.advance();
                self.parse_if()?
            }
            TokenKind::While => {
                self.advance();
                let cond = self.parse_expr()?;
                let body = self.parse_block()?;
                Stmt::While(cond, body)
            }
            TokenKind::For => {
                self.advance();
                self.parse_for()?
            }
            TokenKind::Def => {
                return Err(SyntaxError::NestedFunction {
                    found: self.peek().clone(),
                })
            }
            _ => return self.parse_simple_stmts(),
        };
        Ok(vec![stmt])
    }

    /// if = "if" expr block ("elif" expr block)* ("else" block)?
    fn parse_if(&mut self) -> ParseResult<Stmt> {
        let cond = self.parse_expr()?;
        let then_block = self.parse_block()?;
        let else_block = if self.consume(&TokenKind::Elif) {
            Some(Block(vec![self.parse_if()?]))
        } else if self.consume(&TokenKind::Else) {
            Some(self.parse_block()?)
        } else {
            None
        };
        Ok(Stmt::If(cond, then_block, else_block))
    }

    /// for = "for" ident "in" expr block
    fn parse_for(&mut self) -> ParseResult<Stmt> {
        let name = self.expect_ident()?;
        self.expect(&TokenKind::In)?;
        let iterable = self.parse_expr()?;
        let body = self.parse_block()?;
        Ok(Stmt::For(name, iterable, body))
    }

    /// simple_stmts = simple_stmt (";" simple_stmt)* ";"? (NEWLINE | DEDENT | EOF)
    fn parse_simple_stmts(&mut self) -> ParseResult<Vec<Stmt>> {
        let mut stmts = self.parse_simple_stmt()?;
        while self.consume(&TokenKind::SemiColon) {
            if self.at_simple_stmt_end() {
                break;
            }
            stmts.extend(self.parse_simple_stmt()?);
        }

        if !self.consume(&TokenKind::Newline)
            && !matches!(self.peek().kind, TokenKind::Dedent | TokenKind::Eof)
        {
            return Err(self.unexpected("end of line"));
        }
        Ok(stmts)
    }

    /// simple_stmt = "return" expr?
    ///             | "print" "(" (expr ("," expr)*)? ")"
    ///             | "pass" | "break" | "continue"
    ///             | assignment
    fn parse_simple_stmt(&mut self) -> ParseResult<Vec<Stmt>> {
        let stmt = match self.peek().kind {
            TokenKind::Return => {
                let t = self.advance();
                if self.function_depth == 0 {
                    return Err(SyntaxError::ReturnOutsideFunction { found: t });
                }
                if self.at_simple_stmt_end() {
                    Stmt::Return(None)
                } else {
                    Stmt::Return(Some(self.parse_expr()?))
                }
            }
            TokenKind::Print => {
                self.advance();
                self.expect(&TokenKind::OpenParen)?;
                Stmt::Print(self.parse_args()?)
            }
            TokenKind::Pass => {
                self.advance();
                Stmt::Pass
            }
            TokenKind::Break => {
                self.advance();
                Stmt::Break
            }
            TokenKind::Continue => {
                self.advance();
                Stmt::Continue
            }
            _ => return self.parse_assignment(),
        };
        Ok(vec![stmt])
    }

    /// assignment = targets "=" expr ("," expr)*
    ///            | target aug_op expr
    ///            | expr
    fn parse_assignment(&mut self) -> ParseResult<Vec<Stmt>> {
        let start = self.peek().clone();
        let first = self.parse_expr()?;

        if self.check(&TokenKind::Comma) {
            let mut targets = vec![first];
            while self.consume(&TokenKind::Comma) {
                if self.check(&TokenKind::Equal) {
                    break;
                }
                targets.push(self.parse_expr()?);
            }
            self.expect(&TokenKind::Equal)?;
            let mut values = vec![self.parse_expr()?];
            while self.consume(&TokenKind::Comma) {
                if self.at_simple_stmt_end() {
                    break;
                }
                values.push(self.parse_expr()?);
            }
            return self.desugar_tuple_assign(targets, values, start);
        }

        if self.consume(&TokenKind::Equal) {
            let value = self.parse_expr()?;
            return Ok(vec![assign_to(first, value, start)?]);
        }

        if let Some(kind) = self.parse_aug_op() {
            let value = self.parse_expr()?;
            let combined = binary(kind, first.clone(), value);
            return Ok(vec![assign_to(first, combined, start)?]);
        }

        Ok(vec![Stmt::Expr(first)])
    }

    fn parse_aug_op(&mut self) -> Option<BinOpKind> {
        let kind = match self.peek().kind {
            TokenKind::PlusEqual => BinOpKind::Add,
            TokenKind::MinusEqual => BinOpKind::Sub,
            TokenKind::StarEqual => BinOpKind::Mul,
            TokenKind::SlashEqual => BinOpKind::Div,
            TokenKind::DoubleSlashEqual => BinOpKind::FloorDiv,
            TokenKind::PercentEqual => BinOpKind::Mod,
            _ => return None,
        };
        self.advance();
        Some(kind)
    }

    /// `a, b = b, a` becomes: every right-hand value into a fresh temporary,
    /// then every target assigned from its temporary, left to right.
    fn desugar_tuple_assign(
        &mut self,
        targets: Vec<Expr>,
        values: Vec<Expr>,
        start: Token,
    ) -> ParseResult<Vec<Stmt>> {
        if targets.len() != values.len() {
            return Err(SyntaxError::UnbalancedAssignment {
                targets: targets.len(),
                values: values.len(),
                found: start,
            });
        }
        if targets
            .iter()
            .any(|t| !matches!(t, Expr::Var(_) | Expr::Index(_, _)))
        {
            return Err(SyntaxError::InvalidTarget { found: start });
        }

        let mut temps = vec![];
        let mut stmts = vec![];
        for value in values {
            let temp = self.fresh_temp();
            stmts.push(Stmt::Assign(temp.clone(), value));
            temps.push(temp);
        }
        for (target, temp) in targets.into_iter().zip(temps) {
            stmts.push(assign_to(target, Expr::Var(temp), start.clone())?);
        }
        Ok(stmts)
    }

    fn fresh_temp(&mut self) -> String {
        loop {
            let temp = format!("{}{}", TEMP_PREFIX, self.temp_count);
            self.temp_count += 1;
            if !self.taken.contains(&temp) {
                return temp;
            }
        }
    }

    /// args = (expr ("," expr)* ","?)? ")"
    fn parse_args(&mut self) -> ParseResult<Vec<Expr>> {
        let mut args = vec![];
        while !self.consume(&TokenKind::CloseParen) {
            args.push(self.parse_expr()?);
            if !self.consume(&TokenKind::Comma) {
                self.expect(&TokenKind::CloseParen)?;
                break;
            }
        }
        Ok(args)
    }

    /// expr = or
    pub fn parse_expr(&mut self) -> ParseResult<Expr> {
        self.parse_or()
    }

    /// or = and ("or" and)*
    fn parse_or(&mut self) -> ParseResult<Expr> {
        let mut left = self.parse_and()?;
        while self.consume(&TokenKind::Or) {
            left = Expr::binary(BinOpKind::Or, left, self.parse_and()?);
        }
        Ok(left)
    }

    /// and = not ("and" not)*
    fn parse_and(&mut self) -> ParseResult<Expr> {
        let mut left = self.parse_not()?;
        while self.consume(&TokenKind::And) {
            left = Expr::binary(BinOpKind::And, left, self.parse_not()?);
        }
        Ok(left)
    }

    /// not = "not" not
    ///     | comparison
    fn parse_not(&mut self) -> ParseResult<Expr> {
        if self.consume(&TokenKind::Not) {
            return Ok(Expr::Unary(UnaryOpKind::Not, Box::new(self.parse_not()?)));
        }
        self.parse_comparison()
    }

    /// comparison = add (("==" | "!=" | "<" | "<=" | ">" | ">=") add)*
    fn parse_comparison(&mut self) -> ParseResult<Expr> {
        let mut left = self.parse_add()?;
        loop {
            let kind = match self.peek().kind {
                TokenKind::DoubleEqual => BinOpKind::Equal,
                TokenKind::NotEqual => BinOpKind::NotEqual,
                TokenKind::LessThan => BinOpKind::LessThan,
                TokenKind::LessEqual => BinOpKind::LessEqual,
                TokenKind::GreaterThan => BinOpKind::GreaterThan,
                TokenKind::GreaterEqual => BinOpKind::GreaterEqual,
                _ => return Ok(left),
            };
            self.advance();
            left = Expr::binary(kind, left, self.parse_add()?);
        }
    }

    /// add = mul (("+" | "-") mul)*
    fn parse_add(&mut self) -> ParseResult<Expr> {
        let mut left = self.parse_mul()?;
        loop {
            let kind = match self.peek().kind {
                TokenKind::Plus => BinOpKind::Add,
                TokenKind::Minus => BinOpKind::Sub,
                _ => return Ok(left),
            };
            self.advance();
            left = binary(kind, left, self.parse_mul()?);
        }
    }

    /// mul = unary (("*" | "/" | "//" | "%") unary)*
    fn parse_mul(&mut self) -> ParseResult<Expr> {
        let mut left = self.parse_unary()?;
        loop {
            let kind = match self.peek().kind {
                TokenKind::Star => BinOpKind::Mul,
                TokenKind::Slash => BinOpKind::Div,
                TokenKind::DoubleSlash => BinOpKind::FloorDiv,
                TokenKind::Percent => BinOpKind::Mod,
                _ => return Ok(left),
            };
            self.advance();
            left = Expr::binary(kind, left, self.parse_unary()?);
        }
    }

    /// unary = ("+" | "-") unary
    ///       | postfix
    fn parse_unary(&mut self) -> ParseResult<Expr> {
        if self.consume(&TokenKind::Plus) {
            Ok(Expr::Unary(UnaryOpKind::Plus, Box::new(self.parse_unary()?)))
        } else if self.consume(&TokenKind::Minus) {
            Ok(Expr::Unary(UnaryOpKind::Neg, Box::new(self.parse_unary()?)))
        } else {
            self.parse_postfix()
        }
    }

    /// postfix = primary ("[" expr "]")*
    fn parse_postfix(&mut self) -> ParseResult<Expr> {
        let mut expr = self.parse_primary()?;
        while self.consume(&TokenKind::OpenSquareBrace) {
            let index = self.parse_expr()?;
            self.expect(&TokenKind::CloseSquareBrace)?;
            expr = Expr::Index(Box::new(expr), Box::new(index));
        }
        Ok(expr)
    }

    /// primary = int | float | str | bool
    ///         | ident ("(" args)?
    ///         | "(" expr ")"
    ///         | "[" (expr ("," expr)* ","?)? "]"
    fn parse_primary(&mut self) -> ParseResult<Expr> {
        let expr = match &self.peek().kind {
            TokenKind::Int(n) => Expr::Int(*n),
            TokenKind::Float(x) => Expr::Float(*x),
            TokenKind::Str(s) => Expr::Str(s.clone()),
            TokenKind::Bool(b) => Expr::Bool(*b),
            TokenKind::Ident(name) => {
                let name = name.clone();
                let t = self.advance();
                if self.consume(&TokenKind::OpenParen) {
                    return self.parse_call(name, t);
                }
                return Ok(Expr::Var(name));
            }
            TokenKind::OpenParen => {
                self.advance();
                let expr = self.parse_expr()?;
                self.expect(&TokenKind::CloseParen)?;
                return Ok(expr);
            }
            TokenKind::OpenSquareBrace => {
                self.advance();
                let mut elements = vec![];
                while !self.consume(&TokenKind::CloseSquareBrace) {
                    elements.push(self.parse_expr()?);
                    if !self.consume(&TokenKind::Comma) {
                        self.expect(&TokenKind::CloseSquareBrace)?;
                        break;
                    }
                }
                return Ok(Expr::List(elements));
            }
            _ => return Err(self.unexpected("expression")),
        };
        self.advance();
        Ok(expr)
    }

    /// `len` and `range` get dedicated nodes; everything else is a plain call.
    fn parse_call(&mut self, name: String, t: Token) -> ParseResult<Expr> {
        let mut args = self.parse_args()?;
        let arity = |expected| SyntaxError::WrongArity {
            name: name.clone(),
            expected,
            given: args.len(),
            found: t.clone(),
        };

        match name.as_str() {
            "len" => {
                if args.len() != 1 {
                    return Err(arity("1"));
                }
                Ok(Expr::Len(Box::new(args.remove(0))))
            }
            "range" => {
                if args.is_empty() || args.len() > 3 {
                    return Err(arity("1 to 3"));
                }
                let mut args = args.into_iter().map(Box::new);
                let first = args.next().unwrap_or_else(|| Box::new(Expr::Int(0)));
                Ok(match args.next() {
                    Some(end) => Expr::Range(first, Some(end), args.next()),
                    None => Expr::Range(Box::new(Expr::Int(0)), Some(first), None),
                })
            }
            _ => Ok(Expr::Call(name, args)),
        }
    }
}

/// Builds a binary node, coercing both operands of a textual `+` to strings.
fn binary(kind: BinOpKind, left: Expr, right: Expr) -> Expr {
    if kind == BinOpKind::Add && (left.is_string_producing() || right.is_string_producing()) {
        return Expr::binary(kind, left.into_string(), right.into_string());
    }
    Expr::binary(kind, left, right)
}

fn assign_to(target: Expr, value: Expr, start: Token) -> ParseResult<Stmt> {
    match target {
        Expr::Var(name) => Ok(Stmt::Assign(name, value)),
        Expr::Index(list, index) => Ok(Stmt::IndexAssign(*list, *index, value)),
        _ => Err(SyntaxError::InvalidTarget { found: start }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Lexer;
    use indoc::indoc;

    fn parse(input: &str) -> Result<Program, SyntaxError> {
        Parser::new(Lexer::tokenize(input).unwrap()).parse()
    }

    fn parse_one(input: &str) -> Stmt {
        let mut program = parse(input).unwrap();
        assert_eq!(program.0.len(), 1, "{:?}", program);
        program.0.remove(0)
    }

    #[test]
    fn multiplication_binds_tighter_than_addition() {
        assert_eq!(
            parse_one("x = 1 + 2 * 3"),
            Stmt::Assign(
                "x".to_string(),
                Expr::binary(
                    BinOpKind::Add,
                    Expr::Int(1),
                    Expr::binary(BinOpKind::Mul, Expr::Int(2), Expr::Int(3))
                )
            )
        );
    }

    #[test]
    fn logical_operators_follow_python_precedence() {
        let Stmt::Expr(e) = parse_one("a or not b and c < 1") else {
            panic!();
        };
        assert_eq!(
            e,
            Expr::binary(
                BinOpKind::Or,
                Expr::var("a"),
                Expr::binary(
                    BinOpKind::And,
                    Expr::Unary(UnaryOpKind::Not, Box::new(Expr::var("b"))),
                    Expr::binary(BinOpKind::LessThan, Expr::var("c"), Expr::Int(1))
                )
            )
        );
    }

    #[test]
    fn unary_minus_binds_tighter_than_multiplication() {
        let Stmt::Expr(e) = parse_one("-a * b") else {
            panic!();
        };
        assert_eq!(
            e,
            Expr::binary(
                BinOpKind::Mul,
                Expr::Unary(UnaryOpKind::Neg, Box::new(Expr::var("a"))),
                Expr::var("b")
            )
        );
    }

    #[test]
    fn tuple_assignment_goes_through_temporaries() {
        let program = parse("a, b = b, a").unwrap();
        assert_eq!(
            program.0,
            vec![
                Stmt::Assign("py2cpp_tmp_0".to_string(), Expr::var("b")),
                Stmt::Assign("py2cpp_tmp_1".to_string(), Expr::var("a")),
                Stmt::Assign("a".to_string(), Expr::var("py2cpp_tmp_0")),
                Stmt::Assign("b".to_string(), Expr::var("py2cpp_tmp_1")),
            ]
        );
    }

    #[test]
    fn temporaries_skip_names_used_in_the_source() {
        let program = parse("py2cpp_tmp_0 = 1\na, b = b, a").unwrap();
        assert_eq!(
            program.0[1],
            Stmt::Assign("py2cpp_tmp_1".to_string(), Expr::var("b"))
        );
    }

    #[test]
    fn tuple_assignment_accepts_index_targets() {
        let program = parse("arr[i], arr[j] = arr[j], arr[i]").unwrap();
        assert_eq!(program.0.len(), 4);
        assert!(matches!(program.0[2], Stmt::IndexAssign(_, _, _)));
    }

    #[test]
    fn tuple_assignment_counts_must_match() {
        assert!(matches!(
            parse("a, b = 1, 2, 3"),
            Err(SyntaxError::UnbalancedAssignment {
                targets: 2,
                values: 3,
                ..
            })
        ));
    }

    #[test]
    fn missing_colon_is_reported() {
        let err = parse("if x\n    y = 1\n").unwrap_err();
        let SyntaxError::Unexpected { expected, found } = err else {
            panic!("{err:?}");
        };
        assert_eq!(expected, "':'");
        assert_eq!(found.kind, TokenKind::Newline);
        assert_eq!(found.line, 1);
    }

    #[test]
    fn elif_becomes_nested_if() {
        let input = indoc! {"
            if a:
                x = 1
            elif b:
                x = 2
            else:
                x = 3
        "};
        let Stmt::If(_, _, Some(Block(else_block))) = parse_one(input) else {
            panic!();
        };
        assert!(matches!(
            else_block.as_slice(),
            [Stmt::If(Expr::Var(_), _, Some(_))]
        ));
    }

    #[test]
    fn nested_function_is_rejected() {
        let input = indoc! {"
            def outer():
                def inner():
                    pass
        "};
        assert!(matches!(
            parse(input),
            Err(SyntaxError::NestedFunction { .. })
        ));
    }

    #[test]
    fn return_requires_a_function() {
        assert!(matches!(
            parse("return 1"),
            Err(SyntaxError::ReturnOutsideFunction { .. })
        ));
    }

    #[test]
    fn range_start_defaults_to_zero() {
        let Stmt::For(name, range, _) = parse_one("for i in range(n): pass") else {
            panic!();
        };
        assert_eq!(name, "i");
        assert_eq!(
            range,
            Expr::Range(Box::new(Expr::Int(0)), Some(Box::new(Expr::var("n"))), None)
        );
    }

    #[test]
    fn builtin_arity_is_checked() {
        assert!(matches!(
            parse("x = len(a, b)"),
            Err(SyntaxError::WrongArity { given: 2, .. })
        ));
        assert!(matches!(
            parse("x = range()"),
            Err(SyntaxError::WrongArity { given: 0, .. })
        ));
    }

    #[test]
    fn string_concatenation_coerces_operands() {
        let Stmt::Print(args) = parse_one("print(\"n = \" + n)") else {
            panic!();
        };
        assert_eq!(
            args,
            vec![Expr::binary(
                BinOpKind::Add,
                Expr::Str("n = ".to_string()),
                Expr::Call("str".to_string(), vec![Expr::var("n")])
            )]
        );
    }

    #[test]
    fn augmented_assignment_expands() {
        assert_eq!(
            parse_one("arr[0] += 2"),
            Stmt::IndexAssign(
                Expr::var("arr"),
                Expr::Int(0),
                Expr::binary(
                    BinOpKind::Add,
                    Expr::Index(Box::new(Expr::var("arr")), Box::new(Expr::Int(0))),
                    Expr::Int(2)
                )
            )
        );
    }

    #[test]
    fn inline_block_after_colon() {
        let Stmt::While(_, Block(body)) = parse_one("while x: x -= 1; y = 2") else {
            panic!();
        };
        assert_eq!(body.len(), 2);
    }

    #[test]
    fn literal_cannot_be_assigned() {
        assert!(matches!(
            parse("1 = x"),
            Err(SyntaxError::InvalidTarget { .. })
        ));
    }
}
