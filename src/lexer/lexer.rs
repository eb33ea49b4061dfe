use std::fmt;

use log::trace;

use crate::error::LexError;

use super::{
    token::{KEYWORDS, ONE_SYMBOL_TOKENS, THREE_SYMBOLS_TOKENS, TWO_SYMBOLS_TOKENS},
    TokenKind,
};

const TAB_WIDTH: usize = 8;

#[derive(Clone, Debug, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub line: usize,
    pub column: usize,
}

impl Token {
    pub fn new(kind: TokenKind, line: usize, column: usize) -> Self {
        Self { kind, line, column }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} at line {}, column {}",
            self.kind, self.line, self.column
        )
    }
}

#[derive(Debug)]
pub struct Lexer {
    chars: Vec<char>,
    tokens: Vec<Token>,
    index: usize,
    line: usize,
    column: usize,
    indents: Vec<usize>,
    nesting: usize,
    at_line_start: bool,
}

impl Lexer {
    fn new(s: &str) -> Self {
        Self {
            chars: s.chars().collect(),
            tokens: vec![],
            index: 0,
            line: 1,
            column: 1,
            indents: vec![0],
            nesting: 0,
            at_line_start: true,
        }
    }

    fn peek(&self, offset: usize) -> Option<char> {
        self.chars.get(self.index + offset).copied()
    }

    fn lookahead(&self, len: usize) -> String {
        self.chars[self.index..].iter().take(len).collect()
    }

    fn new_token(&mut self, kind: TokenKind, len: usize) {
        trace!("{}:{} {:?}", self.line, self.column, kind);
        self.tokens.push(Token::new(kind, self.line, self.column));
        self.index += len;
        self.column += len;
    }

    fn layout_token(&mut self, kind: TokenKind) {
        self.tokens.push(Token::new(kind, self.line, self.column));
    }

    fn skip(&mut self, len: usize) {
        self.index += len;
        self.column += len;
    }

    fn last_is_newline(&self) -> bool {
        matches!(
            self.tokens.last().map(|t| &t.kind),
            None | Some(TokenKind::Newline)
        )
    }

    fn parse_newline(&mut self) {
        if self.nesting == 0 && !self.last_is_newline() {
            self.layout_token(TokenKind::Newline);
        }
        self.index += 1;
        self.line += 1;
        self.column = 1;
        self.at_line_start = self.nesting == 0;
    }

    /// Measures the leading whitespace of a logical line and emits the
    /// matching `Indent`/`Dedent` tokens. Blank and comment-only lines keep
    /// the current level.
    fn parse_indentation(&mut self) -> Result<(), LexError> {
        let mut width = 0;
        let mut len = 0;
        while let Some(c) = self.peek(len) {
            match c {
                ' ' => width += 1,
                '\t' => width += TAB_WIDTH - width % TAB_WIDTH,
                '\x0c' => width = 0,
                _ => break,
            }
            len += 1;
        }
        self.skip(len);

        if matches!(self.peek(0), None | Some('\n' | '\r' | '#')) {
            return Ok(());
        }

        let current = self.indents.last().copied().unwrap_or(0);
        if width > current {
            self.indents.push(width);
            self.layout_token(TokenKind::Indent);
        } else if width < current {
            while self.indents.last().is_some_and(|&top| top > width) {
                self.indents.pop();
                self.layout_token(TokenKind::Dedent);
            }
            if self.indents.last().copied().unwrap_or(0) != width {
                return Err(LexError::InconsistentDedent {
                    line: self.line,
                    column: self.column,
                });
            }
        }
        Ok(())
    }

    fn parse_number(&mut self) -> Result<(), LexError> {
        let mut len = 0;
        while self.peek(len).is_some_and(|c| c.is_ascii_digit()) {
            len += 1;
        }
        let is_float = self.peek(len) == Some('.');
        if is_float {
            len += 1;
            while self.peek(len).is_some_and(|c| c.is_ascii_digit()) {
                len += 1;
            }
        }

        let literal = self.lookahead(len);
        let invalid = || LexError::InvalidNumber {
            literal: literal.clone(),
            line: self.line,
            column: self.column,
        };
        let kind = if is_float {
            TokenKind::Float(literal.parse().map_err(|_| invalid())?)
        } else {
            TokenKind::Int(literal.parse().map_err(|_| invalid())?)
        };
        self.new_token(kind, len);
        Ok(())
    }

    fn parse_identifier(&mut self) {
        let s: String = self.chars[self.index..]
            .iter()
            .take_while(|&&c| c.is_alphanumeric() || c == '_')
            .collect();
        let len = s.chars().count();

        if let Some(kind) = KEYWORDS.get(s.as_str()) {
            self.new_token(kind.clone(), len);
        } else {
            self.new_token(TokenKind::Ident(s), len);
        }
    }

    /// Quotes are stripped; escape sequences are kept verbatim.
    fn parse_string(&mut self, quote: char) -> Result<(), LexError> {
        let mut value = String::new();
        let mut len = 1;
        loop {
            match self.peek(len) {
                Some(c) if c == quote => break,
                Some('\\') if !matches!(self.peek(len + 1), None | Some('\n')) => {
                    value.push('\\');
                    value.extend(self.peek(len + 1));
                    len += 2;
                }
                None | Some('\n') | Some('\\') => {
                    return Err(LexError::UnterminatedString {
                        line: self.line,
                        column: self.column,
                    })
                }
                Some(c) => {
                    value.push(c);
                    len += 1;
                }
            }
        }
        self.new_token(TokenKind::Str(value), len + 1);
        Ok(())
    }

    fn _tokenize(&mut self) -> Result<(), LexError> {
        while self.index < self.chars.len() {
            if self.at_line_start {
                self.at_line_start = false;
                self.parse_indentation()?;
                continue;
            }

            let c = self.chars[self.index];
            let c2 = self.lookahead(2);
            let c3 = self.lookahead(3);

            if c == '\n' {
                self.parse_newline();
            } else if c == ' ' || c == '\t' || c == '\r' || c == '\x0c' {
                self.skip(1);
            } else if c == '#' {
                while self.peek(0).is_some_and(|c| c != '\n') {
                    self.skip(1);
                }
            } else if c2 == "\\\n" {
                self.index += 2;
                self.line += 1;
                self.column = 1;
            } else if c.is_ascii_digit()
                || (c == '.' && self.peek(1).is_some_and(|c| c.is_ascii_digit()))
            {
                self.parse_number()?;
            } else if c.is_alphabetic() || c == '_' {
                self.parse_identifier();
            } else if c == '"' || c == '\'' {
                self.parse_string(c)?;
            } else if let Some(kind) = THREE_SYMBOLS_TOKENS.get(c3.as_str()) {
                self.new_token(kind.clone(), 3);
            } else if let Some(kind) = TWO_SYMBOLS_TOKENS.get(c2.as_str()) {
                self.new_token(kind.clone(), 2);
            } else if let Some(kind) = ONE_SYMBOL_TOKENS.get(&c) {
                match kind {
                    TokenKind::OpenParen | TokenKind::OpenSquareBrace => self.nesting += 1,
                    TokenKind::CloseParen | TokenKind::CloseSquareBrace => {
                        self.nesting = self.nesting.saturating_sub(1)
                    }
                    _ => (),
                }
                self.new_token(kind.clone(), 1);
            } else {
                return Err(LexError::UnexpectedCharacter {
                    character: c,
                    line: self.line,
                    column: self.column,
                });
            }
        }

        if !self.last_is_newline() {
            self.layout_token(TokenKind::Newline);
        }
        while self.indents.len() > 1 {
            self.indents.pop();
            self.layout_token(TokenKind::Dedent);
        }
        self.layout_token(TokenKind::Eof);
        Ok(())
    }

    /// Scans the whole source up front. The result always ends with `Eof`.
    pub fn tokenize(s: &str) -> Result<Vec<Token>, LexError> {
        let mut lexer = Lexer::new(s);
        lexer._tokenize()?;

        Ok(lexer.tokens)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;

    fn kinds(input: &str) -> Vec<TokenKind> {
        Lexer::tokenize(input)
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn numeric_literals_keep_their_value() {
        assert_eq!(
            kinds("42 3.5 .25 7."),
            vec![
                TokenKind::Int(42),
                TokenKind::Float(3.5),
                TokenKind::Float(0.25),
                TokenKind::Float(7.0),
                TokenKind::Newline,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn integer_never_matches_float() {
        assert!(matches!(kinds("10")[0], TokenKind::Int(10)));
    }

    #[test]
    fn strings_drop_quotes_and_keep_escapes() {
        assert_eq!(
            kinds(r#"'it\'s' "say \"hi\"""#)[..2],
            [
                TokenKind::Str(r"it\'s".to_string()),
                TokenKind::Str(r#"say \"hi\""#.to_string()),
            ]
        );
    }

    #[test]
    fn compound_operators_win_over_single_characters() {
        assert_eq!(
            kinds("x += 1 // 2 //= 3 <= 4")[..9],
            [
                TokenKind::Ident("x".to_string()),
                TokenKind::PlusEqual,
                TokenKind::Int(1),
                TokenKind::DoubleSlash,
                TokenKind::Int(2),
                TokenKind::DoubleSlashEqual,
                TokenKind::Int(3),
                TokenKind::LessEqual,
                TokenKind::Int(4),
            ]
        );
    }

    #[test]
    fn keywords_are_whole_words() {
        assert_eq!(
            kinds("iffy if True Falsey")[..4],
            [
                TokenKind::Ident("iffy".to_string()),
                TokenKind::If,
                TokenKind::Bool(true),
                TokenKind::Ident("Falsey".to_string()),
            ]
        );
    }

    #[test]
    fn indentation_produces_layout_tokens() {
        let input = indoc! {"
            while x:
                # comment only

                x = 0
            y
        "};
        assert_eq!(
            kinds(input),
            vec![
                TokenKind::While,
                TokenKind::Ident("x".to_string()),
                TokenKind::Colon,
                TokenKind::Newline,
                TokenKind::Indent,
                TokenKind::Ident("x".to_string()),
                TokenKind::Equal,
                TokenKind::Int(0),
                TokenKind::Newline,
                TokenKind::Dedent,
                TokenKind::Ident("y".to_string()),
                TokenKind::Newline,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn newlines_inside_brackets_are_joined() {
        assert_eq!(
            kinds("a = [1,\n     2]\n")[..7],
            [
                TokenKind::Ident("a".to_string()),
                TokenKind::Equal,
                TokenKind::OpenSquareBrace,
                TokenKind::Int(1),
                TokenKind::Comma,
                TokenKind::Int(2),
                TokenKind::CloseSquareBrace,
            ]
        );
    }

    #[test]
    fn tracks_line_and_column() {
        let tokens = Lexer::tokenize("# header\nx = 1\n  \ny").unwrap();
        assert_eq!((tokens[0].line, tokens[0].column), (2, 1));
        assert_eq!((tokens[2].line, tokens[2].column), (2, 5));
        let y = tokens
            .iter()
            .find(|t| t.kind == TokenKind::Ident("y".to_string()))
            .unwrap();
        assert_eq!((y.line, y.column), (4, 1));
    }

    #[test]
    fn reports_unknown_character_position() {
        let err = Lexer::tokenize("x = 1\ny = $").unwrap_err();
        assert_eq!(
            err,
            LexError::UnexpectedCharacter {
                character: '$',
                line: 2,
                column: 5
            }
        );
    }

    #[test]
    fn braces_are_not_tokens() {
        let err = Lexer::tokenize("d = {}").unwrap_err();
        assert_eq!(err.position(), (1, 5));
    }

    #[test]
    fn rejects_unterminated_string() {
        let err = Lexer::tokenize("s = 'abc\n").unwrap_err();
        assert_eq!(err.position(), (1, 5));
    }

    #[test]
    fn rejects_inconsistent_dedent() {
        let input = "if x:\n    y = 1\n  z = 2\n";
        assert!(matches!(
            Lexer::tokenize(input),
            Err(LexError::InconsistentDedent { line: 3, .. })
        ));
    }
}
