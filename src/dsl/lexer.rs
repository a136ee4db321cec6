use super::ast::Span;
use super::error::DslError;

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    // Literals
    Number(f64),
    Str(String),
    True,
    False,
    Unset,

    // Identifiers & reserved words. Header words such as `tick`, `on`,
    // `from` and `to` stay identifiers; the parser matches them by position.
    Ident(String),
    Entity,
    If,
    Then,
    Else,
    Loop,
    End,
    Let,
    Const,
    This,
    Spawn,

    // Punctuation
    LParen,
    RParen,
    Comma,
    Dot,
    Colon,
    ColonColon,
    Arrow, // ->
    Semicolon,

    // Operators
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Lt,
    Gt,
    Le,      // <=
    Ge,      // >=
    EqEq,    // ==
    Ne,      // !=
    And,     // &&
    Or,      // ||
    Bang,    // !
    Eq,      // =
    PlusEq,  // +=
    MinusEq, // -=
    StarEq,  // *=
    SlashEq, // /=

    /// `<px/s>` written directly after a name or number. Documentation only.
    UnitAnnotation(String),

    // Special
    Newline,
    Eof,
}

#[derive(Debug, Clone)]
pub struct SpannedToken {
    pub token: Token,
    pub span: Span,
}

pub fn lex(source: &str) -> Result<Vec<SpannedToken>, DslError> {
    let mut lexer = Lexer::new(source);
    lexer.tokenize()
}

struct Lexer<'a> {
    source: &'a str,
    bytes: &'a [u8],
    pos: usize,
    line: usize,
    paren_depth: usize,
    tokens: Vec<SpannedToken>,
}

impl<'a> Lexer<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            source,
            bytes: source.as_bytes(),
            pos: 0,
            line: 1,
            paren_depth: 0,
            tokens: Vec::new(),
        }
    }

    fn tokenize(&mut self) -> Result<Vec<SpannedToken>, DslError> {
        while self.pos < self.bytes.len() {
            self.skip_whitespace();
            let Some(ch) = self.peek() else {
                break;
            };
            let start = self.pos;

            match ch {
                b'\n' => {
                    self.pos += 1;
                    let line = self.line;
                    self.line += 1;
                    // Inside parentheses or after an operator the statement continues.
                    let continues = self.paren_depth > 0
                        || self.tokens.last().map_or(true, |t| Self::continues_expression(&t.token));
                    if !continues {
                        self.tokens.push(SpannedToken {
                            token: Token::Newline,
                            span: Span::new(start, self.pos, line),
                        });
                    }
                }
                b'(' => {
                    self.paren_depth += 1;
                    self.single(Token::LParen, start);
                }
                b')' => {
                    self.paren_depth = self.paren_depth.saturating_sub(1);
                    self.single(Token::RParen, start);
                }
                b',' => self.single(Token::Comma, start),
                b'.' => self.single(Token::Dot, start),
                b';' => self.single(Token::Semicolon, start),
                b'%' => self.single(Token::Percent, start),
                b':' => {
                    if self.peek_at(1) == Some(b':') {
                        self.pos += 2;
                        self.push(Token::ColonColon, start);
                    } else {
                        self.single(Token::Colon, start);
                    }
                }
                b'+' => self.with_eq(Token::Plus, Token::PlusEq, start),
                b'*' => self.with_eq(Token::Star, Token::StarEq, start),
                b'/' => self.with_eq(Token::Slash, Token::SlashEq, start),
                b'-' => {
                    if self.peek_at(1) == Some(b'>') {
                        self.pos += 2;
                        self.push(Token::Arrow, start);
                    } else {
                        self.with_eq(Token::Minus, Token::MinusEq, start);
                    }
                }
                b'<' => {
                    if let Some(annotation) = self.unit_annotation() {
                        self.pos += annotation.len() + 2;
                        self.push(Token::UnitAnnotation(annotation), start);
                    } else {
                        self.with_eq(Token::Lt, Token::Le, start);
                    }
                }
                b'>' => self.with_eq(Token::Gt, Token::Ge, start),
                b'=' => self.with_eq(Token::Eq, Token::EqEq, start),
                b'!' => self.with_eq(Token::Bang, Token::Ne, start),
                b'&' => {
                    if self.peek_at(1) == Some(b'&') {
                        self.pos += 2;
                        self.push(Token::And, start);
                    } else {
                        return Err(DslError::lexer(
                            "Expected '&&' for logical AND",
                            Span::new(start, start + 1, self.line),
                        ));
                    }
                }
                b'|' => {
                    if self.peek_at(1) == Some(b'|') {
                        self.pos += 2;
                        self.push(Token::Or, start);
                    } else {
                        return Err(DslError::lexer(
                            "Expected '||' for logical OR",
                            Span::new(start, start + 1, self.line),
                        ));
                    }
                }
                b'\'' | b'"' => self.lex_string(ch, start)?,
                b'0'..=b'9' => self.lex_number(start)?,
                b'a'..=b'z' | b'A'..=b'Z' | b'_' => self.lex_ident(start),
                _ => {
                    let found = self.source.get(start..).and_then(|s| s.chars().next()).unwrap_or('?');
                    return Err(DslError::lexer(
                        format!("Unexpected character: '{found}'"),
                        Span::new(start, start + found.len_utf8(), self.line),
                    ));
                }
            }
        }

        // Remove trailing newline
        if matches!(self.tokens.last(), Some(t) if t.token == Token::Newline) {
            self.tokens.pop();
        }

        self.tokens.push(SpannedToken {
            token: Token::Eof,
            span: Span::new(self.pos, self.pos, self.line),
        });
        Ok(std::mem::take(&mut self.tokens))
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.bytes.get(self.pos + offset).copied()
    }

    fn push(&mut self, token: Token, start: usize) {
        // A leading binary operator joins the previous line:
        //   let x = a
        //       + b
        if Self::continues_from_previous(&token)
            && matches!(self.tokens.last(), Some(t) if t.token == Token::Newline)
        {
            self.tokens.pop();
        }
        self.tokens.push(SpannedToken {
            token,
            span: Span::new(start, self.pos, self.line),
        });
    }

    fn single(&mut self, token: Token, start: usize) {
        self.pos += 1;
        self.push(token, start);
    }

    /// One-byte operator, or its two-byte form when followed by `=`.
    fn with_eq(&mut self, plain: Token, with_eq: Token, start: usize) {
        if self.peek_at(1) == Some(b'=') {
            self.pos += 2;
            self.push(with_eq, start);
        } else {
            self.single(plain, start);
        }
    }

    /// Returns true if a newline after this token should be suppressed,
    /// because the token indicates an expression continues on the next line.
    fn continues_expression(token: &Token) -> bool {
        matches!(
            token,
            Token::Plus
                | Token::Minus
                | Token::Star
                | Token::Slash
                | Token::Percent
                | Token::Lt
                | Token::Gt
                | Token::Le
                | Token::Ge
                | Token::EqEq
                | Token::Ne
                | Token::And
                | Token::Or
                | Token::Eq
                | Token::PlusEq
                | Token::MinusEq
                | Token::StarEq
                | Token::SlashEq
                | Token::Comma
                | Token::Dot
                | Token::ColonColon
                | Token::Newline
        )
    }

    /// Returns true if this token at the START of a new line means the
    /// previous expression continues. Excludes `-` and `!`, which also
    /// start statements as unary operators.
    fn continues_from_previous(token: &Token) -> bool {
        matches!(
            token,
            Token::Plus
                | Token::Star
                | Token::Slash
                | Token::Percent
                | Token::Le
                | Token::Ge
                | Token::EqEq
                | Token::Ne
                | Token::And
                | Token::Or
                | Token::Dot
        )
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.peek(), Some(b' ' | b'\t' | b'\r')) {
            self.pos += 1;
        }
    }

    /// `<name/unit>` glued to a preceding identifier, number or `)` is a unit
    /// annotation. Spaced `a < b` is always a comparison.
    fn unit_annotation(&self) -> Option<String> {
        let glued = self
            .pos
            .checked_sub(1)
            .and_then(|i| self.bytes.get(i))
            .is_some_and(|b| b.is_ascii_alphanumeric() || *b == b'_' || *b == b')');
        if !glued {
            return None;
        }
        let body_start = self.pos + 1;
        let mut end = body_start;
        while let Some(&b) = self.bytes.get(end) {
            if b.is_ascii_alphanumeric() || b == b'_' || b == b'/' {
                end += 1;
            } else {
                break;
            }
        }
        if end == body_start || self.bytes.get(end) != Some(&b'>') {
            return None;
        }
        self.source.get(body_start..end).map(str::to_string)
    }

    fn lex_string(&mut self, quote: u8, start: usize) -> Result<(), DslError> {
        self.pos += 1;
        let str_start = self.pos;
        while self.peek().is_some_and(|b| b != quote && b != b'\n') {
            self.pos += 1;
        }
        if self.peek() != Some(quote) {
            return Err(DslError::lexer(
                "Unterminated string literal",
                Span::new(start, self.pos, self.line),
            ));
        }
        let s = self.source.get(str_start..self.pos).unwrap_or_default().to_string();
        self.pos += 1;
        self.push(Token::Str(s), start);
        Ok(())
    }

    fn lex_number(&mut self, start: usize) -> Result<(), DslError> {
        while self.peek().is_some_and(|b| b.is_ascii_digit()) {
            self.pos += 1;
        }
        // Decimal point only when a digit follows, so `1.x` stays field access.
        if self.peek() == Some(b'.') && self.peek_at(1).is_some_and(|b| b.is_ascii_digit()) {
            self.pos += 1;
            while self.peek().is_some_and(|b| b.is_ascii_digit()) {
                self.pos += 1;
            }
        }
        let text = self.source.get(start..self.pos).unwrap_or_default();
        match text.parse::<f64>() {
            Ok(v) => {
                self.push(Token::Number(v), start);
                Ok(())
            }
            Err(_) => Err(DslError::lexer(
                format!("Invalid number: {text}"),
                Span::new(start, self.pos, self.line),
            )),
        }
    }

    fn lex_ident(&mut self, start: usize) {
        while self.peek().is_some_and(|b| b.is_ascii_alphanumeric() || b == b'_') {
            self.pos += 1;
        }
        let word = self.source.get(start..self.pos).unwrap_or_default();
        let token = match word {
            "entity" => Token::Entity,
            "if" => Token::If,
            "then" => Token::Then,
            "else" => Token::Else,
            "loop" => Token::Loop,
            "end" => Token::End,
            "let" => Token::Let,
            "const" => Token::Const,
            "this" => Token::This,
            "spawn" => Token::Spawn,
            "true" => Token::True,
            "false" => Token::False,
            "unset" => Token::Unset,
            _ => Token::Ident(word.to_string()),
        };
        self.push(token, start);
    }
}
