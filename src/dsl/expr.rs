//! Embedded expression parser. Turns a statement or condition payload into
//! the `Stmt`/`Expr` tree the interpreter walks. Precedence, lowest first:
//! `||`, `&&`, `== !=`, `< > <= >=`, `+ -`, `* / %`, unary `- !`, postfix
//! `.field` / `.method()`.

use super::ast::*;
use super::error::DslError;
use super::lexer::{SpannedToken, Token};

/// Parse a whole payload as one statement.
pub fn parse_statement(tokens: &[SpannedToken], span: Span) -> Result<Stmt, DslError> {
    let mut p = ExprParser::new(tokens, span);
    let stmt = p.parse_stmt()?;
    p.expect_done()?;
    Ok(stmt)
}

/// Parse a whole payload as one expression.
pub fn parse_expression(tokens: &[SpannedToken], span: Span) -> Result<Expr, DslError> {
    let mut p = ExprParser::new(tokens, span);
    let expr = p.parse_expr()?;
    p.expect_done()?;
    Ok(expr)
}

struct ExprParser<'a> {
    tokens: &'a [SpannedToken],
    pos: usize,
    /// Span of the whole payload, used for errors at its end.
    outer: Span,
}

impl<'a> ExprParser<'a> {
    fn new(tokens: &'a [SpannedToken], outer: Span) -> Self {
        Self { tokens, pos: 0, outer }
    }

    // ── Helpers ────────────────────────────────────────────────────

    fn peek(&self) -> &Token {
        self.tokens.get(self.pos).map_or(&Token::Eof, |t| &t.token)
    }

    fn span(&self) -> Span {
        self.tokens
            .get(self.pos)
            .map_or(Span::new(self.outer.end, self.outer.end, self.outer.line), |t| t.span)
    }

    fn advance(&mut self) -> Span {
        let sp = self.span();
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        sp
    }

    fn expect(&mut self, expected: &Token) -> Result<Span, DslError> {
        if self.peek() == expected {
            Ok(self.advance())
        } else {
            Err(DslError::expression(
                format!("Expected {expected:?}, got {:?}", self.peek()),
                self.span(),
            ))
        }
    }

    fn expect_ident(&mut self) -> Result<(String, Span), DslError> {
        if let Token::Ident(name) = self.peek().clone() {
            let sp = self.advance();
            Ok((name, sp))
        } else {
            Err(DslError::expression(
                format!("Expected identifier, got {:?}", self.peek()),
                self.span(),
            ))
        }
    }

    fn expect_done(&self) -> Result<(), DslError> {
        match self.peek() {
            Token::Eof => Ok(()),
            other => Err(DslError::expression(
                format!("Unexpected {other:?}"),
                self.span(),
            )),
        }
    }

    fn binary(op: BinOp, left: Expr, right: Expr) -> Expr {
        let span = left.span.merge(right.span);
        Expr {
            kind: ExprKind::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            },
            span,
        }
    }

    // ── Statements ─────────────────────────────────────────────────

    fn parse_stmt(&mut self) -> Result<Stmt, DslError> {
        if matches!(self.peek(), Token::Let | Token::Const) {
            let start = self.advance();
            let (name, _) = self.expect_ident()?;
            self.expect(&Token::Eq)?;
            let value = self.parse_expr()?;
            let span = start.merge(value.span);
            return Ok(Stmt::Let { name, value, span });
        }

        let expr = self.parse_expr()?;
        let op = match self.peek() {
            Token::Eq => AssignOp::Set,
            Token::PlusEq => AssignOp::Add,
            Token::MinusEq => AssignOp::Sub,
            Token::StarEq => AssignOp::Mul,
            Token::SlashEq => AssignOp::Div,
            _ => return Ok(Stmt::Expr(expr)),
        };
        self.advance();
        let target = Self::place(&expr)?;
        let value = self.parse_expr()?;
        let span = expr.span.merge(value.span);
        Ok(Stmt::Assign {
            target,
            op,
            value,
            span,
        })
    }

    /// Convert `x`, `this`, `x.a.b` or `this.a.b` into an assignable place.
    fn place(expr: &Expr) -> Result<Place, DslError> {
        match &expr.kind {
            ExprKind::Ident(name) => Ok(Place {
                base: PlaceBase::Local(name.clone()),
                fields: Vec::new(),
            }),
            ExprKind::This => Ok(Place {
                base: PlaceBase::This,
                fields: Vec::new(),
            }),
            ExprKind::Field { object, field } => {
                let mut place = Self::place(object)?;
                place.fields.push(field.clone());
                Ok(place)
            }
            _ => Err(DslError::expression("Invalid assignment target", expr.span)),
        }
    }

    // ── Expressions (precedence climbing) ──────────────────────────

    fn parse_expr(&mut self) -> Result<Expr, DslError> {
        self.parse_or()
    }

    fn parse_or(&mut self) -> Result<Expr, DslError> {
        let mut left = self.parse_and()?;
        while matches!(self.peek(), Token::Or) {
            self.advance();
            let right = self.parse_and()?;
            left = Self::binary(BinOp::Or, left, right);
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr, DslError> {
        let mut left = self.parse_equality()?;
        while matches!(self.peek(), Token::And) {
            self.advance();
            let right = self.parse_equality()?;
            left = Self::binary(BinOp::And, left, right);
        }
        Ok(left)
    }

    fn parse_equality(&mut self) -> Result<Expr, DslError> {
        let mut left = self.parse_comparison()?;
        loop {
            let op = match self.peek() {
                Token::EqEq => BinOp::Eq,
                Token::Ne => BinOp::Ne,
                _ => break,
            };
            self.advance();
            let right = self.parse_comparison()?;
            left = Self::binary(op, left, right);
        }
        Ok(left)
    }

    fn parse_comparison(&mut self) -> Result<Expr, DslError> {
        let mut left = self.parse_add()?;
        loop {
            let op = match self.peek() {
                Token::Lt => BinOp::Lt,
                Token::Gt => BinOp::Gt,
                Token::Le => BinOp::Le,
                Token::Ge => BinOp::Ge,
                _ => break,
            };
            self.advance();
            let right = self.parse_add()?;
            left = Self::binary(op, left, right);
        }
        Ok(left)
    }

    fn parse_add(&mut self) -> Result<Expr, DslError> {
        let mut left = self.parse_mul()?;
        loop {
            let op = match self.peek() {
                Token::Plus => BinOp::Add,
                Token::Minus => BinOp::Sub,
                _ => break,
            };
            self.advance();
            let right = self.parse_mul()?;
            left = Self::binary(op, left, right);
        }
        Ok(left)
    }

    fn parse_mul(&mut self) -> Result<Expr, DslError> {
        let mut left = self.parse_unary()?;
        loop {
            let op = match self.peek() {
                Token::Star => BinOp::Mul,
                Token::Slash => BinOp::Div,
                Token::Percent => BinOp::Mod,
                _ => break,
            };
            self.advance();
            let right = self.parse_unary()?;
            left = Self::binary(op, left, right);
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr, DslError> {
        let op = match self.peek() {
            Token::Minus => UnaryOp::Neg,
            Token::Bang => UnaryOp::Not,
            _ => return self.parse_postfix(),
        };
        let start = self.advance();
        let operand = self.parse_unary()?;
        let span = start.merge(operand.span);
        Ok(Expr {
            kind: ExprKind::Unary {
                op,
                operand: Box::new(operand),
            },
            span,
        })
    }

    fn parse_postfix(&mut self) -> Result<Expr, DslError> {
        let mut expr = self.parse_primary()?;

        while matches!(self.peek(), Token::Dot) {
            self.advance();
            let (field, field_span) = self.expect_ident()?;
            let span = expr.span.merge(field_span);
            if matches!(self.peek(), Token::LParen) {
                self.advance();
                let args = self.parse_args()?;
                expr = Expr {
                    kind: ExprKind::MethodCall {
                        object: Box::new(expr),
                        method: field,
                        args,
                    },
                    span,
                };
            } else {
                expr = Expr {
                    kind: ExprKind::Field {
                        object: Box::new(expr),
                        field,
                    },
                    span,
                };
            }
        }

        Ok(expr)
    }

    /// Arguments after an already-consumed `(`, through the closing `)`.
    fn parse_args(&mut self) -> Result<Vec<Expr>, DslError> {
        let mut args = Vec::new();
        if matches!(self.peek(), Token::RParen) {
            self.advance();
            return Ok(args);
        }
        loop {
            args.push(self.parse_expr()?);
            match self.peek() {
                Token::Comma => {
                    self.advance();
                }
                Token::RParen => {
                    self.advance();
                    return Ok(args);
                }
                other => {
                    return Err(DslError::expression(
                        format!("Expected ',' or ')' in argument list, got {other:?}"),
                        self.span(),
                    ));
                }
            }
        }
    }

    fn parse_primary(&mut self) -> Result<Expr, DslError> {
        let span = self.span();
        let kind = match self.peek().clone() {
            Token::Number(v) => {
                self.advance();
                ExprKind::Number(v)
            }
            Token::Str(s) => {
                self.advance();
                ExprKind::Str(s)
            }
            Token::True => {
                self.advance();
                ExprKind::Bool(true)
            }
            Token::False => {
                self.advance();
                ExprKind::Bool(false)
            }
            Token::Unset => {
                self.advance();
                ExprKind::Unset
            }
            Token::This => {
                self.advance();
                ExprKind::This
            }
            Token::LParen => {
                self.advance();
                let inner = self.parse_expr()?;
                self.expect(&Token::RParen)?;
                return Ok(inner);
            }
            Token::Spawn => {
                self.advance();
                self.expect(&Token::LParen)?;
                let (type_name, _) = self.expect_ident()?;
                let args = match self.peek() {
                    Token::Comma => {
                        self.advance();
                        self.parse_args()?
                    }
                    _ => {
                        self.expect(&Token::RParen)?;
                        Vec::new()
                    }
                };
                ExprKind::Spawn { type_name, args }
            }
            Token::Ident(name) => {
                self.advance();
                match self.peek() {
                    Token::ColonColon => {
                        self.advance();
                        let (member, _) = self.expect_ident()?;
                        let args = if matches!(self.peek(), Token::LParen) {
                            self.advance();
                            Some(self.parse_args()?)
                        } else {
                            None
                        };
                        ExprKind::Namespaced {
                            module: name,
                            member,
                            args,
                        }
                    }
                    Token::LParen => {
                        self.advance();
                        let args = self.parse_args()?;
                        ExprKind::Call { name, args }
                    }
                    _ => ExprKind::Ident(name),
                }
            }
            other => {
                return Err(DslError::expression(
                    format!("Unexpected {other:?} in expression"),
                    span,
                ));
            }
        };
        let end = self
            .tokens
            .get(self.pos.saturating_sub(1))
            .map_or(span, |t| t.span);
        Ok(Expr {
            kind,
            span: span.merge(end),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::dsl::lexer::lex;

    fn tokens(s: &str) -> Vec<SpannedToken> {
        let mut t = lex(s).unwrap();
        t.pop(); // Eof
        t
    }

    fn expr(s: &str) -> Expr {
        parse_expression(&tokens(s), Span::default()).unwrap()
    }

    fn stmt(s: &str) -> Stmt {
        parse_statement(&tokens(s), Span::default()).unwrap()
    }

    #[test]
    fn mul_binds_tighter_than_add() {
        let e = expr("1 + 2 * 3");
        let ExprKind::Binary { op: BinOp::Add, right, .. } = e.kind else {
            panic!("expected add");
        };
        assert!(matches!(right.kind, ExprKind::Binary { op: BinOp::Mul, .. }));
    }

    #[test]
    fn and_binds_tighter_than_or() {
        let e = expr("a || b && c");
        let ExprKind::Binary { op: BinOp::Or, right, .. } = e.kind else {
            panic!("expected or");
        };
        assert!(matches!(right.kind, ExprKind::Binary { op: BinOp::And, .. }));
    }

    #[test]
    fn namespaced_member_and_call() {
        let e = expr("Gfx::width");
        assert!(matches!(e.kind, ExprKind::Namespaced { args: None, .. }));
        let e = expr("Gfx::drawCircle(this.pos, 10)");
        let ExprKind::Namespaced { module, member, args: Some(args) } = e.kind else {
            panic!("expected namespaced call");
        };
        assert_eq!((module.as_str(), member.as_str(), args.len()), ("Gfx", "drawCircle", 2));
    }

    #[test]
    fn spawn_with_and_without_args() {
        let e = expr("spawn(Foo, 1, 2)");
        let ExprKind::Spawn { type_name, args } = e.kind else {
            panic!("expected spawn");
        };
        assert_eq!(type_name, "Foo");
        assert_eq!(args.len(), 2);
        assert!(matches!(expr("spawn(Bar)").kind, ExprKind::Spawn { ref args, .. } if args.is_empty()));
    }

    #[test]
    fn method_chain() {
        let e = expr("this.pos.add(v).length()");
        let ExprKind::MethodCall { object, method, .. } = e.kind else {
            panic!("expected method call");
        };
        assert_eq!(method, "length");
        assert!(matches!(object.kind, ExprKind::MethodCall { .. }));
    }

    #[test]
    fn nested_field_assignment() {
        let Stmt::Assign { target, op, .. } = stmt("this.pos.x += 3") else {
            panic!("expected assignment");
        };
        assert_eq!(target.base, PlaceBase::This);
        assert_eq!(target.fields, vec!["pos".to_string(), "x".to_string()]);
        assert_eq!(op, AssignOp::Add);
    }

    #[test]
    fn let_statement() {
        let Stmt::Let { name, .. } = stmt("let v = Input::getVector('a', 'd', 'w', 's')") else {
            panic!("expected let");
        };
        assert_eq!(name, "v");
    }

    #[test]
    fn invalid_target() {
        let err = parse_statement(&tokens("f() = 3"), Span::default()).unwrap_err();
        assert!(err.message.contains("assignment target"));
        assert!(!err.is_structural());
    }

    #[test]
    fn trailing_garbage() {
        assert!(parse_expression(&tokens("1 2"), Span::default()).is_err());
    }

    #[test]
    fn unclosed_paren() {
        assert!(parse_expression(&tokens("(1 + 2"), Span::default()).is_err());
    }
}
