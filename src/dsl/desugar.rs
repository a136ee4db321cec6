//! Lowers block bodies into statements: `if` chains become `Stmt::If`,
//! counting loops become `Stmt::Loop`, and raw payloads are stripped of
//! annotations and handed to the expression parser.

use super::ast::*;
use super::error::DslError;
use super::expr;
use super::lexer::{SpannedToken, Token};

/// Drop unit annotations and `: Type` pairs. They never affect semantics.
pub fn strip_annotations(tokens: &[SpannedToken]) -> Vec<SpannedToken> {
    let mut out = Vec::with_capacity(tokens.len());
    let mut iter = tokens.iter().peekable();
    while let Some(tok) = iter.next() {
        match &tok.token {
            Token::UnitAnnotation(_) => {}
            Token::Colon if matches!(iter.peek().map(|t| &t.token), Some(Token::Ident(_))) => {
                iter.next();
            }
            _ => out.push(tok.clone()),
        }
    }
    out
}

pub fn lower_expr(payload: &Payload) -> Result<Expr, DslError> {
    expr::parse_expression(&strip_annotations(&payload.tokens), payload.span)
}

pub fn lower_stmt(payload: &Payload) -> Result<Stmt, DslError> {
    expr::parse_statement(&strip_annotations(&payload.tokens), payload.span)
}

pub fn lower_body(nodes: &[BlockNode]) -> Result<Vec<Stmt>, DslError> {
    nodes.iter().map(lower_node).collect()
}

fn lower_node(node: &BlockNode) -> Result<Stmt, DslError> {
    match node {
        BlockNode::RawStatement(payload) => lower_stmt(payload),
        BlockNode::IfChain {
            branches,
            otherwise,
            span,
        } => {
            let branches = branches
                .iter()
                .map(|b| Ok((lower_expr(&b.condition)?, lower_body(&b.body)?)))
                .collect::<Result<Vec<_>, DslError>>()?;
            let otherwise = otherwise.as_deref().map(lower_body).transpose()?;
            Ok(Stmt::If {
                branches,
                otherwise,
                span: *span,
            })
        }
        BlockNode::CountingLoop {
            var,
            from,
            to,
            body,
            span,
        } => Ok(Stmt::Loop {
            var: var.clone(),
            from: lower_expr(from)?,
            to: lower_expr(to)?,
            body: lower_body(body)?,
            span: *span,
        }),
        BlockNode::Main { span, .. } | BlockNode::EntityDef(EntityDef { span, .. }) => Err(
            DslError::parser("Top-level block inside a body", *span),
        ),
    }
}
