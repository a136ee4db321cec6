use super::ast::Span;

/// A translation error with source location.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{message}")]
pub struct DslError {
    pub message: String,
    pub span: Span,
    pub kind: ErrorKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Lexer,
    Parser,
    /// Malformed embedded expression or statement.
    Expression,
    /// Namespaced reference or global call that names nothing in the builtin set.
    Resolve,
}

impl DslError {
    pub fn lexer(message: impl Into<String>, span: Span) -> Self {
        Self {
            message: message.into(),
            span,
            kind: ErrorKind::Lexer,
        }
    }

    pub fn parser(message: impl Into<String>, span: Span) -> Self {
        Self {
            message: message.into(),
            span,
            kind: ErrorKind::Parser,
        }
    }

    pub fn expression(message: impl Into<String>, span: Span) -> Self {
        Self {
            message: message.into(),
            span,
            kind: ErrorKind::Expression,
        }
    }

    pub fn resolve(message: impl Into<String>, span: Span) -> Self {
        Self {
            message: message.into(),
            span,
            kind: ErrorKind::Resolve,
        }
    }

    /// Block structure problems abort parsing; expression problems surface at load.
    pub fn is_structural(&self) -> bool {
        matches!(self.kind, ErrorKind::Lexer | ErrorKind::Parser)
    }

    /// 1-based column of the error start within its line of `source`.
    pub fn column(&self, source: &str) -> usize {
        offset_to_line_col(source, self.span.start).1
    }

    /// Format the error with source context.
    pub fn format_with_source(&self, source: &str) -> String {
        format!(
            "[{}] line {}:{}: {}",
            match self.kind {
                ErrorKind::Lexer => "lexer",
                ErrorKind::Parser => "parser",
                ErrorKind::Expression => "expression",
                ErrorKind::Resolve => "resolve",
            },
            self.span.line,
            self.column(source),
            self.message,
        )
    }
}

fn offset_to_line_col(source: &str, offset: usize) -> (usize, usize) {
    let mut line = 1;
    let mut col = 1;
    for (i, ch) in source.char_indices() {
        if i >= offset {
            break;
        }
        if ch == '\n' {
            line += 1;
            col = 1;
        } else {
            col += 1;
        }
    }
    (line, col)
}
