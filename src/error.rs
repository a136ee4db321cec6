use crate::dsl::error::{DslError, ErrorKind};

/// A source unit could not be fetched or read.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{unit}: failed to load source: {message}")]
pub struct SourceLoadError {
    pub unit: String,
    pub message: String,
}

/// Malformed or unbalanced block structure.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{unit}:{line}:{column}: parse error: {message}")]
pub struct ParseError {
    pub unit: String,
    pub line: usize,
    pub column: usize,
    pub message: String,
}

/// A unit parsed but could not be made executable: a malformed embedded
/// expression or a reference that names nothing.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{unit}:{line}:{column}: compile error: {message}")]
pub struct CompileError {
    pub unit: String,
    pub line: usize,
    pub column: usize,
    pub message: String,
}

/// Everything that can make one source unit fail as a whole.
#[derive(Debug, Clone, thiserror::Error)]
pub enum UnitError {
    #[error(transparent)]
    SourceLoad(#[from] SourceLoadError),
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Compile(#[from] CompileError),
}

impl UnitError {
    /// Attach the unit name and source position to a pipeline error and
    /// sort it into the taxonomy. `source` is the unit text the error came from.
    pub fn from_dsl(unit: &str, source: &str, err: DslError) -> Self {
        let unit = unit.to_string();
        let line = err.span.line;
        let column = err.column(source);
        let message = err.message;
        match err.kind {
            ErrorKind::Lexer | ErrorKind::Parser => Self::Parse(ParseError {
                unit,
                line,
                column,
                message,
            }),
            ErrorKind::Expression | ErrorKind::Resolve => Self::Compile(CompileError {
                unit,
                line,
                column,
                message,
            }),
        }
    }

    pub fn unit(&self) -> &str {
        match self {
            Self::SourceLoad(e) => &e.unit,
            Self::Parse(e) => &e.unit,
            Self::Compile(e) => &e.unit,
        }
    }
}

/// Failure during a live main, constructor, tick, render, or handler call.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RuntimeError {
    #[error("Undefined variable '{0}'")]
    UndefinedVariable(String),
    #[error("Unknown entity type '{0}'")]
    UnknownEntityType(String),
    #[error("Entity '{entity}' has no field '{field}'")]
    UnknownField { entity: String, field: String },
    #[error("Type mismatch: {0}")]
    TypeMismatch(String),
    #[error("'{name}' expects {expected} argument(s), got {got}")]
    ArityMismatch {
        name: String,
        expected: usize,
        got: usize,
    },
    #[error("No method '{method}' on {target}")]
    UnknownMethod { target: String, method: String },
    #[error("Invalid color literal '{0}'")]
    InvalidColor(String),
    #[error("Unknown image '{0}'")]
    UnknownImage(String),
    #[error("'this' used outside of an entity")]
    ThisOutsideEntity,
    #[error("Unset value used in arithmetic")]
    UnsetArithmetic,
    /// Nested spawns, handlers or ticks went deeper than the runtime allows.
    #[error("Call depth limit of {0} exceeded")]
    RecursionLimit(usize),
    /// A failure inside one entity's tick, render or handler, with the
    /// entity that raised it.
    #[error("{phase} of {entity}#{id} failed: {source}")]
    InEntity {
        entity: String,
        id: u64,
        phase: &'static str,
        #[source]
        source: Box<RuntimeError>,
    },
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::dsl::ast::Span;

    #[test]
    fn dsl_errors_sort_by_stage() {
        let src = "entity A\n\n\n  tick ->";
        let parse = UnitError::from_dsl("a.ryx", src, DslError::parser("Missing 'end'", Span::new(13, 17, 4)));
        assert!(matches!(parse, UnitError::Parse(ParseError { line: 4, column: 3, .. })));
        assert_eq!(parse.to_string(), "a.ryx:4:3: parse error: Missing 'end'");

        let compile = UnitError::from_dsl("b.ryx", "", DslError::resolve("Unresolved reference 'X::y'", Span::new(0, 1, 1)));
        assert!(matches!(compile, UnitError::Compile(_)));
        assert_eq!(compile.unit(), "b.ryx");
    }

    #[test]
    fn translated_errors_carry_columns() {
        let src = "main ->\n  x = Nope::thing()\nend";
        let err = crate::dsl::translate("c.ryx", src).unwrap_err();
        let UnitError::Compile(e) = UnitError::from_dsl("c.ryx", src, err) else {
            unreachable!("resolve errors are compile errors");
        };
        assert_eq!((e.line, e.column), (2, 7));
    }
}
