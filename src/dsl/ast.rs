//! Node types for RyxScript: the block tree produced by the parser and the
//! statement/expression tree the desugarer lowers block bodies into.

use super::builtins::{BuiltinMember, GlobalFn};
use super::lexer::SpannedToken;

/// Source span for error reporting. `line` is 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    pub line: usize,
}

impl Span {
    pub fn new(start: usize, end: usize, line: usize) -> Self {
        Self { start, end, line }
    }

    pub fn merge(self, other: Span) -> Span {
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
            line: self.line.min(other.line),
        }
    }
}

// ── Block tree ──────────────────────────────────────────────────

/// Opaque host expression or statement text, kept as tokens until the
/// desugarer hands it to the expression parser.
#[derive(Debug, Clone)]
pub struct Payload {
    pub tokens: Vec<SpannedToken>,
    pub span: Span,
}

/// One `keyword ... end` construct, or a raw statement inside a body.
#[derive(Debug, Clone)]
pub enum BlockNode {
    /// `main -> ... end`
    Main { body: Vec<BlockNode>, span: Span },
    /// `entity Name ... end`
    EntityDef(EntityDef),
    /// `if c then ... [else if c then ...]* [else ...] end`
    IfChain {
        branches: Vec<IfBranch>,
        otherwise: Option<Vec<BlockNode>>,
        span: Span,
    },
    /// `loop var from A to B -> ... end`
    CountingLoop {
        var: String,
        from: Payload,
        to: Payload,
        body: Vec<BlockNode>,
        span: Span,
    },
    RawStatement(Payload),
}

#[derive(Debug, Clone)]
pub struct IfBranch {
    pub condition: Payload,
    pub body: Vec<BlockNode>,
}

/// One member line or block inside an `entity` body.
#[derive(Debug, Clone)]
pub enum EntityMember {
    Property(Property),
    Init(InitBlock),
    Tick(TickBlock),
    Render(RenderBlock),
    OnEvent(EventHandler),
}

#[derive(Debug, Clone)]
pub struct EntityDef {
    pub name: String,
    /// Declaration order is load-bearing: initializers run in this order.
    pub properties: Vec<Property>,
    pub init: Option<InitBlock>,
    pub tick: Option<TickBlock>,
    pub render: Option<RenderBlock>,
    pub handlers: Vec<EventHandler>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyKind {
    Prop,
    State,
}

/// `prop name: Type = expr` or `state name: Type`. The type is discarded.
#[derive(Debug, Clone)]
pub struct Property {
    pub name: String,
    pub kind: PropertyKind,
    pub initializer: Option<Payload>,
    pub span: Span,
}

impl Property {
    pub fn has_initializer(&self) -> bool {
        self.initializer.is_some()
    }
}

#[derive(Debug, Clone)]
pub struct InitBlock {
    pub params: Vec<String>,
    pub body: Vec<BlockNode>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct TickBlock {
    /// Name the elapsed seconds are bound to (`delta` unless `tick(name)`).
    pub delta: String,
    pub body: Vec<BlockNode>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct RenderBlock {
    pub body: Vec<BlockNode>,
    pub span: Span,
}

/// `on 'event'(params) -> ... end`
#[derive(Debug, Clone)]
pub struct EventHandler {
    pub event: String,
    pub params: Vec<String>,
    pub body: Vec<BlockNode>,
    pub span: Span,
}

// ── Statement / expression tree ─────────────────────────────────

#[derive(Debug, Clone)]
pub enum Stmt {
    Let {
        name: String,
        value: Expr,
        span: Span,
    },
    Assign {
        target: Place,
        op: AssignOp,
        value: Expr,
        span: Span,
    },
    Expr(Expr),
    If {
        branches: Vec<(Expr, Vec<Stmt>)>,
        otherwise: Option<Vec<Stmt>>,
        span: Span,
    },
    /// Integers from `from` inclusive to `to` exclusive, step 1.
    Loop {
        var: String,
        from: Expr,
        to: Expr,
        body: Vec<Stmt>,
        span: Span,
    },
}

/// Assignable location: a local or `this`, followed by a field path.
#[derive(Debug, Clone)]
pub struct Place {
    pub base: PlaceBase,
    pub fields: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaceBase {
    Local(String),
    This,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignOp {
    Set,
    Add,
    Sub,
    Mul,
    Div,
}

impl AssignOp {
    /// The binary operator a compound assignment applies.
    pub fn binary(self) -> Option<BinOp> {
        match self {
            Self::Set => None,
            Self::Add => Some(BinOp::Add),
            Self::Sub => Some(BinOp::Sub),
            Self::Mul => Some(BinOp::Mul),
            Self::Div => Some(BinOp::Div),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub enum ExprKind {
    Number(f64),
    Str(String),
    Bool(bool),
    /// The explicit "unset" sentinel literal.
    Unset,
    This,
    Ident(String),
    Binary {
        op: BinOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Field {
        object: Box<Expr>,
        field: String,
    },
    MethodCall {
        object: Box<Expr>,
        method: String,
        args: Vec<Expr>,
    },
    /// `name(args)` before resolution against the global function table.
    Call { name: String, args: Vec<Expr> },
    /// `Module::member` or `Module::member(args)` before resolution.
    Namespaced {
        module: String,
        member: String,
        args: Option<Vec<Expr>>,
    },
    /// `spawn(Type, args...)`
    Spawn { type_name: String, args: Vec<Expr> },
    /// Resolved namespaced member.
    Builtin {
        member: &'static BuiltinMember,
        args: Vec<Expr>,
    },
    /// Resolved global function call.
    Global {
        func: &'static GlobalFn,
        args: Vec<Expr>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Lt,
    Gt,
    Le,
    Ge,
    Eq,
    Ne,
    And,
    Or,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Not,
}
