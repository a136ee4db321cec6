//! Entity synthesis: turns parsed blocks into the constructible types and
//! entry point of one program unit.

use indexmap::IndexMap;

use super::ast::*;
use super::desugar::{lower_body, lower_expr};
use super::error::DslError;

/// A compiled callable body with its parameter names.
#[derive(Debug, Clone)]
pub struct Method {
    pub params: Vec<String>,
    pub body: Vec<Stmt>,
}

/// One property slot. `None` binds the unset sentinel.
#[derive(Debug, Clone)]
pub struct Initializer {
    pub name: String,
    pub value: Option<Expr>,
}

#[derive(Debug, Clone)]
pub struct EntityType {
    pub name: String,
    /// Runs in declaration order before the constructor body.
    pub initializers: Vec<Initializer>,
    /// `init` params and body; zero params and an empty body when absent.
    pub constructor: Method,
    /// Single parameter: the elapsed seconds.
    pub tick: Option<Method>,
    pub render: Option<Method>,
    /// Event name to handler, in declaration order.
    pub handlers: IndexMap<String, Method>,
    pub span: Span,
}

impl EntityType {
    pub fn arity(&self) -> usize {
        self.constructor.params.len()
    }

    pub fn handler(&self, event: &str) -> Option<&Method> {
        self.handlers.get(event)
    }
}

/// Everything one source unit contributes to a runtime.
#[derive(Debug, Clone)]
pub struct ProgramUnit {
    pub name: String,
    pub main: Option<Vec<Stmt>>,
    pub entities: Vec<EntityType>,
}

pub fn synthesize_unit(name: &str, nodes: &[BlockNode]) -> Result<ProgramUnit, DslError> {
    let mut main: Option<Vec<Stmt>> = None;
    let mut entities = Vec::new();

    for node in nodes {
        match node {
            BlockNode::Main { body, span } => {
                if main.is_some() {
                    return Err(DslError::parser("Duplicate 'main' block in unit", *span));
                }
                main = Some(lower_body(body)?);
            }
            BlockNode::EntityDef(def) => entities.push(synthesize_entity(def)?),
            BlockNode::IfChain { span, .. } | BlockNode::CountingLoop { span, .. } => {
                return Err(DslError::parser("Statement outside of a block", *span));
            }
            BlockNode::RawStatement(payload) => {
                return Err(DslError::parser("Statement outside of a block", payload.span));
            }
        }
    }

    Ok(ProgramUnit {
        name: name.to_string(),
        main,
        entities,
    })
}

pub fn synthesize_entity(def: &EntityDef) -> Result<EntityType, DslError> {
    let initializers = def
        .properties
        .iter()
        .map(|p| {
            Ok(Initializer {
                name: p.name.clone(),
                value: p.initializer.as_ref().map(lower_expr).transpose()?,
            })
        })
        .collect::<Result<Vec<_>, DslError>>()?;

    let constructor = match &def.init {
        Some(init) => Method {
            params: init.params.clone(),
            body: lower_body(&init.body)?,
        },
        None => Method {
            params: Vec::new(),
            body: Vec::new(),
        },
    };

    let tick = def
        .tick
        .as_ref()
        .map(|t| {
            Ok::<_, DslError>(Method {
                params: vec![t.delta.clone()],
                body: lower_body(&t.body)?,
            })
        })
        .transpose()?;

    let render = def
        .render
        .as_ref()
        .map(|r| {
            Ok::<_, DslError>(Method {
                params: Vec::new(),
                body: lower_body(&r.body)?,
            })
        })
        .transpose()?;

    let mut handlers = IndexMap::new();
    for h in &def.handlers {
        handlers.insert(
            h.event.clone(),
            Method {
                params: h.params.clone(),
                body: lower_body(&h.body)?,
            },
        );
    }

    Ok(EntityType {
        name: def.name.clone(),
        initializers,
        constructor,
        tick,
        render,
        handlers,
        span: def.span,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::dsl::lexer::lex;
    use crate::dsl::parser::parse;

    fn unit(src: &str) -> ProgramUnit {
        synthesize_unit("test", &parse(lex(src).unwrap()).unwrap()).unwrap()
    }

    #[test]
    fn initializers_in_declaration_order() {
        let u = unit("entity P\n prop a = 1\n prop b\n state c = a + 1\nend");
        let ty = &u.entities[0];
        let names: Vec<&str> = ty.initializers.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
        assert!(ty.initializers[1].value.is_none());
        assert!(ty.initializers[2].value.is_some());
    }

    #[test]
    fn zero_arg_constructor_without_init() {
        let u = unit("entity P\n prop a = 1\nend");
        assert_eq!(u.entities[0].arity(), 0);
        assert!(u.entities[0].constructor.body.is_empty());
    }

    #[test]
    fn init_becomes_constructor() {
        let u = unit("entity P\n init(x: float, y) ->\n  this.x = x\n end\nend");
        let ty = &u.entities[0];
        assert_eq!(ty.constructor.params, vec!["x".to_string(), "y".to_string()]);
        assert_eq!(ty.constructor.body.len(), 1);
    }

    #[test]
    fn handler_table_by_event_name() {
        let u = unit("entity P\n on 'hit'(dmg) ->\n  x = dmg\n end\n on 'die' ->\n end\nend");
        let ty = &u.entities[0];
        assert!(ty.handler("hit").is_some());
        assert!(ty.handler("die").is_some());
        assert!(ty.handler("on_hit").is_none());
        assert_eq!(ty.handlers.keys().collect::<Vec<_>>(), vec!["hit", "die"]);
    }

    #[test]
    fn tick_binds_delta_name() {
        let u = unit("entity P\n tick(dt) ->\n end\nend");
        assert_eq!(u.entities[0].tick.as_ref().unwrap().params, vec!["dt".to_string()]);
    }

    #[test]
    fn main_and_entities() {
        let u = unit("entity A\nend\nmain ->\n spawn(A)\nend");
        assert!(u.main.is_some());
        assert_eq!(u.entities.len(), 1);
    }

    #[test]
    fn duplicate_main_rejected() {
        let nodes = parse(lex("main ->\nend\nmain ->\nend").unwrap()).unwrap();
        assert!(synthesize_unit("t", &nodes).is_err());
    }
}
