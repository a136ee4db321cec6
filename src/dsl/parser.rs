//! Block parser. Recursive descent over the token stream: every opener
//! (`main`, `entity`, `init`, `tick`, `render`, `on`, `if`, `loop`) parses its
//! own body and then consumes exactly one `end`, so an `end` always closes the
//! innermost open block. Statement and condition text is kept as token
//! payloads for the desugarer.

use super::ast::*;
use super::error::DslError;
use super::lexer::{SpannedToken, Token};

pub fn parse(tokens: Vec<SpannedToken>) -> Result<Vec<BlockNode>, DslError> {
    let mut parser = Parser::new(tokens);
    parser.parse_unit()
}

struct Parser {
    tokens: Vec<SpannedToken>,
    pos: usize,
}

impl Parser {
    fn new(tokens: Vec<SpannedToken>) -> Self {
        Self { tokens, pos: 0 }
    }

    fn parse_unit(&mut self) -> Result<Vec<BlockNode>, DslError> {
        let mut nodes = Vec::new();
        let mut entity_names: Vec<String> = Vec::new();

        self.skip_terminators();
        while !self.at_eof() {
            match self.peek() {
                Token::Entity => {
                    let def = self.parse_entity()?;
                    if entity_names.contains(&def.name) {
                        return Err(DslError::parser(
                            format!("Entity '{}' is defined twice", def.name),
                            def.span,
                        ));
                    }
                    entity_names.push(def.name.clone());
                    nodes.push(BlockNode::EntityDef(def));
                }
                _ if self.at_word("main") => nodes.push(self.parse_main()?),
                other => {
                    return Err(DslError::parser(
                        format!("Expected 'main ->' or 'entity' at top level, got {other:?}"),
                        self.span(),
                    ));
                }
            }
            self.skip_terminators();
        }
        Ok(nodes)
    }

    // ── Helpers ────────────────────────────────────────────────────

    fn peek(&self) -> &Token {
        self.tokens.get(self.pos).map_or(&Token::Eof, |t| &t.token)
    }

    fn span(&self) -> Span {
        self.tokens.get(self.pos).map_or_else(Span::default, |t| t.span)
    }

    fn at_eof(&self) -> bool {
        matches!(self.peek(), Token::Eof)
    }

    /// Current token is the contextual keyword `word`.
    fn at_word(&self, word: &str) -> bool {
        matches!(self.peek(), Token::Ident(name) if name == word)
    }

    fn advance(&mut self) -> SpannedToken {
        let tok = self.tokens[self.pos].clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        tok
    }

    fn expect(&mut self, expected: &Token) -> Result<Span, DslError> {
        if self.peek() == expected {
            Ok(self.advance().span)
        } else {
            Err(DslError::parser(
                format!("Expected {expected:?}, got {:?}", self.peek()),
                self.span(),
            ))
        }
    }

    fn expect_word(&mut self, word: &str) -> Result<Span, DslError> {
        if self.at_word(word) {
            Ok(self.advance().span)
        } else {
            Err(DslError::parser(
                format!("Expected '{word}', got {:?}", self.peek()),
                self.span(),
            ))
        }
    }

    fn expect_ident(&mut self) -> Result<(String, Span), DslError> {
        if let Token::Ident(name) = self.peek().clone() {
            let sp = self.advance().span;
            Ok((name, sp))
        } else {
            Err(DslError::parser(
                format!("Expected identifier, got {:?}", self.peek()),
                self.span(),
            ))
        }
    }

    /// Consume the `end` that closes a block opened at `opener`.
    fn expect_end(&mut self, what: &str, opener: Span) -> Result<Span, DslError> {
        match self.peek() {
            Token::End => Ok(self.advance().span),
            Token::Eof => Err(DslError::parser(
                format!("Missing 'end' for {what} opened on line {}", opener.line),
                self.span(),
            )),
            other => Err(DslError::parser(
                format!("Expected 'end' to close {what} opened on line {}, got {other:?}", opener.line),
                self.span(),
            )),
        }
    }

    fn skip_terminators(&mut self) {
        while matches!(self.peek(), Token::Newline | Token::Semicolon) {
            self.advance();
        }
    }

    /// Skip `: Type` and unit annotations after a declared name.
    fn skip_annotations(&mut self) -> Result<(), DslError> {
        loop {
            match self.peek() {
                Token::UnitAnnotation(_) => {
                    self.advance();
                }
                Token::Colon => {
                    self.advance();
                    self.expect_ident()?;
                }
                _ => return Ok(()),
            }
        }
    }

    /// Collect tokens up to (not including) `stop` on the current line.
    fn collect_until(&mut self, stop: &Token, what: &str) -> Result<Payload, DslError> {
        let start = self.span();
        let mut tokens = Vec::new();
        let mut depth = 0usize;
        loop {
            let tok = self.peek();
            if depth == 0 && tok == stop {
                break;
            }
            match tok {
                Token::Newline | Token::Semicolon | Token::Eof => {
                    return Err(DslError::parser(
                        format!("Expected {stop:?} after {what}"),
                        self.span(),
                    ));
                }
                Token::LParen => depth += 1,
                Token::RParen => depth = depth.saturating_sub(1),
                _ => {}
            }
            tokens.push(self.advance());
        }
        Self::payload(tokens, start, what)
    }

    fn payload(tokens: Vec<SpannedToken>, at: Span, what: &str) -> Result<Payload, DslError> {
        let (Some(first), Some(last)) = (tokens.first(), tokens.last()) else {
            return Err(DslError::parser(format!("Missing {what}"), at));
        };
        let span = first.span.merge(last.span);
        Ok(Payload { tokens, span })
    }

    // ── Top-level blocks ───────────────────────────────────────────

    fn parse_main(&mut self) -> Result<BlockNode, DslError> {
        let start = self.expect_word("main")?;
        self.expect(&Token::Arrow)?;
        let body = self.parse_body("'main'", start)?;
        let end = self.expect_end("'main'", start)?;
        Ok(BlockNode::Main {
            body,
            span: start.merge(end),
        })
    }

    fn parse_entity(&mut self) -> Result<EntityDef, DslError> {
        let start = self.expect(&Token::Entity)?;
        let (name, _) = self.expect_ident()?;
        let mut def = EntityDef {
            name,
            properties: Vec::new(),
            init: None,
            tick: None,
            render: None,
            handlers: Vec::new(),
            span: start,
        };

        loop {
            self.skip_terminators();
            match self.peek() {
                Token::End => {
                    def.span = start.merge(self.advance().span);
                    return Ok(def);
                }
                Token::Eof => {
                    return Err(DslError::parser(
                        format!("Missing 'end' for entity '{}' opened on line {}", def.name, start.line),
                        self.span(),
                    ));
                }
                _ => {}
            }
            let member = self.parse_member(&def.name)?;
            Self::add_member(&mut def, member)?;
        }
    }

    fn add_member(def: &mut EntityDef, member: EntityMember) -> Result<(), DslError> {
        let dup = |what: &str, span: Span| {
            DslError::parser(format!("Duplicate {what} in entity '{}'", def.name), span)
        };
        match member {
            EntityMember::Property(p) => {
                if def.properties.iter().any(|q| q.name == p.name) {
                    return Err(dup(&format!("property '{}'", p.name), p.span));
                }
                def.properties.push(p);
            }
            EntityMember::Init(b) => {
                if def.init.is_some() {
                    return Err(dup("'init'", b.span));
                }
                def.init = Some(b);
            }
            EntityMember::Tick(b) => {
                if def.tick.is_some() {
                    return Err(dup("'tick'", b.span));
                }
                def.tick = Some(b);
            }
            EntityMember::Render(b) => {
                if def.render.is_some() {
                    return Err(dup("'render'", b.span));
                }
                def.render = Some(b);
            }
            EntityMember::OnEvent(h) => {
                if def.handlers.iter().any(|g| g.event == h.event) {
                    return Err(dup(&format!("handler for '{}'", h.event), h.span));
                }
                def.handlers.push(h);
            }
        }
        Ok(())
    }

    // ── Entity members ─────────────────────────────────────────────

    fn parse_member(&mut self, entity: &str) -> Result<EntityMember, DslError> {
        let start = self.span();
        let word = match self.peek() {
            Token::Ident(w) => w.clone(),
            other => {
                return Err(DslError::parser(
                    format!("Unexpected {other:?} in entity '{entity}'"),
                    start,
                ));
            }
        };
        match word.as_str() {
            "prop" | "state" => self.parse_property(),
            "init" => {
                self.advance();
                let params = self.parse_params()?;
                self.expect(&Token::Arrow)?;
                let body = self.parse_body("'init'", start)?;
                let end = self.expect_end("'init'", start)?;
                Ok(EntityMember::Init(InitBlock {
                    params,
                    body,
                    span: start.merge(end),
                }))
            }
            "tick" => {
                self.advance();
                let delta = if matches!(self.peek(), Token::LParen) {
                    let params = self.parse_params()?;
                    match params.as_slice() {
                        [] => "delta".to_string(),
                        [name] => name.clone(),
                        _ => {
                            return Err(DslError::parser(
                                "'tick' takes at most one parameter",
                                start,
                            ));
                        }
                    }
                } else {
                    "delta".to_string()
                };
                self.expect(&Token::Arrow)?;
                let body = self.parse_body("'tick'", start)?;
                let end = self.expect_end("'tick'", start)?;
                Ok(EntityMember::Tick(TickBlock {
                    delta,
                    body,
                    span: start.merge(end),
                }))
            }
            "render" => {
                self.advance();
                if matches!(self.peek(), Token::LParen) && !self.parse_params()?.is_empty() {
                    return Err(DslError::parser("'render' takes no parameters", start));
                }
                self.expect(&Token::Arrow)?;
                let body = self.parse_body("'render'", start)?;
                let end = self.expect_end("'render'", start)?;
                Ok(EntityMember::Render(RenderBlock {
                    body,
                    span: start.merge(end),
                }))
            }
            "on" => {
                self.advance();
                let event = match self.peek().clone() {
                    Token::Str(s) => {
                        self.advance();
                        s
                    }
                    other => {
                        return Err(DslError::parser(
                            format!("Expected quoted event name after 'on', got {other:?}"),
                            self.span(),
                        ));
                    }
                };
                let params = if matches!(self.peek(), Token::LParen) {
                    self.parse_params()?
                } else {
                    Vec::new()
                };
                self.expect(&Token::Arrow)?;
                let what = format!("handler 'on {event}'");
                let body = self.parse_body(&what, start)?;
                let end = self.expect_end(&what, start)?;
                Ok(EntityMember::OnEvent(EventHandler {
                    event,
                    params,
                    body,
                    span: start.merge(end),
                }))
            }
            other => Err(DslError::parser(
                format!("Unexpected '{other}' in entity '{entity}'; expected prop, state, init, tick, render or on"),
                start,
            )),
        }
    }

    fn parse_property(&mut self) -> Result<EntityMember, DslError> {
        let kw = self.advance();
        let kind = match &kw.token {
            Token::Ident(w) if w == "state" => PropertyKind::State,
            _ => PropertyKind::Prop,
        };
        let (name, name_span) = self.expect_ident()?;
        self.skip_annotations()?;

        let initializer = if matches!(self.peek(), Token::Eq) {
            let eq = self.advance().span;
            let mut tokens = Vec::new();
            let mut depth = 0usize;
            loop {
                match self.peek() {
                    Token::Newline | Token::Semicolon | Token::Eof => break,
                    Token::End if depth == 0 => break,
                    Token::LParen => depth += 1,
                    Token::RParen => depth = depth.saturating_sub(1),
                    _ => {}
                }
                tokens.push(self.advance());
            }
            Some(Self::payload(tokens, eq, &format!("initializer for '{name}'"))?)
        } else {
            None
        };

        if !matches!(self.peek(), Token::Newline | Token::Semicolon | Token::End | Token::Eof) {
            return Err(DslError::parser(
                format!("Unexpected {:?} after property '{name}'", self.peek()),
                self.span(),
            ));
        }

        let span = initializer
            .as_ref()
            .map_or(kw.span.merge(name_span), |p| kw.span.merge(p.span));
        Ok(EntityMember::Property(Property {
            name,
            kind,
            initializer,
            span,
        }))
    }

    /// `(a: Type, b)`: names only, annotations dropped.
    fn parse_params(&mut self) -> Result<Vec<String>, DslError> {
        self.expect(&Token::LParen)?;
        let mut params = Vec::new();
        if matches!(self.peek(), Token::RParen) {
            self.advance();
            return Ok(params);
        }
        loop {
            let (name, span) = self.expect_ident()?;
            if params.contains(&name) {
                return Err(DslError::parser(format!("Duplicate parameter '{name}'"), span));
            }
            params.push(name);
            self.skip_annotations()?;
            match self.peek() {
                Token::Comma => {
                    self.advance();
                }
                Token::RParen => {
                    self.advance();
                    return Ok(params);
                }
                other => {
                    return Err(DslError::parser(
                        format!("Expected ',' or ')' in parameter list, got {other:?}"),
                        self.span(),
                    ));
                }
            }
        }
    }

    // ── Bodies ─────────────────────────────────────────────────────

    /// Parse statements until `end` or `else` at this nesting level. The
    /// caller consumes the closing keyword.
    fn parse_body(&mut self, what: &str, opener: Span) -> Result<Vec<BlockNode>, DslError> {
        let mut body = Vec::new();
        loop {
            self.skip_terminators();
            match self.peek() {
                Token::End | Token::Else => return Ok(body),
                Token::Eof => {
                    return Err(DslError::parser(
                        format!("Missing 'end' for {what} opened on line {}", opener.line),
                        self.span(),
                    ));
                }
                Token::If => body.push(self.parse_if()?),
                Token::Loop => body.push(self.parse_loop()?),
                Token::Entity => {
                    return Err(DslError::parser(
                        "'entity' is only allowed at top level",
                        self.span(),
                    ));
                }
                _ if self.at_word("main") && self.is_header_arrow() => {
                    return Err(DslError::parser("'main' is only allowed at top level", self.span()));
                }
                _ => body.push(BlockNode::RawStatement(self.parse_raw_statement()?)),
            }
        }
    }

    fn is_header_arrow(&self) -> bool {
        self.tokens
            .get(self.pos + 1)
            .is_some_and(|t| matches!(t.token, Token::Arrow))
    }

    fn parse_raw_statement(&mut self) -> Result<Payload, DslError> {
        let start = self.span();
        let mut tokens = Vec::new();
        let mut depth = 0usize;
        loop {
            match self.peek() {
                Token::Newline | Token::Semicolon | Token::Eof => break,
                Token::End | Token::Else if depth == 0 => break,
                Token::Then | Token::Arrow | Token::Entity | Token::If | Token::Loop if depth == 0 => {
                    return Err(DslError::parser(
                        format!("Unexpected {:?} in statement", self.peek()),
                        self.span(),
                    ));
                }
                Token::LParen => depth += 1,
                Token::RParen => depth = depth.saturating_sub(1),
                _ => {}
            }
            tokens.push(self.advance());
        }
        Self::payload(tokens, start, "statement")
    }

    fn parse_if(&mut self) -> Result<BlockNode, DslError> {
        let start = self.expect(&Token::If)?;
        let mut branches = Vec::new();
        let mut otherwise = None;

        let condition = self.collect_until(&Token::Then, "'if' condition")?;
        self.advance();
        let body = self.parse_body("'if'", start)?;
        branches.push(IfBranch { condition, body });

        while matches!(self.peek(), Token::Else) {
            self.advance();
            if matches!(self.peek(), Token::If) {
                self.advance();
                let condition = self.collect_until(&Token::Then, "'else if' condition")?;
                self.advance();
                let body = self.parse_body("'if'", start)?;
                branches.push(IfBranch { condition, body });
            } else {
                let body = self.parse_body("'if'", start)?;
                otherwise = Some(body);
                if matches!(self.peek(), Token::Else) {
                    return Err(DslError::parser("'else' after final 'else'", self.span()));
                }
            }
        }

        let end = self.expect_end("'if'", start)?;
        Ok(BlockNode::IfChain {
            branches,
            otherwise,
            span: start.merge(end),
        })
    }

    fn parse_loop(&mut self) -> Result<BlockNode, DslError> {
        let start = self.expect(&Token::Loop)?;
        let (var, _) = self.expect_ident()?;
        self.expect_word("from")?;
        let from = self.collect_until(&Token::Ident("to".into()), "loop start")?;
        self.advance();
        let to = self.collect_until(&Token::Arrow, "loop bound")?;
        self.advance();
        let body = self.parse_body("'loop'", start)?;
        let end = self.expect_end("'loop'", start)?;
        Ok(BlockNode::CountingLoop {
            var,
            from,
            to,
            body,
            span: start.merge(end),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::dsl::lexer::lex;

    fn parse_str(s: &str) -> Vec<BlockNode> {
        let tokens = lex(s).unwrap();
        parse(tokens).unwrap()
    }

    fn parse_err(s: &str) -> DslError {
        let tokens = lex(s).unwrap();
        parse(tokens).unwrap_err()
    }

    fn only_entity(nodes: &[BlockNode]) -> &EntityDef {
        match nodes {
            [BlockNode::EntityDef(def)] => def,
            other => panic!("expected one entity, got {other:?}"),
        }
    }

    #[test]
    fn nested_blocks_close_by_depth() {
        let src = "entity E\n  tick ->\n    if c1 then\n      loop i from 0 to 2 ->\n        x = i\n      end\n      y = 1\n    end\n    z = 2\n  end\nend\n";
        let nodes = parse_str(src);
        let def = only_entity(&nodes);
        let tick = def.tick.as_ref().unwrap();
        assert_eq!(tick.body.len(), 2);
        let BlockNode::IfChain { branches, otherwise, .. } = &tick.body[0] else {
            panic!("expected if chain");
        };
        assert!(otherwise.is_none());
        assert_eq!(branches.len(), 1);
        assert_eq!(branches[0].body.len(), 2);
        let BlockNode::CountingLoop { var, body, .. } = &branches[0].body[0] else {
            panic!("expected loop");
        };
        assert_eq!(var, "i");
        assert_eq!(body.len(), 1);
        assert!(matches!(tick.body[1], BlockNode::RawStatement(_)));
    }

    #[test]
    fn sibling_handlers() {
        let src = "entity E\n on 'a'(x) ->\n  if x then\n   y = 1\n  end\n end\n on 'b' ->\n  z = 1\n end\nend";
        let nodes = parse_str(src);
        let def = only_entity(&nodes);
        assert_eq!(def.handlers.len(), 2);
        assert_eq!(def.handlers[0].event, "a");
        assert_eq!(def.handlers[0].params, vec!["x".to_string()]);
        assert_eq!(def.handlers[1].event, "b");
        assert!(def.handlers[1].params.is_empty());
    }

    #[test]
    fn properties_keep_declaration_order_and_drop_types() {
        let src = "entity P\n  prop speed: float<px/s> = 200\n  state hits: int\n  prop name = 'p'\nend";
        let nodes = parse_str(src);
        let def = only_entity(&nodes);
        let names: Vec<&str> = def.properties.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["speed", "hits", "name"]);
        assert!(def.properties[0].has_initializer());
        assert!(!def.properties[1].has_initializer());
        assert_eq!(def.properties[1].kind, PropertyKind::State);
        assert_eq!(def.properties[0].initializer.as_ref().unwrap().tokens.len(), 1);
    }

    #[test]
    fn init_params_strip_annotations() {
        let src = "entity B\n  init(pos: Vector2, speed: float<px/s>) ->\n    this.pos = pos\n  end\nend";
        let nodes = parse_str(src);
        let def = only_entity(&nodes);
        assert_eq!(def.init.as_ref().unwrap().params, vec!["pos".to_string(), "speed".to_string()]);
    }

    #[test]
    fn tick_parameter_name() {
        let nodes = parse_str("entity A\n tick(dt) ->\n end\nend");
        assert_eq!(only_entity(&nodes).tick.as_ref().unwrap().delta, "dt");
        let nodes = parse_str("entity A\n tick ->\n end\nend");
        assert_eq!(only_entity(&nodes).tick.as_ref().unwrap().delta, "delta");
    }

    #[test]
    fn else_if_chain() {
        let src = "main ->\n if a then\n  x = 1\n else if b then\n  x = 2\n else\n  x = 3\n end\nend";
        let nodes = parse_str(src);
        let [BlockNode::Main { body, .. }] = nodes.as_slice() else {
            panic!("expected main");
        };
        let BlockNode::IfChain { branches, otherwise, .. } = &body[0] else {
            panic!("expected if chain");
        };
        assert_eq!(branches.len(), 2);
        assert_eq!(otherwise.as_ref().unwrap().len(), 1);
    }

    #[test]
    fn single_line_if() {
        let nodes = parse_str("main ->\n if a then x = 1 end\nend");
        let [BlockNode::Main { body, .. }] = nodes.as_slice() else {
            panic!("expected main");
        };
        assert_eq!(body.len(), 1);
    }

    #[test]
    fn unbalanced_block_reports_line() {
        let err = parse_err("entity E\n  tick ->\n    if a then\n      x = 1\n  end\nend");
        assert!(err.is_structural());
        assert!(err.message.contains("Missing 'end'"), "{}", err.message);
    }

    #[test]
    fn stray_end_at_top_level() {
        let err = parse_err("main ->\nend\nend");
        assert!(err.message.contains("top level"));
        assert_eq!(err.span.line, 3);
    }

    #[test]
    fn duplicate_tick_rejected() {
        let err = parse_err("entity E\n tick ->\n end\n tick ->\n end\nend");
        assert!(err.message.contains("Duplicate 'tick'"));
    }

    #[test]
    fn duplicate_entity_rejected() {
        let err = parse_err("entity E\nend\nentity E\nend");
        assert!(err.message.contains("defined twice"));
    }

    #[test]
    fn loop_bounds_are_payloads() {
        let nodes = parse_str("main ->\n loop i from 0 to n + 1 ->\n  f(i)\n end\nend");
        let [BlockNode::Main { body, .. }] = nodes.as_slice() else {
            panic!("expected main");
        };
        let BlockNode::CountingLoop { from, to, .. } = &body[0] else {
            panic!("expected loop");
        };
        assert_eq!(from.tokens.len(), 1);
        assert_eq!(to.tokens.len(), 3);
    }

    #[test]
    fn missing_then() {
        let err = parse_err("main ->\n if a\n  x = 1\n end\nend");
        assert!(err.message.contains("Then"));
    }
}
