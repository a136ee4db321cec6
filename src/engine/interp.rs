//! Tree-walking evaluator for statement bodies. Every call gets a `Frame`
//! holding the receiver entity (if any) and a stack of lexical scopes.

use std::collections::HashMap;

use crate::dsl::ast::{BinOp, Expr, ExprKind, Place, PlaceBase, Stmt, UnaryOp};
use crate::dsl::builtins::{BuiltinMember, BuiltinOp, GlobalFn, GlobalOp};
use crate::error::RuntimeError;
use crate::model::{Color, Vector2};

use super::entity::EntityRef;
use super::runtime::Runtime;
use super::value::{mismatch, Value};

pub struct Frame {
    this: Option<EntityRef>,
    scopes: Vec<HashMap<String, Value>>,
}

impl Frame {
    pub fn new(this: Option<EntityRef>) -> Self {
        Self {
            this,
            scopes: vec![HashMap::new()],
        }
    }

    pub fn define(&mut self, name: &str, value: Value) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.to_string(), value);
        }
    }

    fn lookup(&self, name: &str) -> Option<&Value> {
        self.scopes.iter().rev().find_map(|s| s.get(name))
    }

    fn lookup_mut(&mut self, name: &str) -> Option<&mut Value> {
        self.scopes.iter_mut().rev().find_map(|s| s.get_mut(name))
    }

    fn this(&self) -> Result<&EntityRef, RuntimeError> {
        self.this.as_ref().ok_or(RuntimeError::ThisOutsideEntity)
    }

    fn push_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    fn pop_scope(&mut self) {
        if self.scopes.len() > 1 {
            self.scopes.pop();
        }
    }
}

// ── Statements ──────────────────────────────────────────────────

pub fn exec_block(rt: &Runtime, frame: &mut Frame, stmts: &[Stmt]) -> Result<(), RuntimeError> {
    frame.push_scope();
    let result = stmts.iter().try_for_each(|s| exec_stmt(rt, frame, s));
    frame.pop_scope();
    result
}

fn exec_stmt(rt: &Runtime, frame: &mut Frame, stmt: &Stmt) -> Result<(), RuntimeError> {
    match stmt {
        Stmt::Let { name, value, .. } => {
            let v = eval(rt, frame, value)?;
            frame.define(name, v);
            Ok(())
        }
        Stmt::Assign {
            target, op, value, ..
        } => {
            let rhs = eval(rt, frame, value)?;
            let new = match op.binary() {
                None => rhs,
                Some(bin) => {
                    let current = read_place(frame, target)?;
                    binary(bin, &current, &rhs)?
                }
            };
            write_place(frame, target, new)
        }
        Stmt::Expr(e) => eval(rt, frame, e).map(|_| ()),
        Stmt::If {
            branches, otherwise, ..
        } => {
            for (cond, body) in branches {
                if eval(rt, frame, cond)?.truthy() {
                    return exec_block(rt, frame, body);
                }
            }
            match otherwise {
                Some(body) => exec_block(rt, frame, body),
                None => Ok(()),
            }
        }
        Stmt::Loop {
            var, from, to, body, ..
        } => {
            let start = eval(rt, frame, from)?.as_number()?;
            let end = eval(rt, frame, to)?.as_number()?;
            let mut i = start;
            while i < end {
                frame.push_scope();
                frame.define(var, Value::Number(i));
                let result = exec_block(rt, frame, body);
                frame.pop_scope();
                result?;
                i += 1.0;
            }
            Ok(())
        }
    }
}

fn read_place(frame: &Frame, place: &Place) -> Result<Value, RuntimeError> {
    let mut value = place_root(frame, &place.base)?;
    for field in &place.fields {
        value = get_field(&value, field)?;
    }
    Ok(value)
}

fn place_root(frame: &Frame, base: &PlaceBase) -> Result<Value, RuntimeError> {
    match base {
        PlaceBase::Local(name) => frame
            .lookup(name)
            .cloned()
            .ok_or_else(|| RuntimeError::UndefinedVariable(name.clone())),
        PlaceBase::This => Ok(Value::Entity(frame.this()?.clone())),
    }
}

fn write_place(frame: &mut Frame, place: &Place, value: Value) -> Result<(), RuntimeError> {
    if place.fields.is_empty() {
        return match &place.base {
            PlaceBase::Local(name) => {
                let slot = frame
                    .lookup_mut(name)
                    .ok_or_else(|| RuntimeError::UndefinedVariable(name.clone()))?;
                *slot = value;
                Ok(())
            }
            PlaceBase::This => Err(RuntimeError::TypeMismatch("cannot assign to 'this'".into())),
        };
    }

    // Value types (vectors, colors) are copied out, updated and written back.
    let root = place_root(frame, &place.base)?;
    let updated = with_field(root, &place.fields, value)?;
    if let PlaceBase::Local(name) = &place.base {
        if let Some(slot) = frame.lookup_mut(name) {
            *slot = updated;
        }
    }
    Ok(())
}

fn with_field(target: Value, fields: &[String], value: Value) -> Result<Value, RuntimeError> {
    let Some((first, rest)) = fields.split_first() else {
        return Ok(value);
    };
    let inner = if rest.is_empty() {
        value
    } else {
        with_field(get_field(&target, first)?, rest, value)?
    };
    set_field(target, first, inner)
}

fn get_field(target: &Value, field: &str) -> Result<Value, RuntimeError> {
    let unknown = |owner: &str| RuntimeError::UnknownField {
        entity: owner.to_string(),
        field: field.to_string(),
    };
    match target {
        Value::Entity(e) => e.get(field),
        Value::Vector(v) => match field {
            "x" => Ok(Value::Number(v.x)),
            "y" => Ok(Value::Number(v.y)),
            _ => Err(unknown("Vector2")),
        },
        Value::Color(c) => match field {
            "r" => Ok(Value::Number(f64::from(c.r))),
            "g" => Ok(Value::Number(f64::from(c.g))),
            "b" => Ok(Value::Number(f64::from(c.b))),
            "a" => Ok(Value::Number(c.a)),
            _ => Err(unknown("Color")),
        },
        Value::Image(img) => match field {
            "width" => Ok(Value::Number(img.width)),
            "height" => Ok(Value::Number(img.height)),
            "name" => Ok(Value::str(&img.name)),
            _ => Err(unknown("image")),
        },
        #[allow(clippy::cast_precision_loss)]
        Value::Str(s) if field == "length" => Ok(Value::Number(s.chars().count() as f64)),
        other => Err(RuntimeError::TypeMismatch(format!(
            "cannot read field '{field}' of {}",
            other.type_name()
        ))),
    }
}

fn set_field(target: Value, field: &str, value: Value) -> Result<Value, RuntimeError> {
    match target {
        Value::Entity(e) => {
            e.set(field, value);
            Ok(Value::Entity(e))
        }
        Value::Vector(mut v) => {
            match field {
                "x" => v.x = value.as_number()?,
                "y" => v.y = value.as_number()?,
                _ => {
                    return Err(RuntimeError::UnknownField {
                        entity: "Vector2".into(),
                        field: field.to_string(),
                    });
                }
            }
            Ok(Value::Vector(v))
        }
        Value::Color(c) => {
            let n = value.as_number()?;
            let (r, g, b, a) = (f64::from(c.r), f64::from(c.g), f64::from(c.b), c.a);
            let updated = match field {
                "r" => Color::from_channels(n, g, b, a),
                "g" => Color::from_channels(r, n, b, a),
                "b" => Color::from_channels(r, g, n, a),
                "a" => c.with_alpha(n),
                _ => {
                    return Err(RuntimeError::UnknownField {
                        entity: "Color".into(),
                        field: field.to_string(),
                    });
                }
            };
            Ok(Value::Color(updated))
        }
        other => Err(RuntimeError::TypeMismatch(format!(
            "cannot set field '{field}' on {}",
            other.type_name()
        ))),
    }
}

// ── Expressions ─────────────────────────────────────────────────

pub fn eval(rt: &Runtime, frame: &mut Frame, expr: &Expr) -> Result<Value, RuntimeError> {
    match &expr.kind {
        ExprKind::Number(n) => Ok(Value::Number(*n)),
        ExprKind::Str(s) => Ok(Value::str(s)),
        ExprKind::Bool(b) => Ok(Value::Bool(*b)),
        ExprKind::Unset => Ok(Value::Unset),
        ExprKind::This => Ok(Value::Entity(frame.this()?.clone())),
        ExprKind::Ident(name) => frame
            .lookup(name)
            .cloned()
            .ok_or_else(|| RuntimeError::UndefinedVariable(name.clone())),
        ExprKind::Binary {
            op: BinOp::And,
            left,
            right,
        } => {
            let l = eval(rt, frame, left)?;
            if l.truthy() {
                eval(rt, frame, right)
            } else {
                Ok(l)
            }
        }
        ExprKind::Binary {
            op: BinOp::Or,
            left,
            right,
        } => {
            let l = eval(rt, frame, left)?;
            if l.truthy() {
                Ok(l)
            } else {
                eval(rt, frame, right)
            }
        }
        ExprKind::Binary { op, left, right } => {
            let l = eval(rt, frame, left)?;
            let r = eval(rt, frame, right)?;
            binary(*op, &l, &r)
        }
        ExprKind::Unary { op, operand } => {
            let v = eval(rt, frame, operand)?;
            match op {
                UnaryOp::Not => Ok(Value::Bool(!v.truthy())),
                UnaryOp::Neg => match v {
                    Value::Number(n) => Ok(Value::Number(-n)),
                    Value::Vector(vec) => Ok(Value::Vector(-vec)),
                    Value::Unset => Err(RuntimeError::UnsetArithmetic),
                    other => Err(mismatch("number", &other)),
                },
            }
        }
        ExprKind::Field { object, field } => {
            let target = eval(rt, frame, object)?;
            get_field(&target, field)
        }
        ExprKind::MethodCall {
            object,
            method,
            args,
        } => {
            let target = eval(rt, frame, object)?;
            let args = eval_args(rt, frame, args)?;
            call_method(rt, &target, method, &args)
        }
        ExprKind::Spawn { type_name, args } => {
            let args = eval_args(rt, frame, args)?;
            rt.spawn(type_name, args).map(Value::Entity)
        }
        ExprKind::Builtin { member, args } => {
            let args = eval_args(rt, frame, args)?;
            call_builtin(rt, member, &args)
        }
        ExprKind::Global { func, args } => {
            let args = eval_args(rt, frame, args)?;
            call_global(rt, func, &args)
        }
        // The loader resolves these before anything runs.
        ExprKind::Call { name, .. } => Err(RuntimeError::UnknownMethod {
            target: "global scope".into(),
            method: name.clone(),
        }),
        ExprKind::Namespaced { module, member, .. } => Err(RuntimeError::UnknownMethod {
            target: module.clone(),
            method: member.clone(),
        }),
    }
}

fn eval_args(rt: &Runtime, frame: &mut Frame, args: &[Expr]) -> Result<Vec<Value>, RuntimeError> {
    args.iter().map(|a| eval(rt, frame, a)).collect()
}

pub fn binary(op: BinOp, l: &Value, r: &Value) -> Result<Value, RuntimeError> {
    match op {
        BinOp::Eq => return Ok(Value::Bool(l.equals(r))),
        BinOp::Ne => return Ok(Value::Bool(!l.equals(r))),
        BinOp::And => return Ok(if l.truthy() { r.clone() } else { l.clone() }),
        BinOp::Or => return Ok(if l.truthy() { l.clone() } else { r.clone() }),
        _ => {}
    }
    if l.is_unset() || r.is_unset() {
        return Err(RuntimeError::UnsetArithmetic);
    }

    let value = match (op, l, r) {
        (BinOp::Add, Value::Number(a), Value::Number(b)) => Value::Number(a + b),
        (BinOp::Sub, Value::Number(a), Value::Number(b)) => Value::Number(a - b),
        (BinOp::Mul, Value::Number(a), Value::Number(b)) => Value::Number(a * b),
        (BinOp::Div, Value::Number(a), Value::Number(b)) => Value::Number(a / b),
        (BinOp::Mod, Value::Number(a), Value::Number(b)) => Value::Number(a % b),

        (BinOp::Add, Value::Str(_), _) | (BinOp::Add, _, Value::Str(_)) => Value::str(&format!("{l}{r}")),

        (BinOp::Add, Value::Vector(a), Value::Vector(b)) => Value::Vector(*a + *b),
        (BinOp::Sub, Value::Vector(a), Value::Vector(b)) => Value::Vector(*a - *b),
        (BinOp::Mul, Value::Vector(v), Value::Number(s))
        | (BinOp::Mul, Value::Number(s), Value::Vector(v)) => Value::Vector(*v * *s),
        (BinOp::Div, Value::Vector(v), Value::Number(s)) => Value::Vector(*v / *s),

        (BinOp::Lt, Value::Number(a), Value::Number(b)) => Value::Bool(a < b),
        (BinOp::Gt, Value::Number(a), Value::Number(b)) => Value::Bool(a > b),
        (BinOp::Le, Value::Number(a), Value::Number(b)) => Value::Bool(a <= b),
        (BinOp::Ge, Value::Number(a), Value::Number(b)) => Value::Bool(a >= b),
        (BinOp::Lt, Value::Str(a), Value::Str(b)) => Value::Bool(a < b),
        (BinOp::Gt, Value::Str(a), Value::Str(b)) => Value::Bool(a > b),
        (BinOp::Le, Value::Str(a), Value::Str(b)) => Value::Bool(a <= b),
        (BinOp::Ge, Value::Str(a), Value::Str(b)) => Value::Bool(a >= b),

        _ => {
            return Err(RuntimeError::TypeMismatch(format!(
                "cannot apply {op:?} to {} and {}",
                l.type_name(),
                r.type_name()
            )));
        }
    };
    Ok(value)
}

// ── Calls ───────────────────────────────────────────────────────

fn arg<'v>(name: &str, args: &'v [Value], i: usize) -> Result<&'v Value, RuntimeError> {
    args.get(i).ok_or_else(|| RuntimeError::ArityMismatch {
        name: name.to_string(),
        expected: i + 1,
        got: args.len(),
    })
}

fn num(name: &str, args: &[Value], i: usize) -> Result<f64, RuntimeError> {
    arg(name, args, i)?.as_number()
}

fn expect_arity(name: &str, args: &[Value], expected: usize) -> Result<(), RuntimeError> {
    if args.len() == expected {
        Ok(())
    } else {
        Err(RuntimeError::ArityMismatch {
            name: name.to_string(),
            expected,
            got: args.len(),
        })
    }
}

fn call_method(rt: &Runtime, target: &Value, method: &str, args: &[Value]) -> Result<Value, RuntimeError> {
    match (target, method) {
        (Value::Vector(v), "add") => {
            expect_arity(method, args, 1)?;
            Ok(Value::Vector(*v + arg(method, args, 0)?.as_vector()?))
        }
        (Value::Vector(v), "sub") => {
            expect_arity(method, args, 1)?;
            Ok(Value::Vector(*v - arg(method, args, 0)?.as_vector()?))
        }
        (Value::Vector(v), "multiply") => {
            expect_arity(method, args, 1)?;
            Ok(Value::Vector(*v * num(method, args, 0)?))
        }
        (Value::Vector(v), "length") => {
            expect_arity(method, args, 0)?;
            Ok(Value::Number(v.length()))
        }
        (Value::Vector(v), "normalized") => {
            expect_arity(method, args, 0)?;
            Ok(Value::Vector(v.normalized()))
        }
        (Value::Vector(v), "dot") => {
            expect_arity(method, args, 1)?;
            Ok(Value::Number(v.dot(arg(method, args, 0)?.as_vector()?)))
        }
        (Value::Vector(v), "distance") => {
            expect_arity(method, args, 1)?;
            Ok(Value::Number(v.distance(arg(method, args, 0)?.as_vector()?)))
        }
        (Value::Color(c), "toString") => {
            expect_arity(method, args, 0)?;
            Ok(Value::str(&c.to_css()))
        }
        (Value::Color(c), "withAlpha") => {
            expect_arity(method, args, 1)?;
            Ok(Value::Color(c.with_alpha(num(method, args, 0)?)))
        }
        (Value::Entity(e), "destroy") => {
            expect_arity(method, args, 0)?;
            rt.destroy(e);
            Ok(Value::Unset)
        }
        (Value::Entity(e), "isDestroyed") => {
            expect_arity(method, args, 0)?;
            Ok(Value::Bool(e.is_destroyed()))
        }
        _ => Err(RuntimeError::UnknownMethod {
            target: target.type_name().to_string(),
            method: method.to_string(),
        }),
    }
}

fn call_builtin(rt: &Runtime, member: &BuiltinMember, args: &[Value]) -> Result<Value, RuntimeError> {
    let name = member.name;
    let value = match member.op {
        // Gfx
        BuiltinOp::SetResolution => {
            rt.gfx().set_resolution(num(name, args, 0)?, num(name, args, 1)?);
            Value::Unset
        }
        BuiltinOp::Width => Value::Number(rt.gfx().width()),
        BuiltinOp::Height => Value::Number(rt.gfx().height()),
        BuiltinOp::SetBackground => {
            let color = arg(name, args, 0)?.as_color()?;
            rt.gfx().set_background(color);
            Value::Unset
        }
        BuiltinOp::Fill => {
            let color = arg(name, args, 0)?.as_color()?;
            rt.gfx().fill(color);
            Value::Unset
        }
        BuiltinOp::Stroke => {
            let color = arg(name, args, 0)?.as_color()?;
            rt.gfx().stroke(color);
            Value::Unset
        }
        BuiltinOp::NoFill => {
            rt.gfx().no_fill();
            Value::Unset
        }
        BuiltinOp::NoStroke => {
            rt.gfx().no_stroke();
            Value::Unset
        }
        BuiltinOp::DrawCircle => {
            let pos = arg(name, args, 0)?.as_vector()?;
            rt.gfx().draw_circle(pos, num(name, args, 1)?);
            Value::Unset
        }
        BuiltinOp::DrawRect => {
            let pos = arg(name, args, 0)?.as_vector()?;
            rt.gfx().draw_rect(pos, num(name, args, 1)?, num(name, args, 2)?);
            Value::Unset
        }
        BuiltinOp::DrawImage => {
            let Value::Image(image) = arg(name, args, 0)? else {
                return Err(mismatch("image", arg(name, args, 0)?));
            };
            let pos = arg(name, args, 1)?.as_vector()?;
            rt.gfx().draw_image(image, pos);
            Value::Unset
        }
        BuiltinOp::Image => Value::Image(rt.image(arg(name, args, 0)?.as_str()?)?),

        // Input
        BuiltinOp::GetVector => {
            let key = |i| arg(name, args, i).and_then(Value::as_str);
            let v = rt.input().get_vector(key(0)?, key(1)?, key(2)?, key(3)?);
            Value::Vector(v)
        }
        BuiltinOp::IsDown => Value::Bool(rt.input().is_down(arg(name, args, 0)?.as_str()?)),

        // Color
        BuiltinOp::ColorNew => {
            let a = match args.get(3) {
                Some(v) => v.as_number()?,
                None => 1.0,
            };
            Value::Color(Color::from_channels(
                num(name, args, 0)?,
                num(name, args, 1)?,
                num(name, args, 2)?,
                a,
            ))
        }
        BuiltinOp::ColorFromHex => {
            let hex = arg(name, args, 0)?.as_str()?;
            let color = Color::from_hex(hex).ok_or_else(|| RuntimeError::InvalidColor(hex.to_string()))?;
            Value::Color(color)
        }

        // Vector2
        BuiltinOp::VectorNew => Value::Vector(Vector2::new(num(name, args, 0)?, num(name, args, 1)?)),
        BuiltinOp::VectorZero => Value::Vector(Vector2::ZERO),

        // Math
        BuiltinOp::Sin => Value::Number(num(name, args, 0)?.sin()),
        BuiltinOp::Cos => Value::Number(num(name, args, 0)?.cos()),
        BuiltinOp::Tan => Value::Number(num(name, args, 0)?.tan()),
        BuiltinOp::Sqrt => Value::Number(num(name, args, 0)?.sqrt()),
        BuiltinOp::Abs => Value::Number(num(name, args, 0)?.abs()),
        BuiltinOp::Floor => Value::Number(num(name, args, 0)?.floor()),
        BuiltinOp::Ceil => Value::Number(num(name, args, 0)?.ceil()),
        BuiltinOp::Round => Value::Number(num(name, args, 0)?.round()),
        BuiltinOp::Min => Value::Number(num(name, args, 0)?.min(num(name, args, 1)?)),
        BuiltinOp::Max => Value::Number(num(name, args, 0)?.max(num(name, args, 1)?)),
        BuiltinOp::Atan2 => Value::Number(num(name, args, 0)?.atan2(num(name, args, 1)?)),
        BuiltinOp::Clamp => {
            let (x, lo, hi) = (num(name, args, 0)?, num(name, args, 1)?, num(name, args, 2)?);
            // f64::clamp panics when lo > hi
            Value::Number(x.max(lo).min(hi))
        }
        BuiltinOp::Pi => Value::Number(std::f64::consts::PI),
    };
    Ok(value)
}

fn call_global(rt: &Runtime, func: &GlobalFn, args: &[Value]) -> Result<Value, RuntimeError> {
    let name = func.name;
    match func.op {
        GlobalOp::Emit => {
            let event = arg(name, args, 0)?.as_str()?.to_string();
            let payload = args.get(1).cloned().unwrap_or(Value::Unset);
            rt.emit(&event, payload)?;
        }
        GlobalOp::Destroy => rt.destroy(arg(name, args, 0)?.as_entity()?),
        GlobalOp::Print => {
            tracing::info!(target: "ryx::script", "{}", arg(name, args, 0)?);
        }
    }
    Ok(Value::Unset)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn arithmetic_and_concat() {
        let n = binary(BinOp::Add, &Value::Number(1.0), &Value::Number(2.0)).unwrap();
        assert!(n.equals(&Value::Number(3.0)));
        let s = binary(BinOp::Add, &Value::str("hp: "), &Value::Number(3.0)).unwrap();
        assert!(s.equals(&Value::str("hp: 3")));
    }

    #[test]
    fn vector_math() {
        let v = binary(
            BinOp::Mul,
            &Value::Vector(Vector2::new(1.0, 2.0)),
            &Value::Number(2.0),
        )
        .unwrap();
        assert!(v.equals(&Value::Vector(Vector2::new(2.0, 4.0))));
    }

    #[test]
    fn unset_arithmetic_is_error() {
        assert_eq!(
            binary(BinOp::Add, &Value::Unset, &Value::Number(1.0)).unwrap_err(),
            RuntimeError::UnsetArithmetic
        );
        assert_eq!(
            binary(BinOp::Lt, &Value::Number(1.0), &Value::Unset).unwrap_err(),
            RuntimeError::UnsetArithmetic
        );
    }

    #[test]
    fn unset_compares_equal_only_to_itself() {
        assert!(binary(BinOp::Eq, &Value::Unset, &Value::Unset).unwrap().truthy());
        assert!(!binary(BinOp::Eq, &Value::Unset, &Value::Number(0.0)).unwrap().truthy());
        assert!(binary(BinOp::Ne, &Value::Unset, &Value::Bool(false)).unwrap().truthy());
    }

    #[test]
    fn nested_value_write_back() {
        let updated = with_field(
            Value::Vector(Vector2::new(1.0, 1.0)),
            &["x".to_string()],
            Value::Number(5.0),
        )
        .unwrap();
        assert!(updated.equals(&Value::Vector(Vector2::new(5.0, 1.0))));
    }

    #[test]
    fn type_mismatch() {
        assert!(matches!(
            binary(BinOp::Sub, &Value::str("a"), &Value::Number(1.0)),
            Err(RuntimeError::TypeMismatch(_))
        ));
    }
}
