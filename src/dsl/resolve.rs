//! Binds `Module::member` references and bare `name(args)` calls to the
//! builtin tables. Anything that names nothing is rejected here so that a
//! unit either loads completely or not at all.

use super::ast::*;
use super::builtins::{lookup_global, lookup_member, MemberKind};
use super::error::DslError;
use super::synth::{EntityType, Method, ProgramUnit};

pub fn resolve_unit(unit: &mut ProgramUnit) -> Result<(), DslError> {
    if let Some(main) = &mut unit.main {
        resolve_block(main)?;
    }
    for ty in &mut unit.entities {
        resolve_entity(ty)?;
    }
    Ok(())
}

fn resolve_entity(ty: &mut EntityType) -> Result<(), DslError> {
    for init in &mut ty.initializers {
        if let Some(value) = &mut init.value {
            resolve_expr(value)?;
        }
    }
    resolve_method(&mut ty.constructor)?;
    if let Some(tick) = &mut ty.tick {
        resolve_method(tick)?;
    }
    if let Some(render) = &mut ty.render {
        resolve_method(render)?;
    }
    for handler in ty.handlers.values_mut() {
        resolve_method(handler)?;
    }
    Ok(())
}

fn resolve_method(method: &mut Method) -> Result<(), DslError> {
    resolve_block(&mut method.body)
}

fn resolve_block(stmts: &mut [Stmt]) -> Result<(), DslError> {
    stmts.iter_mut().try_for_each(resolve_stmt)
}

fn resolve_stmt(stmt: &mut Stmt) -> Result<(), DslError> {
    match stmt {
        Stmt::Let { value, .. } | Stmt::Assign { value, .. } => resolve_expr(value),
        Stmt::Expr(e) => resolve_expr(e),
        Stmt::If {
            branches,
            otherwise,
            ..
        } => {
            for (cond, body) in branches {
                resolve_expr(cond)?;
                resolve_block(body)?;
            }
            if let Some(body) = otherwise {
                resolve_block(body)?;
            }
            Ok(())
        }
        Stmt::Loop { from, to, body, .. } => {
            resolve_expr(from)?;
            resolve_expr(to)?;
            resolve_block(body)
        }
    }
}

fn resolve_args(args: &mut [Expr]) -> Result<(), DslError> {
    args.iter_mut().try_for_each(resolve_expr)
}

fn resolve_expr(expr: &mut Expr) -> Result<(), DslError> {
    let span = expr.span;
    match &mut expr.kind {
        ExprKind::Number(_)
        | ExprKind::Str(_)
        | ExprKind::Bool(_)
        | ExprKind::Unset
        | ExprKind::This
        | ExprKind::Ident(_) => Ok(()),
        ExprKind::Binary { left, right, .. } => {
            resolve_expr(left)?;
            resolve_expr(right)
        }
        ExprKind::Unary { operand, .. } => resolve_expr(operand),
        ExprKind::Field { object, .. } => resolve_expr(object),
        ExprKind::MethodCall { object, args, .. } => {
            resolve_expr(object)?;
            resolve_args(args)
        }
        ExprKind::Spawn { args, .. } | ExprKind::Builtin { args, .. } | ExprKind::Global { args, .. } => {
            resolve_args(args)
        }
        ExprKind::Call { name, args } => {
            let Some(func) = lookup_global(name) else {
                return Err(DslError::resolve(format!("Unknown function '{name}'"), span));
            };
            if args.len() < func.min_args || args.len() > func.max_args {
                return Err(DslError::resolve(
                    format!(
                        "'{name}' expects {} argument(s), got {}",
                        arity_text(func.min_args, func.max_args),
                        args.len()
                    ),
                    span,
                ));
            }
            resolve_args(args)?;
            let args = std::mem::take(args);
            expr.kind = ExprKind::Global { func, args };
            Ok(())
        }
        ExprKind::Namespaced {
            module,
            member,
            args,
        } => {
            let Some(builtin) = lookup_member(module, member) else {
                return Err(DslError::resolve(
                    format!("Unresolved reference '{module}::{member}'"),
                    span,
                ));
            };
            let args = match (builtin.kind, args.take()) {
                (MemberKind::Property, None) => Vec::new(),
                (MemberKind::Property, Some(_)) => {
                    return Err(DslError::resolve(
                        format!("'{module}::{member}' is not callable"),
                        span,
                    ));
                }
                (MemberKind::Function { .. }, None) => {
                    return Err(DslError::resolve(
                        format!("'{module}::{member}' must be called"),
                        span,
                    ));
                }
                (MemberKind::Function { min, max }, Some(mut args)) => {
                    if args.len() < min || args.len() > max {
                        return Err(DslError::resolve(
                            format!(
                                "'{module}::{member}' expects {} argument(s), got {}",
                                arity_text(min, max),
                                args.len()
                            ),
                            span,
                        ));
                    }
                    resolve_args(&mut args)?;
                    args
                }
            };
            expr.kind = ExprKind::Builtin {
                member: builtin,
                args,
            };
            Ok(())
        }
    }
}

fn arity_text(min: usize, max: usize) -> String {
    if min == max {
        min.to_string()
    } else {
        format!("{min} to {max}")
    }
}
