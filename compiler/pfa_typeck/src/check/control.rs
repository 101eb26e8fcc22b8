//! Conditionals, loops and union dispatch.

use pfa_diagnostic::{type_mismatch, Diagnostic, ErrorCode};
use pfa_ir::{CastCase, ExprId, Name, Pos};
use pfa_types::Type;

use super::{Checker, Ck, Reported};
use crate::ir::{TCastCase, TExprId, TKind};
use crate::scope::VarKind;

impl Checker<'_> {
    fn condition(&mut self, cond: ExprId, context: &str) -> Ck {
        let c = self.expr(cond)?;
        if *self.ty(c) != Type::Boolean {
            let found = self.ty(c).to_string();
            let pos = self.arena.pos(c).clone();
            return Err(self.report(type_mismatch(&pos, "boolean", &found, context)));
        }
        Ok(c)
    }

    /// A body ending in `error` produces no value.
    fn diverges(&self, body: &[TExprId]) -> bool {
        body.last()
            .is_some_and(|&last| matches!(self.arena.kind(last), TKind::Error { .. }))
    }

    /// Join branch bodies: their common type, with every last expression
    /// widened to it.
    fn join(&mut self, branches: &mut [Vec<TExprId>], pos: &Pos) -> Ck<Type> {
        let mut joined: Option<Type> = None;
        for body in branches.iter() {
            if self.diverges(body) {
                continue;
            }
            let ty = body.last().map_or(Type::Null, |&last| self.ty(last).clone());
            joined = Some(match joined {
                None => ty,
                Some(prev) => match prev.lub(&ty) {
                    Ok(t) => t,
                    Err(reason) => {
                        return Err(self.report(
                            Diagnostic::error(ErrorCode::E3004)
                                .with_message(format!(
                                    "branches of types {prev} and {ty} cannot be combined: {reason}"
                                ))
                                .at(pos),
                        ))
                    }
                },
            });
        }
        // Every branch raises; the value is never observed.
        let Some(joined) = joined else {
            return Ok(Type::Null);
        };
        for body in branches.iter_mut() {
            if !self.diverges(body) {
                self.widen_last(body, &joined, pos, "branch value")?;
            }
        }
        Ok(joined)
    }

    pub(super) fn if_(
        &mut self,
        cond: ExprId,
        then: &[ExprId],
        else_: Option<&[ExprId]>,
        pos: &Pos,
    ) -> Ck {
        let c = self.condition(cond, "if condition");
        let t = self.block(then);
        let e = else_.map(|body| self.block(body)).transpose();
        let (c, (t, _), e) = (c?, t?, e?);
        let Some((e, _)) = e else {
            return Ok(self.alloc(
                TKind::If {
                    cond: c,
                    then: t,
                    else_: None,
                },
                Type::Null,
                pos,
            ));
        };
        let mut branches = [t, e];
        let ty = self.join(&mut branches, pos)?;
        let [t, e] = branches;
        Ok(self.alloc(
            TKind::If {
                cond: c,
                then: t,
                else_: Some(e),
            },
            ty,
            pos,
        ))
    }

    pub(super) fn cond(
        &mut self,
        arms: &[(ExprId, Vec<ExprId>)],
        else_: Option<&[ExprId]>,
        pos: &Pos,
    ) -> Ck {
        let mut conds = Vec::with_capacity(arms.len());
        let mut bodies = Vec::with_capacity(arms.len() + 1);
        let mut failed = false;
        for (cond, body) in arms {
            let c = self.condition(*cond, "cond condition");
            let b = self.block(body);
            match (c, b) {
                (Ok(c), Ok((b, _))) => {
                    conds.push(c);
                    bodies.push(b);
                }
                _ => failed = true,
            }
        }
        let has_else = else_.is_some();
        if let Some(body) = else_ {
            match self.block(body) {
                Ok((b, _)) => bodies.push(b),
                Err(Reported) => failed = true,
            }
        }
        if failed {
            return Err(Reported);
        }
        let ty = if has_else {
            self.join(&mut bodies, pos)?
        } else {
            Type::Null
        };
        let else_ = if has_else { bodies.pop() } else { None };
        let arms = conds.into_iter().zip(bodies).collect();
        Ok(self.alloc(TKind::Cond { arms, else_ }, ty, pos))
    }

    // ========================================================================
    // Loops
    // ========================================================================

    pub(super) fn while_(&mut self, cond: ExprId, body: &[ExprId], pos: &Pos) -> Ck {
        let c = self.condition(cond, "while condition");
        let b = self.block(body);
        let (c, (body, _)) = (c?, b?);
        Ok(self.alloc(TKind::While { cond: c, body }, Type::Null, pos))
    }

    pub(super) fn do_until(&mut self, body: &[ExprId], cond: ExprId, pos: &Pos) -> Ck {
        // Body locals are out of scope in the condition.
        let b = self.block(body);
        let c = self.condition(cond, "until condition");
        let ((body, _), c) = (b?, c?);
        Ok(self.alloc(TKind::DoUntil { body, cond: c }, Type::Null, pos))
    }

    pub(super) fn for_(
        &mut self,
        init: &[(Name, ExprId)],
        cond: ExprId,
        step: &[(Name, ExprId)],
        body: &[ExprId],
        pos: &Pos,
    ) -> Ck {
        self.scope.push_frame();
        let result = self.for_parts(init, cond, step, body, pos);
        self.scope.pop_frame();
        let (init, cond, step, body) = result?;
        Ok(self.alloc(
            TKind::For {
                init,
                cond,
                step,
                body,
            },
            Type::Null,
            pos,
        ))
    }

    #[allow(clippy::type_complexity, reason = "private destructuring helper")]
    fn for_parts(
        &mut self,
        init: &[(Name, ExprId)],
        cond: ExprId,
        step: &[(Name, ExprId)],
        body: &[ExprId],
        pos: &Pos,
    ) -> Ck<(Vec<(Name, TExprId)>, TExprId, Vec<(Name, TExprId)>, Vec<TExprId>)> {
        let init = self.bind_values(init)?;
        self.declare_locals(&init, &pos.key("for"))?;
        let c = self.condition(cond, "for condition");
        let mut steps = Vec::with_capacity(step.len());
        let mut failed = false;
        for (name, id) in step {
            match self.step(name, *id, &pos.key("step")) {
                Ok(v) => steps.push((name.clone(), v)),
                Err(Reported) => failed = true,
            }
        }
        let b = self.block(body);
        let (c, (body, _)) = (c?, b?);
        if failed {
            return Err(Reported);
        }
        Ok((init, c, steps, body))
    }

    /// A `step` assignment: only loop variables may be updated.
    fn step(&mut self, name: &Name, value: ExprId, pos: &Pos) -> Ck {
        let var = self
            .scope
            .lookup(name)
            .filter(|f| matches!(f.var.kind, VarKind::Local) && !f.captured);
        let Some(found) = var else {
            return Err(self.report(
                Diagnostic::error(ErrorCode::E3001)
                    .with_message(format!("`{name}` is not a variable of this loop"))
                    .at(&pos.key(name)),
            ));
        };
        let v = self.expr(value)?;
        self.coerce_to(v, &found.var.ty, &format!("step of `{name}`"))
    }

    pub(super) fn foreach(&mut self, var: &Name, array: ExprId, body: &[ExprId], pos: &Pos) -> Ck {
        let a = self.expr(array)?;
        let Type::Array(item) = self.ty(a).clone() else {
            let found = self.ty(a).to_string();
            return Err(self.report(type_mismatch(pos, "an array", &found, "foreach")));
        };
        self.check_new_names(&[(var.clone(), pos.key("foreach"))])?;
        self.scope.push_frame();
        self.scope.declare(var.clone(), (*item).clone());
        let b = self.block(body);
        self.scope.pop_frame();
        let (body, _) = b?;
        Ok(self.alloc(
            TKind::Foreach {
                var: var.clone(),
                array: a,
                body,
            },
            Type::Null,
            pos,
        ))
    }

    pub(super) fn forkey(
        &mut self,
        key: &Name,
        value: &Name,
        map: ExprId,
        body: &[ExprId],
        pos: &Pos,
    ) -> Ck {
        let m = self.expr(map)?;
        let Type::Map(values) = self.ty(m).clone() else {
            let found = self.ty(m).to_string();
            return Err(self.report(type_mismatch(pos, "a map", &found, "forkey")));
        };
        self.check_new_names(&[
            (key.clone(), pos.key("forkey")),
            (value.clone(), pos.key("forval")),
        ])?;
        self.scope.push_frame();
        self.scope.declare(key.clone(), Type::String);
        self.scope.declare(value.clone(), (*values).clone());
        let b = self.block(body);
        self.scope.pop_frame();
        let (body, _) = b?;
        Ok(self.alloc(
            TKind::Forkey {
                key: key.clone(),
                value: value.clone(),
                map: m,
                body,
            },
            Type::Null,
            pos,
        ))
    }

    // ========================================================================
    // Union dispatch
    // ========================================================================

    pub(super) fn cast(
        &mut self,
        expr: ExprId,
        cases: &[CastCase],
        partial: bool,
        pos: &Pos,
    ) -> Ck {
        let e = self.expr(expr)?;
        let scrutinee = self.ty(e).clone();
        if !scrutinee.is_union() {
            return Err(self.report(
                Diagnostic::error(ErrorCode::E3011)
                    .with_message(format!("cast of non-union type {scrutinee}"))
                    .at(pos)
                    .with_suggestion("use upcast to widen a value"),
            ));
        }

        let mut members: Vec<Type> = Vec::with_capacity(cases.len());
        let mut typed = Vec::with_capacity(cases.len());
        let mut bodies = Vec::with_capacity(cases.len());
        let mut failed = false;
        for case in cases {
            match self.cast_case(case, &scrutinee, &members) {
                Ok((member, named, body)) => {
                    members.push(member.clone());
                    typed.push((member, named));
                    bodies.push(body);
                }
                Err(Reported) => failed = true,
            }
        }
        if failed {
            return Err(Reported);
        }

        if !partial {
            let missing: Vec<String> = scrutinee
                .members()
                .iter()
                .filter(|m| !members.contains(m))
                .map(ToString::to_string)
                .collect();
            if !missing.is_empty() {
                return Err(self.report(
                    Diagnostic::error(ErrorCode::E3011)
                        .with_message(format!("cast does not handle {}", missing.join(", ")))
                        .at(pos)
                        .with_suggestion("add the missing cases or mark the cast partial"),
                ));
            }
        }

        let ty = if partial {
            Type::Null
        } else {
            self.join(&mut bodies, pos)?
        };
        let cases = typed
            .into_iter()
            .zip(bodies)
            .map(|((member, named), body)| TCastCase { member, named, body })
            .collect();
        Ok(self.alloc(TKind::Cast { expr: e, cases }, ty, pos))
    }

    fn cast_case(
        &mut self,
        case: &CastCase,
        scrutinee: &Type,
        seen: &[Type],
    ) -> Ck<(Type, Name, Vec<TExprId>)> {
        let member = self.parse_type(&case.ty)?;
        if !scrutinee.members().contains(&member) {
            return Err(self.report(
                Diagnostic::error(ErrorCode::E3011)
                    .with_message(format!("{member} is not a member of {scrutinee}"))
                    .at(&case.pos),
            ));
        }
        if seen.contains(&member) {
            return Err(self.report(
                Diagnostic::error(ErrorCode::E3011)
                    .with_message(format!("{member} is handled twice"))
                    .at(&case.pos),
            ));
        }
        self.check_new_names(&[(case.named.clone(), case.pos.key("named"))])?;
        self.scope.push_frame();
        self.scope.declare(case.named.clone(), member.clone());
        let b = self.block(&case.body);
        self.scope.pop_frame();
        let (body, _) = b?;
        Ok((member, case.named.clone(), body))
    }

    pub(super) fn if_not_null(
        &mut self,
        bindings: &[(Name, ExprId)],
        then: &[ExprId],
        else_: Option<&[ExprId]>,
        pos: &Pos,
    ) -> Ck {
        let values = self.bind_values(bindings)?;
        let mut stripped = Vec::with_capacity(values.len());
        let mut failed = false;
        for (name, id) in &values {
            let ty = self.ty(*id).clone();
            let inner = if ty.is_union() && ty.is_nullable() {
                Type::union_flat(ty.members().iter().filter(|m| **m != Type::Null).cloned()).ok()
            } else {
                None
            };
            match inner {
                Some(inner) => stripped.push((name.clone(), inner)),
                None => {
                    let at = pos.key("ifnotnull").key(name);
                    let found = ty.to_string();
                    self.report(type_mismatch(&at, "a union containing null", &found, "ifnotnull"));
                    failed = true;
                }
            }
        }
        let names: Vec<(Name, Pos)> = values
            .iter()
            .map(|(name, _)| (name.clone(), pos.key("ifnotnull").key(name)))
            .collect();
        let fresh = self.check_new_names(&names);
        if failed || fresh.is_err() {
            return Err(Reported);
        }

        self.scope.push_frame();
        for (name, ty) in stripped {
            self.scope.declare(name, ty);
        }
        let t = self.block(then);
        self.scope.pop_frame();
        let e = else_.map(|body| self.block(body)).transpose();
        let ((t, _), e) = (t?, e?);

        let Some((e, _)) = e else {
            return Ok(self.alloc(
                TKind::IfNotNull {
                    bindings: values,
                    then: t,
                    else_: None,
                },
                Type::Null,
                pos,
            ));
        };
        let mut branches = [t, e];
        let ty = self.join(&mut branches, pos)?;
        let [t, e] = branches;
        Ok(self.alloc(
            TKind::IfNotNull {
                bindings: values,
                then: t,
                else_: Some(e),
            },
            ty,
            pos,
        ))
    }
}
