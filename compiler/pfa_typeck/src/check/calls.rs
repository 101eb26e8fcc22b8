//! Call sites and function references.
//!
//! A call name resolves, in order, to a user function (`u.` prefix), the
//! short-circuit operators, a local holding a function value, then the
//! library registry.

use std::sync::Arc;

use pfa_diagnostic::{Diagnostic, ErrorCode};
use pfa_ir::{ExprId, Name, Pos};
use pfa_types::Type;

use super::{Checker, Ck, Reported};
use crate::ir::{FcnId, FcnRefTarget, LibCall, TExprId, TKind};
use crate::scope::VarKind;

/// Prefix of user function names at call sites.
const USER_PREFIX: &str = "u.";

impl Checker<'_> {
    pub(super) fn call(&mut self, name: &Name, args: &[ExprId], pos: &Pos) -> Ck {
        if let Some(user) = name.strip_prefix(USER_PREFIX) {
            return self.call_user(user, args, pos);
        }
        if matches!(name.as_str(), "&&" | "||") {
            return self.short_circuit(name, args, pos);
        }
        if let Some(found) = self.scope.lookup(name) {
            if matches!(found.var.kind, VarKind::Local) && matches!(found.var.ty, Type::Fcn(_)) {
                return self.call_value(name, args, pos);
            }
        }
        self.call_lib(name, args, pos)
    }

    fn user_fcn(&mut self, name: &str, pos: &Pos) -> Ck<FcnId> {
        match self.fcn_ids.get(name) {
            Some(&id) => Ok(id),
            None => Err(self.report(
                Diagnostic::error(ErrorCode::E3002)
                    .with_message(format!("unknown function `{USER_PREFIX}{name}`"))
                    .at(pos),
            )),
        }
    }

    fn call_user(&mut self, name: &str, args: &[ExprId], pos: &Pos) -> Ck {
        let id = self.user_fcn(name, pos);
        let args = self.exprs(args);
        let (id, args) = (id?, args?);
        let params: Vec<Type> = self.sigs[id.index()]
            .params
            .iter()
            .map(|(_, t)| t.clone())
            .collect();
        let ret = self.sigs[id.index()].ret.clone();
        let args = self.coerce_args(args, &params, pos, || {
            format!("`{USER_PREFIX}{name}` takes ({})", join_types(&params))
        })?;
        self.uses_fcn(id);
        Ok(self.alloc(TKind::CallUser { fcn: id, args }, ret, pos))
    }

    fn short_circuit(&mut self, name: &str, args: &[ExprId], pos: &Pos) -> Ck {
        let args = self.exprs(args)?;
        let params = [Type::Boolean, Type::Boolean];
        let args = self.coerce_args(args, &params, pos, || {
            format!("`{name}` takes (boolean, boolean)")
        })?;
        let &[x, y] = args.as_slice() else {
            return Err(Reported);
        };
        let kind = if name == "&&" {
            TKind::And(x, y)
        } else {
            TKind::Or(x, y)
        };
        Ok(self.alloc(kind, Type::Boolean, pos))
    }

    fn call_value(&mut self, name: &Name, args: &[ExprId], pos: &Pos) -> Ck {
        let callee = self.reference(name, pos)?;
        let Type::Fcn(fcn) = self.ty(callee).clone() else {
            return Err(Reported);
        };
        let args = self.exprs(args)?;
        let args = self.coerce_args(args, &fcn.params, pos, || {
            format!("`{name}` takes ({})", join_types(&fcn.params))
        })?;
        Ok(self.alloc(TKind::CallValue { callee, args }, fcn.ret.clone(), pos))
    }

    fn call_lib(&mut self, name: &Name, args: &[ExprId], pos: &Pos) -> Ck {
        let Some(fcn) = self.registry.get(name).cloned() else {
            return Err(self.report(
                Diagnostic::error(ErrorCode::E3002)
                    .with_message(format!("unknown function `{name}`"))
                    .at(pos),
            ));
        };
        let args = self.exprs(args)?;
        let types: Vec<Type> = args.iter().map(|&a| self.ty(a).clone()).collect();
        let Some(resolved) = fcn.signatures().resolve(&types) else {
            let mut diagnostic = Diagnostic::error(ErrorCode::E3003)
                .with_message(format!("no signature of `{name}` accepts ({})", join_types(&types)))
                .at(pos);
            for sig in fcn.signatures().alternatives() {
                diagnostic = diagnostic.with_note(format!("candidate: {name}{sig}"));
            }
            return Err(self.report(diagnostic));
        };
        let args = self.coerce_args(args, &resolved.params, pos, String::new)?;
        let call = LibCall {
            fcn,
            index: resolved.index,
            params: Arc::from(resolved.params),
            ret: resolved.ret.clone(),
        };
        Ok(self.alloc(TKind::CallLib { call, args }, resolved.ret, pos))
    }

    /// Widen each argument to its parameter type; `expected` describes the
    /// signature for arity and type errors.
    fn coerce_args(
        &mut self,
        args: Vec<TExprId>,
        params: &[Type],
        pos: &Pos,
        expected: impl Fn() -> String,
    ) -> Ck<Vec<TExprId>> {
        let found: Vec<Type> = args.iter().map(|&a| self.ty(a).clone()).collect();
        let fits =
            args.len() == params.len() && params.iter().zip(&found).all(|(p, a)| p.accepts(a));
        if !fits {
            return Err(self.report(
                Diagnostic::error(ErrorCode::E3003)
                    .with_message(format!("call with ({}) does not match", join_types(&found)))
                    .at(pos)
                    .with_note(expected()),
            ));
        }
        args.into_iter()
            .zip(params)
            .map(|(a, p)| self.coerce_to(a, p, "argument"))
            .collect()
    }

    // ========================================================================
    // Function references
    // ========================================================================

    pub(super) fn fcn_ref(&mut self, name: &Name, fill: &[(Name, ExprId)], pos: &Pos) -> Ck {
        let (target, params, ret) = if let Some(user) = name.strip_prefix(USER_PREFIX) {
            let id = self.user_fcn(user, pos)?;
            self.uses_fcn(id);
            let sig = &self.sigs[id.index()];
            (FcnRefTarget::User(id), sig.params.clone(), sig.ret.clone())
        } else {
            self.lib_ref(name, pos)?
        };

        let mut filled: Vec<(usize, TExprId)> = Vec::with_capacity(fill.len());
        let mut failed = false;
        for (param, id) in fill {
            let at = pos.key("fill").key(param);
            let Some(index) = params.iter().position(|(n, _)| n == param) else {
                self.report(
                    Diagnostic::error(ErrorCode::E3014)
                        .with_message(format!("`{name}` has no parameter `{param}`"))
                        .at(&at),
                );
                failed = true;
                continue;
            };
            if filled.iter().any(|(i, _)| *i == index) {
                self.report(
                    Diagnostic::error(ErrorCode::E3013)
                        .with_message(format!("parameter `{param}` is filled twice"))
                        .at(&at),
                );
                failed = true;
                continue;
            }
            let context = format!("fill of `{param}`");
            match self.expr(*id).and_then(|v| self.coerce_to(v, &params[index].1, &context)) {
                Ok(v) => filled.push((index, v)),
                Err(Reported) => failed = true,
            }
        }
        if failed {
            return Err(Reported);
        }
        filled.sort_by_key(|(i, _)| *i);

        let remaining = params
            .iter()
            .enumerate()
            .filter(|(i, _)| !filled.iter().any(|(f, _)| f == i))
            .map(|(_, (_, t))| t.clone())
            .collect();
        Ok(self.alloc(
            TKind::MakeFcn {
                target,
                fill: filled,
            },
            Type::fcn(remaining, ret),
            pos,
        ))
    }

    /// A library function usable as a value: exactly one signature, no wildcards.
    fn lib_ref(&mut self, name: &Name, pos: &Pos) -> Ck<(FcnRefTarget, Vec<(Name, Type)>, Type)> {
        let Some(fcn) = self.registry.get(name).cloned() else {
            return Err(self.report(
                Diagnostic::error(ErrorCode::E3002)
                    .with_message(format!("unknown function `{name}`"))
                    .at(pos),
            ));
        };
        let signatures = fcn.signatures();
        let (Some((types, ret)), [sig]) = (signatures.monomorphic(), signatures.alternatives())
        else {
            return Err(self.report(
                Diagnostic::error(ErrorCode::E3014)
                    .with_message(format!(
                        "`{name}` is generic and cannot be referenced as a value"
                    ))
                    .at(pos)
                    .with_suggestion("wrap the call in an inline function"),
            ));
        };
        let params = sig
            .params
            .iter()
            .zip(&types)
            .map(|((n, _), t)| (Name::new(n), t.clone()))
            .collect();
        let call = LibCall {
            fcn: Arc::clone(&fcn),
            index: 0,
            params: Arc::from(types),
            ret: ret.clone(),
        };
        Ok((FcnRefTarget::Lib(call), params, ret))
    }
}

fn join_types(types: &[Type]) -> String {
    types.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ")
}
