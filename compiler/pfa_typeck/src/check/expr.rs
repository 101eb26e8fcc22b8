//! Leaf and structural forms: literals, symbols, construction, bindings,
//! inline functions, side effects.

use pfa_diagnostic::{invalid_value, type_mismatch, unknown_symbol, Diagnostic, ErrorCode};
use pfa_ir::{ExprId, ExprKind, FcnDef, Literal, Method, Name, NewItems, Pos, TypeExpr};
use pfa_library::{json, Value};
use pfa_types::Type;

use super::{Block, Checker, Ck, Reported};
use crate::effects::Effects;
use crate::ir::{FcnRefTarget, InlineFcn, InlineId, Special, TExprId, TKind};
use crate::scope::{Found, VarKind};

impl Checker<'_> {
    /// Check one raw expression, producing its typed node.
    pub(super) fn expr(&mut self, id: ExprId) -> Ck {
        let doc = self.doc;
        let pos = doc.arena.pos(id);
        match doc.arena.kind(id) {
            ExprKind::Literal(lit) => {
                let (value, ty) = literal(lit);
                Ok(self.alloc(TKind::Literal(value), ty, pos))
            }
            ExprKind::TypedLiteral { ty, value } => self.typed_literal(ty, value, pos),
            ExprKind::Ref(name) => self.reference(name, pos),
            ExprKind::New { items, ty } => self.new_value(items, ty, pos),
            ExprKind::Do(body) => {
                let (body, ty) = self.block(body)?;
                Ok(self.alloc(TKind::Do(body), ty, pos))
            }
            ExprKind::Let(bindings) => self.let_(bindings, pos),
            ExprKind::Set(bindings) => self.set(bindings, pos),
            ExprKind::Attr { expr, path, to } => self.attr(*expr, path, *to, pos),
            ExprKind::Cell { name, path, to } => self.cell(name, path, *to, pos),
            ExprKind::Pool {
                name,
                path,
                to,
                init,
            } => self.pool(name, path, *to, *init, pos),
            ExprKind::PoolDel { name, key } => self.pool_del(name, *key, pos),
            ExprKind::If { cond, then, else_ } => self.if_(*cond, then, else_.as_deref(), pos),
            ExprKind::Cond { arms, else_ } => self.cond(arms, else_.as_deref(), pos),
            ExprKind::While { cond, body } => self.while_(*cond, body, pos),
            ExprKind::DoUntil { body, cond } => self.do_until(body, *cond, pos),
            ExprKind::For {
                init,
                cond,
                step,
                body,
            } => self.for_(init, *cond, step, body, pos),
            ExprKind::Foreach {
                var, array, body, ..
            } => self.foreach(var, *array, body, pos),
            ExprKind::Forkey {
                key,
                value,
                map,
                body,
            } => self.forkey(key, value, *map, body, pos),
            ExprKind::Cast {
                expr,
                cases,
                partial,
            } => self.cast(*expr, cases, *partial, pos),
            ExprKind::Upcast { expr, ty } => {
                let target = self.parse_type(ty);
                let inner = self.expr(*expr)?;
                self.coerce_to(inner, &target?, "upcast")
            }
            ExprKind::IfNotNull {
                bindings,
                then,
                else_,
            } => self.if_not_null(bindings, then, else_.as_deref(), pos),
            ExprKind::FcnDef(def) => self.inline_fcn(def),
            ExprKind::FcnRef { name, fill } => self.fcn_ref(name, fill, pos),
            ExprKind::Call { name, args } => self.call(name, args, pos),
            ExprKind::Error { message, code } => Ok(self.alloc(
                TKind::Error {
                    message: message.clone(),
                    code: *code,
                },
                Type::Null,
                pos,
            )),
            ExprKind::Log { args, namespace } => {
                let args = self.exprs(args)?;
                Ok(self.alloc(
                    TKind::Log {
                        args,
                        namespace: namespace.clone(),
                    },
                    Type::Null,
                    pos,
                ))
            }
            ExprKind::Emit(value) => self.emit(*value, pos),
            ExprKind::Doc(_) => Ok(self.alloc(TKind::Literal(Value::Null), Type::Null, pos)),
        }
    }

    fn typed_literal(&mut self, ty: &TypeExpr, value: &serde_json::Value, pos: &Pos) -> Ck {
        let ty = self.parse_type(ty)?;
        match json::decode(value, &ty) {
            Ok(v) => Ok(self.alloc(TKind::Literal(v), ty, pos)),
            Err(e) => Err(self.report(invalid_value(&pos.key("value"), "literal", &e.to_string()))),
        }
    }

    // ========================================================================
    // Symbols
    // ========================================================================

    pub(super) fn reference(&mut self, name: &Name, pos: &Pos) -> Ck {
        let found = self.lookup_symbol(name, pos)?;
        let kind = match found.var.kind {
            VarKind::Local => TKind::Local(name.clone()),
            VarKind::Special(special) => TKind::Special(special),
        };
        Ok(self.alloc(kind, found.var.ty, pos))
    }

    /// Resolve a symbol, explaining why an unresolved name is unavailable.
    pub(super) fn lookup_symbol(&mut self, name: &str, pos: &Pos) -> Ck<Found> {
        if let Some(found) = self.scope.lookup(name) {
            if found.captured
                && self.active_update.is_some()
                && matches!(found.var.ty, Type::Fcn(_))
            {
                return Err(self.report(
                    Diagnostic::error(ErrorCode::E3010)
                        .with_message(format!(
                            "update function uses the enclosing function value `{name}`"
                        ))
                        .at(pos)
                        .with_note("its effects cannot be checked"),
                ));
            }
            return Ok(found);
        }
        if let Some(special) = Special::from_name(name) {
            return Err(self.report(
                Diagnostic::error(ErrorCode::E3012)
                    .with_message(format!(
                        "`{}` is not available in {}",
                        special.as_str(),
                        self.block.as_str()
                    ))
                    .at(pos),
            ));
        }
        let mut diagnostic = unknown_symbol(pos, name);
        if self.cell_ids.contains_key(name) {
            diagnostic = diagnostic
                .with_suggestion(format!("read the cell with {{\"cell\": \"{name}\"}}"));
        } else if self.pool_ids.contains_key(name) {
            diagnostic = diagnostic.with_suggestion(format!(
                "read the pool with {{\"pool\": \"{name}\", \"path\": [key]}}"
            ));
        }
        Err(self.report(diagnostic))
    }

    // ========================================================================
    // Construction
    // ========================================================================

    fn new_value(&mut self, items: &NewItems, ty: &TypeExpr, pos: &Pos) -> Ck {
        let ty = self.parse_type(ty)?;
        match (items, &ty) {
            (NewItems::Fields(fields), Type::Record(record)) => {
                let mut failed = false;
                for (name, _) in fields {
                    if record.field(name).is_none() {
                        self.report(
                            Diagnostic::error(ErrorCode::E3004)
                                .with_message(format!(
                                    "record `{}` has no field `{name}`",
                                    record.name
                                ))
                                .at(&pos.key("new").key(name)),
                        );
                        failed = true;
                    }
                }
                let mut values = Vec::with_capacity(record.fields.len());
                for field in &record.fields {
                    let given = fields.iter().find(|(n, _)| n.as_str() == field.name);
                    let value = match (given, &field.default) {
                        (Some(&(_, id)), _) => self.expr(id).and_then(|v| {
                            self.coerce_to(v, &field.ty, &format!("field `{}`", field.name))
                        }),
                        (None, Some(default)) => match json::decode(default, &field.ty) {
                            Ok(v) => Ok(self.alloc(TKind::Literal(v), field.ty.clone(), pos)),
                            Err(e) => {
                                let context = format!("default of field `{}`", field.name);
                                Err(self.report(invalid_value(pos, &context, &e.to_string())))
                            }
                        },
                        (None, None) => Err(self.report(
                            Diagnostic::error(ErrorCode::E3004)
                                .with_message(format!(
                                    "new `{}` is missing field `{}`",
                                    record.name, field.name
                                ))
                                .at(pos),
                        )),
                    };
                    match value {
                        Ok(v) => values.push(v),
                        Err(Reported) => failed = true,
                    }
                }
                if failed {
                    return Err(Reported);
                }
                Ok(self.alloc(TKind::NewRecord(values), ty.clone(), pos))
            }
            (NewItems::Fields(fields), Type::Map(value_ty)) => {
                let mut entries = Vec::with_capacity(fields.len());
                let mut failed = false;
                for (name, id) in fields {
                    match self.expr(*id).and_then(|v| self.coerce_to(v, value_ty, "map value")) {
                        Ok(v) => entries.push((name.to_string(), v)),
                        Err(Reported) => failed = true,
                    }
                }
                if failed {
                    return Err(Reported);
                }
                Ok(self.alloc(TKind::NewMap(entries), ty.clone(), pos))
            }
            (NewItems::Items(items), Type::Array(item_ty)) => {
                let mut values = Vec::with_capacity(items.len());
                let mut failed = false;
                for id in items {
                    match self.expr(*id).and_then(|v| self.coerce_to(v, item_ty, "array item")) {
                        Ok(v) => values.push(v),
                        Err(Reported) => failed = true,
                    }
                }
                if failed {
                    return Err(Reported);
                }
                Ok(self.alloc(TKind::NewArray(values), ty.clone(), pos))
            }
            (NewItems::Fields(_), _) => Err(self.report(type_mismatch(
                pos,
                "a record or map type",
                &ty.to_string(),
                "new with an object",
            ))),
            (NewItems::Items(_), _) => Err(self.report(type_mismatch(
                pos,
                "an array type",
                &ty.to_string(),
                "new with an array",
            ))),
        }
    }

    // ========================================================================
    // Bindings
    // ========================================================================

    fn let_(&mut self, bindings: &[(Name, ExprId)], pos: &Pos) -> Ck {
        let values = self.bind_values(bindings)?;
        self.declare_locals(&values, pos)?;
        Ok(self.alloc(TKind::Let(values), Type::Null, pos))
    }

    /// Check right-hand sides before any name is bound.
    pub(super) fn bind_values(&mut self, bindings: &[(Name, ExprId)]) -> Ck<Vec<(Name, TExprId)>> {
        let mut out = Vec::with_capacity(bindings.len());
        let mut failed = false;
        for (name, id) in bindings {
            match self.expr(*id) {
                Ok(v) => out.push((name.clone(), v)),
                Err(Reported) => failed = true,
            }
        }
        if failed {
            Err(Reported)
        } else {
            Ok(out)
        }
    }

    /// Declare new locals in the current frame, at their values' types.
    pub(super) fn declare_locals(&mut self, values: &[(Name, TExprId)], pos: &Pos) -> Ck<()> {
        let names: Vec<(Name, Pos)> = values
            .iter()
            .map(|(name, _)| (name.clone(), pos.key(name)))
            .collect();
        self.check_new_names(&names)?;
        for (name, id) in values {
            let ty = self.ty(*id).clone();
            self.scope.declare(name.clone(), ty);
        }
        Ok(())
    }

    /// Reject duplicated, read-only or already visible names.
    pub(super) fn check_new_names(&mut self, names: &[(Name, Pos)]) -> Ck<()> {
        let mut failed = false;
        for (i, (name, pos)) in names.iter().enumerate() {
            let diagnostic = if names[..i].iter().any(|(n, _)| n == name) {
                Diagnostic::error(ErrorCode::E3013).with_message(format!("`{name}` is bound twice"))
            } else if Special::from_name(name).is_some() {
                Diagnostic::error(ErrorCode::E3008)
                    .with_message(format!("`{name}` is a read-only engine symbol"))
            } else if self.scope.is_visible(name) {
                Diagnostic::error(ErrorCode::E3007)
                    .with_message(format!("`{name}` is already defined"))
                    .with_suggestion(format!("use {{\"set\": {{\"{name}\": ...}}}} to reassign it"))
            } else {
                continue;
            };
            self.report(diagnostic.at(pos));
            failed = true;
        }
        if failed {
            Err(Reported)
        } else {
            Ok(())
        }
    }

    fn set(&mut self, bindings: &[(Name, ExprId)], pos: &Pos) -> Ck {
        if let [(name, value)] = bindings {
            if self.scope.lookup(name).is_none() {
                if self.cell_ids.contains_key(name.as_str()) {
                    return self.set_cell(name, *value, pos);
                }
                if self.pool_ids.contains_key(name.as_str()) {
                    return self.set_pool(name, *value, pos);
                }
            }
        }
        let mut out = Vec::with_capacity(bindings.len());
        let mut failed = false;
        for (name, id) in bindings {
            match self.set_local(name, *id, pos) {
                Ok(v) => out.push((name.clone(), v)),
                Err(Reported) => failed = true,
            }
        }
        if failed {
            return Err(Reported);
        }
        Ok(self.alloc(TKind::Set(out), Type::Null, pos))
    }

    fn set_local(&mut self, name: &Name, value: ExprId, pos: &Pos) -> Ck {
        let at = pos.key(name);
        let Some(found) = self.scope.lookup(name) else {
            if self.cell_ids.contains_key(name.as_str())
                || self.pool_ids.contains_key(name.as_str())
            {
                return Err(self.report(
                    Diagnostic::error(ErrorCode::E3006)
                        .with_message(format!("`set` of `{name}` must be its only binding"))
                        .at(&at),
                ));
            }
            return Err(self.report(unknown_symbol(&at, name)));
        };
        match found.var.kind {
            VarKind::Special(_) => Err(self.report(
                Diagnostic::error(ErrorCode::E3008)
                    .with_message(format!("`{name}` is a read-only engine symbol"))
                    .at(&at),
            )),
            VarKind::Local if found.captured => Err(self.report(
                Diagnostic::error(ErrorCode::E3015)
                    .with_message(format!(
                        "cannot assign `{name}` from inside a function definition"
                    ))
                    .at(&at)
                    .with_note("enclosing variables are captured by value"),
            )),
            VarKind::Local => {
                let v = self.expr(value)?;
                self.coerce_to(v, &found.var.ty, &format!("assignment to `{name}`"))
            }
        }
    }

    // ========================================================================
    // Functions and side effects
    // ========================================================================

    fn inline_fcn(&mut self, def: &FcnDef) -> Ck {
        let mut params = Vec::with_capacity(def.params.len());
        let mut failed = false;
        for p in &def.params {
            match self.parse_param_type(&p.ty) {
                Ok(ty) => params.push((p.name.clone(), ty)),
                Err(Reported) => failed = true,
            }
        }
        let ret = self.parse_type(&def.ret);
        let names: Vec<(Name, Pos)> = def
            .params
            .iter()
            .enumerate()
            .map(|(i, p)| (p.name.clone(), def.pos.key("params").index(i)))
            .collect();
        let fresh = self.check_new_names(&names);
        let (Ok(ret), Ok(()), false) = (ret, fresh, failed) else {
            return Err(Reported);
        };

        self.scope.enter_fcn();
        for (name, ty) in &params {
            self.scope.declare(name.clone(), ty.clone());
        }
        let body = self.body_returning(&def.body, &ret, &def.pos);
        let captures = self.scope.exit_fcn();
        let body = body?;

        let ty = Type::fcn(params.iter().map(|(_, t)| t.clone()).collect(), ret.clone());
        let id = InlineId::from_index(self.inline.len());
        self.inline.push(InlineFcn {
            params,
            ret,
            body,
            captures,
            pos: def.pos.clone(),
        });
        Ok(self.alloc(
            TKind::MakeFcn {
                target: FcnRefTarget::Inline(id),
                fill: Vec::new(),
            },
            ty,
            &def.pos,
        ))
    }

    fn emit(&mut self, value: ExprId, pos: &Pos) -> Ck {
        if self.doc.method != Method::Emit || self.block == Block::Merge {
            return Err(self.report(
                Diagnostic::error(ErrorCode::E3012)
                    .with_message(format!(
                        "`emit` is not available with method {} in {}",
                        self.doc.method.as_str(),
                        self.block.as_str()
                    ))
                    .at(pos),
            ));
        }
        let v = self.expr(value)?;
        let output = self.output.clone();
        let v = self.coerce_to(v, &output, "emitted value")?;
        if let Some(f) = self.current_fcn {
            self.effects.add(f, Effects::EMITS);
        }
        Ok(self.alloc(TKind::Emit(v), Type::Null, pos))
    }
}

/// Value and type of a plain literal.
fn literal(lit: &Literal) -> (Value, Type) {
    match lit {
        Literal::Null => (Value::Null, Type::Null),
        Literal::Boolean(b) => (Value::Boolean(*b), Type::Boolean),
        Literal::Int(i) => (Value::Int(*i), Type::Int),
        Literal::Long(l) => (Value::Long(*l), Type::Long),
        Literal::Float(x) => (Value::Float(*x), Type::Float),
        Literal::Double(x) => (Value::Double(*x), Type::Double),
        Literal::String(s) => (Value::string(s), Type::String),
        Literal::Bytes(b) => (Value::bytes(b), Type::Bytes),
    }
}
