//! Nested paths, cells and pools.

use pfa_diagnostic::{type_mismatch, Diagnostic, ErrorCode};
use pfa_ir::{ExprId, ExprKind, Literal, Pos};
use pfa_types::Type;

use super::{Checker, Ck, UpdateSite};
use crate::effects::Effects;
use crate::ir::{CellId, PathStep, PoolId, TExprId, TKind, Update};

impl Checker<'_> {
    /// Resolve `path` against `base`, returning the steps and the type reached.
    fn path(&mut self, base: &Type, path: &[ExprId]) -> Ck<(Vec<PathStep>, Type)> {
        let doc = self.doc;
        let mut steps = Vec::with_capacity(path.len());
        let mut ty = base.clone();
        for &step in path {
            let pos = doc.arena.pos(step).clone();
            let next = match &ty {
                Type::Record(record) => {
                    let ExprKind::Literal(Literal::String(field)) = doc.arena.kind(step) else {
                        return Err(self.report(
                            Diagnostic::error(ErrorCode::E3006)
                                .with_message(format!(
                                    "record {} is indexed by a field name literal",
                                    record.name
                                ))
                                .at(&pos),
                        ));
                    };
                    let Some(index) = record.field_index(field) else {
                        return Err(self.report(
                            Diagnostic::error(ErrorCode::E3006)
                                .with_message(format!(
                                    "record {} has no field `{field}`",
                                    record.name
                                ))
                                .at(&pos),
                        ));
                    };
                    steps.push(PathStep::Field(index));
                    record.fields[index].ty.clone()
                }
                Type::Array(items) => {
                    let index = self.expr(step)?;
                    self.path_key(index, &Type::Int, "array index")?;
                    steps.push(PathStep::Index(index));
                    (**items).clone()
                }
                Type::Map(values) => {
                    let key = self.expr(step)?;
                    self.path_key(key, &Type::String, "map key")?;
                    steps.push(PathStep::Key(key));
                    (**values).clone()
                }
                other => {
                    return Err(self.report(
                        Diagnostic::error(ErrorCode::E3006)
                            .with_message(format!(
                                "path continues into {other}, which has no parts"
                            ))
                            .at(&pos),
                    ))
                }
            };
            ty = next;
        }
        Ok((steps, ty))
    }

    fn path_key(&mut self, id: TExprId, expected: &Type, context: &str) -> Ck<()> {
        if self.ty(id) == expected {
            return Ok(());
        }
        let pos = self.arena.pos(id).clone();
        let found = self.ty(id).to_string();
        Err(self.report(
            Diagnostic::error(ErrorCode::E3006)
                .with_message(format!("{context} must be {expected}, found {found}"))
                .at(&pos),
        ))
    }

    /// The new value of a `to`: an update function or a replacement value.
    fn update(&mut self, to: ExprId, slot: &Type) -> Ck<Update> {
        let doc = self.doc;
        let pos = doc.arena.pos(to).clone();
        if matches!(doc.arena.kind(to), ExprKind::FcnDef(_) | ExprKind::FcnRef { .. }) {
            let site = self.update_sites.len();
            self.update_sites.push(UpdateSite {
                pos: pos.clone(),
                callees: Vec::new(),
            });
            let outer = self.active_update.replace(site);
            let f = self.expr(to);
            self.active_update = outer;
            let f = f?;
            let required = Type::fcn(vec![slot.clone()], slot.clone());
            if !required.accepts(self.ty(f)) {
                let found = self.ty(f).to_string();
                let expected = required.to_string();
                return Err(self.report(type_mismatch(&pos, &expected, &found, "update function")));
            }
            return Ok(Update::Fcn(f));
        }
        let value = self.expr(to)?;
        if matches!(self.ty(value), Type::Fcn(_)) {
            return Err(self.report(
                Diagnostic::error(ErrorCode::E3010)
                    .with_message(
                        "an update function must be written inline or referenced with `fcn`",
                    )
                    .at(&pos),
            ));
        }
        self.coerce_to(value, slot, "updated value").map(Update::Value)
    }

    // ========================================================================
    // Forms
    // ========================================================================

    pub(super) fn attr(
        &mut self,
        expr: ExprId,
        path: &[ExprId],
        to: Option<ExprId>,
        pos: &Pos,
    ) -> Ck {
        let base = self.expr(expr)?;
        let base_ty = self.ty(base).clone();
        let (path, slot) = self.path(&base_ty, path)?;
        let (to, ty) = match to {
            Some(to) => (Some(self.update(to, &slot)?), base_ty),
            None => (None, slot),
        };
        Ok(self.alloc(TKind::Attr { base, path, to }, ty, pos))
    }

    fn cell_id(&mut self, name: &str, pos: &Pos) -> Ck<CellId> {
        match self.cell_ids.get(name) {
            Some(&id) => Ok(id),
            None => Err(self.report(
                Diagnostic::error(ErrorCode::E3005)
                    .with_message(format!("unknown cell `{name}`"))
                    .at(pos),
            )),
        }
    }

    fn pool_id(&mut self, name: &str, pos: &Pos) -> Ck<PoolId> {
        match self.pool_ids.get(name) {
            Some(&id) => Ok(id),
            None => Err(self.report(
                Diagnostic::error(ErrorCode::E3005)
                    .with_message(format!("unknown pool `{name}`"))
                    .at(pos),
            )),
        }
    }

    pub(super) fn cell(
        &mut self,
        name: &str,
        path: &[ExprId],
        to: Option<ExprId>,
        pos: &Pos,
    ) -> Ck {
        let cell = self.cell_id(name, pos)?;
        let effects = if to.is_some() {
            Effects::WRITES_CELL
        } else {
            Effects::READS_CELL
        };
        self.touch_state(effects, &format!("cell `{name}`"), pos)?;
        let cell_ty = self.cells[cell.index()].ty.clone();
        let (path, slot) = self.path(&cell_ty, path)?;
        match to {
            None => Ok(self.alloc(TKind::CellGet { cell, path }, slot, pos)),
            Some(to) => {
                let to = self.update(to, &slot)?;
                Ok(self.alloc(TKind::CellTo { cell, path, to }, cell_ty, pos))
            }
        }
    }

    pub(super) fn pool(
        &mut self,
        name: &str,
        path: &[ExprId],
        to: Option<ExprId>,
        init: Option<ExprId>,
        pos: &Pos,
    ) -> Ck {
        let pool = self.pool_id(name, pos)?;
        let effects = if to.is_some() {
            Effects::WRITES_POOL
        } else {
            Effects::READS_POOL
        };
        self.touch_state(effects, &format!("pool `{name}`"), pos)?;
        let Some((&key, rest)) = path.split_first() else {
            return Err(self.report(
                Diagnostic::error(ErrorCode::E3006)
                    .with_message("a pool path starts with the entry key")
                    .at(pos),
            ));
        };
        let key = self.expr(key)?;
        self.path_key(key, &Type::String, "pool key")?;
        let entry_ty = self.pools[pool.index()].ty.clone();
        let (path, slot) = self.path(&entry_ty, rest)?;
        match (to, init) {
            (None, None) => Ok(self.alloc(TKind::PoolGet { pool, key, path }, slot, pos)),
            (None, Some(_)) => Err(self.report(
                Diagnostic::error(ErrorCode::E3006)
                    .with_message("`init` is only meaningful with `to`")
                    .at(&pos.key("init")),
            )),
            (Some(to), init) => {
                let to = self.update(to, &slot)?;
                let init = match init {
                    Some(init) => {
                        let v = self.expr(init)?;
                        Some(self.coerce_to(v, &entry_ty, "pool init")?)
                    }
                    None => None,
                };
                Ok(self.alloc(
                    TKind::PoolTo {
                        pool,
                        key,
                        path,
                        to,
                        init,
                    },
                    entry_ty,
                    pos,
                ))
            }
        }
    }

    pub(super) fn pool_del(&mut self, name: &str, key: ExprId, pos: &Pos) -> Ck {
        let pool = self.pool_id(name, pos)?;
        self.touch_state(Effects::WRITES_POOL, &format!("pool `{name}`"), pos)?;
        let key = self.expr(key)?;
        self.path_key(key, &Type::String, "pool key")?;
        Ok(self.alloc(TKind::PoolDel { pool, key }, Type::Null, pos))
    }

    /// `set` of a cell name: replace the whole cell.
    pub(super) fn set_cell(&mut self, name: &str, value: ExprId, pos: &Pos) -> Ck {
        let cell = self.cell_id(name, pos)?;
        self.touch_state(Effects::WRITES_CELL, &format!("cell `{name}`"), pos)?;
        let ty = self.cells[cell.index()].ty.clone();
        let v = self.expr(value)?;
        let v = self.coerce_to(v, &ty, &format!("assignment to cell `{name}`"))?;
        Ok(self.alloc(
            TKind::CellTo {
                cell,
                path: Vec::new(),
                to: Update::Value(v),
            },
            ty,
            pos,
        ))
    }

    /// `set` of a pool name: replace every entry with those of a map.
    pub(super) fn set_pool(&mut self, name: &str, value: ExprId, pos: &Pos) -> Ck {
        let pool = self.pool_id(name, pos)?;
        self.touch_state(Effects::WRITES_POOL, &format!("pool `{name}`"), pos)?;
        let ty = Type::map(self.pools[pool.index()].ty.clone());
        let v = self.expr(value)?;
        let v = self.coerce_to(v, &ty, &format!("assignment to pool `{name}`"))?;
        Ok(self.alloc(TKind::PoolReplace { pool, value: v }, Type::Null, pos))
    }
}
