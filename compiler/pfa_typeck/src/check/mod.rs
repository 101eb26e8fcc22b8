//! Document-level checker.
//!
//! # Passes
//!
//! ```text
//! Pass 0: Declarations
//!   input and output types, cells, pools (types and decoded inits)
//! Pass 1: Function signatures
//!   every `fcns` entry, so bodies can call each other in any order
//! Pass 2: Bodies
//!   fcns, begin, action, end, then merge for the fold method
//! Pass 3: Effects
//!   close the call graph and reject update functions that reach state
//! ```
//!
//! Diagnostics accumulate; a failed node reports once and its parents
//! give up silently, so one mistake yields one diagnostic.

mod calls;
mod control;
mod expr;
mod state;

use indexmap::IndexMap;
use pfa_diagnostic::{invalid_value, type_mismatch, Diagnostic, ErrorCode};
use pfa_ir::{Document, ExprId, Method, Name, Pos, TypeExpr};
use pfa_library::{json, FunctionRegistry, Value};
use pfa_types::{NameGenerator, SchemaParser, Type, TypeRegistry};
use rustc_hash::FxHashMap;

use crate::effects::{EffectGraph, Effects};
use crate::ir::{
    CellId, CellInfo, FcnId, InlineFcn, PoolId, PoolInfo, Special, TExprId, TKind, TypedArena,
    TypedProgram, UserFcn,
};
use crate::scope::Scope;

/// Marker: the failure has already been reported.
#[derive(Copy, Clone, Debug)]
pub(crate) struct Reported;

pub(crate) type Ck<T = TExprId> = Result<T, Reported>;

/// Which top-level body is being checked.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub(crate) enum Block {
    Begin,
    Action,
    End,
    Merge,
    Fcn,
}

impl Block {
    fn as_str(self) -> &'static str {
        match self {
            Block::Begin => "begin",
            Block::Action => "action",
            Block::End => "end",
            Block::Merge => "merge",
            Block::Fcn => "a user function",
        }
    }
}

/// A `to` function whose callees must not touch cells or pools.
struct UpdateSite {
    pos: Pos,
    callees: Vec<FcnId>,
}

struct FcnSig {
    name: Name,
    params: Vec<(Name, Type)>,
    ret: Type,
}

pub(crate) struct Checker<'a> {
    doc: &'a Document,
    registry: &'a FunctionRegistry,
    types: TypeRegistry,
    names: NameGenerator,
    arena: TypedArena,
    errors: Vec<Diagnostic>,

    input: Type,
    output: Type,
    cells: Vec<CellInfo>,
    cell_ids: FxHashMap<String, CellId>,
    pools: Vec<PoolInfo>,
    pool_ids: FxHashMap<String, PoolId>,
    sigs: Vec<FcnSig>,
    fcn_ids: FxHashMap<String, FcnId>,
    inline: Vec<InlineFcn>,

    scope: Scope,
    block: Block,
    current_fcn: Option<FcnId>,
    effects: EffectGraph,
    update_sites: Vec<UpdateSite>,
    /// Index into `update_sites` while checking an update function body.
    active_update: Option<usize>,
}

/// Check a parsed document against a function registry.
#[tracing::instrument(level = "debug", skip_all)]
pub fn check(doc: &Document, registry: &FunctionRegistry) -> Result<TypedProgram, Vec<Diagnostic>> {
    let mut checker = Checker::new(doc, registry);
    let program = checker.run();
    if checker.errors.is_empty() {
        tracing::debug!(nodes = checker.arena.len(), "checked document");
        program.ok_or_else(Vec::new)
    } else {
        tracing::debug!(errors = checker.errors.len(), "document rejected");
        Err(checker.errors)
    }
}

impl<'a> Checker<'a> {
    fn new(doc: &'a Document, registry: &'a FunctionRegistry) -> Self {
        Checker {
            doc,
            registry,
            types: TypeRegistry::new(),
            names: NameGenerator::new(),
            arena: TypedArena::new(),
            errors: Vec::new(),
            input: Type::Null,
            output: Type::Null,
            cells: Vec::new(),
            cell_ids: FxHashMap::default(),
            pools: Vec::new(),
            pool_ids: FxHashMap::default(),
            sigs: Vec::new(),
            fcn_ids: FxHashMap::default(),
            inline: Vec::new(),
            scope: Scope::default(),
            block: Block::Action,
            current_fcn: None,
            effects: EffectGraph::default(),
            update_sites: Vec::new(),
            active_update: None,
        }
    }

    fn run(&mut self) -> Option<TypedProgram> {
        let doc = self.doc;

        // Pass 0
        let input = self.parse_type(&doc.input);
        let output = self.parse_type(&doc.output);
        let (Ok(input), Ok(output)) = (input, output) else {
            return None;
        };
        self.input = input;
        self.output = output;
        self.declare_cells();
        self.declare_pools();

        // Pass 1
        self.declare_fcns();
        self.effects = EffectGraph::with_fcns(self.sigs.len());

        // Pass 2
        let fcns = self.check_fcns();
        let begin = self.check_top(Block::Begin, &doc.begin, None);
        let result = matches!(doc.method, Method::Map | Method::Fold).then(|| self.output.clone());
        let action = self.check_top(Block::Action, &doc.action, result.as_ref());
        let end = self.check_top(Block::End, &doc.end, None);
        let (zero, merge) = self.check_fold();

        // Pass 3
        self.check_update_sites();

        let name = match &doc.name {
            Some(name) => name.clone(),
            None => self.names.fresh("Engine", &self.types),
        };
        Some(TypedProgram {
            name,
            version: doc.version,
            doc: doc.doc.clone(),
            metadata: doc.metadata.clone(),
            method: doc.method,
            input: self.input.clone(),
            output: self.output.clone(),
            cells: std::mem::take(&mut self.cells),
            pools: std::mem::take(&mut self.pools),
            fcns: fcns?,
            inline: std::mem::take(&mut self.inline),
            begin: begin.ok()?,
            action: action.ok()?,
            end: end.ok()?,
            zero,
            merge: merge.ok()?,
            randseed: doc.randseed,
            options: doc.options.clone(),
            arena: std::mem::take(&mut self.arena),
        })
    }

    // ========================================================================
    // Pass 0: declarations
    // ========================================================================

    fn declare_cells(&mut self) {
        let doc = self.doc;
        for decl in &doc.cells {
            let Ok(ty) = self.parse_type(&decl.ty) else { continue };
            let init = match json::decode(&decl.init, &ty) {
                Ok(v) => v,
                Err(e) => {
                    let context = format!("initial value of cell `{}`", decl.name);
                    self.report(invalid_value(&decl.pos.key("init"), &context, &e.to_string()));
                    continue;
                }
            };
            self.cell_ids
                .insert(decl.name.to_string(), CellId::from_index(self.cells.len()));
            self.cells.push(CellInfo {
                name: decl.name.clone(),
                ty,
                init,
                shared: decl.shared,
            });
        }
    }

    fn declare_pools(&mut self) {
        let doc = self.doc;
        for decl in &doc.pools {
            let Ok(ty) = self.parse_type(&decl.ty) else { continue };
            let mut init = IndexMap::with_capacity(decl.init.len());
            let mut ok = true;
            for (key, json) in &decl.init {
                match json::decode(json, &ty) {
                    Ok(v) => {
                        init.insert(key.clone(), v);
                    }
                    Err(e) => {
                        let context = format!("initial entry {key:?} of pool `{}`", decl.name);
                        self.report(invalid_value(
                            &decl.pos.key("init").key(key),
                            &context,
                            &e.to_string(),
                        ));
                        ok = false;
                    }
                }
            }
            if !ok {
                continue;
            }
            self.pool_ids
                .insert(decl.name.to_string(), PoolId::from_index(self.pools.len()));
            self.pools.push(PoolInfo {
                name: decl.name.clone(),
                ty,
                init,
                shared: decl.shared,
            });
        }
    }

    // ========================================================================
    // Pass 1: signatures
    // ========================================================================

    fn declare_fcns(&mut self) {
        let doc = self.doc;
        for decl in &doc.fcns {
            let params = decl
                .def
                .params
                .iter()
                .map(|p| self.parse_param_type(&p.ty).map(|ty| (p.name.clone(), ty)))
                .collect::<Vec<_>>();
            let ret = self.parse_type(&decl.def.ret);
            let (Some(params), Ok(ret)) = (params.into_iter().collect::<Ck<Vec<_>>>().ok(), ret)
            else {
                continue;
            };
            self.fcn_ids
                .insert(decl.name.to_string(), FcnId::from_index(self.sigs.len()));
            self.sigs.push(FcnSig {
                name: decl.name.clone(),
                params,
                ret,
            });
        }
    }

    // ========================================================================
    // Pass 2: bodies
    // ========================================================================

    fn check_fcns(&mut self) -> Option<Vec<UserFcn>> {
        let mut fcns = Vec::with_capacity(self.sigs.len());
        let mut failed = false;
        let doc = self.doc;
        for decl in &doc.fcns {
            let Some(&id) = self.fcn_ids.get(decl.name.as_str()) else {
                failed = true;
                continue;
            };
            let params = self.sigs[id.index()].params.clone();
            let ret = self.sigs[id.index()].ret.clone();
            self.scope = Scope::default();
            self.scope.push_frame();
            for (name, ty) in &params {
                self.scope.declare(name.clone(), ty.clone());
            }
            self.block = Block::Fcn;
            self.current_fcn = Some(id);
            let body = self.body_returning(&decl.def.body, &ret, &decl.def.pos);
            self.current_fcn = None;
            match body {
                Ok(body) => fcns.push(UserFcn {
                    name: self.sigs[id.index()].name.clone(),
                    params,
                    ret,
                    body,
                    pos: decl.def.pos.clone(),
                }),
                Err(Reported) => failed = true,
            }
        }
        (!failed).then_some(fcns)
    }

    /// Check a top-level body. With `result`, its value is widened to it.
    fn check_top(
        &mut self,
        block: Block,
        body: &[ExprId],
        result: Option<&Type>,
    ) -> Ck<Vec<TExprId>> {
        self.scope = Scope::with_specials(self.specials(block));
        self.block = block;
        let pos = Pos::root().key(block.as_str());
        match result {
            Some(ty) => self.body_returning(body, ty, &pos),
            None => self.exprs(body),
        }
    }

    fn specials(&self, block: Block) -> Vec<(Special, Type)> {
        let mut out = Vec::new();
        if block == Block::Merge {
            out.push((Special::TallyOne, self.output.clone()));
            out.push((Special::TallyTwo, self.output.clone()));
            return out;
        }
        if block == Block::Action {
            out.push((Special::Input, self.input.clone()));
        }
        if self.doc.method == Method::Fold && block != Block::Begin {
            out.push((Special::Tally, self.output.clone()));
        }
        out.push((Special::Name, Type::String));
        out.push((Special::Instance, Type::Int));
        if self.doc.version.is_some() {
            out.push((Special::Version, Type::Int));
        }
        out.push((Special::ActionsStarted, Type::Long));
        out.push((Special::ActionsFinished, Type::Long));
        out
    }

    fn check_fold(&mut self) -> (Option<Value>, Ck<Option<Vec<TExprId>>>) {
        let doc = self.doc;
        if doc.method != Method::Fold {
            for (present, field) in [(doc.zero.is_some(), "zero"), (doc.merge.is_some(), "merge")] {
                if present {
                    self.report(
                        Diagnostic::error(ErrorCode::E3012)
                            .with_message(format!("`{field}` is only meaningful with method fold"))
                            .at(&Pos::root().key(field)),
                    );
                }
            }
            return (None, Ok(None));
        }
        let zero = match &doc.zero {
            Some((json, pos)) => match json::decode(json, &self.output) {
                Ok(v) => Some(v),
                Err(e) => {
                    self.report(invalid_value(pos, "zero", &e.to_string()));
                    None
                }
            },
            None => {
                self.report(
                    Diagnostic::error(ErrorCode::E3012)
                        .with_message("method fold requires `zero`")
                        .at(&Pos::root()),
                );
                None
            }
        };
        let merge = match &doc.merge {
            Some(body) => {
                let output = self.output.clone();
                self.check_top(Block::Merge, body, Some(&output)).map(Some)
            }
            None => {
                self.report(
                    Diagnostic::error(ErrorCode::E3012)
                        .with_message("method fold requires `merge`")
                        .at(&Pos::root()),
                );
                Err(Reported)
            }
        };
        (zero, merge)
    }

    // ========================================================================
    // Pass 3: effects
    // ========================================================================

    fn check_update_sites(&mut self) {
        let total = self.effects.closure();
        let sites = std::mem::take(&mut self.update_sites);
        for site in sites {
            if let Some(&callee) = site
                .callees
                .iter()
                .find(|f| total[f.index()].intersects(Effects::STATE))
            {
                let name = self.sigs[callee.index()].name.clone();
                self.report(
                    Diagnostic::error(ErrorCode::E3010)
                        .with_message(format!(
                            "update function calls `u.{name}`, which accesses a cell or pool"
                        ))
                        .at(&site.pos)
                        .with_note("an update must not read or write engine state"),
                );
            }
        }
    }

    // ========================================================================
    // Shared helpers
    // ========================================================================

    fn report(&mut self, diagnostic: Diagnostic) -> Reported {
        self.errors.push(diagnostic);
        Reported
    }

    fn alloc(&mut self, kind: TKind, ty: Type, pos: &Pos) -> TExprId {
        self.arena.alloc(kind, ty, pos.clone())
    }

    fn ty(&self, id: TExprId) -> &Type {
        self.arena.ty(id)
    }

    fn parse_type(&mut self, te: &TypeExpr) -> Ck<Type> {
        let parsed = SchemaParser::new(&mut self.types, &mut self.names).parse(&te.json, &te.pos);
        parsed.map_err(|d| self.report(d))
    }

    fn parse_param_type(&mut self, te: &TypeExpr) -> Ck<Type> {
        let parsed =
            SchemaParser::new(&mut self.types, &mut self.names).parse_param(&te.json, &te.pos);
        parsed.map_err(|d| self.report(d))
    }

    /// Widen `id` to `to`, or report a mismatch in `context`.
    fn coerce_to(&mut self, id: TExprId, to: &Type, context: &str) -> Ck {
        let from = self.ty(id);
        if from == to {
            return Ok(id);
        }
        if to.accepts(from) {
            let pos = self.arena.pos(id).clone();
            return Ok(self.alloc(TKind::Coerce(id), to.clone(), &pos));
        }
        let (expected, found) = (to.to_string(), from.to_string());
        let pos = self.arena.pos(id).clone();
        Err(self.report(type_mismatch(&pos, &expected, &found, context)))
    }

    /// Check every expression, reporting all failures.
    fn exprs(&mut self, ids: &[ExprId]) -> Ck<Vec<TExprId>> {
        let mut out = Vec::with_capacity(ids.len());
        let mut failed = false;
        for &id in ids {
            match self.expr(id) {
                Ok(t) => out.push(t),
                Err(Reported) => failed = true,
            }
        }
        if failed {
            Err(Reported)
        } else {
            Ok(out)
        }
    }

    /// Check a body in a fresh frame; its type is that of the last expression.
    fn block(&mut self, ids: &[ExprId]) -> Ck<(Vec<TExprId>, Type)> {
        self.scope.push_frame();
        let body = self.exprs(ids);
        self.scope.pop_frame();
        let body = body?;
        let ty = body.last().map_or(Type::Null, |&last| self.ty(last).clone());
        Ok((body, ty))
    }

    /// Check a body whose value must be accepted by `ret`; the last
    /// expression is widened in place.
    fn body_returning(&mut self, ids: &[ExprId], ret: &Type, pos: &Pos) -> Ck<Vec<TExprId>> {
        let (mut body, _) = self.block(ids)?;
        self.widen_last(&mut body, ret, pos, "function result")?;
        Ok(body)
    }

    /// Widen the last expression of `body` to `ty`; an empty body yields `null`.
    fn widen_last(
        &mut self,
        body: &mut Vec<TExprId>,
        ty: &Type,
        pos: &Pos,
        context: &str,
    ) -> Ck<()> {
        let last = match body.pop() {
            Some(last) => last,
            None => self.alloc(TKind::Literal(Value::Null), Type::Null, pos),
        };
        let last = self.coerce_to(last, ty, context)?;
        body.push(last);
        Ok(())
    }

    /// Record a state access, rejecting it inside an update function.
    fn touch_state(&mut self, effects: Effects, what: &str, pos: &Pos) -> Ck<()> {
        if self.active_update.is_some() {
            return Err(self.report(
                Diagnostic::error(ErrorCode::E3010)
                    .with_message(format!("update function accesses {what}"))
                    .at(pos)
                    .with_note("an update must not read or write engine state"),
            ));
        }
        if let Some(f) = self.current_fcn {
            self.effects.add(f, effects);
        }
        Ok(())
    }

    /// Record a dependency on a user function.
    fn uses_fcn(&mut self, callee: FcnId) {
        if let Some(f) = self.current_fcn {
            self.effects.edge(f, callee);
        }
        if let Some(site) = self.active_update {
            self.update_sites[site].callees.push(callee);
        }
    }
}

#[cfg(test)]
mod tests;
