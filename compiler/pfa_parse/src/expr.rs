//! Expression forms.

use base64::Engine as _;
use pfa_diagnostic::{malformed_form, missing_field, Diagnostic, ErrorCode};
use pfa_ir::{
    CastCase, Expr, ExprId, ExprKind, FcnDef, Literal, Name, NewItems, Param, Pos, TypeExpr,
};
use serde_json::{Map, Value as Json};

use crate::Parser;

type Object = Map<String, Json>;

/// Symbol names: `[A-Za-z_][A-Za-z0-9_]*`.
pub(crate) fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Reject keys outside `allowed` for a form.
fn check_keys(obj: &Object, form: &str, allowed: &[&str], pos: &Pos) -> Result<(), Diagnostic> {
    match obj.keys().find(|k| !allowed.contains(&k.as_str())) {
        Some(key) => Err(Diagnostic::error(ErrorCode::E1005)
            .with_message(format!("unexpected field \"{key}\" in \"{form}\""))
            .at(&pos.key(key))
            .with_note(format!("\"{form}\" accepts: {}", allowed.join(", ")))),
        None => Ok(()),
    }
}

fn required<'j>(obj: &'j Object, form: &str, key: &str, pos: &Pos) -> Result<&'j Json, Diagnostic> {
    obj.get(key)
        .ok_or_else(|| missing_field(pos, &format!("\"{form}\""), key))
}

fn string_arg(json: &Json, form: &str, pos: &Pos) -> Result<String, Diagnostic> {
    match json {
        Json::String(s) => Ok(s.clone()),
        _ => Err(malformed_form(pos, form, "a string")),
    }
}

fn identifier_arg(json: &Json, form: &str, pos: &Pos) -> Result<Name, Diagnostic> {
    match json {
        Json::String(s) if is_identifier(s) => Ok(Name::new(s)),
        _ => Err(malformed_form(pos, form, "a symbol name")),
    }
}

fn bool_arg(json: Option<&Json>, form: &str, pos: &Pos) -> Result<bool, Diagnostic> {
    match json {
        None => Ok(false),
        Some(Json::Bool(b)) => Ok(*b),
        Some(_) => Err(malformed_form(pos, form, "a boolean")),
    }
}

fn number_literal(n: &serde_json::Number) -> Literal {
    if let Some(i) = n.as_i64() {
        match i32::try_from(i) {
            Ok(small) => Literal::Int(small),
            Err(_) => Literal::Long(i),
        }
    } else {
        Literal::Double(n.as_f64().unwrap_or(f64::NAN))
    }
}

/// Typed-literal shorthands (`{"int": 1}`, `{"base64": "..."}`, ...).
fn typed_shorthand(key: &str, value: &Json, pos: &Pos) -> Option<Result<Literal, Diagnostic>> {
    let bad = |expected: &str| {
        Diagnostic::error(ErrorCode::E1006)
            .with_message(format!("invalid \"{key}\" literal {value}: expected {expected}"))
            .at(pos)
    };
    Some(match key {
        "int" => value
            .as_i64()
            .and_then(|n| i32::try_from(n).ok())
            .map(Literal::Int)
            .ok_or_else(|| bad("a 32-bit integer")),
        "long" => value
            .as_i64()
            .map(Literal::Long)
            .ok_or_else(|| bad("a 64-bit integer")),
        #[allow(clippy::cast_possible_truncation, reason = "float literals are single precision")]
        "float" => value
            .as_f64()
            .map(|x| Literal::Float(x as f32))
            .ok_or_else(|| bad("a number")),
        "double" => value
            .as_f64()
            .map(Literal::Double)
            .ok_or_else(|| bad("a number")),
        "string" => match value {
            Json::String(s) => Ok(Literal::String(s.clone())),
            _ => Err(bad("a string")),
        },
        "base64" => match value {
            Json::String(s) => base64::engine::general_purpose::STANDARD
                .decode(s)
                .map(Literal::Bytes)
                .map_err(|e| bad(&format!("base64 text ({e})"))),
            _ => Err(bad("a base64 string")),
        },
        _ => return None,
    })
}

impl Parser {
    /// Parse a block: one expression or an array of expressions.
    pub(crate) fn body(&mut self, json: &Json, pos: &Pos) -> Vec<ExprId> {
        match json {
            Json::Array(items) => items
                .iter()
                .enumerate()
                .map(|(i, item)| self.expr(item, &pos.index(i)))
                .collect(),
            single => vec![self.expr(single, pos)],
        }
    }

    /// Parse one expression. Malformed input is reported and replaced by a
    /// `null` placeholder so the rest of the document is still checked.
    pub(crate) fn expr(&mut self, json: &Json, pos: &Pos) -> ExprId {
        let kind = match self.expr_kind(json, pos) {
            Ok(kind) => kind,
            Err(diagnostic) => {
                self.error(diagnostic);
                ExprKind::Literal(Literal::Null)
            }
        };
        self.arena.alloc(Expr::new(kind, pos.clone()))
    }

    fn expr_kind(&mut self, json: &Json, pos: &Pos) -> Result<ExprKind, Diagnostic> {
        match json {
            Json::Null => Ok(ExprKind::Literal(Literal::Null)),
            Json::Bool(b) => Ok(ExprKind::Literal(Literal::Boolean(*b))),
            Json::Number(n) => Ok(ExprKind::Literal(number_literal(n))),
            Json::String(s) => self.symbol(s, pos),
            Json::Array(items) => match items.as_slice() {
                [Json::String(s)] => Ok(ExprKind::Literal(Literal::String(s.clone()))),
                _ => Err(Diagnostic::error(ErrorCode::E1004)
                    .with_message("an array is not an expression")
                    .at(pos)
                    .with_suggestion(
                        "use [\"text\"] for a string literal or {\"new\": [...], \"type\": ...} for an array",
                    )),
            },
            Json::Object(obj) => self.object(obj, pos),
        }
    }

    /// `"x"` is a symbol reference; `"x.a.b"` is shorthand for an `attr`
    /// lookup with string (or, for digits, int) path elements.
    fn symbol(&mut self, s: &str, pos: &Pos) -> Result<ExprKind, Diagnostic> {
        let mut segments = s.split('.');
        let head = segments.next().unwrap_or_default();
        if !is_identifier(head) {
            return Err(Diagnostic::error(ErrorCode::E1004)
                .with_message(format!("\"{s}\" is not a symbol reference"))
                .at(pos)
                .with_suggestion("write string literals as [\"text\"] or {\"string\": \"text\"}"));
        }
        let base = ExprKind::Ref(Name::new(head));
        let rest: Vec<&str> = segments.collect();
        if rest.is_empty() {
            return Ok(base);
        }
        let expr = self.arena.alloc(Expr::new(base, pos.clone()));
        let mut path = Vec::with_capacity(rest.len());
        for segment in rest {
            let literal = if !segment.is_empty() && segment.bytes().all(|b| b.is_ascii_digit()) {
                segment
                    .parse::<i32>()
                    .map(Literal::Int)
                    .map_err(|_| malformed_form(pos, s, "a valid array index"))?
            } else if is_identifier(segment) {
                Literal::String(segment.to_string())
            } else {
                return Err(malformed_form(pos, s, "dot-separated field names"));
            };
            path.push(self.arena.alloc(Expr::new(ExprKind::Literal(literal), pos.clone())));
        }
        Ok(ExprKind::Attr {
            expr,
            path,
            to: None,
        })
    }

    fn object(&mut self, obj: &Object, pos: &Pos) -> Result<ExprKind, Diagnostic> {
        let has = |k: &str| obj.contains_key(k);

        if obj.len() == 1 {
            if let Some((key, value)) = obj.iter().next() {
                if let Some(literal) = typed_shorthand(key, value, &pos.key(key)) {
                    return literal.map(ExprKind::Literal);
                }
            }
        }

        if has("type") && has("value") {
            check_keys(obj, "value", &["type", "value"], pos)?;
            return Ok(ExprKind::TypedLiteral {
                ty: TypeExpr::new(obj["type"].clone(), pos.key("type")),
                value: obj["value"].clone(),
            });
        }
        if has("new") {
            return self.new_form(obj, pos);
        }
        if has("cell") {
            check_keys(obj, "cell", &["cell", "path", "to"], pos)?;
            return Ok(ExprKind::Cell {
                name: identifier_arg(&obj["cell"], "cell", &pos.key("cell"))?,
                path: self.path(obj.get("path"), pos)?,
                to: obj.get("to").map(|to| self.expr(to, &pos.key("to"))),
            });
        }
        if has("pool") {
            let name = identifier_arg(&obj["pool"], "pool", &pos.key("pool"))?;
            if has("del") {
                check_keys(obj, "pool", &["pool", "del"], pos)?;
                return Ok(ExprKind::PoolDel {
                    name,
                    key: self.expr(&obj["del"], &pos.key("del")),
                });
            }
            check_keys(obj, "pool", &["pool", "path", "to", "init"], pos)?;
            let path = self.path(Some(required(obj, "pool", "path", pos)?), pos)?;
            if path.is_empty() {
                return Err(malformed_form(
                    &pos.key("path"),
                    "pool",
                    "a path starting with the pool key",
                ));
            }
            return Ok(ExprKind::Pool {
                name,
                path,
                to: obj.get("to").map(|to| self.expr(to, &pos.key("to"))),
                init: obj.get("init").map(|init| self.expr(init, &pos.key("init"))),
            });
        }
        if has("attr") {
            check_keys(obj, "attr", &["attr", "path", "to"], pos)?;
            let expr = self.expr(&obj["attr"], &pos.key("attr"));
            let path = self.path(Some(required(obj, "attr", "path", pos)?), pos)?;
            if path.is_empty() {
                return Err(malformed_form(&pos.key("path"), "attr", "a non-empty path"));
            }
            return Ok(ExprKind::Attr {
                expr,
                path,
                to: obj.get("to").map(|to| self.expr(to, &pos.key("to"))),
            });
        }
        if has("let") || has("set") {
            let form = if has("let") { "let" } else { "set" };
            check_keys(obj, form, &[form], pos)?;
            let bindings = self.bindings(&obj[form], form, &pos.key(form))?;
            return Ok(if form == "let" {
                ExprKind::Let(bindings)
            } else {
                ExprKind::Set(bindings)
            });
        }
        if has("if") {
            check_keys(obj, "if", &["if", "then", "else"], pos)?;
            return Ok(ExprKind::If {
                cond: self.expr(&obj["if"], &pos.key("if")),
                then: self.body(required(obj, "if", "then", pos)?, &pos.key("then")),
                else_: obj.get("else").map(|e| self.body(e, &pos.key("else"))),
            });
        }
        if has("cond") {
            return self.cond_form(obj, pos);
        }
        if has("for") {
            check_keys(obj, "for", &["for", "while", "step", "do"], pos)?;
            let init = self.bindings(&obj["for"], "for", &pos.key("for"))?;
            let cond = self.expr(required(obj, "for", "while", pos)?, &pos.key("while"));
            let step = self.bindings(required(obj, "for", "step", pos)?, "step", &pos.key("step"))?;
            let body = self.body(required(obj, "for", "do", pos)?, &pos.key("do"));
            return Ok(ExprKind::For {
                init,
                cond,
                step,
                body,
            });
        }
        if has("foreach") {
            check_keys(obj, "foreach", &["foreach", "in", "do", "seq"], pos)?;
            return Ok(ExprKind::Foreach {
                var: identifier_arg(&obj["foreach"], "foreach", &pos.key("foreach"))?,
                array: self.expr(required(obj, "foreach", "in", pos)?, &pos.key("in")),
                body: self.body(required(obj, "foreach", "do", pos)?, &pos.key("do")),
                seq: bool_arg(obj.get("seq"), "seq", &pos.key("seq"))?,
            });
        }
        if has("forkey") {
            check_keys(obj, "forkey", &["forkey", "forval", "in", "do"], pos)?;
            return Ok(ExprKind::Forkey {
                key: identifier_arg(&obj["forkey"], "forkey", &pos.key("forkey"))?,
                value: identifier_arg(
                    required(obj, "forkey", "forval", pos)?,
                    "forval",
                    &pos.key("forval"),
                )?,
                map: self.expr(required(obj, "forkey", "in", pos)?, &pos.key("in")),
                body: self.body(required(obj, "forkey", "do", pos)?, &pos.key("do")),
            });
        }
        if has("while") {
            check_keys(obj, "while", &["while", "do"], pos)?;
            return Ok(ExprKind::While {
                cond: self.expr(&obj["while"], &pos.key("while")),
                body: self.body(required(obj, "while", "do", pos)?, &pos.key("do")),
            });
        }
        if has("until") {
            check_keys(obj, "until", &["do", "until"], pos)?;
            return Ok(ExprKind::DoUntil {
                body: self.body(required(obj, "until", "do", pos)?, &pos.key("do")),
                cond: self.expr(&obj["until"], &pos.key("until")),
            });
        }
        if has("cast") {
            return self.cast_form(obj, pos);
        }
        if has("upcast") {
            check_keys(obj, "upcast", &["upcast", "as"], pos)?;
            return Ok(ExprKind::Upcast {
                expr: self.expr(&obj["upcast"], &pos.key("upcast")),
                ty: TypeExpr::new(required(obj, "upcast", "as", pos)?.clone(), pos.key("as")),
            });
        }
        if has("ifnotnull") {
            check_keys(obj, "ifnotnull", &["ifnotnull", "then", "else"], pos)?;
            return Ok(ExprKind::IfNotNull {
                bindings: self.bindings(&obj["ifnotnull"], "ifnotnull", &pos.key("ifnotnull"))?,
                then: self.body(required(obj, "ifnotnull", "then", pos)?, &pos.key("then")),
                else_: obj.get("else").map(|e| self.body(e, &pos.key("else"))),
            });
        }
        if has("params") {
            return self.try_fcn_def(obj, pos).map(ExprKind::FcnDef);
        }
        if has("fcn") {
            check_keys(obj, "fcn", &["fcn", "fill"], pos)?;
            let name = string_arg(&obj["fcn"], "fcn", &pos.key("fcn"))?;
            let fill = match obj.get("fill") {
                Some(fill) => self.bindings(fill, "fill", &pos.key("fill"))?,
                None => Vec::new(),
            };
            return Ok(ExprKind::FcnRef {
                name: Name::new(name),
                fill,
            });
        }
        if has("error") {
            check_keys(obj, "error", &["error", "code"], pos)?;
            let code = match obj.get("code") {
                None => None,
                Some(c) => Some(
                    c.as_i64()
                        .and_then(|n| i32::try_from(n).ok())
                        .ok_or_else(|| malformed_form(&pos.key("code"), "code", "an int"))?,
                ),
            };
            return Ok(ExprKind::Error {
                message: string_arg(&obj["error"], "error", &pos.key("error"))?,
                code,
            });
        }
        if has("log") {
            check_keys(obj, "log", &["log", "namespace"], pos)?;
            let namespace = match obj.get("namespace") {
                Some(ns) => Some(string_arg(ns, "namespace", &pos.key("namespace"))?),
                None => None,
            };
            return Ok(ExprKind::Log {
                args: self.body(&obj["log"], &pos.key("log")),
                namespace,
            });
        }
        if has("emit") {
            check_keys(obj, "emit", &["emit"], pos)?;
            let args = self.body(&obj["emit"], &pos.key("emit"));
            return match args.as_slice() {
                [one] => Ok(ExprKind::Emit(*one)),
                _ => Err(malformed_form(&pos.key("emit"), "emit", "exactly one argument")),
            };
        }
        if has("doc") {
            check_keys(obj, "doc", &["doc"], pos)?;
            return Ok(ExprKind::Doc(string_arg(&obj["doc"], "doc", &pos.key("doc"))?));
        }
        if has("do") {
            check_keys(obj, "do", &["do"], pos)?;
            return Ok(ExprKind::Do(self.body(&obj["do"], &pos.key("do"))));
        }

        // Anything else with a single key is a call.
        match obj.iter().next() {
            Some((name, args)) if obj.len() == 1 => {
                let args_pos = pos.key(name);
                let args = match args {
                    Json::Array(items) => items
                        .iter()
                        .enumerate()
                        .map(|(i, a)| self.expr(a, &args_pos.index(i)))
                        .collect(),
                    single => vec![self.expr(single, &args_pos)],
                };
                Ok(ExprKind::Call {
                    name: Name::new(name),
                    args,
                })
            }
            _ => Err(Diagnostic::error(ErrorCode::E1004)
                .with_message(format!(
                    "unrecognized expression form with fields {:?}",
                    obj.keys().collect::<Vec<_>>()
                ))
                .at(pos)),
        }
    }

    fn new_form(&mut self, obj: &Object, pos: &Pos) -> Result<ExprKind, Diagnostic> {
        check_keys(obj, "new", &["new", "type"], pos)?;
        let ty = TypeExpr::new(required(obj, "new", "type", pos)?.clone(), pos.key("type"));
        let new_pos = pos.key("new");
        let items = match &obj["new"] {
            Json::Object(fields) => NewItems::Fields(
                fields
                    .iter()
                    .map(|(k, v)| (Name::new(k), self.expr(v, &new_pos.key(k))))
                    .collect(),
            ),
            Json::Array(items) => NewItems::Items(
                items
                    .iter()
                    .enumerate()
                    .map(|(i, v)| self.expr(v, &new_pos.index(i)))
                    .collect(),
            ),
            _ => return Err(malformed_form(&new_pos, "new", "an object or an array")),
        };
        Ok(ExprKind::New { items, ty })
    }

    fn cond_form(&mut self, obj: &Object, pos: &Pos) -> Result<ExprKind, Diagnostic> {
        check_keys(obj, "cond", &["cond", "else"], pos)?;
        let cond_pos = pos.key("cond");
        let Json::Array(raw_arms) = &obj["cond"] else {
            return Err(malformed_form(&cond_pos, "cond", "an array of {\"if\", \"then\"} objects"));
        };
        if raw_arms.is_empty() {
            return Err(malformed_form(&cond_pos, "cond", "at least one arm"));
        }
        let mut arms = Vec::with_capacity(raw_arms.len());
        for (i, arm) in raw_arms.iter().enumerate() {
            let arm_pos = cond_pos.index(i);
            let Json::Object(arm) = arm else {
                return Err(malformed_form(&arm_pos, "cond", "{\"if\", \"then\"} objects"));
            };
            check_keys(arm, "cond arm", &["if", "then"], &arm_pos)?;
            let test = self.expr(required(arm, "cond arm", "if", &arm_pos)?, &arm_pos.key("if"));
            let then = self.body(
                required(arm, "cond arm", "then", &arm_pos)?,
                &arm_pos.key("then"),
            );
            arms.push((test, then));
        }
        Ok(ExprKind::Cond {
            arms,
            else_: obj.get("else").map(|e| self.body(e, &pos.key("else"))),
        })
    }

    fn cast_form(&mut self, obj: &Object, pos: &Pos) -> Result<ExprKind, Diagnostic> {
        check_keys(obj, "cast", &["cast", "cases", "partial"], pos)?;
        let expr = self.expr(&obj["cast"], &pos.key("cast"));
        let cases_pos = pos.key("cases");
        let Json::Array(raw_cases) = required(obj, "cast", "cases", pos)? else {
            return Err(malformed_form(&cases_pos, "cases", "an array of cases"));
        };
        let mut cases = Vec::with_capacity(raw_cases.len());
        for (i, case) in raw_cases.iter().enumerate() {
            let case_pos = cases_pos.index(i);
            let Json::Object(case) = case else {
                return Err(malformed_form(
                    &case_pos,
                    "cases",
                    "{\"as\", \"named\", \"do\"} objects",
                ));
            };
            check_keys(case, "cast case", &["as", "named", "do"], &case_pos)?;
            cases.push(CastCase {
                ty: TypeExpr::new(
                    required(case, "cast case", "as", &case_pos)?.clone(),
                    case_pos.key("as"),
                ),
                named: identifier_arg(
                    required(case, "cast case", "named", &case_pos)?,
                    "named",
                    &case_pos.key("named"),
                )?,
                body: self.body(required(case, "cast case", "do", &case_pos)?, &case_pos.key("do")),
                pos: case_pos,
            });
        }
        Ok(ExprKind::Cast {
            expr,
            cases,
            partial: bool_arg(obj.get("partial"), "partial", &pos.key("partial"))?,
        })
    }

    /// `{"name": expr, ...}` with symbol-name keys.
    fn bindings(
        &mut self,
        json: &Json,
        form: &str,
        pos: &Pos,
    ) -> Result<Vec<(Name, ExprId)>, Diagnostic> {
        let Json::Object(obj) = json else {
            return Err(malformed_form(pos, form, "an object of symbol: expression pairs"));
        };
        if obj.is_empty() && form != "fill" {
            return Err(malformed_form(pos, form, "at least one binding"));
        }
        let mut out = Vec::with_capacity(obj.len());
        for (name, value) in obj {
            if !is_identifier(name) {
                return Err(malformed_form(&pos.key(name), form, "symbol names as keys"));
            }
            out.push((Name::new(name), self.expr(value, &pos.key(name))));
        }
        Ok(out)
    }

    fn path(&mut self, json: Option<&Json>, pos: &Pos) -> Result<Vec<ExprId>, Diagnostic> {
        let path_pos = pos.key("path");
        match json {
            None => Ok(Vec::new()),
            Some(Json::Array(items)) => Ok(items
                .iter()
                .enumerate()
                .map(|(i, item)| self.expr(item, &path_pos.index(i)))
                .collect()),
            Some(_) => Err(malformed_form(&path_pos, "path", "an array of expressions")),
        }
    }

    /// `{"params": [{"x": T}, ...], "ret": T, "do": [...]}`.
    ///
    /// Reports its own errors; `None` means the definition was malformed.
    pub(crate) fn fcn_def(&mut self, obj: &Object, pos: &Pos) -> Option<FcnDef> {
        match self.try_fcn_def(obj, pos) {
            Ok(def) => Some(def),
            Err(diagnostic) => {
                self.error(diagnostic);
                None
            }
        }
    }

    fn try_fcn_def(&mut self, obj: &Object, pos: &Pos) -> Result<FcnDef, Diagnostic> {
        check_keys(obj, "function", &["params", "ret", "do"], pos)?;
        let params_pos = pos.key("params");
        let Json::Array(raw_params) = required(obj, "function", "params", pos)? else {
            return Err(Diagnostic::error(ErrorCode::E1007)
                .with_message("function params must be an array of {name: type} objects")
                .at(&params_pos));
        };
        let mut params = Vec::with_capacity(raw_params.len());
        for (i, raw) in raw_params.iter().enumerate() {
            let param_pos = params_pos.index(i);
            let entry = match raw {
                Json::Object(p) if p.len() == 1 => p.iter().next(),
                _ => None,
            };
            let Some((name, ty)) = entry.filter(|(name, _)| is_identifier(name)) else {
                return Err(Diagnostic::error(ErrorCode::E1007)
                    .with_message("each parameter must be a single {name: type} object")
                    .at(&param_pos));
            };
            if params.iter().any(|p: &Param| p.name.as_str() == name) {
                return Err(Diagnostic::error(ErrorCode::E1007)
                    .with_message(format!("duplicate parameter \"{name}\""))
                    .at(&param_pos));
            }
            params.push(Param {
                name: Name::new(name),
                ty: TypeExpr::new(ty.clone(), param_pos.key(name)),
            });
        }
        let ret = TypeExpr::new(required(obj, "function", "ret", pos)?.clone(), pos.key("ret"));
        let body = self.body(required(obj, "function", "do", pos)?, &pos.key("do"));
        Ok(FcnDef {
            params,
            ret,
            body,
            pos: pos.clone(),
        })
    }
}
