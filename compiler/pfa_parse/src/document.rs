//! Top-level document fields.

use indexmap::IndexMap;
use pfa_diagnostic::{malformed_form, missing_field, Diagnostic, ErrorCode};
use pfa_ir::{CellDecl, Document, FcnDecl, Method, Name, OptionEntry, PoolDecl, Pos, TypeExpr};
use serde_json::Value as Json;

use crate::expr::is_identifier;
use crate::Parser;

const TOP_LEVEL: [&str; 17] = [
    "name", "version", "doc", "metadata", "method", "input", "output", "begin", "action", "end",
    "fcns", "cells", "pools", "zero", "merge", "randseed", "options",
];

impl Parser {
    /// Parse a whole document.
    pub fn parse_document(mut self, json: &Json) -> Result<Document, Vec<Diagnostic>> {
        let root = Pos::root();
        let Json::Object(obj) = json else {
            return Err(vec![Diagnostic::error(ErrorCode::E1001)
                .with_message("a scoring document must be a JSON object")]);
        };

        for key in obj.keys() {
            if !TOP_LEVEL.contains(&key.as_str()) {
                self.error(
                    Diagnostic::error(ErrorCode::E1003)
                        .with_message(format!("unknown top-level field \"{key}\""))
                        .at(&root.key(key)),
                );
            }
        }

        let input = self.type_field(obj, "input", &root);
        let output = self.type_field(obj, "output", &root);

        let action = match obj.get("action") {
            Some(action) => self.body(action, &root.key("action")),
            None => {
                self.error(missing_field(&root, "document", "action"));
                Vec::new()
            }
        };
        let begin = obj
            .get("begin")
            .map(|b| self.body(b, &root.key("begin")))
            .unwrap_or_default();
        let end = obj
            .get("end")
            .map(|e| self.body(e, &root.key("end")))
            .unwrap_or_default();
        let merge = obj.get("merge").map(|m| self.body(m, &root.key("merge")));

        let method = match obj.get("method") {
            None => Method::Map,
            Some(Json::String(m)) if m == "map" => Method::Map,
            Some(Json::String(m)) if m == "emit" => Method::Emit,
            Some(Json::String(m)) if m == "fold" => Method::Fold,
            Some(other) => {
                self.error(
                    Diagnostic::error(ErrorCode::E1008)
                        .with_message(format!("unknown method {other}"))
                        .at(&root.key("method"))
                        .with_note("method must be \"map\", \"emit\" or \"fold\""),
                );
                Method::Map
            }
        };

        let name = self.string_field(obj, "name", &root);
        let doc = self.string_field(obj, "doc", &root);
        let version = match obj.get("version") {
            None => None,
            Some(v) => match v.as_i64().and_then(|n| i32::try_from(n).ok()) {
                Some(n) => Some(n),
                None => {
                    self.error(malformed_form(&root.key("version"), "version", "an int"));
                    None
                }
            },
        };
        let randseed = match obj.get("randseed") {
            None => None,
            Some(v) => match v.as_i64() {
                Some(n) => Some(n),
                None => {
                    self.error(
                        Diagnostic::error(ErrorCode::E4002)
                            .with_message(format!("randseed must be a 64-bit integer, found {v}"))
                            .at(&root.key("randseed")),
                    );
                    None
                }
            },
        };
        let metadata = self.metadata(obj.get("metadata"), &root.key("metadata"));
        let zero = obj.get("zero").map(|z| (z.clone(), root.key("zero")));

        let fcns = self.fcns(obj.get("fcns"), &root.key("fcns"));
        let cells = self.cells(obj.get("cells"), &root.key("cells"));
        let pools = self.pools(obj.get("pools"), &root.key("pools"));
        let options = self.options(obj.get("options"), &root.key("options"));

        if !self.errors.is_empty() {
            return Err(self.errors);
        }
        let (Some(input), Some(output)) = (input, output) else {
            return Err(self.errors);
        };
        tracing::debug!(expressions = self.arena.len(), "parsed document");
        Ok(Document {
            name,
            version,
            doc,
            metadata,
            method,
            input,
            output,
            begin,
            action,
            end,
            fcns,
            cells,
            pools,
            zero,
            merge,
            randseed,
            options,
            arena: self.arena,
        })
    }

    fn type_field(
        &mut self,
        obj: &serde_json::Map<String, Json>,
        key: &str,
        pos: &Pos,
    ) -> Option<TypeExpr> {
        match obj.get(key) {
            Some(json) => Some(TypeExpr::new(json.clone(), pos.key(key))),
            None => {
                self.error(missing_field(pos, "document", key));
                None
            }
        }
    }

    fn string_field(
        &mut self,
        obj: &serde_json::Map<String, Json>,
        key: &str,
        pos: &Pos,
    ) -> Option<String> {
        match obj.get(key)? {
            Json::String(s) => Some(s.clone()),
            _ => {
                self.error(malformed_form(&pos.key(key), key, "a string"));
                None
            }
        }
    }

    fn metadata(&mut self, json: Option<&Json>, pos: &Pos) -> IndexMap<String, String> {
        let mut out = IndexMap::new();
        match json {
            None => {}
            Some(Json::Object(obj)) => {
                for (k, v) in obj {
                    match v {
                        Json::String(s) => {
                            out.insert(k.clone(), s.clone());
                        }
                        _ => self.error(malformed_form(&pos.key(k), "metadata", "string values")),
                    }
                }
            }
            Some(_) => self.error(malformed_form(pos, "metadata", "an object")),
        }
        out
    }

    fn fcns(&mut self, json: Option<&Json>, pos: &Pos) -> Vec<FcnDecl> {
        let Some(json) = json else {
            return Vec::new();
        };
        let Json::Object(obj) = json else {
            self.error(malformed_form(pos, "fcns", "an object of function definitions"));
            return Vec::new();
        };
        let mut out = Vec::with_capacity(obj.len());
        for (name, def) in obj {
            let def_pos = pos.key(name);
            if !name.split('.').all(is_identifier) {
                self.error(
                    Diagnostic::error(ErrorCode::E1007)
                        .with_message(format!("invalid function name \"{name}\""))
                        .at(&def_pos),
                );
                continue;
            }
            let Json::Object(def) = def else {
                self.error(malformed_form(&def_pos, name, "a function definition"));
                continue;
            };
            if let Some(def) = self.fcn_def(def, &def_pos) {
                out.push(FcnDecl {
                    name: Name::new(name),
                    def,
                });
            }
        }
        out
    }

    fn cells(&mut self, json: Option<&Json>, pos: &Pos) -> Vec<CellDecl> {
        let mut out = Vec::new();
        for (name, decl, decl_pos) in self.state_decls(json, pos, "cells") {
            let Some(ty) = decl.get("type") else {
                self.error(missing_field(&decl_pos, "cell", "type"));
                continue;
            };
            let Some(init) = decl.get("init") else {
                self.error(missing_field(&decl_pos, "cell", "init"));
                continue;
            };
            let shared = self.shared_flag(decl, &decl_pos);
            out.push(CellDecl {
                name,
                ty: TypeExpr::new(ty.clone(), decl_pos.key("type")),
                init: init.clone(),
                shared,
                pos: decl_pos,
            });
        }
        out
    }

    fn pools(&mut self, json: Option<&Json>, pos: &Pos) -> Vec<PoolDecl> {
        let mut out = Vec::new();
        for (name, decl, decl_pos) in self.state_decls(json, pos, "pools") {
            let Some(ty) = decl.get("type") else {
                self.error(missing_field(&decl_pos, "pool", "type"));
                continue;
            };
            let init = match decl.get("init") {
                None => IndexMap::new(),
                Some(Json::Object(entries)) => entries
                    .iter()
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect(),
                Some(_) => {
                    self.error(malformed_form(&decl_pos.key("init"), "pool init", "an object"));
                    continue;
                }
            };
            let shared = self.shared_flag(decl, &decl_pos);
            out.push(PoolDecl {
                name,
                ty: TypeExpr::new(ty.clone(), decl_pos.key("type")),
                init,
                shared,
                pos: decl_pos,
            });
        }
        out
    }

    /// Common shape of `cells` and `pools`: an object of named declarations.
    fn state_decls<'j>(
        &mut self,
        json: Option<&'j Json>,
        pos: &Pos,
        section: &str,
    ) -> Vec<(Name, &'j serde_json::Map<String, Json>, Pos)> {
        let Some(json) = json else {
            return Vec::new();
        };
        let Json::Object(obj) = json else {
            self.error(malformed_form(pos, section, "an object of declarations"));
            return Vec::new();
        };
        let mut out = Vec::with_capacity(obj.len());
        for (name, decl) in obj {
            let decl_pos = pos.key(name);
            if !is_identifier(name) {
                self.error(
                    Diagnostic::error(ErrorCode::E1005)
                        .with_message(format!("invalid {section} name \"{name}\""))
                        .at(&decl_pos),
                );
                continue;
            }
            let Json::Object(decl) = decl else {
                self.error(malformed_form(&decl_pos, name, "an object with \"type\" and \"init\""));
                continue;
            };
            for key in decl.keys() {
                if !matches!(key.as_str(), "type" | "init" | "shared") {
                    self.error(
                        Diagnostic::error(ErrorCode::E1005)
                            .with_message(format!("unexpected field \"{key}\" in {section} entry"))
                            .at(&decl_pos.key(key)),
                    );
                }
            }
            out.push((Name::new(name), decl, decl_pos));
        }
        out
    }

    fn shared_flag(&mut self, decl: &serde_json::Map<String, Json>, pos: &Pos) -> bool {
        match decl.get("shared") {
            None => false,
            Some(Json::Bool(b)) => *b,
            Some(_) => {
                self.error(malformed_form(&pos.key("shared"), "shared", "a boolean"));
                false
            }
        }
    }

    fn options(&mut self, json: Option<&Json>, pos: &Pos) -> Vec<OptionEntry> {
        match json {
            None => Vec::new(),
            Some(Json::Object(obj)) => obj
                .iter()
                .map(|(key, value)| OptionEntry {
                    key: key.clone(),
                    value: value.clone(),
                    pos: pos.key(key),
                })
                .collect(),
            Some(_) => {
                self.error(malformed_form(pos, "options", "an object"));
                Vec::new()
            }
        }
    }
}
