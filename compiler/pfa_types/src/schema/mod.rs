//! Avro-JSON schema codec.
//!
//! [`SchemaParser`] turns the JSON form of a type into a [`Type`], recording
//! named types in a [`TypeRegistry`] so later declarations can refer to them
//! by name. Anonymous records, enums and fixed types get names from a
//! [`NameGenerator`] owned by the compiling context.
//!
//! [`to_json`] goes the other way, writing each named definition in full the
//! first time it appears and by name afterwards.

mod serialize;

pub use serialize::to_json;

use std::sync::Arc;

use pfa_diagnostic::{Diagnostic, ErrorCode};
use pfa_ir::Pos;
use rustc_hash::{FxHashMap, FxHashSet};
use serde_json::Value as Json;

use crate::{EnumType, Field, FixedType, RecordType, Type};

/// Named types defined so far in one document.
#[derive(Clone, Debug, Default)]
pub struct TypeRegistry {
    named: FxHashMap<String, Type>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a named type by full name.
    pub fn get(&self, full_name: &str) -> Option<&Type> {
        self.named.get(full_name)
    }

    pub fn contains(&self, full_name: &str) -> bool {
        self.named.contains_key(full_name)
    }

    pub fn len(&self) -> usize {
        self.named.len()
    }

    pub fn is_empty(&self) -> bool {
        self.named.is_empty()
    }

    fn define(&mut self, ty: Type) {
        if let Some(name) = ty.type_name() {
            self.named.insert(name.to_string(), ty.clone());
        }
    }
}

/// Source of fresh names for anonymous named types.
///
/// One generator per compilation; names never collide with a type already
/// in the registry.
#[derive(Clone, Debug, Default)]
pub struct NameGenerator {
    counters: FxHashMap<&'static str, u32>,
}

impl NameGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Next unused name with the given prefix (`Record1`, `Record2`, ...).
    pub fn fresh(&mut self, prefix: &'static str, registry: &TypeRegistry) -> String {
        let counter = self.counters.entry(prefix).or_insert(0);
        loop {
            *counter += 1;
            let candidate = format!("{prefix}{counter}");
            if !registry.contains(&candidate) {
                return candidate;
            }
        }
    }
}

const PRIMITIVES: [&str; 8] = [
    "null", "boolean", "int", "long", "float", "double", "bytes", "string",
];

fn primitive(name: &str) -> Option<Type> {
    Some(match name {
        "null" => Type::Null,
        "boolean" => Type::Boolean,
        "int" => Type::Int,
        "long" => Type::Long,
        "float" => Type::Float,
        "double" => Type::Double,
        "bytes" => Type::Bytes,
        "string" => Type::String,
        _ => return None,
    })
}

/// Valid Avro name: `[A-Za-z_][A-Za-z0-9_]*`.
pub fn is_valid_name(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Parser for Avro-JSON type declarations.
pub struct SchemaParser<'a> {
    registry: &'a mut TypeRegistry,
    names: &'a mut NameGenerator,
    /// Named types whose definition is still being parsed.
    in_progress: FxHashSet<String>,
}

impl<'a> SchemaParser<'a> {
    pub fn new(registry: &'a mut TypeRegistry, names: &'a mut NameGenerator) -> Self {
        SchemaParser {
            registry,
            names,
            in_progress: FxHashSet::default(),
        }
    }

    /// Parse a data type (no function types anywhere).
    pub fn parse(&mut self, json: &Json, pos: &Pos) -> Result<Type, Diagnostic> {
        self.parse_in(json, pos, None, false)
    }

    /// Parse a function parameter type, where a top-level
    /// `{"type": "function", "params": [...], "ret": T}` is also allowed.
    pub fn parse_param(&mut self, json: &Json, pos: &Pos) -> Result<Type, Diagnostic> {
        self.parse_in(json, pos, None, true)
    }

    fn parse_in(
        &mut self,
        json: &Json,
        pos: &Pos,
        namespace: Option<&str>,
        fcn_ok: bool,
    ) -> Result<Type, Diagnostic> {
        match json {
            Json::String(name) => self.named_ref(name, pos, namespace),
            Json::Array(members) => {
                let mut types = Vec::with_capacity(members.len());
                for (i, m) in members.iter().enumerate() {
                    types.push(self.parse_in(m, &pos.index(i), namespace, false)?);
                }
                Type::union_of(types).map_err(|reason| {
                    Diagnostic::error(ErrorCode::E2004)
                        .with_message(reason)
                        .at(pos)
                })
            }
            Json::Object(obj) => {
                let Some(Json::String(kind)) = obj.get("type") else {
                    return match obj.get("type") {
                        Some(inner) => self.parse_in(inner, &pos.key("type"), namespace, fcn_ok),
                        None => Err(malformed(pos, "type declaration needs a \"type\" field")),
                    };
                };
                match kind.as_str() {
                    "array" => {
                        let items = required(obj, "items", pos)?;
                        Ok(Type::array(self.parse_in(items, &pos.key("items"), namespace, false)?))
                    }
                    "map" => {
                        let values = required(obj, "values", pos)?;
                        Ok(Type::map(self.parse_in(values, &pos.key("values"), namespace, false)?))
                    }
                    "record" => self.record(obj, pos, namespace),
                    "enum" => self.enumeration(obj, pos, namespace),
                    "fixed" => self.fixed(obj, pos, namespace),
                    "function" => {
                        if !fcn_ok {
                            return Err(Diagnostic::error(ErrorCode::E2007)
                                .with_message("function types are only allowed as parameter types")
                                .at(pos));
                        }
                        self.function(obj, pos, namespace)
                    }
                    other => self.named_ref(other, pos, namespace),
                }
            }
            _ => Err(malformed(pos, "a type must be a string, array or object")),
        }
    }

    fn named_ref(
        &self,
        name: &str,
        pos: &Pos,
        namespace: Option<&str>,
    ) -> Result<Type, Diagnostic> {
        if let Some(ty) = primitive(name) {
            return Ok(ty);
        }
        let full = full_name(name, namespace);
        for candidate in [full.as_str(), name] {
            if self.in_progress.contains(candidate) {
                return Err(Diagnostic::error(ErrorCode::E2005)
                    .with_message(format!("recursive type \"{candidate}\" is not supported"))
                    .at(pos));
            }
            if let Some(ty) = self.registry.get(candidate) {
                return Ok(ty.clone());
            }
        }
        Err(Diagnostic::error(ErrorCode::E2002)
            .with_message(format!("unknown type \"{name}\""))
            .at(pos)
            .with_note(format!("primitive types are: {}", PRIMITIVES.join(", "))))
    }

    /// Resolve the `name`/`namespace` of a named-type declaration.
    fn declared_name(
        &mut self,
        obj: &serde_json::Map<String, Json>,
        pos: &Pos,
        namespace: Option<&str>,
        prefix: &'static str,
    ) -> Result<(String, Option<String>), Diagnostic> {
        let ns = match obj.get("namespace") {
            Some(Json::String(ns)) if !ns.is_empty() => Some(ns.clone()),
            Some(Json::String(_)) | None => namespace.map(str::to_string),
            Some(_) => return Err(malformed(&pos.key("namespace"), "namespace must be a string")),
        };
        let full = match obj.get("name") {
            Some(Json::String(name)) => {
                let short = name.rsplit('.').next().unwrap_or(name);
                if !is_valid_name(short) {
                    return Err(Diagnostic::error(ErrorCode::E2006)
                        .with_message(format!("invalid type name \"{name}\""))
                        .at(&pos.key("name")));
                }
                full_name(name, ns.as_deref())
            }
            Some(_) => return Err(malformed(&pos.key("name"), "name must be a string")),
            None => full_name(&self.names.fresh(prefix, self.registry), ns.as_deref()),
        };
        if self.registry.contains(&full) || self.in_progress.contains(&full) {
            return Err(Diagnostic::error(ErrorCode::E2003)
                .with_message(format!("type \"{full}\" is already defined"))
                .at(pos));
        }
        // Nested names default to the enclosing type's namespace.
        let inner_ns = match full.rfind('.') {
            Some(dot) => Some(full[..dot].to_string()),
            None => ns,
        };
        Ok((full, inner_ns))
    }

    fn record(
        &mut self,
        obj: &serde_json::Map<String, Json>,
        pos: &Pos,
        namespace: Option<&str>,
    ) -> Result<Type, Diagnostic> {
        let (name, inner_ns) = self.declared_name(obj, pos, namespace, "Record")?;
        let Json::Array(raw_fields) = required(obj, "fields", pos)? else {
            return Err(malformed(&pos.key("fields"), "record fields must be an array"));
        };
        self.in_progress.insert(name.clone());
        let mut fields: Vec<Field> = Vec::with_capacity(raw_fields.len());
        for (i, raw) in raw_fields.iter().enumerate() {
            let field_pos = pos.key("fields").index(i);
            let Json::Object(field) = raw else {
                return Err(malformed(&field_pos, "a record field must be an object"));
            };
            let Some(Json::String(field_name)) = field.get("name") else {
                return Err(malformed(&field_pos, "a record field needs a string \"name\""));
            };
            if !is_valid_name(field_name) {
                return Err(Diagnostic::error(ErrorCode::E2006)
                    .with_message(format!("invalid field name \"{field_name}\""))
                    .at(&field_pos));
            }
            if fields.iter().any(|f| &f.name == field_name) {
                return Err(Diagnostic::error(ErrorCode::E2006)
                    .with_message(format!("duplicate field \"{field_name}\" in record {name}"))
                    .at(&field_pos));
            }
            let ty_json = required(field, "type", &field_pos)?;
            let ty = self.parse_in(ty_json, &field_pos.key("type"), inner_ns.as_deref(), false)?;
            fields.push(Field {
                name: field_name.clone(),
                ty,
                default: field.get("default").cloned(),
            });
        }
        self.in_progress.remove(&name);
        let ty = Type::Record(Arc::new(RecordType { name, fields }));
        self.registry.define(ty.clone());
        Ok(ty)
    }

    fn enumeration(
        &mut self,
        obj: &serde_json::Map<String, Json>,
        pos: &Pos,
        namespace: Option<&str>,
    ) -> Result<Type, Diagnostic> {
        let (name, _) = self.declared_name(obj, pos, namespace, "Enum")?;
        let Json::Array(raw) = required(obj, "symbols", pos)? else {
            return Err(malformed(&pos.key("symbols"), "enum symbols must be an array"));
        };
        let mut symbols: Vec<String> = Vec::with_capacity(raw.len());
        for (i, s) in raw.iter().enumerate() {
            match s {
                Json::String(s) if is_valid_name(s) && !symbols.contains(s) => {
                    symbols.push(s.clone());
                }
                _ => {
                    return Err(Diagnostic::error(ErrorCode::E2006)
                        .with_message(format!("invalid or duplicate enum symbol {s}"))
                        .at(&pos.key("symbols").index(i)))
                }
            }
        }
        if symbols.is_empty() {
            return Err(malformed(&pos.key("symbols"), "an enum needs at least one symbol"));
        }
        let ty = Type::Enum(Arc::new(EnumType { name, symbols }));
        self.registry.define(ty.clone());
        Ok(ty)
    }

    fn fixed(
        &mut self,
        obj: &serde_json::Map<String, Json>,
        pos: &Pos,
        namespace: Option<&str>,
    ) -> Result<Type, Diagnostic> {
        let (name, _) = self.declared_name(obj, pos, namespace, "Fixed")?;
        let size = required(obj, "size", pos)?
            .as_u64()
            .and_then(|n| usize::try_from(n).ok())
            .ok_or_else(|| {
                malformed(&pos.key("size"), "fixed size must be a non-negative integer")
            })?;
        let ty = Type::Fixed(Arc::new(FixedType { name, size }));
        self.registry.define(ty.clone());
        Ok(ty)
    }

    fn function(
        &mut self,
        obj: &serde_json::Map<String, Json>,
        pos: &Pos,
        namespace: Option<&str>,
    ) -> Result<Type, Diagnostic> {
        let Json::Array(raw_params) = required(obj, "params", pos)? else {
            return Err(malformed(&pos.key("params"), "function params must be an array"));
        };
        let mut params = Vec::with_capacity(raw_params.len());
        for (i, p) in raw_params.iter().enumerate() {
            params.push(self.parse_in(p, &pos.key("params").index(i), namespace, false)?);
        }
        let ret = self.parse_in(required(obj, "ret", pos)?, &pos.key("ret"), namespace, false)?;
        Ok(Type::fcn(params, ret))
    }
}

fn full_name(name: &str, namespace: Option<&str>) -> String {
    match namespace {
        Some(ns) if !name.contains('.') => format!("{ns}.{name}"),
        _ => name.to_string(),
    }
}

fn required<'j>(
    obj: &'j serde_json::Map<String, Json>,
    key: &str,
    pos: &Pos,
) -> Result<&'j Json, Diagnostic> {
    obj.get(key).ok_or_else(|| {
        Diagnostic::error(ErrorCode::E2001)
            .with_message(format!("type declaration is missing \"{key}\""))
            .at(pos)
    })
}

fn malformed(pos: &Pos, message: &str) -> Diagnostic {
    Diagnostic::error(ErrorCode::E2001)
        .with_message(message.to_string())
        .at(pos)
}
