//! Avro-JSON value codec.
//!
//! - unions: `null`, or `{"<branch name>": value}`
//! - bytes and fixed: strings whose code points are the byte values
//! - enums: the symbol string
//! - records: objects; a missing field takes its default, else `null` when
//!   the field type is nullable
//! - non-finite floats: the strings `"NaN"`, `"Infinity"`, `"-Infinity"`

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use pfa_types::Type;
use serde_json::{Map, Number, Value as Json};

use crate::{conforms, Value};

/// A value that does not fit its type, with the path to the offending part.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CodecError {
    pub path: String,
    pub message: String,
}

impl CodecError {
    fn new(path: &str, message: impl fmt::Display) -> Self {
        CodecError {
            path: path.to_string(),
            message: message.to_string(),
        }
    }
}

/// Decode `json` as a value of type `ty`.
pub fn decode(json: &Json, ty: &Type) -> Result<Value, CodecError> {
    decode_at(json, ty, &mut String::new())
}

/// Encode a value of type `ty`.
pub fn encode(value: &Value, ty: &Type) -> Result<Json, CodecError> {
    encode_at(value, ty, &mut String::new())
}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            write!(f, "{}", self.message)
        } else {
            write!(f, "{} at {}", self.message, self.path)
        }
    }
}

impl std::error::Error for CodecError {}

// ============================================================================
// Decoding
// ============================================================================

fn decode_at(json: &Json, ty: &Type, path: &mut String) -> Result<Value, CodecError> {
    match ty {
        Type::Null => json.is_null().then_some(Value::Null).ok_or_else(|| mismatch(path, ty, json)),
        Type::Boolean => json.as_bool().map(Value::Boolean).ok_or_else(|| mismatch(path, ty, json)),
        Type::Int => json
            .as_i64()
            .and_then(|n| i32::try_from(n).ok())
            .map(Value::Int)
            .ok_or_else(|| mismatch(path, ty, json)),
        Type::Long => json.as_i64().map(Value::Long).ok_or_else(|| mismatch(path, ty, json)),
        #[allow(
            clippy::cast_possible_truncation,
            reason = "float is a narrowing of the JSON number"
        )]
        Type::Float => float(json)
            .map(|x| Value::Float(x as f32))
            .ok_or_else(|| mismatch(path, ty, json)),
        Type::Double => float(json).map(Value::Double).ok_or_else(|| mismatch(path, ty, json)),
        Type::String => json.as_str().map(Value::string).ok_or_else(|| mismatch(path, ty, json)),
        Type::Bytes => {
            let s = json.as_str().ok_or_else(|| mismatch(path, ty, json))?;
            Ok(Value::Bytes(Arc::from(code_points(s, path)?)))
        }
        Type::Fixed(fixed) => {
            let s = json.as_str().ok_or_else(|| mismatch(path, ty, json))?;
            let bytes = code_points(s, path)?;
            if bytes.len() != fixed.size {
                return Err(CodecError::new(
                    path,
                    format_args!(
                        "{} needs {} bytes, found {}",
                        fixed.name,
                        fixed.size,
                        bytes.len()
                    ),
                ));
            }
            Ok(Value::Fixed {
                ty: Arc::clone(fixed),
                bytes: Arc::from(bytes),
            })
        }
        Type::Enum(e) => {
            let s = json.as_str().ok_or_else(|| mismatch(path, ty, json))?;
            Value::enum_symbol(e, s).ok_or_else(|| {
                CodecError::new(path, format_args!("{s:?} is not a symbol of {}", e.name))
            })
        }
        Type::Array(item_ty) => {
            let items = json.as_array().ok_or_else(|| mismatch(path, ty, json))?;
            let mut out = Vec::with_capacity(items.len());
            for (i, item) in items.iter().enumerate() {
                let len = path.len();
                path.push_str(&format!("[{i}]"));
                out.push(decode_at(item, item_ty, path)?);
                path.truncate(len);
            }
            Ok(Value::array(out))
        }
        Type::Map(value_ty) => {
            let entries = json.as_object().ok_or_else(|| mismatch(path, ty, json))?;
            let mut out = IndexMap::with_capacity(entries.len());
            for (k, v) in entries {
                let len = path.len();
                push_key(path, k);
                out.insert(k.clone(), decode_at(v, value_ty, path)?);
                path.truncate(len);
            }
            Ok(Value::map(out))
        }
        Type::Record(rec) => {
            let obj = json.as_object().ok_or_else(|| mismatch(path, ty, json))?;
            if let Some(extra) = obj.keys().find(|k| rec.field(k).is_none()) {
                return Err(CodecError::new(
                    path,
                    format_args!("{} has no field {extra:?}", rec.name),
                ));
            }
            let mut fields = Vec::with_capacity(rec.fields.len());
            for field in &rec.fields {
                let len = path.len();
                push_key(path, &field.name);
                let value = match (obj.get(&field.name), &field.default) {
                    (Some(v), _) | (None, Some(v)) => decode_at(v, &field.ty, path)?,
                    (None, None) if field.ty.is_nullable() => Value::Null,
                    (None, None) => {
                        return Err(CodecError::new(path, "missing required field"));
                    }
                };
                path.truncate(len);
                fields.push(value);
            }
            Ok(Value::record(Arc::clone(rec), fields))
        }
        Type::Union(members) => {
            if json.is_null() && members.contains(&Type::Null) {
                return Ok(Value::Null);
            }
            let tagged = json.as_object().filter(|o| o.len() == 1);
            let Some((branch, inner)) = tagged.and_then(|o| o.iter().next()) else {
                return Err(CodecError::new(
                    path,
                    format_args!("expected a tagged value of {ty}, found {}", kind(json)),
                ));
            };
            let member = members
                .iter()
                .find(|m| m.branch_name() == branch)
                .ok_or_else(|| {
                    CodecError::new(path, format_args!("{branch:?} is not a member of {ty}"))
                })?;
            let len = path.len();
            push_key(path, branch);
            let value = decode_at(inner, member, path)?;
            path.truncate(len);
            Ok(value)
        }
        Type::Fcn(_) => Err(CodecError::new(path, "functions have no JSON form")),
    }
}

fn mismatch(path: &str, ty: &Type, json: &Json) -> CodecError {
    CodecError::new(path, format_args!("expected {ty}, found {}", kind(json)))
}

fn float(json: &Json) -> Option<f64> {
    match json {
        Json::Number(n) => n.as_f64(),
        Json::String(s) => match s.as_str() {
            "NaN" => Some(f64::NAN),
            "Infinity" => Some(f64::INFINITY),
            "-Infinity" => Some(f64::NEG_INFINITY),
            _ => None,
        },
        _ => None,
    }
}

fn code_points(s: &str, path: &str) -> Result<Vec<u8>, CodecError> {
    s.chars()
        .map(|c| {
            u8::try_from(u32::from(c))
                .map_err(|_| CodecError::new(path, format_args!("code point {c:?} is not a byte")))
        })
        .collect()
}

fn push_key(path: &mut String, key: &str) {
    path.push_str(&format!("[{key:?}]"));
}

fn kind(json: &Json) -> &'static str {
    match json {
        Json::Null => "null",
        Json::Bool(_) => "boolean",
        Json::Number(_) => "number",
        Json::String(_) => "string",
        Json::Array(_) => "array",
        Json::Object(_) => "object",
    }
}

// ============================================================================
// Encoding
// ============================================================================

fn encode_at(value: &Value, ty: &Type, path: &mut String) -> Result<Json, CodecError> {
    Ok(match (value, ty) {
        (_, Type::Union(members)) => {
            if value.is_null() {
                return Ok(Json::Null);
            }
            let member = members
                .iter()
                .find(|m| conforms(value, m))
                .ok_or_else(|| {
                    CodecError::new(
                        path,
                        format_args!("{} is not a member of {ty}", value.kind_name()),
                    )
                })?;
            let mut obj = Map::with_capacity(1);
            obj.insert(member.branch_name().to_string(), encode_at(value, member, path)?);
            Json::Object(obj)
        }
        (Value::Null, Type::Null) => Json::Null,
        (Value::Boolean(b), Type::Boolean) => Json::Bool(*b),
        (Value::Int(i), Type::Int) => Json::from(*i),
        (Value::Long(l), Type::Long) => Json::from(*l),
        (Value::Float(x), Type::Float) => encode_float(f64::from(*x)),
        (Value::Double(x), Type::Double) => encode_float(*x),
        (Value::String(s), Type::String) => Json::String(s.to_string()),
        (Value::Bytes(b), Type::Bytes) | (Value::Fixed { bytes: b, .. }, Type::Fixed(_)) => {
            Json::String(b.iter().map(|&byte| char::from(byte)).collect())
        }
        (Value::Enum { ty: e, index }, Type::Enum(_)) => Json::String(
            e.symbols
                .get(*index)
                .cloned()
                .ok_or_else(|| CodecError::new(path, "enum index out of range"))?,
        ),
        (Value::Array(items), Type::Array(item_ty)) => {
            let mut out = Vec::with_capacity(items.len());
            for (i, item) in items.iter().enumerate() {
                let len = path.len();
                path.push_str(&format!("[{i}]"));
                out.push(encode_at(item, item_ty, path)?);
                path.truncate(len);
            }
            Json::Array(out)
        }
        (Value::Map(entries), Type::Map(value_ty)) => {
            let mut out = Map::with_capacity(entries.len());
            for (k, v) in entries.iter() {
                let len = path.len();
                push_key(path, k);
                out.insert(k.clone(), encode_at(v, value_ty, path)?);
                path.truncate(len);
            }
            Json::Object(out)
        }
        (Value::Record { ty: rec, fields }, Type::Record(_)) => {
            let mut out = Map::with_capacity(fields.len());
            for (field, v) in rec.fields.iter().zip(fields.iter()) {
                let len = path.len();
                push_key(path, &field.name);
                out.insert(field.name.clone(), encode_at(v, &field.ty, path)?);
                path.truncate(len);
            }
            Json::Object(out)
        }
        _ => {
            return Err(CodecError::new(
                path,
                format_args!("cannot encode {} as {ty}", value.kind_name()),
            ));
        }
    })
}

fn encode_float(x: f64) -> Json {
    match Number::from_f64(x) {
        Some(n) => Json::Number(n),
        None if x.is_nan() => Json::String("NaN".to_string()),
        None if x > 0.0 => Json::String("Infinity".to_string()),
        None => Json::String("-Infinity".to_string()),
    }
}

#[cfg(test)]
mod tests;
