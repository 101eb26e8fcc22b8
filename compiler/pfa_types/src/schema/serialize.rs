use rustc_hash::FxHashSet;
use serde_json::{json, Value as Json};

use crate::Type;

/// Serialize a type to Avro-JSON.
///
/// Each named type is written in full at its first occurrence and as a
/// name reference afterwards, so the output parses back to the same type.
pub fn to_json(ty: &Type) -> Json {
    let mut defined = FxHashSet::default();
    write(ty, &mut defined)
}

fn write(ty: &Type, defined: &mut FxHashSet<String>) -> Json {
    match ty {
        Type::Array(items) => json!({"type": "array", "items": write(items, defined)}),
        Type::Map(values) => json!({"type": "map", "values": write(values, defined)}),
        Type::Union(members) => Json::Array(members.iter().map(|m| write(m, defined)).collect()),
        Type::Fcn(fcn) => json!({
            "type": "function",
            "params": fcn.params.iter().map(|p| write(p, defined)).collect::<Vec<_>>(),
            "ret": write(&fcn.ret, defined),
        }),
        Type::Fixed(fixed) => {
            if !defined.insert(fixed.name.clone()) {
                return Json::String(fixed.name.clone());
            }
            json!({"type": "fixed", "name": fixed.name, "size": fixed.size})
        }
        Type::Enum(e) => {
            if !defined.insert(e.name.clone()) {
                return Json::String(e.name.clone());
            }
            json!({"type": "enum", "name": e.name, "symbols": e.symbols})
        }
        Type::Record(record) => {
            if !defined.insert(record.name.clone()) {
                return Json::String(record.name.clone());
            }
            let fields: Vec<Json> = record
                .fields
                .iter()
                .map(|f| {
                    let mut field = serde_json::Map::new();
                    field.insert("name".to_string(), Json::String(f.name.clone()));
                    field.insert("type".to_string(), write(&f.ty, defined));
                    if let Some(default) = &f.default {
                        field.insert("default".to_string(), default.clone());
                    }
                    Json::Object(field)
                })
                .collect();
            json!({"type": "record", "name": record.name, "fields": fields})
        }
        primitive => Json::String(primitive.branch_name().to_string()),
    }
}
