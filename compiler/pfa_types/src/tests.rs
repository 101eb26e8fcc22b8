//! Property tests for the compatibility relation and the schema codec.

#![allow(clippy::unwrap_used, clippy::expect_used, reason = "Tests can panic")]

use proptest::prelude::*;

use crate::schema::to_json;
use crate::{NameGenerator, SchemaParser, Type, TypeRegistry};

fn primitive() -> impl Strategy<Value = Type> {
    prop_oneof![
        Just(Type::Null),
        Just(Type::Boolean),
        Just(Type::Int),
        Just(Type::Long),
        Just(Type::Float),
        Just(Type::Double),
        Just(Type::Bytes),
        Just(Type::String),
    ]
}

/// Concrete types without named definitions (so any two generated types can
/// coexist in one registry).
fn concrete() -> impl Strategy<Value = Type> {
    primitive().prop_recursive(3, 16, 4, |inner| {
        prop_oneof![
            inner.clone().prop_map(Type::array),
            inner.clone().prop_map(Type::map),
            (inner.clone(), primitive()).prop_filter_map("valid union", |(a, b)| {
                Type::union_of(vec![a, b]).ok()
            }),
        ]
    })
}

const WIDENING: [Type; 4] = [Type::Int, Type::Long, Type::Float, Type::Double];

proptest! {
    #[test]
    fn accepts_is_reflexive(ty in concrete()) {
        prop_assert!(ty.accepts(&ty));
    }

    #[test]
    fn widening_holds_one_way(i in 0usize..4, j in 0usize..4) {
        let (narrow, wide) = (&WIDENING[i.min(j)], &WIDENING[i.max(j)]);
        prop_assert!(wide.accepts(narrow));
        if i != j {
            prop_assert!(!narrow.accepts(wide));
        }
    }

    #[test]
    fn widening_lifts_through_arrays(i in 0usize..4, j in 0usize..4) {
        let (narrow, wide) = (&WIDENING[i.min(j)], &WIDENING[i.max(j)]);
        prop_assert!(Type::array(wide.clone()).accepts(&Type::array(narrow.clone())));
    }

    #[test]
    fn lub_accepts_both_sides(a in concrete(), b in concrete()) {
        if let Ok(lub) = a.lub(&b) {
            prop_assert!(lub.accepts(&a));
            prop_assert!(lub.accepts(&b));
        }
    }

    #[test]
    fn schema_round_trip(ty in concrete()) {
        let mut registry = TypeRegistry::new();
        let mut names = NameGenerator::new();
        let reparsed = SchemaParser::new(&mut registry, &mut names)
            .parse(&to_json(&ty), &pfa_ir::Pos::root())
            .unwrap();
        prop_assert_eq!(reparsed, ty);
    }
}
