#![allow(clippy::unwrap_used, reason = "Tests can panic")]

use pretty_assertions::assert_eq;

use super::*;

fn plus() -> SignatureSet {
    SignatureSet::single(Sig::new(
        vec![("x", Pattern::numeric("A")), ("y", Pattern::numeric("A"))],
        Pattern::numeric("A"),
    ))
}

#[test]
fn test_numeric_wildcard_widens() {
    let resolved = plus().resolve(&[Type::Int, Type::Double]).unwrap();
    assert_eq!(resolved.params, vec![Type::Double, Type::Double]);
    assert_eq!(resolved.ret, Type::Double);

    let resolved = plus().resolve(&[Type::Int, Type::Int]).unwrap();
    assert_eq!(resolved.ret, Type::Int);
}

#[test]
fn test_allowed_set_rejects_strings() {
    assert_eq!(plus().resolve(&[Type::String, Type::String]), None);
}

#[test]
fn test_consistent_binding() {
    let eq = SignatureSet::single(Sig::new(
        vec![("x", Pattern::wild("A")), ("y", Pattern::wild("A"))],
        Pattern::boolean(),
    ));
    assert!(eq.resolve(&[Type::String, Type::String]).is_some());
    assert_eq!(eq.resolve(&[Type::String, Type::Int]), None);
}

#[test]
fn test_first_match_wins() {
    let f = SignatureSet::new(vec![
        Sig::new(vec![("x", Pattern::double())], Pattern::double()),
        Sig::new(vec![("x", Pattern::int())], Pattern::int()),
    ]);
    // Both alternatives accept an int; the first declared one is chosen.
    let resolved = f.resolve(&[Type::Int]).unwrap();
    assert_eq!(resolved.index, 0);
    assert_eq!(resolved.ret, Type::Double);
}

#[test]
fn test_int_or_long_rejects_float() {
    let f = SignatureSet::new(vec![
        Sig::new(vec![("x", Pattern::int())], Pattern::int()),
        Sig::new(vec![("x", Pattern::long())], Pattern::long()),
    ]);
    assert_eq!(f.resolve(&[Type::Float]), None);
    assert_eq!(f.resolve(&[Type::Long]).unwrap().index, 1);
}

#[test]
fn test_resolution_is_deterministic() {
    let f = SignatureSet::new(vec![
        Sig::new(vec![("a", Pattern::array(Pattern::wild("A")))], Pattern::wild("A")),
        Sig::new(vec![("m", Pattern::map(Pattern::wild("A")))], Pattern::wild("A")),
    ]);
    let args = [Type::map(Type::String)];
    let first = f.resolve(&args);
    for _ in 0..16 {
        assert_eq!(f.resolve(&args), first);
    }
    assert_eq!(first.unwrap().index, 1);
}

#[test]
fn test_union_leftover_binding() {
    let error_on_null = SignatureSet::single(Sig::new(
        vec![("x", Pattern::union(vec![Pattern::wild("A"), Pattern::null()]))],
        Pattern::wild("A"),
    ));
    let resolved = error_on_null.resolve(&[Type::nullable(Type::Int)]).unwrap();
    assert_eq!(resolved.ret, Type::Int);
    assert_eq!(resolved.params, vec![Type::nullable(Type::Int)]);

    let wide = Type::union_of(vec![Type::Int, Type::String, Type::Null]).unwrap();
    let resolved = error_on_null.resolve(&[wide]).unwrap();
    assert_eq!(resolved.ret, Type::union_of(vec![Type::Int, Type::String]).unwrap());
}

#[test]
fn test_function_pattern_binding() {
    let map = SignatureSet::single(Sig::new(
        vec![
            ("a", Pattern::array(Pattern::wild("A"))),
            ("fcn", Pattern::fcn(vec![Pattern::wild("A")], Pattern::wild("B"))),
        ],
        Pattern::array(Pattern::wild("B")),
    ));
    let resolved = map
        .resolve(&[Type::array(Type::Int), Type::fcn(vec![Type::Int], Type::String)])
        .unwrap();
    assert_eq!(resolved.ret, Type::array(Type::String));

    // A function that only takes ints cannot be mapped over doubles.
    assert_eq!(
        map.resolve(&[Type::array(Type::Double), Type::fcn(vec![Type::Int], Type::String)]),
        None
    );
}

#[test]
fn test_wild_record_requires_fields() {
    let f = SignatureSet::single(Sig::new(
        vec![("r", Pattern::wild_record("R", vec![("x", Pattern::double())]))],
        Pattern::wild_record("R", vec![]),
    ));
    let with_x = Type::record("P", vec![("x", Type::Int), ("y", Type::String)]);
    let without_x = Type::record("Q", vec![("y", Type::String)]);
    assert_eq!(f.resolve(std::slice::from_ref(&with_x)).unwrap().ret, with_x);
    assert_eq!(f.resolve(&[without_x]), None);
}

#[test]
fn test_arity_mismatch() {
    assert_eq!(plus().resolve(&[Type::Int]), None);
}

#[test]
fn test_monomorphic() {
    let sqrt = SignatureSet::single(Sig::new(vec![("x", Pattern::double())], Pattern::double()));
    assert_eq!(sqrt.monomorphic(), Some((vec![Type::Double], Type::Double)));
    assert_eq!(plus().monomorphic(), None);
}

#[test]
fn test_signature_display() {
    assert_eq!(
        plus().alternatives()[0].to_string(),
        concat!(
            "(x: any A of {int, long, float, double}, ",
            "y: any A of {int, long, float, double}) ",
            "-> any A of {int, long, float, double}"
        )
    );
}
