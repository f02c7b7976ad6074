mod common;

use attrgate::{
    AttrError, AttributeDatabase, NodeKind, Predicate, Quantifier, QueryNode, Value, ValueKind,
};

fn eq(key: &str, value: i64) -> Predicate {
    Predicate::equal(key, value, Quantifier::Any)
}

#[test]
fn debug_level_gate_follows_replace() {
    let mut db = AttributeDatabase::new();
    db.add("level", 3);
    let _gate = db
        .push(QueryNode::when(Predicate::greater_or_equal("level", 2, Quantifier::Any)))
        .unwrap();
    assert!(db.query().unwrap());

    db.replace("level", 1);
    assert!(!db.query().unwrap());
}

#[test]
fn range_upper_bound_is_exclusive() {
    let mut db = AttributeDatabase::new();
    let temp = Predicate::range("temp", 10.0, 20.0, Quantifier::Any).unwrap();

    db.replace("temp", 19.999);
    assert!(temp.apply(db.attributes()).unwrap());

    db.replace("temp", 20.0);
    assert!(!temp.apply(db.attributes()).unwrap());
}

#[test]
fn quantifiers_over_multi_valued_key() {
    let mut db = AttributeDatabase::new();
    db.add("x", 1);
    db.add("x", 2);
    db.add("x", 3);
    let attrs = db.attributes();

    assert!(Predicate::less_than("x", 5, Quantifier::Any).apply(attrs).unwrap());
    assert!(Predicate::less_than("x", 5, Quantifier::All).apply(attrs).unwrap());
    assert!(Predicate::less_than("x", 2, Quantifier::Any).apply(attrs).unwrap());
    assert!(!Predicate::less_than("x", 2, Quantifier::All).apply(attrs).unwrap());
}

#[test]
fn empty_chain_emits() {
    let mut db = AttributeDatabase::new();
    assert!(db.query().unwrap());
    assert_eq!(db.depth(), 0);
}

// {And a=1 {If b=2 {And c=3 {Or d=4}}}}
#[test]
fn nested_formula_follows_scope_structure() {
    let mut db = AttributeDatabase::new();
    db.add("a", 1);
    db.add("b", 2);
    db.add("c", 0);
    db.add("d", 0);

    let mut outer = db.scope(QueryNode::and(eq("a", 1))).unwrap();
    // a = 1 AND True
    assert!(outer.query().unwrap());

    let mut when_b = outer.scope(QueryNode::when(eq("b", 2))).unwrap();
    // b = 2
    when_b.replace("a", 0);
    assert!(when_b.query().unwrap());

    let mut and_c = when_b.scope(QueryNode::and(eq("c", 3))).unwrap();
    // c = 3 AND b = 2
    assert!(!and_c.query().unwrap());
    and_c.replace("c", 3);
    assert!(and_c.query().unwrap());

    let mut or_d = and_c.scope(QueryNode::or(eq("d", 4))).unwrap();
    // d = 4 OR (c = 3 AND b = 2)
    assert!(or_d.query().unwrap());
    or_d.replace("b", 0);
    assert!(!or_d.query().unwrap());
    or_d.replace("d", 4);
    assert!(or_d.query().unwrap());
    assert_eq!(
        or_d.describe_query(),
        "(d == 4 [any]) or ((c == 3 [any]) and (b == 2 [any]))"
    );

    drop(or_d);
    drop(and_c);
    drop(when_b);
    // back to a = 1 AND True, with a now 0
    assert!(!outer.query().unwrap());
    drop(outer);
    assert!(db.query().unwrap());
}

#[test]
fn if_never_consults_predecessor() {
    let mut db = AttributeDatabase::new();
    db.add("level", "high");
    // The predecessor would fail with a type mismatch if it were evaluated.
    let _bad = db
        .push(QueryNode::and(Predicate::greater_than("level", 1, Quantifier::Any)))
        .unwrap();
    assert!(db.query().is_err());

    let _if = db.push(QueryNode::when(Predicate::equal("level", "high", Quantifier::Any))).unwrap();
    assert!(db.query().unwrap());
}

#[test]
fn and_short_circuits_predecessor() {
    let mut db = AttributeDatabase::new();
    db.add("level", "high");
    let _bad = db
        .push(QueryNode::and(Predicate::greater_than("level", 1, Quantifier::Any)))
        .unwrap();
    let _and = db.push(QueryNode::and(eq("missing", 1))).unwrap();
    assert!(!db.query().unwrap());
}

#[test]
fn type_mismatch_is_reported_not_defaulted() {
    let mut db = AttributeDatabase::new();
    db.add("level", 2.5);
    let _gate = db
        .push(QueryNode::when(Predicate::greater_or_equal("level", 2, Quantifier::Any)))
        .unwrap();
    assert_eq!(
        db.query(),
        Err(AttrError::type_mismatch(ValueKind::Integer, ValueKind::Float))
    );
}

#[test]
fn set_semantics() {
    let mut db = AttributeDatabase::new();

    assert!(db.add("k", 1));
    assert!(!db.add("k", 1));
    assert_eq!(db.get("k").len(), 1);

    db.add("k", 2);
    db.add("k", 3);
    assert!(db.replace("k", 9));
    assert_eq!(db.get("k").iter().cloned().collect::<Vec<_>>(), vec![Value::from(9)]);

    db.replace("k", "v");
    db.add("k", "w");
    assert!(db.remove_value("k", &Value::from("v")));
    assert_eq!(db.get("k").iter().cloned().collect::<Vec<_>>(), vec![Value::from("w")]);
    assert!(db.remove_value("k", &Value::from("w")));
    assert!(!db.exists("k"));
    assert!(db.get("k").is_empty());
}

#[test]
fn constant_nodes() {
    let mut db = AttributeDatabase::new();
    let t = db.push(QueryNode::never()).unwrap();
    assert!(!db.query().unwrap());
    let node = db.release(t).unwrap();
    assert_eq!(node.kind(), NodeKind::False);
    let _t = db.push(QueryNode::always()).unwrap();
    assert!(db.query().unwrap());
}

#[test]
fn null_predicate_ignores_bindings() {
    let mut db = AttributeDatabase::new();
    let _t = db.push(QueryNode::when(Predicate::null())).unwrap();
    assert!(db.query().unwrap());
}
