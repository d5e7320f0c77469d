use dtk_config::{parse_literal, ConfigNode, Constraint, FlatDict, Kind, PropertyDef, Value};
use proptest::prelude::*;

fn counters() -> ConfigNode {
    ConfigNode::builder("root")
        .property(PropertyDef::builder("count", Constraint::Type(Kind::Int)).default_value(0))
        .property(PropertyDef::builder("name", Constraint::Type(Kind::Str)).default_value(""))
        .build()
        .unwrap()
}

fn scalar() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::Int),
        (-1.0e9..1.0e9f64).prop_map(Value::Float),
        "[a-zA-Z0-9 '\"\\\\_-]{0,12}".prop_map(Value::Str),
    ]
}

fn nested() -> impl Strategy<Value = Value> {
    scalar().prop_recursive(3, 24, 4, |inner| {
        prop_oneof![
            proptest::collection::vec(inner.clone(), 0..4).prop_map(Value::List),
            proptest::collection::btree_map("[a-z]{1,6}", inner, 0..4).prop_map(Value::Dict),
        ]
    })
}

proptest! {
    #[test]
    fn int_tokens_coerce_exactly(n in any::<i64>()) {
        let value = Constraint::Type(Kind::Int).coerce("n", &n.to_string()).unwrap();
        prop_assert_eq!(value, Value::Int(n));
    }

    #[test]
    fn bool_tokens_ignore_case(flag in any::<bool>(), upper in any::<bool>()) {
        let token = if upper { flag.to_string().to_uppercase() } else { flag.to_string() };
        let value = Constraint::Type(Kind::Bool).coerce("b", &token).unwrap();
        prop_assert_eq!(value, Value::Bool(flag));
    }

    #[test]
    fn literal_display_is_parseable(value in nested()) {
        prop_assert_eq!(parse_literal(&value.to_string()).unwrap(), value);
    }

    #[test]
    fn rejected_update_leaves_tree_untouched(count in any::<i64>(), bad in "[a-z]{1,8}") {
        let mut node = counters();
        node.set("count", count).unwrap();
        let before = node.get_dict().unwrap();

        let update: FlatDict = [("name", Value::from("changed")), ("count", Value::from(bad))]
            .into_iter()
            .collect();
        prop_assert!(node.update(&update).is_err());
        prop_assert_eq!(node.get_dict().unwrap(), before);
    }
}
