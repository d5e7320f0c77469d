use dtk_config::{
    ConfigError, ConfigNode, Constraint, FlatDict, Kind, PropertyDef, Setting, Value,
};

fn structured() -> ConfigNode {
    ConfigNode::builder("simple_config")
        .property(
            PropertyDef::builder("on_root", Constraint::Type(Kind::Dict))
                .description("jes")
                .default_value(Value::Dict(Default::default())),
        )
        .child(
            ConfigNode::builder("simple_sub_config")
                .property(
                    PropertyDef::builder("int_arg", Constraint::Type(Kind::Int))
                        .description("This should be in CLI help.")
                        .default_value(123),
                )
                .property(
                    PropertyDef::builder("str_arg", Constraint::Type(Kind::Str))
                        .default_value("123"),
                )
                .property(
                    PropertyDef::builder("label", Constraint::Type(Kind::Str)).computed(|r| {
                        let n: i64 = r.get_as("int_arg")?;
                        Ok(Value::from(format!("n={n}")))
                    }),
                ),
        )
        .child(
            ConfigNode::builder("other")
                .property(
                    PropertyDef::builder("level", Constraint::one_of(["info", "debug"]))
                        .default_value("info"),
                )
                .property(
                    PropertyDef::builder("maybe", Constraint::optional(Kind::List))
                        .default_value(Value::Null),
                ),
        )
        .build()
        .expect("tree builds")
}

#[test]
fn get_dict_is_depth_first_and_resolved() {
    let config = structured();
    let flat = config.get_dict().unwrap();

    assert_eq!(
        flat.keys().collect::<Vec<_>>(),
        ["on_root", "int_arg", "str_arg", "label", "level", "maybe"]
    );
    assert_eq!(flat.get("label"), Some(&Value::from("n=123")));
    assert_eq!(flat.get("maybe"), Some(&Value::Null));
    assert_eq!(config.names(), flat.keys().collect::<Vec<_>>());
}

#[test]
fn repeated_reads_are_identical() {
    let config = structured();
    assert_eq!(config.get("label").unwrap(), config.get("label").unwrap());
    assert_eq!(config.get_dict().unwrap(), config.get_dict().unwrap());
}

#[test]
fn children_are_addressable() {
    let mut config = structured();
    let sub = config.child("simple_sub_config").unwrap();
    assert_eq!(sub.get("int_arg").unwrap(), Value::Int(123));
    assert!(!sub.contains("level"));
    assert!(config.contains("level"));

    config.child_mut("other").unwrap().set("level", "debug").unwrap();
    assert_eq!(config.get("level").unwrap(), Value::from("debug"));
    assert!(config.child("missing").is_none());
}

#[test]
fn computed_reads_resolve_against_the_queried_node() {
    let config = structured();
    let sub = config.child("simple_sub_config").unwrap();
    assert_eq!(sub.get("label").unwrap(), Value::from("n=123"));

    let other = config.child("other").unwrap();
    assert!(matches!(other.get("label"), Err(ConfigError::UnknownProperty { .. })));
}

#[test]
fn writes_are_validated() {
    let mut config = structured();

    let err = config.set("int_arg", "not an int").unwrap_err();
    let message = err.to_string();
    assert!(message.contains("'int_arg'"), "{message}");
    assert!(message.contains("int") && message.contains("str"), "{message}");

    let err = config.set("level", "loud").unwrap_err();
    assert!(err.to_string().contains("\"loud\""), "{err}");

    config.set("maybe", Value::from(vec![1, 2])).unwrap();
    config.set("maybe", Value::Null).unwrap();
    assert!(config.validate("int_arg", &Value::Bool(true)).is_err());
    assert!(config.validate("int_arg", &Value::Int(1)).is_ok());
    assert_eq!(config.get("int_arg").unwrap(), Value::Int(123));
}

#[test]
fn unknown_names_are_reported() {
    let mut config = structured();
    let err = config.get("nope").unwrap_err();
    assert!(matches!(&err, ConfigError::UnknownProperty { name, .. } if name == "nope"));
    assert!(config.set("nope", 1).is_err());
    assert!(config.validate("nope", &Value::Null).is_err());
}

#[test]
fn update_applies_all_or_nothing() {
    let mut config = structured();

    let good: FlatDict = [("int_arg", Value::Int(5)), ("str_arg", Value::from("x"))]
        .into_iter()
        .collect();
    config.update(&good).unwrap();
    assert_eq!(config.get("label").unwrap(), Value::from("n=5"));

    let unknown: FlatDict =
        [("int_arg", Value::Int(6)), ("typo", Value::Int(1))].into_iter().collect();
    let err = config.update(&unknown).unwrap_err();
    assert!(matches!(&err, ConfigError::UnknownProperty { name, .. } if name == "typo"));
    assert_eq!(config.get("int_arg").unwrap(), Value::Int(5));

    let invalid: FlatDict =
        [("str_arg", Value::from("y")), ("int_arg", Value::from("z"))].into_iter().collect();
    assert!(config.update(&invalid).is_err());
    assert_eq!(config.get("str_arg").unwrap(), Value::from("x"));
}

#[test]
fn get_dict_feeds_update() {
    let mut source = structured();
    source.set("int_arg", 9).unwrap();
    let mut flat = source.get_dict().unwrap();
    flat.remove("label");

    let mut target = structured();
    target.update(&flat).unwrap();
    assert_eq!(target.get_dict().unwrap(), source.get_dict().unwrap());
}

#[test]
fn reset_restores_defaults() {
    let mut config = structured();
    config.set("int_arg", 1).unwrap();
    config.set("label", Setting::computed(|_| Ok(Value::from("fixed")))).unwrap();
    config.reset();

    assert_eq!(config.get("int_arg").unwrap(), Value::Int(123));
    assert_eq!(config.get("label").unwrap(), Value::from("n=123"));
}

#[test]
fn copies_are_independent() {
    let mut original = structured();
    original.set("str_arg", "before").unwrap();

    let mut copy = original.copy();
    copy.set("str_arg", "after").unwrap();
    copy.set("int_arg", 7).unwrap();

    assert_eq!(original.get("str_arg").unwrap(), Value::from("before"));
    assert_eq!(original.get("label").unwrap(), Value::from("n=123"));
    assert_eq!(copy.get("label").unwrap(), Value::from("n=7"));
}

#[test]
fn computed_write_is_checked_by_trial_evaluation() {
    let mut config = structured();
    config
        .set(
            "str_arg",
            Setting::computed(|r| Ok(Value::from(format!("{}!", r.get_as::<String>("level")?)))),
        )
        .unwrap();
    assert_eq!(config.get("str_arg").unwrap(), Value::from("info!"));

    let err = config.set("int_arg", Setting::computed(|r| r.get("level"))).unwrap_err();
    assert!(matches!(err, ConfigError::Validation { .. }), "{err}");
    assert_eq!(config.get("int_arg").unwrap(), Value::Int(123));

    config.set("level", "debug").unwrap();
    assert_eq!(config.get("str_arg").unwrap(), Value::from("debug!"));
}

#[test]
fn computed_output_is_validated_on_every_read() {
    let mut config = structured();
    config
        .set(
            "str_arg",
            Setting::computed(|r| {
                let maybe = r.get("maybe")?;
                Ok(if maybe.is_null() { Value::from("empty") } else { maybe })
            }),
        )
        .unwrap();
    assert_eq!(config.get("str_arg").unwrap(), Value::from("empty"));

    config.set("maybe", Value::from(vec![1])).unwrap();
    let err = config.get("str_arg").unwrap_err();
    assert!(matches!(&err, ConfigError::Validation { property, .. } if property == "str_arg"));
    assert!(config.get_dict().is_err());

    config.set("maybe", Value::Null).unwrap();
    assert_eq!(config.get("str_arg").unwrap(), Value::from("empty"));
}

#[test]
fn typed_reads() {
    let config = structured();
    assert_eq!(config.get_as::<i64>("int_arg").unwrap(), 123);
    assert_eq!(config.get_as::<Option<Vec<i64>>>("maybe").unwrap(), None);
    assert!(config.get_as::<bool>("int_arg").is_err());
    assert_eq!(config.definitions().len(), 6);
    assert_eq!(
        config.definitions()[1].description(),
        Some("This should be in CLI help.")
    );
}
