use dtk_config::{ConfigError, ConfigNode, ConfigSources, Constraint, Kind, PropertyDef, Value};
use std::fs;
use tempfile::TempDir;

fn config() -> ConfigNode {
    ConfigNode::builder("root")
        .property(
            PropertyDef::builder("log_level", Constraint::one_of(["info", "debug"]))
                .default_value("info"),
        )
        .child(
            ConfigNode::builder("quality")
                .property(PropertyDef::builder("reformat", Constraint::Type(Kind::Bool)).default_value(true))
                .property(PropertyDef::builder("ratio", Constraint::Type(Kind::Float)).default_value(0.5))
                .property(
                    PropertyDef::builder("branches", Constraint::optional(Kind::List))
                        .default_value(Value::Null),
                ),
        )
        .build()
        .expect("tree builds")
}

fn write(dir: &TempDir, name: &str, contents: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, contents).expect("write config file");
    path
}

#[test]
fn toml_file_with_sections() {
    let dir = TempDir::new().unwrap();
    let path = write(
        &dir,
        "dtk.toml",
        "log_level = \"debug\"\n\n[quality]\nreformat = false\nratio = 2\n",
    );

    let mut node = config();
    node.apply_sources(&ConfigSources::new().file(&path)).unwrap();

    assert_eq!(node.get("log_level").unwrap(), Value::from("debug"));
    assert_eq!(node.get("reformat").unwrap(), Value::Bool(false));
    assert_eq!(node.get("ratio").unwrap(), Value::Float(2.0));
}

#[test]
fn json_file_is_read_by_extension() {
    let dir = TempDir::new().unwrap();
    let path = write(&dir, "dtk.json", r#"{"branches": ["main"], "reformat": false}"#);

    let mut node = config();
    node.apply_sources(&ConfigSources::new().file(&path)).unwrap();
    assert_eq!(node.get("branches").unwrap(), Value::from(vec!["main"]));
}

#[test]
fn environment_overrides_file() {
    let dir = TempDir::new().unwrap();
    let path = write(&dir, "dtk.toml", "reformat = false\nlog_level = \"debug\"\n");

    let sources = ConfigSources::new().file(&path).env_prefix("DTK").env_vars([
        ("DTK__REFORMAT", "true"),
        ("DTK__BRANCHES", "['master', 'main']"),
        ("OTHER__REFORMAT", "false"),
    ]);
    let mut node = config();
    node.apply_sources(&sources).unwrap();

    assert_eq!(node.get("reformat").unwrap(), Value::Bool(true));
    assert_eq!(node.get("log_level").unwrap(), Value::from("debug"));
    assert_eq!(node.get("branches").unwrap(), Value::from(vec!["master", "main"]));
}

#[test]
fn unknown_keys_fail_the_whole_load() {
    let dir = TempDir::new().unwrap();
    let path = write(&dir, "dtk.toml", "reformat = false\ntypo = 1\n");

    let mut node = config();
    let err = node.apply_sources(&ConfigSources::new().file(&path)).unwrap_err();
    assert!(matches!(&err, ConfigError::UnknownProperty { name, .. } if name == "typo"), "{err}");
    assert_eq!(node.get("reformat").unwrap(), Value::Bool(true));
}

#[test]
fn invalid_values_are_reported() {
    let mut node = config();
    let sources = ConfigSources::new().env_prefix("DTK").env_vars([("DTK__REFORMAT", "maybe")]);
    let err = node.apply_sources(&sources).unwrap_err();
    assert!(err.to_string().contains("reformat"), "{err}");
}

#[test]
fn missing_files() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("absent.toml");

    let mut node = config();
    node.apply_sources(&ConfigSources::new().optional_file(&missing)).unwrap();
    assert!(node.get_dict().is_ok());

    let err = node.apply_sources(&ConfigSources::new().file(&missing)).unwrap_err();
    assert!(matches!(err, ConfigError::Source { .. }), "{err}");
}
