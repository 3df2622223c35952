use docschema::{
    load_schema_str, v, DocSchemaError, FieldOptions, Node, Registry, SchemaOptions, Timestamps,
    UnknownKeys,
};
use pretty_assertions::assert_eq;
use serde_json::json;

#[test]
fn test_user_schema() {
    let registry = Registry::new();
    let user = v::object([
        ("username", v::string()),
        ("registered", v::boolean().optional()),
    ]);

    let schema = registry.compile(&user).unwrap();
    assert_eq!(schema.field("username").unwrap().is_required(), Some(true));
    assert_eq!(schema.field("registered").unwrap().is_required(), Some(false));
}

#[test]
fn test_successive_annotations_merge() {
    let mut registry = Registry::new();
    let flag = registry.type_options(v::boolean(), FieldOptions::new().default(true));
    let flag = registry.type_options(flag, FieldOptions::new().index(true).default(false));
    let node = v::object([("flag", flag)]);

    let json = registry.compile(&node).unwrap().to_json().unwrap();
    assert_eq!(
        json["definition"]["flag"],
        json!({"type": "Boolean", "required": true, "default": false, "index": true})
    );
}

#[test]
fn test_required_matrix() {
    let registry = Registry::new();
    let wrappers: [(&str, fn(Node) -> Node, bool); 6] = [
        ("plain", |n: Node| n, true),
        ("optional", |n: Node| n.optional(), false),
        ("nullable", |n: Node| n.nullable(), false),
        ("nullish", |n: Node| n.nullish(), false),
        ("default", |n: Node| n.default("d"), true),
        ("default_optional", |n: Node| n.default("d").optional(), false),
    ];

    let fields: Vec<_> = wrappers
        .iter()
        .map(|(name, wrap, _)| (*name, wrap(v::string())))
        .collect();
    let schema = registry.compile(&v::object(fields)).unwrap();

    for (name, _, expected) in wrappers {
        assert_eq!(
            schema.field(name).unwrap().is_required(),
            Some(expected),
            "field {name}"
        );
    }
}

#[test]
fn test_conflict_aborts_whole_compilation() {
    let mut registry = Registry::new();
    let bad = registry.type_options(v::string().nullable(), FieldOptions::new().required(true));
    let node = v::object([("ok", v::string()), ("bad", bad)]);

    match registry.compile(&node) {
        Err(DocSchemaError::RequiredConflict {
            path,
            required,
            optional,
            nullable,
        }) => {
            assert_eq!(path, "bad");
            assert_eq!(required, "true");
            assert!(!optional);
            assert!(nullable);
        }
        other => panic!("expected a required conflict, got {other:?}"),
    }
}

#[test]
fn test_materialized_defaults_are_independent() {
    let registry = Registry::new();
    let node = v::object([
        ("tags", v::array(v::string()).default(json!(["new"]))),
        ("meta", v::object([("n", v::number())]).default(json!({"n": 1}))),
    ]);
    let schema = registry.compile(&node).unwrap();

    let tags = schema.field("tags").unwrap().default.as_ref().unwrap();
    let mut first = tags.materialize().unwrap();
    first.as_array_mut().unwrap().push(json!("changed"));
    assert_eq!(tags.materialize(), Some(json!(["new"])));

    let meta = schema.field("meta").unwrap().default.as_ref().unwrap();
    let mut first = meta.materialize().unwrap();
    first["n"] = json!(2);
    assert_eq!(meta.materialize(), Some(json!({"n": 1})));
}

#[test]
fn test_timestamps_extended_into_user_schema() {
    let mut registry = Registry::new();
    let base = registry.timestamps_schema(Some("createdAt"), Some("updatedAt")).unwrap();
    let user = registry.extend(&base, [("email", v::string())]).unwrap();
    let user = registry.schema_options(
        user,
        SchemaOptions::new()
            .collection("users")
            .type_options("email", FieldOptions::new().unique(true))
            .unknown_keys(UnknownKeys::Throw),
    );

    let json = registry.compile(&user).unwrap().to_json().unwrap();
    let options = &json["options"];
    assert_eq!(options["collection"], json!("users"));
    assert_eq!(options["strict"], json!("throw"));
    assert_eq!(
        options["timestamps"],
        json!({"createdAt": "createdAt", "updatedAt": "updatedAt"})
    );

    let definition = json["definition"].as_object().unwrap();
    let names: Vec<&str> = definition.keys().map(String::as_str).collect();
    assert_eq!(names, vec!["createdAt", "updatedAt", "email"]);
    assert_eq!(definition["createdAt"]["immutable"], json!(true));
    assert_eq!(definition["email"]["unique"], json!(true));
    assert!(definition["updatedAt"]["default"].is_string());
}

#[test]
fn test_timestamp_generator_edge_cases() {
    let mut registry = Registry::new();
    assert!(matches!(
        registry.timestamps_schema(Some("at"), Some("at")),
        Err(DocSchemaError::DuplicateTimestampName { .. })
    ));

    let empty = registry.timestamps_schema(None, None).unwrap();
    let schema = registry.compile(&empty).unwrap();
    assert!(schema.is_empty());
    assert_eq!(
        schema.to_json().unwrap()["options"]["timestamps"],
        json!({"createdAt": false, "updatedAt": false})
    );

    // Explicit compile options can still turn the mapper's timestamps back on
    let schema = registry
        .compile_with(&empty, &SchemaOptions::new().timestamps(Timestamps::Toggle(true)))
        .unwrap();
    assert_eq!(
        schema.to_json().unwrap()["options"]["timestamps"],
        json!({"createdAt": "createdAt", "updatedAt": "updatedAt"})
    );
}

#[test]
fn test_loaded_schema_matches_built_schema() {
    let mut registry = Registry::new();
    let loaded = load_schema_str(
        &mut registry,
        r#"
type: object
schema:
  schemaOptions: { collection: posts }
  typeOptions:
    slug: { unique: true }
fields:
  title: { type: string }
  slug: { type: string }
  draft: { type: boolean, default: true, options: { index: true } }
  tags: { type: array, items: { type: string } }
  author: { type: objectId, optional: true }
"#,
    )
    .unwrap();

    let draft = registry.type_options(v::boolean().default(true), FieldOptions::new().index(true));
    let built = registry.schema_options(
        v::object([
            ("title", v::string()),
            ("slug", v::string()),
            ("draft", draft),
            ("tags", v::array(v::string())),
            ("author", v::object_id().optional()),
        ]),
        SchemaOptions::new()
            .collection("posts")
            .type_options("slug", FieldOptions::new().unique(true)),
    );

    assert_eq!(
        registry.compile(&loaded).unwrap().to_json().unwrap(),
        registry.compile(&built).unwrap().to_json().unwrap()
    );
}
