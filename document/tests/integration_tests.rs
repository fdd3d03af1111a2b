use std::path::{Path, PathBuf};

use apispec_core::{Arguments, SchemaError, Value};
use apispec_document::{
    Document, DocumentError, DocumentFormat, IncludeConfig, LoadConfig, RequiredPolicy,
};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn write(dir: &Path, name: &str, text: &str) -> PathBuf {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(&path, text).unwrap();
    path
}

const GYM: &str = r##"#include:extra.yaml
swagger: "2.0"
info:
  title: Gym
  version: "1.0"
paths:
  /exercises:
    get:
      responses:
        200:
          description: All exercises
          schema:
            type: array
            items:
              $ref: "#/definitions/Exercise"
definitions:
  Exercise:
    name: {type: string, required: true}
    sets:
      type: array
      items:
        $ref: "#/definitions/Set"
  Set:
    reps: {type: integer, required: true}
    weight: {type: integer, minimum: 0}
"##;

const EXTRA: &str = r#"definitions:
  Set:
    reps: {type: integer, required: true}
    weight: {type: integer, minimum: 0}
    tempo: {type: string, pattern: "[0-9]{4}"}
  Workout:
    date: {type: string, format: date, required: true}
  Program:
    weeks: {type: integer, minimum: 0, maximum: 53}
"#;

// ---------------------------------------------------------------------------
// Reference scenarios
// ---------------------------------------------------------------------------

#[test]
fn test_exercise_sets_accept_only_set_instances() {
    let document = Document::parse(GYM, LoadConfig::default()).unwrap();
    assert!(document.failures().is_empty());

    let exercise = document.definition("Exercise").unwrap();
    let set = document.definition("Set").unwrap();

    let mut squat = exercise.construct(Arguments::new().arg("squat")).unwrap();
    let sets = squat.sequence_mut("sets").unwrap();

    let first = set.construct(Arguments::new().kwarg("reps", 5).kwarg("weight", 100)).unwrap();
    sets.append(first.into()).unwrap();

    let other = exercise.construct(Arguments::new().arg("bench")).unwrap();
    let err = sets.append(other.into()).unwrap_err();
    assert!(matches!(err, SchemaError::TypeMismatch { .. }));
    assert!(sets.append(Value::from(5)).is_err());
    assert_eq!(sets.len(), 1);
}

#[test]
fn test_whole_array_assignment_is_checked() {
    let document = Document::parse(GYM, LoadConfig::default()).unwrap();
    let exercise = document.definition("Exercise").unwrap();
    let set = document.definition("Set").unwrap();

    let one = set.construct(Arguments::new().arg(5)).unwrap();
    let stranger = exercise.construct(Arguments::new().arg("row")).unwrap();

    assert!(
        exercise
            .construct(Arguments::new().arg("squat").arg(Value::list([one.clone().into()])))
            .is_ok()
    );
    assert!(
        exercise
            .construct(Arguments::new().arg("squat").arg(Value::list([one.into(), stranger.into()])))
            .is_err()
    );
}

#[test]
fn test_instantiate_nested_models_from_data() {
    let document = Document::parse(GYM, LoadConfig::default()).unwrap();
    let exercise = document.definition("Exercise").unwrap();

    let data = serde_json::json!({"name": "squat", "sets": [{"reps": 5, "weight": 100}, {"reps": 3}]});
    let squat = exercise.instantiate(&data, &document).unwrap();
    let sets = squat.get("sets").and_then(Value::as_sequence).unwrap();
    assert_eq!(sets.len(), 2);
    assert_eq!(sets.get(1).and_then(Value::as_model).unwrap().get("weight"), Some(&Value::from(0)));

    let bad = serde_json::json!({"name": "squat", "sets": [{"reps": 5, "weight": 0}]});
    assert!(exercise.instantiate(&bad, &document).is_err());
}

#[test]
fn test_unresolved_reference_does_not_abort_load() {
    let text = r##"
info: {title: Gym, version: "1.0"}
paths: {}
definitions:
  Plan:
    best: {$ref: "#/definitions/DoesNotExist"}
    days: {type: array, items: {$ref: "#/definitions/DoesNotExist"}}
"##;
    let document = Document::parse(text, LoadConfig::default()).unwrap();
    assert_eq!(document.failures().len(), 2);

    let plan = document.definition("Plan").unwrap();
    let mut instance = plan.construct(Arguments::new()).unwrap();
    assert!(!instance.is_set("best"));
    let err = instance.sequence_mut("days").unwrap().append(Value::from(1)).unwrap_err();
    assert!(matches!(err, SchemaError::UnresolvedReference(_)));
}

// ---------------------------------------------------------------------------
// Includes
// ---------------------------------------------------------------------------

#[test]
fn test_include_merges_definitions_with_include_winning() {
    let dir = tempfile::tempdir().unwrap();
    let main = write(dir.path(), "main.yaml", GYM);
    write(dir.path(), "extra.yaml", EXTRA);

    let document = Document::from_path(&main, LoadConfig::default()).unwrap();
    let names: Vec<&str> = document.models().names().collect();
    assert_eq!(names, ["Exercise", "Set", "Workout", "Program"]);
    assert!(document.definition("Set").unwrap().field("tempo").is_some());
    assert_eq!(document.includes(), [dir.path().join("extra.yaml")]);

    let rendered = document.to_value();
    let definitions = rendered["definitions"].as_object().unwrap();
    assert_eq!(definitions.len(), 4);
    assert!(definitions["Set"]["properties"].get("tempo").is_some());
}

#[test]
fn test_root_may_point_at_included_definitions() {
    let dir = tempfile::tempdir().unwrap();
    let main = write(
        dir.path(),
        "main.yaml",
        "#include:models.yaml\ninfo: {title: t, version: '1'}\npaths: {}\ndefinitions:\n  Log:\n    program: {$ref: \"#/definitions/Program\"}\n",
    );
    write(dir.path(), "models.yaml", EXTRA);

    let document = Document::from_path(&main, LoadConfig::default()).unwrap();
    assert!(document.failures().is_empty());
    assert_eq!(document.resolution().resolved, 1);

    let log = document.definition("Log").unwrap();
    let data = serde_json::json!({"program": {"weeks": 12}});
    let instance = log.instantiate(&data, &document).unwrap();
    assert!(instance.get("program").and_then(Value::as_model).is_some());
}

#[test]
fn test_includes_are_depth_first_and_relative() {
    let dir = tempfile::tempdir().unwrap();
    let main = write(
        dir.path(),
        "main.yaml",
        "#include:parts/a.yaml\n#include:parts/c.yaml\ninfo: {title: t, version: '1'}\npaths: {}\nschemes: [https]\n",
    );
    write(dir.path(), "parts/a.yaml", "#include:b.yaml\nschemes: [http]\n");
    write(dir.path(), "parts/b.yaml", "schemes: [ws]\n");
    write(dir.path(), "parts/c.yaml", "schemes: [wss]\n");

    let document = Document::from_path(&main, LoadConfig::default()).unwrap();
    let value = document.to_value();
    assert_eq!(value["schemes"], serde_json::json!(["https", "http", "ws", "wss"]));
}

#[test]
fn test_include_cycle_is_skipped() {
    let dir = tempfile::tempdir().unwrap();
    let main = write(
        dir.path(),
        "main.yaml",
        "#include:a.yaml\ninfo: {title: t, version: '1'}\npaths: {}\n",
    );
    write(dir.path(), "a.yaml", "#include:main.yaml\n#include:a.yaml\ntags: [a]\n");

    let document = Document::from_path(&main, LoadConfig::default()).unwrap();
    assert_eq!(document.includes().len(), 1);
    assert_eq!(document.root().objects("tags").map(<[_]>::len), Some(1));
}

#[test]
fn test_include_depth_limit() {
    let dir = tempfile::tempdir().unwrap();
    let main = write(dir.path(), "main.yaml", "#include:a.yaml\ninfo: {title: t, version: '1'}\npaths: {}\n");
    write(dir.path(), "a.yaml", "#include:b.yaml\n");
    write(dir.path(), "b.yaml", "tags: [deep]\n");

    let config = LoadConfig {
        includes: IncludeConfig {
            enabled: true,
            max_depth: 1,
        },
        ..LoadConfig::default()
    };
    let err = Document::from_path(&main, config).unwrap_err();
    assert!(matches!(err, DocumentError::IncludeDepthExceeded { limit: 1, .. }));
}

#[test]
fn test_includes_can_be_disabled() {
    let dir = tempfile::tempdir().unwrap();
    let main = write(dir.path(), "main.yaml", GYM);

    let config = LoadConfig {
        includes: IncludeConfig {
            enabled: false,
            ..IncludeConfig::default()
        },
        ..LoadConfig::default()
    };
    let document = Document::from_path(&main, config).unwrap();
    assert!(document.includes().is_empty());
    assert_eq!(document.models().len(), 2);
}

#[test]
fn test_missing_include_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let main = write(dir.path(), "main.yaml", GYM);
    let err = Document::from_path(&main, LoadConfig::default()).unwrap_err();
    assert!(matches!(err, DocumentError::IoError(_)));
}

#[test]
fn test_strict_policy_tolerates_partial_includes() {
    let dir = tempfile::tempdir().unwrap();
    let main = write(dir.path(), "main.yaml", GYM);
    write(dir.path(), "extra.yaml", EXTRA);

    let config = LoadConfig {
        required_fields: RequiredPolicy::Error,
        ..LoadConfig::default()
    };
    assert!(Document::from_path(&main, config).is_ok());
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

#[test]
fn test_write_then_reload() {
    let dir = tempfile::tempdir().unwrap();
    let main = write(dir.path(), "main.yaml", GYM);
    write(dir.path(), "extra.yaml", EXTRA);
    let document = Document::from_path(&main, LoadConfig::default()).unwrap();

    for name in ["compiled.yaml", "compiled.json"] {
        let out = dir.path().join(name);
        document.write(&out).unwrap();
        let reloaded = Document::from_path(&out, LoadConfig::default()).unwrap();
        assert!(reloaded.failures().is_empty());
        assert_eq!(reloaded.to_value(), document.to_value());
    }
    assert_eq!(DocumentFormat::from_path("x.JSON"), DocumentFormat::Json);
}

#[test]
fn test_written_definitions_keep_their_keys() {
    let dir = tempfile::tempdir().unwrap();
    let main = write(
        dir.path(),
        "main.yaml",
        r#"info: {title: Kennel, version: "1.0"}
paths: {}
definitions:
  Dog:
    name: {type: string, maxLength: 10, example: rex, readOnly: true, x-tag: a}
    age: {type: integer, minimum: 0}
"#,
    );
    let document = Document::from_path(&main, LoadConfig::default()).unwrap();

    let out = dir.path().join("compiled.yaml");
    document.write(&out).unwrap();
    let text = std::fs::read_to_string(&out).unwrap();
    assert!(text.contains("maxLength: 10"));
    assert!(text.contains("x-tag: a"));
    assert!(!text.contains("minimum: 0.0"));

    let reloaded = Document::from_path(&out, LoadConfig::default()).unwrap();
    let properties = &reloaded.to_value()["definitions"]["Dog"]["properties"];
    assert_eq!(
        *properties,
        serde_json::json!({
            "name": {"type": "string", "maxLength": 10, "example": "rex", "readOnly": true, "x-tag": "a"},
            "age": {"type": "integer", "minimum": 0}
        })
    );
}
