//! End-to-end tests of the cross-environment proxy mechanism

use std::io::Write;

use exdb::{ExdbError, Proxy, Runtime, Value};

const DB: &str = r#"
x = 1
y = "two"
nested = { a = true }
"#;

fn table(value: Value) -> Proxy {
    match value {
        Value::Table(p) => p,
        other => panic!("Expected a table handle, got {:?}", other),
    }
}

#[test]
fn end_to_end_database_scenario() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, "{}", DB).unwrap();

    let runtime = Runtime::new();
    let session = runtime.session();
    let db = session.open(file.path()).unwrap();

    assert_eq!(db.get("x").unwrap(), Value::Int(1));
    assert_eq!(db.get("y").unwrap(), Value::Str("two".to_string()));

    let nested = table(db.get("nested").unwrap());
    assert_eq!(nested.get("a").unwrap(), Value::Bool(true));

    // no integer-sequence part at the top level
    assert_eq!(db.len().unwrap(), 0);

    // iteration yields the three pairs in insertion order
    let keys: Vec<String> = db
        .iter()
        .map(|entry| match entry.unwrap().0 {
            Value::Str(s) => s,
            other => panic!("Expected string key, got {:?}", other),
        })
        .collect();
    assert_eq!(keys, vec!["x", "y", "nested"]);
}

#[test]
fn identity_is_stable_within_a_session() {
    let runtime = Runtime::new();
    let session = runtime.session();
    let db = session.open_source("db.exdb", DB).unwrap();

    let first = db.get("nested").unwrap();
    let second = db.get("nested").unwrap();

    // same handle object while the first stays reachable
    assert_eq!(first, second);
    assert!(Proxy::ptr_eq(&table(first), &table(second)));
}

#[test]
fn identity_holds_through_aliases() {
    let runtime = Runtime::new();
    let session = runtime.session();
    let db = session
        .open_source(
            "db.exdb",
            "shared = { a = 1 }\nt1 = { s = shared }\nt2 = { s = shared }",
        )
        .unwrap();

    let via_t1 = table(table(db.get("t1").unwrap()).get("s").unwrap());
    let via_t2 = table(table(db.get("t2").unwrap()).get("s").unwrap());
    let direct = table(db.get("shared").unwrap());

    assert!(Proxy::ptr_eq(&via_t1, &via_t2));
    assert!(Proxy::ptr_eq(&via_t1, &direct));
}

#[test]
fn distinct_sessions_get_distinct_handles() {
    let runtime = Runtime::new();
    let consumer_a = runtime.session();
    let consumer_b = runtime.session();

    let db_a = consumer_a.open_source("db.exdb", DB).unwrap();
    let db_b = consumer_b.adopt(&db_a).unwrap();

    assert!(!Proxy::ptr_eq(&db_a, &db_b));

    // both resolve to the same producer-side table
    let nested_a = table(db_a.get("nested").unwrap());
    let nested_b = table(db_b.get("nested").unwrap());
    assert!(!Proxy::ptr_eq(&nested_a, &nested_b));
    assert_eq!(nested_a.get("a").unwrap(), Value::Bool(true));
    assert_eq!(nested_b.get("a").unwrap(), Value::Bool(true));
}

#[test]
fn primitives_round_trip_with_exact_kind() {
    let runtime = Runtime::new();
    let session = runtime.session();
    let db = session
        .open_source(
            "db.exdb",
            r#"
            i = 7
            neg = -3
            f = 2.0
            frac = 1.5
            s = "text with \"quotes\""
            t = true
            nothing = nil
            "#,
        )
        .unwrap();

    assert_eq!(db.get("i").unwrap(), Value::Int(7));
    assert_eq!(db.get("neg").unwrap(), Value::Int(-3));
    // float stays float, integer stays integer
    assert_eq!(db.get("f").unwrap(), Value::Float(2.0));
    assert_ne!(db.get("f").unwrap(), Value::Int(2));
    assert_eq!(db.get("frac").unwrap(), Value::Float(1.5));
    assert_eq!(
        db.get("s").unwrap(),
        Value::Str("text with \"quotes\"".to_string())
    );
    assert_eq!(db.get("t").unwrap(), Value::Bool(true));
    assert_eq!(db.get("nothing").unwrap(), Value::Nil);
    assert_eq!(db.get("never_was").unwrap(), Value::Nil);
}

#[test]
fn float_keys_normalize_on_lookup() {
    let runtime = Runtime::new();
    let session = runtime.session();
    let db = session
        .open_source("db.exdb", "list = { 10, 20, 30 }")
        .unwrap();
    let list = table(db.get("list").unwrap());

    assert_eq!(list.get(2).unwrap(), Value::Int(20));
    assert_eq!(list.get(2.0).unwrap(), Value::Int(20));
    assert_eq!(list.get(f64::NAN).unwrap(), Value::Nil);
}

#[test]
fn length_matches_sequence_part() {
    let runtime = Runtime::new();
    let session = runtime.session();
    let db = session
        .open_source(
            "db.exdb",
            "list = { 10, 20, 30 }\nrange = seq(1, 5)\nmixed = { 1, name = \"x\" }",
        )
        .unwrap();

    assert_eq!(table(db.get("list").unwrap()).len().unwrap(), 3);
    assert_eq!(table(db.get("range").unwrap()).len().unwrap(), 5);
    assert_eq!(table(db.get("mixed").unwrap()).len().unwrap(), 1);
    assert_eq!(db.len().unwrap(), 0);
}

#[test]
fn iteration_visits_every_pair_once() {
    let runtime = Runtime::new();
    let session = runtime.session();
    let db = session
        .open_source("db.exdb", "a = 1\nb = 2\nc = 3\nd = 4")
        .unwrap();

    let mut seen = Vec::new();
    let mut prev = Value::Nil;
    loop {
        match db.next(&prev).unwrap() {
            Some((key, value)) => {
                prev = key.clone();
                seen.push((key, value));
            }
            None => break,
        }
    }

    assert_eq!(seen.len(), 4);
    let names: Vec<&str> = seen
        .iter()
        .filter_map(|(k, _)| match k {
            Value::Str(s) => Some(s.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(names, vec!["a", "b", "c", "d"]);

    // exhausted iteration keeps signalling the end
    assert!(db.next(&prev).unwrap().is_none());
}

#[test]
fn nested_iteration_marshals_table_values() {
    let runtime = Runtime::new();
    let session = runtime.session();
    let db = session.open_source("db.exdb", DB).unwrap();

    let mut tables = 0;
    for entry in &db {
        let (_, value) = entry.unwrap();
        if let Value::Table(p) = value {
            assert_eq!(p.get("a").unwrap(), Value::Bool(true));
            tables += 1;
        }
    }
    assert_eq!(tables, 1);
}

#[test]
fn teardown_invalidates_every_handle() {
    let runtime = Runtime::new();
    let session = runtime.session();
    let db = session.open_source("db.exdb", DB).unwrap();
    let nested = table(db.get("nested").unwrap());

    runtime.close_all();

    for err in [
        db.get("x").unwrap_err(),
        nested.get("a").unwrap_err(),
        db.len().unwrap_err(),
        db.next(&Value::Nil).unwrap_err(),
    ] {
        assert!(matches!(err, ExdbError::Stale { .. }), "got {:?}", err);
        assert!(err.to_string().contains("invalid external table"));
    }

    // closing again is a no-op
    runtime.close_all();
    assert_eq!(runtime.live_count(), 0);
    assert_eq!(runtime.environment_count(), 1);
}

#[test]
fn dropping_the_runtime_tears_down() {
    let db;
    {
        let runtime = Runtime::new();
        let session = runtime.session();
        db = session.open_source("db.exdb", DB).unwrap();
        assert_eq!(db.get("x").unwrap(), Value::Int(1));
    }
    assert!(matches!(db.get("x"), Err(ExdbError::Stale { .. })));
}

#[test]
fn environments_outlive_unused_handles() {
    let runtime = Runtime::new();
    let session = runtime.session();
    let db = session.open_source("db.exdb", DB).unwrap();
    drop(db);

    // the environment stays open until teardown
    assert_eq!(runtime.live_count(), 1);
    runtime.close_all();
    assert_eq!(runtime.live_count(), 0);
}

#[test]
fn table_keys_are_rejected_for_get() {
    let runtime = Runtime::new();
    let session = runtime.session();
    let db = session.open_source("db.exdb", DB).unwrap();
    let nested = db.get("nested").unwrap();

    let err = db.get(nested).unwrap_err();
    assert!(matches!(err, ExdbError::UnsupportedKey("table")));
    assert!(err.to_string().contains("unsupported key type table"));
}

#[test]
fn function_values_fail_only_their_own_access() {
    let runtime = Runtime::new();
    let session = runtime.session();
    let db = session
        .open_source("db.exdb", "x = 1\nhelper = upper\ny = 2")
        .unwrap();

    assert_eq!(db.get("x").unwrap(), Value::Int(1));
    assert_eq!(db.get("y").unwrap(), Value::Int(2));

    let err = db.get("helper").unwrap_err();
    assert!(matches!(err, ExdbError::UnsupportedValue("function")));
    assert!(err.to_string().contains("unsupported value type (function)"));

    // iteration fails exactly at the function entry
    let results: Vec<_> = db.iter().collect();
    assert!(results[0].is_ok());
    assert!(results[1].is_err());
}

#[test]
fn open_failure_passes_producer_error_through() {
    let runtime = Runtime::new();
    let session = runtime.session();

    let err = session
        .open_source("broken.exdb", "x = 1\ny = x.z")
        .unwrap_err();
    let text = err.to_string();
    assert!(text.contains("broken.exdb:2:"), "got: {}", text);
    assert!(text.contains("cannot index integer value 'x'"));
    assert_eq!(runtime.environment_count(), 0);
}

#[test]
fn describe_tags_name_environment_and_table() {
    let runtime = Runtime::new();
    let session = runtime.session();
    let db = session.open_source("db.exdb", DB).unwrap();

    let tag = db.describe();
    assert!(tag.starts_with("[exdb env#"));
    assert!(tag.contains("0x"));

    // still printable after teardown
    runtime.close_all();
    assert_eq!(db.describe(), tag);
}
