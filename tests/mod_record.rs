mod support;

use bson::{Bson, doc};
use nexusodm::{OdmError, Record};

#[test]
fn construction_coerces_and_defaults() {
    let reg = support::registry();
    let r = Record::new(&reg, "User", &support::stan()).unwrap();
    assert_eq!(r.get("logins"), Some(&Bson::Int32(0)));
    assert!(matches!(r.get("joined"), Some(Bson::DateTime(_))));
    assert!(r.deltas().unwrap().is_empty());
}

#[test]
fn set_field_then_deltas() {
    let reg = support::registry();
    let mut r = Record::new(&reg, "User", &support::stan()).unwrap();
    r.set_field("history.0.tags.1", "quill").unwrap();
    r.set_field("contacts.phone", "556").unwrap();
    r.set("favorite_foods", vec!["pizza", "sushi"]).unwrap();
    let d = r.deltas().unwrap();
    assert_eq!(
        d.to_document(),
        doc! {
            "contacts": {"phone": {"old": "555", "new": "556"}},
            "favorite_foods": {"added": ["sushi"], "removed": ["tacos"]},
            "history": {
                "added": [{"note": "signup", "tags": ["pen", "quill"], "at": 1_262_304_000_i64}],
                "removed": [{"note": "signup", "tags": ["pen", "ink"], "at": 1_262_304_000_i64}],
                "0": {"tags": {"added": ["quill"], "removed": ["ink"]}},
            },
        }
    );
    r.mark_persisted();
    assert!(r.deltas().unwrap().is_empty());
}

#[test]
fn external_round_trip_is_idempotent() {
    let reg = support::registry();
    let mut r = Record::new(&reg, "User", &support::stan()).unwrap();
    let external = r.to_external(true);
    assert!(!external.contains_key("password"));
    let delta = r.absorb(&external, false).unwrap();
    assert!(delta.is_empty(), "{delta:?}");
    assert_eq!(r.to_external(true), external);
    assert_eq!(r.get("password"), Some(&Bson::from("hunter2")));
}

#[test]
fn absorb_failure_leaves_record_untouched() {
    let reg = support::registry();
    let mut r = Record::new(&reg, "User", &support::stan()).unwrap();
    let before = r.values().clone();
    let e = r.absorb(&doc! {"username": "ivan", "joined": "not a date"}, true);
    assert!(matches!(e, Err(OdmError::InvalidLiteral { .. })));
    assert_eq!(r.values(), &before);
}

#[test]
fn reload_replaces_values_and_snapshot() {
    let reg = support::registry();
    let mut r = Record::new(&reg, "User", &doc! {"username": "stan"}).unwrap();
    r.set("age", 3).unwrap();
    r.reload(&doc! {"username": "ivan", "age": "40"}).unwrap();
    assert_eq!(r.get("age"), Some(&Bson::Int32(40)));
    assert!(r.deltas().unwrap().is_empty());
    assert_eq!(r.snapshot().values(), r.values());
}

#[test]
fn references_store_keys_and_diff_by_key() {
    let reg = support::registry();
    let mut r = Record::new(&reg, "User", &doc! {"manager": {"_id": 7, "username": "boss"}}).unwrap();
    assert_eq!(r.get("manager"), Some(&Bson::Int32(7)));
    r.set("manager", doc! {"_id": 7}).unwrap();
    assert!(r.deltas().unwrap().is_empty());
    r.set("manager", 8).unwrap();
    assert_eq!(r.deltas().unwrap().to_document(), doc! {"manager": {"old": 7, "new": 8}});
}
