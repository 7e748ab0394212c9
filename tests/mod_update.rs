use bson::{Bson, doc};
use nexusodm::query::Field;
use nexusodm::update::{UpdateExpression, UpdateOp, merge, parse_update_json};
use nexusodm::OdmError;

fn f(name: &str) -> Field {
    Field::new(name)
}

#[test]
fn incs_sum() {
    let m = merge(&f("age").inc(2).unwrap(), &f("age").inc(-5).unwrap()).unwrap();
    assert_eq!(m, f("age").inc(-3).unwrap());
    let m = merge(&f("age").inc(2).unwrap(), &f("age").dec(2).unwrap()).unwrap();
    assert_eq!(m, f("age").inc(0).unwrap());
    assert_eq!(m.compile(), doc! {"$inc": {"age": 0}});
}

#[test]
fn push_alls_concatenate_in_order() {
    let m = merge(&f("followers").push_all([2, 5]), &f("followers").push_all([2, 8])).unwrap();
    assert_eq!(m, f("followers").push_all([2, 5, 2, 8]));
    let m = merge(&f("followers").pull_all([1]), &f("followers").pull_all([3])).unwrap();
    assert_eq!(m.compile(), doc! {"$pullAll": {"followers": [1, 3]}});
}

#[test]
fn sets_last_writer_wins() {
    let m = f("username").set("ivan").and(f("username").set("stan")).unwrap();
    assert_eq!(m.compile(), doc! {"$set": {"username": "stan"}});
}

#[test]
fn unset_is_discarded_by_later_terms() {
    let m = f("username").unset().and(f("username").set("stan")).unwrap();
    assert_eq!(m.compile(), doc! {"$set": {"username": "stan"}});
    let m = f("age").unset().and(f("username").set("stan")).unwrap();
    assert_eq!(m.compile(), doc! {"$unset": {"age": 1}, "$set": {"username": "stan"}});
}

#[test]
fn different_ops_on_one_field_are_siblings() {
    let m = f("followers").push(5).and(f("followers").add_to_set(2)).unwrap();
    assert_eq!(m.compile(), doc! {"$push": {"followers": 5}, "$addToSet": {"followers": 2}});
    let m = f("age").inc(1).unwrap().and(f("age").set(3)).unwrap();
    assert_eq!(m.compile(), doc! {"$inc": {"age": 1}, "$set": {"age": 3}});
}

#[test]
fn repeated_single_value_ops_keep_the_latest() {
    let m = f("followers").push(1).and(f("followers").push(2)).unwrap();
    assert_eq!(m.compile(), doc! {"$push": {"followers": 2}});
}

#[test]
fn combined_update_document() {
    let mut u = f("username").set("stan");
    for next in [
        f("age").inc(1).unwrap(),
        f("followers").push_all([2, 5]),
        f("history").pop_first(),
        f("password").unset(),
    ] {
        u = u.and(next).unwrap();
    }
    assert_eq!(
        u.compile(),
        doc! {
            "$set": {"username": "stan"},
            "$inc": {"age": 1},
            "$pushAll": {"followers": [2, 5]},
            "$pop": {"history": -1},
            "$unset": {"password": 1},
        }
    );
}

#[test]
fn builder_validation() {
    assert!(matches!(f("age").inc("one"), Err(OdmError::InvalidOperand { .. })));
    assert!(matches!(f("age").dec(true), Err(OdmError::InvalidOperand { .. })));
}

#[test]
fn inc_beside_push_all_is_not_a_conflict() {
    let push = UpdateExpression::from_document(&doc! {"$pushAll": {"followers": [1]}}).unwrap();
    let m = push.merge(&f("followers").inc(1).unwrap()).unwrap();
    assert_eq!(m.terms().len(), 2);
}

#[test]
fn summing_a_string_conflicts() {
    let parsed = UpdateExpression::from_document(&doc! {"$inc": {"age": 1}}).unwrap();
    let bogus = UpdateExpression::single(UpdateOp::Inc, "age", Bson::from("x"));
    assert!(matches!(parsed.merge(&bogus), Err(OdmError::ConflictingUpdate { .. })));
}

#[test]
fn parsed_updates_compile_back() {
    let json = r#"{"$set":{"username":"stan"},"$inc":{"age":2},"$pop":{"followers":1}}"#;
    let u = parse_update_json(json).unwrap();
    assert_eq!(
        u.compile(),
        doc! {"$set": {"username": "stan"}, "$inc": {"age": 2}, "$pop": {"followers": 1}}
    );
    let again = u.merge(&parse_update_json(r#"{"$inc":{"age":3}}"#).unwrap()).unwrap();
    assert_eq!(again.compile().get_document("$inc").unwrap(), &doc! {"age": 5});
}
