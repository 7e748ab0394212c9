#![allow(dead_code)]

use bson::{Document, doc};
use nexusodm::{FieldDescriptor, FieldKind, Schema, SchemaRegistry};

/// Registry with a `User` record type plus the embedded types it uses.
pub fn registry() -> SchemaRegistry {
    SchemaRegistry::new()
        .with(
            Schema::new("Address")
                .field("street", FieldKind::String)
                .field("city", FieldKind::String),
        )
        .with(
            Schema::new("Contact")
                .field("address", FieldKind::embedded("Address"))
                .field("phone", FieldKind::String),
        )
        .with(
            Schema::new("Entry")
                .field("note", FieldKind::String)
                .field("tags", FieldKind::list(FieldKind::String))
                .field("at", FieldKind::DateTime),
        )
        .with(
            Schema::new("User")
                .field("username", FieldKind::String)
                .field("age", FieldKind::Integer)
                .field("followers", FieldKind::list(FieldKind::Integer))
                .field("favorite_foods", FieldKind::list(FieldKind::String))
                .field("contacts", FieldKind::embedded("Contact"))
                .field("history", FieldKind::list(FieldKind::embedded("Entry")))
                .field("prefs", FieldKind::Dict)
                .field("scores", FieldKind::map(FieldKind::Integer))
                .field("joined", FieldKind::DateTime)
                .field("manager", FieldKind::reference("User"))
                .with(FieldDescriptor::new("logins", FieldKind::Integer).with_default(0))
                .with(FieldDescriptor::new("password", FieldKind::String).internal()),
        )
}

/// A populated `User` as raw input.
pub fn stan() -> Document {
    doc! {
        "username": "stanislav",
        "age": 31,
        "followers": [2, 5],
        "favorite_foods": ["pizza", "tacos"],
        "contacts": {"address": {"street": "Main St", "city": "Springfield"}, "phone": "555"},
        "history": [
            {"note": "signup", "tags": ["pen", "ink"], "at": 1_262_304_000_i64},
            {"note": "login", "tags": [], "at": 1_262_390_400_i64},
        ],
        "prefs": {"theme": "dark"},
        "scores": {"math": 3},
        "joined": "2010-01-01",
        "password": "hunter2",
    }
}
