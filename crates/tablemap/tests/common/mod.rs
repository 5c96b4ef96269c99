#![allow(dead_code)]

use chrono::NaiveDateTime;
use tablemap::{DEFAULT_BACKEND, prelude::*};
use tracing_subscriber::EnvFilter;

///
/// User
///

#[derive(Clone, Debug, Default, Entity, PartialEq)]
#[entity(table = "Users")]
pub struct User {
    #[field(primary_key, identity)]
    pub id: i64,

    #[field(required, max_length = 40)]
    pub name: String,

    pub email: Option<String>,
    pub age: i32,

    #[field(one_to_many)]
    pub orders: Vec<Order>,
}

///
/// Order
///

#[derive(Clone, Debug, Default, Entity, PartialEq)]
#[entity(table = "Orders")]
pub struct Order {
    #[field(primary_key, identity)]
    pub id: i64,

    pub user_id: i64,
    pub amount: f64,
    pub placed_at: Option<NaiveDateTime>,

    #[field(one_to_many)]
    pub lines: Vec<OrderLine>,
}

///
/// OrderLine
///

#[derive(Clone, Debug, Default, Entity, PartialEq)]
#[entity(table = "OrderLines")]
pub struct OrderLine {
    #[field(primary_key, identity)]
    pub id: i64,

    pub order_id: i64,
    pub sku: String,
    pub quantity: i32,
}

///
/// Tag
///
/// Text-keyed; the key is derived from the label on insert.
///

#[derive(Clone, Debug, Default, Entity, PartialEq)]
#[entity(table = "Tags", assign_keys = "Tag::assign_code")]
pub struct Tag {
    #[field(primary_key)]
    pub code: String,

    pub label: String,

    #[field(skip)]
    pub pinned: bool,
}

impl Tag {
    fn assign_code(&mut self) {
        if self.code.is_empty() {
            self.code = self.label.to_lowercase().replace(' ', "-");
        }
    }
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn registry() -> BackendRegistry {
    let mut registry = BackendRegistry::new();
    registry
        .register(
            DEFAULT_BACKEND,
            SqliteBackend::in_memory().expect("open sqlite"),
        )
        .expect("register backend");

    registry
}

/// Session over a fresh in-memory database with every fixture table created.
pub fn session() -> DbSession {
    init_tracing();
    let session = DbSession::new(registry());

    for created in [
        session.create_table::<User>(),
        session.create_table::<Order>(),
        session.create_table::<OrderLine>(),
        session.create_table::<Tag>(),
    ] {
        assert!(created.expect("create table").is_ok());
    }

    session
}

pub fn save<E: Entity>(session: &DbSession, entity: &mut E) {
    let outcome = session
        .save_changes(entity, &SaveOptions::default())
        .expect("save");
    assert!(outcome.is_ok(), "save failed: {:?}", outcome.message);
}

pub fn user(name: &str, age: i32) -> User {
    User {
        name: name.to_string(),
        age,
        ..User::default()
    }
}
