mod common;

use common::{Order, OrderLine, Tag, User, save, session, user};
use std::sync::atomic::{AtomicUsize, Ordering};
use tablemap::{
    DEFAULT_BACKEND,
    backend::DatabaseType,
    config::BackendConfig,
    obs::{MetricsEvent, MetricsSink},
    prelude::*,
};

#[test]
fn exists_then_query_by_name() {
    let session = session();
    save(&session, &mut user("Ana", 31));

    let by_name = User::columns().name().eq("Ana");
    assert!(session.exists(&by_name).expect("exists"));
    assert!(!session.exists(&User::columns().name().eq("Bo")).expect("exists"));

    let users = session.query(Some(&by_name)).expect("query");
    assert_eq!(users.len(), 1);
    assert_eq!(users[0].id, 1);
    assert_eq!(users[0].age, 31);
}

#[test]
fn insert_writes_back_identity_then_save_updates() {
    let session = session();

    let mut ana = user("Ana", 31);
    let inserted = session
        .save_changes(&mut ana, &SaveOptions::default())
        .expect("save");
    assert_eq!(inserted.change_type, StatementKind::Insert);
    assert_eq!(ana.id, 1);
    assert_eq!(inserted.data.as_ref().map(|u| u.id), Some(1));

    let mut bo = user("Bo", 40);
    save(&session, &mut bo);
    assert_eq!(bo.id, 2);

    ana.email = Some("ana@example.com".to_string());
    let updated = session
        .save_changes(&mut ana, &SaveOptions::default())
        .expect("save");
    assert_eq!(updated.change_type, StatementKind::Update);
    assert_eq!(updated.records_affected, 1);

    let reloaded = session.reload(&ana).expect("reload").expect("row exists");
    assert_eq!(reloaded.email.as_deref(), Some("ana@example.com"));
}

#[test]
fn one_to_many_graph_round_trips() {
    let session = session();
    let mut ana = user("Ana", 31);
    save(&session, &mut ana);

    let mut first = Order {
        user_id: ana.id,
        amount: 12.5,
        ..Order::default()
    };
    let mut second = Order {
        user_id: ana.id,
        amount: 30.0,
        ..Order::default()
    };
    save(&session, &mut first);
    save(&session, &mut second);
    for sku in ["A-1", "B-2"] {
        save(
            &session,
            &mut OrderLine {
                order_id: first.id,
                sku: sku.to_string(),
                quantity: 2,
                ..OrderLine::default()
            },
        );
    }

    let users = session.query::<User>(None).expect("query");
    assert_eq!(users.len(), 1);

    let mut orders = users[0].orders.clone();
    orders.sort_by_key(|o| o.id);
    assert_eq!(orders.len(), 2);
    assert_eq!(orders[0].lines.len(), 2);
    assert!(orders[1].lines.is_empty());

    let mut skus: Vec<_> = orders[0].lines.iter().map(|l| l.sku.as_str()).collect();
    skus.sort_unstable();
    assert_eq!(skus, ["A-1", "B-2"]);
}

#[test]
fn association_predicate_filters_joined_rows() {
    let session = session();
    let mut ana = user("Ana", 31);
    let mut bo = user("Bo", 40);
    save(&session, &mut ana);
    save(&session, &mut bo);
    for (owner, amount) in [(ana.id, 5.0), (ana.id, 50.0), (bo.id, 8.0)] {
        save(
            &session,
            &mut Order {
                user_id: owner,
                amount,
                ..Order::default()
            },
        );
    }

    let large = User::columns()
        .orders()
        .then(Order::columns().amount())
        .gt(20.0);
    let users = session.query(Some(&large)).expect("query");

    assert_eq!(users.len(), 1);
    assert_eq!(users[0].name, "Ana");
    assert_eq!(users[0].orders.len(), 1);
    assert!((users[0].orders[0].amount - 50.0).abs() < f64::EPSILON);
}

#[test]
fn validation_blocks_the_write() {
    let session = session();

    let mut nameless = user("   ", 20);
    let outcome = session
        .save_changes(&mut nameless, &SaveOptions::new().validate())
        .expect("save");

    assert!(outcome.is_fail());
    assert_eq!(outcome.message.as_deref(), Some("name is required"));
    assert!(session.query::<User>(None).expect("query").is_empty());
}

#[test]
fn text_keys_come_from_assign_keys() {
    let session = session();

    let mut tag = Tag {
        label: "Rust Lang".to_string(),
        pinned: true,
        ..Tag::default()
    };
    let outcome = session
        .insert(&mut tag, &SaveOptions::default())
        .expect("insert");

    assert!(outcome.is_ok());
    assert_eq!(tag.code, "rust-lang");

    let loaded = session
        .load(&Tag::columns().code().eq("rust-lang"))
        .expect("load")
        .expect("tag exists");
    assert_eq!(loaded.label, "Rust Lang");
    assert!(!loaded.pinned);
}

#[test]
fn delete_and_delete_all_report_rows() {
    let session = session();
    let mut ana = user("Ana", 31);
    save(&session, &mut ana);
    save(&session, &mut user("Bo", 17));
    save(&session, &mut user("Cy", 15));

    let deleted = session
        .delete(&ana, &DeleteOptions::default())
        .expect("delete");
    assert_eq!(deleted.records_affected, 1);
    assert!(!session.exists_entity(&ana).expect("exists"));

    let minors = session
        .delete_all(Some(&User::columns().age().lt(18)))
        .expect("delete all");
    assert_eq!(minors.change_type, StatementKind::DeleteAll);
    assert_eq!(minors.records_affected, 2);
    assert!(session.query::<User>(None).expect("query").is_empty());
}

#[test]
fn constraint_violation_is_a_failed_outcome() {
    let session = session();
    let mut tag = Tag {
        code: "db".to_string(),
        label: "Databases".to_string(),
        ..Tag::default()
    };
    save(&session, &mut tag);

    let again = session
        .insert(&mut tag, &SaveOptions::default())
        .expect("insert returns an outcome");

    assert_eq!(again.status, CrudStatus::Fail);
    assert_eq!(again.change_type, StatementKind::Insert);
    assert!(again.message.is_some_and(|m| m.contains("UNIQUE")));
}

#[test]
fn alter_table_keeps_rows_and_keys() {
    let session = session();
    let mut ana = user("Ana", 31);
    let mut bo = user("Bo", 40);
    save(&session, &mut ana);
    save(&session, &mut bo);
    session
        .delete(&ana, &DeleteOptions::default())
        .expect("delete");

    let restored = session.alter_table::<User>().expect("alter");
    assert_eq!(restored, 1);

    let users = session.query::<User>(None).expect("query");
    assert_eq!(users.len(), 1);
    assert_eq!(users[0].id, bo.id);
    assert_eq!(users[0].name, "Bo");

    // identity keeps counting past the restored keys
    let mut cy = user("Cy", 22);
    save(&session, &mut cy);
    assert!(cy.id > bo.id);
}

#[test]
fn alter_table_creates_missing_table() {
    let session = DbSession::new(common::registry());

    assert!(!session.table_exists::<OrderLine>().expect("table exists"));
    assert_eq!(session.alter_table::<OrderLine>().expect("alter"), 0);
    assert!(session.table_exists::<OrderLine>().expect("table exists"));
}

#[test]
fn rename_table_moves_rows_with_it() {
    let session = session();
    save(&session, &mut user("Ana", 31));

    assert!(session.rename_table("Users", "Members").expect("rename").is_ok());
    assert!(!session.table_exists::<User>().expect("table exists"));

    assert!(session.rename_table("Members", "Users").expect("rename").is_ok());
    let users = session.query::<User>(None).expect("query");
    assert_eq!(users.len(), 1);
    assert_eq!(users[0].name, "Ana");

    let missing = session.rename_table("Nope", "Other").expect("rename");
    assert!(missing.is_fail());
}

#[test]
fn truncate_empties_the_table() {
    let session = session();
    save(&session, &mut user("Ana", 31));
    save(&session, &mut user("Bo", 40));

    let outcome = session.truncate::<User>(false).expect("truncate");
    assert_eq!(outcome.records_affected, 2);
    assert!(session.query::<User>(None).expect("query").is_empty());

    assert!(session.truncate::<User>(true).expect("truncate").is_ok());
    let mut cy = user("Cy", 22);
    save(&session, &mut cy);
    assert_eq!(cy.id, 1);
}

#[test]
fn raw_statements_and_sql_queries() {
    let session = session();
    save(&session, &mut user("Ana", 31));
    save(&session, &mut user("Bo", 40));

    let bumped = session
        .execute_statement("update Users set age = age + 1")
        .expect("statement");
    assert_eq!(bumped.records_affected, 2);

    let users: Vec<User> = session
        .query_sql(
            "select id, name, age from Users where age > @min",
            &[("min", Value::Int(35))],
        )
        .expect("query");
    assert_eq!(users.len(), 1);
    assert_eq!(users[0].age, 41);
}

#[test]
fn backend_from_config() {
    let config = BackendConfig::from_json(
        r#"{"name":"default","database_type":"sqlite","connection_string":"Data Source=:memory:"}"#,
    )
    .expect("parse config");
    assert_eq!(config.database_type, DatabaseType::Sqlite);

    let mut registry = BackendRegistry::new();
    registry
        .register(
            config.name.clone(),
            SqliteBackend::from_config(&config).expect("backend"),
        )
        .expect("register");
    let session = DbSession::new(registry);

    assert!(session.create_table::<Tag>().expect("create").is_ok());
    assert!(session.table_exists::<Tag>().expect("table exists"));
    assert!(session.backends().names().any(|name| name == DEFAULT_BACKEND));
}

///
/// CountingSink
///

struct CountingSink {
    statements: AtomicUsize,
}

impl MetricsSink for CountingSink {
    fn record(&self, event: MetricsEvent) {
        if matches!(event, MetricsEvent::Statement { .. }) {
            self.statements.fetch_add(1, Ordering::SeqCst);
        }
    }
}

static SINK: CountingSink = CountingSink {
    statements: AtomicUsize::new(0),
};

#[test]
fn custom_metrics_sink_sees_statements() {
    let session = session().metrics_sink(&SINK);
    let before = SINK.statements.load(Ordering::SeqCst);

    save(&session, &mut user("Ana", 31));
    session.query::<User>(None).expect("query");

    // existence check, insert, select
    assert_eq!(SINK.statements.load(Ordering::SeqCst) - before, 3);
}
