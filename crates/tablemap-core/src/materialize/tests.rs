use crate::{
    error::{CoercionError, OrmError, SchemaError},
    materialize::materialize,
    test_support::{AuditEntry, Order, OrderStatus, Pair, Profile, User, datetime},
    value::{RowDictionary, Value, ValueType},
};
use proptest::prelude::*;

fn user_row(id: i64, name: &str) -> RowDictionary {
    RowDictionary::new()
        .with("id", id)
        .with("name", name)
        .with("email", Value::Null)
}

fn with_order(row: RowDictionary, id: impl Into<Value>, amount: f64) -> RowDictionary {
    let id = id.into();
    let user_id = if id.is_null() { Value::Null } else { Value::Int(1) };

    row.with("orders_id", id)
        .with("orders_user_id", user_id)
        .with("orders_amount", amount)
        .with("orders_placed_at", Value::Null)
        .with("orders_status", 0)
}

fn with_item(row: RowDictionary, id: i64, sku: &str) -> RowDictionary {
    row.with("orders_items_id", id)
        .with("orders_items_order_id", 10)
        .with("orders_items_sku", sku)
        .with("orders_items_quantity", 1)
}

#[test]
fn repeated_parent_is_built_once() {
    let rows = vec![
        with_order(user_row(1, "Ana"), 10, 5.0),
        with_order(user_row(1, "Ana"), 11, 6.0),
        with_order(user_row(1, "Ana"), 12, 7.0),
    ];

    let users: Vec<User> = materialize(&rows).expect("materialize");

    assert_eq!(users.len(), 1);
    assert_eq!(users[0].name, "Ana");
    let ids: Vec<_> = users[0].orders.iter().map(|o| o.id).collect();
    assert_eq!(ids, vec![10, 11, 12]);
}

#[test]
fn roots_keep_first_seen_order() {
    let rows = vec![
        with_order(user_row(2, "Bo"), 20, 1.0),
        with_order(user_row(1, "Ana"), 10, 1.0),
        with_order(user_row(2, "Bo"), 21, 1.0),
    ];

    let users: Vec<User> = materialize(&rows).expect("materialize");

    assert_eq!(users.iter().map(|u| u.id).collect::<Vec<_>>(), vec![2, 1]);
    assert_eq!(users[0].orders.len(), 2);
    assert_eq!(users[1].orders.len(), 1);
}

#[test]
fn nested_children_attach_under_repeated_parents() {
    let rows = vec![
        with_item(with_order(user_row(1, "Ana"), 10, 5.0), 100, "A-1"),
        with_item(with_order(user_row(1, "Ana"), 10, 5.0), 101, "A-2"),
        with_item(with_order(user_row(1, "Ana"), 10, 5.0), 100, "A-1"),
    ];

    let users: Vec<User> = materialize(&rows).expect("materialize");

    assert_eq!(users.len(), 1);
    assert_eq!(users[0].orders.len(), 1);
    let skus: Vec<_> = users[0].orders[0]
        .items
        .iter()
        .map(|i| i.sku.as_str())
        .collect();
    assert_eq!(skus, vec!["A-1", "A-2"]);
}

#[test]
fn repeated_calls_return_independent_graphs() {
    let rows = vec![with_order(user_row(1, "Ana"), 10, 5.0)];

    let mut first: Vec<User> = materialize(&rows).expect("materialize");
    let second: Vec<User> = materialize(&rows).expect("materialize");
    assert_eq!(first, second);

    first[0].orders.clear();
    assert_eq!(second[0].orders.len(), 1);
}

#[test]
fn null_join_columns_mean_no_child() {
    let rows = vec![with_order(user_row(1, "Ana"), Value::Null, 0.0)];

    let users: Vec<User> = materialize(&rows).expect("materialize");

    assert_eq!(users.len(), 1);
    assert!(users[0].orders.is_empty());
    assert!(users[0].profile.is_none());
}

#[test]
fn nullable_fields_read_null_as_none() {
    let rows = vec![user_row(1, "Ana").with("email", Value::Null)];

    let users: Vec<User> = materialize(&rows).expect("materialize");
    assert_eq!(users[0].email, None);

    let rows = vec![user_row(1, "Ana").with("email", "ana@example.com")];
    let users: Vec<User> = materialize(&rows).expect("materialize");
    assert_eq!(users[0].email.as_deref(), Some("ana@example.com"));
}

#[test]
fn null_root_key_skips_the_row() {
    let rows = vec![
        user_row(1, "Ana").with("id", Value::Null),
        user_row(2, "Bo"),
    ];

    let users: Vec<User> = materialize(&rows).expect("materialize");

    assert_eq!(users.len(), 1);
    assert_eq!(users[0].id, 2);
}

#[test]
fn missing_root_key_column_is_a_schema_error() {
    let rows = vec![RowDictionary::new().with("name", "Ana")];

    let err = materialize::<User>(&rows).expect_err("should fail");

    assert!(matches!(
        err,
        OrmError::Schema(SchemaError::MissingKeyColumn { ref entity, ref column })
            if entity == "User" && column == "id"
    ));
}

#[test]
fn coercion_failure_names_field_and_types() {
    let rows = vec![with_order(user_row(1, "Ana"), 10, 1.0).with("orders_amount", "lots")];

    let err = materialize::<User>(&rows).expect_err("should fail");

    let OrmError::FieldCoercion(err) = err else {
        panic!("expected a coercion error, got {err:?}");
    };
    assert_eq!(err.entity, "Order");
    assert_eq!(err.field, "amount");
    assert_eq!(err.declared, ValueType::Float);
    assert_eq!(err.found, ValueType::Text);
    assert!(matches!(err.source, CoercionError::Parse { .. }));
}

#[test]
fn null_in_non_nullable_field_keeps_default() {
    let rows = vec![user_row(1, "Ana").with("name", Value::Null)];

    let users: Vec<User> = materialize(&rows).expect("materialize");

    assert_eq!(users[0].name, "");
}

#[test]
fn unconvertible_key_omits_the_object() {
    let rows = vec![
        with_order(user_row(1, "Ana"), 10, 1.0).with("orders_id", "not-a-number"),
        with_order(user_row(1, "Ana"), 11, 1.0),
    ];

    let users: Vec<User> = materialize(&rows).expect("materialize");

    assert_eq!(users.len(), 1);
    assert_eq!(
        users[0].orders.iter().map(|o| o.id).collect::<Vec<_>>(),
        vec![11]
    );
}

#[test]
fn numeric_widening_and_text_parse_apply() {
    let rows = vec![
        with_order(user_row(1, "Ana"), 10, 0.0)
            .with("orders_amount", 12)
            .with("orders_placed_at", "2024-05-01 12:30:00.5000000")
            .with("orders_status", "1"),
    ];

    let users: Vec<User> = materialize(&rows).expect("materialize");
    let order = &users[0].orders[0];

    assert!((order.amount - 12.0).abs() < f64::EPSILON);
    assert_eq!(order.placed_at, Some(datetime(500_000_000)));
    assert_eq!(order.status, OrderStatus::Shipped);
}

#[test]
fn one_to_one_fills_the_slot() {
    let rows = vec![
        with_order(user_row(1, "Ana"), 10, 1.0)
            .with("profile_id", 100)
            .with("profile_user_id", 1)
            .with("profile_bio", "hi"),
        with_order(user_row(1, "Ana"), 11, 1.0)
            .with("profile_id", 100)
            .with("profile_user_id", 1)
            .with("profile_bio", "hi"),
    ];

    let users: Vec<User> = materialize(&rows).expect("materialize");

    assert_eq!(users[0].orders.len(), 2);
    assert_eq!(
        users[0].profile,
        Some(Profile {
            id: 100,
            user_id: 1,
            bio: Some("hi".to_string()),
        })
    );
}

#[test]
fn keyless_tables_yield_one_object_per_row() {
    let row = RowDictionary::new()
        .with("message", "started")
        .with("at", datetime(0));
    let rows = vec![row.clone(), row];

    let entries: Vec<AuditEntry> = materialize(&rows).expect("materialize");

    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0], entries[1]);
    assert_eq!(entries[0].at, Some(datetime(0)));
}

#[test]
fn same_child_key_under_different_parents_is_not_shared() {
    let rows = vec![
        with_order(user_row(1, "Ana"), 10, 1.0),
        with_order(user_row(2, "Bo"), 10, 1.0),
    ];

    let users: Vec<User> = materialize(&rows).expect("materialize");

    assert_eq!(users.len(), 2);
    assert_eq!(users[0].orders.len(), 1);
    assert_eq!(users[1].orders.len(), 1);
}

#[test]
fn composite_text_keys_do_not_collide() {
    let pair = |a: &str, b: &str| {
        RowDictionary::new()
            .with("a", a)
            .with("b", b)
            .with("note", format!("{a}+{b}"))
    };
    let rows = vec![pair("x_y", "z"), pair("x", "y_z"), pair("x|1:y", "z"), pair("x_y", "z")];

    let pairs: Vec<Pair> = materialize(&rows).expect("materialize");

    let keys: Vec<_> = pairs.iter().map(|p| (p.a.as_str(), p.b.as_str())).collect();
    assert_eq!(keys, [("x_y", "z"), ("x", "y_z"), ("x|1:y", "z")]);
}

#[test]
fn direct_child_materialization_uses_unprefixed_columns() {
    let rows = vec![
        RowDictionary::new()
            .with("id", 10)
            .with("user_id", 1)
            .with("amount", 2.5)
            .with("status", 2),
    ];

    let orders: Vec<Order> = materialize(&rows).expect("materialize");

    assert_eq!(orders[0].status, OrderStatus::Cancelled);
    assert!(orders[0].items.is_empty());
}

// ---------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------

fn arb_rows() -> impl Strategy<Value = Vec<RowDictionary>> {
    prop::collection::vec((1i64..4, prop::option::of(10i64..14)), 0..12).prop_map(|pairs| {
        pairs
            .into_iter()
            .map(|(user, order)| {
                let row = user_row(user, "u");
                match order {
                    Some(order) => with_order(row, order + user * 100, 1.0),
                    None => with_order(row, Value::Null, 0.0),
                }
            })
            .collect()
    })
}

proptest! {
    #[test]
    fn materialization_is_deterministic(rows in arb_rows()) {
        let first: Vec<User> = materialize(&rows).expect("materialize");
        let second: Vec<User> = materialize(&rows).expect("materialize");

        prop_assert_eq!(first, second);
    }

    #[test]
    fn each_distinct_key_appears_once(rows in arb_rows()) {
        let users: Vec<User> = materialize(&rows).expect("materialize");

        let mut user_ids: Vec<_> = users.iter().map(|u| u.id).collect();
        user_ids.sort_unstable();
        user_ids.dedup();
        prop_assert_eq!(user_ids.len(), users.len());

        for user in &users {
            let mut order_ids: Vec<_> = user.orders.iter().map(|o| o.id).collect();
            order_ids.sort_unstable();
            order_ids.dedup();
            prop_assert_eq!(order_ids.len(), user.orders.len());
        }
    }
}
