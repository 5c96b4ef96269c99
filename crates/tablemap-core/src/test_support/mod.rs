//! Hand-registered fixture entities and an in-memory scripted backend.

mod backend;

pub(crate) use backend::{MockBackend, MockLog};

use crate::{
    model::{FieldOptions, JoinKeys, TableDefinition, ValidationRule},
    traits::Entity,
};
use chrono::NaiveDateTime;

///
/// User
///

#[derive(Clone, Debug, Default, PartialEq)]
pub(crate) struct User {
    pub id: i64,
    pub name: String,
    pub email: Option<String>,
    pub orders: Vec<Order>,
    pub profile: Option<Profile>,
}

impl Entity for User {
    fn describe() -> TableDefinition {
        TableDefinition::builder::<Self>("Users")
            .scalar(
                "id",
                FieldOptions::new().primary_key().identity(),
                |e| &e.id,
                |e| &mut e.id,
            )
            .scalar("name", FieldOptions::new(), |e| &e.name, |e| &mut e.name)
            .scalar("email", FieldOptions::new(), |e| &e.email, |e| &mut e.email)
            .one_to_many("orders", JoinKeys::new("id", "user_id"), |e| &mut e.orders)
            .one_to_one("profile", JoinKeys::new("id", "user_id"), |e| {
                &mut e.profile
            })
            .rule(ValidationRule::required("name"))
            .rule(ValidationRule::max_length("name", 40))
            .build()
    }
}

///
/// OrderStatus
///

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub(crate) enum OrderStatus {
    #[default]
    Pending,
    Shipped,
    Cancelled,
}

impl From<OrderStatus> for i64 {
    fn from(status: OrderStatus) -> Self {
        match status {
            OrderStatus::Pending => 0,
            OrderStatus::Shipped => 1,
            OrderStatus::Cancelled => 2,
        }
    }
}

impl TryFrom<i64> for OrderStatus {
    type Error = i64;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Pending),
            1 => Ok(Self::Shipped),
            2 => Ok(Self::Cancelled),
            other => Err(other),
        }
    }
}

crate::impl_enum_field_value!(OrderStatus);

///
/// Order
///

#[derive(Clone, Debug, Default, PartialEq)]
pub(crate) struct Order {
    pub id: i64,
    pub user_id: i64,
    pub amount: f64,
    pub placed_at: Option<NaiveDateTime>,
    pub status: OrderStatus,
    pub items: Vec<OrderItem>,
}

impl Entity for Order {
    fn describe() -> TableDefinition {
        TableDefinition::builder::<Self>("Orders")
            .scalar(
                "id",
                FieldOptions::new().primary_key().identity(),
                |e| &e.id,
                |e| &mut e.id,
            )
            .scalar("user_id", FieldOptions::new(), |e| &e.user_id, |e| {
                &mut e.user_id
            })
            .scalar("amount", FieldOptions::new(), |e| &e.amount, |e| &mut e.amount)
            .scalar("placed_at", FieldOptions::new(), |e| &e.placed_at, |e| {
                &mut e.placed_at
            })
            .scalar("status", FieldOptions::new(), |e| &e.status, |e| &mut e.status)
            .one_to_many("items", JoinKeys::new("id", "order_id"), |e| &mut e.items)
            .build()
    }
}

///
/// OrderItem
///

#[derive(Clone, Debug, Default, PartialEq)]
pub(crate) struct OrderItem {
    pub id: i64,
    pub order_id: i64,
    pub sku: String,
    pub quantity: i32,
}

impl Entity for OrderItem {
    fn describe() -> TableDefinition {
        TableDefinition::builder::<Self>("OrderItems")
            .scalar(
                "id",
                FieldOptions::new().primary_key().identity(),
                |e| &e.id,
                |e| &mut e.id,
            )
            .scalar("order_id", FieldOptions::new(), |e| &e.order_id, |e| {
                &mut e.order_id
            })
            .scalar("sku", FieldOptions::new(), |e| &e.sku, |e| &mut e.sku)
            .scalar("quantity", FieldOptions::new(), |e| &e.quantity, |e| {
                &mut e.quantity
            })
            .build()
    }
}

///
/// Profile
///
/// Keyed by a caller-assigned id.
///

#[derive(Clone, Debug, Default, PartialEq)]
pub(crate) struct Profile {
    pub id: i64,
    pub user_id: i64,
    pub bio: Option<String>,
}

impl Entity for Profile {
    fn describe() -> TableDefinition {
        TableDefinition::builder::<Self>("Profiles")
            .scalar("id", FieldOptions::new().primary_key(), |e| &e.id, |e| {
                &mut e.id
            })
            .scalar("user_id", FieldOptions::new(), |e| &e.user_id, |e| {
                &mut e.user_id
            })
            .scalar("bio", FieldOptions::new(), |e| &e.bio, |e| &mut e.bio)
            .build()
    }

    fn assign_keys(&mut self) {
        if self.id == 0 {
            self.id = self.user_id * 100;
        }
    }
}

///
/// AuditEntry
///
/// Keyless table.
///

#[derive(Clone, Debug, Default, PartialEq)]
pub(crate) struct AuditEntry {
    pub message: String,
    pub at: Option<NaiveDateTime>,
}

impl Entity for AuditEntry {
    fn describe() -> TableDefinition {
        TableDefinition::builder::<Self>("AuditLog")
            .database("ops", true)
            .scalar("message", FieldOptions::new(), |e| &e.message, |e| {
                &mut e.message
            })
            .scalar("at", FieldOptions::new(), |e| &e.at, |e| &mut e.at)
            .build()
    }
}

///
/// Pair
///
/// Two-column text key plus a server-computed column.
///

#[derive(Clone, Debug, Default, PartialEq)]
pub(crate) struct Pair {
    pub a: String,
    pub b: String,
    pub note: String,
    pub slug: String,
}

impl Entity for Pair {
    fn describe() -> TableDefinition {
        TableDefinition::builder::<Self>("Pairs")
            .scalar("a", FieldOptions::new().primary_key(), |e| &e.a, |e| &mut e.a)
            .scalar("b", FieldOptions::new().primary_key(), |e| &e.b, |e| &mut e.b)
            .scalar("note", FieldOptions::new(), |e| &e.note, |e| &mut e.note)
            .scalar("slug", FieldOptions::new().computed(), |e| &e.slug, |e| {
                &mut e.slug
            })
            .build()
    }
}

///
/// TreeNode
///
/// Self-referencing association.
///

#[derive(Clone, Debug, Default, PartialEq)]
pub(crate) struct TreeNode {
    pub id: i64,
    pub parent_id: Option<i64>,
    pub children: Vec<TreeNode>,
}

impl Entity for TreeNode {
    fn describe() -> TableDefinition {
        TableDefinition::builder::<Self>("Nodes")
            .scalar("id", FieldOptions::new().primary_key(), |e| &e.id, |e| {
                &mut e.id
            })
            .scalar("parent_id", FieldOptions::new(), |e| &e.parent_id, |e| {
                &mut e.parent_id
            })
            .one_to_many("children", JoinKeys::new("id", "parent_id"), |e| {
                &mut e.children
            })
            .build()
    }
}

/// `2024-05-01 12:30:00` plus `nanos`.
pub(crate) fn datetime(nanos: u32) -> NaiveDateTime {
    chrono::NaiveDate::from_ymd_opt(2024, 5, 1)
        .and_then(|d| d.and_hms_nano_opt(12, 30, 0, nanos))
        .expect("fixture datetime should be valid")
}
