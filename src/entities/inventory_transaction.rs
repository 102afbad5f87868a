use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue, Set};
use serde::{Deserialize, Serialize};

/// Types of stock movements the ledger records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionKind {
    Inbound,
    Outbound,
    Adjustment,
    Transfer,
}

impl TransactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::Inbound => "inbound",
            TransactionKind::Outbound => "outbound",
            TransactionKind::Adjustment => "adjustment",
            TransactionKind::Transfer => "transfer",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "inbound" => Some(TransactionKind::Inbound),
            "outbound" => Some(TransactionKind::Outbound),
            "adjustment" => Some(TransactionKind::Adjustment),
            "transfer" => Some(TransactionKind::Transfer),
            _ => None,
        }
    }

    /// Net effect of a movement of `quantity` on the part's current stock.
    /// Adjustment quantities are signed; transfers move stock between
    /// locations without changing the total.
    pub fn delta(&self, quantity: Decimal) -> Decimal {
        match self {
            TransactionKind::Inbound => quantity,
            TransactionKind::Outbound => -quantity,
            TransactionKind::Adjustment => quantity,
            TransactionKind::Transfer => Decimal::ZERO,
        }
    }
}

/// One atomic stock movement. Append-only: rows are never edited, and the
/// only delete path is the latest-entry rollback in the inventory service.
/// The auto-increment `transaction_id` is the per-part ordering key that
/// makes "latest" well-defined.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "inventory_transactions")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub transaction_id: i64,
    pub part_id: i64,
    pub kind: String, // Storing as string in DB, but will convert to/from enum
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub quantity: Decimal,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub before_qty: Decimal,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub after_qty: Decimal,
    pub reference_type: Option<String>,
    pub reference_id: Option<i64>,
    pub reason: Option<String>,
    pub notes: Option<String>,
    pub performed_by: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::part::Entity",
        from = "Column::PartId",
        to = "super::part::Column::PartId"
    )]
    Part,
}

impl Related<super::part::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Part.def()
    }
}

#[async_trait]
impl ActiveModelBehavior for ActiveModel {
    async fn before_save<C: ConnectionTrait>(self, _db: &C, _insert: bool) -> Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        let mut active_model = self;
        if let ActiveValue::NotSet = active_model.created_at {
            active_model.created_at = Set(Utc::now());
        }
        Ok(active_model)
    }
}
