use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Per-part stock state. One row per part, created lazily with zero
/// quantities on first movement.
///
/// `current_qty` is a materialized projection of the ledger: it always
/// equals the `after_qty` of the part's most recent transaction (zero if
/// none). Incoming quantity is derived from open purchase order lines and
/// never stored here. Mutations go through the inventory or reservation
/// services only.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "inventory_records")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub inventory_record_id: i64,
    #[sea_orm(unique)]
    pub part_id: i64,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub current_qty: Decimal,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub reserved_qty: Decimal,
    pub last_inbound_at: Option<DateTimeWithTimeZone>,
    pub last_outbound_at: Option<DateTimeWithTimeZone>,
    pub version: i32,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

impl Model {
    /// Quantity available for new reservations.
    pub fn available_qty(&self) -> Decimal {
        self.current_qty - self.reserved_qty
    }
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

impl ActiveModelBehavior for ActiveModel {}
