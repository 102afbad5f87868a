use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Part master record. `part_code` is immutable identity; safety stock,
/// lead time, and minimum order quantity are planner-editable.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "parts")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub part_id: i64,
    #[sea_orm(unique)]
    pub part_code: String,
    pub name: String,
    pub uom_code: String,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub safety_stock: Decimal,
    pub lead_time_days: i32,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub min_order_qty: Decimal,
    pub is_active: bool,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::bom_item::Entity")]
    BomItems,
    #[sea_orm(has_many = "super::purchase_order_item::Entity")]
    PurchaseOrderItems,
    #[sea_orm(has_many = "super::inventory_transaction::Entity")]
    InventoryTransactions,
    #[sea_orm(has_one = "super::inventory_record::Entity")]
    InventoryRecord,
    #[sea_orm(has_many = "super::mrp_result::Entity")]
    MrpResults,
}

impl Related<super::bom_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::BomItems.def()
    }
}

impl Related<super::purchase_order_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PurchaseOrderItems.def()
    }
}

impl Related<super::inventory_transaction::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::InventoryTransactions.def()
    }
}

impl Related<super::inventory_record::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::InventoryRecord.def()
    }
}

impl Related<super::mrp_result::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::MrpResults.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
