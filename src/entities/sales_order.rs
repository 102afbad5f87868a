use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Sales order lifecycle states. Only the demand-active subset feeds MRP
/// requirement aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SalesOrderStatus {
    Pending,
    Confirmed,
    InProduction,
    Completed,
    Cancelled,
}

impl SalesOrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SalesOrderStatus::Pending => "pending",
            SalesOrderStatus::Confirmed => "confirmed",
            SalesOrderStatus::InProduction => "in_production",
            SalesOrderStatus::Completed => "completed",
            SalesOrderStatus::Cancelled => "cancelled",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(SalesOrderStatus::Pending),
            "confirmed" => Some(SalesOrderStatus::Confirmed),
            "in_production" => Some(SalesOrderStatus::InProduction),
            "completed" => Some(SalesOrderStatus::Completed),
            "cancelled" => Some(SalesOrderStatus::Cancelled),
            _ => None,
        }
    }

    /// Statuses whose order lines count as demand.
    pub const DEMAND_ACTIVE: [SalesOrderStatus; 2] =
        [SalesOrderStatus::Confirmed, SalesOrderStatus::InProduction];

    pub fn feeds_demand(&self) -> bool {
        Self::DEMAND_ACTIVE.contains(self)
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "sales_orders")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub sales_order_id: i64,
    #[sea_orm(unique)]
    pub order_number: String,
    pub status: String, // Storing as string in DB, but will convert to/from enum
    pub due_date: Option<Date>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::sales_order_item::Entity")]
    SalesOrderItems,
    #[sea_orm(has_many = "super::mrp_result::Entity")]
    MrpResults,
}

impl Related<super::sales_order_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SalesOrderItems.def()
    }
}

impl Related<super::mrp_result::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::MrpResults.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
