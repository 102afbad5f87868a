use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// How soon a shortage must be resolved relative to its due date. Fixed
/// SLA tiers agreed with planning; the bounds are inclusive and evaluated
/// in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Urgency {
    Critical,
    High,
    Medium,
    Low,
}

impl Urgency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Urgency::Critical => "critical",
            Urgency::High => "high",
            Urgency::Medium => "medium",
            Urgency::Low => "low",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "critical" => Some(Urgency::Critical),
            "high" => Some(Urgency::High),
            "medium" => Some(Urgency::Medium),
            "low" => Some(Urgency::Low),
            _ => None,
        }
    }
}

/// Workflow state of a planning row after a run. The only field planners
/// may edit on a persisted result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MrpResultStatus {
    Pending,
    Ordered,
    Dismissed,
}

impl MrpResultStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MrpResultStatus::Pending => "pending",
            MrpResultStatus::Ordered => "ordered",
            MrpResultStatus::Dismissed => "dismissed",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(MrpResultStatus::Pending),
            "ordered" => Some(MrpResultStatus::Ordered),
            "dismissed" => Some(MrpResultStatus::Dismissed),
            _ => None,
        }
    }
}

/// One planning row per (part, sales order) demand pairing for a run.
/// Rows are replaced wholesale by each run over their scope; the stock
/// snapshot columns record what the calculation saw.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "mrp_results")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub mrp_result_id: i64,
    pub part_id: i64,
    pub sales_order_id: i64,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub gross_requirement: Decimal,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub current_qty: Decimal,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub reserved_qty: Decimal,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub incoming_qty: Decimal,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub safety_stock: Decimal,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub net_requirement: Decimal,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub suggested_order_qty: Decimal,
    pub suggested_order_date: Option<Date>,
    pub urgency: String,
    pub status: String,
    pub calculated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::part::Entity",
        from = "Column::PartId",
        to = "super::part::Column::PartId"
    )]
    Part,
    #[sea_orm(
        belongs_to = "super::sales_order::Entity",
        from = "Column::SalesOrderId",
        to = "super::sales_order::Column::SalesOrderId"
    )]
    SalesOrder,
}

impl Related<super::part::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Part.def()
    }
}

impl Related<super::sales_order::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SalesOrder.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
