#![allow(dead_code)]

use chrono::{NaiveDate, Utc};
use partflow_core::db::{establish_connection_with_config, run_migrations, DbConfig, DbPool};
use partflow_core::entities::{
    bom_item, part, product, purchase_order, purchase_order_item, sales_order, sales_order_item,
    purchase_order::PurchaseOrderStatus, sales_order::SalesOrderStatus,
};
use partflow_core::events::EventSender;
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, Set};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Decimal helper matching the 19,4 column scale.
pub fn dec(value: i64) -> Decimal {
    Decimal::new(value * 10_000, 4)
}

/// Opens a fresh in-memory SQLite database with the schema applied.
/// A single pooled connection keeps every query on the same database.
pub async fn setup_db() -> Arc<DbPool> {
    let config = DbConfig {
        url: "sqlite::memory:?cache=shared".to_string(),
        max_connections: 1,
        min_connections: 1,
        ..Default::default()
    };
    let pool = establish_connection_with_config(&config)
        .await
        .expect("Failed to create DB pool");
    run_migrations(&pool).await.expect("Failed to run migrations");
    Arc::new(pool)
}

/// Event sender whose receiver is drained in the background so service
/// sends never block or fail during a test.
pub fn event_sender() -> Arc<EventSender> {
    let (tx, mut rx) = mpsc::channel(100);
    tokio::spawn(async move { while rx.recv().await.is_some() {} });
    Arc::new(EventSender::new(tx))
}

pub async fn create_part(
    db: &DbPool,
    part_code: &str,
    safety_stock: Decimal,
    lead_time_days: i32,
    min_order_qty: Decimal,
) -> part::Model {
    let now = Utc::now();
    part::ActiveModel {
        part_code: Set(part_code.to_string()),
        name: Set(format!("Part {}", part_code)),
        uom_code: Set("EA".to_string()),
        safety_stock: Set(safety_stock),
        lead_time_days: Set(lead_time_days),
        min_order_qty: Set(min_order_qty),
        is_active: Set(true),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("Failed to create part")
}

pub async fn create_product(db: &DbPool, product_code: &str) -> product::Model {
    let now = Utc::now();
    product::ActiveModel {
        product_code: Set(product_code.to_string()),
        name: Set(format!("Product {}", product_code)),
        is_active: Set(true),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("Failed to create product")
}

pub async fn create_bom_item(
    db: &DbPool,
    product_id: i64,
    part_id: i64,
    quantity_per_unit: Decimal,
    loss_rate: Decimal,
) -> bom_item::Model {
    create_bom_item_with_active(db, product_id, part_id, quantity_per_unit, loss_rate, true).await
}

pub async fn create_bom_item_with_active(
    db: &DbPool,
    product_id: i64,
    part_id: i64,
    quantity_per_unit: Decimal,
    loss_rate: Decimal,
    is_active: bool,
) -> bom_item::Model {
    let now = Utc::now();
    bom_item::ActiveModel {
        product_id: Set(product_id),
        part_id: Set(part_id),
        quantity_per_unit: Set(quantity_per_unit),
        loss_rate: Set(loss_rate),
        is_active: Set(is_active),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("Failed to create BOM item")
}

pub async fn create_sales_order(
    db: &DbPool,
    order_number: &str,
    status: SalesOrderStatus,
    due_date: Option<NaiveDate>,
) -> sales_order::Model {
    let now = Utc::now();
    sales_order::ActiveModel {
        order_number: Set(order_number.to_string()),
        status: Set(status.as_str().to_string()),
        due_date: Set(due_date),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("Failed to create sales order")
}

pub async fn create_sales_order_item(
    db: &DbPool,
    sales_order_id: i64,
    product_id: i64,
    ordered_qty: Decimal,
) -> sales_order_item::Model {
    let now = Utc::now();
    sales_order_item::ActiveModel {
        sales_order_id: Set(sales_order_id),
        product_id: Set(product_id),
        ordered_qty: Set(ordered_qty),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("Failed to create sales order item")
}

pub async fn create_purchase_order(
    db: &DbPool,
    po_number: &str,
    status: PurchaseOrderStatus,
) -> purchase_order::Model {
    let now = Utc::now();
    purchase_order::ActiveModel {
        po_number: Set(po_number.to_string()),
        status: Set(status.as_str().to_string()),
        expected_date: Set(None),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("Failed to create purchase order")
}

pub async fn create_purchase_order_item(
    db: &DbPool,
    purchase_order_id: i64,
    part_id: i64,
    ordered_qty: Decimal,
    received_qty: Decimal,
) -> purchase_order_item::Model {
    let now = Utc::now();
    purchase_order_item::ActiveModel {
        purchase_order_id: Set(purchase_order_id),
        part_id: Set(part_id),
        ordered_qty: Set(ordered_qty),
        received_qty: Set(received_qty),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("Failed to create purchase order item")
}
