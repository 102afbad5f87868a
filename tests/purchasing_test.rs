mod common;

use common::{
    create_part, create_purchase_order, create_purchase_order_item, dec, event_sender, setup_db,
};
use partflow_core::entities::purchase_order::{self, PurchaseOrderStatus};
use partflow_core::errors::ServiceError;
use partflow_core::services::inventory::InventoryService;
use partflow_core::services::purchasing::PurchasingService;
use sea_orm::EntityTrait;

#[tokio::test]
async fn test_partial_receipt_moves_incoming_to_on_hand() {
    let db_pool = setup_db().await;
    let events = event_sender();
    let inventory = InventoryService::new(db_pool.clone(), events.clone());
    let purchasing = PurchasingService::new(db_pool.clone(), events);

    let part = create_part(&db_pool, "BEARING-22", dec(0), 10, dec(1)).await;
    let po = create_purchase_order(&db_pool, "PO-1001", PurchaseOrderStatus::Ordered).await;
    let line =
        create_purchase_order_item(&db_pool, po.purchase_order_id, part.part_id, dec(50), dec(0))
            .await;

    assert_eq!(inventory.incoming_quantity(part.part_id).await.unwrap(), dec(50));

    let result = purchasing
        .receive_po_line(line.purchase_order_item_id, dec(20), Some("receiver".to_string()))
        .await
        .expect("receipt failed");

    assert_eq!(result.order_status, PurchaseOrderStatus::PartiallyReceived);
    assert_eq!(result.applied.transaction.before_qty, dec(0));
    assert_eq!(result.applied.transaction.after_qty, dec(20));
    assert_eq!(
        result.applied.transaction.reference_type.as_deref(),
        Some("PURCHASE_ORDER")
    );

    // 20 moved on hand, 30 still expected
    let record = inventory.get_record(part.part_id).await.unwrap().unwrap();
    assert_eq!(record.current_qty, dec(20));
    assert_eq!(inventory.incoming_quantity(part.part_id).await.unwrap(), dec(30));
}

#[tokio::test]
async fn test_full_receipt_closes_the_order() {
    let db_pool = setup_db().await;
    let events = event_sender();
    let inventory = InventoryService::new(db_pool.clone(), events.clone());
    let purchasing = PurchasingService::new(db_pool.clone(), events);

    let part = create_part(&db_pool, "SEAL-14", dec(0), 10, dec(1)).await;
    let po = create_purchase_order(&db_pool, "PO-1002", PurchaseOrderStatus::Ordered).await;
    let line =
        create_purchase_order_item(&db_pool, po.purchase_order_id, part.part_id, dec(40), dec(0))
            .await;

    purchasing
        .receive_po_line(line.purchase_order_item_id, dec(15), None)
        .await
        .expect("first receipt failed");
    let result = purchasing
        .receive_po_line(line.purchase_order_item_id, dec(25), None)
        .await
        .expect("second receipt failed");

    assert_eq!(result.order_status, PurchaseOrderStatus::Received);

    let order = purchase_order::Entity::find_by_id(po.purchase_order_id)
        .one(db_pool.as_ref())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(order.status, PurchaseOrderStatus::Received.as_str());

    // A received order no longer counts as incoming
    assert_eq!(inventory.incoming_quantity(part.part_id).await.unwrap(), dec(0));
    let record = inventory.get_record(part.part_id).await.unwrap().unwrap();
    assert_eq!(record.current_qty, dec(40));
}

#[tokio::test]
async fn test_over_receipt_is_rejected() {
    let db_pool = setup_db().await;
    let events = event_sender();
    let inventory = InventoryService::new(db_pool.clone(), events.clone());
    let purchasing = PurchasingService::new(db_pool.clone(), events);

    let part = create_part(&db_pool, "VALVE-3", dec(0), 10, dec(1)).await;
    let po = create_purchase_order(&db_pool, "PO-1003", PurchaseOrderStatus::Ordered).await;
    let line =
        create_purchase_order_item(&db_pool, po.purchase_order_id, part.part_id, dec(30), dec(0))
            .await;

    let err = purchasing
        .receive_po_line(line.purchase_order_item_id, dec(31), None)
        .await
        .expect_err("over-receipt should fail");
    assert!(matches!(err, ServiceError::ValidationError(_)));

    // Nothing moved
    assert!(inventory.get_record(part.part_id).await.unwrap().is_none());
    assert_eq!(inventory.incoming_quantity(part.part_id).await.unwrap(), dec(30));
}

#[tokio::test]
async fn test_receipt_against_closed_order_is_rejected() {
    let db_pool = setup_db().await;
    let purchasing = PurchasingService::new(db_pool.clone(), event_sender());

    let part = create_part(&db_pool, "CAP-8", dec(0), 10, dec(1)).await;
    let po = create_purchase_order(&db_pool, "PO-1004", PurchaseOrderStatus::Cancelled).await;
    let line =
        create_purchase_order_item(&db_pool, po.purchase_order_id, part.part_id, dec(10), dec(0))
            .await;

    let err = purchasing
        .receive_po_line(line.purchase_order_item_id, dec(5), None)
        .await
        .expect_err("cancelled order should not receive");
    assert!(matches!(err, ServiceError::InvalidStatus(_)));
}
