mod common;

use common::{create_part, dec, event_sender, setup_db};
use partflow_core::entities::inventory_transaction::{self, TransactionKind};
use partflow_core::errors::ServiceError;
use partflow_core::services::inventory::{InventoryService, NewTransaction};
use rust_decimal_macros::dec as rdec;
use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter};

#[tokio::test]
async fn test_ledger_chain_invariant() {
    let db_pool = setup_db().await;
    let service = InventoryService::new(db_pool.clone(), event_sender());
    let part = create_part(&db_pool, "BOLT-M6", dec(5), 7, dec(1)).await;

    service
        .apply_transaction(NewTransaction::new(
            part.part_id,
            TransactionKind::Inbound,
            dec(100),
        ))
        .await
        .expect("inbound failed");

    service
        .apply_transaction(NewTransaction::new(
            part.part_id,
            TransactionKind::Outbound,
            dec(30),
        ))
        .await
        .expect("outbound failed");

    let adjusted = service
        .adjust_inventory(part.part_id, dec(90), Some("cycle count".to_string()), None)
        .await
        .expect("adjust failed");
    assert_eq!(adjusted.record.current_qty, dec(90));

    // A transfer moves stock between locations without changing the total
    let transferred = service
        .apply_transaction(NewTransaction::new(
            part.part_id,
            TransactionKind::Transfer,
            dec(15),
        ))
        .await
        .expect("transfer failed");
    assert_eq!(transferred.transaction.before_qty, dec(90));
    assert_eq!(transferred.transaction.after_qty, dec(90));

    let record = service
        .get_record(part.part_id)
        .await
        .expect("get_record failed")
        .expect("record missing");
    let (entries, total) = service
        .list_transactions(part.part_id, 1, 50)
        .await
        .expect("list failed");

    assert_eq!(total, 4);
    // Newest first, and the record always mirrors the newest after_qty
    assert_eq!(entries[0].after_qty, record.current_qty);
    for pair in entries.windows(2) {
        assert!(pair[0].transaction_id > pair[1].transaction_id);
    }
    for entry in &entries {
        let kind = TransactionKind::from_str(&entry.kind).expect("unknown kind");
        assert_eq!(entry.after_qty, entry.before_qty + kind.delta(entry.quantity));
    }
}

#[tokio::test]
async fn test_outbound_exceeding_stock_fails_and_changes_nothing() {
    let db_pool = setup_db().await;
    let service = InventoryService::new(db_pool.clone(), event_sender());
    let part = create_part(&db_pool, "NUT-M6", dec(0), 3, dec(1)).await;

    service
        .apply_transaction(NewTransaction::new(
            part.part_id,
            TransactionKind::Inbound,
            dec(10),
        ))
        .await
        .expect("inbound failed");

    let err = service
        .apply_transaction(NewTransaction::new(
            part.part_id,
            TransactionKind::Outbound,
            dec(25),
        ))
        .await
        .expect_err("outbound should have failed");
    assert!(matches!(err, ServiceError::InsufficientStock(_)));

    let record = service
        .get_record(part.part_id)
        .await
        .unwrap()
        .expect("record missing");
    assert_eq!(record.current_qty, dec(10));

    let count = inventory_transaction::Entity::find()
        .filter(inventory_transaction::Column::PartId.eq(part.part_id))
        .count(db_pool.as_ref())
        .await
        .unwrap();
    assert_eq!(count, 1);
}

#[tokio::test]
async fn test_adjust_inventory_sets_exact_quantity() {
    let db_pool = setup_db().await;
    let service = InventoryService::new(db_pool.clone(), event_sender());
    let part = create_part(&db_pool, "WASHER-8", dec(0), 1, dec(1)).await;

    let applied = service
        .adjust_inventory(part.part_id, rdec!(42.5), Some("initial count".to_string()), None)
        .await
        .expect("adjust failed");
    assert_eq!(applied.record.current_qty, rdec!(42.5));

    // Downward adjustment records the signed delta
    let applied = service
        .adjust_inventory(part.part_id, dec(40), Some("recount".to_string()), None)
        .await
        .expect("adjust failed");
    assert_eq!(applied.transaction.quantity, rdec!(-2.5));
    assert_eq!(applied.record.current_qty, dec(40));

    let record = service.get_record(part.part_id).await.unwrap().unwrap();
    assert_eq!(record.current_qty, dec(40));
}

#[tokio::test]
async fn test_record_created_with_zero_quantities_on_first_movement() {
    let db_pool = setup_db().await;
    let service = InventoryService::new(db_pool.clone(), event_sender());
    let part = create_part(&db_pool, "GASKET-2", dec(0), 1, dec(1)).await;

    assert!(service.get_record(part.part_id).await.unwrap().is_none());

    let applied = service
        .apply_transaction(NewTransaction::new(
            part.part_id,
            TransactionKind::Inbound,
            dec(5),
        ))
        .await
        .expect("inbound failed");

    assert_eq!(applied.transaction.before_qty, dec(0));
    assert_eq!(applied.transaction.after_qty, dec(5));
    assert!(applied.record.last_inbound_at.is_some());
}

#[tokio::test]
async fn test_delete_latest_transaction_restores_before_qty() {
    let db_pool = setup_db().await;
    let service = InventoryService::new(db_pool.clone(), event_sender());
    let part = create_part(&db_pool, "SHAFT-12", dec(0), 5, dec(1)).await;

    service
        .apply_transaction(NewTransaction::new(
            part.part_id,
            TransactionKind::Inbound,
            dec(50),
        ))
        .await
        .expect("inbound failed");
    let outbound = service
        .apply_transaction(NewTransaction::new(
            part.part_id,
            TransactionKind::Outbound,
            dec(20),
        ))
        .await
        .expect("outbound failed");

    let record = service
        .delete_transaction(outbound.transaction.transaction_id)
        .await
        .expect("delete failed");
    assert_eq!(record.current_qty, outbound.transaction.before_qty);
    assert_eq!(record.current_qty, dec(50));

    let (entries, total) = service.list_transactions(part.part_id, 1, 10).await.unwrap();
    assert_eq!(total, 1);
    assert_eq!(entries[0].after_qty, dec(50));
}

#[tokio::test]
async fn test_delete_mid_chain_transaction_is_rejected() {
    let db_pool = setup_db().await;
    let service = InventoryService::new(db_pool.clone(), event_sender());
    let part = create_part(&db_pool, "SPRING-4", dec(0), 5, dec(1)).await;

    let inbound = service
        .apply_transaction(NewTransaction::new(
            part.part_id,
            TransactionKind::Inbound,
            dec(50),
        ))
        .await
        .expect("inbound failed");
    service
        .apply_transaction(NewTransaction::new(
            part.part_id,
            TransactionKind::Outbound,
            dec(20),
        ))
        .await
        .expect("outbound failed");

    let err = service
        .delete_transaction(inbound.transaction.transaction_id)
        .await
        .expect_err("mid-chain delete should fail");
    assert!(matches!(err, ServiceError::RollbackUnsupported(_)));

    // Nothing changed: both entries remain and the projection is intact
    let record = service.get_record(part.part_id).await.unwrap().unwrap();
    assert_eq!(record.current_qty, dec(30));
    let (_, total) = service.list_transactions(part.part_id, 1, 10).await.unwrap();
    assert_eq!(total, 2);
}

#[tokio::test]
async fn test_unknown_part_is_rejected() {
    let db_pool = setup_db().await;
    let service = InventoryService::new(db_pool.clone(), event_sender());

    let err = service
        .apply_transaction(NewTransaction::new(9999, TransactionKind::Inbound, dec(1)))
        .await
        .expect_err("should fail for unknown part");
    assert!(matches!(err, ServiceError::PartNotFound(9999)));
}

#[tokio::test]
async fn test_non_positive_movement_quantities_are_rejected() {
    let db_pool = setup_db().await;
    let service = InventoryService::new(db_pool.clone(), event_sender());
    let part = create_part(&db_pool, "PIN-3", dec(0), 1, dec(1)).await;

    for kind in [
        TransactionKind::Inbound,
        TransactionKind::Outbound,
        TransactionKind::Transfer,
    ] {
        let err = service
            .apply_transaction(NewTransaction::new(part.part_id, kind, dec(0)))
            .await
            .expect_err("zero quantity should fail");
        assert!(matches!(err, ServiceError::ValidationError(_)));
    }
}

#[tokio::test]
async fn test_adjustment_cannot_drive_stock_negative() {
    let db_pool = setup_db().await;
    let service = InventoryService::new(db_pool.clone(), event_sender());
    let part = create_part(&db_pool, "CLIP-9", dec(0), 1, dec(1)).await;

    service
        .apply_transaction(NewTransaction::new(
            part.part_id,
            TransactionKind::Inbound,
            dec(10),
        ))
        .await
        .expect("inbound failed");

    let err = service
        .apply_transaction(NewTransaction::new(
            part.part_id,
            TransactionKind::Adjustment,
            dec(-15),
        ))
        .await
        .expect_err("negative resulting stock should fail");
    assert!(matches!(err, ServiceError::ValidationError(_)));

    let record = service.get_record(part.part_id).await.unwrap().unwrap();
    assert_eq!(record.current_qty, dec(10));
}

#[tokio::test]
async fn test_list_transactions_rejects_bad_pagination() {
    let db_pool = setup_db().await;
    let service = InventoryService::new(db_pool.clone(), event_sender());
    let part = create_part(&db_pool, "ROD-1", dec(0), 1, dec(1)).await;

    assert!(matches!(
        service.list_transactions(part.part_id, 0, 10).await,
        Err(ServiceError::ValidationError(_))
    ));
    assert!(matches!(
        service.list_transactions(part.part_id, 1, 0).await,
        Err(ServiceError::ValidationError(_))
    ));
}
