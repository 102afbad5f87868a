use crate::{
    db::DbPool,
    entities::{
        inventory_transaction::TransactionKind,
        purchase_order::{self, Entity as PurchaseOrder, PurchaseOrderStatus},
        purchase_order_item::{self, Entity as PurchaseOrderItem},
    },
    errors::ServiceError,
    events::{Event, EventSender},
    services::{
        inventory::{apply_transaction_on, AppliedTransaction, NewTransaction},
        unwrap_txn_err,
    },
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set, TransactionTrait};
use std::sync::Arc;
use tracing::{info, instrument};

/// Outcome of receiving against one purchase order line.
#[derive(Debug, Clone)]
pub struct ReceiptResult {
    pub purchase_order_id: i64,
    pub purchase_order_item_id: i64,
    pub part_id: i64,
    pub quantity_received: Decimal,
    pub order_status: PurchaseOrderStatus,
    pub applied: AppliedTransaction,
}

/// Receives purchased stock. This is the handoff point where quantity
/// leaves "incoming" (open PO lines) and enters the ledger as on-hand
/// stock; both sides move in one database transaction.
#[derive(Clone)]
pub struct PurchasingService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
}

impl PurchasingService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Arc<EventSender>) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    /// Records a receipt against a purchase order line: bumps the line's
    /// received quantity, rolls the order status forward, and applies an
    /// inbound ledger transaction referencing the order.
    #[instrument(skip(self))]
    pub async fn receive_po_line(
        &self,
        purchase_order_item_id: i64,
        quantity: Decimal,
        performed_by: Option<String>,
    ) -> Result<ReceiptResult, ServiceError> {
        if quantity <= Decimal::ZERO {
            return Err(ServiceError::ValidationError(format!(
                "Receipt quantity must be positive, got {}",
                quantity
            )));
        }

        let db = self.db_pool.as_ref();

        let result = db
            .transaction::<_, ReceiptResult, ServiceError>(move |txn| {
                Box::pin(async move {
                    let line = PurchaseOrderItem::find_by_id(purchase_order_item_id)
                        .one(txn)
                        .await
                        .map_err(ServiceError::db_error)?
                        .ok_or_else(|| {
                            ServiceError::NotFound(format!(
                                "Purchase order line {} not found",
                                purchase_order_item_id
                            ))
                        })?;

                    let order = PurchaseOrder::find_by_id(line.purchase_order_id)
                        .one(txn)
                        .await
                        .map_err(ServiceError::db_error)?
                        .ok_or_else(|| {
                            ServiceError::NotFound(format!(
                                "Purchase order {} not found",
                                line.purchase_order_id
                            ))
                        })?;

                    let status = PurchaseOrderStatus::from_str(&order.status).ok_or_else(|| {
                        ServiceError::InvalidStatus(format!(
                            "Purchase order {} has unknown status {:?}",
                            order.purchase_order_id, order.status
                        ))
                    })?;
                    if !status.is_open() {
                        return Err(ServiceError::InvalidStatus(format!(
                            "Purchase order {} is {} and cannot receive stock",
                            order.po_number,
                            status.as_str()
                        )));
                    }

                    let outstanding = line.outstanding_qty();
                    if quantity > outstanding {
                        return Err(ServiceError::ValidationError(format!(
                            "Receipt of {} exceeds outstanding {} on line {}",
                            quantity, outstanding, purchase_order_item_id
                        )));
                    }

                    let mut active_line: purchase_order_item::ActiveModel = line.clone().into();
                    active_line.received_qty = Set(line.received_qty + quantity);
                    active_line.updated_at = Set(Utc::now().into());
                    let updated_line = active_line
                        .update(txn)
                        .await
                        .map_err(ServiceError::db_error)?;

                    // Order is fully received once no line has quantity outstanding.
                    let open_lines = PurchaseOrderItem::find()
                        .filter(
                            purchase_order_item::Column::PurchaseOrderId
                                .eq(order.purchase_order_id),
                        )
                        .all(txn)
                        .await
                        .map_err(ServiceError::db_error)?;
                    let fully_received = open_lines
                        .iter()
                        .all(|l| l.outstanding_qty() == Decimal::ZERO);
                    let new_status = if fully_received {
                        PurchaseOrderStatus::Received
                    } else {
                        PurchaseOrderStatus::PartiallyReceived
                    };

                    let mut active_order: purchase_order::ActiveModel = order.clone().into();
                    active_order.status = Set(new_status.as_str().to_string());
                    active_order.updated_at = Set(Utc::now().into());
                    active_order
                        .update(txn)
                        .await
                        .map_err(ServiceError::db_error)?;

                    let mut input =
                        NewTransaction::new(line.part_id, TransactionKind::Inbound, quantity);
                    input.reference_type = Some("PURCHASE_ORDER".to_string());
                    input.reference_id = Some(order.purchase_order_id);
                    input.reason = Some("PO receipt".to_string());
                    input.notes = Some(format!("Received against PO line {}", line.purchase_order_item_id));
                    input.performed_by = performed_by;

                    let applied = apply_transaction_on(txn, input).await?;

                    Ok(ReceiptResult {
                        purchase_order_id: order.purchase_order_id,
                        purchase_order_item_id: updated_line.purchase_order_item_id,
                        part_id: line.part_id,
                        quantity_received: quantity,
                        order_status: new_status,
                        applied,
                    })
                })
            })
            .await
            .map_err(unwrap_txn_err)?;

        info!(
            purchase_order_id = result.purchase_order_id,
            part_id = result.part_id,
            quantity = %result.quantity_received,
            status = result.order_status.as_str(),
            "Received purchase order line"
        );

        self.event_sender
            .send(Event::PurchaseOrderReceived {
                purchase_order_id: result.purchase_order_id,
                part_id: result.part_id,
                quantity: result.quantity_received,
            })
            .await
            .map_err(ServiceError::EventError)?;

        Ok(result)
    }
}
