use crate::{
    db::DbPool,
    entities::{inventory_record, part::Entity as Part},
    errors::ServiceError,
    events::{Event, EventSender},
    services::{inventory::get_or_create_record_on, unwrap_txn_err},
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, EntityTrait, Set, TransactionTrait};
use std::sync::Arc;
use tracing::{info, instrument};

/// Manages the reserved share of a part's stock. Reservations are
/// orthogonal to the ledger: they never create a transaction, they only
/// move the `reserved_qty` that MRP subtracts from availability.
#[derive(Clone)]
pub struct ReservationService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
}

impl ReservationService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Arc<EventSender>) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    /// Reserves stock against a document (sales order, pick list). Fails
    /// with no state change when the unreserved quantity is too small.
    #[instrument(skip(self))]
    pub async fn reserve(
        &self,
        part_id: i64,
        quantity: Decimal,
        reference_type: String,
        reference_id: i64,
    ) -> Result<inventory_record::Model, ServiceError> {
        if quantity <= Decimal::ZERO {
            return Err(ServiceError::ValidationError(format!(
                "Reservation quantity must be positive, got {}",
                quantity
            )));
        }

        let db = self.db_pool.as_ref();

        let record = db
            .transaction::<_, inventory_record::Model, ServiceError>(move |txn| {
                Box::pin(async move {
                    Part::find_by_id(part_id)
                        .one(txn)
                        .await
                        .map_err(ServiceError::db_error)?
                        .ok_or(ServiceError::PartNotFound(part_id))?;

                    let record = get_or_create_record_on(txn, part_id).await?;
                    let available = record.available_qty();

                    if quantity > available {
                        return Err(ServiceError::InsufficientAvailableStock(format!(
                            "Part {}: available {}, requested {}",
                            part_id, available, quantity
                        )));
                    }

                    let mut active: inventory_record::ActiveModel = record.clone().into();
                    active.reserved_qty = Set(record.reserved_qty + quantity);
                    active.version = Set(record.version + 1);
                    active.updated_at = Set(Utc::now().into());

                    active.update(txn).await.map_err(ServiceError::db_error)
                })
            })
            .await
            .map_err(unwrap_txn_err)?;

        info!(
            part_id,
            quantity = %quantity,
            reserved_qty = %record.reserved_qty,
            "Reserved stock"
        );

        self.event_sender
            .send(Event::InventoryReserved {
                part_id,
                quantity,
                reference_type,
                reference_id,
            })
            .await
            .map_err(ServiceError::EventError)?;

        Ok(record)
    }

    /// Releases previously reserved stock, floored at zero.
    #[instrument(skip(self))]
    pub async fn release(
        &self,
        part_id: i64,
        quantity: Decimal,
    ) -> Result<inventory_record::Model, ServiceError> {
        if quantity <= Decimal::ZERO {
            return Err(ServiceError::ValidationError(format!(
                "Release quantity must be positive, got {}",
                quantity
            )));
        }

        let db = self.db_pool.as_ref();

        let record = db
            .transaction::<_, inventory_record::Model, ServiceError>(move |txn| {
                Box::pin(async move {
                    let record = get_or_create_record_on(txn, part_id).await?;
                    let released = (record.reserved_qty - quantity).max(Decimal::ZERO);

                    let mut active: inventory_record::ActiveModel = record.clone().into();
                    active.reserved_qty = Set(released);
                    active.version = Set(record.version + 1);
                    active.updated_at = Set(Utc::now().into());

                    active.update(txn).await.map_err(ServiceError::db_error)
                })
            })
            .await
            .map_err(unwrap_txn_err)?;

        info!(
            part_id,
            quantity = %quantity,
            reserved_qty = %record.reserved_qty,
            "Released stock"
        );

        self.event_sender
            .send(Event::InventoryReleased { part_id, quantity })
            .await
            .map_err(ServiceError::EventError)?;

        Ok(record)
    }
}
