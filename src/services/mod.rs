// Stock state
pub mod inventory;
pub mod purchasing;
pub mod reservation;

// Planning
pub mod mrp;

use crate::db::DbPool;
use crate::errors::ServiceError;
use crate::events::EventSender;
use sea_orm::TransactionError;
use std::sync::Arc;

/// Composition root handed to embedding binaries (API server, job runners).
#[derive(Clone)]
pub struct AppServices {
    pub inventory: inventory::InventoryService,
    pub reservation: reservation::ReservationService,
    pub purchasing: purchasing::PurchasingService,
    pub mrp: mrp::MrpService,
}

impl AppServices {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Arc<EventSender>) -> Self {
        Self {
            inventory: inventory::InventoryService::new(db_pool.clone(), event_sender.clone()),
            reservation: reservation::ReservationService::new(
                db_pool.clone(),
                event_sender.clone(),
            ),
            purchasing: purchasing::PurchasingService::new(db_pool.clone(), event_sender.clone()),
            mrp: mrp::MrpService::new(db_pool, event_sender),
        }
    }
}

/// Collapses sea-orm's transaction error wrapper back into a ServiceError.
pub(crate) fn unwrap_txn_err(e: TransactionError<ServiceError>) -> ServiceError {
    match e {
        TransactionError::Connection(db_err) => ServiceError::db_error(db_err),
        TransactionError::Transaction(service_err) => service_err,
    }
}
