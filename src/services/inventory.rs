use crate::{
    db::DbPool,
    entities::{
        inventory_record::{self, Entity as InventoryRecord},
        inventory_transaction::{self, Entity as InventoryTransaction, TransactionKind},
        part::{self, Entity as Part},
        purchase_order,
        purchase_order_item::{self, Entity as PurchaseOrderItem},
    },
    errors::ServiceError,
    events::{Event, EventSender},
    services::unwrap_txn_err,
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, JoinType, ModelTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, RelationTrait, Set, TransactionTrait,
};
use std::sync::Arc;
use tracing::{info, instrument};

/// Input for one ledger movement.
#[derive(Debug, Clone)]
pub struct NewTransaction {
    pub part_id: i64,
    pub kind: TransactionKind,
    pub quantity: Decimal,
    pub reference_type: Option<String>,
    pub reference_id: Option<i64>,
    pub reason: Option<String>,
    pub notes: Option<String>,
    pub performed_by: Option<String>,
}

impl NewTransaction {
    pub fn new(part_id: i64, kind: TransactionKind, quantity: Decimal) -> Self {
        Self {
            part_id,
            kind,
            quantity,
            reference_type: None,
            reference_id: None,
            reason: None,
            notes: None,
            performed_by: None,
        }
    }
}

/// A committed ledger entry together with the updated stock record.
#[derive(Debug, Clone)]
pub struct AppliedTransaction {
    pub transaction: inventory_transaction::Model,
    pub record: inventory_record::Model,
}

/// The inventory ledger. Every physical stock change goes through
/// `apply_transaction`; the record row is never written directly, which is
/// what keeps `current_qty` equal to the newest entry's `after_qty`.
#[derive(Clone)]
pub struct InventoryService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
}

impl InventoryService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Arc<EventSender>) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    /// Applies one typed stock movement as a single atomic unit: the ledger
    /// row and the record update commit together or not at all.
    #[instrument(skip(self, input), fields(part_id = input.part_id, kind = input.kind.as_str()))]
    pub async fn apply_transaction(
        &self,
        input: NewTransaction,
    ) -> Result<AppliedTransaction, ServiceError> {
        let db = self.db_pool.as_ref();

        let applied = db
            .transaction::<_, AppliedTransaction, ServiceError>(move |txn| {
                Box::pin(async move { apply_transaction_on(txn, input).await })
            })
            .await
            .map_err(unwrap_txn_err)?;

        self.emit_applied(&applied).await?;

        Ok(applied)
    }

    /// Sets a part's stock to an absolute value by applying the signed
    /// difference as an adjustment. The delta is computed inside the same
    /// transaction that applies it, so a subsequent read returns exactly
    /// `new_quantity`.
    #[instrument(skip(self))]
    pub async fn adjust_inventory(
        &self,
        part_id: i64,
        new_quantity: Decimal,
        reason: Option<String>,
        performed_by: Option<String>,
    ) -> Result<AppliedTransaction, ServiceError> {
        if new_quantity < Decimal::ZERO {
            return Err(ServiceError::ValidationError(format!(
                "Adjusted quantity must not be negative, got {}",
                new_quantity
            )));
        }

        let db = self.db_pool.as_ref();

        let applied = db
            .transaction::<_, AppliedTransaction, ServiceError>(move |txn| {
                Box::pin(async move {
                    let record = get_or_create_record_on(txn, part_id).await?;
                    let delta = new_quantity - record.current_qty;

                    let mut input =
                        NewTransaction::new(part_id, TransactionKind::Adjustment, delta);
                    input.reason = reason;
                    input.performed_by = performed_by;

                    apply_transaction_on(txn, input).await
                })
            })
            .await
            .map_err(unwrap_txn_err)?;

        self.emit_applied(&applied).await?;

        Ok(applied)
    }

    /// Deletes a ledger entry and rolls the part's stock back to the entry's
    /// `before_qty`. Only the part's most recent entry can be deleted;
    /// removing a mid-chain entry would invalidate every later entry's
    /// before/after pair and is rejected.
    #[instrument(skip(self))]
    pub async fn delete_transaction(
        &self,
        transaction_id: i64,
    ) -> Result<inventory_record::Model, ServiceError> {
        let db = self.db_pool.as_ref();

        let (record, reversed) = db
            .transaction::<_, (inventory_record::Model, inventory_transaction::Model), ServiceError>(
                move |txn| {
                    Box::pin(async move {
                        let entry = InventoryTransaction::find_by_id(transaction_id)
                            .one(txn)
                            .await
                            .map_err(ServiceError::db_error)?
                            .ok_or_else(|| {
                                ServiceError::NotFound(format!(
                                    "Transaction {} not found",
                                    transaction_id
                                ))
                            })?;

                        let latest = InventoryTransaction::find()
                            .filter(inventory_transaction::Column::PartId.eq(entry.part_id))
                            .order_by_desc(inventory_transaction::Column::TransactionId)
                            .one(txn)
                            .await
                            .map_err(ServiceError::db_error)?
                            .ok_or_else(|| {
                                ServiceError::InternalError(format!(
                                    "Ledger empty for part {} while deleting transaction {}",
                                    entry.part_id, transaction_id
                                ))
                            })?;

                        if latest.transaction_id != entry.transaction_id {
                            return Err(ServiceError::RollbackUnsupported(format!(
                                "Transaction {} is not the most recent entry for part {}; \
                                 later entries would be left with stale before/after quantities",
                                transaction_id, entry.part_id
                            )));
                        }

                        let record = InventoryRecord::find()
                            .filter(inventory_record::Column::PartId.eq(entry.part_id))
                            .one(txn)
                            .await
                            .map_err(ServiceError::db_error)?
                            .ok_or_else(|| {
                                ServiceError::NotFound(format!(
                                    "Inventory record for part {} not found",
                                    entry.part_id
                                ))
                            })?;

                        let mut active: inventory_record::ActiveModel = record.clone().into();
                        active.current_qty = Set(entry.before_qty);
                        active.version = Set(record.version + 1);
                        active.updated_at = Set(Utc::now().into());

                        let updated = active.update(txn).await.map_err(ServiceError::db_error)?;

                        entry
                            .clone()
                            .delete(txn)
                            .await
                            .map_err(ServiceError::db_error)?;

                        Ok((updated, entry))
                    })
                },
            )
            .await
            .map_err(unwrap_txn_err)?;

        info!(
            part_id = reversed.part_id,
            transaction_id = reversed.transaction_id,
            restored_qty = %record.current_qty,
            "Reversed ledger transaction"
        );

        self.event_sender
            .send(Event::TransactionReversed {
                part_id: reversed.part_id,
                transaction_id: reversed.transaction_id,
                restored_quantity: record.current_qty,
            })
            .await
            .map_err(ServiceError::EventError)?;

        Ok(record)
    }

    /// Quantity expected from open purchase orders:
    /// `sum(ordered − received)` over lines on open-status orders.
    #[instrument(skip(self))]
    pub async fn incoming_quantity(&self, part_id: i64) -> Result<Decimal, ServiceError> {
        incoming_quantity_on(self.db_pool.as_ref(), part_id).await
    }

    /// Gets the stock record for a part, if one exists yet.
    #[instrument(skip(self))]
    pub async fn get_record(
        &self,
        part_id: i64,
    ) -> Result<Option<inventory_record::Model>, ServiceError> {
        let db = self.db_pool.as_ref();

        InventoryRecord::find()
            .filter(inventory_record::Column::PartId.eq(part_id))
            .one(db)
            .await
            .map_err(ServiceError::db_error)
    }

    /// Lists a part's ledger entries newest-first with pagination.
    #[instrument(skip(self))]
    pub async fn list_transactions(
        &self,
        part_id: i64,
        page: u64,
        limit: u64,
    ) -> Result<(Vec<inventory_transaction::Model>, u64), ServiceError> {
        if page == 0 {
            return Err(ServiceError::ValidationError(
                "Page number must be greater than 0".to_string(),
            ));
        }
        if limit == 0 || limit > 1000 {
            return Err(ServiceError::ValidationError(
                "Limit must be between 1 and 1000".to_string(),
            ));
        }

        let db = self.db_pool.as_ref();

        let paginator = InventoryTransaction::find()
            .filter(inventory_transaction::Column::PartId.eq(part_id))
            .order_by_desc(inventory_transaction::Column::TransactionId)
            .paginate(db, limit);

        let total = paginator.num_items().await.map_err(|e| {
            ServiceError::InternalError(format!("Failed to count transactions: {}", e))
        })?;

        let entries = paginator.fetch_page(page - 1).await.map_err(|e| {
            ServiceError::InternalError(format!("Failed to fetch transactions page: {}", e))
        })?;

        Ok((entries, total))
    }

    /// Active parts whose current stock sits below their safety stock.
    #[instrument(skip(self))]
    pub async fn low_stock_parts(
        &self,
    ) -> Result<Vec<(part::Model, inventory_record::Model)>, ServiceError> {
        let db = self.db_pool.as_ref();

        let rows = Part::find()
            .filter(part::Column::IsActive.eq(true))
            .find_also_related(InventoryRecord)
            .all(db)
            .await
            .map_err(ServiceError::db_error)?;

        Ok(rows
            .into_iter()
            .filter_map(|(p, r)| r.map(|r| (p, r)))
            .filter(|(p, r)| r.current_qty < p.safety_stock)
            .collect())
    }

    async fn emit_applied(&self, applied: &AppliedTransaction) -> Result<(), ServiceError> {
        self.event_sender
            .send(Event::InventoryAdjusted {
                part_id: applied.transaction.part_id,
                transaction_id: applied.transaction.transaction_id,
                kind: applied.transaction.kind.clone(),
                old_quantity: applied.transaction.before_qty,
                new_quantity: applied.transaction.after_qty,
                reference_type: applied.transaction.reference_type.clone(),
                reference_id: applied.transaction.reference_id,
            })
            .await
            .map_err(ServiceError::EventError)
    }
}

/// Finds a part's stock record, creating one with zero quantities if the
/// part has never moved.
pub(crate) async fn get_or_create_record_on<C: ConnectionTrait>(
    conn: &C,
    part_id: i64,
) -> Result<inventory_record::Model, ServiceError> {
    let existing = InventoryRecord::find()
        .filter(inventory_record::Column::PartId.eq(part_id))
        .one(conn)
        .await
        .map_err(ServiceError::db_error)?;

    if let Some(record) = existing {
        return Ok(record);
    }

    let now = Utc::now();
    let created = inventory_record::ActiveModel {
        part_id: Set(part_id),
        current_qty: Set(Decimal::ZERO),
        reserved_qty: Set(Decimal::ZERO),
        version: Set(1),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
        ..Default::default()
    }
    .insert(conn)
    .await
    .map_err(ServiceError::db_error)?;

    Ok(created)
}

/// Core ledger step, usable inside a caller-owned transaction so that e.g.
/// purchase receiving can update its own rows and the ledger atomically.
pub(crate) async fn apply_transaction_on<C: ConnectionTrait>(
    conn: &C,
    input: NewTransaction,
) -> Result<AppliedTransaction, ServiceError> {
    let part = Part::find_by_id(input.part_id)
        .one(conn)
        .await
        .map_err(ServiceError::db_error)?
        .ok_or(ServiceError::PartNotFound(input.part_id))?;

    match input.kind {
        TransactionKind::Inbound | TransactionKind::Outbound | TransactionKind::Transfer => {
            if input.quantity <= Decimal::ZERO {
                return Err(ServiceError::ValidationError(format!(
                    "{} quantity must be positive, got {}",
                    input.kind.as_str(),
                    input.quantity
                )));
            }
        }
        TransactionKind::Adjustment => {}
    }

    let record = get_or_create_record_on(conn, input.part_id).await?;
    let before_qty = record.current_qty;

    if input.kind == TransactionKind::Outbound && before_qty < input.quantity {
        return Err(ServiceError::InsufficientStock(format!(
            "Part {}: current {}, requested {}",
            part.part_code, before_qty, input.quantity
        )));
    }

    let after_qty = before_qty + input.kind.delta(input.quantity);
    if after_qty < Decimal::ZERO {
        return Err(ServiceError::ValidationError(format!(
            "Part {}: adjustment of {} would drive stock negative (current {})",
            part.part_code, input.quantity, before_qty
        )));
    }

    let transaction = inventory_transaction::ActiveModel {
        part_id: Set(input.part_id),
        kind: Set(input.kind.as_str().to_string()),
        quantity: Set(input.quantity),
        before_qty: Set(before_qty),
        after_qty: Set(after_qty),
        reference_type: Set(input.reference_type),
        reference_id: Set(input.reference_id),
        reason: Set(input.reason),
        notes: Set(input.notes),
        performed_by: Set(input.performed_by),
        ..Default::default()
    }
    .insert(conn)
    .await
    .map_err(ServiceError::db_error)?;

    let now = Utc::now();
    let mut active: inventory_record::ActiveModel = record.clone().into();
    active.current_qty = Set(after_qty);
    active.version = Set(record.version + 1);
    active.updated_at = Set(now.into());
    match input.kind {
        TransactionKind::Inbound => active.last_inbound_at = Set(Some(now.into())),
        TransactionKind::Outbound => active.last_outbound_at = Set(Some(now.into())),
        _ => {}
    }

    let updated = active.update(conn).await.map_err(ServiceError::db_error)?;

    info!(
        part_id = input.part_id,
        kind = input.kind.as_str(),
        quantity = %input.quantity,
        before_qty = %before_qty,
        after_qty = %after_qty,
        "Applied ledger transaction"
    );

    Ok(AppliedTransaction {
        transaction,
        record: updated,
    })
}

/// Derived incoming quantity over open-status purchase order lines.
pub(crate) async fn incoming_quantity_on<C: ConnectionTrait>(
    conn: &C,
    part_id: i64,
) -> Result<Decimal, ServiceError> {
    use crate::entities::purchase_order::PurchaseOrderStatus;

    let open: Vec<&str> = PurchaseOrderStatus::OPEN.iter().map(|s| s.as_str()).collect();

    let lines = PurchaseOrderItem::find()
        .filter(purchase_order_item::Column::PartId.eq(part_id))
        .join(
            JoinType::InnerJoin,
            purchase_order_item::Relation::PurchaseOrder.def(),
        )
        .filter(purchase_order::Column::Status.is_in(open))
        .all(conn)
        .await
        .map_err(ServiceError::db_error)?;

    Ok(lines.iter().map(|l| l.outstanding_qty()).sum())
}
