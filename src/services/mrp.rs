use crate::{
    db::DbPool,
    entities::{
        bom_item::{self, Entity as BomItem},
        inventory_record::{self, Entity as InventoryRecord},
        mrp_result::{self, Entity as MrpResult, MrpResultStatus, Urgency},
        part::{self, Entity as Part},
        sales_order::{self, Entity as SalesOrder, SalesOrderStatus},
        sales_order_item::{self, Entity as SalesOrderItem},
    },
    errors::ServiceError,
    events::{Event, EventSender},
    services::{inventory::incoming_quantity_on, unwrap_txn_err},
};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

/// Which slice of the plan a run recalculates. An empty scope means
/// everything. `clear_existing` keeps the full-replace contract: prior
/// rows in scope are deleted before the fresh set is written.
#[derive(Debug, Clone)]
pub struct MrpScope {
    pub part_ids: Option<Vec<i64>>,
    pub sales_order_ids: Option<Vec<i64>>,
    pub clear_existing: bool,
}

impl Default for MrpScope {
    fn default() -> Self {
        Self {
            part_ids: None,
            sales_order_ids: None,
            clear_existing: true,
        }
    }
}

impl MrpScope {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn for_sales_orders(ids: Vec<i64>) -> Self {
        Self {
            sales_order_ids: Some(ids),
            ..Self::default()
        }
    }

    pub fn for_parts(ids: Vec<i64>) -> Self {
        Self {
            part_ids: Some(ids),
            ..Self::default()
        }
    }
}

/// Demand accumulated for one (part, sales order) pairing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrossRequirement {
    pub quantity: Decimal,
    pub due_date: Option<NaiveDate>,
}

/// Stock snapshot and planning parameters for one part at run time.
#[derive(Debug, Clone)]
pub struct PartPlanningInfo {
    pub current_qty: Decimal,
    pub reserved_qty: Decimal,
    pub incoming_qty: Decimal,
    pub safety_stock: Decimal,
    pub min_order_qty: Decimal,
    pub lead_time_days: i32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetSuggestion {
    pub net_requirement: Decimal,
    pub suggested_order_qty: Decimal,
}

/// What a completed run produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MrpRunSummary {
    pub run_id: Uuid,
    pub results_written: u64,
    pub critical_count: u64,
    pub high_count: u64,
    pub medium_count: u64,
    pub low_count: u64,
    pub total_suggested_qty: Decimal,
    pub parts_needing_order: u64,
    pub calculated_at: DateTime<Utc>,
}

/// Nets one pairing's gross requirement against the part's availability.
///
/// Safety stock is subtracted up front so it is never treated as available,
/// and a negative availability (over-reserved part) is clamped to zero
/// rather than inflating the shortfall. The minimum-order floor only kicks
/// in when there is an actual net requirement.
pub fn net_and_suggest(info: &PartPlanningInfo, gross_requirement: Decimal) -> NetSuggestion {
    let available =
        info.current_qty + info.incoming_qty - info.reserved_qty - info.safety_stock;
    let net_requirement =
        (gross_requirement - available.max(Decimal::ZERO)).max(Decimal::ZERO);

    let suggested_order_qty = if net_requirement > Decimal::ZERO {
        // Ceiling, not rounding: the suggestion must never under-cover.
        net_requirement.ceil().max(info.min_order_qty)
    } else {
        Decimal::ZERO
    };

    NetSuggestion {
        net_requirement,
        suggested_order_qty,
    }
}

/// Classifies how soon the shortage behind a due date must be resolved.
/// The tier bounds are inclusive, evaluated in order, and fixed by
/// agreement with planning.
pub fn classify_urgency(due_date: Option<NaiveDate>, today: NaiveDate) -> Urgency {
    let Some(due) = due_date else {
        return Urgency::Low;
    };

    let days_until_due = (due - today).num_days();
    if days_until_due <= 0 {
        Urgency::Critical
    } else if days_until_due <= 7 {
        Urgency::High
    } else if days_until_due <= 14 {
        Urgency::Medium
    } else {
        Urgency::Low
    }
}

/// Latest date the order should be placed to arrive by the due date.
/// Only meaningful when something actually has to be ordered.
pub fn suggest_order_date(
    due_date: Option<NaiveDate>,
    lead_time_days: i32,
    suggested_order_qty: Decimal,
) -> Option<NaiveDate> {
    if suggested_order_qty <= Decimal::ZERO {
        return None;
    }
    due_date.map(|due| due - Duration::days(lead_time_days as i64))
}

/// The MRP engine: walks sales-order demand through product BOMs down to
/// component parts, nets it against stock, and persists one planning row
/// per (part, sales order) pairing.
#[derive(Clone)]
pub struct MrpService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
}

impl MrpService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Arc<EventSender>) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    /// Gross demand per (part, sales order) pair:
    /// `ordered_qty × quantity_per_unit × (1 + loss_rate)` accumulated over
    /// active BOM lines and demand-active order lines. Quantities stay
    /// exact decimals here; rounding happens at persistence.
    #[instrument(skip(self, scope))]
    pub async fn aggregate_requirements(
        &self,
        scope: &MrpScope,
    ) -> Result<BTreeMap<(i64, i64), GrossRequirement>, ServiceError> {
        let db = self.db_pool.as_ref();

        let mut parts_query = Part::find().filter(part::Column::IsActive.eq(true));
        if let Some(ids) = &scope.part_ids {
            parts_query = parts_query.filter(part::Column::PartId.is_in(ids.clone()));
        }
        let parts = parts_query.all(db).await.map_err(ServiceError::db_error)?;
        if parts.is_empty() {
            return Ok(BTreeMap::new());
        }
        let part_ids: Vec<i64> = parts.iter().map(|p| p.part_id).collect();

        let bom_lines = BomItem::find()
            .filter(bom_item::Column::IsActive.eq(true))
            .filter(bom_item::Column::PartId.is_in(part_ids))
            .all(db)
            .await
            .map_err(ServiceError::db_error)?;
        if bom_lines.is_empty() {
            return Ok(BTreeMap::new());
        }

        let mut lines_by_product: BTreeMap<i64, Vec<&bom_item::Model>> = BTreeMap::new();
        for line in &bom_lines {
            lines_by_product.entry(line.product_id).or_default().push(line);
        }
        let product_ids: Vec<i64> = lines_by_product.keys().copied().collect();

        let demand_active: Vec<&str> = SalesOrderStatus::DEMAND_ACTIVE
            .iter()
            .map(|s| s.as_str())
            .collect();

        let mut order_lines_query = SalesOrderItem::find()
            .find_also_related(SalesOrder)
            .filter(sales_order_item::Column::ProductId.is_in(product_ids))
            .filter(sales_order::Column::Status.is_in(demand_active));
        if let Some(ids) = &scope.sales_order_ids {
            order_lines_query = order_lines_query
                .filter(sales_order_item::Column::SalesOrderId.is_in(ids.clone()));
        }
        let order_lines = order_lines_query
            .all(db)
            .await
            .map_err(ServiceError::db_error)?;

        let mut requirements: BTreeMap<(i64, i64), GrossRequirement> = BTreeMap::new();
        for (line, order) in order_lines {
            let Some(order) = order else { continue };
            let Some(bom) = lines_by_product.get(&line.product_id) else {
                continue;
            };
            for bom_line in bom {
                let quantity = line.ordered_qty
                    * bom_line.quantity_per_unit
                    * (Decimal::ONE + bom_line.loss_rate);
                // The order's due date is taken once per pairing, not per line.
                let entry = requirements
                    .entry((bom_line.part_id, order.sales_order_id))
                    .or_insert_with(|| GrossRequirement {
                        quantity: Decimal::ZERO,
                        due_date: order.due_date,
                    });
                entry.quantity += quantity;
            }
        }

        Ok(requirements)
    }

    /// Runs the full plan for a scope: aggregate, net, classify, persist.
    ///
    /// Persistence is all-or-nothing: prior in-scope rows are deleted and
    /// the fresh set inserted inside one database transaction, so a failed
    /// run leaves the previous results untouched.
    #[instrument(skip(self), fields(clear_existing = scope.clear_existing))]
    pub async fn calculate_mrp(&self, scope: MrpScope) -> Result<MrpRunSummary, ServiceError> {
        let db = self.db_pool.as_ref();
        let run_id = Uuid::new_v4();

        info!(%run_id, "Starting MRP run");

        let requirements = self.aggregate_requirements(&scope).await?;
        info!(%run_id, pairings = requirements.len(), "Aggregated gross requirements");

        let part_ids: BTreeSet<i64> = requirements.keys().map(|(part_id, _)| *part_id).collect();

        let parts: BTreeMap<i64, part::Model> = Part::find()
            .filter(part::Column::PartId.is_in(part_ids.iter().copied().collect::<Vec<_>>()))
            .all(db)
            .await
            .map_err(ServiceError::db_error)?
            .into_iter()
            .map(|p| (p.part_id, p))
            .collect();

        let mut snapshots: BTreeMap<i64, PartPlanningInfo> = BTreeMap::new();
        for part_id in &part_ids {
            let part = parts
                .get(part_id)
                .ok_or(ServiceError::PartNotFound(*part_id))?;
            let record = InventoryRecord::find()
                .filter(inventory_record::Column::PartId.eq(*part_id))
                .one(db)
                .await
                .map_err(ServiceError::db_error)?;
            let (current_qty, reserved_qty) = record
                .map(|r| (r.current_qty, r.reserved_qty))
                .unwrap_or((Decimal::ZERO, Decimal::ZERO));
            let incoming_qty = incoming_quantity_on(db, *part_id).await?;

            snapshots.insert(
                *part_id,
                PartPlanningInfo {
                    current_qty,
                    reserved_qty,
                    incoming_qty,
                    safety_stock: part.safety_stock,
                    min_order_qty: part.min_order_qty,
                    lead_time_days: part.lead_time_days,
                },
            );
        }

        let today = Utc::now().date_naive();
        let calculated_at = Utc::now();

        let mut rows: Vec<mrp_result::ActiveModel> = Vec::with_capacity(requirements.len());
        let mut critical_count = 0u64;
        let mut high_count = 0u64;
        let mut medium_count = 0u64;
        let mut low_count = 0u64;
        let mut total_suggested_qty = Decimal::ZERO;
        let mut parts_needing_order: BTreeSet<i64> = BTreeSet::new();

        for ((part_id, sales_order_id), gross) in &requirements {
            let snapshot = &snapshots[part_id];
            let suggestion = net_and_suggest(snapshot, gross.quantity);
            let urgency = classify_urgency(gross.due_date, today);
            let order_date = suggest_order_date(
                gross.due_date,
                snapshot.lead_time_days,
                suggestion.suggested_order_qty,
            );

            match urgency {
                Urgency::Critical => critical_count += 1,
                Urgency::High => high_count += 1,
                Urgency::Medium => medium_count += 1,
                Urgency::Low => low_count += 1,
            }
            total_suggested_qty += suggestion.suggested_order_qty;
            if suggestion.suggested_order_qty > Decimal::ZERO {
                parts_needing_order.insert(*part_id);
            }

            rows.push(mrp_result::ActiveModel {
                part_id: Set(*part_id),
                sales_order_id: Set(*sales_order_id),
                gross_requirement: Set(gross.quantity.round()),
                current_qty: Set(snapshot.current_qty),
                reserved_qty: Set(snapshot.reserved_qty),
                incoming_qty: Set(snapshot.incoming_qty),
                safety_stock: Set(snapshot.safety_stock),
                net_requirement: Set(suggestion.net_requirement.round()),
                suggested_order_qty: Set(suggestion.suggested_order_qty),
                suggested_order_date: Set(order_date),
                urgency: Set(urgency.as_str().to_string()),
                status: Set(MrpResultStatus::Pending.as_str().to_string()),
                calculated_at: Set(calculated_at),
                ..Default::default()
            });
        }

        let results_written = rows.len() as u64;
        let persist_scope = scope.clone();

        db.transaction::<_, (), ServiceError>(move |txn| {
            Box::pin(async move {
                if persist_scope.clear_existing {
                    let mut delete = MrpResult::delete_many();
                    if let Some(ids) = &persist_scope.part_ids {
                        delete = delete.filter(mrp_result::Column::PartId.is_in(ids.clone()));
                    }
                    if let Some(ids) = &persist_scope.sales_order_ids {
                        delete =
                            delete.filter(mrp_result::Column::SalesOrderId.is_in(ids.clone()));
                    }
                    delete.exec(txn).await.map_err(ServiceError::db_error)?;
                }

                for row in rows {
                    row.insert(txn).await.map_err(ServiceError::db_error)?;
                }

                Ok(())
            })
        })
        .await
        .map_err(unwrap_txn_err)?;

        let summary = MrpRunSummary {
            run_id,
            results_written,
            critical_count,
            high_count,
            medium_count,
            low_count,
            total_suggested_qty,
            parts_needing_order: parts_needing_order.len() as u64,
            calculated_at,
        };

        info!(
            %run_id,
            results_written = summary.results_written,
            parts_needing_order = summary.parts_needing_order,
            total_suggested_qty = %summary.total_suggested_qty,
            "MRP run complete"
        );

        self.event_sender
            .send(Event::MrpRunCompleted {
                run_id,
                results_written: summary.results_written,
                parts_needing_order: summary.parts_needing_order,
                total_suggested_qty: summary.total_suggested_qty,
                calculated_at,
            })
            .await
            .map_err(ServiceError::EventError)?;

        Ok(summary)
    }

    /// Flips a planning row's workflow flag. The calculated fields stay
    /// frozen until the next run replaces the row.
    #[instrument(skip(self))]
    pub async fn set_result_status(
        &self,
        mrp_result_id: i64,
        status: MrpResultStatus,
    ) -> Result<mrp_result::Model, ServiceError> {
        let db = self.db_pool.as_ref();

        let row = MrpResult::find_by_id(mrp_result_id)
            .one(db)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("MRP result {} not found", mrp_result_id))
            })?;

        let mut active: mrp_result::ActiveModel = row.into();
        active.status = Set(status.as_str().to_string());

        active.update(db).await.map_err(ServiceError::db_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use rust_decimal_macros::dec;

    fn info(
        current: Decimal,
        reserved: Decimal,
        incoming: Decimal,
        safety: Decimal,
        moq: Decimal,
    ) -> PartPlanningInfo {
        PartPlanningInfo {
            current_qty: current,
            reserved_qty: reserved,
            incoming_qty: incoming,
            safety_stock: safety,
            min_order_qty: moq,
            lead_time_days: 5,
        }
    }

    #[test]
    fn test_netting_worked_example() {
        // 150 gross against 100 on hand, 20 reserved, 0 incoming, 10 safety
        let suggestion =
            net_and_suggest(&info(dec!(100), dec!(20), dec!(0), dec!(10), dec!(1)), dec!(150));
        assert_eq!(suggestion.net_requirement, dec!(80));
        assert_eq!(suggestion.suggested_order_qty, dec!(80));
    }

    #[test]
    fn test_negative_availability_is_clamped() {
        // Over-reserved part: availability is negative, shortfall stays gross
        let suggestion =
            net_and_suggest(&info(dec!(10), dec!(40), dec!(0), dec!(0), dec!(1)), dec!(50));
        assert_eq!(suggestion.net_requirement, dec!(50));
    }

    #[test]
    fn test_min_order_qty_floor() {
        let suggestion =
            net_and_suggest(&info(dec!(0), dec!(0), dec!(0), dec!(0), dec!(20)), dec!(5));
        assert_eq!(suggestion.net_requirement, dec!(5));
        assert_eq!(suggestion.suggested_order_qty, dec!(20));
    }

    #[test]
    fn test_zero_net_never_triggers_moq() {
        let suggestion =
            net_and_suggest(&info(dec!(100), dec!(0), dec!(0), dec!(0), dec!(20)), dec!(50));
        assert_eq!(suggestion.net_requirement, dec!(0));
        assert_eq!(suggestion.suggested_order_qty, dec!(0));
    }

    #[test]
    fn test_fractional_net_is_ceiled() {
        let suggestion =
            net_and_suggest(&info(dec!(0), dec!(0), dec!(0), dec!(0), dec!(1)), dec!(20.5));
        assert_eq!(suggestion.net_requirement, dec!(20.5));
        assert_eq!(suggestion.suggested_order_qty, dec!(21));
    }

    #[test]
    fn test_incoming_counts_toward_availability() {
        let suggestion =
            net_and_suggest(&info(dec!(10), dec!(0), dec!(30), dec!(0), dec!(1)), dec!(50));
        assert_eq!(suggestion.net_requirement, dec!(10));
    }

    #[rstest]
    #[case(-3, Urgency::Critical)]
    #[case(0, Urgency::Critical)]
    #[case(1, Urgency::High)]
    #[case(7, Urgency::High)]
    #[case(8, Urgency::Medium)]
    #[case(14, Urgency::Medium)]
    #[case(15, Urgency::Low)]
    #[case(60, Urgency::Low)]
    fn test_urgency_boundaries(#[case] days_until_due: i64, #[case] expected: Urgency) {
        let today = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let due = today + Duration::days(days_until_due);
        assert_eq!(classify_urgency(Some(due), today), expected);
    }

    #[test]
    fn test_no_due_date_is_low() {
        let today = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        assert_eq!(classify_urgency(None, today), Urgency::Low);
    }

    #[test]
    fn test_order_date_backs_off_lead_time() {
        let due = NaiveDate::from_ymd_opt(2024, 3, 20).unwrap();
        assert_eq!(
            suggest_order_date(Some(due), 5, dec!(10)),
            Some(NaiveDate::from_ymd_opt(2024, 3, 15).unwrap())
        );
    }

    #[test]
    fn test_no_order_date_without_suggestion_or_due() {
        let due = NaiveDate::from_ymd_opt(2024, 3, 20).unwrap();
        assert_eq!(suggest_order_date(Some(due), 5, dec!(0)), None);
        assert_eq!(suggest_order_date(None, 5, dec!(10)), None);
    }
}
