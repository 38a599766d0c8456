//! # In-Memory Backend
//!
//! HashMaps behind `parking_lot` mutexes. The whole store is guarded
//! by one mutex per table, which trivially gives the conditional-write
//! atomicity the check-in registry needs.

use std::collections::HashMap;

use async_trait::async_trait;
use mintgate_core::{EventId, MerchantOrderId, Order, Timestamp, TokenId, WalletAddress};
use parking_lot::Mutex;

use crate::error::StoreError;
use crate::keys::{legacy_used_ticket_key, used_ticket_key};
use crate::traits::{
    claimed_upsert, gate_validated_upsert, paid_order_upsert, reconcile, status_placeholder,
    ClaimRecord, OrderStore, PaidOrderDraft, RecordPaidOutcome, StatusDraft, UsedMarker,
    UsedTicketRecord,
};

/// Volatile order store for development, tests, and databaseless
/// single-instance deployments.
#[derive(Debug, Default)]
pub struct MemoryOrderStore {
    orders: Mutex<HashMap<String, Order>>,
    /// token id -> merchant order id.
    token_index: Mutex<HashMap<String, String>>,
    used: Mutex<HashMap<String, UsedTicketRecord>>,
}

impl MemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn index_token(&self, order: &Order) {
        if let Some(token) = &order.token_id {
            self.token_index
                .lock()
                .insert(token.to_string(), order.merchant_order_id.to_string());
        }
    }

    /// Number of stored orders. Test and diagnostics helper.
    pub fn len(&self) -> usize {
        self.orders.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.lock().is_empty()
    }
}

#[async_trait]
impl OrderStore for MemoryOrderStore {
    async fn get_by_merchant_id(
        &self,
        id: &MerchantOrderId,
    ) -> Result<Option<Order>, StoreError> {
        Ok(self
            .orders
            .lock()
            .get(id.as_str())
            .cloned()
            .map(reconcile))
    }

    async fn get_by_token_id(&self, token: &TokenId) -> Result<Option<Order>, StoreError> {
        let id = match self.token_index.lock().get(token.as_str()) {
            Some(id) => id.clone(),
            None => return Ok(None),
        };
        Ok(self.orders.lock().get(&id).cloned().map(reconcile))
    }

    async fn record_paid_order(
        &self,
        draft: PaidOrderDraft,
    ) -> Result<RecordPaidOutcome, StoreError> {
        let existing = self
            .orders
            .lock()
            .get(draft.merchant_order_id.as_str())
            .cloned();
        let (outcome, write) = paid_order_upsert(existing, &draft)?;
        if write {
            self.orders.lock().insert(
                outcome.order.merchant_order_id.to_string(),
                outcome.order.clone(),
            );
            self.index_token(&outcome.order);
        }
        Ok(outcome)
    }

    async fn record_order_status(&self, draft: StatusDraft) -> Result<Order, StoreError> {
        let mut orders = self.orders.lock();
        if let Some(existing) = orders.get(draft.merchant_order_id.as_str()) {
            return Ok(reconcile(existing.clone()));
        }
        let order = status_placeholder(&draft);
        orders.insert(order.merchant_order_id.to_string(), order.clone());
        Ok(order)
    }

    async fn mark_order_claimed(&self, args: ClaimRecord) -> Result<Order, StoreError> {
        let existing = self
            .orders
            .lock()
            .get(args.merchant_order_id.as_str())
            .cloned()
            .ok_or_else(|| StoreError::OrderNotFound(args.merchant_order_id.clone()))?;
        let updated = claimed_upsert(&existing, &args)?;
        self.orders
            .lock()
            .insert(updated.merchant_order_id.to_string(), updated.clone());
        Ok(updated)
    }

    async fn mark_gate_validated(
        &self,
        id: &MerchantOrderId,
        used_by: &str,
    ) -> Result<Order, StoreError> {
        let existing = self
            .orders
            .lock()
            .get(id.as_str())
            .cloned()
            .ok_or_else(|| StoreError::OrderNotFound(id.clone()))?;
        let updated = gate_validated_upsert(&existing, used_by)?;
        self.orders
            .lock()
            .insert(updated.merchant_order_id.to_string(), updated.clone());
        Ok(updated)
    }

    async fn mark_token_used_once(
        &self,
        event: EventId,
        token: &TokenId,
        owner: Option<&WalletAddress>,
    ) -> Result<UsedMarker, StoreError> {
        let key = used_ticket_key(event, token);
        let legacy_key = legacy_used_ticket_key(token);
        // One mutex hold makes check-then-insert atomic.
        let mut used = self.used.lock();
        if let Some(record) = used.get(&key) {
            return Ok(UsedMarker {
                already_used: true,
                used_at: record.used_at,
                owner: record.owner.clone(),
            });
        }
        if let Some(record) = used.get(&legacy_key).cloned() {
            // Pre-event-scoping record. Mirror it forward so future
            // lookups hit the scoped key; the legacy key stays.
            used.insert(key, record.clone());
            return Ok(UsedMarker {
                already_used: true,
                used_at: record.used_at,
                owner: record.owner.clone(),
            });
        }
        let record = UsedTicketRecord {
            used_at: Timestamp::now(),
            owner: owner.cloned(),
        };
        used.insert(key, record.clone());
        Ok(UsedMarker {
            already_used: false,
            used_at: record.used_at,
            owner: record.owner,
        })
    }
}
