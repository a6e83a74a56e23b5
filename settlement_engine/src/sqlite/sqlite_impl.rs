use std::collections::BTreeMap;

use log::{debug, info, warn};
use lps_common::Reais;
use sqlx::SqlitePool;

use crate::{
    db_types::{
        Balance,
        LedgerEntry,
        LedgerEntryKind,
        LedgerEntryStatus,
        NewOrder,
        Order,
        OrderId,
        OrderItem,
        OrderStatusType,
        PendingTransfer,
        Seller,
        WithdrawalRequest,
    },
    helpers::{object_id, seller_share, withdrawal_description, CommissionRate},
    sqlite::db,
    traits::{
        CancellationOutcome,
        LedgerError,
        LedgerManagement,
        PaymentConfirmation,
        RefundOutcome,
        RefundSummary,
        ReplayOutcome,
        SellerCredit,
        SettlementDatabase,
        SettlementError,
        SettlementSummary,
        WithdrawalResolution,
    },
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl SqliteDatabase {
    /// Connects to the database at `LPS_DATABASE_URL` (or the default path) and applies pending
    /// migrations.
    pub async fn new(max_connections: u32) -> Result<Self, SettlementError> {
        let url = db::db_url();
        Self::new_with_url(&url, max_connections).await
    }

    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, SettlementError> {
        let pool = db::new_pool(url, max_connections).await?;
        db::run_migrations(&pool).await.map_err(|e| SettlementError::DatabaseError(e.to_string()))?;
        Ok(Self { url: url.to_string(), pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Groups the post-commission share of each item by seller, preserving the per-item breakdown for
    /// ledger descriptions.
    fn shares_by_seller(items: &[OrderItem], rate: CommissionRate) -> BTreeMap<String, Vec<(Reais, String)>> {
        let mut shares: BTreeMap<String, Vec<(Reais, String)>> = BTreeMap::new();
        for item in items {
            let share = seller_share(item.price_paid, rate);
            shares
                .entry(item.seller_id.clone())
                .or_default()
                .push((share, format!("Sale of \"{}\"", item.photo_title)));
        }
        shares
    }
}

impl SettlementDatabase for SqliteDatabase {
    fn url(&self) -> &str {
        self.url.as_str()
    }

    async fn create_order(&self, order: NewOrder) -> Result<Order, SettlementError> {
        let mut tx = self.pool.begin().await?;
        let order = db::orders::insert_order(order, &mut tx).await?;
        tx.commit().await?;
        Ok(order)
    }

    async fn attach_payment_intent(&self, order_id: &OrderId, payment_id: &str) -> Result<Order, SettlementError> {
        let mut conn = self.pool.acquire().await?;
        let order = db::orders::attach_payment_id(order_id, payment_id, &mut conn).await?;
        debug!("📝️ Payment id {payment_id} attached to order {order_id}");
        Ok(order)
    }

    async fn confirm_payment(
        &self,
        payment_id: &str,
        rate: CommissionRate,
    ) -> Result<PaymentConfirmation, SettlementError> {
        let mut tx = self.pool.begin().await?;
        let Some(order) = db::orders::fetch_order_by_payment_id(payment_id, &mut tx).await? else {
            return Ok(PaymentConfirmation::OrderNotFound);
        };
        if order.status == OrderStatusType::Paid {
            debug!("💰️ Payment {payment_id} for order {} replayed. Order is already {}", order.id, order.status);
            return Ok(PaymentConfirmation::AlreadyProcessed(order.id));
        }
        let Some(order) = db::orders::mark_paid(payment_id, &mut tx).await? else {
            return Ok(PaymentConfirmation::AlreadyProcessed(order.id));
        };
        let items = db::orders::fetch_order_items(&order.id, &mut tx).await?;
        let mut credits = Vec::new();
        for (seller_id, item_shares) in Self::shares_by_seller(&items, rate) {
            let amount: Reais = item_shares.iter().map(|(share, _)| *share).sum();
            let seller = db::sellers::fetch(&seller_id, &mut tx).await?;
            let has_key = seller.map(|s| s.has_payout_key()).unwrap_or(false);
            if has_key {
                for (share, description) in &item_shares {
                    db::ledger::insert_entry(
                        &seller_id,
                        LedgerEntryKind::Sale,
                        *share,
                        description,
                        None,
                        LedgerEntryStatus::Processed,
                        &mut tx,
                    )
                    .await?;
                }
                db::balances::adjust_available(&seller_id, amount, &mut tx).await?;
                debug!("💰️ Credited {amount} to seller {seller_id} for order {}", order.id);
            } else {
                let description = format!("Sale credit for order {}", order.id);
                db::pending_transfers::insert(&seller_id, amount, payment_id, &order.id, &description, &mut tx)
                    .await?;
                info!(
                    "💰️ Seller {seller_id} has no payout destination. Parked {amount} for order {} as a pending \
                     transfer",
                    order.id
                );
            }
            credits.push(SellerCredit { seller_id, amount, deferred: !has_key });
        }
        tx.commit().await?;
        info!("💰️ Order {} settled. {} seller(s) credited for payment {payment_id}", order.id, credits.len());
        Ok(PaymentConfirmation::Settled(SettlementSummary { order, credits }))
    }

    async fn cancel_payment(&self, payment_id: &str) -> Result<CancellationOutcome, SettlementError> {
        let mut tx = self.pool.begin().await?;
        let Some(order) = db::orders::fetch_order_by_payment_id(payment_id, &mut tx).await? else {
            return Ok(CancellationOutcome::OrderNotFound);
        };
        let outcome = match db::orders::mark_cancelled(payment_id, &mut tx).await? {
            Some(order) => {
                info!("📝️ Order {} cancelled for payment {payment_id}", order.id);
                CancellationOutcome::Cancelled(order.id)
            },
            None => CancellationOutcome::NotCancellable(order.id),
        };
        tx.commit().await?;
        Ok(outcome)
    }

    async fn process_refund(&self, payment_id: &str, rate: CommissionRate) -> Result<RefundOutcome, SettlementError> {
        let mut tx = self.pool.begin().await?;
        let Some(order) = db::orders::fetch_order_by_payment_id(payment_id, &mut tx).await? else {
            return Ok(RefundOutcome::OrderNotFound);
        };
        if order.status != OrderStatusType::Paid {
            return Ok(RefundOutcome::NotPaid(order.id));
        }
        let Some(order) = db::orders::stamp_refunded(&order.id, &mut tx).await? else {
            debug!("💰️ Refund for payment {payment_id} replayed. Order {} is already refunded", order.id);
            return Ok(RefundOutcome::AlreadyRefunded(order.id));
        };
        let items = db::orders::fetch_order_items(&order.id, &mut tx).await?;
        let mut reversals = Vec::new();
        for (seller_id, item_shares) in Self::shares_by_seller(&items, rate) {
            let amount: Reais = item_shares.iter().map(|(share, _)| *share).sum();
            // Credits that are still parked as pending transfers are voided instead of clawed back.
            let mut voided = Reais::zero();
            for parked in db::pending_transfers::fetch_unprocessed_for_order(&seller_id, &order.id, &mut tx).await? {
                if db::pending_transfers::mark_processed(parked.id, &mut tx).await? {
                    voided += parked.amount;
                }
            }
            let clawback = amount - voided;
            if clawback > Reais::zero() {
                let balance = db::balances::adjust_available(&seller_id, -clawback, &mut tx).await?;
                db::ledger::insert_entry(
                    &seller_id,
                    LedgerEntryKind::Refund,
                    -clawback,
                    &format!("Refund for order {}", order.id),
                    None,
                    LedgerEntryStatus::Processed,
                    &mut tx,
                )
                .await?;
                if balance.available.is_negative() {
                    warn!(
                        "💰️ Refund for order {} left seller {seller_id} with a negative available balance of {}",
                        order.id, balance.available
                    );
                }
            }
            reversals.push(SellerCredit { seller_id, amount, deferred: voided == amount });
        }
        let refunded_at = order.refunded_at.unwrap_or_else(chrono::Utc::now);
        tx.commit().await?;
        info!("💰️ Order {} refunded. {} seller credit(s) reversed", order.id, reversals.len());
        Ok(RefundOutcome::Refunded(RefundSummary { order_id: order.id, refunded_at, reversals }))
    }

    async fn upsert_seller(&self, seller_id: &str, payout_key: Option<&str>) -> Result<Seller, SettlementError> {
        let mut tx = self.pool.begin().await?;
        let seller = db::sellers::upsert(seller_id, payout_key, &mut tx).await?;
        db::balances::ensure_balance(seller_id, &mut tx).await?;
        tx.commit().await?;
        Ok(seller)
    }

    async fn fetch_seller(&self, seller_id: &str) -> Result<Option<Seller>, SettlementError> {
        let mut conn = self.pool.acquire().await?;
        let seller = db::sellers::fetch(seller_id, &mut conn).await?;
        Ok(seller)
    }

    async fn reserve_withdrawal(
        &self,
        seller_id: &str,
        amount: Reais,
        payout_key: &str,
    ) -> Result<WithdrawalRequest, SettlementError> {
        if amount <= Reais::zero() {
            return Err(SettlementError::InvalidAmount(amount));
        }
        let mut tx = self.pool.begin().await?;
        let Some(balance) = db::balances::move_available_to_blocked(seller_id, amount, &mut tx).await? else {
            return Err(SettlementError::InsufficientFunds {
                seller_id: seller_id.to_string(),
                requested: amount,
                available: Reais::zero(),
            });
        };
        if balance.available.is_negative() {
            // Dropping the transaction rolls the reservation back.
            return Err(SettlementError::InsufficientFunds {
                seller_id: seller_id.to_string(),
                requested: amount,
                available: balance.available + amount,
            });
        }
        let id = object_id("wd");
        let request = db::withdrawals::insert_request(&id, seller_id, amount, payout_key, &mut tx).await?;
        db::ledger::insert_entry(
            seller_id,
            LedgerEntryKind::Withdrawal,
            -amount,
            &withdrawal_description(&id),
            Some(&id),
            LedgerEntryStatus::Pending,
            &mut tx,
        )
        .await?;
        tx.commit().await?;
        info!("💸️ Withdrawal {id} opened. {amount} reserved for seller {seller_id}");
        Ok(request)
    }

    async fn finalize_withdrawal(
        &self,
        withdrawal_id: &str,
        note: &str,
    ) -> Result<WithdrawalResolution, SettlementError> {
        let mut tx = self.pool.begin().await?;
        let Some(request) = db::withdrawals::mark_processed(withdrawal_id, note, &mut tx).await? else {
            return match db::withdrawals::fetch_request(withdrawal_id, &mut tx).await? {
                Some(request) => {
                    debug!("💸️ Withdrawal {withdrawal_id} is already {}. Finalization skipped", request.status);
                    Ok(WithdrawalResolution::AlreadyResolved(request))
                },
                None => Ok(WithdrawalResolution::NotFound(withdrawal_id.to_string())),
            };
        };
        db::balances::release_blocked(&request.seller_id, request.amount, &mut tx).await?;
        db::ledger::update_status_for_withdrawal(withdrawal_id, LedgerEntryStatus::Processed, &mut tx).await?;
        tx.commit().await?;
        info!("💸️ Withdrawal {withdrawal_id} processed. {} paid out to seller {}", request.amount, request.seller_id);
        Ok(WithdrawalResolution::Resolved(request))
    }

    async fn revert_withdrawal(
        &self,
        withdrawal_id: &str,
        reason: &str,
    ) -> Result<WithdrawalResolution, SettlementError> {
        let mut tx = self.pool.begin().await?;
        let Some(request) = db::withdrawals::mark_failed(withdrawal_id, reason, &mut tx).await? else {
            return match db::withdrawals::fetch_request(withdrawal_id, &mut tx).await? {
                Some(request) => {
                    debug!("💸️ Withdrawal {withdrawal_id} is already {}. Revert skipped", request.status);
                    Ok(WithdrawalResolution::AlreadyResolved(request))
                },
                None => Ok(WithdrawalResolution::NotFound(withdrawal_id.to_string())),
            };
        };
        db::balances::return_blocked_to_available(&request.seller_id, request.amount, &mut tx).await?;
        db::ledger::update_status_for_withdrawal(withdrawal_id, LedgerEntryStatus::Failed, &mut tx).await?;
        tx.commit().await?;
        info!(
            "💸️ Withdrawal {withdrawal_id} failed ({reason}). {} returned to seller {}",
            request.amount, request.seller_id
        );
        Ok(WithdrawalResolution::Resolved(request))
    }

    async fn annotate_withdrawal(&self, withdrawal_id: &str, note: &str) -> Result<(), SettlementError> {
        let mut conn = self.pool.acquire().await?;
        let rows = db::withdrawals::set_note(withdrawal_id, note, &mut conn).await?;
        if rows == 0 {
            return Err(SettlementError::WithdrawalNotFound(withdrawal_id.to_string()));
        }
        Ok(())
    }

    async fn reblock_failed_withdrawal(&self, withdrawal_id: &str) -> Result<WithdrawalRequest, SettlementError> {
        let mut tx = self.pool.begin().await?;
        let Some(request) = db::withdrawals::fetch_request(withdrawal_id, &mut tx).await? else {
            return Err(SettlementError::WithdrawalNotFound(withdrawal_id.to_string()));
        };
        if request.status != crate::db_types::WithdrawalStatus::Failed {
            return Err(SettlementError::WithdrawalNotRetryable {
                id: withdrawal_id.to_string(),
                status: request.status.to_string(),
            });
        }
        let Some(balance) =
            db::balances::move_available_to_blocked(&request.seller_id, request.amount, &mut tx).await?
        else {
            return Err(SettlementError::InsufficientFunds {
                seller_id: request.seller_id,
                requested: request.amount,
                available: Reais::zero(),
            });
        };
        if balance.available.is_negative() {
            return Err(SettlementError::InsufficientFunds {
                seller_id: request.seller_id,
                requested: request.amount,
                available: balance.available + request.amount,
            });
        }
        let Some(request) = db::withdrawals::reopen(withdrawal_id, &mut tx).await? else {
            return Err(SettlementError::WithdrawalNotRetryable {
                id: withdrawal_id.to_string(),
                status: request.status.to_string(),
            });
        };
        db::ledger::update_status_for_withdrawal(withdrawal_id, LedgerEntryStatus::Pending, &mut tx).await?;
        tx.commit().await?;
        info!("💸️ Withdrawal {withdrawal_id} re-opened. {} re-reserved for seller {}", request.amount, request.seller_id);
        Ok(request)
    }

    async fn replay_pending_transfers(&self, seller_id: &str) -> Result<ReplayOutcome, SettlementError> {
        let mut tx = self.pool.begin().await?;
        let Some(seller) = db::sellers::fetch(seller_id, &mut tx).await? else {
            return Err(SettlementError::SellerNotFound(seller_id.to_string()));
        };
        if !seller.has_payout_key() {
            return Err(SettlementError::PayoutKeyMissing(seller_id.to_string()));
        }
        let parked = db::pending_transfers::fetch_unprocessed(seller_id, &mut tx).await?;
        let mut replayed = 0usize;
        let mut credited = Reais::zero();
        for transfer in parked {
            if !db::pending_transfers::mark_processed(transfer.id, &mut tx).await? {
                continue;
            }
            db::balances::adjust_available(seller_id, transfer.amount, &mut tx).await?;
            db::ledger::insert_entry(
                seller_id,
                LedgerEntryKind::Sale,
                transfer.amount,
                &transfer.description,
                None,
                LedgerEntryStatus::Processed,
                &mut tx,
            )
            .await?;
            replayed += 1;
            credited += transfer.amount;
        }
        tx.commit().await?;
        if replayed > 0 {
            info!("🔄️ Replayed {replayed} parked transfer(s) for seller {seller_id}, crediting {credited}");
        }
        Ok(ReplayOutcome { seller_id: seller_id.to_string(), replayed, credited })
    }

    async fn close(&mut self) -> Result<(), SettlementError> {
        self.pool.close().await;
        Ok(())
    }
}

impl LedgerManagement for SqliteDatabase {
    async fn fetch_balance(&self, seller_id: &str) -> Result<Option<Balance>, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        let balance = db::balances::fetch_balance(seller_id, &mut conn).await?;
        Ok(balance)
    }

    async fn fetch_ledger(&self, seller_id: &str) -> Result<Vec<LedgerEntry>, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        let entries = db::ledger::fetch_ledger(seller_id, &mut conn).await?;
        Ok(entries)
    }

    async fn fetch_withdrawal(&self, withdrawal_id: &str) -> Result<Option<WithdrawalRequest>, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        let request = db::withdrawals::fetch_request(withdrawal_id, &mut conn).await?;
        Ok(request)
    }

    async fn pending_withdrawal_total(&self, seller_id: &str) -> Result<Reais, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        let total = db::withdrawals::pending_total(seller_id, &mut conn).await?;
        Ok(total)
    }

    async fn fetch_pending_transfers(&self, seller_id: &str) -> Result<Vec<PendingTransfer>, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        let transfers = db::pending_transfers::fetch_unprocessed(seller_id, &mut conn).await?;
        Ok(transfers)
    }

    async fn fetch_order(&self, order_id: &OrderId) -> Result<Option<Order>, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        let order = db::orders::fetch_order_by_order_id(order_id, &mut conn).await?;
        Ok(order)
    }

    async fn fetch_order_by_payment_id(&self, payment_id: &str) -> Result<Option<Order>, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        let order = db::orders::fetch_order_by_payment_id(payment_id, &mut conn).await?;
        Ok(order)
    }

    async fn fetch_order_items(&self, order_id: &OrderId) -> Result<Vec<OrderItem>, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        let items = db::orders::fetch_order_items(order_id, &mut conn).await?;
        Ok(items)
    }
}
