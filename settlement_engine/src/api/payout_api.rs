use log::{info, warn};
use lps_common::Reais;

use crate::{
    api::SettlementConfig,
    db_types::WithdrawalRequest,
    helpers::{withdrawal_description, withdrawal_id_from_description},
    traits::{
        LedgerManagement,
        PayoutOutcome,
        PayoutProvider,
        PayoutRequest,
        ReplayOutcome,
        SettlementDatabase,
        SettlementError,
        TransferEvent,
        WithdrawalResolution,
    },
};

/// The withdrawal state machine, driven against the payout provider.
///
/// A withdrawal moves money in two steps: funds are reserved (available to blocked) before the provider is
/// called, and only a definitive provider answer releases or returns them. Ambiguous answers, transport
/// errors included, leave the reservation in place for a transfer-status callback or an operator to
/// resolve.
pub struct PayoutApi<B, P> {
    db: B,
    provider: P,
    config: SettlementConfig,
}

impl<B, P> PayoutApi<B, P>
where
    B: SettlementDatabase + LedgerManagement,
    P: PayoutProvider,
{
    pub fn new(db: B, provider: P, config: SettlementConfig) -> Self {
        Self { db, provider, config }
    }

    /// Opens a withdrawal for a seller and immediately attempts the payout. The returned request reflects
    /// the state after the attempt: `Processed` on success, `Failed` on a definitive rejection, `Pending`
    /// when the provider's answer did not settle the matter.
    pub async fn request_withdrawal(&self, seller_id: &str, amount: Reais) -> Result<WithdrawalRequest, SettlementError> {
        if amount < self.config.min_withdrawal {
            return Err(SettlementError::BelowMinimumWithdrawal { requested: amount, minimum: self.config.min_withdrawal });
        }
        let Some(seller) = self.db.fetch_seller(seller_id).await? else {
            return Err(SettlementError::SellerNotFound(seller_id.to_string()));
        };
        let Some(payout_key) = seller.payout_key.filter(|k| !k.trim().is_empty()) else {
            return Err(SettlementError::PayoutKeyMissing(seller_id.to_string()));
        };
        let request = self.db.reserve_withdrawal(seller_id, amount, &payout_key).await?;
        self.execute_payout(request).await
    }

    /// Re-opens a `Failed` withdrawal and attempts the payout again.
    pub async fn retry_withdrawal(&self, withdrawal_id: &str) -> Result<WithdrawalRequest, SettlementError> {
        let request = self.db.reblock_failed_withdrawal(withdrawal_id).await?;
        info!("💸️ Retrying withdrawal {withdrawal_id}");
        self.execute_payout(request).await
    }

    /// Routes a transfer-status callback from the payout provider. Only failure events change anything:
    /// the matching withdrawal is reverted and the reserved funds returned. Returns `None` for events on
    /// transfers that did not originate from a withdrawal here.
    pub async fn handle_transfer_event(&self, event: &TransferEvent) -> Result<Option<WithdrawalResolution>, SettlementError> {
        if !event.event.is_failure() {
            return Ok(None);
        }
        let Some(withdrawal_id) = event.transfer.description.as_deref().and_then(withdrawal_id_from_description)
        else {
            info!("💸️ Transfer {} does not reference a withdrawal here. Event ignored", event.transfer.id);
            return Ok(None);
        };
        let reason = event
            .transfer
            .fail_reason
            .clone()
            .unwrap_or_else(|| format!("Provider reported {:?} for transfer {}", event.event, event.transfer.id));
        let resolution = self.db.revert_withdrawal(withdrawal_id, &reason).await?;
        Ok(Some(resolution))
    }

    /// Credits all parked transfers for a seller that has since configured a payout destination.
    pub async fn replay_pending_transfers(&self, seller_id: &str) -> Result<ReplayOutcome, SettlementError> {
        self.db.replay_pending_transfers(seller_id).await
    }

    async fn execute_payout(&self, request: WithdrawalRequest) -> Result<WithdrawalRequest, SettlementError> {
        let payout = PayoutRequest {
            withdrawal_id: request.id.clone(),
            seller_id: request.seller_id.clone(),
            amount: request.amount,
            payout_key: request.payout_key.clone(),
            description: withdrawal_description(&request.id),
        };
        let resolution = match self.provider.send_payout(&payout).await {
            Ok(PayoutOutcome::Succeeded { provider_id }) => {
                let note = match provider_id {
                    Some(id) => format!("Transfer accepted by provider ({id})"),
                    None => "Transfer accepted by provider".to_string(),
                };
                self.db.finalize_withdrawal(&request.id, &note).await?
            },
            Ok(PayoutOutcome::Rejected { reason }) => {
                warn!("💸️ Provider rejected withdrawal {}: {reason}", request.id);
                self.db.revert_withdrawal(&request.id, &reason).await?
            },
            Ok(PayoutOutcome::ManualInterventionRequired) => {
                warn!("💸️ Withdrawal {} needs manual intervention at the provider. Funds stay reserved", request.id);
                self.db.annotate_withdrawal(&request.id, "Manual intervention required at the payout provider").await?;
                return self.refetch(request).await;
            },
            Err(e) => {
                // The transfer may or may not exist at the provider. The reservation stays until a
                // transfer-status callback or an operator resolves it.
                warn!("💸️ Payout attempt for withdrawal {} is unresolved: {e}", request.id);
                self.db.annotate_withdrawal(&request.id, &format!("Awaiting provider confirmation: {e}")).await?;
                return self.refetch(request).await;
            },
        };
        match resolution {
            WithdrawalResolution::Resolved(r) | WithdrawalResolution::AlreadyResolved(r) => Ok(r),
            WithdrawalResolution::NotFound(id) => Err(SettlementError::WithdrawalNotFound(id)),
        }
    }

    async fn refetch(&self, request: WithdrawalRequest) -> Result<WithdrawalRequest, SettlementError> {
        let refreshed = self
            .db
            .fetch_withdrawal(&request.id)
            .await
            .map_err(|e| SettlementError::DatabaseError(e.to_string()))?;
        Ok(refreshed.unwrap_or(request))
    }
}
