//! The transfer submission pipeline.
//!
//! ```text
//! CheckingBalance ──(balance < amount)──> AwaitingSmallerAmount ──> CheckingBalance
//!        │                                          └──> Cancelled | InsufficientBalance
//!        v
//! BuildingMessage -> EstimatingFee -> AwaitingConfirmation -> Broadcasting -> Sent
//!                                              └──> Cancelled
//! ```
//!
//! Any error outside the balance shortfall aborts the attempt with
//! [`SubmissionOutcome::Failed`]. Nothing is broadcast before the operator
//! confirms the fee.

use std::sync::Arc;

use log::{debug, info, warn};
use thiserror::Error;
use uuid::Uuid;

use super::fee_estimator::{FeeError, FeeEstimationError, FeeEstimator};
use super::history::{HistoryError, TransactionHistory};
use super::message_builder::{MessageBody, MessageBuildError, MessageBuilder};
use super::request::{SubmissionOutcome, TransferRequest};
use crate::log::{mask_amount, mask_string};
use crate::prompt::{AmountDecision, Operator, PromptError};
use crate::wallet::{OutgoingMessage, SEND_MODE_PAY_FEES_SEPARATELY, WalletClient, WalletError};

pub const DEFAULT_MAX_AMOUNT_RETRIES: u32 = 3;

#[derive(Debug, Error)]
pub enum SubmissionError {
    #[error(transparent)]
    Wallet(#[from] WalletError),

    #[error(transparent)]
    History(#[from] HistoryError),

    #[error(transparent)]
    MessageBuild(#[from] MessageBuildError),

    #[error(transparent)]
    FeeEstimation(#[from] FeeEstimationError),

    #[error(transparent)]
    Fee(#[from] FeeError),

    #[error(transparent)]
    Prompt(#[from] PromptError),
}

enum Shortfall {
    Retry(u64),
    Cancelled,
    GiveUp,
}

/// Drives one transfer from balance check to broadcast.
pub struct TransferSubmitter {
    wallet: Arc<dyn WalletClient>,
    operator: Arc<dyn Operator>,
    estimator: FeeEstimator,
    history: TransactionHistory,
    builder: MessageBuilder,
    max_amount_retries: u32,
}

impl TransferSubmitter {
    pub fn new(
        wallet: Arc<dyn WalletClient>,
        operator: Arc<dyn Operator>,
        estimator: FeeEstimator,
        history: TransactionHistory,
        builder: MessageBuilder,
    ) -> Self {
        Self {
            wallet,
            operator,
            estimator,
            history,
            builder,
            max_amount_retries: DEFAULT_MAX_AMOUNT_RETRIES,
        }
    }

    pub fn with_max_amount_retries(mut self, max_amount_retries: u32) -> Self {
        self.max_amount_retries = max_amount_retries;
        self
    }

    pub async fn submit(&self, request: TransferRequest) -> SubmissionOutcome {
        match self.run(request).await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(error:% = e; "Transfer submission failed");
                SubmissionOutcome::Failed(e)
            },
        }
    }

    async fn run(&self, mut request: TransferRequest) -> Result<SubmissionOutcome, SubmissionError> {
        let mut amount_attempts = 0u32;

        let attempt_id = loop {
            let attempt_id = Uuid::new_v4();
            let height = self.wallet.current_height().await?;
            let balance = self.wallet.current_balance(self.wallet.source_address()).await?;
            info!(
                attempt_id:% = attempt_id,
                height = height,
                balance = &*mask_amount(balance),
                amount = &*mask_amount(request.amount());
                "Checked balance"
            );

            if balance >= request.amount() {
                break attempt_id;
            }

            match self
                .next_smaller_amount(balance, request.amount(), &mut amount_attempts)
                .await?
            {
                Shortfall::Retry(amount) => request = request.with_amount(amount),
                Shortfall::Cancelled => {
                    info!(attempt_id:% = attempt_id; "Transfer cancelled by operator");
                    return Ok(SubmissionOutcome::Cancelled);
                },
                Shortfall::GiveUp => {
                    return Ok(SubmissionOutcome::InsufficientBalance {
                        balance,
                        requested: request.amount(),
                    });
                },
            }
        };

        let destination = self.wallet.parse_address(request.destination())?;
        let body = self.build_body(&request, &destination.to_user_friendly()).await?;

        let fees = self
            .estimator
            .estimate_cell(&destination.to_user_friendly(), body.cell())
            .await?;
        let total_fee = fees.total()?;

        if !self.operator.confirm_fee(&request, &fees, total_fee).await? {
            info!(attempt_id:% = attempt_id; "Transfer cancelled by operator");
            return Ok(SubmissionOutcome::Cancelled);
        }

        let reused_body = body.is_reused();
        let message = OutgoingMessage {
            destination,
            amount: request.amount(),
            bounce: false,
            mode: SEND_MODE_PAY_FEES_SEPARATELY,
            body: body.into_cell(),
        };

        info!(
            attempt_id:% = attempt_id,
            destination = &*mask_string(request.destination()),
            total_fee = total_fee,
            reused_body = reused_body;
            "Broadcasting transfer"
        );
        let hash = self.wallet.broadcast_and_await_hash(vec![message]).await?;
        info!(attempt_id:% = attempt_id, hash:% = hash; "Transfer sent");

        Ok(SubmissionOutcome::Sent(hash))
    }

    /// Asks the operator for a strictly smaller amount. Every answer counts
    /// against the retry budget, including rejected ones.
    async fn next_smaller_amount(
        &self,
        balance: u64,
        requested: u64,
        attempts: &mut u32,
    ) -> Result<Shortfall, SubmissionError> {
        if !self.operator.is_interactive() {
            return Ok(Shortfall::GiveUp);
        }

        while *attempts < self.max_amount_retries {
            *attempts += 1;
            match self.operator.smaller_amount(balance, requested).await? {
                AmountDecision::Cancel => return Ok(Shortfall::Cancelled),
                AmountDecision::Retry(amount) if amount < requested => return Ok(Shortfall::Retry(amount)),
                AmountDecision::Retry(amount) => {
                    warn!(
                        attempt = *attempts,
                        offered = &*mask_amount(amount);
                        "Offered amount is not smaller than the previous one"
                    );
                },
            }
        }

        Ok(Shortfall::GiveUp)
    }

    async fn build_body(&self, request: &TransferRequest, destination: &str) -> Result<MessageBody, SubmissionError> {
        if let Some(pending) = self.history.pending_body(destination).await? {
            debug!("Reusing body of the last transaction");
            return Ok(self.builder.reuse_pending_body(&pending)?);
        }
        Ok(self.builder.build_comment_body(request.effective_comment())?)
    }
}
