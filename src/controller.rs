//! Swap loop controller.
//!
//! Swaps back and forth between asset A and asset B on one pool until a fixed
//! number of attempts has been made. Every attempt (success, failure or skip)
//! counts toward the target and flips the direction for the next one. When the
//! asset A balance drops below the configured minimum, the current attempt is
//! forced to B->A without touching the alternation state.

use crate::chain::{ChainClient, TxOutcome};
use crate::config::SwapLoopConfig;
use crate::errors::{AppError, Result};
use crate::exchange::{ExchangeService, Quote};
use crate::models::{
    AttemptOutcome, AttemptRecord, FailureStage, PoolSpec, RunState, SwapDirection,
};
use crate::notifier::Notifier;
use crate::utils::{from_base_units, min_amount_out, to_base_units};
use bigdecimal::BigDecimal;
use ethers::types::{Address, TxHash, U256};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Loop parameters with every amount already in base units.
#[derive(Debug, Clone)]
pub struct SwapPolicy {
    pub pool: PoolSpec,
    pub token_a: Address,
    pub token_b: Address,
    pub token_a_decimals: u8,
    pub token_b_decimals: u8,
    pub target_attempts: u32,
    /// A->B is skipped in favour of B->A below this asset A balance.
    pub min_balance_a: U256,
    /// Asset A kept back from every A->B swap.
    pub reserve_a: U256,
    pub slippage: BigDecimal,
    pub loop_delay: Duration,
    pub notify_each_attempt: bool,
}

impl SwapPolicy {
    pub fn from_config(config: &SwapLoopConfig) -> Result<Self> {
        let scale = |key: &str, amount: &BigDecimal| {
            to_base_units(amount, config.token_a_decimals)
                .map_err(|e| AppError::Config(format!("{key}: {e}")))
        };
        Ok(Self {
            pool: config.pool,
            token_a: config.token_a,
            token_b: config.token_b,
            token_a_decimals: config.token_a_decimals,
            token_b_decimals: config.token_b_decimals,
            target_attempts: config.target_attempts,
            min_balance_a: scale("MIN_BALANCE_A", &config.min_balance_a)?,
            reserve_a: scale("RESERVE_A", &config.reserve_a)?,
            slippage: config.slippage.clone(),
            loop_delay: config.loop_delay,
            notify_each_attempt: config.notify_each_attempt,
        })
    }

    fn input_decimals(&self, direction: SwapDirection) -> u8 {
        match direction {
            SwapDirection::AToB => self.token_a_decimals,
            SwapDirection::BToA => self.token_b_decimals,
        }
    }
}

pub struct SwapLoopController {
    chain: Arc<dyn ChainClient>,
    exchange: Arc<dyn ExchangeService>,
    notifier: Arc<dyn Notifier>,
    policy: SwapPolicy,
    account: Address,
    state: RunState,
}

impl SwapLoopController {
    pub fn new(
        policy: SwapPolicy,
        chain: Arc<dyn ChainClient>,
        exchange: Arc<dyn ExchangeService>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let account = chain.account();
        Self {
            chain,
            exchange,
            notifier,
            policy,
            account,
            state: RunState::new(),
        }
    }

    pub fn state(&self) -> &RunState {
        &self.state
    }

    /// Run until `target_attempts` attempts have been made, then send the summary.
    pub async fn run(mut self) -> RunState {
        info!(
            target_attempts = self.policy.target_attempts,
            account = ?self.account,
            pool = ?self.policy.pool.address,
            "[SWAP] loop starting"
        );
        self.notifier
            .notify(&format!(
                "Swap loop started: {} attempts on pool {:?}",
                self.policy.target_attempts, self.policy.pool.address
            ))
            .await;

        while self.state.attempts_total < self.policy.target_attempts {
            let record = self.run_attempt().await;
            if self.policy.notify_each_attempt {
                self.notifier.notify(&self.describe(&record)).await;
            }
            if self.state.attempts_total < self.policy.target_attempts {
                tokio::time::sleep(self.policy.loop_delay).await;
            }
        }

        let summary = self.state.summary_message();
        info!(
            attempts = self.state.attempts_total,
            successes = self.state.success_count,
            failures = self.state.failure_count,
            skipped = self.state.skipped_count,
            balance_read_failures = self.state.balance_read_failures,
            "[SUMMARY] loop finished"
        );
        self.notifier.notify(&summary).await;
        self.state
    }

    /// One iteration: resolve direction, size, quote, execute, record.
    pub async fn run_attempt(&mut self) -> AttemptRecord {
        let index = self.state.attempts_total + 1;
        let balance_a = self.read_balance(self.policy.token_a).await;
        let direction = self.resolve_direction(balance_a);

        let amount_in = match direction {
            SwapDirection::AToB => balance_a.saturating_sub(self.policy.reserve_a),
            SwapDirection::BToA => self.read_balance(self.policy.token_b).await,
        };

        let outcome = if amount_in.is_zero() {
            AttemptOutcome::Skipped {
                reason: format!("nothing to swap {direction}"),
            }
        } else {
            self.execute_swap(direction, amount_in).await
        };

        self.state.record(direction, &outcome);
        let record = AttemptRecord {
            index,
            direction,
            amount_in,
            outcome,
        };
        self.log_attempt(&record);
        record
    }

    fn resolve_direction(&self, balance_a: U256) -> SwapDirection {
        if balance_a < self.policy.min_balance_a {
            if self.state.current_direction != SwapDirection::BToA {
                info!(
                    balance_a = %from_base_units(balance_a, self.policy.token_a_decimals),
                    "[SWAP] asset A below minimum, forcing B->A"
                );
            }
            return SwapDirection::BToA;
        }
        self.state.current_direction
    }

    /// Balance of `asset` for the loop account; a failed read counts as zero.
    async fn read_balance(&mut self, asset: Address) -> U256 {
        match self.chain.get_balance(self.account, asset).await {
            Ok(balance) => balance,
            Err(e) => {
                self.state.balance_read_failures += 1;
                warn!(error = %e, ?asset, "[SWAP] balance read failed, treating as zero");
                U256::zero()
            }
        }
    }

    async fn execute_swap(&self, direction: SwapDirection, amount_in: U256) -> AttemptOutcome {
        let quote = match self
            .exchange
            .get_quote(&self.policy.pool, amount_in, direction)
            .await
        {
            Ok(quote) => quote,
            Err(e) => {
                return AttemptOutcome::Failure {
                    stage: FailureStage::Quote,
                    reason: e.to_string(),
                };
            }
        };

        match self.submit_swap(direction, &quote).await {
            Ok(tx_hash) => AttemptOutcome::Success { tx_hash },
            Err(e) => AttemptOutcome::Failure {
                stage: FailureStage::Transaction,
                reason: e.to_string(),
            },
        }
    }

    async fn submit_swap(&self, direction: SwapDirection, quote: &Quote) -> Result<TxHash> {
        let min_out = min_amount_out(quote.amount_out, &self.policy.slippage)?;
        let (token_in, token_out) = direction.token_indices(&self.policy.pool);
        let payload = self.exchange.build_swap_payload(
            &self.policy.pool,
            token_in,
            token_out,
            quote.amount_in,
            min_out,
        )?;

        let tx = self.chain.build_transaction(&payload).await?;
        let signed = self.chain.sign(&tx).await?;
        let hash = self.chain.submit(&signed).await?;
        info!(
            %direction,
            quoted_out = %quote.amount_out,
            %min_out,
            ?hash,
            "[SWAP] submitted"
        );

        match self.chain.wait_for_confirmation(hash).await? {
            TxOutcome::Confirmed { .. } => Ok(hash),
            TxOutcome::Reverted { block } => Err(AppError::Transaction(format!(
                "{hash:?} reverted (block {block:?})"
            ))),
        }
    }

    fn log_attempt(&self, record: &AttemptRecord) {
        let amount = from_base_units(
            record.amount_in,
            self.policy.input_decimals(record.direction),
        );
        match &record.outcome {
            AttemptOutcome::Success { tx_hash } => info!(
                attempt = record.index,
                direction = %record.direction,
                %amount,
                ?tx_hash,
                "[SWAP] confirmed"
            ),
            AttemptOutcome::Failure { stage, reason } => warn!(
                attempt = record.index,
                direction = %record.direction,
                %amount,
                ?stage,
                %reason,
                "[SWAP] failed"
            ),
            AttemptOutcome::Skipped { reason } => info!(
                attempt = record.index,
                direction = %record.direction,
                %reason,
                "[SWAP] skipped"
            ),
        }
    }

    fn describe(&self, record: &AttemptRecord) -> String {
        let amount = from_base_units(
            record.amount_in,
            self.policy.input_decimals(record.direction),
        );
        let head = format!(
            "Swap {}/{} {} {}",
            record.index, self.policy.target_attempts, record.direction, amount
        );
        match &record.outcome {
            AttemptOutcome::Success { tx_hash } => format!("{head}: confirmed {tx_hash:?}"),
            AttemptOutcome::Failure { reason, .. } => format!("{head}: failed ({reason})"),
            AttemptOutcome::Skipped { reason } => format!("{head}: skipped ({reason})"),
        }
    }
}
