//! Shared data structures used throughout the application.

use ethers::types::{Address, TxHash, U256};
use std::fmt;

/// Direction of a single swap on the pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwapDirection {
    /// Primary asset (A) in → secondary asset (B) out
    AToB,
    /// Secondary asset (B) in → primary asset (A) out
    BToA,
}

impl SwapDirection {
    pub fn opposite(self) -> Self {
        match self {
            SwapDirection::AToB => SwapDirection::BToA,
            SwapDirection::BToA => SwapDirection::AToB,
        }
    }

    /// `(token_in, token_out)` pool indices for this direction.
    pub fn token_indices(self, pool: &PoolSpec) -> (i128, i128) {
        match self {
            SwapDirection::AToB => (pool.token_a_index, pool.token_b_index),
            SwapDirection::BToA => (pool.token_b_index, pool.token_a_index),
        }
    }
}

impl fmt::Display for SwapDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SwapDirection::AToB => f.write_str("A->B"),
            SwapDirection::BToA => f.write_str("B->A"),
        }
    }
}

/// Liquidity pool and the index of each traded asset inside it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolSpec {
    pub address: Address,
    pub token_a_index: i128,
    pub token_b_index: i128,
}

/// Step of the attempt that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureStage {
    Quote,
    Transaction,
}

/// Result of one loop iteration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    Success { tx_hash: TxHash },
    Failure { stage: FailureStage, reason: String },
    Skipped { reason: String },
}

impl AttemptOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, AttemptOutcome::Success { .. })
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, AttemptOutcome::Skipped { .. })
    }
}

/// One finished attempt, as reported by the controller.
#[derive(Debug, Clone)]
pub struct AttemptRecord {
    /// 1-based attempt number.
    pub index: u32,
    /// Direction actually used, after the balance threshold override.
    pub direction: SwapDirection,
    /// Raw input amount in the smallest unit of the input asset.
    pub amount_in: U256,
    pub outcome: AttemptOutcome,
}

/// Mutable counters owned by the controller for one run.
///
/// `attempts_total == success_count + failure_count + skipped_count` holds after every
/// call to [`RunState::record`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunState {
    pub attempts_total: u32,
    pub success_count: u32,
    pub failure_count: u32,
    pub skipped_count: u32,
    /// Balance reads that failed and were treated as zero.
    pub balance_read_failures: u32,
    pub current_direction: SwapDirection,
}

impl Default for RunState {
    fn default() -> Self {
        Self::new()
    }
}

impl RunState {
    pub fn new() -> Self {
        Self {
            attempts_total: 0,
            success_count: 0,
            failure_count: 0,
            skipped_count: 0,
            balance_read_failures: 0,
            current_direction: SwapDirection::AToB,
        }
    }

    /// Count an attempt and flip away from the direction it used.
    pub fn record(&mut self, used: SwapDirection, outcome: &AttemptOutcome) {
        self.attempts_total += 1;
        match outcome {
            AttemptOutcome::Success { .. } => self.success_count += 1,
            AttemptOutcome::Failure { .. } => self.failure_count += 1,
            AttemptOutcome::Skipped { .. } => self.skipped_count += 1,
        }
        self.current_direction = used.opposite();
    }

    pub fn summary_message(&self) -> String {
        format!(
            "Swap loop finished: attempts={} successes={} failures={} skipped={}",
            self.attempts_total, self.success_count, self.failure_count, self.skipped_count
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_flips_relative_to_used_direction() {
        let mut state = RunState::new();
        assert_eq!(state.current_direction, SwapDirection::AToB);

        // forced B->A while the inherited direction was A->B
        state.record(
            SwapDirection::BToA,
            &AttemptOutcome::Skipped {
                reason: "empty".into(),
            },
        );
        assert_eq!(state.current_direction, SwapDirection::AToB);
        assert_eq!(state.skipped_count, 1);

        state.record(
            SwapDirection::AToB,
            &AttemptOutcome::Failure {
                stage: FailureStage::Quote,
                reason: "no quote".into(),
            },
        );
        assert_eq!(state.current_direction, SwapDirection::BToA);
        assert_eq!(
            state.attempts_total,
            state.success_count + state.failure_count + state.skipped_count
        );
    }

    #[test]
    fn token_indices_follow_direction() {
        let pool = PoolSpec {
            address: Address::zero(),
            token_a_index: 0,
            token_b_index: 2,
        };
        assert_eq!(SwapDirection::AToB.token_indices(&pool), (0, 2));
        assert_eq!(SwapDirection::BToA.token_indices(&pool), (2, 0));
        assert_eq!(SwapDirection::AToB.opposite(), SwapDirection::BToA);
    }
}
