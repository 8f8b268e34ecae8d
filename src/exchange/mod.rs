//! Exchange quoting and swap payload construction.

use crate::errors::Result;
use crate::models::{PoolSpec, SwapDirection};
use async_trait::async_trait;
use ethers::types::{Address, Bytes, U256};

pub mod curve;

pub use curve::CurvePoolExchange;

/// Exchange estimate for swapping a fixed input amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quote {
    pub amount_in: U256,
    pub amount_out: U256,
}

/// Call that performs a swap, before any chain-specific fields are filled in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapPayload {
    pub to: Address,
    pub data: Bytes,
    pub value: U256,
}

#[async_trait]
pub trait ExchangeService: Send + Sync {
    /// Quote `amount_in` on `pool` in `direction`.
    ///
    /// An exchange error or an empty quote is returned as `AppError::Quote`.
    async fn get_quote(
        &self,
        pool: &PoolSpec,
        amount_in: U256,
        direction: SwapDirection,
    ) -> Result<Quote>;

    /// Payload swapping `amount_in` of `token_in` for at least `min_amount_out` of `token_out`.
    fn build_swap_payload(
        &self,
        pool: &PoolSpec,
        token_in: i128,
        token_out: i128,
        amount_in: U256,
        min_amount_out: U256,
    ) -> Result<SwapPayload>;
}
