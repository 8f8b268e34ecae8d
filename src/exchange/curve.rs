use super::{ExchangeService, Quote, SwapPayload};
use crate::errors::{AppError, Result};
use crate::models::{PoolSpec, SwapDirection};
use async_trait::async_trait;
use ethers::{
    contract::abigen,
    providers::{Http, Provider},
    types::U256,
};
use std::sync::Arc;
use tracing::debug;

abigen!(
    StableSwapPool,
    r"[
        function get_dy(int128 i, int128 j, uint256 dx) view returns (uint256)
        function exchange(int128 i, int128 j, uint256 dx, uint256 min_dy) returns (uint256)
    ]",
);

/// Quotes and swap calldata for index-addressed stable-swap pools.
#[derive(Clone)]
pub struct CurvePoolExchange {
    provider: Arc<Provider<Http>>,
}

impl CurvePoolExchange {
    pub fn new(provider: Arc<Provider<Http>>) -> Self {
        Self { provider }
    }

    fn pool(&self, pool: &PoolSpec) -> StableSwapPool<Provider<Http>> {
        StableSwapPool::new(pool.address, self.provider.clone())
    }
}

#[async_trait]
impl ExchangeService for CurvePoolExchange {
    async fn get_quote(
        &self,
        pool: &PoolSpec,
        amount_in: U256,
        direction: SwapDirection,
    ) -> Result<Quote> {
        let (i, j) = direction.token_indices(pool);
        let amount_out = self
            .pool(pool)
            .get_dy(i, j, amount_in)
            .call()
            .await
            .map_err(|e| AppError::Quote(format!("get_dy({i}, {j}, {amount_in}) failed: {e}")))?;
        debug!(%direction, %amount_in, %amount_out, "[DEX] quote");
        if amount_out.is_zero() {
            return Err(AppError::Quote(format!(
                "pool returned no output for {amount_in} ({direction})"
            )));
        }
        Ok(Quote {
            amount_in,
            amount_out,
        })
    }

    fn build_swap_payload(
        &self,
        pool: &PoolSpec,
        token_in: i128,
        token_out: i128,
        amount_in: U256,
        min_amount_out: U256,
    ) -> Result<SwapPayload> {
        let data = self
            .pool(pool)
            .exchange(token_in, token_out, amount_in, min_amount_out)
            .calldata()
            .ok_or_else(|| AppError::Other("exchange calldata could not be encoded".into()))?;
        Ok(SwapPayload {
            to: pool.address,
            data,
            value: U256::zero(),
        })
    }
}
