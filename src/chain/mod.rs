//! Chain access: balances and the transaction lifecycle.

use crate::errors::Result;
use crate::exchange::SwapPayload;
use async_trait::async_trait;
use ethers::types::{Address, Bytes, TxHash, U256, transaction::eip2718::TypedTransaction};

pub mod client;

pub use client::EvmChainClient;

/// A transaction signed by the client's key, ready for broadcast.
#[derive(Debug, Clone)]
pub struct SignedTransaction {
    pub raw: Bytes,
    pub hash: TxHash,
}

/// Final state of a mined transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxOutcome {
    Confirmed { block: Option<u64> },
    Reverted { block: Option<u64> },
}

/// Operations the swap loop needs from the chain.
///
/// The signing key is bound when the client is constructed, so `sign` only
/// takes the transaction.
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Account that signs and pays for swaps.
    fn account(&self) -> Address;

    async fn get_balance(&self, account: Address, asset: Address) -> Result<U256>;

    /// Turn a swap payload into a fully populated transaction (nonce, gas, chain id).
    async fn build_transaction(&self, payload: &SwapPayload) -> Result<TypedTransaction>;

    async fn sign(&self, tx: &TypedTransaction) -> Result<SignedTransaction>;

    async fn submit(&self, signed: &SignedTransaction) -> Result<TxHash>;

    async fn wait_for_confirmation(&self, hash: TxHash) -> Result<TxOutcome>;
}
