use super::{ChainClient, SignedTransaction, TxOutcome};
use crate::errors::{AppError, Result};
use crate::exchange::SwapPayload;
use async_trait::async_trait;
use ethers::{
    contract::abigen,
    providers::{Http, Middleware, Provider},
    signers::{LocalWallet, Signer},
    types::{
        Address, BlockNumber, TransactionReceipt, TransactionRequest, TxHash, U64, U256,
        transaction::eip2718::TypedTransaction,
    },
    utils::keccak256,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

const RECEIPT_POLL_INTERVAL: Duration = Duration::from_secs(2);

abigen!(
    Erc20,
    r"[
        function balanceOf(address account) view returns (uint256)
    ]",
);

/// Chain client for an Ethereum-compatible node reached over HTTP JSON-RPC.
#[derive(Clone)]
pub struct EvmChainClient {
    provider: Arc<Provider<Http>>,
    wallet: LocalWallet,
    chain_id: u64,
    confirmation_timeout: Duration,
    poll_interval: Duration,
}

impl EvmChainClient {
    /// Connect to `rpc_url` and bind the signing key.
    ///
    /// When `chain_id` is given it must match what the node reports.
    pub async fn new(
        rpc_url: &str,
        private_key: &str,
        chain_id: Option<u64>,
        confirmation_timeout: Duration,
    ) -> Result<Self> {
        let provider = Arc::new(Provider::<Http>::try_from(rpc_url)?);
        let node_chain_id = provider.get_chainid().await?.as_u64(); // sanity-check
        let chain_id = match chain_id {
            Some(configured) if configured != node_chain_id => {
                return Err(AppError::Config(format!(
                    "CHAIN_ID {configured} does not match node chain id {node_chain_id}"
                )));
            }
            Some(configured) => configured,
            None => node_chain_id,
        };
        let wallet = parse_wallet(private_key)?;
        info!(chain_id, account = ?wallet.address(), "[CHAIN] connected");
        Ok(Self::with_provider(
            provider,
            wallet,
            chain_id,
            confirmation_timeout,
        ))
    }

    /// Build a client without touching the network.
    pub fn with_provider(
        provider: Arc<Provider<Http>>,
        wallet: LocalWallet,
        chain_id: u64,
        confirmation_timeout: Duration,
    ) -> Self {
        Self {
            provider,
            wallet: wallet.with_chain_id(chain_id),
            chain_id,
            confirmation_timeout,
            poll_interval: RECEIPT_POLL_INTERVAL,
        }
    }

    /// Shared provider, so other adapters reuse the same connection.
    pub fn provider(&self) -> Arc<Provider<Http>> {
        self.provider.clone()
    }
}

#[async_trait]
impl ChainClient for EvmChainClient {
    fn account(&self) -> Address {
        self.wallet.address()
    }

    async fn get_balance(&self, account: Address, asset: Address) -> Result<U256> {
        let token = Erc20::new(asset, self.provider.clone());
        Ok(token.balance_of(account).call().await?)
    }

    async fn build_transaction(&self, payload: &SwapPayload) -> Result<TypedTransaction> {
        let from = self.wallet.address();
        let nonce = self
            .provider
            .get_transaction_count(from, Some(BlockNumber::Pending.into()))
            .await?;
        let mut tx: TypedTransaction = TransactionRequest::new()
            .from(from)
            .to(payload.to)
            .data(payload.data.clone())
            .value(payload.value)
            .nonce(nonce)
            .chain_id(self.chain_id)
            .into();
        // gas price and gas limit; estimation fails here if the swap would revert
        self.provider
            .fill_transaction(&mut tx, None)
            .await
            .map_err(|e| AppError::Transaction(format!("failed to populate transaction: {e}")))?;
        debug!(?nonce, gas = ?tx.gas(), "[CHAIN] transaction built");
        Ok(tx)
    }

    async fn sign(&self, tx: &TypedTransaction) -> Result<SignedTransaction> {
        let signature = self.wallet.sign_transaction(tx).await?;
        let raw = tx.rlp_signed(&signature);
        let hash = TxHash::from(keccak256(&raw));
        Ok(SignedTransaction { raw, hash })
    }

    async fn submit(&self, signed: &SignedTransaction) -> Result<TxHash> {
        let pending = self.provider.send_raw_transaction(signed.raw.clone()).await?;
        Ok(pending.tx_hash())
    }

    async fn wait_for_confirmation(&self, hash: TxHash) -> Result<TxOutcome> {
        let deadline = tokio::time::Instant::now() + self.confirmation_timeout;
        loop {
            if let Some(receipt) = self.provider.get_transaction_receipt(hash).await? {
                return Ok(classify_receipt(&receipt));
            }
            if tokio::time::Instant::now() >= deadline {
                return Err(AppError::Transaction(format!(
                    "{hash:?} not confirmed within {:?}",
                    self.confirmation_timeout
                )));
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }
}

/// Parse a hex signing key, with or without the `0x` prefix.
pub fn parse_wallet(private_key: &str) -> Result<LocalWallet> {
    let key = private_key.trim();
    let key = key.strip_prefix("0x").unwrap_or(key);
    key.parse::<LocalWallet>()
        .map_err(|e| AppError::Config(format!("PRIVATE_KEY is not a valid signing key: {e}")))
}

/// Receipts without a status field (pre-Byzantium) count as confirmed.
fn classify_receipt(receipt: &TransactionReceipt) -> TxOutcome {
    let block = receipt.block_number.map(|b| b.as_u64());
    match receipt.status {
        Some(status) if status != U64::from(1) => TxOutcome::Reverted { block },
        _ => TxOutcome::Confirmed { block },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    fn offline_client() -> EvmChainClient {
        let provider = Arc::new(Provider::<Http>::try_from("http://127.0.0.1:1").unwrap());
        EvmChainClient::with_provider(
            provider,
            parse_wallet(TEST_KEY).unwrap(),
            1,
            Duration::from_secs(1),
        )
    }

    #[test]
    fn wallet_parses_with_and_without_prefix() {
        let expected: Address = "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266".parse().unwrap();
        assert_eq!(parse_wallet(TEST_KEY).unwrap().address(), expected);
        assert_eq!(
            parse_wallet(TEST_KEY.trim_start_matches("0x")).unwrap().address(),
            expected
        );
        assert!(matches!(parse_wallet("0xzz"), Err(AppError::Config(_))));
    }

    #[test]
    fn receipt_status_decides_outcome() {
        let mut receipt = TransactionReceipt {
            block_number: Some(U64::from(7)),
            status: Some(U64::from(1)),
            ..Default::default()
        };
        assert_eq!(
            classify_receipt(&receipt),
            TxOutcome::Confirmed { block: Some(7) }
        );

        receipt.status = Some(U64::zero());
        assert_eq!(
            classify_receipt(&receipt),
            TxOutcome::Reverted { block: Some(7) }
        );
    }

    /// Local JSON-RPC endpoint that answers every call with a `null` result,
    /// i.e. a node that never has a receipt for the transaction.
    async fn null_rpc_endpoint() -> String {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                tokio::spawn(async move {
                    let mut request = Vec::new();
                    let mut buf = [0u8; 1024];
                    loop {
                        let n = socket.read(&mut buf).await.unwrap_or(0);
                        if n == 0 {
                            return;
                        }
                        request.extend_from_slice(&buf[..n]);
                        let text = String::from_utf8_lossy(&request).to_string();
                        if let Some(end) = text.find("\r\n\r\n") {
                            let length = text[..end]
                                .lines()
                                .find_map(|line| {
                                    let (name, value) = line.split_once(':')?;
                                    name.eq_ignore_ascii_case("content-length")
                                        .then(|| value.trim().parse::<usize>().ok())?
                                })
                                .unwrap_or(0);
                            if request.len() >= end + 4 + length {
                                break;
                            }
                        }
                    }
                    let body = r#"{"jsonrpc":"2.0","id":1,"result":null}"#;
                    let response = format!(
                        "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                        body.len()
                    );
                    let _ = socket.write_all(response.as_bytes()).await;
                    let _ = socket.shutdown().await;
                });
            }
        });
        format!("http://{addr}")
    }

    #[tokio::test]
    async fn missing_receipt_times_out_as_transaction_error() {
        let url = null_rpc_endpoint().await;
        let provider = Arc::new(Provider::<Http>::try_from(url.as_str()).unwrap());
        let mut client = EvmChainClient::with_provider(
            provider,
            parse_wallet(TEST_KEY).unwrap(),
            1,
            Duration::from_millis(50),
        );
        client.poll_interval = Duration::from_millis(10);

        let result = client.wait_for_confirmation(TxHash::repeat_byte(0x42)).await;

        match result {
            Err(AppError::Transaction(reason)) => {
                assert!(reason.contains("not confirmed"), "{reason}")
            }
            other => panic!("expected a confirmation timeout, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn signing_is_offline_and_deterministic() {
        let client = offline_client();
        let tx: TypedTransaction = TransactionRequest::new()
            .to(Address::repeat_byte(0x11))
            .value(1u64)
            .nonce(0u64)
            .gas(21_000u64)
            .gas_price(1u64)
            .chain_id(1u64)
            .into();

        let first = client.sign(&tx).await.unwrap();
        let second = client.sign(&tx).await.unwrap();
        assert!(!first.raw.is_empty());
        // legacy transactions are a bare RLP list
        assert!(first.raw[0] >= 0xc0);
        assert_eq!(first.hash, second.hash);
        assert_eq!(client.account(), parse_wallet(TEST_KEY).unwrap().address());
    }
}
