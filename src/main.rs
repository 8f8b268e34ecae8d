use anyhow::{Context, Result};
use std::sync::Arc;
use swap_loop::{
    chain::{ChainClient, EvmChainClient},
    config::{NotifierConfig, SwapLoopConfig},
    controller::{SwapLoopController, SwapPolicy},
    exchange::CurvePoolExchange,
    notifier::{self, LogNotifier, Notifier},
    utils,
};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    utils::init_logging();

    // The notifier comes first so later startup failures can be reported through it.
    let notifier: Arc<dyn Notifier> = match NotifierConfig::from_env()
        .and_then(|cfg| notifier::build_notifier(&cfg))
    {
        Ok(notifier) => notifier,
        Err(e) => {
            let fallback: Arc<dyn Notifier> = Arc::new(LogNotifier);
            report_startup_failure(&fallback, &e.to_string()).await;
            return Err(e).context("notifier configuration");
        }
    };

    let (config, policy) = match SwapLoopConfig::from_env()
        .and_then(|cfg| SwapPolicy::from_config(&cfg).map(|policy| (cfg, policy)))
    {
        Ok(loaded) => loaded,
        Err(e) => {
            report_startup_failure(&notifier, &e.to_string()).await;
            return Err(e).context("swap loop configuration");
        }
    };
    tracing::info!(?config, "[INIT] swap-loop starting");

    let chain = match EvmChainClient::new(
        &config.rpc_url,
        &config.private_key,
        config.chain_id,
        config.confirmation_timeout,
    )
    .await
    {
        Ok(chain) => chain,
        Err(e) => {
            report_startup_failure(&notifier, &e.to_string()).await;
            return Err(e).context("chain connection");
        }
    };
    let exchange = CurvePoolExchange::new(chain.provider());
    let chain: Arc<dyn ChainClient> = Arc::new(chain);

    let state = SwapLoopController::new(policy, chain, Arc::new(exchange), notifier)
        .run()
        .await;
    tracing::info!(?state, "[SUMMARY] exiting");
    Ok(())
}

/// Startup failures go to the log and the notifier before `main` returns them.
async fn report_startup_failure(notifier: &Arc<dyn Notifier>, reason: &str) {
    tracing::error!(reason, "[INIT] startup failed");
    notifier
        .notify(&format!("Swap loop aborted at startup: {reason}"))
        .await;
}
