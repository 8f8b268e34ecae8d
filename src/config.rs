//! Configuration loader and application settings.
//!
//! Everything is read once at startup into explicit structs that are then
//! handed to the components that need them. Parsing goes through a key lookup
//! closure so tests never have to touch the process environment.

use crate::errors::{AppError, Result};
use crate::models::PoolSpec;
use bigdecimal::BigDecimal;
use ethers::types::Address;
use num_traits::{One, Zero};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use url::Url;

const DEFAULT_TARGET_ATTEMPTS: u32 = 50;
const DEFAULT_MIN_BALANCE_A: &str = "2";
const DEFAULT_RESERVE_A: &str = "5";
const DEFAULT_SLIPPAGE: &str = "0.005";
const DEFAULT_LOOP_DELAY_SECS: u64 = 5;
const DEFAULT_CONFIRMATION_TIMEOUT_SECS: u64 = 120;
const DEFAULT_DECIMALS: u8 = 18;

/// Settings for one swap loop run.
#[derive(Clone)]
pub struct SwapLoopConfig {
    /// RPC endpoint for the Ethereum-compatible node.
    pub rpc_url: String,
    /// Hex-encoded signing key. Never printed.
    pub private_key: String,
    /// Chain id; queried from the node when unset.
    pub chain_id: Option<u64>,
    pub pool: PoolSpec,
    /// Primary asset (A) token contract.
    pub token_a: Address,
    /// Secondary asset (B) token contract.
    pub token_b: Address,
    pub token_a_decimals: u8,
    pub token_b_decimals: u8,
    /// Number of attempts after which the loop stops.
    pub target_attempts: u32,
    /// Asset A balance (decimal units) below which B->A is forced.
    pub min_balance_a: BigDecimal,
    /// Asset A amount (decimal units) never swapped away.
    pub reserve_a: BigDecimal,
    /// Tolerated fraction between quoted and minimum output, in `[0, 1)`.
    pub slippage: BigDecimal,
    pub loop_delay: Duration,
    pub confirmation_timeout: Duration,
    /// Send a notification after every attempt, not only the final summary.
    pub notify_each_attempt: bool,
}

impl fmt::Debug for SwapLoopConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SwapLoopConfig")
            .field("rpc_url", &self.rpc_url)
            .field("private_key", &"[REDACTED]")
            .field("chain_id", &self.chain_id)
            .field("pool", &self.pool)
            .field("token_a", &self.token_a)
            .field("token_b", &self.token_b)
            .field("token_a_decimals", &self.token_a_decimals)
            .field("token_b_decimals", &self.token_b_decimals)
            .field("target_attempts", &self.target_attempts)
            .field("min_balance_a", &self.min_balance_a)
            .field("reserve_a", &self.reserve_a)
            .field("slippage", &self.slippage)
            .field("loop_delay", &self.loop_delay)
            .field("confirmation_timeout", &self.confirmation_timeout)
            .field("notify_each_attempt", &self.notify_each_attempt)
            .finish()
    }
}

impl SwapLoopConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    ///
    /// Every missing required key is reported in a single error.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let required = [
            "RPC_URL",
            "PRIVATE_KEY",
            "POOL_ADDRESS",
            "TOKEN_A_ADDRESS",
            "TOKEN_B_ADDRESS",
        ];
        let missing: Vec<&str> = required
            .iter()
            .copied()
            .filter(|key| get(*key).is_none())
            .collect();
        if !missing.is_empty() {
            return Err(AppError::Config(format!(
                "missing required settings: {}",
                missing.join(", ")
            )));
        }

        let rpc_url = get("RPC_URL").unwrap_or_default();
        Url::parse(&rpc_url)
            .map_err(|e| AppError::Config(format!("RPC_URL is not a valid URL: {e}")))?;
        let private_key = get("PRIVATE_KEY").unwrap_or_default();

        let pool_address = parse_address("POOL_ADDRESS", get("POOL_ADDRESS"))?;
        let token_a = parse_address("TOKEN_A_ADDRESS", get("TOKEN_A_ADDRESS"))?;
        let token_b = parse_address("TOKEN_B_ADDRESS", get("TOKEN_B_ADDRESS"))?;

        let token_a_index: i128 = parse_or("TOKEN_A_INDEX", get("TOKEN_A_INDEX"), 0)?;
        let token_b_index: i128 = parse_or("TOKEN_B_INDEX", get("TOKEN_B_INDEX"), 1)?;
        if token_a_index == token_b_index {
            return Err(AppError::Config(
                "TOKEN_A_INDEX and TOKEN_B_INDEX must differ".into(),
            ));
        }

        let chain_id = get("CHAIN_ID")
            .map(|raw| parse_value::<u64>("CHAIN_ID", &raw))
            .transpose()?;

        let target_attempts = parse_or(
            "TARGET_ATTEMPTS",
            get("TARGET_ATTEMPTS"),
            DEFAULT_TARGET_ATTEMPTS,
        )?;
        if target_attempts == 0 {
            return Err(AppError::Config("TARGET_ATTEMPTS must be positive".into()));
        }

        let min_balance_a =
            parse_decimal("MIN_BALANCE_A", get("MIN_BALANCE_A"), DEFAULT_MIN_BALANCE_A)?;
        let reserve_a = parse_decimal("RESERVE_A", get("RESERVE_A"), DEFAULT_RESERVE_A)?;
        let slippage = parse_decimal("SLIPPAGE", get("SLIPPAGE"), DEFAULT_SLIPPAGE)?;
        if slippage < BigDecimal::zero() || slippage >= BigDecimal::one() {
            return Err(AppError::Config(format!(
                "SLIPPAGE must be within [0, 1), got {slippage}"
            )));
        }

        Ok(Self {
            rpc_url,
            private_key,
            chain_id,
            pool: PoolSpec {
                address: pool_address,
                token_a_index,
                token_b_index,
            },
            token_a,
            token_b,
            token_a_decimals: parse_or(
                "TOKEN_A_DECIMALS",
                get("TOKEN_A_DECIMALS"),
                DEFAULT_DECIMALS,
            )?,
            token_b_decimals: parse_or(
                "TOKEN_B_DECIMALS",
                get("TOKEN_B_DECIMALS"),
                DEFAULT_DECIMALS,
            )?,
            target_attempts,
            min_balance_a,
            reserve_a,
            slippage,
            loop_delay: Duration::from_secs(parse_or(
                "LOOP_DELAY_SECS",
                get("LOOP_DELAY_SECS"),
                DEFAULT_LOOP_DELAY_SECS,
            )?),
            confirmation_timeout: Duration::from_secs(parse_or(
                "CONFIRMATION_TIMEOUT_SECS",
                get("CONFIRMATION_TIMEOUT_SECS"),
                DEFAULT_CONFIRMATION_TIMEOUT_SECS,
            )?),
            notify_each_attempt: parse_or(
                "NOTIFY_EACH_ATTEMPT",
                get("NOTIFY_EACH_ATTEMPT"),
                true,
            )?,
        })
    }
}

/// Which outbound message channel the notifier uses.
#[derive(Clone, PartialEq, Eq)]
pub enum NotifierConfig {
    /// Console only.
    Log,
    Telegram { bot_token: String, chat_id: String },
    Discord { webhook_url: Url },
    Slack { webhook_url: Url },
}

impl fmt::Debug for NotifierConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // bot tokens and webhook URLs are credentials
        match self {
            NotifierConfig::Log => f.write_str("Log"),
            NotifierConfig::Telegram { chat_id, .. } => f
                .debug_struct("Telegram")
                .field("chat_id", chat_id)
                .finish_non_exhaustive(),
            NotifierConfig::Discord { .. } => f.write_str("Discord"),
            NotifierConfig::Slack { .. } => f.write_str("Slack"),
        }
    }
}

impl NotifierConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Select the channel from the `NOTIFIER` key (`log` when absent).
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let require = |key: &str| {
            get(key).ok_or_else(|| {
                AppError::Config(format!("{key} is required by the selected notifier"))
            })
        };

        let selector = get("NOTIFIER").unwrap_or_else(|| "log".into());
        match selector.to_ascii_lowercase().as_str() {
            "log" | "none" | "console" => Ok(NotifierConfig::Log),
            "telegram" => Ok(NotifierConfig::Telegram {
                bot_token: require("TELEGRAM_BOT_TOKEN")?,
                chat_id: require("TELEGRAM_CHAT_ID")?,
            }),
            "discord" => Ok(NotifierConfig::Discord {
                webhook_url: Url::parse(&require("DISCORD_WEBHOOK_URL")?)?,
            }),
            "slack" => Ok(NotifierConfig::Slack {
                webhook_url: Url::parse(&require("SLACK_WEBHOOK_URL")?)?,
            }),
            other => Err(AppError::Config(format!(
                "unknown NOTIFIER '{other}' (expected log, telegram, discord or slack)"
            ))),
        }
    }
}

fn parse_address(key: &str, raw: Option<String>) -> Result<Address> {
    let raw = raw.ok_or_else(|| AppError::Config(format!("{key} is required")))?;
    Address::from_str(&raw)
        .map_err(|e| AppError::Config(format!("{key} is not a valid address: {e}")))
}

fn parse_value<T>(key: &str, raw: &str) -> Result<T>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    raw.parse()
        .map_err(|e| AppError::Config(format!("{key}='{raw}' is invalid: {e}")))
}

fn parse_or<T>(key: &str, raw: Option<String>, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    match raw {
        Some(raw) => parse_value(key, &raw),
        None => Ok(default),
    }
}

fn parse_decimal(key: &str, raw: Option<String>, default: &str) -> Result<BigDecimal> {
    let raw = raw.unwrap_or_else(|| default.to_string());
    let value = BigDecimal::from_str(&raw)
        .map_err(|e| AppError::Config(format!("{key}='{raw}' is not a decimal: {e}")))?;
    if value < BigDecimal::zero() {
        return Err(AppError::Config(format!("{key} must not be negative")));
    }
    Ok(value)
}
