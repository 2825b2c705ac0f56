//! Client for the Dune Echo blockchain-data API.
//!
//! One GET per call, no retries. The request timeout comes from [`Config`].

use crate::config::Config;
use crate::error::UpstreamError;
use crate::format::{parse_decimal, parse_u256};
use alloy::primitives::U256;
use anyhow::Result;
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;
use url::Url;

pub const API_KEY_HEADER: &str = "X-Dune-Api-Key";

const BALANCES_PATH: [&str; 3] = ["v1", "balances", "evm"];
const TRANSACTIONS_PATH: [&str; 3] = ["v1", "transactions", "evm"];
const TOKENS_PATH: [&str; 3] = ["beta", "tokens", "evm"];
const ACTIVITY_PATH: [&str; 3] = ["beta", "activity", "evm"];

const MAX_ERROR_BODY: usize = 256;

#[derive(Clone)]
pub struct DuneClient {
    http: reqwest::Client,
    base_url: Url,
    api_key: String,
}

impl DuneClient {
    pub fn new(config: &Config) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .user_agent(concat!("dune-echo-mcp/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url.clone(),
            api_key: config.api_key.clone(),
        })
    }

    pub async fn first_balance(&self, address: &str) -> Result<Option<BalanceRecord>, UpstreamError> {
        let body: BalancesResponse = self.get(&BALANCES_PATH, address, &[]).await?;
        first_record(body.balances)
    }

    pub async fn first_transaction(
        &self,
        address: &str,
    ) -> Result<Option<TransactionRecord>, UpstreamError> {
        let body: TransactionsResponse = self.get(&TRANSACTIONS_PATH, address, &[]).await?;
        first_record(body.transactions)
    }

    /// Token lookup across every chain the API indexes.
    pub async fn first_token(
        &self,
        contract_address: &str,
    ) -> Result<Option<TokenRecord>, UpstreamError> {
        let body: TokensResponse = self
            .get(&TOKENS_PATH, contract_address, &[("chain_ids", "all")])
            .await?;
        first_record(body.tokens)
    }

    pub async fn first_activity(
        &self,
        address: &str,
    ) -> Result<Option<ActivityRecord>, UpstreamError> {
        let body: ActivityResponse = self.get(&ACTIVITY_PATH, address, &[]).await?;
        first_record(body.activity)
    }

    /// Resolves `<base>/<prefix...>/<address>` with the address encoded as a
    /// single path segment.
    pub fn endpoint(
        &self,
        prefix: &[&str],
        address: &str,
        query: &[(&str, &str)],
    ) -> Result<Url, UpstreamError> {
        // `PathSegmentsMut` silently drops dot segments.
        if address == "." || address == ".." {
            return Err(UpstreamError::Url(format!("invalid path segment {address:?}")));
        }
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| UpstreamError::Url(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(prefix)
            .push(address);
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        Ok(url)
    }

    async fn get<T: DeserializeOwned>(
        &self,
        prefix: &[&str],
        address: &str,
        query: &[(&str, &str)],
    ) -> Result<T, UpstreamError> {
        let url = self.endpoint(prefix, address, query)?;
        debug!(path = url.path(), "Upstream GET");

        let response = self
            .http
            .get(url)
            .header(API_KEY_HEADER, self.api_key.as_str())
            .send()
            .await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(UpstreamError::Status {
                status: status.as_u16(),
                body: truncate(&body, MAX_ERROR_BODY),
            });
        }

        Ok(serde_json::from_str(&body)?)
    }
}

/// Only the first record is typed; later records are never inspected.
fn first_record<T: DeserializeOwned>(records: Vec<Value>) -> Result<Option<T>, UpstreamError> {
    records
        .into_iter()
        .next()
        .map(serde_json::from_value)
        .transpose()
        .map_err(UpstreamError::from)
}

fn truncate(body: &str, max: usize) -> String {
    match body.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}

/// Amount fields arrive either as decimal strings or as bare JSON numbers.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Numeric {
    Text(String),
    Number(serde_json::Number),
}

impl Numeric {
    pub fn as_u256(&self) -> Option<U256> {
        match self {
            Numeric::Text(s) => parse_u256(s),
            Numeric::Number(n) => n.as_u64().map(U256::from).or_else(|| integral_number(n)),
        }
    }

    pub fn as_decimal(&self) -> Option<Decimal> {
        match self {
            Numeric::Text(s) => parse_decimal(s),
            Numeric::Number(n) => parse_decimal(&n.to_string()),
        }
    }
}

/// Integers above `u64::MAX` reach us as `f64`; accept them when they carry
/// no fractional part.
fn integral_number(n: &serde_json::Number) -> Option<U256> {
    let value = parse_decimal(&n.to_string())?;
    if value.is_sign_negative() || !value.fract().is_zero() {
        return None;
    }
    parse_u256(&value.trunc().normalize().to_string())
}

#[derive(Debug, Deserialize)]
struct BalancesResponse {
    balances: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct TransactionsResponse {
    transactions: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct TokensResponse {
    tokens: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct ActivityResponse {
    activity: Vec<Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BalanceRecord {
    pub chain: Option<String>,
    pub balance: Option<Numeric>,
    pub decimals: Option<u32>,
    pub value_usd: Option<Numeric>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TransactionRecord {
    pub hash: String,
    pub block_time: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TokenRecord {
    pub price_usd: Option<Numeric>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ActivityRecord {
    #[serde(rename = "type")]
    pub kind: String,
    pub asset_type: String,
    pub value: Option<Numeric>,
    pub token_metadata: Option<TokenMetadata>,
    pub block_time: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TokenMetadata {
    pub decimals: u32,
    pub symbol: String,
}
