use super::{address_schema, parse_args, require_path_segment, AddressInput, Tool};
use crate::dune::{ActivityRecord, DuneClient};
use crate::error::ToolError;
use crate::format::whole_units;
use serde_json::Value;

pub struct GetLatestActivityTool;

#[async_trait::async_trait]
impl Tool for GetLatestActivityTool {
    fn name(&self) -> &'static str {
        "getLatestActivity"
    }

    fn description(&self) -> &'static str {
        "Get the most recent on-chain activity (transfers, swaps, mints, ...) for an EVM address"
    }

    fn schema(&self) -> Value {
        address_schema("The wallet address to look up activity for")
    }

    async fn call(&self, client: &DuneClient, args: Value) -> Result<String, ToolError> {
        let input: AddressInput = parse_args(args)?;
        require_path_segment("address", &input.address)?;

        let first = client
            .first_activity(&input.address)
            .await?
            .ok_or(ToolError::NotFound("No activity found"))?;

        format_activity(&first)
    }
}

/// `<type> <asset_type>[ <whole units> <symbol>] (<block_time>)`.
///
/// The amount is `value / 10^decimals` in integer arithmetic, so it truncates
/// and stays exact for any uint256 value.
pub fn format_activity(record: &ActivityRecord) -> Result<String, ToolError> {
    let mut text = format!("{} {}", record.kind, record.asset_type);

    if let Some(meta) = &record.token_metadata {
        let raw = record
            .value
            .as_ref()
            .and_then(|v| v.as_u256())
            .ok_or_else(|| ToolError::malformed("activity record has no integer value"))?;
        let amount = whole_units(raw, meta.decimals).ok_or_else(|| {
            ToolError::malformed(format!("token decimals out of range: {}", meta.decimals))
        })?;
        text.push_str(&format!(" {amount} {}", meta.symbol));
    }

    text.push_str(&format!(" ({})", record.block_time));
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> ActivityRecord {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_with_token_metadata_truncates() {
        let r = record(json!({
            "type": "transfer",
            "asset_type": "erc20",
            "value": "2500000",
            "token_metadata": { "decimals": 6, "symbol": "USDC" },
            "block_time": "t1"
        }));
        assert_eq!(format_activity(&r).unwrap(), "transfer erc20 2 USDC (t1)");
    }

    #[test]
    fn test_without_token_metadata() {
        let r = record(json!({
            "type": "receive",
            "asset_type": "native",
            "value": "1000000000000000000",
            "block_time": "t2"
        }));
        assert_eq!(format_activity(&r).unwrap(), "receive native (t2)");
    }

    #[test]
    fn test_huge_value_is_exact() {
        // 2^255 wei; floating point division would lose the low digits.
        let r = record(json!({
            "type": "send",
            "asset_type": "erc20",
            "value": "57896044618658097711785492504343953926634992332820282019728792003956564819968",
            "token_metadata": { "decimals": 18, "symbol": "WETH" },
            "block_time": "t3"
        }));
        assert_eq!(
            format_activity(&r).unwrap(),
            "send erc20 57896044618658097711785492504343953926634992332820282019728 WETH (t3)"
        );
    }

    #[test]
    fn test_metadata_without_value_is_malformed() {
        let r = record(json!({
            "type": "mint",
            "asset_type": "erc20",
            "token_metadata": { "decimals": 6, "symbol": "USDC" },
            "block_time": "t4"
        }));
        assert_eq!(format_activity(&r).unwrap_err().kind(), "upstream_failure");
    }
}
