use super::{address_schema, parse_args, require_path_segment, AddressInput, Tool};
use crate::dune::{BalanceRecord, DuneClient};
use crate::error::ToolError;
use crate::format::{fixed2, units_fixed2};
use serde_json::Value;

pub struct GetBalanceTool;

#[async_trait::async_trait]
impl Tool for GetBalanceTool {
    fn name(&self) -> &'static str {
        "getBalance"
    }

    fn description(&self) -> &'static str {
        "Get the first token balance reported for an EVM address, in USD when priced"
    }

    fn schema(&self) -> Value {
        address_schema("The wallet address to check balance for")
    }

    async fn call(&self, client: &DuneClient, args: Value) -> Result<String, ToolError> {
        let input: AddressInput = parse_args(args)?;
        require_path_segment("address", &input.address)?;

        let first = client
            .first_balance(&input.address)
            .await?
            .ok_or(ToolError::NotFound("No balance found"))?;

        format_balance(&first)
    }
}

/// `$<usd> USD` when the record is priced, otherwise `<amount> (<chain>)`.
/// A zero `value_usd` counts as unpriced.
pub fn format_balance(record: &BalanceRecord) -> Result<String, ToolError> {
    if let Some(usd) = record.value_usd.as_ref() {
        let usd = usd
            .as_decimal()
            .ok_or_else(|| ToolError::malformed("balance value_usd is not a number"))?;
        if !usd.is_zero() {
            return Ok(format!("${} USD", fixed2(usd)));
        }
    }

    let raw = record
        .balance
        .as_ref()
        .and_then(|b| b.as_u256())
        .ok_or_else(|| ToolError::malformed("balance record has no integer balance"))?;
    let decimals = record
        .decimals
        .ok_or_else(|| ToolError::malformed("balance record has no decimals"))?;
    let chain = record
        .chain
        .as_deref()
        .ok_or_else(|| ToolError::malformed("balance record has no chain"))?;
    let amount = units_fixed2(raw, decimals)
        .ok_or_else(|| ToolError::malformed(format!("balance decimals out of range: {decimals}")))?;

    Ok(format!("{amount} ({chain})"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> BalanceRecord {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_usd_value_rounds_to_cents() {
        let r = record(json!({ "chain": "eth", "balance": "1", "decimals": 18, "value_usd": 12.345 }));
        assert_eq!(format_balance(&r).unwrap(), "$12.35 USD");
    }

    #[test]
    fn test_raw_balance_when_unpriced() {
        let r = record(json!({ "chain": "eth", "balance": "1500000", "decimals": 6 }));
        assert_eq!(format_balance(&r).unwrap(), "1.50 (eth)");
    }

    #[test]
    fn test_zero_or_null_usd_falls_back_to_raw() {
        let r = record(json!({ "chain": "base", "balance": 2000000, "decimals": 6, "value_usd": 0 }));
        assert_eq!(format_balance(&r).unwrap(), "2.00 (base)");

        let r = record(json!({ "chain": "base", "balance": "2000000", "decimals": 6, "value_usd": null }));
        assert_eq!(format_balance(&r).unwrap(), "2.00 (base)");
    }

    #[test]
    fn test_eighteen_decimals() {
        let r = record(json!({
            "chain": "ethereum",
            "balance": "1234567890000000000000",
            "decimals": 18
        }));
        assert_eq!(format_balance(&r).unwrap(), "1234.57 (ethereum)");
    }

    #[test]
    fn test_integer_balance_beyond_u64() {
        let r: BalanceRecord = serde_json::from_str(
            r#"{ "chain": "eth", "balance": 1000000000000000000000, "decimals": 18 }"#,
        )
        .unwrap();
        assert_eq!(format_balance(&r).unwrap(), "1000.00 (eth)");
    }

    #[test]
    fn test_incomplete_record_is_malformed() {
        let r = record(json!({ "chain": "eth", "decimals": 6 }));
        let err = format_balance(&r).unwrap_err();
        assert_eq!(err.kind(), "upstream_failure");

        let r = record(json!({ "chain": "eth", "balance": "1", "decimals": 200 }));
        assert_eq!(format_balance(&r).unwrap_err().kind(), "upstream_failure");
    }
}
