use super::{parse_args, require_path_segment, string_field_schema, ContractAddressInput, Tool};
use crate::dune::{DuneClient, TokenRecord};
use crate::error::ToolError;
use crate::format::fixed2;
use serde_json::Value;

pub struct GetTokenPriceTool;

#[async_trait::async_trait]
impl Tool for GetTokenPriceTool {
    fn name(&self) -> &'static str {
        "getTokenPrice"
    }

    fn description(&self) -> &'static str {
        "Get the USD price of a token contract, searching all supported chains"
    }

    fn schema(&self) -> Value {
        string_field_schema("contract_address", "The token contract address")
    }

    async fn call(&self, client: &DuneClient, args: Value) -> Result<String, ToolError> {
        let input: ContractAddressInput = parse_args(args)?;
        require_path_segment("contract_address", &input.contract_address)?;

        let first = client
            .first_token(&input.contract_address)
            .await?
            .ok_or(ToolError::NotFound("No price found"))?;

        format_price(&first)
    }
}

pub fn format_price(record: &TokenRecord) -> Result<String, ToolError> {
    let price = record
        .price_usd
        .as_ref()
        .and_then(|p| p.as_decimal())
        .ok_or_else(|| ToolError::malformed("token record has no price_usd"))?;
    Ok(fixed2(price))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_two_decimals_no_symbol() {
        let record: TokenRecord = serde_json::from_value(json!({ "price_usd": 3.14159 })).unwrap();
        assert_eq!(format_price(&record).unwrap(), "3.14");
    }

    #[test]
    fn test_small_price() {
        let record: TokenRecord = serde_json::from_value(json!({ "price_usd": 0.000123 })).unwrap();
        assert_eq!(format_price(&record).unwrap(), "0.00");
    }

    #[test]
    fn test_missing_price_is_malformed() {
        let record: TokenRecord = serde_json::from_value(json!({ "symbol": "USDC" })).unwrap();
        let err = format_price(&record).unwrap_err();
        assert_eq!(err.kind(), "upstream_failure");
    }
}
