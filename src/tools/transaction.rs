use super::{address_schema, parse_args, require_path_segment, AddressInput, Tool};
use crate::dune::{DuneClient, TransactionRecord};
use crate::error::ToolError;
use serde_json::Value;

pub struct GetLatestTransactionTool;

#[async_trait::async_trait]
impl Tool for GetLatestTransactionTool {
    fn name(&self) -> &'static str {
        "getLatestTransaction"
    }

    fn description(&self) -> &'static str {
        "Get the most recent transaction hash and block time for an EVM address"
    }

    fn schema(&self) -> Value {
        address_schema("The wallet address to look up transactions for")
    }

    async fn call(&self, client: &DuneClient, args: Value) -> Result<String, ToolError> {
        let input: AddressInput = parse_args(args)?;
        require_path_segment("address", &input.address)?;

        // Upstream order is trusted as newest-first.
        let first = client
            .first_transaction(&input.address)
            .await?
            .ok_or(ToolError::NotFound("No transactions found"))?;

        Ok(format_transaction(&first))
    }
}

pub fn format_transaction(record: &TransactionRecord) -> String {
    format!("{} ({})", record.hash, record.block_time)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_block_time() {
        let record = TransactionRecord {
            hash: "0xabc".into(),
            block_time: "2024-01-01T00:00:00Z".into(),
        };
        assert_eq!(format_transaction(&record), "0xabc (2024-01-01T00:00:00Z)");
    }
}
