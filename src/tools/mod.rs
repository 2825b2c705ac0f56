pub mod activity;
pub mod balance;
pub mod price;
pub mod transaction;

use crate::dune::DuneClient;
use crate::error::ToolError;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use tracing::{debug, warn};

#[async_trait::async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &'static str;
    fn description(&self) -> &'static str;
    fn schema(&self) -> Value;
    async fn call(&self, client: &DuneClient, args: Value) -> Result<String, ToolError>;
}

/// What a tool call hands back to the caller: one line of text, flagged as an
/// error or not.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolOutput {
    Text(String),
    Error(String),
}

impl ToolOutput {
    pub fn text(&self) -> &str {
        match self {
            ToolOutput::Text(text) | ToolOutput::Error(text) => text,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, ToolOutput::Error(_))
    }

    /// MCP `CallToolResult` shape.
    pub fn to_json(&self) -> Value {
        json!({
            "content": [{ "type": "text", "text": self.text() }],
            "isError": self.is_error()
        })
    }
}

impl From<Result<String, ToolError>> for ToolOutput {
    fn from(result: Result<String, ToolError>) -> Self {
        match result {
            Ok(text) => ToolOutput::Text(text),
            Err(err) => ToolOutput::Error(err.to_string()),
        }
    }
}

/// Runs one tool and folds every failure into an error output.
pub async fn invoke(tool: &dyn Tool, client: &DuneClient, args: Value) -> ToolOutput {
    let result = tool.call(client, args).await;
    match &result {
        Ok(text) => debug!(tool = tool.name(), %text, "Tool call succeeded"),
        Err(err) => warn!(tool = tool.name(), kind = err.kind(), error = %err, "Tool call failed"),
    }
    result.into()
}

pub struct ToolRegistry {
    tools: BTreeMap<&'static str, Box<dyn Tool>>,
}

impl ToolRegistry {
    pub fn empty() -> Self {
        Self {
            tools: BTreeMap::new(),
        }
    }

    /// The four Dune lookups.
    pub fn standard() -> Self {
        let mut registry = Self::empty();
        registry.register(balance::GetBalanceTool);
        registry.register(transaction::GetLatestTransactionTool);
        registry.register(price::GetTokenPriceTool);
        registry.register(activity::GetLatestActivityTool);
        registry
    }

    pub fn register<T: Tool + 'static>(&mut self, tool: T) {
        self.tools.insert(tool.name(), Box::new(tool));
    }

    pub fn get(&self, name: &str) -> Option<&dyn Tool> {
        self.tools.get(name).map(|tool| tool.as_ref())
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// `tools/list` entries, sorted by name.
    pub fn describe(&self) -> Vec<Value> {
        self.tools
            .values()
            .map(|t| {
                json!({
                    "name": t.name(),
                    "description": t.description(),
                    "inputSchema": t.schema()
                })
            })
            .collect()
    }
}

#[derive(Debug, Deserialize)]
pub struct AddressInput {
    pub address: String,
}

#[derive(Debug, Deserialize)]
pub struct ContractAddressInput {
    pub contract_address: String,
}

pub(crate) fn parse_args<T: DeserializeOwned>(args: Value) -> Result<T, ToolError> {
    serde_json::from_value(args).map_err(|e| ToolError::InvalidInput(e.to_string()))
}

/// The format is left to the upstream API. Values that would not survive as
/// a single URL path segment are refused.
pub(crate) fn require_path_segment(field: &str, value: &str) -> Result<(), ToolError> {
    if value.trim().is_empty() {
        return Err(ToolError::InvalidInput(format!("`{field}` must not be empty")));
    }
    if value == "." || value == ".." {
        return Err(ToolError::InvalidInput(format!("`{field}` must not be {value:?}")));
    }
    Ok(())
}

pub(crate) fn address_schema(description: &str) -> Value {
    string_field_schema("address", description)
}

pub(crate) fn string_field_schema(field: &str, description: &str) -> Value {
    json!({
        "type": "object",
        "properties": {
            field: {
                "type": "string",
                "description": description
            }
        },
        "required": [field]
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_registry_names() {
        let registry = ToolRegistry::standard();
        assert_eq!(registry.len(), 4);

        let names: Vec<String> = registry
            .describe()
            .iter()
            .map(|t| t["name"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(
            names,
            vec![
                "getBalance",
                "getLatestActivity",
                "getLatestTransaction",
                "getTokenPrice"
            ]
        );
    }

    #[test]
    fn test_schemas_require_their_field() {
        let registry = ToolRegistry::standard();
        let price = registry.get("getTokenPrice").unwrap();
        assert_eq!(price.schema()["required"], json!(["contract_address"]));

        let balance = registry.get("getBalance").unwrap();
        assert_eq!(balance.schema()["required"], json!(["address"]));
        assert_eq!(balance.schema()["properties"]["address"]["type"], "string");
    }

    #[test]
    fn test_output_json_shape() {
        let ok = ToolOutput::Text("3.14".into());
        assert_eq!(
            ok.to_json(),
            json!({ "content": [{ "type": "text", "text": "3.14" }], "isError": false })
        );

        let err: ToolOutput = Err(ToolError::NotFound("No price found")).into();
        assert!(err.is_error());
        assert_eq!(err.to_json()["isError"], true);
        assert_eq!(err.to_json()["content"][0]["text"], "No price found");
    }

    #[test]
    fn test_parse_args_rejects_bad_shapes() {
        let err = parse_args::<AddressInput>(json!({})).unwrap_err();
        assert_eq!(err.kind(), "invalid_input");

        let err = parse_args::<AddressInput>(json!({ "address": 42 })).unwrap_err();
        assert!(err.to_string().starts_with("Invalid arguments:"));

        let input = parse_args::<AddressInput>(json!({ "address": "0xabc", "extra": true })).unwrap();
        assert_eq!(input.address, "0xabc");
    }

    #[test]
    fn test_require_path_segment() {
        assert!(require_path_segment("address", "0xabc").is_ok());
        let err = require_path_segment("address", "   ").unwrap_err();
        assert_eq!(err.to_string(), "Invalid arguments: `address` must not be empty");

        let err = require_path_segment("address", "..").unwrap_err();
        assert_eq!(err.to_string(), "Invalid arguments: `address` must not be \"..\"");
        assert_eq!(require_path_segment("contract_address", ".").unwrap_err().kind(), "invalid_input");
    }
}
