//! Values substituted when a read-only simulation returns nothing.

use std::collections::HashMap;

use crate::stellar::value::ContractValue;

/// Per-function fallback table. Unlisted functions fall back to `Void`.
#[derive(Debug, Clone)]
pub struct FallbackDefaults {
    table: HashMap<String, ContractValue>,
}

impl Default for FallbackDefaults {
    fn default() -> Self {
        Self::empty()
            .with("has_voted", ContractValue::Bool(false))
            .with("get_vote_count", ContractValue::U32(0))
    }
}

impl FallbackDefaults {
    pub fn empty() -> Self {
        Self {
            table: HashMap::new(),
        }
    }

    pub fn with(mut self, function: &str, value: ContractValue) -> Self {
        self.table.insert(function.to_string(), value);
        self
    }

    pub fn for_function(&self, function: &str) -> ContractValue {
        self.table
            .get(function)
            .cloned()
            .unwrap_or(ContractValue::Void)
    }
}
