use std::collections::BTreeMap;

use serde::Serialize;

/// One import line item after header resolution and normalization.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Transaction {
    /// 1-based data line in the source file.
    pub line: usize,
    pub code: String,
    /// First four characters of `code`; `None` for codes shorter than that.
    pub code_group: Option<String>,
    pub description: String,
    pub origin: String,
    pub weight_kg: f64,
    pub value: f64,
}

/// `code_group` -> human-readable category label.
pub type Lookup = BTreeMap<String, String>;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnrichedTransaction {
    #[serde(flatten)]
    pub transaction: Transaction,
    pub category_label: Option<String>,
    pub classification: Option<String>,
}

impl EnrichedTransaction {
    pub fn code_group(&self) -> Option<&str> {
        self.transaction.code_group.as_deref()
    }

    pub fn value(&self) -> f64 {
        self.transaction.value
    }

    pub fn weight_kg(&self) -> f64 {
        self.transaction.weight_kg
    }
}
