use serde::{Deserialize, Serialize};

/// BOM 行 (由外部导入方产生, 只读)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BomLine {
    pub raw_text: String,
    #[serde(default)]
    pub quantity: Option<u32>,
    #[serde(default)]
    pub reference_designator: Option<String>,
}

impl BomLine {
    pub fn new(raw_text: impl Into<String>) -> Self {
        Self {
            raw_text: raw_text.into(),
            quantity: None,
            reference_designator: None,
        }
    }

    pub fn with_quantity(mut self, quantity: u32) -> Self {
        self.quantity = Some(quantity);
        self
    }

    pub fn with_reference(mut self, reference_designator: impl Into<String>) -> Self {
        self.reference_designator = Some(reference_designator.into());
        self
    }

    /// 进度回调中使用的行标识
    pub fn identifier(&self) -> &str {
        &self.raw_text
    }
}
