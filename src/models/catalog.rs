use crate::error::{MatcherError, Result};
use bigdecimal::{BigDecimal, Zero};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::str::FromStr;

/// 阶梯价 (起订量, 单价)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceTier {
    pub min_quantity: u64,
    pub unit_price: BigDecimal,
}

impl PriceTier {
    pub fn new(min_quantity: u64, unit_price: BigDecimal) -> Self {
        Self {
            min_quantity,
            unit_price,
        }
    }
}

/// 目录记录 (元器件)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogRecord {
    pub code: String,
    pub model: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub brand: String,
    #[serde(default)]
    pub package: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub stock: u64,
    #[serde(default)]
    pub price_tiers: Vec<PriceTier>,
}

/// 参与关键词检索的字段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogField {
    Code,
    Model,
    Name,
    Brand,
    Package,
    Description,
    Category,
}

impl CatalogField {
    pub const ALL: [CatalogField; 7] = [
        CatalogField::Code,
        CatalogField::Model,
        CatalogField::Name,
        CatalogField::Brand,
        CatalogField::Package,
        CatalogField::Description,
        CatalogField::Category,
    ];

    /// 字段权重: 标识类 ×1.5, 描述类 ×1.2, 其余 ×1.0
    pub fn weight(self) -> f64 {
        match self {
            CatalogField::Code | CatalogField::Model => 1.5,
            CatalogField::Name | CatalogField::Brand => 1.2,
            CatalogField::Package | CatalogField::Description | CatalogField::Category => 1.0,
        }
    }
}

impl CatalogRecord {
    pub fn new(code: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            model: model.into(),
            name: String::new(),
            brand: String::new(),
            package: String::new(),
            description: String::new(),
            category: String::new(),
            stock: 0,
            price_tiers: Vec::new(),
        }
    }

    pub fn field(&self, field: CatalogField) -> &str {
        match field {
            CatalogField::Code => &self.code,
            CatalogField::Model => &self.model,
            CatalogField::Name => &self.name,
            CatalogField::Brand => &self.brand,
            CatalogField::Package => &self.package,
            CatalogField::Description => &self.description,
            CatalogField::Category => &self.category,
        }
    }

    /// 展示名称, 缺省时退回型号
    pub fn display_name(&self) -> &str {
        if self.name.is_empty() {
            &self.model
        } else {
            &self.name
        }
    }

    /// 批量最优价: 单价为正的最高起订量档位的单价
    pub fn best_bulk_price(&self) -> Option<&BigDecimal> {
        self.price_tiers
            .iter()
            .filter(|t| t.unit_price > BigDecimal::zero())
            .max_by(|a, b| {
                a.min_quantity
                    .cmp(&b.min_quantity)
                    .then_with(|| b.unit_price.cmp(&a.unit_price))
            })
            .map(|t| &t.unit_price)
    }

    /// 最低单价
    pub fn unit_price(&self) -> Option<&BigDecimal> {
        self.price_tiers
            .iter()
            .map(|t| &t.unit_price)
            .filter(|p| **p > BigDecimal::zero())
            .min()
    }

    pub fn in_stock(&self) -> bool {
        self.stock > 0
    }

    /// 入库校验: 编码非空, 阶梯价按起订量严格升序且单价为正
    pub fn validate(mut self) -> Result<Self> {
        self.code = self.code.trim().to_string();
        if self.code.is_empty() {
            return Err(MatcherError::invalid_record("", "empty code"));
        }

        // 非正单价视为不可用档位
        self.price_tiers.retain(|t| t.unit_price > BigDecimal::zero());
        self.price_tiers.sort_by_key(|t| t.min_quantity);
        if self
            .price_tiers
            .windows(2)
            .any(|w| w[0].min_quantity == w[1].min_quantity)
        {
            return Err(MatcherError::invalid_record(
                &self.code,
                "duplicate price tier quantity",
            ));
        }

        Ok(self)
    }
}

/// 目录主表行 (catalog_product)
#[derive(Debug, Clone, FromRow)]
pub struct CatalogRow {
    pub code: String,
    pub model: String,
    pub name: String,
    pub brand: String,
    pub package: String,
    pub description: String,
    pub category: String,
    pub stock: i64,
}

/// 阶梯价表行 (catalog_price_tier)
#[derive(Debug, Clone, FromRow)]
pub struct PriceTierRow {
    pub code: String,
    pub min_quantity: i64,
    pub unit_price: BigDecimal,
}

impl CatalogRow {
    pub fn into_record(self, tiers: Vec<PriceTierRow>) -> Result<CatalogRecord> {
        let stock = u64::try_from(self.stock)
            .map_err(|_| MatcherError::invalid_record(&self.code, "negative stock"))?;

        let mut price_tiers = Vec::with_capacity(tiers.len());
        for tier in tiers {
            let min_quantity = u64::try_from(tier.min_quantity)
                .map_err(|_| MatcherError::invalid_record(&self.code, "negative tier quantity"))?;
            price_tiers.push(PriceTier::new(min_quantity, tier.unit_price));
        }

        CatalogRecord {
            code: self.code,
            model: self.model,
            name: self.name,
            brand: self.brand,
            package: self.package,
            description: self.description,
            category: self.category,
            stock,
            price_tiers,
        }
        .validate()
    }
}

/// 数值或字符串 (LCSC 返回的数字字段两种形式都有)
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum NumberOrString {
    Int(i64),
    Float(f64),
    Text(String),
}

impl NumberOrString {
    fn to_i64(&self) -> Option<i64> {
        match self {
            NumberOrString::Int(v) => Some(*v),
            NumberOrString::Float(v) if v.fract() == 0.0 => Some(*v as i64),
            NumberOrString::Float(_) => None,
            NumberOrString::Text(s) => s.trim().parse().ok(),
        }
    }

    fn to_decimal(&self) -> Option<BigDecimal> {
        match self {
            NumberOrString::Int(v) => Some(BigDecimal::from(*v)),
            NumberOrString::Float(v) => BigDecimal::from_str(&v.to_string()).ok(),
            NumberOrString::Text(s) => BigDecimal::from_str(s.trim()).ok(),
        }
    }
}

/// LCSC 阶梯价 JSON
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LcscPriceRow {
    #[serde(default)]
    start_amount: Option<NumberOrString>,
    #[serde(default)]
    start_number: Option<NumberOrString>,
    #[serde(default)]
    product_price: Option<NumberOrString>,
}

/// LCSC 商品 JSON (弱类型, 只在入库边界使用)
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LcscProductRow {
    pub product_code: String,
    #[serde(default)]
    pub product_model: Option<String>,
    #[serde(default)]
    pub product_name: Option<String>,
    #[serde(default)]
    pub brand_name_en: Option<String>,
    #[serde(default)]
    pub brand_name: Option<String>,
    #[serde(default)]
    pub encap_standard: Option<String>,
    #[serde(default)]
    pub package_type: Option<String>,
    #[serde(default)]
    pub product_intro_en: Option<String>,
    #[serde(default)]
    pub parent_catalog_name: Option<String>,
    #[serde(default)]
    stock_number: Option<NumberOrString>,
    #[serde(default)]
    product_price_list: Vec<LcscPriceRow>,
}

fn first_non_empty(candidates: [Option<String>; 2]) -> String {
    candidates
        .into_iter()
        .flatten()
        .find(|s| !s.trim().is_empty())
        .unwrap_or_default()
}

impl TryFrom<LcscProductRow> for CatalogRecord {
    type Error = MatcherError;

    fn try_from(row: LcscProductRow) -> Result<Self> {
        let code = row.product_code;

        let stock = match &row.stock_number {
            None => 0,
            Some(raw) => {
                let value = raw
                    .to_i64()
                    .ok_or_else(|| MatcherError::invalid_record(&code, "unparseable stock"))?;
                u64::try_from(value)
                    .map_err(|_| MatcherError::invalid_record(&code, "negative stock"))?
            }
        };

        let mut price_tiers = Vec::with_capacity(row.product_price_list.len());
        for tier in &row.product_price_list {
            let quantity = tier
                .start_amount
                .as_ref()
                .or(tier.start_number.as_ref())
                .and_then(NumberOrString::to_i64)
                .unwrap_or(0);
            let min_quantity = u64::try_from(quantity)
                .map_err(|_| MatcherError::invalid_record(&code, "negative tier quantity"))?;
            let unit_price = tier
                .product_price
                .as_ref()
                .and_then(NumberOrString::to_decimal)
                .ok_or_else(|| MatcherError::invalid_record(&code, "unparseable unit price"))?;
            price_tiers.push(PriceTier::new(min_quantity, unit_price));
        }

        let model = row.product_model.unwrap_or_default();
        let name = row.product_name.clone().unwrap_or_default();

        CatalogRecord {
            code,
            model,
            name,
            brand: first_non_empty([row.brand_name_en, row.brand_name]),
            package: first_non_empty([row.encap_standard, row.package_type]),
            description: first_non_empty([row.product_intro_en, row.product_name]),
            category: row.parent_catalog_name.unwrap_or_default(),
            stock,
            price_tiers,
        }
        .validate()
    }
}
