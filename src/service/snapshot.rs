use crate::config::ScoringConfig;
use crate::error::{MatcherError, Result};
use crate::models::{CatalogField, CatalogRecord, LcscProductRow, QueryResult};
use crate::service::normalize::normalize;
use crate::service::query::{CatalogProvider, CatalogQuery, CatalogQueryEngine, Searchable};
use indexmap::IndexMap;
use serde::Deserialize;
use std::borrow::Cow;
use std::path::Path;

/// 预先规范化字段的目录条目
#[derive(Debug, Clone)]
pub struct PreparedRecord {
    record: CatalogRecord,
    fields: [String; 7],
}

impl PreparedRecord {
    pub fn new(record: CatalogRecord) -> Self {
        let fields = CatalogField::ALL.map(|f| normalize(record.field(f)));
        Self { record, fields }
    }
}

impl Searchable for PreparedRecord {
    fn record(&self) -> &CatalogRecord {
        &self.record
    }

    fn normalized_field(&self, field: CatalogField) -> Cow<'_, str> {
        Cow::Borrowed(&self.fields[field as usize])
    }
}

/// LCSC 导出文件: 裸数组或 {"productList": [...]}
#[derive(Deserialize)]
#[serde(untagged)]
enum LcscDocument {
    List(Vec<LcscProductRow>),
    Wrapped {
        #[serde(rename = "productList")]
        product_list: Vec<LcscProductRow>,
    },
}

/// 内存目录快照, 创建后不可变
///
/// 编码唯一; 记录保持导入顺序。
#[derive(Debug, Clone, Default)]
pub struct CatalogSnapshot {
    entries: Vec<PreparedRecord>,
    by_code: IndexMap<String, usize>,
    engine: CatalogQueryEngine,
}

impl CatalogSnapshot {
    /// 严格构建: 任一记录校验失败或编码重复即报错
    pub fn new(records: impl IntoIterator<Item = CatalogRecord>) -> Result<Self> {
        let mut snapshot = Self::default();
        for record in records {
            let record = record.validate()?;
            if snapshot.by_code.contains_key(&record.code) {
                return Err(MatcherError::DuplicateCode(record.code));
            }
            snapshot.push(record);
        }
        Ok(snapshot)
    }

    /// 宽松构建: 跳过坏行和重复编码 (保留首条)
    pub fn from_rows_lenient(rows: impl IntoIterator<Item = Result<CatalogRecord>>) -> Self {
        let mut snapshot = Self::default();
        let mut rejected = 0usize;

        for row in rows {
            let record = match row.and_then(CatalogRecord::validate) {
                Ok(record) => record,
                Err(e) => {
                    tracing::warn!("跳过目录行: {}", e);
                    rejected += 1;
                    continue;
                }
            };
            if snapshot.by_code.contains_key(&record.code) {
                tracing::warn!("跳过重复编码: {}", record.code);
                rejected += 1;
                continue;
            }
            snapshot.push(record);
        }

        tracing::info!(
            "目录快照构建完成: {} 条记录, 跳过 {} 条",
            snapshot.len(),
            rejected
        );
        snapshot
    }

    /// 从 LCSC 形式的 JSON 文本构建
    pub fn from_json_str(json: &str) -> Result<Self> {
        let rows = match serde_json::from_str::<LcscDocument>(json)? {
            LcscDocument::List(rows) => rows,
            LcscDocument::Wrapped { product_list } => product_list,
        };
        Ok(Self::from_rows_lenient(rows.into_iter().map(CatalogRecord::try_from)))
    }

    pub fn load_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&text)
    }

    pub fn with_scoring(mut self, scoring: ScoringConfig) -> Self {
        self.engine = CatalogQueryEngine::new(scoring);
        self
    }

    fn push(&mut self, record: CatalogRecord) {
        self.by_code.insert(record.code.clone(), self.entries.len());
        self.entries.push(PreparedRecord::new(record));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, code: &str) -> Option<&CatalogRecord> {
        self.by_code.get(code).map(|&idx| &self.entries[idx].record)
    }

    pub fn records(&self) -> impl Iterator<Item = &CatalogRecord> {
        self.entries.iter().map(|e| &e.record)
    }
}

impl CatalogProvider for CatalogSnapshot {
    fn find(&self, query: &CatalogQuery) -> Result<QueryResult> {
        self.engine.execute(&self.entries, query)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_duplicate_code_rejected() {
        let err = CatalogSnapshot::new(vec![
            CatalogRecord::new("C1", "A"),
            CatalogRecord::new("C1", "B"),
        ])
        .unwrap_err();
        assert!(matches!(err, MatcherError::DuplicateCode(code) if code == "C1"));
    }

    #[test]
    fn test_lenient_keeps_first_duplicate() {
        let snap = CatalogSnapshot::from_rows_lenient(vec![
            Ok(CatalogRecord::new("C1", "A")),
            Ok(CatalogRecord::new("C1", "B")),
            Ok(CatalogRecord::new("", "C")),
            Err(MatcherError::invalid_record("C7", "bad")),
        ]);
        assert_eq!(snap.len(), 1);
        assert_eq!(snap.get("C1").unwrap().model, "A");
    }

    #[test]
    fn test_find_uses_prepared_fields() {
        let mut r = CatalogRecord::new("C1525", "CL05B104KO5NNNC");
        r.description = "100nF ±10% 16V X7R 0402".into();
        let snap = CatalogSnapshot::new(vec![r]).unwrap();
        let res = snap.find(&CatalogQuery::from_keyword("±10% 0402", 1, 10)).unwrap();
        assert_eq!(res.total, 1);
    }

    #[test]
    fn test_json_wrapped_document() {
        let json = r#"{"productList": [
            {"productCode": "C1", "productModel": "10K0603", "stockNumber": 1000,
             "productPriceList": [{"startAmount": 1, "productPrice": "0.01"}]},
            {"productCode": "C2", "productModel": "BAD", "stockNumber": -5}
        ]}"#;
        let snap = CatalogSnapshot::from_json_str(json).unwrap();
        assert_eq!(snap.len(), 1);
        assert!(snap.get("C2").is_none());
    }

    #[test]
    fn test_load_json_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"[{{"productCode": "C3", "productModel": "LM358"}}]"#).unwrap();
        let snap = CatalogSnapshot::load_json_file(file.path()).unwrap();
        assert_eq!(snap.records().count(), 1);
    }
}
