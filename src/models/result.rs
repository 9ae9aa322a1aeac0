use crate::models::{BomLine, CatalogRecord};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 匹配方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchMethod {
    Exact,
    Fuzzy,
    None,
    Error,
}

impl MatchMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            MatchMethod::Exact => "exact",
            MatchMethod::Fuzzy => "fuzzy",
            MatchMethod::None => "none",
            MatchMethod::Error => "error",
        }
    }
}

/// 置信度等级
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfidenceLevel {
    High,
    Medium,
    Low,
    None,
}

impl ConfidenceLevel {
    pub fn from_score(score: f64) -> Self {
        if score >= 90.0 {
            ConfidenceLevel::High
        } else if score >= 70.0 {
            ConfidenceLevel::Medium
        } else if score > 0.0 {
            ConfidenceLevel::Low
        } else {
            ConfidenceLevel::None
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ConfidenceLevel::High => "High",
            ConfidenceLevel::Medium => "Medium",
            ConfidenceLevel::Low => "Low",
            ConfidenceLevel::None => "None",
        }
    }
}

/// 单行 BOM 匹配结果, 构造后不可变
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    pub line: BomLine,
    pub selected: Option<CatalogRecord>,
    pub score: f64,
    pub method: MatchMethod,
    pub alternatives: Vec<CatalogRecord>,
    pub note: Option<String>,
    pub matched_at: DateTime<Utc>,
}

impl MatchResult {
    /// 无候选
    pub fn none(line: BomLine) -> Self {
        Self {
            line,
            selected: None,
            score: 0.0,
            method: MatchMethod::None,
            alternatives: Vec::new(),
            note: None,
            matched_at: Utc::now(),
        }
    }

    /// 目录查询失败
    pub fn error(line: BomLine, message: impl Into<String>) -> Self {
        Self {
            note: Some(message.into()),
            method: MatchMethod::Error,
            ..Self::none(line)
        }
    }

    pub fn is_matched(&self) -> bool {
        self.selected.is_some()
    }

    pub fn is_error(&self) -> bool {
        self.method == MatchMethod::Error
    }

    pub fn confidence_level(&self) -> ConfidenceLevel {
        ConfidenceLevel::from_score(self.score)
    }
}

/// 目录分页查询结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    pub total: usize,
    pub page: usize,
    pub page_size: usize,
    pub records: Vec<CatalogRecord>,
}

impl QueryResult {
    pub fn total_pages(&self) -> usize {
        if self.page_size == 0 {
            return 0;
        }
        self.total.div_ceil(self.page_size)
    }

    pub fn has_more(&self) -> bool {
        self.page < self.total_pages()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confidence_levels() {
        assert_eq!(ConfidenceLevel::from_score(95.0), ConfidenceLevel::High);
        assert_eq!(ConfidenceLevel::from_score(70.0), ConfidenceLevel::Medium);
        assert_eq!(ConfidenceLevel::from_score(12.5), ConfidenceLevel::Low);
        assert_eq!(ConfidenceLevel::from_score(0.0), ConfidenceLevel::None);
    }

    #[test]
    fn test_error_result_carries_note() {
        let r = MatchResult::error(BomLine::new("x"), "catalog offline");
        assert_eq!(r.method, MatchMethod::Error);
        assert_eq!(r.note.as_deref(), Some("catalog offline"));
        assert!(!r.is_matched());
    }

    #[test]
    fn test_method_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&MatchMethod::Fuzzy).unwrap(), "\"fuzzy\"");
    }

    #[test]
    fn test_query_result_pages() {
        let q = QueryResult { total: 31, page: 1, page_size: 10, records: Vec::new() };
        assert_eq!(q.total_pages(), 4);
        assert!(q.has_more());
    }
}
