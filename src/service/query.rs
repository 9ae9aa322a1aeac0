//! 目录查询: 多关键词 AND 过滤 + 全序排序 + 分页
//!
//! 排序规则 (两种模式二选一):
//! - 关键词模式: 综合分降序 → 库存降序 → 编码升序
//! - 浏览模式 (无关键词): 批量最优价升序 (无价格排最后) → 库存降序 → 编码升序
//!
//! 编码在快照内唯一, 因此排序是全序, 翻页不会重复或遗漏。
//! 翻页期间目录本身发生变化不在保证范围内。

use crate::config::ScoringConfig;
use crate::error::{MatcherError, Result};
use crate::models::{CatalogField, CatalogRecord, QueryResult};
use crate::service::normalize::{normalize, tokenize};
use crate::service::scorer::FieldScorer;
use bigdecimal::BigDecimal;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::cmp::Ordering;

/// 综合分中平均字段分的权重
const AVG_WEIGHT: f64 = 0.7;
/// 综合分中关键词覆盖率的权重
const COMPLETENESS_WEIGHT: f64 = 0.3;

/// 关键词匹配方式
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchType {
    /// 只认子串命中
    Exact,
    #[default]
    Fuzzy,
}

/// 目录查询请求
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogQuery {
    pub tokens: Vec<String>,
    #[serde(default)]
    pub match_type: MatchType,
    pub page: usize,
    pub page_size: usize,
}

impl CatalogQuery {
    pub fn new(tokens: Vec<String>, page: usize, page_size: usize) -> Self {
        Self {
            tokens,
            match_type: MatchType::Fuzzy,
            page,
            page_size,
        }
    }

    /// 从搜索框文本构造 (按空白切分)
    pub fn from_keyword(keyword: &str, page: usize, page_size: usize) -> Self {
        Self::new(tokenize(keyword), page, page_size)
    }

    pub fn with_match_type(mut self, match_type: MatchType) -> Self {
        self.match_type = match_type;
        self
    }

    /// 页码从 1 开始, 页大小至少为 1
    pub fn validate(&self) -> Result<()> {
        if self.page == 0 {
            return Err(MatcherError::InvalidQuery("page must be >= 1".to_string()));
        }
        if self.page_size == 0 {
            return Err(MatcherError::InvalidQuery("page_size must be >= 1".to_string()));
        }
        Ok(())
    }
}

/// 目录数据提供方
///
/// 自行过滤的实现 (数据库, 远程服务) 必须遵守与 [`CatalogQueryEngine`] 相同的过滤和排序约定,
/// 并返回真实的 total。在 rayon 工作线程内被调用时 (并行批量匹配) 不应再等待 rayon 任务。
pub trait CatalogProvider: Send + Sync {
    fn find(&self, query: &CatalogQuery) -> Result<QueryResult>;
}

/// 可被检索的目录条目
pub trait Searchable: Sync {
    fn record(&self) -> &CatalogRecord;

    /// 规范化后的字段文本
    fn normalized_field(&self, field: CatalogField) -> Cow<'_, str>;
}

impl Searchable for CatalogRecord {
    fn record(&self) -> &CatalogRecord {
        self
    }

    fn normalized_field(&self, field: CatalogField) -> Cow<'_, str> {
        Cow::Owned(normalize(self.field(field)))
    }
}

/// 排序键
enum RankKey<'a> {
    Score(f64),
    BulkPrice(Option<&'a BigDecimal>),
}

struct Hit<'a> {
    key: RankKey<'a>,
    record: &'a CatalogRecord,
}

fn compare_hits(a: &Hit<'_>, b: &Hit<'_>) -> Ordering {
    let primary = match (&a.key, &b.key) {
        (RankKey::Score(x), RankKey::Score(y)) => y.total_cmp(x),
        (RankKey::BulkPrice(x), RankKey::BulkPrice(y)) => match (x, y) {
            (Some(x), Some(y)) => x.cmp(y),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        },
        // 同一次查询只会出现一种键
        _ => Ordering::Equal,
    };
    primary
        .then_with(|| b.record.stock.cmp(&a.record.stock))
        .then_with(|| a.record.code.cmp(&b.record.code))
}

/// 目录查询引擎 (无状态)
#[derive(Debug, Clone, Copy, Default)]
pub struct CatalogQueryEngine {
    scorer: FieldScorer,
}

impl CatalogQueryEngine {
    pub fn new(scoring: ScoringConfig) -> Self {
        Self {
            scorer: FieldScorer::new(scoring),
        }
    }

    pub fn scorer(&self) -> &FieldScorer {
        &self.scorer
    }

    /// 模糊模式查询
    pub fn query<T: Searchable>(
        &self,
        catalog: &[T],
        tokens: &[String],
        page: usize,
        page_size: usize,
    ) -> Result<QueryResult> {
        self.execute(catalog, &CatalogQuery::new(tokens.to_vec(), page, page_size))
    }

    pub fn execute<T: Searchable>(&self, catalog: &[T], query: &CatalogQuery) -> Result<QueryResult> {
        query.validate()?;

        let tokens: Vec<String> = query
            .tokens
            .iter()
            .flat_map(|t| tokenize(t))
            .collect();

        // 已在 rayon 工作线程内 (并行批量匹配) 时顺序扫描, 不再嵌套派发任务
        let nested = rayon::current_thread_index().is_some();
        let mut hits: Vec<Hit<'_>> = if nested {
            catalog
                .iter()
                .filter_map(|entry| self.hit(entry, &tokens, query.match_type))
                .collect()
        } else {
            catalog
                .par_iter()
                .filter_map(|entry| self.hit(entry, &tokens, query.match_type))
                .collect()
        };

        if nested {
            hits.sort_by(compare_hits);
        } else {
            hits.par_sort_by(compare_hits);
        }

        let total = hits.len();
        let start = (query.page - 1).saturating_mul(query.page_size);
        let records = hits
            .iter()
            .skip(start)
            .take(query.page_size)
            .map(|hit| hit.record.clone())
            .collect();

        tracing::debug!(
            "catalog query tokens={:?} mode={:?} total={} page={}",
            tokens,
            query.match_type,
            total,
            query.page
        );

        Ok(QueryResult {
            total,
            page: query.page,
            page_size: query.page_size,
            records,
        })
    }

    /// 无关键词按批量价排序, 否则按综合分 (未通过过滤返回 None)
    fn hit<'a, T: Searchable>(
        &self,
        entry: &'a T,
        tokens: &[String],
        match_type: MatchType,
    ) -> Option<Hit<'a>> {
        let record = entry.record();
        if tokens.is_empty() {
            return Some(Hit {
                key: RankKey::BulkPrice(record.best_bulk_price()),
                record,
            });
        }
        self.score_entry(entry, tokens, match_type).map(|score| Hit {
            key: RankKey::Score(score),
            record,
        })
    }

    /// 记录综合分; 任一关键词未命中任何字段返回 None
    pub fn score_entry<T: Searchable>(
        &self,
        entry: &T,
        tokens: &[String],
        match_type: MatchType,
    ) -> Option<f64> {
        if tokens.is_empty() {
            return None;
        }

        let fields: Vec<(CatalogField, Cow<'_, str>)> = CatalogField::ALL
            .iter()
            .map(|&f| (f, entry.normalized_field(f)))
            .collect();

        let mut sum = 0.0;
        let mut matched = 0usize;
        for token in tokens {
            let mut best = 0.0_f64;
            for (field, text) in &fields {
                let raw = match match_type {
                    MatchType::Exact => self.scorer.score_exact(token, text),
                    MatchType::Fuzzy => self.scorer.score_normalized(token, text),
                };
                if raw > 0.0 {
                    best = best.max(raw * field.weight());
                }
            }
            if best <= 0.0 {
                return None;
            }
            sum += best;
            matched += 1;
        }

        let avg = sum / tokens.len() as f64;
        // 通过 AND 过滤后覆盖率恒为 1.0
        let completeness = matched as f64 / tokens.len() as f64;
        Some(AVG_WEIGHT * avg + COMPLETENESS_WEIGHT * completeness)
    }
}
