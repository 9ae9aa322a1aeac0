use crate::config::MatcherConfig;
use crate::models::{BomLine, CatalogRecord, MatchMethod, MatchResult};
use crate::service::cache::{CacheKey, MatchCache};
use crate::service::normalize::{normalize, tokenize};
use crate::service::query::{CatalogProvider, CatalogQuery};
use crate::service::scorer::{partial_ratio, ratio};
use indexmap::IndexMap;
use rayon::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// 查询候选时在备选数量之外多取的条数
const CANDIDATE_HEADROOM: usize = 5;

/// 展示名称 / 型号 / 描述 三项信号的权重 (合计 100)
const NAME_WEIGHT: f64 = 50.0;
const MPN_WEIGHT: f64 = 40.0;
const DESCRIPTION_WEIGHT: f64 = 10.0;

/// 候选评分 (0-100), `text` 需已规范化
pub fn score_candidate(text: &str, record: &CatalogRecord) -> f64 {
    let name = normalize(record.display_name());
    let mpn = normalize(&record.model);
    let description = normalize(&record.description);

    ratio(text, &name) * NAME_WEIGHT
        + ratio(text, &mpn) * MPN_WEIGHT
        + partial_ratio(text, &description) * DESCRIPTION_WEIGHT
}

/// BOM 行匹配服务
///
/// 目录查询 → 候选重新评分 → 阈值判定 → 备选列表; 结果按规范化文本缓存。
pub struct BomItemMatcher {
    provider: Arc<dyn CatalogProvider>,
    config: MatcherConfig,
    cache: MatchCache,
    rescores: AtomicUsize,
}

impl BomItemMatcher {
    pub fn new(provider: Arc<dyn CatalogProvider>, config: MatcherConfig) -> Self {
        Self {
            provider,
            config,
            cache: MatchCache::new(),
            rescores: AtomicUsize::new(0),
        }
    }

    pub fn config(&self) -> &MatcherConfig {
        &self.config
    }

    /// 使用配置中的备选数量匹配
    pub fn match_item(&self, line: &BomLine) -> MatchResult {
        self.match_line(line, self.config.max_alternatives)
    }

    /// 匹配单行 BOM
    ///
    /// 缓存键为 (规范化文本, 备选数量), 不同备选数量各自计算。
    pub fn match_line(&self, line: &BomLine, max_alternatives: usize) -> MatchResult {
        let key = CacheKey::new(normalize(&line.raw_text), max_alternatives);
        tracing::info!("Matching item: {}", line.raw_text);

        let (result, hit) = self
            .cache
            .get_or_compute(&key, || self.compute(line, &key.text, max_alternatives));

        if hit {
            tracing::debug!("Cache hit for: {}", key.text);
            return MatchResult {
                line: line.clone(),
                ..result
            };
        }
        result
    }

    fn compute(&self, line: &BomLine, text: &str, max_alternatives: usize) -> MatchResult {
        self.rescores.fetch_add(1, Ordering::Relaxed);

        let tokens = tokenize(text);
        if tokens.is_empty() {
            // 空文本不能走浏览模式
            return MatchResult::none(line.clone());
        }

        let query = CatalogQuery::new(tokens, 1, max_alternatives.saturating_add(CANDIDATE_HEADROOM));
        let found = match self.provider.find(&query) {
            Ok(found) => found,
            Err(e) => {
                tracing::error!("Error matching item {}: {}", line.raw_text, e);
                return MatchResult::error(line.clone(), format!("Error: {}", e));
            }
        };

        if found.records.is_empty() {
            tracing::warn!("No matches found for: {}", line.raw_text);
            return MatchResult::none(line.clone());
        }

        let mut scored: Vec<(CatalogRecord, f64)> = found
            .records
            .into_iter()
            .map(|record| {
                let score = score_candidate(text, &record);
                (record, score)
            })
            .collect();
        // 稳定排序, 同分保持目录查询顺序
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));

        let best_score = scored[0].1;
        let accepted = best_score >= self.config.confidence_threshold;
        let method = if !accepted {
            MatchMethod::None
        } else if best_score == 100.0 {
            MatchMethod::Exact
        } else {
            MatchMethod::Fuzzy
        };

        let mut ranked = scored.into_iter().map(|(record, _)| record);
        let (selected, alternatives) = if accepted {
            let best = ranked.next();
            (best, ranked.take(max_alternatives.saturating_sub(1)).collect())
        } else {
            // 未达阈值: 最佳候选仍作为首个备选
            (None, ranked.take(max_alternatives).collect())
        };

        tracing::info!(
            "Match score: {:.1}% ({}) for {}",
            best_score,
            method.as_str(),
            line.raw_text
        );

        MatchResult {
            selected,
            score: best_score,
            method,
            alternatives,
            ..MatchResult::none(line.clone())
        }
    }

    /// 顺序批量匹配, 每行完成后回调 (已完成数, 总数, 行标识)
    pub fn batch_match<F>(&self, lines: &[BomLine], mut progress: Option<F>) -> Vec<MatchResult>
    where
        F: FnMut(usize, usize, &str),
    {
        let total = lines.len();
        tracing::info!("Starting batch match for {} items", total);

        let mut results = Vec::with_capacity(total);
        for (idx, line) in lines.iter().enumerate() {
            results.push(self.match_item(line));

            let done = idx + 1;
            if let Some(cb) = progress.as_mut() {
                cb(done, total, line.identifier());
            }
            if done % 100 == 0 || done == 1 {
                tracing::info!("BOM进度: {}/{}", done, total);
            }
        }

        tracing::info!("Batch match completed: {} items processed", total);
        results
    }

    /// 并行批量匹配; 结果保持输入顺序, 回调按完成顺序触发
    ///
    /// 先按规范化文本分组, 每组只匹配一次, 结果复制给组内各行。
    pub fn par_batch_match<F>(&self, lines: &[BomLine], progress: Option<&F>) -> Vec<MatchResult>
    where
        F: Fn(usize, usize, &str) + Sync,
    {
        let total = lines.len();
        let completed = AtomicUsize::new(0);

        let mut groups: IndexMap<String, Vec<usize>> = IndexMap::new();
        for (idx, line) in lines.iter().enumerate() {
            groups.entry(normalize(&line.raw_text)).or_default().push(idx);
        }
        let groups: Vec<Vec<usize>> = groups.into_values().collect();
        tracing::info!(
            "Starting parallel batch match for {} items ({} distinct)",
            total,
            groups.len()
        );

        let matched: Vec<Vec<(usize, MatchResult)>> = groups
            .par_iter()
            .map(|indices| {
                let first = self.match_item(&lines[indices[0]]);
                indices
                    .iter()
                    .map(|&idx| {
                        let line = &lines[idx];
                        let result = MatchResult {
                            line: line.clone(),
                            ..first.clone()
                        };
                        let done = completed.fetch_add(1, Ordering::SeqCst) + 1;
                        if let Some(cb) = progress {
                            cb(done, total, line.identifier());
                        }
                        (idx, result)
                    })
                    .collect()
            })
            .collect();

        let mut ordered: Vec<Option<MatchResult>> = vec![None; total];
        for (idx, result) in matched.into_iter().flatten() {
            ordered[idx] = Some(result);
        }
        let results: Vec<MatchResult> = ordered.into_iter().flatten().collect();

        tracing::info!("Parallel batch match completed: {} items processed", total);
        results
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
        tracing::info!("Match cache cleared");
    }

    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }

    /// 实际执行评分的次数 (缓存命中不计)
    pub fn rescore_count(&self) -> usize {
        self.rescores.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{MatcherError, Result};
    use crate::models::QueryResult;
    use crate::service::snapshot::CatalogSnapshot;

    struct Offline;

    impl CatalogProvider for Offline {
        fn find(&self, _query: &CatalogQuery) -> Result<QueryResult> {
            Err(MatcherError::LookupFailure("connection refused".into()))
        }
    }

    fn catalog() -> Arc<CatalogSnapshot> {
        let mut a = CatalogRecord::new("C25804", "0603WAF1002T5E");
        a.name = "10k 0603".into();
        a.description = "10kΩ ±1% 100mW 0603 thick film resistor".into();
        let mut b = CatalogRecord::new("C25805", "0603WAF1002T5A");
        b.name = "10k resistor 5%".into();
        b.description = "10kΩ ±5% 100mW 0603".into();
        Arc::new(CatalogSnapshot::new(vec![a, b]).unwrap())
    }

    #[test]
    fn test_score_candidate_exact() {
        let mut r = CatalogRecord::new("C1", "LM358");
        r.description = "lm358".into();
        assert_eq!(score_candidate("lm358", &r), 100.0);
    }

    #[test]
    fn test_exact_match_method() {
        let mut r = CatalogRecord::new("C1", "LM358");
        r.description = "LM358 dual op amp".into();
        let matcher = BomItemMatcher::new(
            Arc::new(CatalogSnapshot::new(vec![r]).unwrap()),
            MatcherConfig::default(),
        );
        let res = matcher.match_line(&BomLine::new("LM358"), 5);
        assert_eq!(res.method, MatchMethod::Exact);
        assert_eq!(res.score, 100.0);
        assert_eq!(res.selected.unwrap().code, "C1");
        assert!(res.alternatives.is_empty());
    }

    #[test]
    fn test_best_candidate_selected() {
        let matcher = BomItemMatcher::new(catalog(), MatcherConfig::default().with_threshold(50.0));
        let res = matcher.match_line(&BomLine::new("10k 0603"), 5);
        assert_eq!(res.method, MatchMethod::Fuzzy);
        assert!(res.score >= 50.0 && res.score < 100.0);
        assert_eq!(res.selected.as_ref().unwrap().code, "C25804");
        assert_eq!(res.alternatives.len(), 1);
        assert_eq!(res.alternatives[0].code, "C25805");
    }

    #[test]
    fn test_below_threshold_keeps_candidate_as_alternative() {
        let matcher = BomItemMatcher::new(catalog(), MatcherConfig::default().with_threshold(101.0));
        let res = matcher.match_line(&BomLine::new("10k 0603"), 5);
        assert_eq!(res.method, MatchMethod::None);
        assert!(res.selected.is_none());
        assert_eq!(res.alternatives[0].code, "C25804");
        assert!(res.score > 0.0);
    }

    #[test]
    fn test_provider_failure_is_error_and_not_cached() {
        let matcher = BomItemMatcher::new(Arc::new(Offline), MatcherConfig::default());
        let line = BomLine::new("10k 0603");
        let first = matcher.match_line(&line, 5);
        assert_eq!(first.method, MatchMethod::Error);
        assert!(first.note.as_deref().unwrap().contains("connection refused"));
        matcher.match_line(&line, 5);
        assert_eq!(matcher.rescore_count(), 2);
        assert_eq!(matcher.cache_len(), 0);
    }

    #[test]
    fn test_empty_text_is_none() {
        let matcher = BomItemMatcher::new(catalog(), MatcherConfig::default());
        let res = matcher.match_line(&BomLine::new("   "), 5);
        assert_eq!(res.method, MatchMethod::None);
        assert!(res.alternatives.is_empty());
    }

    #[test]
    fn test_cache_hit_rebinds_line() {
        let matcher = BomItemMatcher::new(catalog(), MatcherConfig::default());
        let a = matcher.match_line(&BomLine::new("10k 0603").with_reference("R1"), 5);
        let b = matcher.match_line(&BomLine::new("10K  0603").with_reference("R7"), 5);
        assert_eq!(matcher.rescore_count(), 1);
        assert_eq!(b.line.reference_designator.as_deref(), Some("R7"));
        assert_eq!(a.selected, b.selected);
        assert_eq!(a.matched_at, b.matched_at);
    }

    #[test]
    fn test_batch_progress_in_order() {
        let matcher = BomItemMatcher::new(catalog(), MatcherConfig::default());
        let lines = vec![BomLine::new("10k 0603"), BomLine::new("nothing here"), BomLine::new("100k")];
        let mut seen = Vec::new();
        let results = matcher.batch_match(
            &lines,
            Some(|done: usize, total: usize, id: &str| seen.push((done, total, id.to_string()))),
        );
        assert_eq!(results.len(), 3);
        assert_eq!(results[1].method, MatchMethod::None);
        assert_eq!(
            seen,
            vec![
                (1, 3, "10k 0603".to_string()),
                (2, 3, "nothing here".to_string()),
                (3, 3, "100k".to_string()),
            ]
        );
    }

    #[test]
    fn test_candidate_score_weights_indel_ratios() {
        let snapshot = catalog();
        let best = snapshot.get("C25804").unwrap();
        let other = snapshot.get("C25805").unwrap();
        // 名称 1.0·50 + 型号 8/22·40 + 描述局部 0.75·10
        let expected = 1.0 * 50.0 + (8.0 / 22.0) * 40.0 + 0.75 * 10.0;
        assert!((score_candidate("10k 0603", best) - expected).abs() < 1e-9);
        assert!(score_candidate("10k 0603", other) < 40.0);

        // 72 分低于默认阈值 75
        let matcher = BomItemMatcher::new(snapshot, MatcherConfig::default());
        let res = matcher.match_line(&BomLine::new("10k 0603"), 5);
        assert_eq!(res.method, MatchMethod::None);
        assert_eq!(res.alternatives[0].code, "C25804");
    }

    #[test]
    fn test_alternative_count_is_cached_separately() {
        let matcher = BomItemMatcher::new(catalog(), MatcherConfig::default().with_threshold(50.0));
        let line = BomLine::new("10k 0603");
        assert!(matcher.match_line(&line, 1).alternatives.is_empty());
        assert_eq!(matcher.match_line(&line, 5).alternatives.len(), 1);
        assert_eq!(matcher.rescore_count(), 2);
        matcher.match_line(&line, 5);
        assert_eq!(matcher.rescore_count(), 2);
    }
}
