use thiserror::Error;

/// 引擎统一结果类型
pub type Result<T> = std::result::Result<T, MatcherError>;

/// 匹配引擎错误
///
/// 无匹配 / 低于阈值不是错误, 通过 `MatchMethod::None` 表达。
#[derive(Debug, Error)]
pub enum MatcherError {
    /// 非法查询参数 (页码或页大小为 0), 在评分前同步拒绝
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    /// 目录提供方不可用或返回了坏数据
    #[error("catalog lookup failed: {0}")]
    LookupFailure(String),

    /// 入库校验失败的目录行
    #[error("invalid catalog record {code:?}: {reason}")]
    InvalidRecord { code: String, reason: String },

    /// 同一快照中出现重复编码
    #[error("duplicate catalog code: {0}")]
    DuplicateCode(String),

    #[error(transparent)]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl MatcherError {
    pub(crate) fn invalid_record(code: &str, reason: impl Into<String>) -> Self {
        Self::InvalidRecord {
            code: code.to_string(),
            reason: reason.into(),
        }
    }
}
