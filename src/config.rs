use serde::{Deserialize, Serialize};

/// 模糊匹配判定比例 (≥ 0.75 才算命中)
pub const DEFAULT_FUZZY_MATCH_RATIO: f64 = 0.75;
/// 短于该长度的关键词只做子串匹配
pub const DEFAULT_MIN_FUZZY_TOKEN_LEN: usize = 4;
/// 超过该长度的字段只做逐词比较
pub const DEFAULT_MAX_FUZZY_FIELD_LEN: usize = 100;
/// 逐词比较时允许的词长差
pub const DEFAULT_WORD_LEN_WINDOW: usize = 3;
/// 匹配接受阈值 (0-100)
pub const DEFAULT_CONFIDENCE_THRESHOLD: f64 = 75.0;
pub const DEFAULT_MAX_ALTERNATIVES: usize = 5;
pub const DEFAULT_PAGE_SIZE: usize = 50;

/// 应用配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub catalog: CatalogSourceConfig,
    #[serde(default)]
    pub matcher: MatcherConfig,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            database: DatabaseConfig::default(),
            catalog: CatalogSourceConfig::default(),
            matcher: MatcherConfig::default(),
            log_level: default_log_level(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: std::env::var("DATABASE_URL")
                .unwrap_or_else(|_| "postgres://localhost/lcsc_catalog".to_string()),
            max_connections: default_max_connections(),
        }
    }
}

/// 目录来源: 指定 JSON 文件时不连接数据库
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogSourceConfig {
    #[serde(default)]
    pub json_path: Option<String>,
    /// 数据库目录为空时从该 JSON 文件导入
    #[serde(default)]
    pub seed_json_path: Option<String>,
}

/// 匹配器参数
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatcherConfig {
    #[serde(default = "default_confidence_threshold")]
    pub confidence_threshold: f64,
    #[serde(default = "default_max_alternatives")]
    pub max_alternatives: usize,
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    #[serde(default)]
    pub scoring: ScoringConfig,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            max_alternatives: DEFAULT_MAX_ALTERNATIVES,
            page_size: DEFAULT_PAGE_SIZE,
            scoring: ScoringConfig::default(),
        }
    }
}

impl MatcherConfig {
    pub fn with_threshold(mut self, confidence_threshold: f64) -> Self {
        self.confidence_threshold = confidence_threshold;
        self
    }
}

/// 字段评分参数
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoringConfig {
    #[serde(default = "default_fuzzy_match_ratio")]
    pub fuzzy_match_ratio: f64,
    #[serde(default = "default_min_fuzzy_token_len")]
    pub min_fuzzy_token_len: usize,
    #[serde(default = "default_max_fuzzy_field_len")]
    pub max_fuzzy_field_len: usize,
    #[serde(default = "default_word_len_window")]
    pub word_len_window: usize,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            fuzzy_match_ratio: DEFAULT_FUZZY_MATCH_RATIO,
            min_fuzzy_token_len: DEFAULT_MIN_FUZZY_TOKEN_LEN,
            max_fuzzy_field_len: DEFAULT_MAX_FUZZY_FIELD_LEN,
            word_len_window: DEFAULT_WORD_LEN_WINDOW,
        }
    }
}

impl AppConfig {
    /// 加载配置: matcher.toml (可选) + 环境变量 BOM_MATCHER__*
    pub fn load() -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(config::File::with_name("matcher").required(false))
            .add_source(
                config::Environment::with_prefix("BOM_MATCHER")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_max_connections() -> u32 {
    20
}

fn default_confidence_threshold() -> f64 {
    DEFAULT_CONFIDENCE_THRESHOLD
}

fn default_max_alternatives() -> usize {
    DEFAULT_MAX_ALTERNATIVES
}

fn default_page_size() -> usize {
    DEFAULT_PAGE_SIZE
}

fn default_fuzzy_match_ratio() -> f64 {
    DEFAULT_FUZZY_MATCH_RATIO
}

fn default_min_fuzzy_token_len() -> usize {
    DEFAULT_MIN_FUZZY_TOKEN_LEN
}

fn default_max_fuzzy_field_len() -> usize {
    DEFAULT_MAX_FUZZY_FIELD_LEN
}

fn default_word_len_window() -> usize {
    DEFAULT_WORD_LEN_WINDOW
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_matcher_config() {
        let cfg = MatcherConfig::default();
        assert_eq!(cfg.confidence_threshold, 75.0);
        assert_eq!(cfg.max_alternatives, 5);
        assert_eq!(cfg.scoring.fuzzy_match_ratio, 0.75);
        assert_eq!(cfg.scoring.min_fuzzy_token_len, 4);
        assert_eq!(cfg.scoring.max_fuzzy_field_len, 100);
    }

    #[test]
    fn test_partial_matcher_section_uses_defaults() {
        let cfg: MatcherConfig = serde_json::from_str(r#"{"confidence_threshold": 80}"#).unwrap();
        assert_eq!(cfg.confidence_threshold, 80.0);
        assert_eq!(cfg.max_alternatives, DEFAULT_MAX_ALTERNATIVES);
        assert_eq!(cfg.scoring, ScoringConfig::default());
    }

    #[test]
    fn test_default_server() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.server.port, 8080);
        assert!(cfg.catalog.json_path.is_none());
    }
}
