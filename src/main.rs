use lcsc_bom_matcher::api::{self, AppState};
use lcsc_bom_matcher::config::CatalogSourceConfig;
use lcsc_bom_matcher::{create_pool, db, AppConfig, BomItemMatcher, CatalogSnapshot};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::fmt::time::ChronoLocal;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 加载配置
    let config = AppConfig::load()?;

    // 初始化日志 - 使用本地时间格式, RUST_LOG 优先于配置
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    tracing_subscriber::fmt()
        .with_timer(ChronoLocal::new("%Y-%m-%d %H:%M:%S".to_string()))
        .with_target(true)
        .with_level(true)
        .with_env_filter(filter)
        .init();

    info!("Starting server with config: {:?}", config);

    let snapshot = load_snapshot(&config).await?.with_scoring(config.matcher.scoring);
    info!("Catalog ready: {} products", snapshot.len());

    let catalog = Arc::new(snapshot);
    let matcher = Arc::new(BomItemMatcher::new(catalog.clone(), config.matcher.clone()));
    let app = api::router(AppState { catalog, matcher });

    // 启动服务器
    let addr = format!("{}:{}", config.server.host, config.server.port);
    info!("Server listening on {}", addr);
    info!("API Endpoints:");
    info!("  POST   /api/catalog/search - 目录搜索 / 浏览");
    info!("  POST   /api/bom/match      - BOM 批量匹配");
    info!("  POST   /api/bom/export     - BOM 匹配并导出 CSV");
    info!("  DELETE /api/bom/cache      - 清空匹配缓存");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// 加载目录快照: 优先 JSON 文件, 否则读数据库
async fn load_snapshot(config: &AppConfig) -> Result<CatalogSnapshot, Box<dyn std::error::Error>> {
    let CatalogSourceConfig {
        json_path,
        seed_json_path,
    } = &config.catalog;

    if let Some(path) = json_path {
        info!("Loading catalog from {}", path);
        return Ok(CatalogSnapshot::load_json_file(path)?);
    }

    let pool = create_pool(&config.database.url, config.database.max_connections).await?;
    info!("Database pool created");
    db::ensure_schema(&pool).await?;

    let count = db::count_products(&pool).await?;
    if count == 0 {
        if let Some(seed) = seed_json_path {
            let seed_snapshot = CatalogSnapshot::load_json_file(seed)?;
            let imported = db::import_catalog(&pool, seed_snapshot.records()).await?;
            info!("Seeded catalog from {}: {} products", seed, imported);
        }
    }

    let rows = db::load_catalog(&pool).await?;
    Ok(CatalogSnapshot::from_rows_lenient(rows))
}
