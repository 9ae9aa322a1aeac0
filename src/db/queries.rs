use crate::error::Result as CatalogResult;
use crate::models::{CatalogRecord, CatalogRow, PriceTierRow};
use futures::TryStreamExt;
use sqlx::PgPool;
use std::collections::HashMap;

/// 建表 (幂等)
pub async fn ensure_schema(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS catalog_product (
            code        VARCHAR(32) PRIMARY KEY,
            model       TEXT NOT NULL DEFAULT '',
            name        TEXT NOT NULL DEFAULT '',
            brand       TEXT NOT NULL DEFAULT '',
            package     TEXT NOT NULL DEFAULT '',
            description TEXT NOT NULL DEFAULT '',
            category    TEXT NOT NULL DEFAULT '',
            stock       BIGINT NOT NULL DEFAULT 0
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS catalog_price_tier (
            code         VARCHAR(32) NOT NULL REFERENCES catalog_product(code),
            min_quantity BIGINT NOT NULL,
            unit_price   NUMERIC(18, 6) NOT NULL,
            PRIMARY KEY (code, min_quantity)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// 目录记录数
pub async fn count_products(pool: &PgPool) -> Result<i64, sqlx::Error> {
    let (cnt,): (i64,) = sqlx::query_as("SELECT count(*) FROM catalog_product")
        .fetch_one(pool)
        .await?;
    Ok(cnt)
}

/// 流式读取目录主表
pub async fn list_products(pool: &PgPool) -> Result<Vec<CatalogRow>, sqlx::Error> {
    sqlx::query_as::<_, CatalogRow>(
        r#"
        SELECT code, model, name, brand, package, description, category, stock
        FROM catalog_product
        ORDER BY code
        "#,
    )
    .fetch(pool)
    .try_collect()
    .await
}

/// 读取全部阶梯价
pub async fn list_price_tiers(pool: &PgPool) -> Result<Vec<PriceTierRow>, sqlx::Error> {
    sqlx::query_as::<_, PriceTierRow>(
        r#"
        SELECT code, min_quantity, unit_price
        FROM catalog_price_tier
        ORDER BY code, min_quantity
        "#,
    )
    .fetch(pool)
    .try_collect()
    .await
}

/// 加载目录: 每行单独校验, 由调用方决定如何处理坏行
pub async fn load_catalog(pool: &PgPool) -> Result<Vec<CatalogResult<CatalogRecord>>, sqlx::Error> {
    let products = list_products(pool).await?;
    let tiers = list_price_tiers(pool).await?;
    tracing::info!("读取目录: {} 条商品, {} 条阶梯价", products.len(), tiers.len());

    let mut tiers_by_code: HashMap<String, Vec<PriceTierRow>> = HashMap::new();
    for tier in tiers {
        tiers_by_code.entry(tier.code.clone()).or_default().push(tier);
    }

    Ok(products
        .into_iter()
        .map(|row| {
            let tiers = tiers_by_code.remove(&row.code).unwrap_or_default();
            row.into_record(tiers)
        })
        .collect())
}

/// 批量写入目录 (已存在的编码跳过)
pub async fn insert_catalog_batch(pool: &PgPool, records: &[CatalogRecord]) -> Result<(), sqlx::Error> {
    if records.is_empty() {
        return Ok(());
    }

    let start_time = std::time::Instant::now();
    let mut tx = pool.begin().await?;

    let mut products = sqlx::QueryBuilder::new(
        "INSERT INTO catalog_product (
            code, model, name, brand, package, description, category, stock
        ) ",
    );
    products.push_values(records, |mut b, r| {
        b.push_bind(&r.code)
            .push_bind(&r.model)
            .push_bind(&r.name)
            .push_bind(&r.brand)
            .push_bind(&r.package)
            .push_bind(&r.description)
            .push_bind(&r.category)
            .push_bind(i64::try_from(r.stock).unwrap_or(i64::MAX));
    });
    products.push(" ON CONFLICT (code) DO NOTHING");
    products.build().execute(&mut *tx).await?;

    let tiers: Vec<(&str, i64, &bigdecimal::BigDecimal)> = records
        .iter()
        .flat_map(|r| {
            r.price_tiers.iter().map(move |t| {
                (
                    r.code.as_str(),
                    i64::try_from(t.min_quantity).unwrap_or(i64::MAX),
                    &t.unit_price,
                )
            })
        })
        .collect();

    if !tiers.is_empty() {
        let mut tier_query = sqlx::QueryBuilder::new(
            "INSERT INTO catalog_price_tier (code, min_quantity, unit_price) ",
        );
        tier_query.push_values(tiers, |mut b, (code, qty, price)| {
            b.push_bind(code).push_bind(qty).push_bind(price.clone());
        });
        tier_query.push(" ON CONFLICT (code, min_quantity) DO NOTHING");
        tier_query.build().execute(&mut *tx).await?;
    }

    // 添加超时控制: 30秒
    match tokio::time::timeout(std::time::Duration::from_secs(30), tx.commit()).await {
        Ok(Ok(())) => {
            tracing::info!(
                "✓ 目录写入成功, {} 条记录, 耗时: {:?}",
                records.len(),
                start_time.elapsed()
            );
            Ok(())
        }
        Ok(Err(e)) => {
            tracing::error!("✗ 目录写入失败: {:?}", e);
            Err(e)
        }
        Err(_) => {
            tracing::error!("✗ 目录写入超时 (>30秒)!");
            Err(sqlx::Error::PoolTimedOut)
        }
    }
}

/// 导入目录快照 (每1000条分块)
pub async fn import_catalog<'a, I>(pool: &PgPool, records: I) -> Result<usize, sqlx::Error>
where
    I: IntoIterator<Item = &'a CatalogRecord>,
{
    let records: Vec<CatalogRecord> = records.into_iter().cloned().collect();
    for chunk in records.chunks(1000) {
        insert_catalog_batch(pool, chunk).await?;
    }
    Ok(records.len())
}
