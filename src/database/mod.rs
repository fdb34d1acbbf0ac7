pub mod seed;

pub use seed::seed_roles;

use crate::{config::DatabaseConfig, error::AppResult};
use sqlx::{PgPool, postgres::PgPoolOptions};
use std::time::Duration;

/// 服务读写的表，均由 sql/schema.sql 创建
const REQUIRED_TABLES: [&str; 7] = [
    "roles",
    "users",
    "institutes",
    "tests",
    "results",
    "question_results",
    "reports",
];

/// PostgreSQL 连接池
#[derive(Clone, Debug)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    pub async fn new(config: &DatabaseConfig) -> AppResult<Self> {
        tracing::info!("正在连接数据库: {}", mask_database_url(&config.url));

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(10))
            .connect(&config.url)
            .await?;

        tracing::info!("数据库连接成功，最大连接数: {}", config.max_connections);
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// 启动检查：记录数据库版本，缺表时给出警告
    pub async fn verify_connection(&self) -> AppResult<()> {
        let version = sqlx::query_scalar::<_, String>("SELECT version()")
            .fetch_one(&self.pool)
            .await?;
        tracing::info!("数据库版本: {}", version);

        let tables: Vec<String> = REQUIRED_TABLES.iter().map(|t| t.to_string()).collect();
        let found = sqlx::query_scalar::<_, String>(
            r#"
            SELECT table_name::text FROM information_schema.tables
            WHERE table_schema = current_schema() AND table_name = ANY($1)
            "#,
        )
        .bind(&tables)
        .fetch_all(&self.pool)
        .await?;

        let missing = missing_tables(&found);
        if missing.is_empty() {
            tracing::debug!("数据表检查通过");
        } else {
            tracing::warn!(
                "缺少数据表 {}，请先执行 sql/schema.sql",
                missing.join(", ")
            );
        }

        Ok(())
    }

    pub async fn health_check(&self) -> AppResult<bool> {
        let result = sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(&self.pool)
            .await?;

        Ok(result == 1)
    }
}

fn missing_tables(found: &[String]) -> Vec<&'static str> {
    REQUIRED_TABLES
        .iter()
        .copied()
        .filter(|table| !found.iter().any(|f| f == table))
        .collect()
}

/// 日志中隐藏连接串里的密码
fn mask_database_url(url: &str) -> String {
    let Some((scheme, rest)) = url.split_once("://") else {
        return url.to_string();
    };
    let Some((credentials, host)) = rest.rsplit_once('@') else {
        return url.to_string();
    };
    match credentials.split_once(':') {
        Some((user, _)) => format!("{}://{}:***@{}", scheme, user, host),
        None => url.to_string(),
    }
}
