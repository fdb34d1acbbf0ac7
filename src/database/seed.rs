//! 启动时写入默认角色。

use super::Database;
use crate::error::AppResult;
use crate::models::DEFAULT_ROLES;

/// 写入默认角色，已存在的角色保持不变，返回新写入的数量
pub async fn seed_roles(db: &Database) -> AppResult<usize> {
    let mut inserted = 0;

    for definition in DEFAULT_ROLES.iter() {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM roles WHERE name = $1)",
        )
        .bind(definition.role)
        .fetch_one(db.pool())
        .await?;

        if exists {
            continue;
        }

        let permissions: Vec<String> = definition
            .permissions
            .iter()
            .map(|p| p.to_string())
            .collect();

        sqlx::query(
            r#"
            INSERT INTO roles (name, description, permissions)
            VALUES ($1, $2, $3)
            ON CONFLICT (name) DO NOTHING
            "#,
        )
        .bind(definition.role)
        .bind(definition.description)
        .bind(&permissions)
        .execute(db.pool())
        .await?;

        tracing::info!("已写入默认角色: {}", definition.role);
        inserted += 1;
    }

    Ok(inserted)
}
