//! エンドポイントデータベース操作
//!
//! 行は削除しない。設定から外れたエンドポイントも履歴の参照元として残る。

use crate::types::Endpoint;
use sqlx::SqlitePool;

/// エンドポイントを登録または更新
///
/// 同一IDが既にあれば名前とURLだけを更新し、登録日時は維持する。
pub async fn upsert_endpoint(pool: &SqlitePool, endpoint: &Endpoint) -> Result<(), sqlx::Error> {
    let now = super::format_timestamp(chrono::Utc::now());

    sqlx::query(
        r#"
        INSERT INTO endpoints (id, name, url, registered_at, updated_at)
        VALUES (?, ?, ?, ?, ?)
        ON CONFLICT(id) DO UPDATE SET
            name = excluded.name,
            url = excluded.url,
            updated_at = excluded.updated_at
        "#,
    )
    .bind(&endpoint.id)
    .bind(&endpoint.name)
    .bind(&endpoint.url)
    .bind(&now)
    .bind(&now)
    .execute(pool)
    .await?;

    Ok(())
}

/// 登録済みエンドポイント一覧を取得（過去に監視していたものを含む）
#[cfg(test)]
pub async fn list_endpoints(pool: &SqlitePool) -> Result<Vec<Endpoint>, sqlx::Error> {
    let rows = sqlx::query_as::<_, EndpointRow>(
        r#"
        SELECT id, name, url
        FROM endpoints
        ORDER BY registered_at ASC, id ASC
        "#,
    )
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(Endpoint::from).collect())
}

/// IDでエンドポイントを取得
pub async fn get_endpoint(pool: &SqlitePool, id: &str) -> Result<Option<Endpoint>, sqlx::Error> {
    let row = sqlx::query_as::<_, EndpointRow>("SELECT id, name, url FROM endpoints WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?;

    Ok(row.map(Endpoint::from))
}

// --- Internal Row Types ---

#[derive(sqlx::FromRow)]
struct EndpointRow {
    id: String,
    name: String,
    url: String,
}

impl From<EndpointRow> for Endpoint {
    fn from(row: EndpointRow) -> Self {
        Endpoint {
            id: row.id,
            name: row.name,
            url: row.url,
        }
    }
}
