use sqlx::{Executor, Result, Sqlite, SqlitePool};

use super::EmbeddingRow;

/// 添加特征向量，返回新记录的 ID
pub async fn add_embedding<'c, E>(executor: E, name: &str, embedding: &[u8]) -> Result<i64>
where
    E: Executor<'c, Database = Sqlite>,
{
    sqlx::query_scalar(
        r#"
        INSERT INTO img_embeddings (file_name, embedding)
        VALUES (?, ?)
        RETURNING file_raw_id
        "#,
    )
    .bind(name)
    .bind(embedding)
    .fetch_one(executor)
    .await
}

/// 按插入顺序获取所有特征向量
pub async fn get_embeddings(executor: &SqlitePool) -> Result<Vec<EmbeddingRow>> {
    sqlx::query_as(
        r#"
        SELECT file_raw_id AS id, file_name AS name, embedding
        FROM img_embeddings
        ORDER BY file_raw_id ASC
        "#,
    )
    .fetch_all(executor)
    .await
}

pub async fn get_embedding(executor: &SqlitePool, id: i64) -> Result<Option<EmbeddingRow>> {
    sqlx::query_as(
        r#"
        SELECT file_raw_id AS id, file_name AS name, embedding
        FROM img_embeddings WHERE file_raw_id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(executor)
    .await
}

/// 根据图片名查找最早添加的记录 ID
pub async fn find_id_by_name(executor: &SqlitePool, name: &str) -> Result<Option<i64>> {
    sqlx::query_scalar(
        r#"
        SELECT file_raw_id FROM img_embeddings
        WHERE file_name = ? ORDER BY file_raw_id ASC LIMIT 1
        "#,
    )
    .bind(name)
    .fetch_optional(executor)
    .await
}

pub async fn count_embeddings(executor: &SqlitePool) -> Result<i64> {
    sqlx::query_scalar(r#"SELECT COUNT(*) FROM img_embeddings"#).fetch_one(executor).await
}

/// 第一条记录的向量字节长度，用于确定向量维度
pub async fn first_embedding_size(executor: &SqlitePool) -> Result<Option<i64>> {
    let size = sqlx::query_scalar::<_, Option<i64>>(
        r#"
        SELECT length(embedding) FROM img_embeddings
        ORDER BY file_raw_id ASC LIMIT 1
        "#,
    )
    .fetch_optional(executor)
    .await?;
    Ok(size.flatten())
}

/// 获取 img_embeddings 表的所有列名
pub async fn get_columns(executor: &SqlitePool) -> Result<Vec<String>> {
    sqlx::query_scalar(r#"SELECT name FROM pragma_table_info('img_embeddings')"#)
        .fetch_all(executor)
        .await
}
