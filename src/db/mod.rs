use std::path::Path;

use log::{debug, info};
use sqlx::{SqlitePool, sqlite::*};

use crate::error::{Error, Result};

pub mod crud;
pub mod model;

pub use model::*;

pub type Database = SqlitePool;

/// 特征向量表必须包含的列
const REQUIRED_COLUMNS: [&str; 3] = ["file_raw_id", "file_name", "embedding"];

pub async fn init_db(filename: impl AsRef<Path>) -> Result<Database> {
    let filename = filename.as_ref();
    info!("初始化数据库连接: {}", filename.display());

    let options = SqliteConnectOptions::new()
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal)
        .filename(filename)
        .create_if_missing(true);

    let pool = SqlitePool::connect_with(options).await?;

    info!("检查数据库迁移");
    sqlx::migrate!().run(&pool).await?;

    check_schema(&pool).await?;

    Ok(pool)
}

/// 检查已存在的 img_embeddings 表是否与当前结构兼容
async fn check_schema(pool: &Database) -> Result<()> {
    let columns = crud::get_columns(pool).await?;
    debug!("img_embeddings 列: {:?}", columns);
    for name in REQUIRED_COLUMNS {
        if !columns.iter().any(|c| c == name) {
            return Err(Error::Schema(format!("img_embeddings 表缺少列 {name}")));
        }
    }
    Ok(())
}
