use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

use byteorder::{ByteOrder, NativeEndian};
use log::{debug, info};

use crate::db::{self, Database, EmbeddingRecord, EmbeddingRow, crud};
use crate::error::{Error, Result};

/// 特征向量存储
///
/// 底层为单个 SQLite 表，只追加不修改。向量以本机字节序的 f32 数组存储，
/// 每条记录占用 `dim * 4` 字节，可与旧版流水线生成的数据库互通。
pub struct EmbeddingStore {
    pool: Database,
    /// 向量维度，0 表示尚未确定
    dimension: AtomicUsize,
}

impl EmbeddingStore {
    /// 打开数据库，不存在时自动创建
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let pool = db::init_db(path).await?;

        let dimension = match crud::first_embedding_size(&pool).await? {
            Some(size) if size % 4 != 0 => {
                return Err(Error::Consistency(format!("向量长度 {size} 不是 4 的整数倍")));
            }
            Some(size) => size as usize / 4,
            None => 0,
        };
        debug!("向量维度: {}", dimension);

        Ok(Self { pool, dimension: AtomicUsize::new(dimension) })
    }

    /// 追加一条记录，返回分配的 ID
    ///
    /// 空向量或维度与已有记录不同的向量会被拒绝，不会写入任何数据。
    pub async fn append(&self, display_name: &str, embedding: &[f32]) -> Result<i64> {
        if embedding.is_empty() {
            return Err(Error::Consistency(format!("{display_name} 的特征向量为空")));
        }
        let dimension = self.dimension.load(Ordering::SeqCst);
        if dimension != 0 && dimension != embedding.len() {
            return Err(Error::Consistency(format!(
                "{} 的向量维度为 {}，数据库中为 {}",
                display_name,
                embedding.len(),
                dimension
            )));
        }

        let blob = encode_embedding(embedding);
        let id = crud::add_embedding(&self.pool, display_name, &blob).await?;
        self.dimension.store(embedding.len(), Ordering::SeqCst);

        debug!("写入特征向量 {}: {}", id, display_name);
        Ok(id)
    }

    /// 按插入顺序读取所有记录
    pub async fn read_all(&self) -> Result<Vec<EmbeddingRecord>> {
        let rows = crud::get_embeddings(&self.pool).await?;
        info!("读取 {} 条特征向量", rows.len());
        rows.into_iter().map(EmbeddingRecord::try_from).collect()
    }

    pub async fn get(&self, id: i64) -> Result<Option<EmbeddingRecord>> {
        crud::get_embedding(&self.pool, id).await?.map(EmbeddingRecord::try_from).transpose()
    }

    /// 查找指定名称最早的一条记录
    pub async fn find_by_name(&self, display_name: &str) -> Result<Option<i64>> {
        Ok(crud::find_id_by_name(&self.pool, display_name).await?)
    }

    pub async fn contains_name(&self, display_name: &str) -> Result<bool> {
        Ok(self.find_by_name(display_name).await?.is_some())
    }

    pub async fn count(&self) -> Result<u64> {
        Ok(crud::count_embeddings(&self.pool).await? as u64)
    }

    /// 向量维度，数据库为空时返回 None
    pub fn dimension(&self) -> Option<usize> {
        match self.dimension.load(Ordering::SeqCst) {
            0 => None,
            n => Some(n),
        }
    }

    /// 关闭数据库连接
    pub async fn close(self) {
        self.pool.close().await;
    }
}

impl TryFrom<EmbeddingRow> for EmbeddingRecord {
    type Error = Error;

    fn try_from(row: EmbeddingRow) -> Result<Self> {
        let embedding = decode_embedding(&row.embedding).map_err(|e| match e {
            Error::Consistency(msg) => Error::Consistency(format!("记录 {}: {}", row.id, msg)),
            e => e,
        })?;
        Ok(Self { id: row.id, display_name: row.name, embedding })
    }
}

/// 将向量编码为本机字节序的 f32 数组
pub fn encode_embedding(embedding: &[f32]) -> Vec<u8> {
    let mut buf = vec![0u8; embedding.len() * 4];
    NativeEndian::write_f32_into(embedding, &mut buf);
    buf
}

/// 从本机字节序的 f32 数组解码向量
pub fn decode_embedding(blob: &[u8]) -> Result<Vec<f32>> {
    if blob.len() % 4 != 0 {
        return Err(Error::Consistency(format!("向量长度 {} 不是 4 的整数倍", blob.len())));
    }
    let mut embedding = vec![0f32; blob.len() / 4];
    NativeEndian::read_f32_into(blob, &mut embedding);
    Ok(embedding)
}
