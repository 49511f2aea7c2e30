mod flat;
mod hnsw;

use std::path::{Path, PathBuf};

use clap::ValueEnum;
use log::{debug, info};

pub use self::flat::FlatIndex;
pub use self::hnsw::HnswIndex;
use crate::archive::PictureArchive;
use crate::db::EmbeddingRecord;
use crate::error::{Error, Result};
use crate::store::EmbeddingStore;

/// 支持内积相似度搜索的向量索引
///
/// 向量的位置即添加顺序，从 0 开始。
pub trait VectorIndex: Send + Sync {
    /// 索引中的向量数量
    fn ntotal(&self) -> usize;

    fn add(&mut self, vector: &[f32]) -> Result<()>;

    /// 返回内积最大的 k 个向量的 `(位置, 内积)`，按内积从大到小排列
    fn search(&self, query: &[f32], k: usize) -> Result<Vec<(usize, f32)>>;
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IndexKind {
    /// 暴力搜索，结果精确
    #[default]
    Flat,
    /// HNSW 近似搜索
    Hnsw,
}

/// 按内积从大到小排序，内积相同时位置靠前的优先
pub(crate) fn sort_neighbors(neighbors: &mut [(usize, f32)]) {
    neighbors.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
}

/// 一条搜索结果
#[derive(Debug, Clone, Copy)]
pub struct Hit<'a> {
    /// 内积相似度
    pub score: f32,
    pub record: &'a EmbeddingRecord,
}

/// 从特征向量数据库构建的内存索引
///
/// 索引只是数据库的缓存，不持有任何独立的状态，随时可以重新构建。
pub struct EmbeddingIndex {
    records: Vec<EmbeddingRecord>,
    dimension: usize,
    index: Box<dyn VectorIndex>,
}

impl EmbeddingIndex {
    /// 读取数据库中的所有记录并构建索引
    pub async fn build(store: &EmbeddingStore, kind: IndexKind) -> Result<Self> {
        let records = store.read_all().await?;
        Self::from_records(records, kind)
    }

    pub fn from_records(records: Vec<EmbeddingRecord>, kind: IndexKind) -> Result<Self> {
        let dimension = records.first().map(|r| r.embedding.len()).unwrap_or(0);
        if let Some(record) = records.iter().find(|r| r.embedding.len() != dimension) {
            return Err(Error::Consistency(format!(
                "记录 {} 的向量维度为 {}，与第一条记录的 {} 不一致",
                record.id,
                record.embedding.len(),
                dimension
            )));
        }

        let mut index: Box<dyn VectorIndex> = match kind {
            IndexKind::Hnsw if !records.is_empty() => {
                Box::new(HnswIndex::new(dimension, records.len())?)
            }
            _ => Box::new(FlatIndex::new(dimension)),
        };
        for record in &records {
            index.add(&record.embedding)?;
        }
        info!("构建索引完成: {} 条记录，维度 {}", index.ntotal(), dimension);

        Ok(Self { records, dimension, index })
    }

    /// 搜索与 query 内积最大的 k 条记录，k 超过记录数量时返回全部记录
    pub fn query(&self, query: &[f32], k: usize) -> Result<Vec<Hit<'_>>> {
        if self.records.is_empty() || k == 0 {
            return Ok(vec![]);
        }
        if query.len() != self.dimension {
            return Err(Error::Consistency(format!(
                "查询向量维度为 {}，索引为 {}",
                query.len(),
                self.dimension
            )));
        }

        let k = k.min(self.records.len());
        let neighbors = self.index.search(query, k)?;
        debug!("搜索到 {} 个近邻", neighbors.len());

        neighbors
            .into_iter()
            .map(|(pos, score)| {
                let record = self
                    .records
                    .get(pos)
                    .ok_or_else(|| Error::index(format!("索引返回了不存在的位置 {pos}")))?;
                Ok(Hit { score, record })
            })
            .collect()
    }

    /// 根据记录 ID 查找记录
    pub fn record(&self, id: i64) -> Option<&EmbeddingRecord> {
        self.records.iter().find(|r| r.id == id)
    }

    pub fn records(&self) -> &[EmbeddingRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }
}

/// 将搜索结果对应的归档图片复制到输出目录
///
/// ID 为 `query_id` 的记录会被重命名为 `query.<扩展名>`，其余图片保持归档中的名称。
/// 重复添加的图片名称相同，只复制一次。返回所有写入的文件路径，不含重复项。
pub async fn materialize(
    hits: &[Hit<'_>],
    archive: &PictureArchive,
    output: impl AsRef<Path>,
    query_id: Option<i64>,
) -> Result<Vec<PathBuf>> {
    let output = output.as_ref();
    tokio::fs::create_dir_all(output).await.map_err(|e| Error::io(output, e))?;

    let mut written: Vec<PathBuf> = Vec::with_capacity(hits.len());
    for hit in hits {
        let name = Path::new(&hit.record.display_name);
        let source = archive.path_of(&hit.record.display_name);
        let target = if Some(hit.record.id) == query_id {
            output.join(query_file_name(name))
        } else {
            match name.file_name() {
                Some(file_name) => output.join(file_name),
                None => {
                    return Err(Error::Consistency(format!(
                        "记录 {} 的名称无效: {:?}",
                        hit.record.id, hit.record.display_name
                    )));
                }
            }
        };
        if written.contains(&target) {
            debug!("跳过重复图片 {}", target.display());
            continue;
        }

        tokio::fs::copy(&source, &target).await.map_err(|e| Error::io(&source, e))?;
        debug!("复制 {} -> {}", source.display(), target.display());
        written.push(target);
    }

    Ok(written)
}

/// 查询图片在输出目录中的文件名，保留原扩展名
pub fn query_file_name(name: &Path) -> String {
    match name.extension() {
        Some(ext) => format!("query.{}", ext.to_string_lossy()),
        None => "query".to_string(),
    }
}
