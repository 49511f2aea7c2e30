use std::path::{Path, PathBuf};

use indicatif::ProgressBar;
use log::{debug, info};
use regex::Regex;
use tokio::task::block_in_place;
use walkdir::WalkDir;

use crate::archive::PictureArchive;
use crate::error::{Error, Result};
use crate::extractor::{FeatureExtractor, ImageData};
use crate::hash::ImageHash;
use crate::store::EmbeddingStore;
use crate::utils::pb_style;

/// 遇到内容标识已存在的图片时的处理方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DuplicatePolicy {
    /// 总是插入新记录，重复添加同一目录会产生重复记录
    #[default]
    Insert,
    /// 跳过数据库中已有的内容标识
    Skip,
}

#[derive(Debug, Clone)]
pub struct IngestOptions {
    /// 每批送入特征提取器的图片数量
    pub batch_size: usize,
    pub hash: ImageHash,
    /// 扫描的文件后缀名，多个后缀用逗号分隔，不区分大小写
    pub suffix: String,
    pub duplicates: DuplicatePolicy,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self {
            batch_size: 512,
            hash: ImageHash::default(),
            suffix: "jpg,jpeg,png,webp".to_string(),
            duplicates: DuplicatePolicy::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestStats {
    /// 扫描到的图片数量
    pub scanned: usize,
    /// 处理的批次数量
    pub batches: usize,
    /// 新增的记录数量
    pub added: usize,
    /// 因重复而跳过的图片数量
    pub skipped: usize,
}

/// 批量添加图片
///
/// 每个批次只调用一次特征提取器，然后按顺序对每张图片计算内容标识、写入向量、
/// 复制到归档目录。任何错误都会终止整个添加过程，已完成的记录不会回滚。
pub struct Ingestor<'a, E> {
    store: &'a EmbeddingStore,
    archive: &'a PictureArchive,
    extractor: E,
    options: IngestOptions,
    re_suf: Regex,
}

impl<'a, E: FeatureExtractor> Ingestor<'a, E> {
    pub fn new(
        store: &'a EmbeddingStore,
        archive: &'a PictureArchive,
        extractor: E,
        options: IngestOptions,
    ) -> Result<Self> {
        if options.batch_size == 0 {
            return Err(Error::Config("batch_size 必须大于 0".to_string()));
        }
        let re_suf = format!("(?i)^({})$", options.suffix.replace(',', "|"));
        let re_suf = Regex::new(&re_suf).map_err(|e| Error::Config(format!("无效的后缀: {e}")))?;
        Ok(Self { store, archive, extractor, options, re_suf })
    }

    /// 递归扫描目录下所有符合后缀的图片，按文件名排序
    pub fn scan(&self, path: impl AsRef<Path>) -> Result<Vec<PathBuf>> {
        let path = path.as_ref();
        info!("开始扫描目录: {}", path.display());

        let mut entries = vec![];
        for entry in WalkDir::new(path).sort_by_file_name() {
            let entry = entry.map_err(|e| {
                let p = e.path().unwrap_or(path).to_path_buf();
                Error::io(p, e.into())
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            let Some(ext) = entry.path().extension() else {
                continue;
            };
            if self.re_suf.is_match(&ext.to_string_lossy()) {
                entries.push(entry.into_path());
            }
        }

        info!("扫描完成，共 {} 张图片", entries.len());
        Ok(entries)
    }

    /// 添加目录下的所有图片
    ///
    /// 特征提取在 `block_in_place` 中执行，需要多线程运行时。
    pub async fn ingest(&mut self, path: impl AsRef<Path>) -> Result<IngestStats> {
        let entries = self.scan(path)?;
        let mut stats = IngestStats { scanned: entries.len(), ..Default::default() };

        let total = entries.len().div_ceil(self.options.batch_size);
        let pb = ProgressBar::new(total as u64).with_style(pb_style());

        for (idx, batch) in entries.chunks(self.options.batch_size).enumerate() {
            info!("处理批次 {}/{}", idx + 1, total);

            let mut images = Vec::with_capacity(batch.len());
            for path in batch {
                let data = tokio::fs::read(path).await.map_err(|e| Error::io(path, e))?;
                images.push(ImageData { path: path.clone(), data });
            }

            let embeddings = block_in_place(|| self.extractor.embed(&images))?;
            if embeddings.len() != images.len() {
                return Err(Error::extractor(format!(
                    "输入 {} 张图片，却返回了 {} 个特征向量",
                    images.len(),
                    embeddings.len()
                )));
            }

            for (image, embedding) in images.iter().zip(embeddings) {
                let identifier = self.options.hash.identifier_of(&image.path, &image.data);

                if self.options.duplicates == DuplicatePolicy::Skip
                    && self.store.contains_name(&identifier).await?
                {
                    debug!("跳过已添加图片: {}", image.path.display());
                    pb.set_message(format!("跳过已添加图片: {}", image.path.display()));
                    stats.skipped += 1;
                    continue;
                }

                self.store.append(&identifier, &embedding).await?;
                self.archive.store(&image.path, &identifier).await?;
                pb.set_message(image.path.display().to_string());
                stats.added += 1;
            }

            stats.batches += 1;
            pb.inc(1);
        }

        pb.finish_with_message("图片添加完成");
        Ok(stats)
    }

    pub fn extractor(&self) -> &E {
        &self.extractor
    }

    pub fn into_extractor(self) -> E {
        self.extractor
    }
}
