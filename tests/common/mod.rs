#![allow(dead_code)]

use std::fs;
use std::path::Path;

use imvec::extractor::{FeatureExtractor, ImageData};
use imvec::{EmbeddingStore, Error, Result};
use tempfile::TempDir;

/// 根据文件内容生成确定性向量的特征提取器
pub struct MockExtractor {
    pub dimension: usize,
    /// 每次调用的批次大小
    pub calls: Vec<usize>,
}

impl MockExtractor {
    pub fn new(dimension: usize) -> Self {
        Self { dimension, calls: vec![] }
    }
}

pub fn embed_bytes(data: &[u8], dimension: usize) -> Vec<f32> {
    (0..dimension)
        .map(|i| data.iter().skip(i).step_by(dimension).map(|&b| b as f32).sum())
        .collect()
}

impl FeatureExtractor for MockExtractor {
    fn dimension(&self) -> Option<usize> {
        Some(self.dimension)
    }

    fn embed(&mut self, images: &[ImageData]) -> Result<Vec<Vec<f32>>> {
        self.calls.push(images.len());
        Ok(images.iter().map(|image| embed_bytes(&image.data, self.dimension)).collect())
    }
}

/// 总是少返回一个向量的特征提取器
pub struct ShortExtractor;

impl FeatureExtractor for ShortExtractor {
    fn dimension(&self) -> Option<usize> {
        Some(2)
    }

    fn embed(&mut self, images: &[ImageData]) -> Result<Vec<Vec<f32>>> {
        Ok(images.iter().skip(1).map(|_| vec![0., 1.]).collect())
    }
}

/// 总是失败的特征提取器
pub struct FailingExtractor;

impl FeatureExtractor for FailingExtractor {
    fn dimension(&self) -> Option<usize> {
        None
    }

    fn embed(&mut self, _images: &[ImageData]) -> Result<Vec<Vec<f32>>> {
        Err(Error::extractor("模型崩溃"))
    }
}

pub fn write_file(path: impl AsRef<Path>, data: &[u8]) {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, data).unwrap();
}

pub async fn open_store(dir: &TempDir) -> EmbeddingStore {
    EmbeddingStore::open(dir.path().join("embeddings.sqlite")).await.unwrap()
}

/// 目录中的文件数量
pub fn count_files(dir: impl AsRef<Path>) -> usize {
    fs::read_dir(dir).unwrap().filter(|e| e.as_ref().unwrap().path().is_file()).count()
}
