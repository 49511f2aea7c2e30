use std::path::Path;

use clap::ValueEnum;
use sha2::{Digest, Sha256};

use crate::error::{Error, Result};

/// 计算图片内容标识使用的哈希算法
///
/// 内容标识的格式为 `十六进制摘要 + 原扩展名`，例如 `ba78...15ad.jpg`，
/// 相同内容的文件无论路径如何都会得到相同的标识。
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ImageHash {
    /// SHA-256，与旧数据库中的文件名一致
    #[default]
    Sha256,
    /// BLAKE3
    Blake3,
}

impl ImageHash {
    /// 计算一段数据的 256 位摘要，返回 64 位小写十六进制字符串
    pub fn digest(&self, data: &[u8]) -> String {
        match self {
            Self::Sha256 => format!("{:x}", Sha256::digest(data)),
            Self::Blake3 => blake3::hash(data).to_hex().to_string(),
        }
    }

    /// 读取文件并计算其内容标识
    pub fn identifier(&self, path: impl AsRef<Path>) -> Result<String> {
        let path = path.as_ref();
        let data = std::fs::read(path).map_err(|e| Error::io(path, e))?;
        Ok(self.identifier_of(path, &data))
    }

    /// 使用已读取的文件内容计算内容标识，扩展名取自 `path`
    pub fn identifier_of(&self, path: &Path, data: &[u8]) -> String {
        let mut id = self.digest(data);
        if let Some(ext) = path.extension() {
            id.push('.');
            id.push_str(&ext.to_string_lossy());
        }
        id
    }
}
