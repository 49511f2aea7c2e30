use std::path::{Path, PathBuf};

use thiserror::Error;

/// imvec 库的错误类型
#[derive(Debug, Error)]
pub enum Error {
    /// 文件无法读取或写入，目录不存在等
    #[error("文件操作失败 {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// 数据库打开、读取或写入失败
    #[error("数据库错误: {0}")]
    Storage(#[from] sqlx::Error),

    #[error("数据库迁移失败: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    /// 已有数据库的表结构不兼容
    #[error("数据库结构不兼容: {0}")]
    Schema(String),

    /// 特征向量维度不一致等数据问题
    #[error("数据不一致: {0}")]
    Consistency(String),

    /// 特征提取器返回的错误
    #[error("特征提取失败: {0}")]
    Extractor(String),

    #[error("索引错误: {0}")]
    Index(String),

    #[error("无效的配置: {0}")]
    Config(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl Error {
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io { path: path.as_ref().to_path_buf(), source }
    }

    pub fn extractor(msg: impl ToString) -> Self {
        Self::Extractor(msg.to_string())
    }

    pub fn index(msg: impl ToString) -> Self {
        Self::Index(msg.to_string())
    }

    /// 是否为存储层错误
    pub fn is_storage(&self) -> bool {
        matches!(self, Self::Storage(_) | Self::Migrate(_) | Self::Schema(_))
    }
}
