use std::path::{Path, PathBuf};

use log::debug;

use crate::error::{Error, Result};

/// 图片归档目录，每张图片以其内容标识命名
#[derive(Debug, Clone)]
pub struct PictureArchive {
    root: PathBuf,
}

impl PictureArchive {
    /// 打开归档目录，不存在时自动创建
    pub fn open(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref();
        std::fs::create_dir_all(root).map_err(|e| Error::io(root, e))?;
        Ok(Self { root: root.to_path_buf() })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// 指定名称的图片在归档中的路径
    pub fn path_of(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.path_of(name).is_file()
    }

    /// 将源图片复制到归档中，已存在的同名文件会被覆盖
    pub async fn store(&self, source: &Path, name: &str) -> Result<PathBuf> {
        let target = self.path_of(name);
        tokio::fs::copy(source, &target).await.map_err(|e| Error::io(source, e))?;
        debug!("归档 {} -> {}", source.display(), target.display());
        Ok(target)
    }
}
