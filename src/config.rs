use std::convert::Infallible;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::LazyLock;

use clap::{Parser, Subcommand};
use directories::ProjectDirs;

use crate::cli::*;
use crate::error::{Error, Result};
use crate::extractor::OnnxExtractor;

static CONF_DIR: LazyLock<ConfDir> = LazyLock::new(|| {
    let proj_dirs = ProjectDirs::from("", "imvec", "imvec").expect("failed to get project dir");
    ConfDir { path: proj_dirs.data_dir().to_path_buf() }
});

fn default_config_dir() -> &'static str {
    CONF_DIR.path().to_str().unwrap()
}

#[derive(Parser, Debug, Clone)]
pub struct ModelOptions {
    /// 用于提取特征的 ONNX 模型文件，输入为 Nx3xSxS 的 RGB 图片
    #[arg(short, long, value_name = "FILE")]
    pub model: Option<PathBuf>,
    /// 模型输入尺寸
    #[arg(long, value_name = "SIZE", default_value_t = 224)]
    pub input_size: u32,
}

impl ModelOptions {
    /// 加载特征提取器
    pub fn extractor(&self) -> Result<OnnxExtractor> {
        let model = self
            .model
            .as_ref()
            .ok_or_else(|| Error::Config("需要使用 --model 指定模型文件".to_string()))?;
        OnnxExtractor::open(model, self.input_size)
    }
}

#[derive(Parser, Debug, Clone)]
#[command(name = "imvec", version)]
pub struct Opts {
    #[command(subcommand)]
    pub subcmd: SubCommand,
    /// 数据目录，包含数据库、图片归档和搜索结果
    #[arg(short, long, default_value = default_config_dir())]
    pub conf_dir: ConfDir,
    /// 同时将日志写入数据目录下的 imvec.log
    #[arg(long)]
    pub log_file: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum SubCommand {
    /// 提取目录中图片的特征向量并添加到数据库
    Add(AddCommand),
    /// 搜索相似图片
    Search(SearchCommand),
    /// 导出所有特征向量为 npy 文件
    Export(ExportCommand),
    /// 显示数据库统计信息
    Stats(StatsCommand),
}

#[derive(Debug, Clone)]
pub struct ConfDir {
    path: PathBuf,
}

impl ConfDir {
    pub fn path(&self) -> &Path {
        self.path.as_path()
    }

    /// 返回数据库文件的路径
    pub fn database(&self) -> PathBuf {
        self.path.join("embeddings.sqlite")
    }

    /// 返回图片归档目录
    pub fn pictures(&self) -> PathBuf {
        self.path.join("pictures")
    }

    /// 返回默认的搜索结果目录
    pub fn results(&self) -> PathBuf {
        self.path.join("results")
    }

    /// 返回日志文件的路径
    pub fn log_file(&self) -> PathBuf {
        self.path.join("imvec.log")
    }
}

impl FromStr for ConfDir {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self { path: PathBuf::from(s) })
    }
}
