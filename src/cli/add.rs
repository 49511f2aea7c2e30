use std::path::PathBuf;

use clap::Parser;
use log::info;

use crate::cli::SubCommandExtend;
use crate::config::{ModelOptions, Opts};
use crate::hash::ImageHash;
use crate::ingest::{DuplicatePolicy, IngestOptions, Ingestor};
use crate::{EmbeddingStore, PictureArchive};

#[derive(Parser, Debug, Clone)]
pub struct AddCommand {
    #[command(flatten)]
    pub model: ModelOptions,
    /// 图片所在目录
    pub path: PathBuf,
    /// 每批送入模型的图片数量
    #[arg(short, long, value_name = "SIZE", default_value_t = 512)]
    pub batch_size: usize,
    /// 扫描的文件后缀名，多个后缀用逗号分隔
    #[arg(short, long, default_value = "jpg,jpeg,png,webp")]
    pub suffix: String,
    /// 计算图片内容标识使用的哈希算法
    #[arg(short = 'H', long, value_enum, default_value_t = ImageHash::Sha256)]
    pub hash: ImageHash,
    /// 跳过数据库中已存在的图片，默认总是添加新记录
    #[arg(long)]
    pub skip_existing: bool,
}

impl SubCommandExtend for AddCommand {
    async fn run(&self, opts: &Opts) -> anyhow::Result<()> {
        let store = EmbeddingStore::open(opts.conf_dir.database()).await?;
        let archive = PictureArchive::open(opts.conf_dir.pictures())?;
        let extractor = self.model.extractor()?;

        let options = IngestOptions {
            batch_size: self.batch_size,
            hash: self.hash,
            suffix: self.suffix.clone(),
            duplicates: match self.skip_existing {
                true => DuplicatePolicy::Skip,
                false => DuplicatePolicy::Insert,
            },
        };

        let stats = {
            let mut ingestor = Ingestor::new(&store, &archive, extractor, options)?;
            ingestor.ingest(&self.path).await?
        };

        info!(
            "添加完成：扫描 {} 张，新增 {} 张，跳过 {} 张，共 {} 个批次",
            stats.scanned, stats.added, stats.skipped, stats.batches
        );

        store.close().await;
        Ok(())
    }
}
