use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use log::info;
use ndarray::Array2;
use ndarray_npy::write_npy;

use crate::cli::SubCommandExtend;
use crate::{EmbeddingStore, Opts};

#[derive(Parser, Debug, Clone)]
pub struct ExportCommand {
    /// 输出文件
    #[arg(short, long, default_value = "embeddings.npy")]
    pub output: PathBuf,
}

impl SubCommandExtend for ExportCommand {
    async fn run(&self, opts: &Opts) -> Result<()> {
        let store = EmbeddingStore::open(opts.conf_dir.database()).await?;
        let records = store.read_all().await?;
        let dim = records.first().map(|r| r.embedding.len()).unwrap_or(0);

        let mut data = Vec::with_capacity(records.len() * dim);
        for record in &records {
            if record.embedding.len() != dim {
                anyhow::bail!("记录 {} 的向量维度为 {}，应为 {}", record.id, record.embedding.len(), dim);
            }
            data.extend_from_slice(&record.embedding);
        }
        let arr = Array2::from_shape_vec((records.len(), dim), data)?;
        write_npy(&self.output, &arr)?;

        info!("导出成功: {} 条记录，维度 {} -> {}", records.len(), dim, self.output.display());
        store.close().await;
        Ok(())
    }
}
