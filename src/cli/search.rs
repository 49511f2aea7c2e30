use std::path::{Path, PathBuf};

use anyhow::{Result, anyhow};
use clap::{Parser, ValueEnum};
use log::info;
use serde::Serialize;
use tokio::task::block_in_place;

use crate::cli::SubCommandExtend;
use crate::config::{ModelOptions, Opts};
use crate::extractor::{FeatureExtractor, ImageData};
use crate::hash::ImageHash;
use crate::index::{EmbeddingIndex, Hit, IndexKind, materialize, query_file_name};
use crate::{EmbeddingStore, PictureArchive};

#[derive(Parser, Debug, Clone)]
pub struct SearchCommand {
    #[command(flatten)]
    pub model: ModelOptions,
    /// 被搜索的图片路径
    #[arg(required_unless_present = "id", conflicts_with = "id")]
    pub image: Option<PathBuf>,
    /// 使用数据库中已有的记录作为查询，无需加载模型
    #[arg(long, value_name = "ID")]
    pub id: Option<i64>,
    /// 返回的结果数量
    #[arg(short, value_name = "K", default_value_t = 5)]
    pub k: usize,
    /// 索引类型
    #[arg(long, value_enum, default_value_t = IndexKind::Flat)]
    pub index: IndexKind,
    /// 复制结果图片的目录，默认为数据目录下的 results
    #[arg(short, long, value_name = "DIR")]
    pub output: Option<PathBuf>,
    /// 不复制结果图片，只输出结果
    #[arg(long)]
    pub no_copy: bool,
    /// 输出格式
    #[arg(long, value_name = "FORMAT", value_enum, default_value_t = OutputFormat::Table)]
    pub output_format: OutputFormat,
    /// 计算查询图片内容标识使用的哈希算法，需与添加时一致
    #[arg(short = 'H', long, value_enum, default_value_t = ImageHash::Sha256)]
    pub hash: ImageHash,
}

impl SubCommandExtend for SearchCommand {
    async fn run(&self, opts: &Opts) -> Result<()> {
        let store = EmbeddingStore::open(opts.conf_dir.database()).await?;
        let index = EmbeddingIndex::build(&store, self.index).await?;

        let (query, query_id) = match (self.id, &self.image) {
            (Some(id), _) => {
                let record = index.record(id).ok_or_else(|| anyhow!("记录 {} 不存在", id))?;
                (record.embedding.clone(), Some(id))
            }
            (None, Some(image)) => {
                let data = tokio::fs::read(image).await?;
                let identifier = self.hash.identifier_of(image, &data);
                let query_id = store.find_by_name(&identifier).await?;

                let mut extractor = self.model.extractor()?;
                let images = [ImageData { path: image.clone(), data }];
                let mut embeddings = block_in_place(|| extractor.embed(&images))?;
                let query = embeddings.pop().ok_or_else(|| anyhow!("模型没有返回特征向量"))?;
                (query, query_id)
            }
            (None, None) => return Err(anyhow!("需要指定查询图片或 --id")),
        };

        let hits = index.query(&query, self.k)?;
        print_result(&hits, self.output_format)?;

        if !self.no_copy {
            let archive = PictureArchive::open(opts.conf_dir.pictures())?;
            let output = self.output.clone().unwrap_or_else(|| opts.conf_dir.results());
            let mut written = materialize(&hits, &archive, &output, query_id).await?;

            // 查询图片不在结果中时也复制一份，方便对比
            let query_in_hits = hits.iter().any(|hit| Some(hit.record.id) == query_id);
            if let (Some(image), false) = (&self.image, query_in_hits) {
                written.push(copy_query(image, &output).await?);
            }
            info!("已复制 {} 张图片到 {}", written.len(), output.display());
        }

        store.close().await;
        Ok(())
    }
}

async fn copy_query(image: &Path, output: &Path) -> Result<PathBuf> {
    let target = output.join(query_file_name(image));
    tokio::fs::copy(image, &target).await?;
    Ok(target)
}

#[derive(Serialize)]
struct SearchResult<'a> {
    id: i64,
    score: f32,
    name: &'a str,
}

fn print_result(result: &[Hit<'_>], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            let result = result
                .iter()
                .map(|hit| SearchResult {
                    id: hit.record.id,
                    score: hit.score,
                    name: &hit.record.display_name,
                })
                .collect::<Vec<_>>();
            println!("{}", serde_json::to_string_pretty(&result)?)
        }
        OutputFormat::Table => {
            for hit in result {
                println!("{:.4}\t{}\t{}", hit.score, hit.record.id, hit.record.display_name);
            }
        }
    }
    Ok(())
}

#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum OutputFormat {
    Json,
    Table,
}
