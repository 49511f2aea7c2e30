use anyhow::Result;
use clap::Parser;

use crate::cli::SubCommandExtend;
use crate::{EmbeddingStore, Opts};

#[derive(Parser, Debug, Clone)]
pub struct StatsCommand {}

impl SubCommandExtend for StatsCommand {
    async fn run(&self, opts: &Opts) -> Result<()> {
        let store = EmbeddingStore::open(opts.conf_dir.database()).await?;
        println!("records\t{}", store.count().await?);
        match store.dimension() {
            Some(dim) => println!("dimension\t{}", dim),
            None => println!("dimension\t-"),
        }
        store.close().await;
        Ok(())
    }
}
