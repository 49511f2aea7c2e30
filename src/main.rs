use std::fs::OpenOptions;

use clap::Parser;
use env_logger::{Env, Target};
use imvec::cli::SubCommandExtend;
use imvec::config::{Opts, SubCommand};

#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

fn init_logger(opts: &Opts) -> anyhow::Result<()> {
    let mut builder = env_logger::Builder::from_env(Env::default().default_filter_or("info"));
    if opts.log_file {
        std::fs::create_dir_all(opts.conf_dir.path())?;
        let file = OpenOptions::new().create(true).append(true).open(opts.conf_dir.log_file())?;
        builder.target(Target::Pipe(Box::new(file)));
    }
    builder.init();
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let opts = Opts::parse();
    init_logger(&opts)?;

    std::fs::create_dir_all(opts.conf_dir.path())?;

    match &opts.subcmd {
        SubCommand::Add(config) => config.run(&opts).await,
        SubCommand::Search(config) => config.run(&opts).await,
        SubCommand::Export(config) => config.run(&opts).await,
        SubCommand::Stats(config) => config.run(&opts).await,
    }
}
