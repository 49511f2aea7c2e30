mod add;
mod export;
mod search;
mod stats;

pub use add::*;
pub use export::*;
pub use search::*;
pub use stats::*;

use crate::config::Opts;

pub trait SubCommandExtend {
    fn run(&self, opts: &Opts) -> impl std::future::Future<Output = anyhow::Result<()>> + Send;
}
