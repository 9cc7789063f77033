mod args;
mod ask;
mod chunk;
mod ingest;
mod output;
mod search;
mod status;

pub use args::{Args, Command};
pub use ask::run_ask;
pub use chunk::run_chunk;
pub use ingest::run_ingest;
pub use search::run_search;
pub use status::run_status;
