mod announcement;
mod board;
mod cache;
mod cli;
mod client;
mod config;
mod scheduler;
mod scrape;
mod server;
mod util;

#[cfg(test)]
mod test_utils;

use clap::Parser;

use crate::util::Result;

#[tokio::main]
async fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let cli = cli::Cli::parse();
  cli.run().await
}
