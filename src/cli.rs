use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;

use crate::config::RootConfig;
use crate::scrape::{self, Site};
use crate::server::{self, ServerConfig};
use crate::util::Result;

#[derive(Parser)]
#[clap(version, about)]
pub struct Cli {
  #[clap(subcommand)]
  subcmd: SubCommand,

  #[clap(long, short, env = "EV_BULLETIN_CONFIG")]
  config: PathBuf,
}

#[derive(Parser)]
enum SubCommand {
  /// Run the aggregator server
  Server(ServerConfig),
  /// Scrape a single source once and print the result
  Fetch(FetchConfig),
}

#[derive(Parser)]
struct FetchConfig {
  /// The source site to scrape (e.g. "seoul", "goyang")
  site: String,

  /// Pretty-print the JSON output
  #[clap(long, short)]
  pretty: bool,
}

impl Cli {
  pub async fn run(self) -> Result<()> {
    let root_config = RootConfig::load_from_file(&self.config)?;

    match self.subcmd {
      SubCommand::Server(server_config) => {
        server::serve(server_config, root_config).await
      }
      SubCommand::Fetch(fetch_config) => {
        fetch_site(root_config, &fetch_config).await
      }
    }
  }
}

/// One-off scrape straight to stdout, bypassing the cache. Handy for
/// checking a site's parser after its markup shifts.
async fn fetch_site(
  root_config: RootConfig,
  fetch_config: &FetchConfig,
) -> Result<()> {
  let site: Site = fetch_config.site.parse()?;
  let client = Arc::new(root_config.client.build()?);
  let scraper = scrape::scraper_for(site, client);

  let payload = scraper.scrape().await?;

  let output = if fetch_config.pretty {
    serde_json::to_string_pretty(&payload)?
  } else {
    serde_json::to_string(&payload)?
  };
  println!("{output}");

  Ok(())
}
