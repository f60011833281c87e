use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Drive scraping tasks on a scraper backend from the terminal
#[derive(Debug, Parser)]
#[command(name = "scrape-control", version)]
#[command(about = "Submit scraping tasks, follow their logs, fetch their results", long_about = None)]
pub struct Cli {
    /// RON config file (default: ./scrape-control.ron)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Backend address, e.g. http://localhost:5000/
    #[arg(long, global = true)]
    pub base_url: Option<String>,

    /// Where downloaded result files are saved
    #[arg(long, global = true)]
    pub download_dir: Option<PathBuf>,

    /// Debug-level diagnostics
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Also write diagnostics to ./scrape-control.log
    #[arg(long, global = true)]
    pub log_file: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Scrape search results for a keyword
    Search {
        #[arg(long)]
        keyword: String,

        /// Result pages to scrape (1-50)
        #[arg(long, default_value_t = 10)]
        pages: u32,

        #[command(flatten)]
        run: RunOptions,
    },

    /// Scrape the listings of one shop
    Shop {
        #[arg(long)]
        shop_id: String,

        /// Skip active listings
        #[arg(long)]
        no_active: bool,

        /// Skip sold-out listings
        #[arg(long)]
        no_soldout: bool,

        #[command(flatten)]
        run: RunOptions,
    },

    /// Scrape reviews for the products listed in a CSV file
    Reviews {
        #[arg(long)]
        file: PathBuf,

        /// Reviews per product (1-10000)
        #[arg(long, default_value_t = 1000)]
        max_reviews: u32,

        #[command(flatten)]
        run: RunOptions,
    },

    /// Analyze a CSV file of scraped reviews
    Analyze {
        #[arg(long)]
        file: PathBuf,

        #[command(flatten)]
        run: RunOptions,
    },

    /// Start the backend's browser driver
    #[command(name = "init-driver")]
    InitDriver,

    /// Probe the backend once
    Status,

    /// Print connection changes until interrupted
    Watch,

    /// List result files on the backend
    Files,

    /// Close the backend's browser driver
    #[command(name = "close-driver")]
    CloseDriver,
}

#[derive(Debug, Clone, Copy, Args)]
pub struct RunOptions {
    /// Initialize the browser driver first when it is not ready
    #[arg(long)]
    pub init_driver: bool,

    /// Download the result file once the task completes
    #[arg(long)]
    pub download: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn search_defaults_to_ten_pages() {
        let cli = Cli::parse_from(["scrape-control", "search", "--keyword", "laptop"]);
        match cli.command {
            Command::Search { keyword, pages, run } => {
                assert_eq!(keyword, "laptop");
                assert_eq!(pages, 10);
                assert!(!run.init_driver);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn global_flags_follow_the_subcommand() {
        let cli = Cli::parse_from([
            "scrape-control",
            "shop",
            "--shop-id",
            "42",
            "--no-soldout",
            "--base-url",
            "http://scraper:5000",
            "--download",
        ]);
        assert_eq!(cli.base_url.as_deref(), Some("http://scraper:5000"));
        match cli.command {
            Command::Shop {
                no_active,
                no_soldout,
                run,
                ..
            } => {
                assert!(!no_active);
                assert!(no_soldout);
                assert!(run.download);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }
}
