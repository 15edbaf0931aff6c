//! wikinow - Wikipedia interest signals from the command line
//!
//! Thin frontend over wikinow-core for feeding downstream feature
//! pipelines: related-topic discovery plus recent and historical
//! pageview series, printed as JSON (default) or CSV.

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use wikinow_core::{
    metrics, HistoryQuery, PageviewQuery, PageviewSeries, RelatedQuery, RelatedResolver,
    WikinowConfig, WikisharkClient, PageviewsClient,
};

/// wikinow - related-topic and pageview retrieval for Wikipedia articles
#[derive(Parser)]
#[command(name = "wikinow")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path (TOML); falls back to wikinow.toml and env vars
    #[arg(short, long, global = true)]
    config: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Discover related articles through shared backlinks and forward links
    Related {
        /// Focal article title
        title: String,

        /// Article language
        #[arg(short, long, default_value = "en")]
        lang: String,

        /// Companion articles expected to share links (can be repeated)
        #[arg(short, long)]
        related: Vec<String>,

        /// Selection policy: restrict, extend or weight
        #[arg(short, long, default_value = "restrict")]
        method: String,

        /// Output as CSV instead of JSON
        #[arg(long)]
        csv: bool,
    },

    /// Fetch a pageview series from the Wikimedia REST API (2015 onward)
    Views {
        /// Article title
        title: String,

        /// Article language
        #[arg(short, long, default_value = "en")]
        lang: String,

        /// Access filter: all-access, desktop, mobile-app or mobile-web
        #[arg(long, default_value = "all-access")]
        access: String,

        /// Agent filter: all-agents, user, bot or spider
        #[arg(long, default_value = "all-agents")]
        agents: String,

        /// Time unit: daily or monthly
        #[arg(short, long, default_value = "daily")]
        granularity: String,

        /// First date of the range (e.g. 2020-01-10)
        #[arg(long)]
        first: Option<String>,

        /// Last date of the range; omitted collapses to the first date
        #[arg(long)]
        last: Option<String>,

        /// Output as CSV instead of JSON
        #[arg(long)]
        csv: bool,
    },

    /// Fetch a historical pageview series from Wikishark (2008 to 2015)
    History {
        /// Article title
        title: String,

        /// Article language
        #[arg(short, long, default_value = "en")]
        lang: String,

        /// Time unit: hourly, daily or monthly
        #[arg(short, long, default_value = "daily")]
        granularity: String,

        /// First date of the range (e.g. 01/01/2008)
        #[arg(long)]
        first: Option<String>,

        /// Last date of the range; omitted collapses to the first date
        #[arg(long)]
        last: Option<String>,

        /// Output as CSV instead of JSON
        #[arg(long)]
        csv: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => WikinowConfig::from_file(path)?,
        None => WikinowConfig::load()?,
    };

    metrics::register_metrics();

    match cli.command {
        Commands::Related {
            title,
            lang,
            related,
            method,
            csv,
        } => {
            let query = RelatedQuery::new(title)
                .with_lang(lang)
                .with_related(related)
                .with_method(method.parse()?);

            let resolver = RelatedResolver::from_config(&config)?;
            let topics = resolver.resolve(&query).await?;

            if csv {
                let mut writer = csv::Writer::from_writer(std::io::stdout());
                writer.write_record(["title", "weight"])?;
                for (title, weight) in topics.pairs() {
                    writer.write_record([title.to_string(), weight.to_string()])?;
                }
                writer.flush()?;
            } else {
                println!("{}", serde_json::to_string_pretty(&topics)?);
            }
        }

        Commands::Views {
            title,
            lang,
            access,
            agents,
            granularity,
            first,
            last,
            csv,
        } => {
            let mut query = PageviewQuery::new(title)
                .with_lang(lang)
                .with_range(first, last);
            query.access = access.parse()?;
            query.agents = agents.parse()?;
            query.granularity = granularity.parse()?;

            let client = PageviewsClient::new(&config.pageviews)?;
            let series = client.article_views(&query).await?;
            print_series(&series, csv)?;
        }

        Commands::History {
            title,
            lang,
            granularity,
            first,
            last,
            csv,
        } => {
            let mut query = HistoryQuery::new(title)
                .with_lang(lang)
                .with_range(first, last);
            query.granularity = granularity.parse()?;

            let client = WikisharkClient::new(&config.wikishark)?;
            let series = client.article_views(&query).await?;
            print_series(&series, csv)?;
        }
    }

    Ok(())
}

fn print_series(series: &PageviewSeries, csv: bool) -> Result<()> {
    if csv {
        let mut writer = csv::Writer::from_writer(std::io::stdout());
        writer.write_record(["date", "views"])?;
        for (date, views) in series.pairs() {
            writer.write_record([date.to_string(), views.to_string()])?;
        }
        writer.flush()?;
    } else {
        println!("{}", serde_json::to_string_pretty(series)?);
    }

    Ok(())
}
