mod api;
mod cleaning;
mod config;
mod enrich;
mod error;
mod export;
mod models;
mod scrapers;
mod semantic;

use clap::Parser;
use config::Config;
use scrapers::{OlxBrowserFetcher, PaginationDriver};
use semantic::{FilterContext, OpenAiClassifier};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Scrape OLX search results into a cleaned CSV")]
struct Args {
    /// Search text, e.g. "iphone 13"
    #[arg(short, long, default_value = "")]
    search: String,

    /// Category id to search in
    #[arg(short = 'c', long, default_value = "0")]
    category_id: u64,

    /// Category name for the classifier prompt; looked up from the API when omitted
    #[arg(long)]
    category_name: Option<String>,

    /// Maximum number of pages to scrape
    #[arg(short, long, default_value = "10")]
    max_pages: u32,

    /// Z-score cutoff for the second outlier filter
    #[arg(long, default_value_t = cleaning::DEFAULT_Z_THRESHOLD)]
    z_threshold: f64,

    /// Listings per classifier batch
    #[arg(long, default_value_t = semantic::DEFAULT_BATCH_SIZE)]
    batch_size: usize,

    /// Path to output CSV file
    #[arg(short, long, default_value = "results.csv")]
    output: String,

    /// OLX account email
    #[arg(long, env = "OLX_USERNAME")]
    username: String,

    /// OLX account password
    #[arg(long, env = "OLX_PASSWORD")]
    password: String,

    /// Device name sent with the login request
    #[arg(long, default_value = "integration")]
    device_name: String,

    /// API key for the classifier
    #[arg(long, env = "OPENAI_API_KEY", default_value = "")]
    classifier_api_key: String,

    /// Chat model used for the semantic filter
    #[arg(long, default_value = "gpt-4o-mini")]
    classifier_model: String,

    /// List categories (children of --category-id when given) and exit
    #[arg(long)]
    list_categories: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let mut api = api::OlxApiClient::new()?;
    api.login(&args.username, &args.password, &args.device_name)
        .await?;
    info!("Successfully logged in");

    if args.list_categories {
        let categories = if args.category_id > 0 {
            api.subcategories(args.category_id).await?
        } else {
            api.categories().await?
        };
        println!("Available categories:");
        for category in categories {
            println!("{:>8}  {}", category.id, category.name);
        }
        return Ok(());
    }

    let category_name = match args.category_name.clone() {
        Some(name) => name,
        None => api
            .categories()
            .await?
            .into_iter()
            .find(|c| c.id == args.category_id)
            .map(|c| c.name)
            .unwrap_or_else(|| args.category_id.to_string()),
    };

    let config = Config {
        username: args.username,
        password: args.password,
        device_name: args.device_name,
        classifier_api_key: args.classifier_api_key,
        search_term: args.search,
        category_id: args.category_id,
        category_name,
        max_pages: args.max_pages,
        z_threshold: args.z_threshold,
        batch_size: args.batch_size,
        output: args.output,
    };

    info!("Starting scrape...");
    let fetcher = OlxBrowserFetcher::new()?;
    let driver = PaginationDriver::new(&fetcher, &api);
    let listings = driver.crawl(&config.search_url(), config.max_pages).await?;
    info!("Total items scraped: {}", listings.len());

    let cleaned = cleaning::clean(listings, config.z_threshold);

    let classifier = OpenAiClassifier::new(config.classifier_api_key.as_str())?
        .with_model(args.classifier_model.as_str());
    let context = FilterContext {
        category_name: config.category_name.clone(),
        search_term: config.search_term.clone(),
    };
    let kept = semantic::filter_listings(&classifier, &context, cleaned, config.batch_size).await;

    export::export(&kept, &config.output)?;
    info!("Done: {} listings written to {}", kept.len(), config.output);

    Ok(())
}
