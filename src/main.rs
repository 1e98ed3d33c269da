use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use taxasge_cache::config;
use taxasge_cache::seed;
use taxasge_cache::{AdvancedSearch, Database, Language};

#[derive(Parser)]
#[command(name = "taxasge-cache", version, about = "Multilingual tax catalog cache")]
struct Cli {
    #[command(subcommand)]
    action: Option<Action>,

    /// Display language (es, fr, en); defaults to the stored preference
    #[arg(long, global = true)]
    lang: Option<String>,
}

#[derive(Subcommand, Debug, PartialEq)]
enum Action {
    /// Search concepts by name, procedure, documents or keyword
    Search { term: String },
    /// Concepts tagged with a keyword
    Keyword { word: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "taxasge_cache=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    tracing::info!("taxasge-cache {} (built {})", env!("CARGO_PKG_VERSION"), env!("BUILD_TIME"));

    let cli = Cli::parse();

    let app_config = config::load_config().context("Failed to load configuration")?;
    let db = Database::open(&app_config)
        .await
        .context("Failed to open the cache database")?;

    if let Some(path) = app_config.seed_path() {
        let summary = if app_config.seed.force_reset {
            let json = tokio::fs::read_to_string(&path)
                .await
                .with_context(|| format!("Failed to read seed file {:?}", path))?;
            Some(seed::import_seed(&db, &json, true).await?)
        } else {
            seed::seed_if_empty(&db, &path).await?
        };
        if let Some(summary) = summary {
            tracing::info!("Seed import: {}", serde_json::to_string(&summary)?);
        }
    }

    let lang = match &cli.lang {
        Some(code) => Language::parse(code)?,
        None => db.preferred_language().await?,
    };

    match cli.action {
        Some(Action::Keyword { word }) => {
            let concepts = db
                .search_concepts_by_keyword(&word, Some(lang.code()))
                .await?;
            for concept in &concepts {
                println!("{}\t{}", concept.id, concept.name.resolve(lang));
            }
        }
        Some(Action::Search { term }) => {
            let filters = AdvancedSearch {
                term: Some(term),
                language: Some(lang.code().to_string()),
                ..AdvancedSearch::default()
            };
            for concept in db.advanced_search(&filters).await? {
                let fee = concept.issuance_fee.as_deref().unwrap_or("-");
                println!("{}\t{}\t{}", concept.id, concept.name.resolve(lang), fee);
            }
        }
        None => {
            for ministry in db.ministries(Some(lang)).await? {
                let sectors = db.sectors_store().count_by_parent_id(&ministry.id).await?;
                println!("{}\t{}\t{} sectors", ministry.id, ministry.name.resolve(lang), sectors);
            }
        }
    }

    db.close().await;
    Ok(())
}
