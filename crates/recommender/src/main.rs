use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use review_graph_core::{
    init_logging, load_dotenv, ConfigLoader, DatabaseConfig, DatabasePool, GraphConfig,
    JobConfig, LogConfig, MaskSampling,
};
use review_graph_recommender::dataset::load_dataset;
use review_graph_recommender::jobs::{
    clear_graph, upload_similarities, CategoryReviewersJob, RecommendationJob, SharedReviewsJob,
    SimilarityJob,
};
use review_graph_recommender::store::{
    ItemCatalog, Neo4jGraphStore, PostgresItemCatalog, PostgresReviewStore, ReviewStore,
};

#[derive(Parser)]
#[command(name = "review-graph")]
#[command(about = "Reviewer similarity, rating imputation and reviewer graph batch jobs", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(long, global = true, help = "Similarity artifact path")]
    similarity_file: Option<String>,

    #[arg(
        long,
        global = true,
        env = "REVIEW_GRAPH_DATASET_DIR",
        help = "Read reviews from this dataset directory instead of PostgreSQL"
    )]
    dataset: Option<PathBuf>,

    #[arg(long, global = true, help = "Log level when RUST_LOG is unset")]
    log_level: Option<String>,

    #[arg(long, global = true, help = "Emit logs as JSON")]
    log_json: bool,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Compute pairwise similarity of the most active reviewers")]
    Similarity {
        #[arg(long, help = "Number of reviewers to compare")]
        top_reviewers: Option<usize>,

        #[arg(long, help = "Article set cache capacity")]
        cache_size: Option<usize>,

        #[arg(long, help = "Load the artifact into the graph store afterwards")]
        upload: bool,
    },

    #[command(about = "Load the similarity artifact into the graph store")]
    Upload,

    #[command(about = "Impute held-out ratings and report the error")]
    Recommend {
        #[arg(short, long, help = "Neighbours averaged per reviewer")]
        neighbors: Option<usize>,

        #[arg(long, help = "Fraction of known ratings to hold out")]
        mask_ratio: Option<f64>,

        #[arg(long, help = "Seed for the held-out sample")]
        mask_seed: Option<u64>,

        #[arg(long, help = "with-replacement or without-replacement")]
        mask_sampling: Option<MaskSampling>,

        #[arg(long, help = "Print the outcome as JSON")]
        json: bool,
    },

    #[command(about = "Link reviewers active in several categories to those categories")]
    CategoryReviewers {
        #[arg(long, help = "Reviewers read, in name order")]
        limit: Option<usize>,

        #[arg(long, help = "Categories a reviewer must have written in")]
        min_types: Option<usize>,

        #[arg(long, help = "Print the outcome as JSON")]
        json: bool,
    },

    #[command(about = "Rank reviewer pairs by reviews of the same popular items")]
    SharedReviews {
        #[arg(long, help = "Items linked")]
        items: Option<usize>,

        #[arg(long, help = "Only items with fewer reviews than this")]
        max_reviews: Option<u64>,

        #[arg(long, help = "Print the outcome as JSON")]
        json: bool,
    },

    #[command(about = "Delete every node and edge from the graph store")]
    ClearGraph,
}

/// Review collection and catalog, from PostgreSQL or a dataset directory
struct Stores {
    reviews: Arc<dyn ReviewStore>,
    catalog: Arc<dyn ItemCatalog>,
    pool: Option<DatabasePool>,
}

impl Stores {
    async fn open(dataset: Option<&Path>) -> Result<Self> {
        if let Some(dir) = dataset {
            let (reviews, catalog) = load_dataset(dir)
                .with_context(|| format!("Failed to load dataset from {}", dir.display()))?
                .into_stores();
            return Ok(Self {
                reviews: Arc::new(reviews),
                catalog: Arc::new(catalog),
                pool: None,
            });
        }

        let pool = connect_database().await?;
        Ok(Self {
            reviews: Arc::new(PostgresReviewStore::new(pool.pool().clone())),
            catalog: Arc::new(PostgresItemCatalog::new(pool.pool().clone())),
            pool: Some(pool),
        })
    }

    async fn close(self) {
        if let Some(pool) = self.pool {
            pool.close().await;
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("Error: {:#}", err);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    load_dotenv();

    let cli = Cli::parse();
    let config = job_config(&cli)?;

    init_logging(&LogConfig::from(&config)).context("Failed to initialize logging")?;

    match cli.command {
        Commands::Similarity { upload, .. } => {
            let stores = Stores::open(cli.dataset.as_deref()).await?;

            let stats = SimilarityJob::new(Arc::clone(&stores.reviews), config.clone())
                .run()
                .await
                .context("Similarity job failed")?;
            stores.close().await;

            println!(
                "Compared {} pairs of {} reviewers, wrote {} similarities to {}",
                stats.pairs_compared, stats.users, stats.records_written, config.similarity_file
            );

            if upload {
                let graph = connect_graph().await?;
                let loaded = upload_similarities(Path::new(&config.similarity_file), &graph)
                    .await
                    .context("Upload failed")?;
                println!("Uploaded {} similarities", loaded);
            }
        }
        Commands::Upload => {
            let graph = connect_graph().await?;
            let loaded = upload_similarities(Path::new(&config.similarity_file), &graph)
                .await
                .context("Upload failed")?;
            println!("Uploaded {} similarities", loaded);
        }
        Commands::Recommend { json, .. } => {
            let stores = Stores::open(cli.dataset.as_deref()).await?;
            let graph = connect_graph().await?;

            let job = RecommendationJob::new(
                Arc::clone(&stores.reviews),
                Arc::clone(&stores.catalog),
                Arc::new(graph),
                config,
            );
            let outcome = job.run().await.context("Recommendation job failed")?;
            stores.close().await;

            if json {
                println!("{}", serde_json::to_string_pretty(&outcome)?);
            } else {
                println!(
                    "{} reviewers x {} items, {} known ratings ({} reviews skipped)",
                    outcome.reviewers,
                    outcome.items,
                    outcome.known_ratings,
                    outcome.skipped_reviews
                );
                println!("{}", outcome.report);
            }
        }
        Commands::CategoryReviewers { json, .. } => {
            let stores = Stores::open(cli.dataset.as_deref()).await?;
            let graph = connect_graph().await?;

            let job = CategoryReviewersJob::new(
                Arc::clone(&stores.reviews),
                Arc::clone(&stores.catalog),
                Arc::new(graph),
                config,
            );
            let outcome = job.run().await.context("Category reviewer job failed")?;
            stores.close().await;

            if json {
                println!("{}", serde_json::to_string_pretty(&outcome)?);
            } else {
                println!(
                    "Linked {} of {} reviewers with {} WROTE edges",
                    outcome.reviewers_linked, outcome.reviewers_scanned, outcome.edges_written
                );
            }
        }
        Commands::SharedReviews { json, .. } => {
            let stores = Stores::open(cli.dataset.as_deref()).await?;
            let graph = connect_graph().await?;

            let job = SharedReviewsJob::new(Arc::clone(&stores.reviews), Arc::new(graph), config);
            let outcome = job.run().await.context("Shared review job failed")?;
            stores.close().await;

            if json {
                println!("{}", serde_json::to_string_pretty(&outcome)?);
            } else {
                for item in &outcome.items {
                    println!("{} ({} reviews)", item.asin, item.review_count);
                }
                for pair in &outcome.pairs {
                    println!(
                        "{} and {} reviewed {} articles in common",
                        pair.user1, pair.user2, pair.shared_reviews
                    );
                }
                println!("{} reviewer pairs share a reviewed article", outcome.pairs.len());
            }
        }
        Commands::ClearGraph => {
            let graph = connect_graph().await?;
            clear_graph(&graph).await.context("Failed to clear graph")?;
            println!("Graph cleared");
        }
    }

    Ok(())
}

/// Environment configuration with command-line overrides applied
fn job_config(cli: &Cli) -> Result<JobConfig> {
    let mut config = JobConfig::from_env().context("Failed to load job configuration")?;

    if let Some(path) = &cli.similarity_file {
        config.similarity_file = path.clone();
    }
    if let Some(level) = &cli.log_level {
        config.log_level = level.clone();
    }
    config.log_json |= cli.log_json;

    match &cli.command {
        Commands::Similarity {
            top_reviewers,
            cache_size,
            ..
        } => {
            if let Some(n) = top_reviewers {
                config.top_reviewers = *n;
            }
            if let Some(n) = cache_size {
                config.max_cache_size = *n;
            }
        }
        Commands::Recommend {
            neighbors,
            mask_ratio,
            mask_seed,
            mask_sampling,
            ..
        } => {
            if let Some(k) = neighbors {
                config.knn_neighbors = *k;
            }
            if let Some(ratio) = mask_ratio {
                config.mask_ratio = *ratio;
            }
            if let Some(seed) = mask_seed {
                config.mask_seed = *seed;
            }
            if let Some(sampling) = mask_sampling {
                config.mask_sampling = *sampling;
            }
        }
        Commands::CategoryReviewers {
            limit, min_types, ..
        } => {
            if let Some(n) = limit {
                config.category_reviewers = *n;
            }
            if let Some(n) = min_types {
                config.min_product_types = *n;
            }
        }
        Commands::SharedReviews {
            items, max_reviews, ..
        } => {
            if let Some(n) = items {
                config.popular_items = *n;
            }
            if let Some(n) = max_reviews {
                config.popular_max_reviews = *n;
            }
        }
        Commands::Upload | Commands::ClearGraph => {}
    }

    config.validate().context("Invalid job configuration")?;
    Ok(config)
}

async fn connect_database() -> Result<DatabasePool> {
    let config = DatabaseConfig::from_env().context("Failed to load database configuration")?;
    config.validate()?;

    let pool = DatabasePool::connect(&config)
        .await
        .context("Failed to connect to PostgreSQL")?;
    info!("Document and relational stores ready");
    Ok(pool)
}

async fn connect_graph() -> Result<Neo4jGraphStore> {
    let config = GraphConfig::from_env().context("Failed to load graph configuration")?;
    config.validate()?;

    Neo4jGraphStore::connect(&config)
        .await
        .context("Failed to connect to Neo4j")
}
