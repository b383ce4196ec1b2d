use anyhow::{Context, Result};
use std::env;

use nutri_advisor::cli::{parse_args, Cli, MatcherChoice};
use nutri_advisor::generation::{
    GenerationClient, GenerationConfig, TextGenerator, DEFAULT_BASE_URL, DEFAULT_MODEL,
};
use nutri_advisor::graph_store::{GraphClient, GraphConfig, GraphStore};
use nutri_advisor::search::EmbeddingEngine;
use nutri_advisor::session::{AdvisorSession, MatcherStrategy};

// Store connection settings, overridable via .env / environment.
const STORE_URL_ENV: &str = "NEO4J_HTTP_URL";
const STORE_DATABASE_ENV: &str = "NEO4J_DATABASE";
const STORE_USER_ENV: &str = "NEO4J_USERNAME";
const STORE_PASSWORD_ENV: &str = "NEO4J_PASSWORD";
const DEFAULT_STORE_URL: &str = "http://localhost:7474";
const DEFAULT_STORE_DATABASE: &str = "neo4j";
const DEFAULT_STORE_USER: &str = "neo4j";

// Generation service settings. GENERATION_API_KEY_ENV names the variable
// holding the key for hosted endpoints; the local default needs none.
const GENERATION_URL_ENV: &str = "GENERATION_BASE_URL";
const GENERATION_MODEL_ENV: &str = "GENERATION_MODEL";
const GENERATION_KEY_ENV: &str = "GENERATION_API_KEY_ENV";

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    let cli = parse_args();

    let store_config = GraphConfig {
        base_url: env::var(STORE_URL_ENV).unwrap_or_else(|_| DEFAULT_STORE_URL.to_string()),
        database: env::var(STORE_DATABASE_ENV)
            .unwrap_or_else(|_| DEFAULT_STORE_DATABASE.to_string()),
        username: env::var(STORE_USER_ENV).unwrap_or_else(|_| DEFAULT_STORE_USER.to_string()),
        password: env::var(STORE_PASSWORD_ENV)
            .with_context(|| format!("{} must be set", STORE_PASSWORD_ENV))?,
    };
    let store = GraphClient::new(store_config)
        .context("Failed to initialize the graph store client")?;

    let generation_config = GenerationConfig {
        base_url: env::var(GENERATION_URL_ENV).unwrap_or_else(|_| DEFAULT_BASE_URL.to_string()),
        model: env::var(GENERATION_MODEL_ENV).unwrap_or_else(|_| DEFAULT_MODEL.to_string()),
        api_key_env: env::var(GENERATION_KEY_ENV).ok(),
    };
    let generation = GenerationClient::new(generation_config)
        .context("Failed to initialize the generation client")?;

    let strategy = match cli.matcher {
        MatcherChoice::Embedding => {
            println!("Loading embedding model (this may take a moment on first run)...");
            let engine = EmbeddingEngine::new().context("Failed to load the embedding model")?;
            MatcherStrategy::Embedding(Box::new(engine))
        }
        MatcherChoice::Lexical => MatcherStrategy::Lexical,
    };

    println!("Opening advisor session...");
    let session = AdvisorSession::open(store, generation, strategy)
        .await
        .context("Failed to open advisor session")?;
    println!(
        "Session ready: {} symptom labels in vocabulary.",
        session.vocabulary().len()
    );

    // Close the store whatever happened to the query, then report.
    let outcome = run_query(&session, &cli).await;
    if let Err(e) = session.close().await {
        eprintln!("Warning: failed to release the store connection: {}", e);
    }
    println!("\n{}", outcome?);

    Ok(())
}

async fn run_query<S: GraphStore, G: TextGenerator>(
    session: &AdvisorSession<S, G>,
    cli: &Cli,
) -> Result<String> {
    if cli.dry_run {
        println!("Resolving symptom phrase...");
        let labels = session
            .resolve(&cli.symptom, cli.top_n)
            .context("Failed to resolve the symptom phrase")?;
        println!("Matched labels: {:?}", labels);

        println!("Fetching nutrient records from the graph store...");
        let records = session
            .fetch_nutrients(&labels)
            .await
            .context("Failed to fetch nutrient records")?;
        println!("Aggregated {} nutrient record(s).", records.len());

        return Ok(session.compose_prompt(&cli.symptom, &labels, &records));
    }

    println!("Running the advisory pipeline...");
    let advice = session
        .advise(&cli.symptom, cli.top_n)
        .await
        .context("Advisory pipeline failed")?;
    println!("Matched labels: {:?}", advice.labels);
    println!("Aggregated {} nutrient record(s).", advice.records.len());

    Ok(advice.answer)
}
