use std::error::Error;
use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::json;

use super::records::{aggregate_branches, NutrientRecord};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

// The two fixed query shapes the crate consumes, both read-only.
const VOCABULARY_QUERY: &str = "MATCH (s:Symptom) RETURN s.name AS name";

// One statement per relationship branch; the symptom branch filters on the
// queried labels, the other three are grouped client-side so a nutrient
// never crosses branches into a row product.
const SYMPTOM_BRANCH_QUERY: &str = "MATCH (n:Vitamin)-[:HAS_CATEGORY]->(:SymptomCategory)-[:INCLUDES]->(s:Symptom) \
     WHERE s.name IN $labels \
     RETURN n.name AS nutrient, n.paper_source AS paper_source";
const SOURCE_BRANCH_QUERY: &str = "MATCH (n:Vitamin)-[:HAS_CATEGORY]->(:SourceCategory)-[:INCLUDES]->(src:Source) \
     RETURN n.name AS nutrient, src.name AS value";
const INTAKE_BRANCH_QUERY: &str = "MATCH (n:Vitamin)-[:HAS_CATEGORY]->(:DailyIntakeCategory)-[:INCLUDES]->(d:Daily_intake_recommendation) \
     RETURN n.name AS nutrient, d.name AS value";
const BENEFIT_BRANCH_QUERY: &str = "MATCH (n:Vitamin)-[:HAS_CATEGORY]->(:BenefitCategory)-[:INCLUDES]->(b:Benefit) \
     RETURN n.name AS nutrient, b.name AS value";

#[derive(Debug)]
pub enum GraphStoreError {
    Network(reqwest::Error),
    Api {
        status: reqwest::StatusCode,
        error_body: String,
    },
    Cypher {
        code: String,
        message: String,
    },
    MalformedResponse(String),
}

impl fmt::Display for GraphStoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GraphStoreError::Network(err) => write!(f, "store unreachable: {}", err),
            GraphStoreError::Api { status, error_body } => {
                write!(f, "store returned {}: {}", status, error_body)
            }
            GraphStoreError::Cypher { code, message } => {
                write!(f, "cypher error {}: {}", code, message)
            }
            GraphStoreError::MalformedResponse(msg) => {
                write!(f, "malformed store response: {}", msg)
            }
        }
    }
}

impl Error for GraphStoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            GraphStoreError::Network(err) => Some(err),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for GraphStoreError {
    fn from(err: reqwest::Error) -> Self {
        GraphStoreError::Network(err)
    }
}

// Wire types for the Neo4j HTTP transactional Cypher endpoint.

#[derive(Debug, Serialize)]
struct CypherStatement {
    statement: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    parameters: Option<serde_json::Value>,
}

#[derive(Debug, Serialize)]
struct CypherRequest {
    statements: Vec<CypherStatement>,
}

#[derive(Debug, Deserialize)]
struct CypherResponse {
    #[serde(default)]
    results: Vec<CypherResult>,
    #[serde(default)]
    errors: Vec<CypherFailure>,
}

#[derive(Debug, Deserialize)]
struct CypherResult {
    #[allow(dead_code)]
    columns: Vec<String>,
    data: Vec<CypherRow>,
}

#[derive(Debug, Deserialize)]
struct CypherRow {
    row: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct CypherFailure {
    code: String,
    message: String,
}

/// Connection settings for the store; values typically come from the
/// environment (see `main.rs`).
#[derive(Debug, Clone)]
pub struct GraphConfig {
    pub base_url: String,
    pub database: String,
    pub username: String,
    pub password: String,
}

/// Read-only client for the symptom/nutrient property graph, speaking the
/// Neo4j HTTP transactional Cypher API.
pub struct GraphClient {
    http: reqwest::Client,
    config: GraphConfig,
}

impl GraphClient {
    pub fn new(config: GraphConfig) -> Result<Self, GraphStoreError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self { http, config })
    }

    async fn commit(
        &self,
        statements: Vec<CypherStatement>,
    ) -> Result<Vec<CypherResult>, GraphStoreError> {
        let expected = statements.len();
        let url = format!(
            "{}/db/{}/tx/commit",
            self.config.base_url.trim_end_matches('/'),
            self.config.database
        );

        let response = self
            .http
            .post(&url)
            .basic_auth(&self.config.username, Some(&self.config.password))
            .json(&CypherRequest { statements })
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_body = response
                .text()
                .await
                .unwrap_or_else(|_| "failed to read error body".to_string());
            return Err(GraphStoreError::Api { status, error_body });
        }

        let body: CypherResponse = response
            .json()
            .await
            .map_err(|e| GraphStoreError::MalformedResponse(e.to_string()))?;

        if let Some(failure) = body.errors.into_iter().next() {
            return Err(GraphStoreError::Cypher {
                code: failure.code,
                message: failure.message,
            });
        }
        if body.results.len() != expected {
            return Err(GraphStoreError::MalformedResponse(format!(
                "expected {} statement results, got {}",
                expected,
                body.results.len()
            )));
        }
        Ok(body.results)
    }

    /// All symptom label names known to the store, deduplicated with the
    /// store's order preserved (stable within a session, which the
    /// slot-to-label mapping of the index relies on).
    pub async fn fetch_vocabulary(&self) -> Result<Vec<String>, GraphStoreError> {
        let results = self
            .commit(vec![CypherStatement {
                statement: VOCABULARY_QUERY.to_string(),
                parameters: None,
            }])
            .await?;
        let result = results.first().ok_or_else(|| {
            GraphStoreError::MalformedResponse("missing statement result".to_string())
        })?;

        let mut seen = std::collections::HashSet::new();
        let mut labels = Vec::new();
        for row in &result.data {
            let name = string_cell(&row.row, 0, "symptom name")?;
            if seen.insert(name.clone()) {
                labels.push(name);
            }
        }
        Ok(labels)
    }

    /// The four-branch conjunctive aggregation, grouped by nutrient.
    /// An empty label set short-circuits to an empty result without
    /// touching the network; zero matches is a valid empty result.
    pub async fn fetch_nutrients(
        &self,
        labels: &[String],
    ) -> Result<Vec<NutrientRecord>, GraphStoreError> {
        if labels.is_empty() {
            return Ok(Vec::new());
        }

        let statements = vec![
            CypherStatement {
                statement: SYMPTOM_BRANCH_QUERY.to_string(),
                parameters: Some(json!({ "labels": labels })),
            },
            CypherStatement {
                statement: SOURCE_BRANCH_QUERY.to_string(),
                parameters: None,
            },
            CypherStatement {
                statement: INTAKE_BRANCH_QUERY.to_string(),
                parameters: None,
            },
            CypherStatement {
                statement: BENEFIT_BRANCH_QUERY.to_string(),
                parameters: None,
            },
        ];

        let results = self.commit(statements).await?;
        let [symptom_result, source_result, intake_result, benefit_result]: [CypherResult; 4] =
            results.try_into().map_err(|_| {
                GraphStoreError::MalformedResponse(
                    "expected four statement results".to_string(),
                )
            })?;
        let symptom_rows = optional_value_rows(&symptom_result)?;
        let source_rows = value_rows(&source_result)?;
        let intake_rows = value_rows(&intake_result)?;
        let benefit_rows = value_rows(&benefit_result)?;

        Ok(aggregate_branches(
            symptom_rows,
            source_rows,
            intake_rows,
            benefit_rows,
        ))
    }

    /// Releases the underlying connection pool. Consuming the client means
    /// no further queries can race the release.
    pub async fn close(self) -> Result<(), GraphStoreError> {
        drop(self.http);
        Ok(())
    }
}

fn string_cell(
    row: &[serde_json::Value],
    index: usize,
    what: &str,
) -> Result<String, GraphStoreError> {
    row.get(index)
        .and_then(|v| v.as_str())
        .map(String::from)
        .ok_or_else(|| GraphStoreError::MalformedResponse(format!("{} missing in row", what)))
}

/// Rows of `(nutrient, value)` where the value may be null in the graph.
fn optional_value_rows(
    result: &CypherResult,
) -> Result<Vec<(String, Option<String>)>, GraphStoreError> {
    result
        .data
        .iter()
        .map(|row| {
            let nutrient = string_cell(&row.row, 0, "nutrient name")?;
            let value = row.row.get(1).and_then(|v| v.as_str()).map(String::from);
            Ok((nutrient, value))
        })
        .collect()
}

fn value_rows(result: &CypherResult) -> Result<Vec<(String, String)>, GraphStoreError> {
    result
        .data
        .iter()
        .map(|row| {
            let nutrient = string_cell(&row.row, 0, "nutrient name")?;
            let value = string_cell(&row.row, 1, "leaf value")?;
            Ok((nutrient, value))
        })
        .collect()
}
