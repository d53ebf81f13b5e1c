// src/graph/client.rs

//! HTTP client for the graph service
//!
//! Speaks the graph database's transactional Cypher endpoint
//! (`POST {url}/db/{database}/tx/commit`) over reqwest's blocking client,
//! with basic auth, a request timeout, and bounded retry.

use crate::error::{Error, Result};
use crate::graph::{DependencyRecord, PackageGraph};
use reqwest::blocking::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::{Duration, Instant};
use tracing::{debug, warn};
use url::Url;

/// Default timeout for graph queries (20 seconds)
const QUERY_TIMEOUT: Duration = Duration::from_secs(20);

/// Maximum attempts per query
const MAX_RETRIES: u32 = 3;

/// Delay between retry attempts in milliseconds
const RETRY_DELAY_MS: u64 = 500;

const VERSIONS_QUERY: &str = "\
MATCH (p:Package {name:$name})-[:HAS_VERSION]->(v:PackageVersion)
RETURN v.version AS ver";

const DEPENDENCIES_QUERY: &str = "\
MATCH (v:PackageVersion {name_version:$nv})-[r:REQUIRES]->(dep:Package)
RETURN dep.name AS dep, r.spec AS spec, r.marker AS marker";

/// Connection parameters for the graph service
#[derive(Debug, Clone)]
pub struct GraphClientConfig {
    /// Base URL of the service, e.g. `http://localhost:7474`
    pub endpoint: String,
    /// Database name within the service
    pub database: String,
    pub username: String,
    pub password: String,
}

impl Default for GraphClientConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:7474".to_string(),
            database: "neo4j".to_string(),
            username: "neo4j".to_string(),
            password: String::new(),
        }
    }
}

/// Graph service client with retry support
pub struct GraphClient {
    http: Client,
    commit_url: Url,
    config: GraphClientConfig,
}

/// Response shape of the transactional Cypher endpoint
#[derive(Debug, Deserialize)]
struct CypherResponse {
    #[serde(default)]
    results: Vec<CypherResult>,
    #[serde(default)]
    errors: Vec<CypherError>,
}

#[derive(Debug, Deserialize)]
struct CypherResult {
    #[serde(default)]
    data: Vec<CypherRow>,
}

#[derive(Debug, Deserialize)]
struct CypherRow {
    #[serde(default)]
    row: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct CypherError {
    #[serde(default)]
    code: String,
    #[serde(default)]
    message: String,
}

impl GraphClient {
    /// Create a new client for the configured graph service
    pub fn new(config: GraphClientConfig) -> Result<Self> {
        let base = Url::parse(&config.endpoint)
            .map_err(|e| Error::InitError(format!("Invalid graph endpoint '{}': {}", config.endpoint, e)))?;
        let commit_url = base
            .join(&format!("db/{}/tx/commit", config.database))
            .map_err(|e| Error::InitError(format!("Invalid graph database name: {}", e)))?;

        let http = Client::builder()
            .timeout(QUERY_TIMEOUT)
            .build()
            .map_err(|e| Error::InitError(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http,
            commit_url,
            config,
        })
    }

    /// Run a Cypher statement, retrying transient failures
    fn run_query(&self, statement: &str, parameters: Value) -> Result<Vec<Vec<Value>>> {
        let body = json!({
            "statements": [{ "statement": statement, "parameters": parameters }]
        });

        let mut attempt = 0;
        loop {
            attempt += 1;
            let started = Instant::now();
            let outcome = self
                .http
                .post(self.commit_url.clone())
                .basic_auth(&self.config.username, Some(&self.config.password))
                .json(&body)
                .send();

            match outcome {
                Ok(response) => {
                    let status = response.status();
                    if !status.is_success() {
                        return Err(Error::QueryError(format!(
                            "HTTP {} from {}",
                            status, self.commit_url
                        )));
                    }

                    let parsed: CypherResponse = response.json().map_err(|e| {
                        Error::QueryError(format!("Failed to decode graph response: {}", e))
                    })?;

                    if let Some(err) = parsed.errors.first() {
                        return Err(Error::QueryError(format!(
                            "{}: {}",
                            err.code, err.message
                        )));
                    }

                    debug!(
                        attempt,
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        "graph query ok"
                    );
                    let rows = parsed
                        .results
                        .into_iter()
                        .next()
                        .map(|r| r.data.into_iter().map(|d| d.row).collect())
                        .unwrap_or_default();
                    return Ok(rows);
                }
                Err(e) => {
                    if attempt >= MAX_RETRIES {
                        return Err(Error::QueryError(format!(
                            "Graph query failed after {} attempts: {}",
                            attempt, e
                        )));
                    }
                    warn!(attempt, "graph query attempt failed: {}, retrying", e);
                    std::thread::sleep(Duration::from_millis(RETRY_DELAY_MS * attempt as u64));
                }
            }
        }
    }
}

impl PackageGraph for GraphClient {
    fn versions(&self, package: &str) -> Result<Vec<String>> {
        let rows = self.run_query(VERSIONS_QUERY, json!({ "name": package }))?;
        Ok(rows
            .into_iter()
            .filter_map(|row| row.into_iter().next())
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect())
    }

    fn dependencies(&self, package: &str, version: &str) -> Result<Vec<DependencyRecord>> {
        // Version nodes are keyed "name@version" in the graph.
        let nv = format!("{}@{}", package, version);
        let rows = self.run_query(DEPENDENCIES_QUERY, json!({ "nv": nv }))?;
        Ok(rows
            .into_iter()
            .filter_map(|row| {
                let mut cells = row.into_iter();
                let target = cells.next()?.as_str()?.to_string();
                let constraint = cells
                    .next()
                    .and_then(|v| v.as_str().map(str::to_string))
                    .unwrap_or_default();
                let marker = cells
                    .next()
                    .and_then(|v| v.as_str().map(str::to_string))
                    .unwrap_or_default();
                Some(DependencyRecord {
                    target,
                    constraint,
                    marker,
                })
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_invalid_endpoint() {
        let config = GraphClientConfig {
            endpoint: "not a url".to_string(),
            ..Default::default()
        };
        assert!(GraphClient::new(config).is_err());
    }

    #[test]
    fn test_commit_url_layout() {
        let client = GraphClient::new(GraphClientConfig::default()).unwrap();
        assert_eq!(
            client.commit_url.as_str(),
            "http://localhost:7474/db/neo4j/tx/commit"
        );
    }
}
