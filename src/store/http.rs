use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use url::Url;

use crate::config::Config;
use crate::error::{IngestError, IngestResult};
use crate::logging::{log, obj, v_int, v_str, Domain, Level};
use crate::model::{Player, Team};
use crate::store::{EntityStore, MatchQuery, MatchRecord};

/// Entity store over HTTP. Lookups are bounded by `get_timeout`; creates
/// use the client default.
pub struct HttpEntityStore {
    client: Client,
    teams: Url,
    players: Url,
    matches: Url,
    get_timeout: Duration,
}

impl HttpEntityStore {
    pub fn new(cfg: &Config) -> Result<Self> {
        Self::with_base(cfg.entity_store_base()?, cfg.get_timeout)
    }

    pub fn with_base(base: Url, get_timeout: Duration) -> Result<Self> {
        let join = |path: &str| {
            base.join(path)
                .map_err(|e| anyhow!("cannot build {} url from {}: {}", path, base, e))
        };
        Ok(Self {
            client: Client::new(),
            teams: join("teams")?,
            players: join("players")?,
            matches: join("matches")?,
            get_timeout,
        })
    }

    async fn get_list<T: DeserializeOwned>(
        &self,
        url: &Url,
        query: &[(&str, String)],
    ) -> IngestResult<Vec<T>> {
        let endpoint = format!("GET {}", url.path());
        log(
            Level::Debug,
            Domain::Entity,
            "get",
            obj(&[("endpoint", v_str(&endpoint))]),
        );
        let resp = self
            .client
            .get(url.clone())
            .query(query)
            .timeout(self.get_timeout)
            .send()
            .await
            .map_err(|e| IngestError::transport(&endpoint, e))?;
        let body = expect_status(resp, StatusCode::OK, &endpoint).await?;
        let items: Vec<T> = decode(&body, &endpoint)?;
        log(
            Level::Trace,
            Domain::Entity,
            "get_result",
            obj(&[
                ("endpoint", v_str(&endpoint)),
                ("count", v_int(items.len() as u64)),
            ]),
        );
        Ok(items)
    }

    async fn create<T: DeserializeOwned>(
        &self,
        url: &Url,
        form: &[(&str, String)],
    ) -> IngestResult<T> {
        let endpoint = format!("POST {}", url.path());
        log(
            Level::Debug,
            Domain::Entity,
            "create",
            obj(&[("endpoint", v_str(&endpoint))]),
        );
        let resp = self
            .client
            .post(url.clone())
            .form(form)
            .send()
            .await
            .map_err(|e| IngestError::transport(&endpoint, e))?;
        let body = expect_status(resp, StatusCode::CREATED, &endpoint).await?;
        decode(&body, &endpoint)
    }
}

async fn expect_status(
    resp: reqwest::Response,
    expected: StatusCode,
    endpoint: &str,
) -> IngestResult<String> {
    let status = resp.status();
    if status != expected {
        return Err(IngestError::Status {
            endpoint: endpoint.to_string(),
            status: status.as_u16(),
            expected: expected.as_u16(),
        });
    }
    resp.text()
        .await
        .map_err(|e| IngestError::transport(endpoint, e))
}

fn decode<T: DeserializeOwned>(body: &str, endpoint: &str) -> IngestResult<T> {
    serde_json::from_str(body).map_err(|e| IngestError::malformed(endpoint, e.to_string()))
}

fn name_field(name: &str) -> [(&'static str, String); 1] {
    [("name", name.to_string())]
}

#[async_trait]
impl EntityStore for HttpEntityStore {
    async fn find_teams(&self, name: &str) -> IngestResult<Vec<Team>> {
        self.get_list(&self.teams, &name_field(name)).await
    }

    async fn create_team(&self, name: &str) -> IngestResult<Team> {
        self.create(&self.teams, &name_field(name)).await
    }

    async fn find_players(&self, name: &str) -> IngestResult<Vec<Player>> {
        self.get_list(&self.players, &name_field(name)).await
    }

    async fn create_player(&self, name: &str) -> IngestResult<Player> {
        self.create(&self.players, &name_field(name)).await
    }

    async fn find_matches(&self, query: &MatchQuery) -> IngestResult<Vec<MatchRecord>> {
        self.get_list(&self.matches, &query.fields()).await
    }

    async fn create_match(&self, query: &MatchQuery) -> IngestResult<MatchRecord> {
        self.create(&self.matches, &query.fields()).await
    }
}
