//! Entity store contract: the six calls the resolver needs.

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Deserialize;

use crate::error::IngestResult;
use crate::model::{nonzero_id, EntityId, Player, Team, DATE_FORMAT};

mod http;

pub use http::HttpEntityStore;

/// Full descriptor of a match as the entity store filters and creates it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchQuery {
    pub home_team: EntityId,
    pub away_team: EntityId,
    pub number_of_innings: u8,
    pub limited_overs: u32,
    pub start_date: NaiveDate,
}

impl MatchQuery {
    /// Shared by the GET query string and the POST form body.
    pub fn fields(&self) -> Vec<(&'static str, String)> {
        vec![
            ("homeTeam", self.home_team.to_string()),
            ("awayTeam", self.away_team.to_string()),
            ("numberOfInnings", self.number_of_innings.to_string()),
            ("limitedOvers", self.limited_overs.to_string()),
            ("startDate", self.start_date.format(DATE_FORMAT).to_string()),
        ]
    }
}

/// Only the id of a stored match is needed downstream.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct MatchRecord {
    #[serde(default, deserialize_with = "nonzero_id")]
    pub id: Option<EntityId>,
}

#[async_trait]
pub trait EntityStore: Send + Sync {
    async fn find_teams(&self, name: &str) -> IngestResult<Vec<Team>>;
    async fn create_team(&self, name: &str) -> IngestResult<Team>;
    async fn find_players(&self, name: &str) -> IngestResult<Vec<Player>>;
    async fn create_player(&self, name: &str) -> IngestResult<Player>;
    async fn find_matches(&self, query: &MatchQuery) -> IngestResult<Vec<MatchRecord>>;
    async fn create_match(&self, query: &MatchQuery) -> IngestResult<MatchRecord>;
}
