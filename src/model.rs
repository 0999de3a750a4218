//! Entity and event records exchanged with the remote stores.
//!
//! Entities are plain values: the resolver hands back a new, resolved copy
//! rather than filling in an id on a shared instance.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::classify::EventType;

/// Wire format for every date exchanged with the stores.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

pub type EntityId = u64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Team {
    #[serde(default, deserialize_with = "nonzero_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<EntityId>,
    pub name: String,
}

impl Team {
    pub fn named(name: impl Into<String>) -> Self {
        Self { id: None, name: name.into() }
    }

    pub fn with_id(self, id: EntityId) -> Self {
        Self { id: Some(id), ..self }
    }

    pub fn is_resolved(&self) -> bool {
        self.id.is_some()
    }
}

/// Identity is the name alone; two people sharing a name are one entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    #[serde(default, deserialize_with = "nonzero_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<EntityId>,
    pub name: String,
    #[serde(
        default,
        deserialize_with = "lenient_date",
        serialize_with = "serialize_opt_date",
        skip_serializing_if = "Option::is_none"
    )]
    pub date_of_birth: Option<NaiveDate>,
    #[serde(default, deserialize_with = "empty_as_none", skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
}

impl Player {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            date_of_birth: None,
            gender: None,
        }
    }

    pub fn with_id(self, id: EntityId) -> Self {
        Self { id: Some(id), ..self }
    }

    pub fn is_resolved(&self) -> bool {
        self.id.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Match {
    pub id: Option<EntityId>,
    pub home_team: Team,
    pub away_team: Team,
    pub start_date: NaiveDate,
    pub number_of_innings: u8,
    pub limited_overs: u32,
}

impl Match {
    /// Composite identity `(away, home, start date)`, also the cache key.
    pub fn key(&self) -> MatchKey {
        MatchKey {
            away_team: self.away_team.name.clone(),
            home_team: self.home_team.name.clone(),
            start_date: self.start_date,
        }
    }

    pub fn with_id(self, id: EntityId) -> Self {
        Self { id: Some(id), ..self }
    }

    pub fn is_resolved(&self) -> bool {
        self.id.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MatchKey {
    pub away_team: String,
    pub home_team: String,
    pub start_date: NaiveDate,
}

impl MatchKey {
    /// Unit separators keep `("AB", "C")` and `("A", "BC")` apart.
    pub fn cache_key(&self) -> String {
        format!(
            "{}\u{1f}{}\u{1f}{}",
            self.away_team,
            self.home_team,
            self.start_date.format(DATE_FORMAT)
        )
    }
}

/// One canonical delivery event, ready for the event store.
#[derive(Debug, Clone, PartialEq)]
pub struct Delivery {
    pub match_id: EntityId,
    pub event_type: EventType,
    pub timestamp: NaiveDate,
    pub innings: u32,
    pub over: u32,
    pub ball: u32,
    pub batting_team: Team,
    pub fielding_team: Team,
    pub striker: Player,
    pub non_striker: Player,
    pub bowler: Player,
    pub runs: u32,
    pub fielder: Option<Player>,
    pub dismissed_batsman: Option<Player>,
}

impl Delivery {
    /// Every referenced entity carries an id and the two teams differ.
    pub fn is_publishable(&self) -> bool {
        self.match_id != 0
            && self.batting_team.is_resolved()
            && self.fielding_team.is_resolved()
            && self.batting_team != self.fielding_team
            && self.striker.is_resolved()
            && self.non_striker.is_resolved()
            && self.bowler.is_resolved()
            && self.fielder.as_ref().map_or(true, Player::is_resolved)
            && self.dismissed_batsman.as_ref().map_or(true, Player::is_resolved)
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct BallWire<'a> {
    batting_team: &'a Team,
    fielding_team: &'a Team,
    innings: u32,
    over: u32,
    ball: u32,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct BatsmenWire<'a> {
    striker: &'a Player,
    non_striker: &'a Player,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DeliveryWire<'a> {
    #[serde(rename = "match")]
    match_id: EntityId,
    event_type: EventType,
    timestamp: String,
    ball: BallWire<'a>,
    runs: u32,
    batsmen: BatsmenWire<'a>,
    bowler: &'a Player,
    #[serde(skip_serializing_if = "Option::is_none")]
    fielder: Option<&'a Player>,
    #[serde(rename = "batsman", skip_serializing_if = "Option::is_none")]
    dismissed_batsman: Option<&'a Player>,
}

impl Serialize for Delivery {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        DeliveryWire {
            match_id: self.match_id,
            event_type: self.event_type,
            timestamp: self.timestamp.format(DATE_FORMAT).to_string(),
            ball: BallWire {
                batting_team: &self.batting_team,
                fielding_team: &self.fielding_team,
                innings: self.innings,
                over: self.over,
                ball: self.ball,
            },
            runs: self.runs,
            batsmen: BatsmenWire {
                striker: &self.striker,
                non_striker: &self.non_striker,
            },
            bowler: &self.bowler,
            fielder: self.fielder.as_ref(),
            dismissed_batsman: self.dismissed_batsman.as_ref(),
        }
        .serialize(serializer)
    }
}

// =============================================================================
// Serde helpers
// =============================================================================

/// The entity store uses `0` (or omits the field) for "no id".
pub(crate) fn nonzero_id<'de, D>(deserializer: D) -> Result<Option<EntityId>, D::Error>
where
    D: Deserializer<'de>,
{
    let id: Option<EntityId> = Option::deserialize(deserializer)?;
    Ok(id.filter(|id| *id != 0))
}

/// Accepts `null`, `YYYY-MM-DD` or an RFC3339 timestamp. The zero time
/// (`0001-01-01`) and anything unparseable read as unknown.
fn lenient_date<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw
        .as_deref()
        .and_then(|s| s.get(..10))
        .and_then(|s| NaiveDate::parse_from_str(s, DATE_FORMAT).ok())
        .filter(|d| d.year() > 1))
}

fn serialize_opt_date<S>(date: &Option<NaiveDate>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match date {
        Some(d) => serializer.serialize_str(&d.format(DATE_FORMAT).to_string()),
        None => serializer.serialize_none(),
    }
}

fn empty_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.filter(|s| !s.is_empty()))
}
