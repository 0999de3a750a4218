//! Get-or-create resolution of teams, players and matches.
//!
//! Every resolution runs the same two-step protocol: cache, then remote
//! lookup, then remote create. Identifiers returned here are always non-zero.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use tokio::task::JoinHandle;

use crate::cache::EntityCache;
use crate::config::Config;
use crate::error::{IngestError, IngestResult};
use crate::logging::{log, obj, v_int, v_str, Domain, Level};
use crate::model::{EntityId, Match, Player, Team};
use crate::store::{EntityStore, MatchQuery, MatchRecord};

/// Entity kinds as they appear in logs and errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Team,
    Player,
    Match,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Team => "team",
            EntityKind::Player => "player",
            EntityKind::Match => "match",
        }
    }
}

/// Something the store hands back that may or may not carry an id.
trait Identified {
    fn id(&self) -> Option<EntityId>;
}

impl Identified for Team {
    fn id(&self) -> Option<EntityId> {
        self.id
    }
}

impl Identified for Player {
    fn id(&self) -> Option<EntityId> {
        self.id
    }
}

impl Identified for MatchRecord {
    fn id(&self) -> Option<EntityId> {
        self.id
    }
}

pub struct EntityResolver<S> {
    store: Arc<S>,
    teams: EntityCache<Team>,
    players: EntityCache<Player>,
    matches: EntityCache<Match>,
}

impl<S: EntityStore> EntityResolver<S> {
    pub fn new(store: Arc<S>, ttl: Duration) -> Self {
        Self {
            store,
            teams: EntityCache::new("team", ttl),
            players: EntityCache::new("player", ttl),
            matches: EntityCache::new("match", ttl),
        }
    }

    pub fn from_config(store: Arc<S>, cfg: &Config) -> Self {
        Self::new(store, cfg.cache_ttl)
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Start the periodic expiry sweep for all three caches.
    pub fn spawn_sweepers(&self, every: Duration) -> Vec<JoinHandle<()>> {
        vec![
            self.teams.spawn_sweeper(every),
            self.players.spawn_sweeper(every),
            self.matches.spawn_sweeper(every),
        ]
    }

    pub async fn resolve_team(&self, name: &str) -> IngestResult<Team> {
        let store = &self.store;
        get_or_create(
            EntityKind::Team,
            name,
            &self.teams,
            || store.find_teams(name),
            || store.create_team(name),
            |_: Team, id| Team::named(name).with_id(id),
        )
        .await
    }

    /// `context` is the team the player appeared for in this delivery. The
    /// store has no per-team player identity, so it only shows up in logs.
    pub async fn resolve_player(&self, name: &str, context: Option<&Team>) -> IngestResult<Player> {
        log(
            Level::Trace,
            Domain::Entity,
            "resolve_player",
            obj(&[
                ("name", v_str(name)),
                ("team", v_str(context.map(|t| t.name.as_str()).unwrap_or(""))),
            ]),
        );
        let store = &self.store;
        get_or_create(
            EntityKind::Player,
            name,
            &self.players,
            || store.find_players(name),
            || store.create_player(name),
            |found: Player, id| Player {
                id: Some(id),
                name: name.to_string(),
                ..found
            },
        )
        .await
    }

    /// Both teams must already be resolved; their ids are part of the
    /// lookup and create payloads.
    pub async fn resolve_match(
        &self,
        home_team: &Team,
        away_team: &Team,
        start_date: NaiveDate,
        number_of_innings: u8,
        limited_overs: u32,
    ) -> IngestResult<Match> {
        let (home_id, away_id) = match (home_team.id, away_team.id) {
            (Some(home), Some(away)) => (home, away),
            _ => {
                return Err(IngestError::Precondition(format!(
                    "match between {:?} and {:?} needs resolved teams",
                    home_team.name, away_team.name
                )))
            }
        };
        let draft = Match {
            id: None,
            home_team: home_team.clone(),
            away_team: away_team.clone(),
            start_date,
            number_of_innings,
            limited_overs,
        };
        let key = draft.key().cache_key();
        let query = MatchQuery {
            home_team: home_id,
            away_team: away_id,
            number_of_innings,
            limited_overs,
            start_date,
        };
        let store = &self.store;
        get_or_create(
            EntityKind::Match,
            &key,
            &self.matches,
            || store.find_matches(&query),
            || store.create_match(&query),
            |_: MatchRecord, id| draft.clone().with_id(id),
        )
        .await
    }
}

/// Cache → lookup (first result wins) → create.
async fn get_or_create<T, R, LF, CF>(
    kind: EntityKind,
    key: &str,
    cache: &EntityCache<T>,
    lookup: impl FnOnce() -> LF,
    create: impl FnOnce() -> CF,
    resolved: impl Fn(R, EntityId) -> T,
) -> IngestResult<T>
where
    T: Clone + Send + 'static,
    R: Identified,
    LF: Future<Output = IngestResult<Vec<R>>>,
    CF: Future<Output = IngestResult<R>>,
{
    if let Some(hit) = cache.get(key) {
        log(
            Level::Trace,
            Domain::Cache,
            "hit",
            obj(&[("kind", v_str(kind.as_str())), ("key", v_str(key))]),
        );
        return Ok(hit);
    }

    let found = lookup().await?;
    if found.len() > 1 {
        log(
            Level::Info,
            Domain::Entity,
            "multiple_results",
            obj(&[
                ("kind", v_str(kind.as_str())),
                ("key", v_str(key)),
                ("count", v_int(found.len() as u64)),
                ("msg", v_str("using the first result")),
            ]),
        );
    }
    if let Some(first) = found.into_iter().next() {
        let id = first.id().ok_or_else(|| {
            IngestError::malformed(
                kind.as_str(),
                format!("lookup for {:?} returned a record without an id", key),
            )
        })?;
        let entity = resolved(first, id);
        cache.set(key, entity.clone());
        log(
            Level::Debug,
            Domain::Entity,
            "found",
            obj(&[
                ("kind", v_str(kind.as_str())),
                ("key", v_str(key)),
                ("id", v_int(id)),
            ]),
        );
        return Ok(entity);
    }

    let created = create().await?;
    let id = created.id().ok_or_else(|| IngestError::CreationFailed {
        kind: kind.as_str(),
        key: key.to_string(),
    })?;
    let entity = resolved(created, id);
    cache.set(key, entity.clone());
    log(
        Level::Info,
        Domain::Entity,
        "created",
        obj(&[
            ("kind", v_str(kind.as_str())),
            ("key", v_str(key)),
            ("id", v_int(id)),
        ]),
    );
    Ok(entity)
}
