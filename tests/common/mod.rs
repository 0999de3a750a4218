#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use cricd_ingest::error::{IngestError, IngestResult};
use cricd_ingest::model::{Delivery, EntityId, Player, Team};
use cricd_ingest::publish::EventSink;
use cricd_ingest::store::{EntityStore, MatchQuery, MatchRecord};

#[derive(Default)]
struct StoreState {
    next_id: EntityId,
    teams: Vec<Team>,
    players: Vec<Player>,
    matches: Vec<(MatchQuery, EntityId)>,
    calls: HashMap<&'static str, usize>,
}

/// In-memory entity store that counts every call.
#[derive(Default)]
pub struct FakeStore {
    state: Mutex<StoreState>,
    /// Creates answer with id 0, as a broken store would.
    zero_id_creates: bool,
    /// Lookups for these player names fail with a 500.
    failing_players: Vec<String>,
}

impl FakeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_zero_id_creates() -> Self {
        Self {
            zero_id_creates: true,
            ..Self::default()
        }
    }

    pub fn with_failing_players(names: &[&str]) -> Self {
        Self {
            failing_players: names.iter().map(|n| n.to_string()).collect(),
            ..Self::default()
        }
    }

    pub fn calls(&self, call: &str) -> usize {
        let state = self.state.lock().unwrap();
        state.calls.get(call).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.state.lock().unwrap().calls.values().sum()
    }

    pub fn seed_team(&self, id: EntityId, name: &str) {
        self.state.lock().unwrap().teams.push(Team::named(name).with_id(id));
    }

    pub fn seed_player(&self, id: EntityId, name: &str) {
        self.state.lock().unwrap().players.push(Player::named(name).with_id(id));
    }

    pub fn match_count(&self) -> usize {
        self.state.lock().unwrap().matches.len()
    }

    fn record(&self, call: &'static str) -> std::sync::MutexGuard<'_, StoreState> {
        let mut state = self.state.lock().unwrap();
        *state.calls.entry(call).or_insert(0) += 1;
        state
    }

    fn allocate(&self, state: &mut StoreState) -> EntityId {
        if self.zero_id_creates {
            return 0;
        }
        state.next_id += 1;
        state.next_id + 100
    }
}

#[async_trait]
impl EntityStore for FakeStore {
    async fn find_teams(&self, name: &str) -> IngestResult<Vec<Team>> {
        let state = self.record("find_teams");
        Ok(state.teams.iter().filter(|t| t.name == name).cloned().collect())
    }

    async fn create_team(&self, name: &str) -> IngestResult<Team> {
        let mut state = self.record("create_team");
        let id = self.allocate(&mut state);
        let team = Team {
            id: if id == 0 { None } else { Some(id) },
            name: name.to_string(),
        };
        state.teams.push(team.clone());
        Ok(team)
    }

    async fn find_players(&self, name: &str) -> IngestResult<Vec<Player>> {
        let state = self.record("find_players");
        if self.failing_players.iter().any(|p| p == name) {
            return Err(IngestError::Status {
                endpoint: "GET /players".into(),
                status: 500,
                expected: 200,
            });
        }
        Ok(state.players.iter().filter(|p| p.name == name).cloned().collect())
    }

    async fn create_player(&self, name: &str) -> IngestResult<Player> {
        let mut state = self.record("create_player");
        let id = self.allocate(&mut state);
        let mut player = Player::named(name);
        if id != 0 {
            player = player.with_id(id);
        }
        state.players.push(player.clone());
        Ok(player)
    }

    async fn find_matches(&self, query: &MatchQuery) -> IngestResult<Vec<MatchRecord>> {
        let state = self.record("find_matches");
        Ok(state
            .matches
            .iter()
            .filter(|(q, _)| q == query)
            .map(|(_, id)| MatchRecord { id: Some(*id) })
            .collect())
    }

    async fn create_match(&self, query: &MatchQuery) -> IngestResult<MatchRecord> {
        let mut state = self.record("create_match");
        let id = self.allocate(&mut state);
        if id != 0 {
            state.matches.push((query.clone(), id));
        }
        Ok(MatchRecord {
            id: if id == 0 { None } else { Some(id) },
        })
    }
}

/// Event sink that keeps every published delivery in order.
#[derive(Default)]
pub struct RecordingSink {
    published: Mutex<Vec<Delivery>>,
    /// Publish attempts at these 0-based positions fail with a 500.
    fail_on: Vec<usize>,
    attempts: Mutex<usize>,
}

impl RecordingSink {
    pub fn failing_on(attempts: &[usize]) -> Self {
        Self {
            fail_on: attempts.to_vec(),
            ..Self::default()
        }
    }

    pub fn published(&self) -> Vec<Delivery> {
        self.published.lock().unwrap().clone()
    }
}

#[async_trait]
impl EventSink for RecordingSink {
    async fn publish(&self, delivery: &Delivery) -> IngestResult<()> {
        let attempt = {
            let mut attempts = self.attempts.lock().unwrap();
            let n = *attempts;
            *attempts += 1;
            n
        };
        if self.fail_on.contains(&attempt) {
            return Err(IngestError::Status {
                endpoint: "POST /event".into(),
                status: 500,
                expected: 201,
            });
        }
        self.published.lock().unwrap().push(delivery.clone());
        Ok(())
    }
}

pub const SHEET: &str = r#"
meta:
  data_version: 0.9
  created: 2011-05-06
  revision: 1
info:
  city: Auckland
  dates:
  - 2005-02-17
  gender: male
  match_type: T20
  overs: 20
  teams:
  - New Zealand
  - Australia
  venue: Eden Park
innings:
- 1st innings:
    team: Australia
    deliveries:
    - 0.1:
        batsman: AC Gilchrist
        bowler: DR Tuffey
        extras:
          wides: 1
        non_striker: MJ Clarke
        runs:
          batsman: 0
          extras: 1
          total: 1
    - 0.2:
        batsman: AC Gilchrist
        bowler: DR Tuffey
        non_striker: MJ Clarke
        runs:
          batsman: 6
          extras: 0
          total: 6
    - 0.3:
        batsman: AC Gilchrist
        bowler: DR Tuffey
        non_striker: MJ Clarke
        runs:
          batsman: 0
          extras: 0
          total: 0
        wicket:
          kind: retired not out
          player_out: AC Gilchrist
    - 0.4:
        batsman: MJ Clarke
        bowler: DR Tuffey
        non_striker: RT Ponting
        runs:
          batsman: 0
          extras: 0
          total: 0
        wicket:
          fielders:
          - SB Styris
          kind: caught
          player_out: MJ Clarke
- 2nd innings:
    team: New Zealand
    deliveries:
    - 0.1:
        batsman: SP Fleming
        bowler: GD McGrath
        extras:
          legbyes: 1
        non_striker: NJ Astle
        runs:
          batsman: 0
          extras: 1
          total: 1
    - 0.2:
        batsman: NJ Astle
        bowler: GD McGrath
        non_striker: SP Fleming
        runs:
          batsman: 0
          extras: 0
          total: 0
        wicket:
          fielders:
          - RT Ponting
          kind: run out
          player_out: SP Fleming
"#;
