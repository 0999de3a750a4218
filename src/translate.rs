//! Turns one flattened scoresheet record into a canonical delivery.

use std::sync::Arc;

use serde_json::json;

use crate::classify::{classify, EventType};
use crate::error::{IngestError, IngestResult};
use crate::logging::{log, obj, v_str, Domain, Level};
use crate::model::{Delivery, Player, Team};
use crate::resolver::EntityResolver;
use crate::scoresheet::{RawDelivery, Runs, ScoresheetRecord};
use crate::store::EntityStore;

/// Who, if anyone, is credited as the fielder on a delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FielderRole<'a> {
    None,
    Named(&'a str),
    /// Caught with no fielder listed: caught and bowled.
    Bowler,
    /// Run out or stumped without a listed fielder.
    Unknown,
}

/// Runs credited to the event: extras for byes and leg byes, the batsman's
/// runs for everything else.
pub fn runs_for(event_type: EventType, runs: &Runs) -> u32 {
    if event_type.scores_extras() {
        runs.extras
    } else {
        runs.batsman
    }
}

pub fn fielder_for(event_type: EventType, delivery: &RawDelivery) -> FielderRole<'_> {
    let first = delivery
        .fielders()
        .iter()
        .map(String::as_str)
        .find(|name| !name.is_empty());
    match event_type {
        EventType::RunOut | EventType::Stumped => first.map_or(FielderRole::Unknown, FielderRole::Named),
        EventType::Caught => first.map_or(FielderRole::Bowler, FielderRole::Named),
        _ => FielderRole::None,
    }
}

/// For a run out the dismissed player may be the non-striker; every other
/// dismissal removes the striker, who is already on the record.
pub fn dismissed_batsman_for(event_type: EventType, delivery: &RawDelivery) -> Option<&str> {
    match event_type {
        EventType::RunOut => delivery.player_out(),
        _ => None,
    }
}

/// Split the two resolved teams into (batting, fielding) for this delivery.
pub fn assign_sides(batting_name: &str, home: Team, away: Team) -> IngestResult<(Team, Team)> {
    if batting_name == home.name {
        Ok((home, away))
    } else if batting_name == away.name {
        Ok((away, home))
    } else {
        Err(IngestError::Precondition(format!(
            "batting team {:?} is neither {:?} nor {:?}",
            batting_name, home.name, away.name
        )))
    }
}

fn team_names(teams: &[String]) -> IngestResult<(&str, &str)> {
    match teams {
        [home, away, ..] if home == away => Err(IngestError::Precondition(format!(
            "both teams are named {:?}",
            home
        ))),
        [home, away, ..] => Ok((home.as_str(), away.as_str())),
        _ => Err(IngestError::Precondition(format!(
            "scoresheet lists {} team(s), need two",
            teams.len()
        ))),
    }
}

pub struct DeliveryTranslator<S> {
    resolver: Arc<EntityResolver<S>>,
}

impl<S: EntityStore> DeliveryTranslator<S> {
    pub fn new(resolver: Arc<EntityResolver<S>>) -> Self {
        Self { resolver }
    }

    pub fn resolver(&self) -> &EntityResolver<S> {
        &self.resolver
    }

    async fn player(&self, role: &str, name: &str, team: &Team) -> IngestResult<Player> {
        if name.trim().is_empty() {
            return Err(IngestError::Precondition(format!("{} has no name", role)));
        }
        self.resolver.resolve_player(name, Some(team)).await
    }

    /// Resolution runs in a fixed order: teams, match, batsmen, bowler,
    /// fielder, dismissed batsman. Any failure abandons this delivery.
    pub async fn translate(&self, record: &ScoresheetRecord) -> IngestResult<Delivery> {
        let info = &record.info;
        let raw = &record.delivery;

        let (home_name, away_name) = team_names(&info.teams)?;
        let home = self.resolver.resolve_team(home_name).await?;
        let away = self.resolver.resolve_team(away_name).await?;

        let start_date = info.start_date()?;
        let game = self
            .resolver
            .resolve_match(
                &home,
                &away,
                start_date,
                info.number_of_innings(),
                info.limited_overs(),
            )
            .await?;
        let match_id = game
            .id
            .ok_or_else(|| IngestError::Precondition("match resolved without an id".into()))?;

        let (batting_team, fielding_team) = assign_sides(&record.batting_team, home, away)?;

        let striker = self.player("striker", &raw.batsman, &batting_team).await?;
        let non_striker = self.player("non-striker", &raw.non_striker, &batting_team).await?;
        let bowler = self.player("bowler", &raw.bowler, &fielding_team).await?;

        let event_type = classify(raw)?;
        let runs = runs_for(event_type, &raw.runs);

        let fielder = match fielder_for(event_type, raw) {
            FielderRole::Named(name) => Some(self.player("fielder", name, &fielding_team).await?),
            FielderRole::Bowler => Some(bowler.clone()),
            FielderRole::Unknown => {
                log(
                    Level::Warn,
                    Domain::Translate,
                    "fielder_missing",
                    obj(&[
                        ("event_type", v_str(event_type.as_str())),
                        ("innings", json!(record.innings)),
                        ("over", json!(raw.over)),
                        ("ball", json!(raw.ball)),
                    ]),
                );
                None
            }
            FielderRole::None => None,
        };

        let dismissed_batsman = match dismissed_batsman_for(event_type, raw) {
            Some(name) => Some(self.player("dismissed batsman", name, &batting_team).await?),
            None => None,
        };

        let delivery = Delivery {
            match_id,
            event_type,
            timestamp: start_date,
            innings: record.innings,
            over: raw.over,
            ball: raw.ball,
            batting_team,
            fielding_team,
            striker,
            non_striker,
            bowler,
            runs,
            fielder,
            dismissed_batsman,
        };
        if !delivery.is_publishable() {
            return Err(IngestError::Precondition(
                "assembled delivery references an unresolved entity".into(),
            ));
        }
        log(
            Level::Debug,
            Domain::Translate,
            "translated",
            obj(&[
                ("match", json!(match_id)),
                ("event_type", v_str(event_type.as_str())),
                ("innings", json!(delivery.innings)),
                ("over", json!(delivery.over)),
                ("ball", json!(delivery.ball)),
                ("runs", json!(runs)),
            ]),
        );
        Ok(delivery)
    }
}
