//! Cricsheet YAML scoresheets and their flattening into per-delivery records.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use chrono::NaiveDate;
use serde::Deserialize;

use crate::error::{IngestError, IngestResult};
use crate::logging::{log, obj, v_int, v_str, Domain, Level};
use crate::model::DATE_FORMAT;

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Runs {
    #[serde(default)]
    pub batsman: u32,
    #[serde(default)]
    pub extras: u32,
    #[serde(default)]
    pub total: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Wicket {
    #[serde(default)]
    pub kind: String,
    #[serde(default)]
    pub player_out: String,
    #[serde(default)]
    pub fielders: Vec<String>,
}

/// One ball as written in the scoresheet. `over` and `ball` come from the
/// `"over.ball"` key and are filled in while flattening.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RawDelivery {
    #[serde(skip)]
    pub over: u32,
    #[serde(skip)]
    pub ball: u32,
    pub batsman: String,
    pub non_striker: String,
    pub bowler: String,
    #[serde(default)]
    pub runs: Runs,
    #[serde(default)]
    pub wicket: Option<Wicket>,
    #[serde(default)]
    pub extras: BTreeMap<String, u32>,
}

impl RawDelivery {
    /// Non-empty dismissal kind, if this ball took a wicket.
    pub fn dismissal_kind(&self) -> Option<&str> {
        self.wicket
            .as_ref()
            .map(|w| w.kind.as_str())
            .filter(|kind| !kind.is_empty())
    }

    pub fn fielders(&self) -> &[String] {
        self.wicket.as_ref().map(|w| w.fielders.as_slice()).unwrap_or(&[])
    }

    pub fn player_out(&self) -> Option<&str> {
        self.wicket
            .as_ref()
            .map(|w| w.player_out.as_str())
            .filter(|name| !name.is_empty())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Outcome {
    #[serde(default)]
    pub winner: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Toss {
    #[serde(default)]
    pub decision: Option<String>,
    #[serde(default)]
    pub winner: Option<String>,
}

/// Match metadata shared by every delivery of a scoresheet.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct MatchInfo {
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub dates: Vec<String>,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub match_type: String,
    #[serde(default)]
    pub outcome: Outcome,
    #[serde(default)]
    pub overs: Option<u32>,
    /// First listed team is the home team.
    #[serde(default)]
    pub teams: Vec<String>,
    #[serde(default)]
    pub toss: Toss,
    #[serde(default)]
    pub umpires: Vec<String>,
    #[serde(default)]
    pub venue: Option<String>,
}

impl MatchInfo {
    /// The first listed date is the start date.
    pub fn start_date(&self) -> IngestResult<NaiveDate> {
        let raw = self
            .dates
            .first()
            .ok_or_else(|| IngestError::Precondition("scoresheet lists no match dates".into()))?;
        NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT).map_err(|e| {
            IngestError::Precondition(format!("unparseable start date {:?}: {}", raw, e))
        })
    }

    /// Tests are two-innings matches; everything else is one.
    pub fn number_of_innings(&self) -> u8 {
        if self.match_type.eq_ignore_ascii_case("test") {
            2
        } else {
            1
        }
    }

    pub fn limited_overs(&self) -> u32 {
        self.overs.unwrap_or(0)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Meta {
    #[serde(default)]
    pub created: Option<String>,
    #[serde(default)]
    pub data_version: Option<f64>,
    #[serde(default)]
    pub revision: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Inning {
    pub team: String,
    #[serde(default)]
    pub deliveries: Vec<BTreeMap<String, RawDelivery>>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Scoresheet {
    #[serde(default)]
    pub meta: Meta,
    pub info: MatchInfo,
    #[serde(default)]
    pub innings: Vec<BTreeMap<String, Inning>>,
}

/// A single delivery together with the context needed to translate it.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoresheetRecord {
    pub info: Arc<MatchInfo>,
    /// 1-based.
    pub innings: u32,
    pub batting_team: String,
    pub delivery: RawDelivery,
}

impl Scoresheet {
    pub fn parse(yaml: &str) -> IngestResult<Self> {
        serde_yaml::from_str(yaml).map_err(|e| IngestError::Scoresheet(e.to_string()))
    }

    pub async fn read(path: &Path) -> IngestResult<Self> {
        let yaml = tokio::fs::read_to_string(path).await.map_err(|e| {
            IngestError::Scoresheet(format!("cannot read {}: {}", path.display(), e))
        })?;
        let sheet = Self::parse(&yaml)?;
        log(
            Level::Debug,
            Domain::Scoresheet,
            "scoresheet_read",
            obj(&[
                ("file", v_str(&path.display().to_string())),
                ("teams", v_str(&sheet.info.teams.join(" v "))),
                ("innings", v_int(sheet.innings.len() as u64)),
            ]),
        );
        Ok(sheet)
    }

    /// Deliveries in scoresheet order. A malformed `over.ball` key rejects
    /// the whole sheet.
    pub fn flatten(&self) -> IngestResult<Vec<ScoresheetRecord>> {
        let info = Arc::new(self.info.clone());
        let mut records = Vec::new();
        for (idx, innings) in self.innings.iter().enumerate() {
            for inning in innings.values() {
                for ball in &inning.deliveries {
                    for (key, delivery) in ball {
                        let (over, ball_no) = parse_over_ball(key)?;
                        let mut delivery = delivery.clone();
                        delivery.over = over;
                        delivery.ball = ball_no;
                        records.push(ScoresheetRecord {
                            info: Arc::clone(&info),
                            innings: idx as u32 + 1,
                            batting_team: inning.team.clone(),
                            delivery,
                        });
                    }
                }
            }
        }
        Ok(records)
    }
}

/// `"12.3"` → `(12, 3)`.
pub fn parse_over_ball(key: &str) -> IngestResult<(u32, u32)> {
    let bad = || IngestError::Scoresheet(format!("invalid delivery key {:?}", key));
    let (over, ball) = key.trim().split_once('.').ok_or_else(bad)?;
    let over = over.parse().map_err(|_| bad())?;
    let ball = ball.parse().map_err(|_| bad())?;
    Ok((over, ball))
}
