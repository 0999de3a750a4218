//! Maps a raw delivery's dismissal kind or extras onto the closed event
//! vocabulary understood by the event store.

use serde::Serialize;

use crate::error::{IngestError, IngestResult};
use crate::scoresheet::RawDelivery;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum EventType {
    Delivery,
    Bowled,
    Caught,
    Lbw,
    Stumped,
    RunOut,
    RetiredHurt,
    HitWicket,
    Obstruction,
    DoubleHit,
    HandledBall,
    TimedOut,
    LegBye,
    NoBall,
    PenaltyRuns,
    Wide,
    Bye,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::Delivery => "delivery",
            EventType::Bowled => "bowled",
            EventType::Caught => "caught",
            EventType::Lbw => "lbw",
            EventType::Stumped => "stumped",
            EventType::RunOut => "runOut",
            EventType::RetiredHurt => "retiredHurt",
            EventType::HitWicket => "hitWicket",
            EventType::Obstruction => "obstruction",
            EventType::DoubleHit => "doubleHit",
            EventType::HandledBall => "handledBall",
            EventType::TimedOut => "timedOut",
            EventType::LegBye => "legBye",
            EventType::NoBall => "noBall",
            EventType::PenaltyRuns => "penaltyRuns",
            EventType::Wide => "wide",
            EventType::Bye => "bye",
        }
    }

    /// Runs for these events come from the extras column.
    pub fn scores_extras(&self) -> bool {
        matches!(self, EventType::LegBye | EventType::Bye)
    }
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Cricsheet has no separate "caught and bowled" event downstream.
pub const DISMISSALS: &[(&str, EventType)] = &[
    ("bowled", EventType::Bowled),
    ("caught", EventType::Caught),
    ("caught and bowled", EventType::Caught),
    ("lbw", EventType::Lbw),
    ("stumped", EventType::Stumped),
    ("run out", EventType::RunOut),
    ("retired hurt", EventType::RetiredHurt),
    ("hit wicket", EventType::HitWicket),
    ("obstructing the field", EventType::Obstruction),
    ("hit the ball twice", EventType::DoubleHit),
    ("handled the ball", EventType::HandledBall),
    ("timed out", EventType::TimedOut),
];

pub const EXTRAS: &[(&str, EventType)] = &[
    ("legbyes", EventType::LegBye),
    ("noballs", EventType::NoBall),
    ("penalty", EventType::PenaltyRuns),
    ("wides", EventType::Wide),
    ("byes", EventType::Bye),
];

/// Where an unmapped raw string came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagSource {
    Dismissal,
    Extras,
}

impl TagSource {
    fn field(&self) -> &'static str {
        match self {
            TagSource::Dismissal => "dismissal kind",
            TagSource::Extras => "extras key",
        }
    }
}

/// Result of a table lookup. `Unmapped` is never coerced into a default.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Tag {
    Known(EventType),
    Unmapped { source: TagSource, raw: String },
}

impl Tag {
    pub fn into_event_type(self) -> IngestResult<EventType> {
        match self {
            Tag::Known(event_type) => Ok(event_type),
            Tag::Unmapped { source, raw } => Err(IngestError::Unclassified {
                source_field: source.field(),
                raw,
            }),
        }
    }
}

fn lookup(table: &[(&str, EventType)], source: TagSource, raw: &str) -> Tag {
    table
        .iter()
        .find(|(key, _)| *key == raw)
        .map(|(_, event_type)| Tag::Known(*event_type))
        .unwrap_or_else(|| Tag::Unmapped {
            source,
            raw: raw.to_string(),
        })
}

/// First match wins: dismissal, then extras, then a plain delivery.
pub fn classify_tag(delivery: &RawDelivery) -> Tag {
    if let Some(kind) = delivery.dismissal_kind() {
        return lookup(DISMISSALS, TagSource::Dismissal, kind);
    }
    // extras maps are ordered; in practice they hold a single key
    if let Some(key) = delivery.extras.keys().next() {
        return lookup(EXTRAS, TagSource::Extras, key);
    }
    Tag::Known(EventType::Delivery)
}

pub fn classify(delivery: &RawDelivery) -> IngestResult<EventType> {
    classify_tag(delivery).into_event_type()
}
