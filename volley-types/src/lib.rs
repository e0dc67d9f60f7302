//! Core domain types shared across the Volley data layer.
//!
//! All timestamps are epoch milliseconds (i64) so they round-trip through
//! the on-device SQLite store without conversion. Match ids are generated
//! client-side; the same id doubles as the remote document id, which is
//! what makes remote retries idempotent.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Fixed id for the built-in AI opponent. Never written to the remote store.
pub const AI_PLAYER_ID: &str = "ai_computer";

/// Current time as epoch milliseconds.
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Strongly-typed player identifier (NewType pattern).
///
/// Holds an authentication subject id for humans, [`AI_PLAYER_ID`] for the
/// AI opponent, or a deterministic `guest_*` id for anonymous players.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(pub String);

impl PlayerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The AI opponent's sentinel id.
    pub fn ai() -> Self {
        Self(AI_PLAYER_ID.to_string())
    }

    /// Deterministic guest id derived from a display name: `guest_` plus
    /// the lowercased alphanumeric characters of the name. The same name
    /// always maps to the same id, so repeated lookups hit the same record.
    pub fn guest_from_name(name: &str) -> Self {
        let slug: String = name
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .map(|c| c.to_ascii_lowercase())
            .collect();
        Self(format!("guest_{slug}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_ai(&self) -> bool {
        self.0 == AI_PLAYER_ID
    }
}

impl std::fmt::Display for PlayerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for PlayerId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Strongly-typed match identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MatchId(pub String);

impl MatchId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generates a fresh client-side id: `ftx_<uuid>` for threshold
    /// matches, `fsv_<uuid>` for survival matches.
    pub fn generate(kind: MatchKind) -> Self {
        let prefix = match kind {
            MatchKind::Threshold => "ftx",
            MatchKind::Survival => "fsv",
        };
        Self(format!("{prefix}_{}", Uuid::new_v4().simple()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for MatchId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for MatchId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// The two kinds of match records the game produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchKind {
    Threshold,
    Survival,
}

impl MatchKind {
    /// Stable string form, used as the `score_type` column value and for
    /// selecting the remote collection.
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchKind::Threshold => "threshold",
            MatchKind::Survival => "survival",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "threshold" => Some(MatchKind::Threshold),
            "survival" => Some(MatchKind::Survival),
            _ => None,
        }
    }
}

impl std::fmt::Display for MatchKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a survival match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Verdict {
    Win,
    Lose,
}

impl Verdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            Verdict::Win => "WIN",
            Verdict::Lose => "LOSE",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "WIN" => Some(Verdict::Win),
            "LOSE" => Some(Verdict::Lose),
            _ => None,
        }
    }
}

/// A player profile — a person or the fixed AI opponent.
///
/// `loss_count` is a local-only approximation; it is never reconciled with
/// the remote store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub created_at: i64,
    pub updated_at: i64,
    pub win_count: u32,
    pub loss_count: u32,
}

impl Player {
    /// Fresh zero-stat profile created at the current time.
    pub fn new(id: PlayerId, name: impl Into<String>) -> Self {
        let now = now_millis();
        Self {
            id,
            name: name.into(),
            created_at: now,
            updated_at: now,
            win_count: 0,
            loss_count: 0,
        }
    }

    pub fn is_ai(&self) -> bool {
        self.id.is_ai()
    }
}

/// A finished first-to-threshold match between two players (or one player
/// and the AI). The first player slot is the submitting device's player.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdMatch {
    pub id: MatchId,
    pub owner_id: PlayerId,
    pub opponent_id: PlayerId,
    pub owner_score: u32,
    pub opponent_score: u32,
    pub winner_id: PlayerId,
    pub elapsed_seconds: u32,
    pub target_threshold: Option<u32>,
    pub created_at: i64,
    pub played_online: bool,
    /// Local-only flag: true once a remote copy is confirmed to exist.
    pub synced: bool,
}

/// A finished survival match: hold out for as long as possible.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurvivalMatch {
    pub id: MatchId,
    pub owner_id: PlayerId,
    pub verdict: Verdict,
    pub survived_seconds: u32,
    pub target_seconds: Option<u32>,
    pub created_at: i64,
    pub played_online: bool,
    /// Local-only flag: true once a remote copy is confirmed to exist.
    pub synced: bool,
}

/// Either kind of match record, for APIs that handle both uniformly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum MatchRecord {
    Threshold(ThresholdMatch),
    Survival(SurvivalMatch),
}

impl MatchRecord {
    pub fn id(&self) -> &MatchId {
        match self {
            MatchRecord::Threshold(m) => &m.id,
            MatchRecord::Survival(m) => &m.id,
        }
    }

    pub fn kind(&self) -> MatchKind {
        match self {
            MatchRecord::Threshold(_) => MatchKind::Threshold,
            MatchRecord::Survival(_) => MatchKind::Survival,
        }
    }

    pub fn created_at(&self) -> i64 {
        match self {
            MatchRecord::Threshold(m) => m.created_at,
            MatchRecord::Survival(m) => m.created_at,
        }
    }

    pub fn synced(&self) -> bool {
        match self {
            MatchRecord::Threshold(m) => m.synced,
            MatchRecord::Survival(m) => m.synced,
        }
    }

    pub fn set_synced(&mut self, synced: bool) {
        match self {
            MatchRecord::Threshold(m) => m.synced = synced,
            MatchRecord::Survival(m) => m.synced = synced,
        }
    }

    /// True if the given player appears in any slot of this record.
    pub fn involves(&self, player: &PlayerId) -> bool {
        match self {
            MatchRecord::Threshold(m) => &m.owner_id == player || &m.opponent_id == player,
            MatchRecord::Survival(m) => &m.owner_id == player,
        }
    }
}

impl From<ThresholdMatch> for MatchRecord {
    fn from(m: ThresholdMatch) -> Self {
        MatchRecord::Threshold(m)
    }
}

impl From<SurvivalMatch> for MatchRecord {
    fn from(m: SurvivalMatch) -> Self {
        MatchRecord::Survival(m)
    }
}

/// A queued deletion waiting for remote confirmation. Exists only between
/// a local delete and a confirmed remote delete.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingDelete {
    pub match_id: MatchId,
    pub kind: MatchKind,
    pub enqueued_at: i64,
}
