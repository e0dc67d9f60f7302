//! Two-way converters between domain structs and remote documents.
//!
//! The document id is never a field: it is the client-generated match or
//! player id, carried in the document path. Local-only state (loss counts,
//! sync flags) never crosses the wire.

use crate::error::{RemoteError, RemoteResult};
use crate::value::{Document, Value};
use volley_types::{MatchId, MatchKind, Player, PlayerId, SurvivalMatch, ThresholdMatch, Verdict};

/// Remote collection names, one per entity.
pub const PLAYERS_COLLECTION: &str = "players";
pub const THRESHOLD_COLLECTION: &str = "threshold_matches";
pub const SURVIVAL_COLLECTION: &str = "survival_matches";

/// Field paths referenced outside full-document writes.
pub const FIELD_NAME: &str = "name";
pub const FIELD_CREATED_AT: &str = "created_at";
pub const FIELD_UPDATED_AT: &str = "updated_at";
pub const FIELD_WIN_COUNT: &str = "win_count";
pub const FIELD_OWNER_ID: &str = "owner_id";
pub const FIELD_OPPONENT_ID: &str = "opponent_id";

pub fn collection_for(kind: MatchKind) -> &'static str {
    match kind {
        MatchKind::Threshold => THRESHOLD_COLLECTION,
        MatchKind::Survival => SURVIVAL_COLLECTION,
    }
}

/// Player profile as stored remotely. `loss_count` is intentionally
/// absent — losses are a local-only stat.
pub fn player_to_document(player: &Player) -> Document {
    let mut doc = Document::new();
    doc.insert(FIELD_NAME, player.name.as_str())
        .insert(FIELD_CREATED_AT, player.created_at)
        .insert(FIELD_UPDATED_AT, player.updated_at)
        .insert(FIELD_WIN_COUNT, player.win_count);
    doc
}

/// Decode a player document. Tolerant of missing counters and timestamps
/// (older documents), strict about the display name.
pub fn player_from_document(id: &PlayerId, doc: &Document) -> RemoteResult<Player> {
    let name = doc
        .get_str(FIELD_NAME)
        .ok_or_else(|| RemoteError::Decode(format!("player {id} missing name")))?;
    Ok(Player {
        id: id.clone(),
        name: name.to_string(),
        created_at: doc.get_i64(FIELD_CREATED_AT).unwrap_or(0),
        updated_at: doc.get_i64(FIELD_UPDATED_AT).unwrap_or(0),
        win_count: doc
            .get_i64(FIELD_WIN_COUNT)
            .and_then(|raw| u32::try_from(raw).ok())
            .unwrap_or(0),
        // Never tracked remotely; callers preserve the local value on merge
        loss_count: 0,
    })
}

pub fn threshold_to_document(m: &ThresholdMatch) -> Document {
    let mut doc = Document::new();
    doc.insert(FIELD_OWNER_ID, m.owner_id.as_str())
        .insert(FIELD_OPPONENT_ID, m.opponent_id.as_str())
        .insert("owner_score", m.owner_score)
        .insert("opponent_score", m.opponent_score)
        .insert("winner_id", m.winner_id.as_str())
        .insert("elapsed_seconds", m.elapsed_seconds)
        .insert(FIELD_CREATED_AT, m.created_at)
        .insert("played_online", m.played_online);
    match m.target_threshold {
        Some(t) => doc.insert("target_threshold", t),
        None => doc.insert("target_threshold", Value::Null),
    };
    doc
}

/// Decode a threshold match. The decoded record is marked synced: the
/// document's very existence is remote confirmation.
pub fn threshold_from_document(id: &MatchId, doc: &Document) -> RemoteResult<ThresholdMatch> {
    Ok(ThresholdMatch {
        id: id.clone(),
        owner_id: PlayerId::new(require_str(doc, id, FIELD_OWNER_ID)?),
        opponent_id: PlayerId::new(require_str(doc, id, FIELD_OPPONENT_ID)?),
        owner_score: require_u32(doc, id, "owner_score")?,
        opponent_score: require_u32(doc, id, "opponent_score")?,
        winner_id: PlayerId::new(require_str(doc, id, "winner_id")?),
        elapsed_seconds: require_u32(doc, id, "elapsed_seconds")?,
        target_threshold: optional_u32(doc, "target_threshold"),
        created_at: require_i64(doc, id, FIELD_CREATED_AT)?,
        played_online: doc.get_bool("played_online").unwrap_or(false),
        synced: true,
    })
}

pub fn survival_to_document(m: &SurvivalMatch) -> Document {
    let mut doc = Document::new();
    doc.insert(FIELD_OWNER_ID, m.owner_id.as_str())
        .insert("verdict", m.verdict.as_str())
        .insert("survived_seconds", m.survived_seconds)
        .insert(FIELD_CREATED_AT, m.created_at)
        .insert("played_online", m.played_online);
    match m.target_seconds {
        Some(t) => doc.insert("target_seconds", t),
        None => doc.insert("target_seconds", Value::Null),
    };
    doc
}

/// Decode a survival match; marked synced like
/// [`threshold_from_document`].
pub fn survival_from_document(id: &MatchId, doc: &Document) -> RemoteResult<SurvivalMatch> {
    let verdict_str = require_str(doc, id, "verdict")?;
    let verdict = Verdict::parse(verdict_str)
        .ok_or_else(|| RemoteError::Decode(format!("match {id}: unknown verdict '{verdict_str}'")))?;
    Ok(SurvivalMatch {
        id: id.clone(),
        owner_id: PlayerId::new(require_str(doc, id, FIELD_OWNER_ID)?),
        verdict,
        survived_seconds: require_u32(doc, id, "survived_seconds")?,
        target_seconds: optional_u32(doc, "target_seconds"),
        created_at: require_i64(doc, id, FIELD_CREATED_AT)?,
        played_online: doc.get_bool("played_online").unwrap_or(false),
        synced: true,
    })
}

fn require_str<'d>(
    doc: &'d Document,
    id: &impl std::fmt::Display,
    field: &str,
) -> RemoteResult<&'d str> {
    doc.get_str(field)
        .ok_or_else(|| RemoteError::Decode(format!("document {id} missing string field {field}")))
}

fn require_i64(doc: &Document, id: &impl std::fmt::Display, field: &str) -> RemoteResult<i64> {
    doc.get_i64(field)
        .ok_or_else(|| RemoteError::Decode(format!("document {id} missing integer field {field}")))
}

fn require_u32(doc: &Document, id: &impl std::fmt::Display, field: &str) -> RemoteResult<u32> {
    let raw = require_i64(doc, id, field)?;
    u32::try_from(raw)
        .map_err(|_| RemoteError::Decode(format!("document {id}: field {field} out of range: {raw}")))
}

fn optional_u32(doc: &Document, field: &str) -> Option<u32> {
    doc.get_i64(field).and_then(|raw| u32::try_from(raw).ok())
}
