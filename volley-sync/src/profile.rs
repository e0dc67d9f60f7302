//! Player profile and stat aggregation.
//!
//! Same local-first contract as the match engine: the local row always
//! commits, the remote write is best-effort. Win counts go remote through
//! an atomic server-side increment so two devices bumping the same
//! profile never lose an update. Losses and everything about the AI
//! opponent stay local.

use std::sync::Arc;

use tracing::{debug, warn};

use volley_remote::codec::{
    self, FIELD_NAME, FIELD_UPDATED_AT, FIELD_WIN_COUNT, PLAYERS_COLLECTION,
};
use volley_remote::{CreateOutcome, RemoteStore};
use volley_store::LocalStore;
use volley_types::{Player, PlayerId, now_millis};

use crate::error::SyncResult;
use crate::network::NetworkMonitor;

/// What happened to the remote half of a profile write.
///
/// `Deferred` means no remote write was attempted (offline, or the AI
/// sentinel) and is safe to ignore; `Failed` means a write was attempted
/// and lost, which callers may want to surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteWrite {
    Confirmed,
    Deferred,
    Failed,
}

/// Profile reads, creation, and stat updates.
pub struct ProfileService {
    local: LocalStore,
    remote: Arc<dyn RemoteStore>,
    network: Arc<dyn NetworkMonitor>,
}

impl ProfileService {
    pub fn new(
        local: LocalStore,
        remote: Arc<dyn RemoteStore>,
        network: Arc<dyn NetworkMonitor>,
    ) -> Self {
        Self {
            local,
            remote,
            network,
        }
    }

    /// Fetch a profile by id, creating a zero-stat one if absent.
    ///
    /// With no explicit id the deterministic guest id is derived from the
    /// name, so calling twice with the same name returns the same record
    /// rather than creating a second one.
    pub async fn get_or_create_player(
        &self,
        id: Option<PlayerId>,
        name: &str,
    ) -> SyncResult<Player> {
        let id = id.unwrap_or_else(|| PlayerId::guest_from_name(name));

        if let Some(existing) = self.local.get_player(&id)? {
            return Ok(existing);
        }

        let player = Player::new(id, name);
        self.local.upsert_player(&player)?;
        debug!(player_id = %player.id, "created local profile");

        // Best-effort remote mirror; the AI sentinel never goes remote
        if !player.id.is_ai() && self.network.is_online() {
            let doc = codec::player_to_document(&player);
            match self
                .remote
                .create_with_id(PLAYERS_COLLECTION, player.id.as_str(), &doc)
                .await
            {
                Ok(CreateOutcome::Created) => {
                    debug!(player_id = %player.id, "remote profile created");
                }
                Ok(CreateOutcome::AlreadyExists) => {
                    debug!(player_id = %player.id, "remote profile already exists");
                }
                Err(e) => {
                    warn!(player_id = %player.id, error = %e, "remote profile create failed");
                }
            }
        }
        Ok(player)
    }

    /// Record a match result against a profile. The local counter always
    /// moves; only wins for non-AI players online trigger a remote write,
    /// and that write is a server-side atomic increment.
    pub async fn record_result(&self, id: &PlayerId, won: bool) -> SyncResult<RemoteWrite> {
        if !won {
            // Losses are a local-only stat and never reconcile
            self.local.increment_loss(id)?;
            return Ok(RemoteWrite::Deferred);
        }

        self.local.increment_win(id)?;

        if id.is_ai() || !self.network.is_online() {
            return Ok(RemoteWrite::Deferred);
        }

        match self
            .remote
            .transform_increment(PLAYERS_COLLECTION, id.as_str(), FIELD_WIN_COUNT, 1)
            .await
        {
            Ok(()) => {
                debug!(player_id = %id, "remote win count incremented");
                Ok(RemoteWrite::Confirmed)
            }
            Err(e) => {
                warn!(player_id = %id, error = %e, "remote win increment failed");
                Ok(RemoteWrite::Failed)
            }
        }
    }

    pub async fn record_win(&self, id: &PlayerId) -> SyncResult<RemoteWrite> {
        self.record_result(id, true).await
    }

    pub async fn record_loss(&self, id: &PlayerId) -> SyncResult<RemoteWrite> {
        self.record_result(id, false).await
    }

    /// Rename a profile, creating the row if needed. The remote patch is
    /// masked to the name and update timestamp so it cannot clobber the
    /// remotely-maintained win count.
    pub async fn update_display_name(
        &self,
        id: &PlayerId,
        name: &str,
    ) -> SyncResult<RemoteWrite> {
        let mut player = match self.local.get_player(id)? {
            Some(player) => player,
            None => Player::new(id.clone(), name),
        };
        player.name = name.to_string();
        player.updated_at = now_millis();
        self.local.upsert_player(&player)?;

        if id.is_ai() || !self.network.is_online() {
            return Ok(RemoteWrite::Deferred);
        }

        let doc = codec::player_to_document(&player);
        match self
            .remote
            .patch(
                PLAYERS_COLLECTION,
                id.as_str(),
                &doc,
                &[FIELD_NAME, FIELD_UPDATED_AT],
            )
            .await
        {
            Ok(()) => Ok(RemoteWrite::Confirmed),
            Err(e) => {
                warn!(player_id = %id, error = %e, "remote rename failed");
                Ok(RemoteWrite::Failed)
            }
        }
    }

    pub fn get_player(&self, id: &PlayerId) -> SyncResult<Option<Player>> {
        Ok(self.local.get_player(id)?)
    }
}
