//! Game constants and server configuration.

use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use serde::Deserialize;

use crate::ship::ShipType;

pub const GRID_SIZE: usize = 10;
pub const NUM_SHIPS: usize = 5;
pub const SHIPS: [ShipType; NUM_SHIPS] = ShipType::ALL;

/// Total number of ship segments used in the standard configuration.
pub const TOTAL_SHIP_CELLS: usize = fleet_cells(&SHIPS);

const fn fleet_cells(fleet: &[ShipType]) -> usize {
    let mut total = 0;
    let mut i = 0;
    while i < fleet.len() {
        total += fleet[i].length();
        i += 1;
    }
    total
}

/// Longest accepted display name, in characters.
pub const MAX_NAME_LEN: usize = 15;

pub const DEFAULT_TCP_BIND: &str = "0.0.0.0:12351";
pub const DEFAULT_WS_BIND: &str = "0.0.0.0:12352";
pub const DEFAULT_MIN_PLAYERS: usize = 2;
pub const DEFAULT_MAX_PLAYERS: usize = 7;
pub const DEFAULT_LOBBY_COUNTDOWN_SECS: u64 = 20;
pub const DEFAULT_SPECTATOR_SLOTS: usize = 8;
pub const DEFAULT_MAX_FRAME_LEN: usize = 4096;

/// Server settings. Every field falls back to its default when absent from
/// a config file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Listen address of the newline-delimited stream transport.
    pub tcp_bind: String,
    /// Listen address of the WebSocket transport.
    pub ws_bind: String,
    pub min_players: usize,
    pub max_players: usize,
    pub lobby_countdown_secs: u64,
    /// Extra connections admitted as spectators while a game runs.
    pub spectator_slots: usize,
    /// Longest stream-transport line accepted, in bytes.
    pub max_frame_len: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            tcp_bind: DEFAULT_TCP_BIND.to_string(),
            ws_bind: DEFAULT_WS_BIND.to_string(),
            min_players: DEFAULT_MIN_PLAYERS,
            max_players: DEFAULT_MAX_PLAYERS,
            lobby_countdown_secs: DEFAULT_LOBBY_COUNTDOWN_SECS,
            spectator_slots: DEFAULT_SPECTATOR_SLOTS,
            max_frame_len: DEFAULT_MAX_FRAME_LEN,
        }
    }
}

impl ServerConfig {
    /// Read a JSON config file. Missing keys keep their defaults.
    pub fn from_json_file(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        Self::from_json_str(&raw).with_context(|| format!("parsing config file {}", path.display()))
    }

    pub fn from_json_str(raw: &str) -> anyhow::Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Reject settings the lobby cannot work with.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.min_players < 2 {
            anyhow::bail!("min_players must be at least 2 (got {})", self.min_players);
        }
        if self.max_players < self.min_players {
            anyhow::bail!(
                "max_players ({}) must not be below min_players ({})",
                self.max_players,
                self.min_players
            );
        }
        if self.max_frame_len == 0 {
            anyhow::bail!("max_frame_len must be positive");
        }
        Ok(())
    }

    /// The lobby-related subset handed to the coordinator.
    pub fn session_settings(&self) -> SessionSettings {
        SessionSettings {
            min_players: self.min_players,
            max_players: self.max_players,
            lobby_countdown: Duration::from_secs(self.lobby_countdown_secs),
            spectator_slots: self.spectator_slots,
        }
    }
}

/// Limits the coordinator enforces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSettings {
    /// Named lobby players needed to arm the countdown or admin-start.
    pub min_players: usize,
    /// Lobby capacity; reaching it with named players starts the game at once.
    pub max_players: usize,
    pub lobby_countdown: Duration,
    pub spectator_slots: usize,
}

impl Default for SessionSettings {
    fn default() -> Self {
        ServerConfig::default().session_settings()
    }
}
