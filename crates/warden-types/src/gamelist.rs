//! Game-list side file written by the network-discovery binary.

use std::net::IpAddr;

use serde::{Deserialize, Serialize};

use crate::Timestamp;

/// One advertised game.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameDescriptor {
    /// Game name as advertised.
    pub id: String,
    /// Four-letter game type code (e.g. "DRTL", "HRTL").
    #[serde(rename = "type", default)]
    pub game_type: String,
    /// Game version string.
    #[serde(default)]
    pub version: String,
    /// Game ticks per second.
    #[serde(default = "default_tick_rate")]
    pub tick_rate: u32,
    /// 0 = Normal, 1 = Nightmare, 2 = Hell.
    #[serde(default)]
    pub difficulty: u8,
    #[serde(default)]
    pub run_in_town: bool,
    #[serde(default)]
    pub full_quests: bool,
    #[serde(default)]
    pub theo_quest: bool,
    #[serde(default)]
    pub cow_quest: bool,
    #[serde(default)]
    pub friendly_fire: bool,
    /// Player names.
    #[serde(default)]
    pub players: Vec<String>,
    /// When the game was last advertised.
    #[serde(default)]
    pub timestamp: Timestamp,
    /// When the game stopped being advertised.
    #[serde(default)]
    pub ended: Option<Timestamp>,
    #[serde(default)]
    pub first_seen: Option<Timestamp>,
    /// Network address of the host, when the discovery binary reports it.
    #[serde(default)]
    pub address: Option<String>,
}

fn default_tick_rate() -> u32 {
    20
}

/// Accepted top-level shapes of the side file.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum GameListDocument {
    /// `{"games": [...]}`
    Wrapped {
        #[serde(default)]
        games: Vec<GameDescriptor>,
    },
    /// `[...]`
    Bare(Vec<GameDescriptor>),
}

impl GameListDocument {
    /// Consume the document, yielding its games.
    pub fn into_games(self) -> Vec<GameDescriptor> {
        match self {
            Self::Wrapped { games } | Self::Bare(games) => games,
        }
    }
}

impl GameDescriptor {
    /// Host address, if present and parseable.
    pub fn host_address(&self) -> Option<IpAddr> {
        self.address.as_deref()?.trim().parse().ok()
    }

    /// Whether the game has stopped being advertised.
    pub fn has_ended(&self) -> bool {
        self.ended.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GAME: &str = r#"{
        "id": "testgame",
        "type": "DRTL",
        "version": "1.5.0",
        "tick_rate": 20,
        "difficulty": 0,
        "run_in_town": false,
        "full_quests": false,
        "theo_quest": false,
        "cow_quest": false,
        "friendly_fire": false,
        "players": ["Player1"],
        "timestamp": 1700000000
    }"#;

    #[test]
    fn test_parse_wrapped_document() {
        let doc: GameListDocument =
            serde_json::from_str(&format!(r#"{{"games": [{GAME}]}}"#)).expect("parse");
        let games = doc.into_games();
        assert_eq!(games.len(), 1);
        assert_eq!(games[0].id, "testgame");
        assert_eq!(games[0].game_type, "DRTL");
        assert_eq!(games[0].players, vec!["Player1".to_string()]);
        assert!(!games[0].has_ended());
    }

    #[test]
    fn test_parse_bare_document() {
        let doc: GameListDocument = serde_json::from_str(&format!("[{GAME}]")).expect("parse");
        assert_eq!(doc.into_games().len(), 1);
    }

    #[test]
    fn test_parse_empty_wrapped_document() {
        let doc: GameListDocument = serde_json::from_str("{}").expect("parse");
        assert!(doc.into_games().is_empty());
    }

    #[test]
    fn test_optional_fields() {
        let game: GameDescriptor = serde_json::from_str(
            r#"{"id": "g", "players": ["A"], "ended": 1700003600,
                "first_seen": 1700000000, "address": "fd00::abcd:1234:5678"}"#,
        )
        .expect("parse");
        assert!(game.has_ended());
        assert_eq!(game.tick_rate, 20);
        assert_eq!(game.first_seen, Some(1_700_000_000));
        assert_eq!(
            game.host_address(),
            Some("fd00::abcd:1234:5678".parse().expect("ip"))
        );
    }
}
