//! Text wire protocol shared by both transports.
//!
//! Every frame is `COMMAND` or `COMMAND:payload`, payload fields separated by
//! colons. The stream transport delimits frames with newlines, the WebSocket
//! transport sends one frame per message.

use core::fmt;
use core::str::FromStr;

use crate::common::ShotResult;
use crate::ship::{Orientation, ShipType};

/// Commands a client may send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientCommand {
    SetName(String),
    PlaceShip {
        ship_type: ShipType,
        row: usize,
        col: usize,
        orientation: Orientation,
    },
    FireShot {
        target: usize,
        row: usize,
        col: usize,
    },
    AdminStartGame,
    QuitGame,
    Chat(String),
}

/// Reasons a frame could not be decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    EmptyFrame,
    UnknownCommand(String),
    FieldCount {
        command: &'static str,
        expected: usize,
        got: usize,
    },
    BadInteger {
        field: &'static str,
        value: String,
    },
    BadBoolean(String),
    UnknownShip(String),
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProtocolError::EmptyFrame => write!(f, "Empty command"),
            ProtocolError::UnknownCommand(c) => write!(f, "Unknown command '{}'", c),
            ProtocolError::FieldCount {
                command,
                expected,
                got,
            } => write!(
                f,
                "Malformed {} command: expected {} fields, got {}",
                command, expected, got
            ),
            ProtocolError::BadInteger { field, value } => {
                write!(f, "Invalid {} '{}'", field, value)
            }
            ProtocolError::BadBoolean(v) => write!(f, "Invalid orientation flag '{}'", v),
            ProtocolError::UnknownShip(v) => write!(f, "Unknown ship type '{}'", v),
        }
    }
}

impl std::error::Error for ProtocolError {}

fn fields<'a>(
    command: &'static str,
    payload: &'a str,
    expected: usize,
) -> Result<Vec<&'a str>, ProtocolError> {
    let parts: Vec<&str> = if payload.is_empty() {
        Vec::new()
    } else {
        payload.split(':').map(str::trim).collect()
    };
    if parts.len() != expected {
        return Err(ProtocolError::FieldCount {
            command,
            expected,
            got: parts.len(),
        });
    }
    Ok(parts)
}

fn integer(field: &'static str, value: &str) -> Result<usize, ProtocolError> {
    value.parse().map_err(|_| ProtocolError::BadInteger {
        field,
        value: value.to_string(),
    })
}

fn boolean(value: &str) -> Result<bool, ProtocolError> {
    if value.eq_ignore_ascii_case("true") {
        Ok(true)
    } else if value.eq_ignore_ascii_case("false") {
        Ok(false)
    } else {
        Err(ProtocolError::BadBoolean(value.to_string()))
    }
}

impl ClientCommand {
    /// Decode one frame. The command word is case-insensitive.
    pub fn parse(frame: &str) -> Result<Self, ProtocolError> {
        let frame = frame.trim_end_matches(['\r', '\n']);
        if frame.trim().is_empty() {
            return Err(ProtocolError::EmptyFrame);
        }
        let (word, payload) = match frame.split_once(':') {
            Some((w, p)) => (w.trim(), p),
            None => (frame.trim(), ""),
        };

        match word.to_ascii_uppercase().as_str() {
            "SET_NAME" => Ok(ClientCommand::SetName(payload.to_string())),
            "PLACE_SHIP" => {
                let f = fields("PLACE_SHIP", payload, 4)?;
                let ship_type =
                    ShipType::from_wire(f[0]).ok_or_else(|| ProtocolError::UnknownShip(f[0].to_string()))?;
                Ok(ClientCommand::PlaceShip {
                    ship_type,
                    row: integer("row", f[1])?,
                    col: integer("column", f[2])?,
                    orientation: Orientation::from_horizontal(boolean(f[3])?),
                })
            }
            "FIRE_SHOT" => {
                let f = fields("FIRE_SHOT", payload, 3)?;
                Ok(ClientCommand::FireShot {
                    target: integer("target index", f[0])?,
                    row: integer("row", f[1])?,
                    col: integer("column", f[2])?,
                })
            }
            "ADMIN_START_GAME" => Ok(ClientCommand::AdminStartGame),
            "QUIT_GAME" => Ok(ClientCommand::QuitGame),
            "CHAT_MSG" => Ok(ClientCommand::Chat(payload.to_string())),
            _ => Err(ProtocolError::UnknownCommand(word.to_string())),
        }
    }
}

impl FromStr for ClientCommand {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ClientCommand::parse(s)
    }
}

/// Messages the server sends. `Display` renders the wire frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerMessage {
    ReqName,
    LobbyState {
        named: usize,
        min: usize,
        max: usize,
        names: Vec<String>,
    },
    LobbyCountdownStarted {
        seconds: u64,
    },
    LobbyCountdownCancelled,
    LobbyTimerEndedNoGame {
        reason: String,
    },
    GameStart {
        grid_size: usize,
        your_index: usize,
        names: Vec<String>,
    },
    SpectateMode,
    SpectateInfo {
        grid_size: usize,
        names: Vec<String>,
    },
    YourTurnPlaceShip(ShipType),
    WaitPlacement {
        who: String,
        ship_type: ShipType,
    },
    PlacementAccepted {
        ship_type: ShipType,
        row: usize,
        col: usize,
        orientation: Orientation,
    },
    PlacementRejected(ShipType),
    PlayerPlacedShip {
        who: String,
        ship_type: ShipType,
    },
    AllShipsPlaced,
    YourTurnFire,
    OpponentTurnFire {
        who: String,
    },
    ShotResult {
        shooter: usize,
        target: usize,
        row: usize,
        col: usize,
        result: ShotResult,
    },
    GameOver {
        winner: String,
        index: usize,
    },
    GameOverDraw,
    GameOverDisconnect {
        who: String,
    },
    PlayerLeft {
        who: String,
        index: usize,
    },
    NewChatMsg {
        sender: String,
        text: String,
    },
    Error(String),
}

impl fmt::Display for ServerMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServerMessage::ReqName => write!(f, "REQ_NAME"),
            ServerMessage::LobbyState {
                named,
                min,
                max,
                names,
            } => write!(f, "LOBBY_STATE:{}:{}:{}:{}", named, min, max, names.join(",")),
            ServerMessage::LobbyCountdownStarted { seconds } => {
                write!(f, "LOBBY_COUNTDOWN_STARTED:{}", seconds)
            }
            ServerMessage::LobbyCountdownCancelled => write!(f, "LOBBY_COUNTDOWN_CANCELLED"),
            ServerMessage::LobbyTimerEndedNoGame { reason } => {
                write!(f, "LOBBY_TIMER_ENDED_NO_GAME:{}", reason)
            }
            ServerMessage::GameStart {
                grid_size,
                your_index,
                names,
            } => write!(
                f,
                "GAME_START:{}:{}:{}:{}",
                grid_size,
                your_index,
                names.len(),
                names.join(",")
            ),
            ServerMessage::SpectateMode => write!(f, "SPECTATE_MODE"),
            ServerMessage::SpectateInfo { grid_size, names } => write!(
                f,
                "SPECTATE_INFO:{}:{}:{}",
                grid_size,
                names.len(),
                names.join(",")
            ),
            ServerMessage::YourTurnPlaceShip(t) => write!(
                f,
                "YOUR_TURN_PLACE_SHIP:{}:{}:{}",
                t.wire_name(),
                t.length(),
                t.name()
            ),
            ServerMessage::WaitPlacement { who, ship_type } => {
                write!(f, "WAIT_PLACEMENT:{}:{}", who, ship_type.name())
            }
            ServerMessage::PlacementAccepted {
                ship_type,
                row,
                col,
                orientation,
            } => write!(
                f,
                "PLACEMENT_ACCEPTED:{}:{}:{}:{}",
                ship_type.wire_name(),
                row,
                col,
                orientation.is_horizontal()
            ),
            ServerMessage::PlacementRejected(t) => {
                write!(f, "PLACEMENT_REJECTED:{}", t.wire_name())
            }
            ServerMessage::PlayerPlacedShip { who, ship_type } => {
                write!(f, "PLAYER_PLACED_SHIP:{}:{}", who, ship_type.name())
            }
            ServerMessage::AllShipsPlaced => write!(f, "ALL_SHIPS_PLACED"),
            ServerMessage::YourTurnFire => write!(f, "YOUR_TURN_FIRE"),
            ServerMessage::OpponentTurnFire { who } => write!(f, "OPPONENT_TURN_FIRE:{}", who),
            ServerMessage::ShotResult {
                shooter,
                target,
                row,
                col,
                result,
            } => {
                write!(
                    f,
                    "SHOT_RESULT:{}:{}:{}:{}:{}",
                    shooter,
                    target,
                    row,
                    col,
                    result.wire_name()
                )?;
                if let ShotResult::Sunk(t) = result {
                    write!(f, ":{}", t.name())?;
                }
                Ok(())
            }
            ServerMessage::GameOver { winner, index } => {
                write!(f, "GAME_OVER:{}:{}", winner, index)
            }
            ServerMessage::GameOverDraw => write!(f, "GAME_OVER_DRAW"),
            ServerMessage::GameOverDisconnect { who } => write!(f, "GAME_OVER_DISCONNECT:{}", who),
            ServerMessage::PlayerLeft { who, index } => {
                write!(f, "PLAYER_LEFT:{}:{}", who, index)
            }
            ServerMessage::NewChatMsg { sender, text } => {
                write!(f, "NEW_CHAT_MSG:{}:{}", sender, text)
            }
            ServerMessage::Error(message) => write!(f, "ERROR:{}", message),
        }
    }
}
