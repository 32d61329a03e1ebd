use battleship_arena::{
    ClientCommand, Orientation, ProtocolError, ServerMessage, ShipType, ShotResult,
};

#[test]
fn test_parse_set_name_keeps_payload() {
    assert_eq!(
        ClientCommand::parse("SET_NAME:Alice").unwrap(),
        ClientCommand::SetName("Alice".into())
    );
    assert_eq!(
        ClientCommand::parse("set_name:  Bob \r\n").unwrap(),
        ClientCommand::SetName("  Bob ".into())
    );
}

#[test]
fn test_parse_place_ship() {
    assert_eq!(
        ClientCommand::parse("PLACE_SHIP:CARRIER:0:3:true").unwrap(),
        ClientCommand::PlaceShip {
            ship_type: ShipType::Carrier,
            row: 0,
            col: 3,
            orientation: Orientation::Horizontal,
        }
    );
    assert_eq!(
        ClientCommand::parse("PLACE_SHIP:destroyer:4:4:FALSE").unwrap(),
        ClientCommand::PlaceShip {
            ship_type: ShipType::Destroyer,
            row: 4,
            col: 4,
            orientation: Orientation::Vertical,
        }
    );
}

#[test]
fn test_parse_place_ship_errors() {
    assert_eq!(
        ClientCommand::parse("PLACE_SHIP:FRIGATE:0:0:true").unwrap_err(),
        ProtocolError::UnknownShip("FRIGATE".into())
    );
    assert!(matches!(
        ClientCommand::parse("PLACE_SHIP:CARRIER:0:0").unwrap_err(),
        ProtocolError::FieldCount { expected: 4, got: 3, .. }
    ));
    assert!(matches!(
        ClientCommand::parse("PLACE_SHIP:CARRIER:-1:0:true").unwrap_err(),
        ProtocolError::BadInteger { field: "row", .. }
    ));
    assert_eq!(
        ClientCommand::parse("PLACE_SHIP:CARRIER:0:0:yes").unwrap_err(),
        ProtocolError::BadBoolean("yes".into())
    );
}

#[test]
fn test_parse_fire_shot() {
    assert_eq!(
        ClientCommand::parse("FIRE_SHOT:2:5:9").unwrap(),
        ClientCommand::FireShot {
            target: 2,
            row: 5,
            col: 9
        }
    );
    assert!(matches!(
        ClientCommand::parse("FIRE_SHOT:x:5:9").unwrap_err(),
        ProtocolError::BadInteger { .. }
    ));
    assert!(matches!(
        ClientCommand::parse("FIRE_SHOT").unwrap_err(),
        ProtocolError::FieldCount { expected: 3, got: 0, .. }
    ));
}

#[test]
fn test_parse_bare_commands_and_chat() {
    assert_eq!(
        ClientCommand::parse("ADMIN_START_GAME").unwrap(),
        ClientCommand::AdminStartGame
    );
    assert_eq!(
        ClientCommand::parse("quit_game").unwrap(),
        ClientCommand::QuitGame
    );
    assert_eq!(
        ClientCommand::parse("CHAT_MSG:see you at 10:30").unwrap(),
        ClientCommand::Chat("see you at 10:30".into())
    );
    let parsed: ClientCommand = "CHAT_MSG:hi".parse().unwrap();
    assert_eq!(parsed, ClientCommand::Chat("hi".into()));
}

#[test]
fn test_parse_rejects_unknown_and_empty() {
    assert_eq!(
        ClientCommand::parse("DANCE:now").unwrap_err(),
        ProtocolError::UnknownCommand("DANCE".into())
    );
    assert_eq!(
        ClientCommand::parse("   ").unwrap_err(),
        ProtocolError::EmptyFrame
    );
    assert_eq!(
        ProtocolError::UnknownCommand("DANCE".into()).to_string(),
        "Unknown command 'DANCE'"
    );
}

#[test]
fn test_render_lobby_and_start_frames() {
    let names = vec!["Alice".to_string(), "Bob".to_string()];
    assert_eq!(ServerMessage::ReqName.to_string(), "REQ_NAME");
    assert_eq!(
        ServerMessage::LobbyState {
            named: 2,
            min: 2,
            max: 7,
            names: names.clone()
        }
        .to_string(),
        "LOBBY_STATE:2:2:7:Alice,Bob"
    );
    assert_eq!(
        ServerMessage::LobbyState {
            named: 0,
            min: 2,
            max: 7,
            names: Vec::new()
        }
        .to_string(),
        "LOBBY_STATE:0:2:7:"
    );
    assert_eq!(
        ServerMessage::LobbyCountdownStarted { seconds: 20 }.to_string(),
        "LOBBY_COUNTDOWN_STARTED:20"
    );
    assert_eq!(
        ServerMessage::GameStart {
            grid_size: 10,
            your_index: 1,
            names: names.clone()
        }
        .to_string(),
        "GAME_START:10:1:2:Alice,Bob"
    );
    assert_eq!(
        ServerMessage::SpectateInfo {
            grid_size: 10,
            names
        }
        .to_string(),
        "SPECTATE_INFO:10:2:Alice,Bob"
    );
}

#[test]
fn test_render_placement_frames() {
    assert_eq!(
        ServerMessage::YourTurnPlaceShip(ShipType::Submarine).to_string(),
        "YOUR_TURN_PLACE_SHIP:SUBMARINE:3:Submarine"
    );
    assert_eq!(
        ServerMessage::WaitPlacement {
            who: "Alice".into(),
            ship_type: ShipType::Carrier
        }
        .to_string(),
        "WAIT_PLACEMENT:Alice:Carrier"
    );
    assert_eq!(
        ServerMessage::PlacementAccepted {
            ship_type: ShipType::Cruiser,
            row: 2,
            col: 3,
            orientation: Orientation::Vertical
        }
        .to_string(),
        "PLACEMENT_ACCEPTED:CRUISER:2:3:false"
    );
    assert_eq!(
        ServerMessage::PlacementRejected(ShipType::Cruiser).to_string(),
        "PLACEMENT_REJECTED:CRUISER"
    );
}

#[test]
fn test_render_combat_frames() {
    assert_eq!(
        ServerMessage::ShotResult {
            shooter: 0,
            target: 1,
            row: 4,
            col: 1,
            result: ShotResult::Sunk(ShipType::Destroyer)
        }
        .to_string(),
        "SHOT_RESULT:0:1:4:1:SUNK:Destroyer"
    );
    assert_eq!(
        ServerMessage::ShotResult {
            shooter: 1,
            target: 0,
            row: 9,
            col: 9,
            result: ShotResult::AlreadyShot
        }
        .to_string(),
        "SHOT_RESULT:1:0:9:9:ALREADY_SHOT"
    );
    assert_eq!(
        ServerMessage::GameOver {
            winner: "Alice".into(),
            index: 0
        }
        .to_string(),
        "GAME_OVER:Alice:0"
    );
    assert_eq!(
        ServerMessage::PlayerLeft {
            who: "Bob".into(),
            index: 1
        }
        .to_string(),
        "PLAYER_LEFT:Bob:1"
    );
    assert_eq!(
        ServerMessage::Error("Not your turn".into()).to_string(),
        "ERROR:Not your turn"
    );
}
