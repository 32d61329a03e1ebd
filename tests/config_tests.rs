use std::time::Duration;

use battleship_arena::{parse_level, ServerConfig, SessionSettings};
use log::LevelFilter;

#[test]
fn test_defaults() {
    let config = ServerConfig::default();
    assert_eq!(config.tcp_bind, "0.0.0.0:12351");
    assert_eq!(config.ws_bind, "0.0.0.0:12352");
    assert_eq!(config.min_players, 2);
    assert_eq!(config.max_players, 7);
    assert_eq!(config.lobby_countdown_secs, 20);
    assert!(config.validate().is_ok());

    let settings = SessionSettings::default();
    assert_eq!(settings.lobby_countdown, Duration::from_secs(20));
    assert_eq!(settings.max_players, 7);
}

#[test]
fn test_json_overrides_only_given_keys() -> anyhow::Result<()> {
    let config = ServerConfig::from_json_str(r#"{ "max_players": 4, "lobby_countdown_secs": 5 }"#)?;
    assert_eq!(config.max_players, 4);
    assert_eq!(config.lobby_countdown_secs, 5);
    assert_eq!(config.min_players, 2);
    assert_eq!(config.tcp_bind, "0.0.0.0:12351");
    assert_eq!(
        config.session_settings().lobby_countdown,
        Duration::from_secs(5)
    );
    Ok(())
}

#[test]
fn test_json_file_round_trip() -> anyhow::Result<()> {
    let path = std::env::temp_dir().join(format!("arena-config-{}.json", std::process::id()));
    std::fs::write(&path, r#"{ "tcp_bind": "127.0.0.1:4000", "spectator_slots": 0 }"#)?;
    let config = ServerConfig::from_json_file(&path)?;
    std::fs::remove_file(&path)?;
    assert_eq!(config.tcp_bind, "127.0.0.1:4000");
    assert_eq!(config.spectator_slots, 0);
    Ok(())
}

#[test]
fn test_bad_json_and_missing_file_fail() {
    assert!(ServerConfig::from_json_str("{ max_players: 4 }").is_err());
    assert!(ServerConfig::from_json_str(r#"{ "max_players": "many" }"#).is_err());
    let missing = std::env::temp_dir().join("arena-config-does-not-exist.json");
    let err = ServerConfig::from_json_file(&missing).unwrap_err();
    assert!(format!("{:#}", err).contains("reading config file"));
}

#[test]
fn test_validation() {
    let mut config = ServerConfig::default();
    config.min_players = 1;
    assert!(config.validate().is_err());

    let mut config = ServerConfig::default();
    config.max_players = 1;
    assert!(config.validate().is_err());

    let mut config = ServerConfig::default();
    config.max_frame_len = 0;
    assert!(config.validate().is_err());

    let mut config = ServerConfig::default();
    config.min_players = 3;
    config.max_players = 3;
    assert!(config.validate().is_ok());
}

#[test]
fn test_log_level_parsing() {
    assert_eq!(parse_level(None), LevelFilter::Info);
    assert_eq!(parse_level(Some("debug")), LevelFilter::Debug);
    assert_eq!(parse_level(Some(" WARN ")), LevelFilter::Warn);
    assert_eq!(parse_level(Some("loud")), LevelFilter::Info);
}
