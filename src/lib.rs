pub mod board;
pub mod bot;
pub mod broadcast;
pub mod common;
pub mod config;
pub mod connection;
pub mod game;
mod logging;
pub mod protocol;
pub mod server;
pub mod session;
pub mod ship;
pub mod transport;

pub use board::*;
pub use bot::{run_bot, Bot, GameOutcome};
pub use broadcast::Broadcaster;
pub use common::*;
pub use config::*;
pub use connection::*;
pub use game::*;
pub use logging::{init_logging, parse_level};
pub use protocol::*;
pub use server::Server;
pub use session::{MemberView, SessionCoordinator, SessionSnapshot};
pub use ship::*;
pub use transport::in_memory::InMemoryConnection;
pub use transport::{drive, FrameReader};
