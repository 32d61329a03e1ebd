//! Automated player for the stream transport: random legal placements and
//! random shots at random opponents.

use std::collections::HashSet;

use log::{debug, info, warn};
use rand::rngs::SmallRng;
use rand::seq::IndexedRandom;
use rand::{Rng, SeedableRng};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;

use crate::board::ShipBoard;
use crate::config::{GRID_SIZE, MAX_NAME_LEN, NUM_SHIPS};
use crate::ship::{Orientation, ShipType};

/// How a finished game ended, as seen by the bot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GameOutcome {
    Winner { name: String, index: usize },
    Draw,
}

struct Opponent {
    shot: HashSet<(usize, usize)>,
    sunk: usize,
    out: bool,
}

/// Protocol state of one automated player. Feed it server frames with
/// [`Bot::handle`] and send back what it returns.
pub struct Bot<R: Rng> {
    name: String,
    admin: bool,
    rng: R,
    name_attempts: usize,
    start_sent: bool,
    my_name: Option<String>,
    my_index: Option<usize>,
    grid_size: usize,
    fleet: ShipBoard,
    pending: Option<(ShipType, usize, usize, Orientation)>,
    opponents: Vec<Opponent>,
    outcome: Option<GameOutcome>,
}

impl<R: Rng> Bot<R> {
    /// `admin` makes the bot send `ADMIN_START_GAME` once it is the lobby
    /// host and enough players are named.
    pub fn new(name: &str, admin: bool, rng: R) -> Self {
        Bot {
            name: name.trim().to_string(),
            admin,
            rng,
            name_attempts: 0,
            start_sent: false,
            my_name: None,
            my_index: None,
            grid_size: GRID_SIZE,
            fleet: ShipBoard::new(),
            pending: None,
            opponents: Vec::new(),
            outcome: None,
        }
    }

    /// Seat index in the running game.
    pub fn index(&self) -> Option<usize> {
        self.my_index
    }

    /// Our own fleet as placed so far.
    pub fn fleet(&self) -> &ShipBoard {
        &self.fleet
    }

    pub fn outcome(&self) -> Option<&GameOutcome> {
        self.outcome.as_ref()
    }

    fn next_name(&mut self) -> String {
        self.name_attempts += 1;
        let name = if self.name_attempts == 1 {
            self.name.clone()
        } else {
            let suffix = self.name_attempts.to_string();
            let keep = MAX_NAME_LEN.saturating_sub(suffix.len());
            let base: String = self.name.chars().take(keep).collect();
            format!("{}{}", base, suffix)
        };
        self.my_name = Some(name.clone());
        name
    }

    /// React to one server frame. Returns the frames to send back.
    pub fn handle(&mut self, frame: &str) -> Vec<String> {
        let mut parts = frame.trim_end().split(':');
        let word = parts.next().unwrap_or_default();
        let fields: Vec<&str> = parts.collect();

        match word {
            "REQ_NAME" => vec![format!("SET_NAME:{}", self.next_name())],
            "LOBBY_STATE" => self.on_lobby_state(&fields),
            "GAME_START" => {
                self.on_game_start(&fields);
                Vec::new()
            }
            "YOUR_TURN_PLACE_SHIP" => self.on_place_prompt(&fields),
            "PLACEMENT_ACCEPTED" => {
                if let Some((ship_type, row, col, orientation)) = self.pending.take() {
                    if let Err(e) = self.fleet.place_ship(ship_type, row, col, orientation) {
                        warn!("Local fleet disagrees with server: {}", e);
                    }
                }
                Vec::new()
            }
            "PLACEMENT_REJECTED" => {
                self.pending = None;
                Vec::new()
            }
            "YOUR_TURN_FIRE" => self.on_fire_prompt(),
            "SHOT_RESULT" => {
                self.on_shot_result(&fields);
                Vec::new()
            }
            "PLAYER_LEFT" => {
                if let Some(opponent) = fields
                    .get(1)
                    .and_then(|i| i.parse::<usize>().ok())
                    .and_then(|i| self.opponents.get_mut(i))
                {
                    opponent.out = true;
                }
                Vec::new()
            }
            "GAME_OVER" => {
                let index = fields.get(1).and_then(|i| i.parse().ok()).unwrap_or(0);
                self.outcome = Some(GameOutcome::Winner {
                    name: fields.first().unwrap_or(&"").to_string(),
                    index,
                });
                Vec::new()
            }
            "GAME_OVER_DRAW" => {
                self.outcome = Some(GameOutcome::Draw);
                Vec::new()
            }
            "ERROR" => {
                warn!("Server error: {}", fields.join(":"));
                Vec::new()
            }
            _ => {
                debug!("Ignoring {}", frame);
                Vec::new()
            }
        }
    }

    fn on_lobby_state(&mut self, fields: &[&str]) -> Vec<String> {
        if !self.admin || self.start_sent {
            return Vec::new();
        }
        let named: usize = fields.first().and_then(|n| n.parse().ok()).unwrap_or(0);
        let min: usize = fields.get(1).and_then(|n| n.parse().ok()).unwrap_or(usize::MAX);
        let host = fields.get(3).and_then(|names| names.split(',').next());
        if named >= min && host.is_some() && host == self.my_name.as_deref() {
            self.start_sent = true;
            return vec!["ADMIN_START_GAME".to_string()];
        }
        Vec::new()
    }

    fn on_game_start(&mut self, fields: &[&str]) {
        self.grid_size = fields.first().and_then(|n| n.parse().ok()).unwrap_or(GRID_SIZE);
        self.my_index = fields.get(1).and_then(|n| n.parse().ok());
        let count: usize = fields.get(2).and_then(|n| n.parse().ok()).unwrap_or(0);
        self.fleet = ShipBoard::with_size(self.grid_size);
        self.pending = None;
        self.opponents = (0..count)
            .map(|i| Opponent {
                shot: HashSet::new(),
                sunk: 0,
                out: Some(i) == self.my_index,
            })
            .collect();
        info!(
            "Game started as seat {:?} of {} on a {}x{} grid",
            self.my_index, count, self.grid_size, self.grid_size
        );
    }

    fn on_place_prompt(&mut self, fields: &[&str]) -> Vec<String> {
        let Some(ship_type) = fields.first().and_then(|w| ShipType::from_wire(w)) else {
            warn!("Unknown ship in placement prompt: {:?}", fields);
            return Vec::new();
        };
        let Some((row, col, orientation)) = self.fleet.random_placement(&mut self.rng, ship_type)
        else {
            warn!("No room left for {}", ship_type);
            return Vec::new();
        };
        self.pending = Some((ship_type, row, col, orientation));
        vec![format!(
            "PLACE_SHIP:{}:{}:{}:{}",
            ship_type.wire_name(),
            row,
            col,
            orientation.is_horizontal()
        )]
    }

    fn on_fire_prompt(&mut self) -> Vec<String> {
        let cells = self.grid_size * self.grid_size;
        let targets: Vec<usize> = self
            .opponents
            .iter()
            .enumerate()
            .filter(|(_, o)| !o.out && o.shot.len() < cells)
            .map(|(i, _)| i)
            .collect();
        let Some(&target) = targets.choose(&mut self.rng) else {
            warn!("Nobody left to shoot at");
            return Vec::new();
        };

        let size = self.grid_size;
        let opponent = &mut self.opponents[target];
        let open: Vec<(usize, usize)> = (0..size)
            .flat_map(|r| (0..size).map(move |c| (r, c)))
            .filter(|cell| !opponent.shot.contains(cell))
            .collect();
        let Some(&(row, col)) = open.choose(&mut self.rng) else {
            return Vec::new();
        };
        opponent.shot.insert((row, col));
        vec![format!("FIRE_SHOT:{}:{}:{}", target, row, col)]
    }

    fn on_shot_result(&mut self, fields: &[&str]) {
        let parsed: Vec<usize> = fields
            .iter()
            .take(4)
            .filter_map(|f| f.parse().ok())
            .collect();
        let &[_, target, row, col] = parsed.as_slice() else {
            return;
        };
        let Some(opponent) = self.opponents.get_mut(target) else {
            return;
        };
        opponent.shot.insert((row, col));
        if fields.get(4) == Some(&"SUNK") {
            opponent.sunk += 1;
            if opponent.sunk >= NUM_SHIPS {
                opponent.out = true;
            }
        }
    }
}

/// Connect to `addr`, play one game and return how it ended.
pub async fn run_bot(
    addr: &str,
    name: &str,
    seed: Option<u64>,
    admin: bool,
) -> anyhow::Result<GameOutcome> {
    let rng = match seed {
        Some(s) => SmallRng::seed_from_u64(s),
        None => {
            let mut seed_rng = rand::rng();
            SmallRng::from_rng(&mut seed_rng)
        }
    };
    let mut bot = Bot::new(name, admin, rng);

    let stream = TcpStream::connect(addr).await?;
    info!("Connected to {}", addr);
    let (read_half, mut write_half) = stream.into_split();
    let mut lines = BufReader::new(read_half).lines();

    while let Some(line) = lines.next_line().await? {
        debug!("<- {}", line);
        for reply in bot.handle(&line) {
            debug!("-> {}", reply);
            write_half.write_all(format!("{}\n", reply).as_bytes()).await?;
        }
        if let Some(outcome) = bot.outcome().cloned() {
            info!("Game finished: {:?}", outcome);
            let _ = write_half.write_all(b"QUIT_GAME\n").await;
            return Ok(outcome);
        }
    }
    Err(anyhow::anyhow!("Connection closed by server before the game ended"))
}
