//! The session coordinator: lobby admission, countdown, game flow and
//! disconnect handling behind one lock.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use log::{debug, error, info, warn};
use tokio::task::AbortHandle;

use crate::broadcast::Broadcaster;
use crate::common::ShotResult;
use crate::config::{SessionSettings, GRID_SIZE, MAX_NAME_LEN};
use crate::connection::{Connection, ConnectionId, Member, Role};
use crate::game::{GameError, GameState, Phase};
use crate::protocol::{ClientCommand, ServerMessage};
use crate::ship::{Orientation, ShipType};

const SERVER_SENDER: &str = "Server";

/// Serialization point for every state change of the server.
///
/// Cheap to clone; all clones share the same registry and game. Each public
/// operation runs, broadcasts included, while holding the coordinator lock.
#[derive(Clone)]
pub struct SessionCoordinator {
    shared: Arc<Shared>,
}

struct Shared {
    state: Mutex<Session>,
    next_id: AtomicU64,
}

struct Countdown {
    generation: u64,
    abort: AbortHandle,
}

struct Session {
    settings: SessionSettings,
    members: Vec<Member>,
    game: Option<GameState>,
    countdown: Option<Countdown>,
    generation: u64,
    shared: Weak<Shared>,
}

/// Read-only view of one registered connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberView {
    pub id: ConnectionId,
    pub name: Option<String>,
    pub role: Role,
    pub game_index: Option<usize>,
}

/// Read-only view of the coordinator, for logs and tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub members: Vec<MemberView>,
    pub countdown_armed: bool,
    pub phase: Option<Phase>,
    pub current_player: Option<usize>,
    pub active_indices: Vec<usize>,
}

impl SessionSnapshot {
    pub fn member(&self, id: ConnectionId) -> Option<&MemberView> {
        self.members.iter().find(|m| m.id == id)
    }
}

impl SessionCoordinator {
    pub fn new(settings: SessionSettings) -> Self {
        let shared = Arc::new_cyclic(|weak| Shared {
            state: Mutex::new(Session {
                settings,
                members: Vec::new(),
                game: None,
                countdown: None,
                generation: 0,
                shared: weak.clone(),
            }),
            next_id: AtomicU64::new(1),
        });
        SessionCoordinator { shared }
    }

    fn lock(&self) -> MutexGuard<'_, Session> {
        self.shared
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Allocate the identity of a freshly accepted connection.
    pub fn next_connection_id(&self) -> ConnectionId {
        ConnectionId(self.shared.next_id.fetch_add(1, Ordering::Relaxed))
    }

    pub fn settings(&self) -> SessionSettings {
        self.lock().settings
    }

    /// Register a new connection. Returns `false` (after closing it) when the
    /// server is full.
    pub fn on_connect(&self, handle: Arc<dyn Connection>) -> bool {
        self.lock().connect(handle)
    }

    /// Decode one frame from `id` and run it.
    pub fn handle_frame(&self, id: ConnectionId, frame: &str) {
        self.lock().handle_frame(id, frame)
    }

    pub fn on_name_set(&self, id: ConnectionId, name: &str) {
        self.lock().name_set(id, name)
    }

    pub fn on_admin_start(&self, id: ConnectionId) {
        self.lock().admin_start(id)
    }

    pub fn on_place_ship(
        &self,
        id: ConnectionId,
        ship_type: ShipType,
        row: usize,
        col: usize,
        orientation: Orientation,
    ) {
        self.lock().place_ship(id, ship_type, row, col, orientation)
    }

    pub fn on_fire(&self, id: ConnectionId, target: usize, row: usize, col: usize) {
        self.lock().fire(id, target, row, col)
    }

    pub fn on_chat(&self, id: ConnectionId, text: &str) {
        self.lock().chat(id, text)
    }

    /// Close the connection at the client's request.
    pub fn on_quit(&self, id: ConnectionId) {
        self.lock().quit(id)
    }

    /// Forget a connection whose transport went away. Idempotent: only the
    /// first call for a registered connection has any effect.
    pub fn on_disconnect(&self, id: ConnectionId) {
        self.lock().disconnect(id)
    }

    fn on_countdown_expired(&self, generation: u64) {
        self.lock().countdown_expired(generation)
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let session = self.lock();
        let game = session.game.as_ref();
        SessionSnapshot {
            members: session
                .members
                .iter()
                .map(|m| MemberView {
                    id: m.id(),
                    name: m.name.clone(),
                    role: m.role,
                    game_index: m.game_index,
                })
                .collect(),
            countdown_armed: session.countdown.is_some(),
            phase: game.map(GameState::phase),
            current_player: game.and_then(GameState::current_player),
            active_indices: game.map(|g| g.active_indices().to_vec()).unwrap_or_default(),
        }
    }

    /// Copy of the running game, if any.
    pub fn game_snapshot(&self) -> Option<GameState> {
        self.lock().game.clone()
    }
}

impl Session {
    fn position(&self, id: ConnectionId) -> Option<usize> {
        self.members.iter().position(|m| m.id() == id)
    }

    fn member(&self, id: ConnectionId) -> Option<&Member> {
        self.members.iter().find(|m| m.id() == id)
    }

    fn reply(&self, id: ConnectionId, msg: ServerMessage) {
        if let Some(m) = self.member(id) {
            m.send(&msg);
        }
    }

    fn error(&self, id: ConnectionId, message: impl Into<String>) {
        self.reply(id, ServerMessage::Error(message.into()));
    }

    fn broadcaster(&self) -> Broadcaster<'_> {
        Broadcaster::new(&self.members)
    }

    fn game_running(&self) -> bool {
        self.game.as_ref().is_some_and(|g| g.phase() != Phase::Done)
    }

    fn named_lobby(&self) -> impl Iterator<Item = &Member> {
        self.members
            .iter()
            .filter(|m| m.role == Role::Lobby && m.is_named() && m.handle.is_live())
    }

    fn named_lobby_count(&self) -> usize {
        self.named_lobby().count()
    }

    fn seat(&self, game_index: usize) -> Option<&Member> {
        self.members
            .iter()
            .find(|m| m.role == Role::InGame && m.game_index == Some(game_index))
    }

    fn broadcast_lobby_state(&self) {
        let names: Vec<String> = self
            .named_lobby()
            .filter_map(|m| m.name.clone())
            .collect();
        self.broadcaster().everyone(&ServerMessage::LobbyState {
            named: names.len(),
            min: self.settings.min_players,
            max: self.settings.max_players,
            names,
        });
    }

    fn connect(&mut self, handle: Arc<dyn Connection>) -> bool {
        let running = self.game_running();
        let capacity = if running {
            self.settings.max_players + self.settings.spectator_slots
        } else {
            self.settings.max_players
        };
        if self.members.len() >= capacity {
            warn!(
                "Refusing {} connection {} from {}: server full ({} registered)",
                handle.kind(),
                handle.id(),
                handle.peer(),
                self.members.len()
            );
            handle.send(
                &ServerMessage::Error(format!(
                    "Server full (max {} participants)",
                    self.settings.max_players
                ))
                .to_string(),
            );
            handle.close();
            return false;
        }

        let role = if running { Role::Spectator } else { Role::Lobby };
        info!(
            "{} connection {} from {} joined as {} ({} registered)",
            handle.kind(),
            handle.id(),
            handle.peer(),
            role,
            self.members.len() + 1
        );
        let member = Member::new(handle, role);
        member.send(&ServerMessage::ReqName);
        self.members.push(member);
        true
    }

    fn handle_frame(&mut self, id: ConnectionId, frame: &str) {
        if self.member(id).is_none() {
            debug!("Dropping frame from unregistered connection {}", id);
            return;
        }
        debug!("{} -> {:?}", id, frame);
        match ClientCommand::parse(frame) {
            Ok(ClientCommand::SetName(name)) => self.name_set(id, &name),
            Ok(ClientCommand::PlaceShip {
                ship_type,
                row,
                col,
                orientation,
            }) => self.place_ship(id, ship_type, row, col, orientation),
            Ok(ClientCommand::FireShot { target, row, col }) => self.fire(id, target, row, col),
            Ok(ClientCommand::AdminStartGame) => self.admin_start(id),
            Ok(ClientCommand::QuitGame) => self.quit(id),
            Ok(ClientCommand::Chat(text)) => self.chat(id, &text),
            Err(e) => {
                debug!("Protocol error from {}: {}", id, e);
                self.error(id, e.to_string());
            }
        }
    }

    fn reject_name(&self, pos: usize, message: &str) {
        let member = &self.members[pos];
        member.send(&ServerMessage::Error(message.to_string()));
        if !member.is_named() {
            member.send(&ServerMessage::ReqName);
        }
    }

    fn name_set(&mut self, id: ConnectionId, raw: &str) {
        let Some(pos) = self.position(id) else {
            return;
        };
        let name = raw.trim();
        if name.is_empty() || name.chars().count() > MAX_NAME_LEN {
            self.reject_name(
                pos,
                &format!("Name must be between 1 and {} characters", MAX_NAME_LEN),
            );
            return;
        }
        if name.contains([':', ',']) {
            self.reject_name(pos, "Name may not contain ':' or ','");
            return;
        }
        if name.chars().any(char::is_control) {
            self.reject_name(pos, "Name may not contain control characters");
            return;
        }
        if self.members[pos].role == Role::InGame {
            self.members[pos].send(&ServerMessage::Error(
                "Cannot change your name during a game".to_string(),
            ));
            return;
        }
        let lowered = name.to_lowercase();
        let taken = self.members.iter().any(|m| {
            m.id() != id && m.name.as_ref().is_some_and(|n| n.to_lowercase() == lowered)
        });
        if taken {
            self.reject_name(pos, "That name is already taken");
            return;
        }

        info!("Connection {} is now known as {}", id, name);
        self.members[pos].name = Some(name.to_string());

        if self.members[pos].role == Role::Spectator {
            if let Some(game) = self.game.as_ref().filter(|g| g.phase() != Phase::Done) {
                let member = &self.members[pos];
                member.send(&ServerMessage::SpectateMode);
                member.send(&ServerMessage::SpectateInfo {
                    grid_size: GRID_SIZE,
                    names: game.player_names().to_vec(),
                });
                self.broadcaster().everyone(&ServerMessage::NewChatMsg {
                    sender: SERVER_SENDER.to_string(),
                    text: format!("[{} is spectating]", name),
                });
                return;
            }
            self.members[pos].role = Role::Lobby;
        }

        self.lobby_changed();
    }

    /// Re-evaluate the lobby after a named player arrived.
    fn lobby_changed(&mut self) {
        self.broadcast_lobby_state();
        if self.game_running() {
            return;
        }
        let named = self.named_lobby_count();
        if named >= self.settings.max_players {
            info!("Lobby is full with {} named players, starting now", named);
            self.cancel_countdown();
            self.start_game();
        } else if named >= self.settings.min_players && self.countdown.is_none() {
            self.arm_countdown();
        }
    }

    fn arm_countdown(&mut self) {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            error!("No async runtime available, lobby countdown not armed");
            return;
        };
        self.generation += 1;
        let generation = self.generation;
        let delay = self.settings.lobby_countdown;
        let shared = self.shared.clone();
        let task = runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            if let Some(shared) = shared.upgrade() {
                SessionCoordinator { shared }.on_countdown_expired(generation);
            }
        });
        self.countdown = Some(Countdown {
            generation,
            abort: task.abort_handle(),
        });
        info!("Lobby countdown of {}s started", delay.as_secs());
        self.broadcaster()
            .everyone(&ServerMessage::LobbyCountdownStarted {
                seconds: delay.as_secs(),
            });
    }

    fn cancel_countdown(&mut self) {
        if let Some(countdown) = self.countdown.take() {
            countdown.abort.abort();
            info!("Lobby countdown cancelled");
            self.broadcaster()
                .everyone(&ServerMessage::LobbyCountdownCancelled);
        }
    }

    fn countdown_expired(&mut self, generation: u64) {
        match &self.countdown {
            Some(c) if c.generation == generation => self.countdown = None,
            _ => {
                debug!("Ignoring stale countdown #{}", generation);
                return;
            }
        }
        if self.game_running() {
            return;
        }
        let named = self.named_lobby_count();
        if named >= self.settings.min_players {
            info!("Lobby countdown elapsed, starting with {} players", named);
            self.start_game();
        } else {
            info!("Lobby countdown elapsed without enough named players");
            self.broadcaster()
                .everyone(&ServerMessage::LobbyTimerEndedNoGame {
                    reason: "Not enough named players".to_string(),
                });
            self.broadcast_lobby_state();
        }
    }

    fn admin_start(&mut self, id: ConnectionId) {
        let Some(member) = self.member(id) else {
            return;
        };
        if !member.is_named() {
            self.error(id, "Set your name first");
            return;
        }
        if self.game_running() || member.role != Role::Lobby {
            self.error(id, "A game is already in progress");
            return;
        }
        let host = self.named_lobby().next().map(Member::id);
        if host != Some(id) {
            self.error(
                id,
                "Only the host (earliest named player in the lobby) can start the game",
            );
            return;
        }
        if self.named_lobby_count() < self.settings.min_players {
            self.error(
                id,
                format!(
                    "Not enough named players (min {})",
                    self.settings.min_players
                ),
            );
            return;
        }
        info!("Host {} starts the game", id);
        self.cancel_countdown();
        self.start_game();
    }

    fn start_game(&mut self) {
        if self.game_running() {
            return;
        }
        let seats: Vec<usize> = self
            .members
            .iter()
            .enumerate()
            .filter(|(_, m)| m.role == Role::Lobby && m.is_named() && m.handle.is_live())
            .map(|(pos, _)| pos)
            .collect();
        if seats.len() < self.settings.min_players {
            warn!("Not enough players to start ({})", seats.len());
            self.broadcaster().everyone(&ServerMessage::Error(
                "Not enough named players to start".to_string(),
            ));
            return;
        }
        self.cancel_countdown();

        let names: Vec<String> = seats
            .iter()
            .map(|&pos| self.members[pos].display_name().to_string())
            .collect();
        for (index, &pos) in seats.iter().enumerate() {
            let member = &mut self.members[pos];
            member.role = Role::InGame;
            member.game_index = Some(index);
        }
        self.game = Some(GameState::new(names.clone()));
        info!("Game started with {:?}", names);

        for member in &mut self.members {
            match (member.role, member.game_index) {
                (Role::InGame, Some(index)) => member.send(&ServerMessage::GameStart {
                    grid_size: GRID_SIZE,
                    your_index: index,
                    names: names.clone(),
                }),
                _ if member.is_named() => {
                    member.role = Role::Spectator;
                    member.send(&ServerMessage::SpectateMode);
                    member.send(&ServerMessage::SpectateInfo {
                        grid_size: GRID_SIZE,
                        names: names.clone(),
                    });
                }
                _ => {
                    member.role = Role::Spectator;
                    member.send(&ServerMessage::ReqName);
                }
            }
        }

        self.prompt_next();
    }

    /// Tell the participant holding the turn what to do, and everyone else
    /// whom they are waiting for.
    fn prompt_next(&self) {
        let Some(game) = self.game.as_ref() else {
            return;
        };
        match game.phase() {
            Phase::Placement => self.prompt_placement(game),
            Phase::Combat => self.prompt_fire(game),
            Phase::Done => {}
        }
    }

    fn prompt_placement(&self, game: &GameState) {
        let Some(current) = game.current_player() else {
            return;
        };
        let Some(ship_type) = game.next_ship(current) else {
            error!("Participant {} holds the turn with nothing to place", current);
            return;
        };
        let Some(seat) = self.seat(current) else {
            error!("No connection seated at index {}", current);
            return;
        };
        seat.send(&ServerMessage::YourTurnPlaceShip(ship_type));
        self.broadcaster().players_except(
            seat.id(),
            &ServerMessage::WaitPlacement {
                who: seat.display_name().to_string(),
                ship_type,
            },
        );
    }

    fn prompt_fire(&self, game: &GameState) {
        let Some(current) = game.current_player() else {
            return;
        };
        let Some(seat) = self.seat(current) else {
            error!("No connection seated at index {}", current);
            return;
        };
        info!("{} to fire", seat.display_name());
        seat.send(&ServerMessage::YourTurnFire);
        self.broadcaster().players_except(
            seat.id(),
            &ServerMessage::OpponentTurnFire {
                who: seat.display_name().to_string(),
            },
        );
    }

    fn announce_combat(&self) {
        self.broadcaster().players(&ServerMessage::AllShipsPlaced);
        self.prompt_next();
    }

    fn place_ship(
        &mut self,
        id: ConnectionId,
        ship_type: ShipType,
        row: usize,
        col: usize,
        orientation: Orientation,
    ) {
        let Some(member) = self.member(id) else {
            return;
        };
        if member.role != Role::InGame {
            self.error(id, "Only seated players can place ships");
            return;
        }
        let seat = member.game_index;
        let who = member.display_name().to_string();
        let Some(game) = self.game.as_mut() else {
            self.error(id, "No game in progress");
            return;
        };
        if game.phase() != Phase::Placement {
            self.error(id, "Not in the placement phase");
            return;
        }
        if seat.is_none() || seat != game.current_player() {
            self.error(id, "Not your turn to place a ship");
            return;
        }

        match game.place_next_ship(ship_type, row, col, orientation) {
            Ok(()) => {
                let entered_combat = game.phase() == Phase::Combat;
                info!("{} placed {} at ({}, {})", who, ship_type.name(), row, col);
                self.reply(
                    id,
                    ServerMessage::PlacementAccepted {
                        ship_type,
                        row,
                        col,
                        orientation,
                    },
                );
                self.broadcaster().players_except(
                    id,
                    &ServerMessage::PlayerPlacedShip { who, ship_type },
                );
                if entered_combat {
                    self.announce_combat();
                } else {
                    self.prompt_next();
                }
            }
            Err(GameError::Rejected(reason)) => {
                debug!("{} placement of {} rejected: {}", who, ship_type.name(), reason);
                let next = seat.and_then(|s| game.next_ship(s));
                self.reply(id, ServerMessage::PlacementRejected(ship_type));
                if let Some(next) = next {
                    self.reply(id, ServerMessage::YourTurnPlaceShip(next));
                }
            }
            Err(e) => self.error(id, e.to_string()),
        }
    }

    fn fire(&mut self, id: ConnectionId, target: usize, row: usize, col: usize) {
        let Some(member) = self.member(id) else {
            return;
        };
        if member.role != Role::InGame {
            self.error(id, "Only seated players can fire");
            return;
        }
        let seat = member.game_index;
        let who = member.display_name().to_string();
        let Some(game) = self.game.as_mut() else {
            self.error(id, "No game in progress");
            return;
        };
        if game.phase() != Phase::Combat {
            self.error(id, "Not in the combat phase");
            return;
        }
        let Some(shooter) = seat.filter(|&s| Some(s) == game.current_player()) else {
            self.error(id, "Not your turn to fire");
            return;
        };

        let refusal = if target >= game.player_count() || target == shooter {
            Some("Invalid target")
        } else if !game.is_active(target) {
            Some("That player has been eliminated")
        } else {
            None
        };
        let result = match refusal {
            Some(_) => ShotResult::Error,
            None => game.fire(target, row, col),
        };
        if result == ShotResult::Error {
            self.error(id, refusal.unwrap_or("Shot outside the grid"));
            self.reply(id, ServerMessage::YourTurnFire);
            return;
        }

        info!(
            "{} fired at {} ({}, {}) -> {}",
            who,
            target,
            row,
            col,
            result.wire_name()
        );
        let over = game.phase() == Phase::Done;
        self.broadcaster().participants(&ServerMessage::ShotResult {
            shooter,
            target,
            row,
            col,
            result,
        });

        if over {
            self.announce_result();
            self.reset_to_lobby();
        } else if result.consumes_turn() {
            self.prompt_next();
        } else {
            self.reply(id, ServerMessage::YourTurnFire);
        }
    }

    fn announce_result(&self) {
        let Some(game) = self.game.as_ref() else {
            return;
        };
        let msg = match game.winner() {
            Some(index) => ServerMessage::GameOver {
                winner: game.player_name(index).unwrap_or_default().to_string(),
                index,
            },
            None => ServerMessage::GameOverDraw,
        };
        self.broadcaster().participants(&msg);
    }

    /// Drop the game and send everyone back to an unnamed lobby seat.
    fn reset_to_lobby(&mut self) {
        info!("Resetting to a fresh lobby");
        self.game = None;
        self.cancel_countdown();
        self.members.retain(|m| m.handle.is_live());
        for member in &mut self.members {
            member.reset_for_lobby();
            member.send(&ServerMessage::ReqName);
        }
        self.broadcast_lobby_state();
    }

    fn chat(&mut self, id: ConnectionId, text: &str) {
        let Some(member) = self.member(id) else {
            return;
        };
        let Some(sender) = member.name.clone() else {
            self.error(id, "Set your name before chatting");
            return;
        };
        // line breaks would split the relayed frame on the stream transport
        let text: String = text
            .chars()
            .map(|c| if c.is_control() { ' ' } else { c })
            .collect();
        if text.trim().is_empty() {
            return;
        }
        debug!("CHAT [{}]: {}", sender, text);
        self.broadcaster()
            .everyone(&ServerMessage::NewChatMsg { sender, text });
    }

    fn quit(&mut self, id: ConnectionId) {
        if let Some(member) = self.member(id) {
            info!("{} asked to quit", member.display_name());
            member.handle.close();
        }
        self.disconnect(id);
    }

    fn disconnect(&mut self, id: ConnectionId) {
        let Some(pos) = self.position(id) else {
            return;
        };
        let member = self.members.remove(pos);
        member.handle.close();
        info!(
            "{} ({}, {}) disconnected, {} registered",
            member.display_name(),
            id,
            member.role,
            self.members.len()
        );

        match (member.role, member.game_index) {
            (Role::InGame, Some(index)) if self.game.is_some() => {
                self.seat_vacated(&member, index)
            }
            _ => {
                if let Some(name) = &member.name {
                    self.broadcaster().everyone(&ServerMessage::NewChatMsg {
                        sender: SERVER_SENDER.to_string(),
                        text: format!("[{} left]", name),
                    });
                }
                if !self.game_running() {
                    if self.countdown.is_some()
                        && self.named_lobby_count() < self.settings.min_players
                    {
                        self.cancel_countdown();
                    }
                    self.broadcast_lobby_state();
                }
            }
        }
    }

    fn seat_vacated(&mut self, member: &Member, index: usize) {
        let Some(game) = self.game.as_mut() else {
            return;
        };
        let held_turn = game.current_player() == Some(index);
        let phase_before = game.phase();
        let continues = game.handle_disconnect(index);
        let phase_after = game.phase();
        let who = member.display_name().to_string();

        if continues {
            info!("{} left the game, {} still playing", who, game.active_indices().len());
            self.broadcaster()
                .participants(&ServerMessage::PlayerLeft { who, index });
            if phase_before == Phase::Placement && phase_after == Phase::Combat {
                self.announce_combat();
            } else if held_turn {
                self.prompt_next();
            }
        } else {
            info!("{} left and the game cannot continue", who);
            self.broadcaster()
                .participants(&ServerMessage::GameOverDisconnect { who });
            self.announce_result();
            self.reset_to_lobby();
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if let Some(countdown) = self.countdown.take() {
            countdown.abort.abort();
        }
    }
}
