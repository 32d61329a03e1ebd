use std::path::PathBuf;

use battleship_arena::{init_logging, run_bot, GameOutcome, Server, ServerConfig};
use clap::{Args, Parser};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Parser)]
enum Commands {
    /// Host the lobby and games on the TCP and WebSocket listeners.
    Serve(ServeArgs),
    /// Join a server as an automated player and play one game.
    Bot {
        #[arg(long, default_value = "127.0.0.1:12351")]
        connect: String,
        #[arg(long, default_value = "Bot")]
        name: String,
        #[arg(long, help = "Fix RNG seed for reproducible games (e.g., --seed 12345)")]
        seed: Option<u64>,
        #[arg(long, help = "Start the game as lobby host once enough players are named")]
        admin: bool,
    },
}

#[derive(Args)]
struct ServeArgs {
    /// JSON file with server settings; flags override it.
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    tcp_bind: Option<String>,
    #[arg(long)]
    ws_bind: Option<String>,
    #[arg(long)]
    min_players: Option<usize>,
    #[arg(long)]
    max_players: Option<usize>,
    #[arg(long)]
    countdown_secs: Option<u64>,
    #[arg(long)]
    spectator_slots: Option<usize>,
}

impl ServeArgs {
    fn into_config(self) -> anyhow::Result<ServerConfig> {
        let mut config = match &self.config {
            Some(path) => ServerConfig::from_json_file(path)?,
            None => ServerConfig::default(),
        };
        if let Some(v) = self.tcp_bind {
            config.tcp_bind = v;
        }
        if let Some(v) = self.ws_bind {
            config.ws_bind = v;
        }
        if let Some(v) = self.min_players {
            config.min_players = v;
        }
        if let Some(v) = self.max_players {
            config.max_players = v;
        }
        if let Some(v) = self.countdown_secs {
            config.lobby_countdown_secs = v;
        }
        if let Some(v) = self.spectator_slots {
            config.spectator_slots = v;
        }
        config.validate()?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve(args) => {
            let config = args.into_config()?;
            println!(
                "Starting battleship arena (players {}-{}, countdown {}s)...",
                config.min_players, config.max_players, config.lobby_countdown_secs
            );
            let server = Server::bind(&config).await?;
            server.run().await?;
        }
        Commands::Bot {
            connect,
            name,
            seed,
            admin,
        } => {
            println!("Connecting bot {} to {}...", name, connect);
            if let Some(s) = seed {
                println!("Using fixed seed: {} (placements and shots will be reproducible)", s);
            }
            match run_bot(&connect, &name, seed, admin).await? {
                GameOutcome::Winner { name, index } => {
                    println!("Game over: {} (seat {}) wins", name, index)
                }
                GameOutcome::Draw => println!("Game over: draw"),
            }
        }
    }
    Ok(())
}
