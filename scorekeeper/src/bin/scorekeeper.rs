use std::collections::HashMap;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use database::{DatabaseConfig, SqliteStore};
use rand::seq::SliceRandom;
use rand::thread_rng;
use scorekeeper::display::{render_sessions, render_statistics, render_view};
use scorekeeper::{KeeperConfig, KeeperError, ScoreKeeper};
use scoring::input::parse_round_line;
use scoring::SessionView;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;
use types::{GameType, PlayerId, SessionId};

#[derive(Parser, Debug)]
struct Params {
    /// SQLite file or URL; falls back to DATABASE_URL, then the config file.
    #[arg(short, long)]
    database: Option<String>,

    /// YAML file with game defaults and retry settings.
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List known players.
    Players,
    RenamePlayer {
        from: String,
        to: String,
    },
    DeletePlayer {
        name: String,
    },
    /// Show the statistics table of a game.
    Stats {
        game: GameType,
    },
    ResetStats {
        game: GameType,
    },
    /// List paused sessions of a game.
    Paused {
        game: GameType,
    },
    Presets {
        game: GameType,
    },
    AddPreset {
        game: GameType,
        name: String,
        #[arg(required = true)]
        players: Vec<String>,
    },
    DeletePreset {
        id: i64,
    },
    /// Play a new game, one round per line on stdin.
    Play {
        game: GameType,
        players: Vec<String>,
        #[arg(long)]
        preset: Option<String>,
        /// Seat the players in random order.
        #[arg(long)]
        shuffle: bool,
    },
    /// Continue a paused session.
    Resume {
        session: i64,
    },
}

type Keeper = ScoreKeeper<SqliteStore>;

async fn player_names(keeper: &Keeper) -> Result<HashMap<PlayerId, String>, KeeperError> {
    Ok(keeper
        .list_players()
        .await?
        .into_iter()
        .map(|p| (p.id, p.name))
        .collect())
}

async fn seat_players(
    keeper: &Keeper,
    game: GameType,
    names: &[String],
    preset: Option<&str>,
) -> Result<Vec<PlayerId>, KeeperError> {
    if let Some(preset) = preset {
        return keeper
            .list_presets(game)
            .await?
            .into_iter()
            .find(|p| p.name == preset)
            .map(|p| p.players)
            .ok_or_else(|| KeeperError::Input(format!("no {game} preset named {preset:?}")));
    }
    let mut ids = Vec::with_capacity(names.len());
    for name in names {
        ids.push(keeper.upsert_player(name).await?.id);
    }
    Ok(ids)
}

/// Reads round lines until the game ends, the user pauses, or stdin closes.
async fn play(keeper: &Keeper, mut view: SessionView) -> Result<(), KeeperError> {
    let id = view.session_id;
    let mut names = player_names(keeper).await?;
    println!("{}", render_view(&view, &names));
    println!("Enter one value per player, or: undo, add NAME, remove NAME, pause, end, discard");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        let mut words = line.split_whitespace();
        let result = match (words.next(), words.next()) {
            (None, _) => continue,
            (Some("undo"), None) => keeper.remove_last_round(id).await,
            (Some("pause"), None) => {
                keeper.pause(id).await?;
                println!("Paused {id}; resume with `scorekeeper resume {}`", id.as_i64());
                return Ok(());
            }
            (Some("end"), None) => keeper.end_game(id).await,
            (Some("discard"), None) => {
                keeper.discard(id).await?;
                println!("Discarded {id}");
                return Ok(());
            }
            (Some("add"), Some(name)) => {
                let player = keeper.upsert_player(name).await?;
                names.insert(player.id, player.name);
                keeper.add_participant(id, player.id).await
            }
            (Some("remove"), Some(name)) => match keeper.find_player(name).await {
                Ok(player) => keeper.remove_participant(id, player.id).await,
                Err(e) => Err(e),
            },
            _ => match parse_round_line(view.game_type, line, &view.participants, view.next_round)
            {
                Ok(round) => keeper.enter_round(id, round).await,
                Err(message) => Err(KeeperError::Input(message)),
            },
        };

        match result {
            Ok(next) => {
                view = next;
                println!("{}", render_view(&view, &names));
                if view.state.is_finished() {
                    println!("Game over, statistics updated");
                    return Ok(());
                }
            }
            Err(e) => println!("error: {e}"),
        }
    }

    keeper.pause(id).await?;
    println!("Input closed, paused {id}");
    Ok(())
}

async fn run(params: Params) -> Result<(), KeeperError> {
    let config = match &params.config {
        Some(path) => KeeperConfig::from_yaml_file(path)?,
        None => KeeperConfig::default(),
    };
    let database =
        DatabaseConfig::from_cli_or_env_or_yaml(params.database, config.database_url.clone());
    let store = SqliteStore::connect(&database).await?;
    let keeper = ScoreKeeper::new(store, config);

    match params.command {
        Command::Players => {
            for player in keeper.list_players().await? {
                println!("{}  {}", player.name, player.id);
            }
        }
        Command::RenamePlayer { from, to } => {
            let player = keeper.find_player(&from).await?;
            keeper.rename_player(player.id, &to).await?;
        }
        Command::DeletePlayer { name } => {
            let player = keeper.find_player(&name).await?;
            keeper.delete_player(player.id).await?;
        }
        Command::Stats { game } => {
            let rows = keeper.statistics(game).await?;
            let overview = keeper.statistics_overview(game).await?;
            println!("{}", render_statistics(&rows, &overview));
        }
        Command::ResetStats { game } => {
            let reset = keeper.reset_statistics(game).await?;
            println!("Reset {reset} {game} statistics rows");
        }
        Command::Paused { game } => {
            println!("{}", render_sessions(&keeper.paused_sessions(game).await?));
        }
        Command::Presets { game } => {
            let names = player_names(&keeper).await?;
            for preset in keeper.list_presets(game).await? {
                let players: Vec<_> = preset
                    .players
                    .iter()
                    .map(|id| names.get(id).map_or("?", String::as_str))
                    .collect();
                println!("{:>3}  {}: {}", preset.id, preset.name, players.join(", "));
            }
        }
        Command::AddPreset {
            game,
            name,
            players,
        } => {
            let ids = seat_players(&keeper, game, &players, None).await?;
            let preset = keeper.create_preset(game, &name, &ids).await?;
            println!("Created preset {} ({})", preset.name, preset.id);
        }
        Command::DeletePreset { id } => keeper.delete_preset(id).await?,
        Command::Play {
            game,
            players,
            preset,
            shuffle,
        } => {
            let mut seats = seat_players(&keeper, game, &players, preset.as_deref()).await?;
            if shuffle {
                seats.shuffle(&mut thread_rng());
            }
            let view = keeper.start_game(game, &seats).await?;
            play(&keeper, view).await?;
        }
        Command::Resume { session } => {
            let view = keeper.resume(SessionId::new(session)).await?;
            play(&keeper, view).await?;
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let params = Params::parse();
    tracing::debug!("args: {params:?}");
    if let Err(e) = run(params).await {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
