//! Startup configuration, from command line flags or environment variables.

use std::time::Duration;

use clap::Parser;

use crate::{
    source::{PlayerConfig, SourceKind},
    Side, START_BOARD_FEN,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// initial position
    pub fen: String,
    pub white: PlayerConfig,
    pub black: PlayerConfig,
    /// local engine search depth in plies
    pub search_depth: u32,
    pub replay_delay: Duration,
    pub request_timeout: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            fen: START_BOARD_FEN.to_string(),
            white: PlayerConfig::human(),
            black: PlayerConfig::engine(),
            search_depth: 3,
            replay_delay: Duration::from_millis(500),
            request_timeout: Duration::from_secs(10),
        }
    }
}

impl Settings {
    pub fn player(&self, side: Side) -> &PlayerConfig {
        match side {
            Side::White => &self.white,
            Side::Black => &self.black,
        }
    }
}

#[derive(Debug, Clone, Parser)]
#[command(version, about = "Interactive chess board with local and remote move sources")]
pub struct Args {
    /// Position to start from, defaults to the standard start position
    #[arg(long, env = "CHESSBOARD_FEN")]
    pub fen: Option<String>,
    /// Who plays white: human, engine or remote
    #[arg(long, env = "CHESSBOARD_WHITE", default_value_t = SourceKind::Human)]
    pub white: SourceKind,
    /// Who plays black: human, engine or remote
    #[arg(long, env = "CHESSBOARD_BLACK", default_value_t = SourceKind::LocalEngine)]
    pub black: SourceKind,
    #[arg(long, env = "CHESSBOARD_WHITE_ENDPOINT")]
    pub white_endpoint: Option<String>,
    #[arg(long, env = "CHESSBOARD_BLACK_ENDPOINT")]
    pub black_endpoint: Option<String>,
    /// Local engine search depth in plies
    #[arg(
        long,
        env = "CHESSBOARD_DEPTH",
        default_value_t = 3,
        value_parser = clap::value_parser!(u32).range(1..)
    )]
    pub depth: u32,
    /// Delay between replayed moves in milliseconds
    #[arg(long, env = "CHESSBOARD_REPLAY_DELAY_MS", default_value_t = 500)]
    pub replay_delay_ms: u64,
    /// Remote endpoint timeout in seconds
    #[arg(long, default_value_t = 10)]
    pub timeout_secs: u64,
}

impl Args {
    pub fn into_settings(self) -> Settings {
        Settings {
            fen: self.fen.unwrap_or_else(|| START_BOARD_FEN.to_string()),
            white: PlayerConfig {
                kind: self.white,
                endpoint: self.white_endpoint,
            },
            black: PlayerConfig {
                kind: self.black,
                endpoint: self.black_endpoint,
            },
            search_depth: self.depth,
            replay_delay: Duration::from_millis(self.replay_delay_ms),
            request_timeout: Duration::from_secs(self.timeout_secs),
        }
    }
}
