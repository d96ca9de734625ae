use std::{error::Error, fmt};

use crate::{Side, Square};

/// Raised by the engine when a move string can't be played in the current position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MoveError {
    /// The text is not of the form `<origin><destination>[<promotion>]`.
    Malformed(String),
    /// Well formed, but not a legal move here.
    Illegal(String),
    /// A pawn reaches the last rank but no promotion piece was given.
    MissingPromotion(String),
    GameOver,
}

impl fmt::Display for MoveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MoveError::Malformed(text) => write!(
                f,
                "malformed move '{text}', expected a move like 'e2e4' or 'e7e8q'"
            ),
            MoveError::Illegal(text) => write!(f, "illegal move '{text}'"),
            MoveError::MissingPromotion(text) => {
                write!(f, "move '{text}' promotes a pawn but names no piece")
            }
            MoveError::GameOver => f.write_str("the game is already over"),
        }
    }
}

impl Error for MoveError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FenError(pub String);

impl fmt::Display for FenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid FEN: {}", self.0)
    }
}

impl Error for FenError {}

/// A `position ...` command that does not have the expected shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    Empty,
    UnknownCommand(String),
    MissingSubcommand(&'static str),
    UnexpectedToken(String),
    IncompleteFen(usize),
    BadMove(MoveError),
}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandError::Empty => f.write_str("empty command"),
            CommandError::UnknownCommand(word) => {
                write!(f, "unknown command '{word}', expected 'position'")
            }
            CommandError::MissingSubcommand(expected) => {
                write!(f, "missing subcommand, expected {expected}")
            }
            CommandError::UnexpectedToken(token) => write!(f, "unexpected token '{token}'"),
            CommandError::IncompleteFen(fields) => {
                write!(f, "expected 6 FEN fields, got {fields}")
            }
            CommandError::BadMove(err) => write!(f, "bad move list: {err}"),
        }
    }
}

impl Error for CommandError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            CommandError::BadMove(err) => Some(err),
            _ => None,
        }
    }
}

/// A move source that could not produce a move.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceError {
    EndpointUnset(Side),
    InvalidEndpoint(String),
    Request(String),
    BadResponse(String),
    SearchFailed(String),
    /// The search finished without a move, the position has none.
    NoMove,
    WorkerGone,
}

impl fmt::Display for SourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceError::EndpointUnset(side) => write!(f, "no endpoint configured for {side}"),
            SourceError::InvalidEndpoint(reason) => write!(f, "invalid endpoint: {reason}"),
            SourceError::Request(reason) => write!(f, "endpoint request failed: {reason}"),
            SourceError::BadResponse(reason) => write!(f, "bad endpoint response: {reason}"),
            SourceError::SearchFailed(reason) => write!(f, "search failed: {reason}"),
            SourceError::NoMove => f.write_str("no move available"),
            SourceError::WorkerGone => f.write_str("search worker is not running"),
        }
    }
}

impl Error for SourceError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyError {
    MissingPiece(Square),
}

impl fmt::Display for ApplyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApplyError::MissingPiece(square) => {
                write!(f, "visual board has no piece on {square}")
            }
        }
    }
}

impl Error for ApplyError {}
