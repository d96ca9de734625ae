//! The contract between the board controller and whatever knows the rules.
//!
//! The controller never decides legality itself. It asks a [GameEngine] to play
//! a move and renders the [MoveFeedback] it gets back.

use crate::{
    Board, BoardState, FenError, MoveError, MoveFeedback, MoveRequest, PlacedPiece, Side,
};

pub trait GameEngine {
    /// full current placement
    fn pieces(&self) -> Vec<PlacedPiece>;

    fn side_to_move(&self) -> Side;

    fn state(&self) -> BoardState;

    /// Plays `mve` (e.g. `e2e4`, `e7e8q`). On error the position is unchanged.
    fn feed_move(&mut self, mve: &str) -> Result<MoveFeedback, MoveError>;

    fn to_fen(&self) -> String;

    /// Replaces the current position. On error the position is unchanged.
    fn load_fen(&mut self, fen: &str) -> Result<(), FenError>;
}

/// [GameEngine] backed by the crate's own rules [Board].
#[derive(Debug, Clone, Default)]
pub struct LocalGame {
    board: Board,
}

impl LocalGame {
    pub fn new(board: Board) -> Self {
        LocalGame { board }
    }

    pub fn from_fen(fen: &str) -> Result<Self, FenError> {
        Board::from_fen(fen).map(LocalGame::new)
    }

    pub fn board(&self) -> &Board {
        &self.board
    }
}

impl GameEngine for LocalGame {
    fn pieces(&self) -> Vec<PlacedPiece> {
        self.board.pieces()
    }

    fn side_to_move(&self) -> Side {
        self.board.side_to_move
    }

    fn state(&self) -> BoardState {
        self.board.state()
    }

    fn feed_move(&mut self, mve: &str) -> Result<MoveFeedback, MoveError> {
        let request: MoveRequest = mve.parse()?;
        if self.board.state().is_terminal() {
            return Err(MoveError::GameOver);
        }
        let mve = self.board.find_move(request)?;
        Ok(self.board.play_move(mve))
    }

    fn to_fen(&self) -> String {
        self.board.generate_fen()
    }

    fn load_fen(&mut self, fen: &str) -> Result<(), FenError> {
        self.board = Board::from_fen(fen)?;
        Ok(())
    }
}
