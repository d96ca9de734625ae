use crate::{Board, Move, Result};

pub trait Engine {
    /// creates a new engine in the given position
    fn new_from_board(board: Board) -> Self
    where
        Self: Sized;

    /// search the position to `depth` plies on the calling thread and
    /// return the best move found. `None` if the position has no moves.
    fn search_to_depth(&mut self, depth: u32) -> Result<Option<Move>>;

    /// returns the best move the engine found so far or `None`.
    fn best_move(&self) -> Option<Move>;

    /// returns the calculated score for the current position
    fn current_score(&self) -> f32;
}

pub mod ella;
pub mod worker;
