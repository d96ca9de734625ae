use anyhow::bail;

use super::{Engine, Result};
use crate::{utils::AtomicF32, Board, Move, PieceKind, Side};
use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex,
    },
};

const MATE_SCORE: f32 = 100_000.0;

/// State shared between a running search and whoever wants to stop it.
#[derive(Debug, Default)]
pub struct SearchControl {
    abort_search: AtomicBool,
    score: AtomicF32,
    best_move: Mutex<Option<Move>>,
}

impl SearchControl {
    pub fn new() -> Arc<Self> {
        Arc::new(SearchControl::default())
    }

    pub fn abort(&self) {
        self.abort_search.store(true, Ordering::SeqCst);
    }

    pub fn is_aborted(&self) -> bool {
        self.abort_search.load(Ordering::SeqCst)
    }

    /// Clears the abort flag and the previous result.
    pub fn reset(&self) {
        self.abort_search.store(false, Ordering::SeqCst);
        self.score.store(0.0, Ordering::SeqCst);
        if let Ok(mut best_move) = self.best_move.lock() {
            *best_move = None;
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SearchStats {
    pub positions_checked: u64,
    pub transposition_hits: u64,
}

pub struct EllaChess {
    board: Board,
    control: Arc<SearchControl>,
    transpositions: HashMap<TranspositionKey, SearchResult>,
    stats: SearchStats,
}

impl Engine for EllaChess {
    fn new_from_board(board: Board) -> Self {
        EllaChess::with_control(board, SearchControl::new())
    }

    fn search_to_depth(&mut self, target_depth: u32) -> Result<Option<Move>> {
        self.transpositions.clear();
        self.stats = SearchStats::default();

        let board = self.board.clone();
        let result = self.search_recursive(&board, target_depth, 0)?;

        if let Ok(mut best_move) = self.control.best_move.lock() {
            *best_move = result.best_move;
        }
        self.control.score.store(result.score, Ordering::SeqCst);

        log::debug!(
            "searched to depth {target_depth}: {:?} scored {} ({:?})",
            result.best_move.map(|m| m.to_string()),
            result.score,
            self.stats
        );

        Ok(result.best_move)
    }

    fn best_move(&self) -> Option<Move> {
        self.control.best_move.lock().ok().and_then(|m| *m)
    }

    fn current_score(&self) -> f32 {
        self.control.score.load(Ordering::SeqCst)
    }
}

impl EllaChess {
    /// Creates an engine that reports to, and can be aborted through, `control`.
    pub fn with_control(board: Board, control: Arc<SearchControl>) -> Self {
        EllaChess {
            board,
            control,
            transpositions: HashMap::new(),
            stats: SearchStats::default(),
        }
    }

    pub fn stats(&self) -> SearchStats {
        self.stats
    }

    fn search_recursive(&mut self, board: &Board, target_depth: u32, ply: u32) -> Result<SearchResult> {
        if self.control.is_aborted() {
            bail!("search aborted");
        }

        let transposition_key = TranspositionKey::new(board.zobrist_hash, target_depth);

        self.stats.positions_checked += 1;
        if let Some(transposition) = self.transpositions.get(&transposition_key) {
            self.stats.transposition_hits += 1;
            return Ok(*transposition);
        }

        let moves = board.legal_moves();

        if moves.is_empty() {
            if board.is_in_check(board.side_to_move) {
                // prefer the shortest mate
                return Ok(SearchResult::score(-(MATE_SCORE - ply as f32)));
            } else {
                return Ok(SearchResult::score(0.0));
            }
        }

        if board.draw_by_repetition_or_50_moves() {
            let result = SearchResult::score(0.0);
            self.transpositions.insert(transposition_key, result);
            return Ok(result);
        }

        if target_depth == 0 {
            return Ok(SearchResult::score(Self::estimate_board(board)));
        }

        let mut best_score = f32::NEG_INFINITY;
        let mut best_move = None;

        for mve in moves {
            let mut board = board.clone();
            board.play_move(mve);

            let score = -self.search_recursive(&board, target_depth - 1, ply + 1)?.score;
            if best_move.is_none() || score > best_score {
                best_move = Some(mve);
                best_score = score;
            }
        }

        let result = SearchResult::new(best_move, best_score);
        self.transpositions.insert(transposition_key, result);
        Ok(result)
    }

    fn estimate_board(board: &Board) -> f32 {
        let mut white_piece_score = 0.0;
        let mut black_piece_score = 0.0;

        for piece in board.pieces() {
            match piece.side {
                Side::White => white_piece_score += Self::piece_value(piece.kind),
                Side::Black => black_piece_score += Self::piece_value(piece.kind),
            }
        }
        match board.side_to_move {
            Side::White => white_piece_score - black_piece_score,
            Side::Black => black_piece_score - white_piece_score,
        }
    }

    #[inline]
    fn piece_value(kind: PieceKind) -> f32 {
        match kind {
            PieceKind::King => 0.0, // NOTE: the king is never captured, mate is scored separately
            PieceKind::Queen => 9.0,
            PieceKind::Bishop => 3.2,
            PieceKind::Knight => 3.0,
            PieceKind::Rook => 5.0,
            PieceKind::Pawn => 1.0,
        }
    }
}

#[derive(Clone, Copy, Hash, PartialEq, Eq)]
struct TranspositionKey {
    zobrist: u64,
    depth: u32,
}

impl TranspositionKey {
    fn new(zobrist: u64, depth: u32) -> Self {
        TranspositionKey { zobrist, depth }
    }
}

#[derive(Clone, Copy, PartialEq)]
struct SearchResult {
    best_move: Option<Move>,
    score: f32,
}

impl SearchResult {
    fn new(best_move: Option<Move>, score: f32) -> Self {
        SearchResult { best_move, score }
    }

    fn score(score: f32) -> Self {
        SearchResult {
            best_move: None,
            score,
        }
    }
}
