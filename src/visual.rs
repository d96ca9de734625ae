//! The displayed board: one slot per square, each holding at most one piece.
//!
//! Only the move applier and [VisualBoard::rebuild] change piece placement.

use crate::{PieceKind, PlacedPiece, Side, Square};

pub type PieceId = u32;

/// A piece as drawn. The id survives moves and promotion, it only changes on rebuild.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VisualPiece {
    pub id: PieceId,
    pub kind: PieceKind,
    pub side: Side,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkKind {
    Check,
    Checkmate,
}

/// Check or checkmate indicator attached to a king.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KingMark {
    pub kind: MarkKind,
    pub piece: PieceId,
}

#[derive(Debug, Clone)]
pub struct VisualBoard {
    slots: [Option<VisualPiece>; 64],
    next_id: PieceId,
    last_move: Option<(Square, Square)>,
    mark: Option<KingMark>,
    notation: String,
}

impl Default for VisualBoard {
    fn default() -> Self {
        VisualBoard {
            slots: [None; 64],
            next_id: 0,
            last_move: None,
            mark: None,
            notation: String::new(),
        }
    }
}

impl VisualBoard {
    /// Discards all pieces and indicators and creates fresh pieces for `pieces`.
    pub fn rebuild(&mut self, pieces: &[PlacedPiece], notation: String) {
        self.slots = [None; 64];
        self.last_move = None;
        self.mark = None;
        self.notation = notation;

        for placed in pieces {
            let piece = VisualPiece {
                id: self.next_id,
                kind: placed.kind,
                side: placed.side,
            };
            self.next_id += 1;
            if self.slots[placed.square.index()].replace(piece).is_some() {
                log::warn!("two pieces placed on {}, keeping the last", placed.square);
            }
        }
    }

    pub fn piece_at(&self, square: Square) -> Option<&VisualPiece> {
        self.slots[square.index()].as_ref()
    }

    /// Removes the piece on `square` from the board and hands it to the caller.
    pub fn lift(&mut self, square: Square) -> Option<VisualPiece> {
        self.slots[square.index()].take()
    }

    /// Puts `piece` on `square`, returning whatever was there before.
    pub fn land(&mut self, square: Square, piece: VisualPiece) -> Option<VisualPiece> {
        self.slots[square.index()].replace(piece)
    }

    /// Changes the kind of the piece on `square`. Returns false if the square is empty.
    pub fn promote(&mut self, square: Square, kind: PieceKind) -> bool {
        match self.slots[square.index()].as_mut() {
            Some(piece) => {
                piece.kind = kind;
                true
            }
            None => false,
        }
    }

    /// All pieces, sorted by square.
    pub fn placement(&self) -> Vec<PlacedPiece> {
        Square::all()
            .filter_map(|square| {
                self.piece_at(square).map(|piece| PlacedPiece {
                    square,
                    kind: piece.kind,
                    side: piece.side,
                })
            })
            .collect()
    }

    pub fn square_of(&self, id: PieceId) -> Option<Square> {
        Square::all().find(|square| self.piece_at(*square).map(|p| p.id) == Some(id))
    }

    pub fn king_square(&self, side: Side) -> Option<Square> {
        Square::all().find(|square| {
            self.piece_at(*square)
                .map(|p| p.kind == PieceKind::King && p.side == side)
                .unwrap_or(false)
        })
    }

    pub fn mark(&self) -> Option<KingMark> {
        self.mark
    }

    /// Square of the marked king, if any.
    pub fn marked_square(&self) -> Option<(Square, MarkKind)> {
        let mark = self.mark?;
        self.square_of(mark.piece).map(|square| (square, mark.kind))
    }

    pub fn set_mark(&mut self, mark: Option<KingMark>) {
        self.mark = mark;
    }

    pub fn last_move(&self) -> Option<(Square, Square)> {
        self.last_move
    }

    pub fn set_last_move(&mut self, origin: Square, destination: Square) {
        self.last_move = Some((origin, destination));
    }

    pub fn is_highlighted(&self, square: Square) -> bool {
        match self.last_move {
            Some((origin, destination)) => square == origin || square == destination,
            None => false,
        }
    }

    pub fn notation(&self) -> &str {
        &self.notation
    }

    pub fn set_notation(&mut self, notation: String) {
        self.notation = notation;
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::Board;

    fn sq(name: &str) -> Square {
        name.parse().unwrap()
    }

    #[test]
    fn rebuild_matches_board() {
        let board = Board::default();
        let mut visual = VisualBoard::default();
        visual.rebuild(&board.pieces(), board.generate_fen());

        let mut expected = board.pieces();
        expected.sort();
        assert_eq!(visual.placement(), expected);
        assert_eq!(visual.notation(), board.generate_fen());
        assert_eq!(visual.king_square(Side::Black), Some(sq("e8")));
    }

    #[test]
    fn rebuild_twice_is_identical() {
        let board = Board::default();
        let mut visual = VisualBoard::default();
        visual.rebuild(&board.pieces(), board.generate_fen());
        let first = visual.placement();
        visual.set_last_move(sq("e2"), sq("e4"));
        visual.rebuild(&board.pieces(), board.generate_fen());
        assert_eq!(visual.placement(), first);
        assert_eq!(visual.last_move(), None);
        assert_eq!(visual.mark(), None);
    }

    #[test]
    fn pieces_keep_their_id() {
        let board = Board::default();
        let mut visual = VisualBoard::default();
        visual.rebuild(&board.pieces(), String::new());

        let pawn = visual.lift(sq("e7")).unwrap();
        assert_eq!(visual.piece_at(sq("e7")), None);
        assert_eq!(visual.land(sq("e8"), pawn).map(|p| p.kind), Some(PieceKind::King));
        assert!(visual.promote(sq("e8"), PieceKind::Queen));
        assert_eq!(visual.square_of(pawn.id), Some(sq("e8")));
        assert_eq!(visual.piece_at(sq("e8")).unwrap().kind, PieceKind::Queen);
        assert!(!visual.promote(sq("e5"), PieceKind::Queen));
    }

    #[test]
    fn highlight() {
        let mut visual = VisualBoard::default();
        assert!(!visual.is_highlighted(sq("e2")));
        visual.set_last_move(sq("e2"), sq("e4"));
        assert!(visual.is_highlighted(sq("e2")));
        assert!(visual.is_highlighted(sq("e4")));
        assert!(!visual.is_highlighted(sq("e3")));
    }
}
