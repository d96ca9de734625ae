//! Pointer gesture tracking: `Idle -> Dragging -> Idle`.
//!
//! Whether a piece may be picked up at all is decided by the controller, the
//! session only turns a finished gesture into a move request or a cancel.

use crate::{
    geometry::{pixel_to_square, BoardRect},
    visual::VisualPiece,
    MoveRequest, PieceKind, Square,
};

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum DragSession {
    #[default]
    Idle,
    Dragging {
        origin: Square,
        piece: VisualPiece,
        pointer: (f32, f32),
    },
}

/// How a gesture ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragEnd {
    /// there was no gesture in progress
    Idle,
    /// the piece goes back to `origin`, no move is requested
    Cancelled { origin: Square },
    Move(MoveRequest),
}

impl DragSession {
    /// Begins dragging `piece` from `origin`. A gesture already in progress is kept
    /// and `false` returned, it has to end before a new one can start.
    pub fn start(&mut self, origin: Square, piece: VisualPiece, pointer: (f32, f32)) -> bool {
        if self.is_dragging() {
            return false;
        }
        *self = DragSession::Dragging {
            origin,
            piece,
            pointer,
        };
        true
    }

    pub fn move_to(&mut self, x: f32, y: f32) {
        if let DragSession::Dragging { pointer, .. } = self {
            *pointer = (x, y);
        }
    }

    pub fn finish(&mut self, x: f32, y: f32, rect: &BoardRect) -> DragEnd {
        let (origin, piece) = match std::mem::take(self) {
            DragSession::Idle => return DragEnd::Idle,
            DragSession::Dragging { origin, piece, .. } => (origin, piece),
        };

        let destination = match pixel_to_square(x, y, rect) {
            Some(destination) if destination != origin => destination,
            _ => return DragEnd::Cancelled { origin },
        };

        // no under-promotion from a gesture
        let promotion = (piece.kind == PieceKind::Pawn
            && (destination.rank() == 0 || destination.rank() == 7))
            .then_some(PieceKind::Queen);

        DragEnd::Move(MoveRequest {
            origin,
            destination,
            promotion,
        })
    }

    /// Ends the gesture without a move. Returns the origin if one was in progress.
    pub fn cancel(&mut self) -> Option<Square> {
        match std::mem::take(self) {
            DragSession::Idle => None,
            DragSession::Dragging { origin, .. } => Some(origin),
        }
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self, DragSession::Dragging { .. })
    }

    pub fn origin(&self) -> Option<Square> {
        match self {
            DragSession::Idle => None,
            DragSession::Dragging { origin, .. } => Some(*origin),
        }
    }

    /// The dragged piece and where the pointer currently is.
    pub fn dragged(&self) -> Option<(VisualPiece, (f32, f32))> {
        match self {
            DragSession::Idle => None,
            DragSession::Dragging { piece, pointer, .. } => Some((*piece, *pointer)),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{geometry::square_center, Side};

    fn sq(name: &str) -> Square {
        name.parse().unwrap()
    }

    fn piece(kind: PieceKind) -> VisualPiece {
        VisualPiece {
            id: 7,
            kind,
            side: Side::White,
        }
    }

    fn drag(kind: PieceKind, from: &str, to: &str) -> DragEnd {
        let rect = BoardRect::default();
        let mut session = DragSession::default();
        assert!(session.start(sq(from), piece(kind), square_center(sq(from), &rect)));
        let (x, y) = square_center(sq(to), &rect);
        session.move_to(x, y);
        let end = session.finish(x, y, &rect);
        assert!(!session.is_dragging());
        end
    }

    #[test]
    fn drop_on_other_square_is_a_move() {
        assert_eq!(
            drag(PieceKind::Knight, "g1", "f3"),
            DragEnd::Move("g1f3".parse().unwrap())
        );
    }

    #[test]
    fn pawn_to_last_rank_promotes_to_queen() {
        assert_eq!(
            drag(PieceKind::Pawn, "e7", "e8"),
            DragEnd::Move("e7e8q".parse().unwrap())
        );
        assert_eq!(
            drag(PieceKind::Pawn, "d2", "c1"),
            DragEnd::Move("d2c1q".parse().unwrap())
        );
        assert_eq!(
            drag(PieceKind::Rook, "e7", "e8"),
            DragEnd::Move("e7e8".parse().unwrap())
        );
    }

    #[test]
    fn cancelled_gestures() {
        assert_eq!(
            drag(PieceKind::Pawn, "e2", "e2"),
            DragEnd::Cancelled { origin: sq("e2") }
        );

        let rect = BoardRect::default();
        let mut session = DragSession::default();
        session.start(sq("e2"), piece(PieceKind::Pawn), (0.0, 0.0));
        assert_eq!(
            session.finish(-5.0, 100.0, &rect),
            DragEnd::Cancelled { origin: sq("e2") }
        );
        assert_eq!(session.finish(10.0, 10.0, &rect), DragEnd::Idle);
    }

    #[test]
    fn second_start_is_rejected() {
        let mut session = DragSession::default();
        assert!(session.start(sq("e2"), piece(PieceKind::Pawn), (0.0, 0.0)));
        assert!(!session.start(sq("d2"), piece(PieceKind::Pawn), (0.0, 0.0)));
        assert_eq!(session.origin(), Some(sq("e2")));
        assert_eq!(session.cancel(), Some(sq("e2")));
        assert_eq!(session.cancel(), None);
    }
}
