//! Applies a [MoveFeedback] from the engine to the [VisualBoard].
//!
//! The feedback is the only source of what changed. Nothing is inferred from the
//! pieces themselves, and check state, side to move and notation are re-read from
//! the engine after the pieces are moved.

use crate::{
    game::GameEngine,
    visual::{KingMark, MarkKind, VisualBoard},
    ApplyError, GameResult, MoveFeedback, PieceKind,
};

pub fn apply_feedback<E: GameEngine + ?Sized>(
    visual: &mut VisualBoard,
    engine: &E,
    feedback: &MoveFeedback,
) -> Result<(), ApplyError> {
    // check everything up front so a mismatch leaves the board untouched
    if visual.piece_at(feedback.origin).is_none() {
        return Err(ApplyError::MissingPiece(feedback.origin));
    }
    if let Some(castle) = feedback.castle {
        if visual.piece_at(castle.rook_from).is_none() {
            return Err(ApplyError::MissingPiece(castle.rook_from));
        }
    }
    if let Some(captured) = feedback.en_passant_capture {
        if visual.piece_at(captured).is_none() {
            return Err(ApplyError::MissingPiece(captured));
        }
    }

    let mover = visual
        .lift(feedback.origin)
        .ok_or(ApplyError::MissingPiece(feedback.origin))?;

    if feedback.is_capture {
        let captured_on = feedback.en_passant_capture.unwrap_or(feedback.destination);
        if visual.lift(captured_on).is_none() {
            log::warn!("capture on {captured_on} but the square was empty");
        }
    }

    if let Some(displaced) = visual.land(feedback.destination, mover) {
        log::warn!(
            "{} on {} was replaced without a capture",
            displaced.kind,
            feedback.destination
        );
    }

    if let Some(castle) = feedback.castle {
        let rook = visual
            .lift(castle.rook_from)
            .ok_or(ApplyError::MissingPiece(castle.rook_from))?;
        visual.land(castle.rook_to, rook);
    }

    if let Some(kind) = feedback.promotion {
        visual.promote(feedback.destination, kind);
    }

    refresh_indicators(visual, engine);
    visual.set_last_move(feedback.origin, feedback.destination);
    visual.set_notation(engine.to_fen());

    log::debug!(
        "applied {}{}{}",
        feedback.origin,
        feedback.destination,
        feedback
            .promotion
            .map(|kind| kind.letter().to_string())
            .unwrap_or_default()
    );
    Ok(())
}

/// Recomputes the check / checkmate mark on the king of the side to move.
pub fn refresh_indicators<E: GameEngine + ?Sized>(visual: &mut VisualBoard, engine: &E) {
    visual.set_mark(None);

    let state = engine.state();
    let kind = match state.result {
        Some(GameResult::Checkmate) => MarkKind::Checkmate,
        None if state.king_in_check => MarkKind::Check,
        _ => return,
    };

    let side = engine.side_to_move();
    let king = visual
        .king_square(side)
        .and_then(|square| visual.piece_at(square))
        .filter(|piece| piece.kind == PieceKind::King)
        .map(|piece| piece.id);

    match king {
        Some(piece) => visual.set_mark(Some(KingMark { kind, piece })),
        None => log::warn!("no {side} king on the board to mark"),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{game::LocalGame, Side, Square};

    fn sq(name: &str) -> Square {
        name.parse().unwrap()
    }

    fn setup(fen: &str) -> (LocalGame, VisualBoard) {
        let game = LocalGame::from_fen(fen).unwrap();
        let mut visual = VisualBoard::default();
        visual.rebuild(&game.pieces(), game.to_fen());
        (game, visual)
    }

    fn play(game: &mut LocalGame, visual: &mut VisualBoard, mve: &str) -> MoveFeedback {
        let feedback = game.feed_move(mve).unwrap();
        apply_feedback(visual, game, &feedback).unwrap();
        let mut expected = game.pieces();
        expected.sort();
        assert_eq!(visual.placement(), expected);
        feedback
    }

    #[test]
    fn quiet_move() {
        let (mut game, mut visual) =
            setup("rnbqkbnr/pppp1ppp/8/4p3/4P3/5N2/PPPP1PPP/RNBQKB1R b KQkq - 1 2");
        let knight = visual.piece_at(sq("b8")).unwrap().id;

        let feedback = play(&mut game, &mut visual, "b8c6");
        assert!(!feedback.is_capture);
        assert_eq!(feedback.castle, None);
        assert_eq!(feedback.promotion, None);

        assert_eq!(visual.piece_at(sq("b8")), None);
        assert_eq!(visual.piece_at(sq("c6")).unwrap().id, knight);
        assert_eq!(visual.last_move(), Some((sq("b8"), sq("c6"))));
        assert_eq!(visual.notation(), game.to_fen());
        assert_eq!(visual.mark(), None);
    }

    #[test]
    fn capture() {
        let (mut game, mut visual) =
            setup("rnbqkbnr/ppp1pppp/8/3p4/4P3/8/PPPP1PPP/RNBQKBNR w KQkq d6 0 2");
        let pawn = visual.piece_at(sq("e4")).unwrap().id;
        play(&mut game, &mut visual, "e4d5");
        assert_eq!(visual.square_of(pawn), Some(sq("d5")));
        assert_eq!(visual.placement().len(), 31);
    }

    #[test]
    fn en_passant_removes_passed_pawn() {
        let (mut game, mut visual) =
            setup("rnbqkbnr/ppp1p1pp/8/3pPp2/8/8/PPPP1PPP/RNBQKBNR w KQkq f6 0 3");
        let feedback = play(&mut game, &mut visual, "e5f6");
        assert_eq!(feedback.en_passant_capture, Some(sq("f5")));
        assert_eq!(visual.piece_at(sq("f5")), None);
        let pawn = visual.piece_at(sq("f6")).unwrap();
        assert_eq!((pawn.kind, pawn.side), (PieceKind::Pawn, Side::White));
        assert!(visual.piece_at(sq("d5")).is_some());
    }

    #[test]
    fn castling_moves_king_and_rook() {
        let (mut game, mut visual) = setup("r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1");
        play(&mut game, &mut visual, "e1g1");
        assert_eq!(visual.piece_at(sq("g1")).unwrap().kind, PieceKind::King);
        assert_eq!(visual.piece_at(sq("f1")).unwrap().kind, PieceKind::Rook);
        assert_eq!(visual.piece_at(sq("h1")), None);

        play(&mut game, &mut visual, "e8c8");
        assert_eq!(visual.piece_at(sq("c8")).unwrap().kind, PieceKind::King);
        assert_eq!(visual.piece_at(sq("d8")).unwrap().kind, PieceKind::Rook);
        assert_eq!(visual.piece_at(sq("a8")), None);
        assert_eq!(visual.piece_at(sq("e8")), None);
    }

    #[test]
    fn promotion_changes_kind() {
        let (mut game, mut visual) = setup("8/4P3/8/8/8/k7/8/4K3 w - - 0 1");
        let pawn = visual.piece_at(sq("e7")).unwrap().id;
        play(&mut game, &mut visual, "e7e8q");
        let queen = visual.piece_at(sq("e8")).unwrap();
        assert_eq!(queen.id, pawn);
        assert_eq!((queen.kind, queen.side), (PieceKind::Queen, Side::White));
        assert!(visual
            .placement()
            .iter()
            .all(|p| p.kind != PieceKind::Pawn));
    }

    #[test]
    fn check_and_mate_marks() {
        let (mut game, mut visual) = setup(crate::START_BOARD_FEN);
        play(&mut game, &mut visual, "e2e4");
        play(&mut game, &mut visual, "f7f6");
        play(&mut game, &mut visual, "d1h5");
        let king = visual.piece_at(sq("e8")).unwrap().id;
        assert_eq!(
            visual.mark(),
            Some(KingMark {
                kind: MarkKind::Check,
                piece: king
            })
        );

        play(&mut game, &mut visual, "g7g6");
        assert_eq!(visual.mark(), None);

        let (mut game, mut visual) = setup(crate::START_BOARD_FEN);
        for mve in ["f2f3", "e7e5", "g2g4", "d8h4"] {
            play(&mut game, &mut visual, mve);
        }
        assert_eq!(
            visual.marked_square(),
            Some((sq("e1"), MarkKind::Checkmate))
        );
    }

    #[test]
    fn mismatch_leaves_board_untouched() {
        let (mut game, mut visual) = setup(crate::START_BOARD_FEN);
        let feedback = game.feed_move("e2e4").unwrap();
        visual.lift(sq("e2"));
        let before = visual.placement();
        assert_eq!(
            apply_feedback(&mut visual, &game, &feedback),
            Err(ApplyError::MissingPiece(sq("e2")))
        );
        assert_eq!(visual.placement(), before);
    }
}
