//! The board controller ties the engine, the displayed board, the drag session and
//! the move sources together. Every change to the game goes through it.

use std::time::Duration;

use anyhow::Context;

use crate::{
    applier::{apply_feedback, refresh_indicators},
    config::Settings,
    drag::{DragEnd, DragSession},
    game::{GameEngine, LocalGame},
    geometry::{pixel_to_square, BoardRect},
    source::{MoveReply, MoveSources, PlayerConfig, RequestTag},
    visual::{VisualBoard, VisualPiece},
    FenError, MoveError, MoveFeedback, Result, Side, SourceError, Square,
};

/// Result of releasing the pointer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GestureOutcome {
    /// no drag was in progress
    Ignored,
    /// the piece went back to where it came from
    Cancelled,
    Played(MoveFeedback),
    Rejected(MoveError),
}

/// What happened to a reply from an automated move source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplyOutcome {
    Applied { side: Side, feedback: MoveFeedback },
    /// issued for a position or configuration that is no longer current
    Stale(RequestTag),
    Failed { side: Side, error: SourceError },
    Rejected { side: Side, error: MoveError },
}

pub struct BoardController<E: GameEngine> {
    engine: E,
    visual: VisualBoard,
    drag: DragSession,
    sources: MoveSources,
    rect: BoardRect,
    replaying: bool,
}

impl BoardController<LocalGame> {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let engine = LocalGame::from_fen(&settings.fen).context("loading initial position")?;
        let sources = MoveSources::new(settings).context("starting move sources")?;
        Ok(BoardController::new(engine, sources))
    }
}

impl<E: GameEngine> BoardController<E> {
    /// Builds the board from the engine's position. Nothing is scheduled until
    /// [BoardController::schedule] is called.
    pub fn new(engine: E, sources: MoveSources) -> Self {
        let mut controller = BoardController {
            engine,
            visual: VisualBoard::default(),
            drag: DragSession::default(),
            sources,
            rect: BoardRect::default(),
            replaying: false,
        };
        controller.resynchronize();
        controller
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn visual(&self) -> &VisualBoard {
        &self.visual
    }

    pub fn drag(&self) -> &DragSession {
        &self.drag
    }

    pub fn rect(&self) -> BoardRect {
        self.rect
    }

    pub fn set_rect(&mut self, rect: BoardRect) {
        self.rect = rect;
    }

    pub fn player(&self, side: Side) -> &PlayerConfig {
        self.sources.player(side)
    }

    pub fn is_replaying(&self) -> bool {
        self.replaying
    }

    pub fn has_pending_request(&self) -> bool {
        self.sources.has_pending()
    }

    /// Whether `piece` may be picked up right now.
    pub fn can_drag(&self, piece: &VisualPiece) -> bool {
        !self.replaying
            && !self.engine.state().is_terminal()
            && piece.side == self.engine.side_to_move()
            && self.sources.player(piece.side).is_human()
    }

    /// Starts a drag if the pointer is on a piece that may move. Returns whether it did.
    pub fn press(&mut self, x: f32, y: f32) -> bool {
        if self.drag.is_dragging() {
            return false;
        }
        let Some(square) = pixel_to_square(x, y, &self.rect) else {
            return false;
        };
        match self.visual.piece_at(square).copied() {
            Some(piece) if self.can_drag(&piece) => self.drag.start(square, piece, (x, y)),
            _ => false,
        }
    }

    pub fn pointer_moved(&mut self, x: f32, y: f32) {
        self.drag.move_to(x, y);
    }

    pub fn release(&mut self, x: f32, y: f32) -> GestureOutcome {
        match self.drag.finish(x, y, &self.rect) {
            DragEnd::Idle => GestureOutcome::Ignored,
            DragEnd::Cancelled { origin } => {
                log::debug!("drag from {origin} cancelled");
                GestureOutcome::Cancelled
            }
            DragEnd::Move(request) => match self.submit_move(&request.to_string()) {
                Ok(feedback) => GestureOutcome::Played(feedback),
                Err(error) => GestureOutcome::Rejected(error),
            },
        }
    }

    /// Drops the piece back on its origin, e.g. when the pointer leaves the window.
    pub fn cancel_drag(&mut self) -> Option<Square> {
        self.drag.cancel()
    }

    /// Plays `mve` for the side to move and schedules the next automated move.
    /// A rejected move leaves the board as it was.
    pub fn submit_move(&mut self, mve: &str) -> std::result::Result<MoveFeedback, MoveError> {
        let feedback = self.play_unscheduled(mve)?;
        self.schedule();
        Ok(feedback)
    }

    pub(crate) fn play_unscheduled(
        &mut self,
        mve: &str,
    ) -> std::result::Result<MoveFeedback, MoveError> {
        let feedback = match self.engine.feed_move(mve) {
            Ok(feedback) => feedback,
            Err(e) => {
                log::warn!("move {mve} rejected: {e}");
                return Err(e);
            }
        };

        if let Err(e) = apply_feedback(&mut self.visual, &self.engine, &feedback) {
            log::warn!("{e}, resynchronizing");
            self.resynchronize();
        }
        Ok(feedback)
    }

    /// Replaces the position and rebuilds the board. Ends a replay in progress and
    /// makes all outstanding requests stale.
    pub fn load_position(&mut self, fen: &str) -> std::result::Result<(), FenError> {
        self.resync_to(fen)?;
        self.replaying = false;
        self.schedule();
        Ok(())
    }

    pub(crate) fn resync_to(&mut self, fen: &str) -> std::result::Result<(), FenError> {
        if let Err(e) = self.engine.load_fen(fen) {
            log::warn!("could not load position: {e}");
            return Err(e);
        }
        log::info!("loaded position {fen}");
        self.sources.invalidate();
        self.drag.cancel();
        self.resynchronize();
        Ok(())
    }

    /// Rebuilds the displayed board from the engine's current position.
    pub fn resynchronize(&mut self) {
        self.visual
            .rebuild(&self.engine.pieces(), self.engine.to_fen());
        refresh_indicators(&mut self.visual, &self.engine);
    }

    pub(crate) fn begin_replay(&mut self, fen: &str) -> std::result::Result<(), FenError> {
        self.resync_to(fen)?;
        self.replaying = true;
        Ok(())
    }

    pub(crate) fn end_replay(&mut self) {
        if self.replaying {
            self.replaying = false;
            self.schedule();
        }
    }

    /// Changes who plays `side`. If it is that side's turn the new source is asked right away.
    pub fn configure(&mut self, side: Side, config: PlayerConfig) {
        if !config.is_human() && self.drag.dragged().map(|(p, _)| p.side) == Some(side) {
            self.drag.cancel();
        }
        self.sources.configure(side, config);
        if side == self.engine.side_to_move() {
            self.schedule();
        }
    }

    /// Asks the automated source of the side to move for a move.
    /// Returns whether a request is in flight afterwards.
    pub fn schedule(&mut self) -> bool {
        if self.replaying || self.engine.state().is_terminal() {
            return false;
        }
        let side = self.engine.side_to_move();
        if self.sources.player(side).is_human() {
            return false;
        }
        self.sources.request_move(side, self.engine.to_fen())
    }

    /// Handles every reply that already arrived.
    pub fn poll_sources(&mut self) -> Vec<ReplyOutcome> {
        let mut outcomes = Vec::new();
        while let Some(reply) = self.sources.try_next_reply() {
            outcomes.push(self.handle_reply(reply));
        }
        outcomes
    }

    /// Blocks up to `timeout` for one reply and handles it.
    pub fn wait_for_source(&mut self, timeout: Duration) -> Option<ReplyOutcome> {
        let reply = self.sources.wait_next_reply(timeout)?;
        Some(self.handle_reply(reply))
    }

    fn handle_reply(&mut self, reply: MoveReply) -> ReplyOutcome {
        let side = reply.tag.side;
        let fen = self.engine.to_fen();
        if self.replaying
            || !self
                .sources
                .is_current(&reply.tag, &fen, self.engine.side_to_move())
        {
            log::debug!("discarding stale reply for {side} in {}", reply.tag.fen);
            return ReplyOutcome::Stale(reply.tag);
        }

        match reply.result {
            Err(error) => {
                log::warn!("no move from {side}: {error}");
                ReplyOutcome::Failed { side, error }
            }
            Ok(mve) => match self.submit_move(&mve) {
                Ok(feedback) => ReplyOutcome::Applied { side, feedback },
                Err(error) => ReplyOutcome::Rejected { side, error },
            },
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{geometry::square_center, visual::MarkKind, START_BOARD_FEN};

    const WAIT: Duration = Duration::from_secs(10);

    fn sq(name: &str) -> Square {
        name.parse().unwrap()
    }

    fn controller(white: PlayerConfig, black: PlayerConfig) -> BoardController<LocalGame> {
        let settings = Settings {
            white,
            black,
            search_depth: 1,
            ..Settings::default()
        };
        BoardController::from_settings(&settings).unwrap()
    }

    fn drag(
        controller: &mut BoardController<LocalGame>,
        from: &str,
        to: &str,
    ) -> GestureOutcome {
        let rect = controller.rect();
        let (x, y) = square_center(sq(from), &rect);
        if !controller.press(x, y) {
            return GestureOutcome::Ignored;
        }
        let (x, y) = square_center(sq(to), &rect);
        controller.pointer_moved(x, y);
        controller.release(x, y)
    }

    #[test]
    fn human_drag_plays_move() {
        let mut controller = controller(PlayerConfig::human(), PlayerConfig::human());
        let outcome = drag(&mut controller, "g1", "f3");
        assert!(matches!(outcome, GestureOutcome::Played(_)));
        assert_eq!(controller.visual().last_move(), Some((sq("g1"), sq("f3"))));
        assert_eq!(controller.engine().side_to_move(), Side::Black);
        assert!(!controller.drag().is_dragging());
    }

    #[test]
    fn opponent_pieces_cannot_be_picked_up() {
        let mut controller = controller(PlayerConfig::human(), PlayerConfig::human());
        assert_eq!(drag(&mut controller, "e7", "e5"), GestureOutcome::Ignored);
        assert_eq!(drag(&mut controller, "e4", "e5"), GestureOutcome::Ignored);
    }

    #[test]
    fn illegal_drop_is_rejected() {
        let mut controller = controller(PlayerConfig::human(), PlayerConfig::human());
        let before = controller.visual().placement();
        assert!(matches!(
            drag(&mut controller, "e2", "e5"),
            GestureOutcome::Rejected(MoveError::Illegal(_))
        ));
        assert_eq!(controller.visual().placement(), before);
        assert_eq!(controller.engine().to_fen(), START_BOARD_FEN);
    }

    #[test]
    fn drop_outside_board_cancels() {
        let mut controller = controller(PlayerConfig::human(), PlayerConfig::human());
        let (x, y) = square_center(sq("e2"), &controller.rect());
        assert!(controller.press(x, y));
        assert!(!controller.press(x, y));
        assert_eq!(controller.release(-10.0, -10.0), GestureOutcome::Cancelled);
        assert_eq!(controller.engine().to_fen(), START_BOARD_FEN);
        assert_eq!(controller.release(x, y), GestureOutcome::Ignored);
    }

    #[test]
    fn automated_side_cannot_be_dragged() {
        let mut controller = controller(PlayerConfig::engine(), PlayerConfig::human());
        assert_eq!(drag(&mut controller, "e2", "e4"), GestureOutcome::Ignored);
    }

    #[test]
    fn engine_answers_human_move() {
        let mut controller = controller(PlayerConfig::human(), PlayerConfig::engine());
        assert!(matches!(
            drag(&mut controller, "e2", "e4"),
            GestureOutcome::Played(_)
        ));
        assert!(controller.has_pending_request());

        let outcome = controller.wait_for_source(WAIT).unwrap();
        assert!(matches!(
            outcome,
            ReplyOutcome::Applied {
                side: Side::Black,
                ..
            }
        ));
        assert_eq!(controller.engine().side_to_move(), Side::White);
        assert!(!controller.has_pending_request());
        let mut expected = controller.engine().pieces();
        expected.sort();
        assert_eq!(controller.visual().placement(), expected);
    }

    #[test]
    fn configuring_side_to_move_triggers_request() {
        let mut controller = controller(PlayerConfig::human(), PlayerConfig::human());
        assert!(!controller.schedule());
        controller.configure(Side::White, PlayerConfig::engine());
        assert!(controller.has_pending_request());
        assert!(matches!(
            controller.wait_for_source(WAIT),
            Some(ReplyOutcome::Applied {
                side: Side::White,
                ..
            })
        ));
    }

    #[test]
    fn load_makes_outstanding_reply_stale() {
        let mut controller = controller(PlayerConfig::engine(), PlayerConfig::human());
        assert!(controller.schedule());
        let fen = "rnbqkbnr/pppp1ppp/8/4p3/4P3/8/PPPP1PPP/RNBQKBNR w KQkq e6 0 2";
        controller.load_position(fen).unwrap();

        // the reply to the first request is stale, the second one applies
        let mut applied = 0;
        let mut stale = 0;
        while applied == 0 {
            match controller.wait_for_source(WAIT).unwrap() {
                ReplyOutcome::Stale(tag) => {
                    assert_eq!(tag.fen, START_BOARD_FEN);
                    stale += 1;
                }
                ReplyOutcome::Applied { .. } => applied += 1,
                other => panic!("unexpected {other:?}"),
            }
        }
        assert_eq!(stale, 1);
        assert_eq!(controller.engine().side_to_move(), Side::Black);
    }

    #[test]
    fn bad_position_keeps_board() {
        let mut controller = controller(PlayerConfig::human(), PlayerConfig::human());
        assert!(controller.load_position("8/8/8/8 w - - 0 1").is_err());
        assert_eq!(controller.engine().to_fen(), START_BOARD_FEN);
        assert_eq!(controller.visual().placement().len(), 32);
    }

    #[test]
    fn position_with_capturable_king_is_refused() {
        let mut controller = controller(PlayerConfig::human(), PlayerConfig::human());
        assert!(controller
            .load_position("4k3/4Q3/8/8/8/8/8/4K3 w - - 0 1")
            .is_err());
        assert!(controller
            .load_position("4k3/8/8/3PP3/8/8/8/4K3 w - e6 0 1")
            .is_err());
        assert_eq!(controller.engine().to_fen(), START_BOARD_FEN);
        assert_eq!(controller.visual().placement().len(), 32);
    }

    #[test]
    fn loading_mated_position_marks_king() {
        let mut controller = controller(PlayerConfig::human(), PlayerConfig::engine());
        controller
            .load_position("rnb1kbnr/pppp1ppp/8/4p3/6Pq/5P2/PPPPP2P/RNBQKBNR w KQkq - 1 3")
            .unwrap();
        assert_eq!(
            controller.visual().marked_square(),
            Some((sq("e1"), MarkKind::Checkmate))
        );
        assert!(!controller.schedule());
    }
}
