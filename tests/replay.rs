use std::time::Duration;

use chessboard::config::Settings;
use chessboard::controller::{BoardController, ReplyOutcome};
use chessboard::game::{GameEngine, LocalGame};
use chessboard::replay::{ReplayDriver, ReplayScript};
use chessboard::source::PlayerConfig;
use chessboard::visual::MarkKind;
use chessboard::{CommandError, PieceKind, Side, Square};

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

fn replay(controller: &mut BoardController<LocalGame>, command: &str) -> anyhow::Result<()> {
    let script: ReplayScript = command.parse()?;
    ReplayDriver::start(controller, script, Duration::ZERO)?.run_to_end(controller)
}

#[test]
fn queen_sortie_without_check() {
    let mut controller = controller(PlayerConfig::human(), PlayerConfig::human());
    replay(&mut controller, "position startpos moves e2e4 e7e5 d1h5").unwrap();

    let queen = controller.visual().piece_at(sq("h5")).unwrap();
    assert_eq!((queen.kind, queen.side), (PieceKind::Queen, Side::White));
    // f7 still covers the black king
    assert_eq!(controller.visual().mark(), None);
    assert_eq!(controller.visual().last_move(), Some((sq("d1"), sq("h5"))));
    assert!(!controller.is_replaying());
}

#[test]
fn queen_sortie_with_check() {
    let mut controller = controller(PlayerConfig::human(), PlayerConfig::human());
    replay(&mut controller, "position startpos moves e2e4 f7f6 d1h5").unwrap();
    assert_eq!(
        controller.visual().marked_square(),
        Some((sq("e8"), MarkKind::Check))
    );
}

#[test]
fn replay_from_fen() {
    let mut controller = controller(PlayerConfig::human(), PlayerConfig::human());
    replay(
        &mut controller,
        "position fen r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1 moves e1c1 e8g8",
    )
    .unwrap();
    let visual = controller.visual();
    assert_eq!(visual.piece_at(sq("c1")).unwrap().kind, PieceKind::King);
    assert_eq!(visual.piece_at(sq("d1")).unwrap().kind, PieceKind::Rook);
    assert_eq!(visual.piece_at(sq("g8")).unwrap().kind, PieceKind::King);
    assert_eq!(visual.piece_at(sq("f8")).unwrap().kind, PieceKind::Rook);
}

#[test]
fn malformed_command_is_an_error() {
    let mut controller = controller(PlayerConfig::human(), PlayerConfig::human());
    let err = replay(&mut controller, "position sideways").unwrap_err();
    assert_eq!(
        err.downcast_ref::<CommandError>(),
        Some(&CommandError::UnexpectedToken("sideways".to_string()))
    );
    assert_eq!(controller.engine().to_fen(), chessboard::START_BOARD_FEN);
}

#[test]
fn illegal_move_stops_replay() {
    let mut controller = controller(PlayerConfig::human(), PlayerConfig::human());
    let err = replay(&mut controller, "position startpos moves e2e4 e7e5 e4e5 d7d5").unwrap_err();
    assert!(format!("{err:#}").contains("e4e5"));
    assert!(!controller.is_replaying());
    assert_eq!(controller.visual().last_move(), Some((sq("e7"), sq("e5"))));
}

#[test]
fn engine_waits_for_replay_to_finish() {
    let mut controller = controller(PlayerConfig::human(), PlayerConfig::engine());
    let script: ReplayScript = "position startpos moves e2e4 e7e5 g1f3".parse().unwrap();
    let mut driver = ReplayDriver::start(&mut controller, script, Duration::from_millis(1)).unwrap();

    // black is to move after e2e4, but nothing is asked mid replay
    assert_eq!(driver.step(&mut controller).unwrap(), Some(Duration::from_millis(1)));
    assert!(!controller.has_pending_request());
    assert!(!controller.schedule());

    assert!(driver.step(&mut controller).unwrap().is_some());
    assert_eq!(driver.step(&mut controller).unwrap(), None);
    assert_eq!(driver.remaining(), 0);

    // the replay ended on black's turn, so the engine starts right away
    assert!(controller.has_pending_request());
    let outcome = controller.wait_for_source(Duration::from_secs(10)).unwrap();
    assert!(matches!(outcome, ReplyOutcome::Applied { side: Side::Black, .. }));
}

#[test]
fn loading_a_position_interrupts_replay() {
    let mut controller = controller(PlayerConfig::human(), PlayerConfig::human());
    let script: ReplayScript = "position startpos moves e2e4 e7e5 g1f3".parse().unwrap();
    let mut driver = ReplayDriver::start(&mut controller, script, Duration::ZERO).unwrap();
    driver.step(&mut controller).unwrap();

    controller.load_position(chessboard::START_BOARD_FEN).unwrap();
    assert_eq!(driver.step(&mut controller).unwrap(), None);
    assert_eq!(controller.engine().to_fen(), chessboard::START_BOARD_FEN);
}
