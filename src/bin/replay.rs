use std::time::Duration;

use anyhow::{bail, Context};
use chessboard::{
    config::Args,
    controller::{BoardController, ReplyOutcome},
    game::GameEngine,
    replay::{ReplayDriver, ReplayScript},
    Piece, Square,
};
use clap::Parser;

/// Replays a `position ...` command on a headless board and prints the result.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    /// e.g. "position startpos moves e2e4 e7e5"
    command: String,
    /// Let the automated sources play this many moves after the replay
    #[arg(long, default_value_t = 0)]
    continue_moves: u32,
    #[command(flatten)]
    args: Args,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    let settings = cli.args.into_settings();
    let script: ReplayScript = cli.command.parse().context("parsing replay command")?;

    let mut controller = BoardController::from_settings(&settings)?;
    ReplayDriver::start(&mut controller, script, settings.replay_delay)?
        .run_to_end(&mut controller)?;

    let timeout = settings.request_timeout + Duration::from_secs(60);
    for _ in 0..cli.continue_moves {
        if !controller.has_pending_request() && !controller.schedule() {
            println!("{} does not play automatically, stopping", controller.engine().side_to_move());
            break;
        }
        match controller.wait_for_source(timeout) {
            Some(ReplyOutcome::Applied { side, feedback }) => {
                println!("{side} played {}{}", feedback.origin, feedback.destination)
            }
            Some(ReplyOutcome::Stale(_)) => {}
            Some(ReplyOutcome::Failed { side, error }) => bail!("{side} produced no move: {error}"),
            Some(ReplyOutcome::Rejected { side, error }) => bail!("{side} sent a bad move: {error}"),
            None => bail!("no reply within {timeout:?}"),
        }
    }

    print_board(&controller);
    Ok(())
}

fn print_board<E: GameEngine>(controller: &BoardController<E>) {
    let visual = controller.visual();
    for rank in (0..8).rev() {
        let row: String = (0..8)
            .filter_map(|file| Square::new(file, rank))
            .map(|square| match visual.piece_at(square) {
                Some(piece) => Piece::new(piece.kind, piece.side).fen_char(),
                None => '.',
            })
            .collect();
        println!("{} {row}", rank + 1);
    }
    println!("  abcdefgh");

    if let Some((origin, destination)) = visual.last_move() {
        println!("last move: {origin}{destination}");
    }
    if let Some((square, mark)) = visual.marked_square() {
        println!("{mark:?} on {square}");
    }
    println!("{}", visual.notation());
}
