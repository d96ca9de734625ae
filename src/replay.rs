//! Replays a `position ... moves ...` command onto the board one move at a time.
//!
//! Replayed moves go through the same engine and applier path as interactive ones
//! but never schedule automated sources. Scheduling resumes once the replay ends.

use std::{collections::VecDeque, str::FromStr, thread, time::Duration};

use anyhow::Context;

use crate::{
    controller::BoardController, game::GameEngine, CommandError, MoveRequest, Result,
    START_BOARD_FEN,
};

/// A parsed `position (startpos | fen <6 fields>) [moves <move>...]` command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplayScript {
    /// `None` for `startpos`
    pub fen: Option<String>,
    pub moves: Vec<MoveRequest>,
}

impl ReplayScript {
    pub fn fen(&self) -> &str {
        self.fen.as_deref().unwrap_or(START_BOARD_FEN)
    }
}

impl FromStr for ReplayScript {
    type Err = CommandError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let mut tokens = s.split_whitespace().peekable();

        match tokens.next() {
            None => return Err(CommandError::Empty),
            Some("position") => {}
            Some(other) => return Err(CommandError::UnknownCommand(other.to_string())),
        }

        let fen = match tokens.next() {
            None => return Err(CommandError::MissingSubcommand("'startpos' or 'fen'")),
            Some("startpos") => None,
            Some("fen") => {
                let mut fields = Vec::with_capacity(6);
                while fields.len() < 6 {
                    match tokens.peek() {
                        Some(&"moves") | None => break,
                        Some(field) => {
                            fields.push(*field);
                            tokens.next();
                        }
                    }
                }
                if fields.len() < 6 {
                    return Err(CommandError::IncompleteFen(fields.len()));
                }
                Some(fields.join(" "))
            }
            Some(other) => return Err(CommandError::UnexpectedToken(other.to_string())),
        };

        let moves = match tokens.next() {
            None => Vec::new(),
            Some("moves") => tokens
                .map(|mve| mve.parse::<MoveRequest>())
                .collect::<std::result::Result<_, _>>()
                .map_err(CommandError::BadMove)?,
            Some(other) => return Err(CommandError::UnexpectedToken(other.to_string())),
        };

        Ok(ReplayScript { fen, moves })
    }
}

#[derive(Debug)]
pub struct ReplayDriver {
    queue: VecDeque<MoveRequest>,
    delay: Duration,
    played: usize,
}

impl ReplayDriver {
    /// Loads the script's position and blocks scheduling until the replay ends.
    pub fn start<E: GameEngine>(
        controller: &mut BoardController<E>,
        script: ReplayScript,
        delay: Duration,
    ) -> Result<Self> {
        controller
            .begin_replay(script.fen())
            .context("loading replay position")?;
        log::info!("replaying {} moves", script.moves.len());

        let driver = ReplayDriver {
            queue: script.moves.into(),
            delay,
            played: 0,
        };
        if driver.queue.is_empty() {
            controller.end_replay();
        }
        Ok(driver)
    }

    pub fn remaining(&self) -> usize {
        self.queue.len()
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Plays the next move. Returns how long to wait before the following step,
    /// or `None` once the replay is over.
    ///
    /// A move the engine rejects ends the replay with an error.
    pub fn step<E: GameEngine>(
        &mut self,
        controller: &mut BoardController<E>,
    ) -> Result<Option<Duration>> {
        if !controller.is_replaying() {
            // a position load interrupted us
            self.queue.clear();
            return Ok(None);
        }

        let Some(mve) = self.queue.pop_front() else {
            controller.end_replay();
            return Ok(None);
        };

        let result = controller.play_unscheduled(&mve.to_string());
        self.played += 1;
        if let Err(e) = result {
            self.queue.clear();
            controller.end_replay();
            return Err(e).with_context(|| format!("replaying move {} ({mve})", self.played));
        }

        if self.queue.is_empty() {
            log::info!("replay finished after {} moves", self.played);
            controller.end_replay();
            Ok(None)
        } else {
            Ok(Some(self.delay))
        }
    }

    /// Steps until the end, sleeping the configured delay between moves.
    pub fn run_to_end<E: GameEngine>(mut self, controller: &mut BoardController<E>) -> Result<()> {
        while let Some(delay) = self.step(controller)? {
            if !delay.is_zero() {
                thread::sleep(delay);
            }
        }
        Ok(())
    }
}
