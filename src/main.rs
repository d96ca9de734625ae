mod board_view;

use std::time::Duration;

use board_view::{board_view, BoardEvent, PointerAction};
use chessboard::{
    config::{Args, Settings},
    controller::{BoardController, GestureOutcome, ReplyOutcome},
    game::{GameEngine, LocalGame},
    replay::{ReplayDriver, ReplayScript},
    source::{PlayerConfig, SourceKind},
    GameResult, Side, START_BOARD_FEN,
};
use clap::Parser;
use iced::{
    clipboard,
    widget::{button, container, pick_list, text, text_input},
    Alignment, Application, Command, Element, Length, Subscription,
};
use iced_native::{
    column,
    widget::{Column, Row},
};

const POLL_INTERVAL: Duration = Duration::from_millis(50);
const BOARD_LENGTH: f32 = 640.0;
/// `time::every` does not accept a zero interval
const MIN_TICK: Duration = Duration::from_millis(1);

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let settings = Args::parse().into_settings();
    let controller = BoardController::from_settings(&settings)?;

    Game::run(iced::Settings::with_flags(GameInitialization {
        controller,
        settings,
    }))?;
    Ok(())
}

struct GameInitialization {
    controller: BoardController<LocalGame>,
    settings: Settings,
}

struct Game {
    controller: BoardController<LocalGame>,
    settings: Settings,
    endpoints: [String; 2],
    replay: Option<ReplayDriver>,
    status: String,
}

#[derive(Debug, Clone)]
enum Message {
    Board(BoardEvent),
    PollSources,
    SourceSelected(Side, SourceKind),
    EndpointChanged(Side, String),
    EndpointSubmitted(Side),
    CopyFen,
    LoadFen,
    FenRead(Option<String>),
    Replay,
    ReplayRead(Option<String>),
    ReplayStep,
    RestartGame,
}

impl Game {
    fn handle_board_event(&mut self, event: BoardEvent) {
        self.controller.set_rect(event.rect);
        match event.action {
            PointerAction::Pressed => {
                self.controller.press(event.x, event.y);
            }
            PointerAction::Moved => self.controller.pointer_moved(event.x, event.y),
            PointerAction::Released => match self.controller.release(event.x, event.y) {
                GestureOutcome::Played(_) => self.status.clear(),
                GestureOutcome::Rejected(e) => self.status = e.to_string(),
                GestureOutcome::Ignored | GestureOutcome::Cancelled => {}
            },
            PointerAction::Lost => {
                self.controller.cancel_drag();
            }
        }
    }

    fn configure(&mut self, side: Side, kind: SourceKind) {
        let endpoint = self.endpoints[side.index()].trim();
        let config = PlayerConfig {
            kind,
            endpoint: (!endpoint.is_empty()).then(|| endpoint.to_string()),
        };
        self.controller.configure(side, config);
    }

    fn load_fen(&mut self, fen: &str) {
        self.replay = None;
        match self.controller.load_position(fen.trim()) {
            Ok(()) => self.status.clear(),
            Err(e) => self.status = e.to_string(),
        }
    }

    fn start_replay(&mut self, command: &str) {
        let script: ReplayScript = match command.parse() {
            Ok(script) => script,
            Err(e) => {
                log::warn!("could not parse replay command: {e}");
                self.status = e.to_string();
                return;
            }
        };

        match ReplayDriver::start(&mut self.controller, script, self.settings.replay_delay) {
            Ok(driver) => {
                self.status.clear();
                self.replay = (driver.remaining() > 0).then_some(driver);
            }
            Err(e) => self.status = format!("{e:#}"),
        }
    }

    fn step_replay(&mut self) {
        let Some(driver) = self.replay.as_mut() else {
            return;
        };

        match driver.step(&mut self.controller) {
            Ok(Some(_)) => {}
            Ok(None) => self.replay = None,
            Err(e) => {
                log::warn!("replay stopped: {e:#}");
                self.status = format!("{e:#}");
                self.replay = None;
            }
        }
    }

    fn game_status(&self) -> String {
        let engine = self.controller.engine();
        let side = engine.side_to_move();
        match engine.state().result {
            Some(GameResult::Checkmate) => format!("Checkmate, {} wins", !side),
            Some(GameResult::Stalemate) => "Draw by stalemate".to_string(),
            Some(GameResult::FiftyMoveRule) => "Draw by the fifty move rule".to_string(),
            Some(GameResult::Repetition) => "Draw by repetition".to_string(),
            None if self.controller.is_replaying() => "Replaying...".to_string(),
            None if self.controller.has_pending_request() => format!("{side} is thinking..."),
            None => format!("{side} to move"),
        }
    }

    fn player_controls(&self, side: Side) -> Element<'_, Message> {
        let player = self.controller.player(side);
        let mut controls = Column::new()
            .spacing(5)
            .push(text(side.to_string()).size(24))
            .push(pick_list(
                SourceKind::ALL.to_vec(),
                Some(player.kind),
                move |kind| Message::SourceSelected(side, kind),
            ));
        if player.kind == SourceKind::Remote {
            controls = controls.push(
                text_input("http://localhost:8080/move", &self.endpoints[side.index()])
                    .on_input(move |endpoint| Message::EndpointChanged(side, endpoint))
                    .on_submit(Message::EndpointSubmitted(side))
                    .width(Length::Fixed(260.0)),
            );
        }
        controls.into()
    }
}

impl Application for Game {
    type Executor = iced::executor::Default;

    type Message = Message;

    type Theme = iced::Theme;

    type Flags = GameInitialization;

    fn new(flags: GameInitialization) -> (Self, Command<Self::Message>) {
        let endpoints = Side::ALL_SIDES.map(|side| {
            flags
                .settings
                .player(side)
                .endpoint
                .clone()
                .unwrap_or_default()
        });

        let mut game = Game {
            controller: flags.controller,
            settings: flags.settings,
            endpoints,
            replay: None,
            status: String::new(),
        };
        game.controller.schedule();
        (game, Command::none())
    }

    fn title(&self) -> String {
        "Chessboard".to_string()
    }

    fn update(&mut self, message: Self::Message) -> Command<Message> {
        match message {
            Message::Board(event) => {
                self.handle_board_event(event);
                Command::none()
            }
            Message::PollSources => {
                for outcome in self.controller.poll_sources() {
                    match outcome {
                        ReplyOutcome::Failed { side, error } => {
                            self.status = format!("{side}: {error}")
                        }
                        ReplyOutcome::Rejected { side, error } => {
                            self.status = format!("{side}: {error}")
                        }
                        ReplyOutcome::Applied { .. } => self.status.clear(),
                        ReplyOutcome::Stale(_) => {}
                    }
                }
                Command::none()
            }
            Message::SourceSelected(side, kind) => {
                self.configure(side, kind);
                Command::none()
            }
            Message::EndpointChanged(side, endpoint) => {
                self.endpoints[side.index()] = endpoint;
                Command::none()
            }
            Message::EndpointSubmitted(side) => {
                let kind = self.controller.player(side).kind;
                self.configure(side, kind);
                Command::none()
            }
            Message::CopyFen => {
                let fen = self.controller.engine().to_fen();
                log::info!("copied fen {fen}");
                clipboard::write(fen)
            }
            Message::LoadFen => clipboard::read(Message::FenRead),
            Message::FenRead(Some(fen)) => {
                self.load_fen(&fen);
                Command::none()
            }
            Message::Replay => clipboard::read(Message::ReplayRead),
            Message::ReplayRead(Some(command)) => {
                self.start_replay(&command);
                Command::none()
            }
            Message::FenRead(None) | Message::ReplayRead(None) => {
                self.status = "Empty clipboard!".to_string();
                Command::none()
            }
            Message::ReplayStep => {
                self.step_replay();
                Command::none()
            }
            Message::RestartGame => {
                self.load_fen(START_BOARD_FEN);
                Command::none()
            }
        }
    }

    /// Ticks while an automated source is thinking or a replay is running.
    fn subscription(&self) -> Subscription<Message> {
        let poll = if self.controller.has_pending_request() {
            iced::time::every(POLL_INTERVAL).map(|_| Message::PollSources)
        } else {
            Subscription::none()
        };
        let replay = match &self.replay {
            Some(driver) => {
                iced::time::every(driver.delay().max(MIN_TICK)).map(|_| Message::ReplayStep)
            }
            None => Subscription::none(),
        };
        Subscription::batch([poll, replay])
    }

    fn view(&self) -> Element<'_, Self::Message> {
        let dragged = self
            .controller
            .drag()
            .dragged()
            .zip(self.controller.drag().origin())
            .map(|((piece, pointer), origin)| (origin, piece, pointer));

        let board = board_view(
            self.controller.visual(),
            dragged,
            BOARD_LENGTH,
            Message::Board,
        );

        let panel = column![
            text(self.game_status()).size(28),
            self.player_controls(Side::White),
            self.player_controls(Side::Black),
            text(self.controller.visual().notation()).size(14),
            button(text("Copy Fen")).on_press(Message::CopyFen),
            button(text("Load Fen")).on_press(Message::LoadFen),
            button(text("Replay from clipboard")).on_press(Message::Replay),
            button(text("Restart Game")).on_press(Message::RestartGame),
            text(&self.status),
        ]
        .padding(10)
        .spacing(10)
        .align_items(Alignment::Start);

        let row = Row::new()
            .push(board)
            .push(panel)
            .padding(20)
            .spacing(20)
            .align_items(Alignment::Center);

        container(row)
            .width(Length::Fill)
            .height(Length::Fill)
            .center_x()
            .center_y()
            .into()
    }
}
