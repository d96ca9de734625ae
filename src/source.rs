//! Where the next move for each side comes from.
//!
//! Human sides are driven by gestures and never requested here. Local engine
//! requests go to the [SearchWorker] thread, remote requests run on a short lived
//! helper thread. Both post a [MoveReply] to one channel that the controller drains.

use std::{
    fmt::{self, Display},
    str::FromStr,
    sync::{
        mpsc::{channel, Receiver, RecvTimeoutError, Sender},
        Arc,
    },
    thread,
    time::Duration,
};

use serde::Deserialize;
use url::Url;

use crate::{config::Settings, engine::worker::SearchWorker, Result, Side, SourceError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SourceKind {
    #[default]
    Human,
    LocalEngine,
    Remote,
}

impl SourceKind {
    pub const ALL: [SourceKind; 3] = [SourceKind::Human, SourceKind::LocalEngine, SourceKind::Remote];
}

impl Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SourceKind::Human => "human",
            SourceKind::LocalEngine => "engine",
            SourceKind::Remote => "remote",
        })
    }
}

impl FromStr for SourceKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "human" => Ok(SourceKind::Human),
            "engine" => Ok(SourceKind::LocalEngine),
            "remote" => Ok(SourceKind::Remote),
            other => Err(format!(
                "unknown move source '{other}', expected human, engine or remote"
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PlayerConfig {
    pub kind: SourceKind,
    /// only used by [SourceKind::Remote]
    pub endpoint: Option<String>,
}

impl PlayerConfig {
    pub fn human() -> Self {
        PlayerConfig::default()
    }

    pub fn engine() -> Self {
        PlayerConfig {
            kind: SourceKind::LocalEngine,
            endpoint: None,
        }
    }

    pub fn remote(endpoint: impl Into<String>) -> Self {
        PlayerConfig {
            kind: SourceKind::Remote,
            endpoint: Some(endpoint.into()),
        }
    }

    pub fn is_human(&self) -> bool {
        self.kind == SourceKind::Human
    }
}

/// Identifies the position and configuration a request was issued under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestTag {
    pub side: Side,
    pub fen: String,
    pub generation: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveReply {
    pub tag: RequestTag,
    pub result: std::result::Result<String, SourceError>,
}

/// Transport used for remote endpoint requests.
pub trait RemoteClient: Send + Sync {
    /// GET `url`, returning the response body.
    fn get(&self, url: &Url) -> std::result::Result<String, SourceError>;
}

pub struct HttpClient {
    agent: ureq::Agent,
}

impl HttpClient {
    pub fn new(timeout: Duration) -> Self {
        HttpClient {
            agent: ureq::AgentBuilder::new().timeout(timeout).build(),
        }
    }
}

impl RemoteClient for HttpClient {
    fn get(&self, url: &Url) -> std::result::Result<String, SourceError> {
        let response = self
            .agent
            .get(url.as_str())
            .call()
            .map_err(|e| SourceError::Request(e.to_string()))?;
        response
            .into_string()
            .map_err(|e| SourceError::Request(e.to_string()))
    }
}

/// `<endpoint>?fen=<fen>`, with the fen form encoded.
pub fn endpoint_url(endpoint: &str, fen: &str) -> std::result::Result<Url, SourceError> {
    let mut url = Url::parse(endpoint.trim())
        .map_err(|e| SourceError::InvalidEndpoint(format!("{endpoint}: {e}")))?;
    url.query_pairs_mut().append_pair("fen", fen);
    Ok(url)
}

#[derive(Deserialize)]
struct EndpointReply {
    movement: String,
}

pub fn parse_endpoint_reply(body: &str) -> std::result::Result<String, SourceError> {
    let reply: EndpointReply =
        serde_json::from_str(body).map_err(|e| SourceError::BadResponse(e.to_string()))?;
    Ok(reply.movement.trim().to_string())
}

pub struct MoveSources {
    players: [PlayerConfig; 2],
    generations: [u64; 2],
    /// generation of the outstanding request per side
    pending: [Option<u64>; 2],
    replies: Receiver<MoveReply>,
    reply_sender: Sender<MoveReply>,
    worker: SearchWorker<RequestTag>,
    remote: Arc<dyn RemoteClient>,
}

impl MoveSources {
    pub fn new(settings: &Settings) -> Result<Self> {
        let remote = Arc::new(HttpClient::new(settings.request_timeout));
        MoveSources::with_remote_client(settings, remote)
    }

    pub fn with_remote_client(settings: &Settings, remote: Arc<dyn RemoteClient>) -> Result<Self> {
        let (reply_sender, replies) = channel();
        let worker_sender = reply_sender.clone();
        let worker = SearchWorker::spawn(settings.search_depth, move |tag, result| {
            // the receiver only goes away when the sources are dropped
            let _ = worker_sender.send(MoveReply { tag, result });
        })?;

        Ok(MoveSources {
            players: [settings.white.clone(), settings.black.clone()],
            generations: [0; 2],
            pending: [None; 2],
            replies,
            reply_sender,
            worker,
            remote,
        })
    }

    pub fn player(&self, side: Side) -> &PlayerConfig {
        &self.players[side.index()]
    }

    /// Replaces the configuration for `side`. Any outstanding request for it becomes stale.
    pub fn configure(&mut self, side: Side, config: PlayerConfig) {
        log::info!(
            "{side} is now played by {}{}",
            config.kind,
            config
                .endpoint
                .as_deref()
                .map(|e| format!(" ({e})"))
                .unwrap_or_default()
        );
        self.players[side.index()] = config;
        self.invalidate_side(side);
    }

    /// Makes every outstanding request stale, used when the position changes from outside.
    pub fn invalidate(&mut self) {
        for side in Side::ALL_SIDES {
            self.invalidate_side(side);
        }
    }

    fn invalidate_side(&mut self, side: Side) {
        self.generations[side.index()] += 1;
        if self.pending[side.index()].take().is_some() {
            self.worker.abort();
        }
    }

    pub fn is_pending(&self, side: Side) -> bool {
        self.pending[side.index()].is_some()
    }

    pub fn has_pending(&self) -> bool {
        self.pending.iter().any(Option::is_some)
    }

    /// Asks the source configured for `side` for a move in `fen`.
    /// Returns whether a request is now in flight.
    pub fn request_move(&mut self, side: Side, fen: String) -> bool {
        if self.is_pending(side) {
            return true;
        }

        let tag = RequestTag {
            side,
            fen,
            generation: self.generations[side.index()],
        };
        let player = &self.players[side.index()];

        let issued = match player.kind {
            SourceKind::Human => return false,
            SourceKind::LocalEngine => {
                log::debug!("asking local engine for {side} in {}", tag.fen);
                match self.worker.submit(tag.clone(), tag.fen.clone()) {
                    Ok(()) => true,
                    Err(e) => {
                        log::warn!("local engine unavailable for {side}: {e}");
                        false
                    }
                }
            }
            SourceKind::Remote => match player.endpoint.as_deref() {
                Some(endpoint) if !endpoint.trim().is_empty() => {
                    self.spawn_remote_request(endpoint.to_string(), tag.clone())
                }
                _ => {
                    log::warn!("{}", SourceError::EndpointUnset(side));
                    false
                }
            },
        };

        if issued {
            self.pending[side.index()] = Some(tag.generation);
        }
        issued
    }

    fn spawn_remote_request(&self, endpoint: String, tag: RequestTag) -> bool {
        log::debug!("asking {endpoint} for {} in {}", tag.side, tag.fen);
        let remote = self.remote.clone();
        let replies = self.reply_sender.clone();
        let spawned = thread::Builder::new()
            .name("remote-source".to_string())
            .spawn(move || {
                let result = endpoint_url(&endpoint, &tag.fen)
                    .and_then(|url| remote.get(&url))
                    .and_then(|body| parse_endpoint_reply(&body));
                let _ = replies.send(MoveReply { tag, result });
            });
        match spawned {
            Ok(_) => true,
            Err(e) => {
                log::warn!("could not start remote request: {e}");
                false
            }
        }
    }

    /// Next reply that already arrived, if any.
    pub fn try_next_reply(&mut self) -> Option<MoveReply> {
        let reply = self.replies.try_recv().ok()?;
        self.settle(&reply);
        Some(reply)
    }

    /// Blocks up to `timeout` for the next reply.
    pub fn wait_next_reply(&mut self, timeout: Duration) -> Option<MoveReply> {
        match self.replies.recv_timeout(timeout) {
            Ok(reply) => {
                self.settle(&reply);
                Some(reply)
            }
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => None,
        }
    }

    fn settle(&mut self, reply: &MoveReply) {
        let side = reply.tag.side.index();
        if self.pending[side] == Some(reply.tag.generation) {
            self.pending[side] = None;
        }
    }

    /// Whether `tag` still describes the current configuration and position.
    pub fn is_current(&self, tag: &RequestTag, fen: &str, side_to_move: Side) -> bool {
        tag.generation == self.generations[tag.side.index()]
            && tag.side == side_to_move
            && tag.fen == fen
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::START_BOARD_FEN;
    use std::sync::Mutex;

    const WAIT: Duration = Duration::from_secs(10);

    struct ScriptedClient {
        body: String,
        urls: Mutex<Vec<String>>,
    }

    impl ScriptedClient {
        fn new(body: &str) -> Arc<Self> {
            Arc::new(ScriptedClient {
                body: body.to_string(),
                urls: Mutex::new(Vec::new()),
            })
        }
    }

    impl RemoteClient for ScriptedClient {
        fn get(&self, url: &Url) -> std::result::Result<String, SourceError> {
            self.urls.lock().unwrap().push(url.to_string());
            Ok(self.body.clone())
        }
    }

    fn settings(white: PlayerConfig, black: PlayerConfig) -> Settings {
        Settings {
            white,
            black,
            search_depth: 1,
            ..Settings::default()
        }
    }

    #[test]
    fn source_kind_names() {
        for kind in SourceKind::ALL {
            assert_eq!(kind.to_string().parse::<SourceKind>(), Ok(kind));
        }
        assert_eq!("Engine".parse::<SourceKind>(), Ok(SourceKind::LocalEngine));
        assert!("robot".parse::<SourceKind>().is_err());
    }

    #[test]
    fn endpoint_url_escapes_fen() {
        let url = endpoint_url("http://localhost:8080/move", START_BOARD_FEN).unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:8080/move?fen=rnbqkbnr%2Fpppppppp%2F8%2F8%2F8%2F8%2FPPPPPPPP%2FRNBQKBNR+w+KQkq+-+0+1"
        );
        assert!(matches!(
            endpoint_url("not a url", START_BOARD_FEN),
            Err(SourceError::InvalidEndpoint(_))
        ));
    }

    #[test]
    fn endpoint_replies() {
        assert_eq!(
            parse_endpoint_reply(r#"{"movement": "e7e5", "score": 12}"#),
            Ok("e7e5".to_string())
        );
        assert!(matches!(
            parse_endpoint_reply("{}"),
            Err(SourceError::BadResponse(_))
        ));
        assert!(matches!(
            parse_endpoint_reply("e7e5"),
            Err(SourceError::BadResponse(_))
        ));
    }

    #[test]
    fn human_and_unset_endpoint_issue_nothing() {
        let client = ScriptedClient::new("{}");
        let mut sources = MoveSources::with_remote_client(
            &settings(PlayerConfig::human(), PlayerConfig {
                kind: SourceKind::Remote,
                endpoint: None,
            }),
            client.clone(),
        )
        .unwrap();

        assert!(!sources.request_move(Side::White, START_BOARD_FEN.to_string()));
        assert!(!sources.request_move(Side::Black, START_BOARD_FEN.to_string()));
        assert!(!sources.has_pending());
        assert!(sources.wait_next_reply(Duration::from_millis(50)).is_none());
        assert!(client.urls.lock().unwrap().is_empty());
    }

    #[test]
    fn remote_reply_is_tagged() {
        let client = ScriptedClient::new(r#"{"movement": "e2e4"}"#);
        let mut sources = MoveSources::with_remote_client(
            &settings(PlayerConfig::remote("http://localhost:9/move"), PlayerConfig::human()),
            client.clone(),
        )
        .unwrap();

        assert!(sources.request_move(Side::White, START_BOARD_FEN.to_string()));
        // a second request while one is outstanding is not issued again
        assert!(sources.request_move(Side::White, START_BOARD_FEN.to_string()));
        assert!(sources.is_pending(Side::White));

        let reply = sources.wait_next_reply(WAIT).unwrap();
        assert_eq!(reply.result, Ok("e2e4".to_string()));
        assert!(sources.is_current(&reply.tag, START_BOARD_FEN, Side::White));
        assert!(!sources.has_pending());
        assert_eq!(client.urls.lock().unwrap().len(), 1);
    }

    #[test]
    fn reconfigured_side_makes_reply_stale() {
        let client = ScriptedClient::new(r#"{"movement": "e2e4"}"#);
        let mut sources = MoveSources::with_remote_client(
            &settings(PlayerConfig::remote("http://localhost:9/move"), PlayerConfig::human()),
            client,
        )
        .unwrap();

        sources.request_move(Side::White, START_BOARD_FEN.to_string());
        sources.configure(Side::White, PlayerConfig::human());
        assert!(!sources.is_pending(Side::White));

        let reply = sources.wait_next_reply(WAIT).unwrap();
        assert!(!sources.is_current(&reply.tag, START_BOARD_FEN, Side::White));
    }

    #[test]
    fn local_engine_replies() {
        let mut sources = MoveSources::with_remote_client(
            &settings(PlayerConfig::human(), PlayerConfig::engine()),
            ScriptedClient::new("{}"),
        )
        .unwrap();
        let fen = "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq e3 0 1";
        assert!(sources.request_move(Side::Black, fen.to_string()));

        let reply = sources.wait_next_reply(WAIT).unwrap();
        assert_eq!(reply.tag.side, Side::Black);
        assert!(sources.is_current(&reply.tag, fen, Side::Black));
        let mve = reply.result.unwrap();
        let board = crate::Board::from_fen(fen).unwrap();
        assert!(board.find_move(mve.parse().unwrap()).is_ok());
    }
}
