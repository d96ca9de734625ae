use core::fmt;
use std::{
    fmt::Display,
    ops::{Index, Not},
    str::FromStr,
};

pub mod applier;
pub mod config;
pub mod controller;
pub mod drag;
pub mod engine;
pub mod error;
pub mod game;
pub mod geometry;
pub mod replay;
pub mod source;
mod utils;
pub mod visual;
mod zobrist;

pub use anyhow::Result;
pub use error::{ApplyError, CommandError, FenError, MoveError, SourceError};

pub const START_BOARD_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PieceKind {
    King,
    Queen,
    Bishop,
    Knight,
    Rook,
    Pawn,
}

impl PieceKind {
    pub const ALL_KINDS: [PieceKind; 6] = {
        use PieceKind::*;
        [King, Queen, Bishop, Knight, Rook, Pawn]
    };

    pub const PROMOTION_TARGETS: [PieceKind; 4] = {
        use PieceKind::*;
        [Queen, Rook, Knight, Bishop]
    };

    /// Lower case letter used in move strings and (for black) in FEN.
    pub const fn letter(&self) -> char {
        match self {
            PieceKind::King => 'k',
            PieceKind::Queen => 'q',
            PieceKind::Bishop => 'b',
            PieceKind::Knight => 'n',
            PieceKind::Rook => 'r',
            PieceKind::Pawn => 'p',
        }
    }

    pub fn from_letter(letter: char) -> Option<PieceKind> {
        match letter.to_ascii_lowercase() {
            'k' => Some(PieceKind::King),
            'q' => Some(PieceKind::Queen),
            'b' => Some(PieceKind::Bishop),
            'n' => Some(PieceKind::Knight),
            'r' => Some(PieceKind::Rook),
            'p' => Some(PieceKind::Pawn),
            _ => None,
        }
    }
}

impl Display for PieceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PieceKind::King => "king",
            PieceKind::Queen => "queen",
            PieceKind::Bishop => "bishop",
            PieceKind::Knight => "knight",
            PieceKind::Rook => "rook",
            PieceKind::Pawn => "pawn",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Side {
    White,
    Black,
}

impl Side {
    pub const ALL_SIDES: [Side; 2] = [Side::White, Side::Black];

    #[inline]
    pub const fn index(self) -> usize {
        match self {
            Side::White => 0,
            Side::Black => 1,
        }
    }
}

impl Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::White => f.write_str("White"),
            Side::Black => f.write_str("Black"),
        }
    }
}

impl Not for Side {
    type Output = Side;

    fn not(self) -> Self::Output {
        match self {
            Side::White => Side::Black,
            Side::Black => Side::White,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct Piece {
    pub kind: PieceKind,
    pub side: Side,
}

impl Piece {
    pub const fn new(kind: PieceKind, side: Side) -> Self {
        Piece { kind, side }
    }

    pub fn fen_char(&self) -> char {
        match self.side {
            Side::White => self.kind.letter().to_ascii_uppercase(),
            Side::Black => self.kind.letter(),
        }
    }

    pub fn from_fen_char(c: char) -> Option<Piece> {
        let kind = PieceKind::from_letter(c)?;
        let side = if c.is_ascii_uppercase() {
            Side::White
        } else {
            Side::Black
        };
        Some(Piece::new(kind, side))
    }

    fn zobrist_index(&self) -> usize {
        let kind = match self.kind {
            PieceKind::King => 0,
            PieceKind::Queen => 1,
            PieceKind::Bishop => 2,
            PieceKind::Knight => 3,
            PieceKind::Rook => 4,
            PieceKind::Pawn => 5,
        };
        kind * 2 + self.side.index()
    }
}

/// A board square. Index 0 is a1, 7 is h1 and 63 is h8.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Square(u8);

impl Square {
    /// `file` and `rank` are zero based.
    pub const fn new(file: u8, rank: u8) -> Option<Square> {
        if file < 8 && rank < 8 {
            Some(Square(rank * 8 + file))
        } else {
            None
        }
    }

    pub const fn from_index(index: u8) -> Option<Square> {
        if index < 64 {
            Some(Square(index))
        } else {
            None
        }
    }

    #[inline]
    pub const fn file(self) -> u8 {
        self.0 % 8
    }

    #[inline]
    pub const fn rank(self) -> u8 {
        self.0 / 8
    }

    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    pub fn offset(self, file_delta: i8, rank_delta: i8) -> Option<Square> {
        let file = self.file() as i8 + file_delta;
        let rank = self.rank() as i8 + rank_delta;
        if !(0..8).contains(&file) || !(0..8).contains(&rank) {
            return None;
        }
        Square::new(file as u8, rank as u8)
    }

    pub fn all() -> impl Iterator<Item = Square> {
        (0..64).map(Square)
    }
}

impl Display for Square {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", (b'a' + self.file()) as char, self.rank() + 1)
    }
}

impl fmt::Debug for Square {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        Display::fmt(self, f)
    }
}

impl FromStr for Square {
    type Err = MoveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = s.chars();
        let (Some(file), Some(rank), None) = (chars.next(), chars.next(), chars.next()) else {
            return Err(MoveError::Malformed(s.to_string()));
        };
        if !('a'..='h').contains(&file) || !('1'..='8').contains(&rank) {
            return Err(MoveError::Malformed(s.to_string()));
        }
        Square::new(file as u8 - b'a', rank as u8 - b'1')
            .ok_or_else(|| MoveError::Malformed(s.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MoveType {
    #[default]
    Normal,
    Castle,
    EnPassant,
    Promotion,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Move {
    pub from: Square,
    pub to: Square,
    pub promote_to: Option<PieceKind>,
    pub typ: MoveType,
}

impl Move {
    pub fn new(from: Square, to: Square) -> Self {
        Move {
            from,
            to,
            promote_to: None,
            typ: MoveType::Normal,
        }
    }

    pub fn en_passant(from: Square, to: Square) -> Self {
        Move {
            from,
            to,
            promote_to: None,
            typ: MoveType::EnPassant,
        }
    }

    pub fn castle(from: Square, to: Square) -> Self {
        Move {
            from,
            to,
            promote_to: None,
            typ: MoveType::Castle,
        }
    }

    pub fn promotion(from: Square, to: Square, target: PieceKind) -> Self {
        Move {
            from,
            to,
            promote_to: Some(target),
            typ: MoveType::Promotion,
        }
    }

    pub fn request(&self) -> MoveRequest {
        MoveRequest {
            origin: self.from,
            destination: self.to,
            promotion: self.promote_to,
        }
    }
}

impl Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.request().fmt(f)
    }
}

/// A move as it travels between move sources and the engine: `e2e4`, `e7e8q`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoveRequest {
    pub origin: Square,
    pub destination: Square,
    pub promotion: Option<PieceKind>,
}

impl Display for MoveRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.origin, self.destination)?;
        if let Some(promotion) = self.promotion {
            write!(f, "{}", promotion.letter())?;
        }
        Ok(())
    }
}

impl FromStr for MoveRequest {
    type Err = MoveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let malformed = || MoveError::Malformed(s.to_string());
        if !s.is_ascii() || !(4..=5).contains(&s.len()) {
            return Err(malformed());
        }

        let origin: Square = s[0..2].parse().map_err(|_| malformed())?;
        let destination: Square = s[2..4].parse().map_err(|_| malformed())?;
        let promotion = match s[4..].chars().next() {
            None => None,
            Some(letter) => match PieceKind::from_letter(letter) {
                Some(kind) if PieceKind::PROMOTION_TARGETS.contains(&kind) => Some(kind),
                _ => return Err(malformed()),
            },
        };

        Ok(MoveRequest {
            origin,
            destination,
            promotion,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CastleSide {
    King,
    Queen,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Castling {
    pub side: CastleSide,
    pub rook_from: Square,
    pub rook_to: Square,
}

/// Everything that changed on the board when a move was played.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoveFeedback {
    pub origin: Square,
    pub destination: Square,
    pub is_capture: bool,
    /// Square of the pawn taken en passant. Differs from `destination`.
    pub en_passant_capture: Option<Square>,
    pub castle: Option<Castling>,
    pub promotion: Option<PieceKind>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PlacedPiece {
    pub square: Square,
    pub kind: PieceKind,
    pub side: Side,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CastleRights {
    pub king_side: bool,
    pub queen_side: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameResult {
    Checkmate,
    Stalemate,
    FiftyMoveRule,
    Repetition,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoardState {
    pub result: Option<GameResult>,
    pub king_in_check: bool,
}

impl BoardState {
    pub fn is_terminal(&self) -> bool {
        self.result.is_some()
    }

    pub fn is_check(&self) -> bool {
        self.result.is_none() && self.king_in_check
    }
}

type Fields = [Option<Piece>; 64];

const KNIGHT_OFFSETS: [(i8, i8); 8] = [
    (2, 1),
    (2, -1),
    (1, -2),
    (-1, -2),
    (-2, -1),
    (-2, 1),
    (-1, 2),
    (1, 2),
];

const KING_OFFSETS: [(i8, i8); 8] = [
    (-1, -1),
    (0, -1),
    (1, -1),
    (1, 0),
    (1, 1),
    (0, 1),
    (-1, 1),
    (-1, 0),
];

const ROOK_DIRECTIONS: [(i8, i8); 4] = [(0, 1), (1, 0), (0, -1), (-1, 0)];
const BISHOP_DIRECTIONS: [(i8, i8); 4] = [(1, 1), (1, -1), (-1, -1), (-1, 1)];

fn pawn_direction(side: Side) -> i8 {
    match side {
        Side::White => 1,
        Side::Black => -1,
    }
}

fn home_rank(side: Side) -> u8 {
    match side {
        Side::White => 0,
        Side::Black => 7,
    }
}

/// Checks whether `target` is attacked by any piece of `by` on `fields`.
fn square_attacked(fields: &Fields, target: Square, by: Side) -> bool {
    let holds = |sq: Option<Square>, kind: PieceKind| {
        sq.and_then(|sq| fields[sq.index()]) == Some(Piece::new(kind, by))
    };

    // an attacking pawn sits one rank behind the target from its own point of view
    let behind = -pawn_direction(by);
    if holds(target.offset(-1, behind), PieceKind::Pawn)
        || holds(target.offset(1, behind), PieceKind::Pawn)
    {
        return true;
    }

    if KNIGHT_OFFSETS
        .iter()
        .any(|&(df, dr)| holds(target.offset(df, dr), PieceKind::Knight))
    {
        return true;
    }

    if KING_OFFSETS
        .iter()
        .any(|&(df, dr)| holds(target.offset(df, dr), PieceKind::King))
    {
        return true;
    }

    let slides = |directions: &[(i8, i8); 4], kind: PieceKind| {
        directions.iter().any(|&(df, dr)| {
            let mut current = target;
            while let Some(next) = current.offset(df, dr) {
                if let Some(piece) = fields[next.index()] {
                    return piece.side == by && (piece.kind == kind || piece.kind == PieceKind::Queen);
                }
                current = next;
            }
            false
        })
    };

    slides(&ROOK_DIRECTIONS, PieceKind::Rook) || slides(&BISHOP_DIRECTIONS, PieceKind::Bishop)
}

fn king_square(fields: &Fields, side: Side) -> Option<Square> {
    Square::all().find(|sq| fields[sq.index()] == Some(Piece::new(PieceKind::King, side)))
}

#[derive(Debug, Clone)]
pub struct Board {
    fields: Fields,

    pub castling: [CastleRights; 2],

    pub side_to_move: Side,

    pub en_passant_square: Option<Square>,

    pub half_moves_since_capture: u16,
    pub full_move_count: u32,

    pub zobrist_hash: u64,
    /// hashes of every position since the last capture or pawn move, current one included
    history: Vec<u64>,
}

impl PartialEq<Board> for Board {
    fn eq(&self, other: &Board) -> bool {
        // everything but the repetition history
        self.fields == other.fields
            && self.castling == other.castling
            && self.side_to_move == other.side_to_move
            && self.en_passant_square == other.en_passant_square
            && self.half_moves_since_capture == other.half_moves_since_capture
            && self.full_move_count == other.full_move_count
    }
}
impl Eq for Board {}

impl Default for Board {
    fn default() -> Self {
        Board::from_fen(START_BOARD_FEN).expect("start position fen is valid")
    }
}

impl Board {
    pub fn from_fen(fen: &str) -> Result<Self, FenError> {
        let mut parts = fen.split_whitespace();

        let placement = parts
            .next()
            .ok_or_else(|| FenError("empty position".to_string()))?;
        let fields = Self::parse_placement(placement)?;

        for side in Side::ALL_SIDES {
            let kings = fields
                .iter()
                .filter(|p| **p == Some(Piece::new(PieceKind::King, side)))
                .count();
            if kings != 1 {
                return Err(FenError(format!("expected one {side} king, found {kings}")));
            }
        }

        let side_to_move = match parts.next() {
            Some("w") => Side::White,
            Some("b") => Side::Black,
            other => {
                return Err(FenError(format!(
                    "expected either 'w' or 'b' to move, got {other:?}"
                )))
            }
        };

        let mut castling = [CastleRights::default(); 2];
        match parts.next() {
            Some("-") => {}
            Some(rights) => {
                for c in rights.chars() {
                    match c {
                        'K' => castling[Side::White.index()].king_side = true,
                        'Q' => castling[Side::White.index()].queen_side = true,
                        'k' => castling[Side::Black.index()].king_side = true,
                        'q' => castling[Side::Black.index()].queen_side = true,
                        _ => {
                            return Err(FenError(format!(
                                "unexpected '{c}' in castling availability"
                            )))
                        }
                    }
                }
            }
            None => return Err(FenError("expected castling availability".to_string())),
        }

        let en_passant_square = match parts.next() {
            Some("-") => None,
            Some(square) => {
                let square: Square = square
                    .parse()
                    .map_err(|_| FenError(format!("invalid en-passant square '{square}'")))?;
                let rank = match side_to_move {
                    Side::White => 5,
                    Side::Black => 2,
                };
                if square.rank() != rank {
                    return Err(FenError(format!(
                        "en-passant square {square} must be on rank {} with {side_to_move} to move",
                        rank + 1
                    )));
                }
                Some(square)
            }
            None => return Err(FenError("expected en-passant square".to_string())),
        };

        let half_moves_since_capture: u16 = match parts.next() {
            Some(half_moves) => half_moves
                .parse()
                .map_err(|_| FenError(format!("could not parse half-move count '{half_moves}'")))?,
            None => 0,
        };

        let full_move_count: u32 = match parts.next() {
            Some(full_moves) => full_moves
                .parse()
                .map_err(|_| FenError(format!("could not parse move count '{full_moves}'")))?,
            None => 1,
        };

        if let Some(extra) = parts.next() {
            return Err(FenError(format!("expected end of FEN, got '{extra}'")));
        }

        let mut board = Board {
            fields,
            castling,
            side_to_move,
            en_passant_square,
            half_moves_since_capture,
            full_move_count,
            zobrist_hash: 0,
            history: Vec::new(),
        };

        if let Some(square) = en_passant_square {
            if board[square].is_some() {
                return Err(FenError(format!("en-passant square {square} is occupied")));
            }
            if board.en_passant_victim(square).is_none() {
                return Err(FenError(format!(
                    "no {} pawn can be captured en passant on {square}",
                    !side_to_move
                )));
            }
        }
        if board.is_in_check(!side_to_move) {
            return Err(FenError(format!(
                "{} is in check but {side_to_move} is to move",
                !side_to_move
            )));
        }

        board.zobrist_hash = board.calculate_zobrist_hash();
        board.history.push(board.zobrist_hash);

        Ok(board)
    }

    fn parse_placement(placement: &str) -> Result<Fields, FenError> {
        let mut fields = [None; 64];

        let rows: Vec<&str> = placement.split('/').collect();
        if rows.len() != 8 {
            return Err(FenError(format!("expected 8 rows, got {}", rows.len())));
        }

        // rows are listed from rank 8 down to rank 1
        for (row, text) in rows.iter().enumerate() {
            let rank = 7 - row as u8;
            let mut file = 0u8;
            for c in text.chars() {
                match c {
                    '1'..='8' => file += c as u8 - b'0',
                    _ => {
                        let piece = Piece::from_fen_char(c)
                            .ok_or_else(|| FenError(format!("unexpected '{c}' instead of piece")))?;
                        let square = Square::new(file, rank)
                            .ok_or_else(|| FenError(format!("row {} is too long", row + 1)))?;
                        fields[square.index()] = Some(piece);
                        file += 1;
                    }
                }
                if file > 8 {
                    return Err(FenError(format!("row {} is too long", row + 1)));
                }
            }
            if file != 8 {
                return Err(FenError(format!("row {} is too short", row + 1)));
            }
        }

        Ok(fields)
    }

    pub fn calculate_zobrist_hash(&self) -> u64 {
        zobrist::ZOBRIST.hash(
            &self.fields,
            &self.castling,
            self.en_passant_square,
            self.side_to_move,
        )
    }

    pub fn generate_fen(&self) -> String {
        let mut fen = String::new();

        for rank in (0..8).rev() {
            let mut empty_count = 0;
            for file in 0..8 {
                match Square::new(file, rank).and_then(|sq| self[sq]) {
                    Some(piece) => {
                        if empty_count > 0 {
                            fen.push_str(&empty_count.to_string());
                            empty_count = 0;
                        }
                        fen.push(piece.fen_char())
                    }
                    None => empty_count += 1,
                }
            }
            if empty_count > 0 {
                fen.push_str(&empty_count.to_string());
            }
            if rank != 0 {
                fen.push('/');
            }
        }

        fen.push(' ');
        match self.side_to_move {
            Side::White => fen.push('w'),
            Side::Black => fen.push('b'),
        }
        fen.push(' ');

        let white = self.castling[Side::White.index()];
        let black = self.castling[Side::Black.index()];
        if !white.king_side && !white.queen_side && !black.king_side && !black.queen_side {
            fen.push('-');
        } else {
            if white.king_side {
                fen.push('K');
            }
            if white.queen_side {
                fen.push('Q');
            }
            if black.king_side {
                fen.push('k');
            }
            if black.queen_side {
                fen.push('q');
            }
        }
        fen.push(' ');

        match self.en_passant_square {
            Some(square) => fen.push_str(&square.to_string()),
            None => fen.push('-'),
        }
        fen.push(' ');

        fen.push_str(&self.half_moves_since_capture.to_string());
        fen.push(' ');
        fen.push_str(&self.full_move_count.to_string());

        fen
    }

    pub fn pieces(&self) -> Vec<PlacedPiece> {
        Square::all()
            .filter_map(|square| {
                self[square].map(|piece| PlacedPiece {
                    square,
                    kind: piece.kind,
                    side: piece.side,
                })
            })
            .collect()
    }

    pub fn king_square(&self, side: Side) -> Option<Square> {
        king_square(&self.fields, side)
    }

    pub fn is_attacked(&self, target: Square, by: Side) -> bool {
        square_attacked(&self.fields, target, by)
    }

    /// The pawn that just double pushed past `target`, if it is still there.
    fn en_passant_victim(&self, target: Square) -> Option<Square> {
        let victim = target.offset(0, -pawn_direction(self.side_to_move))?;
        let expected = Piece::new(PieceKind::Pawn, !self.side_to_move);
        (self[victim] == Some(expected)).then_some(victim)
    }

    pub fn is_in_check(&self, side: Side) -> bool {
        self.king_square(side)
            .map(|king| self.is_attacked(king, !side))
            .unwrap_or(false)
    }

    pub fn repetitions(&self) -> usize {
        self.history
            .iter()
            .filter(|hash| **hash == self.zobrist_hash)
            .count()
    }

    pub fn draw_by_repetition_or_50_moves(&self) -> bool {
        self.repetitions() >= 3 || self.half_moves_since_capture >= 100
    }

    pub fn state(&self) -> BoardState {
        let king_in_check = self.is_in_check(self.side_to_move);
        let result = if self.legal_moves().is_empty() {
            if king_in_check {
                Some(GameResult::Checkmate)
            } else {
                Some(GameResult::Stalemate)
            }
        } else if self.half_moves_since_capture >= 100 {
            Some(GameResult::FiftyMoveRule)
        } else if self.repetitions() >= 3 {
            Some(GameResult::Repetition)
        } else {
            None
        };

        BoardState {
            result,
            king_in_check,
        }
    }

    pub fn legal_moves(&self) -> Vec<Move> {
        let mut moves = Vec::with_capacity(64);
        for from in Square::all() {
            if let Some(piece) = self[from] {
                if piece.side == self.side_to_move {
                    self.pseudo_moves_for(from, piece, &mut moves);
                }
            }
        }
        moves.retain(|m| self.leaves_king_safe(*m));
        moves
    }

    pub fn legal_moves_from(&self, from: Square) -> Vec<Move> {
        let mut moves = Vec::with_capacity(16);
        match self[from] {
            Some(piece) if piece.side == self.side_to_move => {
                self.pseudo_moves_for(from, piece, &mut moves);
                moves.retain(|m| self.leaves_king_safe(*m));
            }
            _ => {}
        }
        moves
    }

    /// Resolves a move string against the legal moves of the current position.
    pub fn find_move(&self, request: MoveRequest) -> Result<Move, MoveError> {
        let candidates: Vec<Move> = self
            .legal_moves_from(request.origin)
            .into_iter()
            .filter(|m| m.to == request.destination)
            .collect();

        match (candidates.first(), request.promotion) {
            (None, _) => Err(MoveError::Illegal(request.to_string())),
            (Some(_), Some(kind)) => candidates
                .iter()
                .find(|m| m.promote_to == Some(kind))
                .copied()
                .ok_or_else(|| MoveError::Illegal(request.to_string())),
            (Some(mve), None) if mve.typ == MoveType::Promotion => {
                Err(MoveError::MissingPromotion(request.to_string()))
            }
            (Some(mve), None) => Ok(*mve),
        }
    }

    fn leaves_king_safe(&self, mve: Move) -> bool {
        let side = self.side_to_move;
        let mut fields = self.fields;
        Self::displace(&mut fields, mve, side);
        match king_square(&fields, side) {
            Some(king) => !square_attacked(&fields, king, !side),
            None => true,
        }
    }

    /// Moves the pieces of `mve` on `fields`. Returns the captured piece, if any.
    fn displace(fields: &mut Fields, mve: Move, side: Side) -> Option<Piece> {
        let mut captured = fields[mve.to.index()];
        match mve.typ {
            MoveType::EnPassant => {
                if let Some(victim) = Square::new(mve.to.file(), mve.from.rank()) {
                    captured = fields[victim.index()].take();
                }
            }
            MoveType::Castle => {
                let (rook_from, rook_to) = Self::castle_rook_squares(mve);
                fields[rook_to.index()] = fields[rook_from.index()].take();
            }
            _ => {}
        }

        let moving = fields[mve.from.index()].take();
        fields[mve.to.index()] = match mve.promote_to {
            Some(kind) => Some(Piece::new(kind, side)),
            None => moving,
        };
        captured
    }

    fn castle_rook_squares(mve: Move) -> (Square, Square) {
        let rank = mve.from.rank();
        let squares = if mve.to.file() > mve.from.file() {
            (Square::new(7, rank), Square::new(5, rank))
        } else {
            (Square::new(0, rank), Square::new(3, rank))
        };
        match squares {
            (Some(from), Some(to)) => (from, to),
            _ => (mve.from, mve.from),
        }
    }

    fn pseudo_moves_for(&self, from: Square, piece: Piece, moves: &mut Vec<Move>) {
        match piece.kind {
            PieceKind::King => {
                self.step_moves(from, piece.side, &KING_OFFSETS, moves);
                self.castle_moves(from, piece.side, moves);
            }
            PieceKind::Queen => {
                self.sliding_moves(from, piece.side, &ROOK_DIRECTIONS, moves);
                self.sliding_moves(from, piece.side, &BISHOP_DIRECTIONS, moves);
            }
            PieceKind::Bishop => self.sliding_moves(from, piece.side, &BISHOP_DIRECTIONS, moves),
            PieceKind::Knight => self.step_moves(from, piece.side, &KNIGHT_OFFSETS, moves),
            PieceKind::Rook => self.sliding_moves(from, piece.side, &ROOK_DIRECTIONS, moves),
            PieceKind::Pawn => self.pawn_moves(from, piece.side, moves),
        }
    }

    fn step_moves(&self, from: Square, side: Side, offsets: &[(i8, i8); 8], moves: &mut Vec<Move>) {
        for &(df, dr) in offsets {
            if let Some(to) = from.offset(df, dr) {
                match self[to] {
                    Some(other) if other.side == side => {}
                    _ => moves.push(Move::new(from, to)),
                }
            }
        }
    }

    fn sliding_moves(
        &self,
        from: Square,
        side: Side,
        directions: &[(i8, i8); 4],
        moves: &mut Vec<Move>,
    ) {
        for &(df, dr) in directions {
            let mut current = from;
            while let Some(to) = current.offset(df, dr) {
                match self[to] {
                    None => moves.push(Move::new(from, to)),
                    Some(other) => {
                        if other.side != side {
                            moves.push(Move::new(from, to));
                        }
                        break;
                    }
                }
                current = to;
            }
        }
    }

    fn pawn_moves(&self, from: Square, side: Side, moves: &mut Vec<Move>) {
        let dir = pawn_direction(side);
        let start_rank = match side {
            Side::White => 1,
            Side::Black => 6,
        };
        let promotion_rank = home_rank(!side);

        // add possible moves to `to`, including possible promotions
        let add_moves = |moves: &mut Vec<Move>, to: Square| {
            if to.rank() == promotion_rank {
                for kind in PieceKind::PROMOTION_TARGETS {
                    moves.push(Move::promotion(from, to, kind));
                }
            } else {
                moves.push(Move::new(from, to));
            }
        };

        if let Some(one) = from.offset(0, dir) {
            if self[one].is_none() {
                add_moves(moves, one);
                if from.rank() == start_rank {
                    if let Some(two) = from.offset(0, 2 * dir) {
                        if self[two].is_none() {
                            add_moves(moves, two);
                        }
                    }
                }
            }
        }

        for df in [-1, 1] {
            let Some(to) = from.offset(df, dir) else {
                continue;
            };
            if self.en_passant_square == Some(to) {
                if side == self.side_to_move && self.en_passant_victim(to).is_some() {
                    moves.push(Move::en_passant(from, to));
                }
            } else if matches!(self[to], Some(other) if other.side != side) {
                add_moves(moves, to);
            }
        }
    }

    fn castle_moves(&self, from: Square, side: Side, moves: &mut Vec<Move>) {
        let rank = home_rank(side);
        if Square::new(4, rank) != Some(from) {
            return;
        }
        let rights = self.castling[side.index()];
        if !rights.king_side && !rights.queen_side {
            return;
        }
        if self.is_attacked(from, !side) {
            return;
        }

        let sq = |file| Square::new(file, rank);
        let empty = |file| sq(file).map(|s| self[s].is_none()).unwrap_or(false);
        let safe = |file| sq(file).map(|s| !self.is_attacked(s, !side)).unwrap_or(false);
        let own_rook = |file| {
            sq(file).and_then(|s| self[s]) == Some(Piece::new(PieceKind::Rook, side))
        };

        if rights.king_side && own_rook(7) && empty(5) && empty(6) && safe(5) && safe(6) {
            if let Some(to) = sq(6) {
                moves.push(Move::castle(from, to));
            }
        }
        if rights.queen_side
            && own_rook(0)
            && empty(1)
            && empty(2)
            && empty(3)
            && safe(2)
            && safe(3)
        {
            if let Some(to) = sq(2) {
                moves.push(Move::castle(from, to));
            }
        }
    }

    fn revoke_castling(&mut self, square: Square) {
        for side in Side::ALL_SIDES {
            let rank = home_rank(side);
            if square.rank() != rank {
                continue;
            }
            let rights = &mut self.castling[side.index()];
            match square.file() {
                4 => *rights = CastleRights::default(),
                0 => rights.queen_side = false,
                7 => rights.king_side = false,
                _ => {}
            }
        }
    }

    /// plays a given move. This assumes that the move is legal
    pub fn play_move(&mut self, mve: Move) -> MoveFeedback {
        let side = self.side_to_move;
        let moving = self[mve.from];
        debug_assert_eq!(moving.map(|p| p.side), Some(side));

        let captured = Self::displace(&mut self.fields, mve, side);

        let en_passant_capture = match mve.typ {
            MoveType::EnPassant => Square::new(mve.to.file(), mve.from.rank()),
            _ => None,
        };
        let castle = match mve.typ {
            MoveType::Castle => {
                let (rook_from, rook_to) = Self::castle_rook_squares(mve);
                let castle_side = if mve.to.file() > mve.from.file() {
                    CastleSide::King
                } else {
                    CastleSide::Queen
                };
                Some(Castling {
                    side: castle_side,
                    rook_from,
                    rook_to,
                })
            }
            _ => None,
        };

        self.revoke_castling(mve.from);
        self.revoke_castling(mve.to);

        let pawn_move = moving.map(|p| p.kind) == Some(PieceKind::Pawn);
        self.en_passant_square = if pawn_move && mve.from.rank().abs_diff(mve.to.rank()) == 2 {
            Square::new(mve.from.file(), (mve.from.rank() + mve.to.rank()) / 2)
        } else {
            None
        };

        if captured.is_some() || pawn_move {
            self.half_moves_since_capture = 0;
            self.history.clear();
        } else {
            self.half_moves_since_capture += 1;
        }

        if side == Side::Black {
            self.full_move_count += 1;
        }
        self.side_to_move = !side;

        self.zobrist_hash = self.calculate_zobrist_hash();
        self.history.push(self.zobrist_hash);

        MoveFeedback {
            origin: mve.from,
            destination: mve.to,
            is_capture: captured.is_some(),
            en_passant_capture,
            castle,
            promotion: mve.promote_to,
        }
    }

    /// Number of leaf nodes of the legal move tree of the given depth.
    pub fn perft(&self, depth: u32) -> u64 {
        if depth == 0 {
            return 1;
        }
        let moves = self.legal_moves();
        if depth == 1 {
            return moves.len() as u64;
        }
        moves
            .into_iter()
            .map(|mve| {
                let mut board = self.clone();
                board.play_move(mve);
                board.perft(depth - 1)
            })
            .sum()
    }
}

impl Index<Square> for Board {
    type Output = Option<Piece>;

    fn index(&self, index: Square) -> &Self::Output {
        &self.fields[index.index()]
    }
}
