use crate::{CastleRights, Piece, Side, Square};
use lazy_static::lazy_static;
use rand::Rng;

lazy_static! {
    pub static ref ZOBRIST: ZobristKeys = {
        #[cfg(test)]
        let mut rng = {
            use rand::rngs::StdRng;
            use rand::SeedableRng;
            StdRng::seed_from_u64(123456789)
        };
        #[cfg(not(test))]
        let mut rng = rand::thread_rng();

        ZobristKeys::new_random(&mut rng)
    };
}

pub struct ZobristKeys {
    black_move: u64,
    // white king side, white queen side, black king side, black queen side
    castling: [u64; 4],
    en_passant_file: [u64; 8],
    pieces: [[u64; 64]; 12],
}

impl ZobristKeys {
    fn new_random(rng: &mut impl Rng) -> Self {
        let mut castling = [0u64; 4];
        rng.fill(&mut castling[..]);
        let mut en_passant_file = [0u64; 8];
        rng.fill(&mut en_passant_file[..]);
        let mut pieces = [[0u64; 64]; 12];
        for keys in pieces.iter_mut() {
            rng.fill(&mut keys[..]);
        }

        ZobristKeys {
            black_move: rng.gen(),
            castling,
            en_passant_file,
            pieces,
        }
    }

    pub fn hash(
        &self,
        fields: &[Option<Piece>; 64],
        castling: &[CastleRights; 2],
        en_passant: Option<Square>,
        next_move: Side,
    ) -> u64 {
        let mut hash = 0;
        if next_move == Side::Black {
            hash ^= self.black_move;
        }
        if let Some(en_passant) = en_passant {
            hash ^= self.en_passant_file[en_passant.file() as usize];
        }
        for side in Side::ALL_SIDES {
            let rights = castling[side.index()];
            if rights.king_side {
                hash ^= self.castling[side.index() * 2];
            }
            if rights.queen_side {
                hash ^= self.castling[side.index() * 2 + 1];
            }
        }

        for (i, piece) in fields.iter().enumerate() {
            if let Some(piece) = piece {
                hash ^= self.pieces[piece.zobrist_index()][i];
            }
        }

        hash
    }
}
