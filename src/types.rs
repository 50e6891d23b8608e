use std::time::Duration;

use chess::{Board, ChessMove, Color, Piece, Square};

// ---------------------------
// Scores and tunables
// ---------------------------

/// Checkmate score. Equal to the king capture weight so that every score the
/// search produces stays finite and memo entries compare with ordinary
/// arithmetic.
pub const MATE: f64 = 20_000.0;

/// Probability that a move tying the current best score replaces it.
pub const TIE_BREAK_P: f64 = 0.25;

/// Depth ceiling and wall-clock budget for a full engine turn.
pub const DEFAULT_DEPTH: u32 = 30;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Capture weights per victim kind.
#[inline]
pub fn capture_value(pc: Piece) -> f64 {
    match pc {
        Piece::Pawn => 100.0,
        Piece::Knight => 320.0,
        Piece::Bishop => 330.0,
        Piece::Rook => 500.0,
        Piece::Queen => 900.0,
        Piece::King => MATE,
    }
}

// ---------------------------
// Piece-square tables
// ---------------------------
// Simplified Evaluation Function values, written from White's point of view
// with rank 8 in the first row. White therefore indexes through `sq ^ 56`;
// Black reads the array directly, which is the vertical mirror.

pub const PST_PAWN: [i32; 64] = [
     0,  0,  0,  0,  0,  0,  0,  0,
    50, 50, 50, 50, 50, 50, 50, 50,
    10, 10, 20, 30, 30, 20, 10, 10,
     5,  5, 10, 25, 25, 10,  5,  5,
     0,  0,  0, 20, 20,  0,  0,  0,
     5, -5,-10,  0,  0,-10, -5,  5,
     5, 10, 10,-20,-20, 10, 10,  5,
     0,  0,  0,  0,  0,  0,  0,  0,
];

pub const PST_KNIGHT: [i32; 64] = [
   -50,-40,-30,-30,-30,-30,-40,-50,
   -40,-20,  0,  0,  0,  0,-20,-40,
   -30,  0, 10, 15, 15, 10,  0,-30,
   -30,  5, 15, 20, 20, 15,  5,-30,
   -30,  0, 15, 20, 20, 15,  0,-30,
   -30,  5, 10, 15, 15, 10,  5,-30,
   -40,-20,  0,  5,  5,  0,-20,-40,
   -50,-40,-30,-30,-30,-30,-40,-50,
];

pub const PST_BISHOP: [i32; 64] = [
   -20,-10,-10,-10,-10,-10,-10,-20,
   -10,  0,  0,  0,  0,  0,  0,-10,
   -10,  0,  5, 10, 10,  5,  0,-10,
   -10,  5,  5, 10, 10,  5,  5,-10,
   -10,  0, 10, 10, 10, 10,  0,-10,
   -10, 10, 10, 10, 10, 10, 10,-10,
   -10,  5,  0,  0,  0,  0,  5,-10,
   -20,-10,-10,-10,-10,-10,-10,-20,
];

pub const PST_ROOK: [i32; 64] = [
     0,  0,  0,  0,  0,  0,  0,  0,
     5, 10, 10, 10, 10, 10, 10,  5,
    -5,  0,  0,  0,  0,  0,  0, -5,
    -5,  0,  0,  0,  0,  0,  0, -5,
    -5,  0,  0,  0,  0,  0,  0, -5,
    -5,  0,  0,  0,  0,  0,  0, -5,
    -5,  0,  0,  0,  0,  0,  0, -5,
     0,  0,  0,  5,  5,  0,  0,  0,
];

pub const PST_QUEEN: [i32; 64] = [
   -20,-10,-10, -5, -5,-10,-10,-20,
   -10,  0,  0,  0,  0,  0,  0,-10,
   -10,  0,  5,  5,  5,  5,  0,-10,
    -5,  0,  5,  5,  5,  5,  0, -5,
     0,  0,  5,  5,  5,  5,  0, -5,
   -10,  5,  5,  5,  5,  5,  0,-10,
   -10,  0,  5,  0,  0,  0,  0,-10,
   -20,-10,-10, -5, -5,-10,-10,-20,
];

pub const PST_KING: [i32; 64] = [
   -30,-40,-40,-50,-50,-40,-40,-30,
   -30,-40,-40,-50,-50,-40,-40,-30,
   -30,-40,-40,-50,-50,-40,-40,-30,
   -30,-40,-40,-50,-50,-40,-40,-30,
   -20,-30,-30,-40,-40,-30,-30,-20,
   -10,-20,-20,-20,-20,-20,-20,-10,
    20, 20,  0,  0,  0,  0, 20, 20,
    20, 30, 10,  0,  0, 10, 30, 20,
];

#[inline]
pub fn pst_for(piece: Piece, idx: usize) -> i32 {
    match piece {
        Piece::Pawn => PST_PAWN[idx],
        Piece::Knight => PST_KNIGHT[idx],
        Piece::Bishop => PST_BISHOP[idx],
        Piece::Rook => PST_ROOK[idx],
        Piece::Queen => PST_QUEEN[idx],
        Piece::King => PST_KING[idx],
    }
}

#[inline]
pub fn pst_index(color: Color, sq: Square) -> usize {
    let i = sq.to_index();
    if color == Color::White { i ^ 56 } else { i }
}

#[inline]
pub fn pst_bonus(piece: Piece, color: Color, sq: Square) -> f64 {
    pst_for(piece, pst_index(color, sq)) as f64
}

// ---------------------------
// Small helpers
// ---------------------------

#[inline]
pub fn opp(c: Color) -> Color {
    if c == Color::White { Color::Black } else { Color::White }
}

#[inline]
pub fn file_idx(sq: Square) -> i32 { (sq.to_index() % 8) as i32 }

#[inline]
pub fn rank_idx(sq: Square) -> i32 { (sq.to_index() / 8) as i32 }

/// Neither side can force mate: no pawns, rooks or queens, and at most one
/// minor piece each.
pub fn insufficient_material(b: &Board) -> bool {
    let heavies = b.pieces(Piece::Pawn) | b.pieces(Piece::Rook) | b.pieces(Piece::Queen);
    if heavies.popcnt() > 0 {
        return false;
    }
    let minors = |c: Color| {
        (b.pieces(Piece::Knight) & b.color_combined(c)).popcnt()
            + (b.pieces(Piece::Bishop) & b.color_combined(c)).popcnt()
    };
    minors(Color::White) <= 1 && minors(Color::Black) <= 1
}

// ---------------------------
// Move pack/unpack for memo entries
// ---------------------------

pub fn pack_move(m: ChessMove) -> u16 {
    let from = m.get_source().to_index() as u16;
    let to = m.get_dest().to_index() as u16;
    let promo = match m.get_promotion() {
        Some(Piece::Knight) => 1,
        Some(Piece::Bishop) => 2,
        Some(Piece::Rook) => 3,
        Some(Piece::Queen) => 4,
        _ => 0,
    } as u16;
    (from & 63) | ((to & 63) << 6) | ((promo & 7) << 12)
}

pub fn unpack_move(code: u16) -> Option<ChessMove> {
    if code == 0 {
        return None;
    }
    let from_idx = (code & 63) as u8;
    let to_idx = ((code >> 6) & 63) as u8;
    // SAFETY: indices masked to 0..=63; Square::new assumes valid input.
    let from = unsafe { Square::new(from_idx) };
    let to = unsafe { Square::new(to_idx) };
    let promo = match (code >> 12) & 7 {
        1 => Some(Piece::Knight),
        2 => Some(Piece::Bishop),
        3 => Some(Piece::Rook),
        4 => Some(Piece::Queen),
        _ => None,
    };
    Some(ChessMove::new(from, to, promo))
}
