use chess::{BitBoard, ChessMove, Color, Piece, Square, EMPTY};

use crate::position::Position;
use crate::types::{capture_value, file_idx, opp, pst_bonus, rank_idx};

/// A position score from `side`'s point of view; higher is better for
/// `side`. Implementations may push and pop probe moves but must hand the
/// position back exactly as they received it.
pub trait Evaluator {
    fn eval(&self, pos: &mut Position, side: Color) -> f64;
}

// ---------------------------
// Shared probe
// ---------------------------

/// Move lists for both sides as `(side's, opponent's)`. The side to move
/// gets its real list; the other side is approximated by looking one reply
/// ahead after the first legal move.
fn probe_moves(pos: &mut Position, side: Color) -> (Vec<ChessMove>, Vec<ChessMove>) {
    let on_move: Vec<ChessMove> = pos.legal_moves().collect();
    let replies = match on_move.first() {
        Some(&first) => {
            pos.push(first);
            let r = pos.legal_moves().collect();
            pos.pop();
            r
        }
        None => Vec::new(),
    };
    if pos.turn() == side {
        (on_move, replies)
    } else {
        (replies, on_move)
    }
}

#[inline]
fn holds(bb: BitBoard, idx: i32) -> bool {
    if !(0..64).contains(&idx) {
        return false;
    }
    // SAFETY: bounds-checked above.
    let sq = unsafe { Square::new(idx as u8) };
    bb & BitBoard::from_square(sq) != EMPTY
}

fn from_square_count(moves: &[ChessMove], sq: Square) -> i32 {
    let mut n = 0;
    for m in moves {
        if m.get_source() == sq {
            n += 1;
        }
    }
    n
}

// ---------------------------
// Material
// ---------------------------

/// Piece counting with pawn-structure penalties and a mobility term.
pub struct MaterialEval;

/// Pawns with a friendly pawn directly ahead or behind on the same file.
fn doubled_pawns(pawns: BitBoard) -> i32 {
    let mut n = 0;
    for sq in pawns {
        let i = sq.to_index() as i32;
        if holds(pawns, i + 8) || holds(pawns, i - 8) {
            n += 1;
        }
    }
    n
}

/// Pawn-isolation term. Counts pawns that HAVE a friendly pawn on one of
/// the eight surrounding square indices; offsets are raw index deltas, so
/// a-file and h-file lookups wrap onto the adjacent rank.
fn connected_pawns(pawns: BitBoard) -> i32 {
    const NEIGHBORS: [i32; 8] = [-9, -8, -7, -1, 1, 7, 8, 9];
    let mut n = 0;
    for sq in pawns {
        let i = sq.to_index() as i32;
        if NEIGHBORS.iter().any(|d| holds(pawns, i + d)) {
            n += 1;
        }
    }
    n
}

/// Pawns with no legal move from their square, judged against the given
/// move list.
fn blocked_pawns(pawns: BitBoard, moves: &[ChessMove]) -> i32 {
    let mut n = 0;
    for sq in pawns {
        if from_square_count(moves, sq) == 0 {
            n += 1;
        }
    }
    n
}

impl Evaluator for MaterialEval {
    fn eval(&self, pos: &mut Position, side: Color) -> f64 {
        let us = side;
        let them = opp(side);
        let diff = |p: Piece| {
            pos.pieces(p, us).popcnt() as f64 - pos.pieces(p, them).popcnt() as f64
        };

        let kings = diff(Piece::King);
        let queens = diff(Piece::Queen);
        let rooks = diff(Piece::Rook);
        let minors = diff(Piece::Knight) + diff(Piece::Bishop);
        let pawns = diff(Piece::Pawn);

        let my_pawns = pos.pieces(Piece::Pawn, us);
        let their_pawns = pos.pieces(Piece::Pawn, them);
        let (my_moves, their_moves) = probe_moves(pos, side);

        let doubled = doubled_pawns(my_pawns) - doubled_pawns(their_pawns);
        let isolated = connected_pawns(my_pawns) - connected_pawns(their_pawns);
        let blocked =
            blocked_pawns(my_pawns, &my_moves) - blocked_pawns(their_pawns, &their_moves);
        let mobility = my_moves.len() as f64 - their_moves.len() as f64;

        200.0 * kings + 9.0 * queens + 5.0 * rooks + 3.0 * minors + pawns
            - 0.5 * (doubled + blocked + isolated) as f64
            + 0.1 * mobility
    }
}

// ---------------------------
// Positional (last-move delta)
// ---------------------------

/// Scores the most recent move: captured value, piece-square bonus at the
/// departure square, and a loss penalty when the destination is covered.
/// The coverage query uses the mover's own color.
pub struct PositionalEval;

impl Evaluator for PositionalEval {
    fn eval(&self, pos: &mut Position, _side: Color) -> f64 {
        let last = match pos.last_move() {
            Some(l) => l,
            None => return 0.0,
        };
        let capture = last.captured.map(capture_value).unwrap_or(0.0);
        let placement = pst_bonus(last.piece, last.mover, last.mv.get_source());
        let mut score = capture + placement;
        if pos.attackers(last.mover, last.mv.get_dest()) != EMPTY {
            score -= capture_value(last.piece);
        }
        score
    }
}

// ---------------------------
// Rapid (material + activity + center + king safety)
// ---------------------------

pub struct RapidEval;

fn center_pawns(pawns: BitBoard) -> i32 {
    let mut n = 0;
    for sq in pawns {
        if (16..32).contains(&sq.to_index()) {
            n += 1;
        }
    }
    n
}

/// Squares of `bb` within `rank_radius` ranks and `file_radius` files of
/// `center`, the center square itself excluded.
fn in_zone(bb: BitBoard, center: Square, rank_radius: i32, file_radius: i32) -> i32 {
    let mut n = 0;
    for sq in bb {
        if sq != center
            && (rank_idx(sq) - rank_idx(center)).abs() <= rank_radius
            && (file_idx(sq) - file_idx(center)).abs() <= file_radius
        {
            n += 1;
        }
    }
    n
}

/// A ray is protected when the first occupied square along it is friendly,
/// or when it runs off the board without meeting a piece.
fn protected_rays(pos: &Position, owner: Color, king: Square) -> i32 {
    const RAYS: [(i32, i32); 8] =
        [(1, 0), (-1, 0), (0, 1), (0, -1), (1, 1), (1, -1), (-1, 1), (-1, -1)];
    let own = pos.occupied(owner);
    let enemy = pos.occupied(opp(owner));
    let mut protected = 0;
    for (dr, df) in RAYS {
        let (mut r, mut f) = (rank_idx(king), file_idx(king));
        loop {
            r += dr;
            f += df;
            if !(0..8).contains(&r) || !(0..8).contains(&f) {
                protected += 1;
                break;
            }
            // SAFETY: rank and file are both 0..8 here.
            let sq = unsafe { Square::new((r * 8 + f) as u8) };
            if holds(own, sq.to_index() as i32) {
                protected += 1;
                break;
            }
            if holds(enemy, sq.to_index() as i32) {
                break;
            }
        }
    }
    protected
}

fn king_safety(
    pos: &Position,
    side: Color,
    my_moves: &[ChessMove],
    their_moves: &[ChessMove],
) -> f64 {
    if pos.in_check() {
        return -2.0;
    }
    let us = side;
    let them = opp(side);
    let my_king = pos.king_square(us);
    let their_king = pos.king_square(them);
    let my_pawns = pos.pieces(Piece::Pawn, us);
    let their_pawns = pos.pieces(Piece::Pawn, them);

    let escape =
        from_square_count(my_moves, my_king) - from_square_count(their_moves, their_king);

    let shield = in_zone(my_pawns, my_king, 2, 2) - in_zone(their_pawns, their_king, 2, 2);

    let defenders = in_zone(pos.occupied(us) & !my_pawns, my_king, 2, 7)
        - in_zone(pos.occupied(them) & !their_pawns, their_king, 2, 7);

    // More enemy pieces around the own king is the bad direction.
    let attackers = in_zone(pos.occupied(us), their_king, 2, 7)
        - in_zone(pos.occupied(them), my_king, 2, 7);

    let protection = protected_rays(pos, us, my_king) - protected_rays(pos, them, their_king);

    let raw = (escape + shield + defenders + attackers + protection) as f64;
    let rounded = raw.round();
    if rounded > 2.0 {
        2.0
    } else if rounded < -2.0 {
        -1.0
    } else if rounded == 0.0 {
        if raw > 0.0 { 1.0 } else { -1.0 }
    } else {
        rounded
    }
}

impl Evaluator for RapidEval {
    fn eval(&self, pos: &mut Position, side: Color) -> f64 {
        let us = side;
        let them = opp(side);
        let diff = |p: Piece| {
            pos.pieces(p, us).popcnt() as f64 - pos.pieces(p, them).popcnt() as f64
        };
        let material = 200.0 * diff(Piece::King)
            + 9.0 * diff(Piece::Queen)
            + 5.0 * diff(Piece::Rook)
            + 3.0 * (diff(Piece::Knight) + diff(Piece::Bishop))
            + diff(Piece::Pawn);

        let (my_moves, their_moves) = probe_moves(pos, side);

        let my_pieces = pos.occupied(us).popcnt() as f64;
        let their_pieces = pos.occupied(them).popcnt() as f64;
        let activity = if my_pieces == 0.0 && their_pieces == 0.0 {
            0.0
        } else if my_pieces == 0.0 {
            -(their_moves.len() as f64) / their_pieces
        } else if their_pieces == 0.0 {
            my_moves.len() as f64 / my_pieces
        } else {
            my_moves.len() as f64 / my_pieces - their_moves.len() as f64 / their_pieces
        };
        let activity = activity.clamp(-1.5, 1.5);

        let control = center_pawns(pos.pieces(Piece::Pawn, us))
            - center_pawns(pos.pieces(Piece::Pawn, them));

        let safety = king_safety(pos, side, &my_moves, &their_moves);

        material + activity + control as f64 + safety
    }
}

// ---------------------------
// Combined
// ---------------------------

/// Equal-weight blend of the last-move delta and the rapid composite.
pub struct CombinedEval;

impl Evaluator for CombinedEval {
    fn eval(&self, pos: &mut Position, side: Color) -> f64 {
        0.5 * PositionalEval.eval(pos, side) + 0.5 * RapidEval.eval(pos, side)
    }
}
