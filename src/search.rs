use std::time::{Duration, Instant};

use chess::{ChessMove, Color};
use log::debug;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::eval::Evaluator;
use crate::memo::{Bound, Memo};
use crate::position::{Outcome, Position};
use crate::types::{opp, MATE, TIE_BREAK_P};

/// Game-tree search state: node/eval counters and the tie-break policy.
/// The memo is not owned here; callers pass it in so it can outlive any
/// number of searches.
pub struct Search {
    pub nodes: u64,
    /// Leaf evaluator invocations (terminal shortcuts not included).
    pub evals: u64,
    rng: Option<StdRng>,
}

impl Search {
    /// Randomized tie-break, seeded from the OS.
    pub fn new() -> Self {
        Self { nodes: 0, evals: 0, rng: Some(StdRng::from_entropy()) }
    }

    /// Randomized tie-break with a reproducible seed.
    pub fn seeded(seed: u64) -> Self {
        Self { nodes: 0, evals: 0, rng: Some(StdRng::seed_from_u64(seed)) }
    }

    /// First maximizing move always wins ties.
    pub fn deterministic() -> Self {
        Self { nodes: 0, evals: 0, rng: None }
    }

    pub fn reset_counters(&mut self) {
        self.nodes = 0;
        self.evals = 0;
    }

    fn tie_break(&mut self) -> bool {
        self.rng.as_mut().map_or(false, |rng| rng.gen::<f64>() < TIE_BREAK_P)
    }

    /// Leaf score from `side`'s point of view. Checkmate is recognized
    /// directly; every other horizon node is handed to the evaluator.
    fn horizon(&mut self, pos: &mut Position, side: Color, eval: &dyn Evaluator) -> f64 {
        if let Some(Outcome::Checkmate { winner }) = pos.outcome() {
            return if winner == side { MATE } else { -MATE };
        }
        self.evals += 1;
        eval.eval(pos, side)
    }

    // ---------------------------
    // Negamax + alpha-beta + memo
    // ---------------------------

    /// Best score and move for `side` (the side to move) within `depth`
    /// plies, pruning inside the `(alpha, beta)` window and reusing the
    /// memo across calls.
    pub fn search(
        &mut self,
        depth: u32,
        alpha: f64,
        beta: f64,
        pos: &mut Position,
        side: Color,
        eval: &dyn Evaluator,
        memo: &mut Memo,
    ) -> (f64, Option<ChessMove>) {
        let ply = pos.ply();
        let result = self.search_inner(depth, alpha, beta, pos, side, eval, memo);
        assert_eq!(pos.ply(), ply, "make/unmake imbalance after search");
        result
    }

    fn search_inner(
        &mut self,
        depth: u32,
        mut alpha: f64,
        mut beta: f64,
        pos: &mut Position,
        side: Color,
        eval: &dyn Evaluator,
        memo: &mut Memo,
    ) -> (f64, Option<ChessMove>) {
        debug_assert_eq!(side, pos.turn());
        self.nodes += 1;

        let alpha_in = alpha;
        let fp = pos.fingerprint();
        if let Some(e) = memo.lookup(fp) {
            if e.depth >= depth {
                match e.bound {
                    Bound::Exact => return (e.score, e.best_move()),
                    Bound::LowerBound => alpha = alpha.max(e.score),
                    Bound::UpperBound => beta = beta.min(e.score),
                }
                if alpha >= beta {
                    return (e.score, e.best_move());
                }
            }
        }

        if depth == 0 || pos.outcome().is_some() {
            return (self.horizon(pos, side, eval), None);
        }

        // Children with exact memo scores go first; the rest keep
        // generation order.
        let mut moves: Vec<(f64, ChessMove)> = Vec::new();
        for m in pos.legal_moves() {
            pos.push(m);
            let key = match memo.lookup(pos.fingerprint()) {
                Some(e) if e.bound == Bound::Exact => e.score,
                _ => f64::NEG_INFINITY,
            };
            pos.pop();
            moves.push((key, m));
        }
        moves.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));

        let mut best = f64::NEG_INFINITY;
        let mut best_move: Option<ChessMove> = None;
        for (_, m) in moves {
            pos.push(m);
            let (child, _) = self.search(depth - 1, -beta, -alpha, pos, opp(side), eval, memo);
            pos.pop();
            let score = -child;

            if score > best {
                best = score;
                best_move = Some(m);
            } else if score == best && self.tie_break() {
                best_move = Some(m);
            }

            alpha = alpha.max(best);
            if alpha >= beta {
                break;
            }
        }

        // UpperBound is judged against the alpha the caller passed, not the
        // memo-narrowed one; LowerBound against the (possibly narrowed)
        // beta the cutoff used.
        let bound = if best <= alpha_in {
            Bound::UpperBound
        } else if best >= beta {
            Bound::LowerBound
        } else {
            Bound::Exact
        };
        memo.store(fp, best_move, depth, best, bound, pos.halfmove_clock());

        (best, best_move)
    }

    // ---------------------------
    // Algorithm family (timing harness)
    // ---------------------------

    /// Negamax with no pruning and no memo.
    pub fn negamax(
        &mut self,
        depth: u32,
        pos: &mut Position,
        side: Color,
        eval: &dyn Evaluator,
    ) -> (f64, Option<ChessMove>) {
        self.nodes += 1;
        if depth == 0 || pos.outcome().is_some() {
            return (self.horizon(pos, side, eval), None);
        }

        let mut best = f64::NEG_INFINITY;
        let mut best_move: Option<ChessMove> = None;
        let moves: Vec<ChessMove> = pos.legal_moves().collect();
        for m in moves {
            pos.push(m);
            let (child, _) = self.negamax(depth - 1, pos, opp(side), eval);
            pos.pop();
            let score = -child;
            if score > best {
                best = score;
                best_move = Some(m);
            } else if score == best && self.tie_break() {
                best_move = Some(m);
            }
        }
        (best, best_move)
    }

    /// Negamax with alpha-beta pruning, no memo.
    pub fn alpha_beta(
        &mut self,
        depth: u32,
        mut alpha: f64,
        beta: f64,
        pos: &mut Position,
        side: Color,
        eval: &dyn Evaluator,
    ) -> (f64, Option<ChessMove>) {
        self.nodes += 1;
        if depth == 0 || pos.outcome().is_some() {
            return (self.horizon(pos, side, eval), None);
        }

        let mut best = f64::NEG_INFINITY;
        let mut best_move: Option<ChessMove> = None;
        let moves: Vec<ChessMove> = pos.legal_moves().collect();
        for m in moves {
            pos.push(m);
            let (child, _) = self.alpha_beta(depth - 1, -beta, -alpha, pos, opp(side), eval);
            pos.pop();
            let score = -child;
            if score > best {
                best = score;
                best_move = Some(m);
            } else if score == best && self.tie_break() {
                best_move = Some(m);
            }
            alpha = alpha.max(best);
            if alpha >= beta {
                break;
            }
        }
        (best, best_move)
    }

    /// Two-sided minimax from `side`'s fixed point of view: nodes where
    /// `side` is on move maximize, the others minimize.
    pub fn minimax(
        &mut self,
        depth: u32,
        pos: &mut Position,
        side: Color,
        eval: &dyn Evaluator,
    ) -> (f64, Option<ChessMove>) {
        self.nodes += 1;
        if depth == 0 || pos.outcome().is_some() {
            return (self.horizon(pos, side, eval), None);
        }

        let maximizing = pos.turn() == side;
        let mut best = if maximizing { f64::NEG_INFINITY } else { f64::INFINITY };
        let mut best_move: Option<ChessMove> = None;
        let moves: Vec<ChessMove> = pos.legal_moves().collect();
        for m in moves {
            pos.push(m);
            let (child, _) = self.minimax(depth - 1, pos, side, eval);
            pos.pop();
            let better = if maximizing { child > best } else { child < best };
            if better {
                best = child;
                best_move = Some(m);
            } else if child == best && self.tie_break() {
                best_move = Some(m);
            }
        }
        (best, best_move)
    }

    /// Minimax with alpha-beta pruning.
    pub fn minimax_ab(
        &mut self,
        depth: u32,
        mut alpha: f64,
        mut beta: f64,
        pos: &mut Position,
        side: Color,
        eval: &dyn Evaluator,
    ) -> (f64, Option<ChessMove>) {
        self.nodes += 1;
        if depth == 0 || pos.outcome().is_some() {
            return (self.horizon(pos, side, eval), None);
        }

        let maximizing = pos.turn() == side;
        let mut best = if maximizing { f64::NEG_INFINITY } else { f64::INFINITY };
        let mut best_move: Option<ChessMove> = None;
        let moves: Vec<ChessMove> = pos.legal_moves().collect();
        for m in moves {
            pos.push(m);
            let (child, _) = self.minimax_ab(depth - 1, alpha, beta, pos, side, eval);
            pos.pop();
            let better = if maximizing { child > best } else { child < best };
            if better {
                best = child;
                best_move = Some(m);
            } else if child == best && self.tie_break() {
                best_move = Some(m);
            }
            if maximizing {
                alpha = alpha.max(best);
            } else {
                beta = beta.min(best);
            }
            if alpha >= beta {
                break;
            }
        }
        (best, best_move)
    }

    // ---------------------------
    // Iterative deepening
    // ---------------------------

    /// Search depths 1..=`max_depth` under a wall-clock budget, sharing the
    /// memo between iterations, and commit to the deepest completed result.
    /// The clock is polled between iterations only; an iteration in flight
    /// is never interrupted.
    pub fn iterative(
        &mut self,
        max_depth: u32,
        timeout: Duration,
        pos: &mut Position,
        eval: &dyn Evaluator,
        memo: &mut Memo,
    ) -> (f64, Option<ChessMove>) {
        let start = Instant::now();
        let mut result = (f64::NEG_INFINITY, None);
        let mut previous = Duration::ZERO;

        for d in 1..=max_depth {
            let side = pos.turn();
            result = self.search(
                d,
                f64::NEG_INFINITY,
                f64::INFINITY,
                pos,
                side,
                eval,
                memo,
            );
            let elapsed = start.elapsed();
            debug!(
                "depth {d}: score {:.1}, {} nodes, {} evals, {elapsed:.0?}",
                result.0, self.nodes, self.evals
            );
            if elapsed >= timeout {
                return result;
            }
            // Project the next iteration from this one's growth.
            if elapsed + (elapsed - previous) >= timeout {
                break;
            }
            previous = elapsed;
        }
        result
    }
}

impl Default for Search {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eval::{MaterialEval, RapidEval};
    use chess::Square;
    use std::str::FromStr;

    const NEG_INF: f64 = f64::NEG_INFINITY;
    const INF: f64 = f64::INFINITY;

    const MIDGAME: &str = "r1bqkbnr/pppp1ppp/2n5/1B2p3/4P3/5N2/PPPP1PPP/RNBQK2R b KQkq - 3 3";
    const ROOK_ENDING: &str = "6k1/5ppp/8/8/8/8/5PPP/R5K1 w - - 0 1";

    fn position(fen: &str) -> Position {
        Position::from_fen(fen).expect("valid fen")
    }

    #[test]
    fn search_restores_the_position_at_every_depth() {
        for fen in [MIDGAME, ROOK_ENDING] {
            let mut pos = position(fen);
            let fp = pos.fingerprint();
            let clock = pos.halfmove_clock();
            for depth in 0..=3 {
                let mut search = Search::deterministic();
                let mut memo = Memo::with_capacity_mb(8);
                let side = pos.turn();
                search.search(depth, NEG_INF, INF, &mut pos, side, &RapidEval, &mut memo);
                assert_eq!(pos.fingerprint(), fp);
                assert_eq!(pos.halfmove_clock(), clock);
                assert_eq!(pos.ply(), 0);
            }
        }
    }

    #[test]
    fn pruned_and_memoized_searches_match_plain_negamax() {
        for fen in [MIDGAME, ROOK_ENDING] {
            for depth in 1..=3 {
                let mut pos = position(fen);
                let side = pos.turn();

                let mut plain = Search::deterministic();
                let (plain_score, plain_move) = plain.negamax(depth, &mut pos, side, &MaterialEval);

                let mut pruned = Search::deterministic();
                let (ab_score, ab_move) =
                    pruned.alpha_beta(depth, NEG_INF, INF, &mut pos, side, &MaterialEval);

                let mut memoized = Search::deterministic();
                let mut memo = Memo::with_capacity_mb(8);
                let (memo_score, _) = memoized.search(
                    depth, NEG_INF, INF, &mut pos, side, &MaterialEval, &mut memo,
                );

                assert_eq!(plain_score, ab_score, "{fen} at depth {depth}");
                assert_eq!(plain_score, memo_score, "{fen} at depth {depth}");
                assert_eq!(plain_move, ab_move, "{fen} at depth {depth}");
                assert!(pruned.nodes <= plain.nodes);
            }
        }
    }

    #[test]
    fn repeated_search_with_a_shared_memo_keeps_its_score() {
        let mut pos = position(MIDGAME);
        let side = pos.turn();
        let mut search = Search::deterministic();
        let mut memo = Memo::with_capacity_mb(8);
        let (first, _) = search.search(3, NEG_INF, INF, &mut pos, side, &RapidEval, &mut memo);
        let (second, _) = search.search(3, NEG_INF, INF, &mut pos, side, &RapidEval, &mut memo);
        assert_eq!(first, second);
    }

    #[test]
    fn depth_one_rapid_picks_the_best_reply_value() {
        let mut pos = Position::default();
        let mut search = Search::deterministic();
        let mut memo = Memo::with_capacity_mb(8);
        let (score, mv) =
            search.search(1, NEG_INF, INF, &mut pos, Color::White, &RapidEval, &mut memo);
        let mv = mv.expect("an opening move");

        let legal: Vec<ChessMove> = pos.legal_moves().collect();
        assert!(legal.contains(&mv));

        // The score must be the maximum over all replies of the negated
        // rapid evaluation from the opponent's seat.
        let mut expected = NEG_INF;
        for m in legal {
            pos.push(m);
            expected = expected.max(-RapidEval.eval(&mut pos, Color::Black));
            pos.pop();
        }
        assert_eq!(score, expected);
    }

    #[test]
    fn mate_in_one_is_found_and_scored_as_mate() {
        let ra8 = ChessMove::new(
            Square::from_str("a1").unwrap(),
            Square::from_str("a8").unwrap(),
            None,
        );
        for depth in [1, 2] {
            let mut pos = position(ROOK_ENDING);
            let mut search = Search::deterministic();
            let mut memo = Memo::with_capacity_mb(8);
            let (score, mv) =
                search.search(depth, NEG_INF, INF, &mut pos, Color::White, &RapidEval, &mut memo);
            assert_eq!(mv, Some(ra8), "depth {depth}");
            assert!(score >= 20_000.0, "depth {depth}: {score}");
        }
    }

    #[test]
    fn transposed_move_orders_reuse_the_memo() {
        let mut search = Search::deterministic();
        let mut memo = Memo::with_capacity_mb(8);

        let mut a = Position::default();
        for s in ["e2e4", "e7e5", "g1f3", "b8c6"] {
            let mv = a.parse_move(s).unwrap();
            a.push(mv);
        }
        let mut b = Position::default();
        for s in ["g1f3", "b8c6", "e2e4", "e7e5"] {
            let mv = b.parse_move(s).unwrap();
            b.push(mv);
        }
        assert_eq!(a.fingerprint(), b.fingerprint());

        let side = a.turn();
        search.search(3, NEG_INF, INF, &mut a, side, &RapidEval, &mut memo);
        let first_run = search.evals;

        search.reset_counters();
        search.search(3, NEG_INF, INF, &mut b, side, &RapidEval, &mut memo);
        let second_run = search.evals;

        assert!(first_run > 0);
        assert!(
            second_run < first_run,
            "{second_run} evals after transposition vs {first_run}"
        );
    }

    #[test]
    fn deepening_matches_a_manual_depth_sequence() {
        let mut pos = position(MIDGAME);
        let side = pos.turn();

        let mut driver = Search::deterministic();
        let mut driver_memo = Memo::with_capacity_mb(8);
        let (score, mv) = driver.iterative(
            3,
            Duration::from_secs(3600),
            &mut pos,
            &RapidEval,
            &mut driver_memo,
        );

        let mut manual = Search::deterministic();
        let mut manual_memo = Memo::with_capacity_mb(8);
        let mut expected = (NEG_INF, None);
        for d in 1..=3 {
            expected =
                manual.search(d, NEG_INF, INF, &mut pos, side, &RapidEval, &mut manual_memo);
        }

        assert_eq!(score, expected.0);
        assert_eq!(mv, expected.1);
    }

    #[test]
    fn deepening_commits_to_a_complete_iteration_under_pressure() {
        let mut pos = position(MIDGAME);
        let mut search = Search::deterministic();
        let mut memo = Memo::with_capacity_mb(8);
        let (score, mv) = search.iterative(
            30,
            Duration::from_millis(10),
            &mut pos,
            &RapidEval,
            &mut memo,
        );
        let mv = mv.expect("at least depth 1 completes");
        let legal: Vec<ChessMove> = pos.legal_moves().collect();
        assert!(legal.contains(&mv));
        assert!(score.is_finite());
    }

    #[test]
    fn minimax_family_agrees_with_itself() {
        for depth in 1..=2 {
            let mut pos = position(MIDGAME);
            let side = pos.turn();
            let mut plain = Search::deterministic();
            let (mm_score, mm_move) = plain.minimax(depth, &mut pos, side, &MaterialEval);
            let mut pruned = Search::deterministic();
            let (ab_score, ab_move) =
                pruned.minimax_ab(depth, NEG_INF, INF, &mut pos, side, &MaterialEval);
            assert_eq!(mm_score, ab_score, "depth {depth}");
            assert_eq!(mm_move, ab_move, "depth {depth}");
            assert!(pruned.nodes <= plain.nodes);
        }
    }

    #[test]
    fn seeded_tie_break_is_reproducible() {
        let run = |seed: u64| {
            let mut pos = Position::default();
            let mut search = Search::seeded(seed);
            let mut memo = Memo::with_capacity_mb(8);
            search.search(2, NEG_INF, INF, &mut pos, Color::White, &MaterialEval, &mut memo)
        };
        assert_eq!(run(7), run(7));
    }
}
