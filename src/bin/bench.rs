//! Self-play timing harness: plays each search algorithm against itself
//! from the starting position and reports the mean decision time per ply.

use std::time::{Duration, Instant};

use chess::ChessMove;

use memomax::{Memo, Position, RapidEval, Search};

/// Games are cut off after this many plies so the slow algorithms finish.
const MAX_PLIES: u32 = 40;
const MAX_DEPTH: u32 = 3;

fn run<F>(label: &str, depth: u32, mut decide: F)
where
    F: FnMut(&mut Position) -> Option<ChessMove>,
{
    let mut pos = Position::default();
    let mut total = Duration::ZERO;
    let mut plies = 0u32;

    while pos.outcome().is_none() && plies < MAX_PLIES {
        let start = Instant::now();
        let mv = decide(&mut pos);
        total += start.elapsed();
        match mv {
            Some(m) => {
                pos.push(m);
                plies += 1;
            }
            None => break,
        }
    }

    let avg_ms = total.as_secs_f64() * 1000.0 / plies.max(1) as f64;
    println!("{label:<12} depth {depth}  {avg_ms:>9.2} ms/ply  ({plies} plies)");
}

fn main() {
    env_logger::init();

    const NEG_INF: f64 = f64::NEG_INFINITY;
    const INF: f64 = f64::INFINITY;

    for depth in 1..=MAX_DEPTH {
        let mut search = Search::deterministic();
        run("minimax", depth, |pos| {
            let side = pos.turn();
            search.minimax(depth, pos, side, &RapidEval).1
        });

        let mut search = Search::deterministic();
        run("minimax-ab", depth, |pos| {
            let side = pos.turn();
            search.minimax_ab(depth, NEG_INF, INF, pos, side, &RapidEval).1
        });

        let mut search = Search::deterministic();
        run("negamax", depth, |pos| {
            let side = pos.turn();
            search.negamax(depth, pos, side, &RapidEval).1
        });

        let mut search = Search::deterministic();
        run("alpha-beta", depth, |pos| {
            let side = pos.turn();
            search.alpha_beta(depth, NEG_INF, INF, pos, side, &RapidEval).1
        });

        let mut search = Search::deterministic();
        let mut memo = Memo::new();
        run("memoized", depth, |pos| {
            let side = pos.turn();
            search
                .search(depth, NEG_INF, INF, pos, side, &RapidEval, &mut memo)
                .1
        });
    }

    // Deepening runs against a time budget instead of a fixed depth.
    let mut search = Search::deterministic();
    let mut memo = Memo::new();
    run("deepening", MAX_DEPTH, |pos| {
        search
            .iterative(
                MAX_DEPTH,
                Duration::from_millis(500),
                pos,
                &RapidEval,
                &mut memo,
            )
            .1
    });
}
