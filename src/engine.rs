use std::time::Duration;

use chess::Color;
use thiserror::Error;

use crate::eval::{Evaluator, RapidEval};
use crate::memo::Memo;
use crate::position::Position;
use crate::search::Search;
use crate::types::{DEFAULT_DEPTH, DEFAULT_TIMEOUT};

#[derive(Debug, Error)]
pub enum EngineError {
    /// Opponent input does not parse or is not legal here.
    #[error("invalid move: {input}")]
    InvalidMove { input: String },

    /// A move was requested on a finished position.
    #[error("no legal move available")]
    NoLegalMove,
}

/// One side of a game: holds the position, the chosen evaluator and the
/// score memo across turns.
pub struct Engine {
    position: Position,
    color: Color,
    evaluator: Box<dyn Evaluator>,
    memo: Memo,
    search: Search,
}

impl Engine {
    pub fn new(position: Position, color: Color) -> Self {
        Self::with_evaluator(position, color, Box::new(RapidEval))
    }

    pub fn with_evaluator(
        position: Position,
        color: Color,
        evaluator: Box<dyn Evaluator>,
    ) -> Self {
        Self {
            position,
            color,
            evaluator,
            memo: Memo::new(),
            search: Search::new(),
        }
    }

    pub fn position(&self) -> &Position {
        &self.position
    }

    pub fn color(&self) -> Color {
        self.color
    }

    /// Apply the opponent's move, given in coordinate notation.
    pub fn apply_opponent_move(&mut self, uci: &str) -> Result<(), EngineError> {
        let mv = self
            .position
            .parse_move(uci.trim())
            .ok_or_else(|| EngineError::InvalidMove { input: uci.trim().to_string() })?;
        self.position.push(mv);
        Ok(())
    }

    /// Pick, play and return (in coordinate notation) the engine's move.
    pub fn choose_move(&mut self) -> Result<String, EngineError> {
        self.choose_move_within(DEFAULT_DEPTH, DEFAULT_TIMEOUT)
    }

    pub fn choose_move_within(
        &mut self,
        max_depth: u32,
        timeout: Duration,
    ) -> Result<String, EngineError> {
        if self.position.outcome().is_some() {
            return Err(EngineError::NoLegalMove);
        }
        self.search.reset_counters();
        let (_, mv) = self.search.iterative(
            max_depth,
            timeout,
            &mut self.position,
            self.evaluator.as_ref(),
            &mut self.memo,
        );
        let mv = mv.ok_or(EngineError::NoLegalMove)?;
        log::debug!("playing {mv} after {} nodes", self.search.nodes);
        self.position.push(mv);
        Ok(mv.to_string())
    }
}
