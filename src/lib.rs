pub mod engine;
pub mod eval;
pub mod memo;
pub mod position;
pub mod search;
pub mod types;

pub use engine::{Engine, EngineError};
pub use eval::{CombinedEval, Evaluator, MaterialEval, PositionalEval, RapidEval};
pub use memo::{Bound, Entry, Memo};
pub use position::{LastMove, Outcome, Position};
pub use search::Search;
pub use types::*;
