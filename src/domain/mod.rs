pub mod types;

pub use types::{RawPrediction, ScoredEmotion};
