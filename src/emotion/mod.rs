pub mod normalizer;
pub mod palette;

pub use normalizer::{NormalizeError, Normalizer, NormalizerConfig, OverrideRule};
pub use palette::Palette;
