// Library exports for testing
pub mod cli;
pub mod collector;
pub mod config;
pub mod engine;
pub mod error;
pub mod language;
pub mod metadata;
pub mod model;
pub mod normalize;
pub mod report;
pub mod session;
pub mod similarity;

pub use engine::{pair, PairingEngine, PairingOptions};
pub use error::ValidationError;
pub use model::{
    AmbiguousMatch, DiscoveredFile, FileError, FileKind, MatchDecision, MatchReason, MatchedPair,
    PairingResult, TieBreak,
};
