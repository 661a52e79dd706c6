/// Blast Grid simulation core.
///
/// `domain` holds the pure tile rules, entities and AI; `sim` owns a round
/// and advances it frame by frame. The terminal front end lives in the binary.

pub mod config;
pub mod domain;
pub mod sim;
