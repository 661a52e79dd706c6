pub mod bomb;
pub mod event;
pub mod hazard;
pub mod level;
pub mod progress;
pub mod round;
pub mod step;
