pub mod ai;
pub mod entity;
pub mod grid;
pub mod motion;
pub mod powerup;
pub mod rules;
pub mod tile;
