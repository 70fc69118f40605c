pub mod player;
pub mod style;
