pub mod attendance;
pub mod classes;
pub mod core;
pub mod scores;
pub mod tables;
