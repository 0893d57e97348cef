pub mod assistant;
pub mod attendance;
pub mod classes;
pub mod coins;
pub mod core;
pub mod dashboard;
pub mod detect;
pub mod export;
pub mod leave;
pub mod session;
