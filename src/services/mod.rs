pub mod clip_engine;
pub mod history;
pub mod prune;
pub mod session;
