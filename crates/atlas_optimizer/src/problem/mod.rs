pub mod amount;
pub mod brk;
pub mod eval;
pub mod job;
pub mod location;
pub mod matrix;
pub mod profile;
pub mod skill;
pub mod time_window;
pub mod vehicle;
pub mod vrp;
