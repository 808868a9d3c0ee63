pub mod ai;
pub mod sources;
