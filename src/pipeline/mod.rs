pub mod persistence;
pub mod project;
