pub mod check;
pub mod config;
pub mod projects;
pub mod resolve;
pub mod roles;
pub mod visibility;
