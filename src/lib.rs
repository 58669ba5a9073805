pub mod autoplay;
pub mod catalog;
pub mod config;
pub mod constants;
pub mod conveyor;
pub mod economy;
pub mod engine;
pub mod geometry;
pub mod matching;
pub mod path;
pub mod physics;
pub mod rng;
pub mod server_protocol;
pub mod server_utils;
pub mod types;
pub mod visitor;
