//! Main module for tw library functionality

pub mod analysis;
pub mod color;
pub mod config;
pub mod lexing;
pub mod location;
pub mod playback;
pub mod tags;
pub mod testing;
pub mod token;
