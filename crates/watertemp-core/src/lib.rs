//! Hardware-independent core library for watertemp
//!
//! This crate contains the whole telemetry loop of the watertemp logger:
//! DS18B20 probe discovery and sampling, running extrema, the bounded SD card
//! storage window and CSV record format, and text rendering for the two
//! display surfaces. Hardware is reached through the collaborator traits in
//! [`sensors`], [`storage`], [`display_manager`] and [`telemetry`].
//!
//! It is `#![no_std]` with `extern crate alloc` so it compiles on both
//! embedded targets and desktop hosts (for the simulator and tests).

#![no_std]

extern crate alloc;

pub mod app_state;
pub mod config;
pub mod display_manager;
pub mod framebuffer;
pub mod sensors;
pub mod stats;
pub mod storage;
pub mod surface;
pub mod telemetry;

#[cfg(test)]
pub(crate) mod testing;
