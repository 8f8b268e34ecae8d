//! Core library for the swap-loop project.
//!
//! The binary (`main.rs`) wires the concrete chain, exchange and notifier
//! adapters into [`controller::SwapLoopController`].

pub mod chain;
pub mod config;
pub mod controller;
pub mod errors;
pub mod exchange;
pub mod models;
pub mod notifier;
pub mod utils;
