//! Core domain types and logic.

pub mod price_bar;
pub mod indicator;
pub mod indicator_helpers;
pub mod bar_signal;
pub mod technical;
pub mod option_chain;
pub mod sizing;
pub mod greeks;
pub mod strategy;
pub mod selector;
pub mod position;
pub mod portfolio;
pub mod backtest;
pub mod metrics;
pub mod config;
pub mod config_validation;
pub mod diagnostics;
pub mod universe;
pub mod error;
