//! Stock research newsletter
//!
//! Three agents research one ticker and write a markdown newsletter:
//!
//! - a price analyst reads a year of Yahoo Finance price history and labels
//!   the trend up, down or sideways;
//! - a news analyst searches DuckDuckGo news for the ticker (and BTC) and
//!   scores fear/greed;
//! - a writer turns both reports into a three paragraph newsletter.
//!
//! A manager agent runs the tasks hierarchically. The crew is exposed via
//! a small web form ([`web`]) and the `stock-newsletter` binary.

pub mod analysis;
pub mod api;
pub mod app;
pub mod cache;
pub mod config;
pub mod crew;
pub mod error;
pub mod tools;
pub mod web;

pub use app::{build_runner, build_runner_with};
pub use config::{AppConfig, AppConfigBuilder};
pub use crew::{CrewResearchRunner, ResearchRunner, newsletter_crew};
pub use error::{Result, StockError};
