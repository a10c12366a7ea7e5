pub mod config;
pub mod enums;
pub mod error;
pub mod db;
pub mod providers;
pub mod chains;
pub mod services;
pub mod bot;
pub mod alert_checker;
pub mod wallet_monitor;

#[cfg(test)]
mod testutil;

pub use config::Config;
pub use enums::{ AlertCondition, AlertKind, Direction, Network };
pub use error::{ AppError, Result };
