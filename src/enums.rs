use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::AppError;

// ─── Network ─────────────────────────────────────────────────────────

/// Blockchain networks watched by the wallet monitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Network {
    Ethereum,
    Bsc,
    Polygon,
}

impl Network {
    /// Canonical string stored in the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            Network::Ethereum => "ethereum",
            Network::Bsc => "bsc",
            Network::Polygon => "polygon",
        }
    }

    /// Native token symbol for the network.
    pub fn native_symbol(&self) -> &'static str {
        match self {
            Network::Ethereum => "ETH",
            Network::Bsc => "BNB",
            Network::Polygon => "MATIC",
        }
    }

    /// Default block explorer URL.
    pub fn explorer_url(&self) -> &'static str {
        match self {
            Network::Ethereum => "https://etherscan.io",
            Network::Bsc => "https://bscscan.com",
            Network::Polygon => "https://polygonscan.com",
        }
    }

    /// Human-readable display name.
    pub fn display_name(&self) -> &'static str {
        match self {
            Network::Ethereum => "Ethereum",
            Network::Bsc => "BSC",
            Network::Polygon => "Polygon",
        }
    }

    pub fn all() -> &'static [Network] {
        &[Network::Ethereum, Network::Bsc, Network::Polygon]
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Network {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ethereum" | "eth" => Ok(Network::Ethereum),
            "bsc" | "bnb" | "binance" => Ok(Network::Bsc),
            "polygon" | "matic" | "pol" => Ok(Network::Polygon),
            _ => Err(AppError::InvalidNetwork(format!(
                "Unsupported network: {}. Supported: ethereum, bsc, polygon",
                s
            ))),
        }
    }
}

// ─── Direction ───────────────────────────────────────────────────────

/// Direction of a percentage-change alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Up,
    Down,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Up => "up",
            Direction::Down => "down",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Direction {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "up" => Ok(Direction::Up),
            "down" => Ok(Direction::Down),
            _ => Err(AppError::InvalidInput(format!(
                "Invalid direction: {}. Supported: up, down",
                s
            ))),
        }
    }
}

// ─── AlertCondition ──────────────────────────────────────────────────

/// Price alert trigger condition.
#[derive(Debug, Clone, PartialEq)]
pub enum AlertCondition {
    /// Relative move from the last observed price.
    Percentage { threshold: f64, direction: Direction },
    /// Current price within a tolerance band of the target.
    Exact { target_price: f64 },
    /// Upward crossing of the target (edge-triggered).
    Above { target_price: f64 },
    /// Downward crossing of the target (edge-triggered).
    Below { target_price: f64 },
}

/// The discriminant stored in the database (no payload).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlertKind {
    Percentage,
    Exact,
    Above,
    Below,
}

impl AlertCondition {
    pub fn kind(&self) -> AlertKind {
        match self {
            AlertCondition::Percentage { .. } => AlertKind::Percentage,
            AlertCondition::Exact { .. } => AlertKind::Exact,
            AlertCondition::Above { .. } => AlertKind::Above,
            AlertCondition::Below { .. } => AlertKind::Below,
        }
    }

    /// Whether the alert fires given the previous and current price.
    ///
    /// Above/Below are edge-triggered: a price that was already past the
    /// target does not fire again on the next cycle. `exact_tolerance` is
    /// the configured fraction for the Exact tolerance band.
    pub fn should_trigger(&self, last: f64, current: f64, exact_tolerance: f64) -> bool {
        match self {
            AlertCondition::Percentage { threshold, direction } => {
                if last == 0.0 {
                    return false;
                }
                let change = (current - last) / last;
                let is_up = current > last;
                match direction {
                    Direction::Up => is_up && change >= *threshold,
                    Direction::Down => !is_up && change.abs() >= *threshold,
                }
            }
            AlertCondition::Exact { target_price } => {
                (current - target_price).abs() <= target_price * exact_tolerance
            }
            AlertCondition::Above { target_price } => {
                current >= *target_price && last < *target_price
            }
            AlertCondition::Below { target_price } => {
                current <= *target_price && last > *target_price
            }
        }
    }

    /// Whether the condition already holds at creation time, before any
    /// baseline exists. Persisting such an alert would leave the crossing
    /// condition permanently unreachable, so the caller notifies
    /// immediately instead. Percentage alerts are always relative to the
    /// baseline captured at creation and never count as satisfied here.
    pub fn already_satisfied(&self, current: f64, exact_tolerance: f64) -> bool {
        match self {
            AlertCondition::Percentage { .. } => false,
            AlertCondition::Exact { target_price } => {
                (current - target_price).abs() <= target_price * exact_tolerance
            }
            AlertCondition::Above { target_price } => current >= *target_price,
            AlertCondition::Below { target_price } => current <= *target_price,
        }
    }
}

impl AlertKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertKind::Percentage => "percentage",
            AlertKind::Exact => "exact",
            AlertKind::Above => "above",
            AlertKind::Below => "below",
        }
    }
}

impl fmt::Display for AlertKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AlertKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "percentage" => Ok(AlertKind::Percentage),
            "exact" => Ok(AlertKind::Exact),
            "above" => Ok(AlertKind::Above),
            "below" => Ok(AlertKind::Below),
            _ => Err(AppError::InvalidInput(format!(
                "Invalid alert kind: {}. Supported: percentage, exact, above, below",
                s
            ))),
        }
    }
}
