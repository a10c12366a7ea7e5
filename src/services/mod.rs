pub mod price_service;
pub mod price_alert_service;

pub use price_service::{ PriceService, TokenIndex };
pub use price_alert_service::{ CreateAlertOutcome, PriceAlertService };
