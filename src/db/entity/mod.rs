pub mod price_alert;
pub mod wallet_alert;
