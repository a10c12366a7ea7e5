use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait,
    ActiveValue,
    ColumnTrait,
    DatabaseConnection,
    EntityTrait,
    QueryFilter,
    QueryOrder,
    prelude::Decimal,
};
use uuid::Uuid;

use crate::enums::{ AlertCondition, AlertKind, Direction, Network };
use crate::error::{ AppError, Result };
use crate::providers::{
    AlertStore,
    NewPriceAlert,
    NewWalletAlert,
    PriceAlert,
    UserPriceAlerts,
    UserWalletAlerts,
    WalletAlert,
};

pub mod entity;
pub use entity::*;

/// Safely convert a Decimal to f64, returning None on parse failure
fn decimal_to_f64(d: Decimal) -> Option<f64> {
    d.to_string().parse::<f64>().ok()
}

fn f64_to_decimal(v: f64) -> Result<Decimal> {
    Decimal::from_f64_retain(v).ok_or_else(|| {
        AppError::InvalidAmount(format!("Value not representable as decimal: {}", v))
    })
}

/// Rebuild the domain condition from the kind tag and its columns.
/// Returns None for rows whose columns don't match the tag.
fn condition_from_row(row: &price_alert::Model) -> Option<AlertCondition> {
    let kind = row.kind.parse::<AlertKind>().ok()?;

    match kind {
        AlertKind::Percentage => {
            let threshold = row.threshold.and_then(decimal_to_f64)?;
            let direction = row.direction.as_deref()?.parse::<Direction>().ok()?;
            Some(AlertCondition::Percentage { threshold, direction })
        }
        AlertKind::Exact => {
            let target_price = row.target_price.and_then(decimal_to_f64)?;
            Some(AlertCondition::Exact { target_price })
        }
        AlertKind::Above => {
            let target_price = row.target_price.and_then(decimal_to_f64)?;
            Some(AlertCondition::Above { target_price })
        }
        AlertKind::Below => {
            let target_price = row.target_price.and_then(decimal_to_f64)?;
            Some(AlertCondition::Below { target_price })
        }
    }
}

fn price_alert_from_row(row: &price_alert::Model) -> Option<PriceAlert> {
    let condition = condition_from_row(row)?;
    let last_price = decimal_to_f64(row.last_price)?;

    Some(PriceAlert {
        id: row.id,
        token: row.token.clone(),
        condition,
        last_price,
    })
}

fn wallet_alert_from_row(row: &wallet_alert::Model) -> Option<WalletAlert> {
    Some(WalletAlert {
        id: row.id,
        address: row.address.clone(),
        network: row.network.parse::<Network>().ok()?,
        min_value: decimal_to_f64(row.min_value)?,
        name: row.name.clone(),
    })
}

#[derive(Clone)]
pub struct AlertRepository {
    db: DatabaseConnection,
}

impl AlertRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// All price alerts for one user, oldest first. Used by the bot's
    /// /list command.
    pub async fn list_user_alerts(&self, user_id: &str) -> Result<Vec<PriceAlert>> {
        let rows = price_alert::Entity
            ::find()
            .filter(price_alert::Column::UserId.eq(user_id))
            .order_by_asc(price_alert::Column::CreatedAt)
            .all(&self.db).await?;

        Ok(rows.iter().filter_map(price_alert_from_row).collect())
    }

    /// All wallet alerts for one user, oldest first.
    pub async fn list_user_wallet_alerts(&self, user_id: &str) -> Result<Vec<WalletAlert>> {
        let rows = wallet_alert::Entity
            ::find()
            .filter(wallet_alert::Column::UserId.eq(user_id))
            .order_by_asc(wallet_alert::Column::CreatedAt)
            .all(&self.db).await?;

        Ok(rows.iter().filter_map(wallet_alert_from_row).collect())
    }
}

#[async_trait]
impl AlertStore for AlertRepository {
    async fn users_with_alerts(&self) -> Result<Vec<UserPriceAlerts>> {
        let rows = price_alert::Entity
            ::find()
            .order_by_asc(price_alert::Column::UserId)
            .order_by_asc(price_alert::Column::CreatedAt)
            .all(&self.db).await?;

        let mut users: Vec<UserPriceAlerts> = Vec::new();

        for row in rows {
            let alert = match price_alert_from_row(&row) {
                Some(alert) => alert,
                None => {
                    tracing::warn!("Skipping malformed price alert row {}", row.id);
                    continue;
                }
            };

            match users.last_mut() {
                Some(user) if user.user_id == row.user_id => user.alerts.push(alert),
                _ =>
                    users.push(UserPriceAlerts {
                        user_id: row.user_id.clone(),
                        alerts: vec![alert],
                    }),
            }
        }

        Ok(users)
    }

    async fn users_with_wallet_alerts(&self, network: Network) -> Result<Vec<UserWalletAlerts>> {
        let rows = wallet_alert::Entity
            ::find()
            .filter(wallet_alert::Column::Network.eq(network.as_str()))
            .order_by_asc(wallet_alert::Column::UserId)
            .order_by_asc(wallet_alert::Column::CreatedAt)
            .all(&self.db).await?;

        let mut users: Vec<UserWalletAlerts> = Vec::new();

        for row in rows {
            let alert = match wallet_alert_from_row(&row) {
                Some(alert) => alert,
                None => {
                    tracing::warn!("Skipping malformed wallet alert row {}", row.id);
                    continue;
                }
            };

            match users.last_mut() {
                Some(user) if user.user_id == row.user_id => user.alerts.push(alert),
                _ =>
                    users.push(UserWalletAlerts {
                        user_id: row.user_id.clone(),
                        alerts: vec![alert],
                    }),
            }
        }

        Ok(users)
    }

    async fn append_alert(&self, user_id: &str, alert: NewPriceAlert) -> Result<PriceAlert> {
        let now = Utc::now();
        let id = Uuid::new_v4();

        let (threshold, direction, target_price) = match &alert.condition {
            AlertCondition::Percentage { threshold, direction } => {
                (Some(f64_to_decimal(*threshold)?), Some(direction.to_string()), None)
            }
            | AlertCondition::Exact { target_price }
            | AlertCondition::Above { target_price }
            | AlertCondition::Below { target_price } => {
                (None, None, Some(f64_to_decimal(*target_price)?))
            }
        };

        let row = price_alert::ActiveModel {
            id: ActiveValue::Set(id),
            user_id: ActiveValue::Set(user_id.to_string()),
            token: ActiveValue::Set(alert.token.clone()),
            kind: ActiveValue::Set(alert.condition.kind().to_string()),
            threshold: ActiveValue::Set(threshold),
            direction: ActiveValue::Set(direction),
            target_price: ActiveValue::Set(target_price),
            last_price: ActiveValue::Set(f64_to_decimal(alert.last_price)?),
            created_at: ActiveValue::Set(now),
            updated_at: ActiveValue::Set(now),
        };

        row.insert(&self.db).await?;

        Ok(PriceAlert {
            id,
            token: alert.token,
            condition: alert.condition,
            last_price: alert.last_price,
        })
    }

    async fn append_wallet_alert(
        &self,
        user_id: &str,
        alert: NewWalletAlert
    ) -> Result<WalletAlert> {
        let id = Uuid::new_v4();

        let row = wallet_alert::ActiveModel {
            id: ActiveValue::Set(id),
            user_id: ActiveValue::Set(user_id.to_string()),
            address: ActiveValue::Set(alert.address.clone()),
            network: ActiveValue::Set(alert.network.to_string()),
            min_value: ActiveValue::Set(f64_to_decimal(alert.min_value)?),
            name: ActiveValue::Set(alert.name.clone()),
            created_at: ActiveValue::Set(Utc::now()),
        };

        row.insert(&self.db).await?;

        Ok(WalletAlert {
            id,
            address: alert.address,
            network: alert.network,
            min_value: alert.min_value,
            name: alert.name,
        })
    }

    async fn update_alert_last_price(
        &self,
        user_id: &str,
        alert_id: Uuid,
        price: f64
    ) -> Result<()> {
        let row = price_alert::Entity
            ::find_by_id(alert_id)
            .filter(price_alert::Column::UserId.eq(user_id))
            .one(&self.db).await?;

        if let Some(row) = row {
            let mut active: price_alert::ActiveModel = row.into();
            active.last_price = ActiveValue::Set(f64_to_decimal(price)?);
            active.updated_at = ActiveValue::Set(Utc::now());
            active.update(&self.db).await?;
        }

        Ok(())
    }

    async fn delete_alert(&self, user_id: &str, alert_id: Uuid) -> Result<()> {
        price_alert::Entity
            ::delete_many()
            .filter(price_alert::Column::Id.eq(alert_id))
            .filter(price_alert::Column::UserId.eq(user_id))
            .exec(&self.db).await?;

        Ok(())
    }
}
