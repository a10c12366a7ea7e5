use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.create_table(
            Table::create()
                .table(WalletAlerts::Table)
                .if_not_exists()
                .col(ColumnDef::new(WalletAlerts::Id).uuid().not_null().primary_key())
                .col(ColumnDef::new(WalletAlerts::UserId).string().not_null())
                .col(ColumnDef::new(WalletAlerts::Address).string().not_null())
                .col(ColumnDef::new(WalletAlerts::Network).string().not_null()) // "ethereum", "bsc", "polygon"
                .col(ColumnDef::new(WalletAlerts::MinValue).decimal().not_null())
                .col(ColumnDef::new(WalletAlerts::Name).string())
                .col(ColumnDef::new(WalletAlerts::CreatedAt).timestamp_with_time_zone().not_null())
                .to_owned()
        ).await?;

        // Create indexes
        manager.create_index(
            Index::create()
                .if_not_exists()
                .name("idx_wallet_alerts_user_id")
                .table(WalletAlerts::Table)
                .col(WalletAlerts::UserId)
                .to_owned()
        ).await?;

        manager.create_index(
            Index::create()
                .if_not_exists()
                .name("idx_wallet_alerts_network")
                .table(WalletAlerts::Table)
                .col(WalletAlerts::Network)
                .to_owned()
        ).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(WalletAlerts::Table).to_owned()).await
    }
}

#[derive(Iden)]
enum WalletAlerts {
    Table,
    Id,
    UserId,
    Address,
    Network,
    MinValue,
    Name,
    CreatedAt,
}
