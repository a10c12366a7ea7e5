use teloxide::utils::command::BotCommands;

#[derive(BotCommands, Clone, Debug)]
#[command(rename_rule = "lowercase", description = "Crypto Alert Bot Commands:")]
pub enum Command {
    #[command(description = "Start the bot and see welcome message")]
    Start,

    #[command(description = "Show detailed usage guide")]
    Help,

    #[command(
        description = "List supported tokens - Usage: /tokens [search]"
    )] Tokens(String),

    #[command(description = "Check current price - Usage: /price <token>")] Price(String),

    #[command(
        description = "Set a price alert - Usage: /subscribe <token> <pct> <up|down> | <token> at <price> | <token> <above|below> <price>"
    )] Subscribe(String),

    #[command(description = "List your active price alerts")]
    List,

    #[command(
        description = "Track a wallet - Usage: /track <address> <ethereum|bsc|polygon> [min_value] [name]"
    )] Track(String),

    #[command(description = "List your tracked wallets")]
    Wallets,
}
