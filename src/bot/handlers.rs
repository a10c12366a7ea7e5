use std::sync::Arc;
use std::time::Duration;

use teloxide::prelude::*;

use crate::bot::{ BotState, commands::Command };
use crate::enums::{ AlertCondition, Direction };
use crate::error::{ AppError, Result as AppResult };
use crate::providers::TokenInfo;
use crate::services::CreateAlertOutcome;

const TOKENS_CHUNK_SIZE: usize = 25;

// Handler for dispatcher-based command handling
pub async fn handle_command_dispatch(
    bot: Bot,
    msg: Message,
    cmd: Command,
    state: Arc<BotState>
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    handle_command(bot, msg, cmd, state).await?;
    Ok(())
}

pub async fn handle_command(
    bot: Bot,
    msg: Message,
    cmd: Command,
    state: Arc<BotState>
) -> ResponseResult<()> {
    let chat_id = msg.chat.id;
    let user_id = chat_id.0.to_string();

    match cmd {
        Command::Start => handle_start(bot, chat_id).await,
        Command::Help => handle_help(bot, chat_id).await,
        Command::Tokens(args) => handle_tokens(bot, chat_id, args, state).await,
        Command::Price(args) => handle_price(bot, chat_id, args, state).await,
        Command::Subscribe(args) => handle_subscribe(bot, chat_id, args, user_id, state).await,
        Command::List => handle_list(bot, chat_id, user_id, state).await,
        Command::Track(args) => handle_track(bot, chat_id, args, user_id, state).await,
        Command::Wallets => handle_wallets(bot, chat_id, user_id, state).await,
    }
}

async fn handle_start(bot: Bot, chat_id: ChatId) -> ResponseResult<()> {
    bot.send_message(
        chat_id,
        "Welcome to CryptoAlertBot! 🚀\n\n\
        📈 Available Alert Types:\n\n\
        1️⃣ Percentage Change Alert:\n\
        📝 /subscribe <token> <percentage> <up/down>\n\
        📊 Example: /subscribe BTC 5 up\n\n\
        2️⃣ Exact Price Alert:\n\
        📝 /subscribe <token> at <price>\n\
        📊 Example: /subscribe BTC at 45000\n\n\
        3️⃣ Price Level Alert:\n\
        📝 /subscribe <token> <above/below> <price>\n\
        📊 Example: /subscribe BTC above 45000\n\n\
        4️⃣ Wallet Tracking:\n\
        📝 /track <address> <network> [min_value] [name]\n\
        📊 Example: /track 0xd8da...6045 ethereum 5 vitalik\n\n\
        📌 Other Commands:\n\
        • /tokens - List available tokens\n\
        • /tokens <search> - Search for specific tokens\n\
        • /list - View your active alerts\n\
        • /wallets - View your tracked wallets\n\
        • /price <token> - Check current price\n\
        • /help - Show detailed usage guide\n\n\
        💡 Tip: Use /tokens to see the list of supported tokens!"
    ).await?;
    Ok(())
}

async fn handle_help(bot: Bot, chat_id: ChatId) -> ResponseResult<()> {
    bot.send_message(
        chat_id,
        "📚 CryptoAlertBot Help Guide\n\n\
        🎯 Setting Alerts:\n\n\
        1️⃣ Percentage Change Alert:\n\
        • Triggers when price moves up/down by specified percentage\n\
        📝 /subscribe <token> <percentage> <up/down>\n\
        📊 Example: /subscribe BTC 5 up\n\n\
        2️⃣ Exact Price Alert:\n\
        • Triggers when price reaches specific value\n\
        📝 /subscribe <token> at <price>\n\
        📊 Example: /subscribe BTC at 45000\n\n\
        3️⃣ Price Level Alert:\n\
        • Triggers when price goes above/below specified value\n\
        📝 /subscribe <token> <above/below> <price>\n\
        📊 Example: /subscribe BTC above 45000\n\n\
        👛 Wallet Tracking:\n\
        • Notifies when a tracked address sends or receives funds\n\
        📝 /track <address> <ethereum|bsc|polygon> [min_value] [name]\n\n\
        📌 Other Commands:\n\
        • /tokens - List all supported tokens\n\
        • /tokens <search> - Search for specific tokens\n\
        • /price <token> - Check current price\n\
        • /list - View your active alerts\n\
        • /wallets - View your tracked wallets\n\n\
        💡 Tips:\n\
        • Use exact token symbols (BTC, ETH, etc.)\n\
        • Price alerts trigger only once\n\
        • You can have multiple alerts per token"
    ).await?;
    Ok(())
}

async fn handle_tokens(
    bot: Bot,
    chat_id: ChatId,
    args: String,
    state: Arc<BotState>
) -> ResponseResult<()> {
    let query = args.trim().to_lowercase();

    let matches: Vec<&TokenInfo> = if query.is_empty() {
        state.token_index.all().iter().collect()
    } else {
        state.token_index.search(&query)
    };

    if matches.is_empty() {
        bot.send_message(
            chat_id,
            "No tokens found. Try searching by full name or check the symbol case.\n\
            Example: \"/tokens btc\" for Bitcoin or \"/tokens bitcoin\""
        ).await?;
        return Ok(());
    }

    let intro = if query.is_empty() {
        format!(
            "List of {} verified tokens:\n\
            💡 Tip: Search by exact symbol (e.g., \"/tokens btc\") or name (e.g., \"/tokens bitcoin\")\n\n",
            matches.len()
        )
    } else if matches.len() == 1 {
        format!("Found exact match for \"{}\":\n\n", query.to_uppercase())
    } else {
        format!(
            "Found {} tokens matching \"{}\":\n\
            (💡 Tip: Use exact symbol for strict matching, e.g., \"/tokens sol\" for Solana)\n\n",
            matches.len(),
            query
        )
    };

    let chunks: Vec<String> = matches
        .chunks(TOKENS_CHUNK_SIZE)
        .map(|chunk| {
            chunk
                .iter()
                .map(|t| format!("{} - {}", t.symbol, t.name))
                .collect::<Vec<_>>()
                .join("\n")
        })
        .collect();

    bot.send_message(chat_id, format!("{}{}", intro, chunks[0])).await?;

    for chunk in &chunks[1..] {
        bot.send_message(chat_id, chunk).await?;
        tokio::time::sleep(Duration::from_millis(100)).await;
    }

    Ok(())
}

async fn handle_price(
    bot: Bot,
    chat_id: ChatId,
    args: String,
    state: Arc<BotState>
) -> ResponseResult<()> {
    let token = args.trim().to_uppercase();

    if token.is_empty() {
        bot.send_message(chat_id, "📝 Usage: /price <token>\n📊 Example: /price BTC").await?;
        return Ok(());
    }

    match state.price_alert_service.current_price(&token).await {
        Ok((info, price)) => {
            bot.send_message(
                chat_id,
                format!(
                    "💰 Current Price:\n\n\
                    {} ({})\n\
                    ${:.2} USD\n\n\
                    Want to set a price alert? Use /subscribe",
                    token,
                    info.name,
                    price
                )
            ).await?;
        }
        Err(e) => {
            bot.send_message(chat_id, error_message(&e)).await?;
        }
    }

    Ok(())
}

async fn handle_subscribe(
    bot: Bot,
    chat_id: ChatId,
    args: String,
    user_id: String,
    state: Arc<BotState>
) -> ResponseResult<()> {
    let (token, condition) = match parse_subscribe(&args) {
        Ok(parsed) => parsed,
        Err(_) => {
            bot.send_message(
                chat_id,
                "❓ Here are the ways to set alerts:\n\n\
                1️⃣ Percentage Change:\n\
                📝 /subscribe <token> <percentage> <up/down>\n\
                📊 Example: /subscribe BTC 5 up\n\n\
                2️⃣ Exact Price:\n\
                📝 /subscribe <token> at <price>\n\
                📊 Example: /subscribe BTC at 45000\n\n\
                3️⃣ Price Level:\n\
                📝 /subscribe <token> <above/below/greaterthan/lessthan> <price>\n\
                📊 Example: /subscribe BTC above 45000\n\n\
                💡 Use /tokens to see available tokens!"
            ).await?;
            return Ok(());
        }
    };

    match state.price_alert_service.create_alert(&user_id, &token, condition).await {
        Ok(CreateAlertOutcome::Created { alert, current_price }) => {
            let detail = match &alert.condition {
                AlertCondition::Percentage { threshold, direction } =>
                    format!("when price goes {} by {}%", direction, threshold * 100.0),
                AlertCondition::Exact { target_price } =>
                    format!("when price reaches ${:.2}", target_price),
                AlertCondition::Above { target_price } =>
                    format!("when price goes above ${:.2}", target_price),
                AlertCondition::Below { target_price } =>
                    format!("when price goes below ${:.2}", target_price),
            };

            bot.send_message(
                chat_id,
                format!(
                    "✅ Alert set successfully!\n\n\
                    🪙 Token: {}\n\
                    💰 Current price: ${:.2}\n\
                    🎯 Alert will trigger {}\n\n\
                    💡 Use /list to see all your active alerts",
                    alert.token,
                    current_price,
                    detail
                )
            ).await?;
        }
        // The immediate one-shot notification was already delivered
        Ok(CreateAlertOutcome::AlreadySatisfied { .. }) => {}
        Err(e) => {
            bot.send_message(chat_id, error_message(&e)).await?;
        }
    }

    Ok(())
}

async fn handle_list(
    bot: Bot,
    chat_id: ChatId,
    user_id: String,
    state: Arc<BotState>
) -> ResponseResult<()> {
    let alerts = match state.repository.list_user_alerts(&user_id).await {
        Ok(alerts) => alerts,
        Err(e) => {
            tracing::error!("Failed to list alerts for user {}: {}", user_id, e);
            bot.send_message(
                chat_id,
                "❌ Sorry, there was an error fetching your alerts.\nPlease try again in a moment!"
            ).await?;
            return Ok(());
        }
    };

    if alerts.is_empty() {
        bot.send_message(
            chat_id,
            "📝 You have no active alerts.\n\n💡 Use /subscribe to set up a new alert!"
        ).await?;
        return Ok(());
    }

    let list = alerts
        .iter()
        .map(|alert| {
            let detail = match &alert.condition {
                AlertCondition::Percentage { threshold, direction } =>
                    format!("{:.2}% {}", threshold * 100.0, direction),
                AlertCondition::Exact { target_price } => format!("at ${:.2}", target_price),
                AlertCondition::Above { target_price } => format!("above ${:.2}", target_price),
                AlertCondition::Below { target_price } => format!("below ${:.2}", target_price),
            };
            format!("{}: {}\n💰 Current: ${:.2}", alert.token, detail, alert.last_price)
        })
        .collect::<Vec<_>>()
        .join("\n\n");

    bot.send_message(
        chat_id,
        format!(
            "📊 Your Active Alerts:\n\n{}\n\n\
            💡 Use /subscribe to add more alerts!\n\
            ℹ️ Note: Alerts are automatically removed once triggered.",
            list
        )
    ).await?;

    Ok(())
}

async fn handle_track(
    bot: Bot,
    chat_id: ChatId,
    args: String,
    user_id: String,
    state: Arc<BotState>
) -> ResponseResult<()> {
    let request = match parse_track(&args) {
        Ok(request) => request,
        Err(_) => {
            bot.send_message(
                chat_id,
                "❓ Track a wallet address:\n\n\
                📝 /track <address> <ethereum|bsc|polygon> [min_value] [name]\n\
                📊 Example: /track 0xd8da6bf26964af9d7eed9e03e53415d37aa96045 ethereum 5 vitalik\n\n\
                💡 min_value is the minimum transaction value (in native units) that triggers an alert"
            ).await?;
            return Ok(());
        }
    };

    match
        state.price_alert_service.create_wallet_alert(
            &user_id,
            &request.address,
            &request.network,
            request.min_value,
            request.name
        ).await
    {
        Ok(alert) => {
            bot.send_message(
                chat_id,
                format!(
                    "✅ Wallet tracking enabled!\n\n\
                    🏷️ Address: {}\n\
                    🌐 Network: {}\n\
                    💰 Min value: {} {}\n\n\
                    💡 Use /wallets to see all your tracked wallets",
                    alert.address,
                    alert.network.display_name(),
                    alert.min_value,
                    alert.network.native_symbol()
                )
            ).await?;
        }
        Err(e) => {
            bot.send_message(chat_id, error_message(&e)).await?;
        }
    }

    Ok(())
}

async fn handle_wallets(
    bot: Bot,
    chat_id: ChatId,
    user_id: String,
    state: Arc<BotState>
) -> ResponseResult<()> {
    let alerts = match state.repository.list_user_wallet_alerts(&user_id).await {
        Ok(alerts) => alerts,
        Err(e) => {
            tracing::error!("Failed to list wallet alerts for user {}: {}", user_id, e);
            bot.send_message(
                chat_id,
                "❌ Sorry, there was an error fetching your tracked wallets.\nPlease try again in a moment!"
            ).await?;
            return Ok(());
        }
    };

    if alerts.is_empty() {
        bot.send_message(
            chat_id,
            "📝 You have no tracked wallets.\n\n💡 Use /track to start watching an address!"
        ).await?;
        return Ok(());
    }

    let list = alerts
        .iter()
        .map(|alert| {
            let name = alert.name.as_deref().unwrap_or("(unnamed)");
            format!(
                "{} - {}\n🌐 {} | 💰 min {} {}",
                name,
                alert.address,
                alert.network.display_name(),
                alert.min_value,
                alert.network.native_symbol()
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n");

    bot.send_message(chat_id, format!("👛 Your Tracked Wallets:\n\n{}", list)).await?;

    Ok(())
}

/// Parse /subscribe arguments into a token symbol and condition.
///
/// Accepted forms:
///   <token> <percentage> <up|down>
///   <token> at <price>
///   <token> <above|below|greaterthan|lessthan> <price>
fn parse_subscribe(args: &str) -> AppResult<(String, AlertCondition)> {
    let params: Vec<&str> = args.split_whitespace().collect();

    if params.len() != 3 {
        return Err(AppError::InvalidInput("expected 3 arguments".to_string()));
    }

    let token = params[0].to_uppercase();
    let second = params[1].to_lowercase();

    let parse_price = |s: &str| -> AppResult<f64> {
        let price = s
            .parse::<f64>()
            .map_err(|_| AppError::InvalidInput(format!("Invalid price: {}", s)))?;
        if !price.is_finite() || price <= 0.0 {
            return Err(AppError::InvalidInput(format!("Price must be positive: {}", s)));
        }
        Ok(price)
    };

    let condition = match second.as_str() {
        "at" => AlertCondition::Exact { target_price: parse_price(params[2])? },
        "above" | "greaterthan" => AlertCondition::Above { target_price: parse_price(params[2])? },
        "below" | "lessthan" => AlertCondition::Below { target_price: parse_price(params[2])? },
        _ => {
            let percent = second
                .parse::<f64>()
                .map_err(|_| AppError::InvalidInput(format!("Invalid percentage: {}", second)))?;
            if !percent.is_finite() || percent <= 0.0 {
                return Err(
                    AppError::InvalidInput(format!("Percentage must be positive: {}", second))
                );
            }
            let direction = params[2].parse::<Direction>()?;
            AlertCondition::Percentage {
                threshold: percent / 100.0, // store as decimal
                direction,
            }
        }
    };

    Ok((token, condition))
}

struct TrackRequest {
    address: String,
    network: String,
    min_value: Option<f64>,
    name: Option<String>,
}

/// Parse /track arguments. Address and network validation happens in the
/// service; this only splits the argument list.
fn parse_track(args: &str) -> AppResult<TrackRequest> {
    let params: Vec<&str> = args.split_whitespace().collect();

    if params.len() < 2 {
        return Err(AppError::InvalidInput("expected at least 2 arguments".to_string()));
    }

    let min_value = match params.get(2) {
        Some(raw) => Some(
            raw
                .parse::<f64>()
                .map_err(|_| AppError::InvalidAmount(format!("Invalid minimum value: {}", raw)))?
        ),
        None => None,
    };

    let name = if params.len() > 3 { Some(params[3..].join(" ")) } else { None };

    Ok(TrackRequest {
        address: params[0].to_string(),
        network: params[1].to_string(),
        min_value,
        name,
    })
}

fn error_message(error: &AppError) -> String {
    match error {
        AppError::TokenNotFound(_) =>
            "❌ Token not found!\n\n\
            💡 Use /tokens to see the list of supported tokens\n\
            📝 Make sure to use the exact token symbol (e.g., BTC, ETH, SOL)".to_string(),
        AppError::PriceUnavailable(_) | AppError::RateLimited =>
            "❌ Sorry, there was an error fetching the price.\n\
            Please try again in a moment!".to_string(),
        AppError::InvalidAddress =>
            "❌ Invalid wallet address. Expected a 0x-prefixed EVM address.".to_string(),
        AppError::InvalidNetwork(_) =>
            "❌ Unsupported network. Supported: ethereum, bsc, polygon".to_string(),
        AppError::InvalidAmount(msg) | AppError::InvalidInput(msg) => format!("❌ {}", msg),
        _ =>
            "❌ Sorry, there was an error setting up your alert.\n\
            Please try again in a moment!".to_string(),
    }
}
