use std::env;
use std::sync::Arc;
use std::time::Duration;
use teloxide::{prelude::*, utils::command::BotCommands};
use tokio::time;

mod bot_state;
mod flows;
mod handlers;
mod models;
mod notify;
mod password;
mod rate_limit;
mod sessions;
mod storage;
mod validators;

use crate::bot_state::BotState;
use crate::handlers::{callback_handler, command_handler, message_handler};
use crate::notify::Notifications;
use crate::storage::Database;

#[derive(BotCommands, Clone)]
#[command(rename_rule = "lowercase", description = "Команды автоклуба:")]
pub enum Command {
    #[command(description = "начать работу с ботом")]
    Start,
    #[command(description = "помощь")]
    Help,
    #[command(description = "регистрация в клубе")]
    Reg,
    #[command(description = "добавить автомобиль")]
    Addcar,
    #[command(description = "пригласить владельца по госномеру")]
    Invite,
    #[command(description = "мой профиль")]
    Profile,
    #[command(description = "мой гараж")]
    Garage,
    #[command(description = "поиск машины по номеру")]
    Search,
    #[command(description = "активация статуса по паролю")]
    Activate,
    #[command(description = "отменить текущее действие")]
    Cancel,
    #[command(description = "сменить статус участника (админ)")]
    Setstatus,
    #[command(description = "установить пароль активации (админ)")]
    Setpassword,
    #[command(description = "сбросить лимиты пользователя (админ)")]
    Resetlimits,
}

fn admin_ids_from_env() -> Vec<i64> {
    env::var("ADMIN_IDS")
        .unwrap_or_default()
        .split(',')
        .filter_map(|s| s.trim().parse::<i64>().ok())
        .collect()
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Загружаем .env и инициализируем логирование
    dotenvy::dotenv().ok();
    env_logger::init();
    log::info!("Starting autoclub bot with PostgreSQL...");

    let database_url = env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let db = Database::new(&database_url).await?;
    db.init().await?;
    log::info!("✅ Database initialized");

    let admins = admin_ids_from_env();
    if admins.is_empty() {
        log::warn!("ADMIN_IDS is empty, admin commands are disabled");
    }

    let state = BotState::new(Arc::new(db), Notifications::from_env(), admins);

    // Фоновая уборка протухших окон лимитера
    let state_clone = state.clone();
    tokio::spawn(async move {
        let mut interval = time::interval(Duration::from_secs(600));
        loop {
            interval.tick().await;
            state_clone.limiter.sweep().await;
        }
    });

    let bot = Bot::from_env();

    let handler = dptree::entry()
        .branch(
            Update::filter_message()
                .filter_command::<Command>()
                .endpoint(command_handler),
        )
        .branch(Update::filter_callback_query().endpoint(callback_handler))
        .branch(Update::filter_message().endpoint(message_handler));

    log::info!("🚀 Starting dispatcher...");

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![state])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    Ok(())
}
