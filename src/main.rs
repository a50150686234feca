mod commands;
mod database;
mod error;
mod events;
mod rotations;
mod tasks;

use database::Database;
use events::event_handler;
use poise::serenity_prelude as serenity;
use rotations::Rotations;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

#[derive(Clone)]
pub struct Data {
    pub db: Arc<Database>,
    pub rotations: Arc<Rotations>,
    pub started: Arc<AtomicBool>,
}

pub type Error = Box<dyn std::error::Error + Send + Sync>;
pub type Context<'a> = poise::Context<'a, Data, Error>;

#[tokio::main]
async fn main() -> Result<(), Error> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .init();

    let token = std::env::var("DISCORD_TOKEN").expect("DISCORD_TOKEN not set");
    let intents = serenity::GatewayIntents::non_privileged();

    let database_path =
        std::env::var("DATABASE_PATH").unwrap_or_else(|_| "database.json".to_string());
    let db = Arc::new(Database::load(database_path)?);

    // Initial fetch happens here; the boundary refresh loop starts once the
    // gateway reports Ready.
    let rotations = Rotations::new(db.clone()).await?;

    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions {
            commands: vec![
                commands::rotations::rotations(),
                commands::salmon::salmonrun(),
            ],
            event_handler: |ctx, event, framework, data| {
                Box::pin(event_handler(ctx, event, framework, data))
            },
            ..Default::default()
        })
        .setup(|ctx, _ready, framework| {
            Box::pin(async move {
                poise::builtins::register_globally(ctx, &framework.options().commands).await?;
                Ok(Data {
                    db,
                    rotations,
                    started: Arc::new(AtomicBool::new(false)),
                })
            })
        })
        .build();

    serenity::ClientBuilder::new(token, intents)
        .framework(framework)
        .await?
        .start()
        .await?;

    Ok(())
}
