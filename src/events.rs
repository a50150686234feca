use crate::rotations::{render, Hook};
use crate::tasks::rotation_refresh::RotationRefreshTask;
use crate::tasks::TaskManager;
use crate::{Data, Error};
use poise::serenity_prelude::{self as serenity, ActivityData, CreateMessage, OnlineStatus};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::{error, info};

pub async fn event_handler(
    ctx: &serenity::Context,
    event: &serenity::FullEvent,
    _framework: poise::FrameworkContext<'_, Data, Error>,
    data: &Data,
) -> Result<(), Error> {
    match event {
        serenity::FullEvent::Ready { .. } => {
            info!("Bot is ready");
            ctx.set_presence(
                Some(ActivityData::watching("the rotation schedule")),
                OnlineStatus::Online,
            );

            // Ready fires again on reconnect; subscribe and start tasks once.
            if data.started.swap(true, Ordering::SeqCst) {
                return Ok(());
            }

            register_announcement_hooks(ctx, data);

            let ctx = ctx.clone();
            let data = data.clone();

            let mut task_manager = TaskManager::new();
            task_manager.register_task(RotationRefreshTask::new());
            task_manager.run_all(&ctx, data).await;
        }
        _ => {}
    }
    Ok(())
}

/// Subscribe the announcement posters to the rotation engine. These run
/// every boundary refresh, and once immediately if the engine is still
/// catching up from a transition this process missed.
fn register_announcement_hooks(ctx: &serenity::Context, data: &Data) {
    let http = ctx.http.clone();
    let hook_data = data.clone();
    let hook: Hook = Arc::new(move || {
        let http = http.clone();
        let data = hook_data.clone();
        Box::pin(async move { announce_rotations(&http, &data).await })
    });
    data.rotations.hook(hook);

    let http = ctx.http.clone();
    let hook_data = data.clone();
    let salmon_hook: Hook = Arc::new(move || {
        let http = http.clone();
        let data = hook_data.clone();
        Box::pin(async move { announce_salmon(&http, &data).await })
    });
    data.rotations.hook_salmon(salmon_hook);
}

async fn announce_rotations(http: &serenity::Http, data: &Data) -> anyhow::Result<()> {
    let embeds = {
        let state = data.rotations.state().await;
        let mut embeds = Vec::new();
        for collection in [
            &state.turf_war,
            &state.ranked_series,
            &state.ranked_open,
            &state.x_battle,
            &state.splatfest_open,
            &state.splatfest_pro,
        ] {
            if let Some(rotation) = collection.active() {
                embeds.push(render::rotation_embed(rotation));
            }
        }
        if let Some(fest) = &state.current_fest {
            embeds.push(render::fest_embed(fest));
        }
        embeds
    };

    if embeds.is_empty() {
        return Ok(());
    }

    for (guild_id, settings) in data.db.guilds() {
        let Some(channel) = settings.rotation_channel else {
            continue;
        };
        let message = CreateMessage::new()
            .content("🗺️ Map rotations have updated!")
            .embeds(embeds.clone());
        if let Err(e) = channel.send_message(http, message).await {
            error!("Failed to announce rotations to guild {}: {}", guild_id, e);
        }
    }
    Ok(())
}

async fn announce_salmon(http: &serenity::Http, data: &Data) -> anyhow::Result<()> {
    let embeds = {
        let state = data.rotations.state().await;
        [&state.salmon_run, &state.big_run, &state.eggstra_work]
            .into_iter()
            .filter_map(|collection| collection.active())
            .map(render::rotation_embed)
            .collect::<Vec<_>>()
    };

    if embeds.is_empty() {
        return Ok(());
    }

    for (guild_id, settings) in data.db.guilds() {
        let Some(channel) = settings.salmon_channel else {
            continue;
        };
        let message = CreateMessage::new()
            .content("🐟 Salmon Run has rotated!")
            .embeds(embeds.clone());
        if let Err(e) = channel.send_message(http, message).await {
            error!("Failed to announce Salmon Run to guild {}: {}", guild_id, e);
        }
    }
    Ok(())
}
