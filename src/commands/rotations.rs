use crate::rotations::render;
use crate::{Context, Error};
use poise::serenity_prelude::ChannelId;
use poise::CreateReply;

/// Map rotation commands
#[poise::command(
    slash_command,
    subcommands("current", "next", "challenges", "splatfest", "set_channel", "refresh", "announce")
)]
pub async fn rotations(_ctx: Context<'_>) -> Result<(), Error> {
    Ok(())
}

/// Show the current map rotations
#[poise::command(slash_command)]
pub async fn current(ctx: Context<'_>) -> Result<(), Error> {
    let embeds = {
        let state = ctx.data().rotations.state().await;
        [
            &state.turf_war,
            &state.ranked_series,
            &state.ranked_open,
            &state.x_battle,
            &state.splatfest_open,
            &state.splatfest_pro,
        ]
        .into_iter()
        .filter_map(|collection| collection.active())
        .map(render::rotation_embed)
        .collect::<Vec<_>>()
    };

    if embeds.is_empty() {
        ctx.say("No rotation right now — the schedule may be between windows.")
            .await?;
        return Ok(());
    }

    let mut reply = CreateReply::default();
    for embed in embeds {
        reply = reply.embed(embed);
    }
    ctx.send(reply).await?;
    Ok(())
}

/// Show upcoming map rotations
#[poise::command(slash_command)]
pub async fn next(
    ctx: Context<'_>,
    #[description = "Upcoming windows per mode (1-6)"] count: Option<u64>,
) -> Result<(), Error> {
    let limit = count.unwrap_or(2).clamp(1, 6) as usize;

    let lines = {
        let state = ctx.data().rotations.state().await;
        [
            &state.turf_war,
            &state.ranked_series,
            &state.ranked_open,
            &state.x_battle,
            &state.splatfest_open,
            &state.splatfest_pro,
        ]
        .into_iter()
        .flat_map(|collection| collection.future(Some(limit)))
        .map(render::rotation_line)
        .collect::<Vec<_>>()
    };

    if lines.is_empty() {
        ctx.say("No upcoming rotations in the schedule yet.").await?;
    } else {
        ctx.say(lines.join("\n")).await?;
    }
    Ok(())
}

/// Show current and upcoming challenge events
#[poise::command(slash_command)]
pub async fn challenges(ctx: Context<'_>) -> Result<(), Error> {
    let embeds = {
        let state = ctx.data().rotations.state().await;
        state
            .challenge
            .active()
            .into_iter()
            .chain(state.challenge.future(Some(3)))
            .map(render::rotation_embed)
            .collect::<Vec<_>>()
    };

    if embeds.is_empty() {
        ctx.say("No challenge events on the schedule right now.").await?;
        return Ok(());
    }

    let mut reply = CreateReply::default();
    for embed in embeds {
        reply = reply.embed(embed);
    }
    ctx.send(reply).await?;
    Ok(())
}

/// Show the current Splatfest, if one is running
#[poise::command(slash_command)]
pub async fn splatfest(ctx: Context<'_>) -> Result<(), Error> {
    let embeds = {
        let state = ctx.data().rotations.state().await;
        let Some(fest) = &state.current_fest else {
            drop(state);
            ctx.say("No Splatfest is running right now.").await?;
            return Ok(());
        };
        let mut embeds = vec![render::fest_embed(fest)];
        for collection in [&state.splatfest_open, &state.splatfest_pro] {
            if let Some(rotation) = collection.active() {
                embeds.push(render::rotation_embed(rotation));
            }
        }
        embeds
    };

    let mut reply = CreateReply::default();
    for embed in embeds {
        reply = reply.embed(embed);
    }
    ctx.send(reply).await?;
    Ok(())
}

/// Set the channel for rotation announcements
#[poise::command(slash_command, required_permissions = "MANAGE_CHANNELS")]
pub async fn set_channel(
    ctx: Context<'_>,
    #[description = "Channel for rotation announcements"] channel: ChannelId,
) -> Result<(), Error> {
    let guild_id = ctx
        .guild_id()
        .ok_or("This command must be used in a server")?;

    let db = &ctx.data().db;
    let mut settings = db.guild_settings(guild_id);
    settings.rotation_channel = Some(channel);
    db.set_guild_settings(guild_id, settings)?;

    ctx.say(format!(
        "✅ Rotation announcements will be posted in <#{}>",
        channel
    ))
    .await?;
    Ok(())
}

/// Force a refresh of the rotation data (does not announce)
#[poise::command(slash_command, required_permissions = "MANAGE_GUILD", ephemeral)]
pub async fn refresh(ctx: Context<'_>) -> Result<(), Error> {
    ctx.defer_ephemeral().await?;
    ctx.data().rotations.force_update().await?;
    ctx.say("✅ Rotation data refreshed. Subscribers were not re-notified.")
        .await?;
    Ok(())
}

/// Re-run all rotation announcement subscribers
#[poise::command(slash_command, required_permissions = "MANAGE_GUILD", ephemeral)]
pub async fn announce(ctx: Context<'_>) -> Result<(), Error> {
    ctx.defer_ephemeral().await?;
    ctx.data().rotations.notify_changed().await;
    ctx.say("✅ Rotation subscribers re-notified.").await?;
    Ok(())
}
