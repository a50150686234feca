use crate::rotations::render;
use crate::{Context, Error};
use poise::serenity_prelude::ChannelId;
use poise::CreateReply;

/// Salmon Run commands
#[poise::command(
    slash_command,
    subcommands("current", "next", "set_channel", "announce")
)]
pub async fn salmonrun(_ctx: Context<'_>) -> Result<(), Error> {
    Ok(())
}

/// Show the current Salmon Run shift
#[poise::command(slash_command)]
pub async fn current(ctx: Context<'_>) -> Result<(), Error> {
    let embeds = {
        let state = ctx.data().rotations.state().await;
        [&state.salmon_run, &state.big_run, &state.eggstra_work]
            .into_iter()
            .filter_map(|collection| collection.active())
            .map(render::rotation_embed)
            .collect::<Vec<_>>()
    };

    if embeds.is_empty() {
        ctx.say("No shift is open right now.").await?;
        return Ok(());
    }

    let mut reply = CreateReply::default();
    for embed in embeds {
        reply = reply.embed(embed);
    }
    ctx.send(reply).await?;
    Ok(())
}

/// Show upcoming Salmon Run shifts
#[poise::command(slash_command)]
pub async fn next(
    ctx: Context<'_>,
    #[description = "Upcoming shifts per mode (1-6)"] count: Option<u64>,
) -> Result<(), Error> {
    let limit = count.unwrap_or(2).clamp(1, 6) as usize;

    let lines = {
        let state = ctx.data().rotations.state().await;
        [&state.salmon_run, &state.big_run, &state.eggstra_work]
            .into_iter()
            .flat_map(|collection| collection.future(Some(limit)))
            .map(render::rotation_line)
            .collect::<Vec<_>>()
    };

    if lines.is_empty() {
        ctx.say("No upcoming shifts in the schedule yet.").await?;
    } else {
        ctx.say(lines.join("\n")).await?;
    }
    Ok(())
}

/// Set the channel for Salmon Run announcements
#[poise::command(slash_command, required_permissions = "MANAGE_CHANNELS")]
pub async fn set_channel(
    ctx: Context<'_>,
    #[description = "Channel for Salmon Run announcements"] channel: ChannelId,
) -> Result<(), Error> {
    let guild_id = ctx
        .guild_id()
        .ok_or("This command must be used in a server")?;

    let db = &ctx.data().db;
    let mut settings = db.guild_settings(guild_id);
    settings.salmon_channel = Some(channel);
    db.set_guild_settings(guild_id, settings)?;

    ctx.say(format!(
        "✅ Salmon Run announcements will be posted in <#{}>",
        channel
    ))
    .await?;
    Ok(())
}

/// Re-run all Salmon Run announcement subscribers
#[poise::command(slash_command, required_permissions = "MANAGE_GUILD", ephemeral)]
pub async fn announce(ctx: Context<'_>) -> Result<(), Error> {
    ctx.defer_ephemeral().await?;
    ctx.data().rotations.notify_salmon_changed().await;
    ctx.say("✅ Salmon Run subscribers re-notified.").await?;
    Ok(())
}
