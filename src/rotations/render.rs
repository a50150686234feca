use chrono::{DateTime, Utc};
use poise::serenity_prelude::{Color, CreateEmbed};

use super::node::{CurrentFest, FestState, Rotation, RotationKind};
use super::time_period::Timed;

// Helper to format Discord timestamps
fn discord_timestamp(time: DateTime<Utc>, style: TimestampStyle) -> String {
    format!("<t:{}:{}>", time.timestamp(), style.as_str())
}

enum TimestampStyle {
    ShortDateTime, // f - June 9, 2023 9:41 PM
    Relative,      // R - in 2 hours
}

impl TimestampStyle {
    fn as_str(&self) -> &'static str {
        match self {
            Self::ShortDateTime => "f",
            Self::Relative => "R",
        }
    }
}

fn kind_color(kind: RotationKind) -> Color {
    match kind {
        RotationKind::TurfWar => Color::from_rgb(25, 190, 148),
        RotationKind::RankedSeries | RotationKind::RankedOpen => Color::from_rgb(245, 73, 16),
        RotationKind::XBattle => Color::from_rgb(14, 205, 147),
        RotationKind::SplatfestOpen | RotationKind::SplatfestPro => Color::from_rgb(165, 29, 219),
        RotationKind::Challenge => Color::from_rgb(240, 205, 48),
        RotationKind::SalmonRun => Color::from_rgb(255, 121, 0),
        RotationKind::BigRun => Color::from_rgb(181, 48, 171),
        RotationKind::EggstraWork => Color::from_rgb(250, 185, 50),
    }
}

/// Render one rotation as an embed.
pub fn rotation_embed(rotation: &Rotation) -> CreateEmbed {
    let kind = rotation.kind();
    let period = rotation.time_period();
    let mut embed = CreateEmbed::default()
        .title(format!("{} {}", kind.emoji(), kind.label()))
        .color(kind_color(kind));

    if period.future() {
        embed = embed.field(
            "Starts",
            discord_timestamp(period.start_time(), TimestampStyle::Relative),
            true,
        );
    }
    embed = embed.field(
        "Ends",
        discord_timestamp(period.end_time(), TimestampStyle::Relative),
        true,
    );

    match rotation {
        Rotation::TurfWar(vs)
        | Rotation::RankedSeries(vs)
        | Rotation::RankedOpen(vs)
        | Rotation::XBattle(vs)
        | Rotation::SplatfestOpen(vs)
        | Rotation::SplatfestPro(vs) => embed
            .field("Mode", vs.rule.clone(), true)
            .field("Stages", vs.stages.join("\n"), false),
        Rotation::Challenge(event) => {
            let mut embed = embed
                .field("Event", event.name.clone(), true)
                .field("Mode", event.rule.clone(), true)
                .field("Stages", event.stages.join("\n"), false);
            if !event.description.is_empty() {
                embed = embed.description(event.description.clone());
            }
            embed
        }
        Rotation::SalmonRun(coop) | Rotation::BigRun(coop) | Rotation::EggstraWork(coop) => {
            let mut embed = embed
                .field("Stage", coop.stage.clone(), true)
                .field("Weapons", coop.weapons.join("\n"), false);
            if let Some(king) = &coop.king_salmonid {
                embed = embed.field("King Salmonid", king.clone(), true);
            }
            embed
        }
    }
}

/// One-line rendering for upcoming-rotation listings and notifications.
pub fn rotation_line(rotation: &Rotation) -> String {
    let kind = rotation.kind();
    let period = rotation.time_period();
    let when = discord_timestamp(period.start_time(), TimestampStyle::Relative);
    match rotation {
        Rotation::TurfWar(vs)
        | Rotation::RankedSeries(vs)
        | Rotation::RankedOpen(vs)
        | Rotation::XBattle(vs)
        | Rotation::SplatfestOpen(vs)
        | Rotation::SplatfestPro(vs) => format!(
            "{} **{}** · {} on {} · {}",
            kind.emoji(),
            kind.label(),
            vs.rule,
            vs.stages.join(" & "),
            when
        ),
        Rotation::Challenge(event) => format!(
            "{} **{}** · {} on {} · {}",
            kind.emoji(),
            event.name,
            event.rule,
            event.stages.join(" & "),
            when
        ),
        Rotation::SalmonRun(coop) | Rotation::BigRun(coop) | Rotation::EggstraWork(coop) => {
            format!(
                "{} **{}** · {} · {}",
                kind.emoji(),
                kind.label(),
                coop.stage,
                when
            )
        }
    }
}

/// Render the in-progress splatfest singleton.
pub fn fest_embed(fest: &CurrentFest) -> CreateEmbed {
    let half = match fest.state {
        FestState::FirstHalf => "First half",
        FestState::SecondHalf => "Second half (tricolor battles open)",
    };
    let mut embed = CreateEmbed::default()
        .title(format!("🎉 {}", fest.title))
        .color(Color::from_rgb(165, 29, 219))
        .field("Phase", half, true)
        .field(
            "Ends",
            discord_timestamp(fest.time_period().end_time(), TimestampStyle::Relative),
            true,
        );
    if !fest.tricolor_stages.is_empty() {
        embed = embed.field("Tricolor stages", fest.tricolor_stages.join("\n"), false);
    }
    embed
}

#[cfg(test)]
mod tests {
    use super::super::node::{CoopRotation, VsRotation};
    use super::super::time_period::TimePeriod;
    use super::*;
    use chrono::Duration;

    #[test]
    fn lines_name_the_mode_and_stages() {
        let now = Utc::now();
        let rotation = Rotation::RankedSeries(VsRotation {
            period: TimePeriod::new(now, now + Duration::hours(2)),
            rule: "Splat Zones".into(),
            stages: vec!["Scorch Gorge".into(), "Mincemeat Metalworks".into()],
        });
        let line = rotation_line(&rotation);
        assert!(line.contains("Splat Zones"));
        assert!(line.contains("Scorch Gorge & Mincemeat Metalworks"));
    }

    #[test]
    fn coop_lines_name_the_stage() {
        let now = Utc::now();
        let rotation = Rotation::SalmonRun(CoopRotation {
            period: TimePeriod::new(now, now + Duration::hours(24)),
            stage: "Gone Fission Hydroplant".into(),
            weapons: vec!["Splattershot".into()],
            king_salmonid: Some("Horrorboros".into()),
        });
        assert!(rotation_line(&rotation).contains("Gone Fission Hydroplant"));
    }
}
