use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use poise::serenity_prelude::{ChannelId, GuildId};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::path::PathBuf;
use tracing::info;

use crate::error::Result;

#[derive(Serialize, Deserialize, Default, Clone, Debug)]
pub struct GuildSettings {
    pub rotation_channel: Option<ChannelId>,
    pub salmon_channel: Option<ChannelId>,
}

/// A cached copy of the upstream schedule feed. Valid until `expiry`, which
/// is the end of the rotation window the snapshot was fetched in.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct CachedFeed {
    pub snapshot: Value,
    pub expiry: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Default, Debug)]
struct Document {
    guilds: HashMap<GuildId, GuildSettings>,
    cached_feed: Option<CachedFeed>,
    last_salmon_end_time: Option<DateTime<Utc>>,
}

/// The bot's entire persistent state: one JSON document on disk, loaded at
/// startup and written back wholesale on every mutation.
#[derive(Debug)]
pub struct Database {
    path: PathBuf,
    document: RwLock<Document>,
}

impl Database {
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let document = match std::fs::read_to_string(&path) {
            Ok(contents) => serde_json::from_str(&contents)?,
            Err(_) => {
                info!("No database at {}, starting fresh", path.display());
                Document::default()
            }
        };
        Ok(Self {
            path,
            document: RwLock::new(document),
        })
    }

    fn save(&self, document: &Document) -> Result<()> {
        std::fs::write(&self.path, serde_json::to_string_pretty(document)?)?;
        Ok(())
    }

    pub fn cached_feed(&self) -> Option<CachedFeed> {
        self.document.read().cached_feed.clone()
    }

    pub fn set_cached_feed(&self, snapshot: Value, expiry: DateTime<Utc>) -> Result<()> {
        let mut document = self.document.write();
        document.cached_feed = Some(CachedFeed { snapshot, expiry });
        self.save(&document)
    }

    pub fn last_salmon_end_time(&self) -> Option<DateTime<Utc>> {
        self.document.read().last_salmon_end_time
    }

    pub fn set_last_salmon_end_time(&self, end_time: DateTime<Utc>) -> Result<()> {
        let mut document = self.document.write();
        document.last_salmon_end_time = Some(end_time);
        self.save(&document)
    }

    pub fn guild_settings(&self, guild_id: GuildId) -> GuildSettings {
        self.document
            .read()
            .guilds
            .get(&guild_id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn set_guild_settings(&self, guild_id: GuildId, settings: GuildSettings) -> Result<()> {
        let mut document = self.document.write();
        document.guilds.insert(guild_id, settings);
        self.save(&document)
    }

    /// All guilds with any announcement channel configured.
    pub fn guilds(&self) -> Vec<(GuildId, GuildSettings)> {
        self.document
            .read()
            .guilds
            .iter()
            .map(|(id, settings)| (*id, settings.clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn missing_file_starts_fresh() {
        let dir = TempDir::new().unwrap();
        let db = Database::load(dir.path().join("database.json")).unwrap();
        assert!(db.cached_feed().is_none());
        assert!(db.last_salmon_end_time().is_none());
        assert!(db.guilds().is_empty());
    }

    #[test]
    fn persists_across_reload() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("database.json");
        let expiry = Utc::now() + Duration::hours(2);

        {
            let db = Database::load(&path).unwrap();
            db.set_cached_feed(json!({ "data": {} }), expiry).unwrap();
            db.set_last_salmon_end_time(expiry).unwrap();
            db.set_guild_settings(
                GuildId::new(42),
                GuildSettings {
                    rotation_channel: Some(ChannelId::new(7)),
                    salmon_channel: None,
                },
            )
            .unwrap();
        }

        let db = Database::load(&path).unwrap();
        let cached = db.cached_feed().unwrap();
        assert_eq!(cached.snapshot, json!({ "data": {} }));
        assert_eq!(cached.expiry, db.last_salmon_end_time().unwrap());
        let settings = db.guild_settings(GuildId::new(42));
        assert_eq!(settings.rotation_channel, Some(ChannelId::new(7)));
        assert!(settings.salmon_channel.is_none());
    }

    #[test]
    fn unknown_guild_gets_defaults() {
        let dir = TempDir::new().unwrap();
        let db = Database::load(dir.path().join("database.json")).unwrap();
        let settings = db.guild_settings(GuildId::new(1));
        assert!(settings.rotation_channel.is_none());
    }
}
