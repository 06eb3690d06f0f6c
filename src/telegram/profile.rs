//! Profile-picture lookup through the Bot API

use async_trait::async_trait;
use teloxide::prelude::*;
use url::Url;

use crate::ledger::AvatarLookup;

/// Resolves the first profile photo of a user into a downloadable file URL.
/// Any failure yields no avatar; onboarding never depends on it.
pub struct TelegramAvatarLookup {
    bot: Bot,
}

impl TelegramAvatarLookup {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

#[async_trait]
impl AvatarLookup for TelegramAvatarLookup {
    async fn avatar_url(&self, user_id: &str) -> Option<String> {
        let id: u64 = user_id.parse().ok()?;

        let photos = match self.bot.get_user_profile_photos(UserId(id)).limit(1).await {
            Ok(photos) => photos,
            Err(e) => {
                log::warn!("Failed to fetch profile photos for {}: {}", user_id, e);
                return None;
            }
        };
        if photos.total_count == 0 {
            return None;
        }

        let photo = photos.photos.first()?.first()?;
        match self.bot.get_file(photo.file.id.clone()).await {
            Ok(file) => Some(file_url(self.bot.api_url(), self.bot.token(), &file.path)),
            Err(e) => {
                log::warn!("Failed to resolve profile photo file for {}: {}", user_id, e);
                None
            }
        }
    }
}

/// `{api}/file/bot{token}/{path}`, the Bot API file download URL
pub fn file_url(api_url: Url, token: &str, path: &str) -> String {
    format!("{}/file/bot{}/{}", api_url.as_str().trim_end_matches('/'), token, path)
}
