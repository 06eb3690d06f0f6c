//! Welcome message, inline keyboard and referral share text

use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup};
use url::Url;

use crate::core::config::{WelcomeConfig, SHARE_REFERRAL_CALLBACK};

/// Reply sent when the onboarding call fails on storage
pub const GENERIC_ERROR_MESSAGE: &str = "An error occurred while processing your request. Please try again.";

const FEATURES: [(&str, &str, &str); 4] = [
    (
        "🌟",
        "Complete Quests",
        "Participate in fun tasks to earn coins and unlock rewards.",
    ),
    ("🎁", "Claim Daily Rewards", "Return each day for your free daily coins!"),
    (
        "🔗",
        "Refer Friends",
        "Share your referral link and earn rewards when friends join.",
    ),
    ("💎", "Earn Streak Bonuses", "Log in daily to increase your rewards!"),
];

/// Escapes special characters for Telegram MarkdownV2
pub fn escape_markdown_v2(text: &str) -> String {
    let mut result = String::with_capacity(text.len() * 2);

    for c in text.chars() {
        if matches!(
            c,
            '\\' | '_' | '*' | '[' | ']' | '(' | ')' | '~' | '`' | '>' | '#' | '+' | '-' | '=' | '|' | '{' | '}' | '.' | '!'
        ) {
            result.push('\\');
        }
        result.push(c);
    }

    result
}

/// MarkdownV2 caption for the welcome photo
pub fn welcome_caption(first_name: &str) -> String {
    let mut caption = format!(
        "Welcome {} to *DripCoinQuest*{}\n\n",
        escape_markdown_v2(first_name),
        escape_markdown_v2("! 🎮💰")
    );
    for (emoji, title, body) in FEATURES {
        caption.push_str(&format!(
            "{} *{}*: {}\n",
            emoji,
            escape_markdown_v2(title),
            escape_markdown_v2(body)
        ));
    }
    caption
}

/// Start Quest / Channel links and the Share Referral Link button
pub fn welcome_keyboard(config: &WelcomeConfig) -> Result<InlineKeyboardMarkup, url::ParseError> {
    Ok(InlineKeyboardMarkup::new(vec![
        vec![
            InlineKeyboardButton::url("Start Quest", Url::parse(&config.quest_url)?),
            InlineKeyboardButton::url("Channel", Url::parse(&config.channel_url)?),
        ],
        vec![InlineKeyboardButton::callback(
            "Share Referral Link",
            SHARE_REFERRAL_CALLBACK,
        )],
    ]))
}

/// Deep link that starts the bot with `user_id` as the referral code
pub fn referral_link(bot_username: &str, user_id: &str) -> String {
    format!("https://t.me/{}?start={}", bot_username.trim_start_matches('@'), user_id)
}

/// Plain-text message carrying the user's referral link
pub fn share_message(first_name: &str, link: &str) -> String {
    format!(
        "Hey {}! 🎉\nHere’s your referral link: {}\nShare it with your friends and earn exciting rewards! 🚀",
        first_name, link
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_markdown_v2() {
        assert_eq!(escape_markdown_v2("Hello. World!"), "Hello\\. World\\!");
        assert_eq!(escape_markdown_v2("a_b*c"), "a\\_b\\*c");
        assert_eq!(escape_markdown_v2("plain"), "plain");
    }

    #[test]
    fn test_caption_escapes_user_name() {
        let caption = welcome_caption("Ann_B.");

        assert!(caption.starts_with("Welcome Ann\\_B\\. to *DripCoinQuest*\\! 🎮💰"));
        assert!(caption.contains("🎁 *Claim Daily Rewards*: Return each day for your free daily coins\\!"));
        assert_eq!(caption.matches('\n').count(), 6);
    }

    #[test]
    fn test_keyboard_layout() {
        let keyboard = welcome_keyboard(&WelcomeConfig::default()).unwrap();

        assert_eq!(keyboard.inline_keyboard.len(), 2);
        assert_eq!(keyboard.inline_keyboard[0].len(), 2);
        assert_eq!(keyboard.inline_keyboard[0][0].text, "Start Quest");
        assert_eq!(keyboard.inline_keyboard[1][0].text, "Share Referral Link");
    }

    #[test]
    fn test_keyboard_rejects_bad_url() {
        let config = WelcomeConfig {
            quest_url: "not a url".to_string(),
            ..WelcomeConfig::default()
        };
        assert!(welcome_keyboard(&config).is_err());
    }

    #[test]
    fn test_referral_link_and_share_message() {
        let link = referral_link("@DripCoinBot", "777");
        assert_eq!(link, "https://t.me/DripCoinBot?start=777");

        let message = share_message("Bob", &link);
        assert!(message.starts_with("Hey Bob! 🎉"));
        assert!(message.contains("https://t.me/DripCoinBot?start=777"));
    }
}
