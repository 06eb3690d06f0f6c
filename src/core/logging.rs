//! Logging initialization and startup diagnostics

use anyhow::{Context, Result};
use simplelog::*;
use std::fs::File;

use crate::core::config::AppConfig;

/// Level for both sinks; ledger retries log at `debug` and stay quiet
const LOG_LEVEL: LevelFilter = LevelFilter::Info;

/// Installs the process logger: colored terminal output plus a plain copy in
/// `log_file_path`, which is truncated on every start.
///
/// Fails when the file cannot be created or a logger is already installed.
pub fn init_logger(log_file_path: &str) -> Result<()> {
    let log_file = File::create(log_file_path)
        .with_context(|| format!("Failed to create log file {}", log_file_path))?;

    let terminal: Box<dyn SharedLogger> = TermLogger::new(LOG_LEVEL, Config::default(), TerminalMode::Mixed, ColorChoice::Auto);
    let file: Box<dyn SharedLogger> = WriteLogger::new(LOG_LEVEL, Config::default(), log_file);

    CombinedLogger::init(vec![terminal, file]).context("Failed to initialize logger")?;
    Ok(())
}

/// Logs the effective configuration at startup, secrets masked
pub fn log_configuration(config: &AppConfig) {
    log::info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    log::info!("DripCoin configuration");
    log::info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    if config.bot_token.is_empty() {
        log::error!("BOT_TOKEN: not set");
    } else {
        log::info!("BOT_TOKEN: set ({} chars)", config.bot_token.len());
    }
    match &config.webhook_url {
        Some(url) => log::info!("SERVER_URL: {} (webhook mode available, port {})", url, config.port),
        None => log::info!("SERVER_URL: not set (long polling only)"),
    }
    log::info!("DATABASE_PATH: {}", config.database_path);
    log::info!(
        "Rewards: signup={} referral_bonus={} persist_unresolved_referrer={}",
        config.ledger.signup_balance,
        config.ledger.referral_bonus,
        config.ledger.persist_unresolved_referrer
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    use serial_test::serial;
    use tempfile::NamedTempFile;

    #[test]
    #[serial]
    fn test_init_logger_creates_log_file() {
        let temp_file = NamedTempFile::new().unwrap();
        let path = temp_file.path().to_str().unwrap();

        // A second init in the same process fails; either outcome is fine,
        // the file itself must exist afterwards.
        let _ = init_logger(path);

        assert!(temp_file.path().exists());
    }

    #[test]
    #[serial]
    fn test_init_logger_rejects_unwritable_path() {
        let result = init_logger("/nonexistent-dir/for/sure/dripcoin.log");
        assert!(result.is_err());
    }
}
