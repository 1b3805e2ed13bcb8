//! Command line and environment configuration

use std::time::Duration;

use clap::Parser;

use crate::types::{NTAG_FIRST_USER_PAGE, NTAG_READ_END_PAGE};

#[derive(Parser, Debug, Clone)]
#[command(name = "nfc-webhook")]
#[command(about = "Fire an HTTP request at the URI stored on each scanned NFC tag", long_about = None)]
pub struct Config {
    /// Only use readers whose name contains this string
    #[arg(long, env = "NFC_READER")]
    pub reader: Option<String>,

    /// First NTAG page to read
    #[arg(long, env = "NFC_FIRST_PAGE", default_value_t = NTAG_FIRST_USER_PAGE)]
    pub first_page: u8,

    /// Page to stop reading at (exclusive)
    #[arg(long, env = "NFC_LAST_PAGE", default_value_t = NTAG_READ_END_PAGE)]
    pub last_page: u8,

    /// Webhook request timeout in seconds
    #[arg(long, env = "NFC_HTTP_TIMEOUT", default_value = "10", value_parser = parse_secs)]
    pub http_timeout: Duration,

    /// Pause after each handled tag, in seconds
    #[arg(long, env = "NFC_COOLDOWN", default_value = "3", value_parser = parse_secs)]
    pub cooldown: Duration,

    /// Pause before retrying after a reader fault, in seconds
    #[arg(long, env = "NFC_RETRY_BACKOFF", default_value = "5", value_parser = parse_secs)]
    pub retry_backoff: Duration,

    /// Decode and log URIs without sending requests
    #[arg(long, env = "NFC_DRY_RUN")]
    pub dry_run: bool,
}

impl Config {
    pub fn pages(&self) -> std::ops::Range<u8> {
        self.first_page..self.last_page
    }

    pub fn accepts_reader(&self, name: &str) -> bool {
        self.reader
            .as_deref()
            .is_none_or(|filter| name.contains(filter))
    }
}

fn parse_secs(s: &str) -> Result<Duration, String> {
    s.parse::<u64>()
        .map(Duration::from_secs)
        .map_err(|e| format!("invalid number of seconds '{}': {}", s, e))
}
