use std::io::{BufRead, Write};
use std::path::PathBuf;

use clap::Parser;
use scribe_core::channel::{Channel, ChannelError, ChannelMessage};

#[derive(Debug, Parser)]
#[command(name = "scribe")]
#[command(about = "Chat, git release notes, and code documentation search from one prompt", long_about = None)]
pub struct Cli {
    #[arg(long, help = "Path to the TOML config file (falls back to SCRIBE_CONFIG, then config/default.toml)")]
    pub config: Option<PathBuf>,

    #[arg(long, help = "Index collection to use (overrides config)")]
    pub collection: Option<String>,
}

/// Line-oriented terminal channel: stdin in, stdout out.
#[derive(Debug, Default)]
pub struct CliChannel {
    accumulated: String,
}

impl CliChannel {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

async fn read_line() -> Result<Option<String>, ChannelError> {
    tokio::task::spawn_blocking(|| {
        let mut line = String::new();
        let read = std::io::stdin().lock().read_line(&mut line)?;
        Ok::<_, std::io::Error>((read > 0).then(|| line.trim_end_matches(['\r', '\n']).to_owned()))
    })
    .await
    .map_err(|e| ChannelError::Other(e.to_string()))?
    .map_err(ChannelError::Io)
}

impl Channel for CliChannel {
    async fn recv(&mut self) -> Result<Option<ChannelMessage>, ChannelError> {
        Ok(read_line().await?.map(|text| ChannelMessage { text }))
    }

    async fn send(&mut self, text: &str) -> Result<(), ChannelError> {
        println!("{text}");
        Ok(())
    }

    async fn send_chunk(&mut self, chunk: &str) -> Result<(), ChannelError> {
        let mut out = std::io::stdout();
        write!(out, "{chunk}")?;
        out.flush()?;
        self.accumulated.push_str(chunk);
        Ok(())
    }

    async fn flush_chunks(&mut self) -> Result<(), ChannelError> {
        println!();
        self.accumulated.clear();
        Ok(())
    }

    async fn prompt(&mut self, label: &str) -> Result<Option<String>, ChannelError> {
        let mut out = std::io::stdout();
        write!(out, "{label} ")?;
        out.flush()?;
        read_line().await
    }
}
