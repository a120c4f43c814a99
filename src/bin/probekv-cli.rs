//! Interactive ProbeKV client
//!
//! Reads commands from stdin, one per line, sends each to the server and
//! prints the human-readable rendering of the answer.
//!
//! ```text
//! $ probekv-cli --addr 127.0.0.1:6379
//! > HSET abc 123
//! Элемент добавлен в хеш-таблицу
//! > HGET abc
//! 123
//! ```

use anyhow::{bail, Context};
use clap::Parser;
use probekv::protocol::{encode_frame, ParseError, Response, Verb};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

const PROMPT: &str = "Введите команду HSET, HDEL, HGET, QPUSH, QPOP, SPUSH, SPOP, SADD, SISMEMBER, SREM: ";

/// Client configuration
#[derive(Parser, Debug)]
#[command(name = "probekv-cli", version, about = "Interactive client for the ProbeKV server")]
struct Config {
    /// Server address
    #[arg(short, long, default_value = "127.0.0.1:6379")]
    addr: String,

    /// Do not print the prompt
    #[arg(short, long)]
    quiet: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let stream = TcpStream::connect(&config.addr)
        .await
        .with_context(|| format!("failed to connect to {}", config.addr))?;
    debug!(addr = %config.addr, "Connected");

    let (reader, mut writer) = stream.into_split();
    let mut responses = BufReader::new(reader).lines();
    let mut input = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    loop {
        if !config.quiet {
            stdout.write_all(PROMPT.as_bytes()).await?;
            stdout.flush().await?;
        }

        let line = match input.next_line().await? {
            Some(line) => line,
            None => break,
        };
        let command = line.trim();
        let verb = command.split(' ').next().and_then(Verb::parse);

        writer
            .write_all(&encode_frame(command))
            .await
            .context("failed to send command")?;

        let frame = match responses.next_line().await? {
            Some(frame) => frame,
            None => bail!("server closed the connection"),
        };

        match Response::decode(verb, &frame) {
            Ok(response) => {
                stdout.write_all(response.render_text().as_bytes()).await?;
                stdout.write_all(b"\n").await?;
            }
            Err(ParseError::ProtocolError(message)) => {
                warn!(%message, "Server rejected the command");
                bail!("protocol error: {}", message);
            }
            Err(e) => {
                // A text-mode server sends the rendering directly
                debug!(error = %e, "Not a tagged frame, printing as text");
                let text = probekv::protocol::unescape(&frame).unwrap_or(frame);
                stdout.write_all(text.as_bytes()).await?;
                stdout.write_all(b"\n").await?;
            }
        }
    }

    Ok(())
}
