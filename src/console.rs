//! Interactive console control surface
//!
//! One command per line: `a` starts with audio, `v` starts without audio,
//! `s` stops, `q` stops and quits.

use anyhow::Result;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::info;

use crate::recorder::Recorder;

/// A parsed console line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    StartWithAudio,
    StartWithoutAudio,
    Stop,
    Status,
    Quit,
}

impl Command {
    pub fn parse(line: &str) -> Option<Self> {
        match line.trim().to_ascii_lowercase().as_str() {
            "a" | "audio" => Some(Command::StartWithAudio),
            "v" | "video" => Some(Command::StartWithoutAudio),
            "s" | "stop" => Some(Command::Stop),
            "?" | "status" => Some(Command::Status),
            "q" | "quit" | "exit" => Some(Command::Quit),
            _ => None,
        }
    }
}

const HELP: &str = "[a] start with audio  [v] start without audio  [s] stop  [?] status  [q] quit\n";

/// Drive `recorder` from line-oriented input until quit or end of input
pub async fn run<R, W>(recorder: &Recorder, input: R, mut output: W) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    output.write_all(HELP.as_bytes()).await?;
    let mut lines = input.lines();

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }

        let Some(command) = Command::parse(&line) else {
            output.write_all(HELP.as_bytes()).await?;
            continue;
        };

        let reply = match command {
            Command::StartWithAudio | Command::StartWithoutAudio => {
                let with_audio = command == Command::StartWithAudio;
                match recorder.start(with_audio).await {
                    Ok(session) => format!(
                        "Recording to {}\n",
                        session.paths.final_output.display()
                    ),
                    Err(e) => format!("Error: {}\n", e),
                }
            }
            Command::Stop => stop_message(recorder).await,
            Command::Status => {
                let status = recorder.status().await;
                match status.last_error {
                    Some(err) => format!("{} (last error: {})\n", status.state, err),
                    None => format!("{}\n", status.state),
                }
            }
            Command::Quit => break,
        };

        output.write_all(reply.as_bytes()).await?;
        output.flush().await?;
    }

    // Never leave a session running behind us
    let reply = stop_message(recorder).await;
    output.write_all(reply.as_bytes()).await?;
    output.flush().await?;

    info!("Console closed");
    Ok(())
}

async fn stop_message(recorder: &Recorder) -> String {
    match recorder.stop().await {
        Ok(Some(report)) => match &report.output {
            Some(path) if report.errors.is_empty() => format!("Saved {}\n", path.display()),
            Some(path) => format!("Saved {} ({})\n", path.display(), report.errors.join("; ")),
            None => format!("Recording failed: {}\n", report.errors.join("; ")),
        },
        Ok(None) => "Not recording\n".to_string(),
        Err(e) => format!("Error: {}\n", e),
    }
}
