//! Engine process and UCI line channel (async I/O)

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};

use tracing::debug;

use crate::error::EngineError;

/// Spawn the engine binary with piped stdio. The child is killed when dropped.
pub fn spawn_engine(path: &str) -> Result<(Child, ChildStdout, ChildStdin), EngineError> {
    let mut process = Command::new(path)
        .stdin(std::process::Stdio::piped())
        .stdout(std::process::Stdio::piped())
        .stderr(std::process::Stdio::null())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| EngineError::Spawn(format!("{path}: {e}")))?;

    let stdin = process
        .stdin
        .take()
        .ok_or_else(|| EngineError::Spawn("stdin not captured".into()))?;
    let stdout = process
        .stdout
        .take()
        .ok_or_else(|| EngineError::Spawn("stdout not captured".into()))?;

    Ok((process, stdout, stdin))
}

/// Line-oriented duplex channel to a UCI engine.
pub struct UciChannel<R, W> {
    reader: BufReader<R>,
    writer: W,
}

impl<R, W> UciChannel<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub fn new(reader: R, writer: W) -> Self {
        Self {
            reader: BufReader::new(reader),
            writer,
        }
    }

    /// Initialize UCI: `uci`/`uciok`, single PV, `isready`/`readyok`.
    pub async fn handshake(&mut self) -> Result<(), EngineError> {
        self.send("uci").await?;
        self.wait_for("uciok").await?;
        self.send("setoption name MultiPV value 1").await?;
        self.send("isready").await?;
        self.wait_for("readyok").await?;
        Ok(())
    }

    pub async fn send(&mut self, cmd: &str) -> Result<(), EngineError> {
        send_line(&mut self.writer, cmd).await
    }

    /// Next line without its terminator; `None` once the engine closed stdout.
    pub async fn read_line(&mut self) -> Result<Option<String>, EngineError> {
        let mut line = String::new();
        let n = self.reader.read_line(&mut line).await?;
        if n == 0 {
            return Ok(None);
        }
        let trimmed = line.trim().to_string();
        debug!(line = trimmed.as_str(), "SF >");
        Ok(Some(trimmed))
    }

    /// Wait for a specific response line
    async fn wait_for(&mut self, expected: &'static str) -> Result<(), EngineError> {
        loop {
            match self.read_line().await? {
                Some(line) if line == expected => return Ok(()),
                Some(_) => continue,
                None => return Err(EngineError::Handshake(expected)),
            }
        }
    }

    pub fn into_parts(self) -> (BufReader<R>, W) {
        (self.reader, self.writer)
    }
}

/// Write one command line and flush.
pub async fn send_line<W: AsyncWrite + Unpin>(writer: &mut W, cmd: &str) -> Result<(), EngineError> {
    debug!(cmd, "SF <");
    writer.write_all(format!("{cmd}\n").as_bytes()).await?;
    writer.flush().await?;
    Ok(())
}
