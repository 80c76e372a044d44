//! Line-framed protocol I/O shared by every role.
//!
//! Every message on every channel in this system (client↔NM, client↔SS,
//! NM↔SS admin, SS→NM registration) is ASCII text terminated by `\n`. This
//! module is the single place that owns that framing, the way the teacher's
//! `api_client.rs` is the single place that owns the HTTP framing for its
//! remote calls.

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, BufWriter};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};

use crate::error::DocsError;

/// Literal terminator line for multi-line reply blocks.
pub const END: &str = "END";

/// A line-framed connection: buffered reader + writer over one TCP stream.
pub struct Connection {
    reader: BufReader<OwnedReadHalf>,
    writer: BufWriter<OwnedWriteHalf>,
}

impl Connection {
    pub fn new(stream: TcpStream) -> Self {
        stream.set_nodelay(true).ok();
        let (rh, wh) = stream.into_split();
        Self {
            reader: BufReader::new(rh),
            writer: BufWriter::new(wh),
        }
    }

    /// Read one line, trimming the trailing `\n`/`\r\n`. Returns `None` on EOF.
    pub async fn read_line(&mut self) -> Result<Option<String>, DocsError> {
        let mut buf = String::new();
        let n = self
            .reader
            .read_line(&mut buf)
            .await
            .map_err(|_| DocsError::SystemError)?;
        if n == 0 {
            return Ok(None);
        }
        while buf.ends_with('\n') || buf.ends_with('\r') {
            buf.pop();
        }
        Ok(Some(buf))
    }

    pub async fn write_line(&mut self, line: &str) -> Result<(), DocsError> {
        self.writer
            .write_all(line.as_bytes())
            .await
            .map_err(|_| DocsError::SystemError)?;
        self.writer
            .write_all(b"\n")
            .await
            .map_err(|_| DocsError::SystemError)?;
        self.writer.flush().await.map_err(|_| DocsError::SystemError)
    }

    /// Write several lines followed by the `END` sentinel, in one flush.
    pub async fn write_block<I, S>(&mut self, lines: I) -> Result<(), DocsError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for line in lines {
            self.writer
                .write_all(line.as_ref().as_bytes())
                .await
                .map_err(|_| DocsError::SystemError)?;
            self.writer.write_all(b"\n").await.map_err(|_| DocsError::SystemError)?;
        }
        self.writer
            .write_all(END.as_bytes())
            .await
            .map_err(|_| DocsError::SystemError)?;
        self.writer.write_all(b"\n").await.map_err(|_| DocsError::SystemError)?;
        self.writer.flush().await.map_err(|_| DocsError::SystemError)
    }

    pub async fn write_err(&mut self, err: &DocsError) -> Result<(), DocsError> {
        self.write_line(&err.wire_line()).await
    }
}

/// Open a fresh admin-style connection: dial, return a `Connection`.
///
/// Used by the NM to open a one-command-per-connection admin channel to an
/// SS, and by the SS to open its registration channel to the NM.
pub async fn dial(ip: &str, port: u16) -> Result<Connection, DocsError> {
    let stream = TcpStream::connect((ip, port))
        .await
        .map_err(|_| DocsError::SsNotReachable)?;
    Ok(Connection::new(stream))
}
