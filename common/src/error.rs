//! The error taxonomy from spec §7, rendered as wire-ready `ERR ...` strings.

use thiserror::Error;

/// Every error the NM or SS can hand back to a caller.
///
/// The `Display` impl is the literal wire string sent to the client, so
/// changing a message here changes the protocol.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DocsError {
    #[error("ERR not found")]
    FileNotFound,

    #[error("ERR no access")]
    NoAccess,

    #[error("ERR no write access")]
    NoWriteAccess,

    #[error("ERR file exists")]
    FileExists,

    #[error("ERR bad args")]
    InvalidArgs,

    #[error("ERR sentence locked")]
    SentenceLocked,

    #[error("ERR: Sentence index out of range (max: {max})")]
    SentenceOutOfRange { max: usize },

    #[error("ERR: Word index cannot be negative")]
    WordIndexNegative,

    #[error("ERR: Word index out of range (max: {max})")]
    WordOutOfRange { max: usize },

    #[error("ERR no storage server available")]
    SsNotAvailable,

    #[error("ERR SS not reachable")]
    SsNotReachable,

    #[error("ERR SS no response")]
    SsNoResponse,

    #[error("ERR please LOGIN first")]
    NotLoggedIn,

    #[error("ERR only owner can perform this operation")]
    OnlyOwner,

    #[error("ERR unknown command")]
    UnknownCommand,

    #[error("ERR system error")]
    SystemError,

    #[error("ERR not locked by this session")]
    NotLockedBySession,

    #[error("ERR file is locked for writing")]
    FileLockedForWriting,

    #[error("ERR resource limit reached")]
    ResourceLimit,

    #[error("ERR EXEC blocked; disallowed command '{0}'")]
    ExecBlocked(String),
}

impl DocsError {
    /// Render the exact line to put on the wire, matching §6's framing.
    pub fn wire_line(&self) -> String {
        self.to_string()
    }
}

impl From<std::io::Error> for DocsError {
    fn from(_: std::io::Error) -> Self {
        DocsError::SystemError
    }
}

pub type DocsResult<T> = Result<T, DocsError>;
