//! Clipboard write-out through the wl-copy command.

use std::io::{self, Write};
use std::process::{Command, Stdio};

use thiserror::Error;

const WL_COPY_COMMAND: &str = "wl-copy";
const MIME_IMAGE_PNG: &str = "image/png";

#[derive(Debug, Error)]
pub enum ClipboardError {
    #[error("clipboard command {command} failed: {source}")]
    Io {
        command: String,
        #[source]
        source: io::Error,
    },
    #[error("wl-copy did not expose a writable stdin")]
    StdinUnavailable,
    #[error("wl-copy rejected the image write: {status}")]
    WriteRejected { status: String },
    #[error("clipboard writes are not supported on this host")]
    Unsupported,
}

pub type ClipboardResult<T> = std::result::Result<T, ClipboardError>;

pub trait ClipboardBackend {
    /// Reports whether image writes can be expected to succeed on this host.
    fn is_supported(&self) -> bool;
    fn copy_png(&self, png_bytes: &[u8]) -> ClipboardResult<()>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct WlCopyClipboard;

impl ClipboardBackend for WlCopyClipboard {
    fn is_supported(&self) -> bool {
        Command::new(WL_COPY_COMMAND)
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|status| status.success())
            .unwrap_or(false)
    }

    fn copy_png(&self, png_bytes: &[u8]) -> ClipboardResult<()> {
        let mut child = Command::new(WL_COPY_COMMAND)
            .args(["-t", MIME_IMAGE_PNG])
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(command_error)?;

        let mut stdin = child.stdin.take().ok_or(ClipboardError::StdinUnavailable)?;
        let written = stdin.write_all(png_bytes).and_then(|()| stdin.flush());
        drop(stdin);

        let status = child.wait().map_err(command_error)?;
        written.map_err(command_error)?;

        if status.success() {
            Ok(())
        } else {
            Err(ClipboardError::WriteRejected {
                status: status.to_string(),
            })
        }
    }
}

fn command_error(source: io::Error) -> ClipboardError {
    ClipboardError::Io {
        command: WL_COPY_COMMAND.to_string(),
        source,
    }
}

/// Stand-in for hosts without any clipboard integration.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnsupportedClipboard;

impl ClipboardBackend for UnsupportedClipboard {
    fn is_supported(&self) -> bool {
        false
    }

    fn copy_png(&self, _png_bytes: &[u8]) -> ClipboardResult<()> {
        Err(ClipboardError::Unsupported)
    }
}
