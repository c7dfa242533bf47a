//! # Serial/TTY Transport
//!
//! Talks to printers attached as serial devices: USB-serial adapters
//! (`/dev/ttyUSB0`, `/dev/usb/lp0`) and Bluetooth SPP bindings
//! (`/dev/rfcomm0`) look the same from here.
//!
//! ## TTY Configuration
//!
//! The device is opened in raw mode so binary data passes through
//! unmodified:
//!
//! - **No input processing**: IGNBRK, BRKINT, PARMRK, ISTRIP, INLCR,
//!   IGNCR, ICRNL all cleared
//! - **No software flow control**: IXON/IXOFF/IXANY cleared, because
//!   0x11 (XON) and 0x13 (XOFF) can appear in 1bpp image rows
//! - **No output processing**: OPOST cleared (no CR/LF translation)
//! - **8-bit characters**: CS8, no parity
//! - **No echo, non-canonical**: ECHO, ECHONL, ICANON, ISIG, IEXTEN
//!   cleared
//!
//! Reads are non-blocking (`O_NONBLOCK`); `receive` returns whatever the
//! driver has buffered, or nothing.
//!
//! ## Chunked Writes
//!
//! Large buffers (image uploads, mostly) are written in chunks with a
//! small pause between them, so slow links and shallow printer input
//! buffers are not overrun.

use std::fs::{File, OpenOptions};
use std::io::{self, Read, Write};
use std::os::unix::fs::OpenOptionsExt;
use std::os::unix::io::AsRawFd;
use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::CommunicationError;

use super::Transport;

/// Default chunk size for writes (bytes)
const CHUNK_SIZE: usize = 4096;

/// Delay between chunks (milliseconds)
const CHUNK_DELAY_MS: u64 = 2;

/// Read buffer size per poll
const READ_BUFFER_SIZE: usize = 1024;

/// # Serial Printer Transport
///
/// ## Example
///
/// ```no_run
/// use etiqueta::transport::{SerialTransport, Transport};
///
/// # async fn example() -> Result<(), etiqueta::error::CommunicationError> {
/// let mut transport = SerialTransport::open("/dev/ttyUSB0")?;
/// transport.send(b"\r\nN\r\nP1\r\n").await?;
/// # Ok(())
/// # }
/// ```
pub struct SerialTransport {
    file: Option<File>,
    chunk_size: usize,
    chunk_delay: Duration,
}

impl SerialTransport {
    /// Open a serial device in raw non-blocking mode.
    ///
    /// ## Errors
    ///
    /// Fails if the device does not exist, is not accessible (dialout
    /// group or root may be needed), or refuses raw TTY configuration.
    pub fn open<P: AsRef<Path>>(device: P) -> Result<Self, CommunicationError> {
        let path = device.as_ref();

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .custom_flags(libc::O_NONBLOCK | libc::O_NOCTTY)
            .open(path)
            .map_err(|e| {
                CommunicationError::Transport(format!("failed to open {}: {e}", path.display()))
            })?;

        configure_tty_raw(file.as_raw_fd())?;
        tracing::info!(device = %path.display(), "serial transport opened");

        Ok(Self {
            file: Some(file),
            chunk_size: CHUNK_SIZE,
            chunk_delay: Duration::from_millis(CHUNK_DELAY_MS),
        })
    }

    /// Set the chunk size for large writes. Default is 4096 bytes.
    pub fn set_chunk_size(&mut self, size: usize) {
        self.chunk_size = size.max(1);
    }

    /// Set the pause between chunks. Default is 2ms.
    pub fn set_chunk_delay(&mut self, delay: Duration) {
        self.chunk_delay = delay;
    }

    fn file_mut(&mut self) -> Result<&mut File, CommunicationError> {
        self.file.as_mut().ok_or(CommunicationError::NotConnected)
    }
}

#[async_trait]
impl Transport for SerialTransport {
    async fn send(&mut self, data: &[u8]) -> Result<(), CommunicationError> {
        let chunk_size = self.chunk_size;
        let chunk_delay = self.chunk_delay;
        let file = self.file_mut()?;

        if data.len() <= chunk_size {
            file.write_all(data)
                .map_err(|e| CommunicationError::Transport(format!("write failed: {e}")))?;
        } else {
            for chunk in data.chunks(chunk_size) {
                file.write_all(chunk)
                    .map_err(|e| CommunicationError::Transport(format!("write failed: {e}")))?;
                if !chunk_delay.is_zero() {
                    tokio::time::sleep(chunk_delay).await;
                }
            }
        }

        file.flush()
            .map_err(|e| CommunicationError::Transport(format!("flush failed: {e}")))?;
        Ok(())
    }

    async fn receive(&mut self) -> Result<Vec<Vec<u8>>, CommunicationError> {
        let file = self.file_mut()?;
        let mut reads = Vec::new();
        let mut buffer = [0u8; READ_BUFFER_SIZE];

        loop {
            match file.read(&mut buffer) {
                Ok(0) => break,
                Ok(n) => reads.push(buffer[..n].to_vec()),
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }

        Ok(reads)
    }

    fn is_connected(&self) -> bool {
        self.file.is_some()
    }

    async fn dispose(&mut self) -> Result<(), CommunicationError> {
        if let Some(mut file) = self.file.take() {
            file.flush()
                .map_err(|e| CommunicationError::Transport(format!("flush failed: {e}")))?;
        }
        Ok(())
    }
}

/// Configure a file descriptor for raw TTY mode.
///
/// Clearing IXON/IXOFF/IXANY matters most: 0x11 and 0x13 are valid bytes
/// in binary raster data and must not be eaten as flow control.
#[cfg(unix)]
fn configure_tty_raw(fd: i32) -> Result<(), CommunicationError> {
    use std::mem::MaybeUninit;

    let mut termios = MaybeUninit::uninit();
    let result = unsafe { libc::tcgetattr(fd, termios.as_mut_ptr()) };
    if result != 0 {
        return Err(CommunicationError::Transport(format!(
            "tcgetattr failed: {}",
            io::Error::last_os_error()
        )));
    }
    let mut termios = unsafe { termios.assume_init() };

    termios.c_iflag &= !(libc::IGNBRK
        | libc::BRKINT
        | libc::PARMRK
        | libc::ISTRIP
        | libc::INLCR
        | libc::IGNCR
        | libc::ICRNL
        | libc::IXON
        | libc::IXOFF
        | libc::IXANY);

    termios.c_oflag &= !libc::OPOST;

    termios.c_lflag &= !(libc::ECHO | libc::ECHONL | libc::ICANON | libc::ISIG | libc::IEXTEN);

    termios.c_cflag &= !(libc::CSIZE | libc::PARENB);
    termios.c_cflag |= libc::CS8;

    let result = unsafe { libc::tcsetattr(fd, libc::TCSANOW, &termios) };
    if result != 0 {
        return Err(CommunicationError::Transport(format!(
            "tcsetattr failed: {}",
            io::Error::last_os_error()
        )));
    }

    Ok(())
}

#[cfg(not(unix))]
fn configure_tty_raw(_fd: i32) -> Result<(), CommunicationError> {
    Ok(())
}

// Hardware-dependent behavior is exercised manually against a connected
// printer; automated coverage lives in the mock transport tests.
