use nix::sys::termios::{tcgetattr, tcsetattr, SetArg, Termios};
use serialport::{DataBits, SerialPort, StopBits, TTYPort};
use std::fmt;
use std::fs::OpenOptions;
use std::io::{self, Read, Write};
use std::os::fd::{AsRawFd, BorrowedFd};
use std::os::unix::fs::OpenOptionsExt;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::TransportError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Parity {
    #[default]
    None,
    Even,
    Odd,
    /// Parity bit always 1
    Mark,
    /// Parity bit always 0
    Space,
}

impl Parity {
    fn symbol(&self) -> char {
        match self {
            Parity::None => 'N',
            Parity::Even => 'E',
            Parity::Odd => 'O',
            Parity::Space => '0',
            Parity::Mark => '1',
        }
    }

    fn to_serialport(self) -> serialport::Parity {
        match self {
            Parity::Even => serialport::Parity::Even,
            Parity::Odd => serialport::Parity::Odd,
            // Mark and space are set on the termios after opening
            Parity::None | Parity::Mark | Parity::Space => serialport::Parity::None,
        }
    }
}

/// Serial character framing, written as `<data bits><parity><stop bits>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameFormat {
    pub data_bits: u8,
    pub parity: Parity,
    pub stop_bits: u8,
}

impl Default for FrameFormat {
    fn default() -> Self {
        Self {
            data_bits: 8,
            parity: Parity::None,
            stop_bits: 1,
        }
    }
}

impl FromStr for FrameFormat {
    type Err = TransportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || TransportError::InvalidFormat(s.to_string());
        let bytes = s.trim().as_bytes();
        let [data, parity, stop] = bytes else {
            return Err(invalid());
        };
        let data_bits = match data {
            b'5'..=b'8' => data - b'0',
            _ => return Err(invalid()),
        };
        let parity = match parity.to_ascii_uppercase() {
            b'N' => Parity::None,
            b'E' => Parity::Even,
            b'O' => Parity::Odd,
            b'0' => Parity::Space,
            b'1' => Parity::Mark,
            _ => return Err(invalid()),
        };
        let stop_bits = match stop {
            b'1' | b'2' => stop - b'0',
            _ => return Err(invalid()),
        };
        Ok(Self {
            data_bits,
            parity,
            stop_bits,
        })
    }
}

impl fmt::Display for FrameFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.data_bits, self.parity.symbol(), self.stop_bits)
    }
}

fn to_data_bits(bits: u8) -> DataBits {
    match bits {
        5 => DataBits::Five,
        6 => DataBits::Six,
        7 => DataBits::Seven,
        _ => DataBits::Eight,
    }
}

fn to_stop_bits(bits: u8) -> StopBits {
    match bits {
        2 => StopBits::Two,
        _ => StopBits::One,
    }
}

/// An open tty plus the line settings it had before we touched it.
pub(super) struct SerialLine {
    port: TTYPort,
    saved: Option<Termios>,
}

impl SerialLine {
    pub(super) fn open(
        device: &str,
        baud: u32,
        format: FrameFormat,
        timeout: Duration,
    ) -> Result<Self, TransportError> {
        let open_err = |source: io::Error| TransportError::Open {
            target: device.to_string(),
            source,
        };
        let saved = snapshot(device);

        let port = serialport::new(device, baud)
            .data_bits(to_data_bits(format.data_bits))
            .parity(format.parity.to_serialport())
            .stop_bits(to_stop_bits(format.stop_bits))
            .timeout(timeout)
            .open_native()
            .map_err(|e| open_err(e.into()))?;

        let line = Self { port, saved };
        if matches!(format.parity, Parity::Mark | Parity::Space) {
            line.set_stick_parity(format.parity == Parity::Mark)
                .map_err(open_err)?;
        }
        info!(device, baud, format = %format, "serial line configured");
        Ok(line)
    }

    pub(super) fn as_fd(&self) -> BorrowedFd<'_> {
        // SAFETY: the descriptor is owned by `self.port` and outlives the borrow
        unsafe { BorrowedFd::borrow_raw(self.port.as_raw_fd()) }
    }

    pub(super) fn baud_rate(&self) -> u32 {
        match self.port.baud_rate() {
            Ok(baud) => baud,
            Err(e) => {
                debug!(error = %e, "cannot read back baud rate");
                0
            }
        }
    }

    pub(super) fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.port.read(buf)
    }

    /// Queue `data` with the driver. No drain: the caller holds the session lock.
    pub(super) fn write_all(&mut self, data: &[u8]) -> io::Result<()> {
        self.port.write_all(data)
    }

    pub(super) fn try_clone(&self) -> io::Result<Self> {
        let port = self.port.try_clone_native().map_err(io::Error::from)?;
        Ok(Self { port, saved: None })
    }

    /// Put back the settings captured at open.
    pub(super) fn restore(&mut self) {
        let Some(saved) = self.saved.take() else {
            return;
        };
        if let Err(e) = tcsetattr(self.as_fd(), SetArg::TCSANOW, &saved) {
            warn!(error = %e, "failed to restore serial line settings");
        }
    }

    #[cfg(target_os = "linux")]
    fn set_stick_parity(&self, mark: bool) -> io::Result<()> {
        use nix::sys::termios::ControlFlags;

        let fd = self.as_fd();
        let mut termios = tcgetattr(fd)?;
        termios
            .control_flags
            .insert(ControlFlags::PARENB | ControlFlags::CMSPAR);
        termios.control_flags.set(ControlFlags::PARODD, mark);
        tcsetattr(fd, SetArg::TCSANOW, &termios)?;
        Ok(())
    }

    #[cfg(not(target_os = "linux"))]
    fn set_stick_parity(&self, _mark: bool) -> io::Result<()> {
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "mark/space parity is not supported on this platform",
        ))
    }
}

/// Capture the current line settings without becoming the controlling tty.
fn snapshot(device: &str) -> Option<Termios> {
    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .custom_flags(libc::O_NOCTTY | libc::O_NONBLOCK)
        .open(device)
        .map_err(|e| debug!(device, error = %e, "cannot open device for settings snapshot"))
        .ok()?;
    tcgetattr(&file)
        .map_err(|e| debug!(device, error = %e, "cannot read line settings"))
        .ok()
}
