use std::{io, time::Duration};

use futures::FutureExt;
use serialport::{ClearBuffer, DataBits, FlowControl, Parity, StopBits};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio_serial::{SerialPort as _, SerialPortBuilderExt, SerialStream};
use tracing::{debug, info};

use super::{BaudRate, SerialDevice};
use crate::error::Error;

/// A serial port opened in raw 8N1 mode without flow control.
pub struct SerialPort {
    path: String,
    stream: SerialStream,
}

impl std::fmt::Debug for SerialPort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialPort").field("path", &self.path).finish()
    }
}

/// Builder for a [`SerialPort`].
#[derive(Debug, Default)]
pub struct SerialPortBuilder {
    baud: BaudRate,
    path: String,
}

impl SerialPortBuilder {
    /// Start a new builder.
    /// The tty should likely be along the lines of `/dev/ttyACMx` or `/dev/ttyUSBx`.
    pub fn new(tty: &str) -> Self {
        Self {
            path: tty.to_string(),
            ..Default::default()
        }
    }

    /// Set the baud rate.
    /// Will use 115200 if not set.
    pub fn baud(mut self, baud: BaudRate) -> Self {
        self.baud = baud;
        self
    }

    /// Open and configure the port.
    ///
    /// Opening and configuring fail separately, so the two problems
    /// can be told apart by the caller.
    pub fn open(self) -> Result<SerialPort, Error> {
        let SerialPortBuilder { baud, path } = self;

        debug!(%path, %baud, "Opening port");

        let mut stream = tokio_serial::new(&path, baud.bits_per_second())
            .open_native_async()
            .map_err(|source| Error::SerialOpen {
                path: path.clone(),
                source,
            })?;

        configure(&mut stream, baud).map_err(|source| Error::SerialConfig {
            path: path.clone(),
            source,
        })?;

        info!(%path, %baud, "Serial device opened");

        Ok(SerialPort { path, stream })
    }
}

fn configure(stream: &mut SerialStream, baud: BaudRate) -> Result<(), tokio_serial::Error> {
    stream.set_baud_rate(baud.bits_per_second())?;
    stream.set_data_bits(DataBits::Eight)?;
    stream.set_parity(Parity::None)?;
    stream.set_stop_bits(StopBits::One)?;
    stream.set_flow_control(FlowControl::None)?;

    // Whatever was sitting in the line before we arrived is not ours.
    stream.clear(ClearBuffer::All)?;

    Ok(())
}

impl SerialPort {
    /// The device path.
    pub fn path(&self) -> &str {
        &self.path
    }
}

impl SerialDevice for SerialPort {
    async fn poll_byte(&mut self, wait: Duration) -> io::Result<Option<u8>> {
        // The timeout polls the read once before looking at the clock,
        // so a zero wait still picks up a byte that is already there.
        match tokio::time::timeout(wait, self.stream.read_u8()).await {
            Ok(Ok(byte)) => Ok(Some(byte)),
            Ok(Err(e)) => Err(e),
            Err(_elapsed) => Ok(None),
        }
    }

    fn try_write(&mut self, bytes: &[u8]) -> io::Result<usize> {
        if bytes.is_empty() {
            return Ok(0);
        }

        match self.stream.write(bytes).now_or_never() {
            Some(result) => result,
            None => Ok(0),
        }
    }
}
