//! The relay loop.
//!
//! One task owns everything: the transport, the serial device, the arbitrator
//! and both buffers. Each tick services the transport, drains inbound bytes
//! to the serial device and polls it for one byte, without ever blocking on
//! either side.

use std::time::Duration;

use bytes::Bytes;
use tracing::{info_span, trace, Instrument};

use crate::{
    arbitrator::Arbitrator,
    buffer::RingBuffer,
    config::Config,
    echo::LocalEcho,
    error::Error,
    serial::SerialDevice,
    session::Session,
    transport::{Transport, TransportEvent},
};

/// Bridges a serial device and a single session on a transport.
pub struct Relay<T, S> {
    transport: T,
    serial: S,
    arbitrator: Arbitrator,
    inbound: RingBuffer<u8>,
    echo: LocalEcho,
    translate_cr_to_crlf: bool,
    service_wait: Duration,

    // Set when the last poll produced a byte.
    serial_busy: bool,
}

impl<T: Transport, S: SerialDevice> Relay<T, S> {
    /// Set up a relay with no active session.
    ///
    /// `inbound` holds bytes from the session until the serial device takes them.
    pub fn new(transport: T, serial: S, inbound: RingBuffer<u8>, config: &Config) -> Self {
        Self {
            transport,
            serial,
            arbitrator: Arbitrator::new(),
            inbound,
            echo: LocalEcho::new(config.options.local_echo),
            translate_cr_to_crlf: config.options.translate_cr_to_crlf,
            service_wait: config.service_wait(),
            serial_busy: false,
        }
    }

    /// Relay until something fatal happens.
    pub async fn run(&mut self) -> Result<(), Error> {
        let span = info_span!("relay");

        loop {
            self.tick().instrument(span.clone()).await?;
        }
    }

    /// One round of servicing both sides.
    pub async fn tick(&mut self) -> Result<(), Error> {
        let wait = if self.serial_busy {
            Duration::ZERO
        } else {
            self.service_wait
        };

        let events = self.transport.service(wait).await?;
        for event in events {
            self.dispatch(event)?;
        }

        self.drain_inbound()?;

        match self
            .serial
            .poll_byte(Duration::ZERO)
            .await
            .map_err(Error::SerialRead)?
        {
            Some(byte) => {
                self.serial_busy = true;
                self.relay_byte(byte)?;
            }
            None => self.serial_busy = false,
        }

        // The transport's connection tasks share this thread.
        tokio::task::yield_now().await;

        Ok(())
    }

    fn dispatch(&mut self, event: TransportEvent) -> Result<(), Error> {
        match event {
            TransportEvent::Established(session) => {
                self.arbitrator.on_establish(&mut self.transport, &session)
            }
            TransportEvent::Writable(session) => {
                self.arbitrator.on_writable(&mut self.transport, &session)
            }
            TransportEvent::Received(session, message) => self.receive(&session, message)?,
            TransportEvent::Closed(session) => self.arbitrator.on_close(&session),
        }

        Ok(())
    }

    fn receive(&mut self, session: &Session, message: Bytes) -> Result<(), Error> {
        let Some(message) = self.arbitrator.on_receive(session, message) else {
            return Ok(());
        };

        let add_lf = self.translate_cr_to_crlf && message.first() == Some(&b'\r');
        let incoming = message.len() + usize::from(add_lf);

        // Make room first, the device may already be able to take some.
        if incoming > self.inbound.free() {
            self.drain_inbound()?;
        }

        let free = self.inbound.free();
        if incoming > free {
            return Err(Error::InboundOverflow { incoming, free });
        }

        for &byte in message.iter() {
            self.inbound
                .enqueue(byte)
                .map_err(|_| Error::InboundOverflow { incoming, free })?;
        }
        if add_lf {
            self.inbound
                .enqueue(b'\n')
                .map_err(|_| Error::InboundOverflow { incoming, free })?;
        }

        trace!(%session, "Queued {incoming} byte(s) for serial");

        Ok(())
    }

    fn drain_inbound(&mut self) -> Result<(), Error> {
        while !self.inbound.is_empty() {
            let written = self
                .serial
                .try_write(self.inbound.contiguous())
                .map_err(Error::SerialWrite)?;

            if written == 0 {
                trace!("Serial not ready, {} byte(s) waiting", self.inbound.len());
                break;
            }

            self.inbound.advance(written);
        }

        Ok(())
    }

    fn relay_byte(&mut self, byte: u8) -> Result<(), Error> {
        let relayed = self.arbitrator.stage(&mut self.transport, byte)?;

        if !relayed {
            trace!("Nobody listening, discarding {byte:#04x}");
        }

        self.echo.echo(byte, relayed);

        Ok(())
    }

    /// See [`Arbitrator`].
    pub fn arbitrator(&self) -> &Arbitrator {
        &self.arbitrator
    }

    /// The transport in use.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// The transport in use, mutably.
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// The serial device in use.
    pub fn serial(&self) -> &S {
        &self.serial
    }

    /// Bytes from the session not yet taken by the serial device.
    pub fn inbound_len(&self) -> usize {
        self.inbound.len()
    }
}
