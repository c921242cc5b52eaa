//! Parameter channel interface
//!
//! A channel carries gain tuples in from a remote peer and telemetry values
//! out to it. The controller never talks to a channel directly; the control
//! loop polls it between compute cycles.

use core::ops::{Deref, DerefMut};

use crate::controller::Gains;

/// Bidirectional link to the tuning peer
pub trait ParameterChannel {
    /// Transmit one value to the peer
    ///
    /// Best effort: dropped silently when no peer is attached.
    fn send(&mut self, value: f32);

    /// Transmit a measurement together with the control output
    ///
    /// Best effort like `send`. Channels without a report payload send the
    /// measurement only, so plain telemetry never carries the output.
    fn send_report(&mut self, measurement: f32, output: f32) {
        let _ = output;
        self.send(measurement);
    }

    /// Latest gain tuple received since the last poll, if any
    ///
    /// Must not block.
    fn poll_gains(&mut self) -> Option<Gains>;

    /// Bring the transport up (advertise, bind, register handlers)
    fn start(&mut self);

    /// Tear the transport down
    fn stop(&mut self);
}

impl<C: ParameterChannel + ?Sized> ParameterChannel for &mut C {
    fn send(&mut self, value: f32) {
        (**self).send(value)
    }

    fn send_report(&mut self, measurement: f32, output: f32) {
        (**self).send_report(measurement, output)
    }

    fn poll_gains(&mut self) -> Option<Gains> {
        (**self).poll_gains()
    }

    fn start(&mut self) {
        (**self).start()
    }

    fn stop(&mut self) {
        (**self).stop()
    }
}

/// Started channel that is stopped again when dropped
///
/// Dropping covers every exit path of the owning loop, unwinding included.
pub struct Session<C: ParameterChannel> {
    channel: C,
}

impl<C: ParameterChannel> Session<C> {
    /// Start `channel` and hold it until the session is dropped
    pub fn open(mut channel: C) -> Self {
        channel.start();
        info!("Parameter channel started");
        Self { channel }
    }
}

impl<C: ParameterChannel> Deref for Session<C> {
    type Target = C;

    fn deref(&self) -> &C {
        &self.channel
    }
}

impl<C: ParameterChannel> DerefMut for Session<C> {
    fn deref_mut(&mut self) -> &mut C {
        &mut self.channel
    }
}

impl<C: ParameterChannel> ParameterChannel for Session<C> {
    fn send(&mut self, value: f32) {
        self.channel.send(value)
    }

    fn send_report(&mut self, measurement: f32, output: f32) {
        self.channel.send_report(measurement, output)
    }

    fn poll_gains(&mut self) -> Option<Gains> {
        self.channel.poll_gains()
    }

    // Already started by `open`
    fn start(&mut self) {}

    // Stopped by `Drop`
    fn stop(&mut self) {}
}

impl<C: ParameterChannel> Drop for Session<C> {
    fn drop(&mut self) {
        self.channel.stop();
        info!("Parameter channel stopped");
    }
}
