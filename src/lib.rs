//! Discrete PID controller with runtime-retunable gains
//!
//! The controller runs one step per sampling period; a parameter channel
//! delivers new gains from a remote peer and carries telemetry back. Gain
//! updates are applied between steps only.
#![cfg_attr(not(test), no_std)]

#[macro_use]
mod fmt;

pub mod channel;
pub mod config;
pub mod control_loop;
pub mod controller;
pub mod mailbox;
pub mod plant;
pub mod protocol;
pub mod shared;

pub use channel::{ParameterChannel, Session};
pub use control_loop::{ControlLoop, CycleReport};
pub use controller::{
    ConfigError, Gains, OutputLimits, ParameterUpdate, PidConfig, PidController, PidTerms,
};
pub use mailbox::GainMailbox;
pub use plant::{FirstOrderPlant, Process};
pub use shared::SharedController;
