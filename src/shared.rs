//! Controller shared between execution contexts
//!
//! Every operation takes the lock for the whole call, so a gain update can
//! only land between two compute steps, never inside one.

use core::cell::RefCell;

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::blocking_mutex::Mutex;

use crate::controller::{
    ConfigError, Gains, OutputLimits, ParameterUpdate, PidConfig, PidController, PidTerms,
};

pub struct SharedController<M: RawMutex> {
    inner: Mutex<M, RefCell<PidController>>,
}

impl<M: RawMutex> SharedController<M> {
    pub fn new(config: PidConfig) -> Result<Self, ConfigError> {
        Ok(Self::from_controller(PidController::new(config)?))
    }

    pub const fn from_controller(controller: PidController) -> Self {
        Self {
            inner: Mutex::new(RefCell::new(controller)),
        }
    }

    /// Run `f` with exclusive access to the controller
    pub fn with<R>(&self, f: impl FnOnce(&mut PidController) -> R) -> R {
        self.inner.lock(|cell| f(&mut cell.borrow_mut()))
    }

    pub fn compute(&self, measurement: f32) -> f32 {
        self.with(|pid| pid.compute(measurement))
    }

    pub fn compute_terms(&self, measurement: f32) -> PidTerms {
        self.with(|pid| pid.compute_terms(measurement))
    }

    pub fn update_parameters(&self, update: ParameterUpdate) {
        self.with(|pid| pid.update_parameters(update))
    }

    pub fn apply_gains(&self, gains: Gains) {
        self.with(|pid| pid.apply_gains(gains))
    }

    pub fn reset(&self) {
        self.with(|pid| pid.reset())
    }

    pub fn gains(&self) -> Gains {
        self.with(|pid| pid.gains())
    }

    pub fn output_limits(&self) -> OutputLimits {
        self.with(|pid| pid.output_limits())
    }

    pub fn last_output(&self) -> f32 {
        self.with(|pid| pid.last_output())
    }

    pub fn into_inner(self) -> PidController {
        self.inner.into_inner().into_inner()
    }
}
