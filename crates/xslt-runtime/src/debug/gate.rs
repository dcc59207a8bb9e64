//! One-shot pause gate.

use std::sync::{Condvar, Mutex};

/// Single-use gate blocking the transform worker during a pause. A fresh
/// gate is created for every pause; any debug command releases it exactly
/// once, and releasing an already-released or abandoned gate is a no-op.
#[derive(Debug, Default)]
pub struct ResumeGate {
    released: Mutex<bool>,
    cvar: Condvar,
}

impl ResumeGate {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Block the calling thread until the gate is released.
    pub fn wait(&self) {
        let mut released = self.released.lock().expect("resume gate poisoned");
        while !*released {
            released = self.cvar.wait(released).expect("resume gate poisoned");
        }
    }

    /// Release the gate. Idempotent.
    pub fn release(&self) {
        let mut released = self.released.lock().expect("resume gate poisoned");
        if !*released {
            *released = true;
            self.cvar.notify_all();
        }
    }

    /// Whether the gate has already been released.
    #[must_use]
    pub fn is_released(&self) -> bool {
        *self.released.lock().expect("resume gate poisoned")
    }
}
