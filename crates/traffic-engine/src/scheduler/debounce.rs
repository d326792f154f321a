// Copyright 2025 Chris Custine
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Trailing-edge debounce state.
//!
//! [`Debouncer`] holds no timer of its own. The owner pushes values with the
//! current instant, sleeps until [`Debouncer::deadline`], then calls
//! [`Debouncer::take_ready`].

use std::time::Duration;

use tokio::time::Instant;

/// Value released once its burst has gone quiet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settled<T> {
    /// The last value pushed in the burst.
    pub value: T,
    /// How many pushes the burst collapsed.
    pub burst: usize,
}

#[derive(Debug, Clone)]
pub struct Debouncer<T> {
    quiescence: Duration,
    pending: Option<T>,
    deadline: Option<Instant>,
    burst: usize,
}

impl<T> Debouncer<T> {
    #[must_use]
    pub fn new(quiescence: Duration) -> Self {
        Self {
            quiescence,
            pending: None,
            deadline: None,
            burst: 0,
        }
    }

    #[must_use]
    pub fn quiescence(&self) -> Duration {
        self.quiescence
    }

    /// Replace the pending value and restart the quiet period from `now`.
    pub fn push(&mut self, value: T, now: Instant) {
        self.pending = Some(value);
        self.deadline = Some(now + self.quiescence);
        self.burst += 1;
    }

    /// When the pending value becomes ready. `None` when idle.
    #[must_use]
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Release the pending value if its deadline has passed.
    pub fn take_ready(&mut self, now: Instant) -> Option<Settled<T>> {
        match self.deadline {
            Some(deadline) if deadline <= now => {
                self.deadline = None;
                let burst = std::mem::take(&mut self.burst);
                self.pending.take().map(|value| Settled { value, burst })
            }
            _ => None,
        }
    }

    /// Drop any pending value without releasing it.
    pub fn cancel(&mut self) {
        self.pending = None;
        self.deadline = None;
        self.burst = 0;
    }
}
