// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimerSpec {
    /// `OnUnitActiveSec=`/`OnBootSec=`-style monotonic offset from some epoch.
    Monotonic(Duration),
    /// `OnCalendar=`-style realtime expression; the engine's scheduler is
    /// responsible for parsing and advancing this, this crate only
    /// carries the source text.
    Calendar(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerSettings {
    pub specs: Vec<TimerSpec>,
    /// Unit this timer activates; defaults to the same-named `.service`.
    pub paired_unit: Option<String>,
    pub persistent: bool,
}

impl Default for TimerSettings {
    fn default() -> Self {
        Self { specs: Vec::new(), paired_unit: None, persistent: false }
    }
}
