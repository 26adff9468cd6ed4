//! Transient advisory panels with auto-dismiss.
//!
//! Only one advisory is visible per board. Showing a new one hides the
//! current one first and restarts the timer. Panels are keyed by the
//! station that showed them.

use crate::fixed::Ticks;
use crate::host::Host;
use crate::id::StationId;

/// A named panel shown by the display collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Advisory {
    /// Agitation attempted before the batch is full.
    NotEnoughItems,
    /// An item of another colour was offered to a collecting batch.
    ColorMismatch,
    /// Ask the player whether to switch into painting mode.
    ConfirmEnterPaint,
    /// Ask the player whether to leave painting mode.
    ConfirmExitPaint,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ActiveAdvisory {
    station: StationId,
    advisory: Advisory,
    expires_at: Ticks,
}

/// Single-slot advisory display with a fixed visible duration.
#[derive(Debug, Clone)]
pub struct AdvisoryBoard {
    duration: Ticks,
    active: Option<ActiveAdvisory>,
}

impl AdvisoryBoard {
    pub fn new(duration: Ticks) -> Self {
        Self {
            duration,
            active: None,
        }
    }

    /// Show `advisory` on `station`'s panel until `now + duration`. Returns
    /// the advisory that was replaced, if one was visible.
    pub fn show(
        &mut self,
        host: &mut dyn Host,
        station: StationId,
        advisory: Advisory,
        now: Ticks,
    ) -> Option<Advisory> {
        let replaced = self.dismiss(host);
        host.show(station, advisory);
        self.active = Some(ActiveAdvisory {
            station,
            advisory,
            expires_at: now.saturating_add(self.duration),
        });
        replaced
    }

    /// Hide the visible advisory immediately, without waiting for expiry.
    pub fn dismiss(&mut self, host: &mut dyn Host) -> Option<Advisory> {
        let active = self.active.take()?;
        host.hide(active.station, active.advisory);
        Some(active.advisory)
    }

    /// Hide the visible advisory if its time is up. Returns what was hidden.
    pub fn tick(&mut self, host: &mut dyn Host, now: Ticks) -> Option<Advisory> {
        match self.active {
            Some(active) if now >= active.expires_at => self.dismiss(host),
            _ => None,
        }
    }

    pub fn visible(&self) -> Option<Advisory> {
        self.active.map(|a| a.advisory)
    }

    pub fn duration(&self) -> Ticks {
        self.duration
    }
}
