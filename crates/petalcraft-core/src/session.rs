//! Crafting/painting mode, owned by the workshop.
//!
//! The paint area counts players inside it. Walking in while crafting asks
//! whether to start painting; leaving it entirely while painting asks
//! whether to stop. The prompt stays up until confirmed or cancelled.

use crate::advisory::Advisory;
use crate::event::{CraftEvent, EventBus};
use crate::fixed::Ticks;
use crate::host::Host;
use crate::id::StationId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, serde::Serialize, serde::Deserialize)]
pub enum SessionMode {
    #[default]
    Crafting,
    Painting,
}

#[derive(Debug, Clone, Default)]
pub struct Session {
    mode: SessionMode,
    presence: u32,
    prompt: Option<(StationId, Advisory)>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mode(&self) -> SessionMode {
        self.mode
    }

    pub fn presence(&self) -> u32 {
        self.presence
    }

    pub fn prompt(&self) -> Option<Advisory> {
        self.prompt.map(|(_, a)| a)
    }

    pub fn player_entered(&mut self, host: &mut dyn Host, events: &mut EventBus, area: StationId, tick: Ticks) {
        self.presence += 1;
        if self.presence == 1 && self.mode == SessionMode::Crafting {
            self.show_prompt(host, events, area, Advisory::ConfirmEnterPaint, tick);
        }
    }

    pub fn player_exited(&mut self, host: &mut dyn Host, events: &mut EventBus, area: StationId, tick: Ticks) {
        if self.presence == 0 {
            tracing::warn!(station = ?area, "player exit without matching enter");
            return;
        }
        self.presence -= 1;
        if self.presence > 0 {
            return;
        }
        match self.mode {
            SessionMode::Painting => {
                self.show_prompt(host, events, area, Advisory::ConfirmExitPaint, tick);
            }
            SessionMode::Crafting => {
                if self.prompt() == Some(Advisory::ConfirmEnterPaint) {
                    self.dismiss(host, events, tick);
                }
            }
        }
    }

    /// Accept the visible prompt. Returns the new mode if it changed.
    pub fn confirm(&mut self, host: &mut dyn Host, events: &mut EventBus, tick: Ticks) -> Option<SessionMode> {
        let advisory = self.dismiss(host, events, tick)?;
        let mode = match advisory {
            Advisory::ConfirmEnterPaint => SessionMode::Painting,
            Advisory::ConfirmExitPaint => SessionMode::Crafting,
            _ => return None,
        };
        self.mode = mode;
        tracing::info!(?mode, "session mode changed");
        events.emit(CraftEvent::SessionModeChanged { mode, tick });
        Some(mode)
    }

    /// Close the visible prompt without changing mode.
    pub fn cancel(&mut self, host: &mut dyn Host, events: &mut EventBus, tick: Ticks) -> Option<Advisory> {
        self.dismiss(host, events, tick)
    }

    fn show_prompt(
        &mut self,
        host: &mut dyn Host,
        events: &mut EventBus,
        area: StationId,
        advisory: Advisory,
        tick: Ticks,
    ) {
        self.dismiss(host, events, tick);
        host.show(area, advisory);
        self.prompt = Some((area, advisory));
        events.emit(CraftEvent::AdvisoryShown {
            station: Some(area),
            advisory,
            tick,
        });
    }

    fn dismiss(&mut self, host: &mut dyn Host, events: &mut EventBus, tick: Ticks) -> Option<Advisory> {
        let (area, advisory) = self.prompt.take()?;
        host.hide(area, advisory);
        events.emit(CraftEvent::AdvisoryDismissed {
            station: Some(area),
            advisory,
            tick,
        });
        Some(advisory)
    }
}
