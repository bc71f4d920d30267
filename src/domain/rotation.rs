// View rotation state machine
//
// One advance() per tick. A dwell of N means the view is rendered on N
// consecutive ticks before the rotation moves on. The countdown holds the
// ticks remaining in the current phase after the present one, so a freshly
// entered phase starts at dwell - 1: the transition tick itself is the first
// render of the new view.

/// Which view the display is showing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewPhase {
    /// Overview listing every source.
    AllSources,
    /// One source, emphasized. The index is only meaningful here.
    SingleSource(usize),
}

/// Dwell durations in ticks, per phase. Values come from configuration and
/// must be >= 1.
#[derive(Debug, Clone, Copy)]
pub struct Dwell {
    pub all_sources: u32,
    pub single_source: u32,
}

impl Dwell {
    pub fn new(all_sources: u32, single_source: u32) -> Self {
        Self {
            all_sources: all_sources.max(1),
            single_source: single_source.max(1),
        }
    }
}

/// What a single advance() did, so the caller can pick a refresh mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Countdown still running, same view as the previous tick.
    None,
    /// Moved on to the next single-source view.
    NextSource,
    /// Returned to the overview, either by completing a rotation cycle or by
    /// the defensive reset when the source count shrank under the index.
    BackToOverview,
}

/// Rotation state for the lifetime of the process. Cold start always begins
/// at the overview; nothing is persisted across restarts.
#[derive(Debug, Clone)]
pub struct RotationState {
    phase: ViewPhase,
    ticks_left: u32,
    dwell: Dwell,
}

impl RotationState {
    pub fn new(dwell: Dwell) -> Self {
        Self {
            phase: ViewPhase::AllSources,
            ticks_left: dwell.all_sources,
            dwell,
        }
    }

    pub fn phase(&self) -> ViewPhase {
        self.phase
    }

    /// Advances the rotation by one tick given the source count of the most
    /// recent successful poll. Pure bookkeeping, cannot fail.
    pub fn advance(&mut self, source_count: usize) -> Transition {
        // The monitor may have been reconfigured between polls. An index at
        // or past the new count must never survive into a render.
        if let ViewPhase::SingleSource(i) = self.phase {
            if i >= source_count {
                return self.back_to_overview();
            }
        }

        if self.ticks_left > 0 {
            self.ticks_left -= 1;
            return Transition::None;
        }

        match self.phase {
            ViewPhase::AllSources => {
                if source_count == 0 {
                    // No single-source view is meaningful with zero sources.
                    self.ticks_left = self.dwell.all_sources - 1;
                    Transition::None
                } else {
                    self.enter_source(0)
                }
            }
            ViewPhase::SingleSource(i) => {
                if i + 1 < source_count {
                    self.enter_source(i + 1)
                } else {
                    self.back_to_overview()
                }
            }
        }
    }

    fn enter_source(&mut self, index: usize) -> Transition {
        self.phase = ViewPhase::SingleSource(index);
        self.ticks_left = self.dwell.single_source - 1;
        Transition::NextSource
    }

    fn back_to_overview(&mut self) -> Transition {
        self.phase = ViewPhase::AllSources;
        self.ticks_left = self.dwell.all_sources - 1;
        Transition::BackToOverview
    }
}
