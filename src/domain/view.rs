// View model - pure transformation from readings + rotation state to a layout
use chrono::{DateTime, Duration, Utc};

use super::reading::{PowerPoint, ReadingSet};
use super::rotation::{RotationState, ViewPhase};

/// One line of the overview.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceRow {
    pub label: String,
    pub watts: f64,
}

/// A rendering-ready layout. Built fresh each tick, discarded after render.
#[derive(Debug, Clone, PartialEq)]
pub enum ViewModel {
    /// Cold start before the first successful poll.
    WaitingForData,
    /// Every source with its current value, in monitor order.
    AllSources {
        rows: Vec<SourceRow>,
        captured_at: DateTime<Utc>,
        stale: bool,
    },
    /// One source, emphasized, with its rolling history.
    SingleSource {
        label: String,
        watts: f64,
        history: Vec<PowerPoint>,
        /// 1-based position within the rotation, for the "n of m" context line.
        position: usize,
        total: usize,
        captured_at: DateTime<Utc>,
        stale: bool,
    },
}

impl ViewModel {
    /// Builds the layout for the current tick. Deterministic and total: any
    /// (reading set, rotation state) pair yields a layout, never a panic.
    pub fn build(
        reading: Option<&ReadingSet>,
        rotation: &RotationState,
        now: DateTime<Utc>,
        stale_after: Duration,
    ) -> ViewModel {
        let Some(set) = reading else {
            return ViewModel::WaitingForData;
        };

        let stale = now.signed_duration_since(set.fetched_at) > stale_after;

        match rotation.phase() {
            ViewPhase::SingleSource(index) if !set.sources.is_empty() => {
                // The scheduler keeps the index in range; wrap anyway so a
                // mismatched pair can never panic here.
                let index = index % set.sources.len();
                let source = &set.sources[index];
                ViewModel::SingleSource {
                    label: source.label.clone(),
                    watts: source.watts,
                    history: source.history.clone(),
                    position: index + 1,
                    total: set.sources.len(),
                    captured_at: set.fetched_at,
                    stale,
                }
            }
            _ => ViewModel::AllSources {
                rows: set
                    .sources
                    .iter()
                    .map(|s| SourceRow {
                        label: s.label.clone(),
                        watts: s.watts,
                    })
                    .collect(),
                captured_at: set.fetched_at,
                stale,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::reading::Source;
    use crate::domain::rotation::Dwell;
    use chrono::TimeZone;

    fn sample_set() -> ReadingSet {
        let fetched = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        ReadingSet::new(
            vec![
                Source::new(
                    "Main".into(),
                    "Main".into(),
                    1250.0,
                    vec![PowerPoint::new(1714560000, 1100.0), PowerPoint::new(1714560300, 1250.0)],
                ),
                Source::new("Solar".into(), "Solar".into(), -430.5, vec![]),
            ],
            fetched,
        )
    }

    fn at_phase(phase_ticks: usize, count: usize) -> RotationState {
        let mut state = RotationState::new(Dwell::new(1, 1));
        for _ in 0..phase_ticks {
            state.advance(count);
        }
        state
    }

    #[test]
    fn missing_readings_build_the_waiting_view() {
        let rotation = RotationState::new(Dwell::new(3, 2));
        let vm = ViewModel::build(None, &rotation, Utc::now(), Duration::seconds(300));
        assert_eq!(vm, ViewModel::WaitingForData);
    }

    #[test]
    fn overview_lists_sources_in_monitor_order() {
        let set = sample_set();
        let rotation = RotationState::new(Dwell::new(3, 2));
        let vm = ViewModel::build(Some(&set), &rotation, set.fetched_at, Duration::seconds(300));

        match vm {
            ViewModel::AllSources { rows, stale, .. } => {
                assert!(!stale);
                assert_eq!(rows.len(), 2);
                assert_eq!(rows[0].label, "Main");
                assert_eq!(rows[1].label, "Solar");
                assert_eq!(rows[1].watts, -430.5);
            }
            other => panic!("expected overview, got {other:?}"),
        }
    }

    #[test]
    fn single_source_view_carries_position_context() {
        let set = sample_set();
        // Three advances with dwell 1 land on SingleSource(1).
        let rotation = at_phase(3, 2);
        let vm = ViewModel::build(Some(&set), &rotation, set.fetched_at, Duration::seconds(300));

        match vm {
            ViewModel::SingleSource {
                label,
                position,
                total,
                ..
            } => {
                assert_eq!(label, "Solar");
                assert_eq!(position, 2);
                assert_eq!(total, 2);
            }
            other => panic!("expected single-source view, got {other:?}"),
        }
    }

    #[test]
    fn build_is_deterministic() {
        let set = sample_set();
        let rotation = at_phase(2, 2);
        let now = set.fetched_at;
        let a = ViewModel::build(Some(&set), &rotation, now, Duration::seconds(300));
        let b = ViewModel::build(Some(&set), &rotation, now, Duration::seconds(300));
        assert_eq!(a, b);
    }

    #[test]
    fn old_readings_are_flagged_stale() {
        let set = sample_set();
        let rotation = RotationState::new(Dwell::new(3, 2));
        let now = set.fetched_at + Duration::seconds(301);
        let vm = ViewModel::build(Some(&set), &rotation, now, Duration::seconds(300));

        match vm {
            ViewModel::AllSources { stale, .. } => assert!(stale),
            other => panic!("expected overview, got {other:?}"),
        }
    }

    #[test]
    fn empty_reading_set_falls_back_to_overview() {
        let set = ReadingSet::new(vec![], Utc::now());
        // Rotation believes it is on a single-source view; the set is empty.
        let rotation = at_phase(2, 3);
        let vm = ViewModel::build(Some(&set), &rotation, set.fetched_at, Duration::seconds(300));
        assert!(matches!(vm, ViewModel::AllSources { ref rows, .. } if rows.is_empty()));
    }
}
