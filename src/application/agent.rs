// Agent loop - the process-lifetime driver
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

use crate::application::display_port::{DisplayPort, RefreshMode};
use crate::application::monitor_client::MonitorClient;
use crate::domain::reading::ReadingSet;
use crate::domain::rotation::{RotationState, Transition};
use crate::domain::view::ViewModel;
use crate::infrastructure::renderer::Renderer;

/// Owns the only long-lived mutable state of the process: the last good
/// reading set and the rotation state. One tick = poll, rotate, build view,
/// render, push, sleep. Any single-tick I/O failure is logged and absorbed;
/// the loop itself never exits.
pub struct Agent {
    monitor: Arc<dyn MonitorClient>,
    display: Arc<dyn DisplayPort>,
    renderer: Renderer,
    rotation: RotationState,
    cached: Option<ReadingSet>,
    tick_interval: Duration,
    stale_after: chrono::Duration,
    pushed_once: bool,
}

impl Agent {
    pub fn new(
        monitor: Arc<dyn MonitorClient>,
        display: Arc<dyn DisplayPort>,
        renderer: Renderer,
        rotation: RotationState,
        tick_interval: Duration,
        stale_after: chrono::Duration,
    ) -> Self {
        Self {
            monitor,
            display,
            renderer,
            rotation,
            cached: None,
            tick_interval,
            stale_after,
            pushed_once: false,
        }
    }

    /// Runs until the process is terminated externally.
    pub async fn run(mut self) {
        tracing::info!(
            interval_secs = self.tick_interval.as_secs(),
            "agent loop started"
        );
        loop {
            self.tick().await;
            tokio::time::sleep(self.tick_interval).await;
        }
    }

    /// One full tick. Public for the loop and for tests; holds every
    /// failure-isolation branch in one place.
    pub async fn tick(&mut self) {
        match self.monitor.fetch().await {
            Ok(set) => {
                tracing::debug!(sources = set.source_count(), "poll succeeded");
                self.cached = Some(set);
            }
            Err(e) => {
                // Keep showing the last good readings rather than blanking.
                tracing::warn!("poll failed, reusing cached readings: {e}");
            }
        }

        let source_count = self.cached.as_ref().map_or(0, ReadingSet::source_count);
        let transition = self.rotation.advance(source_count);
        if transition != Transition::None {
            tracing::info!(phase = ?self.rotation.phase(), "view rotated");
        }

        let view = ViewModel::build(
            self.cached.as_ref(),
            &self.rotation,
            Utc::now(),
            self.stale_after,
        );
        let frame = self.renderer.render(&view);

        let mode = if transition == Transition::BackToOverview || !self.pushed_once {
            RefreshMode::Full
        } else {
            RefreshMode::Partial
        };

        match self.display.push(&frame, mode).await {
            Ok(()) => self.pushed_once = true,
            Err(e) => {
                tracing::warn!("display push failed, skipping this tick: {e}");
            }
        }
    }

    #[cfg(test)]
    fn cached(&self) -> Option<&ReadingSet> {
        self.cached.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::display_port::DisplayPushError;
    use crate::application::monitor_client::FetchError;
    use crate::domain::reading::Source;
    use crate::domain::rotation::Dwell;
    use crate::infrastructure::renderer::Frame;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    struct ScriptedMonitor {
        responses: Mutex<VecDeque<Result<ReadingSet, FetchError>>>,
    }

    impl ScriptedMonitor {
        fn new(responses: Vec<Result<ReadingSet, FetchError>>) -> Self {
            Self {
                responses: Mutex::new(responses.into()),
            }
        }
    }

    #[async_trait]
    impl MonitorClient for ScriptedMonitor {
        async fn fetch(&self) -> Result<ReadingSet, FetchError> {
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Err(FetchError::Timeout))
        }
    }

    #[derive(Default)]
    struct RecordingDisplay {
        pushes: Mutex<Vec<(Frame, RefreshMode)>>,
        fail: bool,
    }

    #[async_trait]
    impl DisplayPort for RecordingDisplay {
        async fn push(&self, frame: &Frame, mode: RefreshMode) -> Result<(), DisplayPushError> {
            if self.fail {
                return Err(DisplayPushError::Exit("scripted failure".into()));
            }
            self.pushes.lock().unwrap().push((frame.clone(), mode));
            Ok(())
        }
    }

    fn readings(labels: &[&str]) -> ReadingSet {
        ReadingSet::new(
            labels
                .iter()
                .map(|l| Source::new((*l).into(), (*l).into(), 100.0, vec![]))
                .collect(),
            Utc::now(),
        )
    }

    fn agent(
        monitor: Arc<dyn MonitorClient>,
        display: Arc<dyn DisplayPort>,
        dwell: Dwell,
    ) -> Agent {
        Agent::new(
            monitor,
            display,
            Renderer::new(200, 150).unwrap(),
            RotationState::new(dwell),
            Duration::from_secs(15),
            chrono::Duration::seconds(300),
        )
    }

    #[tokio::test]
    async fn fetch_failure_leaves_cache_untouched() {
        let set = readings(&["Main", "Solar"]);
        let monitor = Arc::new(ScriptedMonitor::new(vec![
            Ok(set.clone()),
            Err(FetchError::Timeout),
        ]));
        let display = Arc::new(RecordingDisplay::default());
        let mut agent = agent(monitor, display, Dwell::new(3, 2));

        agent.tick().await;
        assert_eq!(agent.cached(), Some(&set));

        agent.tick().await;
        assert_eq!(agent.cached(), Some(&set), "failed poll must not evict cache");
    }

    #[tokio::test]
    async fn cold_start_renders_waiting_then_overview() {
        let monitor = Arc::new(ScriptedMonitor::new(vec![
            Err(FetchError::Http("connection refused".into())),
            Ok(readings(&["Main"])),
        ]));
        let display = Arc::new(RecordingDisplay::default());
        let mut agent = agent(monitor, display.clone(), Dwell::new(3, 2));

        agent.tick().await;
        agent.tick().await;

        let renderer = Renderer::new(200, 150).unwrap();
        let waiting = renderer.render(&ViewModel::WaitingForData);

        let pushes = display.pushes.lock().unwrap();
        assert_eq!(pushes.len(), 2);
        assert_eq!(pushes[0].0, waiting, "first tick shows the waiting view");
        assert_ne!(pushes[1].0, waiting, "second tick shows fetched readings");
    }

    #[tokio::test]
    async fn full_refresh_on_first_frame_and_overview_return() {
        let set = readings(&["Main"]);
        let monitor = Arc::new(ScriptedMonitor::new(
            (0..4).map(|_| Ok(set.clone())).collect(),
        ));
        let display = Arc::new(RecordingDisplay::default());
        let mut agent = agent(monitor, display.clone(), Dwell::new(1, 1));

        for _ in 0..4 {
            agent.tick().await;
        }

        let modes: Vec<RefreshMode> = display
            .pushes
            .lock()
            .unwrap()
            .iter()
            .map(|(_, m)| *m)
            .collect();
        // Overview (first frame), source 0, back to overview, source 0.
        assert_eq!(
            modes,
            vec![
                RefreshMode::Full,
                RefreshMode::Partial,
                RefreshMode::Full,
                RefreshMode::Partial,
            ]
        );
    }

    #[tokio::test]
    async fn display_failure_does_not_stop_the_loop() {
        let set = readings(&["Main"]);
        let monitor = Arc::new(ScriptedMonitor::new(vec![Ok(set.clone()), Ok(set)]));
        let display = Arc::new(RecordingDisplay {
            pushes: Mutex::new(Vec::new()),
            fail: true,
        });
        let mut agent = agent(monitor, display, Dwell::new(3, 2));

        agent.tick().await;
        agent.tick().await;
        // Cache still advanced despite every push failing.
        assert!(agent.cached().is_some());
    }
}
