use std::time::Instant;

/// Logs how long a phase took once dropped.
pub struct PhaseTimer {
    label: &'static str,
    start: Instant,
}

impl PhaseTimer {
    pub fn start(label: &'static str) -> Self {
        Self { label, start: Instant::now() }
    }
}

impl Drop for PhaseTimer {
    fn drop(&mut self) {
        tracing::info!("{} took {:.2} seconds", self.label, self.start.elapsed().as_secs_f64());
    }
}
