//! Scoped step timing.

use std::time::{Duration, Instant};
use tracing::info;

/// Logs `START` when created and `COMPLETE` with the elapsed time when
/// dropped, whichever way the step exits.
pub struct StepTimer {
    label: String,
    start: Instant,
}

impl StepTimer {
    pub fn start(label: impl Into<String>) -> Self {
        let label = label.into();
        info!("START: {}", label);
        Self {
            label,
            start: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

impl Drop for StepTimer {
    fn drop(&mut self) {
        info!(
            elapsed_ms = self.start.elapsed().as_millis() as u64,
            "COMPLETE: {} ({:.2}s)",
            self.label,
            self.start.elapsed().as_secs_f64()
        );
    }
}

/// Render a duration as `1h 2m 3.45s`
pub fn format_duration(duration: Duration) -> String {
    let total = duration.as_secs_f64();
    let hours = (total / 3600.0).floor();
    let minutes = ((total % 3600.0) / 60.0).floor();
    let seconds = total % 60.0;
    format!("{:.0}h {:.0}m {:.2}s", hours, minutes, seconds)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{self, Write};
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    /// Run `f` under a subscriber that records formatted log lines
    fn capture_logs(f: impl FnOnce()) -> String {
        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();
        tracing::subscriber::with_default(subscriber, f);
        let bytes = captured.0.lock().unwrap().clone();
        String::from_utf8(bytes).unwrap()
    }

    #[test]
    fn elapsed_grows() {
        let timer = StepTimer::start("STEP: TEST");
        std::thread::sleep(Duration::from_millis(5));
        assert!(timer.elapsed() >= Duration::from_millis(5));
    }

    #[test]
    fn completion_is_logged_on_early_return() {
        fn failing() -> Result<(), &'static str> {
            let _timer = StepTimer::start("STEP: FAILING");
            Err("boom")
        }

        let logs = capture_logs(|| assert!(failing().is_err()));

        let start = logs.find("START: STEP: FAILING").expect("start logged");
        let complete = logs.find("COMPLETE: STEP: FAILING (").expect("completion logged");
        assert!(start < complete);
    }

    #[test]
    fn formats_hours_minutes_seconds() {
        assert_eq!(format_duration(Duration::from_secs_f64(3723.5)), "1h 2m 3.50s");
        assert_eq!(format_duration(Duration::from_millis(1500)), "0h 0m 1.50s");
    }
}
