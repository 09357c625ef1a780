use indicatif::{ProgressBar, ProgressDrawTarget, ProgressState, ProgressStyle};
use lichem::engine::progress::{Progress, ProgressCallback};
use std::time::Duration;

const SPINNER_TICK_MS: u64 = 80;

/// Renders engine progress events as a spinner per phase and a bar per atom sweep.
#[derive(Clone)]
pub struct ProgressDisplay {
    pb: ProgressBar,
}

impl ProgressDisplay {
    pub fn new() -> Self {
        Self::with_target(ProgressDrawTarget::stderr())
    }

    /// A display that tracks state but never draws, for `--quiet` runs.
    pub fn hidden() -> Self {
        Self::with_target(ProgressDrawTarget::hidden())
    }

    fn with_target(target: ProgressDrawTarget) -> Self {
        let pb = ProgressBar::with_draw_target(Some(0), target)
            .with_style(Self::spinner_style())
            .with_message("Initializing...");
        pb.finish_and_clear();
        Self { pb }
    }

    pub fn callback(&self) -> ProgressCallback<'static> {
        let pb = self.pb.clone();

        Box::new(move |progress: Progress| match progress {
            Progress::PhaseStart { name } => {
                pb.reset();
                pb.set_length(0);
                pb.set_style(Self::spinner_style());
                pb.enable_steady_tick(Duration::from_millis(SPINNER_TICK_MS));
                pb.set_message(name);
            }
            Progress::PhaseFinish => {
                pb.disable_steady_tick();
                pb.finish_with_message("✓ Done");
            }
            Progress::TaskStart { total_steps } => {
                pb.disable_steady_tick();
                pb.reset();
                pb.set_length(total_steps);
                pb.set_style(Self::bar_style());
            }
            Progress::TaskIncrement => pb.inc(1),
            Progress::TaskFinish => {
                if let Some(len) = pb.length() {
                    pb.set_position(len);
                }
                pb.finish();
            }
            Progress::Message(msg) => {
                if pb.is_finished() {
                    pb.set_message(msg);
                } else {
                    pb.println(format!("  {}", msg));
                }
            }
        })
    }

    fn spinner_style() -> ProgressStyle {
        ProgressStyle::with_template("{spinner:.green} {msg}")
            .expect("spinner template is valid")
    }

    fn bar_style() -> ProgressStyle {
        ProgressStyle::with_template("{msg:<16} [{bar:40.cyan/blue}] {pos}/{len} atoms ({eta})")
            .expect("bar template is valid")
            .with_key("eta", |state: &ProgressState, w: &mut dyn std::fmt::Write| {
                let _ = write!(w, "{:.1}s", state.eta().as_secs_f64());
            })
            .progress_chars("##-")
    }
}

impl Default for ProgressDisplay {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn display_starts_finished_and_empty() {
        let display = ProgressDisplay::hidden();
        assert_eq!(display.pb.length(), Some(0));
        assert!(display.pb.is_finished());
    }

    #[test]
    fn electrostatics_phase_drives_bar() {
        let display = ProgressDisplay::hidden();
        let callback = display.callback();

        callback(Progress::PhaseStart {
            name: "Electrostatics",
        });
        assert_eq!(display.pb.message(), "Electrostatics");
        assert!(!display.pb.is_finished());

        callback(Progress::TaskStart { total_steps: 12 });
        assert_eq!(display.pb.length(), Some(12));
        assert_eq!(display.pb.position(), 0);

        callback(Progress::TaskIncrement);
        callback(Progress::TaskIncrement);
        assert_eq!(display.pb.position(), 2);

        callback(Progress::TaskFinish);
        assert!(display.pb.is_finished());
        assert_eq!(display.pb.position(), 12);

        callback(Progress::PhaseFinish);
        assert_eq!(display.pb.message(), "✓ Done");
    }

    #[test]
    fn message_after_finish_becomes_bar_message() {
        let display = ProgressDisplay::hidden();
        let callback = display.callback();
        callback(Progress::Message("3 atoms truncated".to_string()));
        assert_eq!(display.pb.message(), "3 atoms truncated");
    }

    #[test]
    fn callback_can_move_to_another_thread() {
        let display = ProgressDisplay::hidden();
        let callback = display.callback();

        thread::spawn(move || {
            callback(Progress::PhaseStart { name: "Preparation" });
            callback(Progress::PhaseFinish);
        })
        .join()
        .unwrap();

        assert!(display.pb.is_finished());
        assert_eq!(display.pb.message(), "✓ Done");
    }
}
