// src/utils/progress_bars/progress_config.rs - Which progress bars a clustering run draws

use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::env;

/// Run-level bar: one tick per finished group.
pub const RUN_BAR_TEMPLATE: &str =
    "{spinner:.green} [{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}";
/// Group-level bar: query rows evaluated or admission levels walked.
pub const STEP_BAR_TEMPLATE: &str =
    "    {spinner:.cyan} [{elapsed_precise}] {bar:25.green/blue} {pos}/{len} {msg}";
const PROGRESS_CHARS: &str = "█▉▊▋▌▍▎▏  ";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressConfig {
    /// Master switch; off means no bars at all (CI, piped output).
    pub enabled: bool,
    /// One extra bar per group while it is being clustered.
    pub detailed: bool,
    /// Resident memory in the final run message.
    pub show_memory: bool,
}

impl Default for ProgressConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            detailed: true,
            show_memory: true,
        }
    }
}

/// Boolean from the environment; unset or unparsable values keep `default`.
fn env_flag(var: &str, default: bool) -> bool {
    env::var(var)
        .ok()
        .and_then(|raw| raw.trim().to_lowercase().parse().ok())
        .unwrap_or(default)
}

impl ProgressConfig {
    /// Reads `PROGRESS_ENABLED`, `PROGRESS_DETAILED` and `PROGRESS_SHOW_MEMORY`.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            enabled: env_flag("PROGRESS_ENABLED", defaults.enabled),
            detailed: env_flag("PROGRESS_DETAILED", defaults.detailed),
            show_memory: env_flag("PROGRESS_SHOW_MEMORY", defaults.show_memory),
        }
    }

    pub fn create_multi_progress(&self) -> Option<MultiProgress> {
        self.enabled.then(MultiProgress::new)
    }

    pub fn should_show_detailed(&self) -> bool {
        self.enabled && self.detailed
    }

    pub fn should_show_memory(&self) -> bool {
        self.enabled && self.show_memory
    }
}

/// Adds a styled bar to `multi_progress`, or returns None when bars are off.
pub fn add_bar(
    multi_progress: Option<&MultiProgress>,
    len: u64,
    template: &str,
    message: &str,
) -> Option<ProgressBar> {
    let mp = multi_progress?;
    let pb = mp.add(ProgressBar::new(len));
    let style = ProgressStyle::default_bar()
        .template(template)
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars(PROGRESS_CHARS);
    pb.set_style(style);
    pb.set_message(message.to_string());
    Some(pb)
}

/// A `MultiProgress` that never draws, for tests and embedding.
pub fn hidden_multi_progress() -> MultiProgress {
    MultiProgress::with_draw_target(ProgressDrawTarget::hidden())
}
