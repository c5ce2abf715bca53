pub mod cluster_config;
pub mod env;
pub mod progress_bars;

use sysinfo::{get_current_pid, System};

/// Resident memory of this process in MB, 0 when it cannot be read.
pub fn get_memory_usage() -> u64 {
    let Ok(pid) = get_current_pid() else {
        return 0;
    };
    let mut sys = System::new();
    sys.refresh_process(pid);
    sys.process(pid).map_or(0, |process| process.memory() / (1024 * 1024))
}
