use embassy_time::Duration;

/// Low time of `RESET_N` pin to trigger module reset (reboot)
pub fn reset_time() -> Duration {
    Duration::from_millis(100)
}

/// Time to wait for module to boot after power is applied or reset released
pub fn boot_time() -> Duration {
    Duration::from_millis(2500)
}

/// How long a get-single request waits for a terminal token once its single
/// answer line has been captured
pub fn single_answer_linger() -> Duration {
    Duration::from_millis(300)
}

/// Cadence of the usage/consumption accounting tick
pub fn usage_report_period() -> Duration {
    Duration::from_secs(1)
}

/// Default deadline for free-form user commands
pub fn user_command_timeout() -> Duration {
    Duration::from_secs(5)
}
