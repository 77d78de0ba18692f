//! Responsible for behaviour related to logging statistics with a specific pre-fix and closing
//! lines.

pub mod statistic_logger {
    use std::fmt::Display;
    use std::sync::OnceLock;

    static STATISTIC_PREFIX: OnceLock<&str> = OnceLock::new();
    static AFTER_STATISTICS: OnceLock<Option<&str>> = OnceLock::new();

    /// Configures the statistic logger to use a certain prefix and (an optional) closing line
    /// which can be printed after all of the statistics have been logged.
    pub fn configure(prefix: &'static str, after: Option<&'static str>) {
        let _ = STATISTIC_PREFIX.get_or_init(|| prefix);
        let _ = AFTER_STATISTICS.get_or_init(|| after);
    }

    /// Logs the provided statistic with name `name` and value `value` in the format
    /// `STATISTIC_PREFIX NAME=VALUE`.
    pub fn log_statistic(name: impl Display, value: impl Display) {
        println!(
            "{} {name}={value}",
            STATISTIC_PREFIX.get().copied().unwrap_or("%%%mzn-stat:")
        )
    }

    /// Logs the postfix of the statistics (if it has been set).
    pub fn log_statistic_postfix() {
        if let Some(Some(post_fix)) = AFTER_STATISTICS.get() {
            println!("{post_fix}")
        }
    }
}
