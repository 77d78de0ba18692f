mod statistic_logging;

pub use statistic_logging::statistic_logger;
