//! Agent configuration, parsed from the `-agentpath` option string.
//!
//! ```text
//! java -agentpath:libjvmkill.so=time=10,count=2,printHeapHistogram=1 MyApp
//! ```
//!
//! | key | default | meaning |
//! |-----|---------|---------|
//! | `time` | 1 | window length in seconds, at least 1 |
//! | `count` | 0 | events tolerated inside the window, 0 kills on the first |
//! | `printHeapHistogram` | 0 | print a live-object histogram |
//! | `heapHistogramMaxEntries` | 100 | histogram rows, 0 for all |
//! | `printMemoryUsage` | 1 | print heap, non-heap and pool usage |
//! | `printThreadDump` | 0 | SIGQUIT the VM for a thread dump |
//! | `heapDumpPath` | unset | strftime template for an `.hprof` dump |
//! | `signal` | `SIGKILL` | signal that terminates the process |
//!
//! An empty value (`count=`) keeps the default. Unknown keys are logged and
//! ignored.

use std::path::PathBuf;
use std::str::FromStr;

use nix::sys::signal::Signal;
use tracing::warn;

use crate::error::ConfigError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Configuration {
    /// Window length in seconds.
    pub time_threshold: u64,
    /// Number of events tolerated inside the window.
    pub count_threshold: usize,
    pub print_heap_histogram: bool,
    /// 0 means unlimited.
    pub heap_histogram_max_entries: usize,
    pub print_memory_usage: bool,
    pub print_thread_dump: bool,
    pub heap_dump_path: Option<PathBuf>,
    pub signal: Signal,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            time_threshold: 1,
            count_threshold: 0,
            print_heap_histogram: false,
            heap_histogram_max_entries: 100,
            print_memory_usage: true,
            print_thread_dump: false,
            heap_dump_path: None,
            signal: Signal::SIGKILL,
        }
    }
}

impl Configuration {
    pub fn parse(options: &str) -> Result<Self, ConfigError> {
        let mut config = Configuration::default();
        let defaults = Configuration::default();

        for option in options.split(',') {
            let option = option.trim();
            if option.is_empty() {
                continue;
            }

            let (key, value) = option
                .split_once('=')
                .map(|(k, v)| (k.trim(), v.trim()))
                .ok_or_else(|| ConfigError::Malformed(option.to_string()))?;

            if key.is_empty() {
                return Err(ConfigError::Malformed(option.to_string()));
            }

            match key {
                "time" => {
                    config.time_threshold = match value {
                        "" => defaults.time_threshold,
                        v => parse_number::<u64>(key, v)?,
                    };
                    if config.time_threshold == 0 {
                        return Err(invalid(key, value, "must be at least 1 second"));
                    }
                }
                "count" => {
                    config.count_threshold = match value {
                        "" => defaults.count_threshold,
                        v => parse_number(key, v)?,
                    };
                }
                "printHeapHistogram" => {
                    config.print_heap_histogram = match value {
                        "" => defaults.print_heap_histogram,
                        v => parse_flag(key, v)?,
                    };
                }
                "heapHistogramMaxEntries" => {
                    config.heap_histogram_max_entries = match value {
                        "" => defaults.heap_histogram_max_entries,
                        v => parse_number(key, v)?,
                    };
                }
                "printMemoryUsage" => {
                    config.print_memory_usage = match value {
                        "" => defaults.print_memory_usage,
                        v => parse_flag(key, v)?,
                    };
                }
                "printThreadDump" => {
                    config.print_thread_dump = match value {
                        "" => defaults.print_thread_dump,
                        v => parse_flag(key, v)?,
                    };
                }
                "heapDumpPath" => {
                    config.heap_dump_path = match value {
                        "" => defaults.heap_dump_path.clone(),
                        v => Some(PathBuf::from(v)),
                    };
                }
                "signal" => {
                    config.signal = match value {
                        "" => defaults.signal,
                        v => parse_signal(key, v)?,
                    };
                }
                unknown => {
                    warn!(option = unknown, "ignoring unknown jvmkill option");
                }
            }
        }

        Ok(config)
    }
}

fn invalid(key: &str, value: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
        reason: reason.into(),
    }
}

fn parse_number<T>(key: &str, value: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value.parse::<T>().map_err(|e| invalid(key, value, e.to_string()))
}

fn parse_flag(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value {
        "0" => Ok(false),
        "1" => Ok(true),
        _ => Err(invalid(key, value, "expected 0 or 1")),
    }
}

fn parse_signal(key: &str, value: &str) -> Result<Signal, ConfigError> {
    if let Ok(number) = value.parse::<i32>() {
        return Signal::try_from(number).map_err(|e| invalid(key, value, e.to_string()));
    }

    let name = value.to_ascii_uppercase();
    let name = if name.starts_with("SIG") { name } else { format!("SIG{}", name) };
    Signal::from_str(&name).map_err(|_| invalid(key, value, "unknown signal name"))
}
