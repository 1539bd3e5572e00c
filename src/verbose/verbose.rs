// src/verbose/verbose.rs
use lazy_static::lazy_static;
use std::collections::HashMap;
use std::fmt;
use std::sync::OnceLock;
use tracing::{debug, info, trace, Level};
use tracing_subscriber::{
    fmt as tracing_fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter,
};

/// Hierarchical logging levels for scheduler debugging.
///
/// Each level includes all lower levels, providing increasingly detailed output.
/// Uses JSON structured logging via the `tracing` crate.
///
/// # Examples
///
/// ```rust
/// use traffic_sched_core::verbose::{VerboseLevel, set_verbose_level};
///
/// // Set logging level
/// set_verbose_level(VerboseLevel::Main);
///
/// // Check current level
/// if VerboseLevel::Main.is_at_least(VerboseLevel::Additional) {
///     println!("Will log additional details");
/// }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum VerboseLevel {
    /// No debug at all
    None = 0,
    /// Major scheduling phases - `info` level
    Main = 1,
    /// Function-level details - `debug` level
    Additional = 2,
    /// Loop iterations and fine operations - `debug` level
    Detailed = 3,
    /// Everything including traces - `trace` level
    All = 4,
}

/// Custom error types for `VerboseLevel`.
#[derive(Debug, Clone)]
pub enum VerboseError {
    /// Indicates that the provided level name is invalid.
    InvalidLevelName(String),
}

impl fmt::Display for VerboseError {
    /// Formats the error message for `VerboseError`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VerboseError::InvalidLevelName(value) => {
                write!(f, "Invalid verbose level name: '{}'", value)
            }
        }
    }
}

impl std::error::Error for VerboseError {}

lazy_static! {
    static ref LEVEL_CONVERTER: HashMap<&'static str, VerboseLevel> = {
        let mut m = HashMap::new();
        m.insert("none", VerboseLevel::None);
        m.insert("main", VerboseLevel::Main);
        m.insert("additional", VerboseLevel::Additional);
        m.insert("detailed", VerboseLevel::Detailed);
        m.insert("all", VerboseLevel::All);
        m
    };
}

impl VerboseLevel {
    /// Parses a verbose level from its lowercase name.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use traffic_sched_core::verbose::VerboseLevel;
    ///
    /// assert_eq!(VerboseLevel::from_name("main").unwrap(), VerboseLevel::Main);
    /// assert!(VerboseLevel::from_name("loud").is_err());
    /// ```
    pub fn from_name(name: &str) -> Result<Self, VerboseError> {
        LEVEL_CONVERTER
            .get(name)
            .copied()
            .ok_or_else(|| VerboseError::InvalidLevelName(name.to_string()))
    }
}

impl fmt::Display for VerboseLevel {
    /// Formats the verbosity level for display.
    ///
    /// Returns a short, lowercase string representation suitable for
    /// logging, debugging, and user interfaces.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use traffic_sched_core::verbose::VerboseLevel;
    ///
    /// assert_eq!(format!("{}", VerboseLevel::None), "none");
    /// assert_eq!(format!("{}", VerboseLevel::Main), "main");
    /// assert_eq!(format!("{}", VerboseLevel::All), "all");
    /// ```
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            VerboseLevel::None => "none",
            VerboseLevel::Main => "main",
            VerboseLevel::Additional => "additional",
            VerboseLevel::Detailed => "detailed",
            VerboseLevel::All => "all",
        };
        write!(f, "{}", s)
    }
}

impl From<VerboseLevel> for Level {
    fn from(level: VerboseLevel) -> Self {
        match level {
            VerboseLevel::None => Level::ERROR,
            VerboseLevel::Main => Level::INFO,
            VerboseLevel::Additional => Level::DEBUG,
            VerboseLevel::Detailed => Level::DEBUG,
            VerboseLevel::All => Level::TRACE,
        }
    }
}

// Event type constants
pub const EVENT_RUN_START: &str = "run_start";
pub const EVENT_RUN_DONE: &str = "run_done";
pub const EVENT_TICK: &str = "tick";
pub const EVENT_DRIVE_PASS: &str = "drive_pass";
pub const EVENT_CROSS_PASS: &str = "cross_pass";
pub const EVENT_CROSS_STEP: &str = "cross_step";
pub const EVENT_STALL_RECOVERY: &str = "stall_recovery";
pub const EVENT_ADMISSION: &str = "admission";
pub const EVENT_ADMIT_VEHICLE: &str = "admit_vehicle";
pub const EVENT_ARRIVAL: &str = "arrival";
pub const EVENT_WEIGHT_UPDATE: &str = "weight_update";
pub const EVENT_PLAN_ROUTE: &str = "plan_route";
pub const EVENT_UNROUTABLE: &str = "unroutable";

// Global verbose level storage
static VERBOSE_LEVEL: OnceLock<VerboseLevel> = OnceLock::new();
static LOGGER_INITIALIZED: OnceLock<bool> = OnceLock::new();

/// Initialize the tracing logger once
pub fn init_logger() {
    if LOGGER_INITIALIZED.set(true).is_ok() {
        tracing_subscriber::registry()
            .with(
                tracing_fmt::layer()
                    .json()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_thread_names(false)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(EnvFilter::from_default_env())
            .init();
    }
}

/// Sets the global verbose level and updates tracing filter
pub fn set_verbose_level(level: VerboseLevel) {
    let _ = VERBOSE_LEVEL.set(level);
    init_logger();
}

/// Gets the current global verbose level
pub fn get_verbose_level() -> VerboseLevel {
    *VERBOSE_LEVEL.get().unwrap_or(&VerboseLevel::None)
}

/// Checks if current global verbose level is at least the specified level
pub fn is_verbose_level(level: VerboseLevel) -> bool {
    get_verbose_level() >= level
}

/// Logs a message if the global verbose level allows it
pub fn verbose_log(level: VerboseLevel, event: &str, message: &str) {
    if !is_verbose_level(level) {
        return;
    }

    match level {
        VerboseLevel::None => {}
        VerboseLevel::Main => {
            info!(event = event, message);
        }
        VerboseLevel::Additional | VerboseLevel::Detailed => {
            debug!(event = event, message);
        }
        VerboseLevel::All => {
            trace!(event = event, message);
        }
    }
}

impl VerboseLevel {
    /// Checks if this level is at least the minimum level
    pub fn is_at_least(self, min_level: VerboseLevel) -> bool {
        self >= min_level
    }
}

// ===== CONVENIENCE MACROS =====

/// Tracing-native macro for major scheduling phases. Corresponds to [`VerboseLevel::Main`].
#[macro_export]
macro_rules! log_main {
    ($event:expr, $msg:literal, $($key:ident = $value:expr),*) => {
        if $crate::verbose::is_verbose_level($crate::verbose::VerboseLevel::Main) {
            tracing::info!(
                event = $event,
                $($key = $value,)*
                $msg
            );
        }
    };
}

/// Logs a debug-level message if the global verbose level is [`VerboseLevel::Additional`] or higher.
///
/// Use for function-level details and intermediate scheduling events.
/// Example: logging a single admission, crossing resolution, or weight refresh.
#[macro_export]
macro_rules! log_additional {
    ($event:expr, $msg:literal, $($key:ident = $value:expr),*) => {
        if $crate::verbose::is_verbose_level($crate::verbose::VerboseLevel::Additional) {
            tracing::debug!(
                event = $event,
                $($key = $value,)*
                $msg
            );
        }
    };
}

/// Logs a debug-level message if the global verbose level is [`VerboseLevel::Detailed`] or higher.
///
/// Use for fine-grained details such as fixed-point iterations.
#[macro_export]
macro_rules! log_detailed {
    ($event:expr, $msg:literal, $($key:ident = $value:expr),*) => {
        if $crate::verbose::is_verbose_level($crate::verbose::VerboseLevel::Detailed) {
            tracing::debug!(
                event = $event,
                $($key = $value,)*
                $msg
            );
        }
    };
}

/// Logs a trace-level message if the global verbose level is [`VerboseLevel::All`].
///
/// Use for the most verbose output, including every vehicle movement.
#[macro_export]
macro_rules! log_all {
    ($event:expr, $msg:literal, $($key:ident = $value:expr),*) => {
        if $crate::verbose::is_verbose_level($crate::verbose::VerboseLevel::All) {
            tracing::trace!(
                event = $event,
                $($key = $value,)*
                $msg
            );
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_ordering() {
        assert!(VerboseLevel::All.is_at_least(VerboseLevel::Main));
        assert!(!VerboseLevel::None.is_at_least(VerboseLevel::Main));
    }

    #[test]
    fn test_level_names_round_trip() {
        for level in [
            VerboseLevel::None,
            VerboseLevel::Main,
            VerboseLevel::Additional,
            VerboseLevel::Detailed,
            VerboseLevel::All,
        ] {
            let name = format!("{}", level);
            assert_eq!(
                level,
                VerboseLevel::from_name(&name).unwrap(),
                "Level '{}' must parse back from its name",
                name
            );
        }
        assert!(VerboseLevel::from_name("loud").is_err());
    }
}
