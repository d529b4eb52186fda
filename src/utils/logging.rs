//! Logging macros gated on a module-level `ENABLE_LOGS` flag.
//!
//! The intake loop and the session writer run for the whole lifetime of the
//! process and log on every event, so each module decides whether it is chatty:
//! ```rust,ignore
//! const ENABLE_LOGS: bool = true;
//!
//! use crate::{log_debug, log_error, log_info, log_warn};
//!
//! log_info!("opened session {}", session_id);
//! ```

/// `log::debug!` when the calling module has `ENABLE_LOGS` set.
#[macro_export]
macro_rules! log_debug {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::debug!($($arg)*);
        }
    };
}

/// `log::info!` when the calling module has `ENABLE_LOGS` set.
#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::info!($($arg)*);
        }
    };
}

/// `log::warn!` when the calling module has `ENABLE_LOGS` set.
#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::warn!($($arg)*);
        }
    };
}

/// Persistence failures and degraded-safety conditions go through here.
/// Unlike the other macros this one ignores `ENABLE_LOGS`: errors are never muted.
#[macro_export]
macro_rules! log_error {
    ($($arg:tt)*) => {{
        log::error!($($arg)*)
    }};
}

#[cfg(test)]
mod tests {
    const ENABLE_LOGS: bool = false;

    fn describe(result: Result<u32, &str>) -> u32 {
        match result {
            Ok(value) => value,
            Err(err) => {
                log_debug!("muted: {err}");
                0
            }
        }
    }

    #[test]
    fn macros_work_in_expression_position() {
        let outcome: Result<(), &str> = Err("disk gone");
        match outcome {
            Ok(()) => log_info!("never"),
            Err(err) => log_error!("write failed: {err}"),
        }
        let _: () = if ENABLE_LOGS { log_warn!("muted") } else { log_error!("always") };
        assert_eq!(describe(Err("x")), 0);
        assert_eq!(describe(Ok(3)), 3);
    }
}
