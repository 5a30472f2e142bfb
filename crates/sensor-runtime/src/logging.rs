/// Centralized logging macros for the sensor link
///
/// These macros provide consistent logging across all actors with:
/// - Debug-only compilation (stripped from release builds, except errors)
/// - Consistent formatting with actor context
///
/// Log debug-level message (only in debug builds)
///
/// # Example
/// ```
/// use sensor_runtime::link_debug;
/// link_debug!("LinkActor: {:?} → {:?}", "Scanning", "DeviceFound");
/// ```
#[macro_export]
macro_rules! link_debug {
    ($($arg:tt)*) => {
        #[cfg(debug_assertions)]
        {
            eprintln!("[DEBUG] {}", format!($($arg)*));
        }
    };
}

/// Log info-level message (only in debug builds)
///
/// Use for important state changes and user-facing events
#[macro_export]
macro_rules! link_info {
    ($($arg:tt)*) => {
        #[cfg(debug_assertions)]
        {
            eprintln!("[INFO] {}", format!($($arg)*));
        }
    };
}

/// Log warning-level message (only in debug builds)
///
/// Use for recoverable errors and unexpected conditions
#[macro_export]
macro_rules! link_warn {
    ($($arg:tt)*) => {
        #[cfg(debug_assertions)]
        {
            eprintln!("[WARN] {}", format!($($arg)*));
        }
    };
}

/// Log error-level message (always compiled, even in release)
///
/// Use for critical errors that should always be visible
#[macro_export]
macro_rules! link_error {
    ($($arg:tt)*) => {
        {
            eprintln!("[ERROR] {}", format!($($arg)*));
        }
    };
}
