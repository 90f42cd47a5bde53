//! Diagnostic output shared by the driver and the bridge.
//!
//! `rttdebug` sends lines over RTT, `log` hands them to the `log` facade.
//! With neither feature enabled the arguments are only type-checked.

macro_rules! diag {
    ($lvl:ident, $($arg:tt)+) => {{
        #[cfg(feature = "rttdebug")]
        panic_rtt_core::rprintln!($($arg)+);
        #[cfg(feature = "log")]
        log::log!(log::Level::$lvl, $($arg)+);
        #[cfg(not(any(feature = "rttdebug", feature = "log")))]
        {
            let _ = format_args!($($arg)+);
        }
    }};
}
