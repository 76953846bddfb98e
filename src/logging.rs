
#[cfg(feature = "log-trace")]
macro_rules! trace {
	($($arg:tt)+) => (log::trace!(target: "sockline", $($arg)+))
}

#[cfg(not(feature = "log-trace"))]
macro_rules! trace {
	($($arg:tt)+) => {{
		if false {
			let _ = format_args!($($arg)+);
		}
	}};
}

#[cfg(feature = "log-debug")]
macro_rules! debug {
	($($arg:tt)+) => (log::debug!(target: "sockline", $($arg)+))
}

#[cfg(not(feature = "log-debug"))]
macro_rules! debug {
	($($arg:tt)+) => {{
		if false {
			let _ = format_args!($($arg)+);
		}
	}};
}

#[cfg(feature = "log-warn")]
macro_rules! warn {
	($($arg:tt)+) => (log::warn!(target: "sockline", $($arg)+))
}

#[cfg(not(feature = "log-warn"))]
macro_rules! warn {
	($($arg:tt)+) => {{
		if false {
			let _ = format_args!($($arg)+);
		}
	}};
}
