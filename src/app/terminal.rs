use dirgrab_core::TerminalProgress;

pub(crate) fn no_color_env_requested() -> bool {
    std::env::var_os("NO_COLOR").is_some_and(|value| !value.is_empty())
}

pub(crate) fn is_dumb_terminal() -> bool {
    std::env::var("TERM")
        .map(|value| value.eq_ignore_ascii_case("dumb"))
        .unwrap_or(false)
}

pub(crate) fn should_disable_color(
    no_color_flag: bool,
    no_color_env: bool,
    dumb_terminal: bool,
) -> bool {
    no_color_flag || no_color_env || dumb_terminal
}

pub(crate) fn is_no_color_requested(no_color_flag: bool) -> bool {
    should_disable_color(no_color_flag, no_color_env_requested(), is_dumb_terminal())
}

pub(crate) fn should_use_progress_bars(
    stderr_is_terminal: bool,
    quiet: bool,
    disabled: bool,
    dumb_terminal: bool,
) -> bool {
    stderr_is_terminal && !quiet && !disabled && !dumb_terminal
}

/// Maps `-q`/`-v` to a filter used when `RUST_LOG` is unset.
pub(crate) fn default_log_level(quiet: bool, verbose: u8) -> &'static str {
    if quiet {
        return "error";
    }
    match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    }
}

/// Installs the global subscriber; logs go above the bars when `progress` is set.
pub(crate) fn init_tracing(default_level: &str, no_color: bool, progress: Option<&TerminalProgress>) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));
    let builder = tracing_subscriber::fmt()
        .with_ansi(!no_color)
        .with_env_filter(filter);
    let _ = match progress {
        Some(progress) => builder.with_writer(progress.log_writer()).try_init(),
        None => builder.with_writer(std::io::stderr).try_init(),
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_disable_color_any_source() {
        assert!(!should_disable_color(false, false, false));
        assert!(should_disable_color(true, false, false));
        assert!(should_disable_color(false, true, false));
        assert!(should_disable_color(false, false, true));
    }

    #[test]
    fn test_progress_bars_need_interactive_stderr() {
        assert!(should_use_progress_bars(true, false, false, false));
        assert!(!should_use_progress_bars(false, false, false, false));
        assert!(!should_use_progress_bars(true, true, false, false));
        assert!(!should_use_progress_bars(true, false, true, false));
        assert!(!should_use_progress_bars(true, false, false, true));
    }

    #[test]
    fn test_default_log_level() {
        assert_eq!(default_log_level(false, 0), "info");
        assert_eq!(default_log_level(false, 1), "debug");
        assert_eq!(default_log_level(false, 5), "trace");
        assert_eq!(default_log_level(true, 2), "error");
    }
}
