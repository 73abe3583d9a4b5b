use std::any::Any;
use std::backtrace::{Backtrace, BacktraceStatus};
use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

static RE_UNIT_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"\[unit "([^"]*)"\]"#).unwrap());

/// `  12: some::function` lines of a rendered backtrace. `at <path>` lines
/// do not match and are dropped.
static RE_FRAME: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\s*\d+:\s+(.+?)\s*$").unwrap());

static RE_SYMBOL_HASH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"::h[0-9a-f]{16}$").unwrap());

/// Innermost frames that only build the error or run the panic machinery.
static RE_PRELUDE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"^(std::backtrace|std::panicking|core::panicking|std::sys::|std::rt::",
        r"|rust_begin_unwind|__rustc::|<alloc::boxed::Box<.*> as core::ops::function::Fn",
        r"|anyhow::|<.* as anyhow::|hotloop::trap::(install_hook|protect))",
    ))
    .unwrap()
});

/// First frame belonging to the trap; it and everything outside it is cut.
static RE_TRAP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"catch_unwind|AssertUnwindSafe|__rust_try|hotloop::runtime::Supervisor::|hotloop::trap::protect")
        .unwrap()
});

/// A failure captured by [`protect`](crate::trap::protect).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fault {
    /// Error text including the full cause chain.
    pub message: String,
    /// Call-context lines, innermost first. Empty when no backtrace was captured.
    pub trace: Vec<String>,
}

impl Fault {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: sanitize(&message.into()),
            trace: Vec::new(),
        }
    }

    pub fn from_error(err: &anyhow::Error) -> Self {
        Self {
            message: sanitize(&format!("{err:#}")),
            trace: frames(err.backtrace()),
        }
    }

    pub fn from_panic(payload: Box<dyn Any + Send>, backtrace: Option<Backtrace>) -> Self {
        let text = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_owned()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "unknown panic payload".to_owned()
        };
        Self {
            message: sanitize(&format!("panicked: {text}")),
            trace: backtrace.as_ref().map(frames).unwrap_or_default(),
        }
    }

    /// Full report: message followed by the trace, if any.
    pub fn report(&self) -> String {
        if self.trace.is_empty() {
            return self.message.clone();
        }
        let mut report = format!("{}\nstack traceback:", self.message);
        for frame in &self.trace {
            report.push_str("\n\t");
            report.push_str(frame);
        }
        report
    }
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.report())
    }
}

fn frames(backtrace: &Backtrace) -> Vec<String> {
    match backtrace.status() {
        BacktraceStatus::Captured => trim_trace(&backtrace.to_string()),
        _ => Vec::new(),
    }
}

/// Function names between the failure site and the trap, innermost first.
fn trim_trace(rendered: &str) -> Vec<String> {
    rendered
        .lines()
        .filter_map(|line| RE_FRAME.captures(line))
        .map(|caps| RE_SYMBOL_HASH.replace(&caps[1], "").into_owned())
        .skip_while(|frame| RE_PRELUDE.is_match(frame))
        .take_while(|frame| !RE_TRAP.is_match(frame))
        .map(|frame| sanitize(&frame))
        .collect()
}

/// Rewrite `[unit "name"]` markers to the bare unit name.
pub fn sanitize(text: &str) -> String {
    RE_UNIT_MARKER.replace_all(text, "$1").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::unit::unit_marker;
    use anyhow::{Context, anyhow};

    #[test]
    fn test_sanitize_markers() {
        let text = format!("{}: unexpected `}}`", unit_marker("levels/one.src"));
        assert_eq!(sanitize(&text), "levels/one.src: unexpected `}`");
        assert_eq!(sanitize("no markers here"), "no markers here");
    }

    #[test]
    fn test_from_error_keeps_chain() {
        let err = Err::<(), _>(anyhow!("line 3: bad token"))
            .context(unit_marker("a.src"))
            .unwrap_err();
        let fault = Fault::from_error(&err);
        assert_eq!(fault.message, "a.src: line 3: bad token");
        assert!(fault.report().starts_with("a.src: line 3: bad token"));
    }

    #[test]
    fn test_from_panic_payloads() {
        let fault = Fault::from_panic(Box::new("index out of bounds"), None);
        assert_eq!(fault.message, "panicked: index out of bounds");
        assert!(fault.trace.is_empty());

        let fault = Fault::from_panic(Box::new(String::from("boom")), None);
        assert_eq!(fault.message, "panicked: boom");

        let fault = Fault::from_panic(Box::new(42_u8), None);
        assert!(fault.message.contains("unknown"));
    }

    #[test]
    fn test_report_with_trace() {
        let fault = Fault {
            message: "boom".into(),
            trace: vec!["game::update".into(), "game::tick".into()],
        };
        assert_eq!(
            fault.report(),
            "boom\nstack traceback:\n\tgame::update\n\tgame::tick"
        );
        assert_eq!(fault.to_string(), fault.report());
    }

    const ERROR_TRACE: &str = "   0: anyhow::error::<impl anyhow::Error>::msg
             at /cargo/registry/src/anyhow-1.0.98/src/error.rs:83:36
   1: anyhow::__private::format_err
             at /cargo/registry/src/anyhow-1.0.98/src/lib.rs:689:13
   2: game::player::update
             at ./src/player.rs:10:5
   3: <game::Game as hotloop::runtime::app::App>::update
             at ./src/main.rs:40:9
   4: hotloop::runtime::Supervisor::tick::{{closure}}
             at ./src/runtime/mod.rs:290:56
   5: hotloop::runtime::Supervisor::hook::{{closure}}
   6: <core::panic::unwind_safe::AssertUnwindSafe<F> as core::ops::function::FnOnce<()>>::call_once
   7: std::panicking::catch_unwind::do_call
   8: __rust_try
   9: std::panic::catch_unwind
  10: hotloop::trap::protect
  11: game::main";

    const PANIC_TRACE: &str = "   0: std::backtrace::Backtrace::force_capture
   1: hotloop::trap::install_hook::{{closure}}::{{closure}}
   2: <alloc::boxed::Box<F,A> as core::ops::function::Fn<Args>>::call
   3: std::panicking::rust_panic_with_hook
   4: std::panicking::begin_panic_handler::{{closure}}
   5: std::sys::backtrace::__rust_end_short_backtrace
   6: __rustc::rust_begin_unwind
   7: core::panicking::panic_fmt
   8: game::level::load::h1a2b3c4d5e6f7a8b
             at ./src/level.rs:3:5
   9: game::level::[unit \"levels/one.src\"]::run
  10: hotloop::runtime::Supervisor::load_unit::{{closure}}
  11: std::panicking::catch_unwind::do_call";

    #[test]
    fn test_error_trace_drops_constructors_and_trap() {
        assert_eq!(
            trim_trace(ERROR_TRACE),
            vec![
                "game::player::update",
                "<game::Game as hotloop::runtime::app::App>::update",
            ]
        );
    }

    #[test]
    fn test_panic_trace_drops_hook_frames() {
        assert_eq!(
            trim_trace(PANIC_TRACE),
            vec!["game::level::load", "game::level::levels/one.src::run"]
        );
    }

    #[test]
    fn test_unrendered_backtrace_has_no_trace() {
        assert!(frames(&Backtrace::disabled()).is_empty());
        assert!(trim_trace("").is_empty());
    }
}
