//! Execution trap.
//!
//! Every piece of user behavior (unit execution, asset callbacks, app hooks)
//! runs through [`protect`], so a failure becomes a [`Fault`] value instead
//! of unwinding out of the frame loop.
//!
//! A process-wide panic hook is installed on first use. While a thread is
//! inside `protect` the hook captures a backtrace for the fault report and
//! prints nothing; panics anywhere else go to the previous hook unchanged.

use std::backtrace::Backtrace;
use std::cell::{Cell, RefCell};
use std::panic::{self, AssertUnwindSafe, catch_unwind};
use std::sync::Once;

use crate::fault::Fault;

thread_local! {
    static DEPTH: Cell<usize> = const { Cell::new(0) };
    static PANIC_TRACE: RefCell<Option<Backtrace>> = const { RefCell::new(None) };
}

static HOOK: Once = Once::new();

fn install_hook() {
    HOOK.call_once(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            if DEPTH.get() > 0 {
                PANIC_TRACE.set(Some(Backtrace::force_capture()));
            } else {
                previous(info);
            }
        }));
    });
}

/// Run `action`, turning returned errors and panics into a [`Fault`].
///
/// Panics carry a backtrace. Returned errors carry one only when `anyhow`
/// captured it (`RUST_BACKTRACE` or `RUST_LIB_BACKTRACE`).
pub fn protect<T>(action: impl FnOnce() -> anyhow::Result<T>) -> Result<T, Fault> {
    install_hook();

    DEPTH.set(DEPTH.get() + 1);
    let outcome = catch_unwind(AssertUnwindSafe(action));
    DEPTH.set(DEPTH.get() - 1);

    match outcome {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(err)) => Err(Fault::from_error(&err)),
        Err(payload) => Err(Fault::from_panic(payload, PANIC_TRACE.take())),
    }
}
