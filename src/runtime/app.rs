use std::time::Duration;

use anyhow::Result;

use super::Context;
use crate::host::Event;

/// Application hooks driven by the [`Supervisor`](super::Supervisor).
///
/// Every hook runs through the trap: an error or panic faults the session
/// instead of ending the loop. All hooks are optional.
pub trait App {
    /// Startup. Also the default [`reset`](App::reset).
    fn load(&mut self, _ctx: &mut Context<'_>) -> Result<()> {
        Ok(())
    }

    /// Per-tick update, skipped while faulted.
    fn update(&mut self, _ctx: &mut Context<'_>, _dt: Duration) -> Result<()> {
        Ok(())
    }

    /// Per-tick draw, replaced by the fault message while faulted.
    fn draw(&mut self, _ctx: &mut Context<'_>) -> Result<()> {
        Ok(())
    }

    /// Every host event, including the reload key.
    fn event(&mut self, _ctx: &mut Context<'_>, _event: &Event) -> Result<()> {
        Ok(())
    }

    /// Full reset after a reload (with `reset_on_reload`) or on the reload key.
    fn reset(&mut self, ctx: &mut Context<'_>) -> Result<()> {
        self.load(ctx)
    }

    /// Whether [`live_reload`](App::live_reload) should run after reloads.
    fn has_live_reload(&self) -> bool {
        false
    }

    /// Runs after a successful reload when no full reset is requested.
    /// The place to re-fetch entries cached from [`Modules`](crate::unit::Modules).
    fn live_reload(&mut self, _ctx: &mut Context<'_>) -> Result<()> {
        Ok(())
    }

    /// Quit request. `Ok(true)` keeps the loop running.
    fn quit(&mut self, _ctx: &mut Context<'_>) -> Result<bool> {
        Ok(false)
    }

    /// Last hook before [`run`](super::Supervisor::run) returns.
    fn teardown(&mut self, _ctx: &mut Context<'_>) -> Result<()> {
        Ok(())
    }
}
