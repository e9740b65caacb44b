/*
 *  supervisor.rs
 *
 *  trixel - every frame counts
 *  (c) 2025-26
 *
 *  Top-level service loop: failure counting, recovery, fatal escalation
 *
 *  This program is free software: you can redistribute it and/or modify
 *  it under the terms of the GNU General Public License as published by
 *  the Free Software Foundation, either version 3 of the License, or
 *  (at your option) any later version.
 *
 *  This program is distributed in the hope that it will be useful,
 *  but WITHOUT ANY WARRANTY; without even the implied warranty of
 *  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *  GNU General Public License for more details.
 *
 *  See <http://www.gnu.org/licenses/> to get a copy of the GNU General
 *  Public License.
 *
 */

use log::{info, warn};
use thiserror::Error;

use crate::context::AppContext;
use crate::crashlog::LogLevel;
use crate::display::DisplayError;
use crate::netlink::{LinkError, NetworkLink};
use crate::server::ServiceError;

/// Consecutive failed cycles tolerated before recovery kicks in.
pub const DEFAULT_FAILURE_THRESHOLD: u32 = 3;

/// One unit of request-handling work, as the supervisor sees it.
///
/// The HTTP service implements this over its request channel; tests
/// implement it with scripted outcomes.
pub trait EventService {
    /// Service exactly one pending event to completion.
    fn service_next(
        &mut self,
        ctx: &mut AppContext,
    ) -> impl std::future::Future<Output = Result<(), ServiceError>> + Send;

    /// Tear down and rebuild the front-end. Called only from recovery.
    fn reinitialize(
        &mut self,
    ) -> impl std::future::Future<Output = Result<(), ServiceError>> + Send;
}

/// Recovery itself failed; the process must stop.
#[derive(Debug, Error)]
pub enum RecoveryError {
    #[error("display clear during recovery failed: {0}")]
    Display(#[from] DisplayError),

    #[error("network link restore failed: {0}")]
    Link(#[from] LinkError),

    #[error("front-end reinitialization failed: {0}")]
    Service(#[from] ServiceError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Servicing,
    Recovering,
    Fatal,
}

/// Counts consecutive cycle failures and escalates through
/// `Servicing -> Recovering -> Fatal`.
///
/// Recovery clears the panel, verifies the link, and rebuilds the wire
/// front-end. A failure inside recovery is terminal: the error
/// propagates to the process boundary with no further retry.
pub struct Supervisor {
    consecutive_failures: u32,
    failure_threshold: u32,
    phase: Phase,
}

impl Supervisor {
    pub fn new(failure_threshold: u32) -> Self {
        Self {
            consecutive_failures: 0,
            failure_threshold: failure_threshold.max(1),
            phase: Phase::Servicing,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    /// Drive the service until it shuts down cleanly or recovery fails.
    pub async fn run<S, L>(
        &mut self,
        service: &mut S,
        link: &mut L,
        ctx: &mut AppContext,
    ) -> Result<(), RecoveryError>
    where
        S: EventService,
        L: NetworkLink,
    {
        loop {
            match service.service_next(ctx).await {
                Ok(()) => {
                    self.consecutive_failures = 0;
                }
                Err(ServiceError::Shutdown) => {
                    info!("front-end stopped, supervisor exiting");
                    return Ok(());
                }
                Err(err) => {
                    self.consecutive_failures += 1;
                    ctx.crashlog.log_exception(
                        &err,
                        &format!(
                            "service cycle (failure {} of {})",
                            self.consecutive_failures, self.failure_threshold
                        ),
                    );

                    if self.consecutive_failures >= self.failure_threshold {
                        self.phase = Phase::Recovering;
                        warn!(
                            "{} consecutive failures, starting recovery",
                            self.consecutive_failures
                        );
                        ctx.crashlog.log_event(
                            "Failure threshold reached - reinitializing front-end",
                            LogLevel::Warning,
                        );

                        if let Err(fatal) = self.recover(service, link, ctx).await {
                            self.phase = Phase::Fatal;
                            ctx.crashlog.log_exception(&fatal, "recovery");
                            return Err(fatal);
                        }

                        self.consecutive_failures = 0;
                        self.phase = Phase::Servicing;
                    }
                }
            }
        }
    }

    async fn recover<S, L>(
        &mut self,
        service: &mut S,
        link: &mut L,
        ctx: &mut AppContext,
    ) -> Result<(), RecoveryError>
    where
        S: EventService,
        L: NetworkLink,
    {
        ctx.display.clear()?;
        link.ensure_up()?;
        service.reinitialize().await?;

        // Storage may have come back while we were failing; push any
        // buffered events out now.
        ctx.crashlog.flush_ring();
        ctx.crashlog.log_event(
            "Recovery complete - display cleared, front-end reinitialized",
            LogLevel::Warning,
        );
        Ok(())
    }
}
