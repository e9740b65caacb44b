/*
 *  context.rs
 *
 *  trixel - every frame counts
 *  (c) 2025-26
 *
 *  Shared application context handed to route handlers
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

use crate::crashlog::CrashLogger;
use crate::display::DisplayManager;

/// Container for shared application resources.
///
/// Built once at startup and owned by the supervisor task, which lends it
/// to one handler at a time. No handler reaches these through globals, and
/// nothing here needs a lock: exactly one request is in flight.
pub struct AppContext {
    /// The panel and its single resident frame
    pub display: DisplayManager,

    /// Shared HTTP client for URL-based fetches
    pub http: reqwest::Client,

    /// Tiered-durability event log and boot counter
    pub crashlog: CrashLogger,
}

impl AppContext {
    pub fn new(display: DisplayManager, http: reqwest::Client, crashlog: CrashLogger) -> Self {
        Self {
            display,
            http,
            crashlog,
        }
    }
}
