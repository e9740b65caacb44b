/*
 *  routes/crash.rs
 *
 *  trixel - every frame counts
 *  (c) 2025-26
 *
 *  Crash log retrieval, counter status, counter reset
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

use crate::context::AppContext;
use crate::metrics;
use crate::server::{ApiRequest, HandlerFuture, Method, Reply, Router};

pub fn register(router: &mut Router) {
    router.register(Method::Get, "/crash", crash_log_handler);
    router.register(Method::Get, "/crash/counter", crash_counter_handler);
    router.register(Method::Post, "/crash/reset", crash_reset_handler);
}

fn crash_log_handler(ctx: &mut AppContext, request: ApiRequest) -> HandlerFuture<'_> {
    Box::pin(handle_crash_log(ctx, request))
}

fn crash_counter_handler(ctx: &mut AppContext, request: ApiRequest) -> HandlerFuture<'_> {
    Box::pin(handle_crash_counter(ctx, request))
}

fn crash_reset_handler(ctx: &mut AppContext, request: ApiRequest) -> HandlerFuture<'_> {
    Box::pin(handle_crash_reset(ctx, request))
}

/// GET /crash?lines=N&clear=true
async fn handle_crash_log(ctx: &mut AppContext, request: ApiRequest) -> Reply {
    let max_lines = match request.query_param("lines") {
        None => None,
        Some(raw) => match raw.parse::<usize>() {
            Ok(n) => Some(n),
            Err(_) => return Reply::status(400, "Invalid 'lines' parameter"),
        },
    };

    // Best-effort: get buffered events into the file before reading it.
    ctx.crashlog.flush_ring();

    let mut contents = ctx.crashlog.get_log_contents(max_lines);

    if request.query_param("clear") == Some("true") {
        ctx.crashlog.clear_log();
        ctx.crashlog.reset_crash_counter();
        contents.push_str("\n\n[Log cleared and crash counter reset]");
    }

    Reply::ok(contents)
}

/// GET /crash/counter
async fn handle_crash_counter(ctx: &mut AppContext, _request: ApiRequest) -> Reply {
    let body = format!(
        "Crash count: {}\nUptime: {:.2}s\nAvailable memory: {} KiB\n",
        ctx.crashlog.crash_count(),
        ctx.crashlog.uptime(),
        metrics::mem_available_kib(),
    );
    Reply::ok(body)
}

/// POST /crash/reset
async fn handle_crash_reset(ctx: &mut AppContext, _request: ApiRequest) -> Reply {
    ctx.crashlog.reset_crash_counter();
    Reply::ok("Crash counter reset successfully")
}
