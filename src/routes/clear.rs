/*
 *  routes/clear.rs
 *
 *  trixel - every frame counts
 *  (c) 2025-26
 *
 *  GET /clear - blank the panel
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

use log::info;

use crate::context::AppContext;
use crate::server::{ApiRequest, HandlerFuture, Method, Reply, Router};

pub fn register(router: &mut Router) {
    router.register(Method::Get, "/clear", clear_handler);
}

fn clear_handler(ctx: &mut AppContext, request: ApiRequest) -> HandlerFuture<'_> {
    Box::pin(handle_clear(ctx, request))
}

async fn handle_clear(ctx: &mut AppContext, _request: ApiRequest) -> Reply {
    match ctx.display.clear() {
        Ok(()) => {
            info!("display cleared");
            Reply::ok("Display cleared successfully")
        }
        Err(e) => Reply::fault(format!("Error clearing display: {}", e)),
    }
}
