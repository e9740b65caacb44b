/*
 *  routes/fetch.rs
 *
 *  trixel - every frame counts
 *  (c) 2025-26
 *
 *  POST /fetch - pull a BMP from a URL and display it
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

use log::{debug, info};

use crate::bitmap;
use crate::context::AppContext;
use crate::crashlog::LogLevel;
use crate::fetch::{self, FetchError};
use crate::server::{ApiRequest, HandlerFuture, Method, Reply, Router};

pub fn register(router: &mut Router) {
    router.register(Method::Post, "/fetch", fetch_handler);
}

fn fetch_handler(ctx: &mut AppContext, request: ApiRequest) -> HandlerFuture<'_> {
    Box::pin(handle_fetch(ctx, request))
}

async fn handle_fetch(ctx: &mut AppContext, request: ApiRequest) -> Reply {
    let url = String::from_utf8_lossy(&request.body).trim().to_string();
    drop(request);

    if url.is_empty() {
        debug!("empty URL in POST body");
        return Reply::status(400, "Empty URL in POST body");
    }
    debug!("fetching bitmap from {}", url);

    let data = match fetch::fetch_sized(&ctx.http, &url).await {
        Ok(data) => data,
        Err(e) => {
            // A URL pointing at something unusable (no length, short
            // body, remote error status) stays the client's problem;
            // network trouble on our side counts against the budget.
            let counted =
                matches!(e, FetchError::Transport(_)) && !e.is_remote_status();
            let message = format!("Error fetching bitmap: {}", e);
            ctx.crashlog.log_event(&message, LogLevel::Error);
            return if counted {
                Reply::fault(message)
            } else {
                Reply::status(500, message)
            };
        }
    };

    let bmp = match bitmap::decode_bmp(&data, &url) {
        Ok(bmp) => bmp,
        Err(e) => {
            ctx.crashlog
                .log_event(&format!("Error loading bitmap: {}", e), LogLevel::Error);
            return Reply::status(500, format!("Error loading bitmap: {}", e));
        }
    };

    // The raw download is no longer needed once decoded.
    drop(data);

    match ctx.display.show(bmp) {
        Ok(()) => {
            info!("bitmap from {} displayed", url);
            Reply::ok("Bitmap displayed successfully")
        }
        Err(e) => Reply::fault(format!("Error displaying bitmap: {}", e)),
    }
}
