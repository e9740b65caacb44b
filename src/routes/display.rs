/*
 *  routes/display.rs
 *
 *  trixel - every frame counts
 *  (c) 2025-26
 *
 *  POST /display - raw BMP upload
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

use crate::bitmap::{self, MIN_BMP_LEN};
use crate::context::AppContext;
use crate::crashlog::LogLevel;
use crate::server::{ApiRequest, HandlerFuture, Method, Reply, Router};

pub fn register(router: &mut Router) {
    router.register(Method::Post, "/display", display_handler);
}

fn display_handler(ctx: &mut AppContext, request: ApiRequest) -> HandlerFuture<'_> {
    Box::pin(handle_display(ctx, request))
}

async fn handle_display(ctx: &mut AppContext, request: ApiRequest) -> Reply {
    if request.body.len() < MIN_BMP_LEN {
        debug!("undersized bitmap upload: {} bytes", request.body.len());
        return Reply::status(400, "Invalid bitmap data");
    }

    let bmp = match bitmap::decode_bmp(&request.body, "uploaded") {
        Ok(bmp) => bmp,
        Err(e) => {
            // The client sent a broken image; that stays its problem.
            ctx.crashlog
                .log_event(&format!("Error loading bitmap: {}", e), LogLevel::Error);
            return Reply::status(500, format!("Error loading bitmap: {}", e));
        }
    };

    // Release the raw upload before a new frame is built.
    drop(request);

    match ctx.display.show(bmp) {
        Ok(()) => {
            info!("displayed uploaded bitmap");
            Reply::ok("Bitmap displayed successfully")
        }
        Err(e) => Reply::fault(format!("Error displaying bitmap: {}", e)),
    }
}
