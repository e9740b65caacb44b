/*
 *  routes/mod.rs
 *
 *  trixel - every frame counts
 *  (c) 2025-26
 *
 *  HTTP route handlers
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

pub mod clear;
pub mod crash;
pub mod display;
pub mod fetch;

use crate::server::Router;

/// Register every route handler with the dispatch table.
pub fn register_all(router: &mut Router) {
    display::register(router);
    fetch::register(router);
    clear::register(router);
    crash::register(router);
}
