/*
 *  lib.rs
 *
 *  trixel - every frame counts
 *  (c) 2025-26
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

//! HTTP-fed frame server for pixel-matrix displays.
//!
//! Clients push BMP images (or URLs to them) at the daemon; it decodes
//! them into RGB565 frames and swaps them onto a panel while keeping
//! peak memory bounded to a single frame. A supervisor loop counts
//! consecutive service failures and escalates into a reset-and-rebind
//! recovery cycle; lifecycle events and exceptions land in a
//! tiered-durability crash log with a power-cycle-surviving boot counter.

pub mod bitmap;
pub mod config;
pub mod context;
pub mod crashlog;
pub mod display;
pub mod fetch;
pub mod metrics;
pub mod netlink;
pub mod routes;
pub mod server;
pub mod supervisor;
