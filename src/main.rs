/*
 *  main.rs
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

use anyhow::Context as _;
use env_logger::Env;
use log::{error, info, warn};

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

use trixel::config;
use trixel::context::AppContext;
use trixel::crashlog::{CrashLogger, LogLevel};
use trixel::display::{DisplayManager, factory};
use trixel::fetch::build_client;
use trixel::netlink::SystemLink;
use trixel::routes;
use trixel::server::{HttpService, Router};
use trixel::supervisor::Supervisor;

include!(concat!(env!("OUT_DIR"), "/build_info.rs"));

/// Waits for SIGINT, SIGTERM, or SIGHUP so the main loop can shut down
/// gracefully and blank the panel on the way out.
#[cfg(unix)]
async fn signal_handler() -> Result<(), Box<dyn std::error::Error>> {
    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sighup = signal(SignalKind::hangup())?;

    tokio::select! {
        _ = sigint.recv() => {
            info!("SIGINT received. Initiating graceful shutdown.");
        }
        _ = sigterm.recv() => {
            info!("SIGTERM received. Initiating graceful shutdown.");
        }
        _ = sighup.recv() => {
            info!("SIGHUP received. Initiating graceful shutdown.");
        }
    }
    Ok(())
}

#[cfg(not(unix))]
async fn signal_handler() -> Result<(), Box<dyn std::error::Error>> {
    tokio::signal::ctrl_c().await?;
    info!("Ctrl-C received. Initiating graceful shutdown.");
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cfg = config::load().context("loading configuration")?;

    env_logger::Builder::from_env(Env::default().default_filter_or(cfg.effective_log_level()))
        .format_timestamp_secs()
        .init();

    info!("trixel - every frame counts");
    info!("v.{} built {}", env!("CARGO_PKG_VERSION"), BUILD_DATE);

    // Boot order matters: the crash logger comes up first so everything
    // after it can be recorded, and its construction bumps the counter.
    let crashlog = CrashLogger::new(
        cfg.crash_log_file(),
        cfg.crash_counter_file(),
        cfg.ring_capacity(),
    );

    let driver = factory::build_driver(&cfg.display());
    let display = DisplayManager::new(driver).context("initializing display")?;

    let http = build_client(cfg.fetch_timeout()).context("building HTTP client")?;

    let mut ctx = AppContext::new(display, http, crashlog);

    if let Some(brightness) = cfg.display().brightness {
        if let Err(e) = ctx.display.set_brightness(brightness) {
            warn!("brightness {} not applied: {}", brightness, e);
        }
    }

    let mut router = Router::new();
    routes::register_all(&mut router);

    let mut service = HttpService::start(cfg.bind_addr(), cfg.api_key(), router)
        .await
        .context("starting http front-end")?;
    ctx.crashlog.log_event(
        &format!("Server initialized on {}", service.local_addr()),
        LogLevel::Info,
    );

    let mut link = SystemLink;
    let mut supervisor = Supervisor::new(cfg.failure_threshold());

    let result = tokio::select! {
        res = supervisor.run(&mut service, &mut link, &mut ctx) => {
            res.map_err(anyhow::Error::from)
        }
        _ = signal_handler() => Ok(()),
    };

    if let Err(e) = &result {
        error!("supervisor halted: {}", e);
    }

    // Blank the panel on the way out; a dead display should not keep
    // showing the last frame indefinitely.
    if let Err(e) = ctx.display.clear() {
        warn!("could not clear display during shutdown: {}", e);
    }
    ctx.crashlog.log_event("Shutdown", LogLevel::Info);
    ctx.crashlog.flush_ring();

    result
}
