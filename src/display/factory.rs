/*
 *  display/factory.rs
 *
 *  trixel - every frame counts
 *  (c) 2025-26
 *
 *  Driver construction from configuration
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

use std::path::PathBuf;

use log::{info, warn};

use crate::config::{DisplayConfig, DriverKind};
use crate::display::drivers::{FbdevDriver, MockDriver};
use crate::display::traits::BoxedDriver;

/// Panel geometry when the config says nothing: a common 64x32 matrix.
pub const DEFAULT_PANEL_WIDTH: u32 = 64;
pub const DEFAULT_PANEL_HEIGHT: u32 = 32;

const DEFAULT_FB_DEVICE: &str = "/dev/fb0";

/// Build the configured panel driver. The driver is returned
/// uninitialized; `DisplayManager::new` calls `init()`.
pub fn build_driver(config: &DisplayConfig) -> BoxedDriver {
    let width = config.width.unwrap_or(DEFAULT_PANEL_WIDTH);
    let height = config.height.unwrap_or(DEFAULT_PANEL_HEIGHT);

    match config.driver {
        Some(DriverKind::Fbdev) => {
            let device = config
                .device
                .clone()
                .unwrap_or_else(|| PathBuf::from(DEFAULT_FB_DEVICE));
            info!(
                "display driver: fbdev {} ({}x{})",
                device.display(),
                width,
                height
            );
            Box::new(FbdevDriver::new(device, width, height))
        }
        Some(DriverKind::Mock) => {
            info!("display driver: mock ({}x{})", width, height);
            Box::new(MockDriver::new_with_size(width, height))
        }
        None => {
            warn!("no display driver configured, using mock panel");
            Box::new(MockDriver::new_with_size(width, height))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_mock_panel_geometry() {
        let driver = build_driver(&DisplayConfig::default());
        assert_eq!(
            driver.dimensions(),
            (DEFAULT_PANEL_WIDTH, DEFAULT_PANEL_HEIGHT)
        );
    }

    #[test]
    fn explicit_geometry_is_honored() {
        let config = DisplayConfig {
            width: Some(128),
            height: Some(64),
            driver: Some(DriverKind::Mock),
            ..Default::default()
        };
        let driver = build_driver(&config);
        assert_eq!(driver.dimensions(), (128, 64));
    }
}
