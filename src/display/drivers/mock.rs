/*
 *  display/drivers/mock.rs
 *
 *  trixel - every frame counts
 *  (c) 2025-26
 *
 *  Mock panel driver for testing without hardware
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

use std::sync::{Arc, Mutex};

use crate::display::error::DisplayError;
use crate::display::frame::Frame;
use crate::display::traits::{DisplayDriver, PanelCapabilities};

/// Snapshot of a frame as the mock panel received it.
#[derive(Debug, Clone)]
pub struct CapturedFrame {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u16>,
}

/// Internal state of the mock driver, shared for inspection in tests.
#[derive(Debug, Default)]
pub struct MockState {
    /// Number of times init() was called
    pub init_count: usize,

    /// Number of times write_frame() was called
    pub write_count: usize,

    /// Number of times blank() was called
    pub blank_count: usize,

    /// Last frame pushed to the panel
    pub last_frame: Option<CapturedFrame>,

    /// Last brightness value set
    pub last_brightness: Option<u8>,

    /// Whether the driver is initialized
    pub is_initialized: bool,

    /// Simulate failures (for error-path testing)
    pub simulate_init_failure: bool,
    pub simulate_write_failure: bool,
    pub simulate_blank_failure: bool,
}

/// Panel driver that records every operation instead of touching hardware.
///
/// Used by the unit and integration tests and for development on machines
/// without a matrix attached.
#[derive(Debug, Clone)]
pub struct MockDriver {
    capabilities: PanelCapabilities,
    state: Arc<Mutex<MockState>>,
}

impl MockDriver {
    pub fn new_with_size(width: u32, height: u32) -> Self {
        Self {
            capabilities: PanelCapabilities {
                width,
                height,
                supports_brightness: true,
                max_fps: 60,
            },
            state: Arc::new(Mutex::new(MockState::default())),
        }
    }

    /// Handle to the shared state for inspection in tests.
    pub fn state(&self) -> Arc<Mutex<MockState>> {
        Arc::clone(&self.state)
    }
}

impl DisplayDriver for MockDriver {
    fn capabilities(&self) -> &PanelCapabilities {
        &self.capabilities
    }

    fn init(&mut self) -> Result<(), DisplayError> {
        let mut state = self.state.lock().unwrap();
        if state.simulate_init_failure {
            return Err(DisplayError::InitializationFailed(
                "simulated init failure".to_string(),
            ));
        }
        state.init_count += 1;
        state.is_initialized = true;
        Ok(())
    }

    fn write_frame(&mut self, frame: &Frame) -> Result<(), DisplayError> {
        let mut state = self.state.lock().unwrap();
        if state.simulate_write_failure {
            return Err(DisplayError::Device("simulated write failure".to_string()));
        }
        state.write_count += 1;
        state.last_frame = Some(CapturedFrame {
            width: frame.width(),
            height: frame.height(),
            pixels: frame.pixels().to_vec(),
        });
        Ok(())
    }

    fn blank(&mut self) -> Result<(), DisplayError> {
        let mut state = self.state.lock().unwrap();
        if state.simulate_blank_failure {
            return Err(DisplayError::Device("simulated blank failure".to_string()));
        }
        state.blank_count += 1;
        state.last_frame = None;
        Ok(())
    }

    fn set_brightness(&mut self, value: u8) -> Result<(), DisplayError> {
        let mut state = self.state.lock().unwrap();
        state.last_brightness = Some(value);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_records_state() {
        let mut driver = MockDriver::new_with_size(64, 32);
        let state = driver.state();
        assert!(!state.lock().unwrap().is_initialized);

        driver.init().unwrap();

        assert_eq!(state.lock().unwrap().init_count, 1);
        assert!(state.lock().unwrap().is_initialized);
    }

    #[test]
    fn simulated_init_failure() {
        let mut driver = MockDriver::new_with_size(64, 32);
        driver.state().lock().unwrap().simulate_init_failure = true;
        assert!(driver.init().is_err());
    }

    #[test]
    fn blank_forgets_last_frame() {
        let mut driver = MockDriver::new_with_size(64, 32);
        driver.blank().unwrap();
        let state = driver.state();
        assert_eq!(state.lock().unwrap().blank_count, 1);
        assert!(state.lock().unwrap().last_frame.is_none());
    }

    #[test]
    fn brightness_is_recorded() {
        let mut driver = MockDriver::new_with_size(64, 32);
        driver.set_brightness(200).unwrap();
        assert_eq!(driver.state().lock().unwrap().last_brightness, Some(200));
    }
}
