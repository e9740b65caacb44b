/*
 *  display/manager.rs
 *
 *  trixel - every frame counts
 *  (c) 2025-26
 *
 *  Display manager - owns the current frame and the swap discipline
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

use log::debug;

use crate::bitmap::Bitmap;
use crate::display::error::DisplayError;
use crate::display::frame::{Frame, Residency};
use crate::display::traits::BoxedDriver;

/// Owns the panel driver and at most one rendered frame.
///
/// The swap order is the whole point of this type: the previous frame's
/// memory is released before the next frame is built, so peak usage is
/// bounded by a single frame regardless of how often clients push images.
pub struct DisplayManager {
    driver: BoxedDriver,
    current: Option<Frame>,
    residency: Residency,
}

impl DisplayManager {
    /// Wrap an already-constructed driver and initialize the panel.
    pub fn new(mut driver: BoxedDriver) -> Result<Self, DisplayError> {
        driver.init()?;
        Ok(Self {
            driver,
            current: None,
            residency: Residency::new(),
        })
    }

    /// Panel dimensions as (width, height).
    pub fn dimensions(&self) -> (u32, u32) {
        self.driver.dimensions()
    }

    /// Whether a frame is currently installed.
    pub fn has_frame(&self) -> bool {
        self.current.is_some()
    }

    /// Frames currently alive. 0 or 1 in correct operation.
    pub fn resident_frames(&self) -> usize {
        self.residency.live()
    }

    /// Highest number of frames that were ever alive at once.
    pub fn peak_resident_frames(&self) -> usize {
        self.residency.peak()
    }

    /// Replace the current frame with a freshly decoded bitmap.
    ///
    /// The previous frame is dropped before the new frame exists, and the
    /// bitmap's pixel storage moves into the new frame rather than being
    /// copied.
    pub fn show(&mut self, bitmap: Bitmap) -> Result<(), DisplayError> {
        if let Some(previous) = self.current.take() {
            drop(previous);
        }
        debug!("frames resident after drop: {}", self.residency.live());

        let frame = Frame::from_bitmap(bitmap, &self.residency);
        self.driver.write_frame(&frame)?;
        self.current = Some(frame);

        debug!(
            "frames resident after swap: {} (peak {})",
            self.residency.live(),
            self.residency.peak()
        );
        Ok(())
    }

    /// Remove the current frame and blank the panel.
    pub fn clear(&mut self) -> Result<(), DisplayError> {
        if let Some(previous) = self.current.take() {
            drop(previous);
        }
        self.driver.blank()?;
        debug!("frames resident after clear: {}", self.residency.live());
        Ok(())
    }

    /// Pass-through brightness control.
    pub fn set_brightness(&mut self, value: u8) -> Result<(), DisplayError> {
        self.driver.set_brightness(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bitmap::decode_bmp;
    use crate::display::drivers::mock::{MockDriver, MockState};
    use std::sync::{Arc, Mutex};

    fn solid_bitmap(value: u16) -> Bitmap {
        let mut data = vec![0u8; 138 + 4];
        data[0] = b'B';
        data[1] = b'M';
        data[10..14].copy_from_slice(&138u32.to_le_bytes());
        data[14..18].copy_from_slice(&40u32.to_le_bytes());
        data[18..22].copy_from_slice(&1u32.to_le_bytes());
        data[22..26].copy_from_slice(&1u32.to_le_bytes());
        data[28..30].copy_from_slice(&16u16.to_le_bytes());
        data[138..140].copy_from_slice(&value.to_le_bytes());
        decode_bmp(&data, "test").unwrap()
    }

    fn manager_with_mock() -> (DisplayManager, Arc<Mutex<MockState>>) {
        let driver = MockDriver::new_with_size(8, 8);
        let state = driver.state();
        let manager = DisplayManager::new(Box::new(driver)).unwrap();
        (manager, state)
    }

    #[test]
    fn show_installs_frame_and_writes_driver() {
        let (mut manager, state) = manager_with_mock();
        manager.show(solid_bitmap(0xF800)).unwrap();

        assert!(manager.has_frame());
        assert_eq!(manager.resident_frames(), 1);
        let state = state.lock().unwrap();
        assert_eq!(state.write_count, 1);
        assert_eq!(state.last_frame.as_ref().unwrap().pixels[0], 0xF800);
    }

    #[test]
    fn repeated_swaps_never_hold_two_frames() {
        let (mut manager, _state) = manager_with_mock();
        for value in [0xF800u16, 0x07E0, 0x001F, 0xFFFF] {
            manager.show(solid_bitmap(value)).unwrap();
            assert_eq!(manager.resident_frames(), 1);
        }
        assert_eq!(manager.peak_resident_frames(), 1);
    }

    #[test]
    fn clear_drops_frame_and_blanks_panel() {
        let (mut manager, state) = manager_with_mock();
        manager.show(solid_bitmap(0xF800)).unwrap();
        manager.clear().unwrap();

        assert!(!manager.has_frame());
        assert_eq!(manager.resident_frames(), 0);
        assert_eq!(state.lock().unwrap().blank_count, 1);
    }

    #[test]
    fn clear_on_empty_display_still_blanks() {
        let (mut manager, state) = manager_with_mock();
        manager.clear().unwrap();
        assert_eq!(state.lock().unwrap().blank_count, 1);
    }

    #[test]
    fn failed_write_leaves_no_frame_installed() {
        let (mut manager, state) = manager_with_mock();
        state.lock().unwrap().simulate_write_failure = true;

        assert!(manager.show(solid_bitmap(0xF800)).is_err());
        assert!(!manager.has_frame());
        assert_eq!(manager.resident_frames(), 0);
    }
}
