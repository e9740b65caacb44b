/*
 *  display/traits.rs
 *
 *  trixel - every frame counts
 *  (c) 2025-26
 *
 *  Core trait definitions for panel driver abstraction
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

use crate::display::error::DisplayError;
use crate::display::frame::Frame;

/// Panel capabilities and metadata.
#[derive(Debug, Clone)]
pub struct PanelCapabilities {
    /// Panel width in pixels
    pub width: u32,

    /// Panel height in pixels
    pub height: u32,

    /// Whether the panel supports brightness control
    pub supports_brightness: bool,

    /// Maximum recommended refresh rate
    pub max_fps: u32,
}

/// Minimal hardware abstraction - every panel driver implements this.
///
/// The panel is RGB565 throughout; frames carry packed 16-bit pixel values
/// and the driver decides how they reach the glass. Frames larger than the
/// panel are clipped, smaller ones are padded with black.
pub trait DisplayDriver: Send {
    /// Returns the capabilities of this panel
    fn capabilities(&self) -> &PanelCapabilities;

    /// Returns the panel dimensions as (width, height)
    fn dimensions(&self) -> (u32, u32) {
        let caps = self.capabilities();
        (caps.width, caps.height)
    }

    /// Initialize the panel hardware
    fn init(&mut self) -> Result<(), DisplayError>;

    /// Push a frame to the panel
    fn write_frame(&mut self, frame: &Frame) -> Result<(), DisplayError>;

    /// Blank the panel (all pixels off)
    fn blank(&mut self) -> Result<(), DisplayError>;

    /// Set panel brightness (0-255)
    ///
    /// Returns an error if the panel has no brightness control.
    fn set_brightness(&mut self, _value: u8) -> Result<(), DisplayError> {
        if !self.capabilities().supports_brightness {
            return Err(DisplayError::UnsupportedOperation);
        }
        // Drivers with brightness control override this.
        Err(DisplayError::UnsupportedOperation)
    }
}

/// Boxed driver, the form the manager and factory trade in.
pub type BoxedDriver = Box<dyn DisplayDriver>;
