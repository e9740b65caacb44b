/*
 *  display/drivers/fbdev.rs
 *
 *  trixel - every frame counts
 *  (c) 2025-26
 *
 *  Framebuffer-device panel driver (packed RGB565)
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

use std::fs::{File, OpenOptions};
use std::io::{Seek, SeekFrom, Write};
use std::path::PathBuf;

use log::info;

use crate::display::error::DisplayError;
use crate::display::frame::Frame;
use crate::display::traits::{DisplayDriver, PanelCapabilities};

/// Bytes per pixel on the device: packed little-endian RGB565.
const BYTES_PER_PIXEL: usize = 2;

/// Drives a matrix exposed as a Linux framebuffer device node.
///
/// Rows are written one at a time through a reused row buffer; frames
/// narrower or shorter than the panel are padded with black, larger ones
/// are clipped. The full panel is rewritten on every frame so stale pixels
/// never survive a swap.
pub struct FbdevDriver {
    device: PathBuf,
    file: Option<File>,
    capabilities: PanelCapabilities,
    row_buffer: Vec<u8>,
}

impl FbdevDriver {
    pub fn new(device: PathBuf, width: u32, height: u32) -> Self {
        let stride = width as usize * BYTES_PER_PIXEL;
        Self {
            device,
            file: None,
            capabilities: PanelCapabilities {
                width,
                height,
                supports_brightness: false,
                max_fps: 30,
            },
            row_buffer: vec![0u8; stride],
        }
    }

    fn file(&mut self) -> Result<&mut File, DisplayError> {
        self.file
            .as_mut()
            .ok_or_else(|| DisplayError::Device("framebuffer not initialized".to_string()))
    }

    /// Write one prepared row at its device offset.
    fn flush_row(&mut self, y: u32) -> Result<(), DisplayError> {
        let stride = self.capabilities.width as usize * BYTES_PER_PIXEL;
        let offset = y as u64 * stride as u64;
        let row = std::mem::take(&mut self.row_buffer);
        let result: Result<(), DisplayError> = (|| {
            let file = self.file()?;
            file.seek(SeekFrom::Start(offset))?;
            file.write_all(&row)?;
            Ok(())
        })();
        self.row_buffer = row;
        result
    }
}

impl DisplayDriver for FbdevDriver {
    fn capabilities(&self) -> &PanelCapabilities {
        &self.capabilities
    }

    fn init(&mut self) -> Result<(), DisplayError> {
        let file = OpenOptions::new()
            .write(true)
            .open(&self.device)
            .map_err(|e| {
                DisplayError::InitializationFailed(format!(
                    "cannot open {}: {}",
                    self.device.display(),
                    e
                ))
            })?;
        self.file = Some(file);
        info!(
            "framebuffer {} opened ({}x{})",
            self.device.display(),
            self.capabilities.width,
            self.capabilities.height
        );
        Ok(())
    }

    fn write_frame(&mut self, frame: &Frame) -> Result<(), DisplayError> {
        let (panel_w, panel_h) = (self.capabilities.width, self.capabilities.height);
        for y in 0..panel_h {
            for x in 0..panel_w {
                let value = frame.pixel(x, y);
                let dst = x as usize * BYTES_PER_PIXEL;
                self.row_buffer[dst..dst + BYTES_PER_PIXEL]
                    .copy_from_slice(&value.to_le_bytes());
            }
            self.flush_row(y)?;
        }
        let file = self.file()?;
        file.flush()?;
        Ok(())
    }

    fn blank(&mut self) -> Result<(), DisplayError> {
        let panel_h = self.capabilities.height;
        self.row_buffer.fill(0);
        for y in 0..panel_h {
            self.flush_row(y)?;
        }
        let file = self.file()?;
        file.flush()?;
        Ok(())
    }
}
