/*
 *  display/error.rs
 *
 *  trixel - every frame counts
 *  (c) 2025-26
 *
 *  Error type for the display subsystem
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

use thiserror::Error;

/// Unified error type for all display operations.
#[derive(Debug, Error)]
pub enum DisplayError {
    /// Panel or device-node initialization failed.
    #[error("display initialization failed: {0}")]
    InitializationFailed(String),

    /// Writing to the underlying device failed.
    #[error("display device error: {0}")]
    Device(String),

    /// Operation not supported by this panel.
    #[error("operation not supported by this display")]
    UnsupportedOperation,

    /// Generic error with message.
    #[error("{0}")]
    Other(String),
}

impl From<std::io::Error> for DisplayError {
    fn from(err: std::io::Error) -> Self {
        DisplayError::Device(err.to_string())
    }
}
