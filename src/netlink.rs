/*
 *  netlink.rs
 *
 *  trixel - every frame counts
 *  (c) 2025-26
 *
 *  Network link verification used by the recovery path
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

use local_ip_address::local_ip;
use log::{debug, warn};
use thiserror::Error;

/// The link could not be verified or restored.
#[derive(Debug, Error)]
#[error("network link down: {0}")]
pub struct LinkError(pub String);

/// Seam to the out-of-scope radio/link layer. Recovery asks it to
/// verify the link and bring it back if it can.
pub trait NetworkLink {
    fn ensure_up(&mut self) -> Result<(), LinkError>;
}

/// Production link check: the host must hold a routable local address.
/// Interface management itself belongs to the OS; if the address is gone
/// there is nothing this process can do but report it.
pub struct SystemLink;

impl NetworkLink for SystemLink {
    fn ensure_up(&mut self) -> Result<(), LinkError> {
        match local_ip() {
            Ok(addr) => {
                debug!("network link up, local address {}", addr);
                Ok(())
            }
            Err(e) => {
                warn!("network link check failed: {}", e);
                Err(LinkError(e.to_string()))
            }
        }
    }
}
