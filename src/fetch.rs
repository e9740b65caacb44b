/*
 *  fetch.rs
 *
 *  trixel - every frame counts
 *  (c) 2025-26
 *
 *  Size-bounded HTTP fetch into a single pre-allocated buffer
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

use std::time::Duration;

use log::debug;
use reqwest::{Client, header};
use thiserror::Error;

/// Default transport timeout for remote image fetches.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(15);

/// Failure modes of a remote image fetch.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The response declared no usable body size. Buffering a body of
    /// unknown length is forbidden on the target hardware, so this is a
    /// hard failure, not a fallback path.
    #[error("response did not declare a usable Content-Length")]
    MissingLength,

    /// The connection ended before the declared byte count arrived.
    #[error("connection closed early: expected {expected} bytes, received {received}")]
    Short { expected: usize, received: usize },

    /// Request construction, connection, or status failure.
    #[error("transfer failed: {0}")]
    Transport(#[from] reqwest::Error),
}

impl FetchError {
    /// Whether the failure is a bad remote status (a bad URL target)
    /// rather than environment trouble.
    pub fn is_remote_status(&self) -> bool {
        matches!(self, FetchError::Transport(e) if e.is_status())
    }
}

/// Build the shared HTTP client: one instance, fixed timeout, identified
/// User-Agent.
pub fn build_client(timeout: Duration) -> Result<Client, FetchError> {
    const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), " v", env!("CARGO_PKG_VERSION"));

    let mut headers = header::HeaderMap::new();
    headers.insert("User-Agent", header::HeaderValue::from_static(USER_AGENT));

    let client = Client::builder()
        .default_headers(headers)
        .timeout(timeout)
        .build()?;
    Ok(client)
}

/// Fetch a resource of known size into one exactly-sized buffer.
///
/// The buffer is allocated once, up front, from the declared
/// `Content-Length`; body chunks are copied in at increasing offsets and
/// never grow it. Bytes past the declared length are discarded. Any end
/// of the stream - clean close or transport error - before the buffer is
/// full reports [`FetchError::Short`].
pub async fn fetch_sized(client: &Client, url: &str) -> Result<Vec<u8>, FetchError> {
    let mut response = client.get(url).send().await?.error_for_status()?;

    let expected = response.content_length().unwrap_or(0) as usize;
    if expected == 0 {
        return Err(FetchError::MissingLength);
    }
    debug!("fetching {}: Content-Length {} bytes", url, expected);

    let mut buffer = vec![0u8; expected];
    let mut offset = 0usize;

    loop {
        match response.chunk().await {
            Ok(Some(chunk)) => {
                if offset >= expected {
                    // Server kept talking past its declared length.
                    break;
                }
                let take = chunk.len().min(expected - offset);
                buffer[offset..offset + take].copy_from_slice(&chunk[..take]);
                offset += take;
            }
            Ok(None) => break,
            Err(err) => {
                if offset < expected {
                    return Err(FetchError::Short {
                        expected,
                        received: offset,
                    });
                }
                return Err(FetchError::Transport(err));
            }
        }
    }

    // Release the connection before handing the buffer on.
    drop(response);

    if offset < expected {
        return Err(FetchError::Short {
            expected,
            received: offset,
        });
    }

    debug!("downloaded {} bytes from {}", offset, url);
    Ok(buffer)
}
