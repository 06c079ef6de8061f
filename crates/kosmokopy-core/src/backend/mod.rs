//! Transfer back-ends (component C6): the thing that actually moves
//! bytes for one file, once the coordinator has already decided the
//! source, the final destination, and whether an existing file there
//! is being replaced.

pub mod rsync;
pub mod standard;

use crate::cancel::CancelToken;
use crate::endpoint::Endpoint;
use crate::error::KosmoError;
use crate::remote::RemoteChannel;
use std::collections::HashMap;

/// Copies a single file from a source [`Endpoint`] to a destination
/// [`Endpoint`], given already-open remote channels keyed by host.
#[async_trait::async_trait]
pub trait TransferBackend {
    async fn transfer_one(
        &self,
        source: &Endpoint,
        destination: &Endpoint,
        channels: &HashMap<String, RemoteChannel>,
        cancel: &CancelToken,
    ) -> Result<(), KosmoError>;
}

pub use rsync::RsyncBackend;
pub use standard::StandardBackend;

fn channel_for<'a>(
    host: &str,
    channels: &'a HashMap<String, RemoteChannel>,
) -> Result<&'a RemoteChannel, KosmoError> {
    channels.get(host).ok_or_else(|| KosmoError::Transfer {
        path: host.to_string(),
        reason: "no open channel for host".to_string(),
    })
}
