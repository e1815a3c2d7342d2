//! SSH transport for cache sessions.
//!
//! The cache serves RTR as the `rpki-rtr` subsystem. The channel stream is
//! handed to the RTR client unchanged, so the session logic is shared with
//! plain TCP.

use std::io;
use std::pin::Pin;
use std::sync::Arc;

use roa_bridge_config::SshCredentials;
use russh::ChannelStream;
use russh::client::{self, Handle, Msg};
use russh::keys::{PrivateKeyWithHashAlg, PublicKey, load_public_key, load_secret_key};
use tokio::net::TcpStream;
use tracing::{debug, warn};

use super::FEED_TARGET;

/// Subsystem name caches register for RTR.
pub const RTR_SUBSYSTEM: &str = "rpki-rtr";

/// Open subsystem channel plus the session that carries it.
pub struct SshChannel {
    /// Session handle; dropping it tears the session down.
    pub session: Handle<HostKeyCheck>,
    /// Byte stream of the subsystem channel.
    pub stream: Pin<Box<ChannelStream<Msg>>>,
}

/// Verifies the cache's host key against the pinned key, if any.
pub struct HostKeyCheck {
    expected: Option<PublicKey>,
}

impl client::Handler for HostKeyCheck {
    type Error = russh::Error;

    async fn check_server_key(&mut self, server_public_key: &PublicKey) -> Result<bool, Self::Error> {
        let Some(expected) = &self.expected else {
            warn!(
                target: FEED_TARGET,
                "no ssh_hostkey configured; accepting the cache's host key unverified"
            );
            return Ok(true);
        };
        let matches = expected.key_data() == server_public_key.key_data();
        if !matches {
            warn!(target: FEED_TARGET, "cache host key does not match ssh_hostkey");
        }
        Ok(matches)
    }
}

/// Runs the SSH handshake over `stream`, authenticates with the configured
/// key and opens the RTR subsystem.
///
/// # Errors
///
/// Returns an IO error when a key cannot be read, the host key is refused,
/// authentication fails or the subsystem request is denied.
pub async fn open_channel(
    stream: TcpStream,
    credentials: &SshCredentials,
) -> io::Result<SshChannel> {
    let expected = credentials
        .hostkey
        .as_ref()
        .map(|path| load_public_key(path.as_std_path()))
        .transpose()
        .map_err(io::Error::other)?;
    let config = Arc::new(client::Config::default());
    let mut session = client::connect_stream(config, stream, HostKeyCheck { expected })
        .await
        .map_err(io::Error::other)?;
    debug!(target: FEED_TARGET, "ssh handshake completed");

    let key = load_secret_key(credentials.private_key.as_std_path(), None)
        .map_err(io::Error::other)?;
    let hash = session
        .best_supported_rsa_hash()
        .await
        .map_err(io::Error::other)?
        .flatten();
    let auth = session
        .authenticate_publickey(
            credentials.username.clone(),
            PrivateKeyWithHashAlg::new(Arc::new(key), hash),
        )
        .await
        .map_err(io::Error::other)?;
    if !auth.success() {
        return Err(io::Error::new(
            io::ErrorKind::PermissionDenied,
            format!("cache refused ssh key for user '{}'", credentials.username),
        ));
    }

    let channel = session
        .channel_open_session()
        .await
        .map_err(io::Error::other)?;
    channel
        .request_subsystem(true, RTR_SUBSYSTEM)
        .await
        .map_err(io::Error::other)?;
    debug!(target: FEED_TARGET, subsystem = RTR_SUBSYSTEM, "ssh channel opened");
    Ok(SshChannel {
        session,
        stream: Box::pin(channel.into_stream()),
    })
}
