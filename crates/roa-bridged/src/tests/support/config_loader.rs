//! Test configuration loaders for scenarios covering success and failure paths.

use std::ffi::OsString;
use std::sync::Arc;

use camino::{Utf8Path, Utf8PathBuf};
use ortho_config::{OrthoConfig, OrthoError};
use roa_bridge_config::{Config, FeedTransportKind};
use tempfile::TempDir;

use crate::bootstrap::ConfigLoader;

/// Loader that points the bridge at a fake control socket and keeps the PID
/// file inside a temporary directory.
#[derive(Clone)]
pub struct TestConfigLoader {
    runtime_dir: Arc<TempDir>,
    config: Config,
}

impl TestConfigLoader {
    /// Builds a foreground configuration for `socket`.
    pub fn new(socket: &Utf8Path) -> Self {
        let runtime_dir = TempDir::new().expect("failed to create runtime directory");
        let config = Config {
            bird_socket: Some(socket.to_path_buf()),
            rtr_host: Some("127.0.0.1".to_owned()),
            rtr_port: Some(3323),
            daemon_timeout_ms: Some(2_000),
            reconnect_initial_backoff_ms: Some(1),
            reconnect_max_backoff_ms: Some(10),
            reconnect_max_attempts: Some(3),
            ..Config::default()
        };
        let mut loader = Self {
            runtime_dir: Arc::new(runtime_dir),
            config,
        };
        loader.config.pid_file = Some(loader.pid_path());
        loader
    }

    /// Requests background mode.
    pub fn background(&mut self) {
        self.config.daemon = Some(true);
    }

    /// Removes the reconnect attempt cap.
    pub fn unbounded_reconnects(&mut self) {
        self.config.reconnect_max_attempts = None;
    }

    /// Switches the feed to SSH transport.
    pub fn use_ssh_feed(&mut self) {
        self.config.rtr_transport = Some(FeedTransportKind::Ssh);
        self.config.ssh_username = Some("rpki".to_owned());
        self.config.ssh_private_key = Some(
            Utf8PathBuf::from_path_buf(self.runtime_dir.path().join("id_ed25519"))
                .expect("temporary key path was not valid UTF-8"),
        );
    }

    /// Sets the family filter expression.
    pub fn filter_families(&mut self, expression: &str) {
        self.config.ip_version = Some(expression.to_owned());
    }

    /// PID file used in background mode.
    pub fn pid_path(&self) -> Utf8PathBuf {
        Utf8PathBuf::from_path_buf(self.runtime_dir.path().join("roa-bridged.pid"))
            .expect("temporary pid path was not valid UTF-8")
    }
}

impl ConfigLoader for TestConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Ok(self.config.clone())
    }
}

/// Loader that intentionally fails by passing invalid CLI arguments.
pub struct FailingConfigLoader;

impl ConfigLoader for FailingConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        let args = vec![
            OsString::from("roa-bridged"),
            OsString::from("--rtr-port"),
            OsString::from("not-a-port"),
        ];
        Config::load_from_iter(args)
    }
}

/// Loader whose configuration lacks the control socket.
pub struct IncompleteConfigLoader;

impl ConfigLoader for IncompleteConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Ok(Config {
            rtr_host: Some("127.0.0.1".to_owned()),
            rtr_port: Some(3323),
            ..Config::default()
        })
    }
}
