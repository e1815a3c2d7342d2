//! Bridge bootstrap: configuration, validation and telemetry.

use std::sync::Arc;

use ortho_config::{OrthoConfig, OrthoError};
use thiserror::Error;

use roa_bridge_config::{BridgeSettings, Config, ConfigError};

use crate::health::HealthReporter;
use crate::telemetry::{self, TelemetryError, TelemetryHandle};

/// Trait abstracting configuration loading for testability.
pub trait ConfigLoader: Send + Sync {
    /// Loads the layered bridge configuration.
    fn load(&self) -> Result<Config, Arc<OrthoError>>;
}

/// Loader that delegates to [`Config::load`].
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemConfigLoader;

impl ConfigLoader for SystemConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Config::load()
    }
}

/// Errors surfaced during bootstrap.
#[derive(Debug, Error)]
pub enum BootstrapError {
    /// Configuration failed to load.
    #[error("failed to load configuration: {source}")]
    Configuration {
        /// Underlying loader error.
        #[source]
        source: Arc<OrthoError>,
    },
    /// The loaded configuration is incomplete or inconsistent.
    #[error("invalid configuration: {source}")]
    Settings {
        /// Validation failure.
        #[source]
        source: ConfigError,
    },
    /// Telemetry initialisation failed.
    #[error("failed to initialise telemetry: {source}")]
    Telemetry {
        /// Underlying telemetry error.
        #[source]
        source: TelemetryError,
    },
}

/// Result of a successful bootstrap.
#[derive(Debug)]
pub struct Bootstrap {
    settings: BridgeSettings,
    telemetry: TelemetryHandle,
}

impl Bootstrap {
    /// Resolved settings.
    #[must_use]
    pub fn settings(&self) -> &BridgeSettings {
        &self.settings
    }

    /// Accessor for the telemetry handle, primarily useful for testing.
    #[must_use]
    pub fn telemetry(&self) -> TelemetryHandle {
        self.telemetry
    }

    /// Consumes the bootstrap, keeping the settings.
    #[must_use]
    pub fn into_settings(self) -> BridgeSettings {
        self.settings
    }
}

/// Loads, validates and installs telemetry, reporting each outcome.
///
/// Nothing outside the log file is touched here, so a bad configuration is
/// rejected before any socket or PID file is opened.
pub fn bootstrap_with(
    loader: &dyn ConfigLoader,
    reporter: &dyn HealthReporter,
) -> Result<Bootstrap, BootstrapError> {
    reporter.bootstrap_starting();
    let result = load_settings(loader);
    match &result {
        Ok(bootstrap) => reporter.bootstrap_succeeded(&bootstrap.settings),
        Err(error) => reporter.bootstrap_failed(error),
    }
    result
}

fn load_settings(loader: &dyn ConfigLoader) -> Result<Bootstrap, BootstrapError> {
    let config = loader
        .load()
        .map_err(|source| BootstrapError::Configuration { source })?;
    let settings = config
        .resolve()
        .map_err(|source| BootstrapError::Settings { source })?;
    let telemetry = telemetry::initialise(settings.telemetry())
        .map_err(|source| BootstrapError::Telemetry { source })?;
    Ok(Bootstrap {
        settings,
        telemetry,
    })
}
