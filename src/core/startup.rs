use anyhow::{Context, Result};
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{info, warn};

use crate::connection::resolver::Resolver;
use crate::controller::app::{http_backend_factory, Controller, ControllerSettings};
use crate::controller::refresh::AppEvent;
use crate::core::config::{Config, SessionConfig};
use crate::core::state::AppState;
use crate::session::{FilePreferences, SessionStore};

/// Open the named preference store under the configured directory
pub fn open_session(config: &SessionConfig) -> SessionStore {
    let prefs = FilePreferences::new(&config.dir, &config.store_name);
    info!(path = %prefs.path().display(), "Preference store opened");
    SessionStore::new(prefs)
}

pub fn controller_settings(config: &Config) -> ControllerSettings {
    ControllerSettings {
        resolver: Resolver::new(config.connection.default_address.clone(), config.connection.default_port),
        refresh_interval: config.refresh.interval(),
        enroll_followup: config.refresh.enroll_followup(),
    }
}

/// Wire session, HTTP backend and timer together from the configuration
pub fn build_controller(config: &Config) -> (Controller, UnboundedReceiver<AppEvent>) {
    let session = open_session(&config.session);
    let factory = http_backend_factory(config.connection.request_timeout());
    Controller::new(controller_settings(config), session, factory)
}

/// First transition out of the connection screen.
///
/// An unreachable backend is not fatal: the controller stays on the
/// connection screen and the error is logged. A malformed address is.
pub async fn connect_on_startup(controller: &mut Controller, config: &Config) -> Result<()> {
    if config.demo.enabled {
        controller.enable_demo_mode();
        AppState::capture(controller).log();
        return Ok(());
    }

    // Empty falls back to the persisted base URL, scheme included
    let address = config.connection.address.as_deref().unwrap_or("");
    info!(address = %address, fallback = %controller.display_address(), "Connecting");

    match controller.connect(address).await {
        Ok(notice) => info!(?notice, "Connected"),
        Err(e) if e.is_network() => {
            warn!(error = %e, address = %address, "Backend unreachable, staying on connection screen")
        }
        Err(e) => return Err(e).context(format!("Failed to connect to '{}'", address)),
    }

    AppState::capture(controller).log();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::screen::Screen;

    #[test]
    fn test_settings_follow_config() {
        let config = Config::from_toml(
            r#"
            [connection]
            default_address = "capsule.local"
            default_port = 9100

            [refresh]
            interval_ms = 250
            enroll_followup_ms = 100
            "#,
        )
        .unwrap();

        let settings = controller_settings(&config);
        assert_eq!(settings.resolver.normalize("capsule.local"), "http://capsule.local:9100/");
        assert_eq!(settings.refresh_interval.as_millis(), 250);
        assert_eq!(settings.enroll_followup.as_millis(), 100);
    }

    #[tokio::test]
    async fn test_demo_startup_skips_network() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.demo.enabled = true;
        config.session.dir = dir.path().to_path_buf();

        let (mut controller, _events) = build_controller(&config);
        connect_on_startup(&mut controller, &config).await.unwrap();

        assert!(controller.is_demo());
        assert!(controller.screen().is_bind());
        assert!(!dir.path().join("distcapsule_prefs.toml").exists());
    }

    #[tokio::test]
    async fn test_unreachable_backend_is_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.session.dir = dir.path().to_path_buf();
        config.connection.address = Some("127.0.0.1:1".to_string());
        config.connection.request_timeout = 2;

        let (mut controller, _events) = build_controller(&config);
        connect_on_startup(&mut controller, &config).await.unwrap();

        assert_eq!(controller.screen(), Screen::Connection);
        // The address is persisted before the first request
        assert_eq!(controller.session().load_url(), "http://127.0.0.1:1/");
    }

    #[tokio::test]
    async fn test_restart_keeps_persisted_https_url() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.session.dir = dir.path().to_path_buf();
        config.connection.request_timeout = 2;

        open_session(&config.session).save_url("https://127.0.0.1:1/").unwrap();

        let (mut controller, _events) = build_controller(&config);
        connect_on_startup(&mut controller, &config).await.unwrap();

        assert_eq!(controller.screen(), Screen::Connection);
        assert_eq!(open_session(&config.session).load_url(), "https://127.0.0.1:1/");
    }

    #[tokio::test]
    async fn test_malformed_configured_address_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.session.dir = dir.path().to_path_buf();
        config.connection.address = Some("bad host name".to_string());

        let (mut controller, _events) = build_controller(&config);
        assert!(connect_on_startup(&mut controller, &config).await.is_err());
        assert_eq!(controller.session().load_url(), "");
    }
}
