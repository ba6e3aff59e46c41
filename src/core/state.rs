// Rendered application state (what a front end would draw)

use crate::controller::app::Controller;
use crate::controller::screen::Screen;
use crate::view::model::{AdminUserView, DashboardView};
use tracing::info;

/// Snapshot of everything visible on the current screen.
///
/// Built from the controller after each action or refresh; the headless
/// binary logs it in place of drawing it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppState {
    pub screen: Screen,
    pub demo: bool,
    /// Connection field contents
    pub address: String,
    /// Bind list labels, `"id - name"`
    pub user_labels: Vec<String>,
    pub dashboard: Option<DashboardView>,
    pub admin: Option<AdminUserView>,
}

impl AppState {
    pub fn capture(controller: &Controller) -> Self {
        let view = controller.view();
        let on_dashboard = controller.screen().is_dashboard();

        Self {
            screen: controller.screen(),
            demo: controller.is_demo(),
            address: controller.display_address(),
            user_labels: view.cache().labels(),
            dashboard: on_dashboard.then(|| view.dashboard()).flatten(),
            admin: on_dashboard.then(|| view.admin_user_view()).flatten(),
        }
    }

    /// Free channels as shown on the channel map, empty off-dashboard
    pub fn free_channels(&self) -> Vec<u8> {
        self.dashboard
            .as_ref()
            .map(|dashboard| dashboard.channel_map.free_channels())
            .unwrap_or_default()
    }

    pub fn log(&self) {
        match &self.dashboard {
            Some(dashboard) => info!(
                screen = %self.screen,
                demo = self.demo,
                user_id = dashboard.user_id,
                name = %dashboard.name,
                role = ?dashboard.role,
                channel = ?dashboard.channel,
                biometrics = ?dashboard.biometrics,
                free_channels = ?self.free_channels(),
                admin_selection = ?self.admin.as_ref().map(|admin| admin.user_id),
                pending_channel = ?self.admin.as_ref().and_then(|admin| admin.pending_channel),
                "Rendered dashboard"
            ),
            None => info!(
                screen = %self.screen,
                demo = self.demo,
                address = %self.address,
                users = ?self.user_labels,
                "Rendered screen"
            ),
        }
    }
}
