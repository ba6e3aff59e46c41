use crate::api::backend::{generate_token, Backend, Biometric};
use crate::api::client::ApiClient;
use crate::api::demo::DemoBackend;
use crate::connection::resolver::{validate, Resolver};
use crate::controller::refresh::{AppEvent, RefreshTimer};
use crate::controller::screen::Screen;
use crate::core::error::{ApiError, ClientError, ValidationError};
use crate::models::log_entry::LogEntry;
use crate::models::requests::{CreateUserRequest, UpdateUserRequest};
use crate::models::user::{is_valid_channel, User};
use crate::session::store::SessionStore;
use crate::validation::forms::NewUserForm;
use crate::view::model::{AssignmentChange, ViewModel};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tracing::{debug, info, warn};

const CHANNEL_CONFLICT_STATUS: u16 = 400;

/// Builds the backend for a normalized base URL
pub type BackendFactory = Box<dyn Fn(&str) -> anyhow::Result<Arc<dyn Backend>> + Send + Sync>;

/// HTTP backends with the given request timeout
pub fn http_backend_factory(timeout: Duration) -> BackendFactory {
    Box::new(move |base_url: &str| -> anyhow::Result<Arc<dyn Backend>> {
        let client = ApiClient::new(base_url.to_string(), timeout)?;
        Ok(Arc::new(client) as Arc<dyn Backend>)
    })
}

#[derive(Debug, Clone)]
pub struct ControllerSettings {
    pub resolver: Resolver,
    pub refresh_interval: Duration,
    pub enroll_followup: Duration,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self {
            resolver: Resolver::default(),
            refresh_interval: Duration::from_secs(10),
            enroll_followup: Duration::from_millis(2500),
        }
    }
}

/// Outcome of a successful action, for the presentation layer to announce
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    DemoEnabled,
    /// Stored token accepted
    Authenticated { user_id: u32 },
    /// No stored token; pick or register a user
    UsersLoaded { count: usize },
    /// Stored token rejected and cleared
    SessionExpired,
    Bound { user_id: u32 },
    Registered { user_id: u32 },
    UserCreated { user_id: u32 },
    UsersRefreshed { count: usize },
    UnlockRequested { channel: u8 },
    EnrollmentStarted { user_id: u32, kind: Biometric },
    UserDeleted { user_id: u32 },
    /// The bound user deleted themselves; back to bind
    SelfDeleted,
    PendingChannel(Option<u8>),
    ChannelUpdated { user_id: u32, channel: Option<u8> },
    ChannelUnchanged,
    Disconnected,
}

/// Screen state machine driving the view-model from backend responses.
///
/// Actions take `&mut self`, so they run one at a time on the event loop.
pub struct Controller {
    settings: ControllerSettings,
    session: SessionStore,
    factory: BackendFactory,
    backend: Option<(String, Arc<dyn Backend>)>,
    demo: Option<Arc<DemoBackend>>,
    screen: Screen,
    view: ViewModel,
    refresh: RefreshTimer,
}

impl Controller {
    /// Returns the controller and the receiving end of its event loop
    pub fn new(
        settings: ControllerSettings,
        session: SessionStore,
        factory: BackendFactory,
    ) -> (Self, UnboundedReceiver<AppEvent>) {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let refresh = RefreshTimer::new(settings.refresh_interval, events_tx);
        let controller = Self {
            settings,
            session,
            factory,
            backend: None,
            demo: None,
            screen: Screen::Connection,
            view: ViewModel::new(),
            refresh,
        };
        (controller, events_rx)
    }

    pub fn screen(&self) -> Screen {
        self.screen
    }

    pub fn view(&self) -> &ViewModel {
        &self.view
    }

    pub fn is_demo(&self) -> bool {
        self.demo.is_some()
    }

    pub fn is_refreshing(&self) -> bool {
        self.refresh.is_running()
    }

    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    /// Address to pre-fill the connection field with
    pub fn display_address(&self) -> String {
        self.settings.resolver.display_address(&self.session)
    }

    fn show(&mut self, screen: Screen) {
        if screen.is_dashboard() && self.view.current_user().is_none() {
            warn!("Refusing to show dashboard without a bound user");
            return;
        }
        if screen != self.screen {
            info!(from = %self.screen, to = %screen, demo = self.is_demo(), "Screen transition");
        }
        self.screen = screen;

        if screen.is_dashboard() {
            self.view.default_admin_selection();
            self.refresh.start();
        } else {
            self.refresh.stop();
        }
    }

    fn enter_dashboard(&mut self, user: User) {
        self.view.set_current_user(Some(user));
        self.show(Screen::Dashboard);
    }

    fn backend(&mut self) -> Result<Arc<dyn Backend>, ClientError> {
        if let Some(demo) = &self.demo {
            return Ok(Arc::clone(demo) as Arc<dyn Backend>);
        }

        let base_url = self.settings.resolver.resolve(&self.session);
        if base_url.is_empty() {
            return Err(ValidationError::MissingBaseUrl.into());
        }
        if let Some((url, backend)) = &self.backend {
            if *url == base_url {
                return Ok(Arc::clone(backend));
            }
        }

        let backend = (self.factory)(&base_url)
            .map_err(|e| ApiError::Transport(format!("{:#}", e)))?;
        self.backend = Some((base_url, Arc::clone(&backend)));
        Ok(backend)
    }

    fn persist_token(&self, token: &str) -> Result<(), ClientError> {
        if !self.is_demo() {
            self.session.save_token(token)?;
        }
        Ok(())
    }

    fn forget_token(&self) {
        if self.is_demo() {
            return;
        }
        if let Err(e) = self.session.clear_token() {
            warn!(error = %e, "Failed to clear stored token");
        }
    }

    /// Switch to the offline demo backend with its seeded users
    pub fn enable_demo_mode(&mut self) -> Notice {
        let demo = Arc::new(DemoBackend::new());
        self.demo = Some(demo);
        self.view.clear_selections();
        self.view.apply_snapshot(crate::api::demo::seed_users());
        info!(users = self.view.users().len(), "Demo mode enabled");
        self.show(Screen::bind_for(self.view.users()));
        Notice::DemoEnabled
    }

    /// Normalize and persist `address`, then authenticate silently with a
    /// stored token or fall through to the bind flow.
    pub async fn connect(&mut self, address: &str) -> Result<Notice, ClientError> {
        if self.is_demo() {
            self.show(Screen::bind_for(self.view.users()));
            return Ok(Notice::DemoEnabled);
        }

        let mut base_url = self.settings.resolver.normalize(address);
        if base_url.is_empty() {
            base_url = self.settings.resolver.resolve(&self.session);
        }
        validate(&base_url)?;
        self.session.save_url(&base_url)?;
        info!(base_url = %base_url, "Connecting to backend");

        let backend = self.backend()?;
        let token = self.session.load_token();
        if token.is_empty() {
            let count = self.load_users_for_bind().await?;
            return Ok(Notice::UsersLoaded { count });
        }

        match backend.auth(&token).await {
            Ok(user) => {
                info!(user_id = user.id, "Stored token accepted");
                let user_id = user.id;
                self.enter_dashboard(user);
                self.refresh_quietly().await;
                Ok(Notice::Authenticated { user_id })
            }
            Err(e) if e.is_transport() => Err(e.into()),
            Err(e) => {
                info!(error = %e, "Stored token rejected, falling back to bind");
                self.forget_token();
                self.view.set_current_user(None);
                self.load_users_for_bind().await?;
                Ok(Notice::SessionExpired)
            }
        }
    }

    async fn load_users_for_bind(&mut self) -> Result<usize, ClientError> {
        let backend = self.backend()?;
        let users = backend.list_users().await?;
        let count = users.len();
        self.view.apply_snapshot(users);
        self.show(Screen::bind_for(self.view.users()));
        Ok(count)
    }

    /// Leave for the connection screen
    pub fn disconnect(&mut self) -> Notice {
        self.show(Screen::Connection);
        Notice::Disconnected
    }

    pub fn select_bind_user(&mut self, user_id: u32) -> Result<(), ClientError> {
        Ok(self.view.select_bind_user(user_id)?)
    }

    pub fn select_admin_user(&mut self, user_id: u32) -> Result<(), ClientError> {
        Ok(self.view.select_admin_user(user_id)?)
    }

    pub fn select_delete_user(&mut self, user_id: u32) -> Result<(), ClientError> {
        Ok(self.view.select_delete_user(user_id)?)
    }

    /// Bind this device to the selected user with a fresh token
    pub async fn bind_selected_user(&mut self) -> Result<Notice, ClientError> {
        let user = self.view.bind_user().cloned().ok_or(ValidationError::NoSelection)?;
        let backend = self.backend()?;

        let token = generate_token();
        backend.bind_device(user.id, &token).await?;
        self.persist_token(&token)?;
        info!(user_id = user.id, "Device bound");

        let user_id = user.id;
        self.enter_dashboard(user);
        self.refresh_quietly().await;
        Ok(Notice::Bound { user_id })
    }

    /// Create a user, bind it and authenticate. The dashboard is only shown
    /// once all three calls succeeded.
    pub async fn register(&mut self, form: &NewUserForm) -> Result<Notice, ClientError> {
        let request = form.validate()?;
        let backend = self.backend()?;

        let created = create_user(backend.as_ref(), &request).await?;
        info!(user_id = created.id, "User registered");

        match self.bind_and_authenticate(backend.as_ref(), created.id).await {
            Ok(user) => {
                let user_id = user.id;
                self.enter_dashboard(user);
                self.refresh_quietly().await;
                Ok(Notice::Registered { user_id })
            }
            Err(e) => {
                warn!(user_id = created.id, error = %e, "Registration incomplete");
                // The new user exists now; show it in the bind list
                if let Err(reload) = self.load_users_for_bind().await {
                    debug!(error = %reload, "Could not reload users after failed registration");
                    self.show(Screen::bind_for(self.view.users()));
                }
                Err(e)
            }
        }
    }

    async fn bind_and_authenticate(&mut self, backend: &dyn Backend, user_id: u32) -> Result<User, ClientError> {
        let token = generate_token();
        backend.bind_device(user_id, &token).await?;
        self.persist_token(&token)?;

        match backend.auth(&token).await {
            Ok(user) => Ok(user),
            Err(e) => {
                self.forget_token();
                Err(e.into())
            }
        }
    }

    /// Admin form: create a user without binding it
    pub async fn create_user(&mut self, form: &NewUserForm) -> Result<Notice, ClientError> {
        let request = form.validate()?;
        let backend = self.backend()?;

        let created = create_user(backend.as_ref(), &request).await?;
        info!(user_id = created.id, name = %created.name, "User created");
        self.refresh_quietly().await;
        Ok(Notice::UserCreated { user_id: created.id })
    }

    /// Re-fetch the user list and re-resolve selections
    pub async fn refresh_users(&mut self) -> Result<Notice, ClientError> {
        let backend = self.backend()?;
        let users = backend.list_users().await?;
        let count = users.len();
        let dropped = self.view.apply_snapshot(users);

        match self.screen {
            Screen::Dashboard if dropped.current_user => {
                warn!("Bound user no longer exists, returning to bind");
                self.forget_token();
                self.show(Screen::bind_for(self.view.users()));
            }
            Screen::Bind(_) => self.show(Screen::bind_for(self.view.users())),
            _ => {}
        }

        debug!(users = count, screen = %self.screen, "Users refreshed");
        Ok(Notice::UsersRefreshed { count })
    }

    /// Background refresh: failures are logged, never surfaced
    async fn refresh_quietly(&mut self) {
        if let Err(e) = self.refresh_users().await {
            debug!(error = %e, "Background refresh failed");
        }
    }

    /// Handle an event from the loop. Returns false for events that are no
    /// longer relevant (stale generation or dashboard left).
    pub async fn handle_event(&mut self, event: AppEvent) -> bool {
        if !self.screen.is_dashboard() || !self.refresh.is_current(&event) {
            debug!(?event, screen = %self.screen, "Dropping stale event");
            return false;
        }
        self.refresh_quietly().await;
        true
    }

    fn current_user(&self) -> Result<User, ClientError> {
        self.view
            .current_user()
            .cloned()
            .ok_or(ClientError::NotReady("no bound user"))
    }

    /// Unlock the bound user's own channel
    pub async fn unlock_own_channel(&mut self) -> Result<Notice, ClientError> {
        let user = self.current_user()?;
        let channel = user.channel().ok_or(ClientError::ChannelUnavailable)?;
        self.unlock(channel).await
    }

    /// Unlock any channel (admin hardware panel)
    pub async fn unlock_channel(&mut self, channel: u8) -> Result<Notice, ClientError> {
        if !is_valid_channel(channel) {
            return Err(ValidationError::ChannelOutOfRange(i64::from(channel)).into());
        }
        self.unlock(channel).await
    }

    async fn unlock(&mut self, channel: u8) -> Result<Notice, ClientError> {
        let backend = self.backend()?;
        backend.unlock(channel).await?;
        info!(channel, "Unlock requested");
        Ok(Notice::UnlockRequested { channel })
    }

    /// Start enrollment for the bound user
    pub async fn enroll_self(&mut self, kind: Biometric) -> Result<Notice, ClientError> {
        let user = self.current_user()?;
        self.enroll(kind, user.id, None).await
    }

    /// Start enrollment for the user selected in the admin panel
    pub async fn enroll_selected(&mut self, kind: Biometric, finger_label: Option<&str>) -> Result<Notice, ClientError> {
        let user = self.view.admin_user().cloned().ok_or(ValidationError::NoSelection)?;
        self.enroll(kind, user.id, finger_label).await
    }

    async fn enroll(&mut self, kind: Biometric, user_id: u32, finger_label: Option<&str>) -> Result<Notice, ClientError> {
        let backend = self.backend()?;
        backend.enroll(kind, user_id, finger_label).await?;
        info!(user_id, ?kind, "Enrollment command accepted");

        self.refresh_quietly().await;
        self.refresh.schedule_once(self.settings.enroll_followup);
        Ok(Notice::EnrollmentStarted { user_id, kind })
    }

    /// Delete the bound user; the device returns to the bind flow
    pub async fn delete_current_user(&mut self) -> Result<Notice, ClientError> {
        let user = self.current_user()?;
        let backend = self.backend()?;
        backend.delete_user(user.id).await?;
        info!(user_id = user.id, "Bound user deleted");

        self.leave_after_self_delete().await;
        Ok(Notice::SelfDeleted)
    }

    async fn leave_after_self_delete(&mut self) {
        self.forget_token();
        self.view.set_current_user(None);
        self.show(Screen::bind_for(self.view.users()));
        self.refresh_quietly().await;
    }

    /// Delete the user selected in the admin panel
    pub async fn delete_selected_user(&mut self) -> Result<Notice, ClientError> {
        let user = self.view.delete_user().cloned().ok_or(ValidationError::NoSelection)?;
        let backend = self.backend()?;
        backend.delete_user(user.id).await?;
        info!(user_id = user.id, "User deleted");
        self.view.clear_delete_selection();

        if self.view.current_user().is_some_and(|current| current.id == user.id) {
            self.leave_after_self_delete().await;
            return Ok(Notice::SelfDeleted);
        }
        self.refresh_quietly().await;
        Ok(Notice::UserDeleted { user_id: user.id })
    }

    /// Stage a channel for the selected admin user; see
    /// [`ViewModel::toggle_assign_channel`]
    pub fn toggle_assign_channel(&mut self, channel: u8) -> Result<Notice, ClientError> {
        let pending = self.view.toggle_assign_channel(channel)?;
        Ok(Notice::PendingChannel(pending))
    }

    /// Submit the staged channel. No pending pick on an assigned user
    /// releases the channel.
    pub async fn assign_admin_channel(&mut self) -> Result<Notice, ClientError> {
        let change = self.view.pending_assignment()?;
        let user = self.view.admin_user().cloned().ok_or(ValidationError::NoSelection)?;

        let request = match change {
            AssignmentChange::Unchanged => return Ok(Notice::ChannelUnchanged),
            AssignmentChange::Assign(channel) => UpdateUserRequest::assign_channel(channel),
            AssignmentChange::Release => UpdateUserRequest::release_channel(),
        };

        let backend = self.backend()?;
        let updated = match backend.update_user(user.id, &request).await {
            Ok(updated) => updated,
            Err(ApiError::Status(CHANNEL_CONFLICT_STATUS)) => {
                if let AssignmentChange::Assign(channel) = change {
                    return Err(ClientError::ChannelOccupied(channel));
                }
                return Err(ApiError::Status(CHANNEL_CONFLICT_STATUS).into());
            }
            Err(e) => return Err(e.into()),
        };

        let channel = updated.channel();
        info!(user_id = updated.id, channel = ?channel, "Channel assignment updated");
        self.view.confirm_assignment(updated);
        self.refresh_quietly().await;
        Ok(Notice::ChannelUpdated {
            user_id: user.id,
            channel,
        })
    }

    pub async fn fetch_logs(&mut self, limit: u32) -> Result<Vec<LogEntry>, ClientError> {
        let backend = self.backend()?;
        Ok(backend.get_logs(limit).await?)
    }
}

/// `create_user` with HTTP 400 on a requested channel reported as a conflict
async fn create_user(backend: &dyn Backend, request: &CreateUserRequest) -> Result<User, ClientError> {
    match (backend.create_user(request).await, request.assigned_channel) {
        (Ok(user), _) => Ok(user),
        (Err(ApiError::Status(CHANNEL_CONFLICT_STATUS)), Some(channel)) => Err(ClientError::ChannelOccupied(channel)),
        (Err(e), _) => Err(e.into()),
    }
}
