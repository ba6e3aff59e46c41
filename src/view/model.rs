use crate::core::error::{ClientError, ValidationError};
use crate::models::user::{Role, User};
use crate::stores::user_cache::{ChannelMap, UserCache};
use crate::validation::forms::check_channel;
use crate::view::selection::{cleared, reconcile_selections, ClearedSelections, Selections};
use tracing::debug;

/// Enrollment state shown on the biometric card
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BioSummary {
    Both,
    FaceOnly,
    FingerprintOnly,
    None,
}

impl BioSummary {
    pub fn of(user: &User) -> Self {
        match (user.has_face, user.has_fingerprint) {
            (true, true) => BioSummary::Both,
            (true, false) => BioSummary::FaceOnly,
            (false, true) => BioSummary::FingerprintOnly,
            (false, false) => BioSummary::None,
        }
    }
}

/// Which dashboard cards are visible
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Panels {
    pub status_card: bool,
    pub self_manage: bool,
    pub actions: bool,
    pub admin_menu: bool,
    pub admin_channels: bool,
    pub channel_map: bool,
}

impl Panels {
    pub fn for_role(role: Role) -> Self {
        let admin = role == Role::Admin;
        Self {
            status_card: !admin,
            self_manage: !admin,
            actions: !admin,
            admin_menu: admin,
            admin_channels: admin,
            channel_map: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DashboardView {
    pub user_id: u32,
    pub name: String,
    pub role: Role,
    pub biometrics: BioSummary,
    pub channel: Option<u8>,
    pub can_unlock: bool,
    pub panels: Panels,
    pub channel_map: ChannelMap,
}

/// Admin panel state for the selected user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminUserView {
    pub user_id: u32,
    pub label: String,
    pub has_face: bool,
    pub has_fingerprint: bool,
    /// Server-confirmed channel
    pub assigned_channel: Option<u8>,
    /// Channel picked in the UI, not yet submitted
    pub pending_channel: Option<u8>,
}

/// What `assign_admin_channel` would send
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignmentChange {
    Assign(u8),
    Release,
    Unchanged,
}

/// User cache plus selections, with every derived UI flag computed on demand
#[derive(Debug, Clone, Default)]
pub struct ViewModel {
    cache: UserCache,
    selections: Selections,
}

impl ViewModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn users(&self) -> &[User] {
        self.cache.users()
    }

    pub fn cache(&self) -> &UserCache {
        &self.cache
    }

    pub fn selections(&self) -> &Selections {
        &self.selections
    }

    pub fn current_user(&self) -> Option<&User> {
        self.selections.current_user.as_ref()
    }

    pub fn channel_map(&self) -> ChannelMap {
        self.cache.channel_map()
    }

    /// Replace the cache with a fresh fetch and re-resolve selections
    pub fn apply_snapshot(&mut self, users: Vec<User>) -> ClearedSelections {
        let reconciled = reconcile_selections(&self.selections, &users);
        let dropped = cleared(&self.selections, &reconciled);
        if dropped.any() {
            debug!(?dropped, "Selections cleared by refresh");
        }
        self.cache.replace(users);
        self.selections = reconciled;
        dropped
    }

    /// Apply a single user returned by a mutation, ahead of the next fetch
    pub fn apply_user(&mut self, user: User) {
        if let Some(cached) = self.cache.get_user_by_id_mut(user.id) {
            *cached = user.clone();
        }
        for slot in [
            &mut self.selections.current_user,
            &mut self.selections.bind_user,
            &mut self.selections.admin_user,
            &mut self.selections.delete_user,
        ] {
            if slot.as_ref().is_some_and(|selected| selected.id == user.id) {
                *slot = Some(user.clone());
            }
        }
    }

    /// Server confirmed an assignment: the pending pick now mirrors it
    pub fn confirm_assignment(&mut self, user: User) {
        if self.admin_user().is_some_and(|admin| admin.id == user.id) {
            self.selections.assign_channel = user.channel();
        }
        self.apply_user(user);
    }

    pub fn set_current_user(&mut self, user: Option<User>) {
        self.selections.current_user = user;
    }

    /// On entering the dashboard an admin with nothing selected manages themselves
    pub fn default_admin_selection(&mut self) {
        if self.selections.admin_user.is_some() {
            return;
        }
        if let Some(current) = self.current_user().filter(|user| user.is_admin()).cloned() {
            self.selections.assign_channel = current.channel();
            self.selections.admin_user = Some(current);
        }
    }

    pub fn clear_selections(&mut self) {
        self.selections = Selections::default();
    }

    pub fn clear_cache(&mut self) {
        self.cache.clear();
    }

    fn find(&self, user_id: u32) -> Result<User, ValidationError> {
        self.cache
            .get_user_by_id(user_id)
            .cloned()
            .ok_or(ValidationError::NoSelection)
    }

    pub fn select_bind_user(&mut self, user_id: u32) -> Result<(), ValidationError> {
        self.selections.bind_user = Some(self.find(user_id)?);
        Ok(())
    }

    pub fn bind_user(&self) -> Option<&User> {
        self.selections.bind_user.as_ref()
    }

    /// Select the user the admin panel acts on; seeds the pending channel
    /// from their confirmed assignment.
    pub fn select_admin_user(&mut self, user_id: u32) -> Result<(), ValidationError> {
        let user = self.find(user_id)?;
        self.selections.assign_channel = user.channel();
        self.selections.admin_user = Some(user);
        Ok(())
    }

    pub fn admin_user(&self) -> Option<&User> {
        self.selections.admin_user.as_ref()
    }

    pub fn select_delete_user(&mut self, user_id: u32) -> Result<(), ValidationError> {
        self.selections.delete_user = Some(self.find(user_id)?);
        Ok(())
    }

    pub fn delete_user(&self) -> Option<&User> {
        self.selections.delete_user.as_ref()
    }

    pub fn clear_delete_selection(&mut self) {
        self.selections.delete_user = None;
    }

    pub fn pending_channel(&self) -> Option<u8> {
        self.selections.assign_channel
    }

    /// Toggle the pending channel for the selected admin user.
    ///
    /// Picking a channel held by another user is rejected; picking the
    /// pending channel again clears it. Returns the new pending value.
    pub fn toggle_assign_channel(&mut self, channel: u8) -> Result<Option<u8>, ClientError> {
        let channel = check_channel(i64::from(channel))?;
        let admin_id = self
            .selections
            .admin_user
            .as_ref()
            .map(|user| user.id)
            .ok_or(ValidationError::NoSelection)?;

        if let Some(holder) = self.cache.channel_holder(channel) {
            if holder.id != admin_id {
                return Err(ClientError::ChannelOccupied(channel));
            }
        }

        let pending = &mut self.selections.assign_channel;
        *pending = if *pending == Some(channel) { None } else { Some(channel) };
        Ok(*pending)
    }

    /// The update `assign_admin_channel` should submit for the selected user
    pub fn pending_assignment(&self) -> Result<AssignmentChange, ValidationError> {
        let admin = self.admin_user().ok_or(ValidationError::NoSelection)?;
        Ok(match (self.selections.assign_channel, admin.channel()) {
            (Some(pending), _) => AssignmentChange::Assign(pending),
            (None, Some(_)) => AssignmentChange::Release,
            (None, None) => AssignmentChange::Unchanged,
        })
    }

    pub fn dashboard(&self) -> Option<DashboardView> {
        let user = self.current_user()?;
        let channel = user.channel();
        Some(DashboardView {
            user_id: user.id,
            name: user.name.clone(),
            role: user.role(),
            biometrics: BioSummary::of(user),
            channel,
            can_unlock: channel.is_some(),
            panels: Panels::for_role(user.role()),
            channel_map: self.channel_map(),
        })
    }

    pub fn admin_user_view(&self) -> Option<AdminUserView> {
        let user = self.admin_user()?;
        Some(AdminUserView {
            user_id: user.id,
            label: user.label(),
            has_face: user.has_face,
            has_fingerprint: user.has_fingerprint,
            assigned_channel: user.channel(),
            pending_channel: self.selections.assign_channel,
        })
    }
}
