use crate::models::user::User;

/// Ephemeral UI selections. Never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selections {
    /// The bound identity; always set on the dashboard
    pub current_user: Option<User>,
    pub bind_user: Option<User>,
    pub admin_user: Option<User>,
    pub delete_user: Option<User>,
    /// Pending, unconfirmed channel pick for `admin_user`
    pub assign_channel: Option<u8>,
}

/// Which selections a reconciliation dropped
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClearedSelections {
    pub current_user: bool,
    pub bind_user: bool,
    pub admin_user: bool,
    pub delete_user: bool,
    pub assign_channel: bool,
}

impl ClearedSelections {
    pub fn any(&self) -> bool {
        self.current_user || self.bind_user || self.admin_user || self.delete_user || self.assign_channel
    }
}

/// Re-resolve every selection by id against a fresh snapshot.
///
/// Selected users are replaced by their new version; ids missing from
/// `users` become `None`. The pending channel survives only while its admin
/// user does and no other user has taken the channel meanwhile.
pub fn reconcile_selections(old: &Selections, users: &[User]) -> Selections {
    let relocate = |selected: &Option<User>| -> Option<User> {
        let id = selected.as_ref()?.id;
        users.iter().find(|user| user.id == id).cloned()
    };

    let admin_user = relocate(&old.admin_user);
    let assign_channel = match (&admin_user, old.assign_channel) {
        (Some(admin), Some(channel)) => {
            let taken_by_other = users
                .iter()
                .any(|user| user.id != admin.id && user.channel() == Some(channel));
            (!taken_by_other).then_some(channel)
        }
        _ => None,
    };

    Selections {
        current_user: relocate(&old.current_user),
        bind_user: relocate(&old.bind_user),
        admin_user,
        delete_user: relocate(&old.delete_user),
        assign_channel,
    }
}

/// Selections that were set in `old` but not in `new`
pub fn cleared(old: &Selections, new: &Selections) -> ClearedSelections {
    ClearedSelections {
        current_user: old.current_user.is_some() && new.current_user.is_none(),
        bind_user: old.bind_user.is_some() && new.bind_user.is_none(),
        admin_user: old.admin_user.is_some() && new.admin_user.is_none(),
        delete_user: old.delete_user.is_some() && new.delete_user.is_none(),
        assign_channel: old.assign_channel.is_some() && new.assign_channel.is_none(),
    }
}
