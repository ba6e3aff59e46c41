use crate::models::user::User;
use std::fmt;

/// Variant of the bind screen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindFlow {
    /// Pick an existing user to bind this device to
    SelectExisting,
    /// No users yet: create one, bind it and authenticate
    Register,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Screen {
    #[default]
    Connection,
    Bind(BindFlow),
    Dashboard,
}

impl Screen {
    /// Bind screen matching the server's user list
    pub fn bind_for(users: &[User]) -> Self {
        if users.is_empty() {
            Screen::Bind(BindFlow::Register)
        } else {
            Screen::Bind(BindFlow::SelectExisting)
        }
    }

    pub fn is_dashboard(&self) -> bool {
        matches!(self, Screen::Dashboard)
    }

    pub fn is_bind(&self) -> bool {
        matches!(self, Screen::Bind(_))
    }

    pub fn name(&self) -> &'static str {
        match self {
            Screen::Connection => "connection",
            Screen::Bind(BindFlow::SelectExisting) => "bind",
            Screen::Bind(BindFlow::Register) => "register",
            Screen::Dashboard => "dashboard",
        }
    }
}

impl fmt::Display for Screen {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
