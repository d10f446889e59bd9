//! Dashboard side navigation.
//!
//! The active tab comes from the `tab` query parameter of the current location
//! (`/dashboard?tab=profile`). Admin-only tabs are hidden for everyone else.

use tracing::error;
use url::Url;

use super::{
    ApiClient, ClientError,
    session::{SessionAction, SessionState},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DashboardTab {
    Profile,
    Users,
    Comments,
}

impl DashboardTab {
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "profile" => Some(Self::Profile),
            "users" => Some(Self::Users),
            "comments" => Some(Self::Comments),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Profile => "profile",
            Self::Users => "users",
            Self::Comments => "comments",
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Profile => "Profile",
            Self::Users => "Users",
            Self::Comments => "Comments",
        }
    }

    const fn admin_only(self) -> bool {
        !matches!(self, Self::Profile)
    }

    #[must_use]
    pub fn link(self) -> String {
        format!("/dashboard?tab={}", self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SidebarItem {
    pub tab: DashboardTab,
    pub label: &'static str,
    pub link: String,
    pub active: bool,
    /// Small role badge next to the profile entry.
    pub badge: Option<&'static str>,
}

#[derive(Clone, Debug)]
pub struct Sidebar {
    active: Option<DashboardTab>,
}

impl Sidebar {
    /// Read the active tab from `location`; unknown or missing tabs select nothing.
    #[must_use]
    pub fn from_location(location: &Url) -> Self {
        let active = location
            .query_pairs()
            .find(|(key, _)| key == "tab")
            .and_then(|(_, value)| DashboardTab::parse(&value));
        Self { active }
    }

    /// # Errors
    /// Returns an error if `location` is not an absolute URL.
    pub fn parse(location: &str) -> Result<Self, ClientError> {
        Ok(Self::from_location(&Url::parse(location)?))
    }

    #[must_use]
    pub const fn active(&self) -> Option<DashboardTab> {
        self.active
    }

    #[must_use]
    pub fn items(&self, session: &SessionState) -> Vec<SidebarItem> {
        let is_admin = session.is_admin();
        [
            DashboardTab::Profile,
            DashboardTab::Users,
            DashboardTab::Comments,
        ]
        .into_iter()
        .filter(|tab| is_admin || !tab.admin_only())
        .map(|tab| SidebarItem {
            tab,
            label: tab.label(),
            link: tab.link(),
            active: self.active == Some(tab),
            badge: match tab {
                DashboardTab::Profile if is_admin => Some("admin"),
                DashboardTab::Profile => Some("user"),
                _ => None,
            },
        })
        .collect()
    }

    /// Sign out through the API. On success the session is cleared and the
    /// server message (toast text) is returned; failures are logged and returned.
    ///
    /// # Errors
    /// Returns the client error when the request fails.
    pub async fn sign_out(
        &self,
        client: &ApiClient,
        session: &mut SessionState,
    ) -> Result<String, ClientError> {
        match client.sign_out().await {
            Ok(message) => {
                session.dispatch(SessionAction::SignOutSuccess);
                Ok(message)
            }
            Err(err) => {
                error!("Sign out failed: {}", err.message());
                Err(err)
            }
        }
    }
}
