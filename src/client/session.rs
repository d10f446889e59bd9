//! Client-side session state, driven by dispatched actions.

use super::types::SessionUser;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionAction {
    SignInStart,
    SignInSuccess(SessionUser),
    UpdateSuccess(SessionUser),
    SignOutSuccess,
    Failure(String),
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SessionState {
    pub current_user: Option<SessionUser>,
    pub error: Option<String>,
    pub loading: bool,
}

impl SessionState {
    pub fn dispatch(&mut self, action: SessionAction) {
        match action {
            SessionAction::SignInStart => {
                self.loading = true;
                self.error = None;
            }
            SessionAction::SignInSuccess(user) | SessionAction::UpdateSuccess(user) => {
                self.current_user = Some(user);
                self.loading = false;
                self.error = None;
            }
            SessionAction::SignOutSuccess => {
                self.current_user = None;
                self.loading = false;
                self.error = None;
            }
            SessionAction::Failure(message) => {
                self.loading = false;
                self.error = Some(message);
            }
        }
    }

    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.current_user.as_ref().is_some_and(|user| user.is_admin)
    }
}
