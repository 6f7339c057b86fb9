//! Screen navigation guard.

use crate::identity::{AdminGuard, SessionStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Screen {
    Login,
    Home,
    RiskBase,
    Matrices,
    CreateUser,
}

impl Screen {
    pub fn as_str(&self) -> &'static str {
        match self {
            Screen::Login => "login",
            Screen::Home => "home",
            Screen::RiskBase => "riskbase",
            Screen::Matrices => "matrices",
            Screen::CreateUser => "create-user",
        }
    }

    pub fn requires_admin(&self) -> bool {
        matches!(self, Screen::Matrices)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Navigation {
    Proceed(Screen),
    RedirectToLogin,
    Denied,
}

/// Decide where a request for `target` lands. Every screen except login needs a credential;
/// admin-only screens additionally need the admin role claim.
pub fn navigate(session: &SessionStore, target: Screen) -> Navigation {
    if target == Screen::Login {
        return Navigation::Proceed(Screen::Login);
    }
    if !session.is_authenticated() {
        return Navigation::RedirectToLogin;
    }
    if target.requires_admin() && !AdminGuard::new(session).is_admin() {
        return Navigation::Denied;
    }
    Navigation::Proceed(target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use base64::Engine;

    const ALL: [Screen; 5] = [Screen::Login, Screen::Home, Screen::RiskBase, Screen::Matrices, Screen::CreateUser];

    fn with_role(role: &str) -> SessionStore {
        let s = SessionStore::in_memory();
        let payload = URL_SAFE_NO_PAD.encode(format!(r#"{{"sub":"u@x","role":"{}"}}"#, role));
        s.set_credential(&format!("eyJhbGciOiJIUzI1NiJ9.{}.c2ln", payload), "bearer").unwrap();
        s
    }

    #[test]
    fn anonymous_only_reaches_login() {
        let s = SessionStore::in_memory();
        for screen in ALL {
            let nav = navigate(&s, screen);
            if screen == Screen::Login {
                assert_eq!(nav, Navigation::Proceed(Screen::Login));
            } else {
                assert_eq!(nav, Navigation::RedirectToLogin, "{}", screen.as_str());
            }
        }
    }

    #[test]
    fn matrices_need_admin() {
        assert_eq!(navigate(&with_role("user"), Screen::Matrices), Navigation::Denied);
        assert_eq!(navigate(&with_role("user"), Screen::RiskBase), Navigation::Proceed(Screen::RiskBase));
        assert_eq!(navigate(&with_role("admin"), Screen::Matrices), Navigation::Proceed(Screen::Matrices));
    }

    #[test]
    fn undecodable_token_still_counts_as_logged_in() {
        let s = SessionStore::in_memory();
        s.set_credential("opaque", "bearer").unwrap();
        assert_eq!(navigate(&s, Screen::Home), Navigation::Proceed(Screen::Home));
        assert_eq!(navigate(&s, Screen::Matrices), Navigation::Denied);
    }
}
