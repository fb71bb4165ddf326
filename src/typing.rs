use std::time::Duration;

use tokio::time::Instant;

use crate::models::UserRef;

pub const TYPING_EXPIRY: Duration = Duration::from_millis(3000);

/// Users currently typing in the open conversation.
///
/// The whole set is cleared one flat expiry window after the most recent
/// update; every update re-arms the window. There is no per-user timeout and
/// no explicit "stopped typing" signal.
#[derive(Debug, Clone)]
pub struct TypingIndicator {
    users: Vec<UserRef>,
    expires_at: Option<Instant>,
    expiry: Duration,
}

impl Default for TypingIndicator {
    fn default() -> Self {
        Self::new(TYPING_EXPIRY)
    }
}

impl TypingIndicator {
    pub fn new(expiry: Duration) -> Self {
        Self {
            users: Vec::new(),
            expires_at: None,
            expiry,
        }
    }

    /// Records that `user` is typing and re-arms the expiry window.
    pub fn observe(&mut self, user: UserRef, now: Instant) {
        self.expire(now);
        if !self.users.iter().any(|u| u.id == user.id) {
            self.users.push(user);
        }
        self.expires_at = Some(now + self.expiry);
    }

    /// Clears the set if the window has elapsed. Returns whether it did.
    pub fn expire(&mut self, now: Instant) -> bool {
        match self.expires_at {
            Some(deadline) if now >= deadline => {
                self.users.clear();
                self.expires_at = None;
                true
            }
            _ => false,
        }
    }

    pub fn active(&mut self, now: Instant) -> &[UserRef] {
        self.expire(now);
        &self.users
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.expires_at
    }

    pub fn clear(&mut self) {
        self.users.clear();
        self.expires_at = None;
    }

    /// "alice is typing", "alice and bob are typing", "3 people are typing".
    pub fn label(&mut self, now: Instant) -> Option<String> {
        let names: Vec<String> = self.active(now).iter().map(|u| u.display_name()).collect();
        match names.as_slice() {
            [] => None,
            [one] => Some(format!("{one} is typing")),
            [a, b] => Some(format!("{a} and {b} are typing")),
            many => Some(format!("{} people are typing", many.len())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clears_exactly_one_window_after_last_update() {
        let t0 = Instant::now();
        let mut typing = TypingIndicator::default();

        typing.observe(UserRef::new(2, "alice"), t0);
        typing.observe(UserRef::new(3, "bob"), t0 + Duration::from_millis(2000));

        // 3000ms after the first update: still visible
        assert_eq!(typing.active(t0 + Duration::from_millis(3000)).len(), 2);
        assert_eq!(typing.active(t0 + Duration::from_millis(4999)).len(), 2);
        assert!(typing.active(t0 + Duration::from_millis(5000)).is_empty());
    }

    #[test]
    fn repeated_user_is_not_duplicated() {
        let t0 = Instant::now();
        let mut typing = TypingIndicator::default();
        typing.observe(UserRef::new(2, "alice"), t0);
        typing.observe(UserRef::new(2, "alice"), t0 + Duration::from_millis(100));

        assert_eq!(typing.label(t0 + Duration::from_millis(200)).as_deref(), Some("alice is typing"));
    }

    #[test]
    fn labels_scale_with_count() {
        let t0 = Instant::now();
        let mut typing = TypingIndicator::default();
        typing.observe(UserRef::new(2, "alice"), t0);
        typing.observe(UserRef::new(3, "bob"), t0);
        assert_eq!(typing.label(t0).as_deref(), Some("alice and bob are typing"));

        typing.observe(UserRef::new(4, "carol"), t0);
        assert_eq!(typing.label(t0).as_deref(), Some("3 people are typing"));
        assert_eq!(typing.label(t0 + TYPING_EXPIRY), None);
    }
}
