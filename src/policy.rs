//! Authorization decisions.
//!
//! Each endpoint states its rule as a composition of the functions below, e.g.
//! `owner(user, bill.resident_id).or(|| admin(user)).enforce()?`.

use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::Role,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny(String),
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow)
    }

    pub fn or(self, other: impl FnOnce() -> Decision) -> Decision {
        match self {
            Decision::Allow => Decision::Allow,
            Decision::Deny(reason) => match other() {
                Decision::Allow => Decision::Allow,
                Decision::Deny(other_reason) => Decision::Deny(format!("{reason}; {other_reason}")),
            },
        }
    }

    pub fn and(self, other: impl FnOnce() -> Decision) -> Decision {
        match self {
            Decision::Allow => other(),
            deny => deny,
        }
    }

    pub fn enforce(self) -> AppResult<()> {
        match self {
            Decision::Allow => Ok(()),
            Decision::Deny(reason) => {
                tracing::debug!(%reason, "request denied");
                Err(AppError::Forbidden(reason))
            }
        }
    }
}

pub fn admin(user: &AuthUser) -> Decision {
    if user.role == Role::Admin {
        Decision::Allow
    } else {
        Decision::Deny("admin role required".into())
    }
}

pub fn resident(user: &AuthUser) -> Decision {
    if user.role == Role::Resident {
        Decision::Allow
    } else {
        Decision::Deny("resident role required".into())
    }
}

pub fn owner(user: &AuthUser, owner_id: Uuid) -> Decision {
    if user.user_id == owner_id {
        Decision::Allow
    } else {
        Decision::Deny("resource belongs to another resident".into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn owner_or_admin() {
        let resident_id = Uuid::new_v4();
        let owner_user = AuthUser::resident(resident_id);
        let stranger = AuthUser::resident(Uuid::new_v4());
        let admin_user = AuthUser::admin(Uuid::new_v4());

        let rule = |u: &AuthUser| owner(u, resident_id).or(|| admin(u));
        assert!(rule(&owner_user).is_allowed());
        assert!(rule(&admin_user).is_allowed());
        assert!(!rule(&stranger).is_allowed());
    }

    #[test]
    fn and_short_circuits_on_deny() {
        let user = AuthUser::admin(Uuid::new_v4());
        let decision = resident(&user).and(|| -> Decision { panic!("must not be evaluated") });
        assert_eq!(decision, Decision::Deny("resident role required".into()));
        assert!(matches!(decision.enforce(), Err(AppError::Forbidden(_))));
    }
}
