// app/src/auth/gate.rs

use crate::auth::AuthFailure;
use crate::models::{Identity, Role};

/// A set of roles, stored as a bitmask so named sets can be `const`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RoleSet(u8);

impl RoleSet {
  pub const EMPTY: RoleSet = RoleSet(0);
  pub const ADMIN_ONLY: RoleSet = RoleSet::of(&[Role::Admin]);
  pub const DOCTOR_ONLY: RoleSet = RoleSet::of(&[Role::Doctor]);
  pub const PATIENT_ONLY: RoleSet = RoleSet::of(&[Role::Patient]);
  pub const ADMIN_OR_DOCTOR: RoleSet = RoleSet::of(&[Role::Admin, Role::Doctor]);

  pub const fn of(roles: &[Role]) -> Self {
    let mut bits = 0;
    let mut i = 0;
    while i < roles.len() {
      bits |= Self::bit(roles[i]);
      i += 1;
    }
    RoleSet(bits)
  }

  const fn bit(role: Role) -> u8 {
    match role {
      Role::Admin => 1,
      Role::Doctor => 1 << 1,
      Role::Patient => 1 << 2,
    }
  }

  pub const fn with(self, role: Role) -> Self {
    RoleSet(self.0 | Self::bit(role))
  }

  pub const fn contains(self, role: Role) -> bool {
    self.0 & Self::bit(role) != 0
  }

  pub fn roles(self) -> impl Iterator<Item = Role> {
    [Role::Admin, Role::Doctor, Role::Patient]
      .into_iter()
      .filter(move |r| self.contains(*r))
  }
}

/// Allows the request when an identity is present and its role is in `required`.
pub fn authorize(identity: Option<&Identity>, required: RoleSet) -> Result<(), AuthFailure> {
  let identity = identity.ok_or(AuthFailure::Unauthenticated)?;
  if required.contains(identity.role) {
    Ok(())
  } else {
    Err(AuthFailure::Forbidden)
  }
}

/// Patients must have verified their email before using customer features.
/// Staff roles are exempt.
pub fn require_verified_email(identity: &Identity) -> Result<(), AuthFailure> {
  if identity.role == Role::Patient && !identity.email_verified {
    return Err(AuthFailure::EmailNotVerified);
  }
  Ok(())
}

/// Binds a route to a named role set at the type level.
pub trait RolePolicy {
  const ROLES: RoleSet;
}

pub struct AdminOnly;
pub struct DoctorOnly;
pub struct PatientOnly;
pub struct AdminOrDoctor;

impl RolePolicy for AdminOnly {
  const ROLES: RoleSet = RoleSet::ADMIN_ONLY;
}
impl RolePolicy for DoctorOnly {
  const ROLES: RoleSet = RoleSet::DOCTOR_ONLY;
}
impl RolePolicy for PatientOnly {
  const ROLES: RoleSet = RoleSet::PATIENT_ONLY;
}
impl RolePolicy for AdminOrDoctor {
  const ROLES: RoleSet = RoleSet::ADMIN_OR_DOCTOR;
}
