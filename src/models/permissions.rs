use serde::{Deserialize, Serialize};

use crate::models::{CellValue, ReferenceId};

/// A single operation a caller may request against a row or type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Capability {
    Peek,
    Read,
    Create,
    Update,
    Delete,
    Execute,
    Refer,
}

impl Capability {
    fn offset(self) -> u32 {
        match self {
            Capability::Peek => 0,
            Capability::Read => 1,
            Capability::Create => 2,
            Capability::Update => 3,
            Capability::Delete => 4,
            Capability::Execute => 5,
            Capability::Refer => 6,
        }
    }
}

/// 21-bit permission mask: three 7-bit capability fields, guest at bits
/// 0-6, user at 7-13, group at 14-20.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct AuthPermission(pub i64);

const GUEST_SHIFT: u32 = 0;
const USER_SHIFT: u32 = 7;
const GROUP_SHIFT: u32 = 14;
const FIELD_MASK: i64 = 0b111_1111;

impl AuthPermission {
    pub const NONE: AuthPermission = AuthPermission(0);

    pub const GUEST_PEEK: AuthPermission = AuthPermission(1 << 0);
    pub const GUEST_READ: AuthPermission = AuthPermission(1 << 1);
    pub const GUEST_CREATE: AuthPermission = AuthPermission(1 << 2);
    pub const GUEST_UPDATE: AuthPermission = AuthPermission(1 << 3);
    pub const GUEST_DELETE: AuthPermission = AuthPermission(1 << 4);
    pub const GUEST_EXECUTE: AuthPermission = AuthPermission(1 << 5);
    pub const GUEST_REFER: AuthPermission = AuthPermission(1 << 6);

    pub const USER_PEEK: AuthPermission = AuthPermission(1 << 7);
    pub const USER_READ: AuthPermission = AuthPermission(1 << 8);
    pub const USER_CREATE: AuthPermission = AuthPermission(1 << 9);
    pub const USER_UPDATE: AuthPermission = AuthPermission(1 << 10);
    pub const USER_DELETE: AuthPermission = AuthPermission(1 << 11);
    pub const USER_EXECUTE: AuthPermission = AuthPermission(1 << 12);
    pub const USER_REFER: AuthPermission = AuthPermission(1 << 13);

    pub const GROUP_PEEK: AuthPermission = AuthPermission(1 << 14);
    pub const GROUP_READ: AuthPermission = AuthPermission(1 << 15);
    pub const GROUP_CREATE: AuthPermission = AuthPermission(1 << 16);
    pub const GROUP_UPDATE: AuthPermission = AuthPermission(1 << 17);
    pub const GROUP_DELETE: AuthPermission = AuthPermission(1 << 18);
    pub const GROUP_EXECUTE: AuthPermission = AuthPermission(1 << 19);
    pub const GROUP_REFER: AuthPermission = AuthPermission(1 << 20);

    pub const USER_CRUD: AuthPermission = AuthPermission(
        Self::USER_READ.0 | Self::USER_CREATE.0 | Self::USER_UPDATE.0 | Self::USER_DELETE.0,
    );
    pub const GROUP_CRUD: AuthPermission = AuthPermission(
        Self::GROUP_READ.0 | Self::GROUP_CREATE.0 | Self::GROUP_UPDATE.0 | Self::GROUP_DELETE.0,
    );

    /// Owner full, group read.
    pub const DEFAULT_PERMISSION: AuthPermission = AuthPermission(
        Self::USER_PEEK.0
            | Self::USER_CRUD.0
            | Self::USER_EXECUTE.0
            | Self::USER_REFER.0
            | Self::GROUP_READ.0,
    );

    pub fn union(self, other: AuthPermission) -> AuthPermission {
        AuthPermission(self.0 | other.0)
    }

    pub fn contains(self, other: AuthPermission) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn guest_allows(self, capability: Capability) -> bool {
        self.0 >> (GUEST_SHIFT + capability.offset()) & 1 == 1
    }

    pub fn user_allows(self, capability: Capability) -> bool {
        self.0 >> (USER_SHIFT + capability.offset()) & 1 == 1
    }

    pub fn group_allows(self, capability: Capability) -> bool {
        self.0 >> (GROUP_SHIFT + capability.offset()) & 1 == 1
    }

    /// Numeric cell to permission mask, accepting int, float, or numeric
    /// string. Fails open to no permission.
    pub fn from_cell(value: &CellValue) -> AuthPermission {
        match value.as_i64() {
            Some(i) => AuthPermission(i),
            None => {
                tracing::error!(message = "Invalid permission value", value = ?value);
                AuthPermission::NONE
            }
        }
    }

    /// The guest/user/group capability fields, low to high.
    pub fn fields(self) -> (i64, i64, i64) {
        (
            self.0 >> GUEST_SHIFT & FIELD_MASK,
            self.0 >> USER_SHIFT & FIELD_MASK,
            self.0 >> GROUP_SHIFT & FIELD_MASK,
        )
    }
}

impl std::ops::BitOr for AuthPermission {
    type Output = AuthPermission;

    fn bitor(self, rhs: AuthPermission) -> AuthPermission {
        self.union(rhs)
    }
}

/// One membership row of the object-to-usergroup join table, carrying the
/// join row's own permission mask. `relation_reference_id` identifies the
/// join row itself so membership can be revoked idempotently.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupPermission {
    pub group_reference_id: ReferenceId,
    pub object_reference_id: ReferenceId,
    pub relation_reference_id: ReferenceId,
    pub permission: AuthPermission,
}

/// The caller identity the gate evaluates against: the session user's
/// reference id plus the memberships attached to the session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionUser {
    pub user_reference_id: ReferenceId,
    pub groups: Vec<GroupPermission>,
}

/// Computed permission state of one row or type: the owning user, the group
/// memberships, and the row's own bit mask. Never persisted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PermissionInstance {
    pub owner: Option<ReferenceId>,
    pub groups: Vec<GroupPermission>,
    pub permission: AuthPermission,
}

impl PermissionInstance {
    /// The gate disjunction: the owner clause against the mask's user field,
    /// the guest clause against its guest field, and per membership entry
    /// the entry's guest field unconditionally plus its group field for
    /// groups the caller shares.
    pub fn can(
        &self,
        user: &ReferenceId,
        groups: &[GroupPermission],
        capability: Capability,
    ) -> bool {
        if let Some(owner) = &self.owner {
            if !user.is_null() && owner == user && self.permission.user_allows(capability) {
                return true;
            }
        }

        if self.permission.guest_allows(capability) {
            return true;
        }

        for entry in &self.groups {
            if entry.permission.guest_allows(capability) {
                return true;
            }
            let shared = groups
                .iter()
                .any(|g| g.group_reference_id == entry.group_reference_id);
            if shared && entry.permission.group_allows(capability) {
                return true;
            }
        }

        false
    }

    pub fn can_peek(&self, user: &ReferenceId, groups: &[GroupPermission]) -> bool {
        self.can(user, groups, Capability::Peek)
    }

    pub fn can_read(&self, user: &ReferenceId, groups: &[GroupPermission]) -> bool {
        self.can(user, groups, Capability::Read)
    }

    pub fn can_create(&self, user: &ReferenceId, groups: &[GroupPermission]) -> bool {
        self.can(user, groups, Capability::Create)
    }

    pub fn can_update(&self, user: &ReferenceId, groups: &[GroupPermission]) -> bool {
        self.can(user, groups, Capability::Update)
    }

    pub fn can_delete(&self, user: &ReferenceId, groups: &[GroupPermission]) -> bool {
        self.can(user, groups, Capability::Delete)
    }

    pub fn can_execute(&self, user: &ReferenceId, groups: &[GroupPermission]) -> bool {
        self.can(user, groups, Capability::Execute)
    }

    pub fn can_refer(&self, user: &ReferenceId, groups: &[GroupPermission]) -> bool {
        self.can(user, groups, Capability::Refer)
    }
}
