//! User and group lookup for server definitions

use nix::unistd::{Gid, Group, Uid, User};

use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserInfo {
    pub name: String,
    pub uid: u32,
    pub gid: u32,
}

/// OS user directory
pub trait UserDirectory: Send + Sync {
    fn lookup_user(&self, name: &str) -> Result<UserInfo>;

    fn current_user(&self) -> Result<UserInfo>;

    fn primary_group(&self, user: &UserInfo) -> Result<String>;
}

/// Directory backed by the system user database
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemUserDirectory;

impl From<User> for UserInfo {
    fn from(user: User) -> Self {
        Self {
            name: user.name,
            uid: user.uid.as_raw(),
            gid: user.gid.as_raw(),
        }
    }
}

impl UserDirectory for SystemUserDirectory {
    fn lookup_user(&self, name: &str) -> Result<UserInfo> {
        User::from_name(name)
            .map_err(|e| Error::UserLookup(format!("user {}: {}", name, e)))?
            .map(UserInfo::from)
            .ok_or_else(|| Error::UserLookup(format!("user {} does not exist", name)))
    }

    fn current_user(&self) -> Result<UserInfo> {
        let uid = Uid::current();
        User::from_uid(uid)
            .map_err(|e| Error::UserLookup(format!("uid {}: {}", uid, e)))?
            .map(UserInfo::from)
            .ok_or_else(|| Error::UserLookup(format!("no user for current uid {}", uid)))
    }

    fn primary_group(&self, user: &UserInfo) -> Result<String> {
        let gid = Gid::from_raw(user.gid);
        Group::from_gid(gid)
            .map_err(|e| Error::UserLookup(format!("gid {}: {}", gid, e)))?
            .map(|group| group.name)
            .ok_or_else(|| {
                Error::UserLookup(format!("no group {} for user {}", gid, user.name))
            })
    }
}
