mod listing;
mod permission;
mod post;
mod role;
mod tag;
mod user;

pub use listing::{ListQuery, Page, SortColumns};
pub use permission::{Permission, PermissionPayload};
pub use post::{Post, PostDetail, StorePost, UpdatePost};
pub use role::{Role, RolePayload, RolePermissions, SyncPermissions};
pub use tag::{Tag, TagPayload};
pub use user::{StoreUser, UpdateUser, User, UserSummary};
