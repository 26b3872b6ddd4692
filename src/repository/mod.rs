use std::future::Future;

use uuid::Uuid;

use crate::{
    error::Result,
    models::{ListQuery, Page},
};

mod auth;
mod permission;
mod post;
mod role;
mod sync_permission;
mod tag;
mod user;

pub use auth::AuthRepo;
pub use permission::PermissionRepo;
pub use post::PostRepo;
pub use role::RoleRepo;
pub use sync_permission::SyncPermissionRepo;
pub use tag::TagRepo;
pub use user::UserRepo;

/// `update` and `destroy` that match no live row are `Conflict`.
pub trait Resource {
    type Row;
    type Detail;
    type Store;
    type Update;

    fn index(
        &self,
        query: &ListQuery,
    ) -> impl Future<Output = Result<Page<Self::Detail>>> + Send;

    fn show(&self, id: Uuid) -> impl Future<Output = Result<Self::Detail>> + Send;

    fn store(&self, payload: Self::Store) -> impl Future<Output = Result<Self::Row>> + Send;

    fn update(
        &self,
        id: Uuid,
        payload: Self::Update,
    ) -> impl Future<Output = Result<Self::Row>> + Send;

    fn destroy(&self, id: Uuid) -> impl Future<Output = Result<Self::Row>> + Send;
}
