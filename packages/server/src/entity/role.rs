use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

pub const ADMIN: &str = "admin";
pub const EDITOR: &str = "editor";
pub const SUBSCRIBER: &str = "subscriber";

/// Roles created on every startup.
pub const BUILTIN: &[&str] = &[ADMIN, EDITOR, SUBSCRIBER];

/// Self-registered accounts start here: they can read and receive
/// notifications but cannot author anything.
pub const DEFAULT_ROLE: &str = SUBSCRIBER;

/// A named bundle of permissions. Users reference it by name.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "role")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub name: String,

    #[sea_orm(has_many)]
    pub members: HasMany<super::user::Entity>,

    #[sea_orm(has_many)]
    pub grants: HasMany<super::role_permission::Entity>,
}

impl ActiveModelBehavior for ActiveModel {}
