use sea_orm::entity::prelude::*;

/// Per-user UI settings with a shared default row.
///
/// Exactly one row carries `is_default = true`; freshly provisioned users
/// point at it. The default row is never mutated in place: when a user
/// changes a value, a private copy is forked for them (see
/// `crate::provisioning::update_settings`). Rows are deliberately not
/// cascade-deleted with their users.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "settings")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub dark_mode: bool,
    pub is_default: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::user::Entity")]
    User,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
