use sea_orm::entity::prelude::*;

/// Server-side record of an issued refresh token, keyed by the JWT's jti
/// claim. A token is redeemable only while its row is unrevoked and
/// unexpired; rotation revokes the old row and inserts the new one in a
/// single transaction, so a consumed token can never be replayed.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "refresh_tokens")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub jti: String,
    pub user_id: i32,
    pub expires_at: DateTimeUtc,
    pub revoked: bool,
    pub created: DateTimeUtc,
}

impl Model {
    /// Whether this token may still be redeemed at `now`.
    pub fn is_live(&self, now: DateTimeUtc) -> bool {
        !self.revoked && self.expires_at > now
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id",
        on_update = "Cascade",
        on_delete = "Cascade"
    )]
    User,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
