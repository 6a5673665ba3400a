use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub username: String,
    pub password_hash: String,
    pub available_money: i64,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::purchased_items::Entity")]
    PurchasedItems,
}

impl Related<super::purchased_items::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PurchasedItems.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
