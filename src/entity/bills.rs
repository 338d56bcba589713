use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "bills")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub resident_id: Uuid,
    pub amount: i64,
    pub issue_date: Date,
    pub due_date: Date,
    pub bill_type: String,
    pub payment_status: String,
    pub paid_at: Option<DateTimeWithTimeZone>,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::bill_lines::Entity")]
    BillLines,
}

impl Related<super::bill_lines::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::BillLines.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
