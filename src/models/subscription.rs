use chrono::NaiveDateTime;
use diesel::prelude::*;

use crate::models::user::User;
use crate::schema::subscriptions;

#[derive(Queryable, Selectable, Identifiable, Associations, Clone, Debug)]
#[diesel(table_name = subscriptions)]
#[diesel(belongs_to(User))]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Subscription {
    pub id: i32,
    pub user_id: i32,
    pub ticker: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = subscriptions)]
pub struct NewSubscription {
    pub user_id: i32,
    pub ticker: String,
}
