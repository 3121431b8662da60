use std::collections::HashSet;

use chrono::NaiveDateTime;
use diesel::prelude::*;

use crate::models::subscription::Subscription;
use crate::schema::users;

#[derive(Queryable, Selectable, Identifiable, Clone, Debug)]
#[diesel(table_name = users)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct User {
    pub id: i32,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: String,
    pub hashed_password: String,
    pub created_at: NaiveDateTime,
}

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = users)]
pub struct NewUser {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: String,
    pub hashed_password: String,
}

/// 分发任务使用的用户视图：用户及其全部订阅（预加载，避免循环查询）
#[derive(Debug, Clone)]
pub struct UserWithSubscriptions {
    pub user: User,
    pub subscriptions: Vec<Subscription>,
}

impl UserWithSubscriptions {
    pub fn ticker_set(&self) -> HashSet<String> {
        self.subscriptions
            .iter()
            .map(|s| s.ticker.clone())
            .collect()
    }
}
