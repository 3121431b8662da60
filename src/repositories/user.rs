use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::result::Error as DieselError;

use crate::models::{NewUser, Subscription, User, UserWithSubscriptions};
use crate::schema::{subscriptions, users};

pub fn create(conn: &mut PgConnection, new_user: &NewUser) -> Result<User, DieselError> {
    diesel::insert_into(users::table)
        .values(new_user)
        .get_result(conn)
}

pub fn find_by_id(conn: &mut PgConnection, uid: i32) -> Result<Option<User>, DieselError> {
    users::table.find(uid).first::<User>(conn).optional()
}

pub fn find_by_email(
    conn: &mut PgConnection,
    email_addr: &str,
) -> Result<Option<User>, DieselError> {
    users::table
        .filter(users::email.eq(email_addr))
        .first::<User>(conn)
        .optional()
}

pub fn exists_by_email(conn: &mut PgConnection, email_addr: &str) -> Result<bool, DieselError> {
    let existing = users::table
        .filter(users::email.eq(email_addr))
        .select(users::id)
        .first::<i32>(conn)
        .optional()?;
    Ok(existing.is_some())
}

/// 查询所有至少有一条订阅的用户，并预加载其订阅列表
pub fn list_for_dispatch(
    conn: &mut PgConnection,
) -> Result<Vec<UserWithSubscriptions>, DieselError> {
    let subscriber_ids = subscriptions::table
        .select(subscriptions::user_id)
        .distinct();
    let dispatch_users: Vec<User> = users::table
        .filter(users::id.eq_any(subscriber_ids))
        .load(conn)?;

    let subs: Vec<Subscription> = Subscription::belonging_to(&dispatch_users).load(conn)?;
    let grouped = subs.grouped_by(&dispatch_users);

    Ok(dispatch_users
        .into_iter()
        .zip(grouped)
        .map(|(user, subscriptions)| UserWithSubscriptions {
            user,
            subscriptions,
        })
        .collect())
}
