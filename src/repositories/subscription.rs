use std::collections::HashSet;

use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::result::Error as DieselError;

use crate::models::{NewSubscription, Subscription};
use crate::schema::subscriptions::dsl::*;

pub fn create(
    conn: &mut PgConnection,
    new_sub: &NewSubscription,
) -> Result<Subscription, DieselError> {
    diesel::insert_into(subscriptions)
        .values(new_sub)
        .get_result(conn)
}

pub fn list_by_user(conn: &mut PgConnection, uid: i32) -> Result<Vec<Subscription>, DieselError> {
    subscriptions
        .filter(user_id.eq(uid))
        .order(created_at.desc())
        .load(conn)
}

pub fn exists_by_user_and_ticker(
    conn: &mut PgConnection,
    uid: i32,
    symbol: &str,
) -> Result<bool, DieselError> {
    let existing = subscriptions
        .filter(user_id.eq(uid))
        .filter(ticker.eq(symbol))
        .select(id)
        .first::<i32>(conn)
        .optional()?;
    Ok(existing.is_some())
}

pub fn delete_by_user_and_ticker(
    conn: &mut PgConnection,
    uid: i32,
    symbol: &str,
) -> Result<usize, DieselError> {
    diesel::delete(
        subscriptions
            .filter(user_id.eq(uid))
            .filter(ticker.eq(symbol)),
    )
    .execute(conn)
}

/// 查询全部订阅中出现过的去重 ticker 集合
pub fn list_all_unique_tickers(conn: &mut PgConnection) -> Result<HashSet<String>, DieselError> {
    let tickers: Vec<String> = subscriptions.select(ticker).distinct().load(conn)?;
    Ok(tickers.into_iter().collect())
}
