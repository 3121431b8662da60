pub mod subscription;
pub mod user;

pub use subscription::{NewSubscription, Subscription};
pub use user::{NewUser, User, UserWithSubscriptions};
