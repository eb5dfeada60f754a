pub mod raw_users;
pub mod users;
