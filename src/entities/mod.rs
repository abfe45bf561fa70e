pub mod prelude;

pub mod likes;
pub mod posts;
pub mod tokens;
pub mod users;
