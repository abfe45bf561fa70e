pub use super::likes::Entity as Likes;
pub use super::posts::Entity as Posts;
pub use super::tokens::Entity as Tokens;
pub use super::users::Entity as Users;
