pub mod auth_service;
pub use auth_service::{AuthError, AuthService, AuthUser, NewUser, TokenGrant, UserSummary};

pub mod auth_service_impl;
pub use auth_service_impl::SeaOrmAuthService;

pub mod post_service;
pub use post_service::{LikeDetails, PostDetails, PostError, PostFeed, PostService};

pub mod post_service_impl;
pub use post_service_impl::SeaOrmPostService;
