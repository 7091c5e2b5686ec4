pub mod error;
pub mod extract;
pub mod handlers;
pub mod router;

pub use error::ApiError;
pub use extract::{CurrentUser, PageQuery, USER_HEADER};
pub use router::router;
