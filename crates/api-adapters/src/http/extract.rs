use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use domains::{DomainError, PageRequest, UserId};
use serde::Deserialize;

use super::error::ApiError;

/// Set by the upstream authentication layer.
pub const USER_HEADER: &str = "x-user-id";

/// The authenticated principal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurrentUser(pub UserId);

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get(USER_HEADER)
            .ok_or(ApiError::Unauthorized("missing x-user-id header"))?;
        let id = raw
            .to_str()
            .ok()
            .and_then(|value| value.trim().parse::<UserId>().ok())
            .ok_or(ApiError::Unauthorized("malformed x-user-id header"))?;
        Ok(CurrentUser(id))
    }
}

/// `?page=N`, 1-based; absent means the first page.
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<u64>,
}

impl PageQuery {
    pub fn request(&self) -> Result<PageRequest, DomainError> {
        match self.page {
            Some(page) => PageRequest::new(page),
            None => Ok(PageRequest::first()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    async fn extract(header: Option<&str>) -> Result<CurrentUser, ApiError> {
        let mut builder = Request::builder().uri("/");
        if let Some(value) = header {
            builder = builder.header(USER_HEADER, value);
        }
        let (mut parts, _) = builder.body(()).unwrap().into_parts();
        CurrentUser::from_request_parts(&mut parts, &()).await
    }

    #[tokio::test]
    async fn test_valid_header_yields_principal() {
        let id = UserId::new();
        let user = extract(Some(&id.to_string())).await.unwrap();
        assert_eq!(user, CurrentUser(id));
    }

    #[tokio::test]
    async fn test_missing_or_malformed_header_is_unauthorized() {
        assert!(matches!(extract(None).await, Err(ApiError::Unauthorized(_))));
        assert!(matches!(
            extract(Some("not-a-uuid")).await,
            Err(ApiError::Unauthorized(_))
        ));
    }

    #[test]
    fn test_page_zero_is_validation_error() {
        let query = PageQuery { page: Some(0) };
        assert!(matches!(query.request(), Err(DomainError::Validation(_))));
        assert_eq!(PageQuery::default().request().unwrap().number(), 1);
    }
}
