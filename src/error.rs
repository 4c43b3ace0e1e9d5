use axum::http::StatusCode;
use axum::response::IntoResponse;

pub type Result<T> = core::result::Result<T, Error>;

/// 业务层错误，直接映射为 4xx 响应。
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Not Found")]
    NotFound,

    #[error("Unauthorized")]
    Unauthorized,

    #[error("{0}")]
    Invalid(&'static str),
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),

    #[error(transparent)]
    Reqwest(#[from] reqwest::Error),

    #[error(transparent)]
    Api(#[from] ApiError),
}

impl IntoResponse for Error {
    fn into_response(self) -> axum::response::Response {
        match self {
            Error::Sqlx(e) => {
                tracing::error!(%e, "sqlx error");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
            }
            Error::Reqwest(e) => {
                tracing::error!(%e, "upstream request error");
                (StatusCode::BAD_GATEWAY, "Bad Gateway").into_response()
            }
            Error::Api(api_error) => match api_error {
                ApiError::NotFound => (StatusCode::NOT_FOUND, "NOT FOUND").into_response(),
                ApiError::Unauthorized => {
                    (StatusCode::UNAUTHORIZED, "Unauthorized").into_response()
                }
                ApiError::Invalid(s) => (StatusCode::BAD_REQUEST, s.to_string()).into_response(),
            },
        }
    }
}
