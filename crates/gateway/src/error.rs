use {
    axum::{
        Json,
        http::StatusCode,
        response::{IntoResponse, Response},
    },
    mediaferry_media::Error as MediaError,
    serde::Serialize,
};

/// Body of every `/api/convert` response; `error` is omitted on success.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ConvertResponse {
    pub message: String,
    pub file_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// A failed API call, rendered as a [`ConvertResponse`] with `error` set.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }
}

impl From<MediaError> for ApiError {
    fn from(err: MediaError) -> Self {
        let status = match &err {
            MediaError::InvalidRequest { .. } | MediaError::InvalidFormat { .. } => {
                StatusCode::BAD_REQUEST
            },
            MediaError::TimedOut { .. } => StatusCode::GATEWAY_TIMEOUT,
            MediaError::ExecutionFailed { .. }
            | MediaError::ArtifactNotFound { .. }
            | MediaError::ArtifactEmpty { .. }
            | MediaError::External { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self {
            status,
            message: err.public_message(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ConvertResponse {
            error: Some(self.message),
            ..Default::default()
        };
        (self.status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use {super::*, std::path::PathBuf};

    #[test]
    fn status_mapping() {
        let cases = [
            (MediaError::invalid_request("url must not be empty"), 400),
            (
                MediaError::InvalidFormat {
                    format: "gif".into(),
                },
                400,
            ),
            (MediaError::TimedOut { after_secs: 5 }, 504),
            (
                MediaError::ExecutionFailed {
                    status: "exit status: 1".into(),
                    diagnostic: String::new(),
                },
                500,
            ),
            (
                MediaError::ArtifactEmpty {
                    path: PathBuf::from("downloads/x.mp4"),
                },
                500,
            ),
        ];
        for (err, expected) in cases {
            assert_eq!(ApiError::from(err).status.as_u16(), expected);
        }
    }
}
