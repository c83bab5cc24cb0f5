use std::collections::HashMap;

use actix_web::http::StatusCode;
use actix_web::HttpResponse;
use serde::{Deserialize, Serialize};

// ============================================================================
// CORS-enabled API responses
// ============================================================================

pub const CONTENT_TYPE_JSON: &str = "application/json";
pub const CONTENT_TYPE_HTML: &str = "text/html";

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse {
    pub status_code: u16,
    pub headers: HashMap<String, String>,
    pub body: String,
}

/// JSON response with `Access-Control-Allow-Origin: *`
pub fn res(status_code: u16, body: impl Into<String>) -> ApiResponse {
    build(status_code, body.into(), CONTENT_TYPE_JSON)
}

/// HTML response with `Access-Control-Allow-Origin: *`
pub fn html_res(status_code: u16, body: impl Into<String>) -> ApiResponse {
    build(status_code, body.into(), CONTENT_TYPE_HTML)
}

fn build(status_code: u16, body: String, content_type: &str) -> ApiResponse {
    ApiResponse {
        status_code,
        headers: HashMap::from([
            ("Access-Control-Allow-Origin".to_string(), "*".to_string()),
            ("Content-Type".to_string(), content_type.to_string()),
        ]),
        body,
    }
}

impl From<ApiResponse> for HttpResponse {
    fn from(response: ApiResponse) -> Self {
        let status = StatusCode::from_u16(response.status_code)
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        let mut builder = HttpResponse::build(status);
        for (name, value) in &response.headers {
            builder.insert_header((name.as_str(), value.as_str()));
        }
        builder.body(response.body)
    }
}
