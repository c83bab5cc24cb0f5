mod response;

pub use response::{html_res, res, ApiResponse, CONTENT_TYPE_HTML, CONTENT_TYPE_JSON};
