use serde::Serialize;
use serde_json::Value;

/// Reason phrase for the status codes the dispatcher emits
#[must_use]
pub fn status_reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        201 => "Created",
        204 => "No Content",
        301 => "Moved Permanently",
        302 => "Found",
        303 => "See Other",
        307 => "Temporary Redirect",
        308 => "Permanent Redirect",
        400 => "Bad Request",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not Found",
        409 => "Conflict",
        415 => "Unsupported Media Type",
        422 => "Unprocessable Entity",
        500 => "Internal Server Error",
        _ => "Unknown",
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum ResponseBody {
    Empty,
    Json(Value),
    Text(String),
    Bytes(Vec<u8>),
}

/// The outcome of one dispatch, ready to be written by a transport
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Response {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: ResponseBody,
}

impl Response {
    #[must_use]
    pub fn new(status: u16) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: ResponseBody::Empty,
        }
    }

    #[must_use]
    pub fn json(status: u16, body: Value) -> Self {
        Self::new(status)
            .with_header("Content-Type", "application/json")
            .with_body(ResponseBody::Json(body))
    }

    #[must_use]
    pub fn text(status: u16, body: impl Into<String>) -> Self {
        Self::new(status)
            .with_header("Content-Type", "text/plain; charset=utf-8")
            .with_body(ResponseBody::Text(body.into()))
    }

    #[must_use]
    pub fn bytes(status: u16, content_type: &str, body: Vec<u8>) -> Self {
        Self::new(status)
            .with_header("Content-Type", content_type)
            .with_body(ResponseBody::Bytes(body))
    }

    /// `{"error": {"code", "message", ...extra}}`
    #[must_use]
    pub fn error(status: u16, code: impl Serialize, message: &str, extra: Option<Value>) -> Self {
        let mut error = serde_json::json!({
            "code": code,
            "message": message,
        });
        if let (Value::Object(target), Some(Value::Object(extra))) = (&mut error, extra) {
            target.extend(extra);
        }
        Self::json(status, serde_json::json!({ "error": error }))
    }

    #[must_use]
    pub fn not_found() -> Self {
        Self::text(404, status_reason(404))
    }

    #[must_use]
    pub fn redirect(to: &str, status: u16) -> Self {
        Self::new(status).with_header("Location", to)
    }

    #[must_use]
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.set_header(name, value);
        self
    }

    #[must_use]
    pub fn with_body(mut self, body: ResponseBody) -> Self {
        self.body = body;
        self
    }

    /// Replace any header of the same name (case-insensitive)
    pub fn set_header(&mut self, name: &str, value: &str) {
        self.headers.retain(|(n, _)| !n.eq_ignore_ascii_case(name));
        self.headers.push((name.to_string(), value.to_string()));
    }

    #[must_use]
    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    #[must_use]
    pub fn is_redirect(&self) -> bool {
        (300..400).contains(&self.status) && self.get_header("Location").is_some()
    }

    /// Body as JSON, when it is one
    #[must_use]
    pub fn json_body(&self) -> Option<&Value> {
        match &self.body {
            ResponseBody::Json(v) => Some(v),
            _ => None,
        }
    }

    #[must_use]
    pub fn reason(&self) -> &'static str {
        status_reason(self.status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_status_reason() {
        assert_eq!(status_reason(200), "OK");
        assert_eq!(status_reason(302), "Found");
        assert_eq!(status_reason(404), "Not Found");
    }

    #[test]
    fn test_redirect() {
        let r = Response::redirect("/login", 302);
        assert!(r.is_redirect());
        assert_eq!(r.get_header("location"), Some("/login"));
    }

    #[test]
    fn test_error_body_merges_extra() {
        let r = Response::error(403, "no_access", "denied", Some(json!({"redirect_to": "/login"})));
        assert_eq!(
            r.json_body(),
            Some(&json!({"error": {"code": "no_access", "message": "denied", "redirect_to": "/login"}}))
        );
        assert_eq!(r.get_header("Content-Type"), Some("application/json"));
    }

    #[test]
    fn test_set_header_replaces() {
        let mut r = Response::new(200).with_header("X-A", "1");
        r.set_header("x-a", "2");
        assert_eq!(r.headers.len(), 1);
        assert_eq!(r.get_header("X-A"), Some("2"));
    }
}
