use crate::body::RawBody;
use crate::codec::CodecFormat;
use crate::http::{header_values, Header};

/// A response ready to be written by a transport.
#[derive(Debug)]
pub struct ServerResponse {
    pub status: u16,
    pub headers: Vec<Header>,
    pub body: Option<RawBody>,
}

impl ServerResponse {
    pub fn new(status: u16) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: None,
        }
    }

    /// A plain text response, used for decode failures.
    pub fn text(status: u16, text: impl Into<String>) -> Self {
        let text = text.into();
        Self {
            status,
            headers: vec![
                ("content-type".to_string(), CodecFormat::TextPlain.media_type().to_string()),
                ("content-length".to_string(), text.len().to_string()),
            ],
            body: Some(RawBody::Text(text)),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// First value of header `name`, matched case-insensitively.
    pub fn header(&self, name: &str) -> Option<String> {
        header_values(&self.headers, name).into_iter().next()
    }
}
