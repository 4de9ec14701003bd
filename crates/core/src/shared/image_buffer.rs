/// An uploaded image payload: raw bytes plus the content type the client declared.
///
/// Created once per request and never modified.
#[derive(Clone, Debug)]
pub struct ImageBuffer {
    bytes: Vec<u8>,
    content_type: Option<String>,
}

impl ImageBuffer {
    pub fn new(bytes: Vec<u8>, content_type: Option<String>) -> Self {
        Self {
            bytes,
            content_type,
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}
