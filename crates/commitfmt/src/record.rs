//! The commit being rendered.

use crate::encoding::DEFAULT_ENCODING;
use crate::locator::RecordLocator;

/// An immutable raw commit plus the encoding facts needed to render it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    id: String,
    raw: Vec<u8>,
    encoding: Option<String>,
    output_encoding: String,
    need_8bit_cte: bool,
}

impl Record {
    /// Creates a record from its object id and raw commit bytes.
    pub fn new(id: impl Into<String>, raw: impl Into<Vec<u8>>) -> Self {
        Record {
            id: id.into(),
            raw: raw.into(),
            encoding: None,
            output_encoding: DEFAULT_ENCODING.to_string(),
            need_8bit_cte: false,
        }
    }

    /// Declares the encoding of the raw bytes, overriding the `encoding` header.
    pub fn encoding(mut self, encoding: impl Into<String>) -> Self {
        self.encoding = Some(encoding.into());
        self
    }

    /// Sets the encoding the output is converted to.
    pub fn output_encoding(mut self, encoding: impl Into<String>) -> Self {
        self.output_encoding = encoding.into();
        self
    }

    /// Forces MIME headers in mail output even for ASCII content.
    pub fn need_8bit_cte(mut self, need: bool) -> Self {
        self.need_8bit_cte = need;
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn raw(&self) -> &[u8] {
        &self.raw
    }

    pub fn target_encoding(&self) -> &str {
        &self.output_encoding
    }

    pub fn needs_8bit_cte(&self) -> bool {
        self.need_8bit_cte
    }

    /// The encoding the raw bytes are in: the declared encoding, else the
    /// `encoding` header, else UTF-8.
    pub fn source_encoding(&self) -> String {
        if let Some(declared) = &self.encoding {
            return declared.clone();
        }
        let mut locator = RecordLocator::new(self.raw.as_slice());
        match locator.encoding() {
            Ok(Some(span)) => String::from_utf8_lossy(locator.slice(span)).into_owned(),
            _ => DEFAULT_ENCODING.to_string(),
        }
    }
}
