//! Response envelope returned by the front service.

use serde::{Deserialize, Serialize};

const CODE_OK: i32 = 0;
const CODE_ERROR: i32 = 1;

/// The request/response envelope the excluded transport layer would carry:
/// a status code, a message, and an optional payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response<T> {
    code: i32,
    msg: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
}

impl<T> Response<T> {
    /// A successful response carrying a payload.
    pub fn ok(data: T) -> Self {
        Self {
            code: CODE_OK,
            msg: "OK".to_string(),
            data: Some(data),
        }
    }

    /// A successful response without a payload.
    pub fn ok_empty() -> Self {
        Self {
            code: CODE_OK,
            msg: "OK".to_string(),
            data: None,
        }
    }

    /// A failed response carrying a message.
    pub fn error(msg: impl Into<String>) -> Self {
        Self {
            code: CODE_ERROR,
            msg: msg.into(),
            data: None,
        }
    }

    /// True for responses built by the `ok` constructors.
    pub fn is_ok(&self) -> bool {
        self.code == CODE_OK
    }

    /// The response message.
    pub fn msg(&self) -> &str {
        &self.msg
    }

    /// The payload, if any.
    pub fn data(&self) -> Option<&T> {
        self.data.as_ref()
    }

    /// Consume the envelope and return the payload, if any.
    pub fn into_data(self) -> Option<T> {
        self.data
    }
}
