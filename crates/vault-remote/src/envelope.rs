//! The Stingle wire envelope every sync endpoint responds with:
//! `{ status, parts, infos, errors }`. `status != "ok"` is surfaced as
//! [`crate::error::RemoteError::Status`].

use serde::{Deserialize, Serialize};

use crate::error::{RemoteError, Result};

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub status: String,
    #[serde(default)]
    pub parts: Option<T>,
    #[serde(default)]
    pub infos: Option<serde_json::Value>,
    #[serde(default)]
    pub errors: Option<Vec<String>>,
}

impl<T> Envelope<T> {
    /// Check `status` and unwrap `parts`, turning a non-ok envelope into
    /// a [`RemoteError::Status`] carrying whatever error strings the
    /// remote supplied.
    pub fn into_result(self) -> Result<T> {
        if self.status != "ok" {
            return Err(RemoteError::Status(self.errors.unwrap_or_default()));
        }
        self.parts
            .ok_or_else(|| RemoteError::MalformedResponse("ok status with no parts".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ok_envelope_unwraps_parts() {
        let env = Envelope { status: "ok".to_string(), parts: Some(42), infos: None, errors: None };
        assert_eq!(env.into_result().unwrap(), 42);
    }

    #[test]
    fn error_envelope_surfaces_remote_status_error() {
        let env: Envelope<u8> = Envelope {
            status: "error".to_string(),
            parts: None,
            infos: None,
            errors: Some(vec!["bad password".to_string()]),
        };
        match env.into_result() {
            Err(RemoteError::Status(errs)) => assert_eq!(errs, vec!["bad password".to_string()]),
            other => panic!("expected Status error, got {other:?}"),
        }
    }
}
