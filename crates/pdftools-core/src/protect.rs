//! Password protection of serialized documents

use crate::encryption::EncryptionProvider;
use crate::error::{PdfToolsError, Result};

/// Encrypt finished document bytes with `password` as user and owner password.
///
/// The plaintext is only borrowed. Provider failures come back as
/// `Encryption` errors; the plaintext is never returned in their place.
pub fn protect(
    plaintext: &[u8],
    password: &str,
    provider: &dyn EncryptionProvider,
) -> Result<Vec<u8>> {
    provider
        .encrypt(plaintext, password)
        .map_err(|err| match err {
            PdfToolsError::Encryption(_) | PdfToolsError::Internal(_) => err,
            other => PdfToolsError::Encryption(other.to_string()),
        })
}
