//! Password encryption of finished documents
//!
//! Implements the PDF Standard Security Handler with RC4, revision 2 (40-bit)
//! and revision 3 (128-bit). Output is a pure function of the plaintext and
//! the password: the file identifier is taken from the trailer or derived
//! from the plaintext, never from a random source.

use crate::error::{PdfToolsError, Result};
use crate::rc4::rc4_crypt;
use lopdf::{Dictionary, Document, Object, ObjectId, StringFormat};
use md5::{Digest, Md5};
use serde::{Deserialize, Serialize};

/// Password padding string, Algorithm 2 step (a)
const PADDING: [u8; 32] = [
    0x28, 0xBF, 0x4E, 0x5E, 0x4E, 0x75, 0x8A, 0x41, 0x64, 0x00, 0x4E, 0x56, 0xFF, 0xFA, 0x01, 0x08,
    0x2E, 0x2E, 0x00, 0xB6, 0xD0, 0x68, 0x3E, 0x80, 0x2F, 0x0C, 0xA9, 0xFE, 0x64, 0x53, 0x69, 0x7A,
];

/// Every permission granted; reserved high bits set as required
const ALL_PERMISSIONS: i32 = -4;

/// Something that can turn a serialized document into an encrypted one
pub trait EncryptionProvider: Send + Sync {
    /// Encrypt `plaintext` so that `password` is required to open it.
    ///
    /// User and owner password are both set to `password`.
    fn encrypt(&self, plaintext: &[u8], password: &str) -> Result<Vec<u8>>;
}

/// RC4 key strength
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EncryptionStrength {
    /// 40-bit key, revision 2
    Rc4_40,
    /// 128-bit key, revision 3
    #[default]
    Rc4_128,
}

impl EncryptionStrength {
    fn key_length(self) -> usize {
        match self {
            EncryptionStrength::Rc4_40 => 5,
            EncryptionStrength::Rc4_128 => 16,
        }
    }

    /// (V, R) entries of the encryption dictionary
    fn version_revision(self) -> (i64, i64) {
        match self {
            EncryptionStrength::Rc4_40 => (1, 2),
            EncryptionStrength::Rc4_128 => (2, 3),
        }
    }
}

/// The default encryption provider
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardSecurityHandler {
    strength: EncryptionStrength,
}

impl StandardSecurityHandler {
    pub fn new(strength: EncryptionStrength) -> Self {
        Self { strength }
    }
}

impl EncryptionProvider for StandardSecurityHandler {
    fn encrypt(&self, plaintext: &[u8], password: &str) -> Result<Vec<u8>> {
        if password.is_empty() {
            return Err(PdfToolsError::Encryption("Password must not be empty".into()));
        }

        let mut doc = Document::load_mem(plaintext)
            .map_err(|e| PdfToolsError::Encryption(format!("Invalid document: {}", e)))?;
        if doc.is_encrypted() {
            return Err(PdfToolsError::Encryption(
                "Document is already encrypted".into(),
            ));
        }

        let password = password_bytes(password);
        let file_id = file_identifier(&doc, plaintext);
        let key_length = self.strength.key_length();
        let (version, revision) = self.strength.version_revision();

        let owner = compute_owner_entry(&password, revision, key_length);
        let key = compute_file_key(&password, &owner, ALL_PERMISSIONS, &file_id, revision, key_length);
        let user = compute_user_entry(&key, &file_id, revision);

        // Object streams and xref streams are rebuilt as plain objects on save
        doc.objects.retain(|_, object| {
            !matches!(
                object.as_stream().and_then(|s| s.dict.get(b"Type")),
                Ok(Object::Name(kind)) if kind.as_slice() == b"ObjStm" || kind.as_slice() == b"XRef"
            )
        });

        for (&id, object) in doc.objects.iter_mut() {
            encrypt_object(object, &object_key(&key, id));
        }

        let encrypt_dict = Dictionary::from_iter(vec![
            ("Filter", Object::Name(b"Standard".to_vec())),
            ("V", Object::Integer(version)),
            ("R", Object::Integer(revision)),
            ("Length", Object::Integer((key_length * 8) as i64)),
            ("O", Object::String(owner, StringFormat::Hexadecimal)),
            ("U", Object::String(user, StringFormat::Hexadecimal)),
            ("P", Object::Integer(ALL_PERMISSIONS as i64)),
        ]);
        let encrypt_id = doc.add_object(encrypt_dict);

        let id_string = Object::String(file_id, StringFormat::Hexadecimal);
        doc.trailer
            .set("ID", Object::Array(vec![id_string.clone(), id_string]));
        doc.trailer.set("Encrypt", Object::Reference(encrypt_id));

        let mut buffer = Vec::new();
        doc.save_to(&mut buffer)
            .map_err(|e| PdfToolsError::Internal(format!("Save failed: {}", e)))?;

        tracing::debug!(
            strength = ?self.strength,
            objects = doc.objects.len(),
            "Encrypted document"
        );

        Ok(buffer)
    }
}

/// Password as bytes, truncated to the 32 bytes the algorithms use
fn password_bytes(password: &str) -> Vec<u8> {
    password.as_bytes().iter().copied().take(32).collect()
}

fn pad_password(password: &[u8]) -> [u8; 32] {
    let mut padded = PADDING;
    let len = password.len().min(32);
    padded[..len].copy_from_slice(&password[..len]);
    padded[len..].copy_from_slice(&PADDING[..32 - len]);
    padded
}

/// First element of the trailer ID, or an MD5 of the plaintext when absent
fn file_identifier(doc: &Document, plaintext: &[u8]) -> Vec<u8> {
    if let Ok(Object::Array(ids)) = doc.trailer.get(b"ID") {
        if let Some(Ok(id)) = ids.first().map(|id| id.as_str()) {
            if !id.is_empty() {
                return id.to_vec();
            }
        }
    }
    Md5::digest(plaintext).to_vec()
}

/// Algorithm 3: the O entry
fn compute_owner_entry(owner_password: &[u8], revision: i64, key_length: usize) -> Vec<u8> {
    let mut digest = Md5::digest(pad_password(owner_password)).to_vec();
    if revision >= 3 {
        for _ in 0..50 {
            digest = Md5::digest(&digest[..key_length]).to_vec();
        }
    }
    let key = &digest[..key_length];

    // User and owner password are the same
    let mut entry = rc4_crypt(key, &pad_password(owner_password));
    if revision >= 3 {
        for round in 1..=19u8 {
            entry = rc4_crypt(&xor_key(key, round), &entry);
        }
    }
    entry
}

/// Algorithm 2: the file encryption key
fn compute_file_key(
    password: &[u8],
    owner: &[u8],
    permissions: i32,
    file_id: &[u8],
    revision: i64,
    key_length: usize,
) -> Vec<u8> {
    let mut hasher = Md5::new();
    hasher.update(pad_password(password));
    hasher.update(owner);
    hasher.update(permissions.to_le_bytes());
    hasher.update(file_id);
    let mut digest = hasher.finalize().to_vec();

    if revision >= 3 {
        for _ in 0..50 {
            digest = Md5::digest(&digest[..key_length]).to_vec();
        }
    }
    digest.truncate(key_length);
    digest
}

/// Algorithms 4 and 5: the U entry
fn compute_user_entry(key: &[u8], file_id: &[u8], revision: i64) -> Vec<u8> {
    if revision < 3 {
        return rc4_crypt(key, &PADDING);
    }

    let mut hasher = Md5::new();
    hasher.update(PADDING);
    hasher.update(file_id);
    let mut entry = rc4_crypt(key, &hasher.finalize());
    for round in 1..=19u8 {
        entry = rc4_crypt(&xor_key(key, round), &entry);
    }
    // Arbitrary padding up to 32 bytes
    entry.extend_from_slice(&PADDING[..16]);
    entry
}

fn xor_key(key: &[u8], round: u8) -> Vec<u8> {
    key.iter().map(|b| b ^ round).collect()
}

/// Algorithm 1: per-object key
fn object_key(key: &[u8], (number, generation): ObjectId) -> Vec<u8> {
    let mut hasher = Md5::new();
    hasher.update(key);
    hasher.update(&number.to_le_bytes()[..3]);
    hasher.update(&generation.to_le_bytes()[..2]);
    let digest = hasher.finalize();
    digest[..(key.len() + 5).min(16)].to_vec()
}

fn encrypt_object(object: &mut Object, key: &[u8]) {
    match object {
        Object::String(bytes, _) => *bytes = rc4_crypt(key, bytes),
        Object::Array(items) => {
            for item in items.iter_mut() {
                encrypt_object(item, key);
            }
        }
        Object::Dictionary(dict) => {
            for (_, value) in dict.iter_mut() {
                encrypt_object(value, key);
            }
        }
        Object::Stream(stream) => {
            for (_, value) in stream.dict.iter_mut() {
                encrypt_object(value, key);
            }
            let content = rc4_crypt(key, &stream.content);
            stream.set_content(content);
        }
        _ => {}
    }
}
