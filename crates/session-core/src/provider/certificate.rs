//! Server certificate chains presented during a failed TLS handshake

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// DER-encoded certificates, leaf first
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertificateChain {
    certificates: Vec<Vec<u8>>,
}

impl CertificateChain {
    pub fn new(certificates: Vec<Vec<u8>>) -> Self {
        Self { certificates }
    }

    /// The server's own certificate
    pub fn leaf(&self) -> Option<&[u8]> {
        self.certificates.first().map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.certificates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.certificates.is_empty()
    }

    /// SHA-256 fingerprint of every certificate, leaf first
    pub fn fingerprints(&self) -> Vec<String> {
        self.certificates
            .iter()
            .map(|der| sha256_fingerprint(der))
            .collect()
    }
}

/// Colon-separated upper-case SHA-256 fingerprint of a DER certificate,
/// the form shown in trust prompts
pub fn sha256_fingerprint(der: &[u8]) -> String {
    let digest = Sha256::digest(der);
    let hex = hex::encode_upper(digest);
    hex.as_bytes()
        .chunks(2)
        .map(|pair| String::from_utf8_lossy(pair).into_owned())
        .collect::<Vec<_>>()
        .join(":")
}
