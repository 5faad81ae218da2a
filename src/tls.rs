//! TLS configuration pinned to an operator-supplied CA bundle.
//!
//! When `BACKEND_CA_PEM` is set, the backend HTTP client trusts only the
//! roots in that bundle instead of the built-in web PKI set.

use std::path::Path;

use rustls::ClientConfig;

use crate::Result;

/// Builds a [`ClientConfig`] whose root store contains only the
/// certificates found in the PEM file at `pem_path`.
///
/// # Errors
///
/// Returns [`AccountsError::Tls`](crate::AccountsError::Tls) if the file
/// cannot be read, is not valid PEM, or yields no usable certificate.
pub fn build_tls_config(pem_path: &Path) -> Result<ClientConfig> {
    let pem = std::fs::read(pem_path).map_err(|e| {
        crate::AccountsError::Tls(format!("failed to read {}: {e}", pem_path.display()))
    })?;

    let certs: Vec<_> = rustls_pemfile::certs(&mut &pem[..])
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| crate::AccountsError::Tls(format!("failed to parse CA PEM: {e}")))?;

    let mut root_store = rustls::RootCertStore::empty();
    let (added, _ignored) = root_store.add_parsable_certificates(certs);
    if added == 0 {
        return Err(crate::AccountsError::Tls(format!(
            "no usable certificates in {}",
            pem_path.display()
        )));
    }

    let config = ClientConfig::builder()
        .with_root_certificates(root_store)
        .with_no_client_auth();

    Ok(config)
}
