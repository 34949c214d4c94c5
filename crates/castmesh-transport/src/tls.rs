//! TLS material for peer links
//!
//! Every instance presents the same certificate/key pair and trusts that
//! certificate when dialing peers. The peer's common name is the server
//! name checked during the handshake.

use std::fmt;
use std::path::Path;

use tonic::transport::{Certificate, ClientTlsConfig, Identity, ServerTlsConfig};

use castmesh_core::{MeshError, MeshResult, PeerIdentity};

/// PEM-encoded certificate and private key
#[derive(Clone)]
pub struct TlsMaterial {
    cert_pem: Vec<u8>,
    key_pem: Vec<u8>,
}

impl TlsMaterial {
    /// Read the certificate and key from disk. Missing material is fatal.
    pub fn load(cert_path: impl AsRef<Path>, key_path: impl AsRef<Path>) -> MeshResult<Self> {
        let cert_pem = read_pem(cert_path.as_ref(), "certificate")?;
        let key_pem = read_pem(key_path.as_ref(), "key")?;
        Ok(TlsMaterial { cert_pem, key_pem })
    }

    pub fn from_pem(cert_pem: impl Into<Vec<u8>>, key_pem: impl Into<Vec<u8>>) -> Self {
        TlsMaterial {
            cert_pem: cert_pem.into(),
            key_pem: key_pem.into(),
        }
    }

    /// Client settings for dialing `peer`
    pub fn client_config(&self, peer: &PeerIdentity) -> ClientTlsConfig {
        ClientTlsConfig::new()
            .ca_certificate(Certificate::from_pem(&self.cert_pem))
            .domain_name(peer.common_name())
    }

    /// Server settings for the propagation listener
    pub fn server_config(&self) -> ServerTlsConfig {
        ServerTlsConfig::new().identity(Identity::from_pem(&self.cert_pem, &self.key_pem))
    }
}

impl fmt::Debug for TlsMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TlsMaterial")
            .field("cert_len", &self.cert_pem.len())
            .finish_non_exhaustive()
    }
}

fn read_pem(path: &Path, what: &str) -> MeshResult<Vec<u8>> {
    let pem = std::fs::read(path)
        .map_err(|e| MeshError::Config(format!("cannot read TLS {what} {}: {e}", path.display())))?;
    if !pem.windows(10).any(|w| w == b"-----BEGIN") {
        return Err(MeshError::Config(format!(
            "TLS {what} {} is not PEM encoded",
            path.display()
        )));
    }
    Ok(pem)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(contents: &[u8]) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents).unwrap();
        file
    }

    #[test]
    fn test_load_pem_files() {
        let generated = rcgen::generate_simple_self_signed(vec!["localhost".to_string()]).unwrap();
        let cert = write_temp(generated.cert.pem().as_bytes());
        let key = write_temp(generated.key_pair.serialize_pem().as_bytes());

        let material = TlsMaterial::load(cert.path(), key.path()).unwrap();
        assert!(format!("{material:?}").contains("cert_len"));
        assert!(!format!("{material:?}").contains("PRIVATE KEY"));
    }

    #[test]
    fn test_missing_material_is_fatal() {
        let err = TlsMaterial::load("/nonexistent/castmesh.crt", "/nonexistent/castmesh.key").unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn test_non_pem_is_fatal() {
        let cert = write_temp(b"not a certificate");
        let key = write_temp(b"not a key");
        let err = TlsMaterial::load(cert.path(), key.path()).unwrap_err();
        assert!(matches!(err, MeshError::Config(_)));
    }
}
