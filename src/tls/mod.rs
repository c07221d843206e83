pub mod verifier;

use crate::tls::verifier::InsecureCertVerifier;
use rustls::crypto::ring::{default_provider, DEFAULT_CIPHER_SUITES};
use rustls::crypto::CryptoProvider;
use rustls::{ClientConfig, RootCertStore};
use std::sync::Arc;

/// Builds the client TLS configuration: webpki roots by default, roots
/// from a pem file when one is given, and no verification at all behind
/// the insecure flag.
pub fn client_tls_config(
    certificate_path: Option<&str>,
    skip_certificate_validate: bool,
) -> Result<ClientConfig, anyhow::Error> {
    let mut root_store = RootCertStore::empty();
    if let Some(file_path) = certificate_path {
        let f = std::fs::File::open(file_path)?;
        let mut rd = std::io::BufReader::new(f);
        for cert in rustls_pemfile::certs(&mut rd) {
            root_store.add(cert?)?;
        }
    } else {
        root_store.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
    }

    let mut tls_config = ClientConfig::builder_with_provider(
        CryptoProvider {
            cipher_suites: DEFAULT_CIPHER_SUITES.to_vec(),
            ..default_provider()
        }
        .into(),
    )
    .with_protocol_versions(rustls::DEFAULT_VERSIONS)?
    .with_root_certificates(root_store)
    .with_no_client_auth();

    if skip_certificate_validate {
        tls_config
            .dangerous()
            .set_certificate_verifier(Arc::new(InsecureCertVerifier::new(default_provider())));
    }

    Ok(tls_config)
}
