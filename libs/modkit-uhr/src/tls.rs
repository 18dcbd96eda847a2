//! TLS setup for the transport: crypto provider selection and the OS root
//! store, loaded once per process.

use crate::config::TlsRootConfig;
use crate::error::UhrError;
use hyper_rustls::HttpsConnector;
use hyper_util::client::legacy::connect::HttpConnector;
use rustls_pki_types::CertificateDer;
use std::sync::{Arc, OnceLock};

/// OS root certificates; empty when the store had none.
static NATIVE_ROOTS: OnceLock<Vec<CertificateDer<'static>>> = OnceLock::new();

#[cfg(test)]
static LOAD_COUNT: std::sync::atomic::AtomicUsize = std::sync::atomic::AtomicUsize::new(0);

fn load_native_roots() -> Vec<CertificateDer<'static>> {
    #[cfg(test)]
    LOAD_COUNT.fetch_add(1, std::sync::atomic::Ordering::SeqCst);

    let result = rustls_native_certs::load_native_certs();
    for err in &result.errors {
        tracing::warn!(error = %err, "failed to load a native root certificate");
    }

    if result.certs.is_empty() {
        tracing::warn!("OS certificate store has no root certificates");
    } else {
        tracing::debug!(count = result.certs.len(), "loaded native root certificates");
    }
    result.certs
}

pub(crate) fn native_root_certs() -> &'static [CertificateDer<'static>] {
    NATIVE_ROOTS.get_or_init(load_native_roots).as_slice()
}

/// Globally installed provider if the application set one, aws-lc-rs otherwise.
///
/// Never installs a provider itself.
pub(crate) fn crypto_provider() -> Arc<rustls::crypto::CryptoProvider> {
    rustls::crypto::CryptoProvider::get_default()
        .cloned()
        .unwrap_or_else(|| Arc::new(rustls::crypto::aws_lc_rs::default_provider()))
}

fn native_roots_client_config() -> Result<rustls::ClientConfig, UhrError> {
    let certs = native_root_certs();
    if certs.is_empty() {
        return Err(UhrError::Tls(
            "no native root CA certificates found in OS certificate store".into(),
        ));
    }

    let mut roots = rustls::RootCertStore::empty();
    let (added, ignored) = roots.add_parsable_certificates(certs.iter().cloned());
    if ignored > 0 {
        tracing::warn!(added, ignored, "some native root certificates could not be parsed");
    }
    if added == 0 {
        return Err(UhrError::Tls(
            format!(
                "no valid native root CA certificates parsed ({} found)",
                certs.len()
            )
            .into(),
        ));
    }

    let config = rustls::ClientConfig::builder_with_provider(crypto_provider())
        .with_safe_default_protocol_versions()
        .map_err(|e| UhrError::Tls(Box::new(e)))?
        .with_root_certificates(roots)
        .with_no_client_auth();
    Ok(config)
}

/// Connector speaking plain HTTP and HTTPS, negotiating HTTP/2 via ALPN.
///
/// # Errors
/// `Tls` when native roots are requested and none are usable.
pub(crate) fn https_connector(
    roots: TlsRootConfig,
) -> Result<HttpsConnector<HttpConnector>, UhrError> {
    let connector = match roots {
        TlsRootConfig::WebPki => hyper_rustls::HttpsConnectorBuilder::new()
            .with_provider_and_webpki_roots(crypto_provider())
            .map_err(|e| UhrError::Tls(Box::new(e)))?
            .https_or_http()
            .enable_all_versions()
            .build(),
        TlsRootConfig::Native => hyper_rustls::HttpsConnectorBuilder::new()
            .with_tls_config(native_roots_client_config()?)
            .https_or_http()
            .enable_all_versions()
            .build(),
    };
    Ok(connector)
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use std::sync::atomic::Ordering;

    #[test]
    fn test_native_roots_loaded_once() {
        // LOAD_COUNT is shared with other tests, so only "at most one more" holds
        let before = LOAD_COUNT.load(Ordering::SeqCst);
        let first = native_root_certs();
        let second = native_root_certs();
        let after = LOAD_COUNT.load(Ordering::SeqCst);

        assert!(after <= before + 1);
        assert!(std::ptr::eq(first, second));
    }

    #[test]
    fn test_webpki_connector_builds() {
        assert!(https_connector(TlsRootConfig::WebPki).is_ok());
    }

    #[test]
    fn test_native_connector_fails_only_with_tls_error() {
        // Minimal containers may have no OS roots
        match https_connector(TlsRootConfig::Native) {
            Ok(_) => {}
            Err(UhrError::Tls(err)) => assert!(err.to_string().contains("root")),
            Err(other) => panic!("unexpected error: {other:?}"),
        }
    }
}
