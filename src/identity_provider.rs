//! OpenID Connect relying party used to gate the admin area.
//!
//! Discovery runs once while the application starts; a client that exists
//! is a client whose provider answered, which is what lets the server hold
//! off accepting connections until the provider is ready.
use openidconnect::core::{CoreAuthenticationFlow, CoreClient, CoreProviderMetadata};
use openidconnect::reqwest::async_http_client;
use openidconnect::{
    AuthorizationCode, ClientId, ClientSecret, CsrfToken, IssuerUrl, Nonce, PkceCodeChallenge,
    PkceCodeVerifier, RedirectUrl, Scope, TokenResponse,
};
use secrecy::ExposeSecret;
use url::Url;

use crate::configuration::{public_url, IdentityProviderSettings, PublicAddressError};
use crate::session::Administrator;

pub const CALLBACK_PATH: &str = "/admin/callback";

#[derive(thiserror::Error, Debug)]
pub enum IdentityProviderError {
    #[error("The identity provider issuer `{0}` is not a valid URL.")]
    InvalidIssuer(String),
    #[error("Failed to build the sign-in callback URL.")]
    InvalidCallback(#[from] PublicAddressError),
    #[error("OIDC discovery failed.")]
    Discovery(#[source] anyhow::Error),
    #[error("The identity provider rejected the authorization code.")]
    CodeExchange(#[source] anyhow::Error),
    #[error("The ID token could not be verified.")]
    IdToken(#[source] anyhow::Error),
}

/// What a sign-in in progress must remember until the provider calls back.
#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct PendingLogin {
    pub state: String,
    pub nonce: String,
    pub pkce_verifier: String,
}

pub struct OidcClient {
    client: CoreClient,
    redirect_url: Url,
}

impl OidcClient {
    /// Fetch the provider metadata and signing keys. Returns once the
    /// provider is ready to serve sign-ins.
    #[tracing::instrument(name = "OIDC discovery", skip(settings, public_address), fields(issuer = %settings.issuer))]
    pub async fn discover(
        settings: &IdentityProviderSettings,
        public_address: &str,
    ) -> Result<Self, IdentityProviderError> {
        let issuer_url = IssuerUrl::new(settings.issuer.clone())
            .map_err(|_| IdentityProviderError::InvalidIssuer(settings.issuer.clone()))?;
        let redirect_url = public_url(public_address, &[CALLBACK_PATH])?;

        let metadata = CoreProviderMetadata::discover_async(issuer_url, async_http_client)
            .await
            .map_err(|e| IdentityProviderError::Discovery(anyhow::Error::new(e)))?;
        tracing::info!("Identity provider is ready");

        let client = CoreClient::from_provider_metadata(
            metadata,
            ClientId::new(settings.client_id.clone()),
            Some(ClientSecret::new(
                settings.client_secret.expose_secret().clone(),
            )),
        )
        .set_redirect_uri(RedirectUrl::from_url(redirect_url.clone()));

        Ok(Self {
            client,
            redirect_url,
        })
    }

    pub fn redirect_url(&self) -> &Url {
        &self.redirect_url
    }

    /// Where to send the browser to start an authorization-code sign-in,
    /// along with the nonce and PKCE verifier the callback will need.
    pub fn authorization_request(&self, state: &str) -> (Url, PendingLogin) {
        let (pkce_challenge, pkce_verifier) = PkceCodeChallenge::new_random_sha256();
        let csrf_state = state.to_owned();
        let (url, _, nonce) = self
            .client
            .authorize_url(
                CoreAuthenticationFlow::AuthorizationCode,
                move || CsrfToken::new(csrf_state),
                Nonce::new_random,
            )
            .add_scope(Scope::new("email".to_string()))
            .add_scope(Scope::new("profile".to_string()))
            .set_pkce_challenge(pkce_challenge)
            .url();

        let pending = PendingLogin {
            state: state.to_owned(),
            nonce: nonce.secret().clone(),
            pkce_verifier: pkce_verifier.secret().clone(),
        };
        (url, pending)
    }

    /// Trade an authorization code for a verified ID token and read the
    /// administrator's profile from its claims.
    #[tracing::instrument(name = "Exchange authorization code", skip(self, code, pending))]
    pub async fn exchange_code(
        &self,
        code: &str,
        pending: &PendingLogin,
    ) -> Result<Administrator, IdentityProviderError> {
        let token_response = self
            .client
            .exchange_code(AuthorizationCode::new(code.to_owned()))
            .set_pkce_verifier(PkceCodeVerifier::new(pending.pkce_verifier.clone()))
            .request_async(async_http_client)
            .await
            .map_err(|e| IdentityProviderError::CodeExchange(anyhow::Error::new(e)))?;

        let id_token = token_response.id_token().ok_or_else(|| {
            IdentityProviderError::IdToken(anyhow::anyhow!("The token response has no ID token."))
        })?;
        let claims = id_token
            .claims(
                &self.client.id_token_verifier(),
                &Nonce::new(pending.nonce.clone()),
            )
            .map_err(|e| IdentityProviderError::IdToken(anyhow::Error::new(e)))?;

        let email = claims
            .email()
            .map(|email| email.as_str().to_owned())
            .ok_or_else(|| {
                IdentityProviderError::IdToken(anyhow::anyhow!("The ID token has no email claim."))
            })?;
        let name = claims
            .name()
            .and_then(|name| name.get(None))
            .map(|name| name.as_str().to_owned())
            .or_else(|| {
                claims
                    .preferred_username()
                    .map(|username| username.as_str().to_owned())
            })
            .unwrap_or_else(|| email.clone());

        Ok(Administrator {
            subject: claims.subject().as_str().to_owned(),
            email,
            name,
        })
    }
}
