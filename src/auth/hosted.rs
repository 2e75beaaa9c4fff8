use async_trait::async_trait;
use chrono::{Duration, Utc};
use reqwest::{Method, StatusCode};
use serde::{Deserialize, Serialize};

use crate::auth::provider::{AuthError, AuthProvider};
use crate::hosted::{error_message, HostedClient};
use crate::types::{AgentId, AuthUser, Session};

pub struct HostedAuth {
    client: HostedClient,
}

#[derive(Debug, Serialize)]
struct Credentials<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Debug, Deserialize)]
struct UserBody {
    id: AgentId,
    email: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TokenBody {
    access_token: String,
    expires_in: Option<i64>,
    user: UserBody,
}

/// Sign-up answers with a session when e-mail confirmation is off and with the
/// bare user when it is on.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SignUpBody {
    WithSession(TokenBody),
    Bare(UserBody),
}

impl From<UserBody> for AuthUser {
    fn from(body: UserBody) -> Self {
        AuthUser {
            id: body.id,
            email: body.email.unwrap_or_default(),
        }
    }
}

impl From<TokenBody> for Session {
    fn from(body: TokenBody) -> Self {
        Session {
            access_token: body.access_token,
            user: body.user.into(),
            expires_at: body.expires_in.map(|secs| Utc::now() + Duration::seconds(secs)),
        }
    }
}

impl HostedAuth {
    pub fn new(client: HostedClient) -> Self {
        Self { client }
    }

    async fn rejected(response: reqwest::Response) -> AuthError {
        let status = response.status().as_u16();
        match response.text().await {
            Ok(body) => AuthError::Rejected(error_message(status, &body)),
            Err(e) => AuthError::Backend(e.into()),
        }
    }
}

fn transport(e: reqwest::Error) -> AuthError {
    AuthError::Backend(e.into())
}

#[async_trait]
impl AuthProvider for HostedAuth {
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
    ) -> Result<(AuthUser, Option<Session>), AuthError> {
        let response = self
            .client
            .request(Method::POST, &self.client.auth_url("signup"))
            .json(&Credentials { email, password })
            .send()
            .await
            .map_err(transport)?;

        if !response.status().is_success() {
            return Err(Self::rejected(response).await);
        }

        let body: SignUpBody = response.json().await.map_err(transport)?;
        Ok(match body {
            SignUpBody::WithSession(token) => {
                let session = Session::from(token);
                (session.user.clone(), Some(session))
            }
            SignUpBody::Bare(user) => (user.into(), None),
        })
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        let response = self
            .client
            .request(Method::POST, &self.client.auth_url("token?grant_type=password"))
            .json(&Credentials { email, password })
            .send()
            .await
            .map_err(transport)?;

        if !response.status().is_success() {
            return Err(Self::rejected(response).await);
        }

        let body: TokenBody = response.json().await.map_err(transport)?;
        Ok(body.into())
    }

    async fn sign_out(&self, access_token: &str) -> Result<(), AuthError> {
        let response = self
            .client
            .user_request(Method::POST, &self.client.auth_url("logout"), access_token)
            .send()
            .await
            .map_err(transport)?;

        // An already-dead token is as signed out as it gets.
        match response.status() {
            s if s.is_success() => Ok(()),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Ok(()),
            _ => Err(Self::rejected(response).await),
        }
    }

    async fn get_user(&self, access_token: &str) -> Result<Option<AuthUser>, AuthError> {
        let response = self
            .client
            .user_request(Method::GET, &self.client.auth_url("user"), access_token)
            .send()
            .await
            .map_err(transport)?;

        match response.status() {
            s if s.is_success() => {
                let body: UserBody = response.json().await.map_err(transport)?;
                Ok(Some(body.into()))
            }
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Ok(None),
            _ => Err(Self::rejected(response).await),
        }
    }
}
