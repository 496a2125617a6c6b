//! HTTP client for the hosted contract service

use crate::service::{CompletionAttestation, ContractService, CreateContract, DeliveryReceipt};
use crate::{ClientError, ClientResult};
use async_trait::async_trait;
use closing_types::{Contract, ContractId};
use reqwest::{Client, StatusCode};
use serde::{de::DeserializeOwned, Serialize};

/// HTTP implementation of the contract service seam
pub struct HttpContractService {
    client: Client,
    base_url: String,
}

impl HttpContractService {
    /// Create a client against a service endpoint
    pub fn new(endpoint: &str) -> ClientResult<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            base_url: endpoint.trim_end_matches('/').to_string(),
        })
    }

    // ========== Internal HTTP helpers ==========

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> ClientResult<T> {
        let url = format!("{}{}", self.base_url, path);
        let response = self.client.get(&url).send().await?;
        self.handle_response(response).await
    }

    async fn post_json<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> ClientResult<T> {
        let url = format!("{}{}", self.base_url, path);
        let response = self.client.post(&url).json(body).send().await?;
        self.handle_response(response).await
    }

    /// POST for calls whose success response carries no body
    async fn post_unit<B: Serialize>(&self, path: &str, body: &B) -> ClientResult<()> {
        let url = format!("{}{}", self.base_url, path);
        let response = self.client.post(&url).json(body).send().await?;
        let status = response.status();

        if status.is_success() {
            Ok(())
        } else {
            Err(self.status_error(status, response).await)
        }
    }

    async fn handle_response<T: DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> ClientResult<T> {
        let status = response.status();

        if status.is_success() {
            Ok(response.json().await?)
        } else {
            Err(self.status_error(status, response).await)
        }
    }

    async fn status_error(&self, status: StatusCode, response: reqwest::Response) -> ClientError {
        let message = response.text().await.unwrap_or_default();
        ClientError::Api {
            status: status.as_u16(),
            message,
        }
    }

    /// Rewrite a 404 on a contract-scoped route into a typed not-found
    /// carrying the contract id rather than the URL path.
    fn not_found(id: &ContractId) -> impl Fn(ClientError) -> ClientError + '_ {
        move |err| match err {
            ClientError::Api { status: 404, .. } => ClientError::NotFound(id.to_string()),
            err => err,
        }
    }
}

#[async_trait]
impl ContractService for HttpContractService {
    async fn create(&self, payload: &CreateContract) -> ClientResult<Contract> {
        self.post_json("/api/v1/contracts", payload).await
    }

    async fn get(&self, id: &ContractId) -> ClientResult<Contract> {
        self.get_json(&format!("/api/v1/contracts/{}", id))
            .await
            .map_err(Self::not_found(id))
    }

    async fn send_email(&self, id: &ContractId, to: &str) -> ClientResult<()> {
        self.post_unit(
            &format!("/api/v1/contracts/{}/send", id),
            &serde_json::json!({ "to": to }),
        )
        .await
        .map_err(Self::not_found(id))
    }

    async fn resend_delivery(&self, id: &ContractId, to: &str) -> ClientResult<DeliveryReceipt> {
        self.post_json(
            &format!("/api/v1/contracts/{}/delivery/resend", id),
            &serde_json::json!({ "to": to }),
        )
        .await
        .map_err(Self::not_found(id))
    }

    async fn set_auth_code(&self, id: &ContractId, code: &str) -> ClientResult<()> {
        self.post_unit(
            &format!("/api/v1/contracts/{}/auth-code", id),
            &serde_json::json!({ "code": code }),
        )
        .await
        .map_err(Self::not_found(id))
    }

    async fn complete(
        &self,
        id: &ContractId,
        attestation: &CompletionAttestation,
    ) -> ClientResult<Contract> {
        self.post_json(&format!("/api/v1/contracts/{}/complete", id), attestation)
            .await
            .map_err(Self::not_found(id))
    }
}
