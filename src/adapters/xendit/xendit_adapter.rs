//! Xendit implementation of the PaymentProvider port.
//!
//! One HTTP client covers all four channels. Authentication is HTTP
//! Basic with the secret key as username and an empty password. The QR
//! endpoints additionally require an api-version header.

use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::config::ProviderConfig;
use crate::domain::foundation::Money;
use crate::domain::transaction::ChannelKind;
use crate::ports::{
    ChannelBundle, CreateChannelRequest, PaymentInstructions, PaymentProvider, ProviderError,
};

use super::wire;

/// EMV QR payloads start with this prefix; the sandbox sometimes
/// returns a non-scannable stub instead.
const EMV_PREFIX: &str = "000201";

/// Payment adapter backed by the Xendit REST API.
pub struct XenditAdapter {
    secret_key: SecretString,
    base_url: String,
    api_version: String,
    request_timeout: Duration,
    synthesize_sandbox_qr: bool,
    test_mode: bool,
    invoice_duration_secs: u64,
    http_client: reqwest::Client,
}

impl XenditAdapter {
    pub fn new(config: &ProviderConfig, payment_deadline_hours: u32) -> Self {
        Self {
            secret_key: SecretString::new(config.secret_key.clone()),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_version: config.api_version.clone(),
            request_timeout: Duration::from_secs(config.request_timeout_secs),
            synthesize_sandbox_qr: config.synthesize_sandbox_qr,
            test_mode: config.is_test_mode(),
            invoice_duration_secs: u64::from(payment_deadline_hours) * 3600,
            http_client: reqwest::Client::new(),
        }
    }

    async fn post_json<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
        versioned: bool,
    ) -> Result<(T, serde_json::Value), ProviderError> {
        let url = format!("{}{}", self.base_url, path);

        let mut request = self
            .http_client
            .post(&url)
            .basic_auth(self.secret_key.expose_secret(), Option::<&str>::None)
            .timeout(self.request_timeout)
            .json(body);
        if versioned {
            request = request.header("api-version", &self.api_version);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ProviderError::unavailable(e.to_string()))?;
        Self::parse_response(response, path).await
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        versioned: bool,
    ) -> Result<(T, serde_json::Value), ProviderError> {
        let url = format!("{}{}", self.base_url, path);

        let mut request = self
            .http_client
            .get(&url)
            .basic_auth(self.secret_key.expose_secret(), Option::<&str>::None)
            .timeout(self.request_timeout);
        if versioned {
            request = request.header("api-version", &self.api_version);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ProviderError::unavailable(e.to_string()))?;
        Self::parse_response(response, path).await
    }

    async fn parse_response<T: DeserializeOwned>(
        response: reqwest::Response,
        path: &str,
    ) -> Result<(T, serde_json::Value), ProviderError> {
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ProviderError::unavailable(e.to_string()))?;

        if !status.is_success() {
            tracing::error!(status = %status, body = %body, path, "provider call failed");
            let message = serde_json::from_str::<wire::ApiError>(&body)
                .ok()
                .and_then(|e| e.message)
                .unwrap_or(body);
            return if status.is_server_error() {
                Err(ProviderError::unavailable(message))
            } else {
                Err(ProviderError::rejected(message, Some(status.as_u16())))
            };
        }

        let raw: serde_json::Value = serde_json::from_str(&body)
            .map_err(|e| ProviderError::unavailable(format!("unparseable response: {}", e)))?;
        let typed: T = serde_json::from_value(raw.clone())
            .map_err(|e| ProviderError::unavailable(format!("unexpected response shape: {}", e)))?;
        Ok((typed, raw))
    }

    /// Resolve the QR payload to render, substituting a synthetic one
    /// when the sandbox returns a stub.
    fn qr_instructions(&self, qr_id: &str, qr_string: Option<String>) -> PaymentInstructions {
        match qr_string {
            Some(payload) if payload.starts_with(EMV_PREFIX) => PaymentInstructions::QrCode {
                payload,
                is_synthetic: false,
            },
            other => {
                if !self.synthesize_sandbox_qr {
                    return PaymentInstructions::QrCode {
                        payload: other.unwrap_or_default(),
                        is_synthetic: false,
                    };
                }
                tracing::debug!(qr_id, "substituting synthetic QR payload");
                PaymentInstructions::QrCode {
                    payload: synthetic_qr_payload(qr_id),
                    is_synthetic: true,
                }
            }
        }
    }
}

/// Deterministic placeholder payload for sandbox QR codes. Scans like
/// an EMV string in test UIs but carries no real merchant data.
fn synthetic_qr_payload(qr_id: &str) -> String {
    format!("{}0102122654{:02}{}6304TEST", EMV_PREFIX, qr_id.len().min(99), qr_id)
}

#[async_trait]
impl PaymentProvider for XenditAdapter {
    async fn create_invoice(
        &self,
        request: CreateChannelRequest,
    ) -> Result<ChannelBundle, ProviderError> {
        let body = wire::CreateInvoiceRequest {
            external_id: request.external_id.as_str().to_string(),
            amount: request.amount.as_rupiah(),
            description: request.description,
            currency: "IDR",
            invoice_duration: self.invoice_duration_secs,
            customer: request
                .payer_email
                .map(|email| wire::InvoiceCustomer { email }),
            success_redirect_url: request.success_redirect_url,
            failure_redirect_url: request.failure_redirect_url,
        };

        let (invoice, raw): (wire::InvoiceResponse, _) =
            self.post_json("/v2/invoices", &body, false).await?;

        tracing::info!(invoice_id = %invoice.id, external_id = %request.external_id, "invoice created");

        Ok(ChannelBundle {
            channel: ChannelKind::Invoice,
            invoice_id: Some(invoice.id),
            qr_id: None,
            provider_payment_id: None,
            instructions: PaymentInstructions::RedirectUrl {
                url: invoice.invoice_url,
            },
            raw_status: invoice.status,
            raw_response: raw,
        })
    }

    async fn create_virtual_account(
        &self,
        request: CreateChannelRequest,
        bank_code: &str,
    ) -> Result<ChannelBundle, ProviderError> {
        let body = wire::CreateVirtualAccountRequest {
            external_id: request.external_id.as_str().to_string(),
            bank_code: bank_code.to_string(),
            name: request.description,
            expected_amount: request.amount.as_rupiah(),
            is_closed: true,
            is_single_use: true,
        };

        let (account, raw): (wire::VirtualAccountResponse, _) = self
            .post_json("/callback_virtual_accounts", &body, false)
            .await?;

        tracing::info!(
            virtual_account_id = %account.id,
            bank_code = %account.bank_code,
            external_id = %request.external_id,
            "virtual account created"
        );

        Ok(ChannelBundle {
            channel: ChannelKind::VirtualAccount,
            invoice_id: None,
            qr_id: None,
            provider_payment_id: Some(account.id),
            instructions: PaymentInstructions::VirtualAccountNumber {
                bank_code: account.bank_code,
                account_number: account.account_number,
            },
            raw_status: account.status,
            raw_response: raw,
        })
    }

    async fn create_qr(
        &self,
        request: CreateChannelRequest,
    ) -> Result<ChannelBundle, ProviderError> {
        let body = wire::CreateQrRequest {
            reference_id: request.external_id.as_str().to_string(),
            qr_type: "DYNAMIC",
            currency: "IDR",
            amount: request.amount.as_rupiah(),
        };

        let (qr, raw): (wire::QrResponse, _) = self.post_json("/qr_codes", &body, true).await?;

        tracing::info!(qr_id = %qr.id, external_id = %request.external_id, "QR code created");

        let instructions = self.qr_instructions(&qr.id, qr.qr_string);
        Ok(ChannelBundle {
            channel: ChannelKind::Qr,
            invoice_id: None,
            qr_id: Some(qr.id),
            provider_payment_id: None,
            instructions,
            raw_status: qr.status,
            raw_response: raw,
        })
    }

    async fn charge_card(
        &self,
        request: CreateChannelRequest,
        token: &str,
    ) -> Result<ChannelBundle, ProviderError> {
        let body = wire::ChargeCardRequest {
            token_id: token.to_string(),
            external_id: request.external_id.as_str().to_string(),
            amount: request.amount.as_rupiah(),
        };

        let (charge, raw): (wire::CardChargeResponse, _) =
            self.post_json("/credit_card_charges", &body, false).await?;

        tracing::info!(
            charge_id = %charge.id,
            status = %charge.status,
            external_id = %request.external_id,
            "card charge attempted"
        );

        Ok(ChannelBundle {
            channel: ChannelKind::Card,
            invoice_id: None,
            qr_id: None,
            provider_payment_id: Some(charge.id.clone()),
            instructions: PaymentInstructions::CardCharged {
                charge_id: charge.id,
            },
            raw_status: charge.status,
            raw_response: raw,
        })
    }

    async fn fetch_invoice_status(&self, invoice_id: &str) -> Result<String, ProviderError> {
        let path = format!("/v2/invoices/{}", invoice_id);
        let (invoice, _): (wire::InvoiceResponse, _) = self.get_json(&path, false).await?;
        Ok(invoice.status)
    }

    async fn fetch_qr_status(&self, qr_id: &str) -> Result<String, ProviderError> {
        let path = format!("/qr_codes/{}", qr_id);
        let (qr, _): (wire::QrResponse, _) = self.get_json(&path, true).await?;
        Ok(qr.status)
    }

    async fn simulate_qr_payment(&self, qr_id: &str, amount: Money) -> Result<(), ProviderError> {
        if !self.test_mode {
            return Err(ProviderError::not_permitted(
                "QR payment simulation requires a development key",
            ));
        }

        let path = format!("/qr_codes/{}/payments/simulate", qr_id);
        let body = wire::SimulateQrPaymentRequest {
            amount: amount.as_rupiah(),
        };
        let (_, _): (serde_json::Value, _) = self.post_json(&path, &body, true).await?;

        tracing::info!(qr_id, "sandbox QR payment simulated");
        Ok(())
    }
}
