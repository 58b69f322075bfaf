//! Wire types for the Xendit REST API.
//!
//! Request bodies serialize exactly what the endpoints expect; response
//! types only name the fields the engine reads, everything else stays in
//! the raw JSON kept on the transaction.

use serde::{Deserialize, Serialize};

// ════════════════════════════════════════════════════════════════════════════
// Requests
// ════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Serialize)]
pub struct CreateInvoiceRequest {
    pub external_id: String,
    pub amount: i64,
    pub description: String,
    pub currency: &'static str,

    /// Seconds until the hosted invoice page expires.
    pub invoice_duration: u64,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer: Option<InvoiceCustomer>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub success_redirect_url: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_redirect_url: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct InvoiceCustomer {
    pub email: String,
}

#[derive(Debug, Serialize)]
pub struct CreateVirtualAccountRequest {
    pub external_id: String,
    pub bank_code: String,
    pub name: String,
    pub expected_amount: i64,

    /// Closed accounts reject transfers that do not match expected_amount.
    pub is_closed: bool,
    pub is_single_use: bool,
}

#[derive(Debug, Serialize)]
pub struct CreateQrRequest {
    pub reference_id: String,
    #[serde(rename = "type")]
    pub qr_type: &'static str,
    pub currency: &'static str,
    pub amount: i64,
}

#[derive(Debug, Serialize)]
pub struct ChargeCardRequest {
    pub token_id: String,
    pub external_id: String,
    pub amount: i64,
}

#[derive(Debug, Serialize)]
pub struct SimulateQrPaymentRequest {
    pub amount: i64,
}

// ════════════════════════════════════════════════════════════════════════════
// Responses
// ════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Deserialize)]
pub struct InvoiceResponse {
    pub id: String,
    pub status: String,
    pub invoice_url: String,
}

#[derive(Debug, Deserialize)]
pub struct VirtualAccountResponse {
    pub id: String,
    pub bank_code: String,
    pub account_number: String,
    pub status: String,
}

#[derive(Debug, Deserialize)]
pub struct QrResponse {
    pub id: String,
    pub status: String,

    /// EMV payload; the sandbox sometimes omits it or returns a stub.
    pub qr_string: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CardChargeResponse {
    pub id: String,
    pub status: String,
}

/// Error body Xendit returns on 4xx/5xx.
#[derive(Debug, Deserialize)]
pub struct ApiError {
    pub error_code: Option<String>,
    pub message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invoice_request_omits_absent_optionals() {
        let request = CreateInvoiceRequest {
            external_id: "payment_abc123".to_string(),
            amount: 150_000,
            description: "7 Day Pass".to_string(),
            currency: "IDR",
            invoice_duration: 86_400,
            customer: None,
            success_redirect_url: None,
            failure_redirect_url: None,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["external_id"], "payment_abc123");
        assert_eq!(json["invoice_duration"], 86_400);
        assert!(json.get("customer").is_none());
        assert!(json.get("success_redirect_url").is_none());
    }

    #[test]
    fn qr_request_renames_type_field() {
        let request = CreateQrRequest {
            reference_id: "payment_abc123".to_string(),
            qr_type: "DYNAMIC",
            currency: "IDR",
            amount: 25_000,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["type"], "DYNAMIC");
    }

    #[test]
    fn parses_invoice_response() {
        let body = r#"{
            "id": "649c8e1a2b3c4d5e6f7a8b9c",
            "external_id": "payment_abc123",
            "status": "PENDING",
            "amount": 150000,
            "invoice_url": "https://checkout.xendit.co/web/649c8e1a"
        }"#;
        let invoice: InvoiceResponse = serde_json::from_str(body).unwrap();
        assert_eq!(invoice.id, "649c8e1a2b3c4d5e6f7a8b9c");
        assert_eq!(invoice.status, "PENDING");
    }

    #[test]
    fn parses_qr_response_without_payload() {
        let body = r#"{"id": "qr_abc", "status": "ACTIVE"}"#;
        let qr: QrResponse = serde_json::from_str(body).unwrap();
        assert!(qr.qr_string.is_none());
    }

    #[test]
    fn parses_error_body() {
        let body = r#"{"error_code": "MINIMUM_AMOUNT_ERROR", "message": "Amount too low"}"#;
        let err: ApiError = serde_json::from_str(body).unwrap();
        assert_eq!(err.error_code.as_deref(), Some("MINIMUM_AMOUNT_ERROR"));
    }
}
