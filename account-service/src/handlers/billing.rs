use crate::dtos::{InvoiceResponse, TransactionResponse};
use crate::middleware::CurrentUser;
use crate::services::AccountError;
use axum::{extract::Path, Json};

/// Newest first.
pub async fn list_transactions(CurrentUser(user): CurrentUser) -> Json<Vec<TransactionResponse>> {
    Json(
        user.transactions
            .iter()
            .rev()
            .map(TransactionResponse::from)
            .collect(),
    )
}

pub async fn list_invoices(CurrentUser(user): CurrentUser) -> Json<Vec<InvoiceResponse>> {
    Json(user.invoices.iter().rev().map(InvoiceResponse::from).collect())
}

pub async fn get_invoice(
    CurrentUser(user): CurrentUser,
    Path(invoice_id): Path<String>,
) -> Result<Json<InvoiceResponse>, AccountError> {
    user.invoices
        .iter()
        .find(|invoice| invoice.id == invoice_id)
        .map(|invoice| Json(InvoiceResponse::from(invoice)))
        .ok_or_else(|| AccountError::NotFound(format!("Invoice {} not found", invoice_id)))
}
