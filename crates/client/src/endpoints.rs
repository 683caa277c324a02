//! Named helpers for the interfaces the client is routinely used with.
//!
//! Each helper picks the interface code and decode strategy, and encrypts
//! according to [`EfrisClient::encrypt_by_default`]. Business payloads are
//! passed through as any `Serialize` value.

use efris_protocol::{Expected, InterfaceCode};
use serde::Serialize;

use crate::error::Result;
use crate::interpreter::Reply;
use crate::service::EfrisClient;
use crate::transport::Transport;

/// Paging filter for the goods query (T127).
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GoodsQuery {
    /// 1-based page number.
    pub page_no: String,
    /// Rows per page.
    pub page_size: String,
    /// Optional goods code filter.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub goods_code: Option<String>,
    /// Optional goods name filter.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub goods_name: Option<String>,
}

impl GoodsQuery {
    /// Query for one page of goods.
    pub fn page(page_no: u32, page_size: u32) -> Self {
        Self {
            page_no: page_no.to_string(),
            page_size: page_size.to_string(),
            ..Default::default()
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StockTransfer<'a, P: ?Sized, I> {
    goods_stock_transfer: &'a P,
    goods_stock_transfer_item: &'a [I],
}

impl<T: Transport> EfrisClient<T> {
    async fn call<P: Serialize + ?Sized>(
        &self,
        payload: &P,
        interface: InterfaceCode,
        expected: Expected,
    ) -> Result<Reply> {
        self.send(payload, interface, expected, self.encrypt_by_default())
            .await
    }

    /// Registers or updates goods (T130). Replies with per-item results.
    pub async fn configure_product<P: Serialize + ?Sized>(&self, products: &P) -> Result<Reply> {
        self.call(products, InterfaceCode::GoodsUpload, Expected::Array)
            .await
    }

    /// Pages through registered goods (T127).
    pub async fn query_product(&self, query: &GoodsQuery) -> Result<Reply> {
        self.call(query, InterfaceCode::GoodsQuery, Expected::Record)
            .await
    }

    /// Stock increase or decrease (T131).
    pub async fn manage_stock<P: Serialize + ?Sized>(&self, stock: &P) -> Result<Reply> {
        self.call(stock, InterfaceCode::StockMaintain, Expected::Array)
            .await
    }

    /// Moves stock between branches (T139).
    pub async fn transfer_stock<P: Serialize + ?Sized, I: Serialize>(
        &self,
        transfer: &P,
        items: &[I],
    ) -> Result<Reply> {
        let body = StockTransfer {
            goods_stock_transfer: transfer,
            goods_stock_transfer_item: items,
        };
        self.call(&body, InterfaceCode::StockTransfer, Expected::Array)
            .await
    }

    /// Uploads an invoice for fiscalization (T109).
    pub async fn fiscalize_invoice<P: Serialize + ?Sized>(&self, invoice: &P) -> Result<Reply> {
        self.call(invoice, InterfaceCode::InvoiceUpload, Expected::Record)
            .await
    }

    /// Fetches one invoice by number (T108).
    pub async fn retrieve_invoice(&self, invoice_no: &str) -> Result<Reply> {
        let body = serde_json::json!({ "invoiceNo": invoice_no });
        self.call(&body, InterfaceCode::InvoiceDetails, Expected::Record)
            .await
    }

    /// Searches invoices (T106).
    pub async fn query_invoice<P: Serialize + ?Sized>(&self, filter: &P) -> Result<Reply> {
        self.call(filter, InterfaceCode::InvoiceQuery, Expected::Record)
            .await
    }

    /// Applies for a credit note (T110).
    pub async fn issue_credit_note<P: Serialize + ?Sized>(&self, application: &P) -> Result<Reply> {
        self.call(application, InterfaceCode::CreditNoteApplication, Expected::Record)
            .await
    }

    /// Searches credit note applications (T111).
    pub async fn query_credit_note<P: Serialize + ?Sized>(&self, filter: &P) -> Result<Reply> {
        self.call(filter, InterfaceCode::CreditNoteQuery, Expected::Record)
            .await
    }

    /// Fetches one credit note application by id (T112).
    pub async fn retrieve_credit_note(&self, id: &str) -> Result<Reply> {
        let body = serde_json::json!({ "id": id });
        self.call(&body, InterfaceCode::CreditNoteDetails, Expected::Record)
            .await
    }

    /// Cancels a credit note application (T114).
    pub async fn cancel_credit_note<P: Serialize + ?Sized>(&self, cancellation: &P) -> Result<Reply> {
        self.call(cancellation, InterfaceCode::CreditNoteCancel, Expected::Array)
            .await
    }

    /// Looks up a taxpayer by TIN (T119).
    pub async fn tin_info(&self, tin: &str) -> Result<Reply> {
        let body = serde_json::json!({ "tin": tin });
        self.call(&body, InterfaceCode::TaxpayerInfo, Expected::Record)
            .await
    }
}
