//! Interface codes selecting the server-side operation.

use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

/// A server-recognized operation selector carried in `globalInfo.interfaceCode`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum InterfaceCode {
    /// `T104`: session key exchange.
    KeyExchange,
    /// `T106`: paged invoice query.
    InvoiceQuery,
    /// `T108`: invoice details by number.
    InvoiceDetails,
    /// `T109`: invoice upload (fiscalization).
    InvoiceUpload,
    /// `T110`: credit note application.
    CreditNoteApplication,
    /// `T111`: credit note application query.
    CreditNoteQuery,
    /// `T112`: credit note application details.
    CreditNoteDetails,
    /// `T114`: cancel a credit note application.
    CreditNoteCancel,
    /// `T119`: taxpayer lookup by TIN.
    TaxpayerInfo,
    /// `T127`: paged goods query.
    GoodsQuery,
    /// `T130`: goods upload.
    GoodsUpload,
    /// `T131`: goods stock maintenance.
    StockMaintain,
    /// `T139`: goods stock transfer.
    StockTransfer,
    /// Any code this crate has no name for.
    Other(String),
}

impl InterfaceCode {
    /// Returns the wire code, e.g. `"T104"`.
    pub fn as_str(&self) -> &str {
        match self {
            InterfaceCode::KeyExchange => "T104",
            InterfaceCode::InvoiceQuery => "T106",
            InterfaceCode::InvoiceDetails => "T108",
            InterfaceCode::InvoiceUpload => "T109",
            InterfaceCode::CreditNoteApplication => "T110",
            InterfaceCode::CreditNoteQuery => "T111",
            InterfaceCode::CreditNoteDetails => "T112",
            InterfaceCode::CreditNoteCancel => "T114",
            InterfaceCode::TaxpayerInfo => "T119",
            InterfaceCode::GoodsQuery => "T127",
            InterfaceCode::GoodsUpload => "T130",
            InterfaceCode::StockMaintain => "T131",
            InterfaceCode::StockTransfer => "T139",
            InterfaceCode::Other(code) => code,
        }
    }

    /// Whether this is the key-exchange bootstrap operation.
    pub fn is_key_exchange(&self) -> bool {
        matches!(self, InterfaceCode::KeyExchange)
    }
}

impl From<&str> for InterfaceCode {
    fn from(code: &str) -> Self {
        match code.trim().to_ascii_uppercase().as_str() {
            "T104" => InterfaceCode::KeyExchange,
            "T106" => InterfaceCode::InvoiceQuery,
            "T108" => InterfaceCode::InvoiceDetails,
            "T109" => InterfaceCode::InvoiceUpload,
            "T110" => InterfaceCode::CreditNoteApplication,
            "T111" => InterfaceCode::CreditNoteQuery,
            "T112" => InterfaceCode::CreditNoteDetails,
            "T114" => InterfaceCode::CreditNoteCancel,
            "T119" => InterfaceCode::TaxpayerInfo,
            "T127" => InterfaceCode::GoodsQuery,
            "T130" => InterfaceCode::GoodsUpload,
            "T131" => InterfaceCode::StockMaintain,
            "T139" => InterfaceCode::StockTransfer,
            _ => InterfaceCode::Other(code.to_string()),
        }
    }
}

impl FromStr for InterfaceCode {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from(s))
    }
}

impl fmt::Display for InterfaceCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_codes_roundtrip_through_str() {
        let codes = [
            InterfaceCode::KeyExchange,
            InterfaceCode::InvoiceQuery,
            InterfaceCode::InvoiceDetails,
            InterfaceCode::InvoiceUpload,
            InterfaceCode::CreditNoteApplication,
            InterfaceCode::CreditNoteQuery,
            InterfaceCode::CreditNoteDetails,
            InterfaceCode::CreditNoteCancel,
            InterfaceCode::TaxpayerInfo,
            InterfaceCode::GoodsQuery,
            InterfaceCode::GoodsUpload,
            InterfaceCode::StockMaintain,
            InterfaceCode::StockTransfer,
        ];
        for code in codes {
            assert_eq!(InterfaceCode::from(code.as_str()), code);
        }
    }

    #[test]
    fn test_lowercase_code_is_recognized() {
        assert_eq!(InterfaceCode::from("t104"), InterfaceCode::KeyExchange);
    }

    #[test]
    fn test_unknown_code_is_preserved() {
        let code: InterfaceCode = "T999".parse().unwrap();
        assert_eq!(code, InterfaceCode::Other("T999".to_string()));
        assert_eq!(code.to_string(), "T999");
        assert!(!code.is_key_exchange());
    }
}
