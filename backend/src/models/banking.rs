//! Account, transaction and profile-update DTOs

use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use super::HistoryEntry;

/// PINs are exactly four ASCII digits
pub fn validate_pin(pin: &str) -> Result<(), ValidationError> {
    if pin.len() == 4 && pin.bytes().all(|b| b.is_ascii_digit()) {
        Ok(())
    } else {
        Err(ValidationError::new("pin_format"))
    }
}

/// Mobile numbers are exactly ten ASCII digits
pub fn validate_mobile(mobile: &str) -> Result<(), ValidationError> {
    if mobile.len() == 10 && mobile.bytes().all(|b| b.is_ascii_digit()) {
        Ok(())
    } else {
        Err(ValidationError::new("mobile_format"))
    }
}

fn validate_holder_name(name: &str) -> Result<(), ValidationError> {
    if !name.trim().is_empty() && name.chars().all(|c| c.is_ascii_alphabetic() || c == ' ') {
        Ok(())
    } else {
        Err(ValidationError::new("holder_name_format"))
    }
}

/// Admin request to open a customer account
#[derive(Debug, Deserialize, Validate)]
pub struct CreateAccountRequest {
    #[validate(length(min = 1, max = 64), custom = "validate_holder_name")]
    pub holder_name: String,
    #[validate(custom = "validate_pin")]
    pub pin: String,
    #[validate(custom = "validate_pin")]
    pub vpin: String,
    #[validate(custom = "validate_mobile")]
    pub mobileno: String,
    #[validate(email)]
    pub gmail: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateAccountResponse {
    pub success: bool,
    pub account_no: String,
    pub message: String,
}

/// Account number plus PIN, used by the PIN check and balance enquiry
#[derive(Debug, Deserialize, Validate)]
pub struct PinRequest {
    #[validate(length(min = 3, max = 32))]
    pub acc_no: String,
    #[validate(custom = "validate_pin")]
    pub pin: String,
}

/// Result of a direct PIN check
#[derive(Debug, Serialize, Deserialize)]
pub struct PinCheckResponse {
    pub verified: bool,
    pub outcome: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remaining_attempts: Option<i32>,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BalanceResponse {
    pub success: bool,
    pub balance: i64,
    pub message: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UnlockRequest {
    #[validate(length(min = 3, max = 32))]
    pub acc_no: String,
}

/// Deposit / withdraw request
#[derive(Debug, Deserialize, Validate)]
pub struct TransactionRequest {
    #[validate(length(min = 3, max = 32))]
    pub acc_no: String,
    #[validate(custom = "validate_pin")]
    pub pin: String,
    #[validate(range(min = 1))]
    pub amount: i64,
}

#[derive(Debug, Deserialize, Validate)]
pub struct TransferRequest {
    #[validate(length(min = 3, max = 32))]
    pub acc_no: String,
    #[validate(length(min = 3, max = 32))]
    pub rec_acc_no: String,
    #[validate(custom = "validate_pin")]
    pub pin: String,
    #[validate(range(min = 1))]
    pub amount: i64,
}

/// Ledger operation response
#[derive(Debug, Serialize, Deserialize)]
pub struct TransactionResponse {
    pub success: bool,
    pub message: String,
    pub balance: i64,
}

/// Query string of `GET /history/:acc_no`
#[derive(Debug, Deserialize, Validate)]
pub struct HistoryQuery {
    #[validate(custom = "validate_pin")]
    pub pin: String,
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub history: Vec<HistoryEntry>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ChangePinRequest {
    #[validate(length(min = 3, max = 32))]
    pub acc_no: String,
    #[validate(custom = "validate_pin")]
    pub pin: String,
    #[validate(custom = "validate_pin")]
    pub newpin: String,
    #[validate(custom = "validate_pin")]
    pub vnewpin: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateMobileRequest {
    #[validate(length(min = 3, max = 32))]
    pub acc_no: String,
    #[validate(custom = "validate_pin")]
    pub pin: String,
    #[validate(custom = "validate_mobile")]
    pub omobile: String,
    #[validate(custom = "validate_mobile")]
    pub nmobile: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateEmailRequest {
    #[validate(length(min = 3, max = 32))]
    pub acc_no: String,
    #[validate(custom = "validate_pin")]
    pub pin: String,
    #[validate(email)]
    pub oemail: String,
    #[validate(email)]
    pub nemail: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_pin() {
        assert!(validate_pin("1234").is_ok());
        assert!(validate_pin("0000").is_ok());
        assert!(validate_pin("123").is_err());
        assert!(validate_pin("12345").is_err());
        assert!(validate_pin("12a4").is_err());
    }

    #[test]
    fn test_validate_mobile() {
        assert!(validate_mobile("9876543210").is_ok());
        assert!(validate_mobile("98765").is_err());
        assert!(validate_mobile("98765432x0").is_err());
    }

    #[test]
    fn test_transaction_request_rejects_non_positive_amount() {
        let req = TransactionRequest {
            acc_no: "AC1234567890".to_string(),
            pin: "1234".to_string(),
            amount: -100,
        };
        assert!(req.validate().is_err());

        let req = TransactionRequest {
            acc_no: "AC1234567890".to_string(),
            pin: "1234".to_string(),
            amount: 100,
        };
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_create_account_request_validation() {
        let req = CreateAccountRequest {
            holder_name: "Deposit User".to_string(),
            pin: "1234".to_string(),
            vpin: "1234".to_string(),
            mobileno: "8888888881".to_string(),
            gmail: "du@mail.com".to_string(),
        };
        assert!(req.validate().is_ok());

        let req = CreateAccountRequest {
            holder_name: "R2D2".to_string(),
            pin: "12".to_string(),
            vpin: "1234".to_string(),
            mobileno: "888".to_string(),
            gmail: "not-an-email".to_string(),
        };
        let errors = req.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("holder_name"));
        assert!(fields.contains_key("pin"));
        assert!(fields.contains_key("mobileno"));
        assert!(fields.contains_key("gmail"));
    }
}
