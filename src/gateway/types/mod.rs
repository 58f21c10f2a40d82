//! Gateway types module
//!
//! ## Submodules
//! - [`response`]: Response envelope, `ApiError` and error codes
//! - [`transfer`]: Account and transfer bodies

pub mod response;
pub mod transfer;

pub use response::{ApiError, ApiResponse, ApiResult, created, error_codes, ok};
pub use transfer::{
    AccountData, CreateTransferRequest, OpenAccountRequest, TransferData, TransferRecordData,
};
