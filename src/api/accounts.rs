//! Account endpoints.

use crate::client::MatroidClient;
use crate::error::{ApiError, ErrorKind};
use crate::executor::ApiResult;

impl MatroidClient {
    /// Get user account and credits information.
    ///
    /// `GET /account`
    pub async fn account_info(&self) -> Result<ApiResult, ApiError> {
        self.get_call(self.endpoints.account_info(), ErrorKind::InvalidQuery)
            .await
    }
}
