//! Query-string parameters for the saved-query endpoints.

use serde::Deserialize;

/// `DELETE /queries/{universal_id}?force=bool`
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct DeleteParams {
    /// Also delete every saved query that depends on the target.
    #[serde(default)]
    pub force: bool,
}
