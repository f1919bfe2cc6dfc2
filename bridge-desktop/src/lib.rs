//! Native HTTP transport for the Feishu connector.
//!
//! ```ignore
//! let http = Arc::new(bridge_desktop::ReqwestHttpClient::new()?);
//! let connector = FeishuConnector::new(http, app_id, app_secret);
//! ```

mod http;

pub use http::ReqwestHttpClient;
