pub mod http;
pub mod nmcli;
pub mod traits;

pub use http::ReqwestHttpClient;
pub use nmcli::NmcliRadio;
pub use traits::{HttpClient, HttpResponse, WifiRadio};
