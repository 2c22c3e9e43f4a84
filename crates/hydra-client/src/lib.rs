//! # hydra-client
//!
//! Client side of the session lifecycle. [`ClientTokenGateway`] attaches the
//! stored access token to outgoing requests and, when the server answers 401,
//! refreshes it once for every request that failed at the same time before
//! replaying them.

pub mod config;
pub mod coordinator;
pub mod error;
pub mod gateway;
pub mod storage;
pub mod transport;

pub use config::GatewayConfig;
pub use coordinator::{RefreshCoordinator, RefreshOutcome, RefreshTicket};
pub use error::{ClientError, ClientResult, RefreshError, TransportError};
pub use gateway::{ClientTokenGateway, LoginData, LogoutData};
pub use storage::{MemoryTokenStorage, TokenPair, TokenStorage};
pub use transport::{ApiRequest, HttpResponse, HttpTransport, ReqwestTransport};
