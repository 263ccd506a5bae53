//! VSP Server payment gateway integration
//!
//! Transactions are registered server-to-server by [`TransactionInitiator`];
//! the gateway later posts a signed notification which
//! [`NotificationHandler`] verifies and acknowledges exactly once.

pub mod codec;
pub mod http;
pub mod initiator;
pub mod notification;
pub mod sanitize;
pub mod signature;
pub mod traits;
pub mod types;

pub use self::http::ReqwestTransport;
pub use initiator::TransactionInitiator;
pub use notification::NotificationHandler;
pub use traits::{BaseUrlResolver, HttpTransport, LoggingHooks, NotificationHooks, UrlResolver};
pub use types::{
    Acknowledgement, AcknowledgementStatus, BasketItem, ExtraData, FieldMap, TransactionRecord,
    TransactionRequest, UrlContext,
};
