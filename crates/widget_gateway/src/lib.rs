pub mod error;
pub mod extract;
pub mod gateway;
pub mod protocol;
pub mod resolver;

pub use error::{GatewayError, Result};
pub use extract::{extract_reply, parse_reply_body, ExtractionRule, EXTRACTION_RULES};
pub use gateway::{ChatGateway, HttpGateway, DEFAULT_REQUEST_TIMEOUT};
pub use protocol::{ChatPayload, TransportMessage, TransportRole};
pub use resolver::{ConfigResolver, EndpointSource, ResolvedEndpoint};
