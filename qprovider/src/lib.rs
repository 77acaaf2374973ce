//! Vendor adapters and the normalized streaming model for quill.
//!
//! Every vendor, whatever its wire dialect, is reduced to the same contract:
//! a [`ProviderRequest`] goes in, a finite ordered sequence of
//! [`StreamEvent`]s comes out, terminated by exactly one `Done` or `Error`.

mod capability;
mod credentials;
mod error;
mod model;
pub mod multimodal;
mod provider;
mod registry;
mod stream;
mod transport;

pub mod adapters;

pub use capability::{
    DEFAULT_MAX_TOKENS, DEFAULT_TEMPERATURE, ModelCatalog, ModelSpec, TEMPERATURE_PARAM,
};
pub use credentials::{CredentialManager, SecretString};
pub use error::{ProviderError, ProviderErrorKind};
pub use model::{Attachment, Message, ProviderId, ProviderModel, ProviderRequest, Role};
pub use multimodal::{
    ComposedMessage, ContentPart, ImageMime, MessageContent, attach_to_messages,
};
pub use provider::ProviderAdapter;
pub use registry::AdapterRegistry;
pub use stream::{BoxedEventIterator, StreamEvent, VecEventIterator, error_events};
pub use transport::{BoxedPayloadIterator, HttpStreamTransport, StreamTransport, WireRequest};
