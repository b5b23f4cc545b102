//! Client credentials, redacted secrets, and the OAuth2 token manager.

pub mod manager;
pub mod secret;

pub use manager::*;
pub use secret::*;

// self
use crate::_prelude::*;

/// OAuth2 client credentials; immutable for the lifetime of a client.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
	/// Client identifier issued by the service.
	pub client_id: String,
	/// Client secret; callers must avoid logging it.
	pub client_secret: Secret,
}
impl Credentials {
	/// Creates a credential pair.
	pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
		Self { client_id: client_id.into(), client_secret: Secret::new(client_secret) }
	}
}
impl Debug for Credentials {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Credentials")
			.field("client_id", &self.client_id)
			.field("client_secret", &self.client_secret)
			.finish()
	}
}
