//! Host-facing contracts: document identity, request handles, tracing.

/// Host-assigned document identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DocId(pub u64);

/// The upstream request a suggestion came from. The cache stores and
/// returns the handle and reads nothing but the request id, which keys
/// the rejection memory.
pub trait RequestSource {
	fn header_request_id(&self) -> &str;
}

/// Diagnostics sink. Never affects behavior.
pub trait TraceSink {
	fn trace(&self, message: &str);
}

/// Default sink forwarding to the `log` facade.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogTraceSink;

impl TraceSink for LogTraceSink {
	fn trace(&self, message: &str) {
		log::trace!("{message}");
	}
}
