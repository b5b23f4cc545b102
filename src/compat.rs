//! Backward-compatibility shim for the retired `{ success, message }` response envelope.
//!
//! Callers written against the old envelope read `success` and `message` off every result. The
//! API no longer returns either field, so [`Compat<T>`] answers them with fixed values and emits a
//! deprecation notice on every read. Everything else derefs to the wrapped value.
//!
//! Whether results are wrapped is resolved per client with this precedence: the
//! [`CompatOverride`] service, then the `UKFUELFINDER_BACKWARD_COMPATIBLE` environment variable,
//! then the per-client [`Config::backward_compatible`](crate::config::Config) flag, then enabled.

// std
use std::{env, ops::Deref, sync::OnceLock};
// self
use crate::{_prelude::*, obs};

/// Environment variable toggling compatibility mode (`1`, `true`, or `yes` enable it).
pub const BACKWARD_COMPATIBLE_ENV: &str = "UKFUELFINDER_BACKWARD_COMPATIBLE";

/// Decorator exposing the retired envelope fields on top of a domain value.
#[derive(Clone, PartialEq)]
pub struct Compat<T> {
	inner: T,
}
impl<T> Compat<T> {
	/// Wraps `inner`.
	pub fn new(inner: T) -> Self {
		Self { inner }
	}

	/// Always `true`; emits a deprecation notice.
	pub fn success(&self) -> bool {
		obs::record_deprecated_field("success");

		true
	}

	/// Always empty; emits a deprecation notice.
	pub fn message(&self) -> &'static str {
		obs::record_deprecated_field("message");

		""
	}

	/// Borrows the wrapped value.
	pub fn inner(&self) -> &T {
		&self.inner
	}

	/// Unwraps the decorator.
	pub fn into_inner(self) -> T {
		self.inner
	}
}
impl<T> Deref for Compat<T> {
	type Target = T;

	fn deref(&self) -> &Self::Target {
		&self.inner
	}
}
impl<T> Debug for Compat<T>
where
	T: Debug,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_tuple("Compat").field(&self.inner).finish()
	}
}
impl<T> Display for Compat<T>
where
	T: Display,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		Display::fmt(&self.inner, f)
	}
}

/// Client result that is wrapped in [`Compat`] only while compatibility mode is active.
#[derive(Clone, Debug, PartialEq)]
pub enum Shimmed<T> {
	/// Compatibility mode off.
	Plain(T),
	/// Compatibility mode on.
	Compat(Compat<T>),
}
impl<T> Shimmed<T> {
	/// Wraps `value` when `enabled`.
	pub fn wrap(value: T, enabled: bool) -> Self {
		if enabled { Self::Compat(Compat::new(value)) } else { Self::Plain(value) }
	}

	/// Returns `true` when the retired envelope fields are available.
	pub fn is_compat(&self) -> bool {
		matches!(self, Self::Compat(_))
	}

	/// Returns the compatibility view, if active.
	pub fn as_compat(&self) -> Option<&Compat<T>> {
		match self {
			Self::Compat(compat) => Some(compat),
			Self::Plain(_) => None,
		}
	}

	/// Drops any wrapper.
	pub fn into_inner(self) -> T {
		match self {
			Self::Plain(value) => value,
			Self::Compat(compat) => compat.into_inner(),
		}
	}
}
impl<T> Deref for Shimmed<T> {
	type Target = T;

	fn deref(&self) -> &Self::Target {
		match self {
			Self::Plain(value) => value,
			Self::Compat(compat) => compat.inner(),
		}
	}
}

/// Process-wide compatibility override, consulted before any other source.
///
/// Clients hold an `Arc` to the instance they were built with, so tests can inject a private
/// override instead of mutating [`CompatOverride::global`].
#[derive(Debug, Default)]
pub struct CompatOverride(RwLock<Option<bool>>);
impl CompatOverride {
	/// Shared process-wide instance.
	pub fn global() -> Arc<Self> {
		static GLOBAL: OnceLock<Arc<CompatOverride>> = OnceLock::new();

		GLOBAL.get_or_init(Default::default).clone()
	}

	/// Forces compatibility mode on or off for every client observing this override.
	pub fn set(&self, enabled: bool) {
		*self.0.write() = Some(enabled);
	}

	/// Removes the override so lower-precedence sources apply again.
	pub fn clear(&self) {
		*self.0.write() = None;
	}

	/// Returns the override, if set.
	pub fn get(&self) -> Option<bool> {
		*self.0.read()
	}
}

/// Reads [`BACKWARD_COMPATIBLE_ENV`]; unset yields `None`, any other value that is not truthy
/// (blank included) yields `Some(false)`.
pub fn env_backward_compatible() -> Option<bool> {
	env::var(BACKWARD_COMPATIBLE_ENV).ok().map(|raw| parse_toggle(&raw))
}

/// Applies the override > environment > client flag > default-on precedence.
pub fn resolve_backward_compatible(
	override_value: Option<bool>,
	env_value: Option<bool>,
	client_value: Option<bool>,
) -> bool {
	override_value.or(env_value).or(client_value).unwrap_or(true)
}

fn parse_toggle(raw: &str) -> bool {
	matches!(raw.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes")
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[derive(Debug, PartialEq)]
	struct Station {
		node_id: &'static str,
	}

	#[test]
	fn compat_fields_are_fixed_and_counted() {
		let before = obs::deprecation_notices();
		let wrapped = Compat::new(Station { node_id: "abc" });

		assert!(wrapped.success());
		assert_eq!(wrapped.message(), "");
		assert_eq!(wrapped.node_id, "abc");
		assert!(obs::deprecation_notices() >= before + 2);
	}

	#[test]
	fn shimmed_derefs_in_both_modes() {
		let plain = Shimmed::wrap(Station { node_id: "p" }, false);
		let compat = Shimmed::wrap(Station { node_id: "c" }, true);

		assert!(!plain.is_compat());
		assert!(compat.as_compat().is_some_and(Compat::success));
		assert_eq!(plain.node_id, "p");
		assert_eq!(compat.node_id, "c");
		assert_eq!(compat.into_inner(), Station { node_id: "c" });
	}

	#[test]
	fn precedence_prefers_override_then_env_then_client() {
		assert!(resolve_backward_compatible(None, None, None));
		assert!(!resolve_backward_compatible(None, None, Some(false)));
		assert!(resolve_backward_compatible(None, Some(true), Some(false)));
		assert!(!resolve_backward_compatible(Some(false), Some(true), Some(true)));
	}

	#[test]
	fn toggle_parsing_accepts_truthy_words() {
		assert!(parse_toggle("YES"));
		assert!(parse_toggle(" 1 "));
		assert!(!parse_toggle("false"));
		assert!(!parse_toggle("off"));
	}

	#[test]
	fn blank_toggle_disables_over_client_flag() {
		let blank = Some(parse_toggle(""));

		assert_eq!(blank, Some(false));
		assert!(!resolve_backward_compatible(None, blank, Some(true)));
	}

	#[test]
	fn override_set_and_clear() {
		let service = CompatOverride::default();

		assert_eq!(service.get(), None);

		service.set(false);

		assert_eq!(service.get(), Some(false));

		service.clear();

		assert_eq!(service.get(), None);
	}
}
