//! Platform application identifier.

// std
use std::ops::Deref;
// self
use crate::_prelude::*;

const APP_ID_MAX_LEN: usize = 64;

/// Error returned when an `appid` fails validation.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum AppIdError {
	/// The `appid` was empty.
	#[error("App identifier cannot be empty.")]
	Empty,
	/// The `appid` contains a character the platform never issues.
	#[error("App identifier contains unsupported character {found:?}.")]
	UnsupportedCharacter {
		/// First offending character.
		found: char,
	},
	/// The `appid` exceeded the allowed length.
	#[error("App identifier exceeds {max} characters.")]
	TooLong {
		/// Maximum permitted length.
		max: usize,
	},
}

/// Application identifier (`appid`) issued by the platform.
///
/// Platform `appid`s are short ASCII tokens such as `wx8f2c01d3e5a7b9c1`; only ASCII
/// alphanumerics, `-` and `_` are accepted, which also keeps the value safe to log and to place in
/// a query string.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AppId(String);
impl AppId {
	/// Validates and wraps a raw `appid`.
	pub fn new(value: impl AsRef<str>) -> Result<Self, AppIdError> {
		let value = value.as_ref();

		validate(value)?;

		Ok(Self(value.to_owned()))
	}

	/// Returns the identifier as a string slice.
	pub fn as_str(&self) -> &str {
		&self.0
	}
}
impl Deref for AppId {
	type Target = str;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}
impl AsRef<str> for AppId {
	fn as_ref(&self) -> &str {
		&self.0
	}
}
impl TryFrom<String> for AppId {
	type Error = AppIdError;

	fn try_from(value: String) -> Result<Self, Self::Error> {
		validate(&value)?;

		Ok(Self(value))
	}
}
impl From<AppId> for String {
	fn from(value: AppId) -> Self {
		value.0
	}
}
impl Debug for AppId {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		write!(f, "AppId({})", self.0)
	}
}
impl Display for AppId {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(&self.0)
	}
}

fn validate(value: &str) -> Result<(), AppIdError> {
	if value.is_empty() {
		return Err(AppIdError::Empty);
	}
	if let Some(found) =
		value.chars().find(|c| !(c.is_ascii_alphanumeric() || *c == '-' || *c == '_'))
	{
		return Err(AppIdError::UnsupportedCharacter { found });
	}
	if value.len() > APP_ID_MAX_LEN {
		return Err(AppIdError::TooLong { max: APP_ID_MAX_LEN });
	}

	Ok(())
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn accepts_platform_shaped_ids() {
		let app = AppId::new("wx8f2c01d3e5a7b9c1").expect("Platform appid should be valid.");

		assert_eq!(app.as_str(), "wx8f2c01d3e5a7b9c1");
		assert_eq!(format!("{app:?}"), "AppId(wx8f2c01d3e5a7b9c1)");
		assert!(AppId::new("wx-test_app").is_ok());
	}

	#[test]
	fn rejects_characters_outside_the_appid_alphabet() {
		assert_eq!(AppId::new(""), Err(AppIdError::Empty));
		assert_eq!(AppId::new("wx 123"), Err(AppIdError::UnsupportedCharacter { found: ' ' }));
		assert_eq!(AppId::new("wx&secret=x"), Err(AppIdError::UnsupportedCharacter { found: '&' }));
		assert_eq!(
			AppId::new("wx\u{00e9}"),
			Err(AppIdError::UnsupportedCharacter { found: '\u{00e9}' })
		);
	}

	#[test]
	fn length_limit_is_enforced() {
		assert!(AppId::new("a".repeat(APP_ID_MAX_LEN)).is_ok());
		assert_eq!(
			AppId::new("a".repeat(APP_ID_MAX_LEN + 1)),
			Err(AppIdError::TooLong { max: APP_ID_MAX_LEN })
		);
	}

	#[test]
	fn deserialization_validates() {
		let app: AppId =
			serde_json::from_str("\"wx42\"").expect("App identifier should deserialize.");

		assert_eq!(app.as_str(), "wx42");
		assert!(serde_json::from_str::<AppId>("\"wx 42\"").is_err());
	}
}
