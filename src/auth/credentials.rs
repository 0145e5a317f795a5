//! Application credentials exchanged for access tokens.

// self
use crate::{
	_prelude::*,
	auth::{AppId, AppSecret},
	error::ConfigError,
};

/// `appid`/`secret` pair presented to the platform's token endpoint.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppCredentials {
	/// Application identifier.
	pub app_id: AppId,
	/// Application secret.
	pub app_secret: AppSecret,
}
impl AppCredentials {
	/// Validates and wraps raw credential strings.
	pub fn new(app_id: impl AsRef<str>, app_secret: impl Into<String>) -> Result<Self, ConfigError> {
		let app_id = AppId::new(app_id)?;
		let app_secret = AppSecret::new(app_secret);

		if app_secret.is_empty() {
			return Err(ConfigError::EmptySecret);
		}

		Ok(Self { app_id, app_secret })
	}
}
