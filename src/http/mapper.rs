//! Conversion of transport failures into client errors.

// self
use crate::{
	_prelude::*,
	error::TransportError,
};
#[cfg(feature = "reqwest")] use crate::error::{ConfigError, TransientError};

/// Maps HTTP transport failures into client [`Error`] values.
pub trait TransportErrorMapper<E>
where
	Self: 'static + Send + Sync,
	E: 'static + Send + Sync + StdError,
{
	/// Converts a transport error raised while calling `url` into a client error.
	fn map_transport_error(&self, url: &Url, error: E) -> Error;
}

/// Default mapper for reqwest-backed transports.
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug, Default)]
pub struct ReqwestTransportErrorMapper;
#[cfg(feature = "reqwest")]
impl TransportErrorMapper<ReqwestError> for ReqwestTransportErrorMapper {
	fn map_transport_error(&self, url: &Url, err: ReqwestError) -> Error {
		if err.is_builder() {
			return ConfigError::from(err).into();
		}
		if err.is_timeout() {
			return TransientError::Timeout {
				url: url.to_string(),
				status: err.status().map(|code| code.as_u16()),
			}
			.into();
		}

		TransportError::from(err).into()
	}
}

/// Mapper for custom transports whose errors carry no extra classification.
///
/// Every failure is reported as [`TransportError::Network`].
#[derive(Clone, Debug, Default)]
pub struct NetworkErrorMapper;
impl<E> TransportErrorMapper<E> for NetworkErrorMapper
where
	E: 'static + Send + Sync + StdError,
{
	fn map_transport_error(&self, _url: &Url, err: E) -> Error {
		TransportError::network(err).into()
	}
}
