//! Conversions from external infrastructure errors into domain errors.

use orderbridge_domain::BridgeError;
use reqwest::Error as HttpError;
use rusqlite::Error as SqlError;

/// Error newtype that keeps conversions on the infrastructure side and can be
/// converted back into the domain error.
#[derive(Debug)]
pub struct InfraError(pub BridgeError);

impl From<InfraError> for BridgeError {
    fn from(value: InfraError) -> Self {
        value.0
    }
}

impl From<BridgeError> for InfraError {
    fn from(value: BridgeError) -> Self {
        InfraError(value)
    }
}

/// Extension trait to make the conversion logic explicit in tests and within
/// this module.
trait IntoBridgeError {
    fn into_bridge(self) -> BridgeError;
}

/* -------------------------------------------------------------------------- */
/* rusqlite::Error → BridgeError */
/* -------------------------------------------------------------------------- */

impl IntoBridgeError for SqlError {
    fn into_bridge(self) -> BridgeError {
        use rusqlite::ffi::ErrorCode;
        use rusqlite::Error as RE;

        match self {
            RE::SqliteFailure(err, maybe_message) => {
                let message = maybe_message.unwrap_or_default();
                match (err.code, err.extended_code) {
                    (ErrorCode::DatabaseBusy, _) => BridgeError::Database("database is busy".into()),
                    (ErrorCode::DatabaseLocked, _) => {
                        BridgeError::Database("database is locked".into())
                    }
                    (ErrorCode::ConstraintViolation, 2067) => {
                        BridgeError::Database("unique constraint violation".into())
                    }
                    (ErrorCode::ConstraintViolation, 787) => {
                        BridgeError::Database("foreign key constraint violation".into())
                    }
                    _ => BridgeError::Database(format!(
                        "sqlite failure {:?} (code {}): {}",
                        err.code, err.extended_code, message
                    )),
                }
            }
            RE::QueryReturnedNoRows => BridgeError::NotFound("no rows returned by query".into()),
            RE::FromSqlConversionFailure(_, _, cause) => {
                BridgeError::Database(format!("failed to convert sqlite value: {cause}"))
            }
            RE::InvalidColumnType(_, _, ty) => {
                BridgeError::Database(format!("invalid column type: {ty}"))
            }
            RE::Utf8Error(_) => BridgeError::Database("invalid UTF-8 returned from sqlite".into()),
            RE::InvalidParameterName(parameter_name) => {
                BridgeError::Database(format!("invalid parameter name: {parameter_name}"))
            }
            RE::InvalidPath(path) => {
                BridgeError::Database(format!("invalid database path: {}", path.to_string_lossy()))
            }
            RE::InvalidQuery => BridgeError::Database("invalid SQL query".into()),
            other => BridgeError::Database(other.to_string()),
        }
    }
}

impl From<SqlError> for InfraError {
    fn from(value: SqlError) -> Self {
        InfraError(value.into_bridge())
    }
}

/* -------------------------------------------------------------------------- */
/* reqwest::Error → BridgeError */
/* -------------------------------------------------------------------------- */

impl IntoBridgeError for HttpError {
    fn into_bridge(self) -> BridgeError {
        if self.is_timeout() {
            return BridgeError::Transport("HTTP request timed out".into());
        }

        if self.is_connect() {
            return BridgeError::Transport("HTTP connection failure".into());
        }

        if let Some(status) = self.status() {
            let code = status.as_u16();
            let message =
                format!("HTTP {} {}", code, status.canonical_reason().unwrap_or("unknown status"));

            return match code {
                401 | 403 => BridgeError::Remote {
                    code: "ERROR_AUTH".into(),
                    message,
                },
                404 => BridgeError::NotFound(message),
                400..=499 => BridgeError::Validation(message),
                _ => BridgeError::Transport(message),
            };
        }

        BridgeError::Transport(self.to_string())
    }
}

impl From<HttpError> for InfraError {
    fn from(value: HttpError) -> Self {
        InfraError(value.into_bridge())
    }
}

/// Map a blocking-task join failure onto the domain error.
pub(crate) fn map_join_error(err: tokio::task::JoinError) -> BridgeError {
    if err.is_cancelled() {
        BridgeError::Internal("database task cancelled".into())
    } else {
        BridgeError::Internal(format!("database task panic: {err}"))
    }
}

/* -------------------------------------------------------------------------- */
/* Tests */
/* -------------------------------------------------------------------------- */
