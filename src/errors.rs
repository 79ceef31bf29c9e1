use uuid::Uuid;

/// All error types that can occur when interacting with a light engine fleet.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A transport-level operation failed while talking to a peripheral.
    #[error("transport {action} error: {detail}")]
    Transport { action: String, detail: String },

    /// A connected peripheral does not expose the expected GATT service.
    #[error("service {0} not found on peripheral")]
    ServiceNotFound(Uuid),

    /// The control service exists but lacks the expected characteristic.
    #[error("characteristic {0} not found on peripheral")]
    CharacteristicNotFound(Uuid),

    /// A byte sequence could not be decoded as a valid command frame.
    #[error("invalid frame: {0}")]
    InvalidFrame(String),

    /// Failed to parse a [`crate::ColorRgbw`] from a string.
    #[error("invalid color string: {0}")]
    InvalidColorString(String),

    /// No handle exists at the given discovery index.
    #[error("no light at index {0}")]
    LightNotFound(usize),
}

impl Error {
    /// Create a new transport error.
    pub fn transport(action: &str, detail: impl ToString) -> Self {
        Error::Transport {
            action: action.to_string(),
            detail: detail.to_string(),
        }
    }
}

/// Hacky implementation of PartialEq for testing
#[cfg(test)]
impl PartialEq for Error {
    fn eq(&self, other: &Self) -> bool {
        self.to_string() == other.to_string()
    }
}
