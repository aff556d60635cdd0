use std::fmt;

#[derive(Debug)]
pub enum CascadeError {
    Stylesheet(String),
    InvalidConfiguration(String),
    Io(std::io::Error),
}

impl fmt::Display for CascadeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CascadeError::Stylesheet(message) => write!(f, "stylesheet error: {}", message),
            CascadeError::InvalidConfiguration(message) => {
                write!(f, "invalid configuration: {}", message)
            }
            CascadeError::Io(err) => write!(f, "io error: {}", err),
        }
    }
}

impl std::error::Error for CascadeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CascadeError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for CascadeError {
    fn from(value: std::io::Error) -> Self {
        CascadeError::Io(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn io_errors_keep_their_source() {
        let err: CascadeError = std::io::Error::new(std::io::ErrorKind::NotFound, "gone").into();
        assert!(err.source().is_some());
        assert_eq!(err.to_string(), "io error: gone");
    }

    #[test]
    fn stylesheet_errors_have_no_source() {
        let err = CascadeError::Stylesheet("unexpected token".to_string());
        assert!(err.source().is_none());
        assert_eq!(err.to_string(), "stylesheet error: unexpected token");
    }
}
