use std::error::Error as StdError;
use std::fmt;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorKind {
    Internal,
    Usage,
    UnknownAttribute,
    NoMorePages,
    Reentrant,
    NotFound,
    Permission,
    RateLimited,
    Server,
    Io,
    Decode,
}

impl ErrorKind {
    /// True for failures raised by a fetch against the remote API rather than
    /// by local bookkeeping.
    pub fn is_fetch_failure(self) -> bool {
        matches!(
            self,
            ErrorKind::NotFound
                | ErrorKind::Permission
                | ErrorKind::RateLimited
                | ErrorKind::Server
                | ErrorKind::Io
                | ErrorKind::Decode
        )
    }
}

#[derive(Debug)]
pub struct Error {
    kind: ErrorKind,
    message: Option<String>,
    entity: Option<&'static str>,
    field: Option<String>,
    path: Option<String>,
    status: Option<u16>,
    source: Option<Box<dyn StdError + Send + Sync>>,
}

impl Error {
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            message: None,
            entity: None,
            field: None,
            path: None,
            status: None,
            source: None,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn entity(&self) -> Option<&'static str> {
        self.entity
    }

    pub fn field(&self) -> Option<&str> {
        self.field.as_deref()
    }

    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    pub fn status(&self) -> Option<u16> {
        self.status
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_entity(mut self, entity: &'static str) -> Self {
        self.entity = Some(entity);
        self
    }

    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_source(mut self, source: impl StdError + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.kind)?;
        if let Some(message) = &self.message {
            write!(f, ": {message}")?;
        }
        match (self.entity, &self.field) {
            (Some(entity), Some(field)) => write!(f, " ({entity}.{field})")?,
            (Some(entity), None) => write!(f, " ({entity})")?,
            (None, Some(field)) => write!(f, " (field: {field})")?,
            (None, None) => {}
        }
        if let Some(path) = &self.path {
            write!(f, " (path: {path})")?;
        }
        if let Some(status) = self.status {
            write!(f, " (status: {status})")?;
        }
        Ok(())
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_ref()
            .map(|source| source.as_ref() as &(dyn StdError + 'static))
    }
}

/// Treat a missing remote resource as an absent value.
pub trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>, Error>;
}

impl<T> OptionalExt<T> for Result<T, Error> {
    fn optional(self) -> Result<Option<T>, Error> {
        match self {
            Ok(value) => Ok(Some(value)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err),
        }
    }
}

pub fn to_exit_code(kind: ErrorKind) -> i32 {
    match kind {
        ErrorKind::Internal => 1,
        ErrorKind::Usage => 2,
        ErrorKind::NotFound => 3,
        ErrorKind::UnknownAttribute => 4,
        ErrorKind::NoMorePages => 5,
        ErrorKind::Reentrant => 6,
        ErrorKind::Permission => 7,
        ErrorKind::RateLimited => 8,
        ErrorKind::Server => 9,
        ErrorKind::Io => 10,
        ErrorKind::Decode => 11,
    }
}
