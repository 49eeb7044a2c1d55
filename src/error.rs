//! Error and result reported by reflection procedures.
use failure::Fail;

#[derive(Debug, Fail, Clone, PartialEq, Eq)]
pub enum Error {
    #[fail(display = "required argument is absent: {}", _0)]
    NullArgument(&'static str),
    #[fail(display = "argument out of range: {}", _0)]
    OutOfRange(String),
    #[fail(display = "invalid argument: {}", _0)]
    InvalidArgument(String),
    #[fail(display = "spirv binary is corrupted: {}", _0)]
    CorruptedSpirv(String),
    #[fail(display = "spirv binary used unsupported feature: {}", _0)]
    UnsupportedSpirv(String),
    #[fail(display = "cannot specialize: {}", _0)]
    InvalidSpecialization(String),
}
impl Error {
    pub(crate) fn corrupted<S: Into<String>>(msg: S) -> Error {
        Error::CorruptedSpirv(msg.into())
    }
    pub(crate) fn unsupported<S: Into<String>>(msg: S) -> Error {
        Error::UnsupportedSpirv(msg.into())
    }
    pub(crate) fn specialization<S: Into<String>>(msg: S) -> Error {
        Error::InvalidSpecialization(msg.into())
    }

    pub fn is_corrupted(&self) -> bool {
        if let Error::CorruptedSpirv(_) = self { true } else { false }
    }
    pub fn is_unsupported(&self) -> bool {
        if let Error::UnsupportedSpirv(_) = self { true } else { false }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
