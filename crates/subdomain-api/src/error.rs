use crate::runner::ToolError;
use derive_more::From;

pub type Result<T> = core::result::Result<T, Error>;

#[derive(Debug, From)]
pub enum Error {
    CliUsage(String),

    #[from]
    SystemTime(std::time::SystemTimeError),

    #[from]
    File(std::io::Error),

    #[from]
    SerdeJson(serde_json::Error),

    #[from]
    Tool(ToolError),
}

// region:    --- Error Boilerplate

impl core::fmt::Display for Error {
    fn fmt(&self, fmt: &mut core::fmt::Formatter) -> core::result::Result<(), core::fmt::Error> {
        write!(fmt, "{self:?}")
    }
}

impl std::error::Error for Error {}

// endregion: --- Error Boilerplate
