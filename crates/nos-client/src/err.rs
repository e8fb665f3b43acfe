use thiserror::Error as TError;

#[derive(Debug, TError)]
pub enum Error {
    /// The bus handle could not be opened
    #[error("can't connect to the device: {0}")]
    Connect(#[from] nos_datagram::err::Error),
}
