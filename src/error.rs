use derive_more::{Display, Error};

pub type Error = exn::Exn<ErrorKind>;
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    #[display("could not load configuration")]
    Config,
    #[display("no data source named {_0:?} is configured")]
    UnknownSource(#[error(not(source))] String),
    #[display("scan order {_0:?} already exists with a different reference time")]
    OrderConflict(#[error(not(source))] String),
    #[display("scan order database error")]
    Store,
    #[display("could not write output")]
    Output,
}
