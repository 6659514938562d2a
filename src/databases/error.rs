use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum Error {
    #[error("query returned no rows")]
    QueryReturnedNoRows,

    #[error("invalid query")]
    InvalidQuery,

    #[error("could not obtain a connection from the pool")]
    ConnectionPool,
}

impl From<r2d2_sqlite::rusqlite::Error> for Error {
    fn from(err: r2d2_sqlite::rusqlite::Error) -> Self {
        match err {
            r2d2_sqlite::rusqlite::Error::QueryReturnedNoRows => Error::QueryReturnedNoRows,
            _ => Error::InvalidQuery,
        }
    }
}

impl From<r2d2_mysql::mysql::Error> for Error {
    fn from(_: r2d2_mysql::mysql::Error) -> Self {
        Error::InvalidQuery
    }
}

impl From<r2d2::Error> for Error {
    fn from(_: r2d2::Error) -> Self {
        Error::ConnectionPool
    }
}
