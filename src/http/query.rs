//! Raw URL query parsing.
//!
//! The binary `info_hash` and `peer_id` params cannot survive a generic
//! form-decoding extractor, so the query string is split by hand and values
//! stay percent-encoded until the request builder decodes the ones that
//! need it.

use std::str::FromStr;

use multimap::MultiMap;
use thiserror::Error;

#[derive(Debug)]
pub struct Query {
    params: MultiMap<String, String>,
}

impl Query {
    /// The first value of the param, if present.
    #[must_use]
    pub fn get_param(&self, name: &str) -> Option<String> {
        self.params.get(name).cloned()
    }

    /// All values of the param, if present.
    #[must_use]
    pub fn get_param_vec(&self, name: &str) -> Option<Vec<String>> {
        self.params.get_vec(name).cloned()
    }
}

#[derive(Error, Debug)]
pub enum ParseQueryError {
    #[error("invalid param {raw_param}")]
    InvalidParam { raw_param: String },
}

impl FromStr for Query {
    type Err = ParseQueryError;

    fn from_str(raw_query: &str) -> Result<Self, Self::Err> {
        let mut params: MultiMap<String, String> = MultiMap::new();

        for raw_param in raw_query.trim().trim_start_matches('?').split('&') {
            let pair: Vec<&str> = raw_param.split('=').collect();

            if pair.len() != 2 {
                return Err(ParseQueryError::InvalidParam {
                    raw_param: raw_param.to_owned(),
                });
            }

            params.insert(pair[0].to_owned(), pair[1].to_owned());
        }

        Ok(Self { params })
    }
}
