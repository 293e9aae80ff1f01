use serde::de::DeserializeOwned;
use serde_json::Value;

#[derive(Clone, Debug, PartialEq)]
pub enum Lookup<T> {
    Found(T),
    NotFound,
    Unavailable(UpstreamFailure),
}

#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum UpstreamFailure {
    #[error("upstream returned status {0}")]
    Status(u16),
    #[error("upstream timed out")]
    Timeout,
    #[error("upstream transport error: {0}")]
    Transport(String),
    #[error("upstream sent an unexpected body: {0}")]
    Malformed(String),
}

impl<T> Lookup<T> {
    pub fn or_miss<U>(self) -> Result<T, Lookup<U>> {
        match self {
            Lookup::Found(value) => Ok(value),
            Lookup::NotFound => Err(Lookup::NotFound),
            Lookup::Unavailable(failure) => Err(Lookup::Unavailable(failure)),
        }
    }
}

impl Lookup<Value> {
    pub fn decode<T: DeserializeOwned>(self) -> Lookup<T> {
        match self.or_miss() {
            Ok(value) => match serde_json::from_value(value) {
                Ok(decoded) => Lookup::Found(decoded),
                Err(err) => Lookup::Unavailable(UpstreamFailure::Malformed(err.to_string())),
            },
            Err(miss) => miss,
        }
    }
}
