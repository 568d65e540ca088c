use thiserror::Error;

/// Failures raised while talking to a text-generation backend.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("{0} is not set")] MissingCredential(&'static str),
    #[error("request failed: {0}")] Http(#[from] reqwest::Error),
    #[error("API error ({status}): {body}")] Api { status: u16, body: String },
    #[error("could not decode response: {0}")] Decode(String),
}

#[derive(Error, Debug)]
pub enum CoachError {
    #[error("provider error: {0}")] Provider(#[from] ProviderError),
    #[error("internal error: {0}")] Internal(String),
}
