//! Oracle module
//!
//! Abstracts the external text-generation capability behind a trait
//! so the orchestrator can be driven by the real HTTP client in
//! production and by scripted stubs in tests.
//!
//! `ask` returns plain text; `ask_function` additionally requires the
//! capability to choose one of a supplied set of named functions and
//! return decoded arguments for it. `ask_structured` layers the
//! contract checks and decoding on top of `ask_function`.

pub mod cache;
pub mod http_client;

pub use cache::CachedOracle;
pub use http_client::HttpOracle;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from the external text-generation capability
#[derive(Error, Debug)]
pub enum OracleError {
    /// HTTP transport failure (connection, timeout, etc.)
    #[error("Oracle transport error: {0}")]
    Transport(String),

    /// The capability returned a non-success HTTP status
    #[error("Oracle returned error status {status}: {body}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Response body returned with the error status
        body: String,
    },

    /// The capability's response could not be parsed
    #[error("Oracle response could not be parsed: {0}")]
    MalformedResponse(String),

    /// The capability named a function not present in the supplied
    /// set. This is a fatal contract violation, never retried.
    #[error("Oracle called unknown function '{called}', expected one of {declared:?}")]
    UnknownFunction {
        /// Function name the capability chose
        called: String,
        /// Names of the functions that were declared
        declared: Vec<String>,
    },

    /// The function arguments could not be decoded into the
    /// requested type
    #[error("Oracle function arguments could not be decoded: {0}")]
    Decode(String),

    /// The response cache could not be read or written
    #[error("Response cache error: {0}")]
    Cache(String),
}

/// Declaration of a function the oracle may invoke
///
/// Mirrors the chat-completions function schema: a name, a
/// description, and a JSON Schema object for the parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDecl {
    /// Function name the capability must reference
    pub name: String,
    /// Human-readable description guiding the capability's choice
    pub description: String,
    /// JSON Schema for the function arguments
    pub parameters: serde_json::Value,
}

/// A function invocation chosen by the oracle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCall {
    /// Name of the function the capability chose
    pub name: String,
    /// Decoded JSON arguments for the function
    pub arguments: serde_json::Value,
}

/// External text-generation capability
///
/// Implementations must be shareable across concurrent pipeline
/// runs. Failures propagate to the caller unchanged; no internal
/// retry is performed.
#[async_trait]
pub trait Oracle: Send + Sync {
    /// Ask for a plain-text completion of `prompt`
    async fn ask(&self, prompt: &str) -> Result<String, OracleError>;

    /// Ask for a completion constrained to invoke one of the
    /// declared functions, returning the chosen call
    async fn ask_function(
        &self,
        prompt: &str,
        functions: &[FunctionDecl],
    ) -> Result<FunctionCall, OracleError>;
}

/// Ask for a structured result decoded through a callback
///
/// Calls `ask_function`, verifies the returned call names one of the
/// declared functions (anything else is reported as a fatal
/// `UnknownFunction` error), then decodes the arguments via `decode`.
///
/// # Arguments
/// * `oracle` - The capability to query
/// * `prompt` - The prompt to send
/// * `functions` - Set of functions the capability may choose from
/// * `decode` - Callback turning the chosen call into `T`
pub async fn ask_structured<T, F>(
    oracle: &dyn Oracle,
    prompt: &str,
    functions: &[FunctionDecl],
    decode: F,
) -> Result<T, OracleError>
where
    F: FnOnce(FunctionCall) -> Result<T, OracleError>,
{
    let call = oracle.ask_function(prompt, functions).await?;
    if !functions.iter().any(|f| f.name == call.name) {
        return Err(OracleError::UnknownFunction {
            called: call.name,
            declared: functions.iter().map(|f| f.name.clone()).collect(),
        });
    }
    decode(call)
}
