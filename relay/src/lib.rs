// Relay endpoint: forwards chat payloads to the generative-language API
// with a server-held credential the client never sees.

pub mod config;
pub mod errors;
pub mod http_server;
pub mod upstream;
