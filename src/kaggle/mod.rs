pub mod archive;
pub mod client;
pub mod credentials;
pub mod metadata;

pub use client::KaggleClient;
pub use credentials::KaggleCredentials;
