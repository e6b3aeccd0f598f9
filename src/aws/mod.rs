pub mod client;
pub mod describe;
pub mod filters;
pub mod instance;
pub mod quotas;
pub mod wait;
