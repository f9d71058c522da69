pub mod config;
pub mod credentials;
pub mod gateway;
pub mod notify;
pub mod policy;
pub mod relay;

#[cfg(test)]
pub(crate) mod test_support;
