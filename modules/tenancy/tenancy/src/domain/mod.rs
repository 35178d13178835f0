pub mod dispatcher;
pub mod error;
pub mod events;
pub mod jobs;
pub mod locks;
pub mod pipeline;
pub mod provisioner;
pub mod repo;
pub mod service;
pub mod steps;
pub mod wiring;

#[cfg(test)]
mod service_test;
#[cfg(test)]
mod test_support;
