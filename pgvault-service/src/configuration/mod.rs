//! Tenant payment-gateway configuration lifecycle.

mod requests;
mod service;

#[cfg(test)]
mod tests;

pub use requests::{
    ApproveRequest, ConfigurationDetail, CreateConfigurationRequest, ListQuery, RejectRequest,
    UpdateConfigurationRequest,
};
pub use service::PgConfigurationService;
