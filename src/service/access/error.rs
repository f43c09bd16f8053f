use snafu::Snafu;

use crate::service::gateway::GatewayError;

pub type Result<T, E = AccessError> = ::std::result::Result<T, E>;

#[derive(Debug, Clone, PartialEq, Eq, Snafu)]
#[snafu(visibility(pub(super)))]
pub enum AccessError {
    #[snafu(display("Please enter your student ID and password."))]
    MissingCredentials,

    #[snafu(display("{source}"))]
    Login { source: GatewayError },
}
