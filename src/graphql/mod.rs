pub mod mutations;
pub mod queries;
pub mod schema;
pub mod types;

use async_graphql::{Error, ErrorExtensions};

use crate::posts::ActionError;

pub use schema::{build_schema, RendezveuxSchema};

/// Convert an action failure into a GraphQL error tagged with its category.
pub(crate) fn action_error(err: ActionError) -> Error {
    let code = match err {
        ActionError::NotFound(_) => "NOT_FOUND",
        ActionError::Failed { .. } => "OPERATION_FAILED",
    };
    Error::new(err.to_string()).extend_with(|_, ext| ext.set("code", code))
}
