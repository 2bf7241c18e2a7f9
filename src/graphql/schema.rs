use async_graphql::{EmptySubscription, Schema};

use super::mutations::MutationRoot;
use super::queries::QueryRoot;

/// GraphQL Schema type
pub type RendezveuxSchema = Schema<QueryRoot, MutationRoot, EmptySubscription>;

/// Build the GraphQL schema. Resolvers expect `PostActions` (and optionally
/// `ValidationConfig`) as request data.
pub fn build_schema() -> RendezveuxSchema {
    Schema::build(QueryRoot, MutationRoot, EmptySubscription).finish()
}
