pub const INTROSPECTION_QUERY: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/graphql/IntrospectionQuery.graphql"
));

pub const INTROSPECTION_OPERATION: &str = "IntrospectionQuery";
