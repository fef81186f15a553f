/// ## Trace log a generated SQL statement and its parameters.
///
/// ### Arguments
///
/// * `$sql` - The SQL text produced by a query builder.
/// * `$params` - The bound parameters.
/// * `$context` - A short label for the call site.
#[macro_export]
macro_rules! trace_query {
    ($sql:expr, $params:expr, $context:expr) => {
        if tracing::level_enabled!(tracing::Level::TRACE) {
            tracing::trace!(
                message = "Query",
                context = $context,
                query = %$sql,
                params = ?$params
            );
        }
    };
}

/// ## Check a capability against a permission instance for a session user.
///
/// Causes a return with `CoreError::Forbidden` when the instance does not
/// grant the capability to the user.
///
/// ### Example
///
/// ```ignore
/// check_permission!(permission, session_user, Capability::Update);
/// ```
#[macro_export]
macro_rules! check_permission {
    ($instance:expr, $user:expr, $capability:expr) => {{
        use $crate::errors::CoreError;

        if !$instance.can(&$user.user_reference_id, &$user.groups, $capability) {
            tracing::warn!(
                message = "Permission denied",
                user = %$user.user_reference_id,
                capability = ?$capability,
            );
            return Err(CoreError::Forbidden(format!(
                "user [{}] lacks {:?} permission",
                $user.user_reference_id, $capability
            )));
        }
    }};
}
