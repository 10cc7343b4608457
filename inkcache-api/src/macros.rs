//! Macros for reducing boilerplate in the API layer.

/// Implement `axum::extract::FromRef<AppState>` for a field of `AppState`.
///
/// # Example
/// ```ignore
/// impl_from_ref!(Arc<RenderPipeline>, pipeline);
/// // Expands to:
/// impl axum::extract::FromRef<AppState> for Arc<RenderPipeline> {
///     fn from_ref(state: &AppState) -> Self {
///         state.pipeline.clone()
///     }
/// }
/// ```
#[macro_export]
macro_rules! impl_from_ref {
    ($type:ty, $field:ident) => {
        impl axum::extract::FromRef<$crate::state::AppState> for $type {
            fn from_ref(state: &$crate::state::AppState) -> Self {
                state.$field.clone()
            }
        }
    };
}
