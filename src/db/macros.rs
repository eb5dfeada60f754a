/// Append `"column = ?N"` to a SET clause when an `Option` is `Some`.
///
/// Keeps the placeholder counter in step with the values the caller pushes
/// afterwards, in the same order.
///
/// ```ignore
/// let mut sets = vec!["updated_at = ?1".to_string()];
/// let mut param_idx = 2u32;
/// push_field!(update.ai_api_key, "ai_api_key", sets, param_idx);
/// ```
#[macro_export]
macro_rules! push_field {
    ($field:expr, $col:literal, $sets:expr, $param_idx:expr) => {
        if $field.is_some() {
            $sets.push(format!("{} = ?{}", $col, $param_idx));
            $param_idx += 1;
        }
    };
}
