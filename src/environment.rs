use std::env;

/// Retrieves an environment variable and splits it into a vector of strings based on a delimiter.
///
/// # Arguments
/// - `var`: The name of the environment variable.
/// - `delimiter`: The character to split the environment variable's value by.
///
/// # Returns
/// - `Vec<String>` without empty entries; an unset variable yields an empty vector.
pub fn get_env_var_as_vec(var: &str, delimiter: char) -> Vec<String> {
    env::var(var)
        .unwrap_or_default()
        .split(delimiter)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Retrieves an environment variable as a path-like string, ignoring blank values.
pub fn get_env_var_path(var: &str) -> Option<String> {
    env::var(var)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_var_as_vec() {
        env::set_var("CTELIG_TEST_VEC", " alpha ; beta;;gamma ");
        assert_eq!(
            get_env_var_as_vec("CTELIG_TEST_VEC", ';'),
            vec!["alpha", "beta", "gamma"]
        );
        env::remove_var("CTELIG_TEST_VEC");
    }

    #[test]
    fn test_unset_env_var() {
        assert!(get_env_var_as_vec("CTELIG_TEST_UNSET_VAR", ';').is_empty());
        assert!(get_env_var_path("CTELIG_TEST_UNSET_VAR").is_none());
    }
}
