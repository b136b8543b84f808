//! Assertion helpers shared by the session test modules.

/// Asserts that a vector contains at least one element matching the pattern
/// (with an optional guard expression).
macro_rules! assert_vec_contains {
    ($vector:expr, $pattern:pat) => {
        assert_vec_contains!($vector, $pattern if true)
    };

    ($vector:expr, $pattern:pat if $cond:expr) => {{
        let mut found = false;
        for item in $vector.iter() {
            match item {
                $pattern if $cond => {
                    found = true;
                }
                _ => (),
            }
        }

        if !found {
            panic!(
                "Vector with {} elements did not contain a match for '{}'",
                $vector.len(),
                stringify!($pattern)
            );
        }
    }};
}
