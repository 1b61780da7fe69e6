//! Best-effort extraction of a failure message from captured output.

/// Scans multi-line process or journal output for a trailing failure
/// line.
///
/// A line is a candidate if it begins with the literal `error:` marker;
/// the last candidate is returned with trailing whitespace trimmed.
/// Returns `None` when no candidate exists, including for empty or
/// whitespace-only input. This is a heuristic over free-form text such
/// as the captured output of a finalize or deploy operation, not a
/// structured log parser.
pub fn extract_error(output: &str) -> Option<&str> {
    output
        .lines()
        .rev()
        .find(|line| line.starts_with("error:"))
        .map(str::trim_end)
}

#[cfg(test)]
mod tests {
    use indoc::indoc;

    use super::*;

    #[test]
    fn test_extract_error() {
        assert_eq!(extract_error(""), None);
        assert_eq!(extract_error("\n"), None);
        assert_eq!(extract_error("   \n\t\n"), None);

        let unrelated = indoc! { "
            Starting rpm-ostreed.service...
            Started rpm-ostreed.service.
            rpm-ostreed.service: Deactivated successfully.
        " };
        assert_eq!(extract_error(unrelated), None);

        let failed = indoc! { "
            Starting ostree-finalize-staged.service...
            ostree-finalize-staged.service: Main process exited, code=exited, status=1/FAILURE
            error: mkdir(boot/loader.0): Operation not permitted
            ostree-finalize-staged.service: Failed with result 'exit-code'.
        " };
        assert_eq!(
            extract_error(failed),
            Some("error: mkdir(boot/loader.0): Operation not permitted")
        );

        // The last candidate wins, and trailing whitespace is trimmed.
        let multiple = "error: first failure\nsome progress line\nerror: second failure \t\n";
        assert_eq!(extract_error(multiple), Some("error: second failure"));
    }
}
