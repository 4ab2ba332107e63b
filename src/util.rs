use crate::{Error, Result};

/// Root task folder.
pub(crate) const ROOT_TASK_PATH: &str = "\\";

pub(crate) fn validate_task_name(input: &str) -> Result<()> {
    validate_no_control("task name", input)?;
    if input.trim().is_empty() {
        return Err(Error::invalid_input("task name must not be empty"));
    }
    if input.contains('\\') || input.contains('/') {
        return Err(Error::invalid_input(
            "task name must not contain path separators; use the task path instead",
        ));
    }
    Ok(())
}

/// Resolve the task folder: `None` becomes the root `\`, a supplied path is kept verbatim.
pub(crate) fn resolve_task_path(input: Option<&str>) -> Result<String> {
    let Some(path) = input else {
        return Ok(ROOT_TASK_PATH.to_string());
    };
    validate_no_control("task path", path)?;
    if !path.starts_with('\\') {
        return Err(Error::invalid_input("task path must start with '\\'"));
    }
    Ok(path.to_string())
}

pub(crate) fn validate_host(context: &'static str, input: &str) -> Result<()> {
    validate_no_control(context, input)?;
    if input.trim().is_empty() {
        return Err(Error::invalid_input(format!("{context} must not be empty")));
    }
    if input.contains(char::is_whitespace) {
        return Err(Error::invalid_input(format!(
            "{context} must not contain whitespace"
        )));
    }
    Ok(())
}

pub(crate) fn validate_no_control(context: &'static str, input: &str) -> Result<()> {
    if input.contains('\0') {
        return Err(Error::invalid_input(format!(
            "{context} must not contain NUL"
        )));
    }
    if input.contains('\n') || input.contains('\r') {
        return Err(Error::invalid_input(format!(
            "{context} must not contain newlines"
        )));
    }
    if input.chars().any(|c| c.is_control()) {
        return Err(Error::invalid_input(format!(
            "{context} must not contain control characters"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used)]
    #![allow(clippy::panic)]
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn missing_path_defaults_to_root() {
        assert_eq!(resolve_task_path(None).expect("ok"), "\\");
    }

    #[test]
    fn supplied_path_is_kept_verbatim() {
        let path = resolve_task_path(Some("\\Contoso\\Backup\\")).expect("ok");
        assert_eq!(path, "\\Contoso\\Backup\\");

        let dotted = resolve_task_path(Some("\\Backups..old\\")).expect("ok");
        assert_eq!(dotted, "\\Backups..old\\");
    }

    #[test]
    fn relative_path_is_rejected() {
        let err = resolve_task_path(Some("Contoso")).expect_err("must fail");
        let Error::InvalidInput { .. } = err else {
            panic!("unexpected error: {err:?}");
        };
    }

    #[test]
    fn task_name_rejects_empty_and_separators() {
        assert!(validate_task_name("").is_err());
        assert!(validate_task_name("   ").is_err());
        assert!(validate_task_name("a\\b").is_err());
        assert!(validate_task_name("Nightly\n").is_err());
        assert!(validate_task_name("Nightly Backup").is_ok());
    }

    #[test]
    fn host_rejects_whitespace() {
        assert!(validate_host("host", "srv01").is_ok());
        assert!(validate_host("host", "srv 01").is_err());
        assert!(validate_host("host", "").is_err());
    }
}
