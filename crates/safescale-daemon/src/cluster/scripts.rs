//! Installation script rendering
//!
//! Flavors embed their installation scripts as templates with
//! `{{Key}}` placeholders and two helpers:
//!
//! - `{{inc Key}}` renders the value of `Key` plus one;
//! - `{{errcode "message"}}` renders the numeric exit code registered for
//!   `message`, or 1023 when unknown.
//!
//! Rendering validates that every placeholder resolves, so a typo in a
//! script fails at provisioning time instead of producing broken shell.

use std::collections::BTreeMap;

use safescale_common::{Error, Result};

/// Substitution environment handed to [`render`].
pub type TemplateData = BTreeMap<String, String>;

/// Exit code returned for failure messages no flavor registered.
pub const UNKNOWN_ERROR_CODE: u32 = 1023;

/// Failure labels usable in installation scripts, with their exit codes.
const ERROR_CODES: &[(&str, u32)] = &[
    ("package update failed", 192),
    ("package installation failed", 193),
    ("docker installation failed", 194),
    ("user creation failed", 195),
    ("ssh setup failed", 196),
    ("system hardening failed", 197),
    ("network detection failed", 198),
];

/// Numeric exit code registered for a failure message.
pub fn errcode(msg: &str) -> u32 {
    ERROR_CODES
        .iter()
        .find(|(label, _)| *label == msg)
        .map(|(_, code)| *code)
        .unwrap_or(UNKNOWN_ERROR_CODE)
}

/// The `inc` template helper.
pub fn inc(i: i64) -> i64 {
    i + 1
}

/// Render `template`, substituting every `{{...}}` directive from `data`.
pub fn render(template: &str, data: &TemplateData) -> Result<String> {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let end = after.find("}}").ok_or_else(|| {
            Error::Syntax("unterminated '{{' directive in script template".to_string())
        })?;
        let directive = after[..end].trim();
        out.push_str(&eval_directive(directive, data)?);
        rest = &after[end + 2..];
    }
    out.push_str(rest);
    Ok(out)
}

fn eval_directive(directive: &str, data: &TemplateData) -> Result<String> {
    if let Some(arg) = directive.strip_prefix("errcode ") {
        let msg = arg.trim().trim_matches('"');
        return Ok(errcode(msg).to_string());
    }
    if let Some(key) = directive.strip_prefix("inc ") {
        let key = key.trim();
        let raw = data
            .get(key)
            .ok_or_else(|| Error::Syntax(format!("unknown template key '{key}'")))?;
        let value: i64 = raw
            .parse()
            .map_err(|_| Error::Syntax(format!("template key '{key}' is not numeric: '{raw}'")))?;
        return Ok(inc(value).to_string());
    }
    data.get(directive)
        .cloned()
        .ok_or_else(|| Error::Syntax(format!("unknown template key '{directive}'")))
}

/// A flavor's embedded script directory.
///
/// Boxes are process-wide and published once through a `OnceLock` holder in
/// the flavor module, so concurrent first callers converge on one instance.
pub struct ScriptBox {
    name: &'static str,
    files: &'static [(&'static str, &'static str)],
}

impl ScriptBox {
    pub const fn new(
        name: &'static str,
        files: &'static [(&'static str, &'static str)],
    ) -> Self {
        Self { name, files }
    }

    /// Fetch an embedded script by file name.
    pub fn get(&self, file: &str) -> Result<&'static str> {
        self.files
            .iter()
            .find(|(name, _)| *name == file)
            .map(|(_, content)| *content)
            .ok_or_else(|| {
                Error::not_found(format!(
                    "no script '{file}' in template box '{}'",
                    self.name
                ))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data() -> TemplateData {
        TemplateData::from([
            ("CIDR".to_string(), "192.168.0.0/24".to_string()),
            ("Index".to_string(), "2".to_string()),
        ])
    }

    #[test]
    fn test_render_substitutes_keys() {
        let out = render("network={{CIDR}}", &data()).unwrap();
        assert_eq!(out, "network=192.168.0.0/24");
    }

    #[test]
    fn test_render_inc_helper() {
        let out = render("node-{{inc Index}}", &data()).unwrap();
        assert_eq!(out, "node-3");
    }

    #[test]
    fn test_render_errcode_helper() {
        let out = render("exit {{errcode \"docker installation failed\"}}", &data()).unwrap();
        assert_eq!(out, "exit 194");
        let out = render("exit {{errcode \"no such label\"}}", &data()).unwrap();
        assert_eq!(out, "exit 1023");
    }

    #[test]
    fn test_render_rejects_unknown_key() {
        assert!(matches!(
            render("{{Missing}}", &data()),
            Err(Error::Syntax(_))
        ));
    }

    #[test]
    fn test_render_rejects_unterminated_directive() {
        assert!(matches!(
            render("{{CIDR", &data()),
            Err(Error::Syntax(_))
        ));
    }

    #[test]
    fn test_script_box_lookup() {
        static BOX: ScriptBox = ScriptBox::new("test", &[("a.sh", "echo a")]);
        assert_eq!(BOX.get("a.sh").unwrap(), "echo a");
        assert!(matches!(BOX.get("b.sh"), Err(Error::NotFound(_))));
    }
}
