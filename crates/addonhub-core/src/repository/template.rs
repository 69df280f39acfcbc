//! `{placeholder}` substitution for asset paths.

use crate::{AddonHubError, Result};

/// Values available to asset templates.
#[derive(Debug, Clone, Default)]
pub struct TemplateVars<'a> {
    pub id: &'a str,
    pub owner: &'a str,
    pub repository: &'a str,
    pub git_ref: &'a str,
    pub system: &'a str,
    pub arch: &'a str,
    /// Only set for `<id>-<version>.zip` requests.
    pub version: Option<&'a str>,
}

impl TemplateVars<'_> {
    fn lookup(&self, name: &str) -> Option<&str> {
        match name {
            "id" => Some(self.id),
            "owner" | "username" => Some(self.owner),
            "repository" => Some(self.repository),
            "ref" | "branch" => Some(self.git_ref),
            "system" => Some(self.system),
            "arch" => Some(self.arch),
            "version" => self.version,
            _ => None,
        }
    }
}

/// Substitute every placeholder in `template`. `{{` and `}}` are literal braces.
pub fn render(template: &str, vars: &TemplateVars<'_>) -> Result<String> {
    let invalid = |message: String| AddonHubError::InvalidAssetTemplate {
        template: template.to_string(),
        message,
    };

    let mut out = String::with_capacity(template.len());
    let mut chars = template.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '{' if chars.peek() == Some(&'{') => {
                chars.next();
                out.push('{');
            }
            '}' if chars.peek() == Some(&'}') => {
                chars.next();
                out.push('}');
            }
            '{' => {
                let mut name = String::new();
                loop {
                    match chars.next() {
                        Some('}') => break,
                        Some('{') | None => return Err(invalid("unclosed '{'".to_string())),
                        Some(c) => name.push(c),
                    }
                }
                let value = vars
                    .lookup(&name)
                    .ok_or_else(|| invalid(format!("unknown placeholder {{{}}}", name)))?;
                out.push_str(value);
            }
            '}' => return Err(invalid("single '}' encountered".to_string())),
            c => out.push(c),
        }
    }
    Ok(out)
}
