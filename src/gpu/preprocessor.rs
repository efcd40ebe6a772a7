use std::collections::{HashMap, HashSet};

use crate::error::{SortError, SortResult};

/// Simple WGSL preprocessor
///
/// Resolves `#include "name"` directives against sources registered up front
/// (shaders are embedded with `include_str!`, so nothing is read from disk at
/// runtime) and substitutes `{name}` placeholders for values only known when a
/// pipeline is built, such as the tile size that fixes `@workgroup_size`.
pub struct WgslPreprocessor {
    includes: HashMap<String, String>,
    defines: Vec<(String, String)>,
}

impl WgslPreprocessor {
    pub fn new() -> Self {
        Self {
            includes: HashMap::new(),
            defines: Vec::new(),
        }
    }

    /// Make `source` available to `#include "name"`
    pub fn add_include(&mut self, name: &str, source: &str) -> &mut Self {
        self.includes.insert(name.to_string(), source.to_string());
        self
    }

    /// Replace every `{name}` with `value`
    pub fn define(&mut self, name: &str, value: impl ToString) -> &mut Self {
        self.defines.push((format!("{{{}}}", name), value.to_string()));
        self
    }

    /// Process a shader: resolve includes, then substitute placeholders
    pub fn process(&self, content: &str) -> SortResult<String> {
        let mut visited = HashSet::new();
        let mut result = self.process_content(content, &mut visited)?;

        for (placeholder, value) in &self.defines {
            result = result.replace(placeholder, value);
        }

        if let Some(start) = find_placeholder(&result) {
            let end = result[start..].find('}').map_or(result.len(), |e| start + e + 1);
            return Err(SortError::Shader(format!(
                "unresolved placeholder {}",
                &result[start..end]
            )));
        }

        Ok(result)
    }

    fn process_content(&self, content: &str, visited: &mut HashSet<String>) -> SortResult<String> {
        let mut result = String::with_capacity(content.len());

        for line in content.lines() {
            if let Some(include_name) = Self::parse_include_directive(line) {
                let included = self.includes.get(&include_name).ok_or_else(|| {
                    SortError::Shader(format!("Could not find include file: {}", include_name))
                })?;

                // Prevent circular includes
                if visited.insert(include_name.clone()) {
                    let processed = self.process_content(included, visited)?;

                    result.push_str("// Begin include: ");
                    result.push_str(&include_name);
                    result.push('\n');
                    result.push_str(&processed);
                    result.push_str("// End include: ");
                    result.push_str(&include_name);
                    result.push('\n');
                } else {
                    result.push_str("// Skipped repeated include: ");
                    result.push_str(&include_name);
                    result.push('\n');
                }
            } else {
                result.push_str(line);
                result.push('\n');
            }
        }

        Ok(result)
    }

    /// Parse an #include directive from a line
    fn parse_include_directive(line: &str) -> Option<String> {
        let trimmed = line.trim();
        let after_include = trimmed.strip_prefix("#include")?.trim();

        // Support both #include "file.wgsl" and #include <file.wgsl>
        if after_include.len() >= 2 && after_include.starts_with('"') && after_include.ends_with('"') {
            Some(after_include.trim_matches('"').to_string())
        } else if after_include.starts_with('<') && after_include.ends_with('>') {
            Some(
                after_include
                    .trim_start_matches('<')
                    .trim_end_matches('>')
                    .to_string(),
            )
        } else {
            None
        }
    }
}

impl Default for WgslPreprocessor {
    fn default() -> Self {
        Self::new()
    }
}

/// Position of a leftover `{identifier}` placeholder
///
/// WGSL braces around code blocks never enclose a bare identifier, so only
/// `{name}` forms with an identifier body count.
fn find_placeholder(source: &str) -> Option<usize> {
    let bytes = source.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'{' {
            let body_start = i + 1;
            let mut j = body_start;
            while j < bytes.len() && (bytes[j].is_ascii_alphanumeric() || bytes[j] == b'_') {
                j += 1;
            }
            if j > body_start && j < bytes.len() && bytes[j] == b'}' {
                return Some(i);
            }
        }
        i += 1;
    }
    None
}
