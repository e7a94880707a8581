//! Production Code Enforcement
//!
//! Production code must not silence dead code warnings and must propagate
//! errors instead of panicking on them. Test modules and test-only files are
//! exempt.

use std::fs;
use std::path::{Path, PathBuf};

/// A rule broken in production code
#[derive(Debug)]
struct Violation {
    file_path: String,
    line_number: usize,
    rule: &'static str,
    context: String,
}

/// Checker for production-code rules
struct ProductionCodeChecker {
    violations: Vec<Violation>,
    files_checked: usize,
}

impl ProductionCodeChecker {
    fn new() -> Self {
        Self {
            violations: Vec::new(),
            files_checked: 0,
        }
    }

    /// Find Rust sources under `src/` of every tdmasat crate
    fn find_rust_files(root: &Path) -> Result<Vec<PathBuf>, Box<dyn std::error::Error>> {
        let mut files = Vec::new();
        for entry in fs::read_dir(root)? {
            let path = entry?.path();
            let is_crate = path
                .file_name()
                .is_some_and(|name| name.to_string_lossy().starts_with("tdmasat-"));
            if is_crate && path.join("src").is_dir() {
                Self::find_rust_files_recursive(&path.join("src"), &mut files, 0)?;
            }
        }
        files.sort();
        Ok(files)
    }

    fn find_rust_files_recursive(
        dir: &Path,
        files: &mut Vec<PathBuf>,
        depth: usize,
    ) -> Result<(), Box<dyn std::error::Error>> {
        if depth > 8 {
            return Ok(());
        }

        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            if path.is_dir() {
                Self::find_rust_files_recursive(&path, files, depth + 1)?;
            } else if path.extension().is_some_and(|ext| ext == "rs") {
                files.push(path);
            }
        }
        Ok(())
    }

    /// Whole-file test modules such as `src/tests.rs`
    fn is_test_file(path: &Path) -> bool {
        path.file_name()
            .is_some_and(|name| name == "tests.rs" || name.to_string_lossy().ends_with("_tests.rs"))
    }

    /// Check source text, stopping at the first `#[cfg(test)]` item
    fn check_source(&mut self, file_path: &str, content: &str) {
        for (index, line) in content.lines().enumerate() {
            let trimmed = line.trim();

            if trimmed == "#[cfg(test)]" {
                break;
            }
            if trimmed.starts_with("//") {
                continue;
            }

            let rule = if trimmed.contains("#[allow(") && trimmed.contains("dead_code") {
                Some("dead code allowance")
            } else if trimmed.contains(".unwrap()") {
                Some("unwrap in production code")
            } else if trimmed.contains(".expect(") {
                Some("expect in production code")
            } else {
                None
            };

            if let Some(rule) = rule {
                self.violations.push(Violation {
                    file_path: file_path.to_string(),
                    line_number: index + 1,
                    rule,
                    context: trimmed.to_string(),
                });
            }
        }
    }

    /// Check all tdmasat crates below `root`
    fn check_workspace(&mut self, root: &Path) -> Result<(), Box<dyn std::error::Error>> {
        for file in Self::find_rust_files(root)? {
            if Self::is_test_file(&file) {
                continue;
            }
            let content = fs::read_to_string(&file)?;
            self.files_checked += 1;
            self.check_source(&file.to_string_lossy(), &content);
        }
        Ok(())
    }

    /// Report violations and return whether the check passed
    fn report_violations(&self) -> bool {
        if self.violations.is_empty() {
            println!(
                "Production code enforcement: {} files checked, no violations found",
                self.files_checked
            );
            return true;
        }

        println!("Production code violations found:");
        println!();
        for violation in &self.violations {
            println!(
                "{}:{} [{}]",
                violation.file_path, violation.line_number, violation.rule
            );
            println!("  {}", violation.context);
        }
        println!();
        println!(
            "Found {} violation(s) in {} file(s) checked",
            self.violations.len(),
            self.files_checked
        );
        println!("Return a Result and use `?`, or move the code into a test module.");

        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_test_file() {
        assert!(ProductionCodeChecker::is_test_file(Path::new("tdmasat-sim/src/tests.rs")));
        assert!(ProductionCodeChecker::is_test_file(Path::new("src/driver_tests.rs")));
        assert!(!ProductionCodeChecker::is_test_file(Path::new("tdmasat-sim/src/driver.rs")));
        assert!(!ProductionCodeChecker::is_test_file(Path::new("src/lib.rs")));
    }

    #[test]
    fn test_violation_detection() {
        let mut checker = ProductionCodeChecker::new();
        let content = r#"
#[allow(dead_code)]
fn unused() {}

fn risky(value: Option<u32>) -> u32 {
    // a comment mentioning .unwrap() is fine
    value.unwrap()
}

fn fallback(value: Option<u32>) -> u32 {
    value.unwrap_or(0)
}

#[cfg(test)]
mod tests {
    fn helper() -> u32 {
        Some(1).unwrap()
    }
}
"#;

        checker.check_source("example.rs", content);

        let lines: Vec<usize> = checker.violations.iter().map(|v| v.line_number).collect();
        assert_eq!(lines, vec![2, 7]);
        assert_eq!(checker.violations[0].rule, "dead code allowance");
        assert_eq!(checker.violations[1].rule, "unwrap in production code");
    }

    #[test]
    fn production_code_enforcement() {
        let mut checker = ProductionCodeChecker::new();

        checker
            .check_workspace(Path::new(".."))
            .expect("Failed to check workspace");

        let passed = checker.report_violations();
        assert!(passed, "Production code violations found - see output above");
        assert!(checker.files_checked > 0);
    }
}
