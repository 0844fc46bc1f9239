// fsgate - Gate (Primary Enforcement Point)
// Copyright 2026 Joseph Stone - All Rights Reserved
//
// Every destructive operation passes through here. Classify -> Decide.
// One policy for every destructive operation (file delete, directory
// delete, move, rename):
//   - system-critical warnings always block
//   - boundary and dangerous-extension warnings block unless the
//     dangerous-operations override is on
//   - size advisories never block
// Non-destructive operations never block; their warnings are prefixed.

use crate::config::ServerConfig;
use crate::outcome::Outcome;
use crate::security::{classify, Classification, Warning};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Destructive operations the gate decides on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    DeleteFile,
    DeleteDirectory,
    Move,
    Rename,
}

impl Operation {
    fn headline(self) -> &'static str {
        match self {
            Operation::DeleteFile | Operation::DeleteDirectory => "Deletion blocked",
            Operation::Move => "Move blocked",
            Operation::Rename => "Rename blocked",
        }
    }

    fn aftermath(self) -> &'static str {
        match self {
            Operation::DeleteFile => "File was NOT deleted.",
            Operation::DeleteDirectory => "Directory was NOT deleted.",
            Operation::Move => "File was NOT moved.",
            Operation::Rename => "File was NOT renamed.",
        }
    }
}

/// Whether a destructive call proceeds, and the warnings behind that
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateDecision {
    pub allowed: bool,
    pub operation: Operation,
    /// Every warning raised for the paths involved
    pub warnings: Vec<Warning>,
    /// The subset that stopped the operation
    pub blocking: Vec<Warning>,
}

impl GateDecision {
    /// Blocked outcome listing the blocking warnings and how to proceed
    pub fn into_blocked_outcome(self) -> Outcome {
        let critical = self.blocking.iter().any(|w| !w.is_overridable());
        let overridable = self.blocking.iter().any(|w| w.is_overridable());

        let mut advice = vec![self.operation.aftermath().to_string()];
        if critical {
            advice.push("System-critical locations are always protected; no override applies.".to_string());
        }
        if overridable {
            advice.push(
                "Set ENABLE_DANGEROUS_OPERATIONS=true to allow this operation despite the warnings above."
                    .to_string(),
            );
        }

        Outcome::blocked(self.operation.headline())
            .warnings(self.blocking)
            .body(advice.join(" "))
    }
}

// ========================================================================
// GATE PROCESS
// ========================================================================

/// Decide a destructive operation over one or more already-normalised paths
/// (source and destination for moves).
pub fn process(operation: Operation, targets: &[&Path], config: &ServerConfig) -> GateDecision {
    let classification = targets
        .iter()
        .map(|p| classify(p, config))
        .fold(Classification::default(), Classification::merge);

    decide(operation, classification, config.enable_dangerous_operations)
}

fn decide(operation: Operation, classification: Classification, override_on: bool) -> GateDecision {
    let blocking: Vec<Warning> = classification
        .warnings
        .iter()
        .filter(|w| w.is_blocking_class())
        .filter(|w| !w.is_overridable() || !override_on)
        .cloned()
        .collect();

    let allowed = blocking.is_empty();
    if !allowed {
        log::warn!(
            "{:?} blocked: {}",
            operation,
            blocking.iter().map(|w| w.message.as_str()).collect::<Vec<_>>().join(" | ")
        );
    }

    GateDecision {
        allowed,
        operation,
        warnings: classification.warnings,
        blocking,
    }
}

/// Advisory warnings for non-destructive operations, in path order
pub fn advisories(targets: &[&Path], config: &ServerConfig) -> Vec<Warning> {
    targets
        .iter()
        .flat_map(|p| classify(p, config).warnings)
        .collect()
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::security::Category;
    use std::path::PathBuf;

    fn cfg(override_on: bool) -> ServerConfig {
        ServerConfig { enable_dangerous_operations: override_on, ..Default::default() }
    }

    #[test]
    fn critical_paths_block_regardless_of_override() {
        for on in [false, true] {
            let d = process(Operation::DeleteFile, &[Path::new("/etc/hosts")], &cfg(on));
            assert!(!d.allowed, "override={} must not unlock /etc", on);
        }
    }

    #[test]
    fn dangerous_extension_needs_override() {
        let p = Path::new("/home/user/shutdown.exe");
        assert!(!process(Operation::DeleteFile, &[p], &cfg(false)).allowed);
        assert!(process(Operation::DeleteFile, &[p], &cfg(true)).allowed);
    }

    #[test]
    fn critical_and_dangerous_stays_blocked_with_override() {
        let d = process(Operation::DeleteFile, &[Path::new("/bin/tool.sh")], &cfg(true));
        assert!(!d.allowed);
        assert_eq!(d.blocking.len(), 1);
        assert_eq!(d.blocking[0].category, Category::SystemCritical);
        assert_eq!(d.warnings.len(), 2);
    }

    #[test]
    fn move_checks_both_ends() {
        let d = process(
            Operation::Move,
            &[Path::new("/home/user/a.txt"), Path::new("/etc/a.txt")],
            &cfg(false),
        );
        assert!(!d.allowed);
    }

    #[test]
    fn boundary_warnings_block_unless_overridden() {
        let mut config = cfg(false);
        config.blocked_directories = vec![PathBuf::from("/srv/keep")];
        let target = [Path::new("/srv/keep/data")];
        assert!(!process(Operation::DeleteDirectory, &target, &config).allowed);

        config.enable_dangerous_operations = true;
        assert!(process(Operation::DeleteDirectory, &target, &config).allowed);
    }

    #[test]
    fn blocked_outcome_explains() {
        let d = process(Operation::DeleteFile, &[Path::new("/home/u/x.bat")], &cfg(false));
        let text = d.into_blocked_outcome().render();
        assert!(text.starts_with("BLOCKED: Deletion blocked"));
        assert!(text.contains("dangerous extension"));
        assert!(text.contains("ENABLE_DANGEROUS_OPERATIONS=true"));
    }
}
