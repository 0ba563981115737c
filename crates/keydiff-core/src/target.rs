//! Target descriptors: everything implementation-specific about a tester.
//!
//! The engine only ever talks to [`TargetDescriptor`]; how a tester wants
//! its arguments and what it prints when it declines to encode a
//! combination stay inside each descriptor.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::{Config, CustomTargetConfig};
use crate::error::{Error, Result};
use crate::matrix::TestCase;

/// Name of the reference implementation.
pub const REFERENCE_NAME: &str = "kitty";

/// Printed by the VTE tester when it hands the key to its legacy encoder.
pub const LEGACY_FALLBACK_MARKER: &str = "[LEGACY_FALLBACK]";

/// Printed by testers (or produced by normalization) for no output at all.
pub const EMPTY_OUTPUT_MARKER: &str = crate::normalize::EMPTY_MARKER;

/// One key-encoding implementation driven through its tester CLI.
pub trait TargetDescriptor: fmt::Debug + Send + Sync {
    /// Short name used on the command line and in reports.
    fn name(&self) -> &str;

    /// Path of the tester executable.
    fn executable(&self) -> &Path;

    /// Full argument list for `case`, starting from the shared `base_args`.
    fn build_invocation(&self, base_args: Vec<String>, case: &TestCase) -> Vec<String>;

    /// Whether `normalized` means "intentionally not handled".
    fn is_fallback_output(&self, _normalized: &str) -> bool {
        false
    }

    /// Convenience: [`Self::build_invocation`] over the case's base args.
    fn invocation(&self, case: &TestCase) -> Vec<String> {
        self.build_invocation(case.base_args(), case)
    }
}

fn push_flags(args: &mut Vec<String>, case: &TestCase) {
    args.push("--kitty-flags".to_string());
    args.push(case.flags.to_string());
}

fn push_keycode(args: &mut Vec<String>, case: &TestCase) {
    args.push("--keycode".to_string());
    args.push(case.key.scan_code.to_string());
}

/// The kitty keyboard protocol encoder, treated as ground truth.
#[derive(Debug, Clone)]
pub struct KittyReference {
    executable: PathBuf,
}

impl KittyReference {
    #[must_use]
    pub fn new(executable: impl Into<PathBuf>) -> Self {
        Self {
            executable: executable.into(),
        }
    }
}

impl TargetDescriptor for KittyReference {
    fn name(&self) -> &str {
        REFERENCE_NAME
    }

    fn executable(&self) -> &Path {
        &self.executable
    }

    fn build_invocation(&self, mut base_args: Vec<String>, case: &TestCase) -> Vec<String> {
        push_flags(&mut base_args, case);
        base_args
    }
}

/// VTE's encoder. It resolves keys through XKB, so it needs the keycode.
#[derive(Debug, Clone)]
pub struct VteTarget {
    executable: PathBuf,
}

impl VteTarget {
    #[must_use]
    pub fn new(executable: impl Into<PathBuf>) -> Self {
        Self {
            executable: executable.into(),
        }
    }
}

impl TargetDescriptor for VteTarget {
    fn name(&self) -> &str {
        "vte"
    }

    fn executable(&self) -> &Path {
        &self.executable
    }

    fn build_invocation(&self, mut base_args: Vec<String>, case: &TestCase) -> Vec<String> {
        push_keycode(&mut base_args, case);
        push_flags(&mut base_args, case);
        base_args
    }

    fn is_fallback_output(&self, normalized: &str) -> bool {
        normalized == LEGACY_FALLBACK_MARKER || normalized == EMPTY_OUTPUT_MARKER
    }
}

/// far2l's encoder, which maps key names to virtual keys itself.
#[derive(Debug, Clone)]
pub struct Far2lTarget {
    executable: PathBuf,
}

impl Far2lTarget {
    #[must_use]
    pub fn new(executable: impl Into<PathBuf>) -> Self {
        Self {
            executable: executable.into(),
        }
    }
}

impl TargetDescriptor for Far2lTarget {
    fn name(&self) -> &str {
        "far2l"
    }

    fn executable(&self) -> &Path {
        &self.executable
    }

    fn build_invocation(&self, mut base_args: Vec<String>, case: &TestCase) -> Vec<String> {
        push_flags(&mut base_args, case);
        base_args
    }

    fn is_fallback_output(&self, normalized: &str) -> bool {
        normalized == EMPTY_OUTPUT_MARKER
    }
}

/// A target declared in the config file.
#[derive(Debug, Clone)]
pub struct ConfiguredTarget {
    name: String,
    executable: PathBuf,
    pass_keycode: bool,
    fallback_markers: Vec<String>,
}

impl From<&CustomTargetConfig> for ConfiguredTarget {
    fn from(config: &CustomTargetConfig) -> Self {
        Self {
            name: config.name.clone(),
            executable: config.executable.clone(),
            pass_keycode: config.pass_keycode,
            fallback_markers: config.fallback_markers.clone(),
        }
    }
}

impl TargetDescriptor for ConfiguredTarget {
    fn name(&self) -> &str {
        &self.name
    }

    fn executable(&self) -> &Path {
        &self.executable
    }

    fn build_invocation(&self, mut base_args: Vec<String>, case: &TestCase) -> Vec<String> {
        if self.pass_keycode {
            push_keycode(&mut base_args, case);
        }
        push_flags(&mut base_args, case);
        base_args
    }

    fn is_fallback_output(&self, normalized: &str) -> bool {
        self.fallback_markers.iter().any(|m| m == normalized)
    }
}

/// The reference plus every selectable target.
#[derive(Debug, Clone)]
pub struct TargetRegistry {
    reference: Arc<dyn TargetDescriptor>,
    targets: Vec<Arc<dyn TargetDescriptor>>,
}

impl TargetRegistry {
    #[must_use]
    pub fn new(reference: Arc<dyn TargetDescriptor>) -> Self {
        Self {
            reference,
            targets: Vec::new(),
        }
    }

    /// Built-in targets followed by `[[targets]]` entries. A config entry
    /// with a built-in name replaces the built-in.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        let mut registry = Self::new(Arc::new(KittyReference::new(&config.testers.kitty)));
        registry.register(Arc::new(VteTarget::new(&config.testers.vte)));
        registry.register(Arc::new(Far2lTarget::new(&config.testers.far2l)));
        for custom in &config.targets {
            registry.register(Arc::new(ConfiguredTarget::from(custom)));
        }
        registry
    }

    pub fn register(&mut self, target: Arc<dyn TargetDescriptor>) {
        if let Some(slot) = self.targets.iter_mut().find(|t| t.name() == target.name()) {
            *slot = target;
        } else {
            self.targets.push(target);
        }
    }

    #[must_use]
    pub fn reference(&self) -> Arc<dyn TargetDescriptor> {
        Arc::clone(&self.reference)
    }

    pub fn target(&self, name: &str) -> Result<Arc<dyn TargetDescriptor>> {
        self.targets
            .iter()
            .find(|t| t.name() == name)
            .map(Arc::clone)
            .ok_or_else(|| Error::UnknownTarget(name.to_string()))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.targets.iter().map(|t| t.name())
    }

    /// Check that the reference and `target` executables exist. Runs once
    /// before any case is generated.
    pub fn preflight(&self, target: &dyn TargetDescriptor) -> Result<()> {
        check_executable(self.reference.as_ref())?;
        check_executable(target)
    }
}

/// `MissingExecutable` unless the descriptor's executable is present.
pub fn check_executable(descriptor: &dyn TargetDescriptor) -> Result<()> {
    let path = descriptor.executable();
    if path.exists() {
        Ok(())
    } else {
        Err(Error::MissingExecutable {
            target: descriptor.name().to_string(),
            path: path.to_path_buf(),
        })
    }
}
