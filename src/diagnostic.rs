//! The diagnostic channel: grouped, human-readable compiler and driver logs.

use std::fmt;

/// Heading a diagnostic is printed under.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum DiagnosticGroup {
    VertexShader,
    FragmentShader,
    Program,
    Draw,
}

impl DiagnosticGroup {
    pub fn label(self) -> &'static str {
        match self {
            DiagnosticGroup::VertexShader => "Vertex Shader Logs",
            DiagnosticGroup::FragmentShader => "Fragment Shader Logs",
            DiagnosticGroup::Program => "Shaders Program Log",
            DiagnosticGroup::Draw => "Draw Log",
        }
    }
}

/// A log retrieved from the driver after a failed compile, link or draw.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Diagnostic {
    pub group: DiagnosticGroup,
    pub text: String,
}

impl Diagnostic {
    pub fn new(group: DiagnosticGroup, text: impl Into<String>) -> Self {
        Self {
            group,
            text: text.into(),
        }
    }

    pub(crate) fn from_wgpu(group: DiagnosticGroup, error: &wgpu::Error) -> Self {
        let text = match error {
            wgpu::Error::Validation { description, .. } => description.clone(),
            other => other.to_string(),
        };
        Self::new(group, text)
    }

    /// Writes the diagnostic to the log at error level.
    pub fn emit(&self) {
        log::error!("{self}");
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.group.label())?;
        for line in self.text.lines() {
            write!(f, "\n  {line}")?;
        }
        Ok(())
    }
}

/// A GPU object together with the outcome of building it.
///
/// The handle is always present, even when building failed; using an invalid
/// handle later produces further diagnostics instead of a panic.
#[derive(Debug)]
pub struct Compiled<T> {
    pub handle: T,
    pub diagnostic: Option<Diagnostic>,
}

impl<T> Compiled<T> {
    pub fn ok(handle: T) -> Self {
        Self {
            handle,
            diagnostic: None,
        }
    }

    /// Wraps `handle` and emits `diagnostic` if there is one.
    pub(crate) fn reported(handle: T, diagnostic: Option<Diagnostic>) -> Self {
        if let Some(diagnostic) = &diagnostic {
            diagnostic.emit();
        }
        Self { handle, diagnostic }
    }

    pub fn is_ok(&self) -> bool {
        self.diagnostic.is_none()
    }

    pub fn into_handle(self) -> T {
        self.handle
    }
}
