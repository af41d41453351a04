use clap::ValueEnum;
use std::fmt;

/// Which front-end renderer to drive
#[derive(Copy, Clone, PartialEq, Eq, Debug, ValueEnum)]
pub enum BackendKind {
    /// Routed single-page app rendered from a server bundle
    ///
    /// Configured through `VUE_*` variables; development mode by default.
    #[value(name = "routed")]
    Routed,

    /// Compiled components rendered module by module
    ///
    /// Configured through `SVELTE_*` variables; production mode by default.
    #[value(name = "component")]
    Component,
}

impl BackendKind {
    /// Prefix of this backend's environment variables.
    pub fn env_prefix(self) -> &'static str {
        match self {
            BackendKind::Routed => "VUE_",
            BackendKind::Component => "SVELTE_",
        }
    }

    /// Bundler invocation when none is configured.
    pub fn default_build_command(self) -> &'static str {
        match self {
            BackendKind::Routed => "npx webpack",
            BackendKind::Component => "npx snowpack build",
        }
    }

    /// Query parameter that selects a layout.
    pub fn selector_param(self) -> &'static str {
        match self {
            BackendKind::Routed => "template",
            BackendKind::Component => "layout",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            BackendKind::Routed => "routed",
            BackendKind::Component => "component",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
