//! Open a URL in the user's default browser
//!
//! Best effort only: callers log a failure and carry on, since the URL is
//! also printed for manual copying.
//!
//! Each platform maps to a pure function from URL to a launch plan. Native
//! desktops hand the URL to the `open` crate, which knows each platform's
//! default handler. On a Linux kernel the kernel release string is probed
//! first; a `microsoft` marker means a WSL guest whose desktop is Windows,
//! so `cmd.exe` is run through interop instead.

use std::io;
use std::process::{Command, Stdio};

use tracing::debug;

/// Capability to open a URL outside the process.
pub trait UrlLauncher: Send + Sync {
    fn open(&self, url: &str) -> io::Result<()>;
}

/// Platforms with a distinct way of opening URLs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Windows,
    MacOs,
    Linux,
    /// Linux kernel hosted by Windows (WSL)
    Wsl,
}

impl Platform {
    /// Platform this binary was compiled for. BSDs and other unixes count
    /// as Linux.
    pub fn current() -> Self {
        if cfg!(target_os = "windows") {
            Platform::Windows
        } else if cfg!(target_os = "macos") {
            Platform::MacOs
        } else {
            Platform::Linux
        }
    }
}

/// Program and arguments that open a URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenerCommand {
    pub program: &'static str,
    pub args: Vec<String>,
}

/// How one platform opens a URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LaunchPlan {
    /// Desktop default handler for the compile target (`open` crate:
    /// `cmd /c start`, `open`, `xdg-open` and its fallbacks)
    Native { url: String },
    /// Explicit opener command
    Command(OpenerCommand),
}

impl LaunchPlan {
    /// Commands this plan would try, in order, without running them.
    pub fn commands(&self) -> Vec<Command> {
        match self {
            LaunchPlan::Native { url } => open::commands(url),
            LaunchPlan::Command(opener) => {
                let mut command = Command::new(opener.program);
                command.args(&opener.args);
                vec![command]
            }
        }
    }

    /// Start the opener without waiting for it.
    fn launch(&self) -> io::Result<()> {
        match self {
            LaunchPlan::Native { url } => open::that_detached(url),
            LaunchPlan::Command(opener) => Command::new(opener.program)
                .args(&opener.args)
                .stdin(Stdio::null())
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .spawn()
                .map(|_| ()),
        }
    }
}

type Opener = fn(&str) -> LaunchPlan;

fn native(url: &str) -> LaunchPlan {
    LaunchPlan::Native { url: url.into() }
}

/// `start` treats its first quoted argument as a window title, hence the
/// empty string before the URL.
fn wsl_start(url: &str) -> LaunchPlan {
    LaunchPlan::Command(OpenerCommand {
        program: "cmd.exe",
        args: vec!["/c".into(), "start".into(), String::new(), url.into()],
    })
}

const OPENERS: &[(Platform, Opener)] = &[
    (Platform::Windows, native),
    (Platform::MacOs, native),
    (Platform::Linux, native),
    (Platform::Wsl, wsl_start),
];

/// Launch plan for `platform`.
pub fn opener_for(platform: Platform, url: &str) -> LaunchPlan {
    OPENERS
        .iter()
        .find(|(p, _)| *p == platform)
        .map_or_else(|| native(url), |(_, opener)| opener(url))
}

/// Source of the kernel release string (`uname -r`).
pub trait KernelProbe: Send + Sync {
    fn kernel_release(&self) -> Option<String>;
}

/// Runs `uname -r`.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnameProbe;

impl KernelProbe for UnameProbe {
    fn kernel_release(&self) -> Option<String> {
        let output = Command::new("uname").arg("-r").output().ok()?;
        output
            .status
            .success()
            .then(|| String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Refine `base` using the kernel probe. Only Linux can become WSL.
pub fn detect_platform(base: Platform, probe: &dyn KernelProbe) -> Platform {
    if base != Platform::Linux {
        return base;
    }
    match probe.kernel_release() {
        Some(release) if release.to_lowercase().contains("microsoft") => Platform::Wsl,
        _ => base,
    }
}

/// Launches the platform opener as a detached child process.
pub struct SystemLauncher<P = UnameProbe> {
    platform: Platform,
    probe: P,
}

impl SystemLauncher {
    pub fn new() -> Self {
        Self::with_probe(Platform::current(), UnameProbe)
    }
}

impl Default for SystemLauncher {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: KernelProbe> SystemLauncher<P> {
    pub fn with_probe(platform: Platform, probe: P) -> Self {
        Self { platform, probe }
    }

    /// Plan that `open` would carry out for `url`.
    pub fn plan_for(&self, url: &str) -> LaunchPlan {
        opener_for(detect_platform(self.platform, &self.probe), url)
    }
}

impl<P: KernelProbe> UrlLauncher for SystemLauncher<P> {
    fn open(&self, url: &str) -> io::Result<()> {
        let plan = self.plan_for(url);
        debug!(?plan, "launching browser");
        plan.launch()
    }
}
