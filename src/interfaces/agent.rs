use crate::domain::ports::ExternalAgent;
use crate::domain::request::LaunchTarget;
use crate::error::FlowError;
use async_trait::async_trait;
use std::collections::BTreeSet;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tokio::process::Command;
use tracing::debug;

/// Companion apps the host has declared as installed.
#[derive(Debug, Clone, Default)]
pub struct InstalledApps(BTreeSet<String>);

impl InstalledApps {
    pub fn new<I, S>(packages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(packages.into_iter().map(Into::into).collect())
    }

    /// Browser targets are always openable; app targets need their package installed.
    pub fn can_open(&self, target: &LaunchTarget) -> bool {
        match target {
            LaunchTarget::Browser { .. } => true,
            LaunchTarget::App { package, .. } => self.0.contains(package),
        }
    }
}

/// Hands off by writing the launch URL to a writer, one line per launch.
///
/// Used by headless hosts where a person (or a test) opens the URL themselves.
pub struct PrintingAgent {
    writer: Mutex<Box<dyn Write + Send>>,
    installed: InstalledApps,
}

impl PrintingAgent {
    pub fn new(writer: Box<dyn Write + Send>, installed: InstalledApps) -> Self {
        Self {
            writer: Mutex::new(writer),
            installed,
        }
    }

    pub fn stderr(installed: InstalledApps) -> Self {
        Self::new(Box::new(std::io::stderr()), installed)
    }
}

#[async_trait]
impl ExternalAgent for PrintingAgent {
    fn name(&self) -> &str {
        "printer"
    }

    fn is_available(&self, target: &LaunchTarget) -> bool {
        self.installed.can_open(target)
    }

    async fn hand_off(&self, target: &LaunchTarget) -> Result<(), FlowError> {
        let mut writer = self.writer.lock().map_err(|_| FlowError::Internal {
            message: "launch writer poisoned".to_string(),
        })?;
        writeln!(writer, "{}", target.url())
            .and_then(|()| writer.flush())
            .map_err(|e| FlowError::AgentUnavailable {
                agent: format!("printer ({e})"),
            })
    }
}

/// Hands off by spawning an opener program with the launch URL as its last argument,
/// e.g. `xdg-open` or `open`.
#[derive(Debug, Clone)]
pub struct CommandAgent {
    program: String,
    args: Vec<String>,
    installed: InstalledApps,
}

impl CommandAgent {
    pub fn new(program: impl Into<String>, installed: InstalledApps) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            installed,
        }
    }

    /// Arguments placed before the URL.
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Resolves the program the way a shell would: as given when it contains a path
    /// separator, otherwise through `PATH`.
    fn resolve(&self) -> Option<PathBuf> {
        let program = Path::new(&self.program);
        if program.components().count() > 1 {
            return program.is_file().then(|| program.to_path_buf());
        }
        std::env::var_os("PATH").and_then(|paths| {
            std::env::split_paths(&paths)
                .map(|dir| dir.join(&self.program))
                .find(|candidate| candidate.is_file())
        })
    }
}

#[async_trait]
impl ExternalAgent for CommandAgent {
    fn name(&self) -> &str {
        &self.program
    }

    fn is_available(&self, target: &LaunchTarget) -> bool {
        self.installed.can_open(target) && self.resolve().is_some()
    }

    async fn hand_off(&self, target: &LaunchTarget) -> Result<(), FlowError> {
        let url = target.url().as_str();
        debug!(program = %self.program, url, "spawning opener");
        let status = Command::new(&self.program)
            .args(&self.args)
            .arg(url)
            .status()
            .await
            .map_err(|e| FlowError::AgentUnavailable {
                agent: format!("{} ({e})", self.program),
            })?;
        if status.success() {
            Ok(())
        } else {
            Err(FlowError::ExternalAgent {
                message: format!("{} exited with {status}", self.program),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use url::Url;

    #[derive(Clone, Default)]
    struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().write(buf)
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    fn browser() -> LaunchTarget {
        LaunchTarget::Browser {
            url: Url::parse("https://vendor.example/approve?token=1").unwrap(),
        }
    }

    fn venmo_app() -> LaunchTarget {
        LaunchTarget::App {
            package: "com.venmo".into(),
            url: Url::parse("venmo://x-callback-url/vzero/auth").unwrap(),
        }
    }

    #[tokio::test]
    async fn test_printing_agent_writes_url() {
        let buffer = SharedBuffer::default();
        let agent = PrintingAgent::new(Box::new(buffer.clone()), InstalledApps::default());

        agent.hand_off(&browser()).await.unwrap();
        let written = String::from_utf8(buffer.0.lock().unwrap().clone()).unwrap();
        assert_eq!(written, "https://vendor.example/approve?token=1\n");
    }

    #[test]
    fn test_apps_need_to_be_installed() {
        let bare = PrintingAgent::new(Box::new(std::io::sink()), InstalledApps::default());
        assert!(bare.is_available(&browser()));
        assert!(!bare.is_available(&venmo_app()));

        let with_venmo =
            PrintingAgent::new(Box::new(std::io::sink()), InstalledApps::new(["com.venmo"]));
        assert!(with_venmo.is_available(&venmo_app()));
    }

    #[test]
    fn test_command_agent_missing_program() {
        let agent = CommandAgent::new("payresume-no-such-opener", InstalledApps::default());
        assert!(!agent.is_available(&browser()));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_command_agent_exit_status() {
        let ok = CommandAgent::new("true", InstalledApps::default());
        assert!(ok.is_available(&browser()));
        assert_eq!(ok.hand_off(&browser()).await, Ok(()));

        let failing = CommandAgent::new("false", InstalledApps::default());
        assert!(matches!(
            failing.hand_off(&browser()).await,
            Err(FlowError::ExternalAgent { .. })
        ));
    }
}
