//! Installing a root certificate into the operating system trust store.
//!
//! Each platform has its own [`TrustStore`]. Commands go through a
//! [`CommandRunner`] so the retry policy can be exercised without touching
//! the real store: a command whose output reports a permission or
//! authorization failure is retried once with elevated privileges, any other
//! failure is returned as is.

use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use crate::error::TrustInstallError;

type Result<T> = std::result::Result<T, TrustInstallError>;

/// Destination of the certificate on Debian style Linux systems.
pub const LINUX_CA_INSTALL_PATH: &str = "/usr/local/share/ca-certificates/certgen-ca.crt";

const MACOS_SYSTEM_KEYCHAIN: &str = "/Library/Keychains/System.keychain";

/// Runs external programs and captures their output.
pub trait CommandRunner: Send + Sync {
    fn run(&self, program: &OsStr, args: &[OsString]) -> std::io::Result<Output>;
}

/// Runs commands with [`std::process::Command`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, program: &OsStr, args: &[OsString]) -> std::io::Result<Output> {
        Command::new(program).args(args).output()
    }
}

/// A platform trust store that can install a root certificate.
pub trait TrustStore: Send + Sync {
    /// Short platform name, for logging.
    fn name(&self) -> &'static str;

    /// Installs the certificate at `path` as a trusted root.
    fn install_root_certificate(&self, path: &Path) -> Result<()>;
}

/// The trust store of the platform this binary runs on.
pub fn platform_trust_store() -> Result<Box<dyn TrustStore>> {
    match std::env::consts::OS {
        "macos" => Ok(Box::new(MacOsTrustStore::<SystemRunner>::default())),
        "linux" => Ok(Box::new(LinuxTrustStore::<SystemRunner>::default())),
        "windows" => Ok(Box::new(WindowsTrustStore::<SystemRunner>::default())),
        os => Err(TrustInstallError::UnsupportedPlatform { os: os.to_string() }),
    }
}

/// macOS System keychain, through `security add-trusted-cert`.
#[derive(Debug, Clone, Default)]
pub struct MacOsTrustStore<R = SystemRunner> {
    runner: R,
}

impl<R: CommandRunner> MacOsTrustStore<R> {
    pub fn with_runner(runner: R) -> Self {
        Self { runner }
    }
}

impl<R: CommandRunner> TrustStore for MacOsTrustStore<R> {
    fn name(&self) -> &'static str {
        "macos"
    }

    fn install_root_certificate(&self, path: &Path) -> Result<()> {
        let path = absolute_certificate_path(path)?;
        let install = Invocation::new(
            "security",
            [
                OsString::from("add-trusted-cert"),
                "-d".into(),
                "-r".into(),
                "trustRoot".into(),
                "-k".into(),
                MACOS_SYSTEM_KEYCHAIN.into(),
                path.into_os_string(),
            ],
        );
        run_with_elevation(&self.runner, &install, Invocation::sudo)
    }
}

/// Debian style Linux: copy into `/usr/local/share/ca-certificates` and run
/// `update-ca-certificates`.
#[derive(Debug, Clone, Default)]
pub struct LinuxTrustStore<R = SystemRunner> {
    runner: R,
}

impl<R: CommandRunner> LinuxTrustStore<R> {
    pub fn with_runner(runner: R) -> Self {
        Self { runner }
    }
}

impl<R: CommandRunner> TrustStore for LinuxTrustStore<R> {
    fn name(&self) -> &'static str {
        "linux"
    }

    fn install_root_certificate(&self, path: &Path) -> Result<()> {
        let path = absolute_certificate_path(path)?;
        let copy = Invocation::new(
            "cp",
            [path.into_os_string(), OsString::from(LINUX_CA_INSTALL_PATH)],
        );
        run_with_elevation(&self.runner, &copy, Invocation::sudo)?;

        let update = Invocation::new("update-ca-certificates", Vec::new());
        run_with_elevation(&self.runner, &update, Invocation::sudo)
    }
}

/// Windows `ROOT` store, through `certutil -addstore`.
#[derive(Debug, Clone, Default)]
pub struct WindowsTrustStore<R = SystemRunner> {
    runner: R,
}

impl<R: CommandRunner> WindowsTrustStore<R> {
    pub fn with_runner(runner: R) -> Self {
        Self { runner }
    }
}

impl<R: CommandRunner> TrustStore for WindowsTrustStore<R> {
    fn name(&self) -> &'static str {
        "windows"
    }

    fn install_root_certificate(&self, path: &Path) -> Result<()> {
        let path = absolute_certificate_path(path)?;
        let add = Invocation::new(
            "certutil",
            [
                OsString::from("-addstore"),
                "-f".into(),
                "ROOT".into(),
                path.clone().into_os_string(),
            ],
        );
        run_with_elevation(&self.runner, &add, |_| {
            Invocation::new(
                "powershell",
                [
                    OsString::from("Start-Process"),
                    "certutil".into(),
                    "-ArgumentList".into(),
                    format!("'-addstore -f ROOT \"{}\"'", path.display()).into(),
                    "-Verb".into(),
                    "RunAs".into(),
                    "-Wait".into(),
                ],
            )
        })
    }
}

/// A program and its arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Invocation {
    program: OsString,
    args: Vec<OsString>,
}

impl Invocation {
    fn new(program: &str, args: impl IntoIterator<Item = OsString>) -> Self {
        Self {
            program: program.into(),
            args: args.into_iter().collect(),
        }
    }

    fn sudo(&self) -> Self {
        let mut args = Vec::with_capacity(self.args.len() + 1);
        args.push(self.program.clone());
        args.extend(self.args.iter().cloned());
        Self {
            program: "sudo".into(),
            args,
        }
    }

    fn display(&self) -> String {
        std::iter::once(&self.program)
            .chain(&self.args)
            .map(|part| part.to_string_lossy())
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn run(&self, runner: &dyn CommandRunner) -> Result<Output> {
        runner
            .run(&self.program, &self.args)
            .map_err(|source| TrustInstallError::Spawn {
                command: self.display(),
                source,
            })
    }
}

fn run_with_elevation<R: CommandRunner>(
    runner: &R,
    invocation: &Invocation,
    elevate: impl FnOnce(&Invocation) -> Invocation,
) -> Result<()> {
    let output = invocation.run(runner)?;
    if output.status.success() {
        tracing::debug!(command = %invocation.display(), "command succeeded");
        return Ok(());
    }

    let summary = command_failure_summary(&output);
    if !is_permission_denied(&output) {
        return Err(TrustInstallError::CommandFailed {
            command: invocation.display(),
            output: summary,
        });
    }

    let elevated = elevate(invocation);
    tracing::warn!(
        command = %invocation.display(),
        output = %summary,
        "permission denied, retrying with elevated privileges"
    );
    let output = elevated.run(runner)?;
    if output.status.success() {
        return Ok(());
    }
    Err(TrustInstallError::ElevatedCommandFailed {
        command: elevated.display(),
        output: command_failure_summary(&output),
    })
}

fn absolute_certificate_path(path: &Path) -> Result<PathBuf> {
    if !path.is_file() {
        return Err(TrustInstallError::CertificateNotFound {
            path: path.to_path_buf(),
        });
    }
    std::path::absolute(path).map_err(|_| TrustInstallError::CertificateNotFound {
        path: path.to_path_buf(),
    })
}

fn is_permission_denied(output: &Output) -> bool {
    let text = format!(
        "{} {}",
        String::from_utf8_lossy(&output.stderr),
        String::from_utf8_lossy(&output.stdout)
    )
    .to_lowercase();
    ["permission", "authorization", "not permitted", "access is denied"]
        .iter()
        .any(|needle| text.contains(needle))
}

fn command_failure_summary(output: &Output) -> String {
    let stderr = trim_bytes(&output.stderr);
    if !stderr.is_empty() {
        return stderr;
    }
    let stdout = trim_bytes(&output.stdout);
    if !stdout.is_empty() {
        return stdout;
    }
    match output.status.code() {
        Some(code) => format!("exit code {code}"),
        None => "terminated by signal".to_owned(),
    }
}

fn trim_bytes(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).trim().to_owned()
}
