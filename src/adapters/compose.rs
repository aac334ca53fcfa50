use crate::domain::model::{DownFlags, ServiceGroup, UpFlags};
use crate::domain::ports::ServiceController;
use crate::utils::error::{HarnessError, Result};
use async_trait::async_trait;
use std::process::Stdio;
use tokio::process::Command;

/// Drives a service group through a compose-compatible CLI
/// (`docker-compose` or `docker compose`).
#[derive(Debug, Clone)]
pub struct ComposeController {
    program: String,
    leading_args: Vec<String>,
}

impl ComposeController {
    pub fn new(command: &[String]) -> Result<Self> {
        let (program, leading_args) =
            command
                .split_first()
                .ok_or_else(|| HarnessError::MissingConfigError {
                    field: "environment.command".to_string(),
                })?;
        Ok(Self {
            program: program.clone(),
            leading_args: leading_args.to_vec(),
        })
    }

    /// `<leading args> -f <file>... <subcommand> <extra>...`
    pub fn args_for(&self, group: &ServiceGroup, subcommand: &str, extra: &[&str]) -> Vec<String> {
        let mut args = self.leading_args.clone();
        for file in &group.definitions {
            args.push("-f".to_string());
            args.push(file.to_string_lossy().to_string());
        }
        args.push(subcommand.to_string());
        args.extend(extra.iter().map(|s| s.to_string()));
        args
    }

    fn command(&self, group: &ServiceGroup, args: &[String]) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(args).kill_on_drop(true);
        if let Some(dir) = &group.working_dir {
            cmd.current_dir(dir);
        }
        cmd
    }

    fn describe(&self, args: &[String]) -> String {
        std::iter::once(self.program.as_str())
            .chain(args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Runs with inherited stdio so the compose output lands in the harness log.
    async fn run(&self, group: &ServiceGroup, args: Vec<String>) -> Result<()> {
        let description = self.describe(&args);
        tracing::debug!("Running: {}", description);

        let status = self
            .command(group, &args)
            .stdin(Stdio::null())
            .status()
            .await?;

        if status.success() {
            Ok(())
        } else {
            Err(HarnessError::CommandFailed {
                command: description,
                code: status.code(),
            })
        }
    }
}

pub fn up_args(flags: &UpFlags) -> Vec<&'static str> {
    let mut extra = Vec::new();
    if flags.detach {
        extra.push("--detach");
    }
    if flags.force_recreate {
        extra.push("--force-recreate");
    }
    if flags.remove_orphans {
        extra.push("--remove-orphans");
    }
    if flags.build {
        extra.push("--build");
    }
    extra
}

pub fn down_args(flags: &DownFlags) -> Vec<&'static str> {
    if flags.volumes {
        vec!["-v"]
    } else {
        Vec::new()
    }
}

#[async_trait]
impl ServiceController for ComposeController {
    async fn pull(&self, group: &ServiceGroup) -> Result<()> {
        self.run(group, self.args_for(group, "pull", &[])).await
    }

    async fn up(&self, group: &ServiceGroup, flags: &UpFlags) -> Result<()> {
        self.run(group, self.args_for(group, "up", &up_args(flags)))
            .await
    }

    async fn down(&self, group: &ServiceGroup, flags: &DownFlags) -> Result<()> {
        self.run(group, self.args_for(group, "down", &down_args(flags)))
            .await
    }

    async fn ps(&self, group: &ServiceGroup) -> Result<String> {
        let args = self.args_for(group, "ps", &[]);
        let output = self
            .command(group, &args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await?;

        if !output.status.success() {
            tracing::debug!(
                "ps stderr: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            );
            return Err(HarnessError::CommandFailed {
                command: self.describe(&args),
                code: output.status.code(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn group() -> ServiceGroup {
        ServiceGroup::new(vec![
            PathBuf::from("snapshot.yml"),
            PathBuf::from("local.yml"),
        ])
    }

    #[test]
    fn test_new_requires_program() {
        assert!(ComposeController::new(&[]).is_err());
    }

    #[test]
    fn test_args_for_lists_every_definition_file() {
        let controller = ComposeController::new(&["docker-compose".to_string()]).unwrap();
        let args = controller.args_for(&group(), "ps", &[]);
        assert_eq!(args, vec!["-f", "snapshot.yml", "-f", "local.yml", "ps"]);
    }

    #[test]
    fn test_leading_args_come_first() {
        let controller =
            ComposeController::new(&["docker".to_string(), "compose".to_string()]).unwrap();
        let args = controller.args_for(&group(), "down", &down_args(&DownFlags { volumes: true }));
        assert_eq!(
            args,
            vec!["compose", "-f", "snapshot.yml", "-f", "local.yml", "down", "-v"]
        );
    }

    #[test]
    fn test_up_args() {
        let flags = UpFlags {
            force_recreate: true,
            remove_orphans: true,
            build: true,
            detach: false,
        };
        assert_eq!(
            up_args(&flags),
            vec!["--force-recreate", "--remove-orphans", "--build"]
        );
        assert!(up_args(&UpFlags::default()).is_empty());
        assert!(down_args(&DownFlags::default()).is_empty());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_ps_captures_stdout() {
        // `sh -c 'echo "$@"' sh <args>` echoes the compose arguments back.
        let controller = ComposeController::new(&[
            "sh".to_string(),
            "-c".to_string(),
            r#"echo "$@""#.to_string(),
            "sh".to_string(),
        ])
        .unwrap();

        let output = controller.ps(&group()).await.unwrap();
        assert_eq!(output.trim(), "-f snapshot.yml -f local.yml ps");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_failing_command_reports_exit_code() {
        let controller = ComposeController::new(&[
            "sh".to_string(),
            "-c".to_string(),
            "exit 3".to_string(),
            "sh".to_string(),
        ])
        .unwrap();

        let err = controller.down(&group(), &DownFlags::default()).await.unwrap_err();
        match err {
            HarnessError::CommandFailed { code, .. } => assert_eq!(code, Some(3)),
            other => panic!("unexpected error: {other}"),
        }
    }
}
