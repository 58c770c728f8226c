//! Env command - print the toolchain build environment

use crate::cli::args::{EnvArgs, EnvFormat};
use crate::config::Config;
use crate::environ::{BuildEnvironment, Toolchain};
use crate::error::{PpbtError, PpbtResult};
use crate::triplet::Triplet;

/// Execute the env command
pub async fn execute(args: EnvArgs, config: &Config) -> PpbtResult<()> {
    let triplet = Triplet::detect(args.target.machine.as_deref(), args.target.platform.as_deref())?;
    let toolchain = Toolchain::from_config(config, triplet);

    let auto_extract = args.auto_extract;
    let env = tokio::task::spawn_blocking(move || toolchain.environment(auto_extract))
        .await
        .map_err(|e| PpbtError::Internal(format!("environment task failed: {}", e)))??;

    match args.format {
        EnvFormat::Shell => print!("{}", shell_exports(&env)),
        EnvFormat::Json => println!("{}", serde_json::to_string_pretty(&env)?),
    }
    Ok(())
}

/// `export KEY='value'` lines, single quotes escaped for POSIX shells
fn shell_exports(env: &BuildEnvironment) -> String {
    env.iter()
        .map(|(key, value)| format!("export {}='{}'\n", key, value.replace('\'', r"'\''")))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exports_are_quoted() {
        let mut env = BuildEnvironment::new();
        env.insert("CC".to_string(), "/opt/tc/bin/gcc".to_string());
        env.insert("TOOLCHAIN_PATH".to_string(), "/opt/it's here".to_string());
        assert_eq!(
            shell_exports(&env),
            "export CC='/opt/tc/bin/gcc'\nexport TOOLCHAIN_PATH='/opt/it'\\''s here'\n"
        );
    }
}
