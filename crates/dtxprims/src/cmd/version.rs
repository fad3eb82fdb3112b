use serde::Serialize;

use crate::cmd::VersionArgs;
use crate::exit::{CliResult, SUCCESS};
use crate::output::OutputFormat;

#[derive(Serialize)]
struct VersionOutput {
    name: &'static str,
    version: &'static str,
    target: String,
    rustc: &'static str,
    git_hash: &'static str,
    features: Vec<&'static str>,
}

pub fn run(args: VersionArgs, format: OutputFormat) -> CliResult<i32> {
    if !args.extended {
        println!("dtxprims {}", env!("CARGO_PKG_VERSION"));
        return Ok(SUCCESS);
    }

    let out = VersionOutput {
        name: "dtxprims",
        version: env!("CARGO_PKG_VERSION"),
        target: target_triple(),
        rustc: option_env!("RUSTC_VERSION").unwrap_or("unknown"),
        git_hash: option_env!("GIT_HASH").unwrap_or("unknown"),
        features: active_features(),
    };

    match format {
        OutputFormat::Json => println!(
            "{}",
            serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
        ),
        OutputFormat::Table | OutputFormat::Pretty => {
            println!("name: {}", out.name);
            println!("version: {}", out.version);
            println!("target: {}", out.target);
            println!("rustc: {}", out.rustc);
            println!("git_hash: {}", out.git_hash);
            println!("features: {}", out.features.join(", "));
        }
    }

    Ok(SUCCESS)
}

fn target_triple() -> String {
    if let Some(target) = option_env!("DTXPRIMS_BUILD_TARGET") {
        return target.to_string();
    }
    format!("{}-unknown-{}", std::env::consts::ARCH, std::env::consts::OS)
}

fn active_features() -> Vec<&'static str> {
    let mut features = vec!["cli"];
    if cfg!(feature = "async") {
        features.push("async");
    }
    features
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_looks_like_triple() {
        assert!(target_triple().split('-').count() >= 3);
    }

    #[test]
    fn cli_feature_always_listed() {
        assert!(active_features().contains(&"cli"));
    }
}
