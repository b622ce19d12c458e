//! Dockerfile rendering.
//!
//! Generate phase of the pipeline. Renders the Tera template once per
//! selected target and writes `Dockerfile_<os>_<arch>` into the output
//! directory.
//!
//! ## Template Context
//!
//! The context is flat. For each target it is assembled by merging, later
//! entries winning on key collisions:
//!
//! 1. `version`, `os`
//! 2. `name`, `maintainer` (from `[image]`)
//! 3. global `[vars]`
//! 4. per-OS `[os.<name>.vars]`
//! 5. `base`, `arch`, `alt_arch` (from the architecture record)
//!
//! So a per-OS var shadows a global var of the same key, and the record
//! fields always win. Rendering is deterministic: identical config, target,
//! version, and template produce byte-identical output.

use crate::config::MatrixConfig;
use crate::matrix::Target;
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Template not found: {0}")]
    MissingTemplate(PathBuf),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Template error: {0}")]
    Template(#[from] tera::Error),
}

/// One rendered Dockerfile, for output reporting.
#[derive(Debug, Clone)]
pub struct GeneratedFile {
    pub os: String,
    pub arch: String,
    pub path: PathBuf,
}

/// Assemble the flat template context for one target.
pub fn template_context(config: &MatrixConfig, target: &Target, version: &str) -> Value {
    let mut ctx = Map::new();
    ctx.insert("version".to_string(), Value::String(version.to_string()));
    ctx.insert("os".to_string(), Value::String(target.os.clone()));
    ctx.insert(
        "name".to_string(),
        Value::String(config.image.name.clone()),
    );
    ctx.insert(
        "maintainer".to_string(),
        Value::String(config.image.maintainer.clone()),
    );
    for (key, val) in &config.vars {
        ctx.insert(key.clone(), Value::String(val.clone()));
    }
    if let Some(os) = config.os.get(&target.os) {
        for (key, val) in &os.vars {
            ctx.insert(key.clone(), Value::String(val.clone()));
        }
    }
    ctx.insert("base".to_string(), Value::String(target.base.clone()));
    ctx.insert("arch".to_string(), Value::String(target.arch.clone()));
    ctx.insert(
        "alt_arch".to_string(),
        Value::String(target.alt_arch.clone()),
    );
    Value::Object(ctx)
}

/// Render every selected target and write the Dockerfiles.
///
/// The template is parsed once and rendered per target. Returns the written
/// files in target order.
pub fn generate(
    config: &MatrixConfig,
    targets: &[Target],
    version: &str,
    template_path: &Path,
    output_dir: &Path,
) -> Result<Vec<GeneratedFile>, RenderError> {
    if !template_path.exists() {
        return Err(RenderError::MissingTemplate(template_path.to_path_buf()));
    }
    let source = fs::read_to_string(template_path)?;
    let mut tera = tera::Tera::default();
    tera.add_raw_template("Dockerfile", &source)?;

    fs::create_dir_all(output_dir)?;
    let mut generated = Vec::with_capacity(targets.len());
    for target in targets {
        let context = tera::Context::from_value(template_context(config, target, version))?;
        let rendered = tera.render("Dockerfile", &context)?;
        let path = output_dir.join(target.dockerfile_name());
        fs::write(&path, rendered)?;
        generated.push(GeneratedFile {
            os: target.os.clone(),
            arch: target.arch.clone(),
            path,
        });
    }
    Ok(generated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matrix::select_targets;
    use tempfile::TempDir;

    const TEMPLATE: &str = "FROM {{ base }}\n\
        LABEL maintainer=\"{{ maintainer }}\" version=\"{{ version }}\"\n\
        ENV OS={{ os }} ARCH={{ arch }} ALT_ARCH={{ alt_arch }}\n";

    fn write_template(dir: &Path, content: &str) -> PathBuf {
        let path = dir.join("Dockerfile.template");
        fs::write(&path, content).unwrap();
        path
    }

    fn target(os: &str, arch: &str) -> Target {
        Target {
            os: os.to_string(),
            base: format!("{os}:latest"),
            arch: arch.to_string(),
            alt_arch: arch.to_string(),
        }
    }

    // =========================================================================
    // Context assembly
    // =========================================================================

    #[test]
    fn context_contains_all_standard_keys() {
        let config = MatrixConfig::default();
        let targets = select_targets(&config, &[], &[]).unwrap();
        let ctx = template_context(&config, &targets[0], "v5.8.1");
        assert_eq!(ctx["version"], "v5.8.1");
        assert_eq!(ctx["os"], "alpine");
        assert_eq!(ctx["name"], "example/app");
        assert_eq!(ctx["maintainer"], "builds@example.com");
        assert_eq!(ctx["base"], "alpine:edge");
        assert_eq!(ctx["arch"], "amd64");
        assert_eq!(ctx["alt_arch"], "amd64");
    }

    #[test]
    fn context_includes_global_vars() {
        let config = MatrixConfig::default();
        let ctx = template_context(&config, &target("alpine", "amd64"), "v1");
        assert_eq!(ctx["s6_version"], "v1.22.1.0");
    }

    #[test]
    fn os_vars_shadow_global_vars() {
        let mut config = MatrixConfig::default();
        config
            .vars
            .insert("pkg_install".to_string(), "global".to_string());
        let ctx = template_context(&config, &target("debian", "amd64"), "v1");
        assert_eq!(ctx["pkg_install"], "apt-get install -y");
    }

    #[test]
    fn record_fields_shadow_vars() {
        let mut config = MatrixConfig::default();
        // A var named like a record field never leaks into the render
        config
            .vars
            .insert("base".to_string(), "not-this-one".to_string());
        let ctx = template_context(&config, &target("debian", "amd64"), "v1");
        assert_eq!(ctx["base"], "debian:latest");
    }

    // =========================================================================
    // Rendering
    // =========================================================================

    #[test]
    fn generates_one_file_per_selected_target() {
        let tmp = TempDir::new().unwrap();
        let template = write_template(tmp.path(), TEMPLATE);
        let out = tmp.path().join("out");

        let config = MatrixConfig::default();
        let targets = select_targets(&config, &["debian".to_string()], &[]).unwrap();
        let generated = generate(&config, &targets, "v5.8.1", &template, &out).unwrap();

        let names: Vec<String> = generated
            .iter()
            .map(|g| g.path.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            names,
            vec![
                "Dockerfile_debian_amd64",
                "Dockerfile_debian_armel",
                "Dockerfile_debian_armhf",
                "Dockerfile_debian_arm64",
            ]
        );
        for file in &generated {
            assert!(file.path.is_file());
        }
    }

    #[test]
    fn file_set_matches_filtered_cross_product() {
        let tmp = TempDir::new().unwrap();
        let template = write_template(tmp.path(), TEMPLATE);
        let out = tmp.path().join("out");

        let config = MatrixConfig::default();
        let targets = select_targets(&config, &[], &["amd64".to_string()]).unwrap();
        generate(&config, &targets, "v1", &template, &out).unwrap();

        let mut written: Vec<String> = fs::read_dir(&out)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        written.sort();
        assert_eq!(
            written,
            vec!["Dockerfile_alpine_amd64", "Dockerfile_debian_amd64"]
        );
    }

    #[test]
    fn rendered_content_substitutes_target_values() {
        let tmp = TempDir::new().unwrap();
        let template = write_template(tmp.path(), TEMPLATE);
        let out = tmp.path().join("out");

        let config = MatrixConfig::default();
        let targets = select_targets(
            &config,
            &["debian".to_string()],
            &["arm64".to_string()],
        )
        .unwrap();
        let generated = generate(&config, &targets, "v5.8.1", &template, &out).unwrap();

        let content = fs::read_to_string(&generated[0].path).unwrap();
        assert!(content.starts_with("FROM multiarch/debian-debootstrap:arm64-stretch-slim\n"));
        assert!(content.contains("version=\"v5.8.1\""));
        assert!(content.contains("ENV OS=debian ARCH=arm64 ALT_ARCH=aarch64"));
    }

    #[test]
    fn rendering_is_deterministic() {
        let tmp = TempDir::new().unwrap();
        let template = write_template(tmp.path(), TEMPLATE);
        let config = MatrixConfig::default();
        let targets = select_targets(&config, &[], &[]).unwrap();

        let out_a = tmp.path().join("a");
        let out_b = tmp.path().join("b");
        let gen_a = generate(&config, &targets, "v1", &template, &out_a).unwrap();
        let gen_b = generate(&config, &targets, "v1", &template, &out_b).unwrap();

        for (a, b) in gen_a.iter().zip(&gen_b) {
            assert_eq!(fs::read(&a.path).unwrap(), fs::read(&b.path).unwrap());
        }
    }

    #[test]
    fn missing_template_is_a_distinct_error() {
        let tmp = TempDir::new().unwrap();
        let config = MatrixConfig::default();
        let targets = select_targets(&config, &[], &[]).unwrap();
        let err = generate(
            &config,
            &targets,
            "v1",
            &tmp.path().join("nope.template"),
            tmp.path(),
        )
        .unwrap_err();
        assert!(matches!(err, RenderError::MissingTemplate(_)));
        assert!(err.to_string().contains("nope.template"));
    }

    #[test]
    fn undefined_template_variable_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let template = write_template(tmp.path(), "FROM {{ no_such_var }}\n");
        let config = MatrixConfig::default();
        let targets = select_targets(&config, &[], &["amd64".to_string()]).unwrap();
        let err = generate(&config, &targets, "v1", &template, tmp.path()).unwrap_err();
        assert!(matches!(err, RenderError::Template(_)));
    }

    #[test]
    fn invalid_template_syntax_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let template = write_template(tmp.path(), "FROM {{ unclosed\n");
        let config = MatrixConfig::default();
        let targets = select_targets(&config, &[], &["amd64".to_string()]).unwrap();
        let err = generate(&config, &targets, "v1", &template, tmp.path()).unwrap_err();
        assert!(matches!(err, RenderError::Template(_)));
    }
}
