//! CLI output formatting for both pipeline phases.
//!
//! Output is information-centric: every line leads with the target's
//! positional index and `<os>/<arch>` identity, with file paths, tags, and
//! per-command status as context. A trailing summary line closes each phase.
//!
//! ```text
//! 001 debian/amd64 → Dockerfile_debian_amd64
//! 002 debian/arm64 → Dockerfile_debian_arm64
//! Generated 2 Dockerfiles
//!
//! 001 debian/amd64 → app:v5.8.1_debian_amd64
//!     built (64.2s)
//!     tagged example/app:latest
//! 002 debian/arm64 → app:v5.8.1_debian_arm64
//!     build failed (exit 1)
//! Built 1 image, 1 failed
//! ```
//!
//! Each phase has `format_*` functions (returning lines) for testability and
//! `print_*` wrappers that write to stdout. Format functions are pure.

use crate::build::{BuildOutcome, BuiltImage};
use crate::render::GeneratedFile;
use std::time::Duration;

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

fn format_duration(d: Duration) -> String {
    format!("{:.1}s", d.as_secs_f64())
}

fn format_exit(code: Option<i32>) -> String {
    match code {
        Some(code) => format!("exit {code}"),
        None => "killed by signal".to_string(),
    }
}

// ============================================================================
// Generate phase
// ============================================================================

/// Format the generate phase report: one line per written Dockerfile plus a
/// summary.
pub fn format_generate_output(files: &[GeneratedFile]) -> Vec<String> {
    let mut lines = Vec::with_capacity(files.len() + 1);
    for (i, file) in files.iter().enumerate() {
        lines.push(format!(
            "{} {}/{} \u{2192} {}",
            format_index(i + 1),
            file.os,
            file.arch,
            file.path.display()
        ));
    }
    lines.push(format!(
        "Generated {} {}",
        files.len(),
        if files.len() == 1 {
            "Dockerfile"
        } else {
            "Dockerfiles"
        }
    ));
    lines
}

/// Print the generate phase report to stdout.
pub fn print_generate_output(files: &[GeneratedFile]) {
    for line in format_generate_output(files) {
        println!("{line}");
    }
}

// ============================================================================
// Build phase
// ============================================================================

/// Header line announcing one target before docker runs.
pub fn format_build_start(index: usize, os: &str, arch: &str, tag: &str) -> String {
    format!("{} {os}/{arch} \u{2192} {tag}", format_index(index))
}

/// Status lines for one finished target.
///
/// Captured docker output is included only on failure; verbose runs stream
/// it live instead, so there is nothing captured to repeat.
pub fn format_build_result(
    built: &BuiltImage,
    hub_tag: Option<&str>,
    timing: bool,
) -> Vec<String> {
    let with_timing = |label: &str| {
        if timing {
            format!("    {label} ({})", format_duration(built.duration))
        } else {
            format!("    {label}")
        }
    };
    let captured = |output: &Option<String>| -> Vec<String> {
        output
            .iter()
            .flat_map(|o| o.lines())
            .map(|l| format!("        {l}"))
            .collect()
    };
    match &built.outcome {
        BuildOutcome::Built { hub_tagged } => {
            let mut lines = vec![with_timing("built")];
            if *hub_tagged {
                if let Some(hub_tag) = hub_tag {
                    lines.push(format!("    tagged {hub_tag}"));
                }
            }
            lines
        }
        BuildOutcome::Failed { code, output } => {
            let mut lines = vec![with_timing(&format!("build failed ({})", format_exit(*code)))];
            lines.extend(captured(output));
            lines
        }
        BuildOutcome::TagFailed { code, output } => {
            let mut lines = vec![
                with_timing("built"),
                format!("    tag failed ({})", format_exit(*code)),
            ];
            lines.extend(captured(output));
            lines
        }
    }
}

/// Closing summary for the build phase.
pub fn format_build_summary(results: &[BuiltImage]) -> Vec<String> {
    let built = results.iter().filter(|r| r.outcome.is_success()).count();
    let failed: Vec<String> = results
        .iter()
        .filter(|r| !r.outcome.is_success())
        .map(|r| format!("{}/{}", r.os, r.arch))
        .collect();

    let mut summary = format!("Built {built} {}", if built == 1 { "image" } else { "images" });
    if !failed.is_empty() {
        summary.push_str(&format!(", {} failed", failed.len()));
    }
    let mut lines = vec![summary];
    if !failed.is_empty() {
        lines.push(format!("Failed: {}", failed.join(", ")));
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn built(os: &str, arch: &str, outcome: BuildOutcome) -> BuiltImage {
        BuiltImage {
            os: os.to_string(),
            arch: arch.to_string(),
            tag: format!("app:v1_{os}_{arch}"),
            outcome,
            duration: Duration::from_millis(1500),
        }
    }

    #[test]
    fn format_index_pads_to_three_digits() {
        assert_eq!(format_index(1), "001");
        assert_eq!(format_index(42), "042");
        assert_eq!(format_index(100), "100");
    }

    #[test]
    fn generate_output_lists_files_and_summary() {
        let files = vec![
            GeneratedFile {
                os: "debian".to_string(),
                arch: "amd64".to_string(),
                path: PathBuf::from("Dockerfile_debian_amd64"),
            },
            GeneratedFile {
                os: "debian".to_string(),
                arch: "arm64".to_string(),
                path: PathBuf::from("Dockerfile_debian_arm64"),
            },
        ];
        let lines = format_generate_output(&files);
        assert_eq!(lines[0], "001 debian/amd64 \u{2192} Dockerfile_debian_amd64");
        assert_eq!(lines[1], "002 debian/arm64 \u{2192} Dockerfile_debian_arm64");
        assert_eq!(lines[2], "Generated 2 Dockerfiles");
    }

    #[test]
    fn generate_output_singular_summary() {
        let files = vec![GeneratedFile {
            os: "alpine".to_string(),
            arch: "amd64".to_string(),
            path: PathBuf::from("Dockerfile_alpine_amd64"),
        }];
        assert_eq!(format_generate_output(&files)[1], "Generated 1 Dockerfile");
    }

    #[test]
    fn build_start_line() {
        assert_eq!(
            format_build_start(3, "debian", "armhf", "app:v1_debian_armhf"),
            "003 debian/armhf \u{2192} app:v1_debian_armhf"
        );
    }

    #[test]
    fn build_result_success_without_timing() {
        let image = built("debian", "amd64", BuildOutcome::Built { hub_tagged: false });
        assert_eq!(format_build_result(&image, None, false), vec!["    built"]);
    }

    #[test]
    fn build_result_success_with_timing() {
        let image = built("debian", "amd64", BuildOutcome::Built { hub_tagged: false });
        assert_eq!(
            format_build_result(&image, None, true),
            vec!["    built (1.5s)"]
        );
    }

    #[test]
    fn build_result_reports_hub_tag() {
        let image = built("debian", "amd64", BuildOutcome::Built { hub_tagged: true });
        let lines = format_build_result(&image, Some("example/app:latest"), false);
        assert_eq!(lines, vec!["    built", "    tagged example/app:latest"]);
    }

    #[test]
    fn build_result_failure_includes_captured_output() {
        let image = built(
            "debian",
            "amd64",
            BuildOutcome::Failed {
                code: Some(1),
                output: Some("step 3 failed\nno such package".to_string()),
            },
        );
        let lines = format_build_result(&image, None, false);
        assert_eq!(lines[0], "    build failed (exit 1)");
        assert_eq!(lines[1], "        step 3 failed");
        assert_eq!(lines[2], "        no such package");
    }

    #[test]
    fn build_result_signal_death() {
        let image = built(
            "debian",
            "amd64",
            BuildOutcome::Failed {
                code: None,
                output: None,
            },
        );
        assert_eq!(
            format_build_result(&image, None, false),
            vec!["    build failed (killed by signal)"]
        );
    }

    #[test]
    fn build_result_tag_failure() {
        let image = built(
            "debian",
            "amd64",
            BuildOutcome::TagFailed {
                code: Some(125),
                output: None,
            },
        );
        let lines = format_build_result(&image, Some("example/app:latest"), false);
        assert_eq!(lines, vec!["    built", "    tag failed (exit 125)"]);
    }

    #[test]
    fn build_summary_all_success() {
        let results = vec![
            built("alpine", "amd64", BuildOutcome::Built { hub_tagged: false }),
            built("debian", "amd64", BuildOutcome::Built { hub_tagged: false }),
        ];
        assert_eq!(format_build_summary(&results), vec!["Built 2 images"]);
    }

    #[test]
    fn build_summary_lists_failures() {
        let results = vec![
            built("alpine", "amd64", BuildOutcome::Built { hub_tagged: false }),
            built(
                "debian",
                "armel",
                BuildOutcome::Failed {
                    code: Some(1),
                    output: None,
                },
            ),
        ];
        let lines = format_build_summary(&results);
        assert_eq!(lines[0], "Built 1 image, 1 failed");
        assert_eq!(lines[1], "Failed: debian/armel");
    }
}
