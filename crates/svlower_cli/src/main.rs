//! svlower CLI — converts parsed SystemVerilog designs to Verilog-2005.
//!
//! The front-end parser runs as a separate tool and hands its output over
//! as JSON-serialized description lists; this binary loads one or more of
//! those files, runs the conversion passes over the aggregate design, and
//! renders Verilog-2005 text to stdout or a file. Any fatal conversion
//! error is reported as a single diagnostic line on stderr with a
//! non-zero exit code.

#![warn(missing_docs)]

use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use svlower_ast::Description;

/// svlower — SystemVerilog to Verilog-2005 conversion.
#[derive(Parser, Debug)]
#[command(name = "svlower", version, about = "SystemVerilog to Verilog-2005 converter")]
struct Cli {
    /// Parsed design files (JSON description lists), processed in order
    /// as one aggregate design.
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Output path for the rendered Verilog; stdout when omitted.
    #[arg(short, long)]
    output: Option<PathBuf>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("error: {message}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<(), String> {
    let mut descriptions: Vec<Description> = Vec::new();
    for path in &cli.files {
        let text = fs::read_to_string(path)
            .map_err(|e| format!("cannot read {}: {e}", path.display()))?;
        let mut parsed: Vec<Description> = serde_json::from_str(&text)
            .map_err(|e| format!("cannot parse {}: {e}", path.display()))?;
        descriptions.append(&mut parsed);
    }

    let converted = svlower_convert::convert(descriptions).map_err(|e| e.to_string())?;
    let mut rendered = converted
        .iter()
        .map(|d| d.to_string())
        .collect::<Vec<_>>()
        .join("\n");
    rendered.push('\n');

    match &cli.output {
        Some(path) => fs::write(path, rendered)
            .map_err(|e| format!("cannot write {}: {e}", path.display()))?,
        None => print!("{rendered}"),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use svlower_ast::{
        AlwaysKw, AsgnOp, Decl, Direction, Expr, IntegerVectorKind, Lhs, Lifetime, ModuleItem,
        PackageItem, Part, PartKind, Signing, Stmt, Type,
    };

    fn sample_design() -> Vec<Description> {
        vec![Description::Part(Part {
            attrs: Vec::new(),
            is_extern: false,
            kind: PartKind::Module,
            lifetime: Lifetime::Inherit,
            name: "m".to_string(),
            ports: vec!["o".to_string()],
            items: vec![
                ModuleItem::PackageItem(PackageItem::Decl(Decl::Variable {
                    dir: Direction::Output,
                    ty: Type::IntegerVector(
                        IntegerVectorKind::Logic,
                        Signing::Unspecified,
                        Vec::new(),
                    ),
                    name: "o".to_string(),
                    dims: Vec::new(),
                    init: None,
                })),
                ModuleItem::AlwaysC {
                    kw: AlwaysKw::AlwaysComb,
                    stmt: Stmt::Asgn {
                        op: AsgnOp::Eq,
                        timing: None,
                        lhs: Lhs::Ident("o".to_string()),
                        expr: Expr::Number("1'b0".to_string()),
                    },
                },
            ],
        })]
    }

    #[test]
    fn run_converts_and_writes_output() {
        let dir = tempfile::TempDir::new().unwrap();
        let input = dir.path().join("design.json");
        let output = dir.path().join("out.v");
        fs::write(&input, serde_json::to_string(&sample_design()).unwrap()).unwrap();

        let cli = Cli {
            files: vec![input],
            output: Some(output.clone()),
        };
        run(&cli).unwrap();
        let text = fs::read_to_string(&output).unwrap();
        assert!(text.contains("module m(o);"));
        assert!(text.contains("output reg o;"));
    }

    #[test]
    fn run_concatenates_multiple_files() {
        let dir = tempfile::TempDir::new().unwrap();
        let first = dir.path().join("a.json");
        let second = dir.path().join("b.json");
        let output = dir.path().join("out.v");
        fs::write(&first, serde_json::to_string(&sample_design()).unwrap()).unwrap();
        let mut renamed = sample_design();
        if let Description::Part(part) = &mut renamed[0] {
            part.name = "n".to_string();
        }
        fs::write(&second, serde_json::to_string(&renamed).unwrap()).unwrap();

        let cli = Cli {
            files: vec![first, second],
            output: Some(output.clone()),
        };
        run(&cli).unwrap();
        let text = fs::read_to_string(&output).unwrap();
        assert!(text.contains("module m(o);"));
        assert!(text.contains("module n(o);"));
    }

    #[test]
    fn run_reports_missing_file() {
        let cli = Cli {
            files: vec![PathBuf::from("/nonexistent/design.json")],
            output: None,
        };
        let err = run(&cli).unwrap_err();
        assert!(err.contains("cannot read"));
    }

    #[test]
    fn run_reports_malformed_json() {
        let dir = tempfile::TempDir::new().unwrap();
        let input = dir.path().join("bad.json");
        fs::write(&input, "not json").unwrap();
        let cli = Cli {
            files: vec![input],
            output: None,
        };
        let err = run(&cli).unwrap_err();
        assert!(err.contains("cannot parse"));
    }
}
