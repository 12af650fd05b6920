use std::path::PathBuf;

use anyhow::{anyhow, bail};
use dotenvy::dotenv;
use tracing::info;

mod config;
mod console;
mod error;
mod llm;
mod models;
mod server;
mod utils;
mod view;
mod workflow;

use config::CONFIG;
use console::{run_consult, ConsultArgs};
use utils::logging::init_logging;

#[derive(Debug, PartialEq)]
enum Command {
    Serve { port: u16 },
    Consult(ConsultArgs),
}

fn usage() -> &'static str {
    "Usage:\n  facestyle [serve] [--port <n>]\n  facestyle consult --image <path> [--image <path> ...] [--server <url>] [--out <dir>]\n                    [--method <label>] [--focus <screen>] [--divider <percent>] [--wheel <steps>]"
}

fn next_value<'a>(args: &'a [String], index: &mut usize, flag: &str) -> anyhow::Result<&'a str> {
    *index += 1;
    args.get(*index)
        .map(String::as_str)
        .ok_or_else(|| anyhow!("Missing value for {flag}"))
}

fn parse_serve_args(args: &[String]) -> anyhow::Result<Command> {
    let mut port = CONFIG.port;
    let mut index = 0;
    while index < args.len() {
        match args[index].as_str() {
            "--port" => {
                let value = next_value(args, &mut index, "--port")?;
                port = value
                    .parse::<u16>()
                    .map_err(|_| anyhow!("Invalid --port value: {value}"))?;
            }
            "--help" | "-h" => return Err(anyhow!(usage())),
            other => return Err(anyhow!("Unknown serve argument: {other}\n{}", usage())),
        }
        index += 1;
    }
    Ok(Command::Serve { port })
}

fn parse_consult_args(args: &[String]) -> anyhow::Result<Command> {
    let mut images: Vec<PathBuf> = Vec::new();
    let mut server_url = CONFIG.server_url.clone();
    let mut out_dir = PathBuf::from("facestyle-out");
    let mut payment_method = "card".to_string();
    let mut focus = None;
    let mut divider = None;
    let mut wheel = 0;

    let mut index = 0;
    while index < args.len() {
        match args[index].as_str() {
            "--image" => images.push(PathBuf::from(next_value(args, &mut index, "--image")?)),
            "--server" => server_url = next_value(args, &mut index, "--server")?.to_string(),
            "--out" => out_dir = PathBuf::from(next_value(args, &mut index, "--out")?),
            "--method" => payment_method = next_value(args, &mut index, "--method")?.to_string(),
            "--focus" => focus = Some(next_value(args, &mut index, "--focus")?.to_string()),
            "--divider" => {
                let value = next_value(args, &mut index, "--divider")?;
                let parsed = value
                    .parse::<f64>()
                    .ok()
                    .filter(|percent| percent.is_finite())
                    .ok_or_else(|| anyhow!("Invalid --divider value: {value}"))?;
                divider = Some(parsed);
            }
            "--wheel" => {
                let value = next_value(args, &mut index, "--wheel")?;
                wheel = value
                    .parse::<i32>()
                    .map_err(|_| anyhow!("Invalid --wheel value: {value}"))?;
            }
            "--help" | "-h" => return Err(anyhow!(usage())),
            other => return Err(anyhow!("Unknown consult argument: {other}\n{}", usage())),
        }
        index += 1;
    }

    if images.is_empty() {
        bail!("--image is required\n{}", usage());
    }
    Ok(Command::Consult(ConsultArgs {
        images,
        server_url,
        out_dir,
        payment_method,
        focus,
        divider,
        wheel,
    }))
}

fn parse_command(args: &[String]) -> anyhow::Result<Command> {
    match args.get(1).map(String::as_str) {
        Some("consult") => parse_consult_args(&args[2..]),
        Some("serve") => parse_serve_args(&args[2..]),
        _ => parse_serve_args(args.get(1..).unwrap_or_default()),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    let _guards = init_logging();

    let args: Vec<String> = std::env::args().collect();
    match parse_command(&args)? {
        Command::Serve { port } => {
            if CONFIG.gemini_api_key.trim().is_empty() {
                bail!("GEMINI_API_KEY is required to serve");
            }
            info!("Starting facestyle proxy");
            server::serve(port).await?;
        }
        Command::Consult(consult) => {
            let summaries = run_consult(consult).await?;
            for summary in &summaries {
                info!(
                    "Consultation summary: image={} face_type={} ready={} failed={} pages={}",
                    summary.image.display(),
                    summary.face_type,
                    summary.styles_ready,
                    summary.styles_failed,
                    summary.pages.len()
                );
            }
            let failed = summaries.iter().filter(|summary| summary.error.is_some()).count();
            if failed > 0 {
                bail!("{failed} of {} consultations failed", summaries.len());
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(values: &[&str]) -> Vec<String> {
        std::iter::once("facestyle")
            .chain(values.iter().copied())
            .map(str::to_string)
            .collect()
    }

    #[test]
    fn defaults_to_serving() {
        assert_eq!(
            parse_command(&args(&[])).unwrap(),
            Command::Serve { port: CONFIG.port }
        );
        assert_eq!(
            parse_command(&args(&["serve", "--port", "8080"])).unwrap(),
            Command::Serve { port: 8080 }
        );
        assert_eq!(
            parse_command(&args(&["--port", "9000"])).unwrap(),
            Command::Serve { port: 9000 }
        );
    }

    #[test]
    fn consult_requires_an_image() {
        let err = parse_command(&args(&["consult"])).unwrap_err();
        assert!(err.to_string().contains("--image is required"));

        let Command::Consult(consult) = parse_command(&args(&[
            "consult",
            "--image",
            "me.jpg",
            "--out",
            "out",
            "--method",
            "kakaopay",
        ]))
        .unwrap() else {
            panic!("expected consult");
        };
        assert_eq!(consult.images, vec![PathBuf::from("me.jpg")]);
        assert_eq!(consult.out_dir, PathBuf::from("out"));
        assert_eq!(consult.payment_method, "kakaopay");
        assert_eq!(consult.focus, None);
        assert_eq!(consult.divider, None);
        assert_eq!(consult.wheel, 0);
    }

    #[test]
    fn consult_collects_images_and_viewer_options() {
        let Command::Consult(consult) = parse_command(&args(&[
            "consult",
            "--image",
            "a.jpg",
            "--image",
            "b.png",
            "--focus",
            "results-blur",
            "--divider",
            "30",
            "--wheel",
            "-3",
        ]))
        .unwrap() else {
            panic!("expected consult");
        };
        assert_eq!(
            consult.images,
            vec![PathBuf::from("a.jpg"), PathBuf::from("b.png")]
        );
        assert_eq!(consult.focus.as_deref(), Some("results-blur"));
        assert_eq!(consult.divider, Some(30.0));
        assert_eq!(consult.wheel, -3);
    }

    #[test]
    fn rejects_bad_values() {
        assert!(parse_command(&args(&["serve", "--port", "abc"])).is_err());
        assert!(parse_command(&args(&["serve", "--port"])).is_err());
        assert!(parse_command(&args(&["consult", "--bogus"])).is_err());
        assert!(parse_command(&args(&["consult", "--image", "a.jpg", "--divider", "NaN"])).is_err());
        assert!(parse_command(&args(&["consult", "--image", "a.jpg", "--wheel", "1.5"])).is_err());
    }
}
