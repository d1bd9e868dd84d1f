//! Pagekit - command-line script loader

use anyhow::{Context, Result, bail};
use pagekit_loader::{FetchHost, ScriptElement, ScriptLoadOptions, ScriptLoader};

const USAGE: &str = "\
usage: pagekit [--parallel] [--preload] [--base URL] [--options JSON|@FILE] URL...

  --parallel       start every load at once instead of one after another
  --preload        issue a preload hint and wait preloadTimeout before each load
  --base URL       document URL that relative script URLs resolve against
  --options JSON   script load options as JSON, or @path to read them from a file";

const DEFAULT_BASE: &str = "http://localhost/";

#[derive(Debug, Default, PartialEq)]
struct Args {
    parallel: bool,
    preload: bool,
    base: Option<String>,
    options: Option<String>,
    urls: Vec<String>,
}

impl Args {
    fn parse(args: impl IntoIterator<Item = String>) -> Result<Self> {
        let mut parsed = Args::default();
        let mut args = args.into_iter();

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--parallel" => parsed.parallel = true,
                "--preload" => parsed.preload = true,
                "--base" => {
                    parsed.base = Some(args.next().context("--base needs a URL")?);
                }
                "--options" => {
                    parsed.options = Some(args.next().context("--options needs a value")?);
                }
                flag if flag.starts_with("--") => bail!("unknown flag {flag}"),
                _ => parsed.urls.push(arg),
            }
        }
        Ok(parsed)
    }

    fn load_options(&self) -> Result<ScriptLoadOptions> {
        let mut options = match self.options.as_deref() {
            None => ScriptLoadOptions::default(),
            Some(value) => {
                let json = match value.strip_prefix('@') {
                    Some(path) => std::fs::read_to_string(path)
                        .with_context(|| format!("reading options from {path}"))?,
                    None => value.to_string(),
                };
                ScriptLoadOptions::from_json(&json).context("parsing script load options")?
            }
        };
        if self.preload {
            options.preload = true;
        }
        Ok(options)
    }
}

fn main() -> Result<()> {
    // Initialize logging
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("info")
    ).init();

    let args = Args::parse(std::env::args().skip(1))?;
    if args.urls.is_empty() {
        eprintln!("{USAGE}");
        std::process::exit(2);
    }

    let options = args.load_options()?;
    let base = args.base.as_deref().unwrap_or(DEFAULT_BASE);
    let loader = ScriptLoader::new(FetchHost::new(base)?);

    log::info!("Loading {} script(s) against {base}", args.urls.len());

    let scripts: Vec<ScriptElement> = smol::block_on(async {
        if args.parallel {
            loader.load_scripts_parallel(args.urls.as_slice(), &options).await
        } else {
            loader.load_scripts_sequentially(args.urls.as_slice(), &options).await
        }
    })?;

    for script in &scripts {
        let resolved = loader.host().resolve(&script.src)?;
        println!("loaded {resolved}{}", if script.cached { " (cached)" } else { "" });
    }

    Ok(())
}
