//! Command line arguments.

use crate::cost::Target;
use anyhow::{bail, Context, Result};
use clap::Parser;
use squish_core::{Algorithm, SearchConfig};
use std::ffi::OsString;
use std::path::{Path, PathBuf};

#[derive(Debug, Parser)]
#[command(
    name = "squish",
    version,
    about = "Minify and compress TIC-80 Lua carts by stochastic search"
)]
pub struct Cli {
    /// Lua sources to pack. ?, * and ** wildcards are expanded
    #[arg(required = true, value_name = "INPUT")]
    pub inputs: Vec<PathBuf>,

    /// Output file, or a directory that receives <name>.packed.lua or
    /// <name>.packed.bin for every input. Defaults to next to the input
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Write the best Lua source instead of compressed code
    #[arg(short, long)]
    pub lua: bool,

    /// Optimize for the uncompressed size
    #[arg(short, long)]
    pub uncompressed: bool,

    /// Pretty-print every new best solution
    #[arg(short, long)]
    pub print_best: bool,

    /// Never render function()end as load''
    #[arg(long)]
    pub no_load: bool,

    /// JSON search configuration; flags below override it
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// anneal, lahc or dlas
    #[arg(short, long)]
    pub algorithm: Option<Algorithm>,

    /// Step budget, 0 to run until interrupted
    #[arg(short, long)]
    pub steps: Option<usize>,

    #[arg(short = 'H', long)]
    pub lahc_history: Option<usize>,

    #[arg(short = 'D', long)]
    pub dlas_history: Option<usize>,

    /// Added to the initial cost when filling the lahc/dlas history
    #[arg(short, long)]
    pub margin: Option<f64>,

    #[arg(short = 't', long)]
    pub start_temp: Option<f64>,

    #[arg(short = 'T', long)]
    pub end_temp: Option<f64>,

    /// Stop once the packed size is at or below this many bytes
    #[arg(long, default_value_t = 0, value_name = "BYTES")]
    pub target_size: u64,

    /// With --target-size, aim for exactly that size
    #[arg(long)]
    pub exact: bool,

    #[arg(long)]
    pub seed: Option<u64>,

    /// Candidates kept in flight
    #[arg(long)]
    pub queue_length: Option<usize>,

    /// Worker threads; 1 evaluates in the search thread
    #[arg(short, long)]
    pub workers: Option<usize>,

    /// Deflate level, 0-9
    #[arg(short = 'z', long, default_value_t = 9, value_parser = clap::value_parser!(u32).range(0..=9))]
    pub level: u32,

    /// Log as JSON lines
    #[arg(long)]
    pub log_json: bool,
}

impl Cli {
    /// Search configuration from `--config`, overridden by flags.
    pub fn search_config(&self) -> Result<SearchConfig> {
        let mut config = match &self.config {
            Some(path) => {
                let json = std::fs::read_to_string(path)
                    .with_context(|| format!("reading {}", path.display()))?;
                SearchConfig::from_json(&json)
                    .with_context(|| format!("loading {}", path.display()))?
            }
            None => SearchConfig::default(),
        };

        if let Some(algorithm) = self.algorithm {
            config.algorithm = algorithm;
        }
        if let Some(steps) = self.steps {
            config.steps = steps;
        }
        if let Some(length) = self.lahc_history {
            config.lahc.history_length = length;
        }
        if let Some(length) = self.dlas_history {
            config.dlas.history_length = length;
        }
        if let Some(margin) = self.margin {
            config = config.with_margin(margin);
        }
        if let Some(temp) = self.start_temp {
            config.anneal.start_temp = temp;
        }
        if let Some(temp) = self.end_temp {
            config.anneal.end_temp = temp;
        }
        if let Some(seed) = self.seed {
            config.seed = seed;
        }
        if let Some(queue_length) = self.queue_length {
            config.pipeline.queue_length = queue_length;
        }
        if let Some(workers) = self.workers {
            config.pipeline.workers = workers;
        }

        config.validate()?;
        Ok(config)
    }

    /// Lua output is never compressed.
    pub fn compressed(&self) -> bool {
        !(self.lua || self.uncompressed)
    }

    pub fn target(&self) -> Target {
        Target::new(self.target_size, self.exact)
    }

    /// Inputs with wildcards expanded, sorted and without duplicates.
    pub fn input_paths(&self) -> Result<Vec<PathBuf>> {
        let mut paths = Vec::new();
        for pattern in &self.inputs {
            let pattern = pattern.to_string_lossy();
            let matches =
                glob::glob(&pattern).with_context(|| format!("bad input pattern {pattern}"))?;
            for path in matches {
                paths.push(path?);
            }
        }
        paths.sort();
        paths.dedup();

        if paths.is_empty() {
            bail!("no input files found");
        }
        if paths.len() > 1 && self.output.as_deref().map_or(false, |out| !out.is_dir()) {
            bail!("when packing several inputs, the output must be a directory");
        }
        Ok(paths)
    }

    /// Where the packed form of `input` goes.
    pub fn output_path(&self, input: &Path) -> PathBuf {
        let extension = if self.compressed() {
            "packed.bin"
        } else {
            "packed.lua"
        };
        match &self.output {
            Some(dir) if dir.is_dir() => {
                let mut name = OsString::from(input.file_stem().unwrap_or_default());
                name.push(".");
                name.push(extension);
                dir.join(name)
            }
            Some(path) => path.clone(),
            None => input.with_extension(extension),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("squish").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_defaults() {
        let cli = parse(&["cart.lua"]);
        let config = cli.search_config().unwrap();
        assert_eq!(config.algorithm, Algorithm::Dlas);
        assert_eq!(config.steps, 10_000);
        assert!(cli.compressed());
        assert_eq!(
            cli.output_path(Path::new("cart.lua")),
            PathBuf::from("cart.packed.bin")
        );
        assert_eq!(cli.level, 9);
        assert_eq!(cli.target(), Target::default());
    }

    #[test]
    fn test_flags_override() {
        let cli = parse(&[
            "cart.lua", "-l", "-a", "LAHC", "-s", "50", "-H", "20", "-m", "3", "--seed", "9",
            "--queue-length", "4", "-w", "2",
        ]);
        let config = cli.search_config().unwrap();
        assert_eq!(config.algorithm, Algorithm::Lahc);
        assert_eq!(config.steps, 50);
        assert_eq!(config.lahc.history_length, 20);
        assert_eq!(config.dlas.margin, 3.0);
        assert_eq!(config.seed, 9);
        assert_eq!(config.pipeline.queue_length, 4);
        assert_eq!(config.pipeline.workers, 2);
        assert!(!cli.compressed());
        assert_eq!(
            cli.output_path(Path::new("cart.lua")),
            PathBuf::from("cart.packed.lua")
        );
    }

    #[test]
    fn test_target_flags() {
        let cli = parse(&["cart.lua", "--target-size", "256", "--exact"]);
        assert_eq!(cli.target(), Target::new(256, true));
        assert_eq!(cli.target().cost(250), 6.0);
    }

    #[test]
    fn test_wildcards_expand_sorted() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.lua", "a.lua", "notes.txt"] {
            std::fs::write(dir.path().join(name), "x=1").unwrap();
        }
        let pattern = dir.path().join("*.lua");
        let literal = dir.path().join("a.lua");
        let cli = parse(&[pattern.to_str().unwrap(), literal.to_str().unwrap()]);
        assert_eq!(
            cli.input_paths().unwrap(),
            vec![dir.path().join("a.lua"), dir.path().join("b.lua")]
        );

        let missing = dir.path().join("*.tic");
        assert!(parse(&[missing.to_str().unwrap()]).input_paths().is_err());
    }

    #[test]
    fn test_several_inputs_need_an_output_directory() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out");
        std::fs::create_dir(&out).unwrap();
        for name in ["one.lua", "two.lua"] {
            std::fs::write(dir.path().join(name), "x=1").unwrap();
        }
        let pattern = dir.path().join("*.lua");
        let pattern = pattern.to_str().unwrap();

        let cli = parse(&[pattern, "-o", out.to_str().unwrap(), "-l"]);
        assert_eq!(cli.input_paths().unwrap().len(), 2);
        assert_eq!(
            cli.output_path(&dir.path().join("two.lua")),
            out.join("two.packed.lua")
        );

        let file = dir.path().join("packed.bin");
        let cli = parse(&[pattern, "-o", file.to_str().unwrap()]);
        assert!(cli.input_paths().is_err());
    }

    #[test]
    fn test_config_file_then_flags() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"algorithm": "anneal", "steps": 7, "anneal": {{"end_temp": 0.5}}}}"#)
            .unwrap();
        let path = file.path().to_str().unwrap().to_string();

        let cli = parse(&["cart.lua", "--config", &path, "-s", "8"]);
        let config = cli.search_config().unwrap();
        assert_eq!(config.algorithm, Algorithm::Anneal);
        assert_eq!(config.steps, 8);
        assert_eq!(config.anneal.end_temp, 0.5);
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(parse(&["cart.lua", "-t", "0"]).search_config().is_err());
        assert!(parse(&["cart.lua", "-w", "0"]).search_config().is_err());
        let argv = ["squish", "cart.lua", "-a", "tabu"];
        assert!(Cli::try_parse_from(argv).is_err());
        let argv = ["squish", "cart.lua", "-z", "12"];
        assert!(Cli::try_parse_from(argv).is_err());
    }
}
