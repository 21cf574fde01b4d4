use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use judyarray::Judy;

/// Sort the lines of the input, counting duplicates in a judy array
#[derive(Clone, Debug, Parser)]
struct Args {
    /// input filename, stdin if not given
    input: Option<PathBuf>,
    /// output filename, stdout if not given
    output: Option<PathBuf>,
    /// longest accepted line in bytes, longer lines are truncated
    #[arg(long, default_value_t = 1024)]
    max_key: usize,
    /// print each distinct line once, prefixed with its count
    #[arg(short, long)]
    unique: bool,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let input: Box<dyn BufRead> = match &args.input {
        Some(path) => Box::new(BufReader::new(
            File::open(path).with_context(|| format!("unable to open {}", path.display()))?,
        )),
        None => Box::new(BufReader::new(io::stdin())),
    };
    let mut output: Box<dyn Write> = match &args.output {
        Some(path) => Box::new(BufWriter::new(
            File::create(path).with_context(|| format!("unable to create {}", path.display()))?,
        )),
        None => Box::new(BufWriter::new(io::stdout())),
    };

    let mut judy = Judy::open(args.max_key)?;
    for line in input.split(b'\n') {
        let mut line = line?;
        if line.last() == Some(&b'\r') {
            line.pop();
        }
        line.truncate(args.max_key);
        *judy.cell(&line)? += 1;
    }

    log::info!("{} bytes of arena memory used", judy.memory());

    let mut buf = vec![0u8; args.max_key + 1];
    let mut cell = judy.strt(b"").map(|cell| *cell);
    while let Some(count) = cell {
        let len = judy.key(&mut buf);
        if args.unique {
            writeln!(output, "{count} {}", String::from_utf8_lossy(&buf[..len]))?;
        } else {
            for _ in 0..count {
                output.write_all(&buf[..len])?;
                output.write_all(b"\n")?;
            }
        }
        cell = judy.nxt().map(|cell| *cell);
    }
    output.flush()?;
    Ok(())
}
