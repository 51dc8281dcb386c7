use anyhow::{Context, bail};
use bytes::Bytes;
use clap::{Parser, ValueEnum};
use md5chk::{
    BlockHasher, ChkError, DEFAULT_BLOCK_SIZE, Delimiter, DigestConfig, LineFormat, LineWriter,
    Md5Hasher, NameReader, Salting, Session, Window, display_name, open_input,
};
use std::ffi::OsString;
use std::io::{self, BufWriter, Write};
use std::process::exit;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Registry};

#[derive(Debug, Parser)]
#[command(
    name = "md5chk",
    version,
    about = "Print digests of files, optionally per block and per overlapping block pair.",
    after_help = "Numeric names are the file descriptor to use, - is stdin with -s.\n\n\
                  Examples:\n  \
                  md5chk -d 'string1' 'string2'\n  \
                  echo test | md5chk -s\n  \
                  find . -type f | md5chk -t10\n  \
                  find . -type f -print0 | md5chk -n | while read -r md5 name; do eval name=\"\\$'$name'\"; done"
)]
struct Args {
    /// Names to digest, or empty to read a name list from standard input.
    names: Vec<OsString>,

    #[arg(short = 'a', value_enum, default_value_t = Algorithm::Md5)]
    /// Digest primitive.
    algorithm: Algorithm,

    #[arg(short = 'b', value_parser = parse_size, default_value_t = DEFAULT_BLOCK_SIZE as u64)]
    /// I/O block size, suffixes k, m, g and t allowed.
    block_size: u64,

    #[arg(short = 'c')]
    /// Cat mode: echo the input to stdout, digests go to stderr.
    cat: bool,

    #[arg(short = 'd')]
    /// Digest the names themselves instead of the files they name.
    direct: bool,

    #[arg(short = 'e', value_parser = parse_size, default_value_t = 0)]
    /// Read exactly this many bytes, 0 is unlimited. Fewer bytes are an error.
    exact: u64,

    #[arg(short = 'f', value_parser = parse_size, default_value_t = 0)]
    /// Start at this offset. Skips on stdin, fewer bytes are an error.
    offset: u64,

    #[arg(short = 'i')]
    /// Ignore errors silently; the exit status still reports them.
    ignore: bool,

    #[arg(short = 'k')]
    /// Salt every block digest with its block number. Implies -m.
    block_numbers: bool,

    #[arg(short = 'K')]
    /// Like -k, but restart the block numbers for every item.
    block_numbers_per_item: bool,

    #[arg(short = 'l')]
    /// Overlapping mode: 1-12-23-34=1234. Implies -m.
    overlap: bool,

    #[arg(short = 'm', value_parser = parse_size, default_value_t = 0)]
    /// Maximum block size for per-block digests: 1+2+3=123. Defaults to 1 MiB
    /// with -k or -l.
    max_size: u64,

    #[arg(short = 'n')]
    /// Read NUL terminated names. NUL always terminates a name.
    nul_names: bool,

    #[arg(short = 'p')]
    /// Prefix every digest context with this string.
    prefix: Option<OsString>,

    #[arg(short = 'q')]
    /// Quiet: do not print the (shell escaped) names.
    quiet: bool,

    #[arg(short = 's')]
    /// Digest standard input instead of reading a name list. Enables - as
    /// name for stdin.
    stdin: bool,

    #[arg(short = 't', value_parser = parse_terminator)]
    /// Name terminator, a character or a decimal code. Defaults to
    /// whitespace, or NUL with -n.
    terminator: Option<u8>,

    #[arg(short = 'u')]
    /// Unbuffered output, also for the data echoed by -c.
    unbuffered: bool,

    #[arg(short = 'z')]
    /// Write NUL terminated lines, names are not escaped.
    zero: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Algorithm {
    Md5,
    Blake3,
}

/// Parses a byte count with an optional binary suffix.
fn parse_size(arg: &str) -> anyhow::Result<u64> {
    let arg = arg.trim();
    let (digits, shift) = match arg.char_indices().last() {
        Some((i, c)) if c.is_ascii_alphabetic() => {
            let shift = match c.to_ascii_lowercase() {
                'k' => 10,
                'm' => 20,
                'g' => 30,
                't' => 40,
                _ => bail!("unknown size suffix {:?}", c),
            };
            (&arg[..i], shift)
        }
        _ => (arg, 0),
    };
    let value: u64 = digits
        .parse()
        .with_context(|| format!("invalid size {:?}", arg))?;
    value
        .checked_mul(1 << shift)
        .with_context(|| format!("size out of range: {}", arg))
}

/// Parses a terminator given as a single character or a decimal code.
fn parse_terminator(arg: &str) -> anyhow::Result<u8> {
    match arg.as_bytes() {
        [byte] => Ok(*byte),
        _ => arg
            .parse()
            .with_context(|| format!("terminator must be one byte or a code up to 255: {:?}", arg)),
    }
}

#[cfg(unix)]
fn os_bytes(arg: &std::ffi::OsStr) -> Vec<u8> {
    use std::os::unix::ffi::OsStrExt;

    arg.as_bytes().to_vec()
}

#[cfg(not(unix))]
fn os_bytes(arg: &std::ffi::OsStr) -> Vec<u8> {
    arg.to_string_lossy().into_owned().into_bytes()
}

fn make_config(args: &Args) -> anyhow::Result<DigestConfig> {
    if args.direct && args.stdin {
        bail!("-d and -s together make no sense");
    }
    let block_size =
        usize::try_from(args.block_size).context("block size does not fit in memory")?;
    let salting = if args.block_numbers_per_item {
        Salting::PerItem
    } else if args.block_numbers {
        Salting::Continuous
    } else {
        Salting::Off
    };

    let config = DigestConfig::default()
        .with_block_size(block_size)
        .with_max_size(args.max_size)
        .with_overlap(args.overlap)
        .with_window(Window::new(args.offset, args.exact))
        .with_prefix(args.prefix.as_deref().map(|p| Bytes::from(os_bytes(p))))
        .with_salting(salting)
        .with_pass_through(args.cat)
        .with_unbuffered(args.unbuffered);
    config.validate()?;
    Ok(config)
}

struct Runner<'a, H: BlockHasher> {
    args: &'a Args,
    session: Session<H>,
    writer: LineWriter<Box<dyn Write>>,
    failed: bool,
}

impl<H: BlockHasher> Runner<'_, H> {
    fn item(&mut self, name: &[u8]) {
        let result = if self.args.direct {
            self.session
                .digest_literal(Bytes::copy_from_slice(name), &mut self.writer)
        } else {
            open_input(name, self.args.stdin).and_then(|input| {
                self.session
                    .digest_source(&display_name(name), input, &mut self.writer)
            })
        };

        match result {
            Ok(()) => {
                if let Err(e) = self.writer.finish_line(name) {
                    self.report(&ChkError::from(e));
                }
            }
            Err(e) => {
                if self.writer.started() {
                    if let Err(e) = self.writer.finish_line(name) {
                        self.report(&ChkError::from(e));
                    }
                }
                self.report(&e);
            }
        }
    }

    fn report(&mut self, err: &ChkError) {
        self.failed = true;
        if !self.args.ignore {
            eprintln!("md5chk: {}", err);
        }
    }

    fn run(mut self) -> bool {
        let args = self.args;
        if !args.names.is_empty() {
            for name in &args.names {
                self.item(&os_bytes(name));
            }
        } else if args.stdin {
            self.item(b"-");
        } else {
            let delimiter = match (args.terminator, args.nul_names) {
                (Some(byte), _) => Delimiter::Byte(byte),
                (None, true) => Delimiter::Byte(0),
                (None, false) => Delimiter::Whitespace,
            };
            for name in NameReader::new(io::stdin().lock(), delimiter) {
                match name {
                    Ok(name) => self.item(&name),
                    Err(e) => {
                        self.report(&ChkError::from(e));
                        break;
                    }
                }
            }
        }

        if let Err(e) = self.writer.flush() {
            self.report(&ChkError::from(e));
        }
        !self.failed
    }
}

fn run<H: BlockHasher>(args: &Args, config: DigestConfig) -> anyhow::Result<bool> {
    let out: Box<dyn Write> = if args.cat {
        Box::new(io::stderr())
    } else {
        Box::new(BufWriter::new(io::stdout()))
    };
    let format = LineFormat {
        quiet: args.quiet,
        zero: args.zero,
        unbuffered: args.unbuffered,
    };

    tracing::debug!(algorithm = H::NAME, ?config, "starting");
    let runner = Runner {
        args,
        session: Session::<H>::new(config)?,
        writer: LineWriter::new(out, format),
        failed: false,
    };
    Ok(runner.run())
}

fn main() {
    let env_filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::WARN.into())
        .from_env_lossy();
    Registry::default()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let args = Args::parse();

    let result = make_config(&args).and_then(|config| match args.algorithm {
        Algorithm::Md5 => run::<Md5Hasher>(&args, config),
        #[cfg(feature = "hash-blake3")]
        Algorithm::Blake3 => run::<md5chk::Blake3Hasher>(&args, config),
        #[cfg(not(feature = "hash-blake3"))]
        Algorithm::Blake3 => bail!("built without blake3 support"),
    });

    match result {
        Ok(true) => {}
        Ok(false) => exit(1),
        Err(e) => {
            eprintln!("md5chk: {:#}", e);
            exit(1);
        }
    }
}
