use serde::Serialize;
use std::io::Read;
use std::str::FromStr;
use svgquirk::raster::{RasterError, RasterOptions, Rasterizer};
use svgquirk::{headless_pipeline, system_fontdb};

#[derive(Debug)]
enum CliError {
    Usage(&'static str),
    Io(std::io::Error),
    Svg(svgquirk::Error),
    Raster(RasterError),
    Json(serde_json::Error),
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CliError::Usage(msg) => write!(f, "{msg}"),
            CliError::Io(err) => write!(f, "I/O error: {err}"),
            CliError::Svg(err) => write!(f, "{err}"),
            CliError::Raster(err) => write!(f, "{err}"),
            CliError::Json(err) => write!(f, "JSON error: {err}"),
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<svgquirk::Error> for CliError {
    fn from(value: svgquirk::Error) -> Self {
        Self::Svg(value)
    }
}

impl From<RasterError> for CliError {
    fn from(value: RasterError) -> Self {
        Self::Raster(value)
    }
}

impl From<serde_json::Error> for CliError {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}

#[derive(Debug, Clone, Copy, Default)]
enum Command {
    #[default]
    Measure,
    Normalize,
    Render,
}

#[derive(Debug, Clone, Copy, Default)]
enum RenderFormat {
    #[default]
    Png,
    Jpeg,
}

impl RenderFormat {
    fn extension(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpg",
        }
    }
}

impl FromStr for RenderFormat {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "png" => Ok(Self::Png),
            "jpg" | "jpeg" => Ok(Self::Jpeg),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Default)]
struct Args {
    command: Command,
    input: Option<String>,
    pretty: bool,
    verbose: bool,
    embed_fonts: bool,
    render_format: RenderFormat,
    render_scale: f32,
    device_pixel_ratio: f32,
    background: Option<String>,
    out: Option<String>,
}

fn usage() -> &'static str {
    "svgquirk-cli\n\
\n\
USAGE:\n\
  svgquirk-cli [measure] [--pretty] [--verbose] [<path>|-]\n\
  svgquirk-cli normalize [--embed-fonts] [--out <path>] [--verbose] [<path>|-]\n\
  svgquirk-cli render [--format png|jpg] [--scale <n>] [--device-pixel-ratio <n>] [--background <css-color>] [--out <path>] [--verbose] [<path>|-]\n\
\n\
NOTES:\n\
  - If <path> is omitted or '-', input is read from stdin.\n\
  - measure prints the drawn bounds ({x, y, width, height}) as JSON.\n\
  - normalize prints the normalized SVG to stdout by default; use --out to write a file.\n\
  - render writes next to the input file by default (or ./out.png / ./out.jpg for stdin).\n\
"
}

fn parse_positive(value: Option<&String>) -> Result<f32, CliError> {
    let Some(value) = value else {
        return Err(CliError::Usage(usage()));
    };
    let v = value
        .parse::<f32>()
        .map_err(|_| CliError::Usage(usage()))?;
    if !(v.is_finite() && v > 0.0) {
        return Err(CliError::Usage(usage()));
    }
    Ok(v)
}

fn parse_args(argv: &[String]) -> Result<Args, CliError> {
    let mut args = Args {
        command: Command::Measure,
        render_format: RenderFormat::Png,
        render_scale: 1.0,
        device_pixel_ratio: 1.0,
        ..Default::default()
    };

    let mut it = argv.iter().skip(1);
    while let Some(a) = it.next() {
        match a.as_str() {
            "--help" | "-h" => return Err(CliError::Usage(usage())),
            "measure" => args.command = Command::Measure,
            "normalize" => args.command = Command::Normalize,
            "render" => args.command = Command::Render,
            "--pretty" => args.pretty = true,
            "--verbose" | "-v" => args.verbose = true,
            "--embed-fonts" => args.embed_fonts = true,
            "--format" => {
                let Some(fmt) = it.next() else {
                    return Err(CliError::Usage(usage()));
                };
                args.render_format = fmt
                    .parse::<RenderFormat>()
                    .map_err(|_| CliError::Usage(usage()))?;
            }
            "--scale" => args.render_scale = parse_positive(it.next())?,
            "--device-pixel-ratio" => args.device_pixel_ratio = parse_positive(it.next())?,
            "--background" => {
                let Some(bg) = it.next() else {
                    return Err(CliError::Usage(usage()));
                };
                if !bg.trim().is_empty() {
                    args.background = Some(bg.trim().to_string());
                }
            }
            "--out" => {
                let Some(out) = it.next() else {
                    return Err(CliError::Usage(usage()));
                };
                args.out = Some(out.clone());
            }
            "--" => {
                if let Some(rest) = it.next() {
                    if args.input.is_some() {
                        return Err(CliError::Usage(usage()));
                    }
                    args.input = Some(rest.clone());
                }
                if it.next().is_some() {
                    return Err(CliError::Usage(usage()));
                }
            }
            other if other.starts_with('-') && other != "-" => {
                return Err(CliError::Usage(usage()));
            }
            path => {
                if args.input.is_some() {
                    return Err(CliError::Usage(usage()));
                }
                args.input = Some(path.to_string());
            }
        }
    }

    Ok(args)
}

fn read_input(input: Option<&str>) -> Result<String, CliError> {
    match input {
        None | Some("-") => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            Ok(buf)
        }
        Some(path) => Ok(std::fs::read_to_string(path)?),
    }
}

fn write_json(value: &impl Serialize, pretty: bool) -> Result<(), CliError> {
    if pretty {
        serde_json::to_writer_pretty(std::io::stdout().lock(), value)?;
    } else {
        serde_json::to_writer(std::io::stdout().lock(), value)?;
    }
    println!();
    Ok(())
}

fn write_text(text: &str, out: Option<&str>) -> Result<(), CliError> {
    match out {
        None => {
            print!("{text}");
            Ok(())
        }
        Some(path) => {
            std::fs::write(path, text)?;
            Ok(())
        }
    }
}

fn default_raster_out_path(input: Option<&str>, ext: &str) -> std::path::PathBuf {
    match input {
        Some(path) if path != "-" => std::path::PathBuf::from(path).with_extension(ext),
        _ => std::path::PathBuf::from(format!("out.{ext}")),
    }
}

fn init_logging(verbose: bool) {
    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();
}

fn run(args: Args) -> Result<(), CliError> {
    let text = read_input(args.input.as_deref())?;
    let db = system_fontdb();
    let mut pipeline = headless_pipeline(db.clone());

    match args.command {
        Command::Measure => {
            let m = pipeline.measure(&text)?;
            write_json(&m, args.pretty)
        }
        Command::Normalize => {
            pipeline.load(&text)?;
            let svg = pipeline.serialize(args.embed_fonts)?;
            write_text(&svg, args.out.as_deref())
        }
        Command::Render => {
            pipeline.load(&text)?;
            let options = RasterOptions {
                scale: args.render_scale,
                device_pixel_ratio: args.device_pixel_ratio,
                background: args.background.clone(),
                ..Default::default()
            };
            let rasterizer = Rasterizer::new(db);
            let bytes = match args.render_format {
                RenderFormat::Png => rasterizer.png(&mut pipeline, &options)?,
                RenderFormat::Jpeg => rasterizer.jpeg(&mut pipeline, &options)?,
            };
            let out = args.out.map(std::path::PathBuf::from).unwrap_or_else(|| {
                default_raster_out_path(args.input.as_deref(), args.render_format.extension())
            });
            std::fs::write(&out, bytes)?;
            tracing::debug!(path = %out.display(), "wrote raster output");
            Ok(())
        }
    }
}

fn main() {
    let argv = std::env::args().collect::<Vec<_>>();
    let args = match parse_args(&argv) {
        Ok(args) => args,
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(2);
        }
    };

    init_logging(args.verbose);

    if let Err(err) = run(args) {
        eprintln!("{err}");
        std::process::exit(1);
    }
}
