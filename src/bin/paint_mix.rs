use anyhow::{Context, Result, bail};
use clap::{Parser, ValueEnum};
use paint_mix_wasm::{
    DeviceColor, Mixer, MixerConfig, Palette, TintOrder, VariantBundle, dominant_colors,
    sample_pixel,
};
use serde::Serialize;
use std::fs;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Paint mixing recipes (lighter, actual, darker) for target colours.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Target colours: `rgba(r, g, b, a)`, `rgb(r, g, b)` or `#rrggbb`
    colours: Vec<String>,

    /// Image to pick target colours from
    #[arg(short, long)]
    image: Option<PathBuf>,

    /// Pixel to sample from --image, as `x,y`
    #[arg(long, value_parser = parse_point, requires = "image")]
    at: Option<(u32, u32)>,

    /// Mix the N dominant colours of --image
    #[arg(short = 'k', long, requires = "image")]
    dominant: Option<usize>,

    /// Longest side to shrink --image to before clustering
    #[arg(long, default_value_t = 128)]
    downscale: u32,

    /// JSON paint catalog replacing the built-in set
    #[arg(long)]
    catalog: Option<PathBuf>,

    /// JSON solver settings
    #[arg(long)]
    config: Option<PathBuf>,

    /// Most paints per mix
    #[arg(short = 'm', long)]
    max_paints: Option<usize>,

    /// Lightness shift of the lighter and darker mixes, 0 to 1
    #[arg(short = 'f', long)]
    lightness_factor: Option<f64>,

    /// How the small tint slots of shading mixes are chosen
    #[arg(long, value_enum)]
    tint_order: Option<TintArg>,

    /// Print JSON instead of recipes
    #[arg(long)]
    json: bool,

    /// List the catalog and exit
    #[arg(long)]
    list_paints: bool,

    /// Log solver progress to stderr
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum TintArg {
    Catalog,
    Nearest,
}

impl From<TintArg> for TintOrder {
    fn from(arg: TintArg) -> Self {
        match arg {
            TintArg::Catalog => TintOrder::Catalog,
            TintArg::Nearest => TintOrder::Nearest,
        }
    }
}

fn parse_point(s: &str) -> Result<(u32, u32), String> {
    let (x, y) = s
        .split_once(',')
        .ok_or_else(|| format!("expected x,y, got {s:?}"))?;
    let x = x.trim().parse().map_err(|e| format!("bad x: {e}"))?;
    let y = y.trim().parse().map_err(|e| format!("bad y: {e}"))?;
    Ok((x, y))
}

#[derive(Serialize)]
struct Report<'p> {
    target: DeviceColor,
    #[serde(skip_serializing_if = "Option::is_none")]
    share: Option<f64>,
    #[serde(flatten)]
    variants: VariantBundle<'p>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let palette = match &args.catalog {
        Some(path) => {
            let json = fs::read_to_string(path)
                .with_context(|| format!("reading catalog {}", path.display()))?;
            Palette::from_json(&json).context("invalid paint catalog")?
        }
        None => Palette::standard().context("built-in catalog")?,
    };

    if args.list_paints {
        for paint in palette.paints() {
            println!(
                "{:<16} {}  lightfastness {}",
                paint.name(),
                paint.color(),
                paint.lightfastness()
            );
        }
        return Ok(());
    }

    let mut config = match &args.config {
        Some(path) => {
            let json = fs::read_to_string(path)
                .with_context(|| format!("reading config {}", path.display()))?;
            MixerConfig::from_json(&json).context("invalid solver config")?
        }
        None => MixerConfig::default(),
    };
    if let Some(max_paints) = args.max_paints {
        config.max_paints = max_paints;
    }
    if let Some(factor) = args.lightness_factor {
        config.lightness_factor = factor;
    }
    if let Some(order) = args.tint_order {
        config.tint_order = order.into();
    }
    let mixer = Mixer::with_config(&palette, config).context("invalid solver settings")?;

    let targets = collect_targets(&args)?;
    if targets.is_empty() {
        bail!("no target colours given (pass colours, or --image with --at or --dominant)");
    }

    let reports: Vec<Report> = targets
        .into_iter()
        .map(|(target, share)| Report {
            target,
            share,
            variants: mixer.generate_variants(target),
        })
        .collect();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&reports)?);
    } else {
        for report in &reports {
            print_report(report);
        }
    }

    Ok(())
}

fn collect_targets(args: &Args) -> Result<Vec<(DeviceColor, Option<f64>)>> {
    let mut targets = Vec::new();
    for colour in &args.colours {
        let target: DeviceColor = colour
            .parse()
            .with_context(|| format!("invalid colour {colour:?}"))?;
        targets.push((target, None));
    }

    if let Some(path) = &args.image {
        let bytes = fs::read(path).with_context(|| format!("reading {}", path.display()))?;
        if let Some((x, y)) = args.at {
            let target = sample_pixel(&bytes, x, y).context("sampling image")?;
            targets.push((target, None));
        }
        if let Some(n_colors) = args.dominant {
            let clusters = dominant_colors(&bytes, n_colors, Some(args.downscale))
                .context("extracting dominant colours")?;
            targets.extend(
                clusters
                    .into_iter()
                    .map(|cluster| (cluster.color, Some(cluster.share))),
            );
        }
    }

    Ok(targets)
}

fn print_report(report: &Report<'_>) {
    match report.share {
        Some(share) => println!("{} ({:.0}% of image)", report.target, share * 100.0),
        None => println!("{}", report.target),
    }
    let variants = &report.variants;
    for (label, mix) in [
        ("lighter", &variants.lighter_mix),
        ("actual", &variants.actual_mix),
        ("darker", &variants.darker_mix),
    ] {
        println!(
            "  {label:<8} {}  {}  [{:?}, lightfastness {}]",
            mix.mixed_color, mix.ratios, mix.method, mix.lightfastness
        );
    }
}
