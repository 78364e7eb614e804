//! BAA'AM statistics report CLI

use baam_core::processors::ProcessedStats;
use baam_core::stage::build_region;
use baam_core::{
    CompositeRasterizer, Datasets, FilterKey, FilterOptions, FilterSelection, InclusionToggles,
    RegionContent, RegionId, Registry, ReportConfig, ReportExporter, Stage, SvgConverter,
    VectorConverter,
};
use baam_core::rasterize::RegionRasterizer;
use clap::{Args, Parser, Subcommand};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "baam")]
#[command(about = "Statistics report generator for the BAA'AM fisheries datasets.")]
#[command(version = concat!("v", env!("CARGO_PKG_VERSION")))]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file (TOML). Can set data_dir, output_dir and a [report] table.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// More log output (-v info, -vv debug). RUST_LOG takes precedence.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Debug, Default, Deserialize)]
struct CliConfig {
    data_dir: Option<PathBuf>,
    output_dir: Option<PathBuf>,
    #[serde(default)]
    report: ReportConfig,
}

impl CliConfig {
    fn load(path: Option<&Path>) -> Result<Self, Box<dyn std::error::Error>> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let s = std::fs::read_to_string(path)
            .map_err(|e| format!("Cannot read config {}: {}", path.display(), e))?;
        let cfg: CliConfig = toml::from_str(&s)
            .map_err(|e| format!("Invalid config {}: {}", path.display(), e))?;
        cfg.report.validate()?;
        Ok(cfg)
    }

    fn data_dir(&self, arg: Option<PathBuf>) -> PathBuf {
        arg.or_else(|| self.data_dir.clone())
            .unwrap_or_else(|| PathBuf::from("."))
    }
}

/// Production filters (repeat a flag or separate values with commas)
#[derive(Args, Debug, Default)]
struct FilterArgs {
    /// Entities (ENTIDAD)
    #[arg(long, value_delimiter = ',')]
    entidad: Vec<String>,
    /// Species (NOMBRE_PRINCIPAL_ESPECIE)
    #[arg(long, value_delimiter = ',')]
    especie: Vec<String>,
    /// Years (ANO)
    #[arg(long, value_delimiter = ',')]
    ano: Vec<String>,
    /// Origins: Captura, Acuacultura
    #[arg(long, value_delimiter = ',')]
    origen: Vec<String>,
}

impl FilterArgs {
    fn selection(&self) -> FilterSelection {
        let mut selection = FilterSelection::default();
        for (key, values) in [
            (FilterKey::Entidades, &self.entidad),
            (FilterKey::Especies, &self.especie),
            (FilterKey::Anos, &self.ano),
            (FilterKey::Origenes, &self.origen),
        ] {
            for value in values {
                selection.toggle(key, value, true);
            }
        }
        selection
    }
}

/// Region selection on top of the default toggles
#[derive(Args, Debug, Default)]
struct RegionArgs {
    /// Export only these regions (slugs, see `baam regions`)
    #[arg(long, value_delimiter = ',')]
    only: Vec<String>,
    /// Leave these regions out
    #[arg(long, value_delimiter = ',')]
    exclude: Vec<String>,
    /// Also export the map regions
    #[arg(long)]
    include_maps: bool,
}

impl RegionArgs {
    fn toggles(&self) -> Result<InclusionToggles, Box<dyn std::error::Error>> {
        let mut toggles = if self.only.is_empty() {
            InclusionToggles::default()
        } else {
            InclusionToggles::none()
        };
        for slug in &self.only {
            toggles.set_region(parse_region(slug)?, true);
        }
        if self.include_maps {
            toggles.set_region(RegionId::MapUnid, true);
            toggles.set_region(RegionId::KeplerMap, true);
        }
        for slug in &self.exclude {
            toggles.set_region(parse_region(slug)?, false);
        }
        Ok(toggles)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Export the enabled chart regions as a PDF report
    Report {
        /// Directory with the dataset JSON files
        #[arg(long)]
        data_dir: Option<PathBuf>,
        /// Output directory, or a path ending in .pdf
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Directory with map images (default: data directory)
        #[arg(long)]
        assets_dir: Option<PathBuf>,
        #[command(flatten)]
        regions: RegionArgs,
        #[command(flatten)]
        filters: FilterArgs,
        /// Print the export summary as JSON
        #[arg(long)]
        json: bool,
    },
    /// List exportable regions and whether they would be included
    Regions {
        #[command(flatten)]
        regions: RegionArgs,
        #[arg(long)]
        json: bool,
    },
    /// Render a single region to SVG or PNG
    Chart {
        /// Region slug, e.g. prod-anual
        region: String,
        /// Output file (.svg or .png)
        #[arg(short, long)]
        output: PathBuf,
        #[arg(long)]
        data_dir: Option<PathBuf>,
        #[command(flatten)]
        filters: FilterArgs,
    },
    /// Print headline figures and filter options
    Stats {
        #[arg(long)]
        data_dir: Option<PathBuf>,
        #[command(flatten)]
        filters: FilterArgs,
        /// Include every processed series
        #[arg(long)]
        json: bool,
    },
}

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).try_init();
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    let config = CliConfig::load(cli.config.as_deref())?;
    if let Some(path) = &cli.config {
        log::debug!("loaded config {}", path.display());
    }

    match cli.command {
        Commands::Report {
            data_dir,
            output,
            assets_dir,
            regions,
            filters,
            json,
        } => {
            let data_dir = config.data_dir(data_dir);
            let output = output
                .or_else(|| config.output_dir.clone())
                .unwrap_or_else(|| PathBuf::from("."));
            cmd_report(
                &config.report,
                &data_dir,
                assets_dir.as_deref(),
                &output,
                &regions.toggles()?,
                &filters.selection(),
                json,
            )
        }
        Commands::Regions { regions, json } => cmd_regions(&regions.toggles()?, json),
        Commands::Chart {
            region,
            output,
            data_dir,
            filters,
        } => cmd_chart(
            &config.report,
            &config.data_dir(data_dir),
            &region,
            &filters.selection(),
            &output,
        ),
        Commands::Stats {
            data_dir,
            filters,
            json,
        } => cmd_stats(&config.data_dir(data_dir), &filters.selection(), json),
    }
}

fn parse_region(slug: &str) -> Result<RegionId, Box<dyn std::error::Error>> {
    RegionId::from_slug(slug).ok_or_else(|| {
        let valid: Vec<&str> = RegionId::ALL.iter().map(|r| r.slug()).collect();
        format!("Unknown region: {}. Use one of: {}", slug, valid.join(", ")).into()
    })
}

fn is_pdf_path(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("pdf"))
}

fn cmd_report(
    report: &ReportConfig,
    data_dir: &Path,
    assets_dir: Option<&Path>,
    output: &Path,
    toggles: &InclusionToggles,
    filters: &FilterSelection,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    log::info!("building report from {}", data_dir.display());
    let data = Datasets::load_from_dir(data_dir)?;
    let stage = Stage::build(
        &data,
        filters,
        toggles,
        report,
        Some(assets_dir.unwrap_or(data_dir)),
    )?;
    let exporter = ReportExporter::new(report.clone());
    let registry = Registry::standard();
    let summary = if is_pdf_path(output) {
        exporter.export_to_file(&registry, toggles, &stage, output)?
    } else {
        exporter.export_to_dir(&registry, toggles, &stage, output)?
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }
    if let Some(path) = &summary.output {
        println!("Exported to {}", path.display());
    }
    println!(
        "{} page(s), {} chart(s)",
        summary.pages,
        summary.entries.len()
    );
    for skipped in &summary.skipped {
        println!("  skipped {}: {}", skipped.region_id, skipped.reason);
    }
    Ok(())
}

#[derive(Debug, Serialize)]
struct RegionListing {
    slug: &'static str,
    region_id: String,
    caption: String,
    enabled: bool,
}

fn cmd_regions(toggles: &InclusionToggles, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let listing: Vec<RegionListing> = Registry::standard()
        .descriptors(toggles)
        .into_iter()
        .zip(RegionId::ALL)
        .map(|(d, region)| RegionListing {
            slug: region.slug(),
            region_id: d.region_id,
            caption: d.caption,
            enabled: d.enabled,
        })
        .collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&listing)?);
    } else {
        for entry in &listing {
            println!(
                "[{}] {:<14} {}",
                if entry.enabled { "x" } else { " " },
                entry.slug,
                entry.caption
            );
        }
        println!("Select all: {:?}", toggles.master_state());
    }
    Ok(())
}

fn cmd_chart(
    report: &ReportConfig,
    data_dir: &Path,
    slug: &str,
    filters: &FilterSelection,
    output: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    let region_id = parse_region(slug)?;
    let data = Datasets::load_from_dir(data_dir)?;
    let stats = ProcessedStats::compute(&data, filters);
    let region = build_region(region_id, &stats, report.chart, Some(data_dir))?;

    let ext = output
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase());
    let bytes = match (ext.as_deref(), &region.content) {
        (Some("svg"), RegionContent::Vector(chart)) => chart.markup.clone().into_bytes(),
        (Some("svg"), RegionContent::Composite(_)) => {
            return Err(format!("{} has no vector chart; write a .png instead", slug).into())
        }
        (Some("png"), RegionContent::Vector(chart)) => SvgConverter::new().convert(chart)?.data,
        (Some("png"), RegionContent::Composite(composite)) => {
            CompositeRasterizer::new(report.capture.clone())
                .rasterize(composite)?
                .data
        }
        _ => return Err("Output must end in .svg or .png".into()),
    };
    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(output, bytes)?;
    println!("Wrote {} to {}", region_id.caption(), output.display());
    Ok(())
}

#[derive(Debug, Serialize)]
struct StatsOutput {
    quick: baam_core::QuickStats,
    options: FilterOptions,
    filters: FilterSelection,
    #[serde(skip_serializing_if = "Option::is_none")]
    series: Option<ProcessedStats>,
}

fn cmd_stats(data_dir: &Path, filters: &FilterSelection, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let data = Datasets::load_from_dir(data_dir)?;
    let quick = baam_core::processors::quick_stats(&data);

    if json {
        let out = StatsOutput {
            quick,
            options: FilterOptions::from_records(&data.production),
            filters: filters.clone(),
            series: Some(ProcessedStats::compute(&data, filters)),
        };
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    println!("Producción total: {}", quick.produccion);
    println!("Valor total:      {}", quick.valor);
    println!("Pescadores:       {}", quick.pescadores);
    println!("Especies:         {}", quick.especies);
    let options = FilterOptions::from_records(&data.production);
    println!(
        "\nFiltros disponibles: {} entidades, {} especies, {} años, {} orígenes",
        options.entidades.len(),
        options.especies.len(),
        options.anos.len(),
        options.origenes.len()
    );
    let active: Vec<String> = [
        ("entidades", FilterKey::Entidades),
        ("especies", FilterKey::Especies),
        ("años", FilterKey::Anos),
        ("orígenes", FilterKey::Origenes),
    ]
    .into_iter()
    .filter(|(_, key)| !filters.is_all(*key))
    .map(|(name, key)| format!("{}={}", name, filters.values(key).join(", ")))
    .collect();
    if !active.is_empty() {
        println!("Filtro: {}", active.join("; "));
    }
    let stats = ProcessedStats::compute(&data, filters);
    for row in &stats.production_by_year {
        println!(
            "  {}  captura {}  acuacultura {}",
            row.year,
            baam_core::numfmt::format_decimal(row.captura),
            baam_core::numfmt::format_decimal(row.acuacultura)
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_datasets() -> tempfile::TempDir {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(
            tmp.path().join("data.json"),
            r#"[
                {"ENTIDAD":"SONORA","NOMBRE_PRINCIPAL_ESPECIE":"CAMARON","ANO":2020,"ORIGEN":"CAPTURA","PESO_DESEMBARCADO_KG":1000,"VALOR_MEXICAN_PESOS":50000},
                {"ENTIDAD":"SINALOA","NOMBRE_PRINCIPAL_ESPECIE":"TILAPIA","ANO":2021,"ORIGEN":"ACUACULTURA","PESO_DESEMBARCADO_KG":700,"VALOR_MEXICAN_PESOS":20000}
            ]"#,
        )
        .unwrap();
        std::fs::write(
            tmp.path().join("Poblacion_pesquera_2023.json"),
            r#"[{"ENTIDAD":"SONORA","TOTAL DE PESCADORES":"12,500"}]"#,
        )
        .unwrap();
        tmp
    }

    #[test]
    fn region_args_resolve_slugs() {
        let args = RegionArgs {
            only: vec!["prod-anual".into(), "genero".into()],
            exclude: vec!["genero".into()],
            include_maps: false,
        };
        let toggles = args.toggles().unwrap();
        assert!(toggles.is_enabled("offscreen_chartProdAnual"));
        assert!(!toggles.is_enabled("offscreen_chartGenero"));
        assert!(!toggles.is_enabled("offscreen_chartPescadores"));

        let bad = RegionArgs {
            only: vec!["nope".into()],
            ..Default::default()
        };
        assert!(bad.toggles().is_err());
    }

    #[test]
    fn filter_args_drop_wildcard() {
        let args = FilterArgs {
            ano: vec!["2020".into()],
            ..Default::default()
        };
        let selection = args.selection();
        assert_eq!(selection.anos, vec!["2020".to_string()]);
        assert!(selection.is_all(FilterKey::Entidades));
    }

    #[test]
    fn report_writes_pdf_into_directory() {
        let data = write_datasets();
        let out = tempfile::tempdir().unwrap();
        let toggles = RegionArgs {
            only: vec!["pescadores".into(), "map-unid".into()],
            ..Default::default()
        }
        .toggles()
        .unwrap();
        let result = cmd_report(
            &ReportConfig::default(),
            data.path(),
            None,
            out.path(),
            &toggles,
            &FilterSelection::default(),
            false,
        );
        assert!(result.is_ok(), "report failed: {:?}", result.err());
        assert!(out.path().join("Reporte_BAAM.pdf").exists());
    }

    #[test]
    fn chart_rejects_svg_for_composite_region() {
        let data = tempfile::tempdir().unwrap();
        let out = data.path().join("map.svg");
        let result = cmd_chart(
            &ReportConfig::default(),
            data.path(),
            "map-unid",
            &FilterSelection::default(),
            &out,
        );
        assert!(result.is_err());
        assert!(!out.exists());
    }

    #[test]
    fn config_file_sets_report_options() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("baam.toml");
        std::fs::write(
            &path,
            "data_dir = \"datos\"\n[report]\nfilename = \"salida.pdf\"\n[report.page]\nwidth = 612.0\n",
        )
        .unwrap();
        let cfg = CliConfig::load(Some(&path)).unwrap();
        assert_eq!(cfg.data_dir(None), PathBuf::from("datos"));
        assert_eq!(cfg.data_dir(Some("x".into())), PathBuf::from("x"));
        assert_eq!(cfg.report.filename, "salida.pdf");
        assert_eq!(cfg.report.page.width, 612.0);
        assert_eq!(cfg.report.page.height, 841.89);
    }
}
