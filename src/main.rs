use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Parser, ValueEnum};
use tracing::info;

use ct_resample::{
    CtWindow, DEFAULT_SPLINE_ORDER, Orientation, PaddingMode, Resampler, SortBy, VolumeLoader,
};

#[derive(Parser)]
#[command(name = "ct-resample")]
#[command(about = "Resample a DICOM CT series onto a fixed voxel grid")]
struct Cli {
    /// Directory containing the .dcm slices of one series
    dicom_dir: PathBuf,

    /// Output shape as depth height width
    #[arg(long, num_args = 3, value_names = ["D", "H", "W"], required = true)]
    shape: Vec<usize>,

    /// Target spacing in mm as z y x; resize straight to the shape when omitted
    #[arg(long, num_args = 3, value_names = ["Z", "Y", "X"])]
    spacing: Option<Vec<f32>>,

    /// Spline order, 0 (nearest) to 5
    #[arg(long, default_value_t = DEFAULT_SPLINE_ORDER)]
    order: u8,

    /// How to fill voxels added by padding
    #[arg(long, value_enum, default_value_t = Padding::Edge)]
    padding: Padding,

    /// Fill value in HU for constant padding
    #[arg(long, default_value_t = -1024.0, allow_hyphen_values = true)]
    constant: f32,

    /// Slice ordering key
    #[arg(long, value_enum, default_value_t = SliceOrder::Position)]
    sort_by: SliceOrder,

    /// Write the central slice of the resampled volume as PNG
    #[arg(long)]
    preview: Option<PathBuf>,

    /// Axis of the preview slice
    #[arg(long, value_enum, default_value_t = Axis::Axial)]
    axis: Axis,
}

#[derive(Clone, Copy, ValueEnum)]
enum Padding {
    Edge,
    Constant,
    Reflect,
    Symmetric,
    Wrap,
}

#[derive(Clone, Copy, ValueEnum)]
enum SliceOrder {
    Position,
    Table,
    Instance,
    None,
}

#[derive(Clone, Copy, ValueEnum)]
enum Axis {
    Axial,
    Coronal,
    Sagittal,
}

impl Cli {
    fn padding_mode(&self) -> PaddingMode {
        match self.padding {
            Padding::Edge => PaddingMode::Edge,
            Padding::Constant => PaddingMode::Constant(self.constant),
            Padding::Reflect => PaddingMode::Reflect,
            Padding::Symmetric => PaddingMode::Symmetric,
            Padding::Wrap => PaddingMode::Wrap,
        }
    }

    fn sort_by(&self) -> SortBy {
        match self.sort_by {
            SliceOrder::Position => SortBy::ImagePositionPatient,
            SliceOrder::Table => SortBy::TablePosition,
            SliceOrder::Instance => SortBy::InstanceNumber,
            SliceOrder::None => SortBy::None,
        }
    }

    fn orientation(&self) -> Orientation {
        match self.axis {
            Axis::Axial => Orientation::Axial,
            Axis::Coronal => Orientation::Coronal,
            Axis::Sagittal => Orientation::Sagittal,
        }
    }
}

fn triple<T: Copy>(values: &[T], name: &str) -> Result<(T, T, T)> {
    match values {
        [a, b, c] => Ok((*a, *b, *c)),
        _ => bail!("--{name} takes exactly three values"),
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let shape = triple(&cli.shape, "shape")?;
    let resampler = Resampler::new(cli.order, cli.padding_mode())?;

    let volume = VolumeLoader::load_from_directory(&cli.dicom_dir, cli.sort_by())
        .with_context(|| format!("loading DICOM series from {}", cli.dicom_dir.display()))?;
    info!(dim = ?volume.dim(), spacing = ?volume.spacing(), "loaded volume");

    let resampled = match &cli.spacing {
        Some(spacing) => {
            volume.resample_to_spacing(&resampler, triple(spacing, "spacing")?, shape)?
        }
        None => volume.resize(&resampler, shape)?,
    };
    info!(dim = ?resampled.dim(), spacing = ?resampled.spacing(), "resampled volume");

    if let Some(path) = &cli.preview {
        let orientation = cli.orientation();
        let index = match orientation {
            Orientation::Axial => shape.0 / 2,
            Orientation::Coronal => shape.1 / 2,
            Orientation::Sagittal => shape.2 / 2,
        };
        let image = resampled
            .get_image_from_axis(index, orientation, &CtWindow::lung())
            .context("rendering preview slice")?;
        image
            .save(path)
            .with_context(|| format!("writing preview to {}", path.display()))?;
        info!(path = %path.display(), "wrote preview");
    }

    Ok(())
}
