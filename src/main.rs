//! mpr-sync - inspect, convert and click through linked slice views

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand, ValueEnum};
use log::info;
use std::path::PathBuf;

use mpr_sync::{
    ClickEvent, ContentBox, LandmarkSet, SortBy, SourceType, ViewId, ViewerSession, Volume,
    VolumeLoader,
    landmarks::DEFAULT_RADIUS_MM,
    logging::init_logging,
    volume_loader::DEFAULT_CONTRAST_FACTOR,
};

#[derive(Parser)]
#[command(name = "mpr-sync")]
#[command(author, version, about = "Linked axial/coronal/sagittal slice views over 8-bit volumes")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level: trace, debug, info, warn, error, off
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Write rotating log files to this directory instead of stderr
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show dimensions, spacing and origin of a preview volume
    Info {
        /// Meta JSON (`dims`, `spacing`, `origin`)
        meta: PathBuf,
        /// Raw 8-bit voxel buffer
        bin: PathBuf,
        #[arg(short, long, default_value = "nifti")]
        source_type: SourceType,
    },

    /// Convert a DICOM series or a NIfTI file into a meta JSON + raw buffer pair
    Convert {
        /// Directory containing .dcm files
        #[arg(long, required_unless_present = "nifti", conflicts_with = "nifti")]
        dicom: Option<PathBuf>,
        /// NIfTI file (.nii or .nii.gz)
        #[arg(long)]
        nifti: Option<PathBuf>,
        meta: PathBuf,
        bin: PathBuf,
        #[arg(long, value_enum, default_value_t = SortArg::ImagePosition)]
        sort_by: SortArg,
        /// NIfTI intensities are multiplied by this before clipping to 0..=255
        #[arg(long, default_value_t = DEFAULT_CONTRAST_FACTOR)]
        contrast_factor: f32,
        /// Also write a `_preview` pair keeping every n-th voxel on each axis
        #[arg(long, default_value_t = 1)]
        preview_step: usize,
    },

    /// Convert a NIfTI segmentation (label 1) into a 0/255 mask pair
    Segmentation {
        nifti: PathBuf,
        meta: PathBuf,
        bin: PathBuf,
        /// Meta JSON of the base volume; the mask is resampled onto its grid
        #[arg(long)]
        reference: Option<PathBuf>,
        #[arg(long, default_value_t = 1)]
        preview_step: usize,
    },

    /// Render a directory of markups JSON files as spheres on the base grid
    Landmarks {
        /// Directory containing markups .json files
        markups_dir: PathBuf,
        /// Meta JSON of the base volume
        reference: PathBuf,
        meta: PathBuf,
        bin: PathBuf,
        #[arg(long, default_value_t = DEFAULT_RADIUS_MM)]
        radius_mm: f64,
        #[arg(long, default_value_t = 1)]
        preview_step: usize,
    },

    /// Click into one slice view and print the synchronised view state as JSON
    Click {
        meta: PathBuf,
        bin: PathBuf,
        #[arg(short, long, default_value = "nifti")]
        source_type: SourceType,
        /// viewer-axial, viewer-coronal or viewer-sagittal
        #[arg(long)]
        view: ViewId,
        /// Pixel offsets from the content box's top-left corner; may lie outside it
        #[arg(short, allow_hyphen_values = true)]
        x: f64,
        #[arg(short, allow_hyphen_values = true)]
        y: f64,
        /// Content width of every view in pixels
        #[arg(long, default_value_t = 256.0)]
        width: f64,
        /// Content height of every view in pixels
        #[arg(long, default_value_t = 256.0)]
        height: f64,
        /// Overlay sampled in the readout, as `META BIN`; repeatable
        #[arg(long, num_args = 2, value_names = ["META", "BIN"])]
        overlay: Vec<PathBuf>,
    },

    /// Write the current slice of every 2D view as PNG
    Slices {
        meta: PathBuf,
        bin: PathBuf,
        #[arg(short, long, default_value = "nifti")]
        source_type: SourceType,
        #[arg(short, long, default_value = "./")]
        out_dir: PathBuf,
        /// Synchronise all views on this voxel first, as `i,j,k`
        #[arg(long, value_delimiter = ',', num_args = 3)]
        at: Option<Vec<usize>>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum SortArg {
    ImagePosition,
    TablePosition,
    InstanceNumber,
    None,
}

impl From<SortArg> for SortBy {
    fn from(arg: SortArg) -> Self {
        match arg {
            SortArg::ImagePosition => SortBy::ImagePositionPatient,
            SortArg::TablePosition => SortBy::TablePosition,
            SortArg::InstanceNumber => SortBy::InstanceNumber,
            SortArg::None => SortBy::None,
        }
    }
}

async fn load_volume(meta: PathBuf, bin: PathBuf, source_type: SourceType) -> Result<Volume> {
    let label = format!("{} + {}", meta.display(), bin.display());
    tokio::task::spawn_blocking(move || VolumeLoader::load_from_files(&meta, &bin, source_type))
        .await
        .context("volume loading task panicked")?
        .with_context(|| format!("Failed to load volume from {label}"))
}

// overlays are named after their buffer file
async fn load_overlays(
    session: &mut ViewerSession,
    pairs: Vec<PathBuf>,
    source_type: SourceType,
) -> Result<()> {
    for pair in pairs.chunks_exact(2) {
        let [meta, bin] = pair else { continue };
        let name = bin
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("overlay")
            .to_string();
        let overlay = load_volume(meta.clone(), bin.clone(), source_type).await?;
        session
            .add_overlay(name.clone(), overlay)
            .with_context(|| format!("Overlay {name} does not fit the base volume"))?;
    }
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let _logger = init_logging(&cli.log_level, cli.log_dir.as_deref())?;

    match cli.command {
        Commands::Info {
            meta,
            bin,
            source_type,
        } => {
            let volume = load_volume(meta, bin, source_type).await?;
            let [nx, ny, nz] = volume.dimensions();
            println!("source:     {}", volume.source_type());
            println!("dimensions: {nx} x {ny} x {nz}");
            println!("spacing:    {:?}", volume.spacing());
            println!("origin:     {:?}", volume.origin());
            println!("voxels:     {}", volume.len());
        }
        Commands::Convert {
            dicom,
            nifti,
            meta,
            bin,
            sort_by,
            contrast_factor,
            preview_step,
        } => {
            let (input, volume) = match (dicom, nifti) {
                (_, Some(path)) => {
                    let file = path.clone();
                    let volume = tokio::task::spawn_blocking(move || {
                        VolumeLoader::load_from_nifti(&file, contrast_factor)
                    })
                    .await
                    .context("NIfTI loading task panicked")?;
                    (path, volume)
                }
                (Some(path), None) => {
                    let dir = path.clone();
                    let volume = tokio::task::spawn_blocking(move || {
                        VolumeLoader::load_from_directory(&dir, sort_by.into())
                    })
                    .await
                    .context("DICOM loading task panicked")?;
                    (path, volume)
                }
                (None, None) => bail!("one of --dicom or --nifti is required"),
            };
            let volume =
                volume.with_context(|| format!("Failed to load volume from {}", input.display()))?;
            VolumeLoader::write_with_preview(&volume, &meta, &bin, preview_step)?;
            info!("event=convert status=ok dims={:?}", volume.dimensions());
        }
        Commands::Segmentation {
            nifti,
            meta,
            bin,
            reference,
            preview_step,
        } => {
            let reference = reference.map(|path| VolumeLoader::read_meta(path)).transpose()?;
            let mask = VolumeLoader::load_segmentation_from_nifti(&nifti, reference.as_ref())
                .with_context(|| format!("Failed to load segmentation {}", nifti.display()))?;
            VolumeLoader::write_with_preview(&mask, &meta, &bin, preview_step)?;
            info!("event=segmentation status=ok dims={:?}", mask.dimensions());
        }
        Commands::Landmarks {
            markups_dir,
            reference,
            meta,
            bin,
            radius_mm,
            preview_step,
        } => {
            let reference = VolumeLoader::read_meta(&reference)
                .with_context(|| format!("Failed to read reference {}", reference.display()))?;
            let landmarks = LandmarkSet::from_directory(&markups_dir)?;
            let mask = landmarks.to_mask(&reference, radius_mm)?;
            VolumeLoader::write_with_preview(&mask, &meta, &bin, preview_step)?;
            info!(
                "event=landmarks status=ok landmarks={} dims={:?}",
                landmarks.len(),
                mask.dimensions()
            );
        }
        Commands::Click {
            meta,
            bin,
            source_type,
            view,
            x,
            y,
            width,
            height,
            overlay,
        } => {
            let volume = load_volume(meta, bin, source_type).await?;
            let mut session = ViewerSession::new(volume);
            load_overlays(&mut session, overlay, source_type).await?;
            session.initialize_all(ContentBox::new(width, height));
            let event = ClickEvent {
                view_id: view.to_string(),
                pixel_x: x,
                pixel_y: y,
                content_width: width,
                content_height: height,
            };
            match session.handle_click(&event)? {
                Some(outcome) => println!("{}", serde_json::to_string_pretty(&outcome)?),
                None => bail!("view {view} has no slice state"),
            }
        }
        Commands::Slices {
            meta,
            bin,
            source_type,
            out_dir,
            at,
        } => {
            let volume = load_volume(meta, bin, source_type).await?;
            let mut session = ViewerSession::new(volume);
            session.initialize_all(ContentBox::new(256.0, 256.0));
            if let Some(at) = at {
                let [i, j, k] = at.as_slice() else {
                    bail!("--at expects three indices, got {}", at.len());
                };
                // no slice view is the origin, so every view moves
                session.broadcast([*i, *j, *k], ViewId::Volume3d);
            }

            std::fs::create_dir_all(&out_dir)
                .with_context(|| format!("Failed to create {}", out_dir.display()))?;
            let views: Vec<ViewId> = session.views().map(|(view, _)| view).collect();
            for view in views {
                let Some(image) = session.render_slice(view) else {
                    continue;
                };
                let slice = session
                    .view_state(view)
                    .map(|state| state.current_slice_index())
                    .unwrap_or_default();
                let path = out_dir.join(format!("{view}_{slice:04}.png"));
                image
                    .save(&path)
                    .with_context(|| format!("Failed to write {}", path.display()))?;
                println!("{}", path.display());
            }
        }
    }

    Ok(())
}
