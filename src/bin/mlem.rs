// ----------------------------------- CLI -----------------------------------
use std::path::PathBuf;

use clap::Parser;

use lmrec::config::read_config_file;
use lmrec::utils::{group_digits, parse_maybe_cutoff, timing::Progress, CutoffOption};
use lmrec::{io, reconstruct, Image, Lengthf32, Parameters, Ratiof32, Timef32, Tof};

#[derive(clap::Parser, Debug, Clone)]
#[clap(name = "mlem", about = "List-mode TOF-MLEM image reconstruction")]
pub struct Cli {

    /// LORs to read in: one `t1 t2 x1 y1 z1 x2 y2 z2` record per line (ps, mm)
    #[clap(short = 'f', long)]
    pub input_file: PathBuf,

    /// Number of MLEM iterations to perform
    #[clap(short, long, default_value = "5")]
    pub iterations: usize,

    /// Image full-width in x and y, in mm
    #[clap(long, default_value = "180.0")]
    pub size_xy: Lengthf32,

    /// Image full-width in z, in mm
    #[clap(long, default_value = "180.0")]
    pub size_z: Lengthf32,

    /// Number of voxels along each of x and y
    #[clap(long, default_value = "60")]
    pub nvoxels_xy: usize,

    /// Number of voxels along z
    #[clap(long, default_value = "60")]
    pub nvoxels_z: usize,

    /// Coincidence timing resolution (FWHM) in ps. If not supplied, TOF is ignored
    #[clap(short = 'r', long)]
    pub tof: Option<Timef32>,

    /// TOF cutoff (x sigma). To disable: `-k no`
    #[clap(short = 'k', long, default_value = "3", value_parser = parse_maybe_cutoff)]
    pub cutoff: CutoffOption<Ratiof32>,

    /// Sensitivity volume as raw f32 file in grid order; uniform if omitted
    #[clap(short, long)]
    pub sensitivity: Option<PathBuf>,

    /// Checkpoint prefix: iteration N is written to `{prefix}{N}.raw`
    #[clap(short, long, default_value = "mlem")]
    pub out_prefix: String,

    /// Write a checkpoint every N iterations (<= 0: final image only)
    #[clap(long, default_value = "-1", allow_hyphen_values = true)]
    pub save_every: i32,

    #[cfg(not(feature = "serial"))]
    /// Maximum number of rayon threads
    #[clap(short = 'j', long, default_value = "4")]
    pub num_threads: usize,

    /// Take the engine parameters from a TOML file instead of the flags above
    #[clap(short, long)]
    pub config: Option<PathBuf>,
}

// --------------------------------------------------------------------------------

fn main() -> Result<(), Box<dyn std::error::Error>> {

    let args = Cli::parse();

    let params = match &args.config {
        Some(path) => read_config_file(path)?.parameters(),
        None => Parameters {
            iterations: args.iterations,
            tof: args.tof.map(|fwhm| Tof::new(fwhm, args.cutoff)),
            size_xy: args.size_xy,
            size_z: args.size_z,
            nvoxels_xy: args.nvoxels_xy,
            nvoxels_z: args.nvoxels_z,
            prefix: args.out_prefix.clone(),
            save_every: args.save_every,
        },
    };

    #[cfg(not(feature = "serial"))]
    // Set the maximum number of threads used by rayon for parallel iteration
    match rayon::ThreadPoolBuilder::new().num_threads(args.num_threads).build_global() {
        Err(e) => println!("{e}"),
        Ok(_)  => println!("Using up to {} threads.", args.num_threads),
    }

    let mut progress = Progress::new();

    progress.start("Reading LOR data");
    let measured_lors = io::read_lors(&args.input_file)?;
    progress.done();
    println!("Loaded {} LORs", group_digits(measured_lors.len()));

    let sensitivity = args.sensitivity.as_deref()
        .map(|path| Image::from_raw_file(path, params.fov()))
        .transpose()?;

    progress.startln(&format!("Reconstructing for {} iterations", params.iterations));
    let image = reconstruct(&params, &measured_lors, sensitivity)?;
    progress.done_with_message("Reconstruction finished");

    println!("Final image: {} voxels, total activity {:.3}",
             group_digits(image.data.len()),
             image.data.iter().sum::<f32>());

    Ok(())
}
