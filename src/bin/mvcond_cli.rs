#[cfg(target_arch = "wasm32")]
fn main() {}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    if let Err(err) = native::run() {
        eprintln!("mvcond_cli error: {err}");
        std::process::exit(1);
    }
}

#[cfg(not(target_arch = "wasm32"))]
mod native {
    use std::fs;
    use std::path::{Path, PathBuf};

    use mvcond_engine::geom::RasterContext;
    use mvcond_engine::io;
    use mvcond_engine::pipeline::{self, CameraConfig};

    const DEFAULT_SIZE: usize = 512;

    const USAGE: &str = r"mvcond_cli (mvcond-engine)

USAGE:
  mvcond_cli cameras [camera options]
  mvcond_cli embed --out-dir <dir> [--size <px>] [camera options]
  mvcond_cli render <mesh.obj> --out-dir <dir> [--texture <image>] [--size <px>] [camera options]
  mvcond_cli reference <image> --out-dir <dir> [--size <px>]

CAMERA OPTIONS:
  --config <file.json>   Camera configuration (camera_azims, camera_elevs, ...)
  --azimuths <list>      Comma-separated azimuths in degrees
  --elevations <list>    Comma-separated elevations in degrees
  --distance <value>     Camera distance (default 1.8)
  --ortho-scale <value>  Orthographic window side (default 1.1)

Without camera options the default six-view configuration is used.

OPTIONS:
  --size <px>            Square output resolution (default 512)
  -h, --help             Show this help
";

    pub fn run() -> Result<(), String> {
        let args: Vec<String> = std::env::args().skip(1).collect();
        let mut args = Args::new(args);

        let Some(command) = args.next() else {
            print_usage();
            return Ok(());
        };

        match command.as_str() {
            "cameras" => cmd_cameras(&mut args),
            "embed" => cmd_embed(&mut args),
            "render" => cmd_render(&mut args),
            "reference" => cmd_reference(&mut args),
            "-h" | "--help" | "help" => {
                print_usage();
                Ok(())
            }
            other => Err(format!("unknown command `{other}`\n\n{USAGE}")),
        }
    }

    fn print_usage() {
        println!("{USAGE}");
    }

    /// Options shared by every command; positional arguments are collected in order.
    #[derive(Default)]
    struct Options {
        positional: Vec<String>,
        out_dir: Option<PathBuf>,
        size: Option<usize>,
        texture: Option<PathBuf>,
        config: Option<PathBuf>,
        azimuths: Option<String>,
        elevations: Option<String>,
        distance: Option<f32>,
        ortho_scale: Option<f32>,
        help: bool,
    }

    impl Options {
        fn parse(args: &mut Args) -> Result<Self, String> {
            let mut options = Self::default();
            while let Some(arg) = args.next() {
                match arg.as_str() {
                    "--out-dir" => options.out_dir = Some(PathBuf::from(args.value("--out-dir")?)),
                    "--size" => options.size = Some(parse_number(&args.value("--size")?, "--size")?),
                    "--texture" => options.texture = Some(PathBuf::from(args.value("--texture")?)),
                    "--config" => options.config = Some(PathBuf::from(args.value("--config")?)),
                    "--azimuths" => options.azimuths = Some(args.value("--azimuths")?),
                    "--elevations" => options.elevations = Some(args.value("--elevations")?),
                    "--distance" => {
                        options.distance = Some(parse_number(&args.value("--distance")?, "--distance")?);
                    }
                    "--ortho-scale" => {
                        options.ortho_scale =
                            Some(parse_number(&args.value("--ortho-scale")?, "--ortho-scale")?);
                    }
                    "-h" | "--help" => options.help = true,
                    flag if flag.starts_with("--") => return Err(format!("unknown option `{flag}`")),
                    _ => options.positional.push(arg),
                }
            }
            Ok(options)
        }

        fn size(&self) -> Result<usize, String> {
            match self.size.unwrap_or(DEFAULT_SIZE) {
                0 => Err("--size must be positive".to_string()),
                size => Ok(size),
            }
        }

        fn out_dir(&self) -> Result<&Path, String> {
            self.out_dir.as_deref().ok_or_else(|| "missing --out-dir".to_string())
        }

        fn camera(&self) -> Result<CameraConfig, String> {
            if let Some(path) = &self.config {
                let text = fs::read_to_string(path).map_err(|e| format!("read {}: {e}", path.display()))?;
                let config: CameraConfig =
                    serde_json::from_str(&text).map_err(|e| format!("parse {}: {e}", path.display()))?;
                config.validate().map_err(|e| e.to_string())?;
                return Ok(config);
            }
            let defaults = CameraConfig::default();
            let distance = self.distance.unwrap_or(defaults.camera_dist);
            let ortho_scale = self.ortho_scale.unwrap_or(defaults.ortho_scale);
            match (&self.azimuths, &self.elevations) {
                (Some(az), Some(el)) => {
                    CameraConfig::from_lists(az, el, distance, ortho_scale).map_err(|e| e.to_string())
                }
                (None, None) => {
                    let config = CameraConfig {
                        camera_dist: distance,
                        ortho_scale,
                        ..defaults
                    };
                    config.validate().map_err(|e| e.to_string())?;
                    Ok(config)
                }
                _ => Err("--azimuths and --elevations must be given together".to_string()),
            }
        }
    }

    fn cmd_cameras(args: &mut Args) -> Result<(), String> {
        let options = Options::parse(args)?;
        if options.help {
            print_usage();
            return Ok(());
        }
        let camera = options.camera()?;
        let rig = camera.to_rig().map_err(|e| e.to_string())?;
        println!(
            "{} views, distance {}, bounds {:?}",
            rig.len(),
            camera.camera_dist,
            rig.bounds
        );
        for (i, matrix) in rig.matrices_f32().iter().enumerate() {
            println!(
                "view {i}: azimuth {} elevation {}",
                camera.camera_azims[i], camera.camera_elevs[i]
            );
            for row in matrix {
                println!(
                    "  [{:>10.6} {:>10.6} {:>10.6} {:>10.6}]",
                    row[0], row[1], row[2], row[3]
                );
            }
        }
        Ok(())
    }

    fn cmd_embed(args: &mut Args) -> Result<(), String> {
        let options = Options::parse(args)?;
        if options.help {
            print_usage();
            return Ok(());
        }
        let camera = options.camera()?;
        let control = pipeline::camera_embedding(&camera, options.size()?).map_err(|e| e.to_string())?;
        let written =
            io::save_views_png(&control, options.out_dir()?, "plucker").map_err(|e| e.to_string())?;
        println!("wrote {} files", written.len());
        Ok(())
    }

    fn cmd_render(args: &mut Args) -> Result<(), String> {
        let options = Options::parse(args)?;
        if options.help {
            print_usage();
            return Ok(());
        }
        let mesh_path = options.positional.first().ok_or("missing mesh path")?;
        let camera = options.camera()?;
        let out_dir = options.out_dir()?;
        let size = options.size()?;

        let asset = io::load_obj(mesh_path, options.texture.as_deref()).map_err(|e| e.to_string())?;
        let mut ctx = RasterContext::new();
        let maps = pipeline::render_multiview(&mut ctx, &asset, size, Some(&camera))
            .map_err(|e| e.to_string())?;
        for warning in &maps.diagnostics.warnings {
            log::warn!("{warning}");
        }

        let mut written = io::save_views_png(&maps.position_maps, out_dir, "position")
            .map_err(|e| e.to_string())?;
        written.extend(io::save_views_png(&maps.normal_maps, out_dir, "normal").map_err(|e| e.to_string())?);
        written.extend(io::save_masks_png(&maps.masks, out_dir, "mask").map_err(|e| e.to_string())?);
        println!("{}", maps.diagnostics);
        println!("wrote {} files", written.len());
        Ok(())
    }

    fn cmd_reference(args: &mut Args) -> Result<(), String> {
        let options = Options::parse(args)?;
        if options.help {
            print_usage();
            return Ok(());
        }
        let image_path = options.positional.first().ok_or("missing image path")?;
        let size = options.size()?;
        let rgba = io::load_rgba(Path::new(image_path)).map_err(|e| e.to_string())?;
        let prepared = pipeline::prepare_reference_image(&rgba, size, size).map_err(|e| e.to_string())?;
        let batch = prepared.insert_axis(ndarray::Axis(0));
        let written =
            io::save_views_png(&batch, options.out_dir()?, "reference").map_err(|e| e.to_string())?;
        for path in &written {
            println!("wrote {}", path.display());
        }
        Ok(())
    }

    fn parse_number<T: std::str::FromStr>(value: &str, flag: &str) -> Result<T, String> {
        value
            .trim()
            .parse()
            .map_err(|_| format!("invalid value `{value}` for {flag}"))
    }

    struct Args {
        args: Vec<String>,
        pos: usize,
    }

    impl Args {
        fn new(args: Vec<String>) -> Self {
            Self { args, pos: 0 }
        }

        fn next(&mut self) -> Option<String> {
            let arg = self.args.get(self.pos)?.clone();
            self.pos += 1;
            Some(arg)
        }

        fn value(&mut self, flag: &str) -> Result<String, String> {
            self.next().ok_or_else(|| format!("missing value for {flag}"))
        }
    }
}
